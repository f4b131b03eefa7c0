//! Database operations for `tracked_products`, the catalog that discovery
//! matches against.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `tracked_products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrackedProductRow {
    pub id: i64,
    pub shopify_product_id: String,
    pub sku: Option<String>,
    pub supplier_url: Option<String>,
    pub domain: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A storefront product registered by the price-sync side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrackedProduct {
    pub shopify_product_id: String,
    pub sku: Option<String>,
    pub supplier_url: Option<String>,
    pub domain: Option<String>,
}

/// Inserts or updates a tracked product keyed by `shopify_product_id`.
/// Returns the row id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_tracked_product(
    pool: &PgPool,
    product: &NewTrackedProduct,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO tracked_products (shopify_product_id, sku, supplier_url, domain) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (shopify_product_id) DO UPDATE SET \
             sku = EXCLUDED.sku, \
             supplier_url = EXCLUDED.supplier_url, \
             domain = EXCLUDED.domain, \
             updated_at = NOW() \
         RETURNING id",
    )
    .bind(&product.shopify_product_id)
    .bind(&product.sku)
    .bind(&product.supplier_url)
    .bind(&product.domain)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Supplier URLs of every tracked product, as stored. Canonicalization
/// happens when the matching snapshot is built.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tracked_supplier_urls(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let urls = sqlx::query_scalar::<_, String>(
        "SELECT supplier_url FROM tracked_products \
         WHERE supplier_url IS NOT NULL AND BTRIM(supplier_url) <> ''",
    )
    .fetch_all(pool)
    .await?;

    Ok(urls)
}

/// Non-empty SKUs of every tracked product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tracked_skus(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let skus = sqlx::query_scalar::<_, String>(
        "SELECT sku FROM tracked_products \
         WHERE sku IS NOT NULL AND BTRIM(sku) <> ''",
    )
    .fetch_all(pool)
    .await?;

    Ok(skus)
}
