//! Offer listing for the CLI.

use chrono::NaiveDate;
use clap::Subcommand;

/// Sub-commands available under `offers`.
#[derive(Debug, Subcommand)]
pub enum OffersCommands {
    /// List offers by most recent sighting
    List {
        /// Maximum number of offers to show
        #[arg(long, default_value = "50")]
        limit: u32,
    },
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(
        || "\u{2014}".to_string(),
        |d| d.format("%Y-%m-%d").to_string(),
    )
}

/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_offers_list(pool: &sqlx::PgPool, limit: u32) -> anyhow::Result<()> {
    let offers = pricesync_db::list_offers(pool, i64::from(limit)).await?;
    if offers.is_empty() {
        println!("no offers recorded yet");
        return Ok(());
    }

    println!(
        "{:<20}{:<12}{:<12}{:<12}{:>6}  TITLE",
        "DOMAIN", "STARTS", "ENDS", "LAST SEEN", "SEEN"
    );
    for offer in &offers {
        let title = if offer.title.chars().count() > 50 {
            format!("{}...", offer.title.chars().take(50).collect::<String>())
        } else {
            offer.title.clone()
        };
        println!(
            "{:<20}{:<12}{:<12}{:<12}{:>6}  {title}",
            offer.domain,
            fmt_date(offer.starts_on),
            fmt_date(offer.ends_on),
            offer.last_seen_at.format("%Y-%m-%d"),
            offer.sightings
        );
        println!("    {}", offer.offer_url);
    }

    Ok(())
}
