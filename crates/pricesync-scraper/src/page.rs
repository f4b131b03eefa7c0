//! Best-effort metadata extraction from fetched supplier pages.
//!
//! Everything here is regex and JSON-LD based; missing or malformed markup
//! yields `None`, never an error.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;

static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid regex"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));
static JSON_LD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});
static PRICE_ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<[a-z][a-z0-9]*\b[^>]*class\s*=\s*["'][^"']*price[^"']*["'][^>]*>([^<]*)"#)
        .expect("valid regex")
});
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s*([0-9]{1,3}(?:,[0-9]{3})+(?:\.[0-9]{1,2})?|[0-9]+(?:\.[0-9]{1,2})?)")
        .expect("valid regex")
});
static TAGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("valid regex"));
static PROPERTY_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| attr_regex("property"));
static NAME_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| attr_regex("name"));
static CONTENT_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| attr_regex("content"));

// Matches ` attr="..."` or ` attr='...'` inside a single tag.
fn attr_regex(attr: &str) -> Regex {
    Regex::new(&format!(
        r#"(?is)(?:^|\s){attr}\s*=\s*(?:"([^"]*)"|'([^']*)')"#
    ))
    .expect("valid regex")
}

/// Metadata recorded for product candidates and offers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    /// Plain decimal string, e.g. `"38999.00"`.
    pub price: Option<String>,
    pub summary: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_through: Option<NaiveDate>,
}

impl PageMetadata {
    #[must_use]
    pub fn extract(html: &str) -> Self {
        let json_ld = json_ld_blocks(html);
        Self {
            title: extract_title(html),
            price: find_json_ld_key(&json_ld, &["price"])
                .and_then(|raw| normalize_price(&raw))
                .or_else(|| extract_styled_price(html)),
            summary: extract_summary(html),
            valid_from: find_json_ld_key(&json_ld, &["validFrom"]).and_then(|raw| parse_date(&raw)),
            valid_through: find_json_ld_key(&json_ld, &["validThrough", "priceValidUntil"])
                .and_then(|raw| parse_date(&raw)),
        }
    }
}

/// `og:title`, falling back to `<title>`.
#[must_use]
pub fn extract_title(html: &str) -> Option<String> {
    find_meta_content(html, &PROPERTY_ATTR_RE, "og:title")
        .map(|raw| clean_text(&raw))
        .filter(|t| !t.is_empty())
        .or_else(|| {
            TITLE_RE
                .captures(html)
                .and_then(|cap| cap.get(1))
                .map(|m| clean_text(m.as_str()))
                .filter(|t| !t.is_empty())
        })
}

/// `og:description`, falling back to `<meta name="description">`.
#[must_use]
pub fn extract_summary(html: &str) -> Option<String> {
    find_meta_content(html, &PROPERTY_ATTR_RE, "og:description")
        .or_else(|| find_meta_content(html, &NAME_ATTR_RE, "description"))
        .map(|raw| clean_text(&raw))
        .filter(|s| !s.is_empty())
}

fn extract_styled_price(html: &str) -> Option<String> {
    PRICE_ELEMENT_RE.captures_iter(html).find_map(|cap| {
        let text = cap.get(1)?.as_str();
        let amount = AMOUNT_RE.captures(text)?.get(1)?.as_str();
        normalize_price(amount)
    })
}

/// Strips currency symbols and thousands separators and pads the fraction
/// to two digits. `None` when the remainder is not a plain decimal.
#[must_use]
pub fn normalize_price(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches(|c: char| c == '$' || c.is_ascii_alphabetic())
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    let (whole, fraction) = match cleaned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (cleaned.as_str(), ""),
    };
    if whole.is_empty()
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let fraction = match fraction.len() {
        0 => "00".to_string(),
        1 => format!("{fraction}0"),
        _ => fraction.to_string(),
    };
    Some(format!("{whole}.{fraction}"))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let prefix = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

fn json_ld_blocks(html: &str) -> Vec<Value> {
    JSON_LD_RE
        .captures_iter(html)
        .filter_map(|cap| {
            let raw = cap.get(1)?.as_str().trim();
            serde_json::from_str::<Value>(raw).ok()
        })
        .collect()
}

/// First scalar value stored under any of `keys`, searching every block
/// depth-first. Numbers are returned in their JSON text form.
fn find_json_ld_key(blocks: &[Value], keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| blocks.iter().find_map(|block| find_key(block, key)))
}

fn find_key(value: &Value, key: &str) -> Option<String> {
    match value {
        Value::Object(map) => {
            match map.get(key) {
                Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
                Some(Value::Number(n)) => return Some(n.to_string()),
                _ => {}
            }
            map.values().find_map(|child| find_key(child, key))
        }
        Value::Array(items) => items.iter().find_map(|child| find_key(child, key)),
        _ => None,
    }
}

/// `content` of the first `<meta>` whose `key_attr` equals `key_value`.
fn find_meta_content(html: &str, key_attr: &Regex, key_value: &str) -> Option<String> {
    META_TAG_RE.find_iter(html).find_map(|m| {
        let tag = m.as_str();
        let key = extract_attr(tag, key_attr)?;
        if key.eq_ignore_ascii_case(key_value) {
            extract_attr(tag, &CONTENT_ATTR_RE)
        } else {
            None
        }
    })
}

fn extract_attr(tag: &str, attr: &Regex) -> Option<String> {
    let caps = attr.captures(tag)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim().to_string())
}

fn decode_entities(input: &str) -> String {
    input
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn clean_text(input: &str) -> String {
    let no_tags = TAGS_RE.replace_all(input, " ");
    decode_entities(&no_tags)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_og_title_over_title_tag() {
        let html = r#"<head><title>Fallback</title><meta property="og:title" content="BF225 &amp; Rigging"></head>"#;
        assert_eq!(extract_title(html).as_deref(), Some("BF225 & Rigging"));
    }

    #[test]
    fn falls_back_to_title_tag_and_collapses_whitespace() {
        let html = "<title>\n  Honda   BF60 &#39;Jet&#39;\n</title>";
        assert_eq!(extract_title(html).as_deref(), Some("Honda BF60 'Jet'"));
    }

    #[test]
    fn title_missing_is_none() {
        assert!(extract_title("<p>no title</p>").is_none());
        assert!(extract_title("<title>   </title>").is_none());
    }

    #[test]
    fn prefixed_attributes_are_not_mistaken_for_keys() {
        let html = r#"<meta data-name="description" data-content="wrong" content="Nope">
            <meta name='description' data-content="wrong" content='Spring offers'>"#;
        assert_eq!(extract_summary(html).as_deref(), Some("Spring offers"));
    }

    #[test]
    fn attribute_order_does_not_matter() {
        let html = r#"<meta content="Winter deals on outboards" name="description">"#;
        assert_eq!(
            extract_summary(html).as_deref(),
            Some("Winter deals on outboards")
        );
    }

    #[test]
    fn og_description_wins_over_meta_description() {
        let html = r#"<meta name="description" content="plain"><meta property="og:description" content="Bob's winter sale">"#;
        assert_eq!(extract_summary(html).as_deref(), Some("Bob's winter sale"));
    }

    #[test]
    fn json_ld_price_wins_over_styled_price() {
        let html = r#"
            <script type="application/ld+json">
              {"@type":"Product","name":"BF225","offers":{"@type":"Offer","price":"38999","priceCurrency":"NZD"}}
            </script>
            <span class="price">$1.00</span>
        "#;
        assert_eq!(PageMetadata::extract(html).price.as_deref(), Some("38999.00"));
    }

    #[test]
    fn numeric_json_ld_price_is_normalized() {
        let html = r#"<script type="application/ld+json">{"offers":[{"price":4599.5}]}</script>"#;
        assert_eq!(PageMetadata::extract(html).price.as_deref(), Some("4599.50"));
    }

    #[test]
    fn styled_price_strips_thousands_separators() {
        let html = r#"<div class="card"><span class="product__price sale">Now $12,999.00 NZD</span></div>"#;
        assert_eq!(PageMetadata::extract(html).price.as_deref(), Some("12999.00"));
    }

    #[test]
    fn styled_price_skips_elements_without_amount() {
        let html = r#"<span class="price-label">Price</span><span class="price">$899</span>"#;
        assert_eq!(PageMetadata::extract(html).price.as_deref(), Some("899.00"));
    }

    #[test]
    fn no_price_is_none() {
        assert!(PageMetadata::extract("<p>$5 off</p>").price.is_none());
    }

    #[test]
    fn normalize_price_rejects_garbage() {
        assert_eq!(normalize_price("NZ$1,234.5").as_deref(), Some("1234.50"));
        assert!(normalize_price("call us").is_none());
        assert!(normalize_price("").is_none());
        assert!(normalize_price("12.3.4").is_none());
    }

    #[test]
    fn offer_dates_come_from_json_ld() {
        let html = r#"<script type="application/ld+json">
            {"@type":"Offer","validFrom":"2026-06-01T00:00:00+12:00","priceValidUntil":"2026-08-31"}
        </script>"#;
        let meta = PageMetadata::extract(html);
        assert_eq!(meta.valid_from, NaiveDate::from_ymd_opt(2026, 6, 1));
        assert_eq!(meta.valid_through, NaiveDate::from_ymd_opt(2026, 8, 31));
    }

    #[test]
    fn malformed_json_ld_is_ignored() {
        let html = r#"<script type="application/ld+json">{"price": </script><title>T</title>"#;
        let meta = PageMetadata::extract(html);
        assert!(meta.price.is_none());
        assert_eq!(meta.title.as_deref(), Some("T"));
    }
}
