use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use crate::canonical::strip_www;

// `href` on `<a>` and `<area>` only; `<link>` assets and `data-href` are not
// navigation.
static ANCHOR_HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<(?:a|area)\s(?:[^>]*?\s)?href\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid regex")
});

/// Pulls same-host hyperlinks (`<a>` and `<area>` targets) out of `html`,
/// resolved against `base_url`.
///
/// Fragment-only, `mailto:`, `tel:` and `javascript:` hrefs are dropped, as
/// is any href that fails to resolve. Fragments are removed from the
/// resolved URLs. The result is deduplicated and keeps first-seen order so
/// breadth-first traversal is deterministic.
///
/// Hosts compare case-insensitively and ignore leading `www.` labels, matching
/// what the canonicalizer treats as the same site.
#[must_use]
pub fn extract_links(html: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        tracing::debug!(base_url, "cannot extract links: base URL does not parse");
        return Vec::new();
    };
    let Some(base_host) = base.host_str().map(normalized_host) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for cap in ANCHOR_HREF_RE.captures_iter(html) {
        let Some(raw) = cap.get(1).or_else(|| cap.get(2)) else {
            continue;
        };
        let href = raw.as_str().trim().replace("&amp;", "&");
        if is_ignored_href(&href) {
            continue;
        }

        let Ok(mut resolved) = base.join(&href) else {
            tracing::debug!(href = %href, "skipping malformed href");
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        if resolved.host_str().map(normalized_host).as_deref() != Some(base_host.as_str()) {
            continue;
        }
        resolved.set_fragment(None);

        let link = resolved.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}

fn is_ignored_href(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("javascript:")
}

fn normalized_host(host: &str) -> String {
    strip_www(&host.to_ascii_lowercase()).to_string()
}
