//! URL canonicalization: the comparison key used for deduplication.
//!
//! Two URLs that point at the same supplier page modulo scheme, `www.`,
//! default port, trailing slash, tracking parameters, parameter order, or
//! fragment canonicalize to the same string. Canonicalization is idempotent.

use reqwest::Url;

use crate::error::ScraperError;

/// Query parameters that only carry attribution and never select content.
/// Any key starting with `utm_` is also dropped.
const TRACKING_PARAMS: [&str; 14] = [
    "gclid", "gbraid", "wbraid", "fbclid", "msclkid", "mc_cid", "mc_eid", "_ga", "_gl", "ref",
    "srsltid", "yclid", "igshid", "dclid",
];

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Removes every leading `www.` label, so `www.www.example.com` and
/// `example.com` name the same site.
pub(crate) fn strip_www(host: &str) -> &str {
    let mut host = host;
    while let Some(rest) = host.strip_prefix("www.") {
        host = rest;
    }
    host
}

fn invalid(url: &str, reason: impl Into<String>) -> ScraperError {
    ScraperError::InvalidUrl {
        url: url.to_string(),
        reason: reason.into(),
    }
}

/// Normalizes `raw` into its canonical comparison key.
///
/// Rules, in order: `http` becomes `https`, the host is lower-cased and
/// loses any leading `www.` labels, default ports are dropped, a trailing
/// slash is removed from any path other than `/`, tracking parameters are
/// removed, the remaining parameters are sorted by key (then value), and
/// the fragment is dropped.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] when `raw` is not an absolute
/// http(s) URL with a host. Callers must treat such URLs as
/// non-matchable rather than substituting a placeholder key.
pub fn canonicalize(raw: &str) -> Result<String, ScraperError> {
    let trimmed = raw.trim();
    let mut url = Url::parse(trimmed).map_err(|e| invalid(trimmed, e.to_string()))?;

    match url.scheme() {
        "https" => {}
        "http" => url
            .set_scheme("https")
            .map_err(|()| invalid(trimmed, "cannot switch scheme to https"))?,
        other => return Err(invalid(trimmed, format!("unsupported scheme '{other}'"))),
    }

    let host = url
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| invalid(trimmed, "missing host"))?;
    let host = strip_www(&host).to_string();
    if host.is_empty() {
        return Err(invalid(trimmed, "empty host"));
    }
    url.set_host(Some(host.as_str()))
        .map_err(|e| invalid(trimmed, e.to_string()))?;

    if url.port() == Some(443) {
        url.set_port(None)
            .map_err(|()| invalid(trimmed, "cannot clear port"))?;
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        let stripped = path.trim_end_matches('/');
        url.set_path(if stripped.is_empty() { "/" } else { stripped });
    }

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    params.sort();
    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(params);
    }

    url.set_fragment(None);

    Ok(url.to_string())
}

/// Lower-cased host of `raw` without leading `www.` labels.
pub(crate) fn domain_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = strip_www(&host).to_string();
    (!host.is_empty()).then_some(host)
}

/// Last non-empty path segment of an absolute URL, lower-cased.
pub(crate) fn last_path_segment(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    url.path_segments()?
        .rfind(|segment| !segment.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalent_urls_share_a_key() {
        assert_eq!(
            canonicalize("https://WWW.Example.com/a/?utm_source=x&b=2&a=1").unwrap(),
            canonicalize("https://example.com/a?b=2&a=1").unwrap()
        );
        assert_eq!(
            canonicalize("https://example.com/a?b=2&a=1").unwrap(),
            "https://example.com/a?a=1&b=2"
        );
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let inputs = [
            "https://WWW.Example.com/a/?utm_source=x&b=2&a=1",
            "http://example.com:80/Outboards/BF225/#specs",
            "https://example.com:443/",
            "https://example.com/search?q=honda+bf&page=2&gclid=abc",
            "https://example.com/a%20b/?x=%2F",
            "https://example.com:8443/a//",
            "https://www.www.example.com/a",
            "http://WWW.www.Example.com/",
        ];
        for raw in inputs {
            let once = canonicalize(raw).unwrap();
            let twice = canonicalize(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {raw}");
        }
    }

    #[test]
    fn http_and_https_collapse() {
        assert_eq!(
            canonicalize("http://example.com/bf225").unwrap(),
            "https://example.com/bf225"
        );
    }

    #[test]
    fn default_ports_are_dropped_but_custom_ports_kept() {
        assert_eq!(
            canonicalize("https://example.com:443/x").unwrap(),
            "https://example.com/x"
        );
        assert_eq!(
            canonicalize("http://example.com:80/x").unwrap(),
            "https://example.com/x"
        );
        assert_eq!(
            canonicalize("https://example.com:8443/x").unwrap(),
            "https://example.com:8443/x"
        );
    }

    #[test]
    fn root_keeps_its_slash() {
        assert_eq!(
            canonicalize("https://www.example.com").unwrap(),
            "https://example.com/"
        );
        assert_eq!(
            canonicalize("https://example.com/").unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn path_case_is_preserved() {
        assert_eq!(
            canonicalize("https://Example.com/Outboards/BF225").unwrap(),
            "https://example.com/Outboards/BF225"
        );
    }

    #[test]
    fn strips_every_tracking_param() {
        let raw = "https://example.com/p?fbclid=1&UTM_Campaign=x&gclid=2&_ga=3&ref=nav&colour=red";
        assert_eq!(
            canonicalize(raw).unwrap(),
            "https://example.com/p?colour=red"
        );
    }

    #[test]
    fn only_tracking_params_leaves_no_query() {
        assert_eq!(
            canonicalize("https://example.com/p?utm_source=a&utm_medium=b").unwrap(),
            "https://example.com/p"
        );
    }

    #[test]
    fn drops_fragment() {
        assert_eq!(
            canonicalize("https://example.com/p#reviews").unwrap(),
            "https://example.com/p"
        );
    }

    #[test]
    fn malformed_urls_are_errors() {
        for raw in ["", "not a url", "/relative/path", "mailto:sales@example.com", "ftp://example.com/x"] {
            let err = canonicalize(raw).unwrap_err();
            assert!(
                matches!(err, ScraperError::InvalidUrl { .. }),
                "expected InvalidUrl for {raw:?}"
            );
        }
    }

    #[test]
    fn domain_of_strips_www() {
        assert_eq!(
            domain_of("https://WWW.HondaMarine.co.nz/x").as_deref(),
            Some("hondamarine.co.nz")
        );
        assert_eq!(
            domain_of("https://www.www.hondamarine.co.nz/").as_deref(),
            Some("hondamarine.co.nz")
        );
        assert!(domain_of("nope").is_none());
    }

    #[test]
    fn repeated_www_labels_collapse_in_one_pass() {
        assert_eq!(
            canonicalize("https://www.www.example.com/a").unwrap(),
            "https://example.com/a"
        );
        assert_eq!(strip_www("www.www.www.site.nz"), "site.nz");
        assert_eq!(strip_www("wwwsite.nz"), "wwwsite.nz");
    }

    #[test]
    fn last_path_segment_ignores_trailing_slash() {
        assert_eq!(
            last_path_segment("https://site.nz/outboards/high-power/BF225/").as_deref(),
            Some("bf225")
        );
        assert_eq!(last_path_segment("https://site.nz/"), None);
    }
}
