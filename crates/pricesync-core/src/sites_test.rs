use super::*;

fn site(name: &str, seeds: &[&str]) -> SiteConfig {
    SiteConfig {
        name: name.to_string(),
        seed_urls: seeds.iter().map(|s| (*s).to_string()).collect(),
        page_budget: None,
        notes: None,
    }
}

#[test]
fn slug_simple_name() {
    assert_eq!(
        site("Honda Marine NZ", &["https://a.nz/"]).slug(),
        "honda-marine-nz"
    );
}

#[test]
fn slug_strips_punctuation_and_dots() {
    assert_eq!(
        site("Bob's Outboards.co.nz", &["https://a.nz/"]).slug(),
        "bobs-outboards-co-nz"
    );
}

#[test]
fn domain_strips_www_and_port() {
    let s = site("A", &["https://WWW.HondaMarine.co.nz:443/outboards"]);
    assert_eq!(s.domain().as_deref(), Some("hondamarine.co.nz"));
}

#[test]
fn domain_is_none_for_relative_seed() {
    let s = site("A", &["/outboards"]);
    assert!(s.domain().is_none());
}

#[test]
fn validate_rejects_empty_name() {
    let file = SitesFile {
        sites: vec![site("  ", &["https://a.nz/"])],
    };
    let err = validate_sites(&file).unwrap_err();
    assert!(err.to_string().contains("non-empty"));
}

#[test]
fn validate_rejects_site_without_seeds() {
    let file = SitesFile {
        sites: vec![site("Empty", &[])],
    };
    let err = validate_sites(&file).unwrap_err();
    assert!(err.to_string().contains("no seed_urls"));
}

#[test]
fn validate_rejects_non_http_seed() {
    let file = SitesFile {
        sites: vec![site("Ftp", &["ftp://a.nz/"])],
    };
    let err = validate_sites(&file).unwrap_err();
    assert!(err.to_string().contains("invalid seed URL"));
}

#[test]
fn validate_rejects_seed_with_space_in_host() {
    let file = SitesFile {
        sites: vec![site(
            "Spaced",
            &["https://exa mple.com/", "https://exa mple.com/x"],
        )],
    };
    let err = validate_sites(&file).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
    assert!(err.to_string().contains("invalid seed URL"));
}

#[test]
fn domain_strips_repeated_www() {
    let s = site("A", &["http://www.www.a.nz/"]);
    assert_eq!(s.domain().as_deref(), Some("a.nz"));
}

#[test]
fn validate_rejects_mixed_seed_hosts() {
    let file = SitesFile {
        sites: vec![site("Mixed", &["https://a.nz/", "https://b.nz/"])],
    };
    let err = validate_sites(&file).unwrap_err();
    assert!(err.to_string().contains("mixes seed hosts"));
}

#[test]
fn validate_accepts_www_and_bare_host_as_same_site() {
    let file = SitesFile {
        sites: vec![site("Same", &["https://www.a.nz/", "https://a.nz/outboards"])],
    };
    assert!(validate_sites(&file).is_ok());
}

#[test]
fn validate_rejects_zero_page_budget() {
    let mut s = site("Budget", &["https://a.nz/"]);
    s.page_budget = Some(0);
    let err = validate_sites(&SitesFile { sites: vec![s] }).unwrap_err();
    assert!(err.to_string().contains("page_budget 0"));
}

#[test]
fn validate_rejects_duplicate_name() {
    let file = SitesFile {
        sites: vec![
            site("Honda", &["https://a.nz/"]),
            site("honda", &["https://b.nz/"]),
        ],
    };
    let err = validate_sites(&file).unwrap_err();
    assert!(err.to_string().contains("duplicate site name"));
}

#[test]
fn validate_rejects_duplicate_slug() {
    let file = SitesFile {
        sites: vec![
            site("Honda Marine", &["https://a.nz/"]),
            site("Honda--Marine", &["https://b.nz/"]),
        ],
    };
    let err = validate_sites(&file).unwrap_err();
    assert!(err.to_string().contains("duplicate site slug"));
}

#[test]
fn load_sites_from_real_file() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("sites.yaml");
    assert!(
        path.exists(),
        "sites.yaml missing at {path:?}; required for this test"
    );
    let result = load_sites(&path);
    assert!(result.is_ok(), "failed to load sites.yaml: {result:?}");
    let sites_file = result.unwrap();
    assert!(!sites_file.sites.is_empty());
    assert_eq!(sites_file.sites[1].page_budget, Some(150));
}

#[test]
fn load_sites_reports_missing_file() {
    let err = load_sites(Path::new("/definitely/not/here/sites.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::SitesFileIo { .. }));
}
