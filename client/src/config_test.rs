use super::*;
use std::collections::HashMap;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn from_lookup_uses_defaults_when_unset() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg.api_base_url, DEFAULT_API_URL);
    assert_eq!(
        cfg.timeouts,
        Timeouts { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    );
    assert_eq!(cfg.session_ttl_secs, 86_400);
    assert_eq!(cfg.refresh_lead_secs, 300);
    assert_eq!(cfg.token_key, "auth_token");
    assert_eq!(cfg.token_file, PathBuf::from(".portfolio-token.json"));
}

#[test]
fn from_lookup_parses_overrides() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[
        ("PORTFOLIO_API_URL", "https://api.example.test/v1/"),
        ("PORTFOLIO_REQUEST_TIMEOUT_SECS", "42"),
        ("PORTFOLIO_CONNECT_TIMEOUT_SECS", "7"),
        ("PORTFOLIO_SESSION_TTL_SECS", "3600"),
        ("PORTFOLIO_REFRESH_LEAD_SECS", "60"),
        ("PORTFOLIO_TOKEN_FILE", "/tmp/tok.json"),
    ]))
    .unwrap();
    assert_eq!(cfg.api_base_url, "https://api.example.test/v1");
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 42, connect_secs: 7 });
    assert_eq!(cfg.session_ttl_secs, 3600);
    assert_eq!(cfg.refresh_lead_secs, 60);
    assert_eq!(cfg.token_file, PathBuf::from("/tmp/tok.json"));
}

#[test]
fn unparseable_numbers_fall_back_to_defaults() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[
        ("PORTFOLIO_REQUEST_TIMEOUT_SECS", "soon"),
        ("PORTFOLIO_SESSION_TTL_SECS", "-5"),
    ]))
    .unwrap();
    assert_eq!(cfg.timeouts.request_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    assert_eq!(cfg.session_ttl_secs, DEFAULT_SESSION_TTL_SECS);
}

#[test]
fn empty_base_url_errors() {
    let err = ClientConfig::from_lookup(lookup_from(&[("PORTFOLIO_API_URL", "  ")])).unwrap_err();
    assert_eq!(err, ConfigError::EmptyBaseUrl);
}

#[test]
fn non_http_base_url_errors() {
    let err = ClientConfig::from_lookup(lookup_from(&[("PORTFOLIO_API_URL", "ftp://x")])).unwrap_err();
    assert!(err.to_string().contains("http://"));
}

#[test]
fn token_file_defaults_under_home() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[("HOME", "/home/ada")])).unwrap();
    assert_eq!(cfg.token_file, PathBuf::from("/home/ada/.portfolio/token.json"));
}

#[test]
fn timeouts_convert_to_durations() {
    let t = Timeouts { request_secs: 3, connect_secs: 1 };
    assert_eq!(t.request(), Duration::from_secs(3));
    assert_eq!(t.connect(), Duration::from_secs(1));
}
