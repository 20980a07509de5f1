use super::*;
use time::Duration;

fn make_token(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}

#[test]
fn future_expiry_is_not_expired() {
    let exp = (OffsetDateTime::now_utc() + Duration::hours(24)).unix_timestamp();
    let token = make_token(&serde_json::json!({ "exp": exp, "sub": "u1" }));
    assert!(!is_token_expired(&token));
}

#[test]
fn past_expiry_is_expired() {
    let exp = (OffsetDateTime::now_utc() - Duration::minutes(1)).unix_timestamp();
    let token = make_token(&serde_json::json!({ "exp": exp }));
    assert!(is_token_expired(&token));
}

#[test]
fn expiry_equal_to_now_is_expired() {
    let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
    let token = make_token(&serde_json::json!({ "exp": 1_700_000_000 }));
    assert!(is_token_expired_at(&token, now));
    assert!(!is_token_expired_at(&token, now - Duration::seconds(1)));
}

#[test]
fn malformed_tokens_are_expired() {
    assert!(is_token_expired(""));
    assert!(is_token_expired("not-a-jwt"));
    assert!(is_token_expired("a.b"));
    assert!(is_token_expired("a.!!!.c"));
    assert!(is_token_expired("a.b.c.d"));
}

#[test]
fn token_without_exp_is_expired() {
    let token = make_token(&serde_json::json!({ "sub": "u1" }));
    assert!(is_token_expired(&token));
    assert_eq!(decode_claims(&token).unwrap().sub.as_deref(), Some("u1"));
}

#[test]
fn padded_payload_still_decodes() {
    let header = URL_SAFE.encode(b"{}");
    let body = URL_SAFE.encode(br#"{"exp":4102444800,"iat":1}"#);
    let token = format!("{header}.{body}.sig");
    let claims = decode_claims(&token).unwrap();
    assert_eq!(claims.exp, Some(4_102_444_800));
    assert_eq!(claims.iat, Some(1));
}

#[test]
fn token_expiry_reports_instant() {
    let token = make_token(&serde_json::json!({ "exp": 1_700_000_000 }));
    assert_eq!(token_expiry(&token).unwrap().unix_timestamp(), 1_700_000_000);
}
