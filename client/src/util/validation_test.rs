use super::*;
use crate::error::ErrorKind;

fn contact() -> ContactSubmission {
    ContactSubmission {
        name: "Ada".into(),
        email: "ada@example.com".into(),
        subject: "Hello".into(),
        message: "I would like to hire you.".into(),
    }
}

fn post() -> PostDraft {
    PostDraft { title: "Hello World".into(), content: "Body".into(), ..PostDraft::default() }
}

// =============================================================
// email
// =============================================================

#[test]
fn accepts_ordinary_emails() {
    assert!(is_valid_email("ada@example.com"));
    assert!(is_valid_email("  first.last+tag@mail.example.co.uk "));
}

#[test]
fn rejects_malformed_emails() {
    for bad in ["", "ada", "@example.com", "ada@", "ada@example", "ada@@example.com", "ada@exa mple.com", "ada@example..com"] {
        assert!(!is_valid_email(bad), "{bad:?} should be rejected");
    }
}

// =============================================================
// login
// =============================================================

#[test]
fn login_ok() {
    assert_eq!(validate_login("ada@example.com", "secret1"), Ok(()));
}

#[test]
fn login_reports_every_field() {
    let errors = validate_login("", "").unwrap_err();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors.get("email"), Some("Email is required"));
    assert_eq!(errors.get("password"), Some("Password is required"));
}

#[test]
fn login_short_password() {
    let errors = validate_login("ada@example.com", "12345").unwrap_err();
    assert_eq!(errors.get("password"), Some("Password must be at least 6 characters"));
    assert_eq!(errors.get("email"), None);
}

#[test]
fn login_malformed_email() {
    let errors = validate_login("not-an-email", "secret1").unwrap_err();
    assert_eq!(errors.get("email"), Some("Please enter a valid email address"));
}

// =============================================================
// contact
// =============================================================

#[test]
fn contact_ok() {
    assert_eq!(validate_contact(&contact()), Ok(()));
}

#[test]
fn contact_minimums() {
    let form = ContactSubmission { name: " A ".into(), subject: "  ".into(), message: "too short".into(), ..contact() };
    let errors = validate_contact(&form).unwrap_err();
    let fields: Vec<&str> = errors.iter().map(|(f, _)| f).collect();
    assert_eq!(fields, vec!["message", "name", "subject"]);
}

// =============================================================
// post
// =============================================================

#[test]
fn post_ok_with_and_without_slug() {
    assert_eq!(validate_post(&post()), Ok(()));
    assert_eq!(validate_post(&PostDraft { slug: Some("hello-world".into()), ..post() }), Ok(()));
}

#[test]
fn post_rejects_non_canonical_slug() {
    for slug in ["Hello World", "hello--world", "-hello", ""] {
        let errors = validate_post(&PostDraft { slug: Some(slug.into()), ..post() }).unwrap_err();
        assert!(errors.get("slug").is_some(), "{slug:?} should be rejected");
    }
}

#[test]
fn post_title_bounds() {
    let errors = validate_post(&PostDraft { title: "   ".into(), ..post() }).unwrap_err();
    assert_eq!(errors.get("title"), Some("Title is required"));

    let long = "x".repeat(MAX_TITLE_LEN + 1);
    let errors = validate_post(&PostDraft { title: long, ..post() }).unwrap_err();
    assert_eq!(errors.get("title"), Some("Title must be at most 200 characters"));

    assert_eq!(validate_post(&PostDraft { title: "é".repeat(MAX_TITLE_LEN), ..post() }), Ok(()));
}

// =============================================================
// project
// =============================================================

#[test]
fn project_urls_must_be_http() {
    let draft = ProjectDraft {
        title: "Site".into(),
        description: "Portfolio".into(),
        github_url: Some("https://github.com/ada/site".into()),
        live_url: Some("ftp://example.com".into()),
        image_url: Some("https://".into()),
        ..ProjectDraft::default()
    };
    let errors = validate_project(&draft).unwrap_err();
    assert_eq!(errors.get("github_url"), None);
    assert!(errors.get("live_url").is_some());
    assert!(errors.get("image_url").is_some());
}

#[test]
fn project_requires_title_and_description() {
    let errors = validate_project(&ProjectDraft::default()).unwrap_err();
    assert_eq!(errors.len(), 2);
}

// =============================================================
// FieldErrors
// =============================================================

#[test]
fn first_error_wins_per_field() {
    let mut errors = FieldErrors::default();
    errors.add("email", "first");
    errors.add("email", "second");
    assert_eq!(errors.get("email"), Some("first"));
}

#[test]
fn into_error_uses_first_field() {
    let errors = validate_login("", "secret1").unwrap_err();
    let err = errors.into_error();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.user_message(), "Email is required");
    assert_eq!(err, ClientError::Validation { field: "email".into(), message: "Email is required".into() });
}
