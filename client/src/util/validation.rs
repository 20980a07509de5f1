//! Client-side form validation.
//!
//! ERROR HANDLING
//! ==============
//! Validators return every failing field at once so forms can render inline
//! messages. Nothing here is sent over the network; callers that need an
//! error value use [`FieldErrors::into_error`].

#[cfg(test)]
#[path = "validation_test.rs"]
mod validation_test;

use std::collections::BTreeMap;

use crate::error::ClientError;
use crate::net::types::{ContactSubmission, PostDraft, ProjectDraft};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_TITLE_LEN: usize = 200;
pub const MIN_CONTACT_MESSAGE_LEN: usize = 10;

/// Field name to message, ordered by field name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// `Ok(())` when no field failed.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Collapse to a single [`ClientError::Validation`] for the first field.
    #[must_use]
    pub fn into_error(self) -> ClientError {
        match self.0.into_iter().next() {
            Some((field, message)) => ClientError::validation(field, message),
            None => ClientError::validation("form", "invalid input"),
        }
    }
}

/// Loose structural email check: one `@`, non-empty local part, dotted domain
/// without empty labels, no whitespace.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

fn is_http_url(url: &str) -> bool {
    let url = url.trim();
    (url.starts_with("http://") && url.len() > "http://".len())
        || (url.starts_with("https://") && url.len() > "https://".len())
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.trim().is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(email) {
        errors.add("email", "Please enter a valid email address");
    }
}

/// # Errors
///
/// Returns the failing fields when email or password is missing/malformed.
pub fn validate_login(email: &str, password: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    check_email(&mut errors, email);
    if password.is_empty() {
        errors.add("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", format!("Password must be at least {MIN_PASSWORD_LEN} characters"));
    }
    errors.into_result()
}

/// # Errors
///
/// Returns the failing fields of the public contact form.
pub fn validate_contact(form: &ContactSubmission) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    if form.name.trim().chars().count() < 2 {
        errors.add("name", "Name must be at least 2 characters");
    }
    check_email(&mut errors, &form.email);
    if form.subject.trim().is_empty() {
        errors.add("subject", "Subject is required");
    }
    if form.message.trim().chars().count() < MIN_CONTACT_MESSAGE_LEN {
        errors.add("message", format!("Message must be at least {MIN_CONTACT_MESSAGE_LEN} characters"));
    }
    errors.into_result()
}

/// # Errors
///
/// Returns the failing fields of the blog post editor.
pub fn validate_post(draft: &PostDraft) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    let title = draft.title.trim();
    if title.is_empty() {
        errors.add("title", "Title is required");
    } else if title.chars().count() > MAX_TITLE_LEN {
        errors.add("title", format!("Title must be at most {MAX_TITLE_LEN} characters"));
    }
    if draft.content.trim().is_empty() {
        errors.add("content", "Content is required");
    }
    if let Some(slug) = draft.slug.as_deref()
        && (slug.is_empty() || super::text::slugify(slug) != slug)
    {
        errors.add("slug", "Slug may only contain lowercase letters, digits and single hyphens");
    }
    errors.into_result()
}

/// # Errors
///
/// Returns the failing fields of the project editor.
pub fn validate_project(draft: &ProjectDraft) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    if draft.title.trim().is_empty() {
        errors.add("title", "Title is required");
    }
    if draft.description.trim().is_empty() {
        errors.add("description", "Description is required");
    }
    for (field, url) in [("github_url", &draft.github_url), ("live_url", &draft.live_url), ("image_url", &draft.image_url)]
    {
        if let Some(url) = url
            && !is_http_url(url)
        {
            errors.add(field, "URL must start with http:// or https://");
        }
    }
    errors.into_result()
}
