//! REST client for the portfolio backend.
//!
//! ERROR HANDLING
//! ==============
//! Every call funnels through [`ApiClient::send`]: transport failures become
//! [`ClientError::Network`], non-2xx responses become [`ClientError::Api`]
//! with the server's `message`/`error` field when present, and the
//! `{ "data": T }` envelope is unwrapped before returning.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::RwLock;

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::AuthApi;
use super::types::{
    AnalyticsSummary, ApiUser, BlogPost, Category, Contact, ContactStatus, ContactSubmission, Envelope, LoginPayload,
    LoginRequest, Page, PageView, PostDraft, PostQuery, Project, ProjectDraft, RawPage, Tag,
};
use crate::config::ClientConfig;
use crate::error::ClientError;

// =============================================================================
// PATHS
// =============================================================================

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Percent-encode a single path segment (RFC 3986 unreserved set passes through).
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push('%');
            out.push(char::from(HEX[usize::from(byte >> 4)]));
            out.push(char::from(HEX[usize::from(byte & 0x0F)]));
        }
    }
    out
}

fn post_path(slug_or_id: &str) -> String {
    format!("/blog/posts/{}", encode_segment(slug_or_id))
}

fn project_path(id: &str) -> String {
    format!("/projects/{}", encode_segment(id))
}

fn contact_path(id: &str) -> String {
    format!("/contact/{}", encode_segment(id))
}

fn request_failed_message(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => reason.to_owned(),
        None => format!("Request failed with status {}", status.as_u16()),
    }
}

/// Pull a human-readable message out of an error body: `message`, then
/// `error` (string or `{ message }`), else the status reason phrase.
fn extract_error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let from_body = parsed.as_ref().and_then(|v| {
        v.get("message")
            .and_then(serde_json::Value::as_str)
            .or_else(|| v.get("error").and_then(serde_json::Value::as_str))
            .or_else(|| v.get("error").and_then(|e| e.get("message")).and_then(serde_json::Value::as_str))
            .map(str::to_owned)
    });
    from_body
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| request_failed_message(status))
}

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP client bound to one backend base URL.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    /// Build a client with the configured base URL and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Network`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeouts.request())
            .connect_timeout(config.timeouts.connect())
            .build()
            .map_err(|e| ClientError::Network(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            token: RwLock::new(None),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|slot| slot.as_ref().cloned())
    }

    fn builder(&self, method: Method, path: &str) -> RequestBuilder {
        self.builder_as(method, path, self.token().as_deref())
    }

    /// Request builder authenticated with an explicit token instead of the
    /// client's current one.
    fn builder_as(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%method, %path, "api request");
        let req = self.http.request(method, url);
        match token {
            Some(token) => req.header(AUTHORIZATION, format!("Bearer {token}")),
            None => req,
        }
    }

    /// Execute a request and decode the raw body as `T`.
    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let text = self.send_text(req).await?;
        serde_json::from_str(&text).map_err(ClientError::invalid_body)
    }

    async fn send_text(&self, req: RequestBuilder) -> Result<String, ClientError> {
        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = extract_error_message(status, &text);
            tracing::debug!(status = status.as_u16(), %message, "api request rejected");
            return Err(ClientError::Api { status: status.as_u16(), message });
        }
        Ok(text)
    }

    /// Execute a request and unwrap the `{ data }` envelope.
    async fn send_data<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        self.send::<Envelope<T>>(req).await.map(|env| env.data)
    }

    async fn send_page<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Page<T>, ClientError> {
        self.send::<RawPage<T>>(req).await.map(Page::from)
    }

    /// Execute a request whose body, if any, is irrelevant.
    async fn send_unit(&self, req: RequestBuilder) -> Result<(), ClientError> {
        self.send_text(req).await.map(|_| ())
    }

    // -------------------------------------------------------------------------
    // Blog
    // -------------------------------------------------------------------------

    /// `GET /blog/posts` with optional filters.
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn list_posts(&self, query: &PostQuery) -> Result<Page<BlogPost>, ClientError> {
        let req = self.builder(Method::GET, "/blog/posts").query(&query.to_query_pairs());
        self.send_page(req).await
    }

    /// `GET /blog/posts/{slug}`.
    ///
    /// # Errors
    ///
    /// Network or API failure (404 for an unknown slug).
    pub async fn get_post(&self, slug: &str) -> Result<BlogPost, ClientError> {
        self.send_data(self.builder(Method::GET, &post_path(slug))).await
    }

    /// `POST /blog/posts`.
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn create_post(&self, draft: &PostDraft) -> Result<BlogPost, ClientError> {
        self.send_data(self.builder(Method::POST, "/blog/posts").json(draft)).await
    }

    /// `PUT /blog/posts/{id}`.
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn update_post(&self, id: &str, draft: &PostDraft) -> Result<BlogPost, ClientError> {
        self.send_data(self.builder(Method::PUT, &post_path(id)).json(draft)).await
    }

    /// `DELETE /blog/posts/{id}`.
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn delete_post(&self, id: &str) -> Result<(), ClientError> {
        self.send_unit(self.builder(Method::DELETE, &post_path(id))).await
    }

    /// `GET /blog/categories`.
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn list_categories(&self) -> Result<Vec<Category>, ClientError> {
        self.send_data(self.builder(Method::GET, "/blog/categories")).await
    }

    /// `GET /blog/tags`.
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, ClientError> {
        self.send_data(self.builder(Method::GET, "/blog/tags")).await
    }

    // -------------------------------------------------------------------------
    // Projects
    // -------------------------------------------------------------------------

    /// `GET /projects`.
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn list_projects(&self) -> Result<Vec<Project>, ClientError> {
        self.send_data(self.builder(Method::GET, "/projects")).await
    }

    /// `GET /projects/{id}`.
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn get_project(&self, id: &str) -> Result<Project, ClientError> {
        self.send_data(self.builder(Method::GET, &project_path(id))).await
    }

    /// `POST /projects`.
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn create_project(&self, draft: &ProjectDraft) -> Result<Project, ClientError> {
        self.send_data(self.builder(Method::POST, "/projects").json(draft)).await
    }

    /// `PUT /projects/{id}`.
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn update_project(&self, id: &str, draft: &ProjectDraft) -> Result<Project, ClientError> {
        self.send_data(self.builder(Method::PUT, &project_path(id)).json(draft)).await
    }

    /// `DELETE /projects/{id}`.
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn delete_project(&self, id: &str) -> Result<(), ClientError> {
        self.send_unit(self.builder(Method::DELETE, &project_path(id))).await
    }

    // -------------------------------------------------------------------------
    // Contacts
    // -------------------------------------------------------------------------

    /// `POST /contact` from the public contact form.
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn submit_contact(&self, form: &ContactSubmission) -> Result<(), ClientError> {
        self.send_unit(self.builder(Method::POST, "/contact").json(form)).await
    }

    /// `GET /contact` (admin).
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn list_contacts(&self) -> Result<Page<Contact>, ClientError> {
        self.send_page(self.builder(Method::GET, "/contact")).await
    }

    /// `PATCH /contact/{id}` to move a submission through its workflow.
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn update_contact_status(&self, id: &str, status: ContactStatus) -> Result<Contact, ClientError> {
        let body = serde_json::json!({ "status": status });
        self.send_data(self.builder(Method::PATCH, &contact_path(id)).json(&body)).await
    }

    /// `DELETE /contact/{id}`.
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn delete_contact(&self, id: &str) -> Result<(), ClientError> {
        self.send_unit(self.builder(Method::DELETE, &contact_path(id))).await
    }

    // -------------------------------------------------------------------------
    // Analytics
    // -------------------------------------------------------------------------

    /// `POST /analytics/track`.
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn track_page_view(&self, view: &PageView) -> Result<(), ClientError> {
        self.send_unit(self.builder(Method::POST, "/analytics/track").json(view)).await
    }

    /// `GET /analytics/summary` (admin).
    ///
    /// # Errors
    ///
    /// Network or API failure.
    pub async fn analytics_summary(&self) -> Result<AnalyticsSummary, ClientError> {
        self.send_data(self.builder(Method::GET, "/analytics/summary")).await
    }
}

#[async_trait::async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginPayload, ClientError> {
        let body = LoginRequest { email, password };
        self.send_data(self.builder(Method::POST, "/auth/login").json(&body)).await
    }

    async fn current_user(&self) -> Result<ApiUser, ClientError> {
        self.send_data(self.builder(Method::GET, "/auth/me")).await
    }

    async fn logout(&self, token: &str) -> Result<(), ClientError> {
        self.send_unit(self.builder_as(Method::POST, "/auth/logout", Some(token))).await
    }

    fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }
}
