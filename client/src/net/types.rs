//! Wire DTOs for the backend REST API and their local mappings.
//!
//! DESIGN
//! ======
//! The backend may omit optional fields and is inconsistent about whether ids
//! are strings or integers. Each external type is decoded leniently here and,
//! where the UI needs derived values, mapped once by a single function
//! (`map_user`, `PostDraft::with_derived_fields`) so defaulting policy lives
//! in one place.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::util::text::{excerpt, slugify};

const DRAFT_EXCERPT_CHARS: usize = 160;

// =============================================================================
// ENVELOPES
// =============================================================================

/// Every backend response body is wrapped as `{ "data": T }`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

/// One page of a list endpoint.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: u64,
    pub pagination: Pagination,
}

#[derive(Deserialize)]
pub(crate) struct RawPage<T> {
    data: Vec<T>,
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

impl<T> From<RawPage<T>> for Page<T> {
    fn from(raw: RawPage<T>) -> Self {
        let count = raw.count.unwrap_or(raw.data.len() as u64);
        let pagination = raw.pagination.unwrap_or(Pagination {
            page: 1,
            limit: u32::try_from(count).unwrap_or(u32::MAX),
            total: count,
            total_pages: 1,
        });
        Self { items: raw.data, count, pagination }
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        _ => Err(D::Error::custom("expected string or integer id")),
    }
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(D::Error::custom("expected string or integer id")),
    }
}

// =============================================================================
// USERS & AUTH
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    #[default]
    Viewer,
}

impl Role {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("admin") => Self::Admin,
            Some("editor") => Self::Editor,
            _ => Self::Viewer,
        }
    }
}

/// User record exactly as the backend sends it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "avatarUrl")]
    pub avatar: Option<String>,
}

/// Identity of the signed-in user as the rest of the client sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub avatar_url: Option<String>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Map a backend user into a [`User`].
///
/// Display name falls back through `displayName`, `name`,
/// `firstName lastName`, the email local part, and finally `"User"`.
#[must_use]
pub fn map_user(raw: ApiUser) -> User {
    let full_name = [non_blank(raw.first_name.as_deref()), non_blank(raw.last_name.as_deref())]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let email_local = raw.email.split('@').next().unwrap_or_default();

    let display_name = non_blank(raw.display_name.as_deref())
        .or_else(|| non_blank(raw.name.as_deref()))
        .or_else(|| non_blank(Some(full_name.as_str())))
        .or_else(|| non_blank(Some(email_local)))
        .unwrap_or("User")
        .to_owned();

    User {
        id: raw.id,
        role: Role::parse(raw.role.as_deref()),
        avatar_url: non_blank(raw.avatar.as_deref()).map(str::to_owned),
        email: raw.email,
        display_name,
    }
}

/// Login form input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    pub user: ApiUser,
    pub token: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

// =============================================================================
// BLOG
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub post_count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub views: u64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Create/update payload for the blog editor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub status: PostStatus,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_id", default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PostDraft {
    /// Fill in the slug from the title and the excerpt from the content when
    /// the author left them blank.
    #[must_use]
    pub fn with_derived_fields(mut self) -> Self {
        if non_blank(self.slug.as_deref()).is_none() {
            self.slug = Some(slugify(&self.title));
        }
        if non_blank(self.excerpt.as_deref()).is_none() {
            self.excerpt = Some(excerpt(&self.content, DRAFT_EXCERPT_CHARS));
        }
        self
    }
}

/// Filters for the post list endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PostQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub status: Option<PostStatus>,
}

impl PostQuery {
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(category) = non_blank(self.category.as_deref()) {
            pairs.push(("category", category.to_owned()));
        }
        if let Some(tag) = non_blank(self.tag.as_deref()) {
            pairs.push(("tag", tag.to_owned()));
        }
        if let Some(search) = non_blank(self.search.as_deref()) {
            pairs.push(("search", search.to_owned()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_owned()));
        }
        pairs
    }
}

// =============================================================================
// PROJECTS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub live_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

// =============================================================================
// CONTACTS
// =============================================================================

/// Public contact form payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    New,
    Read,
    Replied,
    Archived,
}

/// Contact submission as listed in the admin dashboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub status: ContactStatus,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

// =============================================================================
// ANALYTICS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    pub visitor_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStat {
    pub path: String,
    pub views: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    #[serde(default)]
    pub total_views: u64,
    #[serde(default)]
    pub unique_visitors: u64,
    #[serde(default)]
    pub top_pages: Vec<PageStat>,
}
