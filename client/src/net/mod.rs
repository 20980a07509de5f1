//! Networking: the REST client and its wire schema.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` is the single HTTP access point to the backend and `types` defines
//! the wire schema. The session layer only depends on the narrow [`AuthApi`]
//! seam so it can be driven by a mock backend in tests.

pub mod api;
pub mod types;

use crate::error::ClientError;
use types::{ApiUser, LoginPayload};

/// Backend operations the session manager needs.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a user record and bearer token.
    async fn login(&self, email: &str, password: &str) -> Result<LoginPayload, ClientError>;

    /// Verify the current bearer token by fetching its user.
    async fn current_user(&self) -> Result<ApiUser, ClientError>;

    /// Tell the backend the session for `token` is over. Callers treat
    /// failure as benign.
    async fn logout(&self, token: &str) -> Result<(), ClientError>;

    /// Replace the bearer token attached to later requests; `None` removes it.
    fn set_token(&self, token: Option<String>);
}
