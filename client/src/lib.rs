//! Client SDK for the portfolio/blog backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! Pages and tools build one [`ApiClient`], wrap it in an
//! [`AuthSessionManager`], and pull remote data through [`Resource`] values.
//! Nothing here is a global: callers construct the services once and share
//! them by `Arc`/clone.

pub mod config;
pub mod error;
pub mod net;
pub mod state;
pub mod storage;
pub mod util;

pub use config::ClientConfig;
pub use error::{ClientError, ErrorKind};
pub use net::api::ApiClient;
pub use net::AuthApi;
pub use state::auth::{AuthPhase, AuthSessionManager, AuthSnapshot, GuardDecision, Session, SessionPolicy};
pub use state::fetch::{FetchState, Resource};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore};
