//! Pure helpers shared by the session layer, forms and the CLI.
//!
//! SYSTEM CONTEXT
//! ==============
//! Nothing in here performs I/O; every function is deterministic given its
//! inputs (and an explicit `now` where time matters) so it is unit-tested
//! without a backend.

pub mod text;
pub mod token;
pub mod validation;

pub use text::{excerpt, reading_time_minutes, slugify};
pub use token::{decode_claims, is_token_expired, is_token_expired_at, token_expiry, TokenClaims};
