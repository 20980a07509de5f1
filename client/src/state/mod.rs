//! Client-side state: the auth session and async resource loads.
//!
//! DESIGN
//! ======
//! Both modules publish immutable snapshots through `tokio::sync::watch` and
//! keep a single writer per piece of state, so observers never race a
//! mutation.

pub mod auth;
pub mod fetch;
