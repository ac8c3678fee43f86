//! Tableside core library.
//!
//! Client-side plumbing for the Tableside restaurant API: the session token
//! lifecycle (storage, expiry checks, server-driven rotation and coalesced
//! refresh), the authenticated API client, and configuration.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{SessionError, SessionManager, TokenInfo, TokenStore};
pub use config::Config;
