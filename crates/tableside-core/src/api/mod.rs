//! REST API client module for the restaurant backend.
//!
//! This module provides the `ApiClient` for authenticating against the
//! restaurant API and making requests on behalf of the logged-in user.
//!
//! The API uses JWT bearer token authentication. Tokens are issued by
//! `/api/v1/auth/token` and may be rotated by any response through the
//! `X-New-Token` header.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
