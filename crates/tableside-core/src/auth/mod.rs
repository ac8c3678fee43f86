//! Authentication module for managing the client's session token.
//!
//! This module provides:
//! - `SessionManager`: token state, bearer requests, server-driven rotation
//!   and coalesced refresh
//! - `TokenStore`: durable token storage (file, OS keychain, memory)
//! - `TokenInfo`: expiry details decoded from unverified token claims
//!
//! Tokens are JWTs issued by the restaurant API. The client never verifies
//! signatures; it only reads `exp` and `sub` to decide when to log in again.

pub mod error;
pub mod password;
pub mod session;
pub mod store;
pub mod token;

pub use error::SessionError;
pub use password::{validate_password, PasswordError};
pub use session::{SessionManager, NEW_TOKEN_HEADER, WHOAMI_PATH};
pub use store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
pub use token::{Claims, TokenInfo};
