//! Data models for the restaurant API's authentication endpoints.
//!
//! These mirror the JSON the server returns from `/api/v1/auth/*`.

pub mod user;

pub use user::{Gender, RegisterRequest, RegisterResponse, TokenResponse, UserResponse, UserRole};
