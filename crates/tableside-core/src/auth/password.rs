//! Password rules enforced by the server at registration.
//!
//! Checking them locally lets the CLI reject a bad password before a round
//! trip.

use thiserror::Error;

/// Longest password the server's hasher accepts, in bytes.
const MAX_PASSWORD_BYTES: usize = 72;

const MIN_PASSWORD_CHARS: usize = 8;

const SPECIAL_CHARS: &str = "!@#$%^&*()-+";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password must be less than 72 bytes long")]
    TooLong,

    #[error("Password must be at least 8 characters long")]
    TooShort,

    #[error("Password must not contain spaces")]
    ContainsSpace,

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one digit")]
    MissingDigit,

    #[error("Password must contain at least one special character (!@#$%^&*()-+)")]
    MissingSpecial,
}

/// Check `password` against the registration rules, reporting the first
/// rule it breaks.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(PasswordError::TooLong);
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(PasswordError::TooShort);
    }
    if password.contains(' ') {
        return Err(PasswordError::ContainsSpace);
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(PasswordError::MissingUppercase);
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(PasswordError::MissingLowercase);
    }
    // Any Unicode digit counts, as it does on the server.
    if !password.chars().any(char::is_numeric) {
        return Err(PasswordError::MissingDigit);
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(PasswordError::MissingSpecial);
    }
    Ok(())
}
