//! Input validation for account fields and chat text.

/// Maximum characters of a chat line after sanitization.
pub const MAX_CHAT_LEN: usize = 240;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 16;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 64;

/// Validation failures with messages safe to echo back to the client.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("username must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters")]
    UsernameLength,

    #[error("username must start with a letter and use only letters, digits, and underscore")]
    UsernameCharset,

    #[error("username is reserved")]
    UsernameReserved,

    #[error("password must be {MIN_PASSWORD_LEN}-{MAX_PASSWORD_LEN} characters")]
    PasswordLength,
}

/// Names that cannot be registered, compared case-insensitively.
const RESERVED_NAMES: &[&str] = &["admin", "moderator", "server", "system"];

/// Validates a username's shape. Usernames are stored with their original
/// casing but keyed lowercase, so the charset is restricted to characters
/// that survive the round trip.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(ValidationError::UsernameLength);
    }

    let mut chars = username.chars();
    let first = chars.next().ok_or(ValidationError::UsernameLength)?;
    if !first.is_ascii_alphabetic() {
        return Err(ValidationError::UsernameCharset);
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::UsernameCharset);
    }

    let lower = username.to_ascii_lowercase();
    if RESERVED_NAMES.contains(&lower.as_str()) {
        return Err(ValidationError::UsernameReserved);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(ValidationError::PasswordLength);
    }
    Ok(())
}

/// Strips control characters (chat is single-line, so newlines go too),
/// trims surrounding whitespace, and truncates to [`MAX_CHAT_LEN`]
/// characters.
pub fn sanitize_chat_text(text: &str) -> String {
    let cleaned: String = text.chars().filter(|c| !c.is_control()).collect();
    cleaned.trim().chars().take(MAX_CHAT_LEN).collect()
}
