//! Entry key validation utilities

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::KbError;

/// Maximum length for entry keys (source URLs or slugs)
pub const MAX_ENTRY_KEY_LENGTH: usize = 2048;

/// Keys must contain no whitespace or control characters
static ENTRY_KEY_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s\p{Cc}]+$").unwrap());

/// Validate an entry identity key
pub fn validate_entry_key(key: &str) -> Result<(), KbError> {
    if key.is_empty() {
        return Err(KbError::invalid_input("entry key cannot be empty"));
    }

    if key.len() > MAX_ENTRY_KEY_LENGTH {
        return Err(KbError::invalid_input(format!(
            "entry key too long: {} bytes (max {})",
            key.len(),
            MAX_ENTRY_KEY_LENGTH
        )));
    }

    if !ENTRY_KEY_PATTERN.is_match(key) {
        return Err(KbError::invalid_input(format!(
            "invalid entry key '{key}': must not contain whitespace or control characters"
        )));
    }

    Ok(())
}
