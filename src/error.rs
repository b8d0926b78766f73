//! Crate error types

use thiserror::Error;

/// Core errors for the KB engines
///
/// Every fallible operation aborts with one of these; the engines never
/// return partial diffs or partial rankings.
#[derive(Debug, Error)]
pub enum KbError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl KbError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_error() {
        let error = KbError::invalid_input("duplicate entry key 'faq-1'");
        assert_eq!(
            error.to_string(),
            "Invalid input: duplicate entry key 'faq-1'"
        );
    }

    #[test]
    fn test_configuration_error() {
        let error = KbError::configuration("exact weight must be positive");
        assert_eq!(
            error.to_string(),
            "Configuration error: exact weight must be positive"
        );
    }
}
