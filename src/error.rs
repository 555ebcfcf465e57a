use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Provider failure: {operation}{}", format_reason(.reason))]
    ProviderFailure {
        operation: String,
        reason: Option<String>,
    },

    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

fn format_reason(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" ({})", r))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_failure_without_reason() {
        let err = GatewayError::ProviderFailure {
            operation: "Failed to retrieve latest rates".to_string(),
            reason: None,
        };
        assert_eq!(
            err.to_string(),
            "Provider failure: Failed to retrieve latest rates"
        );
    }

    #[test]
    fn test_provider_failure_with_reason() {
        let err = GatewayError::ProviderFailure {
            operation: "Conversion failed".to_string(),
            reason: Some("invalid_from_currency".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Provider failure: Conversion failed (invalid_from_currency)"
        );
    }
}
