use thiserror::Error;

/// Errors produced while reading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid port value '{value}': {source}")]
    PortParseError {
        value: String,
        source: std::num::ParseIntError,
    },

    #[error("port must be non-zero, got '{value}'")]
    InvalidPort { value: String },

    #[error("invalid bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },

    #[error("invalid value '{value}' for {var}: expected one of {expected}")]
    InvalidChoice {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid numeric value '{value}' for {var}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("invalid boolean value '{value}' for {var}: expected true/false/1/0")]
    InvalidBool { var: &'static str, value: String },

    #[error("{var} is required when {reason}")]
    MissingRequired { var: &'static str, reason: &'static str },

    #[error("the local embedding provider is forbidden outside development")]
    LocalProviderForbidden,

    #[error("embedding dimension invalid: {0}")]
    InvalidDimension(#[from] crate::constants::DimValidationError),
}
