use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] dcfdesk_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Config(#[from] dcfdesk_core::ConfigError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] dcfdesk_core::HttpError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Serialization(_) => 4,
            Self::Config(_) => 5,
            Self::Transport(_) => 10,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_five() {
        let error = CliError::from(dcfdesk_core::ConfigError::Invalid(String::from("x")));
        assert_eq!(error.exit_code(), 5);
    }

    #[test]
    fn bad_symbol_is_a_usage_error() {
        let error = CliError::from(dcfdesk_core::ValidationError::EmptySymbol);
        assert_eq!(error.exit_code(), 2);
    }
}
