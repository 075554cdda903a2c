use thiserror::Error;

/// All errors that can occur in autodetect-core.
#[derive(Debug, Error)]
pub enum AutodetectError {
    #[error("No task with order number: {0}")]
    UnknownOrderNumber(usize),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl AutodetectError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::UnknownOrderNumber(_) => ExitCode::NotFound,
            Self::ConfigError(_) | Self::TomlParse(_) | Self::Json(_) => ExitCode::InvalidArgs,
            Self::Io(_) | Self::TomlSerialize(_) => ExitCode::GeneralError,
        }
    }
}

/// Exit codes used by the CLI.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
    NetworkError = 6,
}

pub type Result<T> = std::result::Result<T, AutodetectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_order_maps_to_not_found() {
        let err = AutodetectError::UnknownOrderNumber(7);
        assert_eq!(err.exit_code(), ExitCode::NotFound);
        assert_eq!(err.to_string(), "No task with order number: 7");
    }

    #[test]
    fn test_config_error_maps_to_invalid_args() {
        let err = AutodetectError::ConfigError("bad".into());
        assert_eq!(err.exit_code() as i32, 3);
    }
}
