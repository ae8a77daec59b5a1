//! Error types for the optimus-rs library.
//!
//! Every fallible operation in the engine returns [`Result`]. The variants map
//! onto the failure classes of a run: bad input words, bad configuration,
//! embedding model problems and clustering preconditions. A depth that accepts
//! no clusters is *not* an error; the engine simply advances the threshold.

use std::io;
use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

/// Main result type for optimus operations.
pub type Result<T> = std::result::Result<T, OptimusError>;

/// Error type for all optimus operations.
#[derive(Error, Debug)]
pub enum OptimusError {
    /// I/O related errors (file operations)
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error description
        message: String,
        /// Configuration field that caused the error
        field: Option<String>,
    },

    /// Empty or malformed word lists. Raised before anything is embedded.
    #[error("Input error: {message}")]
    Input {
        /// Error description
        message: String,
    },

    /// Embedding model failed to load or an invalid model was supplied
    #[error("Model error: {message}")]
    Model {
        /// Error description
        message: String,
        /// Model specification or path involved
        model: Option<String>,
    },

    /// Linkage or cluster construction errors
    #[error("Clustering error: {message}")]
    Clustering {
        /// Error description
        message: String,
        /// Additional context
        context: Option<String>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Data format being processed
        data_type: Option<String>,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors for configuration values and tables
    #[error("Validation error: {message}")]
    Validation {
        /// Error description
        message: String,
        /// Field or input that failed validation
        field: Option<String>,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Error description
        message: String,
        /// Additional context
        context: Option<String>,
    },
}

impl OptimusError {
    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new configuration error with field context
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new input error
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Create a new model error
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model {
            message: message.into(),
            model: None,
        }
    }

    /// Create a new model error naming the model involved
    pub fn model_named(message: impl Into<String>, model: impl Into<String>) -> Self {
        Self::Model {
            message: message.into(),
            model: Some(model.into()),
        }
    }

    /// Create a new clustering error
    pub fn clustering(message: impl Into<String>) -> Self {
        Self::Clustering {
            message: message.into(),
            context: None,
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new validation error with field context
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            context: None,
        }
    }

    /// Add context to an existing error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        match &mut self {
            Self::Clustering { context: ctx, .. } | Self::Internal { context: ctx, .. } => {
                *ctx = Some(context.into());
            }
            Self::Io { message, .. }
            | Self::Config { message, .. }
            | Self::Input { message }
            | Self::Model { message, .. }
            | Self::Serialization { message, .. }
            | Self::Validation { message, .. } => {
                *message = format!("{}: {}", context.into(), message);
            }
        }
        self
    }
}

impl From<io::Error> for OptimusError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for OptimusError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            data_type: Some("JSON".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for OptimusError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: format!("YAML serialization failed: {err}"),
            data_type: Some("YAML".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<csv::Error> for OptimusError {
    fn from(err: csv::Error) -> Self {
        Self::Serialization {
            message: format!("CSV processing failed: {err}"),
            data_type: Some("CSV".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<regex::Error> for OptimusError {
    fn from(err: regex::Error) -> Self {
        Self::config(format!("Invalid regular expression: {err}"))
    }
}

impl From<ParseIntError> for OptimusError {
    fn from(err: ParseIntError) -> Self {
        Self::validation(format!("Invalid integer: {err}"))
    }
}

impl From<ParseFloatError> for OptimusError {
    fn from(err: ParseFloatError) -> Self {
        Self::validation(format!("Invalid float: {err}"))
    }
}

/// Result extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error result
    fn context(self, msg: &'static str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<OptimusError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }

    fn context(self, msg: &'static str) -> Result<T> {
        self.map_err(|e| e.into().with_context(msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = OptimusError::config("Invalid configuration");
        assert!(matches!(err, OptimusError::Config { .. }));

        let err = OptimusError::input("No descriptions");
        assert!(matches!(err, OptimusError::Input { .. }));

        let err = OptimusError::model_named("Could not load", "wiki.en.vec");
        assert!(matches!(err, OptimusError::Model { model: Some(_), .. }));
    }

    #[test]
    fn test_error_with_context() {
        let err = OptimusError::clustering("Fewer than two words").with_context("depth 3");

        if let OptimusError::Clustering { context, .. } = err {
            assert_eq!(context, Some("depth 3".to_string()));
        } else {
            panic!("Expected Clustering error");
        }
    }

    #[test]
    fn test_io_context_prefixes_message() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));

        let err = result.context("Failed to read descriptions").unwrap_err();
        match err {
            OptimusError::Io { message, source } => {
                assert!(message.starts_with("Failed to read descriptions"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("Expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_config_field_error() {
        let err = OptimusError::config_field("Invalid value", "stepsize");

        if let OptimusError::Config { message, field } = err {
            assert_eq!(message, "Invalid value");
            assert_eq!(field, Some("stepsize".to_string()));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_from_regex_error_is_config() {
        let regex_err = regex::Regex::new("(unclosed").unwrap_err();
        let err: OptimusError = regex_err.into();
        assert!(matches!(err, OptimusError::Config { .. }));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<i32>("invalid json").unwrap_err();
        let err: OptimusError = json_err.into();

        if let OptimusError::Serialization { data_type, .. } = err {
            assert_eq!(data_type, Some("JSON".to_string()));
        } else {
            panic!("Expected Serialization error");
        }
    }

    #[test]
    fn test_from_parse_float_error() {
        let parse_err = "not_a_float".parse::<f64>().unwrap_err();
        let err: OptimusError = parse_err.into();
        assert!(matches!(err, OptimusError::Validation { .. }));
    }

    #[test]
    fn test_error_display_formatting() {
        let err = OptimusError::model_named("file is not a vector table", "model.bin");
        let display = format!("{}", err);
        assert!(display.contains("Model error"));
        assert!(display.contains("vector table"));
    }
}
