//! Error types for palette extraction.

use thiserror::Error;

/// Result type alias for palette extraction operations
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Failures surfaced by the sampler, the extractor and configuration loading.
///
/// Hitting the iteration cap is not represented here: it still yields a
/// palette and is reported through [`crate::Convergence`].
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The decoded image cannot be sampled
    #[error("Invalid input image: {reason}")]
    InvalidInput { reason: String },

    /// A parameter is outside its valid range
    #[error("Invalid parameter: {parameter} = {value} ({reason})")]
    InvalidParameter {
        parameter: &'static str,
        value: String,
        reason: String,
    },

    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ExtractionError {
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_parameter(
        parameter: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// True when the image itself was rejected
    pub fn is_input_error(&self) -> bool {
        matches!(self, ExtractionError::InvalidInput { .. })
    }

    /// True when a caller-supplied parameter was rejected
    pub fn is_parameter_error(&self) -> bool {
        matches!(self, ExtractionError::InvalidParameter { .. })
    }

    /// Short description suitable for showing to an end user
    pub fn user_message(&self) -> String {
        match self {
            ExtractionError::InvalidInput { .. } => {
                "The image is empty or uses an unsupported pixel layout.".to_string()
            }
            ExtractionError::InvalidParameter { parameter, value, .. } => {
                format!("The setting `{parameter}` cannot be {value}.")
            }
            ExtractionError::Config { message, .. } => {
                format!("Could not load settings: {message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_helpers() {
        let input = ExtractionError::invalid_input("zero width");
        assert!(input.is_input_error());
        assert!(!input.is_parameter_error());

        let param = ExtractionError::invalid_parameter("num_colors", 0, "must be positive");
        assert!(param.is_parameter_error());
        assert_eq!(
            param.to_string(),
            "Invalid parameter: num_colors = 0 (must be positive)"
        );
        assert!(param.user_message().contains("num_colors"));
    }

    #[test]
    fn config_error_keeps_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = ExtractionError::config("cannot read palette.json", io);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("palette.json"));
    }
}
