//! Error types shared by loop construction, evaluation and rendering

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FieldError>;

#[derive(Debug, Error)]
pub enum FieldError {
    /// Rejected before any computation starts
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("template rendering failed: {0}")]
    Template(#[from] minijinja::Error),
}

impl FieldError {
    pub fn invalid(message: impl Into<String>) -> Self {
        FieldError::InvalidInput(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FieldError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, FieldError::InvalidInput(_))
    }
}

/// Fail with `InvalidInput` unless `value` is finite and strictly positive.
pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FieldError::invalid(format!(
            "{} must be a positive finite number, got {}",
            name, value
        )))
    }
}

pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FieldError::invalid(format!("{} must be finite, got {}", name, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_check() {
        assert!(ensure_positive("radius", 0.3).is_ok());
        assert!(ensure_positive("radius", 0.0).unwrap_err().is_invalid_input());
        assert!(ensure_positive("radius", -1.0).is_err());
        assert!(ensure_positive("radius", f64::NAN).is_err());
        assert!(ensure_positive("radius", f64::INFINITY).is_err());
    }

    #[test]
    fn test_message_names_the_parameter() {
        let err = ensure_finite("current", f64::NAN).unwrap_err();
        assert!(err.to_string().contains("current"));
    }
}
