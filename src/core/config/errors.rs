//! Configuration error types and validation traits.

use std::path::Path;
use thiserror::Error;

/// Errors raised while validating configuration values.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Batch size must be greater than zero.
    #[error("batch size must be greater than 0")]
    InvalidBatchSize,

    /// A referenced file or directory does not exist.
    #[error("path does not exist: {path}")]
    PathNotFound { path: std::path::PathBuf },

    /// A probability is outside `[0, 1]`.
    #[error("probability for '{name}' must be within [0, 1], got {value}")]
    InvalidProbability { name: String, value: f64 },

    /// A `(low, high)` range has `low > high` or a non-finite bound.
    #[error("invalid range for '{name}': ({low}, {high})")]
    InvalidRange { name: String, low: f64, high: f64 },

    /// Any other invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// A trait for validating configuration parameters.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Checks that the batch size is greater than 0.
    fn validate_batch_size(&self, batch_size: usize) -> Result<(), ConfigError> {
        if batch_size == 0 {
            Err(ConfigError::InvalidBatchSize)
        } else {
            Ok(())
        }
    }

    /// Checks that `path` exists and is a regular file.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to validate.
    ///
    /// # Returns
    ///
    /// A Result indicating success or a ConfigError if validation fails.
    fn validate_file_path(&self, path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            Err(ConfigError::PathNotFound {
                path: path.to_path_buf(),
            })
        } else if !path.is_file() {
            Err(ConfigError::InvalidConfig {
                message: format!("not a file: {}", path.display()),
            })
        } else {
            Ok(())
        }
    }

    /// Checks that `path` exists and is a directory.
    fn validate_dir_path(&self, path: &Path) -> Result<(), ConfigError> {
        if !path.is_dir() {
            Err(ConfigError::PathNotFound {
                path: path.to_path_buf(),
            })
        } else {
            Ok(())
        }
    }
}

/// Checks that a probability lies in `[0, 1]`.
pub fn validate_probability(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidProbability {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

/// Checks that `(low, high)` is finite and ordered.
pub fn validate_range(name: &str, (low, high): (f64, f64)) -> Result<(), ConfigError> {
    if !low.is_finite() || !high.is_finite() || low > high {
        return Err(ConfigError::InvalidRange {
            name: name.to_string(),
            low,
            high,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_probability_bounds() {
        assert!(validate_probability("p", 0.0).is_ok());
        assert!(validate_probability("p", 1.0).is_ok());
        assert!(matches!(
            validate_probability("p", 1.5),
            Err(ConfigError::InvalidProbability { .. })
        ));
        assert!(validate_probability("p", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_range_rejects_reversed() {
        assert!(validate_range("ratio", (0.5, 1.5)).is_ok());
        assert!(validate_range("ratio", (1.0, 1.0)).is_ok());
        assert!(validate_range("ratio", (1.5, 0.5)).is_err());
        assert!(validate_range("ratio", (0.0, f64::INFINITY)).is_err());
    }
}
