//! Error types for the transform engine
//!
//! All public APIs that can fail return `EngineResult<T>`. Filter parameters
//! are deliberately not represented here: out-of-range filter values are
//! clamped during normalization rather than rejected, so the pipeline stays
//! total over its configuration space.

use std::fmt;
use std::io;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Error type covering every failure path of the transform engine
#[derive(Debug)]
pub enum EngineError {
    /// The image source could not be materialized into a matrix
    Decode { reason: String },

    /// Unknown transform type tag
    UnsupportedTransform { transform: String },

    /// Width or height is zero, or a buffer does not match its dimensions
    InvalidDimensions {
        width: usize,
        height: usize,
        context: String,
    },

    /// A transform state was disposed, or handed to the wrong backend
    State { reason: String },

    /// Configuration file could not be parsed
    Config { reason: String },

    /// Underlying I/O failure (configuration loading, log writing)
    Io(io::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Decode { reason } => {
                write!(f, "Failed to decode image source: {}", reason)
            }
            EngineError::UnsupportedTransform { transform } => {
                write!(f, "Unsupported transform type: '{}'", transform)
            }
            EngineError::InvalidDimensions {
                width,
                height,
                context,
            } => {
                write!(
                    f,
                    "Invalid dimensions {}x{} in {}",
                    width, height, context
                )
            }
            EngineError::State { reason } => {
                write!(f, "Invalid transform state: {}", reason)
            }
            EngineError::Config { reason } => {
                write!(f, "Invalid configuration: {}", reason)
            }
            EngineError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for EngineError {
    fn from(err: io::Error) -> Self {
        EngineError::Io(err)
    }
}

// Convenience constructors for common error patterns
impl EngineError {
    /// Create a decode error
    pub fn decode(reason: impl Into<String>) -> Self {
        EngineError::Decode {
            reason: reason.into(),
        }
    }

    /// Create an unsupported-transform error
    pub fn unsupported_transform(transform: impl Into<String>) -> Self {
        EngineError::UnsupportedTransform {
            transform: transform.into(),
        }
    }

    /// Create an invalid-dimensions error
    pub fn invalid_dimensions(width: usize, height: usize, context: impl Into<String>) -> Self {
        EngineError::InvalidDimensions {
            width,
            height,
            context: context.into(),
        }
    }

    /// Create an invalid-state error
    pub fn state(reason: impl Into<String>) -> Self {
        EngineError::State {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        EngineError::Config {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_display() {
        let err = EngineError::decode("buffer length 5 does not match 4x4");
        let msg = err.to_string();
        assert!(msg.contains("decode"));
        assert!(msg.contains("4x4"));
    }

    #[test]
    fn test_unsupported_transform_display() {
        let err = EngineError::unsupported_transform("dst");
        assert!(err.to_string().contains("dst"));
    }

    #[test]
    fn test_invalid_dimensions_display() {
        let err = EngineError::invalid_dimensions(0, 32, "grayscale decode");
        let msg = err.to_string();
        assert!(msg.contains("0x32"));
        assert!(msg.contains("grayscale decode"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngineError>();
    }
}
