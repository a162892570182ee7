//! Crate-wide error type.
//!
//! The rasterizer, scanline writer and blend loops never fail: degenerate
//! geometry simply produces no pixels. Errors are reserved for construction,
//! bulk pixel helpers, and the GPU command path where a backend cannot
//! express a requested feature.

use thiserror::Error;

/// Errors that can occur while setting up or issuing a render.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum RenderError {
    /// A backend was asked for a composite mode or paint it cannot express.
    #[error("{backend} backend does not support {what}")]
    UnsupportedOperation {
        backend: &'static str,
        what: String,
    },
    /// Geometry contained non-finite coordinates.
    #[error("invalid geometry: {0}")]
    Geometry(String),
    /// Bitmap side exceeds the fixed-point scan coordinate range.
    #[error("bitmap dimension {size} exceeds maximum rasterizable size {max}")]
    BitmapTooLarge { size: i32, max: i32 },
    /// Bulk pixel operation on buffers of different sizes.
    #[error("buffer size mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl RenderError {
    pub(crate) fn unsupported(backend: &'static str, what: impl Into<String>) -> Self {
        RenderError::UnsupportedOperation {
            backend,
            what: what.into(),
        }
    }
}

pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = RenderError::unsupported("gpu", "blend mode Hue");
        assert_eq!(e.to_string(), "gpu backend does not support blend mode Hue");

        let e = RenderError::BitmapTooLarge { size: 10, max: 5 };
        assert!(e.to_string().contains("exceeds maximum"));

        let e = RenderError::DimensionMismatch {
            expected: 4,
            actual: 3,
        };
        assert_eq!(e.to_string(), "buffer size mismatch: expected 4, got 3");
    }
}
