// error.rs -- image error type

use thiserror::Error;

/// Every refusal in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("unknown pixel format or data type (format {format:#06x}, type {data_type:#06x})")]
    UnknownFormat { format: u32, data_type: u32 },

    #[error("{operation}: {reason}")]
    PreconditionMismatch {
        operation: &'static str,
        reason: String,
    },

    #[error("{operation}: {reason} not supported")]
    UnsupportedCombination {
        operation: &'static str,
        reason: String,
    },

    #[error("out of memory allocating {bytes} bytes")]
    AllocationFailure { bytes: usize },

    #[error("{0}: image has no data")]
    NoData(&'static str),

    #[error("decode failed: {0}")]
    Decode(String),
}

impl ImageError {
    pub(crate) fn precondition(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::PreconditionMismatch {
            operation,
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::UnsupportedCombination {
            operation,
            reason: reason.into(),
        }
    }

    /// Emit the error as a warning and hand it back for returning.
    pub(crate) fn warned(self) -> Self {
        log::warn!("{}", self);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = ImageError::UnknownFormat {
            format: 0x1234,
            data_type: 0x1401,
        };
        assert_eq!(
            e.to_string(),
            "unknown pixel format or data type (format 0x1234, type 0x1401)"
        );
        let e = ImageError::precondition("convert_rgb888_to_rgb565", "source is not 24-bit RGB");
        assert_eq!(e.to_string(), "convert_rgb888_to_rgb565: source is not 24-bit RGB");
        assert_eq!(
            ImageError::NoData("flip_vertical").to_string(),
            "flip_vertical: image has no data"
        );
    }
}
