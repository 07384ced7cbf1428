use std::io;

use thiserror::Error;

use crate::structures::AttributeFamily;

/// Which stage of the pipeline raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The byte stream is not a valid SOG v2 container.
    Structural,
    /// The container is well formed but its quantized data is inconsistent.
    Numeric,
    /// A container or collection was used outside its lifetime rules.
    Lifecycle,
    /// Writing decoded data somewhere failed.
    Export,
}

#[derive(Debug, Error)]
pub enum SogError {
    #[error("Input is truncated: need {needed} bytes, have {available}")]
    TruncatedInput { needed: usize, available: usize },

    #[error("Invalid magic tag {0:02x?}")]
    InvalidMagic([u8; 4]),

    #[error("Unsupported SOG version {0} (only version 2 is supported)")]
    UnsupportedVersion(u32),

    #[error("Malformed plane table: {0}")]
    MalformedTable(String),

    #[error("Required attribute plane '{0}' is missing")]
    MissingAttribute(AttributeFamily),

    #[error("Plane '{family}' has {actual} bytes, expected {expected}")]
    AttributeSizeMismatch {
        family: AttributeFamily,
        expected: usize,
        actual: usize,
    },

    #[error("Plane '{family}' has an out-of-range value at element {index}")]
    ArithmeticRangeError {
        family: AttributeFamily,
        index: usize,
    },

    #[error("Encoding {encoding} is not valid for plane '{family}'")]
    UnsupportedEncoding {
        family: AttributeFamily,
        encoding: String,
    },

    #[error("Failed to decompress plane '{family}': {reason}")]
    PlaneDecompression {
        family: AttributeFamily,
        reason: String,
    },

    #[error("Could not reserve {requested} bytes for decoded data")]
    AllocationFailed { requested: usize },

    #[error("Container was already decoded")]
    InvalidState,

    #[error("Splat data was accessed after it was disposed")]
    UseAfterDispose,

    #[error("Splat data was disposed twice")]
    DoubleDispose,

    #[error("An I/O error occurred: {0}")]
    Io(#[from] io::Error),
}

impl SogError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::TruncatedInput { .. }
            | Self::InvalidMagic(_)
            | Self::UnsupportedVersion(_)
            | Self::MalformedTable(_)
            | Self::MissingAttribute(_) => ErrorClass::Structural,
            Self::AttributeSizeMismatch { .. }
            | Self::ArithmeticRangeError { .. }
            | Self::UnsupportedEncoding { .. }
            | Self::PlaneDecompression { .. }
            | Self::AllocationFailed { .. } => ErrorClass::Numeric,
            Self::InvalidState | Self::UseAfterDispose | Self::DoubleDispose => {
                ErrorClass::Lifecycle
            }
            Self::Io(_) => ErrorClass::Export,
        }
    }
}

pub type SogResult<T> = Result<T, SogError>;
