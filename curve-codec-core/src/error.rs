// In: src/error.rs

//! This module defines the single, unified error type for the entire curve codec library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CurveCodecError {
    // =========================================================================
    // === High-Level, Semantic Errors (Specific to our library's logic)
    // =========================================================================
    /// The codec rejected the track set (malformed tracks, unsupported settings).
    /// This is the only error the compression path reports to its caller.
    #[error("Curve compression failed: {0}")]
    Compression(String),

    /// A compressed blob failed structural validation during decompression.
    /// Correctly functioning callers never produce this; treat it as a consistency violation.
    #[error("Malformed compressed curve blob: {0}")]
    MalformedBlob(String),

    #[error("Invalid codec configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the underlying I/O subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically while loading a config.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    // =========================================================================
    // === Low-Level Kernel Errors
    // =========================================================================
    #[error("Zstd operation failed: {0}")]
    ZstdError(String),

    #[error("LEB128 decoding error: {0}")]
    Leb128DecodeError(String),

    #[error("Bitpack decoding failed due to truncated buffer or data corruption")]
    BitpackDecodeError,

    #[error("Bitpack encoding error: value {0} exceeds bit width {1}")]
    BitpackEncodeError(u64, u8),
}

impl CurveCodecError {
    /// Re-labels a kernel failure that happened while reading a blob so callers
    /// only ever see `MalformedBlob` on the decompression path.
    pub(crate) fn into_malformed(self) -> Self {
        match self {
            CurveCodecError::MalformedBlob(_) => self,
            other => CurveCodecError::MalformedBlob(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_errors_are_relabelled_as_malformed() {
        let err = CurveCodecError::BitpackDecodeError.into_malformed();
        match err {
            CurveCodecError::MalformedBlob(msg) => assert!(msg.contains("Bitpack")),
            other => panic!("Expected MalformedBlob, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_is_not_double_wrapped() {
        let err = CurveCodecError::MalformedBlob("bad magic".into()).into_malformed();
        assert_eq!(err.to_string(), "Malformed compressed curve blob: bad magic");
    }
}
