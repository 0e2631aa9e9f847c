//! This module contains the pure, stateless kernels for Zstandard compression
//! and decompression of a compressed blob's payload.
//!
//! Entropy coding is optional for curve blobs: a wrapped payload has to be
//! inflated once per decompression context, which trades playback cost for a
//! smaller asset. This module is a safe, panic-free wrapper around the `zstd` crate.

use crate::error::CurveCodecError;

/// Largest payload `decode` will inflate. A blob's total size is a u32, and a
/// real curve payload is far smaller than this.
pub const MAX_DECODED_LEN: usize = 256 * 1024 * 1024;

/// Compresses `input_bytes`, prepending the uncompressed length as a little-endian u64.
pub fn encode(input_bytes: &[u8], level: i32) -> Result<Vec<u8>, CurveCodecError> {
    if input_bytes.is_empty() {
        return Ok(Vec::new());
    }

    let mut output_buf = Vec::with_capacity(input_bytes.len());
    let uncompressed_len: u64 = input_bytes.len() as u64;
    output_buf.extend_from_slice(&uncompressed_len.to_le_bytes());

    let mut encoder = zstd::stream::Encoder::new(&mut output_buf, level)
        .map_err(|e| CurveCodecError::ZstdError(e.to_string()))?;
    std::io::Write::write_all(&mut encoder, input_bytes).map_err(|e| CurveCodecError::ZstdError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CurveCodecError::ZstdError(e.to_string()))?;

    Ok(output_buf)
}

/// Inverse of [`encode`]. Verifies the inflated length against the size header.
pub fn decode(input_bytes: &[u8]) -> Result<Vec<u8>, CurveCodecError> {
    if input_bytes.is_empty() {
        return Ok(Vec::new());
    }

    let (len_bytes, compressed_data) = input_bytes
        .split_first_chunk::<8>()
        .ok_or_else(|| CurveCodecError::ZstdError("Input stream too short to contain size header.".to_string()))?;
    let uncompressed_len = u64::from_le_bytes(*len_bytes) as usize;

    if uncompressed_len > MAX_DECODED_LEN {
        return Err(CurveCodecError::ZstdError(format!(
            "Declared size {} exceeds the {} byte limit.",
            uncompressed_len, MAX_DECODED_LEN
        )));
    }

    // Inflating past the declared size fails instead of growing the buffer.
    let decompressed_data = zstd::bulk::decompress(compressed_data, uncompressed_len)
        .map_err(|e| CurveCodecError::ZstdError(e.to_string()))?;

    if decompressed_data.len() != uncompressed_len {
        return Err(CurveCodecError::ZstdError(format!(
            "Decompressed size does not match header. Expected {}, got {}.",
            uncompressed_len,
            decompressed_data.len()
        )));
    }

    Ok(decompressed_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zstd_roundtrip_highly_compressible_data() {
        let original_bytes = vec![42u8; 10_000];
        let compressed_bytes = encode(&original_bytes, 5).unwrap();
        assert!(compressed_bytes.len() < 50);
        assert_eq!(decode(&compressed_bytes).unwrap(), original_bytes);
    }

    #[test]
    fn test_zstd_is_deterministic() {
        let original_bytes: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        assert_eq!(encode(&original_bytes, 3).unwrap(), encode(&original_bytes, 3).unwrap());
    }

    #[test]
    fn test_zstd_output_beyond_declared_size_is_rejected() {
        let original_bytes = vec![7u8; 100_000];
        let mut compressed_bytes = encode(&original_bytes, 3).unwrap();
        compressed_bytes[..8].copy_from_slice(&16u64.to_le_bytes());
        assert!(matches!(decode(&compressed_bytes), Err(CurveCodecError::ZstdError(_))));
    }

    #[test]
    fn test_zstd_oversized_declared_size_is_rejected() {
        let mut compressed_bytes = encode(&[1, 2, 3], 3).unwrap();
        compressed_bytes[..8].copy_from_slice(&u64::MAX.to_le_bytes());
        let err = decode(&compressed_bytes).unwrap_err();
        assert!(err.to_string().contains("limit"));
    }

    #[test]
    fn test_zstd_decompress_invalid_data() {
        let result = decode(&[1, 2, 3, 4, 5]);
        match result {
            Err(e) => assert!(e.to_string().contains("Zstd")),
            Ok(_) => panic!("Expected a Zstd error"),
        }
    }
}
