// In: src/codec/format.rs

//! Defines the on-disk structures and constants of a compressed curve blob.
//! This is the single source of truth shared by the compressor, the structural
//! validator and the decompression context.
//!
//! Layout (all multi-byte fields little-endian):
//!
//! ```text
//! [ header (HEADER_SIZE bytes) ][ payload (possibly zstd-wrapped) ]
//!
//! header  = magic(4) version(2) track_type(1) flags(1) num_tracks(4)
//!           num_samples(4) sample_rate(4, f32) total_size(4) payload_hash(4)
//! payload = per-track descriptor * num_tracks
//!           bitstream_len(LEB128) bitstream
//! ```

use std::io::{Cursor, Read};

use crate::error::CurveCodecError;

//==================================================================================
// I. Constants
//==================================================================================

/// The magic number identifying a compressed curve blob.
pub const BLOB_MAGIC: &[u8; 4] = b"CRVT";
/// Version of the uniformly sampled algorithm. Bump when the payload layout or
/// the quantization math changes; it feeds the derived-data cache key.
pub const ALGORITHM_VERSION: u16 = 1;
/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 28;

/// Flag bit: the payload is wrapped by the zstd kernel.
pub const FLAG_ENTROPY_CODED: u8 = 0b0000_0001;
const KNOWN_FLAGS: u8 = FLAG_ENTROPY_CODED;

/// Returns the algorithm version baked into every blob this crate writes.
pub fn algorithm_version() -> u16 {
    ALGORITHM_VERSION
}

//==================================================================================
// II. Enums
//==================================================================================

/// The sample type stored by a blob. Only scalar floats are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TrackType {
    Float1f = 0,
}

impl TrackType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(TrackType::Float1f),
            _ => None,
        }
    }
}

/// How an individual track's samples are represented in the payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackEncoding {
    /// Every sample collapses to one value.
    Constant { value: f32 },
    /// Samples are `bit_width`-bit integers mapped onto `[min, min + extent]`.
    Quantized {
        min: f32,
        extent: f32,
        bit_width: u8,
        bit_offset: usize,
    },
    /// Samples are stored as raw `f32` bit patterns (32 bits each).
    Raw { bit_offset: usize },
}

impl TrackEncoding {
    const KIND_CONSTANT: u8 = 0;
    const KIND_QUANTIZED: u8 = 1;
    const KIND_RAW: u8 = 2;

    /// Number of bits each sample of this track occupies in the bit stream.
    pub fn bits_per_sample(&self) -> u8 {
        match self {
            TrackEncoding::Constant { .. } => 0,
            TrackEncoding::Quantized { bit_width, .. } => *bit_width,
            TrackEncoding::Raw { .. } => 32,
        }
    }

    pub fn bit_offset(&self) -> Option<usize> {
        match self {
            TrackEncoding::Constant { .. } => None,
            TrackEncoding::Quantized { bit_offset, .. } | TrackEncoding::Raw { bit_offset } => Some(*bit_offset),
        }
    }
}

/// The payload entry for a single track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackDescriptor {
    pub output_index: u32,
    pub encoding: TrackEncoding,
}

//==================================================================================
// III. Quantization math shared by the writer and the reader
//==================================================================================

/// Number of quantization steps representable with `bit_width` bits.
pub fn max_quantized_value(bit_width: u8) -> u32 {
    ((1u64 << bit_width) - 1) as u32
}

/// Maps a quantized integer back to its value. The compressor validates its
/// error bound through this exact function so both sides agree bit for bit.
pub fn dequantize(quantized: u32, min: f32, extent: f32, bit_width: u8) -> f32 {
    let max_value = max_quantized_value(bit_width) as f32;
    min + (quantized as f32 / max_value) * extent
}

//==================================================================================
// IV. Hashing
//==================================================================================

const FNV32_OFFSET: u32 = 0x811C_9DC5;
const FNV32_PRIME: u32 = 0x0100_0193;
const FNV64_OFFSET: u64 = 0xCBF2_9CE4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01B3;

/// FNV-1a over `bytes`; used for the payload checksum.
pub fn hash32(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(FNV32_OFFSET, |hash, &b| (hash ^ b as u32).wrapping_mul(FNV32_PRIME))
}

/// 64-bit FNV-1a, continuing from `seed` so callers can hash incrementally.
pub fn hash64_with_seed(seed: u64, bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(seed, |hash, &b| (hash ^ b as u64).wrapping_mul(FNV64_PRIME))
}

pub fn hash64(bytes: &[u8]) -> u64 {
    hash64_with_seed(FNV64_OFFSET, bytes)
}

//==================================================================================
// V. Header
//==================================================================================

/// The fixed-size header at the front of every blob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlobHeader {
    pub version: u16,
    pub track_type: TrackType,
    pub flags: u8,
    pub num_tracks: u32,
    pub num_samples: u32,
    pub sample_rate: f32,
    pub total_size: u32,
    pub payload_hash: u32,
}

impl BlobHeader {
    pub fn is_entropy_coded(&self) -> bool {
        self.flags & FLAG_ENTROPY_CODED != 0
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(BLOB_MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.push(self.track_type as u8);
        out.push(self.flags);
        out.extend_from_slice(&self.num_tracks.to_le_bytes());
        out.extend_from_slice(&self.num_samples.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&self.total_size.to_le_bytes());
        out.extend_from_slice(&self.payload_hash.to_le_bytes());
    }

    /// Parses and checks the fixed header. This is all the "lightweight"
    /// validation a playback query pays for.
    pub fn read_from(bytes: &[u8]) -> Result<Self, CurveCodecError> {
        if bytes.len() < HEADER_SIZE {
            return Err(CurveCodecError::MalformedBlob(format!(
                "Blob is too small to be valid. Minimum size: {}, got: {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut cursor = Cursor::new(&bytes[..HEADER_SIZE]);
        let map_err = |e: std::io::Error| CurveCodecError::MalformedBlob(e.to_string());

        let mut magic_buf = [0u8; 4];
        cursor.read_exact(&mut magic_buf).map_err(map_err)?;
        if magic_buf != *BLOB_MAGIC {
            return Err(CurveCodecError::MalformedBlob("Invalid blob magic number".into()));
        }

        let mut u16_buf = [0u8; 2];
        cursor.read_exact(&mut u16_buf).map_err(map_err)?;
        let version = u16::from_le_bytes(u16_buf);
        if version != ALGORITHM_VERSION {
            return Err(CurveCodecError::MalformedBlob(format!(
                "Unsupported algorithm version: expected {}, got {}",
                ALGORITHM_VERSION, version
            )));
        }

        let mut u8_buf = [0u8; 1];
        cursor.read_exact(&mut u8_buf).map_err(map_err)?;
        let track_type = TrackType::from_u8(u8_buf[0])
            .ok_or_else(|| CurveCodecError::MalformedBlob(format!("Unsupported track type: {}", u8_buf[0])))?;

        cursor.read_exact(&mut u8_buf).map_err(map_err)?;
        let flags = u8_buf[0];
        if flags & !KNOWN_FLAGS != 0 {
            return Err(CurveCodecError::MalformedBlob(format!("Unknown header flags: {:#04x}", flags)));
        }

        let mut u32_buf = [0u8; 4];
        cursor.read_exact(&mut u32_buf).map_err(map_err)?;
        let num_tracks = u32::from_le_bytes(u32_buf);
        cursor.read_exact(&mut u32_buf).map_err(map_err)?;
        let num_samples = u32::from_le_bytes(u32_buf);
        cursor.read_exact(&mut u32_buf).map_err(map_err)?;
        let sample_rate = f32::from_le_bytes(u32_buf);
        cursor.read_exact(&mut u32_buf).map_err(map_err)?;
        let total_size = u32::from_le_bytes(u32_buf);
        cursor.read_exact(&mut u32_buf).map_err(map_err)?;
        let payload_hash = u32::from_le_bytes(u32_buf);

        if total_size as usize != bytes.len() {
            return Err(CurveCodecError::MalformedBlob(format!(
                "Declared size {} does not match buffer length {}",
                total_size,
                bytes.len()
            )));
        }
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(CurveCodecError::MalformedBlob(format!("Invalid sample rate: {}", sample_rate)));
        }
        if num_tracks > 0 && num_samples == 0 {
            return Err(CurveCodecError::MalformedBlob("Tracks declared without any samples".into()));
        }

        Ok(Self {
            version,
            track_type,
            flags,
            num_tracks,
            num_samples,
            sample_rate,
            total_size,
            payload_hash,
        })
    }
}

//==================================================================================
// VI. Payload descriptors
//==================================================================================

impl TrackDescriptor {
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<(), CurveCodecError> {
        crate::kernels::leb128::encode_one(self.output_index, out)?;
        match self.encoding {
            TrackEncoding::Constant { value } => {
                out.push(TrackEncoding::KIND_CONSTANT);
                out.extend_from_slice(&value.to_le_bytes());
            }
            TrackEncoding::Quantized {
                min,
                extent,
                bit_width,
                bit_offset,
            } => {
                out.push(TrackEncoding::KIND_QUANTIZED);
                out.extend_from_slice(&min.to_le_bytes());
                out.extend_from_slice(&extent.to_le_bytes());
                out.push(bit_width);
                crate::kernels::leb128::encode_one(bit_offset as u64, out)?;
            }
            TrackEncoding::Raw { bit_offset } => {
                out.push(TrackEncoding::KIND_RAW);
                crate::kernels::leb128::encode_one(bit_offset as u64, out)?;
            }
        }
        Ok(())
    }

    pub fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, CurveCodecError> {
        let map_err = |e: std::io::Error| CurveCodecError::MalformedBlob(e.to_string());
        let output_index: u32 = crate::kernels::leb128::decode_one(cursor)?;

        let mut kind = [0u8; 1];
        cursor.read_exact(&mut kind).map_err(map_err)?;
        let mut f32_buf = [0u8; 4];

        let encoding = match kind[0] {
            TrackEncoding::KIND_CONSTANT => {
                cursor.read_exact(&mut f32_buf).map_err(map_err)?;
                TrackEncoding::Constant {
                    value: f32::from_le_bytes(f32_buf),
                }
            }
            TrackEncoding::KIND_QUANTIZED => {
                cursor.read_exact(&mut f32_buf).map_err(map_err)?;
                let min = f32::from_le_bytes(f32_buf);
                cursor.read_exact(&mut f32_buf).map_err(map_err)?;
                let extent = f32::from_le_bytes(f32_buf);
                let mut bit_width = [0u8; 1];
                cursor.read_exact(&mut bit_width).map_err(map_err)?;
                let bit_offset: u64 = crate::kernels::leb128::decode_one(cursor)?;
                TrackEncoding::Quantized {
                    min,
                    extent,
                    bit_width: bit_width[0],
                    bit_offset: usize::try_from(bit_offset)
                        .map_err(|_| CurveCodecError::MalformedBlob("Bit offset overflows usize".into()))?,
                }
            }
            TrackEncoding::KIND_RAW => {
                let bit_offset: u64 = crate::kernels::leb128::decode_one(cursor)?;
                TrackEncoding::Raw {
                    bit_offset: usize::try_from(bit_offset)
                        .map_err(|_| CurveCodecError::MalformedBlob("Bit offset overflows usize".into()))?,
                }
            }
            other => {
                return Err(CurveCodecError::MalformedBlob(format!("Unknown track encoding kind: {}", other)));
            }
        };

        Ok(Self { output_index, encoding })
    }
}

//==================================================================================
// Unit Tests
//==================================================================================
