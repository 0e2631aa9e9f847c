//! Compression of a `TrackArray` into a self-describing blob.
//!
//! Per track the algorithm is:
//! 1. Range reduction: find `[min, max]` over the samples.
//! 2. Constant detection: a range no wider than the track's constant threshold
//!    collapses to its midpoint.
//! 3. Quantization: the smallest bit width whose reconstruction stays within
//!    the track's precision for every sample. Tracks that cannot meet their
//!    precision with 31 bits keep their raw `f32` bits.
//! 4. Bit packing of the quantized samples into one shared stream.
//!
//! The whole payload may then be wrapped by the zstd kernel.

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::codec::allocator::{AllocatedBuffer, TrackAllocator};
use crate::codec::format::{
    dequantize, hash32, max_quantized_value, BlobHeader, TrackDescriptor, TrackEncoding, TrackType,
    ALGORITHM_VERSION, FLAG_ENTROPY_CODED, HEADER_SIZE,
};
use crate::codec::track::{TrackArray, TrackFloat1};
use crate::error::CurveCodecError;
use crate::kernels;

/// Widest quantized representation; past this the raw float bits are cheaper.
const MAX_QUANTIZED_BIT_WIDTH: u8 = 31;

/// Settings shared by every track of one compression call.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CompressionSettings {
    /// Zstd level applied to the payload, or `None` to keep it random access.
    #[serde(default)]
    pub entropy_coding_level: Option<i32>,
}

impl CompressionSettings {
    pub fn validate(&self) -> Result<(), CurveCodecError> {
        match self.entropy_coding_level {
            Some(level) if !zstd::compression_level_range().contains(&level) => Err(CurveCodecError::InvalidConfig(
                format!("Zstd level {} is outside the supported range", level),
            )),
            _ => Ok(()),
        }
    }
}

/// Summary of a compression call, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputStats {
    pub compressed_size: usize,
    pub num_constant_tracks: usize,
    pub num_quantized_tracks: usize,
    pub num_raw_tracks: usize,
    pub max_bit_width: u8,
}

/// Compresses `tracks` into a buffer leased from `allocator`.
///
/// The returned buffer goes back to `allocator` when dropped; copy what you
/// need out of it first. On error nothing is left allocated.
pub fn compress_track_list<'a, A>(
    allocator: &'a A,
    tracks: &TrackArray,
    settings: &CompressionSettings,
) -> Result<(AllocatedBuffer<'a, A>, OutputStats), CurveCodecError>
where
    A: TrackAllocator + ?Sized,
{
    tracks.is_valid()?;
    settings
        .validate()
        .map_err(|e| CurveCodecError::Compression(e.to_string()))?;

    let mut stats = OutputStats::default();
    let mut bits = BitVec::<u8, Lsb0>::new();
    let mut descriptor_bytes = Vec::new();

    for (track_index, track) in tracks.iter().enumerate() {
        let encoding = encode_track(track, &mut bits)?;
        match encoding {
            TrackEncoding::Constant { .. } => stats.num_constant_tracks += 1,
            TrackEncoding::Quantized { .. } => stats.num_quantized_tracks += 1,
            TrackEncoding::Raw { .. } => stats.num_raw_tracks += 1,
        }
        stats.max_bit_width = stats.max_bit_width.max(encoding.bits_per_sample());
        log_metric!(
            "event" = "encode_track",
            "track" = &track_index,
            "precision" = &track.desc().precision,
            "bits_per_sample" = &encoding.bits_per_sample()
        );

        TrackDescriptor {
            output_index: track.desc().output_index,
            encoding,
        }
        .write_to(&mut descriptor_bytes)?;
    }

    let bitstream = bits.into_vec();
    let mut payload = descriptor_bytes;
    kernels::leb128::encode_one(bitstream.len() as u64, &mut payload)?;
    payload.extend_from_slice(&bitstream);

    let (stored_payload, flags) = match settings.entropy_coding_level {
        Some(level) => (
            kernels::zstd::encode(&payload, level).map_err(|e| CurveCodecError::Compression(e.to_string()))?,
            FLAG_ENTROPY_CODED,
        ),
        None => (payload, 0),
    };

    let total_size = HEADER_SIZE + stored_payload.len();
    let header = BlobHeader {
        version: ALGORITHM_VERSION,
        track_type: TrackType::Float1f,
        flags,
        num_tracks: u32::try_from(tracks.len())
            .map_err(|_| CurveCodecError::Compression("Too many tracks".into()))?,
        num_samples: u32::try_from(tracks.num_samples_per_track())
            .map_err(|_| CurveCodecError::Compression("Too many samples per track".into()))?,
        sample_rate: if tracks.is_empty() { 30.0 } else { tracks.sample_rate() },
        total_size: u32::try_from(total_size)
            .map_err(|_| CurveCodecError::Compression(format!("Compressed size {} exceeds 4 GiB", total_size)))?,
        payload_hash: hash32(&stored_payload),
    };

    let mut serialized = Vec::with_capacity(total_size);
    header.write_to(&mut serialized);
    serialized.extend_from_slice(&stored_payload);

    let mut buffer = AllocatedBuffer::new(allocator, total_size);
    buffer.as_mut_slice().copy_from_slice(&serialized);
    stats.compressed_size = total_size;

    Ok((buffer, stats))
}

/// Picks the cheapest representation for one track and appends its bits.
fn encode_track(track: &TrackFloat1, bits: &mut BitVec<u8, Lsb0>) -> Result<TrackEncoding, CurveCodecError> {
    let samples = track.samples();
    let desc = track.desc();

    let (min, max) = samples
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    let extent = max - min;

    if extent <= desc.constant_threshold {
        return Ok(TrackEncoding::Constant {
            value: min + extent * 0.5,
        });
    }

    let bit_offset = bits.len();
    if extent.is_finite() {
        let first_width = estimate_bit_width(extent, desc.precision);
        for bit_width in first_width..=MAX_QUANTIZED_BIT_WIDTH {
            if let Some(quantized) = quantize_within(samples, min, extent, bit_width, desc.precision) {
                kernels::bitpack::encode_into(&quantized, bit_width, bits)?;
                return Ok(TrackEncoding::Quantized {
                    min,
                    extent,
                    bit_width,
                    bit_offset,
                });
            }
        }
    }

    let raw: Vec<u32> = samples.iter().map(|s| s.to_bits()).collect();
    kernels::bitpack::encode_into(&raw, 32, bits)?;
    Ok(TrackEncoding::Raw { bit_offset })
}

/// Lower bound on the bit width: half a quantization step must fit the precision.
fn estimate_bit_width(extent: f32, precision: f32) -> u8 {
    let steps = (extent as f64 / (2.0 * precision as f64)).ceil().max(1.0);
    let width = (steps + 1.0).log2().ceil();
    width.clamp(1.0, MAX_QUANTIZED_BIT_WIDTH as f64) as u8
}

/// Quantizes every sample; `None` if any reconstruction misses `precision`.
fn quantize_within(samples: &[f32], min: f32, extent: f32, bit_width: u8, precision: f32) -> Option<Vec<u32>> {
    let max_value = max_quantized_value(bit_width);
    let scale = max_value as f64 / extent as f64;
    let mut quantized = Vec::with_capacity(samples.len());
    for &sample in samples {
        let normalized = ((sample as f64 - min as f64) * scale).round();
        let q = normalized.clamp(0.0, max_value as f64) as u32;
        let error = (dequantize(q, min, extent, bit_width) - sample).abs();
        if !(error <= precision) {
            return None;
        }
        quantized.push(q);
    }
    Some(quantized)
}
