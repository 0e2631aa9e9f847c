//! A read-only view over a compressed curve blob.
//!
//! `CompressedTracks` borrows the blob bytes and exposes its header. Parsing
//! the per-track descriptors is deferred to `track_table`, which is what the
//! decompression context builds on. Two levels of validation exist:
//! lightweight (header only, paid by every playback query) and deep (checksum
//! plus a full parse, used right after compression).

use std::borrow::Cow;
use std::io::Cursor;

use bitvec::prelude::*;

use crate::codec::format::{hash32, BlobHeader, TrackDescriptor, TrackEncoding, HEADER_SIZE};
use crate::error::CurveCodecError;
use crate::kernels;

/// A borrowed, header-validated compressed blob.
#[derive(Debug, Clone, Copy)]
pub struct CompressedTracks<'a> {
    bytes: &'a [u8],
    header: BlobHeader,
}

/// Descriptors and bit stream of a blob, inflated if the payload was entropy coded.
#[derive(Debug)]
pub struct TrackTable<'a> {
    payload: Cow<'a, [u8]>,
    descriptors: Vec<TrackDescriptor>,
    bitstream_start: usize,
    bitstream_len: usize,
}

impl<'a> CompressedTracks<'a> {
    /// Wraps `bytes` after the lightweight header checks.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, CurveCodecError> {
        let header = BlobHeader::read_from(bytes)?;
        Ok(Self { bytes, header })
    }

    pub fn header(&self) -> &BlobHeader {
        &self.header
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn num_tracks(&self) -> usize {
        self.header.num_tracks as usize
    }

    pub fn num_samples_per_track(&self) -> usize {
        self.header.num_samples as usize
    }

    pub fn sample_rate(&self) -> f32 {
        self.header.sample_rate
    }

    pub fn duration(&self) -> f32 {
        crate::codec::track::calculate_duration(self.num_samples_per_track(), self.sample_rate())
    }

    /// Re-checks the blob. `deep` adds the payload checksum and a full parse of
    /// every descriptor against the bit stream bounds.
    pub fn is_valid(&self, deep: bool) -> Result<(), CurveCodecError> {
        BlobHeader::read_from(self.bytes)?;
        if !deep {
            return Ok(());
        }

        let stored_payload = &self.bytes[HEADER_SIZE..];
        let actual_hash = hash32(stored_payload);
        if actual_hash != self.header.payload_hash {
            return Err(CurveCodecError::MalformedBlob(format!(
                "Payload checksum mismatch: expected {:#010x}, got {:#010x}",
                self.header.payload_hash, actual_hash
            )));
        }

        let table = self.track_table()?;
        let mut seen_outputs = hashbrown::HashSet::with_capacity(table.descriptors.len());
        for descriptor in &table.descriptors {
            if !seen_outputs.insert(descriptor.output_index) {
                return Err(CurveCodecError::MalformedBlob(format!(
                    "Output index {} appears more than once",
                    descriptor.output_index
                )));
            }
            if let TrackEncoding::Constant { value } = descriptor.encoding {
                if !value.is_finite() {
                    return Err(CurveCodecError::MalformedBlob("Constant track value is not finite".into()));
                }
            }
        }
        Ok(())
    }

    /// Parses the per-track descriptors, inflating the payload first when needed.
    pub fn track_table(&self) -> Result<TrackTable<'a>, CurveCodecError> {
        let stored_payload: &'a [u8] = &self.bytes[HEADER_SIZE..];
        let payload: Cow<'a, [u8]> = if self.header.is_entropy_coded() {
            Cow::Owned(kernels::zstd::decode(stored_payload).map_err(CurveCodecError::into_malformed)?)
        } else {
            Cow::Borrowed(stored_payload)
        };

        let (descriptors, bitstream_start, bitstream_len) =
            parse_payload(&payload, self.num_tracks(), self.num_samples_per_track())
                .map_err(CurveCodecError::into_malformed)?;

        Ok(TrackTable {
            payload,
            descriptors,
            bitstream_start,
            bitstream_len,
        })
    }
}

impl TrackTable<'_> {
    pub fn descriptors(&self) -> &[TrackDescriptor] {
        &self.descriptors
    }

    pub fn bits(&self) -> &BitSlice<u8, Lsb0> {
        let bytes = &self.payload[self.bitstream_start..self.bitstream_start + self.bitstream_len];
        BitSlice::<u8, Lsb0>::from_slice(bytes)
    }

    /// Reconstructs sample `sample_index` of track `track_index`.
    pub fn sample(&self, track_index: usize, sample_index: usize) -> Result<f32, CurveCodecError> {
        let descriptor = self
            .descriptors
            .get(track_index)
            .ok_or_else(|| CurveCodecError::InternalError(format!("Track index {} is out of range", track_index)))?;

        let read = |bit_offset: usize, bit_width: u8| {
            kernels::bitpack::read_one(self.bits(), bit_offset + sample_index * bit_width as usize, bit_width)
                .map_err(CurveCodecError::into_malformed)
        };

        match descriptor.encoding {
            TrackEncoding::Constant { value } => Ok(value),
            TrackEncoding::Quantized {
                min,
                extent,
                bit_width,
                bit_offset,
            } => Ok(crate::codec::format::dequantize(read(bit_offset, bit_width)?, min, extent, bit_width)),
            TrackEncoding::Raw { bit_offset } => Ok(f32::from_bits(read(bit_offset, 32)?)),
        }
    }
}

/// Splits a plain payload into descriptors and the bit stream range, checking
/// that every track's samples fall inside the bit stream.
fn parse_payload(
    payload: &[u8],
    num_tracks: usize,
    num_samples: usize,
) -> Result<(Vec<TrackDescriptor>, usize, usize), CurveCodecError> {
    let mut cursor = Cursor::new(payload);
    let mut descriptors = Vec::with_capacity(num_tracks.min(payload.len()));
    for _ in 0..num_tracks {
        descriptors.push(TrackDescriptor::read_from(&mut cursor)?);
    }

    let bitstream_len: u64 = kernels::leb128::decode_one(&mut cursor)?;
    let bitstream_start = cursor.position() as usize;
    let bitstream_len = usize::try_from(bitstream_len)
        .map_err(|_| CurveCodecError::MalformedBlob("Bit stream length overflows usize".into()))?;
    if bitstream_start.saturating_add(bitstream_len) != payload.len() {
        return Err(CurveCodecError::MalformedBlob(format!(
            "Bit stream length {} does not match the {} bytes left in the payload",
            bitstream_len,
            payload.len().saturating_sub(bitstream_start)
        )));
    }

    let available_bits = bitstream_len.saturating_mul(8);
    for (index, descriptor) in descriptors.iter().enumerate() {
        if let TrackEncoding::Quantized { bit_width, min, extent, .. } = descriptor.encoding {
            if bit_width == 0 || bit_width > 31 {
                return Err(CurveCodecError::MalformedBlob(format!(
                    "Track {} has unsupported bit width {}",
                    index, bit_width
                )));
            }
            if !min.is_finite() || !extent.is_finite() {
                return Err(CurveCodecError::MalformedBlob(format!("Track {} has a non-finite range", index)));
            }
        }
        if let Some(bit_offset) = descriptor.encoding.bit_offset() {
            let end = (descriptor.encoding.bits_per_sample() as usize)
                .checked_mul(num_samples)
                .and_then(|bits| bits.checked_add(bit_offset));
            if end.map_or(true, |end| end > available_bits) {
                return Err(CurveCodecError::MalformedBlob(format!(
                    "Track {} samples run past the end of the bit stream",
                    index
                )));
            }
        }
    }

    Ok((descriptors, bitstream_start, bitstream_len))
}
