//! Measures how far a compressed blob drifts from its source tracks.

use hashbrown::HashMap;

use crate::codec::compressed_tracks::CompressedTracks;
use crate::codec::decompress::{DecompressionContext, SampleRoundingPolicy, TrackWriter};
use crate::codec::track::TrackArray;
use crate::error::CurveCodecError;

/// The worst reconstruction error found, and where it happened.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackError {
    /// Output index of the offending track.
    pub index: u32,
    pub error: f32,
    pub sample_time: f32,
}

struct ValueBuffer<'a> {
    values: &'a mut [f32],
    slot_of: &'a HashMap<u32, usize>,
}

impl TrackWriter for ValueBuffer<'_> {
    fn write_float1(&mut self, track_index: u32, value: f32) {
        if let Some(&slot) = self.slot_of.get(&track_index) {
            self.values[slot] = value;
        }
    }
}

/// Decodes every sample of every track and returns the largest absolute error.
pub fn calculate_compression_error(
    raw_tracks: &TrackArray,
    compressed: &CompressedTracks<'_>,
) -> Result<TrackError, CurveCodecError> {
    if raw_tracks.len() != compressed.num_tracks() {
        return Err(CurveCodecError::InternalError(format!(
            "Raw track count {} does not match compressed track count {}",
            raw_tracks.len(),
            compressed.num_tracks()
        )));
    }

    let slot_of: HashMap<u32, usize> = raw_tracks
        .iter()
        .enumerate()
        .map(|(slot, track)| (track.desc().output_index, slot))
        .collect();

    let mut context = DecompressionContext::initialize(compressed)?;
    let mut values = vec![0.0f32; raw_tracks.len()];
    let mut worst = TrackError::default();
    let sample_rate = compressed.sample_rate();

    for sample_index in 0..raw_tracks.num_samples_per_track() {
        let sample_time = sample_index as f32 / sample_rate;
        context.seek(sample_time, SampleRoundingPolicy::None);
        context.decompress_tracks(&mut ValueBuffer {
            values: &mut values,
            slot_of: &slot_of,
        })?;

        for (track, &decoded) in raw_tracks.iter().zip(values.iter()) {
            let error = (track[sample_index] - decoded).abs();
            if error > worst.error {
                worst = TrackError {
                    index: track.desc().output_index,
                    error,
                    sample_time,
                };
            }
        }
    }

    Ok(worst)
}
