//! Playback-side decoding of a compressed blob.
//!
//! A `DecompressionContext` is a cheap, per-query value: initialize it from a
//! blob, seek it to a time, then stream values out through a `TrackWriter`.
//! It borrows the blob and owns nothing shared, so concurrent queries simply
//! build their own contexts.

use crate::codec::compressed_tracks::{CompressedTracks, TrackTable};
use crate::error::CurveCodecError;

/// How a seek between two samples resolves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SampleRoundingPolicy {
    /// Interpolate linearly between the surrounding samples.
    #[default]
    None,
    /// Snap to the sample at or before the query time.
    Floor,
    /// Snap to the sample at or after the query time.
    Ceil,
    /// Snap to the closest sample.
    Nearest,
}

/// Rounding slack of `time * rate`, in ulps of the sample index.
const SAMPLE_SNAP_ULPS: f32 = 4.0;

/// Lands a fractional sample index that only misses a whole sample by float
/// rounding exactly on that sample.
fn snap_to_sample(sample_index: f32) -> f32 {
    let nearest = sample_index.round();
    let tolerance = SAMPLE_SNAP_ULPS * f32::EPSILON * nearest.max(1.0);
    if (sample_index - nearest).abs() <= tolerance {
        nearest
    } else {
        sample_index
    }
}

/// Receives decompressed values, one call per track.
pub trait TrackWriter {
    fn write_float1(&mut self, track_index: u32, value: f32);
}

/// Where the last seek landed.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SeekPosition {
    key0: usize,
    key1: usize,
    alpha: f32,
}

/// Decoding state for one blob and one query time.
#[derive(Debug)]
pub struct DecompressionContext<'a> {
    table: TrackTable<'a>,
    num_samples: usize,
    sample_rate: f32,
    duration: f32,
    position: SeekPosition,
}

impl<'a> DecompressionContext<'a> {
    /// Binds a context to `compressed`, positioned at time 0.
    pub fn initialize(compressed: &CompressedTracks<'a>) -> Result<Self, CurveCodecError> {
        Ok(Self {
            table: compressed.track_table()?,
            num_samples: compressed.num_samples_per_track(),
            sample_rate: compressed.sample_rate(),
            duration: compressed.duration(),
            position: SeekPosition {
                key0: 0,
                key1: 0,
                alpha: 0.0,
            },
        })
    }

    pub fn num_tracks(&self) -> usize {
        self.table.descriptors().len()
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Positions the context at `sample_time`, clamped to the blob's duration.
    pub fn seek(&mut self, sample_time: f32, rounding_policy: SampleRoundingPolicy) {
        if self.num_samples <= 1 || !sample_time.is_finite() {
            self.position = SeekPosition {
                key0: 0,
                key1: 0,
                alpha: 0.0,
            };
            return;
        }

        let last_key = self.num_samples - 1;
        let clamped_time = sample_time.clamp(0.0, self.duration);
        let sample_index = snap_to_sample(clamped_time * self.sample_rate);
        let key0 = (sample_index.floor() as usize).min(last_key);
        let key1 = (key0 + 1).min(last_key);
        let raw_alpha = (sample_index - key0 as f32).clamp(0.0, 1.0);

        let alpha = match rounding_policy {
            SampleRoundingPolicy::None => raw_alpha,
            SampleRoundingPolicy::Floor => 0.0,
            SampleRoundingPolicy::Ceil => {
                if raw_alpha > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            SampleRoundingPolicy::Nearest => {
                if raw_alpha >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        };

        self.position = SeekPosition { key0, key1, alpha };
    }

    /// Writes the value of every track at the current position.
    pub fn decompress_tracks<W: TrackWriter + ?Sized>(&self, writer: &mut W) -> Result<(), CurveCodecError> {
        for track_index in 0..self.num_tracks() {
            self.decompress_track(track_index, writer)?;
        }
        Ok(())
    }

    /// Writes the value of a single track at the current position.
    pub fn decompress_track<W: TrackWriter + ?Sized>(
        &self,
        track_index: usize,
        writer: &mut W,
    ) -> Result<(), CurveCodecError> {
        let descriptor = self.table.descriptors().get(track_index).ok_or_else(|| {
            CurveCodecError::InternalError(format!(
                "Track index {} is out of range for {} tracks",
                track_index,
                self.num_tracks()
            ))
        })?;

        let SeekPosition { key0, key1, alpha } = self.position;
        let value0 = self.table.sample(track_index, key0)?;
        let value = if key0 == key1 || alpha == 0.0 {
            value0
        } else {
            let value1 = self.table.sample(track_index, key1)?;
            if alpha == 1.0 {
                value1
            } else {
                value0 + (value1 - value0) * alpha
            }
        };

        writer.write_float1(descriptor.output_index, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::compress::{compress_track_list, CompressionSettings};
    use crate::codec::{DefaultAllocator, TrackArray, TrackDescScalar, TrackFloat1};

    #[derive(Default)]
    struct CollectingWriter {
        values: Vec<(u32, f32)>,
    }

    impl TrackWriter for CollectingWriter {
        fn write_float1(&mut self, track_index: u32, value: f32) {
            self.values.push((track_index, value));
        }
    }

    fn ramp_blob() -> Vec<u8> {
        // 5 samples over 1 second: 0, 0.25, 0.5, 0.75, 1.0 at 4 Hz
        let mut tracks = TrackArray::with_capacity(2);
        tracks.push(TrackFloat1::from_samples(
            TrackDescScalar::new(0, 0.0001),
            vec![0.0, 10.0, 20.0, 30.0, 40.0],
            4.0,
        ));
        tracks.push(TrackFloat1::from_samples(
            TrackDescScalar::new(1, 0.0001),
            vec![5.0, 5.0, 5.0, 5.0, 5.0],
            4.0,
        ));
        let (buffer, _) = compress_track_list(&DefaultAllocator, &tracks, &CompressionSettings::default()).unwrap();
        buffer.to_vec()
    }

    fn value_at(bytes: &[u8], time: f32, policy: SampleRoundingPolicy) -> f32 {
        let compressed = CompressedTracks::from_bytes(bytes).unwrap();
        let mut context = DecompressionContext::initialize(&compressed).unwrap();
        context.seek(time, policy);
        let mut writer = CollectingWriter::default();
        context.decompress_track(0, &mut writer).unwrap();
        writer.values[0].1
    }

    #[test]
    fn test_interpolates_between_samples() {
        let bytes = ramp_blob();
        assert!((value_at(&bytes, 0.125, SampleRoundingPolicy::None) - 5.0).abs() < 1e-3);
        assert!((value_at(&bytes, 0.5, SampleRoundingPolicy::None) - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_sample_times_land_on_whole_samples() {
        // 18001 samples over 600s: i / rate only misses sample i by rounding.
        let num_samples = 18_001;
        let sample_rate = (num_samples - 1) as f32 / 600.0;
        let samples: Vec<f32> = (0..num_samples).map(|i| (i % 2) as f32).collect();
        let mut tracks = TrackArray::with_capacity(1);
        tracks.push(TrackFloat1::from_samples(TrackDescScalar::new(0, 0.001), samples, sample_rate));
        let (buffer, _) = compress_track_list(&DefaultAllocator, &tracks, &CompressionSettings::default()).unwrap();

        let compressed = CompressedTracks::from_bytes(&buffer).unwrap();
        let mut context = DecompressionContext::initialize(&compressed).unwrap();
        let inv_sample_rate = 1.0 / sample_rate;
        for i in 0..num_samples {
            context.seek(i as f32 * inv_sample_rate, SampleRoundingPolicy::None);
            let mut writer = CollectingWriter::default();
            context.decompress_track(0, &mut writer).unwrap();
            let expected = (i % 2) as f32;
            assert!((writer.values[0].1 - expected).abs() <= 0.001, "sample {}", i);
        }
    }

    #[test]
    fn test_snap_only_absorbs_rounding() {
        assert_eq!(snap_to_sample(2.9999998), 3.0);
        assert_eq!(snap_to_sample(12_345.9), 12_345.9);
        assert_eq!(snap_to_sample(0.5), 0.5);
        assert_eq!(snap_to_sample(0.0), 0.0);
    }

    #[test]
    fn test_rounding_policies() {
        let bytes = ramp_blob();
        let t = 0.3; // between sample 1 (0.25) and sample 2 (0.5), closer to 1
        assert!((value_at(&bytes, t, SampleRoundingPolicy::Floor) - 10.0).abs() < 1e-3);
        assert!((value_at(&bytes, t, SampleRoundingPolicy::Ceil) - 20.0).abs() < 1e-3);
        assert!((value_at(&bytes, t, SampleRoundingPolicy::Nearest) - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_seek_clamps_outside_the_clip() {
        let bytes = ramp_blob();
        assert!((value_at(&bytes, -3.0, SampleRoundingPolicy::None) - 0.0).abs() < 1e-3);
        assert!((value_at(&bytes, 99.0, SampleRoundingPolicy::None) - 40.0).abs() < 1e-3);
        assert!((value_at(&bytes, f32::NAN, SampleRoundingPolicy::None) - 0.0).abs() < 1e-3);
    }

    #[test]
    fn test_decompress_tracks_reports_output_indices() {
        let bytes = ramp_blob();
        let compressed = CompressedTracks::from_bytes(&bytes).unwrap();
        let mut context = DecompressionContext::initialize(&compressed).unwrap();
        context.seek(1.0, SampleRoundingPolicy::None);
        let mut writer = CollectingWriter::default();
        context.decompress_tracks(&mut writer).unwrap();
        assert_eq!(writer.values.len(), 2);
        assert_eq!(writer.values[0].0, 0);
        assert!((writer.values[0].1 - 40.0).abs() < 1e-3);
        assert_eq!(writer.values[1], (1, 5.0));
    }

    #[test]
    fn test_out_of_range_track_is_an_error() {
        let bytes = ramp_blob();
        let compressed = CompressedTracks::from_bytes(&bytes).unwrap();
        let context = DecompressionContext::initialize(&compressed).unwrap();
        let mut writer = CollectingWriter::default();
        assert!(context.decompress_track(2, &mut writer).is_err());
        assert!(writer.values.is_empty());
    }
}
