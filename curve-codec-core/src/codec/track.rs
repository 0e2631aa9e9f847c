//! The codec-facing track model: one uniformly sampled scalar sequence per
//! curve, plus the error tolerances the compressor must honour for it.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::error::CurveCodecError;

/// Per-track compression tolerances and output slot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TrackDescScalar {
    /// Slot the decompressed value is reported under.
    pub output_index: u32,
    /// Largest absolute reconstruction error tolerated for any sample.
    pub precision: f32,
    /// A track whose value range fits under this threshold is stored as a constant.
    pub constant_threshold: f32,
}

impl TrackDescScalar {
    /// Builds a descriptor whose constant threshold equals its precision.
    pub fn new(output_index: u32, precision: f32) -> Self {
        Self {
            output_index,
            precision,
            constant_threshold: precision,
        }
    }
}

/// A scalar track sampled at a uniform rate.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFloat1 {
    desc: TrackDescScalar,
    samples: Vec<f32>,
    sample_rate: f32,
}

impl TrackFloat1 {
    /// Creates a track of `num_samples` zeroed samples, ready to be filled in.
    pub fn make_reserve(desc: TrackDescScalar, num_samples: usize, sample_rate: f32) -> Self {
        Self {
            desc,
            samples: vec![0.0; num_samples],
            sample_rate,
        }
    }

    /// Creates a track that takes ownership of already computed samples.
    pub fn from_samples(desc: TrackDescScalar, samples: Vec<f32>, sample_rate: f32) -> Self {
        Self {
            desc,
            samples,
            sample_rate,
        }
    }

    pub fn desc(&self) -> &TrackDescScalar {
        &self.desc
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Time of the last sample in seconds; 0 for single-sample tracks.
    pub fn duration(&self) -> f32 {
        calculate_duration(self.samples.len(), self.sample_rate)
    }
}

impl Index<usize> for TrackFloat1 {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.samples[index]
    }
}

impl IndexMut<usize> for TrackFloat1 {
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.samples[index]
    }
}

/// Duration covered by `num_samples` samples taken at `sample_rate`.
pub fn calculate_duration(num_samples: usize, sample_rate: f32) -> f32 {
    if num_samples <= 1 || sample_rate <= 0.0 {
        0.0
    } else {
        (num_samples - 1) as f32 / sample_rate
    }
}

/// An ordered set of tracks handed to the compressor as a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackArray {
    tracks: Vec<TrackFloat1>,
}

impl TrackArray {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tracks: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, track: TrackFloat1) {
        self.tracks.push(track);
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrackFloat1> {
        self.tracks.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackFloat1> {
        self.tracks.iter()
    }

    /// Samples per track; every track shares it once the array is valid.
    pub fn num_samples_per_track(&self) -> usize {
        self.tracks.first().map_or(0, TrackFloat1::num_samples)
    }

    pub fn sample_rate(&self) -> f32 {
        self.tracks.first().map_or(0.0, TrackFloat1::sample_rate)
    }

    pub fn duration(&self) -> f32 {
        calculate_duration(self.num_samples_per_track(), self.sample_rate())
    }

    /// Reports the first reason this array cannot be compressed.
    pub fn is_valid(&self) -> Result<(), CurveCodecError> {
        let invalid = |msg: String| Err(CurveCodecError::Compression(msg));

        let num_samples = self.num_samples_per_track();
        let sample_rate = self.sample_rate();
        let mut seen_outputs = hashbrown::HashSet::with_capacity(self.tracks.len());

        for (index, track) in self.tracks.iter().enumerate() {
            let desc = track.desc();
            if track.num_samples() == 0 {
                return invalid(format!("Track {} has no samples", index));
            }
            if track.num_samples() != num_samples {
                return invalid(format!(
                    "Track {} has {} samples, expected {}",
                    index,
                    track.num_samples(),
                    num_samples
                ));
            }
            if !track.sample_rate().is_finite() || track.sample_rate() <= 0.0 {
                return invalid(format!("Track {} has invalid sample rate {}", index, track.sample_rate()));
            }
            if track.sample_rate() != sample_rate {
                return invalid(format!(
                    "Track {} has sample rate {}, expected {}",
                    index,
                    track.sample_rate(),
                    sample_rate
                ));
            }
            if !desc.precision.is_finite() || desc.precision <= 0.0 {
                return invalid(format!("Track {} has invalid precision {}", index, desc.precision));
            }
            if !desc.constant_threshold.is_finite() || desc.constant_threshold <= 0.0 {
                return invalid(format!(
                    "Track {} has invalid constant threshold {}",
                    index, desc.constant_threshold
                ));
            }
            if !seen_outputs.insert(desc.output_index) {
                return invalid(format!(
                    "Track {} reuses output index {}",
                    index, desc.output_index
                ));
            }
            if let Some(sample_index) = track.samples().iter().position(|s| !s.is_finite()) {
                return invalid(format!("Track {} sample {} is not finite", index, sample_index));
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TrackArray {
    type Item = &'a TrackFloat1;
    type IntoIter = std::slice::Iter<'a, TrackFloat1>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}
