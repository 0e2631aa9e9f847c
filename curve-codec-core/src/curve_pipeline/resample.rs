//! Uniform resampling of authored curves.

use crate::types::CurveEvaluator;

/// Sample rate used for clips too short to define one.
pub const STATIC_POSE_SAMPLE_RATE: f32 = 30.0;

/// Clips shorter than this (seconds) are a single pose.
const MIN_SEQUENCE_LENGTH: f32 = 0.0001;

/// The uniform time grid a clip is sampled on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleGrid {
    num_samples: usize,
    sequence_length: f32,
    sample_rate: f32,
}

impl SampleGrid {
    pub fn new(num_samples: usize, sequence_length: f32) -> Self {
        let is_static_pose = num_samples <= 1 || !is_measurable_length(sequence_length);
        let sample_rate = if is_static_pose {
            STATIC_POSE_SAMPLE_RATE
        } else {
            (num_samples - 1) as f32 / sequence_length
        };
        Self {
            num_samples,
            sequence_length,
            sample_rate,
        }
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn sequence_length(&self) -> f32 {
        self.sequence_length
    }

    pub fn is_static_pose(&self) -> bool {
        self.num_samples <= 1 || !is_measurable_length(self.sequence_length)
    }

    /// Time of sample `index`, clamped into the clip.
    pub fn sample_time(&self, index: usize) -> f32 {
        let inv_sample_rate = 1.0 / self.sample_rate;
        let end = if self.sequence_length.is_finite() {
            self.sequence_length.max(0.0)
        } else {
            0.0
        };
        (index as f32 * inv_sample_rate).clamp(0.0, end)
    }

    pub fn sample_times(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.num_samples).map(|i| self.sample_time(i))
    }

    /// Evaluates `curve` at every grid time.
    pub fn sample<C: CurveEvaluator + ?Sized>(&self, curve: &C) -> Vec<f32> {
        self.sample_times().map(|t| curve.eval(t)).collect()
    }
}

/// Finite and long enough to derive a sample rate from.
fn is_measurable_length(sequence_length: f32) -> bool {
    sequence_length.is_finite() && sequence_length >= MIN_SEQUENCE_LENGTH
}

/// Samples `curve` at `num_samples` evenly spaced times over `sequence_length`.
pub fn resample<C: CurveEvaluator + ?Sized>(curve: &C, num_samples: usize, sequence_length: f32) -> Vec<f32> {
    SampleGrid::new(num_samples, sequence_length).sample(curve)
}
