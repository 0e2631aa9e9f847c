//! Source-side curve types: identities, keyed curves and the evaluator seam the
//! resampler samples through.

use serde::{Deserialize, Serialize};

/// Stable numeric identity of a curve, shared by the compressed name list and
/// the runtime `BlendedCurve` buffer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CurveUid(pub u32);

impl From<u32> for CurveUid {
    fn from(value: u32) -> Self {
        CurveUid(value)
    }
}

/// A curve's identity: its numeric uid plus the display name used to find a
/// morph target with the same name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurveName {
    pub uid: CurveUid,
    pub display_name: String,
}

impl CurveName {
    pub fn new(uid: impl Into<CurveUid>, display_name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: display_name.into(),
        }
    }
}

/// Anything that yields a scalar value at a time in seconds.
pub trait CurveEvaluator {
    fn eval(&self, time: f32) -> f32;
}

impl<F> CurveEvaluator for F
where
    F: Fn(f32) -> f32,
{
    fn eval(&self, time: f32) -> f32 {
        self(time)
    }
}

/// How a key blends toward the next one.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InterpMode {
    /// Hold the key's value until the next key.
    Constant,
    #[default]
    Linear,
    /// Cubic hermite using the keys' tangents (value per second).
    Cubic,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RichCurveKey {
    pub time: f32,
    pub value: f32,
    #[serde(default)]
    pub interp_mode: InterpMode,
    #[serde(default)]
    pub arrive_tangent: f32,
    #[serde(default)]
    pub leave_tangent: f32,
}

impl RichCurveKey {
    pub fn linear(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            interp_mode: InterpMode::Linear,
            arrive_tangent: 0.0,
            leave_tangent: 0.0,
        }
    }

    pub fn constant(time: f32, value: f32) -> Self {
        Self {
            interp_mode: InterpMode::Constant,
            ..Self::linear(time, value)
        }
    }

    pub fn cubic(time: f32, value: f32, arrive_tangent: f32, leave_tangent: f32) -> Self {
        Self {
            time,
            value,
            interp_mode: InterpMode::Cubic,
            arrive_tangent,
            leave_tangent,
        }
    }
}

/// A keyed curve, evaluated with constant extrapolation on both ends.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RichCurve {
    keys: Vec<RichCurveKey>,
    /// Value of a curve without keys.
    #[serde(default)]
    pub default_value: f32,
}

impl RichCurve {
    /// Builds a curve, sorting the keys by time.
    pub fn from_keys(mut keys: Vec<RichCurveKey>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            keys,
            default_value: 0.0,
        }
    }

    /// Inserts a key, keeping the keys ordered by time.
    pub fn add_key(&mut self, key: RichCurveKey) {
        let at = self.keys.partition_point(|k| k.time <= key.time);
        self.keys.insert(at, key);
    }

    pub fn keys(&self) -> &[RichCurveKey] {
        &self.keys
    }

    /// Time span covered by the keys, `(0, 0)` when there are none.
    pub fn time_range(&self) -> (f32, f32) {
        match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first.time, last.time),
            _ => (0.0, 0.0),
        }
    }

    fn find_segment(&self, time: f32) -> (usize, usize, f32) {
        let n = self.keys.len();
        if n == 1 || time.is_nan() || time <= self.keys[0].time {
            return (0, 0, 0.0);
        }
        if time >= self.keys[n - 1].time {
            return (n - 1, n - 1, 0.0);
        }
        // First key strictly after `time`; the range checks above keep it in 1..n.
        let right = self.keys.partition_point(|k| k.time <= time);
        let left = right - 1;
        let t0 = self.keys[left].time;
        let t1 = self.keys[right].time;
        let denom = (t1 - t0).max(f32::EPSILON);
        (left, right, ((time - t0) / denom).clamp(0.0, 1.0))
    }
}

impl CurveEvaluator for RichCurve {
    fn eval(&self, time: f32) -> f32 {
        if self.keys.is_empty() {
            return self.default_value;
        }

        let (i0, i1, alpha) = self.find_segment(time);
        let left = &self.keys[i0];
        if i0 == i1 {
            return left.value;
        }
        let right = &self.keys[i1];

        match left.interp_mode {
            InterpMode::Constant => left.value,
            InterpMode::Linear => left.value + (right.value - left.value) * alpha,
            InterpMode::Cubic => {
                let dt = right.time - left.time;
                let t2 = alpha * alpha;
                let t3 = t2 * alpha;
                let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
                let h10 = t3 - 2.0 * t2 + alpha;
                let h01 = -2.0 * t3 + 3.0 * t2;
                let h11 = t3 - t2;
                h00 * left.value + h10 * dt * left.leave_tangent + h01 * right.value + h11 * dt * right.arrive_tangent
            }
        }
    }
}

/// A named scalar curve as authored on an animation clip.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FloatCurve {
    pub name: CurveName,
    pub curve: RichCurve,
}

impl FloatCurve {
    pub fn new(name: CurveName, curve: RichCurve) -> Self {
        Self { name, curve }
    }
}

impl CurveEvaluator for FloatCurve {
    fn eval(&self, time: f32) -> f32 {
        self.curve.eval(time)
    }
}

/// Everything the compression driver needs from a clip.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CompressibleCurveData {
    pub curves: Vec<FloatCurve>,
    /// Number of uniformly spaced frames (samples) in the clip.
    pub num_frames: usize,
    /// Clip length in seconds.
    pub sequence_length: f32,
}
