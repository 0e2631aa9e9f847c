//! The runtime output buffer decompressed curve values are written into.

use hashbrown::{HashMap, HashSet};

use crate::types::curve::CurveUid;

/// A sparse set of curve values, restricted to the curves the consumer
/// asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlendedCurve {
    enabled: HashSet<CurveUid>,
    values: HashMap<CurveUid, f32>,
}

impl BlendedCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer that accepts exactly `uids`.
    pub fn with_enabled(uids: impl IntoIterator<Item = CurveUid>) -> Self {
        Self {
            enabled: uids.into_iter().collect(),
            values: HashMap::new(),
        }
    }

    pub fn enable(&mut self, uid: CurveUid) {
        self.enabled.insert(uid);
    }

    /// Stops accepting `uid` and forgets its value.
    pub fn disable(&mut self, uid: CurveUid) {
        self.enabled.remove(&uid);
        self.values.remove(&uid);
    }

    pub fn is_enabled(&self, uid: CurveUid) -> bool {
        self.enabled.contains(&uid)
    }

    pub fn set(&mut self, uid: CurveUid, value: f32) {
        self.values.insert(uid, value);
    }

    pub fn get(&self, uid: CurveUid) -> Option<f32> {
        self.values.get(&uid).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CurveUid, f32)> + '_ {
        self.values.iter().map(|(&uid, &value)| (uid, value))
    }

    /// Drops every value but keeps the enabled set.
    pub fn clear_values(&mut self) {
        self.values.clear();
    }
}
