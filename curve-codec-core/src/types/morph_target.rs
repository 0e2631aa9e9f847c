//! Morph target data, consulted only to size the tolerance of the curves that
//! drive them.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::codec::format::{hash64, hash64_with_seed};

/// Displacement of one vertex when its morph target is fully applied.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct MorphTargetDelta {
    pub position_delta: [f32; 3],
}

impl MorphTargetDelta {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            position_delta: [x, y, z],
        }
    }

    /// Euclidean length of the displacement.
    pub fn magnitude(&self) -> f32 {
        let [x, y, z] = self.position_delta;
        (x * x + y * y + z * z).sqrt()
    }
}

/// Per-LOD vertex deltas of one named morph target.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MorphTarget {
    pub name: String,
    pub lod_deltas: Vec<Vec<MorphTargetDelta>>,
}

impl MorphTarget {
    pub fn new(name: impl Into<String>, lod_deltas: Vec<Vec<MorphTargetDelta>>) -> Self {
        Self {
            name: name.into(),
            lod_deltas,
        }
    }

    /// Deltas for `lod_index`, empty when the LOD does not exist.
    pub fn deltas(&self, lod_index: usize) -> &[MorphTargetDelta] {
        self.lod_deltas.get(lod_index).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// The mesh side of the codec: finds morph targets by curve display name.
pub trait MorphTargetSource {
    fn find_morph_target(&self, name: &str) -> Option<&MorphTarget>;

    /// Identity of the mesh's imported model. Any content change must change it.
    fn model_guid(&self) -> Option<u64>;
}

/// An in-memory set of morph targets keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MorphTargetMesh {
    targets: HashMap<String, MorphTarget>,
}

impl MorphTargetMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targets(targets: impl IntoIterator<Item = MorphTarget>) -> Self {
        let mut mesh = Self::new();
        for target in targets {
            mesh.insert(target);
        }
        mesh
    }

    /// Adds or replaces the target with the same name.
    pub fn insert(&mut self, target: MorphTarget) -> Option<MorphTarget> {
        self.targets.insert(target.name.clone(), target)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl MorphTargetSource for MorphTargetMesh {
    fn find_morph_target(&self, name: &str) -> Option<&MorphTarget> {
        self.targets.get(name)
    }

    /// Content hash over every target, independent of insertion order.
    fn model_guid(&self) -> Option<u64> {
        let mut names: Vec<&String> = self.targets.keys().collect();
        names.sort();

        let mut guid = hash64(b"morph-target-mesh");
        for name in names {
            guid = hash64_with_seed(guid, name.as_bytes());
            for (lod, deltas) in self.targets[name].lod_deltas.iter().enumerate() {
                guid = hash64_with_seed(guid, &(lod as u64).to_le_bytes());
                for delta in deltas {
                    for component in delta.position_delta {
                        guid = hash64_with_seed(guid, &component.to_le_bytes());
                    }
                }
            }
        }
        Some(guid)
    }
}
