//! The codec facade the animation system holds on to.

use std::fmt::Write as _;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::codec::{algorithm_version, DefaultAllocator, TrackAllocator};
use crate::config::CurveCodecConfig;
use crate::curve_pipeline::compressor::compress_curves;
use crate::curve_pipeline::decompressor::{decompress_all, decompress_one};
use crate::curve_pipeline::precision::morph_target_max_position_deltas;
use crate::error::CurveCodecError;
use crate::types::{BlendedCurve, CompressibleCurveData, CurveName, CurveUid, MorphTargetSource};

/// What a clip persists after compression: the blob plus the curve identity
/// of every track, in track order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressedCurveData {
    pub compressed_curve_names: Vec<CurveName>,
    pub compressed_curve_byte_stream: Vec<u8>,
}

/// A pluggable curve compression scheme.
pub trait CurveCompressionCodec {
    /// Appends every setting that influences the compressed output.
    fn populate_cache_key(&self, key: &mut Vec<u8>);

    /// Hex form of `populate_cache_key`, for use as a derived-data key.
    fn cache_key(&self) -> String {
        let mut key = Vec::new();
        self.populate_cache_key(&mut key);
        key.iter().fold(String::with_capacity(key.len() * 2), |mut hex, byte| {
            let _ = write!(hex, "{:02x}", byte);
            hex
        })
    }

    /// Compresses a clip's curves. On error the caller keeps whatever it had.
    fn compress(&self, data: &CompressibleCurveData) -> Result<CompressedCurveData, CurveCodecError>;

    /// Writes every enabled curve's value at `time` into `curves`.
    fn decompress_curves(
        &self,
        data: &CompressedCurveData,
        curves: &mut BlendedCurve,
        time: f32,
    ) -> Result<(), CurveCodecError>;

    /// Value of one curve at `time`; 0.0 if the clip does not hold it.
    fn decompress_curve(&self, data: &CompressedCurveData, uid: CurveUid, time: f32) -> Result<f32, CurveCodecError>;
}

/// Error-bounded uniform sampling of every curve into a single blob.
pub struct UniformCurveCodec<A: TrackAllocator = DefaultAllocator> {
    config: CurveCodecConfig,
    morph_target_source: Option<Arc<dyn MorphTargetSource + Send + Sync>>,
    allocator: A,
}

impl UniformCurveCodec<DefaultAllocator> {
    pub fn new(config: CurveCodecConfig) -> Result<Self, CurveCodecError> {
        Self::with_allocator(config, DefaultAllocator)
    }
}

impl<A: TrackAllocator> UniformCurveCodec<A> {
    pub fn with_allocator(config: CurveCodecConfig, allocator: A) -> Result<Self, CurveCodecError> {
        config.validate()?;
        Ok(Self {
            config,
            morph_target_source: None,
            allocator,
        })
    }

    /// Sizes the precision of curves named after one of `source`'s morph targets.
    pub fn with_morph_target_source(mut self, source: Arc<dyn MorphTargetSource + Send + Sync>) -> Self {
        self.morph_target_source = Some(source);
        self
    }

    pub fn config(&self) -> &CurveCodecConfig {
        &self.config
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    fn morph_target_source(&self) -> Option<&dyn MorphTargetSource> {
        self.morph_target_source
            .as_deref()
            .map(|source| source as &dyn MorphTargetSource)
    }
}

impl<A: TrackAllocator> CurveCompressionCodec for UniformCurveCodec<A> {
    fn populate_cache_key(&self, key: &mut Vec<u8>) {
        key.extend_from_slice(&self.config.curve_precision.to_le_bytes());
        key.extend_from_slice(&self.config.morph_target_position_precision.to_le_bytes());
        if let Some(guid) = self.morph_target_source().and_then(|source| source.model_guid()) {
            key.extend_from_slice(&guid.to_le_bytes());
        }
        match self.config.compression.entropy_coding_level {
            Some(level) => {
                key.push(1);
                key.extend_from_slice(&level.to_le_bytes());
            }
            None => key.push(0),
        }
        key.extend_from_slice(&self.config.force_rebuild_version.to_le_bytes());
        key.extend_from_slice(&algorithm_version().to_le_bytes());
    }

    fn compress(&self, data: &CompressibleCurveData) -> Result<CompressedCurveData, CurveCodecError> {
        let morph_deltas = morph_target_max_position_deltas(&data.curves, self.morph_target_source());
        let compressed_curve_byte_stream = compress_curves(
            &self.allocator,
            &data.curves,
            &morph_deltas,
            data.num_frames,
            data.sequence_length,
            &self.config,
        )?;
        debug!(
            "Compressed {} curves over {} frames ({:.3}s)",
            data.curves.len(),
            data.num_frames,
            data.sequence_length
        );

        Ok(CompressedCurveData {
            compressed_curve_names: data.curves.iter().map(|curve| curve.name.clone()).collect(),
            compressed_curve_byte_stream,
        })
    }

    fn decompress_curves(
        &self,
        data: &CompressedCurveData,
        curves: &mut BlendedCurve,
        time: f32,
    ) -> Result<(), CurveCodecError> {
        decompress_all(&data.compressed_curve_byte_stream, &data.compressed_curve_names, time, curves)
    }

    fn decompress_curve(&self, data: &CompressedCurveData, uid: CurveUid, time: f32) -> Result<f32, CurveCodecError> {
        decompress_one(&data.compressed_curve_byte_stream, &data.compressed_curve_names, uid, time)
    }
}
