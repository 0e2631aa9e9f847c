// In: src/curve_pipeline/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Curve Pipeline
// ====================================================================================
//
// The `curve_pipeline` adapts authored animation curves to the track codec. It is the
// only layer that knows about curve names, morph targets and clip timing; the codec
// below it only sees numbered tracks.
//
// Data Flow (Compression):
//
//   1. [UniformCurveCodec::compress]   -> Receives `CompressibleCurveData`
//         |
//         `-> a. `precision`: max morph displacement per curve -> per-curve precision
//         |
//         `-> b. `resample`: every curve sampled on one uniform `SampleGrid`
//         |
//   2. [compressor::compress_curves]   -> `TrackArray` -> `codec::compress_track_list`
//         |
//         `-> Returns the blob; the curve names are stored beside it in track order
//
// Data Flow (Decompression):
//
//   1. [decompressor]                  -> Receives blob + names + clip time
//         |
//         `-> a. lightweight header validation, seek with linear interpolation
//         |
//         `-> b. values written into a `BlendedCurve`, or one value by curve uid
//
// ====================================================================================
pub mod codec;
pub mod compressor;
pub mod decompressor;
pub mod precision;
pub mod resample;

pub use codec::{CompressedCurveData, CurveCompressionCodec, UniformCurveCodec};
pub use compressor::{build_track_array, compress_curves};
pub use decompressor::{decompress_all, decompress_one};
pub use precision::{derive_precision, morph_target_max_position_deltas};
pub use resample::{resample, SampleGrid};

#[cfg(test)]
mod tests;
