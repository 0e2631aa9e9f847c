//! The compression driver: turns authored curves into one codec blob.

use log::{debug, warn};

use crate::codec::{
    calculate_compression_error, compress_track_list, CompressedTracks, TrackAllocator, TrackArray, TrackDescScalar,
    TrackFloat1,
};
use crate::config::CurveCodecConfig;
use crate::curve_pipeline::precision::derive_precision;
use crate::curve_pipeline::resample::SampleGrid;
use crate::error::CurveCodecError;
use crate::types::CurveEvaluator;

/// Builds one track per curve, in input order, on the shared sample grid.
///
/// Track `i` gets output index `i` and a precision (and constant threshold)
/// derived from `morph_deltas[i]`.
pub fn build_track_array<C: CurveEvaluator>(
    curves: &[C],
    morph_deltas: &[f32],
    grid: &SampleGrid,
    config: &CurveCodecConfig,
) -> Result<TrackArray, CurveCodecError> {
    if curves.len() != morph_deltas.len() {
        return Err(CurveCodecError::Compression(format!(
            "Got {} morph target deltas for {} curves",
            morph_deltas.len(),
            curves.len()
        )));
    }

    let mut tracks = TrackArray::with_capacity(curves.len());
    for (curve_index, (curve, &max_delta)) in curves.iter().zip(morph_deltas).enumerate() {
        let output_index = u32::try_from(curve_index)
            .map_err(|_| CurveCodecError::Compression(format!("Too many curves: {}", curves.len())))?;
        let precision = derive_precision(
            max_delta,
            config.curve_precision,
            config.morph_target_position_precision,
        );
        log_metric!(
            "event" = "derive_precision",
            "curve" = &curve_index,
            "max_morph_delta" = &max_delta,
            "precision" = &precision
        );

        let mut track = TrackFloat1::make_reserve(
            TrackDescScalar::new(output_index, precision),
            grid.num_samples(),
            grid.sample_rate(),
        );
        for (sample_index, sample_time) in grid.sample_times().enumerate() {
            track[sample_index] = curve.eval(sample_time);
        }
        tracks.push(track);
    }
    Ok(tracks)
}

/// Compresses `curves` sampled `num_samples` times over `sequence_length`
/// seconds and returns an owned copy of the blob.
///
/// The codec's buffer is leased from `allocator` and handed back before this
/// returns, whether compression succeeds or not.
pub fn compress_curves<A, C>(
    allocator: &A,
    curves: &[C],
    morph_deltas: &[f32],
    num_samples: usize,
    sequence_length: f32,
    config: &CurveCodecConfig,
) -> Result<Vec<u8>, CurveCodecError>
where
    A: TrackAllocator + ?Sized,
    C: CurveEvaluator,
{
    let grid = SampleGrid::new(num_samples, sequence_length);
    let result = build_track_array(curves, morph_deltas, &grid, config).and_then(|tracks| {
        let (buffer, stats) = compress_track_list(allocator, &tracks, &config.compression)?;
        let bytes = buffer.to_vec();
        debug!(
            "Compressed {} curves into {} bytes ({} constant, {} quantized, {} raw)",
            tracks.len(),
            stats.compressed_size,
            stats.num_constant_tracks,
            stats.num_quantized_tracks,
            stats.num_raw_tracks
        );
        report_compression_error(&tracks, &bytes);
        Ok(bytes)
    });

    match result {
        Ok(bytes) => {
            if cfg!(debug_assertions) {
                CompressedTracks::from_bytes(&bytes)
                    .and_then(|compressed| compressed.is_valid(true))
                    .map_err(|e| CurveCodecError::InternalError(format!("Fresh blob failed validation: {}", e)))?;
            }
            Ok(bytes)
        }
        Err(e) => {
            let e = match e {
                CurveCodecError::Compression(_) => e,
                other => CurveCodecError::Compression(other.to_string()),
            };
            warn!("Failed to compress curves: {}", e);
            Err(e)
        }
    }
}

/// Logs the worst reconstruction error. Never fails the compression.
fn report_compression_error(tracks: &TrackArray, bytes: &[u8]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let error = CompressedTracks::from_bytes(bytes).and_then(|compressed| calculate_compression_error(tracks, &compressed));
    match error {
        Ok(worst) => debug!(
            "Curve error: {:.4} (curve {} @ {:.3})",
            worst.error, worst.index, worst.sample_time
        ),
        Err(e) => debug!("Could not measure curve error: {}", e),
    }
}
