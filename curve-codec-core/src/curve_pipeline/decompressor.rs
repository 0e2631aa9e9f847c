//! The playback decoder: reads curve values out of a blob at a clip time.
//!
//! Only the blob and the name list written beside it are needed; nothing from
//! the compression side is consulted.

use crate::codec::{CompressedTracks, DecompressionContext, SampleRoundingPolicy, TrackWriter};
use crate::error::CurveCodecError;
use crate::types::{BlendedCurve, CurveName, CurveUid};

/// Routes every decoded track to its curve in a `BlendedCurve`, skipping the
/// curves the buffer does not accept.
struct BlendedCurveWriter<'a> {
    names: &'a [CurveName],
    curves: &'a mut BlendedCurve,
}

impl TrackWriter for BlendedCurveWriter<'_> {
    fn write_float1(&mut self, track_index: u32, value: f32) {
        if let Some(name) = self.names.get(track_index as usize) {
            if self.curves.is_enabled(name.uid) {
                self.curves.set(name.uid, value);
            }
        }
    }
}

/// Captures the single value of a one-track query.
#[derive(Default)]
struct ScalarCurveWriter {
    value: f32,
}

impl TrackWriter for ScalarCurveWriter {
    fn write_float1(&mut self, _track_index: u32, value: f32) {
        self.value = value;
    }
}

fn open_blob<'a>(blob: &'a [u8], names: &[CurveName]) -> Result<CompressedTracks<'a>, CurveCodecError> {
    let compressed = CompressedTracks::from_bytes(blob)?;
    compressed.is_valid(false)?;
    if compressed.num_tracks() != names.len() {
        return Err(CurveCodecError::MalformedBlob(format!(
            "Blob holds {} tracks but {} curve names were stored beside it",
            compressed.num_tracks(),
            names.len()
        )));
    }
    Ok(compressed)
}

/// Writes every curve's value at `time` into `out`, for the curves it has enabled.
pub fn decompress_all(blob: &[u8], names: &[CurveName], time: f32, out: &mut BlendedCurve) -> Result<(), CurveCodecError> {
    if names.is_empty() {
        return Ok(());
    }

    let compressed = open_blob(blob, names)?;
    let mut context = DecompressionContext::initialize(&compressed)?;
    context.seek(time, SampleRoundingPolicy::None);
    context.decompress_tracks(&mut BlendedCurveWriter { names, curves: out })
}

/// Value of curve `uid` at `time`, or 0.0 when the blob does not hold it.
pub fn decompress_one(blob: &[u8], names: &[CurveName], uid: CurveUid, time: f32) -> Result<f32, CurveCodecError> {
    if names.is_empty() {
        return Ok(0.0);
    }

    let compressed = open_blob(blob, names)?;
    let Some(track_index) = names.iter().position(|name| name.uid == uid) else {
        return Ok(0.0);
    };

    let mut context = DecompressionContext::initialize(&compressed)?;
    context.seek(time, SampleRoundingPolicy::None);

    let mut writer = ScalarCurveWriter::default();
    context.decompress_track(track_index, &mut writer)?;
    Ok(writer.value)
}
