use super::*;
use crate::codec::{CompressedTracks, CountingAllocator};
use crate::config::CurveCodecConfig;
use crate::error::CurveCodecError;
use crate::types::{
    BlendedCurve, CompressibleCurveData, CurveEvaluator, CurveName, CurveUid, FloatCurve, MorphTarget,
    MorphTargetDelta, MorphTargetMesh, RichCurve, RichCurveKey,
};
use std::sync::Arc;

fn linear_curve(uid: u32, name: &str, points: &[(f32, f32)]) -> FloatCurve {
    let keys = points.iter().map(|&(t, v)| RichCurveKey::linear(t, v)).collect();
    FloatCurve::new(CurveName::new(uid, name), RichCurve::from_keys(keys))
}

/// Three curves of different shapes over a 2 second, 61 frame clip.
fn create_test_clip() -> CompressibleCurveData {
    let eased = FloatCurve::new(
        CurveName::new(2, "brow_raise"),
        RichCurve::from_keys(vec![
            RichCurveKey::cubic(0.0, 0.0, 0.0, 0.0),
            RichCurveKey::cubic(1.2, 0.8, 0.0, 0.0),
            RichCurveKey::cubic(2.0, 0.1, -1.0, -1.0),
        ]),
    );
    let stepped = FloatCurve::new(
        CurveName::new(3, "eye_state"),
        RichCurve::from_keys(vec![
            RichCurveKey::constant(0.0, 0.0),
            RichCurveKey::constant(0.5, 1.0),
            RichCurveKey::constant(1.5, 0.0),
        ]),
    );
    CompressibleCurveData {
        curves: vec![
            linear_curve(1, "smile", &[(0.0, 0.0), (1.0, 1.0), (2.0, 0.25)]),
            eased,
            stepped,
        ],
        num_frames: 61,
        sequence_length: 2.0,
    }
}

fn smile_mesh(displacement: f32) -> Arc<MorphTargetMesh> {
    Arc::new(MorphTargetMesh::with_targets([MorphTarget::new(
        "smile",
        vec![vec![
            MorphTargetDelta::new(displacement, 0.0, 0.0),
            MorphTargetDelta::new(0.0, displacement * 0.5, 0.0),
        ]],
    )]))
}

fn assert_round_trip_within(
    codec: &impl CurveCompressionCodec,
    clip: &CompressibleCurveData,
    compressed: &CompressedCurveData,
    precision_of: impl Fn(&FloatCurve) -> f32,
) {
    let grid = SampleGrid::new(clip.num_frames, clip.sequence_length);
    for curve in &clip.curves {
        let precision = precision_of(curve);
        for sample_time in grid.sample_times() {
            let expected = curve.eval(sample_time);
            let actual = codec.decompress_curve(compressed, curve.name.uid, sample_time).unwrap();
            assert!(
                (actual - expected).abs() <= precision + 1e-6,
                "curve {} at {}: expected {}, got {} (precision {})",
                curve.name.display_name,
                sample_time,
                expected,
                actual,
                precision
            );
        }
    }
}

#[test]
fn test_round_trip_within_curve_precision() {
    let codec = UniformCurveCodec::new(CurveCodecConfig::default()).unwrap();
    let clip = create_test_clip();
    let compressed = codec.compress(&clip).unwrap();

    assert_eq!(
        compressed.compressed_curve_names,
        clip.curves.iter().map(|c| c.name.clone()).collect::<Vec<_>>()
    );
    assert_round_trip_within(&codec, &clip, &compressed, |_| 0.001);
}

#[test]
fn test_round_trip_with_morph_target_precision() {
    // 0.01cm over a 50cm displacement: the smile weight needs 0.0002.
    let codec = UniformCurveCodec::new(CurveCodecConfig::default())
        .unwrap()
        .with_morph_target_source(smile_mesh(50.0));
    let clip = create_test_clip();
    let compressed = codec.compress(&clip).unwrap();

    assert_round_trip_within(&codec, &clip, &compressed, |curve| {
        if curve.name.display_name == "smile" {
            0.0002
        } else {
            0.001
        }
    });
}

#[test]
fn test_morph_target_curves_cost_more_bits() {
    let clip = create_test_clip();
    let plain = UniformCurveCodec::new(CurveCodecConfig::default()).unwrap();
    let morph = UniformCurveCodec::new(CurveCodecConfig::default())
        .unwrap()
        .with_morph_target_source(smile_mesh(50.0));

    let plain_size = plain.compress(&clip).unwrap().compressed_curve_byte_stream.len();
    let morph_size = morph.compress(&clip).unwrap().compressed_curve_byte_stream.len();
    assert!(morph_size > plain_size, "{} <= {}", morph_size, plain_size);
}

#[test]
fn test_compression_is_deterministic() {
    let codec = UniformCurveCodec::new(CurveCodecConfig::default())
        .unwrap()
        .with_morph_target_source(smile_mesh(3.0));
    let clip = create_test_clip();
    let first = codec.compress(&clip).unwrap();
    let second = codec.compress(&clip).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_curve_order_does_not_change_values() {
    let codec = UniformCurveCodec::new(CurveCodecConfig::default()).unwrap();
    let clip = create_test_clip();
    let mut permuted = clip.clone();
    permuted.curves.rotate_left(1);

    let original = codec.compress(&clip).unwrap();
    let reordered = codec.compress(&permuted).unwrap();

    let uids = [CurveUid(1), CurveUid(2), CurveUid(3)];
    for time in [0.0, 0.33, 0.9, 1.51, 2.0] {
        let mut a = BlendedCurve::with_enabled(uids);
        let mut b = BlendedCurve::with_enabled(uids);
        codec.decompress_curves(&original, &mut a, time).unwrap();
        codec.decompress_curves(&reordered, &mut b, time).unwrap();
        for uid in uids {
            assert_eq!(a.get(uid), b.get(uid), "uid {:?} at {}", uid, time);
            assert_eq!(
                codec.decompress_curve(&original, uid, time).unwrap(),
                codec.decompress_curve(&reordered, uid, time).unwrap()
            );
        }
    }
}

#[test]
fn test_missing_curve_is_exactly_zero() {
    let codec = UniformCurveCodec::new(CurveCodecConfig::default()).unwrap();
    let compressed = codec.compress(&create_test_clip()).unwrap();
    assert_eq!(codec.decompress_curve(&compressed, CurveUid(404), 1.0).unwrap(), 0.0);

    let empty = CompressedCurveData::default();
    assert_eq!(codec.decompress_curve(&empty, CurveUid(1), 1.0).unwrap(), 0.0);
    let mut out = BlendedCurve::with_enabled([CurveUid(1)]);
    codec.decompress_curves(&empty, &mut out, 1.0).unwrap();
    assert!(out.is_empty());
}

#[test]
fn test_step_curve_over_four_samples() {
    let codec = UniformCurveCodec::new(CurveCodecConfig::default()).unwrap();
    let clip = CompressibleCurveData {
        curves: vec![linear_curve(
            7,
            "gate",
            &[(0.0, 0.0), (1.0 / 3.0, 0.0), (2.0 / 3.0, 1.0), (1.0, 1.0)],
        )],
        num_frames: 4,
        sequence_length: 1.0,
    };
    let compressed = codec.compress(&clip).unwrap();

    let expected = [0.0f32, 0.0, 1.0, 1.0];
    for (i, want) in expected.iter().enumerate() {
        let value = codec.decompress_curve(&compressed, CurveUid(7), i as f32 / 3.0).unwrap();
        assert!((value - want).abs() <= 0.001, "sample {}: {}", i, value);
    }
}

#[test]
fn test_static_pose_holds_the_first_value() {
    let codec = UniformCurveCodec::new(CurveCodecConfig::default()).unwrap();
    let clip = CompressibleCurveData {
        curves: vec![linear_curve(1, "smile", &[(0.0, 0.4), (1.0, 0.9)])],
        num_frames: 1,
        sequence_length: 1.0,
    };
    let compressed = codec.compress(&clip).unwrap();
    let header = CompressedTracks::from_bytes(&compressed.compressed_curve_byte_stream).unwrap();
    assert_eq!(header.sample_rate(), 30.0);
    assert_eq!(header.num_samples_per_track(), 1);

    for time in [0.0, 0.5, 1.0, 10.0] {
        let value = codec.decompress_curve(&compressed, CurveUid(1), time).unwrap();
        assert!((value - 0.4).abs() <= 0.001);
    }
}

#[test]
fn test_unbounded_length_is_a_static_pose() {
    let codec = UniformCurveCodec::new(CurveCodecConfig::default()).unwrap();
    let clip = CompressibleCurveData {
        curves: vec![linear_curve(1, "smile", &[(0.0, 0.4), (1.0, 0.9)])],
        num_frames: 4,
        sequence_length: f32::INFINITY,
    };
    let compressed = codec.compress(&clip).unwrap();
    let header = CompressedTracks::from_bytes(&compressed.compressed_curve_byte_stream).unwrap();
    assert_eq!(header.sample_rate(), 30.0);

    for time in [0.0, 0.05, 5.0, f32::INFINITY] {
        let value = codec.decompress_curve(&compressed, CurveUid(1), time).unwrap();
        assert!((value - 0.4).abs() <= 0.001, "at {}: {}", time, value);
    }
}

#[test]
fn test_round_trip_on_a_long_clip() {
    // Ten minutes at 30 Hz, alternating every frame so any off-by-one read shows.
    let grid = SampleGrid::new(18001, 600.0);
    let keys = grid
        .sample_times()
        .enumerate()
        .map(|(i, t)| RichCurveKey::linear(t, (i % 2) as f32))
        .collect();
    let clip = CompressibleCurveData {
        curves: vec![FloatCurve::new(CurveName::new(1, "blink"), RichCurve::from_keys(keys))],
        num_frames: 18001,
        sequence_length: 600.0,
    };
    let codec = UniformCurveCodec::new(CurveCodecConfig::default()).unwrap();
    let compressed = codec.compress(&clip).unwrap();
    assert_round_trip_within(&codec, &clip, &compressed, |_| 0.001);
}

#[test]
fn test_failed_compression_releases_everything() {
    let codec = UniformCurveCodec::with_allocator(CurveCodecConfig::default(), CountingAllocator::new()).unwrap();
    let mut clip = create_test_clip();
    clip.num_frames = 0;

    let err = codec.compress(&clip).unwrap_err();
    assert!(matches!(err, CurveCodecError::Compression(_)));
    assert!(codec.allocator().is_balanced());

    clip.num_frames = 61;
    codec.compress(&clip).unwrap();
    assert_eq!(codec.allocator().allocations(), 1);
    assert_eq!(codec.allocator().deallocations(), 1);
    assert!(codec.allocator().is_balanced());
}

#[test]
fn test_entropy_coded_round_trip() {
    let mut config = CurveCodecConfig::default();
    config.compression.entropy_coding_level = Some(3);
    let codec = UniformCurveCodec::new(config).unwrap();
    let clip = create_test_clip();
    let compressed = codec.compress(&clip).unwrap();

    let header = CompressedTracks::from_bytes(&compressed.compressed_curve_byte_stream).unwrap();
    assert!(header.header().is_entropy_coded());
    assert_round_trip_within(&codec, &clip, &compressed, |_| 0.001);
}

#[test]
fn test_corrupted_blob_is_malformed() {
    let codec = UniformCurveCodec::new(CurveCodecConfig::default()).unwrap();
    let mut compressed = codec.compress(&create_test_clip()).unwrap();

    let mut truncated = compressed.clone();
    truncated.compressed_curve_byte_stream.truncate(10);
    let err = codec.decompress_curve(&truncated, CurveUid(1), 0.5).unwrap_err();
    assert!(matches!(err, CurveCodecError::MalformedBlob(_)));

    compressed.compressed_curve_byte_stream[0] ^= 0xFF;
    let mut out = BlendedCurve::with_enabled([CurveUid(1)]);
    let err = codec.decompress_curves(&compressed, &mut out, 0.5).unwrap_err();
    assert!(matches!(err, CurveCodecError::MalformedBlob(_)));
}

#[test]
fn test_cache_key_tracks_every_setting() {
    let base = UniformCurveCodec::new(CurveCodecConfig::default()).unwrap();
    assert_eq!(base.cache_key(), UniformCurveCodec::new(CurveCodecConfig::default()).unwrap().cache_key());

    let looser = UniformCurveCodec::new(CurveCodecConfig {
        curve_precision: 0.01,
        ..Default::default()
    })
    .unwrap();
    let rebuilt = UniformCurveCodec::new(CurveCodecConfig {
        force_rebuild_version: 1,
        ..Default::default()
    })
    .unwrap();
    let with_mesh = UniformCurveCodec::new(CurveCodecConfig::default())
        .unwrap()
        .with_morph_target_source(smile_mesh(3.0));
    let with_edited_mesh = UniformCurveCodec::new(CurveCodecConfig::default())
        .unwrap()
        .with_morph_target_source(smile_mesh(4.0));

    let keys = [
        base.cache_key(),
        looser.cache_key(),
        rebuilt.cache_key(),
        with_mesh.cache_key(),
        with_edited_mesh.cache_key(),
    ];
    for i in 0..keys.len() {
        for j in (i + 1)..keys.len() {
            assert_ne!(keys[i], keys[j], "keys {} and {} collide", i, j);
        }
    }
    assert!(base.cache_key().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_invalid_config_is_rejected_up_front() {
    let config = CurveCodecConfig {
        curve_precision: -1.0,
        ..Default::default()
    };
    assert!(matches!(
        UniformCurveCodec::new(config),
        Err(CurveCodecError::InvalidConfig(_))
    ));
}
