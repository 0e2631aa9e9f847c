//! Per-curve error tolerances.
//!
//! A morph target moves every vertex by `delta * weight`, so an error of `e`
//! on the weight moves a vertex by at most `e * max_delta`. To keep vertices
//! within a world-space precision `p`, the weight needs precision
//! `p / max_delta`: 0.01cm over a 3cm displacement gives 0.0033, over 50cm it
//! gives 0.0002. Curves that drive nothing fall back to the plain curve
//! precision.

use crate::types::{FloatCurve, MorphTargetSource};

/// LOD whose deltas define a morph target's reach.
const MORPH_TARGET_LOD: usize = 0;

/// The precision a curve must be reconstructed with.
pub fn derive_precision(
    curve_max_morph_delta: f32,
    configured_curve_precision: f32,
    configured_morph_precision: f32,
) -> f32 {
    if curve_max_morph_delta > 0.0 {
        configured_morph_precision / curve_max_morph_delta
    } else {
        configured_curve_precision
    }
}

/// For every curve, the largest LOD 0 displacement of the morph target sharing
/// its display name, or 0.0 when it drives none.
pub fn morph_target_max_position_deltas(
    curves: &[FloatCurve],
    source: Option<&dyn MorphTargetSource>,
) -> Vec<f32> {
    let Some(source) = source else {
        return vec![0.0; curves.len()];
    };

    curves
        .iter()
        .map(|curve| {
            source
                .find_morph_target(&curve.name.display_name)
                .map(|target| {
                    target
                        .deltas(MORPH_TARGET_LOD)
                        .iter()
                        .fold(0.0f32, |max, delta| max.max(delta.magnitude()))
                })
                .unwrap_or(0.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CurveName, MorphTarget, MorphTargetDelta, MorphTargetMesh, RichCurve};
    use proptest::prelude::*;

    #[test]
    fn test_plain_curve_keeps_configured_precision() {
        assert_eq!(derive_precision(0.0, 0.001, 0.01), 0.001);
    }

    #[test]
    fn test_morph_curve_scales_by_displacement() {
        assert!((derive_precision(3.0, 0.001, 0.01) - 0.003_333_333).abs() < 1e-7);
        assert!((derive_precision(50.0, 0.001, 0.01) - 0.0002).abs() < 1e-9);
        assert_eq!(derive_precision(1.0, 0.001, 0.01), 0.01);
    }

    #[test]
    fn test_negative_delta_is_treated_as_none() {
        assert_eq!(derive_precision(-2.0, 0.001, 0.01), 0.001);
    }

    fn curve(uid: u32, name: &str) -> FloatCurve {
        FloatCurve::new(CurveName::new(uid, name), RichCurve::default())
    }

    #[test]
    fn test_max_deltas_without_source_are_zero() {
        let curves = vec![curve(0, "smile"), curve(1, "blink")];
        assert_eq!(morph_target_max_position_deltas(&curves, None), vec![0.0, 0.0]);
    }

    #[test]
    fn test_max_deltas_use_lod_zero_only() {
        let mesh = MorphTargetMesh::with_targets([
            MorphTarget::new(
                "smile",
                vec![
                    vec![MorphTargetDelta::new(3.0, 4.0, 0.0), MorphTargetDelta::new(1.0, 0.0, 0.0)],
                    vec![MorphTargetDelta::new(100.0, 0.0, 0.0)],
                ],
            ),
            MorphTarget::new("blink", vec![]),
        ]);
        let curves = vec![curve(0, "smile"), curve(1, "blink"), curve(2, "jaw")];
        assert_eq!(
            morph_target_max_position_deltas(&curves, Some(&mesh)),
            vec![5.0, 0.0, 0.0]
        );
    }

    proptest! {
        #[test]
        fn prop_precision_shrinks_as_delta_grows(
            a in 0.001f32..1000.0,
            b in 0.001f32..1000.0,
            morph_precision in 0.0001f32..1.0,
        ) {
            prop_assume!((a - b).abs() > a.max(b) * 1e-3);
            let (small, large) = if a < b { (a, b) } else { (b, a) };
            prop_assert!(
                derive_precision(large, 0.001, morph_precision) < derive_precision(small, 0.001, morph_precision)
            );
        }

        #[test]
        fn prop_zero_delta_passes_curve_precision_through(curve_precision in 1e-6f32..10.0) {
            prop_assert_eq!(derive_precision(0.0, curve_precision, 0.01), curve_precision);
        }
    }
}
