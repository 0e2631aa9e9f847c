//! This module defines the strongly-typed data the curve pipeline consumes and
//! produces: the authored curves and their identities, the morph targets that
//! size their tolerances, and the runtime buffer decoded values land in.

pub mod blended_curve;
pub mod curve;
pub mod morph_target;

// Re-export the main types for easier access.
pub use blended_curve::BlendedCurve;
pub use curve::{
    CompressibleCurveData, CurveEvaluator, CurveName, CurveUid, FloatCurve, InterpMode, RichCurve, RichCurveKey,
};
pub use morph_target::{MorphTarget, MorphTargetDelta, MorphTargetMesh, MorphTargetSource};
