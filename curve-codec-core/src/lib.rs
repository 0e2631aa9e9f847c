//! This file is the root of the `curve_codec` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of our library (`curve_pipeline`,
//!     `codec`, `kernels`, etc.) so the Rust compiler knows they exist.
//! 2.  Re-exporting the handful of types a host needs to compress a clip's
//!     curves and read them back during playback.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod codec;
pub mod config;
pub mod curve_pipeline;
pub mod error;
pub mod kernels;
pub mod types;

//==================================================================================
// 2. Public API
//==================================================================================
pub use config::CurveCodecConfig;
pub use curve_pipeline::{CompressedCurveData, CurveCompressionCodec, UniformCurveCodec};
pub use error::CurveCodecError;
pub use observability::init_logging;
pub use types::{BlendedCurve, CompressibleCurveData, CurveName, CurveUid, FloatCurve};
