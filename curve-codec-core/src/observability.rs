//! This module provides the logging hooks used by the compression driver and
//! the codec.
//!
//! Compression runs offline, so it is worth making its decisions visible: which
//! precision each curve received, how many bits each track needed, and how far
//! the reconstruction drifted from the source. The `log_metric!` macro emits
//! those facts as a single structured key-value line through the `log` facade
//! under the `curve_codec::metric` target, so hosts can filter them out.

/// The log target every `log_metric!` line is emitted under.
pub const METRIC_TARGET: &str = "curve_codec::metric";

#[doc(hidden)]
pub use log as __log;

/// Logs a structured key-value metric line at debug level.
///
/// # Example
/// ```
/// use curve_codec::log_metric;
/// let bits = 9;
/// log_metric!("event"="quantize_track", "track"=&0, "bit_width"=&bits);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        if $crate::observability::__log::log_enabled!(
            target: $crate::observability::METRIC_TARGET,
            $crate::observability::__log::Level::Debug
        ) {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            $crate::observability::__log::debug!(
                target: $crate::observability::METRIC_TARGET,
                "CURVE_METRIC: {{ {} }}",
                parts.join(", ")
            );
        }
    };
}

/// Installs an `env_logger` backend for hosts that do not bring their own.
///
/// `RUST_LOG` still wins when set. Otherwise `verbose` selects between `debug`
/// and `warn` for this crate. Calling this more than once is harmless.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "curve_codec=debug" } else { "curve_codec=warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init();
}
