//! The pure, stateless kernels the codec is assembled from.
//!
//! Each kernel is a small, panic-free transform with its own tests. The codec
//! in `crate::codec` decides which ones to apply and in what order.

/// Bit-width reduction of quantized samples.
pub mod bitpack;

/// Variable-length integers for descriptor fields.
pub mod leb128;

/// Optional entropy coding of the whole payload.
pub mod zstd;
