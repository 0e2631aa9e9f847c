// In: src/codec/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Track Codec
// ====================================================================================
//
// The `codec` compresses fixed-rate scalar tracks into a self-describing blob and
// decodes individual values from it at arbitrary times. The curve adapter above it
// only ever touches this narrow surface: a `TrackArray` in, a leased buffer out, and
// a `DecompressionContext` that seeks and writes values through a `TrackWriter`.
//
// Data Flow (Compression):
//
//   1. [TrackArray]               -> validated (`is_valid`)
//         |
//         `-> per track: constant? quantized within precision? raw f32?
//         |
//   2. [compress_track_list]      -> header + descriptors + shared bit stream
//         |
//         `-> optional zstd over the payload, buffer leased from a `TrackAllocator`
//
// Data Flow (Decompression):
//
//   1. [CompressedTracks]         -> lightweight header validation over `&[u8]`
//         |
//   2. [DecompressionContext]     -> parses descriptors, `seek(time, policy)`
//         |
//   3. [TrackWriter]              -> receives `(output_index, value)` per track
//
// ====================================================================================
pub mod allocator;
pub mod compress;
pub mod compressed_tracks;
pub mod decompress;
pub mod format;
pub mod track;
pub mod track_error;

pub use allocator::{AllocatedBuffer, CountingAllocator, DefaultAllocator, TrackAllocator};
pub use compress::{compress_track_list, CompressionSettings, OutputStats};
pub use compressed_tracks::CompressedTracks;
pub use decompress::{DecompressionContext, SampleRoundingPolicy, TrackWriter};
pub use format::algorithm_version;
pub use track::{TrackArray, TrackDescScalar, TrackFloat1};
pub use track_error::{calculate_compression_error, TrackError};
