//! This module contains the pure, stateless kernels for fixed-width bit-packing
//! and unpacking of quantized curve samples.
//!
//! Every animated track in a compressed blob stores its samples as unsigned
//! integers of a per-track bit width. This kernel packs them tightly (LSB-first)
//! into a shared bit stream and reads them back one value at a time, which is
//! what playback needs when it only touches the two samples surrounding the
//! query time.

use bitvec::prelude::*;
use num_traits::{PrimInt, ToPrimitive, Unsigned};

use crate::error::CurveCodecError;

/// The widest value this kernel will read or write in one go.
pub const MAX_BIT_WIDTH: u8 = 32;

//==================================================================================
// 1. Generic Core Logic (The "Engine")
//==================================================================================

/// Appends a slice of unsigned integers to an existing bit vector.
fn encode_slice_into<T>(
    data: &[T],
    bit_width: u8,
    bit_vec: &mut BitVec<u8, Lsb0>,
) -> Result<(), CurveCodecError>
where
    T: PrimInt + Unsigned + ToPrimitive,
{
    if bit_width == 0 || bit_width > MAX_BIT_WIDTH || bit_width as usize > std::mem::size_of::<T>() * 8 {
        return Err(CurveCodecError::BitpackEncodeError(0, bit_width));
    }

    let max_val = (1u64 << bit_width) - 1;
    bit_vec.reserve(data.len() * bit_width as usize);

    for &val in data {
        let val_u64 = val.to_u64().ok_or_else(|| {
            CurveCodecError::InternalError("Failed to convert value to u64 for bitpacking".to_string())
        })?;
        if val_u64 > max_val {
            return Err(CurveCodecError::BitpackEncodeError(val_u64, bit_width));
        }
        bit_vec.extend_from_bitslice(&val_u64.view_bits::<Lsb0>()[..bit_width as usize]);
    }

    Ok(())
}

/// Reassembles one integer from a chunk of bits.
fn bits_to_u64(chunk: &BitSlice<u8, Lsb0>) -> u64 {
    let mut container = 0u64;
    for (i, bit) in chunk.iter().by_vals().enumerate() {
        if bit {
            container |= 1 << i;
        }
    }
    container
}

//==================================================================================
// 2. Public API
//==================================================================================

/// Appends `input_slice` to `bit_vec`, each value using exactly `bit_width` bits.
pub fn encode_into<T>(
    input_slice: &[T],
    bit_width: u8,
    bit_vec: &mut BitVec<u8, Lsb0>,
) -> Result<(), CurveCodecError>
where
    T: PrimInt + Unsigned + ToPrimitive,
{
    encode_slice_into(input_slice, bit_width, bit_vec)
}

/// Reads a single value of `bit_width` bits starting at `bit_offset`.
pub fn read_one(bits: &BitSlice<u8, Lsb0>, bit_offset: usize, bit_width: u8) -> Result<u32, CurveCodecError> {
    if bit_width == 0 || bit_width > MAX_BIT_WIDTH {
        return Err(CurveCodecError::BitpackDecodeError);
    }
    let end = bit_offset
        .checked_add(bit_width as usize)
        .ok_or(CurveCodecError::BitpackDecodeError)?;
    let chunk = bits.get(bit_offset..end).ok_or(CurveCodecError::BitpackDecodeError)?;
    u32::try_from(bits_to_u64(chunk)).map_err(|_| CurveCodecError::BitpackDecodeError)
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
