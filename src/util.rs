// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use core::mem::size_of;

/// Convert a `u32` to a `usize`.
///
/// Rust allows `usize` to be as small as `u16`, but on platforms
/// supported by this crate, this conversion is infallible.
///
/// # Panics
///
/// Panics if `val` does not fit in this platform's `usize`.
#[inline]
#[must_use]
pub(crate) const fn usize_from_u32(val: u32) -> usize {
    assert!(size_of::<usize>() >= size_of::<u32>());

    // Cannot use `usize::try_from` in a `const fn`.
    #[expect(clippy::as_conversions)]
    {
        val as usize
    }
}

/// Number of blocks in the inclusive range `start..=end`.
///
/// Returns `None` if `start > end`, or if the range covers every
/// possible `u64` value.
#[inline]
#[must_use]
pub(crate) fn num_blocks_inclusive(start: u64, end: u64) -> Option<u64> {
    end.checked_sub(start)?.checked_add(1)
}

/// Read a little-endian [`u32`] from `bytes` at `offset`.
///
/// # Panics
///
/// Panics if `bytes` is not large enough to read four bytes at `offset`.
#[inline]
#[must_use]
pub(crate) fn read_u32le(bytes: &[u8], offset: usize) -> u32 {
    // OK to unwrap: these panics are described in the docstring.
    let end = offset.checked_add(size_of::<u32>()).unwrap();
    let bytes = bytes.get(offset..end).unwrap();
    u32::from_le_bytes(bytes.try_into().unwrap())
}

/// Read a little-endian [`i32`] from `bytes` at `offset`.
///
/// # Panics
///
/// Panics if `bytes` is not large enough to read four bytes at `offset`.
#[inline]
#[must_use]
pub(crate) fn read_i32le(bytes: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(read_u32le(bytes, offset).to_le_bytes())
}

/// Read a little-endian [`u64`] from `bytes` at `offset`.
///
/// # Panics
///
/// Panics if `bytes` is not large enough to read eight bytes at `offset`.
#[inline]
#[must_use]
pub(crate) fn read_u64le(bytes: &[u8], offset: usize) -> u64 {
    // OK to unwrap: these panics are described in the docstring.
    let end = offset.checked_add(size_of::<u64>()).unwrap();
    let bytes = bytes.get(offset..end).unwrap();
    u64::from_le_bytes(bytes.try_into().unwrap())
}
