// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::IoError;
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

#[cfg(feature = "std")]
use std::fs::File;

#[cfg(feature = "std")]
impl IoError for std::io::Error {}

fn box_err<E: IoError>(err: E) -> Box<dyn IoError> {
    Box::new(err)
}

/// Sequential byte channel used to save and load chains in image
/// header metadata.
///
/// Writes append to the channel. Reads consume from the front of the
/// channel, in the same order the data was written.
pub trait HeaderIo {
    /// Append all of `src` to the channel.
    fn write_chunk(&mut self, src: &[u8]) -> Result<(), Box<dyn IoError>>;

    /// Read exactly `dst.len()` bytes from the channel into `dst`.
    ///
    /// An error will be returned if there is not enough data to fill
    /// `dst`, or if the data cannot be read for any reason.
    fn read_chunk(&mut self, dst: &mut [u8]) -> Result<(), Box<dyn IoError>>;
}

impl<T: HeaderIo + ?Sized> HeaderIo for &mut T {
    fn write_chunk(&mut self, src: &[u8]) -> Result<(), Box<dyn IoError>> {
        (**self).write_chunk(src)
    }

    fn read_chunk(&mut self, dst: &mut [u8]) -> Result<(), Box<dyn IoError>> {
        (**self).read_chunk(dst)
    }
}

#[cfg(feature = "std")]
impl HeaderIo for File {
    fn write_chunk(&mut self, src: &[u8]) -> Result<(), Box<dyn IoError>> {
        use std::io::Write;

        self.write_all(src).map_err(box_err)
    }

    fn read_chunk(&mut self, dst: &mut [u8]) -> Result<(), Box<dyn IoError>> {
        use std::io::Read;

        self.read_exact(dst).map_err(box_err)
    }
}

/// Error type used by [`MemHeader`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MemIoError {
    start: usize,
    read_len: usize,
    src_len: usize,
}

impl IoError for MemIoError {}

impl Display for MemIoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to read {} bytes at offset {} from a header of length {}",
            self.read_len, self.start, self.src_len
        )
    }
}

impl core::error::Error for MemIoError {}

/// In-memory [`HeaderIo`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MemHeader {
    data: Vec<u8>,
    read_pos: usize,
}

impl MemHeader {
    /// Create an empty header.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All bytes written so far, including any already read.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the header, returning the written bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Move the read position back to the start of the data.
    pub fn rewind(&mut self) {
        self.read_pos = 0;
    }
}

impl From<Vec<u8>> for MemHeader {
    fn from(data: Vec<u8>) -> Self {
        Self { data, read_pos: 0 }
    }
}

impl HeaderIo for MemHeader {
    fn write_chunk(&mut self, src: &[u8]) -> Result<(), Box<dyn IoError>> {
        self.data.extend_from_slice(src);
        Ok(())
    }

    fn read_chunk(&mut self, dst: &mut [u8]) -> Result<(), Box<dyn IoError>> {
        let err = MemIoError {
            start: self.read_pos,
            read_len: dst.len(),
            src_len: self.data.len(),
        };
        let end = self.read_pos.checked_add(dst.len()).ok_or(box_err(err))?;
        let src = self.data.get(self.read_pos..end).ok_or(box_err(err))?;
        dst.copy_from_slice(src);
        self.read_pos = end;
        Ok(())
    }
}
