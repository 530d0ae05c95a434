// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Device tree memory reservations.
//!
//! The memory reservation block is a list of `(address, size)` pairs of
//! big-endian `u64`s, terminated by an entry whose address and size are both
//! zero.

use core::iter;

use crate::error::{FdtError, FdtErrorKind};
use crate::fdt::Fdt;

/// Size of one entry of the memory reservation block.
pub(crate) const RSV_ENTRY_SIZE: usize = 2 * size_of::<u64>();

/// A 64-bit memory reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryReservation {
    address: u64,
    size: u64,
}

impl MemoryReservation {
    /// Creates a new [`MemoryReservation`].
    #[must_use]
    pub fn new(address: u64, size: u64) -> Self {
        Self { address, size }
    }

    /// Returns the physical address of the reserved memory region.
    #[must_use]
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Returns the size of the reserved memory region.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    fn is_terminator(self) -> bool {
        self.address == 0 && self.size == 0
    }
}

impl<'a> Fdt<'a> {
    /// Returns an iterator over the memory reservations of this tree.
    ///
    /// The iterator stops at the terminating entry, or after yielding an
    /// error if the block runs past the end of the blob.
    pub fn memory_reservations(
        &self,
    ) -> impl Iterator<Item = Result<MemoryReservation, FdtError>> + use<'a> {
        let fdt = *self;
        let mut offset = Some(fdt.header().off_mem_rsvmap() as usize);
        iter::from_fn(move || {
            let current = offset.take()?;
            match fdt.read_reservation(current) {
                Ok(entry) if entry.is_terminator() => None,
                Ok(entry) => {
                    offset = Some(current + RSV_ENTRY_SIZE);
                    Some(Ok(entry))
                }
                Err(e) => Some(Err(e)),
            }
        })
    }

    /// Returns the number of memory reservations, excluding the terminator.
    ///
    /// # Errors
    ///
    /// Returns [`FdtErrorKind::InvalidLength`] if the block is not terminated
    /// before the end of the blob.
    pub fn num_mem_rsv(&self) -> Result<usize, FdtError> {
        self.memory_reservations()
            .try_fold(0, |count, entry| entry.map(|_| count + 1))
    }

    /// Returns the memory reservation at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`FdtErrorKind::NotFound`] if `index` is past the terminator,
    /// or an error if the block is malformed.
    pub fn mem_rsv(&self, index: usize) -> Result<MemoryReservation, FdtError> {
        let offset = self.header().off_mem_rsvmap() as usize + index * RSV_ENTRY_SIZE;
        match self.memory_reservations().nth(index) {
            Some(entry) => entry,
            None => Err(FdtError::new(FdtErrorKind::NotFound, offset)),
        }
    }

    /// Returns the size of the memory reservation block, including the
    /// terminator.
    pub(crate) fn mem_rsv_block_size(&self) -> Result<usize, FdtError> {
        Ok((self.num_mem_rsv()? + 1) * RSV_ENTRY_SIZE)
    }

    fn read_reservation(&self, offset: usize) -> Result<MemoryReservation, FdtError> {
        Ok(MemoryReservation::new(
            self.read_u64(offset)?,
            self.read_u64(offset + size_of::<u64>())?,
        ))
    }
}
