// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A read-only API for inspecting a device tree property.

use core::ffi::CStr;

use zerocopy::{FromBytes, big_endian};

use super::FDT_TAGSIZE;
use crate::error::{FdtError, FdtErrorKind};

/// A property of a device tree node.
#[derive(Debug, PartialEq)]
pub struct FdtProperty<'a> {
    pub(crate) name: &'a str,
    pub(crate) value: &'a [u8],
    pub(crate) value_offset: usize,
}

impl<'a> FdtProperty<'a> {
    /// Returns the name of this property.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Returns the raw value of this property.
    #[must_use]
    pub fn value(&self) -> &'a [u8] {
        self.value
    }

    /// Returns the value of this property as a `u32`.
    ///
    /// # Errors
    ///
    /// Returns an [`FdtErrorKind::InvalidLength`] if the property's value is
    /// not 4 bytes long.
    pub fn as_u32(&self) -> Result<u32, FdtError> {
        big_endian::U32::ref_from_bytes(self.value)
            .map(|val| val.get())
            .map_err(|_e| FdtError::new(FdtErrorKind::InvalidLength, self.value_offset))
    }

    /// Returns the value of this property as a `u64`.
    ///
    /// # Errors
    ///
    /// Returns an [`FdtErrorKind::InvalidLength`] if the property's value is
    /// not 8 bytes long.
    pub fn as_u64(&self) -> Result<u64, FdtError> {
        big_endian::U64::ref_from_bytes(self.value)
            .map(|val| val.get())
            .map_err(|_e| FdtError::new(FdtErrorKind::InvalidLength, self.value_offset))
    }

    /// Returns the value of this property as a string.
    ///
    /// # Errors
    ///
    /// Returns an [`FdtErrorKind::InvalidString`] if the property's value is
    /// not a single NUL-terminated string or contains invalid UTF-8.
    pub fn as_str(&self) -> Result<&'a str, FdtError> {
        CStr::from_bytes_with_nul(self.value)
            .ok()
            .and_then(|cstr| cstr.to_str().ok())
            .ok_or(FdtError::new(FdtErrorKind::InvalidString, self.value_offset))
    }

    /// Returns an iterator over the strings in a string-list property.
    pub fn as_str_list(&self) -> impl Iterator<Item = &'a str> + use<'a> {
        self.value
            .split_inclusive(|&byte| byte == 0)
            .map_while(|chunk| CStr::from_bytes_with_nul(chunk).ok()?.to_str().ok())
    }

    /// Returns the offset of the `FDT_PROP` token that starts this property.
    pub(crate) fn record_offset(&self) -> usize {
        self.value_offset - 3 * FDT_TAGSIZE
    }
}
