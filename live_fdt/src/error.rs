// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types for the `live_fdt` crate.

use core::fmt;

/// An error that can occur when parsing or modifying a device tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct FdtError {
    offset: usize,
    /// The kind of the error that has occurred.
    pub kind: FdtErrorKind,
}

impl FdtError {
    pub(crate) fn new(kind: FdtErrorKind, offset: usize) -> Self {
        Self { offset, kind }
    }

    /// Returns the byte offset into the blob at which the error was detected.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// The kind of an error that can occur when parsing or modifying a device
/// tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FdtErrorKind {
    /// The magic number of the device tree is invalid.
    InvalidMagic,
    /// The Device Tree version is not supported by this library.
    UnsupportedVersion(u32),
    /// A length or size does not fit the blob it describes.
    InvalidLength,
    /// The blocks described by the header overlap, are misaligned or lie
    /// outside the blob.
    BadStructure,
    /// An invalid token was encountered.
    BadToken(u32),
    /// The given offset does not point at the start of a node.
    BadOffset,
    /// An invalid string was encountered.
    InvalidString,
    /// A node or property name is empty or contains a forbidden character.
    InvalidName,
    /// A node with the given name already exists.
    Exists,
    /// The buffer has no room left for the requested modification.
    NoSpace,
    /// The requested entry does not exist.
    NotFound,
}

impl fmt::Display for FdtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.kind, self.offset)
    }
}

impl fmt::Display for FdtErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMagic => write!(f, "invalid FDT magic number"),
            Self::UnsupportedVersion(version) => {
                write!(f, "the FDT version {version} is not supported")
            }
            Self::InvalidLength => write!(f, "invalid FDT length"),
            Self::BadStructure => write!(f, "inconsistent FDT block layout"),
            Self::BadToken(token) => write!(f, "bad FDT token: 0x{token:x}"),
            Self::BadOffset => write!(f, "offset does not point at a node"),
            Self::InvalidString => write!(f, "invalid string in FDT"),
            Self::InvalidName => write!(f, "invalid node or property name"),
            Self::Exists => write!(f, "node already exists"),
            Self::NoSpace => write!(f, "not enough space in FDT buffer"),
            Self::NotFound => write!(f, "entry not found"),
        }
    }
}

impl core::error::Error for FdtError {}
