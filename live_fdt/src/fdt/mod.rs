// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A read-only API for parsing and traversing a [Flattened Device Tree (FDT)].
//!
//! This module provides the [`Fdt`] struct, which is the entry point for
//! validating and traversing an FDT blob. The API performs no memory
//! allocation and provides a zero-copy view of the FDT data. Every read is
//! bounds-checked, so a corrupt blob produces an [`FdtError`] rather than a
//! panic.
//!
//! [Flattened Device Tree (FDT)]: https://devicetree-specification.readthedocs.io/en/latest/chapter5-flattened-format.html

use core::ffi::CStr;
use core::fmt;

use zerocopy::byteorder::big_endian;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::{FdtError, FdtErrorKind};

mod node;
mod property;

pub use node::FdtNode;
pub use property::FdtProperty;

/// Version of the FDT specification supported by this library.
pub(crate) const FDT_VERSION: u32 = 17;
pub(crate) const FDT_LAST_COMP_VERSION: u32 = 16;
pub(crate) const FDT_TAGSIZE: usize = size_of::<u32>();
pub(crate) const FDT_MAGIC: u32 = 0xd00d_feed;
pub(crate) const FDT_BEGIN_NODE: u32 = 0x1;
pub(crate) const FDT_END_NODE: u32 = 0x2;
pub(crate) const FDT_PROP: u32 = 0x3;
pub(crate) const FDT_NOP: u32 = 0x4;
pub(crate) const FDT_END: u32 = 0x9;
pub(crate) const HEADER_SIZE: usize = size_of::<FdtHeader>();
/// The memory reservation block must be aligned to an 8-byte boundary.
pub(crate) const RSVMAP_ALIGN: usize = 8;

#[repr(C, packed)]
#[derive(Debug, Copy, Clone, FromBytes, IntoBytes, Unaligned, Immutable, KnownLayout)]
pub(crate) struct FdtHeader {
    /// Magic number of the device tree.
    pub(crate) magic: big_endian::U32,
    /// Total size of the device tree.
    pub(crate) totalsize: big_endian::U32,
    /// Offset of the device tree structure.
    pub(crate) off_dt_struct: big_endian::U32,
    /// Offset of the device tree strings.
    pub(crate) off_dt_strings: big_endian::U32,
    /// Offset of the memory reservation map.
    pub(crate) off_mem_rsvmap: big_endian::U32,
    /// Version of the device tree.
    pub(crate) version: big_endian::U32,
    /// Last compatible version of the device tree.
    pub(crate) last_comp_version: big_endian::U32,
    /// Physical ID of the boot CPU.
    pub(crate) boot_cpuid_phys: big_endian::U32,
    /// Size of the device tree strings.
    pub(crate) size_dt_strings: big_endian::U32,
    /// Size of the device tree structure.
    pub(crate) size_dt_struct: big_endian::U32,
}

impl FdtHeader {
    pub(crate) fn magic(&self) -> u32 {
        self.magic.get()
    }

    pub(crate) fn totalsize(&self) -> u32 {
        self.totalsize.get()
    }

    pub(crate) fn off_dt_struct(&self) -> u32 {
        self.off_dt_struct.get()
    }

    pub(crate) fn off_dt_strings(&self) -> u32 {
        self.off_dt_strings.get()
    }

    pub(crate) fn off_mem_rsvmap(&self) -> u32 {
        self.off_mem_rsvmap.get()
    }

    pub(crate) fn version(&self) -> u32 {
        self.version.get()
    }

    pub(crate) fn last_comp_version(&self) -> u32 {
        self.last_comp_version.get()
    }

    pub(crate) fn boot_cpuid_phys(&self) -> u32 {
        self.boot_cpuid_phys.get()
    }

    pub(crate) fn size_dt_strings(&self) -> u32 {
        self.size_dt_strings.get()
    }

    pub(crate) fn size_dt_struct(&self) -> u32 {
        self.size_dt_struct.get()
    }
}

/// A flattened device tree.
///
/// An `Fdt` only borrows the blob, so it is cheap to copy around. Nodes are
/// addressed by their byte offset into the blob; see [`Fdt::node`].
#[derive(Clone, Copy)]
pub struct Fdt<'a> {
    pub(crate) data: &'a [u8],
}

/// A token in the device tree structure.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FdtToken {
    BeginNode,
    EndNode,
    Prop,
    Nop,
    End,
}

impl TryFrom<u32> for FdtToken {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            FDT_BEGIN_NODE => Ok(FdtToken::BeginNode),
            FDT_END_NODE => Ok(FdtToken::EndNode),
            FDT_PROP => Ok(FdtToken::Prop),
            FDT_NOP => Ok(FdtToken::Nop),
            FDT_END => Ok(FdtToken::End),
            _ => Err(value),
        }
    }
}

impl<'a> Fdt<'a> {
    /// Creates a new `Fdt` from the given byte slice.
    ///
    /// The slice may be longer than the `totalsize` declared by the header,
    /// in which case the trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if [`Fdt::check_header`] rejects the blob.
    pub fn new(data: &'a [u8]) -> Result<Self, FdtError> {
        let totalsize = Self::check_header(data)?;
        Ok(Fdt {
            data: &data[..totalsize],
        })
    }

    /// Validates the header at the start of `data` and returns the declared
    /// total size of the blob.
    ///
    /// The magic number and version are checked, the declared size must not
    /// exceed `data.len()`, and every block the header describes must lie
    /// within the declared size.
    ///
    /// # Errors
    ///
    /// Returns [`FdtErrorKind::InvalidLength`] if `data` is shorter than the
    /// header or than the declared size, [`FdtErrorKind::InvalidMagic`] or
    /// [`FdtErrorKind::UnsupportedVersion`] for a foreign blob, and
    /// [`FdtErrorKind::BadStructure`] if the block layout is inconsistent.
    pub fn check_header(data: &[u8]) -> Result<usize, FdtError> {
        let Ok((header, _)) = FdtHeader::ref_from_prefix(data) else {
            return Err(FdtError::new(FdtErrorKind::InvalidLength, 0));
        };

        if header.magic() != FDT_MAGIC {
            return Err(FdtError::new(FdtErrorKind::InvalidMagic, 0));
        }
        if !(header.last_comp_version()..=header.version()).contains(&FDT_VERSION) {
            return Err(FdtError::new(
                FdtErrorKind::UnsupportedVersion(header.version()),
                20,
            ));
        }

        let totalsize = header.totalsize() as usize;
        if totalsize < HEADER_SIZE || totalsize > data.len() {
            return Err(FdtError::new(FdtErrorKind::InvalidLength, 4));
        }

        let off_mem_rsvmap = header.off_mem_rsvmap() as usize;
        if off_mem_rsvmap < HEADER_SIZE
            || off_mem_rsvmap > totalsize
            || !off_mem_rsvmap.is_multiple_of(RSVMAP_ALIGN)
        {
            return Err(FdtError::new(FdtErrorKind::BadStructure, 16));
        }
        if !(header.off_dt_struct() as usize).is_multiple_of(FDT_TAGSIZE) {
            return Err(FdtError::new(FdtErrorKind::BadStructure, 8));
        }
        check_block(header.off_dt_struct(), header.size_dt_struct(), totalsize, 8)?;
        check_block(
            header.off_dt_strings(),
            header.size_dt_strings(),
            totalsize,
            12,
        )?;

        Ok(totalsize)
    }

    /// Returns the total size of the blob as declared by its header.
    #[must_use]
    pub fn totalsize(&self) -> usize {
        self.header().totalsize() as usize
    }

    /// Returns the raw bytes of the blob.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the header of the device tree.
    pub(crate) fn header(&self) -> &'a FdtHeader {
        let (header, _remaining_bytes) = FdtHeader::ref_from_prefix(self.data)
            .expect("check_header() verifies the slice is at least as big as the header");
        header
    }

    /// Returns the root node of the device tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the structure block does not start with a node.
    pub fn root(&self) -> Result<FdtNode<'a>, FdtError> {
        let offset = self.header().off_dt_struct() as usize;
        let token = self.read_token(offset)?;
        if token != FdtToken::BeginNode {
            return Err(FdtError::new(
                FdtErrorKind::BadToken(FDT_BEGIN_NODE),
                offset,
            ));
        }
        Ok(FdtNode { fdt: *self, offset })
    }

    /// Returns the node starting at `offset`.
    ///
    /// Node offsets are only meaningful for the blob they were obtained from,
    /// and only until that blob is structurally modified.
    ///
    /// # Errors
    ///
    /// Returns [`FdtErrorKind::BadOffset`] if `offset` does not point at the
    /// start of a node inside the structure block.
    pub fn node(&self, offset: usize) -> Result<FdtNode<'a>, FdtError> {
        let (start, end) = self.struct_range();
        let in_struct = (start..end).contains(&offset) && offset.is_multiple_of(FDT_TAGSIZE);
        if !in_struct || !matches!(self.read_token(offset), Ok(FdtToken::BeginNode)) {
            return Err(FdtError::new(FdtErrorKind::BadOffset, offset));
        }
        Ok(FdtNode { fdt: *self, offset })
    }

    /// Returns the start and end offsets of the structure block.
    pub(crate) fn struct_range(&self) -> (usize, usize) {
        let header = self.header();
        let start = header.off_dt_struct() as usize;
        (start, start + header.size_dt_struct() as usize)
    }

    /// Returns the start and end offsets of the strings block.
    pub(crate) fn strings_range(&self) -> (usize, usize) {
        let header = self.header();
        let start = header.off_dt_strings() as usize;
        (start, start + header.size_dt_strings() as usize)
    }

    pub(crate) fn read_u32(&self, offset: usize) -> Result<u32, FdtError> {
        self.data
            .get(offset..)
            .and_then(|bytes| big_endian::U32::ref_from_prefix(bytes).ok())
            .map(|(val, _)| val.get())
            .ok_or(FdtError::new(FdtErrorKind::InvalidLength, offset))
    }

    pub(crate) fn read_u64(&self, offset: usize) -> Result<u64, FdtError> {
        self.data
            .get(offset..)
            .and_then(|bytes| big_endian::U64::ref_from_prefix(bytes).ok())
            .map(|(val, _)| val.get())
            .ok_or(FdtError::new(FdtErrorKind::InvalidLength, offset))
    }

    pub(crate) fn read_token(&self, offset: usize) -> Result<FdtToken, FdtError> {
        let val = self.read_u32(offset)?;
        FdtToken::try_from(val).map_err(|t| FdtError::new(FdtErrorKind::BadToken(t), offset))
    }

    /// Return a string from the string block.
    pub(crate) fn string(&self, string_block_offset: usize) -> Result<&'a str, FdtError> {
        let (strings_start, strings_end) = self.strings_range();
        let string_start = strings_start + string_block_offset;

        if string_start >= strings_end {
            return Err(FdtError::new(FdtErrorKind::InvalidLength, string_start));
        }

        self.string_at_offset(string_start, Some(strings_end))
    }

    /// Return a NUL-terminated string from a given offset.
    pub(crate) fn string_at_offset(
        &self,
        offset: usize,
        end: Option<usize>,
    ) -> Result<&'a str, FdtError> {
        let slice = match end {
            Some(end) => self.data.get(offset..end),
            None => self.data.get(offset..),
        }
        .ok_or(FdtError::new(FdtErrorKind::InvalidLength, offset))?;

        match CStr::from_bytes_until_nul(slice).map(CStr::to_str) {
            Ok(Ok(val)) => Ok(val),
            _ => Err(FdtError::new(FdtErrorKind::InvalidString, offset)),
        }
    }

    pub(crate) fn find_string_end(&self, start: usize) -> Result<usize, FdtError> {
        let tail = self
            .data
            .get(start..)
            .ok_or(FdtError::new(FdtErrorKind::InvalidString, start))?;
        tail.iter()
            .position(|&byte| byte == 0)
            .map(|nul| start + nul + 1)
            .ok_or(FdtError::new(FdtErrorKind::InvalidString, start))
    }

    /// Returns the offset of the first token after the name of the node at
    /// `offset`.
    pub(crate) fn node_body_offset(&self, offset: usize) -> Result<usize, FdtError> {
        let name_end = self.find_string_end(offset + FDT_TAGSIZE)?;
        Ok(Self::align_tag_offset(name_end))
    }

    /// Returns the offset just past the `FDT_END_NODE` token closing the node
    /// at `offset`.
    pub(crate) fn next_sibling_offset(&self, offset: usize) -> Result<usize, FdtError> {
        let mut offset = self.node_body_offset(offset)?;
        // Number of descendants entered but not yet closed.
        let mut depth = 0usize;

        loop {
            match self.read_token(offset)? {
                FdtToken::Prop => offset = self.next_property_offset(offset)?,
                FdtToken::Nop => offset += FDT_TAGSIZE,
                FdtToken::BeginNode => {
                    offset = self.node_body_offset(offset)?;
                    depth += 1;
                }
                FdtToken::EndNode => {
                    offset += FDT_TAGSIZE;
                    if depth == 0 {
                        return Ok(offset);
                    }
                    depth -= 1;
                }
                FdtToken::End => {
                    return Err(FdtError::new(FdtErrorKind::BadStructure, offset));
                }
            }
        }
    }

    /// Returns the offset just past the property whose `FDT_PROP` token is at
    /// `offset`.
    pub(crate) fn next_property_offset(&self, offset: usize) -> Result<usize, FdtError> {
        let len = self.read_u32(offset + FDT_TAGSIZE)? as usize;
        let value_end = offset + 3 * FDT_TAGSIZE + len;
        if value_end > self.data.len() {
            return Err(FdtError::new(FdtErrorKind::InvalidLength, offset));
        }
        Ok(Self::align_tag_offset(value_end))
    }

    /// Reads the property whose `FDT_PROP` token is at `offset`.
    pub(crate) fn property_at(&self, offset: usize) -> Result<FdtProperty<'a>, FdtError> {
        let len = self.read_u32(offset + FDT_TAGSIZE)? as usize;
        let name_offset = self.read_u32(offset + 2 * FDT_TAGSIZE)? as usize;
        let value_offset = offset + 3 * FDT_TAGSIZE;
        let value = self
            .data
            .get(value_offset..value_offset + len)
            .ok_or(FdtError::new(FdtErrorKind::InvalidLength, value_offset))?;
        Ok(FdtProperty {
            name: self.string(name_offset)?,
            value,
            value_offset,
        })
    }

    pub(crate) fn align_tag_offset(offset: usize) -> usize {
        offset.next_multiple_of(FDT_TAGSIZE)
    }
}

fn check_block(offset: u32, size: u32, totalsize: usize, field: usize) -> Result<(), FdtError> {
    let start = offset as usize;
    match start.checked_add(size as usize) {
        Some(end) if start >= HEADER_SIZE && end <= totalsize => Ok(()),
        _ => Err(FdtError::new(FdtErrorKind::BadStructure, field)),
    }
}

impl fmt::Debug for Fdt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fdt")
            .field("totalsize", &self.data.len())
            .finish_non_exhaustive()
    }
}
