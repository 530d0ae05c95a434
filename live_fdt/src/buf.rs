// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! An owned device tree blob that can be modified in place.
//!
//! [`FdtBuf`] keeps its blob in a fixed-capacity buffer laid out as
//!
//! ```text
//! header | memory reservations | structure block | strings block | free space
//! ```
//!
//! Every modification splices bytes inside that buffer and updates the
//! header, so the buffer always holds a valid FDT whose `totalsize` equals
//! the capacity. A modification that does not fit into the free space fails
//! with [`FdtErrorKind::NoSpace`] before any byte is changed.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use zerocopy::{FromBytes, IntoBytes};

use crate::error::{FdtError, FdtErrorKind};
use crate::fdt::{
    FDT_BEGIN_NODE, FDT_END, FDT_END_NODE, FDT_LAST_COMP_VERSION, FDT_MAGIC, FDT_PROP,
    FDT_TAGSIZE, FDT_VERSION, Fdt, FdtHeader, HEADER_SIZE,
};
use crate::memreserve::{MemoryReservation, RSV_ENTRY_SIZE};

/// Size of the structure block of an empty tree: the root's
/// `FDT_BEGIN_NODE`, its empty name, its `FDT_END_NODE` and `FDT_END`.
const EMPTY_STRUCT_SIZE: usize = 4 * FDT_TAGSIZE;

/// An owned, editable flattened device tree.
///
/// Node arguments are offsets as returned by
/// [`FdtNode::offset`](crate::fdt::FdtNode::offset). Any structural
/// modification may move nodes, so offsets must be looked up again after
/// each modification.
#[derive(Clone, PartialEq, Eq)]
pub struct FdtBuf {
    data: Vec<u8>,
}

/// Offsets and sizes of the blocks, as recorded in the header.
#[derive(Debug, Clone, Copy)]
struct Layout {
    rsvmap: usize,
    struct_offset: usize,
    struct_size: usize,
    strings_offset: usize,
    strings_size: usize,
}

impl Layout {
    fn canonical(rsvmap_size: usize, struct_size: usize, strings_size: usize) -> Self {
        let rsvmap = HEADER_SIZE;
        let struct_offset = rsvmap + rsvmap_size;
        Self {
            rsvmap,
            struct_offset,
            struct_size,
            strings_offset: struct_offset + struct_size,
            strings_size,
        }
    }

    fn end(&self) -> usize {
        self.strings_offset + self.strings_size
    }
}

impl FdtBuf {
    /// Copies `blob` into a new buffer of `capacity` bytes, re-encoding its
    /// blocks into the canonical order.
    ///
    /// # Errors
    ///
    /// Returns an error if `blob` is not a valid FDT, or
    /// [`FdtErrorKind::NoSpace`] if its blocks do not fit into `capacity`.
    pub fn open(blob: &[u8], capacity: usize) -> Result<Self, FdtError> {
        let fdt = Fdt::new(blob)?;
        let header = fdt.header();
        let (struct_start, struct_end) = fdt.struct_range();
        let (strings_start, strings_end) = fdt.strings_range();
        let rsvmap_start = header.off_mem_rsvmap() as usize;
        let rsvmap_size = fdt.mem_rsv_block_size()?;

        let layout = Layout::canonical(
            rsvmap_size,
            struct_end - struct_start,
            strings_end - strings_start,
        );
        if layout.end() > capacity {
            return Err(FdtError::new(FdtErrorKind::NoSpace, 0));
        }

        let mut data = vec![0; capacity];
        data[layout.rsvmap..layout.struct_offset]
            .copy_from_slice(&fdt.data[rsvmap_start..rsvmap_start + rsvmap_size]);
        data[layout.struct_offset..layout.strings_offset]
            .copy_from_slice(&fdt.data[struct_start..struct_end]);
        data[layout.strings_offset..layout.end()]
            .copy_from_slice(&fdt.data[strings_start..strings_end]);

        let mut buf = Self { data };
        buf.write_header(&layout, header.boot_cpuid_phys())?;
        Ok(buf)
    }

    /// Copies `blob` into a new buffer with `extra` bytes of free space past
    /// its declared size.
    ///
    /// # Errors
    ///
    /// Returns an error if `blob` is not a valid FDT.
    pub fn open_with_slack(blob: &[u8], extra: usize) -> Result<Self, FdtError> {
        let totalsize = Fdt::check_header(blob)?;
        Self::open(blob, totalsize + extra)
    }

    /// Creates a tree containing only an empty root node.
    ///
    /// # Errors
    ///
    /// Returns [`FdtErrorKind::NoSpace`] if `capacity` is too small to hold
    /// the empty tree.
    pub fn create_empty(capacity: usize) -> Result<Self, FdtError> {
        let layout = Layout::canonical(RSV_ENTRY_SIZE, EMPTY_STRUCT_SIZE, 0);
        if layout.end() > capacity {
            return Err(FdtError::new(FdtErrorKind::NoSpace, 0));
        }

        let mut buf = Self {
            data: vec![0; capacity],
        };
        let root = layout.struct_offset;
        buf.write_u32(root, FDT_BEGIN_NODE);
        buf.write_u32(root + 2 * FDT_TAGSIZE, FDT_END_NODE);
        buf.write_u32(root + 3 * FDT_TAGSIZE, FDT_END);
        buf.write_header(&layout, 0)?;
        Ok(buf)
    }

    /// Returns a read-only view of the tree.
    #[must_use]
    pub fn fdt(&self) -> Fdt<'_> {
        Fdt { data: &self.data }
    }

    /// Returns the number of bytes the buffer can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns the number of bytes occupied by the header and blocks.
    #[must_use]
    pub fn used(&self) -> usize {
        self.layout().end()
    }

    /// Returns the number of bytes still available for modifications.
    #[must_use]
    pub fn free_space(&self) -> usize {
        self.capacity() - self.used()
    }

    /// Returns the whole buffer, including any free space.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the tree and returns its buffer.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Returns the value of the property `name` of the node at `node`.
    ///
    /// # Errors
    ///
    /// Returns an error if `node` is not a node offset or the node is
    /// malformed.
    pub fn property(&self, node: usize, name: &str) -> Result<Option<&[u8]>, FdtError> {
        Ok(self
            .fdt()
            .node(node)?
            .property(name)?
            .map(|property| property.value()))
    }

    /// Sets the property `name` of the node at `node` to `value`, replacing
    /// any previous value. A new property is added after the existing ones.
    ///
    /// # Errors
    ///
    /// Returns [`FdtErrorKind::NoSpace`] if the new value does not fit, in
    /// which case the tree is left unchanged.
    pub fn set_property(&mut self, node: usize, name: &str, value: &[u8]) -> Result<(), FdtError> {
        check_name(name, node)?;
        let len = to_u32(value.len(), node)?;
        let (existing, insert_at) = {
            let node = self.fdt().node(node)?;
            match node.property(name)? {
                Some(property) => (Some((property.value_offset, property.value.len())), 0),
                None => (None, node.properties_end()?),
            }
        };

        if let Some((value_offset, old_len)) = existing {
            self.splice_struct(value_offset, align(old_len), align(value.len()))?;
            self.write_u32(value_offset - 2 * FDT_TAGSIZE, len);
            self.write_padded(value_offset, value);
            return Ok(());
        }

        let (name_offset, string_len) = match self.find_string(name) {
            Some(offset) => (offset, 0),
            None => (self.layout().strings_size, name.len() + 1),
        };
        let record_len = 3 * FDT_TAGSIZE + align(value.len());
        if record_len + string_len > self.free_space() {
            return Err(FdtError::new(FdtErrorKind::NoSpace, insert_at));
        }
        let name_offset = to_u32(name_offset, insert_at)?;

        if string_len > 0 {
            self.append_string(name)?;
        }
        self.splice_struct(insert_at, 0, record_len)?;
        self.write_u32(insert_at, FDT_PROP);
        self.write_u32(insert_at + FDT_TAGSIZE, len);
        self.write_u32(insert_at + 2 * FDT_TAGSIZE, name_offset);
        self.write_padded(insert_at + 3 * FDT_TAGSIZE, value);
        Ok(())
    }

    /// Removes the property `name` from the node at `node`.
    ///
    /// Returns whether the property existed. The name is left in the strings
    /// block.
    ///
    /// # Errors
    ///
    /// Returns an error if `node` is not a node offset or the node is
    /// malformed.
    pub fn remove_property(&mut self, node: usize, name: &str) -> Result<bool, FdtError> {
        let record = self
            .fdt()
            .node(node)?
            .property(name)?
            .map(|property| (property.record_offset(), property.value.len()));
        let Some((record_offset, len)) = record else {
            return Ok(false);
        };
        self.splice_struct(record_offset, 3 * FDT_TAGSIZE + align(len), 0)?;
        Ok(true)
    }

    /// Appends an empty child called `name` to the node at `parent` and
    /// returns the offset of the new node.
    ///
    /// # Errors
    ///
    /// Returns [`FdtErrorKind::Exists`] if `parent` already has such a child,
    /// [`FdtErrorKind::InvalidName`] for an empty name or one containing `/`,
    /// and [`FdtErrorKind::NoSpace`] if the node does not fit.
    pub fn add_subnode(&mut self, parent: usize, name: &str) -> Result<usize, FdtError> {
        check_name(name, parent)?;
        if name.contains('/') {
            return Err(FdtError::new(FdtErrorKind::InvalidName, parent));
        }
        let at = {
            let parent = self.fdt().node(parent)?;
            if parent.child(name)?.is_some() {
                return Err(FdtError::new(FdtErrorKind::Exists, parent.offset()));
            }
            parent.end_offset()?
        };

        let name_len = align(name.len() + 1);
        self.splice_struct(at, 0, 2 * FDT_TAGSIZE + name_len)?;
        let name_at = at + FDT_TAGSIZE;
        self.write_u32(at, FDT_BEGIN_NODE);
        self.data[name_at..name_at + name.len()].copy_from_slice(name.as_bytes());
        self.data[name_at + name.len()..name_at + name_len].fill(0);
        self.write_u32(name_at + name_len, FDT_END_NODE);
        Ok(at)
    }

    /// Returns the number of memory reservations.
    ///
    /// # Errors
    ///
    /// Returns an error if the memory reservation block is malformed.
    pub fn num_mem_rsv(&self) -> Result<usize, FdtError> {
        self.fdt().num_mem_rsv()
    }

    /// Returns the memory reservation at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`FdtErrorKind::NotFound`] if there is no such entry.
    pub fn mem_rsv(&self, index: usize) -> Result<MemoryReservation, FdtError> {
        self.fdt().mem_rsv(index)
    }

    /// Appends a memory reservation after the existing ones.
    ///
    /// # Errors
    ///
    /// Returns [`FdtErrorKind::NoSpace`] if the entry does not fit.
    pub fn add_mem_rsv(&mut self, reservation: MemoryReservation) -> Result<(), FdtError> {
        let at = self.layout().rsvmap + self.num_mem_rsv()? * RSV_ENTRY_SIZE;
        self.splice_mem_rsv(at, 0, RSV_ENTRY_SIZE)?;
        self.data[at..at + 8].copy_from_slice(&reservation.address().to_be_bytes());
        self.data[at + 8..at + RSV_ENTRY_SIZE].copy_from_slice(&reservation.size().to_be_bytes());
        Ok(())
    }

    /// Deletes the memory reservation at `index`, shifting later entries
    /// down by one.
    ///
    /// # Errors
    ///
    /// Returns [`FdtErrorKind::NotFound`] if there is no such entry.
    pub fn del_mem_rsv(&mut self, index: usize) -> Result<(), FdtError> {
        let at = self.layout().rsvmap + index * RSV_ENTRY_SIZE;
        if index >= self.num_mem_rsv()? {
            return Err(FdtError::new(FdtErrorKind::NotFound, at));
        }
        self.splice_mem_rsv(at, RSV_ENTRY_SIZE, 0)
    }

    /// Drops the free space so the buffer holds a minimal blob.
    ///
    /// Later modifications that need space fail with
    /// [`FdtErrorKind::NoSpace`].
    pub fn pack(&mut self) {
        let header = self.fdt().header();
        let totalsize = header.off_dt_strings() + header.size_dt_strings();
        self.header_mut().totalsize = totalsize.into();
        self.data.truncate(totalsize as usize);
    }

    fn layout(&self) -> Layout {
        let header = self.fdt().header();
        Layout {
            rsvmap: header.off_mem_rsvmap() as usize,
            struct_offset: header.off_dt_struct() as usize,
            struct_size: header.size_dt_struct() as usize,
            strings_offset: header.off_dt_strings() as usize,
            strings_size: header.size_dt_strings() as usize,
        }
    }

    fn header_mut(&mut self) -> &mut FdtHeader {
        let (header, _remaining_bytes) = FdtHeader::mut_from_prefix(&mut self.data)
            .expect("an FdtBuf is always at least as big as the header");
        header
    }

    fn write_header(&mut self, layout: &Layout, boot_cpuid_phys: u32) -> Result<(), FdtError> {
        let header = FdtHeader {
            magic: FDT_MAGIC.into(),
            totalsize: to_u32(self.data.len(), 4)?.into(),
            off_dt_struct: to_u32(layout.struct_offset, 8)?.into(),
            off_dt_strings: to_u32(layout.strings_offset, 12)?.into(),
            off_mem_rsvmap: to_u32(layout.rsvmap, 16)?.into(),
            version: FDT_VERSION.into(),
            last_comp_version: FDT_LAST_COMP_VERSION.into(),
            boot_cpuid_phys: boot_cpuid_phys.into(),
            size_dt_strings: to_u32(layout.strings_size, 32)?.into(),
            size_dt_struct: to_u32(layout.struct_size, 36)?.into(),
        };
        self.data[..HEADER_SIZE].copy_from_slice(header.as_bytes());
        Ok(())
    }

    /// Replaces `old_len` bytes at `at` with `new_len` bytes, moving
    /// everything after them up to the end of the strings block.
    ///
    /// Grown regions keep stale bytes and must be overwritten by the caller.
    fn splice(&mut self, at: usize, old_len: usize, new_len: usize) -> Result<(), FdtError> {
        let end = self.used();
        if at + old_len > end {
            return Err(FdtError::new(FdtErrorKind::BadStructure, at));
        }
        let new_end = end - old_len + new_len;
        if new_end > self.capacity() {
            return Err(FdtError::new(FdtErrorKind::NoSpace, at));
        }
        self.data.copy_within(at + old_len..end, at + new_len);
        if new_end < end {
            self.data[new_end..end].fill(0);
        }
        Ok(())
    }

    fn splice_struct(&mut self, at: usize, old_len: usize, new_len: usize) -> Result<(), FdtError> {
        let layout = self.layout();
        let struct_size = to_u32(layout.struct_size + new_len - old_len, at)?;
        let strings_offset = to_u32(layout.strings_offset + new_len - old_len, at)?;
        self.splice(at, old_len, new_len)?;
        let header = self.header_mut();
        header.size_dt_struct = struct_size.into();
        header.off_dt_strings = strings_offset.into();
        Ok(())
    }

    fn splice_mem_rsv(&mut self, at: usize, old_len: usize, new_len: usize) -> Result<(), FdtError> {
        let layout = self.layout();
        let struct_offset = to_u32(layout.struct_offset + new_len - old_len, at)?;
        let strings_offset = to_u32(layout.strings_offset + new_len - old_len, at)?;
        self.splice(at, old_len, new_len)?;
        let header = self.header_mut();
        header.off_dt_struct = struct_offset.into();
        header.off_dt_strings = strings_offset.into();
        Ok(())
    }

    /// Returns the offset of `name` within the strings block, if present.
    fn find_string(&self, name: &str) -> Option<usize> {
        let (start, end) = self.fdt().strings_range();
        let name = name.as_bytes();
        self.data[start..end]
            .windows(name.len() + 1)
            .position(|window| window[..name.len()] == *name && window[name.len()] == 0)
    }

    fn append_string(&mut self, name: &str) -> Result<(), FdtError> {
        let end = self.used();
        let new_size = self.layout().strings_size + name.len() + 1;
        if end + name.len() + 1 > self.capacity() {
            return Err(FdtError::new(FdtErrorKind::NoSpace, end));
        }
        self.data[end..end + name.len()].copy_from_slice(name.as_bytes());
        self.data[end + name.len()] = 0;
        self.header_mut().size_dt_strings = to_u32(new_size, end)?.into();
        Ok(())
    }

    fn write_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + FDT_TAGSIZE].copy_from_slice(&value.to_be_bytes());
    }

    /// Writes `value` at `offset` and zeroes the padding up to the next tag
    /// boundary.
    fn write_padded(&mut self, offset: usize, value: &[u8]) {
        let end = offset + value.len();
        self.data[offset..end].copy_from_slice(value);
        self.data[end..offset + align(value.len())].fill(0);
    }
}

impl fmt::Debug for FdtBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FdtBuf")
            .field("used", &self.used())
            .field("capacity", &self.capacity())
            .finish()
    }
}

fn align(len: usize) -> usize {
    Fdt::align_tag_offset(len)
}

fn check_name(name: &str, offset: usize) -> Result<(), FdtError> {
    if name.is_empty() || name.contains('\0') {
        return Err(FdtError::new(FdtErrorKind::InvalidName, offset));
    }
    Ok(())
}

fn to_u32(value: usize, offset: usize) -> Result<u32, FdtError> {
    u32::try_from(value).map_err(|_| FdtError::new(FdtErrorKind::InvalidLength, offset))
}
