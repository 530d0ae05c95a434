// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A read-only API for inspecting a device tree node.

use core::iter;

use super::{FDT_TAGSIZE, Fdt, FdtToken};
use crate::error::{FdtError, FdtErrorKind};
use crate::fdt::property::FdtProperty;

/// A node in a flattened device tree.
#[derive(Debug, Clone, Copy)]
pub struct FdtNode<'a> {
    pub(crate) fdt: Fdt<'a>,
    pub(crate) offset: usize,
}

impl<'a> FdtNode<'a> {
    /// Returns the name of this node, including its unit address.
    ///
    /// The root node has an empty name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a valid NUL-terminated string.
    pub fn name(&self) -> Result<&'a str, FdtError> {
        self.fdt.string_at_offset(self.offset + FDT_TAGSIZE, None)
    }

    /// Returns the offset of this node within its blob.
    ///
    /// The offset can be turned back into a node with [`Fdt::node`] for as
    /// long as the blob is not structurally modified.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns a property by its name.
    ///
    /// # Performance
    ///
    /// This method iterates through all properties of the node.
    ///
    /// # Errors
    ///
    /// Returns an error if a property record of this node is malformed.
    pub fn property(&self, name: &str) -> Result<Option<FdtProperty<'a>>, FdtError> {
        for property in self.properties() {
            let property = property?;
            if property.name() == name {
                return Ok(Some(property));
            }
        }
        Ok(None)
    }

    /// Returns an iterator over the properties of this node.
    ///
    /// The iterator stops after yielding the first error.
    pub fn properties(&self) -> impl Iterator<Item = Result<FdtProperty<'a>, FdtError>> + use<'a> {
        let fdt = self.fdt;
        let mut cursor = Some(fdt.node_body_offset(self.offset));
        iter::from_fn(move || {
            let offset = match cursor.take()? {
                Ok(offset) => offset,
                Err(e) => return Some(Err(e)),
            };
            match next_property(fdt, offset) {
                Ok(Some((property, next))) => {
                    cursor = Some(Ok(next));
                    Some(Ok(property))
                }
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            }
        })
    }

    /// Returns a child node by its exact name.
    ///
    /// No unit-address matching is performed: `memory` does not match a
    /// child called `memory@80000000`.
    ///
    /// # Performance
    ///
    /// This method's performance is linear in the number of children of this
    /// node because it iterates through the children.
    ///
    /// # Errors
    ///
    /// Returns an error if the structure of this node is malformed.
    pub fn child(&self, name: &str) -> Result<Option<FdtNode<'a>>, FdtError> {
        for child in self.children() {
            let child = child?;
            if child.name()? == name {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    /// Returns an iterator over the children of this node.
    ///
    /// The iterator stops after yielding the first error.
    pub fn children(&self) -> impl Iterator<Item = Result<FdtNode<'a>, FdtError>> + use<'a> {
        let fdt = self.fdt;
        let mut cursor = Some(fdt.node_body_offset(self.offset));
        iter::from_fn(move || {
            let offset = match cursor.take()? {
                Ok(offset) => offset,
                Err(e) => return Some(Err(e)),
            };
            match next_child(fdt, offset) {
                Ok(Some((child, next))) => {
                    cursor = Some(Ok(next));
                    Some(Ok(child))
                }
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            }
        })
    }

    /// Returns the offset of the first token following this node's
    /// properties, which is where a new property is inserted.
    pub(crate) fn properties_end(&self) -> Result<usize, FdtError> {
        let mut offset = self.fdt.node_body_offset(self.offset)?;
        loop {
            match self.fdt.read_token(offset)? {
                FdtToken::Prop => offset = self.fdt.next_property_offset(offset)?,
                FdtToken::Nop => offset += FDT_TAGSIZE,
                _ => return Ok(offset),
            }
        }
    }

    /// Returns the offset of the `FDT_END_NODE` token closing this node,
    /// which is where a new child is appended.
    pub(crate) fn end_offset(&self) -> Result<usize, FdtError> {
        Ok(self.fdt.next_sibling_offset(self.offset)? - FDT_TAGSIZE)
    }
}

/// Finds the next property at or after `offset`, skipping `FDT_NOP`s.
fn next_property(
    fdt: Fdt<'_>,
    mut offset: usize,
) -> Result<Option<(FdtProperty<'_>, usize)>, FdtError> {
    loop {
        match fdt.read_token(offset)? {
            FdtToken::Prop => {
                let property = fdt.property_at(offset)?;
                let next = fdt.next_property_offset(offset)?;
                return Ok(Some((property, next)));
            }
            FdtToken::Nop => offset += FDT_TAGSIZE,
            _ => return Ok(None),
        }
    }
}

/// Finds the next child node at or after `offset`, skipping properties and
/// `FDT_NOP`s.
fn next_child(fdt: Fdt<'_>, mut offset: usize) -> Result<Option<(FdtNode<'_>, usize)>, FdtError> {
    loop {
        match fdt.read_token(offset)? {
            FdtToken::BeginNode => {
                let next = fdt.next_sibling_offset(offset)?;
                return Ok(Some((FdtNode { fdt, offset }, next)));
            }
            FdtToken::EndNode => return Ok(None),
            FdtToken::Prop => offset = fdt.next_property_offset(offset)?,
            FdtToken::Nop => offset += FDT_TAGSIZE,
            FdtToken::End => return Err(FdtError::new(FdtErrorKind::BadStructure, offset)),
        }
    }
}
