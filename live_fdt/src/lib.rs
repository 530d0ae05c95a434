// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A library for reading and editing Flattened Device Tree (FDT) blobs in
//! place.
//!
//! This library provides two APIs:
//!
//! - A read-only API for validating and traversing FDTs without memory
//!   allocation.
//! - An editing API that owns a blob in a fixed-capacity buffer and modifies
//!   it in place, in the style of libfdt's read-write functions.
//!
//! The library is written purely in Rust and is `#![no_std]` compatible. If
//! you don't need the editing functionality, the library is also
//! no-`alloc`-compatible.
//!
//! ## Read-Only API
//!
//! The read-only API is centered around the [`Fdt`](fdt::Fdt) struct, which
//! provides a safe, zero-copy view of an FDT blob. Nodes are addressed by
//! their byte offset into the blob, which makes them cheap to pass around
//! but only valid until the blob is modified.
//!
//! ## Editing API
//!
//! The editing API is centered around the [`FdtBuf`] struct. It re-encodes
//! a blob into a buffer with some free space at the end, which is then used
//! to add or grow properties, nodes and memory reservations. Once editing is
//! done, [`FdtBuf::pack`] trims the free space again.
//!
//! # Examples
//!
//! ```
//! use live_fdt::fdt::Fdt;
//! use live_fdt::{FdtBuf, MemoryReservation};
//!
//! // Create a new device tree from scratch.
//! let mut tree = FdtBuf::create_empty(512).unwrap();
//! let root = tree.fdt().root().unwrap().offset();
//! let child = tree.add_subnode(root, "child").unwrap();
//! tree.set_property(child, "my-property", b"hello\0").unwrap();
//! tree.add_mem_rsv(MemoryReservation::new(0x1000, 0x100)).unwrap();
//! tree.pack();
//!
//! // Parse the blob with the read-only API.
//! let fdt = Fdt::new(tree.as_bytes()).unwrap();
//! let child = fdt.root().unwrap().child("child").unwrap().unwrap();
//! let prop = child.property("my-property").unwrap().unwrap();
//! assert_eq!(prop.as_str().unwrap(), "hello");
//! assert_eq!(fdt.num_mem_rsv().unwrap(), 1);
//! ```

#![no_std]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "write")]
mod buf;
pub mod error;
pub mod fdt;
mod memreserve;

#[cfg(feature = "write")]
#[cfg_attr(docsrs, doc(cfg(feature = "write")))]
pub use buf::FdtBuf;
pub use memreserve::MemoryReservation;
