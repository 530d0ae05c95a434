// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types for the `transfer_live_props` crate.

use std::fmt;
use std::io;
use std::path::PathBuf;

use live_fdt::error::FdtError;

use crate::file::MAX_FILE_SIZE;
use crate::tree::TreeRole;

/// An error that can occur while reading a device tree file.
#[derive(Debug)]
#[non_exhaustive]
pub enum ReadError {
    /// The file could not be opened or read.
    Io(io::Error),
    /// The file is larger than [`MAX_FILE_SIZE`].
    TooLarge(u64),
}

/// An error that can occur while transferring properties between device
/// trees.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A required environment variable is not set.
    MissingInput(&'static str),
    /// A device tree file could not be read.
    Read { path: PathBuf, source: ReadError },
    /// A device tree file does not hold a valid device tree.
    InvalidTree {
        tree: TreeRole,
        path: PathBuf,
        source: FdtError,
    },
    /// A device tree turned out to be malformed while it was being read.
    Parse {
        tree: TreeRole,
        path: String,
        source: FdtError,
    },
    /// A node path could not be resolved.
    NodeNotFound { tree: TreeRole, path: String },
    /// A node does not have the requested property.
    PropertyNotFound {
        tree: TreeRole,
        path: String,
        name: String,
    },
    /// A property of the destination tree could not be modified.
    Write {
        path: String,
        name: String,
        source: FdtError,
    },
    /// The destination tree could not be written back to its file.
    Persist { path: PathBuf, source: io::Error },
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::TooLarge(size) => write!(
                f,
                "file is {size} bytes, more than the {MAX_FILE_SIZE} byte limit"
            ),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput(var) => write!(f, "`{var}` is not set"),
            Self::Read { path, source } => {
                write!(f, "error reading {}: {source}", path.display())
            }
            Self::InvalidTree { tree, path, source } => {
                write!(f, "invalid dtb {} ({tree}): {source}", path.display())
            }
            Self::Parse { tree, path, source } => {
                write!(f, "malformed {tree} while reading {path}: {source}")
            }
            Self::NodeNotFound { tree, path } => write!(f, "node {path} not found in {tree}"),
            Self::PropertyNotFound { tree, path, name } => {
                write!(f, "property {path}/{name} not found in {tree}")
            }
            Self::Write { path, name, source } => write!(f, "setting {path}/{name}: {source}"),
            Self::Persist { path, source } => {
                write!(f, "failed to write {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::TooLarge(_) => None,
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::InvalidTree { source, .. }
            | Self::Parse { source, .. }
            | Self::Write { source, .. } => Some(source),
            Self::Persist { source, .. } => Some(source),
            Self::MissingInput(_) | Self::NodeNotFound { .. } | Self::PropertyNotFound { .. } => {
                None
            }
        }
    }
}
