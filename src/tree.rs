// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A device tree loaded from a file, together with the file it came from.

use std::fmt;
use std::path::{Path, PathBuf};

use live_fdt::FdtBuf;
use log::debug;

use crate::error::Error;
use crate::file;
use crate::resolve;

/// Free space added after the destination tree so that properties can be
/// added or grown.
pub const EXTRA_SPACE: usize = 1024;

/// Which of the two trees of a handoff a [`DeviceTree`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeRole {
    /// The tree handed to the next kernel, which is modified and written back.
    Destination,
    /// The tree of the running system, which is only read.
    Source,
}

impl TreeRole {
    fn slack(self) -> usize {
        match self {
            Self::Destination => EXTRA_SPACE,
            Self::Source => 0,
        }
    }
}

impl fmt::Display for TreeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Destination => write!(f, "destination DT"),
            Self::Source => write!(f, "source DT"),
        }
    }
}

/// An in-memory device tree and the path it is persisted at.
#[derive(Debug)]
pub struct DeviceTree {
    role: TreeRole,
    path: PathBuf,
    buf: FdtBuf,
}

impl DeviceTree {
    /// Reads and validates the device tree at `path`.
    pub fn load(role: TreeRole, path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let bytes = match file::read_file(&path) {
            Ok(bytes) => bytes,
            Err(source) => return Err(Error::Read { path, source }),
        };
        Self::from_bytes(role, path, &bytes)
    }

    /// Validates `bytes` as the device tree for `path`, without touching the
    /// filesystem.
    pub fn from_bytes(
        role: TreeRole,
        path: impl Into<PathBuf>,
        bytes: &[u8],
    ) -> Result<Self, Error> {
        let path = path.into();
        match FdtBuf::open_with_slack(bytes, role.slack()) {
            Ok(buf) => {
                debug!(
                    "loaded {role} from {}: {} bytes, {} free",
                    path.display(),
                    buf.used(),
                    buf.free_space()
                );
                Ok(Self { role, path, buf })
            }
            Err(source) => Err(Error::InvalidTree {
                tree: role,
                path,
                source,
            }),
        }
    }

    pub fn role(&self) -> TreeRole {
        self.role
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn buf(&self) -> &FdtBuf {
        &self.buf
    }

    pub fn buf_mut(&mut self) -> &mut FdtBuf {
        &mut self.buf
    }

    /// Returns the offset of the node at the root-relative `path`.
    ///
    /// The offset is only valid until the tree is next modified.
    pub fn resolve(&self, path: &str) -> Result<usize, Error> {
        resolve::resolve(self, path)
    }

    /// Returns the value of property `name` of the node at `node`, which was
    /// resolved from `path`.
    pub fn property(&self, node: usize, path: &str, name: &str) -> Result<Option<&[u8]>, Error> {
        self.buf.property(node, name).map_err(|source| Error::Parse {
            tree: self.role,
            path: path.to_owned(),
            source,
        })
    }

    /// Sets property `name` of the node at `node`, which was resolved from
    /// `path`.
    pub fn set_property(
        &mut self,
        node: usize,
        path: &str,
        name: &str,
        value: &[u8],
    ) -> Result<(), Error> {
        self.buf
            .set_property(node, name, value)
            .map_err(|source| write_error(path, name, source))
    }

    /// Removes property `name` of the node at `node`, returning whether it was
    /// present.
    pub fn remove_property(&mut self, node: usize, path: &str, name: &str) -> Result<bool, Error> {
        self.buf
            .remove_property(node, name)
            .map_err(|source| write_error(path, name, source))
    }

    /// Packs the tree and returns its serialized form.
    pub fn serialize(&mut self) -> &[u8] {
        self.buf.pack();
        self.buf.as_bytes()
    }

    /// Packs the tree and atomically replaces the file it was loaded from.
    pub fn persist(&mut self) -> Result<(), Error> {
        self.buf.pack();
        file::replace_file(&self.path, self.buf.as_bytes()).map_err(|source| Error::Persist {
            path: self.path.clone(),
            source,
        })?;
        debug!("wrote {} bytes to {}", self.buf.used(), self.path.display());
        Ok(())
    }
}

fn write_error(path: &str, name: &str, source: live_fdt::error::FdtError) -> Error {
    Error::Write {
        path: path.to_owned(),
        name: name.to_owned(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use live_fdt::error::FdtErrorKind;

    fn empty_dtb() -> Vec<u8> {
        let mut buf = FdtBuf::create_empty(256).unwrap();
        buf.pack();
        buf.into_bytes()
    }

    #[test]
    fn slack_depends_on_role() {
        let dtb = empty_dtb();

        let dest = DeviceTree::from_bytes(TreeRole::Destination, "boot.dtb", &dtb).unwrap();
        assert_eq!(dest.buf().capacity(), dtb.len() + EXTRA_SPACE);
        assert_eq!(dest.path(), Path::new("boot.dtb"));

        let src = DeviceTree::from_bytes(TreeRole::Source, "fdt", &dtb).unwrap();
        assert_eq!(src.buf().capacity(), dtb.len());
    }

    #[test]
    fn invalid_tree() {
        let mut dtb = empty_dtb();
        dtb[0] = 0;

        let err = DeviceTree::from_bytes(TreeRole::Source, "fdt", &dtb).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTree { tree: TreeRole::Source, source, .. }
                if source.kind == FdtErrorKind::InvalidMagic
        ));
    }

    #[test]
    fn serialize_drops_slack() {
        let dtb = empty_dtb();
        let mut dest = DeviceTree::from_bytes(TreeRole::Destination, "boot.dtb", &dtb).unwrap();
        assert_eq!(dest.serialize(), &dtb[..]);
    }

    #[test]
    fn write_errors_name_the_property() {
        let dtb = empty_dtb();
        let mut src = DeviceTree::from_bytes(TreeRole::Source, "fdt", &dtb).unwrap();
        let root = src.resolve("").unwrap();

        let err = src.set_property(root, "", "model", b"board\0").unwrap_err();
        assert!(matches!(
            &err,
            Error::Write { name, source, .. }
                if name == "model" && source.kind == FdtErrorKind::NoSpace
        ));
        assert!(err.to_string().starts_with("setting /model: not enough space"));
    }
}
