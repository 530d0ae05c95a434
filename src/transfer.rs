// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Copying properties filled in by firmware from the source tree into the
//! destination tree.

use std::fmt;

use log::debug;

use crate::error::Error;
use crate::tree::DeviceTree;

/// Name of the property that marks a node as enabled or disabled.
pub const STATUS: &str = "status";

const CPU_RELEASE_ADDR: &str = "cpu-release-addr";
const FRAMEBUFFER: &str = "chosen/framebuffer";
const OKAY: &[u8] = b"okay";
const DISABLED: &[u8] = b"disabled\0";

/// A single step of the handoff, applied to one node of both trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Copy property `name` of node `path` verbatim.
    Copy {
        path: &'static str,
        name: &'static str,
    },
    /// Carry the enabled or disabled state of node `path` across.
    MergeStatus { path: &'static str },
}

const fn copy(path: &'static str, name: &'static str) -> Transfer {
    Transfer::Copy { path, name }
}

const fn merge_status(path: &'static str) -> Transfer {
    Transfer::MergeStatus { path }
}

/// The transfers performed on every handoff, in order.
pub const TRANSFERS: [Transfer; 23] = [
    copy("cpus/cpu@0", CPU_RELEASE_ADDR),
    copy("cpus/cpu@1", CPU_RELEASE_ADDR),
    copy("cpus/cpu@2", CPU_RELEASE_ADDR),
    copy("cpus/cpu@3", CPU_RELEASE_ADDR),
    copy("cpus/cpu@10100", CPU_RELEASE_ADDR),
    copy("cpus/cpu@10101", CPU_RELEASE_ADDR),
    copy("cpus/cpu@10102", CPU_RELEASE_ADDR),
    copy("cpus/cpu@10103", CPU_RELEASE_ADDR),
    merge_status("cpus/cpu@0"),
    merge_status("cpus/cpu@1"),
    merge_status("cpus/cpu@2"),
    merge_status("cpus/cpu@3"),
    merge_status("cpus/cpu@10100"),
    merge_status("cpus/cpu@10101"),
    merge_status("cpus/cpu@10102"),
    merge_status("cpus/cpu@10103"),
    copy(FRAMEBUFFER, "reg"),
    copy(FRAMEBUFFER, "format"),
    copy(FRAMEBUFFER, "stride"),
    copy(FRAMEBUFFER, "height"),
    copy(FRAMEBUFFER, "width"),
    merge_status(FRAMEBUFFER),
    copy("memory", "reg"),
];

impl Transfer {
    /// Performs this transfer from `src` into `dest`.
    pub fn apply(&self, dest: &mut DeviceTree, src: &DeviceTree) -> Result<(), Error> {
        match *self {
            Self::Copy { path, name } => copy_property(dest, src, path, name),
            Self::MergeStatus { path } => merge_disabled_state(dest, src, path),
        }
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy { path, name } => write!(f, "copy of {path}/{name}"),
            Self::MergeStatus { path } => write!(f, "{STATUS} merge of {path}"),
        }
    }
}

/// Copies the value of property `name` of node `path` in `src` to the same
/// node in `dest`, replacing any value already there.
pub fn copy_property(
    dest: &mut DeviceTree,
    src: &DeviceTree,
    path: &str,
    name: &str,
) -> Result<(), Error> {
    let dest_node = dest.resolve(path)?;
    let src_node = src.resolve(path)?;
    let value = src
        .property(src_node, path, name)?
        .ok_or_else(|| Error::PropertyNotFound {
            tree: src.role(),
            path: path.to_owned(),
            name: name.to_owned(),
        })?;
    dest.set_property(dest_node, path, name, value)?;
    debug!("copied {path}/{name} ({} bytes)", value.len());
    Ok(())
}

/// Makes node `path` of `dest` enabled or disabled according to the same node
/// of `src`.
///
/// An enabled node has no `status` property in `dest` afterwards, a disabled
/// one has `status = "disabled"`. Whatever `status` `dest` had before is
/// discarded.
pub fn merge_disabled_state(
    dest: &mut DeviceTree,
    src: &DeviceTree,
    path: &str,
) -> Result<(), Error> {
    let dest_node = dest.resolve(path)?;
    let src_node = src.resolve(path)?;
    if is_enabled(src.property(src_node, path, STATUS)?) {
        if dest.remove_property(dest_node, path, STATUS)? {
            debug!("{path} is enabled, removed {STATUS}");
        }
    } else {
        dest.set_property(dest_node, path, STATUS, DISABLED)?;
        debug!("{path} is disabled");
    }
    Ok(())
}

/// Returns whether a node with the given `status` value is enabled.
///
/// A missing `status` counts as enabled.
pub fn is_enabled(status: Option<&[u8]>) -> bool {
    match status {
        None => true,
        Some(value) => value.strip_suffix(b"\0").unwrap_or(value) == OKAY,
    }
}
