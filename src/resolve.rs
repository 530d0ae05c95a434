// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::Error;
use crate::tree::DeviceTree;

/// Walks `path` from the root of `tree`, one `/`-separated component at a
/// time, and returns the offset of the node it names.
///
/// Paths are relative to the root and have no leading `/`. The empty path
/// names the root itself. Each component must match a child's full name,
/// including any unit address.
pub fn resolve(tree: &DeviceTree, path: &str) -> Result<usize, Error> {
    let parse_error = |source| Error::Parse {
        tree: tree.role(),
        path: path.to_owned(),
        source,
    };

    let mut node = tree.buf().fdt().root().map_err(parse_error)?;
    if path.is_empty() {
        return Ok(node.offset());
    }
    for component in path.split('/') {
        node = node
            .child(component)
            .map_err(parse_error)?
            .ok_or_else(|| Error::NodeNotFound {
                tree: tree.role(),
                path: path.to_owned(),
            })?;
    }
    Ok(node.offset())
}
