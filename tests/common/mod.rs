// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![allow(dead_code)]

use live_fdt::{FdtBuf, MemoryReservation};
use transfer_live_props::tree::{DeviceTree, TreeRole};

/// Builds device tree blobs for tests, creating nodes along paths as needed.
pub struct TreeBuilder {
    buf: FdtBuf,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            buf: FdtBuf::create_empty(16 * 1024).unwrap(),
        }
    }

    pub fn node(mut self, path: &str) -> Self {
        ensure_node(&mut self.buf, path);
        self
    }

    pub fn prop(mut self, path: &str, name: &str, value: &[u8]) -> Self {
        let node = ensure_node(&mut self.buf, path);
        self.buf.set_property(node, name, value).unwrap();
        self
    }

    pub fn reservation(mut self, address: u64, size: u64) -> Self {
        self.buf
            .add_mem_rsv(MemoryReservation::new(address, size))
            .unwrap();
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.buf.pack();
        self.buf.into_bytes()
    }
}

fn ensure_node(buf: &mut FdtBuf, path: &str) -> usize {
    let mut offset = buf.fdt().root().unwrap().offset();
    if path.is_empty() {
        return offset;
    }
    for component in path.split('/') {
        let existing = buf
            .fdt()
            .node(offset)
            .unwrap()
            .child(component)
            .unwrap()
            .map(|node| node.offset());
        offset = match existing {
            Some(child) => child,
            None => buf.add_subnode(offset, component).unwrap(),
        };
    }
    offset
}

pub fn destination(dtb: &[u8]) -> DeviceTree {
    DeviceTree::from_bytes(TreeRole::Destination, "boot.dtb", dtb).unwrap()
}

pub fn source(dtb: &[u8]) -> DeviceTree {
    DeviceTree::from_bytes(TreeRole::Source, "fdt", dtb).unwrap()
}

/// Returns the value of property `name` of node `path`, if both exist.
pub fn get(tree: &DeviceTree, path: &str, name: &str) -> Option<Vec<u8>> {
    let node = tree.resolve(path).ok()?;
    tree.property(node, path, name).unwrap().map(<[u8]>::to_vec)
}

pub fn reservations(tree: &DeviceTree) -> Vec<(u64, u64)> {
    tree.buf()
        .fdt()
        .memory_reservations()
        .map(|entry| {
            let entry = entry.unwrap();
            (entry.address(), entry.size())
        })
        .collect()
}

/// A source tree as firmware might leave it: two CPUs spun up, the other two
/// disabled, a framebuffer and a memory node.
pub fn live_tree() -> TreeBuilder {
    TreeBuilder::new()
        .prop("cpus/cpu@0", "cpu-release-addr", &0x1000u64.to_be_bytes())
        .prop("cpus/cpu@0", "status", b"okay\0")
        .prop("cpus/cpu@1", "cpu-release-addr", &0x1008u64.to_be_bytes())
        .prop("cpus/cpu@2", "cpu-release-addr", &0x1010u64.to_be_bytes())
        .prop("cpus/cpu@2", "status", b"disabled\0")
        .prop("cpus/cpu@3", "cpu-release-addr", &0x1018u64.to_be_bytes())
        .prop("cpus/cpu@3", "status", b"fail\0")
        .prop("chosen/framebuffer", "reg", &[0, 0, 0, 9, 0xe0, 0, 0, 0, 0, 0, 0, 0, 0, 0x7e, 0x90, 0])
        .prop("chosen/framebuffer", "format", b"a8r8g8b8\0")
        .prop("chosen/framebuffer", "stride", &0x2000u32.to_be_bytes())
        .prop("chosen/framebuffer", "height", &0x640u32.to_be_bytes())
        .prop("chosen/framebuffer", "width", &0xa00u32.to_be_bytes())
        .prop("chosen", "kaslr-seed", &0x0123_4567_89ab_cdefu64.to_be_bytes())
        .prop("memory", "reg", &[0, 0, 0, 8, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0])
        .reservation(0x8_0000_0000, 0x10_0000)
        .reservation(0x9_fff0_0000, 0x4000)
}

/// A destination tree as prepared for the next kernel, before any live
/// properties are known.
pub fn boot_tree() -> TreeBuilder {
    TreeBuilder::new()
        .prop("", "model", b"Apple Mac mini (M1, 2020)\0")
        .prop("cpus/cpu@0", "reg", &[0; 8])
        .prop("cpus/cpu@1", "reg", &[0, 0, 0, 0, 0, 0, 0, 1])
        .prop("cpus/cpu@2", "reg", &[0, 0, 0, 0, 0, 0, 0, 2])
        .prop("cpus/cpu@2", "status", b"okay\0")
        .prop("cpus/cpu@3", "reg", &[0, 0, 0, 0, 0, 0, 0, 3])
        .prop("chosen/framebuffer", "status", b"disabled\0")
        .prop("chosen", "bootargs", b"console=tty0\0")
        .node("memory")
        .reservation(0xdead_0000, 0x1000)
}
