// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod common;

use common::{TreeBuilder, destination, get, source};
use transfer_live_props::error::Error;
use transfer_live_props::transfer::{Transfer, copy_property, merge_disabled_state};
use transfer_live_props::tree::{DeviceTree, TreeRole};

const RELEASE_ADDR: [u8; 8] = 0x1000u64.to_be_bytes();

fn cpu_tree() -> TreeBuilder {
    TreeBuilder::new()
        .prop("cpus", "#address-cells", &[0, 0, 0, 2])
        .prop("cpus/cpu@0", "reg", &[0; 8])
        .node("cpus/cpu@1")
}

#[test]
fn copy_adds_missing_property() {
    let src = source(
        &cpu_tree()
            .prop("cpus/cpu@0", "cpu-release-addr", &RELEASE_ADDR)
            .build(),
    );
    let mut dest = destination(&cpu_tree().build());

    copy_property(&mut dest, &src, "cpus/cpu@0", "cpu-release-addr").unwrap();

    // Nothing but the copied property changes.
    let expected = cpu_tree()
        .prop("cpus/cpu@0", "cpu-release-addr", &RELEASE_ADDR)
        .build();
    assert_eq!(dest.serialize(), &expected[..]);
}

#[test]
fn copy_replaces_existing_value() {
    let src = source(&cpu_tree().prop("cpus/cpu@0", "reg", &[1; 12]).build());
    let mut dest = destination(&cpu_tree().build());

    copy_property(&mut dest, &src, "cpus/cpu@0", "reg").unwrap();
    assert_eq!(get(&dest, "cpus/cpu@0", "reg"), Some(vec![1; 12]));

    let src = source(&cpu_tree().prop("cpus/cpu@0", "reg", &[2; 4]).build());
    copy_property(&mut dest, &src, "cpus/cpu@0", "reg").unwrap();
    assert_eq!(get(&dest, "cpus/cpu@0", "reg"), Some(vec![2; 4]));
    assert_eq!(
        get(&dest, "cpus", "#address-cells"),
        Some(vec![0, 0, 0, 2])
    );
}

#[test]
fn copy_empty_value() {
    let src = source(&cpu_tree().prop("cpus/cpu@1", "enable-method", &[]).build());
    let mut dest = destination(&cpu_tree().build());

    copy_property(&mut dest, &src, "cpus/cpu@1", "enable-method").unwrap();
    assert_eq!(get(&dest, "cpus/cpu@1", "enable-method"), Some(vec![]));
}

#[test]
fn copy_of_missing_property() {
    let src = source(&cpu_tree().build());
    let dtb = cpu_tree().build();
    let mut dest = destination(&dtb);

    let err = copy_property(&mut dest, &src, "cpus/cpu@1", "cpu-release-addr").unwrap_err();
    assert!(matches!(
        &err,
        Error::PropertyNotFound { tree: TreeRole::Source, path, name }
            if path == "cpus/cpu@1" && name == "cpu-release-addr"
    ));
    assert_eq!(dest.serialize(), &dtb[..]);
}

#[test]
fn copy_to_or_from_missing_node() {
    let with_cpu2 = cpu_tree()
        .prop("cpus/cpu@2", "cpu-release-addr", &RELEASE_ADDR)
        .build();

    let src = source(&with_cpu2);
    let dtb = cpu_tree().build();
    let mut dest = destination(&dtb);
    let err = copy_property(&mut dest, &src, "cpus/cpu@2", "cpu-release-addr").unwrap_err();
    assert!(matches!(
        err,
        Error::NodeNotFound { tree: TreeRole::Destination, .. }
    ));
    assert_eq!(dest.serialize(), &dtb[..]);

    let src = source(&cpu_tree().build());
    let mut dest = destination(&with_cpu2);
    let err = copy_property(&mut dest, &src, "cpus/cpu@2", "cpu-release-addr").unwrap_err();
    assert!(matches!(
        err,
        Error::NodeNotFound { tree: TreeRole::Source, .. }
    ));
}

#[test]
fn node_names_must_match_exactly() {
    let src = source(&cpu_tree().prop("cpus/cpu@0", "x", &[1]).build());
    let mut dest = destination(&cpu_tree().build());

    let err = copy_property(&mut dest, &src, "cpus/cpu", "x").unwrap_err();
    assert!(matches!(err, Error::NodeNotFound { .. }));
    let err = copy_property(&mut dest, &src, "cpu@0", "x").unwrap_err();
    assert!(matches!(err, Error::NodeNotFound { .. }));
}

#[test]
fn merge_status_matrix() {
    let statuses: [Option<&[u8]>; 5] = [
        None,
        Some(&b"okay\0"[..]),
        Some(&b"okay"[..]),
        Some(&b"disabled\0"[..]),
        Some(&b"fail\0"[..]),
    ];

    for src_status in statuses {
        for dest_status in statuses {
            let mut src = TreeBuilder::new().node("chosen/framebuffer");
            if let Some(status) = src_status {
                src = src.prop("chosen/framebuffer", "status", status);
            }
            let mut dest = TreeBuilder::new().node("chosen/framebuffer");
            if let Some(status) = dest_status {
                dest = dest.prop("chosen/framebuffer", "status", status);
            }
            let src = source(&src.build());
            let mut dest = destination(&dest.build());

            merge_disabled_state(&mut dest, &src, "chosen/framebuffer").unwrap();

            let expected = match src_status {
                None | Some(b"okay\0" | b"okay") => None,
                Some(_) => Some(b"disabled\0".to_vec()),
            };
            assert_eq!(
                get(&dest, "chosen/framebuffer", "status"),
                expected,
                "source {src_status:?}, destination {dest_status:?}"
            );
        }
    }
}

#[test]
fn merge_status_of_missing_node() {
    let src = source(&TreeBuilder::new().build());
    let mut dest = destination(&TreeBuilder::new().node("chosen/framebuffer").build());

    let err = merge_disabled_state(&mut dest, &src, "chosen/framebuffer").unwrap_err();
    assert!(matches!(
        err,
        Error::NodeNotFound { tree: TreeRole::Source, .. }
    ));
}

#[test]
fn apply_dispatches() {
    let src = source(
        &cpu_tree()
            .prop("cpus/cpu@1", "cpu-release-addr", &RELEASE_ADDR)
            .prop("cpus/cpu@1", "status", b"disabled\0")
            .build(),
    );
    let mut dest = destination(&cpu_tree().build());

    Transfer::Copy {
        path: "cpus/cpu@1",
        name: "cpu-release-addr",
    }
    .apply(&mut dest, &src)
    .unwrap();
    Transfer::MergeStatus { path: "cpus/cpu@1" }
        .apply(&mut dest, &src)
        .unwrap();

    assert_eq!(
        get(&dest, "cpus/cpu@1", "cpu-release-addr"),
        Some(RELEASE_ADDR.to_vec())
    );
    assert_eq!(
        get(&dest, "cpus/cpu@1", "status"),
        Some(b"disabled\0".to_vec())
    );
}

#[test]
fn full_destination_is_a_write_error() {
    // A source tree has no slack, so writing to it exercises running out of
    // space.
    let value = [0x5a; 64];
    let src = source(&cpu_tree().prop("cpus/cpu@0", "big", &value).build());
    let dtb = cpu_tree().build();
    let mut dest = DeviceTree::from_bytes(TreeRole::Source, "full.dtb", &dtb).unwrap();

    let err = copy_property(&mut dest, &src, "cpus/cpu@0", "big").unwrap_err();
    assert!(matches!(&err, Error::Write { name, .. } if name == "big"));
    assert_eq!(dest.serialize(), &dtb[..]);
}
