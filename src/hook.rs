// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The fixed sequence of steps making up one handoff.

use log::{error, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::memreserve::replace_reserved_memory;
use crate::scrub::wipe_kaslr_seed;
use crate::transfer::TRANSFERS;
use crate::tree::{DeviceTree, TreeRole};

/// Exit status of a handoff that could not be completed.
pub const FAILURE_STATUS: u8 = 1;

/// The outcome of a handoff whose trees could both be loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    /// Number of entries of [`TRANSFERS`] that were skipped.
    pub transfer_failures: usize,
    /// Number of memory reservations copied from the source tree.
    pub reservations: usize,
    /// Whether the KASLR seed of the destination tree was overwritten.
    pub seed_wiped: bool,
    /// Whether the destination tree was written back to its file.
    pub persisted: bool,
}

impl Report {
    /// Returns whether the handoff succeeded.
    ///
    /// Skipped transfers don't count as failures.
    pub fn is_success(&self) -> bool {
        self.seed_wiped && self.persisted
    }

    /// Returns the process exit status for this outcome.
    pub fn exit_status(&self) -> u8 {
        if self.is_success() { 0 } else { FAILURE_STATUS }
    }
}

/// Loads both trees named by `config`, updates the destination tree from the
/// source tree and writes it back.
///
/// Returns an error only if either tree cannot be loaded. Failures of later
/// steps are logged and recorded in the [`Report`].
pub fn run(config: &Config) -> Result<Report, Error> {
    run_with(config, DeviceTree::persist)
}

/// Like [`run`], but writes the updated destination tree back with `persist`.
pub fn run_with(
    config: &Config,
    persist: impl FnOnce(&mut DeviceTree) -> Result<(), Error>,
) -> Result<Report, Error> {
    let mut dest = DeviceTree::load(TreeRole::Destination, &config.boot_dtb)?;
    let src = DeviceTree::load(TreeRole::Source, &config.model_dtb)?;
    info!(
        "transferring live properties from {} to {}",
        src.path().display(),
        dest.path().display()
    );

    let mut report = update(&mut dest, &src);
    match persist(&mut dest) {
        Ok(()) => report.persisted = true,
        Err(e) => error!("{e}"),
    }
    Ok(report)
}

/// Applies every in-memory step of a handoff to `dest`.
///
/// The returned report has `persisted` unset.
pub fn update(dest: &mut DeviceTree, src: &DeviceTree) -> Report {
    let mut report = Report::default();
    for transfer in &TRANSFERS {
        if let Err(e) = transfer.apply(dest, src) {
            warn!("skipping {transfer}: {e}");
            report.transfer_failures += 1;
        }
    }

    report.reservations = replace_reserved_memory(dest, src);

    match wipe_kaslr_seed(dest) {
        Ok(()) => report.seed_wiped = true,
        Err(e) => error!("failed to wipe the KASLR seed: {e}"),
    }
    report
}
