// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use log::{debug, warn};

use crate::tree::DeviceTree;

/// Replaces the memory reservation map of `dest` with that of `src`.
///
/// Entries that cannot be read from `src` or added to `dest` are logged and
/// skipped. Returns the number of entries copied.
pub fn replace_reserved_memory(dest: &mut DeviceTree, src: &DeviceTree) -> usize {
    match dest.buf().num_mem_rsv() {
        Ok(count) => {
            // Deleting from the end keeps the remaining indices valid.
            for index in (0..count).rev() {
                if let Err(e) = dest.buf_mut().del_mem_rsv(index) {
                    warn!("{}: deleting memory reservation {index}: {e}", dest.role());
                }
            }
        }
        Err(e) => warn!("{}: reading memory reservations: {e}", dest.role()),
    }

    let mut copied = 0;
    for (index, entry) in src.buf().fdt().memory_reservations().enumerate() {
        let reservation = match entry {
            Ok(reservation) => reservation,
            Err(e) => {
                warn!("{}: skipping memory reservation {index}: {e}", src.role());
                continue;
            }
        };
        match dest.buf_mut().add_mem_rsv(reservation) {
            Ok(()) => copied += 1,
            Err(e) => warn!(
                "{}: adding memory reservation {:#x}+{:#x}: {e}",
                dest.role(),
                reservation.address(),
                reservation.size()
            ),
        }
    }
    debug!("copied {copied} memory reservations");
    copied
}
