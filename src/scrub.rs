// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::Error;
use crate::tree::DeviceTree;

pub const CHOSEN: &str = "chosen";
pub const KASLR_SEED: &str = "kaslr-seed";

/// Overwrites `/chosen/kaslr-seed` of `dest` with zeroes, creating it if
/// necessary, so that the seed of this boot is not handed on.
pub fn wipe_kaslr_seed(dest: &mut DeviceTree) -> Result<(), Error> {
    let chosen = dest.resolve(CHOSEN)?;
    dest.set_property(chosen, CHOSEN, KASLR_SEED, &[0; 8])
}
