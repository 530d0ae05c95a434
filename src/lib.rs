// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Carries properties that firmware filled in at boot over into the device
//! tree handed to the next kernel.
//!
//! The device tree named by `boot_dtb` is updated from the one the running
//! system booted with (`model_dtb`, by default `/sys/firmware/fdt`):
//!
//! - the CPU release addresses and the enabled state of each CPU
//! - the geometry and enabled state of the boot framebuffer
//! - the memory node's `reg`
//! - the memory reservation map
//!
//! Finally `/chosen/kaslr-seed` is zeroed and the file is replaced atomically.

pub mod config;
pub mod error;
pub mod file;
pub mod hook;
pub mod logger;
pub mod memreserve;
pub mod resolve;
pub mod scrub;
pub mod transfer;
pub mod tree;
