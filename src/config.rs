// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Locating the two device tree files from the environment.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::Error;

/// Environment variable naming the destination device tree file.
pub const BOOT_DTB_VAR: &str = "boot_dtb";
/// Environment variable naming the source device tree file.
pub const MODEL_DTB_VAR: &str = "model_dtb";
/// Source device tree used when [`MODEL_DTB_VAR`] is not set.
pub const DEFAULT_MODEL_DTB: &str = "/sys/firmware/fdt";

/// Paths of the device trees a handoff operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Device tree that will be handed to the next kernel. Rewritten in place.
    pub boot_dtb: PathBuf,
    /// Device tree the running system was booted with. Only read.
    pub model_dtb: PathBuf,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| env::var_os(name))
    }

    /// Builds the configuration from variables returned by `lookup`.
    ///
    /// Returns [`Error::MissingInput`] if [`BOOT_DTB_VAR`] is not set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self, Error> {
        let boot_dtb = lookup(BOOT_DTB_VAR).ok_or(Error::MissingInput(BOOT_DTB_VAR))?;
        let model_dtb = lookup(MODEL_DTB_VAR).unwrap_or_else(|| DEFAULT_MODEL_DTB.into());
        Ok(Self {
            boot_dtb: boot_dtb.into(),
            model_dtb: model_dtb.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let vars: HashMap<String, OsString> = vars
            .iter()
            .map(|(name, value)| ((*name).to_owned(), OsString::from(value)))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn both_set() {
        let config = Config::from_lookup(lookup(&[
            ("boot_dtb", "/tmp/next.dtb"),
            ("model_dtb", "/tmp/live.dtb"),
        ]))
        .unwrap();
        assert_eq!(config.boot_dtb, PathBuf::from("/tmp/next.dtb"));
        assert_eq!(config.model_dtb, PathBuf::from("/tmp/live.dtb"));
    }

    #[test]
    fn model_defaults_to_firmware_tree() {
        let config = Config::from_lookup(lookup(&[("boot_dtb", "next.dtb")])).unwrap();
        assert_eq!(config.boot_dtb, PathBuf::from("next.dtb"));
        assert_eq!(config.model_dtb, PathBuf::from("/sys/firmware/fdt"));
    }

    #[test]
    fn boot_dtb_is_required() {
        let err = Config::from_lookup(lookup(&[("model_dtb", "live.dtb")])).unwrap_err();
        assert!(matches!(err, Error::MissingInput("boot_dtb")));
    }
}
