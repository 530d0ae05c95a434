// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::process::ExitCode;

use log::{LevelFilter, debug, error, info};
use transfer_live_props::config::Config;
use transfer_live_props::error::Error;
use transfer_live_props::{hook, logger};

const LOG_LEVEL: LevelFilter = LevelFilter::Info;

fn main() -> ExitCode {
    if let Err(e) = logger::init(LOG_LEVEL) {
        eprintln!("{}: failed to set up logging: {e}", logger::PROGRAM_NAME);
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(Error::MissingInput(var)) => {
            debug!("{var} is not set, nothing to do");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            error!("{e}");
            return ExitCode::from(hook::FAILURE_STATUS);
        }
    };

    match hook::run(&config) {
        Ok(report) => {
            info!(
                "{} transfers skipped, {} memory reservations copied",
                report.transfer_failures, report.reservations
            );
            ExitCode::from(report.exit_status())
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(hook::FAILURE_STATUS)
        }
    }
}
