// Copyright 2024 Google LLC.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

use std::io::{self, Write};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Name every log line is prefixed with.
pub const PROGRAM_NAME: &str = env!("CARGO_PKG_NAME");

/// Writes each record as a single line on standard error.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // There is nowhere left to report a failure to write to stderr.
        let _ = writeln!(
            io::stderr().lock(),
            "{}",
            format_record(record.level(), record.args())
        );
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

fn format_record(level: log::Level, args: &std::fmt::Arguments<'_>) -> String {
    format!("{PROGRAM_NAME}: [{level}] {args}")
}

static LOGGER: StderrLogger = StderrLogger;

/// Initialises the logger, discarding records less severe than `max_level`.
pub fn init(max_level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(max_level);
    Ok(())
}
