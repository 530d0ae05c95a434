// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reading device tree files and replacing them atomically.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use log::debug;
use tempfile::Builder;

use crate::error::ReadError;

/// Largest device tree file that will be read.
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Mode of a replaced file, independent of the process umask.
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Reads the whole of the file at `path`.
///
/// Fails with [`ReadError::TooLarge`] without reading anything if the file is
/// larger than [`MAX_FILE_SIZE`].
pub fn read_file(path: &Path) -> Result<Vec<u8>, ReadError> {
    let file = File::open(path).map_err(ReadError::Io)?;
    let size = file.metadata().map_err(ReadError::Io)?.len();
    if size > MAX_FILE_SIZE {
        return Err(ReadError::TooLarge(size));
    }

    let mut contents = Vec::with_capacity(usize::try_from(size).unwrap_or_default());
    file.take(size)
        .read_to_end(&mut contents)
        .map_err(ReadError::Io)?;
    debug!("read {} bytes from {}", contents.len(), path.display());
    Ok(contents)
}

/// Replaces the file at `path` with `contents`.
///
/// Readers of `path` see either the old contents or the new contents in full,
/// never a mixture.
pub fn replace_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    replace_file_with(path, |file| file.write_all(contents))
}

/// Replaces the file at `path` with whatever `write` writes to a temporary
/// file created next to it.
///
/// If `write` fails the temporary file is removed and `path` is left as it
/// was.
pub fn replace_file_with(
    path: &Path,
    write: impl FnOnce(&mut File) -> io::Result<()>,
) -> io::Result<()> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} does not name a file", path.display()),
        )
    })?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut prefix = name.to_os_string();
    prefix.push(".");

    let mut temp = Builder::new()
        .prefix(&prefix)
        .rand_bytes(6)
        .tempfile_in(dir)?;
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(Permissions::from_mode(FILE_MODE))?;
    }

    write(temp.as_file_mut())?;
    temp.as_file().sync_all()?;
    debug!("renaming {} to {}", temp.path().display(), path.display());
    temp.persist(path)?;
    Ok(())
}
