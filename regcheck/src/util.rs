//! Methods for reading files

use std::{io, path};

use fs_err as fs;

/// Returns contents of a file at `path`
///
/// The file is opened, read in full and closed before returning. The error names the path.
pub(crate) fn read_file(path: &path::Path) -> Result<String, io::Error> {
    fs::read_to_string(path)
}

/// Returns the canonical, absolute form of `path`
///
/// Fails if the path does not exist.
pub(crate) fn canonicalize(path: &path::Path) -> Result<path::PathBuf, io::Error> {
    fs::canonicalize(path)
}
