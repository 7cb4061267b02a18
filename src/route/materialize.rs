//! Copying artifacts into pool directories
//!
//! Each copy goes to a uniquely named temporary file in the destination
//! directory and is renamed over the canonical name. Concurrent writers of
//! the same identity never expose a partially written file; the last rename
//! wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Prefix of in-flight temporary files inside pool directories
pub const TEMP_PREFIX: &str = ".pool-router-";

/// Suffix of in-flight temporary files inside pool directories
pub const TEMP_SUFFIX: &str = ".tmp";

/// Failure placing one file, with the path that failed
#[derive(Debug)]
pub struct PlaceError {
    pub path: PathBuf,
    pub source: io::Error,
}

/// Copy `source` into `dest_dir` as `file_name`, overwriting any existing
/// file. The directory is created if absent.
pub fn place_file(source: &Path, dest_dir: &Path, file_name: &str) -> Result<PathBuf, PlaceError> {
    fs::create_dir_all(dest_dir).map_err(|e| PlaceError {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;

    let final_path = dest_dir.join(file_name);
    let temp_path = dest_dir.join(format!(
        "{}{}{}",
        TEMP_PREFIX,
        ulid::Ulid::new().to_string().to_lowercase(),
        TEMP_SUFFIX
    ));

    if let Err(e) = fs::copy(source, &temp_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(PlaceError {
            path: temp_path,
            source: e,
        });
    }

    if let Err(e) = fs::rename(&temp_path, &final_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(PlaceError {
            path: final_path,
            source: e,
        });
    }

    Ok(final_path)
}

/// True for names produced by [`place_file`] while a copy is in flight
pub fn is_temp_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}
