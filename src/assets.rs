//! Copies static assets and media into the output tree.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Copies each directory in `sources`, in order, onto `dst`, preserving
/// relative paths. When two sources contain the same relative path, the file
/// from the later source wins. Sources that don't exist are skipped. Returns
/// the number of distinct files in `dst` that came from `sources`.
pub fn copy_overlay<P: AsRef<Path>>(sources: &[P], dst: &Path) -> Result<usize> {
    create_dir(dst)?;
    let mut copied = HashSet::new();
    for src in sources {
        let src = src.as_ref();
        if !src.is_dir() {
            warn!(source = %src.display(), "Asset directory not found, skipping");
            continue;
        }
        copy_dir(src, dst, &mut copied)?;
    }
    Ok(copied.len())
}

fn copy_dir(src: &Path, dst: &Path, copied: &mut HashSet<PathBuf>) -> Result<()> {
    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            create_dir(&target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|err| Error::Copy {
                src: entry.path().to_owned(),
                dst: target.clone(),
                err,
            })?;
            debug!(file = %target.display(), "Copied asset");
            copied.insert(relative.to_owned());
        }
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|err| Error::CreateDir {
        path: path.to_owned(),
        err,
    })
}

/// The result of an asset-copying operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to copy assets into the output tree.
#[derive(Debug)]
pub enum Error {
    /// Returned when a source directory can't be walked.
    Walk(walkdir::Error),

    /// Returned when a destination directory can't be created.
    CreateDir { path: PathBuf, err: std::io::Error },

    /// Returned when a file can't be copied.
    Copy {
        src: PathBuf,
        dst: PathBuf,
        err: std::io::Error,
    },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Walk(err) => err.fmt(f),
            Error::CreateDir { path, err } => {
                write!(f, "Creating directory '{}': {}", path.display(), err)
            }
            Error::Copy { src, dst, err } => write!(
                f,
                "Copying '{}' to '{}': {}",
                src.display(),
                dst.display(),
                err
            ),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Walk(err) => Some(err),
            Error::CreateDir { path: _, err } => Some(err),
            Error::Copy { err, .. } => Some(err),
        }
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator while walking source directories.
    fn from(err: walkdir::Error) -> Error {
        Error::Walk(err)
    }
}
