//! Streaming gzip + tar extraction.
//!
//! Entries are materialized one at a time straight from the decompressed
//! stream. Ancestor directories are created on demand, so archives whose
//! file entries precede their directory entries still extract cleanly.

use crate::error::ExtractError;
use flate2::read::GzDecoder;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tar::Archive;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Mode for ancestor directories that have no entry of their own (yet).
const PARENT_DIR_MODE: u32 = 0o755;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSummary {
    pub directories: usize,
    pub files: usize,
    pub skipped: usize,
}

/// Extracts the gzip-compressed tar archive at `archive_path` under
/// `destination`.
///
/// Only directories and regular files are materialized; links and special
/// files are skipped. Extraction aborts with [`ExtractError::UnsafePath`],
/// before anything is written for the entry, when its name is absolute or
/// contains `..`, when a symlink already on disk would resolve it outside
/// `destination`, or when a file entry would be written through a symlink.
pub fn extract_tar_gz(
    archive_path: &Path,
    destination: &Path,
) -> Result<ExtractSummary, ExtractError> {
    let file = File::open(archive_path).map_err(|source| ExtractError::OpenFailed {
        path: archive_path.to_path_buf(),
        source,
    })?;

    let mut reader = BufReader::new(file);
    let head = reader.fill_buf().map_err(|source| ExtractError::OpenFailed {
        path: archive_path.to_path_buf(),
        source,
    })?;
    if !head.starts_with(&GZIP_MAGIC) {
        return Err(ExtractError::BadCompression {
            path: archive_path.to_path_buf(),
            message: "missing gzip header".to_string(),
        });
    }

    let root = fs::create_dir_all(destination)
        .and_then(|()| fs::canonicalize(destination))
        .map_err(|source| ExtractError::IoFailure {
            path: destination.to_path_buf(),
            source,
        })?;

    let mut archive = Archive::new(GzDecoder::new(reader));
    let entries = archive
        .entries()
        .map_err(|e| stream_error(archive_path, e))?;

    let mut summary = ExtractSummary::default();
    for entry in entries {
        let mut entry = entry.map_err(|e| stream_error(archive_path, e))?;

        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let Some(relative) = sanitize_entry_path(&name)? else {
            log::debug!("Skipping entry with empty name: '{name}'");
            continue;
        };
        let target = root.join(&relative);

        let header = entry.header();
        let entry_type = header.entry_type();
        let mode = header.mode().map_err(|source| ExtractError::IoFailure {
            path: target.clone(),
            source,
        })?;

        if entry_type.is_dir() {
            ensure_within(&root, &target, &name)?;
            create_dir(&target, mode).map_err(|source| ExtractError::IoFailure {
                path: target.clone(),
                source,
            })?;
            summary.directories += 1;
        } else if entry_type.is_file() {
            ensure_within(&root, &target, &name)?;
            if fs::symlink_metadata(&target).is_ok_and(|m| m.file_type().is_symlink()) {
                return Err(ExtractError::UnsafePath { entry: name });
            }
            write_file(&mut entry, &target, mode).map_err(|source| ExtractError::IoFailure {
                path: target.clone(),
                source,
            })?;
            log::debug!("Extracted file: {}", target.display());
            summary.files += 1;
        } else {
            log::warn!("Skipping unsupported entry type {entry_type:?}: {name}");
            summary.skipped += 1;
        }
    }

    Ok(summary)
}

/// Reduces an entry name to a relative path below the destination root.
/// Returns `None` for names that normalize to nothing (`./`, empty).
fn sanitize_entry_path(name: &str) -> Result<Option<PathBuf>, ExtractError> {
    let mut clean = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::UnsafePath {
                    entry: name.to_string(),
                })
            }
        }
    }

    if clean.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(clean))
    }
}

/// Resolves the deepest ancestor of `target` that exists on disk and checks
/// it lies under `root`. Components below it do not exist yet and are created
/// as plain directories, so the entry cannot be redirected elsewhere.
fn ensure_within(root: &Path, target: &Path, name: &str) -> Result<(), ExtractError> {
    let resolved = target
        .ancestors()
        .find(|ancestor| fs::symlink_metadata(ancestor).is_ok())
        .and_then(|existing| fs::canonicalize(existing).ok());

    match resolved {
        Some(path) if path.starts_with(root) => Ok(()),
        _ => Err(ExtractError::UnsafePath {
            entry: name.to_string(),
        }),
    }
}

fn stream_error(archive_path: &Path, error: io::Error) -> ExtractError {
    match error.kind() {
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            ExtractError::BadCompression {
                path: archive_path.to_path_buf(),
                message: error.to_string(),
            }
        }
        _ => ExtractError::IoFailure {
            path: archive_path.to_path_buf(),
            source: error,
        },
    }
}

fn create_dir(path: &Path, mode: u32) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode & 0o7777);
    }
    builder.create(path)?;
    set_mode(path, mode)
}

fn write_file<R: Read>(contents: &mut R, path: &Path, mode: u32) -> io::Result<()> {
    // Existing ancestors keep their modes; only missing ones are created.
    if let Some(parent) = path.parent() {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(PARENT_DIR_MODE);
        }
        builder.create(parent)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode & 0o7777).custom_flags(libc::O_NOFOLLOW);
    }
    let mut file = options.open(path)?;

    if let Err(e) = io::copy(contents, &mut file) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(e);
    }

    set_mode(path, mode)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
