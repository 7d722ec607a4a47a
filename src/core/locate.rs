use crate::error::LocateError;
use std::fs;
use std::path::{Path, PathBuf};

/// Finds the directory under `search_root` that holds the freshly extracted
/// application and moves it to `target`.
///
/// A child named exactly like `target` wins. Otherwise the first
/// non-hidden directory, in lexical order, whose name contains `name_hint`
/// (case-insensitive) is used. Symlinked directories are not considered.
pub fn locate_and_relocate(
    search_root: &Path,
    name_hint: &str,
    target: &Path,
) -> Result<PathBuf, LocateError> {
    let found = find_candidate(search_root, name_hint, target)?;

    if found == target {
        return Ok(found);
    }

    if fs::symlink_metadata(target).is_ok() {
        return Err(LocateError::MoveFailed {
            from: found,
            to: target.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "destination already exists",
            ),
        });
    }

    println!("Renaming {} to {}", found.display(), target.display());
    fs::rename(&found, target).map_err(|source| LocateError::MoveFailed {
        from: found.clone(),
        to: target.to_path_buf(),
        source,
    })?;

    Ok(target.to_path_buf())
}

fn find_candidate(
    search_root: &Path,
    name_hint: &str,
    target: &Path,
) -> Result<PathBuf, LocateError> {
    let not_found = || LocateError::NotFound {
        root: search_root.to_path_buf(),
        hint: name_hint.to_string(),
    };

    let is_real_dir = |path: &Path| fs::symlink_metadata(path).is_ok_and(|m| m.is_dir());

    if target.parent() == Some(search_root) && is_real_dir(target) {
        return Ok(target.to_path_buf());
    }

    let entries = fs::read_dir(search_root).map_err(|e| {
        log::warn!("Cannot list {}: {e}", search_root.display());
        not_found()
    })?;

    let hint = name_hint.to_lowercase();
    let mut candidates: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            // Symlinks are never candidates, even when they point at a directory.
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || !entry.file_type().is_ok_and(|t| t.is_dir()) {
                return None;
            }
            name.to_lowercase()
                .contains(&hint)
                .then(|| (name, entry.path()))
        })
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0));
    if candidates.len() > 1 {
        log::warn!(
            "Several directories match '{name_hint}', using {}",
            candidates[0].0
        );
    }

    candidates
        .into_iter()
        .next()
        .map(|(_, path)| path)
        .ok_or_else(not_found)
}

/// Checks that the relocated install contains the application executable.
pub fn verify_executable(executable: &Path) -> Result<(), LocateError> {
    if executable.is_file() {
        Ok(())
    } else {
        Err(LocateError::MissingExecutable {
            path: executable.to_path_buf(),
        })
    }
}
