use crate::error::RegisterError;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A freedesktop.org desktop entry describing how to launch the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherDescriptor {
    pub name: String,
    pub comment: String,
    pub exec: PathBuf,
    pub icon: PathBuf,
    pub terminal: bool,
    pub categories: Vec<String>,
}

impl LauncherDescriptor {
    pub fn render(&self) -> String {
        let categories: String = self
            .categories
            .iter()
            .map(|c| format!("{c};"))
            .collect();

        format!(
            r#"[Desktop Entry]
Version=1.0
Type=Application
Name={}
Comment={}
Exec={}
Icon={}
Terminal={}
Categories={}
"#,
            self.name,
            self.comment,
            self.exec.display(),
            self.icon.display(),
            self.terminal,
            categories
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created,
    AlreadyPresent,
}

/// Writes `descriptor` to every path in `targets` that does not exist yet.
///
/// Existing files are never touched. Every target is attempted even after a
/// failure; the first failure is returned once all have been tried.
pub fn register(
    descriptor: &LauncherDescriptor,
    targets: &[PathBuf],
) -> Result<Vec<(PathBuf, Registration)>, RegisterError> {
    let content = descriptor.render();
    let mut outcomes = Vec::with_capacity(targets.len());
    let mut first_error = None;

    for target in targets {
        match write_if_absent(target, &content) {
            Ok(Registration::Created) => {
                println!("Creating desktop entry at {}", target.display());
                outcomes.push((target.clone(), Registration::Created));
            }
            Ok(Registration::AlreadyPresent) => {
                println!("Desktop entry already exists at {}", target.display());
                outcomes.push((target.clone(), Registration::AlreadyPresent));
            }
            Err(source) => {
                log::warn!("Could not write {}: {source}", target.display());
                if first_error.is_none() {
                    first_error = Some(RegisterError::WriteFailed {
                        path: target.clone(),
                        source,
                    });
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(outcomes),
    }
}

fn write_if_absent(path: &Path, content: &str) -> io::Result<Registration> {
    if fs::symlink_metadata(path).is_ok() {
        return Ok(Registration::AlreadyPresent);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o755);
    }

    let mut file = match options.open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Ok(Registration::AlreadyPresent)
        }
        Err(e) => return Err(e),
    };
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    Ok(Registration::Created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn descriptor() -> LauncherDescriptor {
        LauncherDescriptor {
            name: "Discord".to_string(),
            comment: "Discord Chat Client".to_string(),
            exec: PathBuf::from("/home/me/Discord/Discord"),
            icon: PathBuf::from("/home/me/Discord/discord.png"),
            terminal: false,
            categories: vec!["Network".to_string(), "Chat".to_string()],
        }
    }

    #[test]
    fn test_render_desktop_entry() {
        assert_eq!(
            descriptor().render(),
            "[Desktop Entry]\n\
             Version=1.0\n\
             Type=Application\n\
             Name=Discord\n\
             Comment=Discord Chat Client\n\
             Exec=/home/me/Discord/Discord\n\
             Icon=/home/me/Discord/discord.png\n\
             Terminal=false\n\
             Categories=Network;Chat;\n"
        );
    }

    #[test]
    fn test_creates_missing_entries_with_parents() {
        let temp = TempDir::new().unwrap();
        let targets = vec![
            temp.path().join("Desktop/discord.desktop"),
            temp.path().join(".local/share/applications/discord.desktop"),
        ];

        let outcomes = register(&descriptor(), &targets).unwrap();

        assert!(outcomes.iter().all(|(_, r)| *r == Registration::Created));
        for target in &targets {
            assert_eq!(fs::read_to_string(target).unwrap(), descriptor().render());
        }
    }

    #[test]
    fn test_existing_entry_is_not_clobbered() {
        let temp = TempDir::new().unwrap();
        let existing = temp.path().join("Desktop/discord.desktop");
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, b"[Desktop Entry]\nName=My Custom Discord\n").unwrap();
        let fresh = temp.path().join("apps/discord.desktop");

        let outcomes = register(&descriptor(), &[existing.clone(), fresh.clone()]).unwrap();

        assert_eq!(
            outcomes,
            vec![
                (existing.clone(), Registration::AlreadyPresent),
                (fresh.clone(), Registration::Created),
            ]
        );
        assert_eq!(
            fs::read(&existing).unwrap(),
            b"[Desktop Entry]\nName=My Custom Discord\n"
        );
        assert!(fresh.is_file());
    }

    #[test]
    fn test_failure_does_not_stop_remaining_targets() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("Desktop");
        fs::write(&blocker, b"a file, not a directory").unwrap();
        let blocked = blocker.join("discord.desktop");
        let fresh = temp.path().join("apps/discord.desktop");

        let err = register(&descriptor(), &[blocked.clone(), fresh.clone()]).unwrap_err();

        assert!(matches!(err, RegisterError::WriteFailed { ref path, .. } if *path == blocked));
        assert!(fresh.is_file());
    }
}
