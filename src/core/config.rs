use crate::core::launcher::LauncherDescriptor;
use crate::error::{InstallError, Result};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DOWNLOAD_URL: &str =
    "https://discord.com/api/download?platform=linux&format=tar.gz";
pub const DEFAULT_STAGING_PATH: &str = "/var/tmp/discord.tar.gz";

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerConfig {
    /// Canonical install directory name under the home directory.
    pub app_name: String,
    /// Case-insensitive fragment identifying the extracted directory.
    pub name_hint: String,
    pub download_url: String,
    pub staging_path: PathBuf,
    /// Overrides the invoking user's home directory.
    pub home_dir: Option<PathBuf>,
    /// Executable file name inside the install directory.
    pub executable: String,
    pub icon: String,
    pub comment: String,
    pub categories: Vec<String>,
    /// Deadline for establishing the connection; 0 disables it.
    pub connect_timeout_secs: u64,
    /// Deadline for the whole download, body included; 0 disables it.
    pub timeout_secs: u64,
    pub launchers: bool,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        InstallerConfig {
            app_name: "Discord".to_string(),
            name_hint: "discord".to_string(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
            staging_path: PathBuf::from(DEFAULT_STAGING_PATH),
            home_dir: None,
            executable: "Discord".to_string(),
            icon: "discord.png".to_string(),
            comment: "Discord Chat Client".to_string(),
            categories: vec!["Network".to_string(), "Chat".to_string()],
            connect_timeout_secs: 30,
            timeout_secs: 3600,
            launchers: true,
        }
    }
}

impl InstallerConfig {
    /// Reads a TOML file; keys it omits keep their defaults. The result is
    /// not validated, since command-line overrides may still apply.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            InstallError::config_error(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| InstallError::config_error(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let mut components = Path::new(&self.app_name).components();
        let single_name = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single_name || self.app_name.contains('\\') {
            return Err(InstallError::config_error(format!(
                "app_name '{}' must be a single path component",
                self.app_name
            )));
        }
        if self.name_hint.is_empty() {
            return Err(InstallError::config_error("name_hint must not be empty"));
        }
        if self.download_url.is_empty() {
            return Err(InstallError::config_error("download_url must not be empty"));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Explicit `home_dir` first, then the platform's notion of home.
    pub fn resolve_home(&self) -> Result<PathBuf> {
        self.home_dir
            .clone()
            .or_else(dirs::home_dir)
            .ok_or(InstallError::HomeResolutionFailed)
    }

    pub fn install_target(&self, home: &Path) -> PathBuf {
        home.join(&self.app_name)
    }

    pub fn executable_path(&self, home: &Path) -> PathBuf {
        self.install_target(home).join(&self.executable)
    }

    pub fn launcher_paths(&self, home: &Path) -> Vec<PathBuf> {
        let file_name = format!("{}.desktop", self.app_name.to_lowercase());
        vec![
            home.join("Desktop").join(&file_name),
            home.join(".local")
                .join("share")
                .join("applications")
                .join(&file_name),
        ]
    }

    pub fn launcher_descriptor(&self, home: &Path) -> LauncherDescriptor {
        LauncherDescriptor {
            name: self.app_name.clone(),
            comment: self.comment.clone(),
            exec: self.executable_path(home),
            icon: self.install_target(home).join(&self.icon),
            terminal: false,
            categories: self.categories.clone(),
        }
    }
}
