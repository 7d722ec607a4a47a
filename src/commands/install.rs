use crate::core::{
    config::InstallerConfig,
    download::{download_to_file, Fetch},
    extract::{extract_tar_gz, ExtractSummary},
    launcher::{register, LauncherDescriptor, Registration},
    locate::{locate_and_relocate, verify_executable},
};
use crate::error::{ExtractError, InstallError, LocateError, RegisterError, Result};
use crate::utils::fs;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Outcome of a successful run.
#[derive(Debug)]
pub struct InstallReport {
    pub install_dir: PathBuf,
    pub executable: PathBuf,
    pub downloaded_bytes: u64,
    pub extracted: ExtractSummary,
    pub launchers: Vec<(PathBuf, Registration)>,
}

/// The filesystem stages that follow the download.
pub trait InstallSteps {
    fn extract(
        &self,
        archive: &Path,
        destination: &Path,
    ) -> std::result::Result<ExtractSummary, ExtractError>;

    fn locate(
        &self,
        search_root: &Path,
        name_hint: &str,
        target: &Path,
    ) -> std::result::Result<PathBuf, LocateError>;

    fn register(
        &self,
        descriptor: &LauncherDescriptor,
        targets: &[PathBuf],
    ) -> std::result::Result<Vec<(PathBuf, Registration)>, RegisterError>;
}

/// Steps backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSteps;

impl InstallSteps for LocalSteps {
    fn extract(
        &self,
        archive: &Path,
        destination: &Path,
    ) -> std::result::Result<ExtractSummary, ExtractError> {
        extract_tar_gz(archive, destination)
    }

    fn locate(
        &self,
        search_root: &Path,
        name_hint: &str,
        target: &Path,
    ) -> std::result::Result<PathBuf, LocateError> {
        locate_and_relocate(search_root, name_hint, target)
    }

    fn register(
        &self,
        descriptor: &LauncherDescriptor,
        targets: &[PathBuf],
    ) -> std::result::Result<Vec<(PathBuf, Registration)>, RegisterError> {
        register(descriptor, targets)
    }
}

/// Runs the install pipeline:
/// resolve home, clear prior install, download, extract, locate and rename,
/// register launchers. The first failing stage ends the run; completed
/// stages are not rolled back.
pub struct Installer<F: Fetch, S: InstallSteps = LocalSteps> {
    config: InstallerConfig,
    fetcher: F,
    steps: S,
}

impl<F: Fetch> Installer<F, LocalSteps> {
    pub fn new(config: InstallerConfig, fetcher: F) -> Self {
        Self::with_steps(config, fetcher, LocalSteps)
    }
}

impl<F: Fetch, S: InstallSteps> Installer<F, S> {
    pub fn with_steps(config: InstallerConfig, fetcher: F, steps: S) -> Self {
        Self {
            config,
            fetcher,
            steps,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn steps(&self) -> &S {
        &self.steps
    }

    pub fn run(&self) -> Result<InstallReport> {
        let config = &self.config;
        let home = config.resolve_home()?;
        let target = config.install_target(&home);
        log::debug!("Home directory: {}", home.display());
        ensure_child_of_home(&home, &target)?;

        println!("=== {} Installer ===", config.app_name);

        if target.exists() {
            println!(
                "Removing existing {} folder at {}",
                config.app_name,
                target.display()
            );
        }
        fs::remove_path_if_exists(&target)?;

        println!("Step 1: Downloading {}", config.download_url);
        let progress = download_spinner();
        let downloaded = download_to_file(
            &self.fetcher,
            &config.download_url,
            &config.staging_path,
            |written| progress.set_position(written),
        );
        progress.finish_and_clear();
        let downloaded_bytes = downloaded?;
        println!("Download complete ({downloaded_bytes} bytes).");

        println!(
            "Step 2: Extracting {} into {}",
            config.staging_path.display(),
            home.display()
        );
        let extracted = self.steps.extract(&config.staging_path, &home)?;
        println!(
            "Extraction complete ({} files, {} directories, {} skipped).",
            extracted.files, extracted.directories, extracted.skipped
        );

        let install_dir = self.steps.locate(&home, &config.name_hint, &target)?;
        let executable = config.executable_path(&home);
        verify_executable(&executable)?;
        if !fs::is_executable(&executable) {
            log::warn!("{} is not marked executable", executable.display());
        }

        let launchers = if config.launchers {
            println!("Step 3: Creating desktop and menu entries");
            self.steps.register(
                &config.launcher_descriptor(&home),
                &config.launcher_paths(&home),
            )?
        } else {
            log::info!("Launcher registration disabled");
            Vec::new()
        };

        println!("Installation complete!");
        println!("   {} installed at {}", config.app_name, install_dir.display());

        Ok(InstallReport {
            install_dir,
            executable,
            downloaded_bytes,
            extracted,
            launchers,
        })
    }
}

/// The prior install is removed recursively, so the target must be exactly
/// one plain component below the home directory.
fn ensure_child_of_home(home: &Path, target: &Path) -> Result<()> {
    let is_child = target.strip_prefix(home).is_ok_and(|rest| {
        let mut components = rest.components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
    });

    if is_child {
        Ok(())
    } else {
        Err(InstallError::config_error(format!(
            "install target {} is not a directory inside {}",
            target.display(),
            home.display()
        )))
    }
}

fn download_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} Downloading... {bytes} ({bytes_per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
