use clap::Parser;
use std::path::PathBuf;

use discord_installer::commands::install::Installer;
use discord_installer::core::{config::InstallerConfig, download::HttpFetcher};
use discord_installer::error::{InstallError, Result};

#[derive(Parser)]
#[clap(name = "discord-installer")]
#[clap(about = "Download and install Discord into your home directory")]
#[clap(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// TOML file with installer settings
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Tarball URL to download
    #[clap(long)]
    url: Option<String>,
    /// Home directory to install into (default: current user's home)
    #[clap(long)]
    home: Option<PathBuf>,
    /// Where the downloaded archive is staged
    #[clap(long)]
    staging: Option<PathBuf>,
    /// Connection timeout in seconds, 0 to wait forever
    #[clap(long)]
    connect_timeout: Option<u64>,
    /// Whole-download timeout in seconds, 0 to wait forever
    #[clap(long)]
    timeout: Option<u64>,
    /// Install directory name under the home directory
    #[clap(long)]
    app_name: Option<String>,
    /// Name fragment used to find the extracted directory
    #[clap(long)]
    hint: Option<String>,
    /// Do not create desktop and menu entries
    #[clap(long)]
    no_launchers: bool,
    /// Show debug output
    #[clap(short, long)]
    verbose: bool,
}

fn build_config(cli: &Cli) -> Result<InstallerConfig> {
    let mut config = match &cli.config {
        Some(path) => InstallerConfig::load(path)?,
        None => InstallerConfig::default(),
    };

    if let Some(url) = &cli.url {
        config.download_url = url.clone();
    }
    if let Some(home) = &cli.home {
        config.home_dir = Some(home.clone());
    }
    if let Some(staging) = &cli.staging {
        config.staging_path = staging.clone();
    }
    if let Some(connect_timeout) = cli.connect_timeout {
        config.connect_timeout_secs = connect_timeout;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(app_name) = &cli.app_name {
        config.app_name = app_name.clone();
    }
    if let Some(hint) = &cli.hint {
        config.name_hint = hint.clone();
    }
    if cli.no_launchers {
        config.launchers = false;
    }

    config.validate()?;
    Ok(config)
}

fn exit_with(error: InstallError) -> ! {
    eprintln!("Error during {}: {error}", error.stage());
    std::process::exit(error.exit_code());
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => exit_with(e),
    };

    let fetcher = match HttpFetcher::new(config.connect_timeout(), config.timeout()) {
        Ok(fetcher) => fetcher,
        Err(e) => exit_with(e.into()),
    };

    match Installer::new(config, fetcher).run() {
        Ok(report) => log::debug!("{report:?}"),
        Err(e) => exit_with(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "discord-installer",
            "--home",
            "/home/me",
            "--timeout",
            "0",
            "--no-launchers",
        ]);

        let config = build_config(&cli).unwrap();

        assert_eq!(config.home_dir, Some(PathBuf::from("/home/me")));
        assert_eq!(config.timeout(), None);
        assert!(!config.launchers);
    }

    #[test]
    fn test_invalid_app_name_reports_once() {
        let cli = Cli::parse_from(["discord-installer", "--app-name", "."]);

        let err = build_config(&cli).unwrap_err();

        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            format!("Error during {}: {err}", err.stage()),
            "Error during configuration: app_name '.' must be a single path component"
        );
    }
}
