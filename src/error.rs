use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InstallError>;

/// Failures of the Download stage. Connection, HTTP and write errors are kept
/// apart so the entry point can tell a stalled server from a full disk.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server responded with HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Connection dropped while reading response body: {source}")]
    Transfer {
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write downloaded data: {source}")]
    Write {
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create staging file {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to open archive {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive {path} is not a valid gzip stream: {message}")]
    BadCompression { path: PathBuf, message: String },

    #[error("Archive entry '{entry}' escapes the destination directory")]
    UnsafePath { entry: String },

    #[error("Failed to extract {path}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("No directory matching '{hint}' found in {root}")]
    NotFound { root: PathBuf, hint: String },

    #[error("Failed to move {from} to {to}: {source}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Executable not found at {path}")]
    MissingExecutable { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum RegisterError {
    #[error("Failed to write launcher {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("{message}")]
    Config { message: String },

    #[error("Home directory not found")]
    HomeResolutionFailed,

    #[error("Failed to remove previous install at {path}: {source}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Register(#[from] RegisterError),
}

impl InstallError {
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        InstallError::Config {
            message: message.into(),
        }
    }

    /// Human-readable name of the pipeline stage that produced the error.
    pub fn stage(&self) -> &'static str {
        match self {
            InstallError::Config { .. } => "configuration",
            InstallError::HomeResolutionFailed => "home directory lookup",
            InstallError::CleanupFailed { .. } => "cleanup",
            InstallError::Download(_) => "download",
            InstallError::Extract(_) => "extraction",
            InstallError::Locate(_) => "install location",
            InstallError::Register(_) => "launcher registration",
        }
    }

    /// Distinct process exit code per failure kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            InstallError::Config { .. } => 2,
            InstallError::HomeResolutionFailed => 3,
            InstallError::CleanupFailed { .. } => 4,
            InstallError::Download(DownloadError::Timeout { .. }) => 6,
            InstallError::Download(_) => 5,
            InstallError::Extract(_) => 7,
            InstallError::Locate(_) => 8,
            InstallError::Register(_) => 9,
        }
    }
}
