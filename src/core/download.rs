use crate::core::progress::CountingWriter;
use crate::error::DownloadError;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

const CHUNK_SIZE: usize = 64 * 1024;
const MAX_REDIRECTS: usize = 10;

/// Source of a remote byte stream. The whole response body is copied into
/// `sink`; the number of bytes copied is returned.
pub trait Fetch {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64, DownloadError>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Builds a fetcher. `connect_timeout` bounds connection setup and
    /// `timeout` the whole request, body included; `None` waits indefinitely.
    pub fn new(
        connect_timeout: Option<Duration>,
        timeout: Option<Duration>,
    ) -> Result<Self, DownloadError> {
        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(concat!("discord-installer/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout);
        if let Some(connect_timeout) = connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        let client = builder
            .build()
            .map_err(|source| DownloadError::Client { source })?;

        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64, DownloadError> {
        let mut response = self.client.get(url).send().map_err(|source| {
            if source.is_timeout() {
                DownloadError::Timeout {
                    url: url.to_string(),
                }
            } else {
                DownloadError::Request {
                    url: url.to_string(),
                    source,
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        log::debug!(
            "Response from {} ({} bytes announced)",
            response.url(),
            response
                .content_length()
                .map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );

        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let n = match response.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) if is_timeout(&e) => {
                    return Err(DownloadError::Timeout {
                        url: url.to_string(),
                    })
                }
                Err(source) => return Err(DownloadError::Transfer { source }),
            };
            sink.write_all(&buffer[..n])
                .map_err(|source| DownloadError::Write { source })?;
            total += n as u64;
        }

        Ok(total)
    }
}

fn is_timeout(error: &std::io::Error) -> bool {
    if error.kind() == std::io::ErrorKind::TimedOut {
        return true;
    }
    error
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
        .is_some_and(reqwest::Error::is_timeout)
}

/// Downloads `url` into `destination`, replacing any file already there.
/// `on_progress` receives the cumulative byte count after every write.
pub fn download_to_file<F>(
    fetcher: &dyn Fetch,
    url: &str,
    destination: &Path,
    on_progress: F,
) -> Result<u64, DownloadError>
where
    F: FnMut(u64),
{
    let staging_error = |source: std::io::Error| DownloadError::Staging {
        path: destination.to_path_buf(),
        source,
    };

    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(staging_error)?;
        }
    }
    let file = File::create(destination).map_err(staging_error)?;

    let mut writer = CountingWriter::new(BufWriter::new(file), on_progress);
    fetcher.fetch(url, &mut writer)?;
    writer
        .flush()
        .map_err(|source| DownloadError::Write { source })?;

    let written = writer.written();
    let file = writer
        .into_inner()
        .into_inner()
        .map_err(|e| DownloadError::Write {
            source: e.into_error(),
        })?;
    file.sync_all()
        .map_err(|source| DownloadError::Write { source })?;

    Ok(written)
}
