use discord_installer::commands::install::Installer;
use discord_installer::core::config::InstallerConfig;
use discord_installer::core::download::{Fetch, HttpFetcher};
use discord_installer::error::{DownloadError, InstallError};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;
use tar::{EntryType, Header};
use tempfile::TempDir;

enum Reply {
    Redirect(&'static str),
    Body(u16, Vec<u8>),
    Stall(Duration),
}

/// Serves one canned reply per accepted connection, in order.
fn serve(replies: Vec<Reply>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    thread::spawn(move || {
        for reply in replies {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            respond(stream, reply);
        }
    });

    base
}

fn respond(mut stream: TcpStream, reply: Reply) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut line = String::new();
    while reader.read_line(&mut line).unwrap_or(0) > 0 {
        if line == "\r\n" {
            break;
        }
        line.clear();
    }

    match reply {
        Reply::Redirect(location) => {
            let _ = write!(
                stream,
                "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            );
        }
        Reply::Body(status, body) => {
            let _ = write!(
                stream,
                "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(&body);
        }
        Reply::Stall(duration) => thread::sleep(duration),
    }
}

fn tarball() -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

    let mut dir = Header::new_gnu();
    dir.set_entry_type(EntryType::Directory);
    dir.set_mode(0o755);
    dir.set_size(0);
    builder
        .append_data(&mut dir, "Discord/", std::io::empty())
        .unwrap();

    let payload = vec![0x42u8; 300_000];
    let mut exe = Header::new_gnu();
    exe.set_entry_type(EntryType::Regular);
    exe.set_mode(0o755);
    exe.set_size(payload.len() as u64);
    builder
        .append_data(&mut exe, "Discord/Discord", payload.as_slice())
        .unwrap();

    builder.into_inner().unwrap().finish().unwrap()
}

fn fetcher(timeout: Duration) -> HttpFetcher {
    HttpFetcher::new(Some(Duration::from_secs(5)), Some(timeout)).unwrap()
}

#[test]
fn http_fetcher_follows_redirects() {
    let body = tarball();
    let base = serve(vec![
        Reply::Redirect("/files/discord.tar.gz"),
        Reply::Body(200, body.clone()),
    ]);
    let fetcher = fetcher(Duration::from_secs(10));

    let mut sink = Vec::new();
    let copied = fetcher
        .fetch(&format!("{base}/api/download"), &mut sink)
        .unwrap();

    assert_eq!(copied, body.len() as u64);
    assert_eq!(sink, body);
}

#[test]
fn http_fetcher_rejects_error_status() {
    let base = serve(vec![Reply::Body(404, b"not found".to_vec())]);
    let fetcher = fetcher(Duration::from_secs(10));

    let err = fetcher
        .fetch(&format!("{base}/missing"), &mut Vec::new())
        .unwrap_err();

    assert!(matches!(err, DownloadError::Status { status: 404, .. }));
}

#[test]
fn stalled_server_times_out() {
    let base = serve(vec![Reply::Stall(Duration::from_secs(5))]);
    let fetcher = fetcher(Duration::from_millis(500));

    let err = fetcher
        .fetch(&format!("{base}/slow"), &mut Vec::new())
        .unwrap_err();

    assert!(matches!(err, DownloadError::Timeout { .. }));
    assert_eq!(InstallError::from(err).exit_code(), 6);
}

#[test]
fn installs_from_http_twice() {
    let body = tarball();
    let base = serve(vec![
        Reply::Body(200, body.clone()),
        Reply::Body(200, body.clone()),
    ]);
    let temp = TempDir::new().unwrap();
    let home = temp.path().join("home");
    std::fs::create_dir(&home).unwrap();

    let config = InstallerConfig {
        download_url: format!("{base}/discord.tar.gz"),
        home_dir: Some(home.clone()),
        staging_path: temp.path().join("discord.tar.gz"),
        timeout_secs: 10,
        ..InstallerConfig::default()
    };
    let installer = Installer::new(config, fetcher(Duration::from_secs(10)));

    let first = installer.run().unwrap();
    let first_contents = std::fs::read(home.join("Discord/Discord")).unwrap();
    let second = installer.run().unwrap();

    assert_eq!(first.install_dir, second.install_dir);
    assert_eq!(second.downloaded_bytes, body.len() as u64);
    assert_eq!(std::fs::read(home.join("Discord/Discord")).unwrap(), first_contents);
    assert!(home.join("Desktop/discord.desktop").is_file());
}
