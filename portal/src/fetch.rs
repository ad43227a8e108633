//! HTTP retrieval.

use crate::PortalError;
use log::{debug, info, warn};
use reqwest::{
    blocking::{Client, ClientBuilder},
    header::CONTENT_DISPOSITION,
    StatusCode,
};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, ErrorKind, IntoInnerError, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use zip::ZipArchive;

/// Time allowed to establish a connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for a whole `HEAD` request.
const HEAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Detects peers that vanish during long transfers.
const KEEPALIVE: Duration = Duration::from_secs(30);

/// Source of remote files.
pub trait Fetch: Sync {
    /// Streams the body of `url` into `out`, returning its size in
    /// bytes.
    fn get(&self, url: &str, out: &mut dyn Write) -> Result<u64, PortalError>;

    /// Returns the `Content-Disposition` header of `url` without
    /// downloading the body.
    ///
    /// `Ok(None)` if nothing is served at `url`.
    fn content_disposition(&self, url: &str) -> Result<Option<String>, PortalError>;
}

pub struct HttpFetcher {
    client: Client,
    head_timeout: Duration,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, PortalError> {
        Self::with_timeouts(CONNECT_TIMEOUT, HEAD_TIMEOUT)
    }

    /// Downloads are only bounded by `connect`; orthophoto archives run
    /// to hundreds of megabytes. `HEAD` requests are bounded by `head` as a
    /// whole.
    pub fn with_timeouts(connect: Duration, head: Duration) -> Result<Self, PortalError> {
        Ok(Self {
            client: client_builder(connect).build()?,
            head_timeout: head,
        })
    }
}

fn client_builder(connect: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(connect)
        .timeout(None)
        .tcp_keepalive(KEEPALIVE)
        .user_agent(concat!("thdl/", env!("CARGO_PKG_VERSION")))
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str, out: &mut dyn Write) -> Result<u64, PortalError> {
        debug!("GET {url}");
        let mut response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.copy_to(out)?)
    }

    fn content_disposition(&self, url: &str) -> Result<Option<String>, PortalError> {
        let response = self.client.head(url).timeout(self.head_timeout).send()?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(response
                .headers()
                .get(CONTENT_DISPOSITION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)),
            status => Err(PortalError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

/// Outcome of [`download_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Downloaded {
    /// The file was already present and left alone.
    Cached,

    /// The file was fetched; holds its size in bytes.
    Fetched(u64),
}

/// Downloads the ZIP archive at `url` to `dest` unless `dest` already
/// exists.
///
/// The body is streamed next to `dest` and only renamed into place once
/// it reads as a ZIP archive. An interrupted transfer or an error page
/// served with a success status therefore never lands under the final
/// name, and the next run fetches it again.
pub fn download_to(fetch: &dyn Fetch, url: &str, dest: &Path) -> Result<Downloaded, PortalError> {
    if dest.exists() {
        debug!("{dest:?} already downloaded");
        return Ok(Downloaded::Cached);
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(dest);
    match fetch_archive(fetch, url, &tmp) {
        Ok(size) => {
            fs::rename(tmp, dest)?;
            info!("downloaded {dest:?} ({size} bytes)");
            Ok(Downloaded::Fetched(size))
        }
        Err(e) => {
            match fs::remove_file(&tmp) {
                Err(rm_err) if rm_err.kind() != ErrorKind::NotFound => {
                    warn!("leaving {tmp:?} behind: {rm_err}");
                }
                _ => (),
            }
            Err(e)
        }
    }
}

fn fetch_archive(fetch: &dyn Fetch, url: &str, tmp: &Path) -> Result<u64, PortalError> {
    let mut wtr = BufWriter::new(File::create(tmp)?);
    let size = fetch.get(url, &mut wtr)?;
    wtr.into_inner().map_err(IntoInnerError::into_error)?.sync_all()?;
    ZipArchive::new(BufReader::new(File::open(tmp)?))?;
    Ok(size)
}

/// Returns `path` with `.tmp` appended to its file name.
pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::{client_builder, download_to, tmp_path, Downloaded, Fetch, HttpFetcher};
    use crate::PortalError;
    use std::{
        io::{Cursor, Read, Write},
        net::TcpListener,
        path::Path,
        sync::Mutex,
        thread,
        time::Duration,
    };
    use zip::{write::FileOptions, ZipWriter};

    fn zip_bytes() -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("632_5650.xyz", FileOptions::default()).unwrap();
        zip.write_all(b"632000 5650000 301.5\n").unwrap();
        zip.finish().unwrap().into_inner()
    }

    enum Serve {
        Body(Vec<u8>),
        Status(u16),
        /// Writes part of the body, then the connection drops.
        Truncated(Vec<u8>),
    }

    struct Fake {
        calls: Mutex<usize>,
        serve: Mutex<Serve>,
    }

    impl Fake {
        fn new(serve: Serve) -> Self {
            Self {
                calls: Mutex::new(0),
                serve: Mutex::new(serve),
            }
        }
    }

    impl Fetch for Fake {
        fn get(&self, url: &str, out: &mut dyn Write) -> Result<u64, PortalError> {
            *self.calls.lock().unwrap() += 1;
            match &*self.serve.lock().unwrap() {
                Serve::Body(body) => {
                    out.write_all(body)?;
                    Ok(body.len() as u64)
                }
                Serve::Status(status) => Err(PortalError::Status {
                    url: url.to_string(),
                    status: *status,
                }),
                Serve::Truncated(body) => {
                    out.write_all(&body[..body.len() / 2])?;
                    Err(std::io::Error::from(std::io::ErrorKind::ConnectionReset).into())
                }
            }
        }

        fn content_disposition(&self, _url: &str) -> Result<Option<String>, PortalError> {
            Ok(None)
        }
    }

    #[test]
    fn test_skip_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("dem").join("632_5650.zip");
        let body = zip_bytes();
        let fetch = Fake::new(Serve::Body(body.clone()));
        assert_eq!(
            download_to(&fetch, "http://x/a.zip", &dest).unwrap(),
            Downloaded::Fetched(body.len() as u64)
        );
        assert_eq!(
            download_to(&fetch, "http://x/a.zip", &dest).unwrap(),
            Downloaded::Cached
        );
        assert_eq!(*fetch.calls.lock().unwrap(), 1);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert!(!tmp_path(&dest).exists());
    }

    #[test]
    fn test_failure_leaves_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("4521.zip");

        let fetch = Fake::new(Serve::Status(503));
        assert!(download_to(&fetch, "http://x/4521.zip", &dest).is_err());
        assert!(!dest.exists());
        assert!(!tmp_path(&dest).exists());

        let fetch = Fake::new(Serve::Truncated(zip_bytes()));
        assert!(matches!(
            download_to(&fetch, "http://x/4521.zip", &dest),
            Err(PortalError::Io(_))
        ));
        assert!(!dest.exists());
        assert!(!tmp_path(&dest).exists());
    }

    #[test]
    fn test_rejects_non_archive_body() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("4521.zip");
        let fetch = Fake::new(Serve::Body(b"<html>Zu viele Anfragen</html>".to_vec()));
        assert!(matches!(
            download_to(&fetch, "http://x/4521.zip", &dest),
            Err(PortalError::Zip(_))
        ));
        assert!(!dest.exists());
        assert!(!tmp_path(&dest).exists());

        // Not cached, so the next attempt downloads again.
        *fetch.serve.lock().unwrap() = Serve::Body(zip_bytes());
        assert!(matches!(
            download_to(&fetch, "http://x/4521.zip", &dest).unwrap(),
            Downloaded::Fetched(_)
        ));
        assert_eq!(*fetch.calls.lock().unwrap(), 2);
        assert!(dest.exists());
    }

    #[test]
    fn test_slow_body_outlasts_timeouts() {
        let body: Vec<u8> = (0..128 * 1024).map(|i| (i % 251) as u8).collect();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let served = body.clone();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
            }
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                served.len()
            )
            .unwrap();
            let (head, tail) = served.split_at(served.len() / 2);
            stream.write_all(head).unwrap();
            stream.flush().unwrap();
            thread::sleep(Duration::from_millis(1500));
            stream.write_all(tail).unwrap();
        });

        let fetch = HttpFetcher {
            client: client_builder(Duration::from_secs(1))
                .no_proxy()
                .build()
                .unwrap(),
            head_timeout: Duration::from_secs(1),
        };
        let mut out = Vec::new();
        let size = fetch
            .get(&format!("http://{addr}/4521.zip"), &mut out)
            .unwrap();
        server.join().unwrap();
        assert_eq!(size, body.len() as u64);
        assert_eq!(out, body);
    }

    #[test]
    fn test_tmp_path() {
        assert_eq!(
            tmp_path(Path::new("/d/op/4521.zip")),
            Path::new("/d/op/4521.zip.tmp")
        );
    }
}
