use anyhow::{Context, Result};
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Called with `(downloaded, total)` as bytes arrive; `total` is absent
/// when the server does not announce a length.
pub type ProgressFn<'a> = dyn FnMut(u64, Option<u64>) + 'a;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub bytes: u64,
    pub sha256: String,
}

/// Fetches one URL into a local file.
pub trait Downloader {
    fn download(&self, url: &str, dest: &Path, progress: &mut ProgressFn<'_>)
        -> Result<DownloadReport>;
}

impl<T: Downloader + ?Sized> Downloader for &T {
    fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> Result<DownloadReport> {
        (**self).download(url, dest, progress)
    }
}

#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .build()
            .context("failed to build http client")?;
        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> Result<DownloadReport> {
        debug!(%url, dest = %dest.display(), "downloading archive");
        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("failed to download {url}"))?
            .error_for_status()
            .with_context(|| format!("download failed for {url}"))?;
        let total = response.content_length();

        let part_path = dest.with_file_name(format!(
            "{}.part",
            dest.file_name()
                .and_then(|v| v.to_str())
                .unwrap_or("artifact")
        ));
        let result = stream_to_file(&mut response, &part_path, total, progress);
        let report = match result {
            Ok(report) => report,
            Err(err) => {
                let _ = fs::remove_file(&part_path);
                return Err(err);
            }
        };

        fs::rename(&part_path, dest)
            .with_context(|| format!("failed to move download into {}", dest.display()))?;
        Ok(report)
    }
}

/// Copies `reader` into a new file at `path`, hashing as it goes.
pub(crate) fn stream_to_file(
    reader: &mut dyn Read,
    path: &Path,
    total: Option<u64>,
    progress: &mut ProgressFn<'_>,
) -> Result<DownloadReport> {
    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 64 * 1024];
    let mut bytes = 0_u64;

    loop {
        let read = reader
            .read(&mut buffer)
            .context("failed to read download stream")?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .with_context(|| format!("failed to write {}", path.display()))?;
        hasher.update(&buffer[..read]);
        bytes += read as u64;
        progress(bytes, total);
    }
    file.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;

    Ok(DownloadReport {
        bytes,
        sha256: hex::encode(hasher.finalize()),
    })
}
