// thin-net/src/http.rs
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use thin_common::error::{Result, ThinError};
use tracing::{debug, warn};
use url::Url;

const DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = "thin launcher (Rust)";

pub fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| ThinError::HttpError(format!("Failed to build HTTP client: {e}")))
}

/// Temporary sibling that a download is written to before the final rename.
pub fn temp_path_for(final_path: &Path) -> PathBuf {
    let temp_filename = format!(
        ".{}.download",
        final_path.file_name().unwrap_or_default().to_string_lossy()
    );
    final_path.with_file_name(temp_filename)
}

/// Copies `url` into `target`. Returns `Ok(false)` when the server has no such file.
pub fn download_to(client: &Client, url: &Url, target: &Path) -> Result<bool> {
    if url.scheme() == "file" {
        let source = url
            .to_file_path()
            .map_err(|()| ThinError::ValidationError(format!("Not a local file URL: {url}")))?;
        if !source.is_file() {
            return Ok(false);
        }
        fs::copy(&source, target)?;
        return Ok(true);
    }

    let response = client.get(url.as_str()).send().map_err(|e| {
        debug!("HTTP request failed for {url}: {e}");
        ThinError::HttpError(format!("HTTP request failed for {url}: {e}"))
    })?;
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);
    match status {
        s if s.is_success() => {}
        StatusCode::NOT_FOUND => return Ok(false),
        StatusCode::FORBIDDEN => {
            return Err(ThinError::DownloadError(
                file_name(target),
                url.to_string(),
                "Access forbidden (403)".to_string(),
            ))
        }
        _ => {
            return Err(ThinError::HttpError(format!("HTTP error {status} for URL {url}")));
        }
    }

    let mut response = response;
    let mut file = File::create(target)?;
    let written = response
        .copy_to(&mut file)
        .map_err(|e| ThinError::HttpError(format!("Failed to read response body from {url}: {e}")))?;
    debug!("Wrote {} bytes from {} to {}", written, url, target.display());
    Ok(true)
}

/// Small text resource such as a checksum sidecar; `None` when absent or unreadable.
pub fn fetch_text(client: &Client, url: &Url) -> Option<String> {
    if url.scheme() == "file" {
        return url
            .to_file_path()
            .ok()
            .and_then(|path| fs::read_to_string(path).ok());
    }
    match client.get(url.as_str()).send() {
        Ok(response) if response.status().is_success() => response.text().ok(),
        Ok(response) => {
            debug!("No {} ({})", url, response.status());
            None
        }
        Err(e) => {
            warn!("Could not fetch {}: {}", url, e);
            None
        }
    }
}

/// Moves a finished download into place.
pub fn commit(temp_path: &Path, final_path: &Path) -> Result<()> {
    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(temp_path, final_path).map_err(|e| {
        ThinError::Io(std::sync::Arc::new(io::Error::new(
            e.kind(),
            format!(
                "Failed to move temp file {} to {}: {}",
                temp_path.display(),
                final_path.display(),
                e
            ),
        )))
    })?;
    debug!("Moved download to final location: {}", final_path.display());
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
