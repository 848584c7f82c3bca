// thin-net/src/repository.rs
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use reqwest::blocking::Client;
use thin_common::config::Config;
use thin_common::error::{Result, ThinError};
use thin_common::fetch::ArtifactFetcher;
use thin_common::model::Coordinate;
use tracing::{debug, warn};
use url::Url;

use crate::http::{build_http_client, commit, download_to, fetch_text, temp_path_for};
use crate::validation::{parse_checksum_sidecar, validate_repository_url, verify_checksum};

/// A local Maven-layout directory filled on demand from remote repositories.
pub struct MavenRepository {
    local: PathBuf,
    remotes: Vec<Url>,
    offline: bool,
    client: Client,
    in_flight: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl MavenRepository {
    pub fn new(local: impl Into<PathBuf>, remotes: Vec<Url>, offline: bool) -> Result<Self> {
        for remote in &remotes {
            validate_repository_url(remote)?;
        }
        Ok(Self {
            local: local.into(),
            remotes,
            offline,
            client: build_http_client()?,
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.repository_dir(),
            config.repositories.clone(),
            config.offline,
        )
    }

    /// One lock per target file so concurrent resolutions download it once.
    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        match self.in_flight.lock() {
            Ok(mut locks) => Arc::clone(locks.entry(path.to_path_buf()).or_default()),
            Err(_) => Arc::new(Mutex::new(())),
        }
    }

    /// Forgets the lock of `path` once no other fetch is waiting on it.
    fn release(&self, path: &Path, lock: Arc<Mutex<()>>) {
        if let Ok(mut locks) = self.in_flight.lock() {
            // the map and `lock` are the only holders
            if Arc::strong_count(&lock) <= 2 {
                locks.remove(path);
            }
        }
    }

    #[cfg(test)]
    fn pending_locks(&self) -> usize {
        self.in_flight.lock().map(|locks| locks.len()).unwrap_or_default()
    }

    fn fetch_locked(
        &self,
        coordinate: &Coordinate,
        relative: &Path,
        target: &Path,
        lock: &Mutex<()>,
    ) -> Result<PathBuf> {
        let _guard = lock.lock().map_err(|_| {
            ThinError::resolution(coordinate.to_string(), "download lock poisoned")
        })?;
        if target.is_file() {
            return Ok(target.to_path_buf());
        }
        let url_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        self.download(coordinate, &url_path, target)?;
        debug!("Fetched {} to {}", coordinate, target.display());
        Ok(target.to_path_buf())
    }

    fn download(&self, coordinate: &Coordinate, relative: &str, target: &Path) -> Result<()> {
        let temp_path = temp_path_for(target);
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut failures = Vec::new();
        for remote in &self.remotes {
            let url = remote.join(relative)?;
            debug!("Attempting download of {} from {}", coordinate, url);
            match download_to(&self.client, &url, &temp_path) {
                Ok(true) => {
                    if let Err(e) = self.verify_sidecar(&url, &temp_path) {
                        let _ = fs::remove_file(&temp_path);
                        return Err(e);
                    }
                    return commit(&temp_path, target);
                }
                Ok(false) => debug!("{} not found at {}", coordinate, remote),
                Err(e) => {
                    warn!("Download attempt failed from {}: {}", url, e);
                    failures.push(e.to_string());
                }
            }
        }
        let _ = fs::remove_file(&temp_path);
        let reason = if failures.is_empty() {
            format!(
                "not found in {}",
                self.remotes
                    .iter()
                    .map(Url::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        } else {
            failures.join("; ")
        };
        Err(ThinError::resolution(coordinate.to_string(), reason))
    }

    fn verify_sidecar(&self, url: &Url, downloaded: &Path) -> Result<()> {
        let sidecar = Url::parse(&format!("{url}.sha256"))?;
        match fetch_text(&self.client, &sidecar).as_deref().and_then(parse_checksum_sidecar) {
            Some(expected) => verify_checksum(downloaded, &expected),
            None => {
                debug!("No usable checksum at {}, skipping verification", sidecar);
                Ok(())
            }
        }
    }
}

impl ArtifactFetcher for MavenRepository {
    fn fetch(&self, coordinate: &Coordinate) -> Result<PathBuf> {
        let relative = coordinate
            .repository_path()
            .ok_or_else(|| ThinError::resolution(coordinate.to_string(), "no version"))?;
        let target = self.local.join(&relative);
        if target.is_file() {
            debug!("Using {} from {}", coordinate, target.display());
            return Ok(target);
        }
        if self.offline {
            return Err(ThinError::resolution(
                coordinate.to_string(),
                format!("not in {} and offline", self.local.display()),
            ));
        }

        let lock = self.lock_for(&target);
        let fetched = self.fetch_locked(coordinate, &relative, &target, &lock);
        self.release(&target, lock);
        fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_with(relative: &str, content: &str) -> tempfile::TempDir {
        let remote = tempfile::tempdir().unwrap();
        let path = remote.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        remote
    }

    fn url_of(dir: &Path) -> Url {
        Url::from_directory_path(dir).unwrap()
    }

    #[test]
    fn fetches_from_remote_into_local_layout() {
        let remote = remote_with("org/acme/lib/1.0/lib-1.0.jar", "jar");
        let local = tempfile::tempdir().unwrap();
        let repo = MavenRepository::new(local.path(), vec![url_of(remote.path())], false).unwrap();
        let coordinate = Coordinate::parse("org.acme:lib:1.0").unwrap();

        let path = repo.fetch(&coordinate).unwrap();
        assert_eq!(path, local.path().join("org/acme/lib/1.0/lib-1.0.jar"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "jar");
        assert!(!temp_path_for(&path).exists());
        assert_eq!(repo.pending_locks(), 0);

        // served locally now, even offline
        let offline = MavenRepository::new(local.path(), Vec::new(), true).unwrap();
        assert_eq!(offline.fetch(&coordinate).unwrap(), path);
    }

    #[test]
    fn missing_artifacts_are_resolution_failures() {
        let remote = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        let repo = MavenRepository::new(local.path(), vec![url_of(remote.path())], false).unwrap();
        let err = repo.fetch(&Coordinate::parse("org.acme:nope:1.0").unwrap()).unwrap_err();
        assert!(matches!(err, ThinError::ArtifactResolutionFailure { .. }));
        assert_eq!(repo.pending_locks(), 0);

        let offline = MavenRepository::new(local.path(), vec![url_of(remote.path())], true).unwrap();
        let err = offline.fetch(&Coordinate::parse("org.acme:nope:1.0").unwrap()).unwrap_err();
        assert!(err.to_string().contains("offline"), "{err}");
    }

    #[test]
    fn bad_sidecar_checksum_rejects_the_download() {
        let remote = remote_with("g/a/1/a-1.jar", "hello");
        fs::write(remote.path().join("g/a/1/a-1.jar.sha256"), "0".repeat(64)).unwrap();
        let local = tempfile::tempdir().unwrap();
        let repo = MavenRepository::new(local.path(), vec![url_of(remote.path())], false).unwrap();
        let err = repo.fetch(&Coordinate::parse("g:a:1").unwrap()).unwrap_err();
        assert!(matches!(err, ThinError::ChecksumMismatch(_)));
        assert!(!local.path().join("g/a/1/a-1.jar").exists());

        fs::write(
            remote.path().join("g/a/1/a-1.jar.sha256"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824  a-1.jar\n",
        )
        .unwrap();
        assert!(repo.fetch(&Coordinate::parse("g:a:1").unwrap()).is_ok());
    }
}
