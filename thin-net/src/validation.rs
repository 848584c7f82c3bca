// thin-net/src/validation.rs
use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use thin_common::error::{Result, ThinError};
use tracing::{debug, warn};
use url::Url;

pub fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    debug!("Verifying checksum for: {}", path.display());
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let bytes_copied = io::copy(&mut file, &mut hasher)?;
    let actual = hex::encode(hasher.finalize());
    debug!("Calculated SHA256: {} ({} bytes read)", actual, bytes_copied);
    debug!("Expected SHA256:   {}", expected);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ThinError::ChecksumMismatch(format!(
            "{}: expected {}, got {}",
            path.display(),
            expected,
            actual
        )))
    }
}

/// First token of a `.sha256` sidecar when it looks like a SHA-256 digest.
///
/// Sidecars are either the bare digest or `<digest>  <file name>`.
pub fn parse_checksum_sidecar(text: &str) -> Option<String> {
    let token = text.split_whitespace().next()?;
    (token.len() == 64 && token.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| token.to_ascii_lowercase())
}

/// Repositories must be `https` or local `file` URLs; plain `http` is allowed with a warning.
pub fn validate_repository_url(url: &Url) -> Result<()> {
    match url.scheme() {
        "https" | "file" => Ok(()),
        "http" => {
            warn!("Repository {} is not using https", url);
            Ok(())
        }
        other => Err(ThinError::ValidationError(format!(
            "Invalid repository URL scheme for '{url}': must be https or file, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn checksum_matches_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jar");
        fs::write(&path, "hello").unwrap();
        let digest = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        verify_checksum(&path, digest).unwrap();
        verify_checksum(&path, &digest.to_ascii_uppercase()).unwrap();
        assert!(matches!(
            verify_checksum(&path, &"0".repeat(64)).unwrap_err(),
            ThinError::ChecksumMismatch(_)
        ));
    }

    #[test]
    fn sidecar_formats() {
        let digest = "2CF24DBA5FB0A30E26E83B2AC5B9E29E1B161E5C1FA7425E73043362938B9824";
        assert_eq!(
            parse_checksum_sidecar(&format!("{digest}  a.jar\n")).as_deref(),
            Some(digest.to_ascii_lowercase().as_str())
        );
        assert_eq!(parse_checksum_sidecar("<html>not found</html>"), None);
        assert_eq!(parse_checksum_sidecar(""), None);
    }

    #[test]
    fn repository_schemes() {
        assert!(validate_repository_url(&Url::parse("https://repo.example/m2/").unwrap()).is_ok());
        assert!(validate_repository_url(&Url::parse("file:///srv/m2/").unwrap()).is_ok());
        assert!(validate_repository_url(&Url::parse("ftp://repo.example/").unwrap()).is_err());
    }
}
