// thin-core/src/archive/locator.rs
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thin_common::error::{Result, ThinError};
use thin_common::model::{Coordinate, DependencyRequest, Scope};
use tracing::debug;
use url::Url;

use super::Archive;
use crate::resolve::ArtifactResolver;

const MAVEN_SCHEME: &str = "maven://";

/// Where a package lives: a local path or a repository coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveLocator {
    Path(PathBuf),
    /// `maven://group:artifact[:packaging[:classifier]]:version`
    Maven(Coordinate),
}

impl FromStr for ArchiveLocator {
    type Err = ThinError;

    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ThinError::InvalidLocator(
                text.to_string(),
                "empty locator".to_string(),
            ));
        }
        if let Some(gav) = text.strip_prefix(MAVEN_SCHEME) {
            let coordinate = Coordinate::parse(gav)
                .map_err(|e| ThinError::InvalidLocator(text.to_string(), e.to_string()))?;
            if coordinate.version().is_none() {
                return Err(ThinError::InvalidLocator(
                    text.to_string(),
                    "a version is required".to_string(),
                ));
            }
            return Ok(ArchiveLocator::Maven(coordinate));
        }
        if text.starts_with("file:") {
            let url = Url::parse(text)?;
            let path = url.to_file_path().map_err(|()| {
                ThinError::InvalidLocator(text.to_string(), "not a local file URL".to_string())
            })?;
            return Ok(ArchiveLocator::Path(path));
        }
        Ok(ArchiveLocator::Path(PathBuf::from(text)))
    }
}

impl fmt::Display for ArchiveLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveLocator::Path(path) => write!(f, "{}", path.display()),
            ArchiveLocator::Maven(coordinate) => write!(f, "{MAVEN_SCHEME}{coordinate}"),
        }
    }
}

impl ArchiveLocator {
    /// Opens the package, fetching it through `resolver` when it is a coordinate.
    pub fn open(&self, resolver: &dyn ArtifactResolver) -> Result<Archive> {
        match self {
            ArchiveLocator::Path(path) => Archive::open(path),
            ArchiveLocator::Maven(coordinate) => {
                debug!("Fetching archive {}", coordinate);
                let request = DependencyRequest::new(coordinate.clone(), Scope::Runtime).intransitive();
                let artifact = resolver
                    .resolve(&request)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| ThinError::resolution(coordinate.to_string(), "resolver returned nothing"))?;
                Archive::open(artifact.path())
            }
        }
    }
}
