// thin-common/src/fetch.rs
use std::path::PathBuf;

use crate::error::Result;
use crate::model::Coordinate;

/// Turns one fully versioned coordinate into a local file.
///
/// Implementations own their cache and any locking around it. A missing artifact is
/// reported as [`crate::ThinError::ArtifactResolutionFailure`].
pub trait ArtifactFetcher: Send + Sync {
    fn fetch(&self, coordinate: &Coordinate) -> Result<PathBuf>;
}

impl<T: ArtifactFetcher + ?Sized> ArtifactFetcher for std::sync::Arc<T> {
    fn fetch(&self, coordinate: &Coordinate) -> Result<PathBuf> {
        (**self).fetch(coordinate)
    }
}
