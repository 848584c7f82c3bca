// thin-common/src/model/artifact.rs
use std::fmt;
use std::path::{Path, PathBuf};

use super::coordinate::{Coordinate, IdentityKey};
use super::dependency::Scope;

/// A coordinate with a concrete version and the local file it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub coordinate: Coordinate,
    pub path: PathBuf,
    pub scope: Scope,
}

impl ResolvedArtifact {
    pub fn new(coordinate: Coordinate, path: impl Into<PathBuf>) -> Self {
        Self {
            coordinate,
            path: path.into(),
            scope: Scope::Compile,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn key(&self) -> IdentityKey {
        self.coordinate.identity_key()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ResolvedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.coordinate, self.path.display())
    }
}
