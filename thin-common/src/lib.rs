// thin-common/src/lib.rs
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;

// Re-export key types
pub use config::Config;
pub use error::{Result, ThinError};
pub use fetch::ArtifactFetcher;
pub use model::{Coordinate, DependencyRequest, Exclusion, IdentityKey, ManagedVersions, ResolvedArtifact, Scope};
