// thin-common/src/model/mod.rs
pub mod artifact;
pub mod coordinate;
pub mod dependency;

// Re-export
pub use artifact::ResolvedArtifact;
pub use coordinate::{Coordinate, IdentityKey};
pub use dependency::{DependencyRequest, Exclusion, ManagedVersions, Scope};
