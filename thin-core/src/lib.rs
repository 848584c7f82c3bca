// thin-core/src/lib.rs

pub mod archive;
pub mod classpath;
pub mod descriptor;
pub mod graph;
pub mod launcher;
pub mod properties;
pub mod resolve;

pub use archive::{Archive, ArchiveLocator};
pub use classpath::{Classpath, ClasspathSet};
pub use launcher::{Launcher, ThinLauncher};
pub use resolve::{ArtifactResolver, RepositoryResolver, ResolveOptions};
