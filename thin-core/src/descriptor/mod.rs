// thin-core/src/descriptor/mod.rs
//! POM descriptors: raw reading, placeholder substitution and parent-chain flattening.
pub mod model;
pub mod placeholder;
pub mod pom;
pub mod resolver;

pub use model::{DeclaredDependency, DescriptorModel, ManagedDependency, ParentReference};
pub use pom::PomDocument;
pub use resolver::DescriptorResolver;
