// thin-core/src/descriptor/model.rs
use std::fmt;

use indexmap::IndexMap;
use thin_common::model::{Coordinate, Exclusion, IdentityKey, Scope};

/// Pointer to an ancestor descriptor. Its type is always `pom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentReference {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

impl fmt::Display for ParentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:pom:{}", self.group, self.artifact, self.version)
    }
}

/// A `<dependency>` element; version and scope may still be left to management.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub coordinate: Coordinate,
    pub scope: Option<Scope>,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
}

/// A `<dependencyManagement>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedDependency {
    pub coordinate: Coordinate,
    pub scope: Option<Scope>,
    pub exclusions: Vec<Exclusion>,
}

impl ManagedDependency {
    pub fn is_import(&self) -> bool {
        self.scope == Some(Scope::Import) && self.coordinate.kind() == "pom"
    }
}

/// Flattened descriptor after the parent chain is folded and placeholders substituted.
#[derive(Debug, Clone, Default)]
pub struct DescriptorModel {
    pub location: String,
    pub group: String,
    pub artifact: String,
    pub version: Option<String>,
    pub packaging: String,
    pub parent: Option<ParentReference>,
    pub properties: IndexMap<String, String>,
    pub dependencies: Vec<DeclaredDependency>,
    pub management: IndexMap<IdentityKey, ManagedDependency>,
}

impl DescriptorModel {
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn managed(&self, key: &IdentityKey) -> Option<&ManagedDependency> {
        self.management.get(key)
    }
}
