// thin-common/src/model/dependency.rs
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::coordinate::{Coordinate, IdentityKey};
use crate::error::ThinError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    #[default]
    Compile,
    Runtime,
    Test,
    Provided,
    Import,
    System,
}

impl Scope {
    /// Scopes that end up on a runtime load path.
    pub fn is_propagated(self) -> bool {
        !matches!(self, Scope::Test | Scope::Provided | Scope::System)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Compile => "compile",
            Scope::Runtime => "runtime",
            Scope::Test => "test",
            Scope::Provided => "provided",
            Scope::Import => "import",
            Scope::System => "system",
        }
    }

    /// Absent or empty scope text means compile.
    pub fn from_optional(text: Option<&str>) -> Result<Self, ThinError> {
        match text.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => s.parse(),
            None => Ok(Scope::Compile),
        }
    }
}

impl FromStr for Scope {
    type Err = ThinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compile" => Ok(Scope::Compile),
            "runtime" => Ok(Scope::Runtime),
            "test" => Ok(Scope::Test),
            "provided" => Ok(Scope::Provided),
            "import" => Ok(Scope::Import),
            "system" => Ok(Scope::System),
            other => Err(ThinError::InvalidCoordinate(
                other.to_string(),
                "unknown dependency scope".to_string(),
            )),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Excludes a group/artifact (either may be `*`) from one request's subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Exclusion {
    pub group: String,
    pub artifact: String,
}

impl Exclusion {
    pub fn new(group: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
        }
    }

    pub fn matches(&self, coordinate: &Coordinate) -> bool {
        (self.group == "*" || self.group == coordinate.group())
            && (self.artifact == "*" || self.artifact == coordinate.artifact())
    }
}

impl FromStr for Exclusion {
    type Err = ThinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((g, a)) if !g.is_empty() && !a.is_empty() => Ok(Exclusion::new(g, a)),
            _ => Err(ThinError::InvalidCoordinate(
                s.to_string(),
                "exclusions are written as group:artifact".to_string(),
            )),
        }
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ManagedEntry {
    version: Option<String>,
    scope: Option<Scope>,
}

/// Versions and scopes pinned by the application's own dependency management.
/// They override whatever an artifact reached transitively declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagedVersions {
    entries: HashMap<IdentityKey, ManagedEntry>,
}

impl ManagedVersions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a pin. Later pins for the same key replace earlier ones.
    pub fn insert(&mut self, coordinate: &Coordinate, scope: Option<Scope>) {
        let version = coordinate
            .version()
            .filter(|_| !coordinate.has_unresolved_version())
            .map(str::to_string);
        if version.is_none() && scope.is_none() {
            return;
        }
        self.entries
            .insert(coordinate.identity_key(), ManagedEntry { version, scope });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn scope(&self, coordinate: &Coordinate) -> Option<Scope> {
        self.entries
            .get(&coordinate.identity_key())
            .and_then(|e| e.scope)
    }

    /// `coordinate` with its version replaced by the pinned one, if any.
    pub fn apply(&self, coordinate: &Coordinate) -> Coordinate {
        match self
            .entries
            .get(&coordinate.identity_key())
            .and_then(|e| e.version.as_deref())
        {
            Some(version) => coordinate.with_version(version),
            None => coordinate.clone(),
        }
    }
}

/// One dependency to hand to the artifact resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRequest {
    pub coordinate: Coordinate,
    pub scope: Scope,
    pub exclusions: Vec<Exclusion>,
    pub optional: bool,
    /// False for entries of a computed (already closed) set.
    pub transitive: bool,
    /// Pins applied to everything reached below this request.
    pub managed: Arc<ManagedVersions>,
}

impl DependencyRequest {
    pub fn new(coordinate: Coordinate, scope: Scope) -> Self {
        Self {
            coordinate,
            scope,
            exclusions: Vec::new(),
            optional: false,
            transitive: true,
            managed: Arc::default(),
        }
    }

    pub fn with_exclusions(mut self, exclusions: Vec<Exclusion>) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_managed(mut self, managed: Arc<ManagedVersions>) -> Self {
        self.managed = managed;
        self
    }

    pub fn intransitive(mut self) -> Self {
        self.transitive = false;
        self
    }

    pub fn is_excluded(&self, coordinate: &Coordinate) -> bool {
        self.exclusions.iter().any(|e| e.matches(coordinate))
    }
}

impl fmt::Display for DependencyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.coordinate, self.scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_parsing_and_propagation() {
        assert_eq!(Scope::from_optional(None).unwrap(), Scope::Compile);
        assert_eq!(Scope::from_optional(Some("  ")).unwrap(), Scope::Compile);
        assert_eq!("Runtime".parse::<Scope>().unwrap(), Scope::Runtime);
        assert!("bogus".parse::<Scope>().is_err());
        assert!(Scope::Compile.is_propagated());
        assert!(Scope::Runtime.is_propagated());
        assert!(!Scope::Test.is_propagated());
        assert!(!Scope::Provided.is_propagated());
    }

    #[test]
    fn exclusion_wildcards() {
        let c = Coordinate::parse("org.acme:logging:1.0").unwrap();
        assert!(Exclusion::new("org.acme", "logging").matches(&c));
        assert!(Exclusion::new("*", "logging").matches(&c));
        assert!(Exclusion::new("org.acme", "*").matches(&c));
        assert!(!Exclusion::new("org.other", "*").matches(&c));
        assert!("org.acme".parse::<Exclusion>().is_err());
    }

    #[test]
    fn managed_versions_override_and_skip_placeholders() {
        let mut managed = ManagedVersions::new();
        managed.insert(&Coordinate::parse("g:util:9.0").unwrap(), None);
        managed.insert(&Coordinate::parse("g:other:${nope}").unwrap(), None);
        managed.insert(&Coordinate::parse("g:tool").unwrap(), Some(Scope::Test));
        assert_eq!(managed.len(), 2);

        let util = Coordinate::parse("g:util:1.0").unwrap();
        assert_eq!(managed.apply(&util).to_string(), "g:util:9.0");
        let other = Coordinate::parse("g:other:1.0").unwrap();
        assert_eq!(managed.apply(&other), other);
        let tool = Coordinate::parse("g:tool:2").unwrap();
        assert_eq!(managed.apply(&tool), tool);
        assert_eq!(managed.scope(&tool), Some(Scope::Test));
    }
}
