// thin-common/src/model/coordinate.rs
use std::fmt;
use std::path::PathBuf;

use crate::error::{Result, ThinError};

pub const DEFAULT_TYPE: &str = "jar";

/// Matching key for de-duplication and subtraction. Version is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub group: String,
    pub artifact: String,
    pub classifier: String,
    pub kind: String,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.kind)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        Ok(())
    }
}

/// An artifact coordinate in a Maven-style repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    group: String,
    artifact: String,
    classifier: String,
    kind: String,
    version: Option<String>,
}

impl Coordinate {
    pub fn full(
        group: impl Into<String>,
        artifact: impl Into<String>,
        classifier: Option<&str>,
        kind: Option<&str>,
        version: Option<&str>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            classifier: classifier.unwrap_or_default().to_string(),
            kind: kind
                .filter(|k| !k.is_empty())
                .unwrap_or(DEFAULT_TYPE)
                .to_string(),
            version: version.filter(|v| !v.is_empty()).map(str::to_string),
        }
    }

    /// Descriptor (POM) coordinate for a group/artifact/version.
    pub fn pom(group: &str, artifact: &str, version: &str) -> Self {
        Self::full(group, artifact, None, Some("pom"), Some(version))
    }

    /// Parses `g:a`, `g:a:v`, `g:a:type:v` or `g:a:type:classifier:v`.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let parts: Vec<&str> = trimmed.split(':').map(str::trim).collect();
        let invalid = |reason: &str| ThinError::InvalidCoordinate(text.to_string(), reason.into());
        if parts.iter().take(2).any(|p| p.is_empty()) {
            return Err(invalid("group and artifact must not be empty"));
        }
        let coordinate = match parts.as_slice() {
            [g, a] => Self::full(*g, *a, None, None, None),
            [g, a, v] => Self::full(*g, *a, None, None, Some(*v)),
            [g, a, t, v] => Self::full(*g, *a, None, Some(*t), Some(*v)),
            [g, a, t, c, v] => Self::full(*g, *a, Some(*c), Some(*t), Some(*v)),
            _ => return Err(invalid("expected 2 to 5 ':'-separated fields")),
        };
        Ok(coordinate)
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            group: self.group.clone(),
            artifact: self.artifact.clone(),
            classifier: self.classifier.clone(),
            kind: self.kind.clone(),
        }
    }

    pub fn with_version(&self, version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            version: Some(version).filter(|v| !v.is_empty()),
            ..self.clone()
        }
    }

    /// Same coordinate as a descriptor (type `pom`, no classifier).
    pub fn as_pom(&self) -> Self {
        Self {
            classifier: String::new(),
            kind: "pom".to_string(),
            ..self.clone()
        }
    }

    /// File extension used by the repository layout for this type.
    pub fn extension(&self) -> &str {
        match self.kind.as_str() {
            "jar" | "test-jar" | "bundle" | "maven-plugin" | "ejb" | "ejb-client" => "jar",
            other => other,
        }
    }

    /// `<group path>/<artifact>/<version>/<artifact>-<version>[-<classifier>].<ext>`
    pub fn repository_path(&self) -> Option<PathBuf> {
        let version = self.version.as_deref()?;
        let mut path: PathBuf = self.group.split('.').collect();
        path.push(&self.artifact);
        path.push(version);
        let mut file = format!("{}-{}", self.artifact, version);
        if !self.classifier.is_empty() {
            file.push('-');
            file.push_str(&self.classifier);
        }
        file.push('.');
        file.push_str(self.extension());
        path.push(file);
        Some(path)
    }

    /// Whether the version still contains a `${...}` placeholder.
    pub fn has_unresolved_version(&self) -> bool {
        self.version.as_deref().is_some_and(|v| v.contains("${"))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}:{}", self.kind, self.classifier)?;
        } else if self.kind != DEFAULT_TYPE {
            write!(f, ":{}", self.kind)?;
        }
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn parses_short_and_long_forms() {
        let c = Coordinate::parse("org.acme:lib:1.2").unwrap();
        assert_eq!(c.kind(), "jar");
        assert_eq!(c.version(), Some("1.2"));

        let c = Coordinate::parse("org.acme:lib").unwrap();
        assert_eq!(c.version(), None);

        let c = Coordinate::parse("org.acme:boms:pom:3.0").unwrap();
        assert_eq!(c.kind(), "pom");

        let c = Coordinate::parse("org.acme:cli:jar:full:1.4.2").unwrap();
        assert_eq!(c.classifier(), "full");
        assert_eq!(c.to_string(), "org.acme:cli:jar:full:1.4.2");
    }

    #[test]
    fn rejects_bad_coordinates() {
        assert!(Coordinate::parse("lonely").is_err());
        assert!(Coordinate::parse(":lib:1").is_err());
        assert!(Coordinate::parse("a:b:c:d:e:f").is_err());
    }

    #[test]
    fn identity_key_ignores_version() {
        let a = Coordinate::parse("g:web:5.0").unwrap();
        let b = Coordinate::parse("g:web:5.1").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.identity_key(), b.identity_key());

        let tests = Coordinate::full("g", "web", Some("tests"), None, Some("5.0"));
        assert_ne!(a.identity_key(), tests.identity_key());
    }

    #[test]
    fn repository_layout() {
        let c = Coordinate::full("org.acme.core", "lib", Some("linux"), None, Some("1.0"));
        assert_eq!(
            c.repository_path().unwrap(),
            Path::new("org/acme/core/lib/1.0/lib-1.0-linux.jar")
        );
        assert_eq!(
            Coordinate::pom("org.acme", "parent", "2").repository_path().unwrap(),
            Path::new("org/acme/parent/2/parent-2.pom")
        );
        assert!(Coordinate::parse("g:a").unwrap().repository_path().is_none());
    }
}
