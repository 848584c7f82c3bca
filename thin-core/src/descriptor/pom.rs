// thin-core/src/descriptor/pom.rs
//! Raw POM document as written on disk, before any inheritance or interpolation.
use indexmap::IndexMap;
use serde::Deserialize;
use thin_common::error::{Result, ThinError};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomDocument {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<PomParent>,
    #[serde(default)]
    pub properties: IndexMap<String, String>,
    #[serde(default)]
    pub dependencies: PomDependencies,
    pub dependency_management: Option<PomDependencyManagement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomParent {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PomDependencies {
    #[serde(default, rename = "dependency")]
    pub items: Vec<PomDependency>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PomDependencyManagement {
    #[serde(default)]
    pub dependencies: PomDependencies,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomDependency {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub classifier: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub optional: Option<String>,
    #[serde(default)]
    pub exclusions: PomExclusions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PomExclusions {
    #[serde(default, rename = "exclusion")]
    pub items: Vec<PomExclusion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomExclusion {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
}

impl PomDocument {
    pub fn parse(location: &str, bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            ThinError::MalformedDescriptor(location.to_string(), format!("not UTF-8: {e}"))
        })?;
        let document: PomDocument = quick_xml::de::from_str(text)
            .map_err(|e| ThinError::MalformedDescriptor(location.to_string(), e.to_string()))?;
        if document.artifact_id.as_deref().is_none_or(str::is_empty) {
            return Err(ThinError::MalformedDescriptor(
                location.to_string(),
                "missing <artifactId>".to_string(),
            ));
        }
        Ok(document)
    }

    pub fn management(&self) -> &[PomDependency] {
        self.dependency_management
            .as_ref()
            .map(|m| m.dependencies.items.as_slice())
            .unwrap_or_default()
    }

    /// Effective group: own `groupId`, else the parent's.
    pub fn effective_group(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.group_id.as_str()))
    }

    /// Effective version: own `version`, else the parent's.
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.version.as_str()))
    }
}

impl PomDependency {
    pub fn is_optional(&self) -> bool {
        self.optional
            .as_deref()
            .is_some_and(|o| o.trim().eq_ignore_ascii_case("true"))
    }
}
