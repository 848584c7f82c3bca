// thin-core/src/descriptor/resolver.rs
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use indexmap::IndexMap;
use thin_common::error::{Result, ThinError};
use thin_common::model::{Coordinate, Exclusion, Scope};
use tracing::{debug, warn};

use super::model::{DeclaredDependency, DescriptorModel, ManagedDependency, ParentReference};
use super::placeholder::substitute;
use super::pom::{PomDependency, PomDocument};
use crate::resolve::ArtifactResolver;

/// Upper bound on parent descriptors folded into one model.
const MAX_PARENT_DEPTH: usize = 32;

/// Reads descriptors and flattens them into [`DescriptorModel`]s.
///
/// Parent and imported descriptors are located through the resolver's
/// `resolve_descriptor`; failures there only drop that branch's contribution.
pub struct DescriptorResolver<'a> {
    resolver: &'a dyn ArtifactResolver,
}

impl<'a> DescriptorResolver<'a> {
    pub fn new(resolver: &'a dyn ArtifactResolver) -> Self {
        Self { resolver }
    }

    pub fn resolve_path(&self, path: &Path) -> Result<DescriptorModel> {
        let location = path.display().to_string();
        let bytes = read_descriptor(path)?;
        self.resolve_bytes(&location, &bytes)
    }

    pub fn resolve_bytes(&self, location: &str, bytes: &[u8]) -> Result<DescriptorModel> {
        let document = PomDocument::parse(location, bytes)?;
        self.resolve_document(location, document)
    }

    /// Resolves the descriptor of a repository coordinate (its `pom`).
    pub fn resolve_coordinate(&self, coordinate: &Coordinate) -> Result<DescriptorModel> {
        let (location, document) = self.load(&coordinate.as_pom())?;
        self.resolve_document(&location, document)
    }

    pub fn resolve_document(&self, location: &str, document: PomDocument) -> Result<DescriptorModel> {
        let mut model = self.flatten(location, document)?;
        self.expand_imports(&mut model);
        debug!(
            "Resolved descriptor {} ({} dependencies, {} managed)",
            location,
            model.dependencies.len(),
            model.management.len()
        );
        Ok(model)
    }

    fn load(&self, coordinate: &Coordinate) -> Result<(String, PomDocument)> {
        let path = self.resolver.resolve_descriptor(coordinate)?;
        let location = path.display().to_string();
        let bytes = read_descriptor(&path)?;
        let document = PomDocument::parse(&location, &bytes)?;
        Ok((location, document))
    }

    /// Walks the parent chain iteratively, folds properties and management root-first,
    /// then substitutes placeholders against the folded properties.
    fn flatten(&self, location: &str, document: PomDocument) -> Result<DescriptorModel> {
        let group = document.effective_group().map(str::to_string).ok_or_else(|| {
            ThinError::MalformedDescriptor(location.to_string(), "missing <groupId>".to_string())
        })?;
        let own_version = document.effective_version().unwrap_or_default();
        let artifact = document.artifact_id.clone().unwrap_or_default();

        let mut visited = HashSet::new();
        visited.insert(Coordinate::pom(&group, &artifact, own_version).to_string());

        let mut chain = vec![document];
        let mut next = chain[0].parent.clone();
        while let Some(parent) = next.take() {
            if chain.len() > MAX_PARENT_DEPTH {
                warn!(
                    "Parent chain of {} exceeds {} levels, ignoring the rest",
                    location, MAX_PARENT_DEPTH
                );
                break;
            }
            let coordinate = Coordinate::pom(&parent.group_id, &parent.artifact_id, &parent.version);
            if !visited.insert(coordinate.to_string()) {
                warn!("Parent cycle at {} while reading {}", coordinate, location);
                break;
            }
            match self.load(&coordinate) {
                Ok((parent_location, parent_document)) => {
                    debug!("Folding parent {} from {}", coordinate, parent_location);
                    next = parent_document.parent.clone();
                    chain.push(parent_document);
                }
                Err(e) => {
                    warn!(
                        "Could not read parent {} of {}, skipping its properties: {}",
                        coordinate, location, e
                    );
                }
            }
        }

        let mut properties = IndexMap::new();
        for level in chain.iter().rev() {
            for (name, value) in &level.properties {
                properties.insert(name.clone(), value.clone());
            }
        }

        let child = &chain[0];
        bind_project_properties(child, &mut properties);

        let mut management = IndexMap::new();
        for level in chain.iter().rev() {
            for raw in level.management() {
                if let Some(managed) = convert_managed(raw, &properties, location) {
                    management.insert(managed.coordinate.identity_key(), managed);
                }
            }
        }

        let dependencies = child
            .dependencies
            .items
            .iter()
            .filter_map(|raw| convert_declared(raw, &properties, location))
            .collect();

        let parent = child.parent.as_ref().map(|p| ParentReference {
            group: p.group_id.clone(),
            artifact: p.artifact_id.clone(),
            version: p.version.clone(),
        });

        Ok(DescriptorModel {
            location: location.to_string(),
            group: substitute(&group, &properties),
            artifact,
            version: child
                .effective_version()
                .map(|v| substitute(v, &properties)),
            packaging: child.packaging.clone().unwrap_or_else(|| "jar".to_string()),
            parent,
            properties,
            dependencies,
            management,
        })
    }

    /// Replaces `import` management entries with the target descriptors' own tables.
    /// Entries already present win over imported ones.
    pub fn expand_imports(&self, model: &mut DescriptorModel) {
        let mut pending: VecDeque<ManagedDependency> = model
            .management
            .values()
            .filter(|m| m.is_import())
            .cloned()
            .collect();
        if pending.is_empty() {
            return;
        }
        model.management.retain(|_, m| !m.is_import());

        let mut seen = HashSet::new();
        while let Some(import) = pending.pop_front() {
            let coordinate = import.coordinate;
            if coordinate.version().is_none() || coordinate.has_unresolved_version() {
                warn!(
                    "Skipping import of {} in {}: no usable version",
                    coordinate, model.location
                );
                continue;
            }
            if !seen.insert(coordinate.to_string()) {
                continue;
            }
            let imported = self
                .load(&coordinate)
                .and_then(|(location, document)| self.flatten(&location, document));
            match imported {
                Ok(target) => {
                    debug!(
                        "Importing {} managed entries from {}",
                        target.management.len(),
                        coordinate
                    );
                    for (key, entry) in target.management {
                        if entry.is_import() {
                            pending.push_back(entry);
                        } else {
                            model.management.entry(key).or_insert(entry);
                        }
                    }
                }
                Err(e) => warn!(
                    "Could not import dependency management from {}: {}",
                    coordinate, e
                ),
            }
        }
    }
}

fn read_descriptor(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ThinError::DescriptorNotFound(path.display().to_string()),
        _ => ThinError::from(e),
    })
}

fn bind_project_properties(child: &PomDocument, properties: &mut IndexMap<String, String>) {
    let mut bind = |name: &str, value: &str| {
        properties.insert(name.to_string(), value.to_string());
    };
    if let Some(version) = child.effective_version() {
        bind("project.version", version);
        bind("pom.version", version);
    }
    if let Some(group) = child.effective_group() {
        bind("project.groupId", group);
        bind("pom.groupId", group);
    }
    if let Some(artifact) = child.artifact_id.as_deref() {
        bind("project.artifactId", artifact);
        bind("pom.artifactId", artifact);
    }
    if let Some(parent) = &child.parent {
        bind("project.parent.version", &parent.version);
        bind("project.parent.groupId", &parent.group_id);
    }
}

fn substitute_field(value: Option<&str>, properties: &IndexMap<String, String>) -> Option<String> {
    value
        .map(|v| substitute(v.trim(), properties))
        .filter(|v| !v.is_empty())
}

fn convert_coordinate(
    raw: &PomDependency,
    properties: &IndexMap<String, String>,
    location: &str,
) -> Option<Coordinate> {
    let group = substitute_field(raw.group_id.as_deref(), properties);
    let artifact = substitute_field(raw.artifact_id.as_deref(), properties);
    let (Some(group), Some(artifact)) = (group, artifact) else {
        warn!(
            "Ignoring dependency without groupId/artifactId in {}",
            location
        );
        return None;
    };
    let classifier = substitute_field(raw.classifier.as_deref(), properties);
    let kind = substitute_field(raw.kind.as_deref(), properties);
    let version = substitute_field(raw.version.as_deref(), properties);
    Some(Coordinate::full(
        group,
        artifact,
        classifier.as_deref(),
        kind.as_deref(),
        version.as_deref(),
    ))
}

fn convert_scope(raw: &PomDependency, location: &str) -> Option<Scope> {
    let text = raw.scope.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    match text.parse() {
        Ok(scope) => Some(scope),
        Err(_) => {
            warn!("Unknown scope '{}' in {}, treating as compile", text, location);
            Some(Scope::Compile)
        }
    }
}

fn convert_exclusions(raw: &PomDependency) -> Vec<Exclusion> {
    raw.exclusions
        .items
        .iter()
        .map(|e| {
            Exclusion::new(
                e.group_id.as_deref().map(str::trim).unwrap_or("*"),
                e.artifact_id.as_deref().map(str::trim).unwrap_or("*"),
            )
        })
        .filter(|e| !e.group.is_empty() && !e.artifact.is_empty())
        .collect()
}

fn convert_declared(
    raw: &PomDependency,
    properties: &IndexMap<String, String>,
    location: &str,
) -> Option<DeclaredDependency> {
    Some(DeclaredDependency {
        coordinate: convert_coordinate(raw, properties, location)?,
        scope: convert_scope(raw, location),
        optional: raw.is_optional(),
        exclusions: convert_exclusions(raw),
    })
}

fn convert_managed(
    raw: &PomDependency,
    properties: &IndexMap<String, String>,
    location: &str,
) -> Option<ManagedDependency> {
    Some(ManagedDependency {
        coordinate: convert_coordinate(raw, properties, location)?,
        scope: convert_scope(raw, location),
        exclusions: convert_exclusions(raw),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use tempfile::TempDir;
    use thin_common::model::{DependencyRequest, ResolvedArtifact};

    use super::*;

    /// Serves descriptors from a directory keyed by `group:artifact:version`.
    struct PomDir {
        dir: TempDir,
        files: HashMap<String, PathBuf>,
    }

    impl PomDir {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                files: HashMap::new(),
            }
        }

        fn add(&mut self, gav: &str, xml: &str) {
            let path = self.dir.path().join(format!("{}.pom", gav.replace(':', "_")));
            fs::write(&path, xml).unwrap();
            self.files.insert(gav.to_string(), path);
        }
    }

    impl ArtifactResolver for PomDir {
        fn resolve(&self, request: &DependencyRequest) -> Result<Vec<ResolvedArtifact>> {
            Err(ThinError::resolution(request.coordinate.to_string(), "not a repository"))
        }

        fn resolve_descriptor(&self, coordinate: &Coordinate) -> Result<PathBuf> {
            let gav = format!(
                "{}:{}:{}",
                coordinate.group(),
                coordinate.artifact(),
                coordinate.version().unwrap_or_default()
            );
            self.files
                .get(&gav)
                .cloned()
                .ok_or_else(|| ThinError::resolution(coordinate.to_string(), "not found"))
        }
    }

    const BASE: &str = r#"<project>
  <groupId>base</groupId><artifactId>base</artifactId><version>1.0</version>
  <packaging>pom</packaging>
  <properties><core.version>2.3</core.version><other.version>9</other.version></properties>
  <dependencyManagement><dependencies>
    <dependency><groupId>group</groupId><artifactId>managed</artifactId><version>${other.version}</version></dependency>
    <dependency><groupId>group</groupId><artifactId>overridden</artifactId><version>1</version></dependency>
  </dependencies></dependencyManagement>
</project>"#;

    const APP: &str = r#"<project>
  <parent><groupId>base</groupId><artifactId>base</artifactId><version>1.0</version></parent>
  <artifactId>app</artifactId>
  <properties><other.version>10</other.version></properties>
  <dependencyManagement><dependencies>
    <dependency><groupId>group</groupId><artifactId>overridden</artifactId><version>2</version></dependency>
  </dependencies></dependencyManagement>
  <dependencies>
    <dependency><groupId>group</groupId><artifactId>lib</artifactId><version>${core.version}</version></dependency>
    <dependency><groupId>${project.groupId}</groupId><artifactId>sibling</artifactId><version>${project.version}</version></dependency>
    <dependency><groupId>group</groupId><artifactId>unknown</artifactId><version>${nope}</version></dependency>
  </dependencies>
</project>"#;

    #[test]
    fn inherits_parent_properties_and_management() {
        let mut poms = PomDir::new();
        poms.add("base:base:1.0", BASE);
        let resolver = DescriptorResolver::new(&poms);
        let model = resolver.resolve_bytes("app/pom.xml", APP.as_bytes()).unwrap();

        assert_eq!(model.group, "base");
        assert_eq!(model.version.as_deref(), Some("1.0"));
        assert_eq!(model.property("core.version"), Some("2.3"));
        assert_eq!(model.property("project.artifactId"), Some("app"));

        let versions: Vec<_> = model
            .dependencies
            .iter()
            .map(|d| d.coordinate.to_string())
            .collect();
        assert_eq!(
            versions,
            vec!["group:lib:2.3", "base:sibling:1.0", "group:unknown:${nope}"]
        );

        let managed = |a: &str| {
            let key = Coordinate::parse(&format!("group:{a}")).unwrap().identity_key();
            model.managed(&key).and_then(|m| m.coordinate.version().map(str::to_string))
        };
        // child property overrides the parent's, even inside the parent's table
        assert_eq!(managed("managed").as_deref(), Some("10"));
        assert_eq!(managed("overridden").as_deref(), Some("2"));
    }

    #[test]
    fn missing_parent_is_not_fatal() {
        let poms = PomDir::new();
        let resolver = DescriptorResolver::new(&poms);
        let model = resolver.resolve_bytes("app/pom.xml", APP.as_bytes()).unwrap();
        assert_eq!(model.dependencies[0].coordinate.version(), Some("${core.version}"));
        assert_eq!(model.property("project.version"), Some("1.0"));
    }

    /// Parses but has no `<artifactId>`, so reading it fails as malformed.
    const BROKEN: &str = "<project><groupId>broken</groupId><version>1</version></project>";

    #[test]
    fn malformed_parent_keeps_the_child_properties() {
        assert!(matches!(
            PomDocument::parse("broken.pom", BROKEN.as_bytes()),
            Err(ThinError::MalformedDescriptor(..))
        ));
        let mut poms = PomDir::new();
        poms.add("base:base:1.0", BROKEN);
        let resolver = DescriptorResolver::new(&poms);
        let model = resolver.resolve_bytes("app/pom.xml", APP.as_bytes()).unwrap();

        assert_eq!(model.property("other.version"), Some("10"));
        assert_eq!(model.property("core.version"), None);
        let key = Coordinate::parse("group:overridden").unwrap().identity_key();
        assert_eq!(model.managed(&key).unwrap().coordinate.version(), Some("2"));
        assert_eq!(model.dependencies[1].coordinate.to_string(), "base:sibling:1.0");
    }

    #[test]
    fn parent_cycles_terminate() {
        let mut poms = PomDir::new();
        poms.add(
            "c:a:1",
            r#"<project><parent><groupId>c</groupId><artifactId>b</artifactId><version>1</version></parent>
               <artifactId>a</artifactId><properties><from.a>a</from.a></properties></project>"#,
        );
        poms.add(
            "c:b:1",
            r#"<project><parent><groupId>c</groupId><artifactId>a</artifactId><version>1</version></parent>
               <artifactId>b</artifactId><properties><from.b>b</from.b></properties></project>"#,
        );
        let resolver = DescriptorResolver::new(&poms);
        let model = resolver
            .resolve_coordinate(&Coordinate::pom("c", "a", "1"))
            .unwrap();
        assert_eq!(model.property("from.a"), Some("a"));
        assert_eq!(model.property("from.b"), Some("b"));
    }

    #[test]
    fn import_scope_splices_bom_entries() {
        let mut poms = PomDir::new();
        poms.add(
            "bom:bom:3",
            r#"<project><groupId>bom</groupId><artifactId>bom</artifactId><version>3</version>
               <dependencyManagement><dependencies>
                 <dependency><groupId>x</groupId><artifactId>y</artifactId><version>7</version></dependency>
                 <dependency><groupId>x</groupId><artifactId>z</artifactId><version>7</version></dependency>
               </dependencies></dependencyManagement></project>"#,
        );
        let xml = r#"<project><groupId>g</groupId><artifactId>a</artifactId><version>1</version>
            <properties><bom.version>3</bom.version></properties>
            <dependencyManagement><dependencies>
              <dependency><groupId>x</groupId><artifactId>z</artifactId><version>8</version></dependency>
              <dependency><groupId>bom</groupId><artifactId>bom</artifactId><version>${bom.version}</version>
                <type>pom</type><scope>import</scope></dependency>
            </dependencies></dependencyManagement></project>"#;
        let resolver = DescriptorResolver::new(&poms);
        let model = resolver.resolve_bytes("pom.xml", xml.as_bytes()).unwrap();
        let version = |a: &str| {
            let key = Coordinate::parse(&format!("x:{a}")).unwrap().identity_key();
            model.managed(&key).unwrap().coordinate.version().unwrap().to_string()
        };
        assert_eq!(version("y"), "7");
        assert_eq!(version("z"), "8");
        assert!(model.management.values().all(|m| !m.is_import()));
    }

    #[test]
    fn malformed_bom_is_skipped() {
        let mut poms = PomDir::new();
        poms.add("broken:bom:1", BROKEN);
        let xml = r#"<project><groupId>g</groupId><artifactId>a</artifactId><version>1</version>
            <properties><lib.version>4</lib.version></properties>
            <dependencyManagement><dependencies>
              <dependency><groupId>broken</groupId><artifactId>bom</artifactId><version>1</version>
                <type>pom</type><scope>import</scope></dependency>
              <dependency><groupId>x</groupId><artifactId>lib</artifactId><version>${lib.version}</version></dependency>
            </dependencies></dependencyManagement></project>"#;
        let resolver = DescriptorResolver::new(&poms);
        let model = resolver.resolve_bytes("pom.xml", xml.as_bytes()).unwrap();

        assert_eq!(model.property("lib.version"), Some("4"));
        assert_eq!(model.management.len(), 1);
        let key = Coordinate::parse("x:lib").unwrap().identity_key();
        assert_eq!(model.managed(&key).unwrap().coordinate.version(), Some("4"));
    }

    #[test]
    fn missing_file_is_descriptor_not_found() {
        let poms = PomDir::new();
        let resolver = DescriptorResolver::new(&poms);
        let err = resolver
            .resolve_path(Path::new("/definitely/not/here/pom.xml"))
            .unwrap_err();
        assert!(matches!(err, ThinError::DescriptorNotFound(_)));
    }
}
