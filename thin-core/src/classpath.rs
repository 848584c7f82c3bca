// thin-core/src/classpath.rs
//! Load-path sets and the extract / subtract / combine operations over packages.
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use thin_common::error::{Result, ThinError};
use thin_common::model::{
    Coordinate, DependencyRequest, IdentityKey, ManagedVersions, ResolvedArtifact, Scope,
};
use tracing::{debug, instrument};

use crate::archive::discovery::find_properties;
use crate::archive::Archive;
use crate::descriptor::{DescriptorModel, DescriptorResolver, ManagedDependency, PomDocument};
use crate::graph::build_requests;
use crate::properties::ThinProperties;
use crate::resolve::{resolve_all, ArtifactResolver, ResolveOptions};

/// Separator between load-path entries on this platform.
pub const PATH_SEPARATOR: &str = if cfg!(windows) { ";" } else { ":" };

/// Ordered load path with at most one artifact per identity key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClasspathSet {
    entries: Vec<ResolvedArtifact>,
    positions: HashMap<IdentityKey, usize>,
}

impl ClasspathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `artifact` unless its key is already present. Returns whether it was added.
    pub fn push(&mut self, artifact: ResolvedArtifact) -> bool {
        let key = artifact.key();
        if self.positions.contains_key(&key) {
            return false;
        }
        self.positions.insert(key, self.entries.len());
        self.entries.push(artifact);
        true
    }

    /// Adds every artifact of `other`; entries of `other` replace same-key entries
    /// at their existing position.
    pub fn overlay<I: IntoIterator<Item = ResolvedArtifact>>(&mut self, other: I) {
        for artifact in other {
            match self.positions.get(&artifact.key()) {
                Some(&position) => self.entries[position] = artifact,
                None => {
                    self.push(artifact);
                }
            }
        }
    }

    /// Adds the artifacts of `other` whose keys are not present yet.
    pub fn union<I: IntoIterator<Item = ResolvedArtifact>>(&mut self, other: I) {
        for artifact in other {
            self.push(artifact);
        }
    }

    pub fn without_keys(&self, keys: &HashSet<IdentityKey>) -> Self {
        self.entries
            .iter()
            .filter(|a| !keys.contains(&a.key()))
            .cloned()
            .collect()
    }

    pub fn keys(&self) -> HashSet<IdentityKey> {
        self.positions.keys().cloned().collect()
    }

    pub fn contains_key(&self, key: &IdentityKey) -> bool {
        self.positions.contains_key(key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedArtifact> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_path_string(&self, separator: &str) -> String {
        self.entries
            .iter()
            .map(|a| a.path.display().to_string())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl FromIterator<ResolvedArtifact> for ClasspathSet {
    fn from_iter<I: IntoIterator<Item = ResolvedArtifact>>(iter: I) -> Self {
        let mut set = ClasspathSet::new();
        set.union(iter);
        set
    }
}

impl IntoIterator for ClasspathSet {
    type Item = ResolvedArtifact;
    type IntoIter = std::vec::IntoIter<ResolvedArtifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ClasspathSet {
    type Item = &'a ResolvedArtifact;
    type IntoIter = std::slice::Iter<'a, ResolvedArtifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Computes load paths of packages through an injected resolver.
pub struct Classpath {
    resolver: Arc<dyn ArtifactResolver>,
    locations: Vec<String>,
    options: ResolveOptions,
}

impl Classpath {
    pub fn new(resolver: Arc<dyn ArtifactResolver>) -> Self {
        Self {
            resolver,
            locations: Vec::new(),
            options: ResolveOptions::default(),
        }
    }

    /// Extra places searched for `<name>.properties`.
    pub fn with_locations(mut self, locations: Vec<String>) -> Self {
        self.locations = locations;
        self
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Full resolved set of one package: its descriptor, the `name` properties
    /// and one overlay per active profile.
    #[instrument(skip(self, archive), fields(archive = %archive.path().display()))]
    pub fn extract(&self, archive: &Archive, name: &str, profiles: &[String]) -> Result<ClasspathSet> {
        let requests = self.requests(archive, name, profiles)?;
        self.resolve_requests(&requests)
    }

    /// Artifacts of `child` whose identity key is not provided by `parent`,
    /// whatever version the parent has.
    pub fn subtract(&self, parent: &Archive, child: &Archive, name: &str) -> Result<ClasspathSet> {
        self.subtract_with_profiles(parent, child, name, &[])
    }

    fn subtract_with_profiles(
        &self,
        parent: &Archive,
        child: &Archive,
        name: &str,
        profiles: &[String],
    ) -> Result<ClasspathSet> {
        let provided = self.extract(parent, name, &[])?;
        let wanted = self.extract(child, name, profiles)?;
        let remaining = wanted.without_keys(&provided.keys());
        debug!(
            "{} of {} artifacts remain after removing those of {}",
            remaining.len(),
            wanted.len(),
            parent.path().display()
        );
        Ok(remaining)
    }

    /// The parent package itself followed by what `child` adds on top of it.
    /// Without a parent this is [`Classpath::extract`] of the child.
    pub fn combine(
        &self,
        parent: Option<&Archive>,
        child: &Archive,
        name: &str,
        profiles: &[String],
    ) -> Result<ClasspathSet> {
        let Some(parent) = parent else {
            return self.extract(child, name, profiles);
        };
        let mut combined = ClasspathSet::new();
        combined.push(package_artifact(parent)?);
        combined.union(self.subtract_with_profiles(parent, child, name, profiles)?);
        Ok(combined)
    }

    /// Merged direct requests of a package before resolution. Each carries the
    /// package's dependency management, which also pins transitive versions.
    pub fn requests(&self, archive: &Archive, name: &str, profiles: &[String]) -> Result<Vec<DependencyRequest>> {
        let descriptors = DescriptorResolver::new(self.resolver.as_ref());
        let base = find_properties(archive, name, &self.locations)?;

        let mut merged = match base.as_ref().filter(|p| p.computed) {
            Some(computed) => {
                debug!("Using computed dependency set from {}", computed.location);
                RequestSet::default()
            }
            None => RequestSet::from_model(self.package_model(archive, &descriptors)?),
        };
        if let Some(properties) = &base {
            merged.apply(properties, &descriptors);
        }
        for profile in profiles.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            let profile_name = format!("{name}-{profile}");
            match find_properties(archive, &profile_name, &self.locations)? {
                Some(properties) => merged.apply(&properties, &descriptors),
                None => debug!("No {} descriptor for profile {}", profile_name, profile),
            }
        }
        Ok(merged.into_requests())
    }

    /// The package's own descriptor, or an empty model when it has none.
    fn package_model(&self, archive: &Archive, descriptors: &DescriptorResolver<'_>) -> Result<DescriptorModel> {
        let Some((location, bytes)) = archive.find_pom()? else {
            debug!("No descriptor in {}", archive.path().display());
            return Ok(DescriptorModel {
                location: archive.path().display().to_string(),
                ..DescriptorModel::default()
            });
        };
        match descriptors.resolve_bytes(&location, &bytes) {
            Ok(model) => Ok(model),
            Err(ThinError::DescriptorNotFound(missing)) => {
                debug!("Descriptor {} not found, no dependencies", missing);
                Ok(DescriptorModel::default())
            }
            Err(e) => Err(e),
        }
    }

    fn resolve_requests(&self, requests: &[DependencyRequest]) -> Result<ClasspathSet> {
        let results = resolve_all(&self.resolver, requests, &self.options)?;
        let mut set = ClasspathSet::new();
        let mut declared = ClasspathSet::new();
        for artifacts in results {
            if let Some(first) = artifacts.first() {
                declared.push(first.clone());
            }
            set.union(artifacts);
        }
        // a declared version beats one reached transitively through an earlier request
        set.overlay(declared);
        Ok(set)
    }
}

/// Direct requests of one package as descriptors are layered on top of each other.
#[derive(Default)]
struct RequestSet {
    model: DescriptorModel,
    requests: Vec<DependencyRequest>,
}

impl RequestSet {
    fn from_model(model: DescriptorModel) -> Self {
        let mut set = RequestSet::default();
        for request in build_requests(&model) {
            if !set.requests.iter().any(|r| same_key(r, &request)) {
                set.requests.push(request);
            }
        }
        set.model = model;
        set
    }

    fn apply(&mut self, properties: &ThinProperties, descriptors: &DescriptorResolver<'_>) {
        if !properties.boms.is_empty() {
            for bom in &properties.boms {
                let managed = ManagedDependency {
                    coordinate: bom.clone(),
                    scope: Some(Scope::Import),
                    exclusions: Vec::new(),
                };
                self.model.management.insert(bom.identity_key(), managed);
            }
            descriptors.expand_imports(&mut self.model);
        }

        for dependency in &properties.dependencies {
            if !dependency.scope.is_propagated() {
                debug!("Dropping {} from {}", dependency, properties.location);
                continue;
            }
            let request = self.with_managed_version(dependency.clone());
            match self.requests.iter_mut().find(|r| same_key(r, &request)) {
                Some(existing) => {
                    debug!("{} replaces {}", request.coordinate, existing.coordinate);
                    *existing = request;
                }
                None => self.requests.push(request),
            }
        }

        for exclusion in &properties.exclusions {
            self.requests.retain(|r| {
                let excluded = exclusion.matches(&r.coordinate);
                if excluded {
                    debug!("{} excludes {}", properties.location, r.coordinate);
                }
                !excluded
            });
        }
    }

    /// The requests, each carrying the management table for its subtree.
    fn into_requests(self) -> Vec<DependencyRequest> {
        let mut managed = ManagedVersions::new();
        for entry in self.model.management.values().filter(|m| !m.is_import()) {
            managed.insert(&entry.coordinate, entry.scope);
        }
        if managed.is_empty() {
            return self.requests;
        }
        debug!("Pinning {} managed versions below {}", managed.len(), self.model.location);
        let managed = Arc::new(managed);
        self.requests
            .into_iter()
            .map(|request| request.with_managed(Arc::clone(&managed)))
            .collect()
    }

    fn with_managed_version(&self, mut request: DependencyRequest) -> DependencyRequest {
        if request.coordinate.version().is_some() {
            return request;
        }
        if let Some(version) = self
            .model
            .managed(&request.coordinate.identity_key())
            .and_then(|m| m.coordinate.version())
        {
            request.coordinate = request.coordinate.with_version(version);
        }
        request
    }
}

fn same_key(a: &DependencyRequest, b: &DependencyRequest) -> bool {
    a.coordinate.identity_key() == b.coordinate.identity_key()
}

/// The package itself as a load-path entry.
fn package_artifact(archive: &Archive) -> Result<ResolvedArtifact> {
    Ok(ResolvedArtifact::new(package_coordinate(archive)?, archive.path()))
}

/// Coordinate a package declares for itself, else one derived from its file name.
pub fn package_coordinate(archive: &Archive) -> Result<Coordinate> {
    let coordinate = match archive.find_pom()? {
        Some((location, bytes)) => {
            let document = PomDocument::parse(&location, &bytes)?;
            Coordinate::full(
                document.effective_group().unwrap_or_default(),
                document.artifact_id.as_deref().unwrap_or_default(),
                None,
                document.packaging.as_deref(),
                document.effective_version(),
            )
        }
        None => Coordinate::full("file", file_stem(archive.path()), None, None, None),
    };
    Ok(coordinate)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(text: &str) -> ResolvedArtifact {
        let coordinate = Coordinate::parse(text).unwrap();
        let path = format!("/repo/{}.jar", coordinate.artifact());
        ResolvedArtifact::new(coordinate, path)
    }

    fn listing(set: &ClasspathSet) -> Vec<String> {
        set.iter().map(|a| a.coordinate.to_string()).collect()
    }

    #[test]
    fn push_keeps_the_first_version() {
        let mut set = ClasspathSet::new();
        assert!(set.push(artifact("g:a:1")));
        assert!(!set.push(artifact("g:a:2")));
        assert!(set.push(artifact("g:a:jar:tests:1")));
        assert_eq!(listing(&set), vec!["g:a:1", "g:a:jar:tests:1"]);
    }

    #[test]
    fn overlay_replaces_in_place() {
        let mut set: ClasspathSet = [artifact("g:a:1"), artifact("g:b:1")].into_iter().collect();
        set.overlay([artifact("g:c:1"), artifact("g:a:2")]);
        assert_eq!(listing(&set), vec!["g:a:2", "g:b:1", "g:c:1"]);
    }

    #[test]
    fn without_keys_ignores_versions() {
        let set: ClasspathSet = [artifact("g:web:5.1"), artifact("g:db:1")].into_iter().collect();
        let parent: ClasspathSet = [artifact("g:web:5.0")].into_iter().collect();
        let remaining = set.without_keys(&parent.keys());
        assert_eq!(listing(&remaining), vec!["g:db:1"]);
        assert!(!remaining.contains_key(&Coordinate::parse("g:web:5.1").unwrap().identity_key()));
    }

    #[test]
    fn path_string_uses_the_separator() {
        let set: ClasspathSet = [artifact("g:a:1"), artifact("g:b:1")].into_iter().collect();
        assert_eq!(set.to_path_string(":"), "/repo/a.jar:/repo/b.jar");
        assert_eq!(ClasspathSet::new().to_path_string(PATH_SEPARATOR), "");
    }
}
