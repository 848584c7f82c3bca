// thin-core/src/resolve/transitive.rs
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use thin_common::error::{Result, ThinError};
use thin_common::fetch::ArtifactFetcher;
use thin_common::model::{Coordinate, DependencyRequest, Exclusion, ResolvedArtifact, Scope};
use tracing::{debug, warn};

use super::ArtifactResolver;
use crate::descriptor::{DescriptorModel, DescriptorResolver};
use crate::graph::build_transitive_requests;

/// Deepest level of transitive expansion below a request.
const MAX_DEPTH: usize = 64;

/// [`ArtifactResolver`] over an [`ArtifactFetcher`], expanding each artifact
/// through its own descriptor.
///
/// Expansion is breadth-first, so the nearest declaration of an artifact wins
/// and later ones are ignored.
pub struct RepositoryResolver<F> {
    fetcher: F,
    descriptors: Mutex<HashMap<String, Option<Arc<DescriptorModel>>>>,
}

struct Pending {
    request: DependencyRequest,
    /// Requesting coordinates, nearest first.
    chain: Vec<String>,
    depth: usize,
}

impl<F: ArtifactFetcher> RepositoryResolver<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            descriptors: Mutex::new(HashMap::new()),
        }
    }

    /// Flattened descriptor of an artifact, `None` when it has none or it cannot be read.
    fn descriptor(&self, coordinate: &Coordinate) -> Option<Arc<DescriptorModel>> {
        let key = coordinate.as_pom().to_string();
        if let Ok(memo) = self.descriptors.lock() {
            if let Some(cached) = memo.get(&key) {
                return cached.clone();
            }
        }

        let loaded = match DescriptorResolver::new(self).resolve_coordinate(coordinate) {
            Ok(model) => Some(Arc::new(model)),
            Err(e @ ThinError::MalformedDescriptor(..)) => {
                warn!("Ignoring dependencies of {}: {}", coordinate, e);
                None
            }
            Err(e) => {
                debug!("No descriptor for {}, assuming no dependencies: {}", coordinate, e);
                None
            }
        };
        if let Ok(mut memo) = self.descriptors.lock() {
            memo.insert(key, loaded.clone());
        }
        loaded
    }

    fn fetch(&self, pending: &Pending) -> Result<PathBuf> {
        let coordinate = &pending.request.coordinate;
        let reason = if coordinate.version().is_none() {
            Some("no version declared or managed")
        } else if coordinate.has_unresolved_version() {
            Some("version contains an unresolved placeholder")
        } else {
            None
        };
        let result = match reason {
            Some(reason) => Err(ThinError::resolution(coordinate.to_string(), reason)),
            None => self.fetcher.fetch(coordinate).map_err(|e| match e {
                e @ ThinError::ArtifactResolutionFailure { .. } => e,
                other => ThinError::resolution(coordinate.to_string(), other.to_string()),
            }),
        };
        result.map_err(|e| {
            pending
                .chain
                .iter()
                .fold(e, |e, requester| e.required_by(requester.as_str()))
        })
    }
}

/// Scope an artifact gets when reached through a parent in `parent` scope.
fn mediate(parent: Scope, child: Scope) -> Scope {
    if parent == Scope::Runtime || child == Scope::Runtime {
        Scope::Runtime
    } else {
        Scope::Compile
    }
}

impl<F: ArtifactFetcher> ArtifactResolver for RepositoryResolver<F> {
    fn resolve(&self, request: &DependencyRequest) -> Result<Vec<ResolvedArtifact>> {
        let mut resolved = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([Pending {
            request: request.clone(),
            chain: Vec::new(),
            depth: 0,
        }]);

        while let Some(pending) = queue.pop_front() {
            let coordinate = pending.request.coordinate.clone();
            if !seen.insert(coordinate.identity_key()) {
                continue;
            }
            let path = self.fetch(&pending)?;
            debug!("Resolved {} -> {}", coordinate, path.display());
            resolved.push(ResolvedArtifact::new(coordinate.clone(), path).with_scope(pending.request.scope));

            if !pending.request.transitive {
                continue;
            }
            if pending.depth >= MAX_DEPTH {
                warn!(
                    "Dependency tree of {} is deeper than {} levels, not expanding {}",
                    request.coordinate, MAX_DEPTH, coordinate
                );
                continue;
            }
            let Some(model) = self.descriptor(&coordinate) else {
                continue;
            };

            let managed = &pending.request.managed;
            for child in build_transitive_requests(&model) {
                if pending.request.is_excluded(&child.coordinate) {
                    debug!("Excluding {} below {}", child.coordinate, coordinate);
                    continue;
                }
                if seen.contains(&child.coordinate.identity_key()) {
                    continue;
                }
                let child_scope = managed.scope(&child.coordinate).unwrap_or(child.scope);
                if !child_scope.is_propagated() {
                    debug!("Dropping {} below {}: managed scope {}", child.coordinate, coordinate, child_scope);
                    continue;
                }
                let pinned = managed.apply(&child.coordinate);
                if pinned != child.coordinate {
                    debug!("Managed version {} replaces {}", pinned, child.coordinate);
                }
                let mut exclusions: Vec<Exclusion> = pending.request.exclusions.clone();
                for exclusion in child.exclusions {
                    if !exclusions.contains(&exclusion) {
                        exclusions.push(exclusion);
                    }
                }
                let scope = mediate(pending.request.scope, child_scope);
                let mut chain = Vec::with_capacity(pending.chain.len() + 1);
                chain.push(coordinate.to_string());
                chain.extend(pending.chain.iter().cloned());
                queue.push_back(Pending {
                    request: DependencyRequest::new(pinned, scope)
                        .with_exclusions(exclusions)
                        .with_managed(Arc::clone(managed)),
                    chain,
                    depth: pending.depth + 1,
                });
            }
        }
        Ok(resolved)
    }

    fn resolve_descriptor(&self, coordinate: &Coordinate) -> Result<PathBuf> {
        self.fetcher.fetch(&coordinate.as_pom())
    }
}
