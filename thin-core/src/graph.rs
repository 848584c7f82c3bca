// thin-core/src/graph.rs
//! Turns a flattened descriptor into the ordered list of requests handed to the resolver.
use thin_common::model::{DependencyRequest, Scope};
use tracing::debug;

use crate::descriptor::{DeclaredDependency, DescriptorModel};

/// Requests for the descriptor's own (direct) dependencies.
pub fn build_requests(model: &DescriptorModel) -> Vec<DependencyRequest> {
    collect(model, false)
}

/// Requests used when expanding an artifact found on the way: optional ones are dropped.
pub fn build_transitive_requests(model: &DescriptorModel) -> Vec<DependencyRequest> {
    collect(model, true)
}

fn collect(model: &DescriptorModel, skip_optional: bool) -> Vec<DependencyRequest> {
    model
        .dependencies
        .iter()
        .filter_map(|dependency| request_for(model, dependency, skip_optional))
        .collect()
}

fn request_for(
    model: &DescriptorModel,
    dependency: &DeclaredDependency,
    skip_optional: bool,
) -> Option<DependencyRequest> {
    let managed = model.managed(&dependency.coordinate.identity_key());
    let scope = dependency
        .scope
        .or_else(|| managed.and_then(|m| m.scope))
        .unwrap_or_default();
    if !scope.is_propagated() || scope == Scope::Import {
        debug!(
            "Dropping {} from {}: scope {}",
            dependency.coordinate, model.location, scope
        );
        return None;
    }
    if skip_optional && dependency.optional {
        debug!(
            "Dropping optional {} from {}",
            dependency.coordinate, model.location
        );
        return None;
    }

    // declared version wins over managed
    let coordinate = match (dependency.coordinate.version(), managed) {
        (Some(_), _) => dependency.coordinate.clone(),
        (None, Some(m)) => match m.coordinate.version() {
            Some(version) => dependency.coordinate.with_version(version),
            None => dependency.coordinate.clone(),
        },
        (None, None) => dependency.coordinate.clone(),
    };

    let mut exclusions = dependency.exclusions.clone();
    if let Some(m) = managed {
        for exclusion in &m.exclusions {
            if !exclusions.contains(exclusion) {
                exclusions.push(exclusion.clone());
            }
        }
    }

    let mut request = DependencyRequest::new(coordinate, scope).with_exclusions(exclusions);
    request.optional = dependency.optional;
    Some(request)
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use thin_common::model::{Coordinate, Exclusion};

    use super::*;
    use crate::descriptor::ManagedDependency;

    fn declared(coordinate: &str, scope: Option<Scope>) -> DeclaredDependency {
        DeclaredDependency {
            coordinate: Coordinate::parse(coordinate).unwrap(),
            scope,
            optional: false,
            exclusions: Vec::new(),
        }
    }

    fn managed(coordinate: &str, scope: Option<Scope>) -> ManagedDependency {
        ManagedDependency {
            coordinate: Coordinate::parse(coordinate).unwrap(),
            scope,
            exclusions: vec![Exclusion::new("noise", "*")],
        }
    }

    fn model(dependencies: Vec<DeclaredDependency>, table: Vec<ManagedDependency>) -> DescriptorModel {
        let management: IndexMap<_, _> = table
            .into_iter()
            .map(|m| (m.coordinate.identity_key(), m))
            .collect();
        DescriptorModel {
            location: "test".to_string(),
            group: "g".to_string(),
            artifact: "a".to_string(),
            dependencies,
            management,
            ..Default::default()
        }
    }

    #[test]
    fn drops_test_and_provided() {
        let m = model(
            vec![
                declared("g:kept:1", None),
                declared("g:test:1", Some(Scope::Test)),
                declared("g:provided:1", Some(Scope::Provided)),
                declared("g:runtime:1", Some(Scope::Runtime)),
                declared("g:managed-test", None),
            ],
            vec![managed("g:managed-test:2", Some(Scope::Test))],
        );
        let names: Vec<_> = build_requests(&m)
            .iter()
            .map(|r| r.coordinate.artifact().to_string())
            .collect();
        assert_eq!(names, vec!["kept", "runtime"]);
    }

    #[test]
    fn fills_missing_versions_from_management() {
        let m = model(
            vec![declared("g:lib", None), declared("g:pinned:1.0", None)],
            vec![managed("g:lib:2.0", None), managed("g:pinned:9.9", None)],
        );
        let requests = build_requests(&m);
        assert_eq!(requests[0].coordinate.version(), Some("2.0"));
        assert_eq!(requests[0].exclusions, vec![Exclusion::new("noise", "*")]);
        assert_eq!(requests[1].coordinate.version(), Some("1.0"));
    }

    #[test]
    fn exclusions_stay_on_their_own_request() {
        let mut x = declared("g:x:1", None);
        x.exclusions.push(Exclusion::new("g", "shared"));
        let m = model(vec![x, declared("g:y:1", None)], Vec::new());
        let requests = build_requests(&m);
        assert_eq!(requests[0].exclusions.len(), 1);
        assert!(requests[1].exclusions.is_empty());
    }

    #[test]
    fn transitive_requests_skip_optional() {
        let mut optional = declared("g:opt:1", None);
        optional.optional = true;
        let m = model(vec![optional, declared("g:req:1", None)], Vec::new());
        assert_eq!(build_requests(&m).len(), 2);
        let transitive = build_transitive_requests(&m);
        assert_eq!(transitive.len(), 1);
        assert_eq!(transitive[0].coordinate.artifact(), "req");
    }
}
