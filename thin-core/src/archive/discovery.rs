// thin-core/src/archive/discovery.rs
//! Finds `<name>.properties` descriptors inside a package and in extra locations.
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use thin_common::error::Result;
use tracing::debug;

use super::Archive;
use crate::properties::{parse_properties, ThinProperties};

/// Every place a descriptor called `file_name` is looked up, in increasing precedence.
fn candidates(archive: &Archive, file_name: &str, locations: &[String]) -> Vec<Candidate> {
    let mut found = vec![
        Candidate::Entry(format!("META-INF/{file_name}")),
        Candidate::Entry(file_name.to_string()),
    ];
    for location in locations {
        let (scope, base) = normalize_location(location);
        let join = |suffix: &str| {
            if base.is_empty() {
                suffix.to_string()
            } else {
                format!("{base}/{suffix}")
            }
        };
        for relative in [join(&format!("META-INF/{file_name}")), join(file_name)] {
            let in_archive = match scope {
                LocationScope::Archive => true,
                LocationScope::Disk => false,
                LocationScope::Either => !Path::new(&base).is_absolute(),
            };
            if in_archive {
                let entry = relative.trim_start_matches("./").trim_start_matches('/');
                found.push(Candidate::Entry(entry.to_string()));
            }
            if scope != LocationScope::Archive {
                found.push(Candidate::File(relative));
            }
        }
    }
    let mut unique = Vec::new();
    for candidate in found {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    unique.retain(|c| match c {
        Candidate::Entry(name) => archive.has_entry(name),
        Candidate::File(path) => Path::new(path).is_file(),
    });
    unique
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Candidate {
    Entry(String),
    File(String),
}

/// Where a location is searched: `classpath:` inside the package, `file:` on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocationScope {
    Archive,
    Disk,
    Either,
}

fn normalize_location(location: &str) -> (LocationScope, String) {
    let location = location.trim();
    let (scope, location) = if let Some(rest) = location.strip_prefix("classpath:") {
        (LocationScope::Archive, rest)
    } else if let Some(rest) = location.strip_prefix("file:") {
        (LocationScope::Disk, rest)
    } else {
        (LocationScope::Either, location)
    };
    let base = if location.starts_with("//") {
        // file:///abs/path
        format!("/{}", location.trim_start_matches('/'))
    } else if scope == LocationScope::Archive {
        location.trim_start_matches('/').to_string()
    } else {
        location.to_string()
    };
    let base = match base.trim_end_matches('/') {
        "" if base.starts_with('/') => "/".to_string(),
        trimmed => trimmed.to_string(),
    };
    (scope, base)
}

/// Reads and merges every `<name>.properties` found for `archive`.
///
/// Later locations override keys of earlier ones. Returns `None` when nothing was found.
pub fn find_properties(
    archive: &Archive,
    name: &str,
    locations: &[String],
) -> Result<Option<ThinProperties>> {
    let file_name = format!("{name}.properties");
    let mut merged: IndexMap<String, String> = IndexMap::new();
    let mut sources = Vec::new();
    for candidate in candidates(archive, &file_name, locations) {
        let (location, text) = match candidate {
            Candidate::Entry(entry) => {
                let Some(bytes) = archive.read_entry(&entry)? else {
                    continue;
                };
                (archive.describe(&entry), String::from_utf8_lossy(&bytes).into_owned())
            }
            Candidate::File(path) => (path.clone(), fs::read_to_string(&path)?),
        };
        debug!("Found descriptor {}", location);
        for (key, value) in parse_properties(&text) {
            merged.insert(key, value);
        }
        sources.push(location);
    }
    if sources.is_empty() {
        debug!("No {} for {}", file_name, archive.path().display());
        return Ok(None);
    }
    ThinProperties::from_entries(&sources.join(","), &merged).map(Some)
}
