// thin-core/src/properties.rs
//! `<name>[-<profile>].properties` descriptors and the generated (computed) variant.
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thin_common::error::{Result, ThinError};
use thin_common::model::{Coordinate, DependencyRequest, Exclusion, ResolvedArtifact, Scope};
use tracing::debug;

const DEPENDENCIES_PREFIX: &str = "dependencies.";
const BOMS_PREFIX: &str = "boms.";
const EXCLUSIONS_PREFIX: &str = "exclusions.";
const LINE_PREFIX: &str = "line";
const COMPUTED_KEY: &str = "computed";

/// Parses Java properties text, keeping the order of first appearance.
pub fn parse_properties(text: &str) -> IndexMap<String, String> {
    let mut entries = IndexMap::new();
    let mut lines = text.lines();
    while let Some(first) = lines.next() {
        let trimmed = first.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        let mut logical = String::new();
        let mut current = trimmed.to_string();
        while ends_with_continuation(&current) {
            current.pop();
            logical.push_str(&current);
            match lines.next() {
                Some(next) => current = next.trim_start().to_string(),
                None => {
                    current.clear();
                    break;
                }
            }
        }
        logical.push_str(&current);
        let (key, value) = split_entry(&logical);
        entries.insert(unescape(key), unescape(value));
    }
    entries
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..i], line[i + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[i..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (&line[..i], rest.trim_start());
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Interpreted thin properties descriptor.
#[derive(Debug, Clone, Default)]
pub struct ThinProperties {
    pub location: String,
    /// The listed dependencies are a complete, already closed set.
    pub computed: bool,
    pub dependencies: Vec<DependencyRequest>,
    pub boms: Vec<Coordinate>,
    pub exclusions: Vec<Exclusion>,
}

impl ThinProperties {
    pub fn parse(location: &str, text: &str) -> Result<Self> {
        Self::from_entries(location, &parse_properties(text))
    }

    pub fn from_entries(location: &str, entries: &IndexMap<String, String>) -> Result<Self> {
        let malformed = |e: ThinError| ThinError::MalformedDescriptor(location.to_string(), e.to_string());
        let computed = entries
            .get(COMPUTED_KEY)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

        let mut dependencies = Vec::new();
        let mut boms = Vec::new();
        let mut exclusions = Vec::new();
        let mut lines: Vec<(u64, &str)> = Vec::new();

        for (key, value) in entries {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            if key.starts_with(DEPENDENCIES_PREFIX) {
                let coordinate = Coordinate::parse(value).map_err(malformed)?;
                let mut request = DependencyRequest::new(coordinate, Scope::Compile);
                if computed {
                    request = request.intransitive();
                }
                dependencies.push(request);
            } else if key.starts_with(BOMS_PREFIX) {
                boms.push(Coordinate::parse(value).map_err(malformed)?.as_pom());
            } else if key.starts_with(EXCLUSIONS_PREFIX) {
                exclusions.push(value.parse::<Exclusion>().map_err(malformed)?);
            } else if let Some(index) = key
                .strip_prefix(LINE_PREFIX)
                .and_then(|n| n.parse::<u64>().ok())
            {
                lines.push((index, value));
            }
        }

        lines.sort_by_key(|(index, _)| *index);
        for (_, line) in lines {
            let mut request = parse_line(line).map_err(malformed)?;
            if computed {
                request = request.intransitive();
            }
            dependencies.push(request);
        }

        debug!(
            "Read {} ({} dependencies, {} boms, computed={})",
            location,
            dependencies.len(),
            boms.len(),
            computed
        );
        Ok(Self {
            location: location.to_string(),
            computed,
            dependencies,
            boms,
            exclusions,
        })
    }
}

/// `group:artifact:version:scope` or `group:artifact:type:classifier:version:scope`.
fn parse_line(line: &str) -> Result<DependencyRequest> {
    let parts: Vec<&str> = line.split(':').map(str::trim).collect();
    let (coordinate, scope) = match parts.as_slice() {
        [g, a, v, s] => (Coordinate::full(*g, *a, None, None, Some(*v)), *s),
        [g, a, t, c, v, s] => (Coordinate::full(*g, *a, Some(*c), Some(*t), Some(*v)), *s),
        _ => {
            return Err(ThinError::InvalidCoordinate(
                line.to_string(),
                "expected group:artifact:version:scope".to_string(),
            ))
        }
    };
    if coordinate.group().is_empty() || coordinate.artifact().is_empty() {
        return Err(ThinError::InvalidCoordinate(
            line.to_string(),
            "group and artifact must not be empty".to_string(),
        ));
    }
    Ok(DependencyRequest::new(coordinate, Scope::from_optional(Some(scope))?))
}

/// Writes the generated properties artifact for an application.
pub struct PropertiesWriter<'a> {
    project: &'a Coordinate,
}

impl<'a> PropertiesWriter<'a> {
    pub fn new(project: &'a Coordinate) -> Self {
        Self { project }
    }

    pub fn render<'b, I>(&self, artifacts: I) -> String
    where
        I: IntoIterator<Item = &'b ResolvedArtifact>,
    {
        let mut out = String::new();
        out.push_str("# Generated by thin, do not edit\n");
        let _ = writeln!(out, "{COMPUTED_KEY}=true");
        let _ = writeln!(out, "project.groupId={}", self.project.group());
        let _ = writeln!(out, "project.artifactId={}", self.project.artifact());
        if let Some(version) = self.project.version() {
            let _ = writeln!(out, "project.version={version}");
        }
        for (index, artifact) in artifacts.into_iter().enumerate() {
            let _ = writeln!(out, "{LINE_PREFIX}{}={}", index + 1, format_line(artifact));
        }
        out
    }

    /// Writes `META-INF/<name>.properties` below `output_dir` and returns its path.
    pub fn write<'b, I>(&self, output_dir: &Path, name: &str, artifacts: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = &'b ResolvedArtifact>,
    {
        let target = output_dir.join("META-INF").join(format!("{name}.properties"));
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, self.render(artifacts))?;
        debug!("Wrote generated properties to {}", target.display());
        Ok(target)
    }
}

fn format_line(artifact: &ResolvedArtifact) -> String {
    let c = &artifact.coordinate;
    let version = c.version().unwrap_or_default();
    if c.classifier().is_empty() && c.kind() == "jar" {
        format!("{}:{}:{}:{}", c.group(), c.artifact(), version, artifact.scope)
    } else {
        format!(
            "{}:{}:{}:{}:{}:{}",
            c.group(),
            c.artifact(),
            c.kind(),
            c.classifier(),
            version,
            artifact.scope
        )
    }
}
