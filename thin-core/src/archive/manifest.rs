// thin-core/src/archive/manifest.rs
use indexmap::IndexMap;

/// Main section of a `META-INF/MANIFEST.MF`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    attributes: IndexMap<String, String>,
}

impl Manifest {
    /// Reads `Name: value` pairs up to the first blank line. Lines starting with a single
    /// space continue the previous value.
    pub fn parse(text: &str) -> Self {
        let mut attributes: IndexMap<String, String> = IndexMap::new();
        let mut last: Option<String> = None;
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                break;
            }
            if let Some(continued) = line.strip_prefix(' ') {
                if let Some(value) = last.as_ref().and_then(|k| attributes.get_mut(k)) {
                    value.push_str(continued);
                }
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                let name = name.trim().to_string();
                attributes.insert(name.clone(), value.trim_start().to_string());
                last = Some(name);
            }
        }
        Self { attributes }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}
