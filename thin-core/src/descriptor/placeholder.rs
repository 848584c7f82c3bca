// thin-core/src/descriptor/placeholder.rs
use std::collections::HashSet;

use indexmap::IndexMap;

const PREFIX: &str = "${";
const SUFFIX: &str = "}";

/// Replaces `${name}` placeholders using `properties`.
///
/// Property values are expanded recursively. Unknown names, and names that refer back to
/// themselves, are left in place as literal text.
pub fn substitute(text: &str, properties: &IndexMap<String, String>) -> String {
    let mut visiting = HashSet::new();
    expand(text, properties, &mut visiting)
}

fn expand<'a>(
    text: &str,
    properties: &'a IndexMap<String, String>,
    visiting: &mut HashSet<&'a str>,
) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(PREFIX) {
        result.push_str(&rest[..start]);
        let after = &rest[start + PREFIX.len()..];
        let Some(end) = after.find(SUFFIX) else {
            // unterminated
            result.push_str(&rest[start..]);
            return result;
        };
        let name = &after[..end];
        match properties.get_key_value(name) {
            Some((key, value)) if !visiting.contains(key.as_str()) => {
                visiting.insert(key.as_str());
                result.push_str(&expand(value, properties, visiting));
                visiting.remove(key.as_str());
            }
            _ => {
                result.push_str(PREFIX);
                result.push_str(name);
                result.push_str(SUFFIX);
            }
        }
        rest = &after[end + SUFFIX.len()..];
    }
    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_known_and_keeps_unknown() {
        let p = props(&[("core.version", "2.3")]);
        assert_eq!(substitute("${core.version}", &p), "2.3");
        assert_eq!(substitute("v${core.version}-x", &p), "v2.3-x");
        assert_eq!(substitute("${missing}", &p), "${missing}");
        assert_eq!(substitute("1.0", &p), "1.0");
        assert_eq!(substitute("${core.version", &p), "${core.version");
    }

    #[test]
    fn expands_nested_values_and_survives_cycles() {
        let p = props(&[
            ("spring.version", "${project.version}"),
            ("project.version", "4.1.3"),
            ("a", "${b}"),
            ("b", "${a}"),
        ]);
        assert_eq!(substitute("${spring.version}", &p), "4.1.3");
        assert_eq!(substitute("${a}", &p), "${a}");
    }
}
