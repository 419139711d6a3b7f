//! `{{TOKEN}}` placeholder scanning and substitution.
//!
//! Tokens are matched case-insensitively with the charset `[A-Z0-9_]`,
//! optionally padded with whitespace inside the braces. Every name is
//! normalized to uppercase before lookup, so `{{supplier_name}}` and
//! `{{ SUPPLIER_NAME }}` refer to the same variable.
//!
//! Unknown tokens survive rendering as their normalized placeholder so that
//! unresolved fields stay visually distinct in a preview.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Matches `{{name}}`; capture group 1 is the raw name.
#[allow(clippy::expect_used)]
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("token pattern is a valid literal")
});

/// Example values keyed by normalized variable name.
///
/// Used for previews only; never persisted with a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleData(BTreeMap<String, String>);

impl SampleData {
    /// Creates an empty sample set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a sample set from a JSON object as sent by the persistence
    /// service. Keys are normalized; `null` becomes an empty string and
    /// numbers/booleans are rendered with their JSON text.
    #[must_use]
    pub fn from_json(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        let values = map
            .iter()
            .map(|(key, value)| (normalize(key), json_to_text(value)))
            .collect();
        Self(values)
    }

    /// Inserts a value under the normalized form of `name`.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(normalize(name), value.into());
    }

    /// Looks up a value by (any casing of) its variable name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&normalize(name)).map(String::as_str)
    }

    /// Returns the first non-blank value among `names`, in order.
    #[must_use]
    pub fn first_present(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .find(|value| !value.trim().is_empty())
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns `true` when no sample values are available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for SampleData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = Self::new();
        for (key, value) in iter {
            data.insert(key.as_ref(), value);
        }
        data
    }
}

/// Server-supplied metadata for known variables.
///
/// Defines which tokens the UI can offer; it does not restrict what a
/// template may contain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableCatalog(BTreeMap<String, serde_json::Value>);

impl VariableCatalog {
    /// Builds a catalog from the service's `available_variables` object.
    #[must_use]
    pub fn from_json(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        Self(
            map.iter()
                .map(|(key, meta)| (normalize(key), meta.clone()))
                .collect(),
        )
    }

    /// Returns `true` if `name` is a catalogued variable.
    #[must_use]
    pub fn knows(&self, name: &str) -> bool {
        self.0.contains_key(&normalize(name))
    }

    /// Catalogued variable names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Metadata for a catalogued variable.
    #[must_use]
    pub fn metadata(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(&normalize(name))
    }
}

/// Normalizes a variable name: strips surrounding braces and whitespace,
/// then uppercases.
#[must_use]
pub fn normalize(name: &str) -> String {
    name.trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim()
        .to_uppercase()
}

/// Returns the set of normalized variable names used in `text`.
#[must_use]
pub fn extract_tokens(text: &str) -> BTreeSet<String> {
    TOKEN_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|name| normalize(name.as_str()))
        .collect()
}

/// Union of the tokens used by a subject and a body.
#[must_use]
pub fn used_variables(subject: &str, body: &str) -> BTreeSet<String> {
    let mut used = extract_tokens(subject);
    used.extend(extract_tokens(body));
    used
}

/// Substitutes every known token in `text` with its sample value.
///
/// Tokens missing from `sample` are emitted as `{{NAME}}` (normalized
/// casing). Repeated tokens substitute uniformly.
#[must_use]
pub fn render(text: &str, sample: &SampleData) -> String {
    TOKEN_PATTERN
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .map(|m| normalize(m.as_str()))
                .unwrap_or_default();
            match sample.get(&name) {
                Some(value) => value.to_string(),
                None => placeholder(&name),
            }
        })
        .into_owned()
}

/// Lists placeholders still present in rendered text, first occurrence
/// first, without duplicates.
#[must_use]
pub fn detect_unresolved(rendered: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    TOKEN_PATTERN
        .captures_iter(rendered)
        .filter_map(|caps| caps.get(1))
        .map(|name| placeholder(&normalize(name.as_str())))
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

fn placeholder(name: &str) -> String {
    format!("{{{{{name}}}}}")
}

fn json_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
