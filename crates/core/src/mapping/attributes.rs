//! Attribute mapping tables and asserted attribute sets.
//!
//! Both are string-keyed maps onto string lists. In TOML or JSON a mapping
//! target may be written as a single string or as a list:
//!
//! ```toml
//! [attribute_mapping]
//! uid = "username"
//! mail = ["email"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::errors::MappingError;

// ---------------------------------------------------------------------------
// Attribute mapping
// ---------------------------------------------------------------------------

/// Asserted-attribute name -> ordered local target names.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AttributeMapping(BTreeMap<String, Vec<String>>);

#[derive(Deserialize)]
#[serde(untagged)]
enum Targets {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for AttributeMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Targets>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter()
                .map(|(name, targets)| match targets {
                    Targets::One(t) => (name, vec![t]),
                    Targets::Many(ts) => (name, ts),
                })
                .collect(),
        ))
    }
}

impl AttributeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `attribute` onto `targets`, replacing any previous entry.
    pub fn insert<I, S>(&mut self, attribute: impl Into<String>, targets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(attribute.into(), targets.into_iter().map(Into::into).collect());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<I, S>(mut self, attribute: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(attribute, targets);
        self
    }

    /// Target names for `attribute`; empty if unmapped.
    pub fn targets(&self, attribute: &str) -> &[String] {
        self.0.get(attribute).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first asserted attribute that maps onto `target`.
    pub fn attribute_for_target(&self, target: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, targets)| targets.iter().any(|t| t == target))
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Asserted attributes
// ---------------------------------------------------------------------------

/// Asserted-attribute name -> values released by the identity provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AssertedAttributes(BTreeMap<String, Vec<String>>);

impl AssertedAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I, S>(&mut self, attribute: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(attribute.into(), values.into_iter().map(Into::into).collect());
    }

    pub fn with<I, S>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(attribute, values);
        self
    }

    /// The value that mapping uses: the first one. `None` when the attribute
    /// is absent or was asserted with no values.
    pub fn first_value(&self, attribute: &str) -> Option<&str> {
        self.0
            .get(attribute)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Load an attribute set from a JSON object of string lists.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, MappingError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading asserted attributes");

        if !path.exists() {
            return Err(MappingError::FileError {
                path: path.display().to_string(),
                detail: "file not found".into(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let attributes: Self = serde_json::from_str(&contents)
            .map_err(|e| MappingError::ParseError(e.to_string()))?;

        debug!(count = attributes.len(), "loaded asserted attributes");
        Ok(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_accepts_string_or_list() {
        let toml_str = r#"
uid = "username"
mail = ["email"]
cn = ["first_name", "display_name"]
"#;
        let mapping: AttributeMapping = toml::from_str(toml_str).unwrap();
        assert_eq!(mapping.targets("uid"), ["username"]);
        assert_eq!(mapping.targets("mail"), ["email"]);
        assert_eq!(mapping.targets("cn"), ["first_name", "display_name"]);
        assert!(mapping.targets("sn").is_empty());
    }

    #[test]
    fn test_attribute_for_target() {
        let mapping = AttributeMapping::new()
            .with("uid", ["username"])
            .with("mail", ["email", "username_alt"]);
        assert_eq!(mapping.attribute_for_target("username"), Some("uid"));
        assert_eq!(mapping.attribute_for_target("username_alt"), Some("mail"));
        assert_eq!(mapping.attribute_for_target("slug"), None);
    }

    #[test]
    fn test_first_value() {
        let attributes = AssertedAttributes::new()
            .with("mail", ["john@example.com", "jd@example.com"])
            .with("sn", Vec::<String>::new());
        assert_eq!(attributes.first_value("mail"), Some("john@example.com"));
        assert_eq!(attributes.first_value("sn"), None);
        assert_eq!(attributes.first_value("cn"), None);
        assert_eq!(attributes.len(), 2);
    }

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attributes.json");
        std::fs::write(&path, r#"{"uid": ["john"], "sn": []}"#).unwrap();

        let attributes = AssertedAttributes::load_json(&path).unwrap();
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes.first_value("uid"), Some("john"));
    }

    #[test]
    fn test_load_json_nonexistent() {
        let result = AssertedAttributes::load_json("/nonexistent/attributes.json");
        assert!(matches!(result, Err(MappingError::FileError { .. })));
    }

    #[test]
    fn test_load_json_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attributes.json");
        std::fs::write(&path, r#"{"uid": "john"}"#).unwrap();

        let result = AssertedAttributes::load_json(&path);
        assert!(matches!(result, Err(MappingError::ParseError(_))));
    }
}
