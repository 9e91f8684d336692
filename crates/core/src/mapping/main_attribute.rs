//! Resolution of the main attribute: the user field that identifies a user
//! uniquely when looking them up after authentication.
//!
//! Precedence:
//! 1. `backend.main_attribute` override
//! 2. the active user model's declared username field
//! 3. [`DEFAULT_MAIN_ATTRIBUTE`]

use std::fmt;

use tracing::debug;

use crate::config::BackendConfig;
use crate::user::UserSchema;

/// Fallback main attribute when nothing else is configured.
pub const DEFAULT_MAIN_ATTRIBUTE: &str = "username";

/// Comparison used when matching the main attribute against stored users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lookup {
    #[default]
    Exact,
    /// Case-insensitive equality.
    IExact,
}

impl Lookup {
    /// Parse a lookup suffix such as `__iexact`. The empty string means
    /// exact matching. Unknown suffixes yield `None`.
    pub fn parse(suffix: &str) -> Option<Self> {
        match suffix {
            "" | "__exact" => Some(Self::Exact),
            "__iexact" => Some(Self::IExact),
            _ => None,
        }
    }

    pub fn matches(self, stored: &str, candidate: &str) -> bool {
        match self {
            Self::Exact => stored == candidate,
            Self::IExact => stored.to_lowercase() == candidate.to_lowercase(),
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "__exact"),
            Self::IExact => write!(f, "__iexact"),
        }
    }
}

/// Resolves the main attribute and its lookup suffix for one deployment.
#[derive(Debug, Clone, Copy)]
pub struct MainAttributeResolver<'a> {
    config: &'a BackendConfig,
    schema: &'a UserSchema,
}

impl<'a> MainAttributeResolver<'a> {
    pub fn new(config: &'a BackendConfig, schema: &'a UserSchema) -> Self {
        Self { config, schema }
    }

    pub fn get_main_attribute(&self) -> String {
        if let Some(ref field) = self.config.main_attribute {
            debug!(field = %field, "main attribute from override");
            return field.clone();
        }
        if let Some(ref field) = self.schema.username_field {
            debug!(field = %field, model = %self.schema.label, "main attribute from user model");
            return field.clone();
        }
        DEFAULT_MAIN_ATTRIBUTE.to_string()
    }

    /// The configured lookup suffix, or `""`.
    pub fn get_main_attribute_lookup(&self) -> String {
        self.config.main_attribute_lookup.clone().unwrap_or_default()
    }

    /// Parsed form of [`get_main_attribute_lookup`](Self::get_main_attribute_lookup).
    /// Unknown suffixes fall back to exact matching; configuration
    /// validation rejects them before they get here.
    pub fn lookup(&self) -> Lookup {
        Lookup::parse(&self.get_main_attribute_lookup()).unwrap_or_default()
    }

    /// The lookup expression a query layer would use, e.g. `email__iexact`.
    pub fn lookup_expression(&self) -> String {
        format!("{}{}", self.get_main_attribute(), self.get_main_attribute_lookup())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_attribute_from_user_model() {
        let config = BackendConfig::default();
        let schema = UserSchema::default().with_username_field("slug");
        let resolver = MainAttributeResolver::new(&config, &schema);
        assert_eq!(resolver.get_main_attribute(), "slug");
    }

    #[test]
    fn test_main_attribute_stock_model() {
        let config = BackendConfig::default();
        let schema = UserSchema::default();
        let resolver = MainAttributeResolver::new(&config, &schema);
        assert_eq!(resolver.get_main_attribute(), "username");
    }

    #[test]
    fn test_main_attribute_model_without_username_field() {
        let config = BackendConfig::default();
        let schema = UserSchema::new("testprofiles.StandaloneUserModel");
        let resolver = MainAttributeResolver::new(&config, &schema);
        assert_eq!(resolver.get_main_attribute(), DEFAULT_MAIN_ATTRIBUTE);
    }

    #[test]
    fn test_main_attribute_override_wins() {
        let config = BackendConfig {
            main_attribute: Some("foo".into()),
            ..Default::default()
        };
        let schema = UserSchema::default().with_username_field("slug");
        let resolver = MainAttributeResolver::new(&config, &schema);
        assert_eq!(resolver.get_main_attribute(), "foo");
    }

    #[test]
    fn test_main_attribute_lookup() {
        let schema = UserSchema::default();
        let config = BackendConfig::default();
        let resolver = MainAttributeResolver::new(&config, &schema);
        assert_eq!(resolver.get_main_attribute_lookup(), "");
        assert_eq!(resolver.lookup(), Lookup::Exact);

        let config = BackendConfig {
            main_attribute_lookup: Some("__iexact".into()),
            ..Default::default()
        };
        let resolver = MainAttributeResolver::new(&config, &schema);
        assert_eq!(resolver.get_main_attribute_lookup(), "__iexact");
        assert_eq!(resolver.lookup(), Lookup::IExact);
        assert_eq!(resolver.lookup_expression(), "username__iexact");
    }

    #[test]
    fn test_lookup_matching() {
        assert!(Lookup::Exact.matches("john", "john"));
        assert!(!Lookup::Exact.matches("John", "john"));
        assert!(Lookup::IExact.matches("John", "jOHN"));
        assert_eq!(Lookup::parse("__regex"), None);
        assert_eq!(Lookup::IExact.to_string(), "__iexact");
    }
}
