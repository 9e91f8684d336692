//! TOML-based configuration system for SAML2Map.
//!
//! Main-attribute overrides may also be supplied through the environment
//! variables [`ENV_MAIN_ATTRIBUTE`] and [`ENV_MAIN_ATTRIBUTE_LOOKUP`], which
//! take precedence over the file once [`AppConfig::resolve_env_vars`] runs.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;
use crate::mapping::{AttributeMapping, Lookup, MainAttributeResolver};
use crate::user::models::DEFAULT_USER_MODEL;
use crate::user::UserSchema;

/// Environment override for `backend.main_attribute`.
pub const ENV_MAIN_ATTRIBUTE: &str = "SAML2MAP_MAIN_ATTRIBUTE";
/// Environment override for `backend.main_attribute_lookup`.
pub const ENV_MAIN_ATTRIBUTE_LOOKUP: &str = "SAML2MAP_MAIN_ATTRIBUTE_LOOKUP";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Authentication backend behaviour.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Description of the active user model.
    #[serde(default)]
    pub user_model: UserModelConfig,

    /// Asserted attribute name -> local target names.
    #[serde(default)]
    pub attribute_mapping: AttributeMapping,
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Per-deployment backend overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Field that identifies users, overriding the user model's own.
    #[serde(default)]
    pub main_attribute: Option<String>,

    /// Lookup suffix used when matching the main attribute (e.g. `__iexact`).
    #[serde(default)]
    pub main_attribute_lookup: Option<String>,

    /// Create a local user when no existing one matches (default true).
    #[serde(default = "default_true")]
    pub create_unknown_user: bool,

    /// Write targets missing on the user to its linked profile instead.
    #[serde(default)]
    pub legacy_profiles: bool,
}

fn default_true() -> bool {
    true
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            main_attribute: None,
            main_attribute_lookup: None,
            create_unknown_user: true,
            legacy_profiles: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// User model
// ---------------------------------------------------------------------------

/// The user model as declared in configuration.
///
/// When the whole section is omitted the stock model is assumed, which
/// declares `username` as its username field. A section that omits
/// `username_field` describes a model that declares none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserModelConfig {
    #[serde(default = "default_user_model")]
    pub label: String,

    #[serde(default)]
    pub username_field: Option<String>,

    /// Extra string fields on the user.
    #[serde(default)]
    pub custom_fields: Vec<String>,

    /// Fields on the legacy profile record.
    #[serde(default)]
    pub profile_fields: Vec<String>,
}

fn default_user_model() -> String {
    DEFAULT_USER_MODEL.into()
}

impl Default for UserModelConfig {
    fn default() -> Self {
        Self {
            label: default_user_model(),
            username_field: Some("username".into()),
            custom_fields: Vec::new(),
            profile_fields: Vec::new(),
        }
    }
}

impl UserModelConfig {
    /// Build the schema this section describes. Actions can only be
    /// registered from code.
    pub fn to_schema(&self) -> UserSchema {
        let mut schema = UserSchema::new(self.label.clone());
        schema.username_field = self.username_field.clone();
        schema.custom_fields = self.custom_fields.clone();
        schema.profile_fields = self.profile_fields.clone();
        schema
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** apply environment overrides -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!(
            mappings = config.attribute_mapping.len(),
            "configuration parsed successfully"
        );
        Ok(config)
    }

    /// Apply the main-attribute environment overrides.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = resolve_optional_env(ENV_MAIN_ATTRIBUTE, "backend.main_attribute") {
            self.backend.main_attribute = Some(value);
        }
        if let Some(value) =
            resolve_optional_env(ENV_MAIN_ATTRIBUTE_LOOKUP, "backend.main_attribute_lookup")
        {
            self.backend.main_attribute_lookup = Some(value);
        }
        Ok(())
    }

    /// Validate that all values are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref suffix) = self.backend.main_attribute_lookup {
            if Lookup::parse(suffix).is_none() {
                return Err(ConfigError::InvalidValue {
                    field: "backend.main_attribute_lookup".into(),
                    detail: format!("unsupported lookup '{}'", suffix),
                });
            }
        }

        let schema = self.user_model.to_schema();
        let main = MainAttributeResolver::new(&self.backend, &schema).get_main_attribute();
        if main.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "backend.main_attribute".into(),
                detail: "main attribute must not be empty".into(),
            });
        }
        if !schema.has_field(&main) {
            return Err(ConfigError::InvalidValue {
                field: "backend.main_attribute".into(),
                detail: format!("'{}' is not a field of user model '{}'", main, schema.label),
            });
        }

        if self.backend.legacy_profiles && self.user_model.profile_fields.is_empty() {
            warn!("legacy_profiles enabled but the user model declares no profile fields");
        }

        for (attribute, targets) in self.attribute_mapping.iter() {
            if targets.is_empty() || targets.iter().any(String::is_empty) {
                return Err(ConfigError::InvalidValue {
                    field: format!("attribute_mapping.{}", attribute),
                    detail: "target names must not be empty".into(),
                });
            }
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

/// Read an environment override by name. Unset means no override; set but
/// empty is ignored with a warning.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "applied env override");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[backend]
main_attribute = "email"
main_attribute_lookup = "__iexact"
create_unknown_user = false
legacy_profiles = true

[logging]
level = "debug"

[user_model]
label = "testprofiles.TestUser"
username_field = "username"
custom_fields = ["age"]
profile_fields = ["age"]

[attribute_mapping]
uid = ["username"]
mail = ["email"]
cn = "first_name"
sn = ["last_name"]
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.backend.main_attribute.as_deref(), Some("email"));
        assert_eq!(config.backend.main_attribute_lookup.as_deref(), Some("__iexact"));
        assert!(!config.backend.create_unknown_user);
        assert!(config.backend.legacy_profiles);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.user_model.custom_fields, vec!["age"]);
        assert_eq!(config.attribute_mapping.targets("cn"), ["first_name"]);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.attribute_mapping.len(), 4);
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.backend.main_attribute, None);
        assert_eq!(config.backend.main_attribute_lookup, None);
        assert!(config.backend.create_unknown_user);
        assert!(!config.backend.legacy_profiles);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.user_model.label, DEFAULT_USER_MODEL);
        assert_eq!(config.user_model.username_field.as_deref(), Some("username"));
        assert!(config.attribute_mapping.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_user_model_section_without_username_field() {
        let config: AppConfig = toml::from_str(
            r#"
[user_model]
label = "testprofiles.StandaloneUserModel"
"#,
        )
        .unwrap();
        let schema = config.user_model.to_schema();
        assert_eq!(schema.username_field, None);
        let resolver = MainAttributeResolver::new(&config.backend, &schema);
        assert_eq!(resolver.get_main_attribute(), "username");
    }

    #[test]
    fn test_validate_rejects_unknown_lookup() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.backend.main_attribute_lookup = Some("__regex".into());
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "backend.main_attribute_lookup"
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_main_attribute() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.backend.main_attribute = Some("slug".into());
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "backend.main_attribute"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_target() {
        let config: AppConfig = toml::from_str(
            r#"
[attribute_mapping]
uid = [""]
"#,
        )
        .unwrap();
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "attribute_mapping.uid"
        ));
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var(ENV_MAIN_ATTRIBUTE, "email");
        std::env::set_var(ENV_MAIN_ATTRIBUTE_LOOKUP, "__iexact");

        let mut config = AppConfig::default();
        config.resolve_env_vars().unwrap();

        assert_eq!(config.backend.main_attribute.as_deref(), Some("email"));
        assert_eq!(config.backend.main_attribute_lookup.as_deref(), Some("__iexact"));

        // Clean up
        std::env::remove_var(ENV_MAIN_ATTRIBUTE);
        std::env::remove_var(ENV_MAIN_ATTRIBUTE_LOOKUP);
    }
}
