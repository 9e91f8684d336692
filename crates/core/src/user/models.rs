//! Concrete user and profile records.
//!
//! [`UserSchema`] describes the active user model: which field acts as its
//! username, which custom fields it carries beyond the built-in ones, which
//! fields live on the legacy profile, and which named actions it exposes.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::record::{FieldSet, TargetKind, UserRecord};

/// Label of the stock user model.
pub const DEFAULT_USER_MODEL: &str = "auth.User";

/// Fields every [`User`] carries.
pub const BUILTIN_FIELDS: &[&str] = &["username", "email", "first_name", "last_name"];

/// An action callable through attribute mapping. Returns whether it changed
/// the user.
pub type UserAction = fn(&mut User, &str) -> bool;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Description of the active user model.
#[derive(Debug, Clone)]
pub struct UserSchema {
    /// Model label, e.g. `auth.User`.
    pub label: String,
    /// Field the model declares as its username, if any.
    pub username_field: Option<String>,
    /// Extra string fields stored on the user itself.
    pub custom_fields: Vec<String>,
    /// Fields stored on the linked profile. Empty means no profile model.
    pub profile_fields: Vec<String>,
    actions: BTreeMap<String, UserAction>,
}

impl UserSchema {
    /// A model that declares no username field and no extras.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            username_field: None,
            custom_fields: Vec::new(),
            profile_fields: Vec::new(),
            actions: BTreeMap::new(),
        }
    }

    pub fn with_username_field(mut self, field: impl Into<String>) -> Self {
        self.username_field = Some(field.into());
        self
    }

    pub fn with_custom_field(mut self, field: impl Into<String>) -> Self {
        self.custom_fields.push(field.into());
        self
    }

    pub fn with_profile_field(mut self, field: impl Into<String>) -> Self {
        self.profile_fields.push(field.into());
        self
    }

    /// Register an action reachable from attribute mapping under `name`.
    pub fn with_action(mut self, name: impl Into<String>, action: UserAction) -> Self {
        self.actions.insert(name.into(), action);
        self
    }

    pub fn action(&self, name: &str) -> Option<UserAction> {
        self.actions.get(name).copied()
    }

    /// Whether `name` is a string field of users built from this schema.
    pub fn has_field(&self, name: &str) -> bool {
        BUILTIN_FIELDS.contains(&name) || self.custom_fields.iter().any(|f| f == name)
    }
}

impl Default for UserSchema {
    fn default() -> Self {
        Self::new(DEFAULT_USER_MODEL).with_username_field("username")
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Legacy profile record linked one-to-one with a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Profile {
    /// A profile with every declared field present and empty.
    pub fn with_fields(names: &[String]) -> Self {
        Self {
            fields: names.iter().map(|n| (n.clone(), String::new())).collect(),
        }
    }
}

impl FieldSet for Profile {
    fn field(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: &str) -> bool {
        match self.fields.get_mut(name) {
            Some(slot) => {
                *slot = value.to_string();
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A local user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Primary key; `None` until the user has been stored.
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Values of the schema's custom fields.
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(skip)]
    schema: Arc<UserSchema>,
}

fn default_true() -> bool {
    true
}

impl User {
    /// A new, unsaved user of the stock model.
    pub fn new(username: impl Into<String>) -> Self {
        Self::with_schema(Arc::new(UserSchema::default()), username)
    }

    /// A new, unsaved user of the given model.
    pub fn with_schema(schema: Arc<UserSchema>, username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
            custom: BTreeMap::new(),
            profile: None,
            schema,
        }
    }

    /// Rebind a deserialized user to the active model.
    pub fn attach_schema(&mut self, schema: Arc<UserSchema>) {
        self.schema = schema;
    }

    pub fn schema(&self) -> &UserSchema {
        &self.schema
    }

    /// The linked profile if it already exists, without creating one.
    pub fn get_profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }
}

impl FieldSet for User {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "username" => Some(self.username.clone()),
            "email" => Some(self.email.clone()),
            "first_name" => Some(self.first_name.clone()),
            "last_name" => Some(self.last_name.clone()),
            other if self.schema.custom_fields.iter().any(|f| f == other) => {
                Some(self.custom.get(other).cloned().unwrap_or_default())
            }
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: &str) -> bool {
        let slot = match name {
            "username" => &mut self.username,
            "email" => &mut self.email,
            "first_name" => &mut self.first_name,
            "last_name" => &mut self.last_name,
            other if self.schema.custom_fields.iter().any(|f| f == other) => {
                self.custom.entry(other.to_string()).or_default()
            }
            _ => return false,
        };
        *slot = value.to_string();
        true
    }
}

impl UserRecord for User {
    fn target_kind(&self, name: &str) -> TargetKind {
        if self.schema.action(name).is_some() {
            TargetKind::Action
        } else if self.has_field(name) {
            TargetKind::Field
        } else {
            TargetKind::Missing
        }
    }

    fn invoke(&mut self, name: &str, value: &str) -> bool {
        match self.schema.action(name) {
            Some(action) => action(self, value),
            None => false,
        }
    }

    fn profile_has_field(&self, name: &str) -> bool {
        self.schema.profile_fields.iter().any(|f| f == name)
    }

    fn profile_mut(&mut self) -> Option<&mut dyn FieldSet> {
        if self.schema.profile_fields.is_empty() {
            return None;
        }
        let fields = &self.schema.profile_fields;
        let profile = self.profile.get_or_insert_with(|| Profile::with_fields(fields));
        Some(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_first_name(user: &mut User, value: &str) -> bool {
        let changed = user.first_name != value;
        user.first_name = value.to_string();
        changed
    }

    #[test]
    fn test_builtin_fields() {
        let mut user = User::new("john");
        assert_eq!(user.field("username").as_deref(), Some("john"));
        assert!(user.set_field("email", "john@example.com"));
        assert_eq!(user.email, "john@example.com");
        assert!(!user.set_field("age", "22"));
        assert_eq!(user.field("id"), None);
    }

    #[test]
    fn test_custom_fields_follow_schema() {
        let schema = Arc::new(UserSchema::default().with_custom_field("age"));
        let mut user = User::with_schema(schema, "john");
        assert_eq!(user.field("age").as_deref(), Some(""));
        assert!(user.set_field("age", "22"));
        assert_eq!(user.custom["age"], "22");
    }

    #[test]
    fn test_action_takes_precedence_over_field() {
        let schema = Arc::new(UserSchema::default().with_action("first_name", set_first_name));
        let mut user = User::with_schema(schema, "john");
        assert_eq!(user.target_kind("first_name"), TargetKind::Action);
        assert_eq!(user.target_kind("email"), TargetKind::Field);
        assert_eq!(user.target_kind("nope"), TargetKind::Missing);
        assert!(user.invoke("first_name", "John"));
        assert!(!user.invoke("first_name", "John"));
    }

    #[test]
    fn test_profile_created_lazily() {
        let schema = Arc::new(UserSchema::default().with_profile_field("age"));
        let mut user = User::with_schema(schema, "john");
        assert!(user.get_profile().is_none());
        let profile = user.profile_mut().expect("profile model configured");
        assert!(profile.set_field("age", "22"));
        assert!(!profile.set_field("shoe_size", "44"));
        assert_eq!(user.get_profile().unwrap().fields["age"], "22");
    }

    #[test]
    fn test_profile_has_field_does_not_create() {
        let schema = Arc::new(UserSchema::default().with_profile_field("age"));
        let user = User::with_schema(schema, "john");
        assert!(user.profile_has_field("age"));
        assert!(!user.profile_has_field("shoe_size"));
        assert!(user.get_profile().is_none());
    }

    #[test]
    fn test_no_profile_model() {
        let mut user = User::new("john");
        assert!(user.profile_mut().is_none());
        assert!(user.profile.is_none());
    }

    #[test]
    fn test_deserialize_defaults() {
        let user: User = serde_json::from_str(r#"{"username": "john"}"#).unwrap();
        assert_eq!(user.id, None);
        assert!(user.is_active);
        assert_eq!(user.schema().label, DEFAULT_USER_MODEL);
    }
}
