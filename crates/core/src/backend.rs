//! SAML authentication backend.
//!
//! [`Saml2Backend`] ties the pieces together for one deployment: given the
//! attributes asserted for an authentication event, it finds the matching
//! local user by main attribute, optionally creates it, and brings its fields
//! up to date. Assertion parsing and signature checks happen before this
//! point and are not handled here.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{AppConfig, BackendConfig};
use crate::errors::BackendError;
use crate::mapping::{
    AssertedAttributes, AttributeMapping, AttributeMappingUpdater, MainAttributeResolver,
};
use crate::store::UserStore;
use crate::user::{FieldSet, User, UserRecord, UserSchema};

/// Authentication backend for one deployment.
#[derive(Debug, Clone)]
pub struct Saml2Backend {
    config: BackendConfig,
    mapping: AttributeMapping,
    schema: Arc<UserSchema>,
}

impl Saml2Backend {
    pub fn new(config: BackendConfig, mapping: AttributeMapping, schema: Arc<UserSchema>) -> Self {
        Self {
            config,
            mapping,
            schema,
        }
    }

    /// Build a backend from a loaded [`AppConfig`].
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.backend.clone(),
            config.attribute_mapping.clone(),
            Arc::new(config.user_model.to_schema()),
        )
    }

    /// Replace the user model, e.g. to register actions.
    pub fn with_schema(mut self, schema: Arc<UserSchema>) -> Self {
        self.schema = schema;
        self
    }

    pub fn mapping(&self) -> &AttributeMapping {
        &self.mapping
    }

    pub fn schema(&self) -> &Arc<UserSchema> {
        &self.schema
    }

    fn resolver(&self) -> MainAttributeResolver<'_> {
        MainAttributeResolver::new(&self.config, &self.schema)
    }

    fn updater(&self) -> AttributeMappingUpdater {
        AttributeMappingUpdater::new().with_legacy_profiles(self.config.legacy_profiles)
    }

    /// Field that identifies users.
    pub fn get_main_attribute(&self) -> String {
        self.resolver().get_main_attribute()
    }

    /// Lookup suffix applied to the main attribute, or `""`.
    pub fn get_main_attribute_lookup(&self) -> String {
        self.resolver().get_main_attribute_lookup()
    }

    /// Update `user` from `attributes` using an explicit mapping. Returns
    /// whether anything changed; saving is up to the caller.
    pub fn update_user(
        &self,
        user: &mut dyn UserRecord,
        attributes: &AssertedAttributes,
        mapping: &AttributeMapping,
    ) -> bool {
        self.updater().update_user(user, attributes, mapping)
    }

    /// Normalise the asserted main attribute value before lookup.
    pub fn clean_user_main_attribute(&self, value: &str) -> String {
        value.trim().to_string()
    }

    /// Apply the mapping, then pin the main attribute to its cleaned value so
    /// the raw assertion cannot undo the normalisation.
    fn refresh(
        &self,
        user: &mut User,
        attributes: &AssertedAttributes,
        main_attribute: &str,
        value: &str,
    ) -> bool {
        let mut changed = self.updater().update_user(user, attributes, &self.mapping);
        if user.field(main_attribute).as_deref() != Some(value) {
            changed |= user.set_field(main_attribute, value);
        }
        changed
    }

    /// Resolve the local user for an authentication event.
    ///
    /// Returns `Ok(None)` when the assertion does not carry the main
    /// attribute, when no user matches and creation is disabled, or when the
    /// matched user is inactive.
    pub fn authenticate(
        &self,
        store: &dyn UserStore,
        attributes: &AssertedAttributes,
    ) -> Result<Option<User>, BackendError> {
        let resolver = self.resolver();
        let main_attribute = resolver.get_main_attribute();

        let Some(saml_attribute) = self.mapping.attribute_for_target(&main_attribute) else {
            warn!(
                main_attribute = %main_attribute,
                "no asserted attribute maps onto the main attribute"
            );
            return Ok(None);
        };

        let Some(raw) = attributes.first_value(saml_attribute) else {
            debug!(saml_attribute, "main attribute not present in assertion");
            return Ok(None);
        };

        let value = self.clean_user_main_attribute(raw);
        if value.is_empty() {
            debug!(saml_attribute, "main attribute value is empty");
            return Ok(None);
        }

        debug!(lookup = %resolver.lookup_expression(), value = %value, "looking up user");

        let (mut user, created) = match store.find_by(&main_attribute, &value, resolver.lookup())? {
            Some(user) => (user, false),
            None if self.config.create_unknown_user => {
                let mut user = User::with_schema(Arc::clone(&self.schema), String::new());
                if !user.set_field(&main_attribute, &value) {
                    return Err(BackendError::MainAttributeNotSettable(main_attribute));
                }
                self.refresh(&mut user, attributes, &main_attribute, &value);
                info!(main_attribute = %main_attribute, value = %value, "creating unknown user");
                (store.create(user, &main_attribute)?, true)
            }
            None => {
                info!(
                    main_attribute = %main_attribute,
                    value = %value,
                    "user not found and creation disabled"
                );
                return Ok(None);
            }
        };

        if !user.is_active {
            warn!(id = ?user.id, "refusing inactive user");
            return Ok(None);
        }

        if !created && self.refresh(&mut user, attributes, &main_attribute, &value) {
            store.save(&user)?;
            debug!(id = ?user.id, "saved updated user");
        }

        Ok(Some(user))
    }
}
