//! Writes asserted attribute values into a user record.
//!
//! For every attribute present in both the asserted set and the mapping, the
//! first asserted value is written to each mapped target. A target resolves,
//! in order, to an action on the user, a field on the user, or (with legacy
//! profiles enabled) a field on the linked profile. Targets that resolve to
//! none of these are skipped.

use tracing::{debug, trace};

use super::attributes::{AssertedAttributes, AttributeMapping};
use crate::user::{FieldSet, TargetKind, UserRecord};

/// Applies an [`AttributeMapping`] to user records.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeMappingUpdater {
    legacy_profiles: bool,
}

impl AttributeMappingUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fall back to the linked profile for targets the user lacks.
    pub fn with_legacy_profiles(mut self, enabled: bool) -> Self {
        self.legacy_profiles = enabled;
        self
    }

    /// Update `user` from `attributes` according to `mapping`.
    ///
    /// Returns whether anything on the user or its profile was modified.
    /// Empty value lists leave their targets untouched.
    pub fn update_user(
        &self,
        user: &mut dyn UserRecord,
        attributes: &AssertedAttributes,
        mapping: &AttributeMapping,
    ) -> bool {
        let mut changed = false;

        for (attribute, targets) in mapping.iter() {
            let Some(value) = attributes.first_value(attribute) else {
                trace!(attribute, "no value asserted, skipping");
                continue;
            };

            for target in targets {
                changed |= self.apply(user, target, value);
            }
        }

        debug!(changed, "user attributes updated");
        changed
    }

    fn apply(&self, user: &mut dyn UserRecord, target: &str, value: &str) -> bool {
        match user.target_kind(target) {
            TargetKind::Action => {
                trace!(target, "invoking user action");
                user.invoke(target, value)
            }
            TargetKind::Field => assign(user, target, value),
            TargetKind::Missing if self.legacy_profiles && user.profile_has_field(target) => {
                match user.profile_mut() {
                    Some(profile) => assign(profile, target, value),
                    None => false,
                }
            }
            TargetKind::Missing => {
                debug!(target, "target not found on user or profile, ignoring");
                false
            }
        }
    }
}

fn assign<F: FieldSet + ?Sized>(record: &mut F, name: &str, value: &str) -> bool {
    if record.field(name).as_deref() == Some(value) {
        return false;
    }
    record.set_field(name, value)
}

/// Update `user` with the default updater (no legacy profile fallback).
pub fn update_user(
    user: &mut dyn UserRecord,
    attributes: &AssertedAttributes,
    mapping: &AttributeMapping,
) -> bool {
    AttributeMappingUpdater::new().update_user(user, attributes, mapping)
}
