//! Capability traits for records that attribute mapping can write into.
//!
//! A mapping target name resolves to one of three things on a record: an
//! invocable action, a settable field, or nothing at all. The updater asks
//! the record via [`UserRecord::target_kind`] instead of guessing.

/// What a target name resolves to on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// An action that receives the asserted value and applies its own effect.
    Action,
    /// A plain data slot that is assigned directly.
    Field,
    /// Neither; the name is unknown to this record.
    Missing,
}

/// A bag of named string fields.
pub trait FieldSet {
    /// Current value of `name`, or `None` if there is no such slot.
    fn field(&self, name: &str) -> Option<String>;

    /// Assign `value` to `name`. Returns `false` if there is no such slot.
    fn set_field(&mut self, name: &str, value: &str) -> bool;

    fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

/// A user record as seen by the attribute updater.
pub trait UserRecord: FieldSet {
    /// Resolve a target name. Actions take precedence over fields of the
    /// same name.
    fn target_kind(&self, name: &str) -> TargetKind {
        if self.has_field(name) {
            TargetKind::Field
        } else {
            TargetKind::Missing
        }
    }

    /// Run the action registered under `name` with `value`.
    ///
    /// Returns whether the action modified the record. Records without
    /// actions keep the default, which does nothing.
    fn invoke(&mut self, _name: &str, _value: &str) -> bool {
        false
    }

    /// Whether the linked profile carries `name`, answered without creating
    /// the profile.
    fn profile_has_field(&self, _name: &str) -> bool {
        false
    }

    /// Fetch the linked profile record, creating it if it does not exist
    /// yet. Records without profile support return `None`.
    fn profile_mut(&mut self) -> Option<&mut dyn FieldSet> {
        None
    }
}
