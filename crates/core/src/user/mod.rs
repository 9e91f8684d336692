//! User records that asserted attributes are written into.
//!
//! - [`record`]: the capability traits the updater works against
//! - [`models`]: the concrete [`User`], [`Profile`] and [`UserSchema`]

pub mod models;
pub mod record;

pub use models::{Profile, User, UserAction, UserSchema};
pub use record::{FieldSet, TargetKind, UserRecord};
