//! Attribute mapping engine.
//!
//! - [`attributes`]: the mapping table and the asserted attribute set
//! - [`updater`]: writes asserted values into a user record
//! - [`main_attribute`]: decides which field identifies a user

pub mod attributes;
pub mod main_attribute;
pub mod updater;

pub use attributes::{AssertedAttributes, AttributeMapping};
pub use main_attribute::{Lookup, MainAttributeResolver, DEFAULT_MAIN_ATTRIBUTE};
pub use updater::{update_user, AttributeMappingUpdater};
