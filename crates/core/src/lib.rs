//! SAML2Map core library.
//!
//! This crate maps attributes asserted by a SAML identity provider onto local
//! user records: configuration, the attribute mapping engine, main-attribute
//! resolution, user record abstractions, and the authentication backend that
//! drives them.

pub mod backend;
pub mod config;
pub mod errors;
pub mod mapping;
pub mod store;
pub mod user;

// Re-exports for convenience.
pub use backend::Saml2Backend;
pub use config::AppConfig;
pub use mapping::{AssertedAttributes, AttributeMapping};
pub use store::{InMemoryUserStore, UserStore};
pub use user::{User, UserSchema};
