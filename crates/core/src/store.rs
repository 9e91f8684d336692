//! User directory abstraction used by the backend to find, create and save
//! users, plus an in-memory implementation.
//!
//! Durable persistence belongs to the embedding application; it implements
//! [`UserStore`] over whatever storage it already has.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::errors::StoreError;
use crate::mapping::Lookup;
use crate::user::{FieldSet, User, UserSchema};

/// Lookup and persistence of users.
pub trait UserStore {
    /// Find the user whose `field` matches `value` under `lookup`.
    fn find_by(&self, field: &str, value: &str, lookup: Lookup)
        -> Result<Option<User>, StoreError>;

    /// Store a new user and return it with its primary key assigned.
    ///
    /// `unique_field` is the field that identifies users; a non-empty value
    /// already held by another user is rejected.
    fn create(&self, user: User, unique_field: &str) -> Result<User, StoreError>;

    /// Overwrite a previously created user.
    fn save(&self, user: &User) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<u64, User>,
    next_id: u64,
}

/// A [`UserStore`] kept entirely in memory.
///
/// The state is behind a `Mutex` so the store is `Send + Sync` and can be
/// shared via `Arc`.
#[derive(Debug)]
pub struct InMemoryUserStore {
    schema: Arc<UserSchema>,
    inner: Mutex<Inner>,
}

impl InMemoryUserStore {
    pub fn new(schema: Arc<UserSchema>) -> Self {
        Self {
            schema,
            inner: Mutex::new(Inner {
                users: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    pub fn schema(&self) -> &Arc<UserSchema> {
        &self.schema
    }

    /// Fetch a user by primary key.
    pub fn get(&self, id: u64) -> Option<User> {
        self.lock().users.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().users.is_empty()
    }

    /// If the Mutex is poisoned (a previous holder panicked), the lock is
    /// recovered rather than propagating a panic.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("user store mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl UserStore for InMemoryUserStore {
    fn find_by(
        &self,
        field: &str,
        value: &str,
        lookup: Lookup,
    ) -> Result<Option<User>, StoreError> {
        if !self.schema.has_field(field) {
            return Err(StoreError::UnknownField(field.to_string()));
        }

        let inner = self.lock();
        let found = inner
            .users
            .values()
            .find(|u| u.field(field).is_some_and(|stored| lookup.matches(&stored, value)))
            .cloned();

        debug!(field, value, %lookup, found = found.is_some(), "user lookup");
        Ok(found)
    }

    fn create(&self, mut user: User, unique_field: &str) -> Result<User, StoreError> {
        if !self.schema.has_field(unique_field) {
            return Err(StoreError::UnknownField(unique_field.to_string()));
        }
        let key = user.field(unique_field).unwrap_or_default();

        let mut inner = self.lock();
        if !key.is_empty()
            && inner
                .users
                .values()
                .any(|u| u.field(unique_field).as_deref() == Some(key.as_str()))
        {
            return Err(StoreError::Duplicate {
                field: unique_field.to_string(),
                value: key,
            });
        }

        let id = inner.next_id;
        inner.next_id += 1;
        user.id = Some(id);
        user.attach_schema(Arc::clone(&self.schema));
        inner.users.insert(id, user.clone());

        info!(id, field = unique_field, value = %key, "created user");
        Ok(user)
    }

    fn save(&self, user: &User) -> Result<(), StoreError> {
        let id = user
            .id
            .ok_or_else(|| StoreError::NotFound("unsaved user".into()))?;

        let mut inner = self.lock();
        match inner.users.get_mut(&id) {
            Some(slot) => {
                *slot = user.clone();
                debug!(id, "saved user");
                Ok(())
            }
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }
}
