//! Process-wide "current user" slot
//!
//! Some call sites (log enrichment deep inside client construction) have no
//! request context to read an identity from. They read this slot instead.
//!
//! This is a known hazard: concurrent requests overwrite each other's value,
//! so a reader may observe another request's user. Never use it for an
//! authorization decision; thread the [`AuthIdentity`](crate::AuthIdentity)
//! through the call instead. The authentication middleware is the only writer.

use parking_lot::RwLock;

static CURRENT_USER: RwLock<Option<String>> = RwLock::new(None);

/// Record the user of the request being processed
pub fn set(username: Option<&str>) {
    *CURRENT_USER.write() = username.map(String::from);
}

/// Last recorded user, if any
pub fn get() -> Option<String> {
    CURRENT_USER.read().clone()
}

/// Clear the slot
pub fn clear() {
    *CURRENT_USER.write() = None;
}

/// Sets the slot on creation and clears it on drop
#[derive(Debug)]
pub struct CurrentUserGuard(());

impl CurrentUserGuard {
    /// Record `username` until the guard is dropped
    pub fn enter(username: Option<&str>) -> Self {
        set(username);
        Self(())
    }
}

impl Drop for CurrentUserGuard {
    fn drop(&mut self) {
        clear();
    }
}
