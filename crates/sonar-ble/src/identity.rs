//! Source of the rotating broadcast identity

use std::sync::{Arc, RwLock};

/// Produces the payload currently broadcast as this device's identity
pub trait IdentityProvider: Send + Sync {
    /// Current payload, or `None` if no identity has been assigned yet
    fn current_payload(&self) -> Option<Vec<u8>>;
}

impl<P: IdentityProvider + ?Sized> IdentityProvider for Arc<P> {
    fn current_payload(&self) -> Option<Vec<u8>> {
        (**self).current_payload()
    }
}

/// Identity provider backed by a settable slot
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    payload: RwLock<Option<Vec<u8>>>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(payload: Vec<u8>) -> Self {
        Self {
            payload: RwLock::new(Some(payload)),
        }
    }

    pub fn set(&self, payload: Vec<u8>) {
        let mut slot = self.payload.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(payload);
    }

    pub fn clear(&self) {
        let mut slot = self.payload.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn current_payload(&self) -> Option<Vec<u8>> {
        self.payload
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
