//! Serialized access to a broadcaster shared between the callback pump and callers

use std::sync::{Arc, Mutex, MutexGuard};

use crate::broadcaster::{Broadcaster, PendingValue};
use crate::config::BroadcasterConfig;
use crate::identity::IdentityProvider;
use crate::transport::{PeripheralEvent, PeripheralTransport};

// ----------------------------------------------------------------------------
// Caller Interface
// ----------------------------------------------------------------------------

/// Operations exposed to the app lifecycle and health supervisor.
///
/// None of them report failure; delivery problems only show up in logs and
/// through `is_healthy`.
pub trait BroadcastControl: Send + Sync {
    fn send_keepalive(&self, value: Vec<u8>);

    fn update_identity(&self);

    fn is_healthy(&self) -> bool;
}

// ----------------------------------------------------------------------------
// Shared Broadcaster
// ----------------------------------------------------------------------------

/// Cloneable handle that runs every broadcaster entry point under one lock.
///
/// No entry point blocks or awaits while holding the lock.
pub struct SharedBroadcaster<T, P> {
    inner: Arc<Mutex<Broadcaster<T, P>>>,
}

impl<T, P> Clone for SharedBroadcaster<T, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: PeripheralTransport, P: IdentityProvider> SharedBroadcaster<T, P> {
    pub fn new(transport: T, identity_provider: P, config: BroadcasterConfig) -> Self {
        Self::from_broadcaster(Broadcaster::new(transport, identity_provider, config))
    }

    pub fn from_broadcaster(broadcaster: Broadcaster<T, P>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(broadcaster)),
        }
    }

    /// Deliver a platform callback
    pub fn handle_event(&self, event: PeripheralEvent) {
        self.lock().handle_event(event);
    }

    pub fn pending(&self) -> Option<PendingValue> {
        self.lock().pending().cloned()
    }

    /// Run `f` with exclusive access to the broadcaster
    pub fn with<R>(&self, f: impl FnOnce(&mut Broadcaster<T, P>) -> R) -> R {
        f(&mut self.lock())
    }

    // A panic under the strict policy poisons the lock; the broadcaster is
    // plain data, so later callers keep using it.
    fn lock(&self) -> MutexGuard<'_, Broadcaster<T, P>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: PeripheralTransport, P: IdentityProvider> BroadcastControl for SharedBroadcaster<T, P> {
    fn send_keepalive(&self, value: Vec<u8>) {
        self.lock().send_keepalive(value);
    }

    fn update_identity(&self) {
        self.lock().update_identity();
    }

    fn is_healthy(&self) -> bool {
        self.lock().is_healthy()
    }
}
