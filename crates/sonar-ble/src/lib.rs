//! Bluetooth Low Energy broadcaster for Sonar
//!
//! This crate implements the peripheral-role side of Sonar: a GATT service with
//! a rotating identity characteristic and a keepalive characteristic, pushed to
//! subscribed centrals with a single retry slot for backpressured values.
//!
//! ## Architecture
//!
//! - [`broadcaster`] - The state machine reacting to caller operations and platform callbacks
//! - [`transport`] - The peripheral capability the state machine drives, and its callback events
//! - [`identity`] - Source of the rotating identity payload
//! - [`handle`] - Mutual exclusion around the state machine and the caller-facing trait
//! - [`task`] - Async pump delivering platform callbacks in order
//! - [`sim`] - In-memory peripheral for tests and local runs
//! - [`config`] / [`error`] / [`policy`] - Configuration, errors, invariant handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sonar_ble::{
//!     event_channel, BroadcastControl, BroadcastTask, BroadcasterConfig, PeripheralEvent,
//!     PowerState, SharedBroadcaster, SimulatedPeripheral, StaticIdentityProvider,
//! };
//!
//! # async fn example() -> sonar_ble::Result<()> {
//! let (events_tx, events_rx) = event_channel();
//! let peripheral = SimulatedPeripheral::new().with_event_sender(events_tx.clone());
//! let identity = Arc::new(StaticIdentityProvider::with_payload(vec![0u8; 16]));
//! let broadcaster = SharedBroadcaster::new(peripheral, identity, BroadcasterConfig::new());
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let task = BroadcastTask::new(broadcaster.clone(), events_rx, shutdown_rx);
//! let running = tokio::spawn(task.run());
//!
//! // A platform adapter forwards callbacks on `events_tx`.
//! let _ = events_tx.send(PeripheralEvent::StateChanged(PowerState::PoweredOn));
//!
//! broadcaster.update_identity();
//! let _healthy = broadcaster.is_healthy();
//! # running.abort();
//! # Ok(())
//! # }
//! ```

pub mod broadcaster;
pub mod config;
pub mod error;
pub mod gatt;
pub mod handle;
pub mod identity;
pub mod policy;
pub mod protocol;
pub mod sim;
pub mod task;
pub mod transport;

// Public API exports
pub use broadcaster::{Broadcaster, PendingValue};
pub use config::BroadcasterConfig;
pub use error::{BroadcasterError, PeripheralError, Result};
pub use gatt::{
    AdvertisementData, AttResult, AttributePermissions, Characteristic, CharacteristicProperties,
    GattService, ReadRequest, RestoredState,
};
pub use handle::{BroadcastControl, SharedBroadcaster};
pub use identity::{IdentityProvider, StaticIdentityProvider};
pub use policy::InvariantPolicy;
pub use protocol::{
    payload_preview, DEFAULT_LOCAL_NAME, SONAR_IDENTITY_CHARACTERISTIC_UUID,
    SONAR_KEEPALIVE_CHARACTERISTIC_UUID, SONAR_SERVICE_UUID,
};
pub use sim::SimulatedPeripheral;
pub use task::{event_channel, BroadcastTask, PeripheralEventReceiver, PeripheralEventSender};
pub use transport::{PeripheralEvent, PeripheralTransport, PowerState};
