//! Peripheral-role transport capability and its callback surface

use std::fmt;

use crate::error::PeripheralError;
use crate::gatt::{
    AdvertisementData, AttResult, Characteristic, GattService, ReadRequest, RestoredState,
};

// ----------------------------------------------------------------------------
// Power State
// ----------------------------------------------------------------------------

/// Power state of the local Bluetooth peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    #[default]
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::Unknown => write!(f, "unknown"),
            PowerState::Resetting => write!(f, "resetting"),
            PowerState::Unsupported => write!(f, "unsupported"),
            PowerState::Unauthorized => write!(f, "unauthorized"),
            PowerState::PoweredOff => write!(f, "poweredOff"),
            PowerState::PoweredOn => write!(f, "poweredOn"),
        }
    }
}

// ----------------------------------------------------------------------------
// Transport Trait
// ----------------------------------------------------------------------------

/// Operations the broadcaster drives on the platform peripheral manager.
///
/// Every method must return without blocking; completion is reported back
/// through [`PeripheralEvent`]s.
pub trait PeripheralTransport: Send {
    /// Current power state as reported by the platform
    fn state(&self) -> PowerState;

    /// Whether the platform is currently advertising
    fn is_advertising(&self) -> bool;

    /// Register a service. The platform answers with [`PeripheralEvent::ServiceAdded`].
    fn add_service(&mut self, service: GattService);

    /// Notify subscribers of a new value. `false` means the platform's transmit
    /// queue is full and [`PeripheralEvent::ReadyToUpdateSubscribers`] will follow.
    fn update_value(&mut self, value: &[u8], characteristic: &Characteristic) -> bool;

    /// Start advertising with the given data
    fn start_advertising(&mut self, data: AdvertisementData);

    /// Complete a read request
    fn respond_to_read(&mut self, request: &ReadRequest, value: Vec<u8>, result: AttResult);
}

// ----------------------------------------------------------------------------
// Callback Events
// ----------------------------------------------------------------------------

/// Callbacks delivered by the platform peripheral manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeripheralEvent {
    StateChanged(PowerState),
    WillRestoreState(RestoredState),
    ServiceAdded {
        service: GattService,
        error: Option<PeripheralError>,
    },
    ReadyToUpdateSubscribers,
    ReadRequest(ReadRequest),
}

impl PeripheralEvent {
    /// Short name for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            PeripheralEvent::StateChanged(_) => "state-changed",
            PeripheralEvent::WillRestoreState(_) => "will-restore-state",
            PeripheralEvent::ServiceAdded { .. } => "service-added",
            PeripheralEvent::ReadyToUpdateSubscribers => "ready-to-update",
            PeripheralEvent::ReadRequest(_) => "read-request",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_state_display() {
        assert_eq!(PowerState::PoweredOn.to_string(), "poweredOn");
        assert_eq!(PowerState::default(), PowerState::Unknown);
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(
            PeripheralEvent::StateChanged(PowerState::PoweredOff).kind(),
            "state-changed"
        );
        assert_eq!(
            PeripheralEvent::ReadyToUpdateSubscribers.kind(),
            "ready-to-update"
        );
    }
}
