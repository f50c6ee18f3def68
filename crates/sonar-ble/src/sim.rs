//! Simulated peripheral for testing and local runs
//!
//! Records everything the broadcaster asks of the platform and lets a test
//! script power state and transmit-queue backpressure without hardware. When
//! wired to an event sender it also answers with the callbacks a real
//! peripheral manager would deliver (`ServiceAdded` after `add_service`,
//! `ReadyToUpdateSubscribers` after a backpressured update).

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::gatt::{AdvertisementData, AttResult, Characteristic, GattService, ReadRequest};
use crate::transport::{PeripheralEvent, PeripheralTransport, PowerState};

// ----------------------------------------------------------------------------
// Recorded Calls
// ----------------------------------------------------------------------------

/// An `update_value` call and whether it was accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpdate {
    pub characteristic: Uuid,
    pub value: Vec<u8>,
    pub accepted: bool,
}

/// A completed read request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRead {
    pub request: ReadRequest,
    pub value: Vec<u8>,
    pub result: AttResult,
}

// ----------------------------------------------------------------------------
// Simulated Peripheral
// ----------------------------------------------------------------------------

/// In-memory [`PeripheralTransport`]
#[derive(Debug, Default)]
pub struct SimulatedPeripheral {
    state: PowerState,
    advertising: bool,
    backpressure_remaining: usize,
    added_services: Vec<GattService>,
    updates: Vec<RecordedUpdate>,
    advertisements: Vec<AdvertisementData>,
    read_responses: Vec<RecordedRead>,
    events: Option<mpsc::UnboundedSender<PeripheralEvent>>,
}

impl SimulatedPeripheral {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit platform callbacks on `events` in response to calls
    pub fn with_event_sender(mut self, events: mpsc::UnboundedSender<PeripheralEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn set_state(&mut self, state: PowerState) {
        self.state = state;
    }

    pub fn set_advertising(&mut self, advertising: bool) {
        self.advertising = advertising;
    }

    /// Reject the next `count` updates as if the transmit queue were full
    pub fn backpressure_next(&mut self, count: usize) {
        self.backpressure_remaining = count;
    }

    pub fn added_services(&self) -> &[GattService] {
        &self.added_services
    }

    pub fn updates(&self) -> &[RecordedUpdate] {
        &self.updates
    }

    /// Values that reached subscribers, in delivery order
    pub fn delivered_values(&self) -> Vec<&[u8]> {
        self.updates
            .iter()
            .filter(|update| update.accepted)
            .map(|update| update.value.as_slice())
            .collect()
    }

    pub fn advertisements(&self) -> &[AdvertisementData] {
        &self.advertisements
    }

    pub fn read_responses(&self) -> &[RecordedRead] {
        &self.read_responses
    }

    fn emit(&self, event: PeripheralEvent) {
        if let Some(events) = &self.events {
            let kind = event.kind();
            if events.send(event).is_err() {
                warn!("simulated peripheral could not deliver {} event", kind);
            }
        }
    }
}

impl PeripheralTransport for SimulatedPeripheral {
    fn state(&self) -> PowerState {
        self.state
    }

    fn is_advertising(&self) -> bool {
        self.advertising
    }

    fn add_service(&mut self, service: GattService) {
        debug!("simulated peripheral adding service {}", service.uuid);
        self.added_services.push(service.clone());
        self.emit(PeripheralEvent::ServiceAdded {
            service,
            error: None,
        });
    }

    fn update_value(&mut self, value: &[u8], characteristic: &Characteristic) -> bool {
        let accepted = if self.backpressure_remaining > 0 {
            self.backpressure_remaining -= 1;
            false
        } else {
            true
        };
        self.updates.push(RecordedUpdate {
            characteristic: characteristic.uuid,
            value: value.to_vec(),
            accepted,
        });
        if !accepted {
            self.emit(PeripheralEvent::ReadyToUpdateSubscribers);
        }
        accepted
    }

    fn start_advertising(&mut self, data: AdvertisementData) {
        debug!("simulated peripheral advertising {:?}", data);
        self.advertisements.push(data);
        self.advertising = true;
    }

    fn respond_to_read(&mut self, request: &ReadRequest, value: Vec<u8>, result: AttResult) {
        self.read_responses.push(RecordedRead {
            request: request.clone(),
            value,
            result,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatt::{AttributePermissions, CharacteristicProperties};

    fn keepalive() -> Characteristic {
        Characteristic::new(
            Uuid::from_u128(1),
            CharacteristicProperties::KEEPALIVE,
            AttributePermissions::READABLE,
        )
    }

    #[test]
    fn test_backpressure_then_accept() {
        let mut peripheral = SimulatedPeripheral::new();
        peripheral.backpressure_next(1);

        assert!(!peripheral.update_value(&[1], &keepalive()));
        assert!(peripheral.update_value(&[1], &keepalive()));
        assert_eq!(peripheral.delivered_values(), vec![&[1u8][..]]);
        assert_eq!(peripheral.updates().len(), 2);
    }

    #[test]
    fn test_emits_callbacks_when_wired() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut peripheral = SimulatedPeripheral::new().with_event_sender(tx);

        peripheral.add_service(GattService::new(Uuid::from_u128(2), true));
        peripheral.backpressure_next(1);
        peripheral.update_value(&[5], &keepalive());

        assert!(matches!(
            rx.try_recv(),
            Ok(PeripheralEvent::ServiceAdded { error: None, .. })
        ));
        assert_eq!(rx.try_recv(), Ok(PeripheralEvent::ReadyToUpdateSubscribers));
    }
}
