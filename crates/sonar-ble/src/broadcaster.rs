//! Peripheral-role broadcaster state machine
//!
//! The broadcaster owns the Sonar GATT service, its identity and keepalive
//! characteristics, and a single pending-value slot. Caller operations try to
//! push a value to subscribers immediately; when the platform reports a full
//! transmit queue the value stays in the slot and is retried on the next
//! [`PeripheralEvent::ReadyToUpdateSubscribers`].
//!
//! The slot is shared by both kinds of value. A new push always replaces
//! whatever is pending, so a keepalive can supersede an unsent identity and
//! vice versa.

use tracing::{debug, error, info, warn};

use crate::config::BroadcasterConfig;
use crate::error::PeripheralError;
use crate::gatt::{
    AdvertisementData, AttResult, AttributePermissions, Characteristic,
    CharacteristicProperties, GattService, ReadRequest, RestoredState,
};
use crate::identity::IdentityProvider;
use crate::protocol::payload_preview;
use crate::transport::{PeripheralEvent, PeripheralTransport, PowerState};

// ----------------------------------------------------------------------------
// Pending Value
// ----------------------------------------------------------------------------

/// A value waiting for the platform to accept it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingValue {
    Keepalive(Vec<u8>),
    Identity(Vec<u8>),
}

// ----------------------------------------------------------------------------
// Broadcaster
// ----------------------------------------------------------------------------

/// BLE broadcaster driven by caller operations and peripheral callbacks
pub struct Broadcaster<T, P> {
    config: BroadcasterConfig,
    transport: T,
    /// Set on the first `PoweredOn` callback; the transport is not driven before that
    transport_attached: bool,
    /// Set between `add_service` and the platform's `ServiceAdded` answer
    service_registration_pending: bool,
    identity_provider: P,
    identity_characteristic: Option<Characteristic>,
    keepalive_characteristic: Option<Characteristic>,
    pending: Option<PendingValue>,
}

impl<T: PeripheralTransport, P: IdentityProvider> Broadcaster<T, P> {
    pub fn new(transport: T, identity_provider: P, config: BroadcasterConfig) -> Self {
        Self {
            config,
            transport,
            transport_attached: false,
            service_registration_pending: false,
            identity_provider,
            identity_characteristic: None,
            keepalive_characteristic: None,
            pending: None,
        }
    }

    pub fn config(&self) -> &BroadcasterConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_transport_attached(&self) -> bool {
        self.transport_attached
    }

    /// Whether a service was handed to the platform and not yet acknowledged
    pub fn is_service_registration_pending(&self) -> bool {
        self.service_registration_pending
    }

    pub fn identity_characteristic(&self) -> Option<&Characteristic> {
        self.identity_characteristic.as_ref()
    }

    pub fn keepalive_characteristic(&self) -> Option<&Characteristic> {
        self.keepalive_characteristic.as_ref()
    }

    /// Value awaiting delivery, if the last push was backpressured
    pub fn pending(&self) -> Option<&PendingValue> {
        self.pending.as_ref()
    }

    // ------------------------------------------------------------------------
    // Caller operations
    // ------------------------------------------------------------------------

    /// Push a keepalive value to subscribers of the keepalive characteristic
    pub fn send_keepalive(&mut self, value: Vec<u8>) {
        if !self.transport_attached {
            info!("peripheral not available yet, dropping keepalive");
            return;
        }
        let Some(characteristic) = self.keepalive_characteristic.as_ref() else {
            info!("keepalive characteristic not created yet");
            return;
        };

        self.pending = Some(PendingValue::Keepalive(value.clone()));
        if self.transport.update_value(&value, characteristic) {
            info!(
                "sent keepalive value: {}",
                value.first().copied().unwrap_or_default()
            );
            self.pending = None;
        } else {
            debug!("keepalive backpressured, waiting for ready callback");
        }
    }

    /// Push the provider's current identity to subscribers of the identity characteristic
    pub fn update_identity(&mut self) {
        // Reachable when bluetooth was off at launch and an identity was
        // assigned before it came on.
        let Some(characteristic) = self.identity_characteristic.as_ref() else {
            info!("identity characteristic not created yet");
            return;
        };
        let Some(payload) = self.identity_provider.current_payload() else {
            self.config
                .invariant_policy
                .violated("attempted to update identity without an identity");
            return;
        };
        if !self.transport_attached {
            info!("peripheral not available yet, not updating identity");
            return;
        }

        self.pending = Some(PendingValue::Identity(payload.clone()));
        if self.transport.update_value(&payload, characteristic) {
            info!("sent identity value {}", payload_preview(&payload));
            self.pending = None;
        } else {
            debug!("identity update backpressured, waiting for ready callback");
        }
    }

    /// Liveness predicate for a supervisor. Reads state only.
    pub fn is_healthy(&self) -> bool {
        self.transport_attached
            && self.identity_characteristic.is_some()
            && self.keepalive_characteristic.is_some()
            && self.identity_provider.current_payload().is_some()
            && self.transport.is_advertising()
            && self.transport.state() == PowerState::PoweredOn
    }

    // ------------------------------------------------------------------------
    // Peripheral callbacks
    // ------------------------------------------------------------------------

    /// Dispatch a platform callback to its handler
    pub fn handle_event(&mut self, event: PeripheralEvent) {
        match event {
            PeripheralEvent::StateChanged(state) => self.on_power_state_changed(state),
            PeripheralEvent::WillRestoreState(restored) => self.on_restore_state(restored),
            PeripheralEvent::ServiceAdded { service, error } => {
                self.on_service_added(&service, error.as_ref())
            }
            PeripheralEvent::ReadyToUpdateSubscribers => self.on_ready_to_update_subscribers(),
            PeripheralEvent::ReadRequest(request) => self.on_read_request(&request),
        }
    }

    pub fn on_power_state_changed(&mut self, state: PowerState) {
        info!("state: {}", state);

        // No teardown on other states: service and characteristics are kept
        // for when power returns.
        if state == PowerState::PoweredOn {
            self.transport_attached = true;
            self.start();
        }
    }

    pub fn on_restore_state(&mut self, restored: RestoredState) {
        let Some(services) = restored.services else {
            info!("no services restored, creating from scratch...");
            return;
        };

        for service in services {
            info!("restoring service {}", service.uuid);
            let Some(characteristics) = service.characteristics else {
                self.config
                    .invariant_policy
                    .violated("restored service has no characteristics");
                return;
            };
            if characteristics.is_empty() {
                warn!("restored service {} has an empty characteristics list", service.uuid);
            }

            for characteristic in characteristics {
                if characteristic.uuid == self.config.keepalive_characteristic_uuid {
                    info!(
                        "    retaining restored keepalive characteristic {}",
                        characteristic.uuid
                    );
                    self.keepalive_characteristic = Some(characteristic);
                } else if characteristic.uuid == self.config.identity_characteristic_uuid {
                    info!(
                        "    retaining restored identity characteristic {}",
                        characteristic.uuid
                    );
                    self.identity_characteristic = Some(characteristic);
                } else {
                    info!("    ignoring restored characteristic {}", characteristic.uuid);
                }
            }
        }

        if let Some(data) = restored.advertisement_data {
            info!("restored advertisement data {:?}", data);
        }
        info!(
            "peripheral manager {} advertising",
            if self.transport.is_advertising() { "is" } else { "is not" }
        );
    }

    pub fn on_service_added(&mut self, service: &GattService, error: Option<&PeripheralError>) {
        self.service_registration_pending = false;
        if let Some(err) = error {
            error!("failed to add service {}: {}", service.uuid, err);
            return;
        }

        info!(
            "advertising identifier {}",
            self.identity_provider
                .current_payload()
                .map(|payload| payload_preview(&payload))
                .unwrap_or_else(|| "nil".to_string())
        );

        let local_name = self
            .config
            .include_local_name
            .then(|| self.config.local_name.clone());
        self.transport.start_advertising(AdvertisementData {
            local_name,
            service_uuids: vec![service.uuid],
        });
    }

    pub fn on_ready_to_update_subscribers(&mut self) {
        let (value, characteristic) = match (
            &self.pending,
            &self.identity_characteristic,
            &self.keepalive_characteristic,
        ) {
            (None, _, _) => {
                self.config
                    .invariant_policy
                    .violated("ready to update subscribers with no pending value");
                return;
            }
            (Some(PendingValue::Identity(value)), Some(identity), _) => (value, identity),
            (Some(PendingValue::Keepalive(value)), _, Some(keepalive)) => (value, keepalive),
            (Some(_), _, _) => {
                self.config
                    .invariant_policy
                    .violated("pending value has no matching characteristic");
                return;
            }
        };

        if self.transport.update_value(value, characteristic) {
            info!("re-sent pending value {}", payload_preview(value));
            self.pending = None;
        }
    }

    pub fn on_read_request(&mut self, request: &ReadRequest) {
        if request.characteristic != self.config.identity_characteristic_uuid {
            debug!(
                "received a read for unexpected characteristic {}",
                request.characteristic
            );
            return;
        }

        let payload = match self.identity_provider.current_payload() {
            Some(payload) => {
                info!("responding to read request with {}", payload_preview(&payload));
                payload
            }
            None => {
                info!("responding to read request with empty payload");
                Vec::new()
            }
        };
        self.transport
            .respond_to_read(request, payload, AttResult::Success);
    }

    // ------------------------------------------------------------------------
    // Service setup
    // ------------------------------------------------------------------------

    fn start(&mut self) {
        if !self.transport_attached {
            self.config
                .invariant_policy
                .violated("starting without a peripheral");
            return;
        }
        if self.transport.is_advertising() {
            error!("peripheral manager already advertising, won't start again");
            return;
        }
        if self.service_registration_pending {
            info!("service registration already in progress, won't start again");
            return;
        }

        // Characteristics restored from a previous launch are reused as-is.
        let identity_uuid = self.config.identity_characteristic_uuid;
        let identity = self
            .identity_characteristic
            .get_or_insert_with(|| {
                Characteristic::new(
                    identity_uuid,
                    CharacteristicProperties::IDENTITY,
                    AttributePermissions::READABLE,
                )
            })
            .clone();

        let keepalive_uuid = self.config.keepalive_characteristic_uuid;
        let keepalive = self
            .keepalive_characteristic
            .get_or_insert_with(|| {
                Characteristic::new(
                    keepalive_uuid,
                    CharacteristicProperties::KEEPALIVE,
                    AttributePermissions::READABLE,
                )
            })
            .clone();

        let service = GattService::new(self.config.service_uuid, true)
            .with_characteristics(vec![identity, keepalive]);
        info!("adding service {}", service.uuid);
        self.service_registration_pending = true;
        self.transport.add_service(service);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::identity::StaticIdentityProvider;
    use crate::policy::InvariantPolicy;
    use crate::sim::SimulatedPeripheral;

    type TestBroadcaster = Broadcaster<SimulatedPeripheral, Arc<StaticIdentityProvider>>;

    fn create_broadcaster(
        policy: InvariantPolicy,
    ) -> (TestBroadcaster, Arc<StaticIdentityProvider>) {
        let identity = Arc::new(StaticIdentityProvider::new());
        let config = BroadcasterConfig::new().with_invariant_policy(policy);
        let broadcaster = Broadcaster::new(SimulatedPeripheral::new(), identity.clone(), config);
        (broadcaster, identity)
    }

    fn power_on(broadcaster: &mut TestBroadcaster) {
        broadcaster.transport_mut().set_state(PowerState::PoweredOn);
        broadcaster.on_power_state_changed(PowerState::PoweredOn);
    }

    #[test]
    fn test_power_on_registers_service() {
        let (mut broadcaster, _) = create_broadcaster(InvariantPolicy::Strict);
        power_on(&mut broadcaster);

        let services = broadcaster.transport().added_services();
        assert_eq!(services.len(), 1);
        let characteristics = services[0].characteristics.as_ref().unwrap();
        assert_eq!(characteristics.len(), 2);
        assert_eq!(
            characteristics[0].properties,
            CharacteristicProperties::IDENTITY
        );
        assert_eq!(
            characteristics[1].properties,
            CharacteristicProperties::KEEPALIVE
        );
        assert!(services[0].primary);
    }

    #[test]
    fn test_other_power_states_do_nothing() {
        let (mut broadcaster, _) = create_broadcaster(InvariantPolicy::Strict);
        broadcaster.on_power_state_changed(PowerState::PoweredOff);
        broadcaster.on_power_state_changed(PowerState::Unauthorized);

        assert!(!broadcaster.is_transport_attached());
        assert!(broadcaster.transport().added_services().is_empty());
    }

    #[test]
    fn test_power_loss_keeps_characteristics() {
        let (mut broadcaster, _) = create_broadcaster(InvariantPolicy::Strict);
        power_on(&mut broadcaster);
        broadcaster.transport_mut().set_state(PowerState::PoweredOff);
        broadcaster.on_power_state_changed(PowerState::PoweredOff);

        assert!(broadcaster.identity_characteristic().is_some());
        assert!(broadcaster.keepalive_characteristic().is_some());
        assert!(broadcaster.is_transport_attached());
    }

    #[test]
    fn test_keepalive_before_power_on_is_noop() {
        let (mut broadcaster, _) = create_broadcaster(InvariantPolicy::Strict);
        broadcaster.send_keepalive(vec![1]);

        assert!(broadcaster.pending().is_none());
        assert!(broadcaster.transport().updates().is_empty());
    }

    #[test]
    fn test_identity_before_characteristics_is_noop() {
        let (mut broadcaster, identity) = create_broadcaster(InvariantPolicy::Strict);
        identity.set(vec![7; 16]);
        broadcaster.update_identity();

        assert!(broadcaster.pending().is_none());
        assert!(broadcaster.transport().updates().is_empty());
    }

    #[test]
    fn test_keepalive_sent_immediately() {
        let (mut broadcaster, _) = create_broadcaster(InvariantPolicy::Strict);
        power_on(&mut broadcaster);
        broadcaster.send_keepalive(vec![42]);

        assert!(broadcaster.pending().is_none());
        let updates = broadcaster.transport().updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].value, vec![42]);
        assert_eq!(
            updates[0].characteristic,
            broadcaster.config().keepalive_characteristic_uuid
        );
    }

    #[test]
    fn test_service_added_error_skips_advertising() {
        let (mut broadcaster, _) = create_broadcaster(InvariantPolicy::Strict);
        power_on(&mut broadcaster);
        let service = broadcaster.transport().added_services()[0].clone();
        let err = PeripheralError::ServiceRegistration {
            reason: "attribute table full".to_string(),
        };
        broadcaster.on_service_added(&service, Some(&err));

        assert!(broadcaster.transport().advertisements().is_empty());
        assert!(!broadcaster.transport().is_advertising());
    }

    #[test]
    fn test_advertisement_omits_name_by_default() {
        let (mut broadcaster, _) = create_broadcaster(InvariantPolicy::Strict);
        power_on(&mut broadcaster);
        let service = broadcaster.transport().added_services()[0].clone();
        broadcaster.on_service_added(&service, None);

        let advertisements = broadcaster.transport().advertisements();
        assert_eq!(advertisements.len(), 1);
        assert_eq!(advertisements[0].local_name, None);
        assert_eq!(advertisements[0].service_uuids, vec![service.uuid]);
    }

    #[test]
    fn test_advertisement_includes_name_when_enabled() {
        let identity = Arc::new(StaticIdentityProvider::new());
        let config = BroadcasterConfig::new()
            .with_invariant_policy(InvariantPolicy::Strict)
            .with_include_local_name(true);
        let mut broadcaster = Broadcaster::new(SimulatedPeripheral::new(), identity, config);
        power_on(&mut broadcaster);
        let service = broadcaster.transport().added_services()[0].clone();
        broadcaster.on_service_added(&service, None);

        let advertisements = broadcaster.transport().advertisements();
        assert_eq!(advertisements[0].local_name.as_deref(), Some("Sonar"));
    }

    #[test]
    fn test_read_of_other_characteristic_is_ignored() {
        let (mut broadcaster, identity) = create_broadcaster(InvariantPolicy::Strict);
        identity.set(vec![1, 2]);
        power_on(&mut broadcaster);
        broadcaster.on_read_request(&ReadRequest {
            central: "central-1".to_string(),
            characteristic: broadcaster.config().keepalive_characteristic_uuid,
            offset: 0,
        });

        assert!(broadcaster.transport().read_responses().is_empty());
    }

    #[test]
    fn test_read_returns_identity() {
        let (mut broadcaster, identity) = create_broadcaster(InvariantPolicy::Strict);
        identity.set(vec![1, 2, 3]);
        power_on(&mut broadcaster);
        broadcaster.on_read_request(&ReadRequest {
            central: "central-1".to_string(),
            characteristic: broadcaster.config().identity_characteristic_uuid,
            offset: 0,
        });

        let responses = broadcaster.transport().read_responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].value, vec![1, 2, 3]);
        assert_eq!(responses[0].result, AttResult::Success);
    }

    #[test]
    fn test_lenient_identity_without_payload_is_noop() {
        let (mut broadcaster, _) = create_broadcaster(InvariantPolicy::Lenient);
        power_on(&mut broadcaster);
        broadcaster.update_identity();

        assert!(broadcaster.pending().is_none());
        assert!(broadcaster.transport().updates().is_empty());
    }

    #[test]
    #[should_panic(expected = "attempted to update identity without an identity")]
    fn test_strict_identity_without_payload_panics() {
        let (mut broadcaster, _) = create_broadcaster(InvariantPolicy::Strict);
        power_on(&mut broadcaster);
        broadcaster.update_identity();
    }

    #[test]
    fn test_handle_event_dispatch() {
        let (mut broadcaster, _) = create_broadcaster(InvariantPolicy::Strict);
        broadcaster.transport_mut().set_state(PowerState::PoweredOn);
        broadcaster.handle_event(PeripheralEvent::StateChanged(PowerState::PoweredOn));
        let service = broadcaster.transport().added_services()[0].clone();
        broadcaster.handle_event(PeripheralEvent::ServiceAdded {
            service,
            error: None,
        });

        assert!(broadcaster.transport().is_advertising());
    }

    fn orphan_identity_value(broadcaster: &mut TestBroadcaster) {
        power_on(broadcaster);
        broadcaster.pending = Some(PendingValue::Identity(vec![9; 4]));
        broadcaster.identity_characteristic = None;
    }

    #[test]
    #[should_panic(expected = "pending value has no matching characteristic")]
    fn test_strict_pending_without_characteristic_panics() {
        let (mut broadcaster, _) = create_broadcaster(InvariantPolicy::Strict);
        orphan_identity_value(&mut broadcaster);
        broadcaster.on_ready_to_update_subscribers();
    }

    #[test]
    fn test_lenient_pending_without_characteristic_keeps_value() {
        let (mut broadcaster, _) = create_broadcaster(InvariantPolicy::Lenient);
        orphan_identity_value(&mut broadcaster);
        broadcaster.on_ready_to_update_subscribers();

        assert!(broadcaster.transport().updates().is_empty());
        assert_eq!(
            broadcaster.pending(),
            Some(&PendingValue::Identity(vec![9; 4]))
        );
    }

    #[test]
    fn test_restore_with_empty_characteristics_adopts_nothing() {
        let (mut broadcaster, _) = create_broadcaster(InvariantPolicy::Strict);
        let service_uuid = broadcaster.config().service_uuid;
        broadcaster.on_restore_state(RestoredState {
            services: Some(vec![
                GattService::new(service_uuid, true).with_characteristics(Vec::new())
            ]),
            advertisement_data: None,
        });

        assert!(broadcaster.identity_characteristic().is_none());
        assert!(broadcaster.keepalive_characteristic().is_none());
    }

    #[test]
    fn test_registration_pending_until_service_added() {
        let (mut broadcaster, _) = create_broadcaster(InvariantPolicy::Strict);
        power_on(&mut broadcaster);
        assert!(broadcaster.is_service_registration_pending());

        let service = broadcaster.transport().added_services()[0].clone();
        broadcaster.on_service_added(&service, None);
        assert!(!broadcaster.is_service_registration_pending());
    }
}
