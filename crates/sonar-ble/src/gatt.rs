//! GATT data model shared between the broadcaster and peripheral transports

use uuid::Uuid;

// ----------------------------------------------------------------------------
// Characteristic Properties
// ----------------------------------------------------------------------------

/// Access properties of a characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharacteristicProperties {
    pub read: bool,
    pub notify: bool,
}

impl CharacteristicProperties {
    /// Identity characteristic: readable and notifiable
    pub const IDENTITY: Self = Self {
        read: true,
        notify: true,
    };

    /// Keepalive characteristic: notifiable only
    pub const KEEPALIVE: Self = Self {
        read: false,
        notify: true,
    };
}

/// Attribute permissions of a characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttributePermissions {
    pub readable: bool,
}

impl AttributePermissions {
    pub const READABLE: Self = Self { readable: true };
}

// ----------------------------------------------------------------------------
// Services and Characteristics
// ----------------------------------------------------------------------------

/// A characteristic as created by the broadcaster or restored by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Characteristic {
    pub uuid: Uuid,
    pub properties: CharacteristicProperties,
    pub permissions: AttributePermissions,
    /// Static value; `None` for dynamic characteristics
    pub value: Option<Vec<u8>>,
}

impl Characteristic {
    pub fn new(
        uuid: Uuid,
        properties: CharacteristicProperties,
        permissions: AttributePermissions,
    ) -> Self {
        Self {
            uuid,
            properties,
            permissions,
            value: None,
        }
    }
}

/// A GATT service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    pub uuid: Uuid,
    pub primary: bool,
    /// `None` when the platform hands back a service without a characteristics list
    pub characteristics: Option<Vec<Characteristic>>,
}

impl GattService {
    /// Create a service with no characteristics attached yet
    pub fn new(uuid: Uuid, primary: bool) -> Self {
        Self {
            uuid,
            primary,
            characteristics: None,
        }
    }

    pub fn with_characteristics(mut self, characteristics: Vec<Characteristic>) -> Self {
        self.characteristics = Some(characteristics);
        self
    }
}

// ----------------------------------------------------------------------------
// Advertising, Reads and Restoration
// ----------------------------------------------------------------------------

/// Data handed to the platform when advertising starts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdvertisementData {
    pub local_name: Option<String>,
    pub service_uuids: Vec<Uuid>,
}

/// A read request from a connected central
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    pub central: String,
    pub characteristic: Uuid,
    pub offset: usize,
}

/// ATT result code used to complete a request
///
/// Reads of the identity characteristic always succeed, with an empty value
/// when no identity is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttResult {
    Success,
}

/// State the platform restores after the process is relaunched
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RestoredState {
    /// `None` when there was nothing to restore
    pub services: Option<Vec<GattService>>,
    pub advertisement_data: Option<AdvertisementData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_sets() {
        assert!(CharacteristicProperties::IDENTITY.read);
        assert!(CharacteristicProperties::IDENTITY.notify);
        assert!(!CharacteristicProperties::KEEPALIVE.read);
        assert!(CharacteristicProperties::KEEPALIVE.notify);
    }

    #[test]
    fn test_service_without_characteristics() {
        let service = GattService::new(Uuid::nil(), true);
        assert!(service.characteristics.is_none());

        let service = service.with_characteristics(vec![]);
        assert_eq!(service.characteristics, Some(vec![]));
    }
}
