//! BLE protocol constants and utilities for Sonar

use uuid::Uuid;

// ----------------------------------------------------------------------------
// BLE Service and Characteristic UUIDs
// ----------------------------------------------------------------------------

/// Sonar BLE service UUID
pub const SONAR_SERVICE_UUID: Uuid = Uuid::from_u128(0xC1F5983C_FA94_4AC8_8E2E_BB86D6DE9B21);

/// Characteristic carrying the rotating broadcast identity (read + notify)
pub const SONAR_IDENTITY_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x85BF337C_5B64_48EB_A5F7_A9FED135C972);

/// Characteristic carrying the periodic keepalive (notify only)
pub const SONAR_KEEPALIVE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xD802C645_5C7B_40DD_985A_9FBEE05FE85C);

/// Local name put in the advertisement when name advertising is enabled
pub const DEFAULT_LOCAL_NAME: &str = "Sonar";

// ----------------------------------------------------------------------------
// Logging helpers
// ----------------------------------------------------------------------------

const PREVIEW_BYTES: usize = 8;

/// Hex preview of a payload for log lines, truncated after a few bytes
pub fn payload_preview(payload: &[u8]) -> String {
    if payload.len() <= PREVIEW_BYTES {
        hex::encode(payload)
    } else {
        format!(
            "{}.. ({} bytes)",
            hex::encode(&payload[..PREVIEW_BYTES]),
            payload.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuids_are_distinct() {
        assert_ne!(SONAR_SERVICE_UUID, SONAR_IDENTITY_CHARACTERISTIC_UUID);
        assert_ne!(SONAR_SERVICE_UUID, SONAR_KEEPALIVE_CHARACTERISTIC_UUID);
        assert_ne!(
            SONAR_IDENTITY_CHARACTERISTIC_UUID,
            SONAR_KEEPALIVE_CHARACTERISTIC_UUID
        );
    }

    #[test]
    fn test_service_uuid_string_form() {
        assert_eq!(
            SONAR_SERVICE_UUID.to_string(),
            "c1f5983c-fa94-4ac8-8e2e-bb86d6de9b21"
        );
    }

    #[test]
    fn test_payload_preview() {
        assert_eq!(payload_preview(&[]), "");
        assert_eq!(payload_preview(&[0x01, 0xab]), "01ab");
        let long = [0xffu8; 20];
        assert_eq!(payload_preview(&long), "ffffffffffffffff.. (20 bytes)");
    }
}
