//! Service UUID constants and parsing.
//!
//! Callers hand service UUIDs across the method channel as strings; they are
//! parsed here before anything reaches a backend.

use uuid::Uuid;

use crate::error::{Error, Result};

/// Bluetooth SIG base UUID (`0000xxxx-0000-1000-8000-00805f9b34fb`).
pub const BLUETOOTH_BASE_UUID: Uuid = Uuid::from_u128(0x0000_0000_0000_1000_8000_00805f9b34fb);

/// Service UUID commonly used by attendance beacons (HM-10 style `FFE0`).
pub const ATTENDANCE_BEACON_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_ffe0_0000_1000_8000_00805f9b34fb);

/// Parse a caller-supplied service UUID string.
///
/// Accepts the hyphenated, simple, braced and URN forms understood by
/// [`Uuid::try_parse`]. Surrounding whitespace is rejected.
///
/// # Errors
///
/// Returns [`Error::InvalidUuid`] if the string is not a UUID.
///
/// # Example
///
/// ```
/// use smart_attendance_ble::ble::uuids::parse_service_uuid;
///
/// let uuid = parse_service_uuid("0000ffe0-0000-1000-8000-00805f9b34fb").unwrap();
/// assert_eq!(uuid.as_u128() >> 96, 0xffe0);
/// assert!(parse_service_uuid("not-a-uuid").is_err());
/// ```
pub fn parse_service_uuid(value: &str) -> Result<Uuid> {
    Uuid::try_parse(value).map_err(|_| Error::InvalidUuid {
        value: value.to_string(),
    })
}

/// Expand a 16-bit SIG-assigned UUID to its 128-bit form.
pub fn from_short_uuid(short: u16) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID.as_u128() | ((short as u128) << 96))
}

/// Return the 16-bit alias of `uuid` if it lies on the Bluetooth base UUID.
pub fn short_uuid(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    let alias = value >> 96;
    if alias <= u16::MAX as u128 && value & ((1u128 << 96) - 1) == BLUETOOTH_BASE_UUID.as_u128() {
        Some(alias as u16)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_valid_uuid() {
        let uuid = parse_service_uuid("0000ffe0-0000-1000-8000-00805f9b34fb").unwrap();
        assert_eq!(uuid, ATTENDANCE_BEACON_SERVICE_UUID);

        let upper = parse_service_uuid("0000FFE0-0000-1000-8000-00805F9B34FB").unwrap();
        assert_eq!(upper, ATTENDANCE_BEACON_SERVICE_UUID);
    }

    #[test]
    fn test_parse_rejects_surrounding_whitespace() {
        for value in [
            "  0000ffe0-0000-1000-8000-00805f9b34fb",
            "0000ffe0-0000-1000-8000-00805f9b34fb\n",
        ] {
            assert!(matches!(
                parse_service_uuid(value),
                Err(Error::InvalidUuid { .. })
            ));
        }
    }

    #[test]
    fn test_parse_invalid_uuid() {
        for value in ["not-a-uuid", "", "ffe0", "0000ffe0-0000-1000-8000-00805f9b34fz"] {
            match parse_service_uuid(value) {
                Err(Error::InvalidUuid { value: v }) => assert_eq!(v, value),
                other => panic!("expected InvalidUuid for {value:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_short_uuid_expansion() {
        assert_eq!(from_short_uuid(0xffe0), ATTENDANCE_BEACON_SERVICE_UUID);
        assert_eq!(short_uuid(&ATTENDANCE_BEACON_SERVICE_UUID), Some(0xffe0));

        let custom = Uuid::from_u128(0x6e40_0001_b5a3_f393_e0a9_e50e24dcca9e);
        assert_eq!(short_uuid(&custom), None);
    }

    proptest! {
        #[test]
        fn prop_hyphenated_form_parses(raw in any::<u128>()) {
            let uuid = Uuid::from_u128(raw);
            prop_assert_eq!(parse_service_uuid(&uuid.hyphenated().to_string()).unwrap(), uuid);
        }

        #[test]
        fn prop_short_uuid_roundtrips(short in any::<u16>()) {
            prop_assert_eq!(short_uuid(&from_short_uuid(short)), Some(short));
        }
    }
}
