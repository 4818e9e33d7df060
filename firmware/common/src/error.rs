//! Error types for the bridge.
//!
//! Every fallible operation returns one of these instead of swallowing the
//! failure. The main loop decides per kind whether to log and carry on, to
//! disable a subsystem, or to shut down.

use thiserror::Error;

/// Failures while encoding the BLE advertising payload.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdvertisingError {
    /// The records need more than the 31 bytes of a legacy advertising packet.
    #[error("advertising payload needs {len} bytes, the limit is 31")]
    PayloadTooLarge { len: usize },
}

/// Failures surfaced by the bridge context and its subsystems.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError {
    /// The BLE radio refused to power up.
    #[error("BLE radio could not be activated")]
    RadioUnavailable,

    /// The advertising payload exceeds the legacy packet size.
    #[error("advertising payload needs {len} bytes, the limit is 31")]
    PayloadTooLarge { len: usize },

    /// The radio rejected the UART GATT service.
    #[error("GATT service registration failed")]
    ServiceRegistration,

    /// The radio rejected the advertising request.
    #[error("advertising could not be started")]
    Advertise,

    /// The display collaborator failed to apply a label update.
    #[error("display update failed")]
    Display,
}

impl BridgeError {
    /// Short reason shown on the radio status footer (fits the label width).
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::RadioUnavailable => "no radio",
            Self::PayloadTooLarge { .. } => "adv too long",
            Self::ServiceRegistration => "GATT reg",
            Self::Advertise => "advertise",
            Self::Display => "display",
        }
    }
}

impl From<AdvertisingError> for BridgeError {
    fn from(err: AdvertisingError) -> Self {
        match err {
            AdvertisingError::PayloadTooLarge { len } => Self::PayloadTooLarge { len },
        }
    }
}

/// Failures while decoding the SLCAN (Lawicel) ASCII stream.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlcanError {
    /// A frame record is too short or contains a non-hex character.
    #[error("malformed SLCAN record")]
    Malformed,

    /// The identifier does not fit 11 bits (standard) or 29 bits (extended).
    #[error("identifier out of range")]
    InvalidIdentifier,

    /// The DLC is above 8 or does not match the number of data bytes.
    #[error("data length mismatch")]
    InvalidLength,

    /// A record grew past the longest valid SLCAN frame before its terminator.
    #[error("record exceeds maximum SLCAN line length")]
    LineOverflow,

    /// The adapter answered with BEL, rejecting the last command.
    #[error("adapter rejected command")]
    AdapterNack,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advertising_error_converts_with_length() {
        let err: BridgeError = AdvertisingError::PayloadTooLarge { len: 37 }.into();
        assert_eq!(err, BridgeError::PayloadTooLarge { len: 37 });
    }

    #[test]
    fn test_reasons_fit_footer() {
        // Footer is "BLE Err: " plus the reason on a 30 column label
        let all = [
            BridgeError::RadioUnavailable,
            BridgeError::PayloadTooLarge { len: 99 },
            BridgeError::ServiceRegistration,
            BridgeError::Advertise,
            BridgeError::Display,
        ];
        for err in all {
            assert!(9 + err.reason().len() <= 30, "{err:?}");
        }
    }
}
