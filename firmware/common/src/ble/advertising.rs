//! Legacy BLE advertising payload encoder.
//!
//! A payload is a sequence of `[len, type, value...]` records where `len`
//! counts the type byte plus the value. The whole payload must fit the
//! 31-byte legacy advertising packet; the builder refuses to produce anything
//! larger rather than truncating.
//!
//! ```text
//! flags            02 01 06
//! complete name    06 09 'C' 'A' 'N' 'B' 'T'
//! 128-bit service  11 07 <16 bytes, little-endian>
//!                  = 3 + 7 + 18 = 28 bytes
//! ```

use heapless::Vec;

use crate::error::AdvertisingError;

/// Legacy advertising packet payload limit.
pub const MAX_ADV_LEN: usize = 31;

/// Services a single payload can list.
pub const MAX_SERVICES: usize = 4;

// AD type codes (Bluetooth Assigned Numbers, "Common Data Types")
pub const AD_FLAGS: u8 = 0x01;
pub const AD_UUID16_COMPLETE: u8 = 0x03;
pub const AD_UUID32_COMPLETE: u8 = 0x05;
pub const AD_UUID128_COMPLETE: u8 = 0x07;
pub const AD_COMPLETE_LOCAL_NAME: u8 = 0x09;
pub const AD_APPEARANCE: u8 = 0x19;

const FLAG_LE_LIMITED_DISCOVERABLE: u8 = 0x01;
const FLAG_LE_GENERAL_DISCOVERABLE: u8 = 0x02;
const FLAG_BR_EDR_NOT_SUPPORTED: u8 = 0x04;

// =============================================================================
// Record Types
// =============================================================================

/// Discoverability and BR/EDR bits of the flags record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvFlags {
    /// Limited instead of general discoverable mode.
    pub limited_discoverable: bool,
    /// Advertise BR/EDR (classic) support.
    pub br_edr: bool,
}

impl AdvFlags {
    /// General discoverable, LE only (`0x06`).
    pub const LE_GENERAL: Self = Self {
        limited_discoverable: false,
        br_edr: false,
    };

    pub const fn bits(self) -> u8 {
        let mode = if self.limited_discoverable {
            FLAG_LE_LIMITED_DISCOVERABLE
        } else {
            FLAG_LE_GENERAL_DISCOVERABLE
        };
        if self.br_edr { mode } else { mode | FLAG_BR_EDR_NOT_SUPPORTED }
    }
}

impl Default for AdvFlags {
    fn default() -> Self { Self::LE_GENERAL }
}

/// Service UUID in one of the three advertised widths.
///
/// 128-bit UUIDs are stored in over-the-air (little-endian) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceUuid {
    Uuid16(u16),
    Uuid32(u32),
    Uuid128([u8; 16]),
}

impl ServiceUuid {
    /// 128-bit UUID from its canonical big-endian value
    /// (`0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E`).
    pub const fn from_u128(uuid: u128) -> Self { Self::Uuid128(uuid.to_le_bytes()) }

    /// Encoded width in bytes.
    pub const fn width(&self) -> usize {
        match self {
            Self::Uuid16(_) => 2,
            Self::Uuid32(_) => 4,
            Self::Uuid128(_) => 16,
        }
    }

    /// AD type for a complete list of UUIDs of this width.
    pub const fn ad_type(&self) -> u8 {
        match self {
            Self::Uuid16(_) => AD_UUID16_COMPLETE,
            Self::Uuid32(_) => AD_UUID32_COMPLETE,
            Self::Uuid128(_) => AD_UUID128_COMPLETE,
        }
    }

    /// Value bytes in over-the-air order; only the first `width()` are used.
    fn le_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        match self {
            Self::Uuid16(v) => out[..2].copy_from_slice(&v.to_le_bytes()),
            Self::Uuid32(v) => out[..4].copy_from_slice(&v.to_le_bytes()),
            Self::Uuid128(bytes) => out = *bytes,
        }
        out
    }
}

// =============================================================================
// Size Calculation
// =============================================================================

/// Bytes taken by one record carrying `value_len` bytes of value.
#[inline]
pub const fn record_len(value_len: usize) -> usize { 2 + value_len }

/// Size of the bridge's payload: flags, a name of `name_len` bytes and one
/// 128-bit service UUID.
///
/// `const` so configuration can assert the advertised name fits at compile
/// time.
pub const fn uart_payload_len(name_len: usize) -> usize {
    record_len(1) + record_len(name_len) + record_len(16)
}

// =============================================================================
// Builder
// =============================================================================

/// Accumulates advertising records and validates the byte budget.
#[derive(Debug, Clone, Default)]
pub struct AdvertisingBuilder<'a> {
    flags: Option<AdvFlags>,
    name: Option<&'a str>,
    appearance: Option<u16>,
    services: Vec<ServiceUuid, MAX_SERVICES>,
    dropped_services: usize,
}

impl<'a> AdvertisingBuilder<'a> {
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn flags(
        mut self,
        flags: AdvFlags,
    ) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Complete local name record.
    #[must_use]
    pub fn name(
        mut self,
        name: &'a str,
    ) -> Self {
        self.name = Some(name);
        self
    }

    /// GAP appearance value (little-endian on air).
    #[must_use]
    pub fn appearance(
        mut self,
        appearance: u16,
    ) -> Self {
        self.appearance = Some(appearance);
        self
    }

    /// Add a service UUID record.
    #[must_use]
    pub fn service(
        mut self,
        uuid: ServiceUuid,
    ) -> Self {
        if self.services.push(uuid).is_err() {
            // Accounted for in encoded_len so build() reports the overflow
            self.dropped_services += 1;
        }
        self
    }

    /// Total payload length the current records encode to.
    pub fn encoded_len(&self) -> usize {
        let flags = if self.flags.is_some() { record_len(1) } else { 0 };
        let name = self.name.map_or(0, |n| record_len(n.len()));
        let appearance = if self.appearance.is_some() { record_len(2) } else { 0 };
        let services: usize = self.services.iter().map(|s| record_len(s.width())).sum();
        let dropped = self.dropped_services * record_len(16);
        flags + name + appearance + services + dropped
    }

    /// Encode the payload, failing if it exceeds [`MAX_ADV_LEN`].
    pub fn build(&self) -> Result<AdvertisingPayload, AdvertisingError> {
        let len = self.encoded_len();
        if len > MAX_ADV_LEN || self.dropped_services > 0 {
            return Err(AdvertisingError::PayloadTooLarge { len });
        }

        let mut bytes: Vec<u8, MAX_ADV_LEN> = Vec::new();
        {
            let mut put = |chunk: &[u8]| {
                bytes
                    .extend_from_slice(chunk)
                    .map_err(|_| AdvertisingError::PayloadTooLarge { len })
            };
            // Record length bytes count the type byte plus the value
            if let Some(flags) = self.flags {
                put(&[2, AD_FLAGS, flags.bits()])?;
            }
            if let Some(name) = self.name {
                put(&[(name.len() + 1) as u8, AD_COMPLETE_LOCAL_NAME])?;
                put(name.as_bytes())?;
            }
            if let Some(appearance) = self.appearance {
                put(&[3, AD_APPEARANCE])?;
                put(&appearance.to_le_bytes())?;
            }
            for uuid in &self.services {
                put(&[(uuid.width() + 1) as u8, uuid.ad_type()])?;
                put(&uuid.le_bytes()[..uuid.width()])?;
            }
        }

        Ok(AdvertisingPayload { bytes })
    }
}

// =============================================================================
// Payload
// =============================================================================

/// Immutable, validated advertising payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingPayload {
    bytes: Vec<u8, MAX_ADV_LEN>,
}

impl AdvertisingPayload {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] { &self.bytes }

    #[inline]
    pub fn len(&self) -> usize { self.bytes.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.bytes.is_empty() }

    /// Iterate the encoded `(type, value)` records.
    pub fn records(&self) -> AdRecords<'_> { AdRecords { rest: &self.bytes } }
}

/// Iterator over `(type, value)` records of an encoded payload.
///
/// Stops at a zero-length record or one that runs past the end.
pub struct AdRecords<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for AdRecords<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, tail) = self.rest.split_first()?;
        let len = usize::from(len);
        if len == 0 || len > tail.len() {
            self.rest = &[];
            return None;
        }
        let (record, rest) = tail.split_at(len);
        self.rest = rest;
        Some((record[0], &record[1..]))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const NUS: ServiceUuid = ServiceUuid::from_u128(0x6E40_0001_B5A3_F393_E0A9_E50E_24DC_CA9E);

    fn uart_payload(name: &str) -> Result<AdvertisingPayload, AdvertisingError> {
        AdvertisingBuilder::new()
            .flags(AdvFlags::LE_GENERAL)
            .name(name)
            .service(NUS)
            .build()
    }

    #[test]
    fn test_flags_bits() {
        assert_eq!(AdvFlags::LE_GENERAL.bits(), 0x06);
        let limited = AdvFlags {
            limited_discoverable: true,
            br_edr: false,
        };
        assert_eq!(limited.bits(), 0x05);
        let dual = AdvFlags {
            limited_discoverable: false,
            br_edr: true,
        };
        assert_eq!(dual.bits(), 0x02);
    }

    #[test]
    fn test_five_char_name_fits() {
        let payload = uart_payload("CANBT").unwrap();
        assert_eq!(payload.len(), 28);
        assert_eq!(uart_payload_len(5), 28);
        assert_eq!(&payload.as_bytes()[..3], &[0x02, 0x01, 0x06]);
        assert_eq!(&payload.as_bytes()[3..10], &[0x06, 0x09, b'C', b'A', b'N', b'B', b'T']);
        assert_eq!(&payload.as_bytes()[10..12], &[0x11, 0x07]);
    }

    #[test]
    fn test_fourteen_char_name_fails() {
        assert_eq!(uart_payload_len(14), 37);
        assert_eq!(
            uart_payload("CAN-BRIDGE-XYZ"),
            Err(AdvertisingError::PayloadTooLarge { len: 37 })
        );
    }

    #[test]
    fn test_exact_budget_accepted() {
        // 3 + (8 + 2) + 18 = 31
        let payload = uart_payload("CANBRIDG").unwrap();
        assert_eq!(payload.len(), MAX_ADV_LEN);
        assert!(uart_payload("CANBRIDGE").is_err());
    }

    #[test]
    fn test_uuid128_little_endian() {
        let payload = uart_payload("CANBT").unwrap();
        let uuid = &payload.as_bytes()[12..28];
        assert_eq!(uuid[0], 0x9E);
        assert_eq!(uuid[1], 0xCA);
        assert_eq!(uuid[15], 0x6E);
        assert_eq!(uuid[14], 0x40);
    }

    #[test]
    fn test_uuid_widths_and_types() {
        let payload = AdvertisingBuilder::new()
            .service(ServiceUuid::Uuid16(0x180F))
            .service(ServiceUuid::Uuid32(0x1234_5678))
            .build()
            .unwrap();
        assert_eq!(
            payload.as_bytes(),
            &[0x03, 0x03, 0x0F, 0x18, 0x05, 0x05, 0x78, 0x56, 0x34, 0x12]
        );
    }

    #[test]
    fn test_appearance_record() {
        let payload = AdvertisingBuilder::new().appearance(0x0540).build().unwrap();
        assert_eq!(payload.as_bytes(), &[0x03, 0x19, 0x40, 0x05]);
    }

    #[test]
    fn test_records_round_trip_types() {
        let payload = AdvertisingBuilder::new()
            .flags(AdvFlags::default())
            .name("CANBT")
            .appearance(0x0540)
            .service(ServiceUuid::Uuid16(0xFFE0))
            .build()
            .unwrap();
        let types: std::vec::Vec<u8> = payload.records().map(|(t, _)| t).collect();
        assert_eq!(types, [AD_FLAGS, AD_COMPLETE_LOCAL_NAME, AD_APPEARANCE, AD_UUID16_COMPLETE]);
        let name = payload.records().find(|(t, _)| *t == AD_COMPLETE_LOCAL_NAME).unwrap().1;
        assert_eq!(name, b"CANBT");
    }

    #[test]
    fn test_too_many_services_reported_not_truncated() {
        let mut builder = AdvertisingBuilder::new();
        for i in 0..5 {
            builder = builder.service(ServiceUuid::Uuid16(i));
        }
        assert!(matches!(builder.build(), Err(AdvertisingError::PayloadTooLarge { .. })));
    }

    #[test]
    fn test_empty_builder_builds_empty_payload() {
        let payload = AdvertisingBuilder::new().build().unwrap();
        assert!(payload.is_empty());
        assert_eq!(payload.records().count(), 0);
    }

    #[test]
    fn test_records_stop_on_truncated_input() {
        let mut records = AdRecords { rest: &[0x05, 0x09, b'A'] };
        assert_eq!(records.next(), None);
    }
}
