use crate::crc::crc16_bytes;
use crate::registers::{registers_in, RegisterDescriptor, RegisterType};
use crate::Error;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

// Some USB - RS485 dongles need a few milliseconds to switch between TX and RX
pub const MINIMUM_DELAY: std::time::Duration = std::time::Duration::from_millis(4);

/// Every response frame starts with this marker.
pub const SIGNATURE: [u8; 4] = [0x55, 0xAA, 0xEB, 0x90];
/// Signature followed by the little-endian group identifier.
pub const RESPONSE_HEADER_LENGTH: usize = SIGNATURE.len() + 2;
/// Capacity of the receive buffer, enough for the largest group.
pub const RX_BUFFER_CAPACITY: usize = 0x300;
pub const TX_BUFFER_LENGTH: usize = 11;

// function code 0x10 (write multiple registers), high byte of register 0x16xx
const OPCODE: [u8; 2] = [0x10, 0x16];
// quantity 1, byte count 2, value 0
const REQUEST_TAIL: [u8; 5] = [0x00, 0x01, 0x02, 0x00, 0x00];

/// RS485 address of the BMS as set by its DIP switches.
/// The address must be in the range from 1 to 15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 15;
}

impl Default for DeviceAddress {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl std::ops::Deref for DeviceAddress {
    type Target = u8;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<u8> for DeviceAddress {
    type Error = Error;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidAddress(value))
        }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the three register windows the BMS answers with a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum RegisterGroup {
    /// Protection and configuration parameters at 0x1000.
    Settings,
    /// Cell voltages, currents, temperatures and state of charge at 0x1200.
    CellInfo,
    /// Identification strings and counters at 0x1400.
    DeviceInfo,
}

impl RegisterGroup {
    pub const ALL: [RegisterGroup; 3] = [Self::Settings, Self::CellInfo, Self::DeviceInfo];
    /// Size of the address window covered by one group.
    pub const WINDOW_SIZE: u16 = 0x200;

    /// Identifier carried after the response signature.
    pub fn group_id(self) -> u16 {
        match self {
            Self::Settings => 1,
            Self::CellInfo => 2,
            Self::DeviceInfo => 3,
        }
    }

    pub fn base_address(self) -> u16 {
        match self {
            Self::Settings => 0x1000,
            Self::CellInfo => 0x1200,
            Self::DeviceInfo => 0x1400,
        }
    }

    /// Low byte of the trigger register written by the request.
    pub fn length_selector(self) -> u8 {
        match self {
            Self::Settings => 0x1e,
            Self::CellInfo => 0x20,
            Self::DeviceInfo => 0x1c,
        }
    }

    pub fn contains(self, address: u16) -> bool {
        let base = self.base_address();
        address >= base && address - base < Self::WINDOW_SIZE
    }
}

impl fmt::Display for RegisterGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Settings => write!(f, "settings"),
            Self::CellInfo => write!(f, "cell info"),
            Self::DeviceInfo => write!(f, "device info"),
        }
    }
}

/// Request frame asking the BMS to send one register group.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestFrame([u8; TX_BUFFER_LENGTH]);

impl RequestFrame {
    pub fn as_bytes(&self) -> &[u8; TX_BUFFER_LENGTH] {
        &self.0
    }
}

impl AsRef<[u8]> for RequestFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for RequestFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X?}", self.0)
    }
}

/// Builds the request for `group` addressed to BMS `address`.
///
/// Fails with [`Error::InvalidAddress`] if the address is outside of 1..=15.
pub fn build_request(address: u8, group: RegisterGroup) -> std::result::Result<RequestFrame, Error> {
    let address = DeviceAddress::try_from(address)?;
    let mut tx_buffer = [0; TX_BUFFER_LENGTH];
    tx_buffer[0] = *address;
    tx_buffer[1..3].copy_from_slice(&OPCODE);
    tx_buffer[3] = group.length_selector();
    tx_buffer[4..9].copy_from_slice(&REQUEST_TAIL);
    let crc = crc16_bytes(&tx_buffer[..TX_BUFFER_LENGTH - 2]);
    tx_buffer[TX_BUFFER_LENGTH - 2..].copy_from_slice(&crc);
    Ok(RequestFrame(tx_buffer))
}

/// Searches `buffer` for the signature followed by `group_id` and returns
/// the offset of the first payload byte.
///
/// Leading bytes before the signature are skipped, so left-overs of an earlier
/// answer do not hurt. Neither the response checksum nor the payload length is
/// verified.
pub fn locate_frame(buffer: &[u8], group_id: u16) -> std::result::Result<usize, Error> {
    let last = buffer.len().saturating_sub(RESPONSE_HEADER_LENGTH);
    (0..last)
        .find(|&i| {
            buffer[i..i + SIGNATURE.len()] == SIGNATURE
                && u16::from_le_bytes([buffer[i + 4], buffer[i + 5]]) == group_id
        })
        .map(|i| i + RESPONSE_HEADER_LENGTH)
        .ok_or_else(|| {
            log::warn!(
                "No frame for group {} in {} received bytes",
                group_id,
                buffer.len()
            );
            Error::SignatureNotFound { group_id }
        })
}

/// A decoded register value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    F32(f32),
    /// Raw bytes of a fixed length character field
    Text(Vec<u8>),
}

impl Value {
    /// The text up to the first NUL, invalid UTF-8 replaced.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Text(bytes) => {
                let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
                Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U8(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v:.6}"),
            Value::Text(_) => write!(f, "{}", self.as_text().unwrap_or_default()),
        }
    }
}

#[cfg(feature = "serde")]
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::U8(v) => serializer.serialize_u8(*v),
            Value::I8(v) => serializer.serialize_i8(*v),
            Value::U16(v) => serializer.serialize_u16(*v),
            Value::I16(v) => serializer.serialize_i16(*v),
            Value::U32(v) => serializer.serialize_u32(*v),
            Value::I32(v) => serializer.serialize_i32(*v),
            Value::F32(v) => serializer.serialize_f32(*v),
            Value::Text(_) => serializer.serialize_str(&self.as_text().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DecodedField {
    pub descriptor: &'static RegisterDescriptor,
    /// Offset of the register inside the payload
    pub raw_offset: usize,
    pub value: Value,
}

impl fmt::Display for DecodedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.descriptor.name, self.value)
    }
}

/// Fields decoded from one response, in catalog order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DecodedGroup {
    pub group: RegisterGroup,
    pub fields: Vec<DecodedField>,
    /// First register the payload was too short for. Decoding stopped there.
    pub missing: Option<&'static RegisterDescriptor>,
}

impl DecodedGroup {
    pub fn is_complete(&self) -> bool {
        self.missing.is_none()
    }

    /// Reports a truncated payload as [`Error::IncompleteData`].
    pub fn check_complete(&self) -> std::result::Result<(), Error> {
        match self.missing {
            Some(register) => Err(Error::IncompleteData {
                group_id: self.group.group_id(),
                register: register.name,
            }),
            None => Ok(()),
        }
    }
}

fn read_array<const N: usize>(payload: &[u8], offset: usize) -> Option<[u8; N]> {
    payload.get(offset..offset.checked_add(N)?)?.try_into().ok()
}

fn decode_value(register_type: RegisterType, payload: &[u8], offset: usize) -> Option<Value> {
    Some(match register_type {
        RegisterType::U8 => Value::U8(u8::from_le_bytes(read_array(payload, offset)?)),
        RegisterType::I8 => Value::I8(i8::from_le_bytes(read_array(payload, offset)?)),
        RegisterType::U16 => Value::U16(u16::from_le_bytes(read_array(payload, offset)?)),
        RegisterType::I16 => Value::I16(i16::from_le_bytes(read_array(payload, offset)?)),
        RegisterType::U32 => Value::U32(u32::from_le_bytes(read_array(payload, offset)?)),
        RegisterType::I32 => Value::I32(i32::from_le_bytes(read_array(payload, offset)?)),
        RegisterType::F32 => Value::F32(f32::from_le_bytes(read_array(payload, offset)?)),
        RegisterType::Text16 => Value::Text(read_array::<16>(payload, offset)?.to_vec()),
        RegisterType::Text8 => Value::Text(read_array::<8>(payload, offset)?.to_vec()),
    })
}

/// Decodes every catalog register of `group` from the payload starting at
/// `payload_offset` in `buffer`.
///
/// Stops at the first register that does not fit completely into the received
/// bytes; fields decoded before are kept.
pub fn decode_group(payload_offset: usize, buffer: &[u8], group: RegisterGroup) -> DecodedGroup {
    let payload = buffer.get(payload_offset..).unwrap_or_default();
    let mut fields = Vec::new();
    let mut missing = None;

    for descriptor in registers_in(group) {
        let raw_offset = usize::from(descriptor.address - group.base_address());
        match decode_value(descriptor.register_type, payload, raw_offset) {
            Some(value) => {
                log::trace!("{} @{:#06X} = {}", descriptor.name, raw_offset, value);
                fields.push(DecodedField {
                    descriptor,
                    raw_offset,
                    value,
                })
            }
            None => {
                log::warn!(
                    "Missing data - group={} register={} required={} received={}",
                    group.group_id(),
                    descriptor.name,
                    raw_offset + descriptor.register_type.width(),
                    payload.len()
                );
                missing = Some(descriptor);
                break;
            }
        }
    }

    DecodedGroup {
        group,
        fields,
        missing,
    }
}

/// Checks that at least signature and group identifier were received.
pub fn validate_len(rx_buffer: &[u8]) -> std::result::Result<(), Error> {
    if rx_buffer.len() < RESPONSE_HEADER_LENGTH {
        log::warn!(
            "Response too short - required={} received={}",
            RESPONSE_HEADER_LENGTH,
            rx_buffer.len()
        );
        return Err(Error::ShortResponse {
            received: rx_buffer.len(),
        });
    }
    Ok(())
}

/// Locates and decodes the response for `group` in the captured bytes.
pub fn decode_response(
    rx_buffer: &[u8],
    group: RegisterGroup,
) -> std::result::Result<DecodedGroup, Error> {
    validate_len(rx_buffer)?;
    let payload_offset = locate_frame(rx_buffer, group.group_id())?;
    log::debug!("Frame for group {} at offset {}", group, payload_offset);
    Ok(decode_group(payload_offset, rx_buffer, group))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc16;
    use crate::registers::find_register;

    fn frame(group: RegisterGroup, payload: &[u8]) -> Vec<u8> {
        let mut buffer = SIGNATURE.to_vec();
        buffer.extend_from_slice(&group.group_id().to_le_bytes());
        buffer.extend_from_slice(payload);
        buffer
    }

    fn field<'a>(group: &'a DecodedGroup, name: &str) -> &'a Value {
        &group
            .fields
            .iter()
            .find(|f| f.descriptor.name == name)
            .unwrap_or_else(|| panic!("{name} not decoded"))
            .value
    }

    #[test]
    fn address_test() {
        assert_eq!(*DeviceAddress::default(), 1);
        assert_eq!(*DeviceAddress::try_from(15).unwrap(), 15);
        assert!(matches!(
            DeviceAddress::try_from(0),
            Err(Error::InvalidAddress(0))
        ));
        assert!(matches!(
            DeviceAddress::try_from(16),
            Err(Error::InvalidAddress(16))
        ));
    }

    #[test]
    fn request_layout_test() {
        assert_eq!(
            build_request(1, RegisterGroup::Settings).unwrap().as_bytes(),
            &[0x01, 0x10, 0x16, 0x1E, 0x00, 0x01, 0x02, 0x00, 0x00, 0xD2, 0x2F]
        );
        assert_eq!(
            build_request(1, RegisterGroup::CellInfo).unwrap().as_bytes(),
            &[0x01, 0x10, 0x16, 0x20, 0x00, 0x01, 0x02, 0x00, 0x00, 0xD6, 0xF1]
        );
        assert_eq!(
            build_request(15, RegisterGroup::DeviceInfo).unwrap().as_bytes(),
            &[0x0F, 0x10, 0x16, 0x1C, 0x00, 0x01, 0x02, 0x00, 0x00, 0x9F, 0xAD]
        );
    }

    #[test]
    fn request_crc_test() {
        for address in DeviceAddress::MIN..=DeviceAddress::MAX {
            for group in RegisterGroup::ALL {
                let request = build_request(address, group).unwrap();
                let bytes = request.as_bytes();
                assert_eq!(bytes.len(), 11);
                assert_eq!(bytes[0], address);
                assert_eq!(bytes[3], group.length_selector());
                assert_eq!(
                    u16::from_le_bytes([bytes[9], bytes[10]]),
                    crc16(&bytes[..9])
                );
            }
        }
    }

    #[test]
    fn request_invalid_address_test() {
        for address in [0, 16, 255] {
            assert!(matches!(
                build_request(address, RegisterGroup::Settings),
                Err(Error::InvalidAddress(a)) if a == address
            ));
        }
    }

    #[test]
    fn group_window_test() {
        assert!(RegisterGroup::Settings.contains(0x1000));
        assert!(RegisterGroup::Settings.contains(0x11FF));
        assert!(!RegisterGroup::Settings.contains(0x1200));
        assert!(RegisterGroup::CellInfo.contains(0x1200));
        assert!(!RegisterGroup::DeviceInfo.contains(0x13FF));
        assert!(!RegisterGroup::DeviceInfo.contains(0x1600));
        assert!(!RegisterGroup::Settings.contains(0x0FFF));
    }

    #[test]
    fn locate_after_garbage_test() {
        let payload = [0xAB; 32];
        for garbage in 0..(RX_BUFFER_CAPACITY - RESPONSE_HEADER_LENGTH - payload.len()) {
            let mut buffer: Vec<u8> = (0..garbage).map(|i| (i * 7) as u8).collect();
            buffer.extend(frame(RegisterGroup::CellInfo, &payload));
            assert_eq!(locate_frame(&buffer, 2).unwrap(), garbage + 6);
        }
    }

    #[test]
    fn locate_skips_other_group_test() {
        let mut buffer = frame(RegisterGroup::Settings, &[0; 8]);
        buffer.extend(frame(RegisterGroup::DeviceInfo, &[0; 8]));
        assert_eq!(locate_frame(&buffer, 3).unwrap(), 14 + 6);
        assert_eq!(locate_frame(&buffer, 1).unwrap(), 6);
    }

    #[test]
    fn locate_not_found_test() {
        let noise: Vec<u8> = (0..200).map(|i| i as u8).collect();
        assert!(matches!(
            locate_frame(&noise, 1),
            Err(Error::SignatureNotFound { group_id: 1 })
        ));
        let buffer = frame(RegisterGroup::Settings, &[0; 16]);
        assert!(matches!(
            locate_frame(&buffer, 2),
            Err(Error::SignatureNotFound { group_id: 2 })
        ));
        // header without any payload byte
        let buffer = frame(RegisterGroup::Settings, &[]);
        assert!(locate_frame(&buffer, 1).is_err());
        assert!(locate_frame(&[], 1).is_err());
    }

    #[test]
    fn decode_settings_test() {
        let mut payload = vec![0; 0x11A];
        payload[0..4].copy_from_slice(&[0x64, 0x00, 0x00, 0x00]);
        payload[0x04..0x08].copy_from_slice(&2600u32.to_le_bytes());
        payload[0x50..0x54].copy_from_slice(&(-5i32).to_le_bytes());
        payload[0x6C..0x70].copy_from_slice(&16u32.to_le_bytes());
        payload[0x114..0x116].copy_from_slice(&0xBEEFu16.to_le_bytes());
        payload[0x119] = 0x7F;
        let buffer = frame(RegisterGroup::Settings, &payload);

        let group = decode_group(6, &buffer, RegisterGroup::Settings);
        assert!(group.is_complete());
        assert!(group.check_complete().is_ok());
        assert_eq!(group.fields.len(), 71);
        assert_eq!(group.fields[0].descriptor.name, "VolSmartSleep");
        assert_eq!(group.fields[0].raw_offset, 0);
        assert_eq!(group.fields[0].value, Value::U32(100));
        assert_eq!(group.fields[0].to_string(), "VolSmartSleep: 100");
        assert_eq!(field(&group, "VolCellUV"), &Value::U32(2600));
        assert_eq!(field(&group, "TMPBatCOTPR"), &Value::I32(-5));
        assert_eq!(field(&group, "CellCount"), &Value::U32(16));
        assert_eq!(field(&group, "Controls"), &Value::U16(0xBEEF));
        assert_eq!(field(&group, "DataDomainEnableControl"), &Value::U8(0x7F));
    }

    #[test]
    fn decode_cell_info_test() {
        let mut payload = vec![0; 0x10E];
        payload[0..2].copy_from_slice(&3312u16.to_le_bytes());
        payload[0x8A..0x8C].copy_from_slice(&(-12i16).to_le_bytes());
        payload[0x90..0x94].copy_from_slice(&53120u32.to_le_bytes());
        payload[0x98..0x9C].copy_from_slice(&(-2500i32).to_le_bytes());
        payload[0xA7] = 87;
        payload[0xDC..0xE0].copy_from_slice(&1.5f32.to_le_bytes());
        payload[0xE4..0xE6].copy_from_slice(&5312u16.to_le_bytes());
        let buffer = frame(RegisterGroup::CellInfo, &payload);

        let group = decode_response(&buffer, RegisterGroup::CellInfo).unwrap();
        assert!(group.is_complete());
        assert_eq!(group.fields.len(), 114);
        assert_eq!(field(&group, "CellVol0"), &Value::U16(3312));
        assert_eq!(field(&group, "TempMos"), &Value::I16(-12));
        assert_eq!(field(&group, "TotBatVol"), &Value::U32(53120));
        assert_eq!(field(&group, "BatCurrent"), &Value::I32(-2500));
        assert_eq!(field(&group, "SOCStateOfCharge"), &Value::U8(87));
        assert_eq!(field(&group, "BatVolCorrect"), &Value::F32(1.5));
        assert_eq!(field(&group, "BatVolCorrect").to_string(), "1.500000");
        assert_eq!(field(&group, "BatVol"), &Value::U16(5312));
    }

    #[test]
    fn decode_device_info_test() {
        let mut payload = vec![0; 0x108];
        payload[0..12].copy_from_slice(b"JK_B2A24S15P");
        payload[0x10..0x18].copy_from_slice(b"11.XW\0\0\0");
        payload[0x18..0x20].copy_from_slice(b"11.26\xFF\0\0");
        payload[0x70..0x80].copy_from_slice(b"1234567890123456");
        let buffer = frame(RegisterGroup::DeviceInfo, &payload);

        let group = decode_response(&buffer, RegisterGroup::DeviceInfo).unwrap();
        assert!(group.is_complete());
        assert_eq!(field(&group, "ManufacturerDeviceID").to_string(), "JK_B2A24S15P");
        assert_eq!(field(&group, "HardwareVersion").to_string(), "11.XW");
        // raw bytes are kept as received
        assert_eq!(
            field(&group, "SoftwareVersion"),
            &Value::Text(b"11.26\xFF\0\0".to_vec())
        );
        assert_eq!(field(&group, "SoftwareVersion").to_string(), "11.26\u{FFFD}");
        assert_eq!(field(&group, "Password").to_string(), "1234567890123456");
    }

    #[test]
    fn decode_truncated_test() {
        let payload = vec![0x11; 0x100];
        let buffer = frame(RegisterGroup::Settings, &payload);

        let group = decode_response(&buffer, RegisterGroup::Settings).unwrap();
        assert_eq!(group.fields.len(), 64);
        assert_eq!(
            group.fields.last().map(|f| f.descriptor.name),
            Some("CellConWireRes29")
        );
        assert_eq!(group.missing, find_register("CellConWireRes30"));
        assert!(matches!(
            group.check_complete(),
            Err(Error::IncompleteData {
                group_id: 1,
                register: "CellConWireRes30"
            })
        ));
    }

    #[test]
    fn decode_field_straddling_end_test() {
        // two bytes of VolSmartSleep only
        let buffer = frame(RegisterGroup::Settings, &[0x64, 0x00]);
        let group = decode_group(6, &buffer, RegisterGroup::Settings);
        assert!(group.fields.is_empty());
        assert_eq!(group.missing.map(|r| r.name), Some("VolSmartSleep"));
    }

    #[test]
    fn short_response_test() {
        assert!(validate_len(&[0; 6]).is_ok());
        assert!(matches!(
            validate_len(&[0x55, 0xAA]),
            Err(Error::ShortResponse { received: 2 })
        ));
        assert!(matches!(
            decode_response(&[0x55, 0xAA, 0xEB, 0x90, 0x01], RegisterGroup::Settings),
            Err(Error::ShortResponse { received: 5 })
        ));
    }

    #[test]
    fn value_display_test() {
        assert_eq!(Value::I8(-3).to_string(), "-3");
        assert_eq!(Value::U16(65535).to_string(), "65535");
        assert_eq!(Value::F32(-0.25).to_string(), "-0.250000");
        assert_eq!(Value::Text(b"A\0B".to_vec()).to_string(), "A");
        assert_eq!(Value::U8(1).as_text(), None);
    }
}
