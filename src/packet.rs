//! Fixed-size packet format
//!
//! Every packet has exactly [`PACKET_LEN`] bytes on the wire:
//!
//! | offset | size | field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 1    | start byte `0xaa`                       |
//! | 1      | 1    | packet number (0 reserved for RESET)    |
//! | 2      | 1    | type, see [`PacketType`]                |
//! | 3      | 1    | payload length                          |
//! | 4      | 8    | payload, zero padded                    |
//! | 12     | 2    | CRC-16 of bytes 1..12, MSB first        |
//! | 14     | 1    | stop byte `0x55`                        |
//!
//! The CRC always covers the full zero-padded payload, so sender and receiver
//! must pad the same way.

use crate::checksum::{self, ChecksumGen};
use crate::config::{MAX_DATA_LEN, PACKET_LEN, START_BYTE, STOP_BYTE};
use crate::error::NackReason;

const NUMBER: usize = 1;
const TYPE: usize = 2;
const LENGTH: usize = 3;
const DATA: usize = 4;
const CRC: usize = DATA + MAX_DATA_LEN;
const STOP: usize = PACKET_LEN - 1;

/// Packet types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PacketType {
    /// Carries 0-8 bytes of application data
    Data = 0,
    /// Positive acknowledgement of a DATA or RESET packet
    Ack = 1,
    /// Negative acknowledgement with a single [`NackReason`] byte
    Nack = 2,
    /// Request to restart packet numbering on both sides
    Reset = 3,
}

impl TryFrom<u8> for PacketType {
    type Error = NackReason;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Data),
            1 => Ok(Self::Ack),
            2 => Ok(Self::Nack),
            3 => Ok(Self::Reset),
            _ => Err(NackReason::InvalidType),
        }
    }
}

impl PacketType {
    /// Check if `length` is allowed for this packet type
    pub fn length_valid(&self, length: u8) -> bool {
        match self {
            Self::Data => length as usize <= MAX_DATA_LEN,
            Self::Ack | Self::Reset => length == 0,
            Self::Nack => length == 1,
        }
    }
}

/// Serialized packet
///
/// Stores raw bytes, so it can hold a corrupted packet as well; use
/// [`Packet::validate`] before trusting any of the fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    bytes: [u8; PACKET_LEN],
}

impl Packet {
    /// Build a packet, computing its checksum
    ///
    /// Payload longer than [`MAX_DATA_LEN`] is truncated.
    pub fn prepare<C>(checksum: &mut C, kind: PacketType, number: u8, payload: &[u8]) -> Self
    where
        C: ChecksumGen<Output = u16>,
    {
        debug_assert!(payload.len() <= MAX_DATA_LEN, "Payload too long");
        let len = payload.len().min(MAX_DATA_LEN);

        let mut bytes = [0u8; PACKET_LEN];
        bytes[0] = START_BYTE;
        bytes[NUMBER] = number;
        bytes[TYPE] = kind as u8;
        bytes[LENGTH] = len as u8;
        bytes[DATA..DATA + len].copy_from_slice(&payload[..len]);
        bytes[STOP] = STOP_BYTE;

        let mut packet = Self { bytes };
        packet.update_crc(checksum);
        packet
    }

    /// Build NACK response to packet `number`
    pub fn nack<C>(checksum: &mut C, number: u8, reason: NackReason) -> Self
    where
        C: ChecksumGen<Output = u16>,
    {
        Self::prepare(checksum, PacketType::Nack, number, &[reason.into()])
    }

    /// Wrap received bytes
    pub const fn from_bytes(bytes: [u8; PACKET_LEN]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; PACKET_LEN] {
        &self.bytes
    }

    pub fn start_byte(&self) -> u8 {
        self.bytes[0]
    }

    pub fn stop_byte(&self) -> u8 {
        self.bytes[STOP]
    }

    pub fn number(&self) -> u8 {
        self.bytes[NUMBER]
    }

    /// Raw value of the type field
    pub fn type_byte(&self) -> u8 {
        self.bytes[TYPE]
    }

    pub fn kind(&self) -> Result<PacketType, NackReason> {
        PacketType::try_from(self.type_byte())
    }

    pub fn length(&self) -> u8 {
        self.bytes[LENGTH]
    }

    /// Valid part of the payload (clamped to the payload capacity)
    pub fn payload(&self) -> &[u8] {
        let len = (self.length() as usize).min(MAX_DATA_LEN);
        &self.bytes[DATA..DATA + len]
    }

    /// Reason stored in a NACK packet
    pub fn nack_reason(&self) -> NackReason {
        self.payload().first()
            .map(|&code| NackReason::from(code))
            .unwrap_or(NackReason::Unknown)
    }

    /// Checksum stored in the packet
    pub fn crc(&self) -> u16 {
        checksum::read_be(&self.bytes[CRC..CRC + 2])
    }

    /// Check if the packet is well-formed
    ///
    /// Returns the first failure in the order: framing, type, length, checksum.
    pub fn validate<C>(&self, checksum: &mut C) -> Result<(), NackReason>
    where
        C: ChecksumGen<Output = u16>,
    {
        if self.start_byte() != START_BYTE || self.stop_byte() != STOP_BYTE {
            return Err(NackReason::InvalidFraming);
        }

        let kind = self.kind()?;

        if !kind.length_valid(self.length()) {
            return Err(NackReason::InvalidLength);
        }

        checksum.verify(&self.bytes[NUMBER..STOP])
            .map(|_| ())
            .map_err(|_| NackReason::InvalidCrc)
    }

    fn update_crc<C>(&mut self, checksum: &mut C)
    where
        C: ChecksumGen<Output = u16>,
    {
        // Cannot fail, the slice has exactly the size of data + checksum
        let _ = checksum.encode(&mut self.bytes[NUMBER..STOP], CRC - NUMBER);
    }
}
