/// Reason of rejecting a received packet
///
/// Sent back to the peer as the single payload byte of a NACK packet, so the
/// numeric values are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum NackReason {
    /// Checksum of header and payload does not match the stored CRC
    InvalidCrc = 0x01,
    /// Start or stop marker missing
    InvalidFraming = 0x02,
    /// Receiver has no room for the payload right now, retry later
    BufferOverflow = 0x03,
    /// Packet type outside of the known range
    InvalidType = 0x04,
    /// Length field not allowed for given packet type
    InvalidLength = 0x05,
    /// Any code not known by this implementation
    Unknown = 0xff,
}

impl From<u8> for NackReason {
    fn from(code: u8) -> Self {
        match code {
            0x01 => Self::InvalidCrc,
            0x02 => Self::InvalidFraming,
            0x03 => Self::BufferOverflow,
            0x04 => Self::InvalidType,
            0x05 => Self::InvalidLength,
            _ => Self::Unknown,
        }
    }
}

impl From<NackReason> for u8 {
    fn from(reason: NackReason) -> Self {
        reason as u8
    }
}

/// Transport error
///
/// None of these is fatal, the protocol always falls back to an idle state.
/// Validation failures are reported with [`NackReason`], lost packets and
/// the transitions limit only show up in logs and [`crate::Stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Not enough space in the output stream, try again on next tick
    BufferFull,
    /// Pending ACK/NACK queue is full, notification dropped
    QueueFull,
}
