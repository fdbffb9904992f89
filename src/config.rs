//! Protocol configuration
//!
//! Wire-format constants are fixed, the timing/retry tunables live in [`Config`]
//! which can be stored in non-volatile memory using postcard.

use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};
use static_assertions as sa;

use crate::timer::Duration;

/// Marks beginning of a packet
pub const START_BYTE: u8 = 0xaa;
/// Marks end of a packet
pub const STOP_BYTE: u8 = 0x55;
/// Maximum payload carried by a single DATA packet
pub const MAX_DATA_LEN: usize = 8;
/// Size of a serialized packet: start, number, type, length, data, crc16, stop
pub const PACKET_LEN: usize = 4 + MAX_DATA_LEN + 2 + 1;
/// Pending ACK/NACK notifications between incoming and outgoing state machine
pub const PENDING_QUEUE_DEPTH: usize = 4;
/// Limit of state transitions of each state machine during a single tick
pub const MAX_TRANSITIONS: usize = PACKET_LEN + 2;

sa::const_assert_eq!(PACKET_LEN, 15);
sa::const_assert!(MAX_DATA_LEN <= u8::MAX as usize);

/// Tunables of the transport
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Time to collect application bytes after the first one before sending a packet
    pub read_timeout_ms: u32,
    /// Time to wait for ACK/NACK before retransmission
    pub ack_timeout_ms: u32,
    /// Time allowed for the whole packet to arrive after its start byte
    pub receive_timeout_ms: u32,
    /// Time without any incoming packet after which we assume the peer restarted
    pub silence_timeout_ms: u32,
    /// Retransmissions of a single packet before it is dropped
    pub max_retries: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read_timeout_ms: 100,
            ack_timeout_ms: 500,
            receive_timeout_ms: 500,
            silence_timeout_ms: 10_000,
            max_retries: 5,
        }
    }
}

impl Config {
    /// Buffer size sufficient for [`Config::to_slice`]
    pub const MAX_SERIALIZED_LEN: usize = Self::POSTCARD_MAX_SIZE;

    pub fn read_timeout(&self) -> Duration {
        Duration::from_ticks(self.read_timeout_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_ticks(self.ack_timeout_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_ticks(self.receive_timeout_ms)
    }

    pub fn silence_timeout(&self) -> Duration {
        Duration::from_ticks(self.silence_timeout_ms)
    }

    /// Serialize for storage
    pub fn to_slice<'a>(&self, buf: &'a mut [u8]) -> postcard::Result<&'a mut [u8]> {
        postcard::to_slice(self, buf)
    }

    /// Deserialize from storage
    pub fn from_bytes(data: &[u8]) -> postcard::Result<Self> {
        postcard::from_bytes(data)
    }
}
