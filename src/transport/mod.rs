//! Package interfaces
//!
//! A package interface sits between two [`ByteStream`]s: the *plain* one carries
//! application bytes and the *encoded* one carries whatever goes over the link.
//! [`CrcTransport`] wraps application data in checksummed, numbered and
//! acknowledged packets. [`PassThrough`] just moves bytes, for links that are
//! reliable on their own.
//!
//! Both are driven by calling [`PackageInterface::tick`] periodically and never block.

/// Reliable packet transport
pub mod crc_transport;
/// Transport without any framing
pub mod passthrough;

mod incoming;
mod outgoing;
mod sequence;
mod stats;

pub use crc_transport::CrcTransport;
pub use passthrough::PassThrough;
pub use sequence::Sequence;
pub use stats::Stats;

use heapless::Deque;

use crate::checksum::ChecksumGen;
use crate::config::{Config, PACKET_LEN, PENDING_QUEUE_DEPTH};
use crate::error::{Error, NackReason};
use crate::packet::{Packet, PacketType};
use crate::stream::ByteStream;
use crate::timer::Instant;

/// Common interface of all package interfaces
pub trait PackageInterface {
    /// Application side stream
    type Plain: ByteStream;
    /// Link side stream
    type Encoded: ByteStream;

    /// Make progress with the data and buffer space currently available
    fn tick(&mut self, now: Instant);

    fn plain(&mut self) -> &mut Self::Plain;

    fn encoded(&mut self) -> &mut Self::Encoded;

    /// Drop all data buffered in both streams and in the interface itself
    fn clear(&mut self);
}

/// Peer response to a DATA packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Response {
    Ack,
    Nack(NackReason),
}

/// Response passed from the incoming to the outgoing state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PendingMessage {
    pub number: u8,
    pub response: Response,
}

pub(crate) type PendingQueue = Deque<PendingMessage, PENDING_QUEUE_DEPTH>;

/// Result of a single state machine step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Nothing more to do until more data, space or time is available
    Yield,
    /// State changed, step again
    Continue,
    /// A complete packet has been handled
    Processed,
    /// Peer requested to reset packet numbering
    Reset,
}

/// State shared by both state machines
///
/// State machines only borrow it during a step, so they do not hold references
/// to each other; the only channel between them is the pending queue.
pub(crate) struct Link<P, E, C> {
    pub plain: P,
    pub encoded: E,
    pub checksum: C,
    pub config: Config,
    pub seq: Sequence,
    pub pending: PendingQueue,
    pub stats: Stats,
}

impl<P, E, C> Link<P, E, C>
where
    P: ByteStream,
    E: ByteStream,
    C: ChecksumGen<Output = u16>,
{
    pub fn new(plain: P, encoded: E, checksum: C, config: Config) -> Self {
        Self {
            plain,
            encoded,
            checksum,
            config,
            seq: Sequence::new(),
            pending: Deque::new(),
            stats: Stats::default(),
        }
    }

    pub fn prepare(&mut self, kind: PacketType, number: u8, payload: &[u8]) -> Packet {
        Packet::prepare(&mut self.checksum, kind, number, payload)
    }

    /// Check if a whole packet fits in the output buffer
    pub fn can_send(&self) -> bool {
        self.encoded.available_for_write() >= PACKET_LEN
    }

    /// Write whole packet or nothing
    pub fn send(&mut self, packet: &Packet) -> Result<(), Error> {
        if !self.can_send() {
            return Err(Error::BufferFull);
        }
        self.encoded.write(packet.as_bytes());
        Ok(())
    }

    /// Pass response to the outgoing state machine
    pub fn notify(&mut self, msg: PendingMessage) -> Result<(), Error> {
        self.pending.push_back(msg)
            .map_err(|_| {
                warn!("Pending queue full, response to packet {=u8} dropped", msg.number);
                stats::inc(&mut self.stats.overflows);
                Error::QueueFull
            })
    }
}
