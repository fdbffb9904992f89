use crate::checksum::ChecksumGen;
use crate::config::{Config, MAX_TRANSITIONS};
use crate::crc::Crc16;
use crate::error::Error;
use crate::packet::PacketType;
use crate::stream::ByteStream;
use crate::timer::{Instant, Timer};
use super::incoming::{self, Incoming};
use super::outgoing::Outgoing;
use super::{stats, Flow, Link, PackageInterface, Stats};

/// Reliable transport over an unreliable byte link
///
/// Application bytes written to the plain stream are sent in numbered DATA
/// packets of up to 8 bytes, protected with CRC-16 and acknowledged by the peer.
/// Each direction is stop-and-wait: a packet is retransmitted on NACK or when
/// no response arrives in time, and dropped after [`Config::max_retries`]
/// retransmissions. Retransmitted packets are recognized by their number
/// and delivered to the peer application only once.
///
/// If no packet arrives for [`Config::silence_timeout_ms`] both directions are
/// reset, assuming that the peer has restarted in the meantime.
pub struct CrcTransport<P, E, C = Crc16> {
    link: Link<P, E, C>,
    outgoing: Outgoing,
    incoming: Incoming,
    silence: Timer,
}

impl<P, E> CrcTransport<P, E, Crc16>
where
    P: ByteStream,
    E: ByteStream,
{
    /// Create transport using software CRC
    pub fn new(plain: P, encoded: E, config: Config, now: Instant) -> Self {
        Self::with_checksum(plain, encoded, Crc16::new(), config, now)
    }
}

impl<P, E, C> CrcTransport<P, E, C>
where
    P: ByteStream,
    E: ByteStream,
    C: ChecksumGen<Output = u16>,
{
    /// Create transport with custom CRC-16/CCITT-FALSE implementation, e.g. a hardware unit
    pub fn with_checksum(plain: P, encoded: E, checksum: C, config: Config, now: Instant) -> Self {
        Self {
            outgoing: Outgoing::new(&config, now),
            incoming: Incoming::new(now),
            silence: Timer::new(config.silence_timeout(), now),
            link: Link::new(plain, encoded, checksum, config),
        }
    }

    /// Restart packet numbering and drop all packets in progress
    ///
    /// This is done locally only, the peer is not informed. Use
    /// [`CrcTransport::send_reset_packet`] to reset both sides.
    pub fn reset_packet_numbering(&mut self, now: Instant) {
        self.link.seq.reset();
        self.link.pending.clear();
        self.outgoing.reset(&self.link.config, now);
        self.incoming.reset();
        self.silence.restart(now);
        stats::inc(&mut self.link.stats.resets);
    }

    /// Request the peer to reset packet numbering and reset locally
    ///
    /// Local reset is performed even if there is no space to send the RESET packet.
    pub fn send_reset_packet(&mut self, now: Instant) -> Result<(), Error> {
        let packet = self.link.prepare(PacketType::Reset, 0, &[]);
        let result = self.link.send(&packet);
        match result {
            Ok(()) => info!("Sent reset"),
            Err(_) => warn!("Output buffer full, reset not sent"),
        }
        self.reset_packet_numbering(now);
        result
    }

    /// Number used by the packet currently (or next) being sent
    pub fn outgoing_packet_number(&self) -> u8 {
        self.link.seq.outgoing()
    }

    /// Number of the last delivered packet, 0 if none since reset
    pub fn last_incoming_packet_number(&self) -> u8 {
        self.link.seq.last_incoming()
    }

    /// Check if there is no packet in progress in either direction
    pub fn is_idle(&self) -> bool {
        self.outgoing.is_idle()
            && self.incoming.state() == incoming::State::WaitForStartByte
            && self.link.plain.available() == 0
            && self.link.encoded.available() == 0
    }

    pub fn config(&self) -> &Config {
        &self.link.config
    }

    pub fn stats(&self) -> &Stats {
        &self.link.stats
    }

    /// Get statistics and start counting from zero
    pub fn take_stats(&mut self) -> Stats {
        self.link.stats.take()
    }

    fn run_outgoing(&mut self, now: Instant) {
        for _ in 0..MAX_TRANSITIONS {
            if self.outgoing.step(&mut self.link, now) == Flow::Yield {
                return;
            }
        }
        warn!("Too many state transitions: outgoing");
        stats::inc(&mut self.link.stats.transition_limits);
    }

    fn run_incoming(&mut self, now: Instant) {
        for _ in 0..MAX_TRANSITIONS {
            match self.incoming.step(&mut self.link, now) {
                Flow::Yield => return,
                Flow::Continue => {},
                Flow::Processed => self.silence.restart(now),
                Flow::Reset => self.reset_packet_numbering(now),
            }
        }
        warn!("Too many state transitions: incoming");
        stats::inc(&mut self.link.stats.transition_limits);
    }
}

impl<P, E, C> PackageInterface for CrcTransport<P, E, C>
where
    P: ByteStream,
    E: ByteStream,
    C: ChecksumGen<Output = u16>,
{
    type Plain = P;
    type Encoded = E;

    fn tick(&mut self, now: Instant) {
        if self.silence.is_ready(now) {
            warn!("No packets for {=u32} ms, resetting", self.link.config.silence_timeout_ms);
            self.reset_packet_numbering(now);
        }

        self.run_outgoing(now);
        self.run_incoming(now);
    }

    fn plain(&mut self) -> &mut Self::Plain {
        &mut self.link.plain
    }

    fn encoded(&mut self) -> &mut Self::Encoded {
        &mut self.link.encoded
    }

    /// Drops buffered data and packets in progress; numbering is kept
    fn clear(&mut self) {
        self.link.plain.clear();
        self.link.encoded.clear();
        self.link.pending.clear();
        self.incoming.reset();
        self.outgoing.discard(&self.link.config);
    }
}
