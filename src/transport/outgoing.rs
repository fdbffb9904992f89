use heapless::Vec;

use crate::checksum::ChecksumGen;
use crate::config::{Config, MAX_DATA_LEN};
use crate::packet::PacketType;
use crate::stream::ByteStream;
use crate::timer::{Instant, Timer};
use super::{stats, Flow, Link, Response};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Collect application bytes for the next packet
    ReadData,
    /// Send (or resend) the current packet
    SendPackage,
    /// Packet is in flight
    WaitForAckOrNack,
}

/// Sending side: application bytes to DATA packets
///
/// Stop-and-wait: the next packet is not started until the current one is
/// acknowledged or dropped.
pub struct Outgoing {
    state: State,
    data: Vec<u8, MAX_DATA_LEN>,
    // Read window in ReadData, response timeout in WaitForAckOrNack
    timer: Timer,
    retries: u8,
}

impl Outgoing {
    pub fn new(config: &Config, now: Instant) -> Self {
        Self {
            state: State::ReadData,
            data: Vec::new(),
            timer: Timer::new(config.read_timeout(), now),
            retries: 0,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> State {
        self.state
    }

    /// Check if there is no data waiting to be sent
    pub fn is_idle(&self) -> bool {
        self.state == State::ReadData && self.data.is_empty()
    }

    /// Drop current packet and start collecting data from scratch
    pub fn reset(&mut self, config: &Config, now: Instant) {
        *self = Self::new(config, now);
    }

    /// Drop collected data and any packet in flight, keeping the timer
    ///
    /// The read window is restarted by the next application byte anyway.
    pub fn discard(&mut self, config: &Config) {
        self.state = State::ReadData;
        self.data.clear();
        self.retries = 0;
        self.timer.set_interval(config.read_timeout());
    }

    pub fn step<P, E, C>(&mut self, link: &mut Link<P, E, C>, now: Instant) -> Flow
    where
        P: ByteStream,
        E: ByteStream,
        C: ChecksumGen<Output = u16>,
    {
        match self.state {
            State::ReadData => self.read_data(link, now),
            State::SendPackage => self.send_package(link, now),
            State::WaitForAckOrNack => self.wait_for_response(link, now),
        }
    }

    fn read_data<P, E, C>(&mut self, link: &mut Link<P, E, C>, now: Instant) -> Flow
    where
        P: ByteStream,
        E: ByteStream,
        C: ChecksumGen<Output = u16>,
    {
        while !self.data.is_full() {
            match link.plain.read() {
                Some(byte) => {
                    if self.data.is_empty() {
                        self.timer.restart(now);
                    }
                    // Cannot fail, checked for space above
                    self.data.push(byte).ok();
                },
                None => break,
            }
        }

        if !self.data.is_empty() && self.timer.is_ready(now) {
            self.retries = 0;
            self.state = State::SendPackage;
            Flow::Continue
        } else {
            Flow::Yield
        }
    }

    fn send_package<P, E, C>(&mut self, link: &mut Link<P, E, C>, now: Instant) -> Flow
    where
        P: ByteStream,
        E: ByteStream,
        C: ChecksumGen<Output = u16>,
    {
        let number = link.seq.outgoing();
        let packet = link.prepare(PacketType::Data, number, &self.data);

        if link.send(&packet).is_err() {
            warn!("Output buffer full, packet {=u8} delayed", number);
            return Flow::Yield;
        }

        // Responses that arrived before this transmission are outdated
        link.pending.clear();

        if self.retries == 0 {
            trace!("Sent packet {=u8} ({=usize} B)", number, self.data.len());
            stats::inc(&mut link.stats.sent);
        } else {
            stats::inc(&mut link.stats.retransmitted);
        }

        self.timer.set_interval(link.config.ack_timeout());
        self.timer.restart(now);
        self.state = State::WaitForAckOrNack;
        Flow::Continue
    }

    fn wait_for_response<P, E, C>(&mut self, link: &mut Link<P, E, C>, now: Instant) -> Flow
    where
        P: ByteStream,
        E: ByteStream,
        C: ChecksumGen<Output = u16>,
    {
        let number = link.seq.outgoing();

        while let Some(msg) = link.pending.pop_front() {
            if msg.number != number {
                continue;
            }
            match msg.response {
                Response::Ack => {
                    trace!("Packet {=u8} acknowledged", number);
                    stats::inc(&mut link.stats.acked);
                    self.finish(link, now);
                    return Flow::Continue;
                },
                Response::Nack(reason) => {
                    debug!("Packet {=u8} rejected: {}", number, reason);
                    stats::inc(&mut link.stats.nacks_received);
                    return self.retry(link, now);
                },
            }
        }

        if self.timer.is_ready(now) {
            debug!("No response to packet {=u8}", number);
            stats::inc(&mut link.stats.timeouts);
            return self.retry(link, now);
        }

        Flow::Yield
    }

    fn retry<P, E, C>(&mut self, link: &mut Link<P, E, C>, now: Instant) -> Flow
    where
        P: ByteStream,
        E: ByteStream,
        C: ChecksumGen<Output = u16>,
    {
        if self.retries < link.config.max_retries {
            self.retries += 1;
            debug!("Retransmission {=u8} of packet {=u8}", self.retries, link.seq.outgoing());
            self.state = State::SendPackage;
        } else {
            warn!("Packet {=u8} dropped after {=u8} retries", link.seq.outgoing(), self.retries);
            stats::inc(&mut link.stats.dropped);
            // Number is reused by the next packet
            self.reset(&link.config, now);
        }
        Flow::Continue
    }

    /// Current packet acknowledged, move on to the next number
    fn finish<P, E, C>(&mut self, link: &mut Link<P, E, C>, now: Instant)
    where
        P: ByteStream,
        E: ByteStream,
        C: ChecksumGen<Output = u16>,
    {
        if link.seq.advance_outgoing() {
            debug!("Packet numbering wrapped around");
        }
        self.reset(&link.config, now);
    }
}
