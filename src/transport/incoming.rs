use crate::checksum::ChecksumGen;
use crate::config::{PACKET_LEN, START_BYTE};
use crate::error::NackReason;
use crate::packet::{Packet, PacketType};
use crate::stream::ByteStream;
use crate::timer::{Duration, Instant, Timer};
use super::{stats, Flow, Link, PendingMessage, Response};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Skip anything that cannot start a packet
    WaitForStartByte,
    /// Collect the rest of the packet
    ReadIncomingData,
    /// Validate the packet and act on it
    ProcessIncomingData,
}

/// Receiving side: link bytes to packets
pub struct Incoming {
    state: State,
    frame: [u8; PACKET_LEN],
    len: usize,
    timer: Timer,
}

impl Incoming {
    pub fn new(now: Instant) -> Self {
        Self {
            state: State::WaitForStartByte,
            frame: [0; PACKET_LEN],
            len: 0,
            // Interval is set when a packet starts
            timer: Timer::new(Duration::from_ticks(0), now),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Drop partially received packet
    pub fn reset(&mut self) {
        self.state = State::WaitForStartByte;
        self.len = 0;
    }

    pub fn step<P, E, C>(&mut self, link: &mut Link<P, E, C>, now: Instant) -> Flow
    where
        P: ByteStream,
        E: ByteStream,
        C: ChecksumGen<Output = u16>,
    {
        match self.state {
            State::WaitForStartByte => self.wait_for_start(link, now),
            State::ReadIncomingData => self.read_incoming(link, now),
            State::ProcessIncomingData => self.process(link),
        }
    }

    fn wait_for_start<P, E, C>(&mut self, link: &mut Link<P, E, C>, now: Instant) -> Flow
    where
        P: ByteStream,
        E: ByteStream,
        C: ChecksumGen<Output = u16>,
    {
        let mut skipped = 0usize;
        let flow = loop {
            match link.encoded.peek() {
                Some(START_BYTE) => {
                    // Start byte is consumed as part of the frame
                    self.len = 0;
                    self.timer.set_interval(link.config.receive_timeout());
                    self.timer.restart(now);
                    self.state = State::ReadIncomingData;
                    break Flow::Continue;
                },
                Some(_) => {
                    link.encoded.read();
                    skipped += 1;
                },
                None => break Flow::Yield,
            }
        };
        if skipped > 0 {
            trace!("Skipped {=usize} B before start byte", skipped);
        }
        flow
    }

    fn read_incoming<P, E, C>(&mut self, link: &mut Link<P, E, C>, now: Instant) -> Flow
    where
        P: ByteStream,
        E: ByteStream,
        C: ChecksumGen<Output = u16>,
    {
        while self.len < PACKET_LEN {
            match link.encoded.read() {
                Some(byte) => {
                    self.frame[self.len] = byte;
                    self.len += 1;
                },
                None => break,
            }
        }

        if self.len == PACKET_LEN {
            self.state = State::ProcessIncomingData;
            Flow::Continue
        } else if self.timer.is_ready(now) {
            debug!("Reception timeout with {=usize} of {=usize} B", self.len, PACKET_LEN);
            self.reset();
            Flow::Continue
        } else {
            Flow::Yield
        }
    }

    fn process<P, E, C>(&mut self, link: &mut Link<P, E, C>) -> Flow
    where
        P: ByteStream,
        E: ByteStream,
        C: ChecksumGen<Output = u16>,
    {
        let packet = Packet::from_bytes(self.frame);
        let verdict = packet.validate(&mut link.checksum)
            .and_then(|_| packet.kind());

        let needs_reply = match verdict {
            Ok(PacketType::Data | PacketType::Reset) => true,
            Ok(PacketType::Ack | PacketType::Nack) => false,
            // Only a DATA packet sender waits for the verdict, others are not worth a response
            Err(_) => packet.type_byte() == PacketType::Data as u8,
        };
        if needs_reply && !link.can_send() {
            warn!("Output buffer full, response to packet {=u8} delayed", packet.number());
            return Flow::Yield;
        }

        let flow = match verdict {
            Ok(PacketType::Data) => {
                on_data(link, &packet);
                Flow::Processed
            },
            Ok(PacketType::Reset) => {
                info!("Reset requested by peer");
                let ack = link.prepare(PacketType::Ack, 0, &[]);
                link.send(&ack).ok();
                Flow::Reset
            },
            Ok(PacketType::Ack) => {
                on_response(link, packet.number(), Response::Ack);
                Flow::Processed
            },
            Ok(PacketType::Nack) => {
                on_response(link, packet.number(), Response::Nack(packet.nack_reason()));
                Flow::Processed
            },
            Err(reason) => {
                warn!("Invalid packet {=u8}: {}", packet.number(), reason);
                stats::inc(&mut link.stats.invalid);
                if needs_reply {
                    send_nack(link, packet.number(), reason);
                }
                Flow::Processed
            },
        };

        self.reset();
        flow
    }
}

fn on_data<P, E, C>(link: &mut Link<P, E, C>, packet: &Packet)
where
    P: ByteStream,
    E: ByteStream,
    C: ChecksumGen<Output = u16>,
{
    let number = packet.number();
    let payload = packet.payload();

    if !link.seq.is_new(number) {
        debug!("Duplicate packet {=u8}", number);
        stats::inc(&mut link.stats.duplicates);
    } else if link.plain.available_for_write() < payload.len() {
        warn!("Input buffer full, packet {=u8} rejected", number);
        stats::inc(&mut link.stats.overflows);
        send_nack(link, number, NackReason::BufferOverflow);
        return;
    } else {
        link.plain.write(payload);
        link.seq.accept_incoming(number);
        stats::inc(&mut link.stats.received);
    }

    let ack = link.prepare(PacketType::Ack, number, &[]);
    link.send(&ack).ok();
}

fn on_response<P, E, C>(link: &mut Link<P, E, C>, number: u8, response: Response)
where
    P: ByteStream,
    E: ByteStream,
    C: ChecksumGen<Output = u16>,
{
    if number == link.seq.outgoing() {
        // Loss of a response is covered by the retransmission timeout
        link.notify(PendingMessage { number, response }).ok();
    } else {
        trace!("Stale response to packet {=u8}", number);
    }
}

fn send_nack<P, E, C>(link: &mut Link<P, E, C>, number: u8, reason: NackReason)
where
    P: ByteStream,
    E: ByteStream,
    C: ChecksumGen<Output = u16>,
{
    debug!("Sending NACK {=u8}: {}", number, reason);
    let nack = Packet::nack(&mut link.checksum, number, reason);
    if link.send(&nack).is_ok() {
        stats::inc(&mut link.stats.nacks_sent);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, MAX_DATA_LEN, STOP_BYTE};
    use crate::crc::Crc16;
    use crate::packet::tests::raw_packet;
    use crate::stream::{Loopback, PipeEnd, PipePair};
    use crate::timer::ms;
    use std::vec::Vec;

    type TestLink<'a, const N: usize> = Link<Loopback<64>, PipeEnd<'a, N>, Crc16>;

    fn link<const N: usize>(pipe: &PipePair<N>) -> TestLink<'_, N> {
        Link::new(Loopback::new(), pipe.first(), Crc16::new(), Config::default())
    }

    fn run<const N: usize>(inc: &mut Incoming, link: &mut TestLink<'_, N>, now: u32) -> Vec<Flow> {
        let mut flows = Vec::new();
        for _ in 0..20 {
            let flow = inc.step(link, ms(now));
            if flow == Flow::Yield {
                return flows;
            }
            flows.push(flow);
        }
        panic!("State machine did not settle");
    }

    fn packet(kind: PacketType, number: u8, payload: &[u8]) -> Packet {
        Packet::prepare(&mut Crc16::new(), kind, number, payload)
    }

    fn replies<const N: usize>(peer: &mut PipeEnd<'_, N>) -> Vec<Packet> {
        let mut packets = Vec::new();
        while peer.available() >= PACKET_LEN {
            let mut bytes = [0u8; PACKET_LEN];
            for b in bytes.iter_mut() {
                *b = peer.read().unwrap();
            }
            packets.push(Packet::from_bytes(bytes));
        }
        packets
    }

    fn plain<const N: usize>(link: &mut TestLink<'_, N>) -> Vec<u8> {
        core::iter::from_fn(|| link.plain.read()).collect()
    }

    #[test]
    fn delivers_data_and_acks() {
        let pipe = PipePair::<64>::new();
        let (mut inc, mut link, mut peer) = (Incoming::new(ms(0)), link(&pipe), pipe.second());
        peer.write(packet(PacketType::Data, 1, &[0x10, 0x20, 0x30]).as_bytes());
        let flows = run(&mut inc, &mut link, 0);
        assert!(flows.contains(&Flow::Processed));
        assert_eq!(inc.state(), State::WaitForStartByte);

        assert_eq!(plain(&mut link), [0x10, 0x20, 0x30]);
        assert_eq!(replies(&mut peer), [packet(PacketType::Ack, 1, &[])]);
        assert_eq!(link.seq.last_incoming(), 1);
        assert_eq!(link.stats.received, 1);
    }

    #[test]
    fn duplicate_acked_but_not_delivered() {
        let pipe = PipePair::<64>::new();
        let (mut inc, mut link, mut peer) = (Incoming::new(ms(0)), link(&pipe), pipe.second());
        let data = packet(PacketType::Data, 1, b"once");
        peer.write(data.as_bytes());
        run(&mut inc, &mut link, 0);
        peer.write(data.as_bytes());
        run(&mut inc, &mut link, 10);

        assert_eq!(plain(&mut link), b"once");
        let ack = packet(PacketType::Ack, 1, &[]);
        assert_eq!(replies(&mut peer), [ack.clone(), ack]);
        assert_eq!(link.stats.duplicates, 1);
        assert_eq!(link.stats.received, 1);
    }

    #[test]
    fn only_increasing_numbers_delivered() {
        let pipe = PipePair::<64>::new();
        let (mut inc, mut link, mut peer) = (Incoming::new(ms(0)), link(&pipe), pipe.second());

        link.seq.accept_incoming(10);
        peer.write(packet(PacketType::Data, 138, b"far").as_bytes());
        run(&mut inc, &mut link, 0);
        assert_eq!(plain(&mut link), b"far");
        assert_eq!(link.seq.last_incoming(), 138);

        link.seq.accept_incoming(200);
        peer.write(packet(PacketType::Data, 50, b"old").as_bytes());
        run(&mut inc, &mut link, 10);
        assert!(plain(&mut link).is_empty());
        assert_eq!(link.seq.last_incoming(), 200);

        let replies = replies(&mut peer);
        assert_eq!(replies, [packet(PacketType::Ack, 138, &[]), packet(PacketType::Ack, 50, &[])]);
        assert_eq!(link.stats.duplicates, 1);
    }

    #[test]
    fn corrupted_data_gets_nack() {
        let pipe = PipePair::<64>::new();
        let (mut inc, mut link, mut peer) = (Incoming::new(ms(0)), link(&pipe), pipe.second());
        let mut bytes = *packet(PacketType::Data, 4, b"abc").as_bytes();
        bytes[12] ^= 0xff;
        peer.write(&bytes);
        run(&mut inc, &mut link, 0);

        let replies = replies(&mut peer);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].kind(), Ok(PacketType::Nack));
        assert_eq!(replies[0].number(), 4);
        assert_eq!(replies[0].payload(), &[NackReason::InvalidCrc as u8]);
        assert!(plain(&mut link).is_empty());
        assert_eq!(link.seq.last_incoming(), 0);
        assert_eq!(link.stats.invalid, 1);
        assert_eq!(link.stats.nacks_sent, 1);
    }

    #[test]
    fn nack_reasons() {
        let mut bad_stop = *raw_packet(1, 0, 0, &[]).as_bytes();
        bad_stop[PACKET_LEN - 1] = !STOP_BYTE;
        let cases = [
            (raw_packet(1, 0, MAX_DATA_LEN as u8 + 1, &[]), NackReason::InvalidLength),
            (Packet::from_bytes(bad_stop), NackReason::InvalidFraming),
        ];
        for (p, reason) in cases {
            let pipe = PipePair::<64>::new();
            let (mut inc, mut link, mut peer) = (Incoming::new(ms(0)), link(&pipe), pipe.second());
            peer.write(p.as_bytes());
            run(&mut inc, &mut link, 0);
            let replies = replies(&mut peer);
            assert_eq!(replies.len(), 1);
            assert_eq!(replies[0].nack_reason(), reason);
        }
    }

    #[test]
    fn invalid_non_data_dropped_silently() {
        let pipe = PipePair::<64>::new();
        let (mut inc, mut link, mut peer) = (Incoming::new(ms(0)), link(&pipe), pipe.second());
        let mut ack = *packet(PacketType::Ack, 1, &[]).as_bytes();
        ack[13] ^= 0x01;
        peer.write(&ack);
        peer.write(raw_packet(1, 7, 0, &[]).as_bytes());
        let flows = run(&mut inc, &mut link, 0);
        assert_eq!(flows.iter().filter(|&&f| f == Flow::Processed).count(), 2);
        assert!(replies(&mut peer).is_empty());
        assert!(link.pending.is_empty());
        assert_eq!(link.stats.invalid, 2);
    }

    #[test]
    fn responses_forwarded_to_outgoing() {
        let pipe = PipePair::<64>::new();
        let (mut inc, mut link, mut peer) = (Incoming::new(ms(0)), link(&pipe), pipe.second());
        peer.write(packet(PacketType::Ack, 1, &[]).as_bytes());
        peer.write(Packet::nack(&mut Crc16::new(), 1, NackReason::BufferOverflow).as_bytes());
        // Not the packet currently in flight
        peer.write(packet(PacketType::Ack, 2, &[]).as_bytes());
        run(&mut inc, &mut link, 0);

        assert_eq!(link.pending.pop_front(), Some(PendingMessage { number: 1, response: Response::Ack }));
        assert_eq!(link.pending.pop_front(), Some(PendingMessage {
            number: 1,
            response: Response::Nack(NackReason::BufferOverflow),
        }));
        assert_eq!(link.pending.pop_front(), None);
        assert!(replies(&mut peer).is_empty());
    }

    #[test]
    fn reset_acked_with_zero() {
        let pipe = PipePair::<64>::new();
        let (mut inc, mut link, mut peer) = (Incoming::new(ms(0)), link(&pipe), pipe.second());
        peer.write(packet(PacketType::Reset, 0, &[]).as_bytes());
        let flows = run(&mut inc, &mut link, 0);
        assert_eq!(flows.last(), Some(&Flow::Reset));
        assert_eq!(replies(&mut peer), [packet(PacketType::Ack, 0, &[])]);
    }

    #[test]
    fn skips_garbage_before_start_byte() {
        let pipe = PipePair::<64>::new();
        let (mut inc, mut link, mut peer) = (Incoming::new(ms(0)), link(&pipe), pipe.second());
        peer.write(&[0x00, 0x55, 0x13]);
        peer.write(packet(PacketType::Data, 1, b"ok").as_bytes());
        run(&mut inc, &mut link, 0);
        assert_eq!(plain(&mut link), b"ok");
    }

    #[test]
    fn partial_packet_times_out() {
        let pipe = PipePair::<64>::new();
        let (mut inc, mut link, mut peer) = (Incoming::new(ms(0)), link(&pipe), pipe.second());
        let bytes = *packet(PacketType::Data, 1, b"late").as_bytes();
        peer.write(&bytes[..7]);
        run(&mut inc, &mut link, 1000);
        assert_eq!(inc.state(), State::ReadIncomingData);
        run(&mut inc, &mut link, 1499);
        assert_eq!(inc.state(), State::ReadIncomingData);
        run(&mut inc, &mut link, 1500);
        assert_eq!(inc.state(), State::WaitForStartByte);

        // Next packet is received normally
        peer.write(packet(PacketType::Data, 2, b"next").as_bytes());
        run(&mut inc, &mut link, 1600);
        assert_eq!(plain(&mut link), b"next");
    }

    #[test]
    fn packet_arriving_in_pieces() {
        let pipe = PipePair::<64>::new();
        let (mut inc, mut link, mut peer) = (Incoming::new(ms(0)), link(&pipe), pipe.second());
        let bytes = *packet(PacketType::Data, 1, b"split").as_bytes();
        for (i, chunk) in bytes.chunks(4).enumerate() {
            peer.write(chunk);
            run(&mut inc, &mut link, 10 * i as u32);
        }
        assert_eq!(plain(&mut link), b"split");
    }

    #[test]
    fn full_input_buffer_rejects_payload() {
        let pipe = PipePair::<64>::new();
        let mut link: Link<Loopback<4>, _, _> =
            Link::new(Loopback::new(), pipe.first(), Crc16::new(), Config::default());
        let mut inc = Incoming::new(ms(0));
        let mut peer = pipe.second();
        link.plain.write(&[1, 2]);
        peer.write(packet(PacketType::Data, 1, b"abc").as_bytes());
        while inc.step(&mut link, ms(0)) != Flow::Yield {}

        assert_eq!(link.plain.available(), 2);
        assert_eq!(link.seq.last_incoming(), 0);
        let replies = replies(&mut peer);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].nack_reason(), NackReason::BufferOverflow);
        assert_eq!(link.stats.overflows, 1);
    }

    #[test]
    fn reply_waits_for_output_space() {
        let pipe = PipePair::<20>::new();
        let (mut inc, mut link, mut peer) = (Incoming::new(ms(0)), link(&pipe), pipe.second());
        // Unread output leaves no room for a whole packet
        link.encoded.write(&[0; 10]);
        peer.write(packet(PacketType::Data, 1, b"hi").as_bytes());

        run(&mut inc, &mut link, 0);
        assert_eq!(inc.state(), State::ProcessIncomingData);
        assert!(plain(&mut link).is_empty());
        run(&mut inc, &mut link, 1000);
        assert_eq!(inc.state(), State::ProcessIncomingData);

        for _ in 0..10 {
            peer.read();
        }
        run(&mut inc, &mut link, 1010);
        assert_eq!(inc.state(), State::WaitForStartByte);
        assert_eq!(plain(&mut link), b"hi");
        assert_eq!(replies(&mut peer), [packet(PacketType::Ack, 1, &[])]);
    }
}
