//! Bridge between a serial port and a byte stream
//!
//! Feeds the encoded side of a package interface from any [`embedded_hal`] serial
//! port. Nothing blocks: the pass ends as soon as the port or the stream
//! cannot take more, so it can be called from the same loop as
//! [`crate::PackageInterface::tick`].

use embedded_hal::serial;

use crate::stream::ByteStream;

/// Move bytes between `port` and `stream` in both directions
///
/// Returns number of bytes (transmitted, received). A byte is removed from
/// `stream` only after the port accepted it, so nothing is lost when the port
/// is busy. Receive errors (overrun, framing, ...) drop the erroneous byte; the
/// packet it belonged to fails validation and is retransmitted.
pub fn pump<S, B>(port: &mut S, stream: &mut B) -> (usize, usize)
where
    S: serial::Read<u8> + serial::Write<u8>,
    B: ByteStream,
{
    (transmit(port, stream), receive(port, stream))
}

fn transmit<S, B>(port: &mut S, stream: &mut B) -> usize
where
    S: serial::Write<u8>,
    B: ByteStream,
{
    let mut n = 0;
    while let Some(byte) = stream.peek() {
        match port.write(byte) {
            Ok(()) => {
                stream.read();
                n += 1;
            },
            Err(nb::Error::WouldBlock) => break,
            Err(nb::Error::Other(_)) => {
                warn!("Serial write error");
                break;
            },
        }
    }
    n
}

fn receive<S, B>(port: &mut S, stream: &mut B) -> usize
where
    S: serial::Read<u8>,
    B: ByteStream,
{
    let mut n = 0;
    while stream.available_for_write() > 0 {
        match port.read() {
            Ok(byte) => {
                stream.write(&[byte]);
                n += 1;
            },
            Err(nb::Error::WouldBlock) => break,
            Err(nb::Error::Other(_)) => {
                warn!("Serial read error");
                break;
            },
        }
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::stream::{Loopback, PipePair};
    use crate::timer::ms;
    use crate::transport::{CrcTransport, PackageInterface};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::vec::Vec;

    #[derive(Debug)]
    struct LineError;

    type Line = Rc<RefCell<VecDeque<u8>>>;

    /// Serial port mock with limited transmit FIFO
    struct MockSerial {
        tx: Line,
        rx: Line,
        tx_fifo: usize,
        errors: VecDeque<bool>,
    }

    impl MockSerial {
        fn new(tx: Line, rx: Line, tx_fifo: usize) -> Self {
            Self { tx, rx, tx_fifo, errors: VecDeque::new() }
        }

        /// Two ports connected with a cable
        fn pair(tx_fifo: usize) -> (Self, Self) {
            let a = Line::default();
            let b = Line::default();
            (Self::new(Rc::clone(&a), Rc::clone(&b), tx_fifo), Self::new(b, a, tx_fifo))
        }
    }

    impl serial::Read<u8> for MockSerial {
        type Error = LineError;

        fn read(&mut self) -> nb::Result<u8, Self::Error> {
            if self.errors.pop_front().unwrap_or(false) {
                self.rx.borrow_mut().pop_front();
                return Err(nb::Error::Other(LineError));
            }
            self.rx.borrow_mut().pop_front().ok_or(nb::Error::WouldBlock)
        }
    }

    impl serial::Write<u8> for MockSerial {
        type Error = LineError;

        fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
            let mut tx = self.tx.borrow_mut();
            if tx.len() >= self.tx_fifo {
                return Err(nb::Error::WouldBlock);
            }
            tx.push_back(word);
            Ok(())
        }

        fn flush(&mut self) -> nb::Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn transmit_keeps_bytes_when_port_busy() {
        let (mut port, other) = MockSerial::pair(4);
        let mut stream = Loopback::<16>::new();
        stream.write(b"abcdef");

        assert_eq!(pump(&mut port, &mut stream), (4, 0));
        assert_eq!(stream.available(), 2);
        assert_eq!(stream.peek(), Some(b'e'));

        other.rx.borrow_mut().clear();
        assert_eq!(pump(&mut port, &mut stream), (2, 0));
        assert_eq!(other.rx.borrow().iter().copied().collect::<Vec<_>>(), b"ef");
    }

    #[test]
    fn receive_limited_by_stream_space() {
        let (mut port, mut other) = MockSerial::pair(16);
        for &b in b"123456" {
            serial::Write::write(&mut other, b).unwrap();
        }
        let mut stream = Loopback::<4>::new();
        assert_eq!(pump(&mut port, &mut stream), (0, 4));
        assert_eq!(port.rx.borrow().len(), 2);
    }

    #[test]
    fn read_error_ends_pass() {
        let (mut port, mut other) = MockSerial::pair(16);
        for &b in b"xyz" {
            serial::Write::write(&mut other, b).unwrap();
        }
        port.errors.extend([false, true]);
        let pipe = PipePair::<16>::new();
        let (mut stream, mut app) = (pipe.first(), pipe.second());

        assert_eq!(pump(&mut port, &mut stream), (0, 1));
        assert_eq!(app.read(), Some(b'x'));
        assert_eq!(app.read(), None);
        // Erroneous byte 'y' is gone, reception continues on next pass
        assert_eq!(pump(&mut port, &mut stream), (0, 1));
        assert_eq!(app.read(), Some(b'z'));
        assert!(port.rx.borrow().is_empty());
        assert!(other.rx.borrow().is_empty());
    }

    #[test]
    fn transports_over_serial_cable() {
        let pipes = [PipePair::<64>::new(), PipePair::<64>::new(), PipePair::<64>::new(), PipePair::<64>::new()];
        let config = Config::default();
        let mut left = CrcTransport::new(pipes[0].first(), pipes[1].first(), config.clone(), ms(0));
        let mut right = CrcTransport::new(pipes[2].first(), pipes[3].first(), config, ms(0));
        let (mut left_app, mut right_app) = (pipes[0].second(), pipes[2].second());
        let (mut left_wire, mut right_wire) = (pipes[1].second(), pipes[3].second());
        // Small FIFO so that packets cross the cable in pieces
        let (mut left_port, mut right_port) = MockSerial::pair(5);

        left_app.write(b"Hello over serial!");
        right_app.write(b"Hi");

        let mut received = (Vec::new(), Vec::new());
        for t in (0..2000).step_by(5) {
            left.tick(ms(t));
            pump(&mut left_port, &mut left_wire);
            pump(&mut right_port, &mut right_wire);
            right.tick(ms(t));
            pump(&mut right_port, &mut right_wire);
            pump(&mut left_port, &mut left_wire);
            received.0.extend(core::iter::from_fn(|| right_app.read()));
            received.1.extend(core::iter::from_fn(|| left_app.read()));
        }

        assert_eq!(received.0, b"Hello over serial!");
        assert_eq!(received.1, b"Hi");
        assert_eq!(left.stats().retransmitted, 0);
        assert_eq!(right.stats().retransmitted, 0);
    }
}
