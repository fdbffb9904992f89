use heapless::Deque;

use super::ByteStream;

/// Stream that loops written data back for reading
///
/// When full, further writes are rejected, i.e. the newest bytes are lost.
pub struct Loopback<const N: usize> {
    buf: Deque<u8, N>,
}

impl<const N: usize> Loopback<N> {
    pub const fn new() -> Self {
        Self { buf: Deque::new() }
    }
}

impl<const N: usize> Default for Loopback<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ByteStream for Loopback<N> {
    fn available(&self) -> usize {
        self.buf.len()
    }

    fn read(&mut self) -> Option<u8> {
        self.buf.pop_front()
    }

    fn peek(&self) -> Option<u8> {
        self.buf.front().copied()
    }

    fn available_for_write(&self) -> usize {
        N - self.buf.len()
    }

    fn write(&mut self, data: &[u8]) -> usize {
        data.iter()
            .take_while(|&&byte| self.buf.push_back(byte).is_ok())
            .count()
    }

    fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    fn drain<const N: usize>(stream: &mut Loopback<N>) -> Vec<u8> {
        core::iter::from_fn(|| stream.read()).collect()
    }

    #[test]
    fn empty() {
        let mut s = Loopback::<4>::new();
        assert_eq!(s.available(), 0);
        assert_eq!(s.available_for_write(), 4);
        assert_eq!(s.peek(), None);
        assert_eq!(s.read(), None);
    }

    #[test]
    fn fifo_order() {
        let mut s = Loopback::<8>::new();
        assert_eq!(s.write(&[1, 2, 3]), 3);
        assert_eq!(s.available(), 3);
        assert_eq!(s.available_for_write(), 5);
        assert_eq!(s.peek(), Some(1));
        assert_eq!(s.peek(), Some(1));
        assert_eq!(s.read(), Some(1));
        assert_eq!(s.write(&[4]), 1);
        assert_eq!(drain(&mut s), [2, 3, 4]);
    }

    #[test]
    fn overflow_drops_newest() {
        let mut s = Loopback::<4>::new();
        assert_eq!(s.write(&[1, 2, 3]), 3);
        assert_eq!(s.write(&[4, 5, 6]), 1);
        assert_eq!(s.available_for_write(), 0);
        assert_eq!(s.write(&[7]), 0);
        assert_eq!(drain(&mut s), [1, 2, 3, 4]);
    }

    #[test]
    fn wraps_around() {
        let mut s = Loopback::<3>::new();
        for round in 0..5u8 {
            assert_eq!(s.write(&[round, round + 1]), 2);
            assert_eq!(drain(&mut s), [round, round + 1]);
        }
    }

    #[test]
    fn clear() {
        let mut s = Loopback::<8>::new();
        s.write(b"ab\n");
        s.clear();
        assert_eq!(s.available(), 0);
        assert_eq!(s.available_for_write(), 8);
        assert_eq!(s.read(), None);
    }
}
