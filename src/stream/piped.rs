use core::cell::RefCell;

use super::{ByteStream, Loopback};

/// Two streams connected crosswise
///
/// Everything written to [`PipePair::first`] can be read from [`PipePair::second`]
/// and the other way round. Useful as a serial- or socket-like layer between
/// components, e.g. between application logic and a [`crate::PackageInterface`].
///
/// The pair owns both buffers; ends borrow it, so it is meant to live in a
/// `static` or in a long-living stack frame.
pub struct PipePair<const N: usize> {
    first_to_second: RefCell<Loopback<N>>,
    second_to_first: RefCell<Loopback<N>>,
}

/// One side of a [`PipePair`]
pub struct PipeEnd<'a, const N: usize> {
    rx: &'a RefCell<Loopback<N>>,
    tx: &'a RefCell<Loopback<N>>,
}

impl<const N: usize> PipePair<N> {
    pub const fn new() -> Self {
        Self {
            first_to_second: RefCell::new(Loopback::new()),
            second_to_first: RefCell::new(Loopback::new()),
        }
    }

    pub fn first(&self) -> PipeEnd<'_, N> {
        PipeEnd { rx: &self.second_to_first, tx: &self.first_to_second }
    }

    pub fn second(&self) -> PipeEnd<'_, N> {
        PipeEnd { rx: &self.first_to_second, tx: &self.second_to_first }
    }
}

impl<const N: usize> Default for PipePair<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> ByteStream for PipeEnd<'a, N> {
    fn available(&self) -> usize {
        self.rx.borrow().available()
    }

    fn read(&mut self) -> Option<u8> {
        self.rx.borrow_mut().read()
    }

    fn peek(&self) -> Option<u8> {
        self.rx.borrow().peek()
    }

    fn available_for_write(&self) -> usize {
        self.tx.borrow().available_for_write()
    }

    fn write(&mut self, data: &[u8]) -> usize {
        self.tx.borrow_mut().write(data)
    }

    /// Clears both directions
    fn clear(&mut self) {
        self.rx.borrow_mut().clear();
        self.tx.borrow_mut().clear();
    }
}
