//! Bounded, non-blocking byte channels
//!
//! Components exchange bytes through [`ByteStream`]s instead of calling each other.
//! No operation ever blocks: reading from an empty stream returns [`None`] and
//! writing to a full one accepts fewer bytes, so callers treat lack of data or
//! space as "not yet" and retry on a later tick.

/// Circular FIFO of bytes
pub mod loopback;
/// Connected pairs of streams
pub mod piped;

pub use loopback::Loopback;
pub use piped::{PipeEnd, PipePair};

/// Byte channel with separate read and write sides
pub trait ByteStream {
    /// Number of bytes that can be read right now
    fn available(&self) -> usize;

    /// Take next byte
    fn read(&mut self) -> Option<u8>;

    /// Look at next byte without consuming it
    fn peek(&self) -> Option<u8>;

    /// Number of bytes that can be written without losing data
    fn available_for_write(&self) -> usize;

    /// Write as much of `data` as fits, returning the number of bytes accepted
    fn write(&mut self, data: &[u8]) -> usize;

    /// Drop all buffered data
    fn clear(&mut self);
}
