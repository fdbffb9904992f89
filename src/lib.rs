#![no_std]

// Use std when running tests, see: https://stackoverflow.com/a/28186509
// Make sure to use different target when testing, e.g.
//   cargo test --target x86_64-unknown-linux-gnu
#[cfg(test)]
#[macro_use]
extern crate std;

// Must go first so that the logging macros are visible in all other modules
#[macro_use]
mod fmt;

pub mod checksum;
pub mod config;
pub mod crc;
pub mod error;
pub mod packet;
pub mod serial;
pub mod stream;
pub mod timer;
pub mod transport;

pub use config::Config;
pub use error::{Error, NackReason};
pub use packet::{Packet, PacketType};
pub use stream::{ByteStream, Loopback, PipeEnd, PipePair};
pub use timer::{Duration, Instant};
pub use transport::{CrcTransport, PackageInterface, PassThrough, Stats};
