use crate::stream::ByteStream;
use crate::timer::Instant;
use super::PackageInterface;

/// Package interface that does not add any framing
///
/// Bytes are copied between the streams as long as there is data and space.
/// Meant for trusted local links that are reliable on their own, so that the
/// application code is the same regardless of the link type.
pub struct PassThrough<P, E> {
    plain: P,
    encoded: E,
}

impl<P: ByteStream, E: ByteStream> PassThrough<P, E> {
    pub fn new(plain: P, encoded: E) -> Self {
        Self { plain, encoded }
    }
}

/// Move bytes from `from` to `to` until either runs out, returns number of bytes moved
fn copy(from: &mut impl ByteStream, to: &mut impl ByteStream) -> usize {
    let mut n = 0;
    while to.available_for_write() > 0 {
        match from.read() {
            Some(byte) => {
                to.write(&[byte]);
                n += 1;
            },
            None => break,
        }
    }
    n
}

impl<P: ByteStream, E: ByteStream> PackageInterface for PassThrough<P, E> {
    type Plain = P;
    type Encoded = E;

    fn tick(&mut self, _now: Instant) {
        let tx = copy(&mut self.plain, &mut self.encoded);
        let rx = copy(&mut self.encoded, &mut self.plain);
        if tx + rx > 0 {
            trace!("Pass-through: tx {=usize} B, rx {=usize} B", tx, rx);
        }
    }

    fn plain(&mut self) -> &mut Self::Plain {
        &mut self.plain
    }

    fn encoded(&mut self) -> &mut Self::Encoded {
        &mut self.encoded
    }

    fn clear(&mut self) {
        self.plain.clear();
        self.encoded.clear();
    }
}
