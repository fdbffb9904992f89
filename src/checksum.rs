use num::{NumCast, PrimInt};

/// Checksum generator
///
/// In principle this is similar to [`core::hash::Hasher`] but allows to use output
/// different than u64 and to swap a software implementation for a hardware unit.
pub trait ChecksumGen {
    /// Checksum type that can be stored in a packet (e.g. [`u16`])
    type Output: PrimInt;

    /// Number of bytes in the output checksum
    const LEN: usize = core::mem::size_of::<Self::Output>();

    /// Compute checksum of all `data`
    fn checksum(&mut self, data: &[u8]) -> Self::Output;

    /// Encode checksum of `buf[..data_len]` right after the data, **most significant byte first**
    fn encode<'a>(&mut self, buf: &'a mut [u8], data_len: usize) -> Result<&'a [u8], Error>
    where
        Self: Sized
    {
        if buf.len() < data_len + Self::LEN {
            return Err(Error::BufTooShort);
        }
        let checksum = self.checksum(&buf[..data_len]);
        write_be(checksum, &mut buf[data_len..data_len + Self::LEN]);
        Ok(&buf[..data_len + Self::LEN])
    }

    /// Verify checksum at the end of `data`, returning the data without checksum
    fn verify<'a>(&mut self, data: &'a [u8]) -> Result<&'a [u8], Error>
    where
        Self: Sized
    {
        if data.len() < Self::LEN {
            return Err(Error::BufTooShort);
        }
        let (data, checksum) = data.split_at(data.len() - Self::LEN);
        if read_be::<Self::Output>(checksum) == self.checksum(data) {
            Ok(data)
        } else {
            Err(Error::ChecksumInvalid)
        }
    }
}

/// Checksum error
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChecksumInvalid,
    BufTooShort,
}

/// Store integer in `buf` in big-endian byte order, `buf.len()` must equal the integer size
pub(crate) fn write_be<T: PrimInt>(value: T, buf: &mut [u8]) {
    let n = buf.len();
    for (i, byte) in buf.iter_mut().enumerate() {
        let shift = 8 * (n - 1 - i);
        *byte = ((value >> shift) & <T as NumCast>::from(0xffu8).unwrap_or_else(T::zero))
            .to_u8()
            .unwrap_or(0);
    }
}

/// Read big-endian integer from all bytes in `buf`
pub(crate) fn read_be<T: PrimInt>(buf: &[u8]) -> T {
    buf.iter().fold(T::zero(), |acc, &byte| {
        (acc << 8) | <T as NumCast>::from(byte).unwrap_or_else(T::zero)
    })
}
