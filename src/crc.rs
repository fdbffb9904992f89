use crate::checksum::ChecksumGen;

/// CRC-16/CCITT-FALSE: poly=0x1021, init=0xffff, no reflection, no final xor
static CRC16_CCITT: ::crc::Crc<u16> = ::crc::Crc::<u16>::new(&::crc::CRC_16_IBM_3740);

/// Table-driven software CRC-16
///
/// Targets without a CRC peripheral use this one. Any other [`ChecksumGen`] with
/// 16-bit output computing the same polynomial can be used instead.
#[derive(Default, Clone, Copy)]
pub struct Crc16;

impl Crc16 {
    pub const fn new() -> Self {
        Self
    }
}

impl ChecksumGen for Crc16 {
    type Output = u16;

    fn checksum(&mut self, data: &[u8]) -> Self::Output {
        CRC16_CCITT.checksum(data)
    }
}
