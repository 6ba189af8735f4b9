//! Bit-level stream access used by the plane coders.
//!
//! The coders only need to push and pull a handful of bits at a time, so the
//! stream is reached through two narrow traits. Both are implemented for the
//! `bitstream-io` reader and writer, which take care of byte and bit order.

use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};
use std::io;

/// Sink for variable-length codes.
pub trait BitStreamWriter {
    /// Writes the lowest `num_bits` bits of `value`, most significant first.
    fn write_bits(&mut self, num_bits: u32, value: u64) -> io::Result<()>;
}

/// Source of variable-length codes.
pub trait BitStreamReader {
    /// Reads `num_bits` bits, most significant first.
    fn read_bits(&mut self, num_bits: u32) -> io::Result<u64>;

    fn read_one_bit(&mut self) -> io::Result<bool>;
}

impl<W: io::Write, E: Endianness> BitStreamWriter for BitWriter<W, E> {
    fn write_bits(&mut self, num_bits: u32, value: u64) -> io::Result<()> {
        match num_bits {
            0 => Ok(()),
            64 => self.write(64, value),
            n => self.write(n, value & ((1u64 << n) - 1)),
        }
    }
}

impl<R: io::Read, E: Endianness> BitStreamReader for BitReader<R, E> {
    fn read_bits(&mut self, num_bits: u32) -> io::Result<u64> {
        if num_bits == 0 {
            return Ok(0);
        }
        self.read::<u64>(num_bits)
    }

    fn read_one_bit(&mut self) -> io::Result<bool> {
        self.read_bit()
    }
}

/// Pads the writer to the next byte boundary with zero bits and hands back the bytes.
pub fn finish_stream<E: Endianness>(mut writer: BitWriter<Vec<u8>, E>) -> io::Result<Vec<u8>> {
    writer.byte_align()?;
    Ok(writer.into_writer())
}
