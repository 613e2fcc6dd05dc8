//! Encoder-/Decoder-Channels (Spec 7.1, 9.1).
//!
//! Ein Channel buendelt einen Bit-Stream mit dem Alignment-Modus. Im
//! Byte-aligned Modus (auch Pre-Compression/Compression, Spec 9.1) werden
//! n-Bit-Werte auf ganze Bytes verbreitert (LSB-Byte zuerst) und Booleans
//! belegen ein ganzes Byte; alle uebrigen Operationen sind in beiden Modi
//! bit-identisch aufgebaut.

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result};

/// Write side of a value or structure channel.
#[derive(Debug)]
pub struct EncoderChannel {
    writer: BitWriter,
    byte_aligned: bool,
}

impl EncoderChannel {
    pub fn new(byte_aligned: bool) -> Self {
        Self { writer: BitWriter::new(), byte_aligned }
    }

    pub fn is_byte_aligned_mode(&self) -> bool {
        self.byte_aligned
    }

    /// Aktuelle Byte-Laenge (fuer SC-Offsets nach `align`).
    pub fn byte_len(&self) -> usize {
        self.writer.byte_len()
    }

    /// Spec 7.1.2: 1 Bit, bzw. 1 Byte im aligned Modus.
    pub fn encode_boolean(&mut self, b: bool) {
        if self.byte_aligned {
            self.writer.write_byte(b as u8);
        } else {
            self.writer.write_bit(b as u8);
        }
    }

    /// Spec 7.1.9: n-Bit Unsigned Integer.
    ///
    /// Aligned: ⌈n/8⌉ Bytes, niederwertigstes Byte zuerst. 0 Bits → nichts.
    pub fn encode_n_bit_unsigned(&mut self, value: u64, bits: u8) {
        if bits == 0 {
            return;
        }
        if self.byte_aligned {
            let mut v = value;
            for _ in 0..bits.div_ceil(8) {
                self.writer.write_byte((v & 0xFF) as u8);
                v >>= 8;
            }
        } else {
            self.writer.write_bits(value, bits);
        }
    }

    /// Ein Oktett (8 Bits, in beiden Modi identisch codiert).
    pub fn encode_octet(&mut self, byte: u8) {
        if self.byte_aligned {
            self.writer.write_byte(byte);
        } else {
            self.writer.write_bits(byte as u64, 8);
        }
    }

    /// Rohe Bytes, Oktett fuer Oktett.
    pub fn encode_octets(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.encode_octet(b);
        }
    }

    /// Padding auf die naechste Byte-Grenze (Spec 8.4.3 SC, 9.1 Block-Ende).
    pub fn align(&mut self) {
        self.writer.align();
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.writer.into_vec()
    }

    /// Leert den Channel (Block-Grenze) ohne ihn zu verbrauchen.
    pub fn take(&mut self) -> Vec<u8> {
        self.writer.take()
    }
}

/// Read side; mirrors [`EncoderChannel`].
#[derive(Debug)]
pub struct DecoderChannel {
    reader: BitReader,
    byte_aligned: bool,
}

impl DecoderChannel {
    pub fn new(data: Vec<u8>, byte_aligned: bool) -> Self {
        Self { reader: BitReader::new(data), byte_aligned }
    }

    pub fn is_byte_aligned_mode(&self) -> bool {
        self.byte_aligned
    }

    pub fn has_more(&self) -> bool {
        self.reader.has_more()
    }

    pub fn byte_pos(&self) -> usize {
        self.reader.byte_pos()
    }

    pub fn decode_boolean(&mut self) -> Result<bool> {
        if self.byte_aligned {
            Ok(self.reader.read_byte()? != 0)
        } else {
            Ok(self.reader.read_bit()? != 0)
        }
    }

    pub fn decode_n_bit_unsigned(&mut self, bits: u8) -> Result<u64> {
        if bits == 0 {
            return Ok(0);
        }
        if self.byte_aligned {
            let mut v = 0u64;
            for i in 0..bits.div_ceil(8) {
                let b = self.reader.read_byte()? as u64;
                v |= b << (8 * i as u32);
            }
            Ok(v)
        } else {
            self.reader.read_bits(bits)
        }
    }

    pub fn decode_octet(&mut self) -> Result<u8> {
        if self.byte_aligned {
            self.reader.read_byte()
        } else {
            Ok(self.reader.read_bits(8)? as u8)
        }
    }

    pub fn decode_octets(&mut self, n: usize) -> Result<Vec<u8>> {
        // Laengen kommen aus Unsigned-Integer-Decodes und koennen luegen.
        if n > isize::MAX as usize / 2 {
            return Err(Error::PrematureEndOfStream);
        }
        let mut out = Vec::with_capacity(n.min(1 << 20));
        for _ in 0..n {
            out.push(self.decode_octet()?);
        }
        Ok(out)
    }

    pub fn align(&mut self) {
        self.reader.align();
    }

    /// Verwirft Padding und liefert die restlichen Bytes (SC, Block-Wechsel).
    pub fn into_remaining(self) -> Vec<u8> {
        self.reader.into_remaining()
    }
}
