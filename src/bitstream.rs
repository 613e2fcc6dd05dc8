//! Bit-level stream primitives (Spec 6.2, 9.1).
//!
//! MSB-first Bit-Streams: das erste geschriebene Bit landet im
//! hoechstwertigen Bit des ersten Bytes. `align()` fuellt mit 0-Bits bis
//! zur naechsten Byte-Grenze (Spec 6.2: padding bits are zero).

use crate::{Error, Result};

/// Writes bits MSB-first into a growable byte buffer.
///
/// Der Cursor arbeitet direkt auf dem letzten Byte des Buffers; ein
/// angefangenes Byte enthaelt in den noch freien Positionen immer 0-Bits,
/// `align()` ist daher ein reines Zuruecksetzen des Bit-Zaehlers.
#[derive(Debug, Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    /// Belegte Bits im letzten Byte (0..8); 0 = Byte-Grenze.
    used: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True wenn der Cursor auf einer Byte-Grenze steht.
    pub fn is_aligned(&self) -> bool {
        self.used == 0
    }

    /// Byte-Laenge des Buffers (ein angefangenes Byte zaehlt mit).
    pub fn byte_len(&self) -> usize {
        self.buf.len()
    }

    /// Schreibt das niederwertigste Bit von `bit`.
    pub fn write_bit(&mut self, bit: u8) {
        if self.used == 0 {
            self.buf.push((bit & 1) << 7);
            self.used = 1;
        } else {
            let last = self.buf.len() - 1;
            self.buf[last] |= (bit & 1) << (7 - self.used);
            self.used = (self.used + 1) % 8;
        }
    }

    /// Schreibt die unteren `n` Bits von `value`, hoechstwertiges zuerst.
    ///
    /// # Panics
    ///
    /// Bei `n > 64` (Bitbreiten kommen aus `bit_width` und sind begrenzt).
    pub fn write_bits(&mut self, value: u64, n: u8) {
        assert!(n <= 64);
        let mut i = n;
        while i > 0 {
            i -= 1;
            self.write_bit(((value >> i) & 1) as u8);
        }
    }

    /// Fuellt mit 0-Bits bis zur naechsten Byte-Grenze.
    pub fn align(&mut self) {
        self.used = 0;
    }

    /// Schreibt ein Byte, aligned vorher falls noetig.
    pub fn write_byte(&mut self, byte: u8) {
        if self.used != 0 {
            self.align();
        }
        self.buf.push(byte);
    }

    /// Schreibt rohe Bytes (aligned).
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.used != 0 {
            self.align();
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Schliesst den Stream (Padding auf Byte-Grenze) und gibt den Buffer zurueck.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.align();
        self.buf
    }

    /// Nimmt den bisherigen Inhalt heraus und setzt den Writer zurueck.
    pub fn take(&mut self) -> Vec<u8> {
        self.align();
        std::mem::take(&mut self.buf)
    }
}

/// Reads bits MSB-first from an owned byte buffer.
///
/// Besitzt die Daten, damit auch dekomprimierte Block-Streams ohne
/// Selbstreferenz gelesen werden koennen.
#[derive(Debug)]
pub struct BitReader {
    data: Vec<u8>,
    /// Absolute Bit-Position.
    pos: usize,
}

impl BitReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    /// Aktuelle Byte-Position (aufgerundet auf die naechste Grenze).
    pub fn byte_pos(&self) -> usize {
        self.pos.div_ceil(8)
    }

    /// True wenn mindestens ein weiteres Bit verfuegbar ist.
    pub fn has_more(&self) -> bool {
        self.pos < self.data.len() * 8
    }

    pub fn read_bit(&mut self) -> Result<u8> {
        let byte = self.pos / 8;
        if byte >= self.data.len() {
            return Err(Error::PrematureEndOfStream);
        }
        let bit = (self.data[byte] >> (7 - (self.pos % 8))) & 1;
        self.pos += 1;
        Ok(bit)
    }

    /// Liest `n` Bits, hoechstwertiges zuerst.
    pub fn read_bits(&mut self, n: u8) -> Result<u64> {
        debug_assert!(n <= 64);
        if self.pos + n as usize > self.data.len() * 8 {
            return Err(Error::PrematureEndOfStream);
        }
        let mut v = 0u64;
        for _ in 0..n {
            v = (v << 1) | self.read_bit()? as u64;
        }
        Ok(v)
    }

    /// Springt zur naechsten Byte-Grenze (Padding wird verworfen).
    pub fn align(&mut self) {
        self.pos = self.pos.div_ceil(8) * 8;
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        if !self.is_aligned() {
            self.align();
        }
        let byte = self.pos / 8;
        if byte >= self.data.len() {
            return Err(Error::PrematureEndOfStream);
        }
        self.pos += 8;
        Ok(self.data[byte])
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        if !self.is_aligned() {
            self.align();
        }
        let start = self.pos / 8;
        let end = start.checked_add(n).ok_or(Error::PrematureEndOfStream)?;
        if end > self.data.len() {
            return Err(Error::PrematureEndOfStream);
        }
        self.pos = end * 8;
        Ok(self.data[start..end].to_vec())
    }

    /// Verwirft alles bis zur aktuellen Byte-Grenze und liefert den Rest.
    pub fn into_remaining(mut self) -> Vec<u8> {
        self.align();
        let start = (self.pos / 8).min(self.data.len());
        self.data.split_off(start)
    }
}
