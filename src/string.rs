//! String encoding (Spec 7.1.10).
//!
//! Ohne Restricted Character Set wird ein String als laengen-prefixte
//! Folge von Unicode-Codepoints codiert: die Laenge (Zeichen, nicht
//! Bytes) als Unsigned Integer (Spec 7.1.6), dann jeder Codepoint als
//! Unsigned Integer. Der String-Table-Umschlag (Spec 7.3) addiert einen
//! Offset auf die Laenge — dafuer gibt es die `_with_offset`-Varianten.

use crate::channel::{DecoderChannel, EncoderChannel};
use crate::{Error, Result, unsigned_integer};

/// Encodes a string as length + code points (Spec 7.1.10).
pub fn encode(channel: &mut EncoderChannel, value: &str) {
    encode_with_offset(channel, value, 0);
}

/// Wie [`encode`], aber mit Offset auf der Laenge (String-Table-Umschlag,
/// Spec 7.3.3: Miss = Laenge + 2; Extended String: Laenge + 6).
pub fn encode_with_offset(channel: &mut EncoderChannel, value: &str, offset: u64) {
    let count = value.chars().count() as u64;
    unsigned_integer::encode(channel, count + offset);
    encode_codepoints(channel, value);
}

/// Nur die Codepoints, ohne Laengenpraefix (Decoder kennt die Laenge bereits).
pub fn encode_codepoints(channel: &mut EncoderChannel, value: &str) {
    for ch in value.chars() {
        unsigned_integer::encode(channel, ch as u64);
    }
}

/// Decodes a length-prefixed string (Spec 7.1.10).
pub fn decode(channel: &mut DecoderChannel) -> Result<String> {
    let len = unsigned_integer::decode(channel)?;
    decode_codepoints(channel, len)
}

/// Decodes exactly `len` code points (Spec 7.1.10).
///
/// Surrogate und Codepoints > U+10FFFF sind keine gueltigen Zeichen
/// (Spec 7.1.10) und fuehren zu [`Error::InvalidCodePoint`].
pub fn decode_codepoints(channel: &mut DecoderChannel, len: u64) -> Result<String> {
    let mut s = String::with_capacity((len as usize).min(1 << 20));
    for _ in 0..len {
        let cp = unsigned_integer::decode(channel)?;
        let ch = u32::try_from(cp)
            .ok()
            .and_then(char::from_u32)
            .ok_or(Error::InvalidCodePoint(cp))?;
        s.push(ch);
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: &str) -> String {
        let mut c = EncoderChannel::new(false);
        encode(&mut c, value);
        let mut d = DecoderChannel::new(c.into_vec(), false);
        decode(&mut d).unwrap()
    }

    /// Spec 7.1.10: ASCII-Codepoints sind Single-Byte Unsigned Integers.
    #[test]
    fn ascii_bytes_on_wire() {
        let mut c = EncoderChannel::new(false);
        encode(&mut c, "Hi");
        assert_eq!(c.into_vec(), vec![0x02, b'H', b'i']);
    }

    #[test]
    fn empty_string() {
        assert_eq!(round_trip(""), "");
        let mut c = EncoderChannel::new(false);
        encode(&mut c, "");
        assert_eq!(c.into_vec(), vec![0x00]);
    }

    /// Laenge zaehlt Zeichen, nicht UTF-8-Bytes.
    #[test]
    fn multibyte_counts_chars() {
        let s = "über🎉";
        assert_eq!(round_trip(s), s);
        let mut c = EncoderChannel::new(false);
        encode(&mut c, s);
        let mut d = DecoderChannel::new(c.into_vec(), false);
        assert_eq!(unsigned_integer::decode(&mut d).unwrap(), 5);
    }

    /// Spec 7.3.3: Offset-Variante verschiebt nur die Laenge.
    #[test]
    fn offset_shifts_length_only() {
        let mut c = EncoderChannel::new(false);
        encode_with_offset(&mut c, "ab", 2);
        let mut d = DecoderChannel::new(c.into_vec(), false);
        let len = unsigned_integer::decode(&mut d).unwrap();
        assert_eq!(len, 4);
        assert_eq!(decode_codepoints(&mut d, len - 2).unwrap(), "ab");
    }

    /// Spec 7.1.10: Surrogate-Codepoints sind ungueltig.
    #[test]
    fn surrogate_rejected() {
        let mut c = EncoderChannel::new(false);
        unsigned_integer::encode(&mut c, 1);
        unsigned_integer::encode(&mut c, 0xD800);
        let mut d = DecoderChannel::new(c.into_vec(), false);
        assert_eq!(decode(&mut d).unwrap_err(), Error::InvalidCodePoint(0xD800));
    }

    #[test]
    fn code_point_beyond_unicode_rejected() {
        let mut c = EncoderChannel::new(false);
        unsigned_integer::encode(&mut c, 1);
        unsigned_integer::encode(&mut c, 0x11_0000);
        let mut d = DecoderChannel::new(c.into_vec(), false);
        assert_eq!(decode(&mut d).unwrap_err(), Error::InvalidCodePoint(0x11_0000));
    }
}
