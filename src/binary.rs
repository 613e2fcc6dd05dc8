//! Binary encoding (Spec 7.1.1).
//!
//! Laengen-prefixte Oktett-Sequenz; die Laenge ist ein Unsigned Integer
//! (Spec 7.1.6). Dazu die lexikalischen Formen beider XSD-Binaertypen:
//! base64Binary ueber das `base64`-Crate, hexBinary von Hand.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::channel::{DecoderChannel, EncoderChannel};
use crate::{Error, Result, unsigned_integer};

/// Encodes binary data as a length-prefixed sequence of octets (Spec 7.1.1).
pub fn encode(channel: &mut EncoderChannel, value: &[u8]) {
    unsigned_integer::encode(channel, value.len() as u64);
    channel.encode_octets(value);
}

/// Decodes binary data from a length-prefixed sequence of octets (Spec 7.1.1).
pub fn decode(channel: &mut DecoderChannel) -> Result<Vec<u8>> {
    let len = unsigned_integer::decode(channel)?;
    channel.decode_octets(len as usize)
}

/// Parst die lexikalische xsd:base64Binary-Form.
pub fn parse_base64(lexical: &str) -> Result<Vec<u8>> {
    // XML erlaubt Whitespace innerhalb von base64-Werten.
    let compact: String = lexical.split_whitespace().collect();
    BASE64
        .decode(compact.as_bytes())
        .map_err(|e| Error::InvalidValue(format!("base64: {e}")))
}

/// Kanonische xsd:base64Binary-Form.
pub fn to_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Parst die lexikalische xsd:hexBinary-Form (Gross-/Kleinschreibung egal).
pub fn parse_hex(lexical: &str) -> Result<Vec<u8>> {
    let s = lexical.trim();
    if s.len() % 2 != 0 {
        return Err(Error::InvalidValue(format!("hexBinary odd length: '{lexical}'")));
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for pair in bytes.chunks_exact(2) {
        let hi = hex_nibble(pair[0])?;
        let lo = hex_nibble(pair[1])?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

/// Kanonische xsd:hexBinary-Form (Grossbuchstaben).
pub fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push(char::from_digit((b >> 4) as u32, 16).unwrap_or('0').to_ascii_uppercase());
        s.push(char::from_digit((b & 0xF) as u32, 16).unwrap_or('0').to_ascii_uppercase());
    }
    s
}

fn hex_nibble(b: u8) -> Result<u8> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(Error::InvalidValue(format!("hexBinary digit '{}'", b as char))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: &[u8]) -> Vec<u8> {
        let mut c = EncoderChannel::new(false);
        encode(&mut c, value);
        let mut d = DecoderChannel::new(c.into_vec(), false);
        decode(&mut d).unwrap()
    }

    /// Spec 7.1.1: leere Sequenz = Laenge 0, keine Oktette.
    #[test]
    fn empty_binary() {
        assert_eq!(round_trip(&[]), Vec::<u8>::new());
        let mut c = EncoderChannel::new(false);
        encode(&mut c, &[]);
        assert_eq!(c.into_vec(), vec![0x00]);
    }

    #[test]
    fn bytes_round_trip() {
        assert_eq!(round_trip(&[0xDE, 0xAD, 0xBE, 0xEF]), vec![0xDE, 0xAD, 0xBE, 0xEF]);
        let big: Vec<u8> = (0..=255).collect();
        assert_eq!(round_trip(&big), big);
    }

    #[test]
    fn decode_truncated() {
        let mut c = EncoderChannel::new(false);
        unsigned_integer::encode(&mut c, 10);
        c.encode_octets(&[1, 2]);
        let mut d = DecoderChannel::new(c.into_vec(), false);
        assert_eq!(decode(&mut d).unwrap_err(), Error::PrematureEndOfStream);
    }

    #[test]
    fn base64_lexical() {
        assert_eq!(parse_base64("SGVsbG8=").unwrap(), b"Hello");
        assert_eq!(parse_base64("SGVs bG8=").unwrap(), b"Hello");
        assert_eq!(to_base64(b"Hello"), "SGVsbG8=");
        assert!(parse_base64("!!!").is_err());
    }

    #[test]
    fn hex_lexical() {
        assert_eq!(parse_hex("deadBEEF").unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(to_hex(&[0xDE, 0xAD]), "DEAD");
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }
}
