//! Restricted Character Sets (Spec 7.1.10.1, Appendix D).
//!
//! Ein RCS codiert jedes Zeichen in n Bits, n = ⌈log₂(N+1)⌉ bei N Zeichen
//! im Set; der Sentinel-Code N escaped auf den vollen Unicode-Codepoint
//! als Unsigned Integer. Hier leben die eingebauten Sets der
//! XSD-Typfamilien (Appendix D) fuer den Lexical-Values-Modus — jede
//! Typfamilie codiert ihre lexikalische Form mit ihrem eigenen Set.

use crate::channel::{DecoderChannel, EncoderChannel};
use crate::{Error, Result, bit_width, n_bit_unsigned_integer, unsigned_integer};

/// A restricted character set: sorted code points plus the escape width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictedCharacterSet {
    /// Sortiert nach Codepoint, dedupliziert, nur BMP.
    chars: Vec<char>,
    /// Bitbreite = codingLength(N + 1); +1 fuer den Escape-Sentinel.
    width: u8,
}

impl RestrictedCharacterSet {
    /// Baut ein Set aus Zeichen (Spec 7.1.10.1: < 256 Zeichen, nur BMP).
    pub fn new(mut chars: Vec<char>) -> Result<Self> {
        if chars.is_empty() {
            return Err(Error::InvalidValue("restricted character set is empty".into()));
        }
        if chars.iter().any(|&ch| ch as u32 > 0xFFFF) {
            return Err(Error::InvalidValue("restricted character set contains non-BMP character".into()));
        }
        chars.sort_unstable();
        chars.dedup();
        if chars.len() > 255 {
            return Err(Error::InvalidValue(format!(
                "restricted character set has {} characters (max 255)",
                chars.len()
            )));
        }
        let width = bit_width::coding_length(chars.len() + 1);
        Ok(Self { chars, width })
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    fn code_of(&self, ch: char) -> Option<u64> {
        self.chars.binary_search(&ch).ok().map(|i| i as u64)
    }
}

/// Encodes `value` with `rcs` after the already-written length prefix.
pub fn encode_codepoints(channel: &mut EncoderChannel, rcs: &RestrictedCharacterSet, value: &str) {
    let escape = rcs.len() as u64;
    for ch in value.chars() {
        match rcs.code_of(ch) {
            Some(code) => n_bit_unsigned_integer::encode(channel, code, rcs.width()),
            None => {
                n_bit_unsigned_integer::encode(channel, escape, rcs.width());
                unsigned_integer::encode(channel, ch as u64);
            }
        }
    }
}

/// Decodes exactly `len` characters coded with `rcs`.
pub fn decode_codepoints(
    channel: &mut DecoderChannel,
    rcs: &RestrictedCharacterSet,
    len: u64,
) -> Result<String> {
    let escape = rcs.len() as u64;
    let mut s = String::with_capacity((len as usize).min(1 << 20));
    for _ in 0..len {
        let code = n_bit_unsigned_integer::decode(channel, rcs.width())?;
        if code < escape {
            s.push(rcs.chars[code as usize]);
        } else if code == escape {
            let cp = unsigned_integer::decode(channel)?;
            let ch = u32::try_from(cp)
                .ok()
                .and_then(char::from_u32)
                .ok_or(Error::InvalidCodePoint(cp))?;
            s.push(ch);
        } else {
            return Err(Error::InvalidValue(format!("restricted character code {code}")));
        }
    }
    Ok(s)
}

/// Laengen-prefixte RCS-Codierung mit String-Table-Offset (Lexical-Modus).
pub fn encode_with_offset(
    channel: &mut EncoderChannel,
    rcs: &RestrictedCharacterSet,
    value: &str,
    offset: u64,
) {
    let count = value.chars().count() as u64;
    unsigned_integer::encode(channel, count + offset);
    encode_codepoints(channel, rcs, value);
}

/// Die Whitespace-Zeichen die jedes eingebaute Set enthaelt (Appendix D).
const WS: [char; 4] = ['\u{9}', '\u{A}', '\u{D}', ' '];

fn builtin(extra: &str) -> RestrictedCharacterSet {
    let mut chars: Vec<char> = WS.to_vec();
    chars.extend(extra.chars());
    // Eingebaute Sets sind klein, BMP-only und nie leer.
    RestrictedCharacterSet::new(chars).unwrap_or(RestrictedCharacterSet {
        chars: WS.to_vec(),
        width: 3,
    })
}

/// Appendix D: xsd:boolean.
pub fn boolean_set() -> RestrictedCharacterSet {
    builtin("01aeflrstu")
}

/// Appendix D: xsd:integer und abgeleitete Integer-Typen.
pub fn integer_set() -> RestrictedCharacterSet {
    builtin("+-0123456789")
}

/// Appendix D: xsd:decimal.
pub fn decimal_set() -> RestrictedCharacterSet {
    builtin("+-.0123456789")
}

/// Appendix D: xsd:float / xsd:double.
pub fn double_set() -> RestrictedCharacterSet {
    builtin("+-.0123456789EFINae")
}

/// Appendix D: die Datums-/Zeit-Typfamilie.
pub fn date_time_set() -> RestrictedCharacterSet {
    builtin("+-.0123456789:TZ")
}

/// Appendix D: xsd:base64Binary.
pub fn base64_binary_set() -> RestrictedCharacterSet {
    builtin("+/0123456789=ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz")
}

/// Appendix D: xsd:hexBinary.
pub fn hex_binary_set() -> RestrictedCharacterSet {
    builtin("0123456789ABCDEFabcdef")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string;

    fn round_trip(rcs: &RestrictedCharacterSet, value: &str) -> String {
        let mut c = EncoderChannel::new(false);
        unsigned_integer::encode(&mut c, value.chars().count() as u64);
        encode_codepoints(&mut c, rcs, value);
        let mut d = DecoderChannel::new(c.into_vec(), false);
        let len = unsigned_integer::decode(&mut d).unwrap();
        decode_codepoints(&mut d, rcs, len).unwrap()
    }

    /// Spec 7.1.10.1: n = codingLength(N+1).
    #[test]
    fn width_includes_escape_sentinel() {
        let rcs = RestrictedCharacterSet::new(vec!['0', '1', '2']).unwrap();
        assert_eq!(rcs.len(), 3);
        assert_eq!(rcs.width(), 2);

        // 15 Zeichen + Sentinel = 16 → 4 Bits
        let chars: Vec<char> = "0123456789abcde".chars().collect();
        assert_eq!(RestrictedCharacterSet::new(chars).unwrap().width(), 4);
    }

    #[test]
    fn in_set_round_trip() {
        let rcs = decimal_set();
        assert_eq!(round_trip(&rcs, "-12.5"), "-12.5");
        assert_eq!(round_trip(&rcs, ""), "");
    }

    /// Spec 7.1.10.1: Zeichen ausserhalb des Sets escapen auf den Codepoint.
    #[test]
    fn out_of_set_escapes() {
        let rcs = decimal_set();
        assert_eq!(round_trip(&rcs, "1x2ü"), "1x2ü");
    }

    /// Escape kostet width Bits + Unsigned Integer, in-set nur width Bits.
    #[test]
    fn in_set_is_compact() {
        let rcs = hex_binary_set();
        let mut c = EncoderChannel::new(false);
        encode_codepoints(&mut c, &rcs, "AAAA");
        // 26 Zeichen + Sentinel → 5 Bits; 4 Zeichen = 20 Bits = 3 Bytes
        assert_eq!(c.into_vec().len(), 3);
    }

    #[test]
    fn rejects_empty_and_non_bmp() {
        assert!(RestrictedCharacterSet::new(vec![]).is_err());
        assert!(RestrictedCharacterSet::new(vec!['🎉']).is_err());
    }

    #[test]
    fn dedup_and_sort() {
        let rcs = RestrictedCharacterSet::new(vec!['b', 'a', 'b', 'a']).unwrap();
        assert_eq!(rcs.len(), 2);
        assert_eq!(rcs.code_of('a'), Some(0));
        assert_eq!(rcs.code_of('b'), Some(1));
    }

    #[test]
    fn builtin_sets_contain_whitespace() {
        for set in [boolean_set(), integer_set(), decimal_set(), double_set(), date_time_set()] {
            assert!(set.code_of(' ').is_some());
            assert!(set.code_of('\t').is_some());
        }
    }

    #[test]
    fn offset_variant_matches_plain_string_envelope() {
        let rcs = integer_set();
        let mut c = EncoderChannel::new(false);
        encode_with_offset(&mut c, &rcs, "42", 2);
        let mut d = DecoderChannel::new(c.into_vec(), false);
        let len = unsigned_integer::decode(&mut d).unwrap();
        assert_eq!(len, 4);
        assert_eq!(decode_codepoints(&mut d, &rcs, len - 2).unwrap(), "42");
    }

    #[test]
    fn plain_string_module_unaffected() {
        // RCS und Plain-String teilen nur den Umschlag, nicht die Zeichencodierung.
        let mut c = EncoderChannel::new(false);
        string::encode(&mut c, "12");
        let plain = c.into_vec();
        let mut c = EncoderChannel::new(false);
        encode_with_offset(&mut c, &integer_set(), "12", 0);
        assert_ne!(plain, c.into_vec());
    }
}
