//! Boolean encoding (Spec 7.1.2).
//!
//! Zwei Varianten, abhaengig vom Schema-Typ:
//! 1. Default: 1-Bit Unsigned Integer (0=false, 1=true)
//! 2. Mit Pattern-Facets: 2-Bit Code ueber die vier lexikalischen Formen
//!    (0="false", 1="0", 2="true", 3="1") — erhaelt die Originalform.
//!
//! Das Byte-Alignment uebernimmt der [`crate::channel`] (1 Byte pro Boolean
//! im aligned Modus).

use crate::channel::{DecoderChannel, EncoderChannel};
use crate::{Error, Result};

/// The four lexical forms of a pattern-facet boolean (Spec 7.1.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanForm {
    /// Lexical "false" (code 0).
    False = 0,
    /// Lexical "0" (code 1).
    Zero = 1,
    /// Lexical "true" (code 2).
    True = 2,
    /// Lexical "1" (code 3).
    One = 3,
}

impl BooleanForm {
    /// Parst eine lexikalische Boolean-Form (Whitespace bereits kollabiert).
    pub fn parse(lexical: &str) -> Option<Self> {
        match lexical {
            "false" => Some(Self::False),
            "0" => Some(Self::Zero),
            "true" => Some(Self::True),
            "1" => Some(Self::One),
            _ => None,
        }
    }

    /// Der boolesche Wert hinter der lexikalischen Form.
    pub fn value(self) -> bool {
        matches!(self, Self::True | Self::One)
    }

    pub fn lexical(self) -> &'static str {
        match self {
            Self::False => "false",
            Self::Zero => "0",
            Self::True => "true",
            Self::One => "1",
        }
    }
}

/// Encodes a boolean as a single bit (Spec 7.1.2, no pattern facets).
pub fn encode(channel: &mut EncoderChannel, value: bool) {
    channel.encode_boolean(value);
}

/// Decodes a single-bit boolean (Spec 7.1.2, no pattern facets).
pub fn decode(channel: &mut DecoderChannel) -> Result<bool> {
    channel.decode_boolean()
}

/// Encodes a pattern-facet boolean as a 2-bit code (Spec 7.1.2).
pub fn encode_form(channel: &mut EncoderChannel, form: BooleanForm) {
    channel.encode_n_bit_unsigned(form as u64, 2);
}

/// Decodes a pattern-facet boolean from its 2-bit code (Spec 7.1.2).
pub fn decode_form(channel: &mut DecoderChannel) -> Result<BooleanForm> {
    match channel.decode_n_bit_unsigned(2)? {
        0 => Ok(BooleanForm::False),
        1 => Ok(BooleanForm::Zero),
        2 => Ok(BooleanForm::True),
        3 => Ok(BooleanForm::One),
        other => Err(Error::InvalidValue(format!("boolean form code {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Spec 7.1.2: false → Bit 0, true → Bit 1 (MSB-first).
    #[test]
    fn single_bit_patterns() {
        let mut c = EncoderChannel::new(false);
        encode(&mut c, false);
        assert_eq!(c.into_vec(), vec![0x00]);

        let mut c = EncoderChannel::new(false);
        encode(&mut c, true);
        assert_eq!(c.into_vec(), vec![0x80]);
    }

    #[test]
    fn single_bit_round_trip() {
        for v in [false, true] {
            let mut c = EncoderChannel::new(false);
            encode(&mut c, v);
            let mut d = DecoderChannel::new(c.into_vec(), false);
            assert_eq!(decode(&mut d).unwrap(), v);
        }
    }

    /// Spec 7.1.2: 2-Bit-Codes der vier lexikalischen Formen.
    #[test]
    fn form_codes_match_spec() {
        assert_eq!(BooleanForm::False as u64, 0);
        assert_eq!(BooleanForm::Zero as u64, 1);
        assert_eq!(BooleanForm::True as u64, 2);
        assert_eq!(BooleanForm::One as u64, 3);
    }

    /// Pattern-Facet-Form erhaelt die lexikalische Form "0"/"1".
    #[test]
    fn form_round_trip_preserves_lexical() {
        for form in [BooleanForm::False, BooleanForm::Zero, BooleanForm::True, BooleanForm::One] {
            let mut c = EncoderChannel::new(false);
            encode_form(&mut c, form);
            let mut d = DecoderChannel::new(c.into_vec(), false);
            assert_eq!(decode_form(&mut d).unwrap(), form);
        }
        assert_eq!(BooleanForm::Zero.lexical(), "0");
        assert!(!BooleanForm::Zero.value());
        assert!(BooleanForm::One.value());
    }

    #[test]
    fn parse_lexical_forms() {
        assert_eq!(BooleanForm::parse("true"), Some(BooleanForm::True));
        assert_eq!(BooleanForm::parse("1"), Some(BooleanForm::One));
        assert_eq!(BooleanForm::parse("TRUE"), None);
        assert_eq!(BooleanForm::parse(""), None);
    }

    #[test]
    fn decode_eof() {
        let mut d = DecoderChannel::new(vec![], false);
        assert_eq!(decode(&mut d).unwrap_err(), Error::PrematureEndOfStream);
        let mut d = DecoderChannel::new(vec![], false);
        assert_eq!(decode_form(&mut d).unwrap_err(), Error::PrematureEndOfStream);
    }
}
