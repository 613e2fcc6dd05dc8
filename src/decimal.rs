//! Decimal encoding (Spec 7.1.3).
//!
//! Boolean-Vorzeichen (Spec 7.1.2), dann zwei Unsigned Integers (Spec
//! 7.1.6): der ganzzahlige Teil und der Nachkomma-Teil mit umgekehrter
//! Ziffernfolge (erhaelt fuehrende Nullen der Fraktion). Beide Teile
//! laufen ueber den Digit-String-Pfad, dadurch sind auch Dezimalzahlen
//! mit hunderten Stellen codierbar. Minus-Null ist darstellbar.

use core::fmt;

use crate::channel::{DecoderChannel, EncoderChannel};
use crate::{Error, Result, boolean, unsigned_integer};

/// A decimal value in canonical digit-string form (Spec 7.1.3).
///
/// `integral` hat keine fuehrenden Nullen ("0" fuer null), `fractional`
/// keine nachlaufenden Nullen (leer fuer ganze Zahlen). Nachlaufende
/// Nullen der Fraktion gehen beim Parsen verloren — das ist die
/// kanonische EXI-Form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    /// True fuer negative Werte (inklusive Minus-Null).
    pub negative: bool,
    /// Ziffern vor dem Punkt, ohne fuehrende Nullen.
    pub integral: String,
    /// Ziffern nach dem Punkt in normaler Reihenfolge, ohne nachlaufende Nullen.
    pub fractional: String,
}

impl Decimal {
    /// Parst eine lexikalische xsd:decimal-Form (Whitespace bereits kollabiert).
    pub fn parse(lexical: &str) -> Result<Self> {
        let (negative, rest) = match lexical.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, lexical.strip_prefix('+').unwrap_or(lexical)),
        };
        let (int_part, frac_part) = match rest.split_once('.') {
            Some((i, f)) => (i, f),
            None => (rest, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(Error::InvalidValue(format!("not a decimal: '{lexical}'")));
        }
        if int_part.bytes().any(|b| !b.is_ascii_digit())
            || frac_part.bytes().any(|b| !b.is_ascii_digit())
        {
            return Err(Error::InvalidValue(format!("not a decimal: '{lexical}'")));
        }
        let integral = {
            let t = int_part.trim_start_matches('0');
            if t.is_empty() { "0".to_string() } else { t.to_string() }
        };
        let fractional = frac_part.trim_end_matches('0').to_string();
        Ok(Self { negative, integral, fractional })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        write!(f, "{}", self.integral)?;
        if !self.fractional.is_empty() {
            write!(f, ".{}", self.fractional)?;
        }
        Ok(())
    }
}

/// Encodes a decimal value (Spec 7.1.3).
pub fn encode(channel: &mut EncoderChannel, value: &Decimal) -> Result<()> {
    boolean::encode(channel, value.negative);
    unsigned_integer::encode_digits(channel, &value.integral)?;
    if value.fractional.is_empty() {
        unsigned_integer::encode_digits(channel, "0")
    } else {
        let reversed: String = value.fractional.chars().rev().collect();
        unsigned_integer::encode_digits(channel, &reversed)
    }
}

/// Decodes a decimal value (Spec 7.1.3).
pub fn decode(channel: &mut DecoderChannel) -> Result<Decimal> {
    let negative = boolean::decode(channel)?;
    let integral = unsigned_integer::decode_digits(channel)?;
    let reversed = unsigned_integer::decode_digits(channel)?;
    let fractional = if reversed == "0" {
        String::new()
    } else {
        reversed.chars().rev().collect()
    };
    Ok(Decimal { negative, integral, fractional })
}
