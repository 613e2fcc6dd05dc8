//! Float encoding (Spec 7.1.4).
//!
//! Zwei aufeinanderfolgende Integers (Spec 7.1.5): Mantisse und
//! Basis-10-Exponent, Wert = m × 10^e. Exponentenbereich
//! -(2^14-1)..2^14-1; der Sonderwert -(2^14) codiert INF (Mantisse 1),
//! -INF (Mantisse -1) und NaN (alle anderen). Werte ausserhalb des
//! Bereichs duerfen nicht codiert werden (Spec 7.1.4 MUST NOT).

use core::fmt;

use crate::channel::{DecoderChannel, EncoderChannel};
use crate::{Error, Result, integer};

const EXPONENT_MIN: i64 = -(1 << 14) + 1; // -16383
const EXPONENT_MAX: i64 = (1 << 14) - 1; // 16383
const SPECIAL_EXPONENT: i64 = -(1 << 14); // -16384

/// A float value in EXI mantissa/exponent form (Spec 7.1.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Float {
    /// A finite value: m × 10^e.
    Value { mantissa: i64, exponent: i64 },
    /// Positive infinity (INF).
    Infinity,
    /// Negative infinity (-INF).
    NegativeInfinity,
    /// Not-a-Number (NaN).
    NaN,
}

impl Float {
    /// Parst eine lexikalische xsd:float/xsd:double-Form in Mantisse/Exponent.
    ///
    /// "1.5" → 15 × 10^-1, "12E3" → 12 × 10^3. Nachlaufende Nullen der
    /// Mantisse wandern in den Exponenten (kanonische Form).
    pub fn parse(lexical: &str) -> Result<Self> {
        match lexical {
            "INF" => return Ok(Self::Infinity),
            "-INF" => return Ok(Self::NegativeInfinity),
            "NaN" => return Ok(Self::NaN),
            _ => {}
        }
        let (number, exp_part) = match lexical.split_once(['e', 'E']) {
            Some((n, e)) => (n, Some(e)),
            None => (lexical, None),
        };
        let mut exponent: i64 = match exp_part {
            Some(e) => e
                .parse::<i64>()
                .map_err(|_| Error::InvalidValue(format!("not a float: '{lexical}'")))?,
            None => 0,
        };

        let (negative, digits_part) = match number.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, number.strip_prefix('+').unwrap_or(number)),
        };
        let (int_part, frac_part) = match digits_part.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits_part, ""),
        };
        if (int_part.is_empty() && frac_part.is_empty())
            || int_part.bytes().any(|b| !b.is_ascii_digit())
            || frac_part.bytes().any(|b| !b.is_ascii_digit())
        {
            return Err(Error::InvalidValue(format!("not a float: '{lexical}'")));
        }
        exponent -= frac_part.len() as i64;

        let mut all = String::with_capacity(int_part.len() + frac_part.len());
        all.push_str(int_part);
        all.push_str(frac_part);
        let trimmed = all.trim_start_matches('0');
        // Nachlaufende Nullen in den Exponenten verschieben.
        let significant = trimmed.trim_end_matches('0');
        exponent += (trimmed.len() - significant.len()) as i64;

        let mut mantissa: i64 = if significant.is_empty() {
            exponent = 0;
            0
        } else {
            significant
                .parse::<i64>()
                .map_err(|_| Error::IntegerOverflow)?
        };
        if negative {
            mantissa = -mantissa;
        }
        if !(EXPONENT_MIN..=EXPONENT_MAX).contains(&exponent) {
            return Err(Error::FloatOutOfRange);
        }
        Ok(Self::Value { mantissa, exponent })
    }
}

impl fmt::Display for Float {
    /// Kanonische EXI-Form `<mantissa>E<exponent>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value { mantissa, exponent } => write!(f, "{mantissa}E{exponent}"),
            Self::Infinity => write!(f, "INF"),
            Self::NegativeInfinity => write!(f, "-INF"),
            Self::NaN => write!(f, "NaN"),
        }
    }
}

/// Encodes a float value (Spec 7.1.4).
pub fn encode(channel: &mut EncoderChannel, value: Float) -> Result<()> {
    match value {
        Float::Value { mantissa, exponent } => {
            if !(EXPONENT_MIN..=EXPONENT_MAX).contains(&exponent) {
                return Err(Error::FloatOutOfRange);
            }
            integer::encode(channel, mantissa);
            integer::encode(channel, exponent);
        }
        Float::Infinity => {
            integer::encode(channel, 1);
            integer::encode(channel, SPECIAL_EXPONENT);
        }
        Float::NegativeInfinity => {
            integer::encode(channel, -1);
            integer::encode(channel, SPECIAL_EXPONENT);
        }
        Float::NaN => {
            integer::encode(channel, 0);
            integer::encode(channel, SPECIAL_EXPONENT);
        }
    }
    Ok(())
}

/// Decodes a float value (Spec 7.1.4).
pub fn decode(channel: &mut DecoderChannel) -> Result<Float> {
    let mantissa = integer::decode(channel)?;
    let exponent = integer::decode(channel)?;

    if exponent == SPECIAL_EXPONENT {
        return Ok(match mantissa {
            1 => Float::Infinity,
            -1 => Float::NegativeInfinity,
            _ => Float::NaN,
        });
    }
    if !(EXPONENT_MIN..=EXPONENT_MAX).contains(&exponent) {
        return Err(Error::FloatOutOfRange);
    }
    Ok(Float::Value { mantissa, exponent })
}
