//! Signed integer encoding (Spec 7.1.5).
//!
//! Unbounded signed case: 1-bit sign (boolean) + magnitude as unsigned
//! integer. Fuer negative Werte ist die Magnitude `(-value - 1)`.
//! Schema-begrenzte Faelle laufen ueber `n_bit_unsigned_integer`
//! (Offset vom Minimum), nicht-negative direkt ueber `unsigned_integer`.

use crate::channel::{DecoderChannel, EncoderChannel};
use crate::{Error, Result, unsigned_integer};

/// Encodes a signed integer (Spec 7.1.5, unbounded signed case).
pub fn encode(channel: &mut EncoderChannel, value: i64) {
    if value >= 0 {
        channel.encode_boolean(false);
        unsigned_integer::encode(channel, value as u64);
    } else {
        channel.encode_boolean(true);
        // (-value - 1) ueber Bit-Negation, vermeidet Overflow bei i64::MIN
        unsigned_integer::encode(channel, !(value as u64));
    }
}

/// Decodes a signed integer (Spec 7.1.5, unbounded signed case).
pub fn decode(channel: &mut DecoderChannel) -> Result<i64> {
    let negative = channel.decode_boolean()?;
    let magnitude = unsigned_integer::decode(channel)?;
    if negative {
        if magnitude > i64::MAX as u64 {
            return Err(Error::IntegerOverflow);
        }
        Ok(-(magnitude as i64) - 1)
    } else {
        if magnitude > i64::MAX as u64 {
            return Err(Error::IntegerOverflow);
        }
        Ok(magnitude as i64)
    }
}

/// Encodes an arbitrary-precision signed integer given as sign + decimal digits.
///
/// Die Magnitude eines negativen Werts ist (|v| - 1); der Aufrufer liefert
/// die Dezimalstellen von |v|, die Subtraktion passiert hier.
pub fn encode_digits(channel: &mut EncoderChannel, negative: bool, digits: &str) -> Result<()> {
    channel.encode_boolean(negative);
    if negative {
        let minus_one = decrement_digits(digits)?;
        unsigned_integer::encode_digits(channel, &minus_one)
    } else {
        unsigned_integer::encode_digits(channel, digits)
    }
}

/// Decodes an arbitrary-precision signed integer into (sign, decimal digits of |v|).
pub fn decode_digits(channel: &mut DecoderChannel) -> Result<(bool, String)> {
    let negative = channel.decode_boolean()?;
    let magnitude = unsigned_integer::decode_digits(channel)?;
    if negative {
        Ok((true, increment_digits(&magnitude)))
    } else {
        Ok((false, magnitude))
    }
}

/// Dezimal-Digit-String minus 1. Eingabe muss >= 1 sein.
fn decrement_digits(digits: &str) -> Result<String> {
    let mut d: Vec<u8> = digits.trim_start_matches('0').bytes().collect();
    if d.is_empty() || d.iter().any(|b| !b.is_ascii_digit()) {
        return Err(Error::InvalidValue(format!("not a positive integer: '{digits}'")));
    }
    let mut i = d.len();
    loop {
        if i == 0 {
            return Err(Error::InvalidValue(format!("not a positive integer: '{digits}'")));
        }
        i -= 1;
        if d[i] > b'0' {
            d[i] -= 1;
            break;
        }
        d[i] = b'9';
    }
    let s: String = String::from_utf8(d).map_err(|e| Error::InvalidValue(e.to_string()))?;
    let trimmed = s.trim_start_matches('0');
    Ok(if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() })
}

/// Dezimal-Digit-String plus 1.
fn increment_digits(digits: &str) -> String {
    let mut d: Vec<u8> = digits.bytes().collect();
    let mut i = d.len();
    loop {
        if i == 0 {
            d.insert(0, b'1');
            break;
        }
        i -= 1;
        if d[i] < b'9' {
            d[i] += 1;
            break;
        }
        d[i] = b'0';
    }
    String::from_utf8(d).unwrap_or_else(|_| digits.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: i64) -> i64 {
        let mut c = EncoderChannel::new(false);
        encode(&mut c, value);
        let mut d = DecoderChannel::new(c.into_vec(), false);
        decode(&mut d).unwrap()
    }

    /// Spec 7.1.5: -1 → sign=1, magnitude=0.
    #[test]
    fn minus_one_encoding() {
        assert_eq!(round_trip(-1), -1);
        let mut c = EncoderChannel::new(false);
        encode(&mut c, -1);
        // Sign-Bit 1, dann unsigned_integer(0) = 0x00
        assert_eq!(c.into_vec(), vec![0x80, 0x00]);
    }

    #[test]
    fn signed_round_trip_diverse() {
        for &val in &[0, 1, -1, -2, 127, -128, i64::MAX / 2, i64::MAX, i64::MIN] {
            assert_eq!(round_trip(val), val, "failed for {val}");
        }
    }

    /// Spec 7.1.5: Magnitude > i64 → IntegerOverflow.
    #[test]
    fn decode_overflow() {
        let mut c = EncoderChannel::new(false);
        c.encode_boolean(false);
        unsigned_integer::encode(&mut c, u64::MAX);
        let mut d = DecoderChannel::new(c.into_vec(), false);
        assert_eq!(decode(&mut d).unwrap_err(), Error::IntegerOverflow);
    }

    #[test]
    fn decode_eof() {
        let mut d = DecoderChannel::new(vec![], false);
        assert_eq!(decode(&mut d).unwrap_err(), Error::PrematureEndOfStream);
    }

    /// Digit-Pfad muss dieselben Bytes wie der i64-Pfad produzieren.
    #[test]
    fn digits_match_i64_encoding() {
        for v in [0i64, 1, -1, -2, 4096, -4097, i64::MAX] {
            let mut a = EncoderChannel::new(false);
            encode(&mut a, v);
            let mut b = EncoderChannel::new(false);
            encode_digits(&mut b, v < 0, &v.unsigned_abs().to_string()).unwrap();
            assert_eq!(a.into_vec(), b.into_vec(), "v={v}");
        }
    }

    #[test]
    fn digits_roundtrip_huge_negative() {
        let digits = format!("1{}", "2".repeat(200));
        let mut c = EncoderChannel::new(false);
        encode_digits(&mut c, true, &digits).unwrap();
        let mut d = DecoderChannel::new(c.into_vec(), false);
        assert_eq!(decode_digits(&mut d).unwrap(), (true, digits));
    }

    #[test]
    fn decrement_carries() {
        assert_eq!(decrement_digits("1000").unwrap(), "999");
        assert_eq!(decrement_digits("1").unwrap(), "0");
        assert!(decrement_digits("0").is_err());
    }

    #[test]
    fn increment_carries() {
        assert_eq!(increment_digits("999"), "1000");
        assert_eq!(increment_digits("0"), "1");
    }
}
