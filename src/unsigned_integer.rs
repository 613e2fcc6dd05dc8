//! Variable-length 7-bit unsigned integer encoding (Spec 7.1.6).
//!
//! Each octet has a continuation bit (MSB) and 7 data bits; the least
//! significant group is written first, the last octet has continuation = 0.
//! Werte jenseits von `u64` laufen ueber den Digit-String-Pfad
//! ([`encode_digits`]/[`decode_digits`]) — Dezimalstellen-Arithmetik mit
//! langer Division durch 128, damit auch hunderte Stellen ohne
//! Bignum-Abhaengigkeit codierbar sind.

use crate::channel::{DecoderChannel, EncoderChannel};
use crate::{Error, Result};

/// Encodes a `u64` as a variable-length unsigned integer (Spec 7.1.6).
#[inline]
pub fn encode(channel: &mut EncoderChannel, value: u64) {
    let mut v = value;
    loop {
        let low7 = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            channel.encode_octet(low7);
            break;
        }
        channel.encode_octet(0x80 | low7);
    }
}

/// Decodes a variable-length unsigned integer (Spec 7.1.6).
///
/// Werte die nicht in `u64` passen liefern [`Error::IntegerOverflow`];
/// fuer beliebig grosse Werte siehe [`decode_digits`].
#[inline]
pub fn decode(channel: &mut DecoderChannel) -> Result<u64> {
    let mut result = 0u64;
    let mut shift: u32 = 0;
    loop {
        let byte = channel.decode_octet()?;
        let data = u64::from(byte & 0x7F);
        if shift == 63 && (data > 1 || byte & 0x80 != 0) {
            return Err(Error::IntegerOverflow);
        }
        if shift > 63 {
            return Err(Error::IntegerOverflow);
        }
        result |= data << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Dividiert einen Dezimal-Digit-String durch 128.
///
/// `digits` sind ASCII-Ziffern ohne fuehrende Nullen ("0" erlaubt).
/// Liefert (Quotient ohne fuehrende Nullen, Rest).
fn div_rem_128(digits: &[u8]) -> (Vec<u8>, u8) {
    let mut quotient = Vec::with_capacity(digits.len());
    let mut rem: u32 = 0;
    for &d in digits {
        let cur = rem * 10 + (d - b'0') as u32;
        let q = cur / 128;
        rem = cur % 128;
        if !quotient.is_empty() || q != 0 {
            quotient.push(b'0' + q as u8);
        }
    }
    (quotient, rem as u8)
}

/// Multipliziert einen Dezimal-Digit-Vektor mit 128 und addiert `add`.
fn mul_128_add(digits: &mut Vec<u8>, add: u8) {
    let mut carry = add as u32;
    for d in digits.iter_mut().rev() {
        let cur = (*d - b'0') as u32 * 128 + carry;
        *d = b'0' + (cur % 10) as u8;
        carry = cur / 10;
    }
    while carry > 0 {
        digits.insert(0, b'0' + (carry % 10) as u8);
        carry /= 10;
    }
}

/// Encodes an arbitrary-precision unsigned integer given as decimal digits.
///
/// `digits` muss aus mindestens einer ASCII-Ziffer bestehen (Vorzeichen
/// behandelt der Aufrufer). Fuehrende Nullen sind erlaubt und werden
/// ignoriert.
pub fn encode_digits(channel: &mut EncoderChannel, digits: &str) -> Result<()> {
    let trimmed = digits.trim_start_matches('0');
    let bytes = if trimmed.is_empty() { b"0".as_slice() } else { trimmed.as_bytes() };
    if bytes.iter().any(|b| !b.is_ascii_digit()) {
        return Err(Error::InvalidValue(format!("not an unsigned integer: '{digits}'")));
    }
    // u64-Schnellpfad deckt alles bis 19 Stellen sicher ab.
    if bytes.len() < 20 {
        let mut v = 0u64;
        for &b in bytes {
            v = v * 10 + (b - b'0') as u64;
        }
        encode(channel, v);
        return Ok(());
    }
    let mut rest = bytes.to_vec();
    loop {
        let (quotient, rem) = div_rem_128(&rest);
        if quotient.is_empty() {
            channel.encode_octet(rem);
            return Ok(());
        }
        channel.encode_octet(0x80 | rem);
        rest = quotient;
    }
}

/// Decodes an unsigned integer of arbitrary size into decimal digits.
pub fn decode_digits(channel: &mut DecoderChannel) -> Result<String> {
    // 7-Bit-Gruppen einsammeln, niederwertigste zuerst.
    let mut groups = Vec::new();
    loop {
        let byte = channel.decode_octet()?;
        groups.push(byte & 0x7F);
        if byte & 0x80 == 0 {
            break;
        }
        if groups.len() > 4096 {
            return Err(Error::IntegerOverflow);
        }
    }
    let mut digits = vec![b'0'];
    for &g in groups.iter().rev() {
        mul_128_add(&mut digits, g);
    }
    let s = String::from_utf8(digits).map_err(|e| Error::InvalidValue(e.to_string()))?;
    let trimmed = s.trim_start_matches('0');
    Ok(if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() })
}
