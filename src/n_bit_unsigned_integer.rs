//! n-bit unsigned integer encoding (Spec 7.1.9).
//!
//! Exakt `n` Bits im bit-packed Stream, ⌈n/8⌉ Bytes im aligned Modus
//! (siehe [`crate::channel`]). Bei `n = 0` wird der Wert komplett
//! weggelassen. Die schema-begrenzte Integer-Form (Spec 7.1.5, Range
//! ≤ 4096) codiert hier den Offset vom unteren Rand.

use crate::channel::{DecoderChannel, EncoderChannel};
use crate::{Error, Result, bit_width};

/// Encodes an unsigned integer using exactly `n` bits (Spec 7.1.9).
///
/// # Panics
///
/// Panics if `n > 64` or if `value` does not fit in `n` bits.
#[inline]
pub fn encode(channel: &mut EncoderChannel, value: u64, n: u8) {
    assert!(n <= 64, "bit width must be 0..=64, got {n}");
    assert!(n == 64 || value < (1u64 << n), "value {value} does not fit in {n} bits");
    channel.encode_n_bit_unsigned(value, n);
}

/// Decodes an unsigned integer from exactly `n` bits (Spec 7.1.9).
#[inline]
pub fn decode(channel: &mut DecoderChannel, n: u8) -> Result<u64> {
    channel.decode_n_bit_unsigned(n)
}

/// Encodes a bounded value as offset from `lower` (Spec 7.1.5, bounded case).
///
/// `n = codingLength(upper - lower + 1)`.
///
/// # Panics
///
/// Panics if `value` is outside `[lower, upper]` or `upper < lower`.
pub fn encode_bounded(channel: &mut EncoderChannel, value: i64, lower: i64, upper: i64) {
    assert!(upper >= lower, "upper ({upper}) < lower ({lower})");
    assert!(value >= lower && value <= upper, "value {value} not in [{lower}, {upper}]");
    let range = (upper as i128 - lower as i128 + 1) as u128;
    let n = bit_width::coding_length(range.min(usize::MAX as u128) as usize);
    encode(channel, (value as i128 - lower as i128) as u64, n);
}

/// Decodes a bounded value (Spec 7.1.5, bounded case).
pub fn decode_bounded(channel: &mut DecoderChannel, lower: i64, upper: i64) -> Result<i64> {
    let range = (upper as i128 - lower as i128 + 1) as u128;
    let n = bit_width::coding_length(range.min(usize::MAX as u128) as usize);
    let offset = decode(channel, n)?;
    if offset as u128 >= range {
        return Err(Error::IntegerOverflow);
    }
    Ok((lower as i128 + offset as i128) as i64)
}
