//! Coding-Length-Berechnung (Spec 6.2, 7.2, 7.3).
//!
//! `codingLength(n) = ⌈log₂(n)⌉` — die Anzahl Bits um `n` unterschiedliche
//! Werte zu codieren. Wird von Event Codes (6.2), Enumerations (7.2),
//! n-Bit Unsigned Integers (7.1.9) und den String-Table-Partitionen (7.3)
//! verwendet. Kleine `n` laufen über eine vorberechnete Tabelle, der Rest
//! über `leading_zeros`.

/// Lookup fuer n in 0..=256 (deckt Event Codes und die meisten Partitionen ab).
const SMALL: [u8; 257] = {
    let mut t = [0u8; 257];
    let mut n = 2usize;
    while n <= 256 {
        t[n] = (usize::BITS - (n - 1).leading_zeros()) as u8;
        n += 1;
    }
    t
};

/// `codingLength(n)`: 0 fuer n ≤ 1, sonst ⌈log₂(n)⌉.
///
/// # Spec-Referenz
/// - 6.2 Representing Event Codes
/// - 7.2 Enumeration
/// - 7.3 String Table
#[inline]
pub fn coding_length(n: usize) -> u8 {
    if n <= 256 {
        SMALL[n]
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as u8
    }
}

/// Anzahl 7-Bit-Bloecke fuer einen Unsigned Integer (Spec 7.1.6).
#[inline]
pub fn blocks_7bit(value: u64) -> u32 {
    if value == 0 { 1 } else { (70 - value.leading_zeros()) / 7 }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Spec 6.2, 7.2: ceil(log2(n)), 0 fuer n <= 1.
    #[test]
    fn coding_length_boundaries() {
        assert_eq!(coding_length(0), 0);
        assert_eq!(coding_length(1), 0);
        assert_eq!(coding_length(2), 1);
        assert_eq!(coding_length(3), 2);
        assert_eq!(coding_length(4), 2);
        assert_eq!(coding_length(5), 3);
        assert_eq!(coding_length(64), 6);
        assert_eq!(coding_length(65), 7);
        assert_eq!(coding_length(256), 8);
        assert_eq!(coding_length(257), 9);
        assert_eq!(coding_length(32768), 15);
        assert_eq!(coding_length(32769), 16);
    }

    /// Tabelle und leading_zeros-Pfad muessen uebereinstimmen.
    #[test]
    fn small_table_matches_formula() {
        for n in 2..=256usize {
            let formula = (usize::BITS - (n - 1).leading_zeros()) as u8;
            assert_eq!(coding_length(n), formula, "n={n}");
        }
    }

    /// Spec 7.1.6: Blockzahl der 7-Bit-Codierung.
    #[test]
    fn blocks_7bit_boundaries() {
        assert_eq!(blocks_7bit(0), 1);
        assert_eq!(blocks_7bit(1), 1);
        assert_eq!(blocks_7bit(127), 1);
        assert_eq!(blocks_7bit(128), 2);
        assert_eq!(blocks_7bit(16383), 2);
        assert_eq!(blocks_7bit(16384), 3);
        assert_eq!(blocks_7bit(u64::MAX), 10);
    }
}
