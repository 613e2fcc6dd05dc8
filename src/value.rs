//! Decoded typed values.
//!
//! Ein [`Value`] ist das Ergebnis des Typ-Decoders: die typisierte Form
//! plus ihre kanonische lexikalische Darstellung ueber `Display`. Strings
//! haengen als `Rc<str>`, weil String-Table und Event-Inhalt denselben
//! Wert teilen.

use core::fmt;
use std::rc::Rc;

use crate::binary;
use crate::datetime::DateTime;
use crate::decimal::Decimal;
use crate::float::Float;

/// A typed value produced by the decoder (or validated by the encoder).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Untyped or table-coded string content.
    String(Rc<str>),
    Boolean(bool),
    /// Pattern-facet boolean: the value plus which of the four lexical
    /// forms was coded (Spec 7.1.2).
    BooleanLexical(bool, &'static str),
    Decimal(Decimal),
    Float(Float),
    /// Integer im i64-Bereich.
    Integer(i64),
    /// Integer ausserhalb i64: Vorzeichen + Dezimalziffern des Betrags.
    BigInteger { negative: bool, digits: Rc<str> },
    UnsignedInteger(u64),
    /// Binary (base64Binary oder hexBinary); `hex` bestimmt die
    /// lexikalische Form.
    Binary { octets: Rc<[u8]>, hex: bool },
    DateTime(DateTime),
    /// Enumeration: Index plus die deklarierte lexikalische Form.
    Enumeration { index: usize, lexical: Rc<str> },
    /// Whitespace-separierte Listenitems.
    List(Vec<Value>),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Self::String(s.into())
    }

    /// Die kanonische lexikalische Form als `Rc<str>` (Strings ohne Kopie).
    pub fn to_lexical(&self) -> Rc<str> {
        match self {
            Self::String(s) => Rc::clone(s),
            Self::Enumeration { lexical, .. } => Rc::clone(lexical),
            other => Rc::from(other.to_string().as_str()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            Self::BooleanLexical(_, lexical) => f.write_str(lexical),
            Self::Decimal(d) => d.fmt(f),
            Self::Float(v) => v.fmt(f),
            Self::Integer(i) => i.fmt(f),
            Self::BigInteger { negative, digits } => {
                if *negative {
                    f.write_str("-")?;
                }
                f.write_str(digits)
            }
            Self::UnsignedInteger(u) => u.fmt(f),
            Self::Binary { octets, hex } => {
                if *hex {
                    f.write_str(&binary::to_hex(octets))
                } else {
                    f.write_str(&binary::to_base64(octets))
                }
            }
            Self::DateTime(dt) => dt.fmt(f),
            Self::Enumeration { lexical, .. } => f.write_str(lexical),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    item.fmt(f)?;
                }
                Ok(())
            }
        }
    }
}
