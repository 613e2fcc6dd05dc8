//! Datatype representations (Spec 7, Table 7-1).
//!
//! Ein [`Datatype`] benennt die Draht-Repraesentation eines Werts plus
//! die Schema-Herkunft: den QName des Schema-Typs und optional den
//! Basistyp (die Kette laeuft die DTR-Aufloesung entlang, Spec 7.4).
//! QName-als-Wert ist bewusst nicht codierbar — der Versuch ist ein
//! Fehler, kein Fallback.

use std::rc::Rc;

use crate::context::QNameId;
use crate::datetime::DateTimeKind;
use crate::rcs::{self, RestrictedCharacterSet};

/// The wire representation of a value (Spec Table 7-1).
#[derive(Debug, Clone, PartialEq)]
pub enum Representation {
    /// base64Binary/hexBinary; `hex` steuert nur die lexikalische Form.
    Binary { hex: bool },
    /// 1 Bit (Spec 7.1.2).
    Boolean,
    /// 2-Bit-Form bei Pattern-Facetten (Spec 7.1.2).
    BooleanPattern,
    Decimal,
    /// float und double teilen eine Repraesentation (Spec 7.1.4).
    Float,
    Integer,
    UnsignedInteger,
    /// n-Bit Unsigned Integer mit Wertebereich (Spec 7.1.9).
    NBitInteger { lower: i64, upper: i64 },
    String,
    /// String ueber ein Restricted Character Set (Spec 7.1.10.1).
    RcsString(RestrictedCharacterSet),
    /// Extended String (EXI Profile): zusaetzliche Diskriminatoren im
    /// String-Umschlag, optional mit Grammar-Strings-Enumeration.
    ExtendedString { grammar_strings: Option<Rc<[Rc<str>]>> },
    /// Index in die deklarierte Werteliste (Spec 7.1.7).
    Enumeration { values: Rc<[Rc<str>]> },
    /// Laenge + Items mit dem Item-Datentyp (Spec 7.1.8... 7.1.7 list).
    List { item: Rc<Datatype> },
    DateTime(DateTimeKind),
    /// Spec 7.1: QName-Werte setzen Prefix-Kontext voraus den der Core
    /// nicht traegt; Codierung ist ein fataler Fehler.
    QName,
}

/// A datatype: representation plus schema ancestry.
#[derive(Debug, Clone, PartialEq)]
pub struct Datatype {
    pub representation: Representation,
    /// QName des Schema-Typs (fuer DTR-Lookup, Spec 7.4).
    pub schema_type: Option<QNameId>,
    /// Basistyp; die DTR-Aufloesung laeuft diese Kette hoch.
    pub base: Option<Rc<Datatype>>,
}

impl Datatype {
    pub fn new(representation: Representation) -> Self {
        Self { representation, schema_type: None, base: None }
    }

    pub fn with_schema_type(mut self, schema_type: QNameId) -> Self {
        self.schema_type = Some(schema_type);
        self
    }

    pub fn with_base(mut self, base: Rc<Datatype>) -> Self {
        self.base = Some(base);
        self
    }

    /// Der Default ohne Schema-Information (Spec 8.4: alle Werte sind
    /// Strings).
    pub fn string() -> Self {
        Self::new(Representation::String)
    }

    pub fn boolean() -> Self {
        Self::new(Representation::Boolean)
    }

    pub fn integer() -> Self {
        Self::new(Representation::Integer)
    }

    pub fn unsigned_integer() -> Self {
        Self::new(Representation::UnsignedInteger)
    }

    pub fn decimal() -> Self {
        Self::new(Representation::Decimal)
    }

    pub fn float() -> Self {
        Self::new(Representation::Float)
    }

    pub fn n_bit(lower: i64, upper: i64) -> Self {
        Self::new(Representation::NBitInteger { lower, upper })
    }

    pub fn list(item: Datatype) -> Self {
        Self::new(Representation::List { item: Rc::new(item) })
    }

    pub fn enumeration(values: Vec<Rc<str>>) -> Self {
        Self::new(Representation::Enumeration { values: values.into() })
    }

    /// Repraesentation eines eingebauten XSD-Typs (Spec Table 7-1).
    /// Unbekannte Namen fallen auf String zurueck.
    pub fn for_xsd(local_name: &str) -> Self {
        let representation = match local_name {
            "base64Binary" => Representation::Binary { hex: false },
            "hexBinary" => Representation::Binary { hex: true },
            "boolean" => Representation::Boolean,
            "decimal" => Representation::Decimal,
            "float" | "double" => Representation::Float,
            "integer" | "int" | "long" | "short" | "byte" | "negativeInteger"
            | "nonPositiveInteger" => Representation::Integer,
            "nonNegativeInteger" | "positiveInteger" | "unsignedLong" | "unsignedInt"
            | "unsignedShort" | "unsignedByte" => Representation::UnsignedInteger,
            "dateTime" => Representation::DateTime(DateTimeKind::DateTime),
            "date" => Representation::DateTime(DateTimeKind::Date),
            "time" => Representation::DateTime(DateTimeKind::Time),
            "gYear" => Representation::DateTime(DateTimeKind::GYear),
            "gYearMonth" => Representation::DateTime(DateTimeKind::GYearMonth),
            "gMonth" => Representation::DateTime(DateTimeKind::GMonth),
            "gMonthDay" => Representation::DateTime(DateTimeKind::GMonthDay),
            "gDay" => Representation::DateTime(DateTimeKind::GDay),
            "QName" | "NOTATION" => Representation::QName,
            _ => Representation::String,
        };
        Self::new(representation)
    }

    /// Integer-artig im Sinne der DTR-Sonderregel (Spec 7.4).
    pub fn is_integer_kind(&self) -> bool {
        matches!(
            self.representation,
            Representation::Integer
                | Representation::UnsignedInteger
                | Representation::NBitInteger { .. }
        )
    }

    /// Das Restricted Character Set der Typfamilie fuer den
    /// Lexical-Values-Modus (Spec 7.1.10.1, Appendix D); `None` heisst
    /// normale String-Codierung.
    pub fn lexical_set(&self) -> Option<RestrictedCharacterSet> {
        match &self.representation {
            Representation::Binary { hex: false } => Some(rcs::base64_binary_set()),
            Representation::Binary { hex: true } => Some(rcs::hex_binary_set()),
            Representation::Boolean | Representation::BooleanPattern => Some(rcs::boolean_set()),
            Representation::Decimal => Some(rcs::decimal_set()),
            Representation::Float => Some(rcs::double_set()),
            Representation::Integer
            | Representation::UnsignedInteger
            | Representation::NBitInteger { .. } => Some(rcs::integer_set()),
            Representation::DateTime(_) => Some(rcs::date_time_set()),
            Representation::List { item } => item.lexical_set(),
            _ => None,
        }
    }
}
