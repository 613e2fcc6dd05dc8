//! Typed value coding (Spec 7.1, 7.2).
//!
//! Der [`TypeEncoder`] validiert die lexikalische Form gegen den
//! Datentyp und liefert einen expliziten [`EncodedValue`] — `None`
//! heisst "passt nicht", der Aufrufer faellt auf seine eigene Regel
//! zurueck (schemalos: String). Erst `write` serialisiert; zwischen
//! try_encode und write liegt kein versteckter Zustand.
//!
//! Zwei Strategien: typisiert (Normalfall) und lexikalisch
//! (Preserve.lexicalValues) — dann laeuft jeder Wert als String ueber
//! die Tabelle, das Literal im Restricted Character Set seiner
//! Typfamilie (Spec 7.1.10.1).

use std::rc::Rc;

use crate::boolean::{self, BooleanForm};
use crate::channel::{DecoderChannel, EncoderChannel};
use crate::context::QNameId;
use crate::datatype::{Datatype, Representation};
use crate::datetime::DateTime;
use crate::decimal::Decimal;
use crate::dtr::DtrResolver;
use crate::float::Float;
use crate::rcs::{self, RestrictedCharacterSet};
use crate::string_table::ValueTable;
use crate::value::Value;
use crate::{
    Error, Result, binary, bit_width, datetime, decimal, float, integer,
    n_bit_unsigned_integer, unsigned_integer,
};

/// A validated, not yet serialized value.
#[derive(Debug, Clone)]
pub enum EncodedValue {
    Binary(Vec<u8>),
    Boolean(bool),
    BooleanForm(BooleanForm),
    Decimal(Decimal),
    Float(Float),
    Integer(i64),
    /// Integer ausserhalb i64 als Vorzeichen + Betragsziffern.
    BigInteger { negative: bool, digits: String },
    UnsignedInteger(u64),
    BigUnsigned(String),
    NBit { value: i64, lower: i64, upper: i64 },
    /// Tabellen-codierter String (Spec 7.3.3).
    TableString(Rc<str>),
    /// Tabellen-codiert, Literal im Restricted Character Set.
    RcsString { value: Rc<str>, set: RestrictedCharacterSet },
    ExtendedString { value: Rc<str>, grammar_strings: Option<Rc<[Rc<str>]>> },
    Enumeration { index: usize, count: usize },
    List(Vec<EncodedValue>),
    DateTime(DateTime),
}

/// Validating encoder half (Spec 7.2).
#[derive(Debug, Clone)]
pub struct TypeEncoder {
    lexical: bool,
    dtr: DtrResolver,
}

impl TypeEncoder {
    pub fn new(lexical: bool, dtr: DtrResolver) -> Self {
        Self { lexical, dtr }
    }

    /// Validiert `lexical` gegen den (DTR-aufgeloesten) Datentyp.
    /// `Ok(None)` = ungueltige Form, Aufrufer entscheidet den Fallback.
    pub fn try_encode(&self, datatype: &Datatype, lexical: &str) -> Result<Option<EncodedValue>> {
        let effective = self.dtr.resolve(datatype);
        if matches!(effective.representation, Representation::QName) {
            return Err(Error::QNameValueUnsupported);
        }
        if self.lexical {
            return Ok(Some(match effective.lexical_set() {
                Some(set) => EncodedValue::RcsString { value: Rc::from(lexical), set },
                None => EncodedValue::TableString(Rc::from(lexical)),
            }));
        }
        self.try_encode_representation(&effective.representation, lexical)
    }

    fn try_encode_representation(
        &self,
        representation: &Representation,
        lexical: &str,
    ) -> Result<Option<EncodedValue>> {
        let trimmed = lexical.trim();
        Ok(match representation {
            Representation::Binary { hex: false } => {
                binary::parse_base64(lexical).ok().map(EncodedValue::Binary)
            }
            Representation::Binary { hex: true } => {
                binary::parse_hex(lexical).ok().map(EncodedValue::Binary)
            }
            Representation::Boolean => match trimmed {
                "true" | "1" => Some(EncodedValue::Boolean(true)),
                "false" | "0" => Some(EncodedValue::Boolean(false)),
                _ => None,
            },
            Representation::BooleanPattern => {
                BooleanForm::parse(trimmed).map(EncodedValue::BooleanForm)
            }
            Representation::Decimal => Decimal::parse(trimmed).ok().map(EncodedValue::Decimal),
            Representation::Float => Float::parse(trimmed).ok().map(EncodedValue::Float),
            Representation::Integer => parse_integer(trimmed),
            Representation::UnsignedInteger => parse_unsigned(trimmed),
            Representation::NBitInteger { lower, upper } => trimmed
                .parse::<i64>()
                .ok()
                .filter(|v| (*lower..=*upper).contains(v))
                .map(|value| EncodedValue::NBit { value, lower: *lower, upper: *upper }),
            Representation::String => Some(EncodedValue::TableString(Rc::from(lexical))),
            Representation::RcsString(set) => {
                Some(EncodedValue::RcsString { value: Rc::from(lexical), set: set.clone() })
            }
            Representation::ExtendedString { grammar_strings } => {
                Some(EncodedValue::ExtendedString {
                    value: Rc::from(lexical),
                    grammar_strings: grammar_strings.clone(),
                })
            }
            Representation::Enumeration { values } => values
                .iter()
                .position(|v| v.as_ref() == trimmed)
                .map(|index| EncodedValue::Enumeration { index, count: values.len() }),
            Representation::List { item } => {
                let mut items = Vec::new();
                for part in trimmed.split_whitespace() {
                    match self.try_encode_representation(&item.representation, part)? {
                        Some(encoded) => items.push(encoded),
                        None => return Ok(None),
                    }
                }
                Some(EncodedValue::List(items))
            }
            Representation::DateTime(kind) => {
                DateTime::parse(*kind, trimmed).ok().map(EncodedValue::DateTime)
            }
            Representation::QName => return Err(Error::QNameValueUnsupported),
        })
    }

    /// Serialisiert einen validierten Wert (Spec 7.1).
    pub fn write(
        &self,
        encoded: &EncodedValue,
        qname: QNameId,
        channel: &mut EncoderChannel,
        tables: &mut ValueTable,
    ) -> Result<()> {
        match encoded {
            EncodedValue::Binary(octets) => binary::encode(channel, octets),
            EncodedValue::Boolean(b) => boolean::encode(channel, *b),
            EncodedValue::BooleanForm(form) => boolean::encode_form(channel, *form),
            EncodedValue::Decimal(d) => decimal::encode(channel, d)?,
            EncodedValue::Float(f) => float::encode(channel, *f)?,
            EncodedValue::Integer(i) => integer::encode(channel, *i),
            EncodedValue::BigInteger { negative, digits } => {
                integer::encode_digits(channel, *negative, digits)?
            }
            EncodedValue::UnsignedInteger(u) => unsigned_integer::encode(channel, *u),
            EncodedValue::BigUnsigned(digits) => unsigned_integer::encode_digits(channel, digits)?,
            EncodedValue::NBit { value, lower, upper } => {
                n_bit_unsigned_integer::encode_bounded(channel, *value, *lower, *upper)
            }
            EncodedValue::TableString(value) => tables.encode_value(channel, qname, value)?,
            EncodedValue::RcsString { value, set } => {
                write_rcs_string(channel, tables, qname, value, set)?
            }
            EncodedValue::ExtendedString { value, grammar_strings } => {
                tables.encode_value_extended(channel, qname, value, grammar_strings.as_deref())?
            }
            EncodedValue::Enumeration { index, count } => {
                let width = bit_width::coding_length(*count);
                n_bit_unsigned_integer::encode(channel, *index as u64, width);
            }
            EncodedValue::List(items) => {
                unsigned_integer::encode(channel, items.len() as u64);
                for item in items {
                    self.write(item, qname, channel, tables)?;
                }
            }
            EncodedValue::DateTime(dt) => datetime::encode(channel, dt)?,
        }
        Ok(())
    }
}

/// Decoding half (Spec 7.2).
#[derive(Debug, Clone)]
pub struct TypeDecoder {
    lexical: bool,
    dtr: DtrResolver,
}

impl TypeDecoder {
    pub fn new(lexical: bool, dtr: DtrResolver) -> Self {
        Self { lexical, dtr }
    }

    pub fn read(
        &self,
        datatype: &Datatype,
        qname: QNameId,
        channel: &mut DecoderChannel,
        tables: &mut ValueTable,
    ) -> Result<Value> {
        let effective = self.dtr.resolve(datatype);
        if matches!(effective.representation, Representation::QName) {
            return Err(Error::QNameValueUnsupported);
        }
        if self.lexical {
            let value = match effective.lexical_set() {
                Some(set) => read_rcs_string(channel, tables, qname, &set)?,
                None => tables.decode_value(channel, qname)?,
            };
            return Ok(Value::String(value));
        }
        self.read_representation(&effective.representation, qname, channel, tables)
    }

    fn read_representation(
        &self,
        representation: &Representation,
        qname: QNameId,
        channel: &mut DecoderChannel,
        tables: &mut ValueTable,
    ) -> Result<Value> {
        Ok(match representation {
            Representation::Binary { hex } => Value::Binary {
                octets: binary::decode(channel)?.into(),
                hex: *hex,
            },
            Representation::Boolean => Value::Boolean(boolean::decode(channel)?),
            Representation::BooleanPattern => {
                let form = boolean::decode_form(channel)?;
                Value::BooleanLexical(form.value(), form.lexical())
            }
            Representation::Decimal => Value::Decimal(decimal::decode(channel)?),
            Representation::Float => Value::Float(float::decode(channel)?),
            Representation::Integer => {
                let (negative, digits) = integer::decode_digits(channel)?;
                match as_i64(negative, &digits) {
                    Some(i) => Value::Integer(i),
                    None => Value::BigInteger { negative, digits: digits.into() },
                }
            }
            Representation::UnsignedInteger => {
                let digits = unsigned_integer::decode_digits(channel)?;
                match digits.parse::<u64>() {
                    Ok(u) => Value::UnsignedInteger(u),
                    Err(_) => Value::BigInteger { negative: false, digits: digits.into() },
                }
            }
            Representation::NBitInteger { lower, upper } => {
                Value::Integer(n_bit_unsigned_integer::decode_bounded(channel, *lower, *upper)?)
            }
            Representation::String => Value::String(tables.decode_value(channel, qname)?),
            Representation::RcsString(set) => {
                Value::String(read_rcs_string(channel, tables, qname, set)?)
            }
            Representation::ExtendedString { grammar_strings } => Value::String(
                tables.decode_value_extended(channel, qname, grammar_strings.as_deref())?,
            ),
            Representation::Enumeration { values } => {
                let width = bit_width::coding_length(values.len());
                let index = n_bit_unsigned_integer::decode(channel, width)? as usize;
                let lexical = values.get(index).map(Rc::clone).ok_or(
                    Error::InvalidEnumerationIndex { index, enum_count: values.len() },
                )?;
                Value::Enumeration { index, lexical }
            }
            Representation::List { item } => {
                let count = unsigned_integer::decode(channel)?;
                if count > u32::MAX as u64 {
                    return Err(Error::ListLengthOverflow(count));
                }
                let mut items = Vec::with_capacity((count as usize).min(1 << 16));
                for _ in 0..count {
                    items.push(self.read_representation(
                        &item.representation,
                        qname,
                        channel,
                        tables,
                    )?);
                }
                Value::List(items)
            }
            Representation::DateTime(kind) => Value::DateTime(datetime::decode(channel, *kind)?),
            Representation::QName => return Err(Error::QNameValueUnsupported),
        })
    }
}

fn as_i64(negative: bool, digits: &str) -> Option<i64> {
    let magnitude = digits.parse::<u64>().ok()?;
    if negative {
        (magnitude <= (1 << 63)).then(|| (magnitude as i64).wrapping_neg())
    } else {
        i64::try_from(magnitude).ok()
    }
}

fn parse_integer(trimmed: &str) -> Option<EncodedValue> {
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(EncodedValue::Integer(i));
    }
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    if digits.is_empty() || digits.bytes().any(|b| !b.is_ascii_digit()) {
        return None;
    }
    Some(EncodedValue::BigInteger { negative, digits: digits.to_owned() })
}

fn parse_unsigned(trimmed: &str) -> Option<EncodedValue> {
    if let Ok(u) = trimmed.parse::<u64>() {
        return Some(EncodedValue::UnsignedInteger(u));
    }
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if digits.is_empty() || digits.bytes().any(|b| !b.is_ascii_digit()) {
        return None;
    }
    Some(EncodedValue::BigUnsigned(digits.to_owned()))
}

/// Tabellen-Umschlag mit RCS-Literal (Spec 7.3.3 + 7.1.10.1).
fn write_rcs_string(
    channel: &mut EncoderChannel,
    tables: &mut ValueTable,
    qname: QNameId,
    value: &str,
    set: &RestrictedCharacterSet,
) -> Result<()> {
    match tables.get(value) {
        Some(info) if info.owner == Some(qname) => {
            unsigned_integer::encode(channel, 0);
            n_bit_unsigned_integer::encode(channel, info.local_id as u64, tables.local_width(qname));
        }
        Some(info) => {
            unsigned_integer::encode(channel, 1);
            n_bit_unsigned_integer::encode(channel, info.global_id as u64, tables.global_width());
        }
        None => {
            rcs::encode_with_offset(channel, set, value, 2);
            if tables.should_add(value) {
                tables.add(qname, Rc::from(value));
            }
        }
    }
    Ok(())
}

fn read_rcs_string(
    channel: &mut DecoderChannel,
    tables: &mut ValueTable,
    qname: QNameId,
    set: &RestrictedCharacterSet,
) -> Result<Rc<str>> {
    let i = unsigned_integer::decode(channel)?;
    match i {
        0 => {
            let id = n_bit_unsigned_integer::decode(channel, tables.local_width(qname))?;
            tables.local_value(qname, id as usize)
        }
        1 => {
            let id = n_bit_unsigned_integer::decode(channel, tables.global_width())?;
            tables.global_value(id as usize)
        }
        _ => {
            let value: Rc<str> = Rc::from(rcs::decode_codepoints(channel, set, i - 2)?);
            if tables.should_add(&value) {
                tables.add(qname, Rc::clone(&value));
            }
            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::DateTimeKind;
    use crate::options::ExiOptions;

    const Q: QNameId = QNameId { uri_id: 0, local_id: 0 };

    fn coder() -> (TypeEncoder, TypeDecoder) {
        (
            TypeEncoder::new(false, DtrResolver::default()),
            TypeDecoder::new(false, DtrResolver::default()),
        )
    }

    fn round_trip(datatype: &Datatype, lexical: &str) -> Value {
        let (enc, dec) = coder();
        let encoded = enc.try_encode(datatype, lexical).unwrap().unwrap();
        let mut tables = ValueTable::new(&ExiOptions::default());
        let mut c = EncoderChannel::new(false);
        enc.write(&encoded, Q, &mut c, &mut tables).unwrap();

        let mut tables = ValueTable::new(&ExiOptions::default());
        let mut d = DecoderChannel::new(c.into_vec(), false);
        dec.read(datatype, Q, &mut d, &mut tables).unwrap()
    }

    #[test]
    fn boolean_forms() {
        assert_eq!(round_trip(&Datatype::boolean(), "true"), Value::Boolean(true));
        assert_eq!(round_trip(&Datatype::boolean(), " 0 "), Value::Boolean(false));

        let pattern = Datatype::new(Representation::BooleanPattern);
        assert_eq!(round_trip(&pattern, "1"), Value::BooleanLexical(true, "1"));
        assert_eq!(round_trip(&pattern, "false"), Value::BooleanLexical(false, "false"));
    }

    #[test]
    fn integer_small_and_big() {
        assert_eq!(round_trip(&Datatype::integer(), "-42"), Value::Integer(-42));
        assert_eq!(
            round_trip(&Datatype::integer(), &i64::MIN.to_string()),
            Value::Integer(i64::MIN)
        );
        let big = "123456789012345678901234567890";
        assert_eq!(
            round_trip(&Datatype::integer(), big),
            Value::BigInteger { negative: false, digits: big.into() }
        );
        assert_eq!(
            round_trip(&Datatype::unsigned_integer(), "18446744073709551615"),
            Value::UnsignedInteger(u64::MAX)
        );
    }

    /// Spec 7.1.9: n-Bit codiert value - lower.
    #[test]
    fn n_bit_range() {
        let dt = Datatype::n_bit(-4, 3);
        assert_eq!(round_trip(&dt, "-4"), Value::Integer(-4));
        assert_eq!(round_trip(&dt, "3"), Value::Integer(3));

        let (enc, _) = coder();
        assert!(enc.try_encode(&dt, "4").unwrap().is_none(), "ausserhalb des Bereichs");
    }

    /// Ungueltige Formen liefern None, keinen Fehler (Fallback-Regel).
    #[test]
    fn invalid_lexical_yields_none() {
        let (enc, _) = coder();
        assert!(enc.try_encode(&Datatype::integer(), "abc").unwrap().is_none());
        assert!(enc.try_encode(&Datatype::boolean(), "yes").unwrap().is_none());
        assert!(enc.try_encode(&Datatype::decimal(), "1.2.3").unwrap().is_none());
        assert!(
            enc.try_encode(&Datatype::new(Representation::Binary { hex: true }), "xyz")
                .unwrap()
                .is_none()
        );
    }

    /// Spec 7.1: QName-Werte sind fatal, kein Fallback.
    #[test]
    fn qname_datatype_is_fatal() {
        let (enc, dec) = coder();
        let dt = Datatype::new(Representation::QName);
        assert_eq!(enc.try_encode(&dt, "p:x").unwrap_err(), Error::QNameValueUnsupported);

        let mut tables = ValueTable::new(&ExiOptions::default());
        let mut d = DecoderChannel::new(vec![0], false);
        assert_eq!(
            dec.read(&dt, Q, &mut d, &mut tables).unwrap_err(),
            Error::QNameValueUnsupported
        );
    }

    #[test]
    fn enumeration_round_trip() {
        let dt = Datatype::enumeration(vec!["red".into(), "green".into(), "blue".into()]);
        assert_eq!(
            round_trip(&dt, "green"),
            Value::Enumeration { index: 1, lexical: "green".into() }
        );
        let (enc, _) = coder();
        assert!(enc.try_encode(&dt, "yellow").unwrap().is_none());
    }

    #[test]
    fn list_of_integers() {
        let dt = Datatype::list(Datatype::integer());
        assert_eq!(
            round_trip(&dt, " 1  -2 3 "),
            Value::List(vec![Value::Integer(1), Value::Integer(-2), Value::Integer(3)])
        );
        let (enc, _) = coder();
        assert!(enc.try_encode(&dt, "1 x").unwrap().is_none(), "ein Item ungueltig");
    }

    #[test]
    fn datetime_and_binary() {
        let dt = Datatype::new(Representation::DateTime(DateTimeKind::Date));
        let Value::DateTime(d) = round_trip(&dt, "2024-02-29") else {
            panic!("expected DateTime");
        };
        assert_eq!(d.to_string(), "2024-02-29");

        let dt = Datatype::new(Representation::Binary { hex: false });
        let Value::Binary { octets, hex } = round_trip(&dt, "SGVsbG8=") else {
            panic!("expected Binary");
        };
        assert_eq!(&*octets, b"Hello");
        assert!(!hex);
    }

    #[test]
    fn strings_use_the_table() {
        let (enc, dec) = coder();
        let dt = Datatype::string();
        let mut tables = ValueTable::new(&ExiOptions::default());
        let mut c = EncoderChannel::new(false);
        for _ in 0..2 {
            let e = enc.try_encode(&dt, "wert").unwrap().unwrap();
            enc.write(&e, Q, &mut c, &mut tables).unwrap();
        }
        let bytes = c.into_vec();
        // Miss (5 Bytes: Laenge+2, 4 Zeichen) + lokaler Hit (1 Byte + 0-Bit-Id)
        assert_eq!(bytes.len(), 6);

        let mut tables = ValueTable::new(&ExiOptions::default());
        let mut d = DecoderChannel::new(bytes, false);
        assert_eq!(dec.read(&dt, Q, &mut d, &mut tables).unwrap(), Value::string("wert"));
        assert_eq!(dec.read(&dt, Q, &mut d, &mut tables).unwrap(), Value::string("wert"));
    }

    /// Lexical-Modus: Dezimalwert laeuft als RCS-String ueber die Tabelle.
    #[test]
    fn lexical_mode_preserves_form() {
        let enc = TypeEncoder::new(true, DtrResolver::default());
        let dec = TypeDecoder::new(true, DtrResolver::default());
        let dt = Datatype::decimal();

        // "+1.50" ist typisiert unkanonisch, lexikalisch bleibt es erhalten
        let encoded = enc.try_encode(&dt, "+1.50").unwrap().unwrap();
        let mut tables = ValueTable::new(&ExiOptions::default());
        let mut c = EncoderChannel::new(false);
        enc.write(&encoded, Q, &mut c, &mut tables).unwrap();

        let mut tables = ValueTable::new(&ExiOptions::default());
        let mut d = DecoderChannel::new(c.into_vec(), false);
        assert_eq!(dec.read(&dt, Q, &mut d, &mut tables).unwrap(), Value::string("+1.50"));
    }
}
