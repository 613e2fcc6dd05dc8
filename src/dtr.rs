//! Datatype Representation Map (Spec 7.4).
//!
//! Eine DTR-Map biegt die Repraesentation eines Schema-Typs auf eine
//! der eingebauten EXI-Repraesentationen um. Die Aufloesung laeuft die
//! Basistyp-Kette des Datentyps hoch; Enumerationen und Listen ehren
//! nur Direkttreffer und fallen sonst auf ihren Basistyp zurueck.
//! Sonderregel fuer die Integer-Familie: ein n-Bit- oder
//! Unsigned-Datentyp behaelt seine engere Repraesentation wenn der
//! getroffene Vorfahr ohnehin auf einen (weiteren) Integer abbildet.

use crate::context::GrammarContext;
use crate::context::QNameId;
use crate::datatype::{Datatype, Representation};
use crate::datetime::DateTimeKind;
use crate::options::{EXI_REPRESENTATION_URI, ExiOptions};
use crate::{Error, FastHashMap, Result};

/// Resolved DTR map, keyed by schema-type qname id.
#[derive(Debug, Clone, Default)]
pub struct DtrResolver {
    map: FastHashMap<QNameId, Representation>,
}

impl DtrResolver {
    /// Loest die Options-Eintraege gegen den Kontext auf. Typen die der
    /// Kontext nicht kennt koennen nie treffen und werden uebersprungen;
    /// unbekannte Repraesentationsnamen sind ein Fehler (Spec 7.4).
    pub fn new(options: &ExiOptions, context: &GrammarContext) -> Result<Self> {
        let mut map = FastHashMap::default();
        for entry in options.dtr_map() {
            let representation = representation_by_name(&entry.representation.local_name)
                .ok_or_else(|| {
                    Error::UnsupportedDatatypeRepresentation(format!(
                        "{{{EXI_REPRESENTATION_URI}}}{}",
                        entry.representation.local_name
                    ))
                })?;
            match context.qname_id(&entry.type_qname.uri, &entry.type_qname.local_name) {
                Some(id) => {
                    map.insert(id, representation);
                }
                None => {
                    log::debug!(
                        "dtr entry for unknown type {{{}}}{} ignored",
                        entry.type_qname.uri,
                        entry.type_qname.local_name
                    );
                }
            }
        }
        Ok(Self { map })
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Effektiver Datentyp unter der DTR-Map (Spec 7.4).
    pub fn resolve(&self, datatype: &Datatype) -> Datatype {
        if self.map.is_empty() {
            return datatype.clone();
        }

        // Direkttreffer auf dem eigenen Schema-Typ
        if let Some(mapped) = datatype.schema_type.and_then(|id| self.map.get(&id)) {
            if keeps_narrow_integer(datatype, mapped) {
                return datatype.clone();
            }
            return Datatype {
                representation: mapped.clone(),
                schema_type: datatype.schema_type,
                base: datatype.base.clone(),
            };
        }

        // Vorfahren-Treffer
        let mut ancestor = datatype.base.as_deref();
        while let Some(a) = ancestor {
            if let Some(mapped) = a.schema_type.and_then(|id| self.map.get(&id)) {
                // Enumerationen und Listen ehren nur Direkttreffer:
                // sie fallen auf ihren Basistyp zurueck
                if matches!(
                    datatype.representation,
                    Representation::Enumeration { .. } | Representation::List { .. }
                ) {
                    return self.resolve(a);
                }
                if keeps_narrow_integer(datatype, mapped) {
                    return datatype.clone();
                }
                return Datatype {
                    representation: mapped.clone(),
                    schema_type: datatype.schema_type,
                    base: datatype.base.clone(),
                };
            }
            ancestor = a.base.as_deref();
        }

        datatype.clone()
    }
}

/// Spec 7.4: n-Bit bleibt n-Bit unter integer/unsignedInteger-Mapping,
/// Unsigned bleibt Unsigned unter integer-Mapping.
fn keeps_narrow_integer(datatype: &Datatype, mapped: &Representation) -> bool {
    match datatype.representation {
        Representation::NBitInteger { .. } => {
            matches!(mapped, Representation::Integer | Representation::UnsignedInteger)
        }
        Representation::UnsignedInteger => matches!(mapped, Representation::Integer),
        _ => false,
    }
}

/// Die Repraesentationsnamen im EXI-Namespace (Spec 7.4 Table 7-2).
fn representation_by_name(local_name: &str) -> Option<Representation> {
    Some(match local_name {
        "base64Binary" => Representation::Binary { hex: false },
        "hexBinary" => Representation::Binary { hex: true },
        "boolean" => Representation::Boolean,
        "decimal" => Representation::Decimal,
        "double" => Representation::Float,
        "integer" => Representation::Integer,
        "unsignedInteger" => Representation::UnsignedInteger,
        "string" => Representation::String,
        // EXI Profile: Extended String
        "estring" => Representation::ExtendedString { grammar_strings: None },
        "dateTime" => Representation::DateTime(DateTimeKind::DateTime),
        "date" => Representation::DateTime(DateTimeKind::Date),
        "time" => Representation::DateTime(DateTimeKind::Time),
        "gYear" => Representation::DateTime(DateTimeKind::GYear),
        "gYearMonth" => Representation::DateTime(DateTimeKind::GYearMonth),
        "gMonth" => Representation::DateTime(DateTimeKind::GMonth),
        "gMonthDay" => Representation::DateTime(DateTimeKind::GMonthDay),
        "gDay" => Representation::DateTime(DateTimeKind::GDay),
        _ => return None,
    })
}
