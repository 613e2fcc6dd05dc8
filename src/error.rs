//! Central error types for the EXI core processing model.
//!
//! Each variant references the relevant W3C EXI 1.0 Second Edition spec section.

use core::fmt;
use std::borrow::Cow;

/// All error conditions of the core coder.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// An event code does not match any production in the current grammar (Spec 6.1, 6.2).
    InvalidEventCode {
        /// Der Event Code der nicht passte (leer wenn nicht verfügbar).
        event_code: Cow<'static, str>,
        /// Der Grammar-Zustand in dem der Fehler auftrat (leer wenn nicht verfügbar).
        grammar_state: Cow<'static, str>,
    },
    /// Events appear in an order the current grammar cannot express (Spec 8).
    OrderingViolation {
        /// Was erwartet wurde (leer wenn nicht verfügbar).
        expected: Cow<'static, str>,
        /// Was gefunden wurde (leer wenn nicht verfügbar).
        found: Cow<'static, str>,
    },
    /// Two productions carry the same event but different right-hand sides (Spec 8.5.4.1.6).
    ConflictingProduction {
        /// Das Event das doppelt hinzugefügt wurde.
        event: Cow<'static, str>,
    },
    /// A frozen (END state) grammar was asked to accept another production (Spec 8.5.4).
    FrozenGrammarModified,
    /// The EXI stream ended before a complete structure was decoded (Spec 6).
    PrematureEndOfStream,
    /// An invalid combination of EXI options was specified (Spec 5.4).
    InvalidOptionCombination(Cow<'static, str>),
    /// A datatype representation qname is not a known EXI representation (Spec 7.4).
    UnsupportedDatatypeRepresentation(String),
    /// QName-typed values have no EXI value representation (Spec 7.1, erratum E2).
    QNameValueUnsupported,
    /// A float value exceeds the representable exponent range (Spec 7.1.4 MUST NOT).
    FloatOutOfRange,
    /// An integer value exceeds the representable range (Spec 7.1.5, 7.1.6).
    IntegerOverflow,
    /// A Unicode code point is invalid: surrogate (U+D800..U+DFFF) or > U+10FFFF (Spec 7.1.10).
    InvalidCodePoint(u64),
    /// A typed value could not be parsed against its datatype (Spec 7.1).
    InvalidValue(String),
    /// An enumeration index exceeds the declared value count (Spec 7.2).
    InvalidEnumerationIndex { index: usize, enum_count: usize },
    /// A list length exceeds the maximum allowed size (Spec 7.1.11).
    ListLengthOverflow(u64),
    /// A compact identifier points outside a partition or at an evicted slot (Spec 7.3).
    InvalidCompactId(usize),
    /// A decoded string exceeds the configured maximum length.
    ///
    /// Ausgelöst wenn `value_max_length` gesetzt ist und ein decodierter
    /// String diese Grenze überschreitet.
    StringLengthExceeded { length: u64, max: u32 },
    /// An extended-string discriminator without defined semantics (Spec [EXI Profile]).
    ///
    /// 3 = shared string, 4 = split string, 5 = undefined — keine davon wird
    /// von dieser Implementierung produziert oder akzeptiert.
    UnsupportedExtendedString(u64),
    /// A URI, local-name or prefix index points outside its partition (Spec 7.3.1).
    UnknownContextId { partition: Cow<'static, str>, id: usize },
    /// Block size must be greater than zero (Spec 9.1).
    InvalidBlockSize,
    /// DEFLATE compression failed.
    ///
    /// EXI Spec 9.3: "Each compressed stream in a block is stored using the
    /// standard DEFLATE Compressed Data Format defined by RFC 1951."
    CompressionError(String),
    /// DEFLATE decompression failed.
    ///
    /// EXI Spec 9.3: "Each compressed stream in a block is stored using the
    /// standard DEFLATE Compressed Data Format defined by RFC 1951."
    DecompressionError(String),
    /// Self-contained elements require bit- or byte-alignment (Spec 5.4, 8.4.3).
    SelfContainedNotAllowed,
    /// Decoder made no progress (internal guard against infinite loops).
    DecoderStalled,
    /// Ein IO-Fehler beim Schreiben des EXI-Streams.
    IoError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEventCode { event_code, grammar_state } => {
                if event_code.is_empty() && grammar_state.is_empty() {
                    write!(f, "invalid event code (Spec 6.1, 6.2)")
                } else if grammar_state.is_empty() {
                    write!(f, "invalid event code '{event_code}' (Spec 6.1, 6.2)")
                } else {
                    write!(f, "invalid event code '{event_code}' in state '{grammar_state}' (Spec 6.1, 6.2)")
                }
            }
            Self::OrderingViolation { expected, found } => {
                if expected.is_empty() && found.is_empty() {
                    write!(f, "event ordering violation (Spec 8)")
                } else {
                    write!(f, "event ordering violation: expected '{expected}', found '{found}' (Spec 8)")
                }
            }
            Self::ConflictingProduction { event } => {
                write!(f, "conflicting production for event '{event}': same event, different right-hand side (Spec 8.5.4.1.6)")
            }
            Self::FrozenGrammarModified => {
                write!(f, "grammar is frozen and accepts no further productions (Spec 8.5.4)")
            }
            Self::PrematureEndOfStream => write!(f, "premature end of EXI stream (Spec 6)"),
            Self::InvalidOptionCombination(msg) => {
                if msg.is_empty() {
                    write!(f, "invalid EXI option combination (Spec 5.4)")
                } else {
                    write!(f, "invalid EXI option combination: {msg} (Spec 5.4)")
                }
            }
            Self::UnsupportedDatatypeRepresentation(qname) => {
                write!(f, "unsupported datatype representation '{qname}' (Spec 7.4)")
            }
            Self::QNameValueUnsupported => {
                write!(f, "QName-typed values have no EXI representation (Spec 7.1)")
            }
            Self::FloatOutOfRange => write!(f, "float value out of range (Spec 7.1.4)"),
            Self::IntegerOverflow => write!(f, "integer overflow (Spec 7.1.5, 7.1.6)"),
            Self::InvalidCodePoint(cp) => write!(f, "invalid Unicode code point U+{cp:X} (Spec 7.1.10)"),
            Self::InvalidValue(msg) => write!(f, "invalid typed value (Spec 7.1): {msg}"),
            Self::InvalidEnumerationIndex { index, enum_count } => {
                write!(f, "enum index {index} exceeds valid range 0..{enum_count} (Spec 7.2)")
            }
            Self::ListLengthOverflow(len) => write!(f, "list length {len} exceeds max allowed size (Spec 7.1.11)"),
            Self::InvalidCompactId(id) => write!(f, "invalid or evicted compact identifier {id} (Spec 7.3)"),
            Self::StringLengthExceeded { length, max } => {
                write!(f, "string length {length} exceeds maximum {max}")
            }
            Self::UnsupportedExtendedString(disc) => {
                write!(f, "extended string discriminator {disc} has no defined semantics")
            }
            Self::UnknownContextId { partition, id } => {
                write!(f, "unknown {partition} partition id {id} (Spec 7.3.1)")
            }
            Self::InvalidBlockSize => write!(f, "block size must be greater than zero (Spec 9.1)"),
            Self::CompressionError(msg) => write!(f, "DEFLATE compression failed (RFC 1951, Spec 9.3): {msg}"),
            Self::DecompressionError(msg) => write!(f, "DEFLATE decompression failed (RFC 1951, Spec 9.3): {msg}"),
            Self::SelfContainedNotAllowed => {
                write!(f, "self-contained elements require bit or byte alignment (Spec 5.4, 8.4.3)")
            }
            Self::DecoderStalled => write!(f, "decoder stalled (no progress)"),
            Self::IoError(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Erstellt einen `InvalidEventCode` Fehler mit Kontext.
    pub fn invalid_event_code(
        event_code: impl Into<Cow<'static, str>>,
        grammar_state: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidEventCode {
            event_code: event_code.into(),
            grammar_state: grammar_state.into(),
        }
    }

    /// Erstellt einen `OrderingViolation` Fehler mit Kontext.
    pub fn ordering_violation(
        expected: impl Into<Cow<'static, str>>,
        found: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::OrderingViolation {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Erstellt einen `ConflictingProduction` Fehler.
    pub fn conflicting_production(event: impl Into<Cow<'static, str>>) -> Self {
        Self::ConflictingProduction { event: event.into() }
    }

    /// Erstellt einen `InvalidOptionCombination` Fehler mit Nachricht.
    pub fn invalid_options(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidOptionCombination(msg.into())
    }

    /// Erstellt einen `UnknownContextId` Fehler.
    pub fn unknown_context_id(partition: impl Into<Cow<'static, str>>, id: usize) -> Self {
        Self::UnknownContextId { partition: partition.into(), id }
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
