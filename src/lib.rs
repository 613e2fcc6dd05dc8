//! exicore – EXI 1.0 (W3C Second Edition) core processing model
//!
//! Grammar-driven event coding, string/value tables, typed value codecs,
//! channel/block compression and self-contained fragments. XML front ends,
//! schema construction and the EXI header are out of scope; grammars are
//! consumed pre-built (or learned on the fly in schema-less mode).
//!
//! # Beispiel
//!
//! ```
//! use exicore::{BodyDecoder, BodyEncoder, ExiEvent, ExiOptions, Grammars};
//!
//! let grammars = Grammars::schema_less();
//! let mut enc = BodyEncoder::new(ExiOptions::default(), grammars.clone()).unwrap();
//! enc.start_document().unwrap();
//! enc.start_element("", "greeting", None).unwrap();
//! enc.characters("Hello").unwrap();
//! enc.end_element().unwrap();
//! enc.end_document().unwrap();
//! let bytes = enc.finish().unwrap();
//!
//! let mut dec = BodyDecoder::new(ExiOptions::default(), grammars, &bytes).unwrap();
//! let mut n = 0;
//! while let Some(_ev) = dec.next_event().unwrap() {
//!     n += 1;
//! }
//! assert_eq!(n, 5);
//! ```

pub mod binary;
pub mod bit_width;
pub mod bitstream;
pub mod block;
pub mod boolean;
pub mod channel;
pub mod context;
pub mod datatype;
pub mod datetime;
pub mod decimal;
pub mod decoder;
pub mod dtr;
pub mod encoder;
pub mod error;
pub mod event;
pub mod float;
pub mod grammar;
pub mod integer;
pub mod n_bit_unsigned_integer;
pub mod options;
pub mod rcs;
pub mod string;
pub mod string_table;
pub mod typed_coder;
pub mod unsigned_integer;
pub mod value;

pub use error::{Error, Result};

/// HashMap mit ahash (schneller, nicht DoS-resistent — für interne Datenstrukturen).
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Events
pub use event::{AtContent, ChContent, DtContent, ErContent, ExiEvent, NsContent, PiContent, QName};

// Public API: Options
pub use options::{CodingMode, DtrMapping, ExiOptions, Fidelity};

// Public API: Grammars & Kontext
pub use context::{GrammarContext, QNameId};
pub use datatype::Datatype;
pub use grammar::{Grammars, SchemaInformedGrammarBuilder};

// Public API: Coder
pub use decoder::BodyDecoder;
pub use encoder::{BodyEncoder, SelfContainedHandler};

// Public API: Werte
pub use value::Value;
