//! EXI Options data model (Spec 5.4, Table 5-1).
//!
//! Steuert Codierung und Decodierung des EXI-Bodys. Encoder und Decoder
//! muessen mit identischen Optionen laufen; der Options-Header selbst
//! liegt ausserhalb dieses Crates.
//!
//! # Beispiel
//!
//! ```
//! use exicore::{CodingMode, ExiOptions, Fidelity};
//!
//! let opts = ExiOptions::default()
//!     .with_coding_mode(CodingMode::BytePacked)
//!     .with_fidelity(Fidelity { comments: true, ..Fidelity::default() })
//!     .with_value_max_length(1024);
//!
//! assert_eq!(opts.coding_mode(), CodingMode::BytePacked);
//! assert!(opts.fidelity().comments);
//! assert_eq!(opts.value_max_length(), Some(1024));
//! ```

use crate::event::QName;
use crate::{Error, Result};

/// Namespace der alternativen Datatype-Representations (Spec 7.4).
pub const EXI_REPRESENTATION_URI: &str = "http://www.w3.org/2009/exi";

/// How the body stream is aligned and packed (Spec 5.4, 6.2, 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodingMode {
    /// Event codes and content are packed in bits without padding (default).
    #[default]
    BitPacked,
    /// n-bit values widen to whole bytes (Spec 6.2).
    BytePacked,
    /// Byte-aligned plus channel/block reordering, no DEFLATE (Spec 9.2).
    PreCompression,
    /// Pre-compression plus DEFLATE per stream (Spec 9.3).
    Compression,
}

impl CodingMode {
    /// Spec 6.2: alle Modi ausser bit-packed runden n-Bit-Werte auf Bytes.
    pub fn byte_aligned(self) -> bool {
        !matches!(self, Self::BitPacked)
    }

    /// Strukturkanal + Value-Channels statt eines einzigen Stroms (Spec 9.2).
    pub fn channelized(self) -> bool {
        matches!(self, Self::PreCompression | Self::Compression)
    }

    pub fn deflate(self) -> bool {
        matches!(self, Self::Compression)
    }
}

/// Fidelity options controlling preservation of information items
/// (Spec 5.4, 6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fidelity {
    /// CM events can be preserved.
    pub comments: bool,
    /// PI events can be preserved.
    pub pis: bool,
    /// DT and ER events can be preserved.
    pub dtd: bool,
    /// NS events and namespace prefixes can be preserved.
    pub prefixes: bool,
    /// Lexical form of element and attribute values can be preserved.
    pub lexical_values: bool,
    /// SC events are allowed (Spec 5.4 selfContained).
    pub self_contained: bool,
}

impl Fidelity {
    /// Die Flags die `strict` ausschliessen (Spec 5.4).
    pub fn conflicts_with_strict(&self) -> bool {
        self.comments || self.pis || self.dtd || self.prefixes || self.self_contained
    }
}

/// A datatype representation map entry (Spec 5.4, 7.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtrMapping {
    /// QName des XML-Schema-Typs (z.B. {XSD}decimal).
    pub type_qname: QName,
    /// QName der Representation im EXI-Namespace (z.B. {EXI}string).
    pub representation: QName,
}

/// EXI options controlling body coding (Spec 5.4, Table 5-1).
#[derive(Debug, Clone, PartialEq)]
pub struct ExiOptions {
    pub(crate) coding_mode: CodingMode,
    pub(crate) strict: bool,
    pub(crate) fragment: bool,
    pub(crate) fidelity: Fidelity,
    /// Elemente die als eigenstaendige Fragmente codiert werden (Spec 9.4).
    pub(crate) self_contained_elements: Vec<QName>,
    pub(crate) dtr_map: Vec<DtrMapping>,
    pub(crate) block_size: u32,
    pub(crate) value_max_length: Option<u32>,
    pub(crate) value_partition_capacity: Option<u32>,
    /// Vorab bekannte Strings fuer die globale Value-Partition.
    pub(crate) shared_strings: Vec<String>,
    /// DEFLATE-Level 0..=9 (Default: flate2-Default).
    pub(crate) compression_level: Option<u32>,
}

impl Default for ExiOptions {
    /// Creates options with the default values of Spec Table 5-1.
    fn default() -> Self {
        Self {
            coding_mode: CodingMode::BitPacked,
            strict: false,
            fragment: false,
            fidelity: Fidelity::default(),
            self_contained_elements: Vec::new(),
            dtr_map: Vec::new(),
            block_size: 1_000_000,
            value_max_length: None,
            value_partition_capacity: None,
            shared_strings: Vec::new(),
            compression_level: None,
        }
    }
}

impl ExiOptions {
    // --- Getter ---

    pub fn coding_mode(&self) -> CodingMode { self.coding_mode }
    /// Strict interpretation of schemas (Spec 5.4).
    pub fn strict(&self) -> bool { self.strict }
    /// Body is coded as an EXI fragment (Spec 5.4).
    pub fn fragment(&self) -> bool { self.fragment }
    pub fn fidelity(&self) -> &Fidelity { &self.fidelity }
    pub fn self_contained_elements(&self) -> &[QName] { &self.self_contained_elements }
    pub fn dtr_map(&self) -> &[DtrMapping] { &self.dtr_map }
    /// Block size for channelized modes (Spec 9.1).
    pub fn block_size(&self) -> u32 { self.block_size }
    /// Maximum string length for string table addition.
    pub fn value_max_length(&self) -> Option<u32> { self.value_max_length }
    /// Total capacity of the global value partition.
    pub fn value_partition_capacity(&self) -> Option<u32> { self.value_partition_capacity }
    pub fn shared_strings(&self) -> &[String] { &self.shared_strings }
    pub fn compression_level(&self) -> Option<u32> { self.compression_level }

    // --- Builder-Setter (Fluent API) ---

    pub fn with_coding_mode(mut self, mode: CodingMode) -> Self { self.coding_mode = mode; self }
    pub fn with_strict(mut self) -> Self { self.strict = true; self }
    pub fn with_fragment(mut self) -> Self { self.fragment = true; self }
    pub fn with_fidelity(mut self, fidelity: Fidelity) -> Self { self.fidelity = fidelity; self }
    pub fn with_self_contained_elements(mut self, qnames: Vec<QName>) -> Self {
        self.self_contained_elements = qnames;
        self
    }
    pub fn with_dtr_map(mut self, map: Vec<DtrMapping>) -> Self { self.dtr_map = map; self }
    pub fn with_block_size(mut self, size: u32) -> Self { self.block_size = size; self }
    pub fn with_value_max_length(mut self, len: u32) -> Self { self.value_max_length = Some(len); self }
    pub fn with_value_partition_capacity(mut self, cap: u32) -> Self { self.value_partition_capacity = Some(cap); self }
    pub fn with_shared_strings(mut self, strings: Vec<String>) -> Self { self.shared_strings = strings; self }
    pub fn with_compression_level(mut self, level: u32) -> Self { self.compression_level = Some(level); self }

    /// Validates the option combination (Spec 5.4 constraints).
    ///
    /// # Errors
    ///
    /// - `strict` together with any of comments/pis/dtd/prefixes/selfContained
    ///   (Spec 5.4)
    /// - selfContained together with (pre-)compression (Spec 5.4)
    /// - registered self-contained elements without the selfContained flag
    /// - `block_size` of zero (Spec 9.1)
    /// - DTR entries whose representation is outside the EXI namespace
    ///   (Spec 7.4)
    pub fn validate(&self) -> Result<()> {
        // Spec 9.1: block_size == 0 wuerde den Block-Zaehler nie ausloesen
        if self.block_size == 0 {
            return Err(Error::InvalidBlockSize);
        }

        // Spec 5.4: "strict" MUST NOT appear with "dtd", "prefixes",
        // "comments", "pis" or "selfContained"
        if self.strict && self.fidelity.conflicts_with_strict() {
            return Err(Error::invalid_options(
                "strict excludes comments/pis/dtd/prefixes/selfContained (Spec 5.4)",
            ));
        }

        // Spec 5.4: "selfContained" MUST NOT appear with "compression"
        // or "pre-compression"
        if self.fidelity.self_contained && self.coding_mode.channelized() {
            return Err(Error::invalid_options(
                "selfContained excludes (pre-)compression (Spec 5.4)",
            ));
        }

        if !self.self_contained_elements.is_empty() && !self.fidelity.self_contained {
            return Err(Error::invalid_options(
                "self-contained elements require the selfContained fidelity flag",
            ));
        }

        // Spec 7.4: Representations leben im EXI-Namespace
        for entry in &self.dtr_map {
            if entry.representation.uri.as_ref() != EXI_REPRESENTATION_URI {
                return Err(Error::UnsupportedDatatypeRepresentation(format!(
                    "{{{}}}{}",
                    entry.representation.uri, entry.representation.local_name
                )));
            }
        }

        if let Some(level) = self.compression_level
            && level > 9
        {
            return Err(Error::invalid_options("DEFLATE level must be 0..=9"));
        }

        Ok(())
    }

    /// True wenn das Element als self-contained registriert ist.
    pub fn is_self_contained_element(&self, uri: &str, local_name: &str) -> bool {
        self.fidelity.self_contained
            && self
                .self_contained_elements
                .iter()
                .any(|q| q.uri.as_ref() == uri && q.local_name.as_ref() == local_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Spec 5.4, Table 5-1: Defaults.
    #[test]
    fn defaults_match_table_5_1() {
        let opts = ExiOptions::default();
        assert_eq!(opts.coding_mode(), CodingMode::BitPacked);
        assert!(!opts.strict());
        assert!(!opts.fragment());
        assert_eq!(opts.fidelity(), &Fidelity::default());
        assert_eq!(opts.block_size(), 1_000_000);
        assert!(opts.value_max_length().is_none());
        assert!(opts.value_partition_capacity().is_none());
        assert!(opts.dtr_map().is_empty());
        assert!(opts.validate().is_ok());
    }

    /// Spec 6.2: byte-Alignment-Eigenschaften der Modi.
    #[test]
    fn coding_mode_properties() {
        assert!(!CodingMode::BitPacked.byte_aligned());
        assert!(CodingMode::BytePacked.byte_aligned());
        assert!(CodingMode::PreCompression.byte_aligned());
        assert!(CodingMode::Compression.byte_aligned());
        assert!(!CodingMode::BytePacked.channelized());
        assert!(CodingMode::PreCompression.channelized());
        assert!(!CodingMode::PreCompression.deflate());
        assert!(CodingMode::Compression.deflate());
    }

    /// Spec 5.4: strict mit lexicalValues ist explizit erlaubt.
    #[test]
    fn strict_with_lexical_values_is_valid() {
        let opts = ExiOptions::default()
            .with_strict()
            .with_fidelity(Fidelity { lexical_values: true, ..Default::default() });
        assert!(opts.validate().is_ok());
    }

    /// Spec 5.4: strict schliesst die uebrigen Fidelity-Flags aus.
    #[test]
    fn strict_conflicts() {
        for fidelity in [
            Fidelity { comments: true, ..Default::default() },
            Fidelity { pis: true, ..Default::default() },
            Fidelity { dtd: true, ..Default::default() },
            Fidelity { prefixes: true, ..Default::default() },
            Fidelity { self_contained: true, ..Default::default() },
        ] {
            let opts = ExiOptions::default().with_strict().with_fidelity(fidelity);
            assert!(opts.validate().is_err(), "{fidelity:?}");
        }
    }

    /// Spec 5.4: selfContained schliesst (Pre-)Compression aus.
    #[test]
    fn self_contained_excludes_channelized_modes() {
        for mode in [CodingMode::PreCompression, CodingMode::Compression] {
            let opts = ExiOptions::default()
                .with_coding_mode(mode)
                .with_fidelity(Fidelity { self_contained: true, ..Default::default() });
            assert!(opts.validate().is_err(), "{mode:?}");
        }
        let opts = ExiOptions::default()
            .with_coding_mode(CodingMode::BytePacked)
            .with_fidelity(Fidelity { self_contained: true, ..Default::default() });
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn sc_elements_require_fidelity_flag() {
        let opts = ExiOptions::default()
            .with_self_contained_elements(vec![QName::new("", "chunk")]);
        assert!(opts.validate().is_err());

        let opts = opts.with_fidelity(Fidelity { self_contained: true, ..Default::default() });
        assert!(opts.validate().is_ok());
        assert!(opts.is_self_contained_element("", "chunk"));
        assert!(!opts.is_self_contained_element("", "other"));
    }

    /// Spec 9.1: block_size = 0 ist ungueltig.
    #[test]
    fn block_size_zero_is_invalid() {
        let opts = ExiOptions::default().with_block_size(0);
        assert_eq!(opts.validate(), Err(Error::InvalidBlockSize));
        assert!(ExiOptions::default().with_block_size(1).validate().is_ok());
    }

    /// Spec 7.4: Representations muessen im EXI-Namespace liegen.
    #[test]
    fn dtr_representation_namespace_checked() {
        let good = ExiOptions::default().with_dtr_map(vec![DtrMapping {
            type_qname: QName::new("http://www.w3.org/2001/XMLSchema", "decimal"),
            representation: QName::new(EXI_REPRESENTATION_URI, "string"),
        }]);
        assert!(good.validate().is_ok());

        let bad = ExiOptions::default().with_dtr_map(vec![DtrMapping {
            type_qname: QName::new("http://www.w3.org/2001/XMLSchema", "decimal"),
            representation: QName::new("urn:other", "string"),
        }]);
        assert!(matches!(
            bad.validate(),
            Err(Error::UnsupportedDatatypeRepresentation(_))
        ));
    }

    #[test]
    fn compression_level_range() {
        assert!(ExiOptions::default().with_compression_level(9).validate().is_ok());
        assert!(ExiOptions::default().with_compression_level(10).validate().is_err());
    }
}
