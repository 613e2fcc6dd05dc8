//! Name & context registry (Spec 7.3, Appendix D).
//!
//! Zwei Schichten: der gefrorene [`GrammarContext`] haelt die aus dem
//! Schema (oder den Default-Eintraegen, Appendix D) bekannten URIs und
//! lokalen Namen mit festen Ids; der [`CoderContext`] waechst pro
//! Coder-Instanz um die zur Laufzeit gelernten Namen. Encoder und
//! Decoder muessen aus derselben Event-Folge identisch wachsen, sonst
//! divergieren die Compact-Ids.

use std::rc::Rc;

use crate::channel::{DecoderChannel, EncoderChannel};
use crate::datatype::Datatype;
use crate::event::QName;
use crate::grammar::GrammarId;
use crate::{Error, Result, bit_width, n_bit_unsigned_integer, string, unsigned_integer};

pub const XML_NS_URI: &str = "http://www.w3.org/XML/1998/namespace";
pub const XSI_URI: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XSD_URI: &str = "http://www.w3.org/2001/XMLSchema";

/// Identity of a qualified name: URI partition id + local-name id.
///
/// Gleichheit und Hashing laufen nur ueber dieses Paar; die Strings
/// haengen im Kontext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QNameId {
    pub uri_id: u16,
    pub local_id: u16,
}

/// A local name known to the frozen context, plus the back-references the
/// grammar assembly fills in once.
#[derive(Debug, Clone)]
pub struct QNameContext {
    pub id: QNameId,
    pub local_name: Rc<str>,
    /// Grammatik des globalen Elements dieses Namens (falls deklariert).
    pub global_element_grammar: Option<GrammarId>,
    /// Typ-Grammatik falls der Name ein globaler Typ ist.
    pub type_grammar: Option<GrammarId>,
    /// Datentyp des globalen Attributs dieses Namens (falls deklariert).
    pub global_attribute_datatype: Option<Datatype>,
}

/// One URI partition of the frozen context (Appendix D.1-D.3).
#[derive(Debug, Clone)]
pub struct GrammarUriContext {
    pub uri_id: u16,
    pub uri: Rc<str>,
    /// Deklarierte Prefixes in Partitionsreihenfolge (Appendix D.2).
    pub prefixes: Vec<Rc<str>>,
    /// Nach lokalem Namen sortiert (Binaersuche); Ids = Position.
    qnames: Vec<QNameContext>,
}

impl GrammarUriContext {
    pub fn qname_count(&self) -> usize {
        self.qnames.len()
    }

    pub fn qname(&self, local_id: u16) -> Option<&QNameContext> {
        self.qnames.get(local_id as usize)
    }

    pub fn find_local(&self, local_name: &str) -> Option<&QNameContext> {
        self.qnames
            .binary_search_by(|q| q.local_name.as_ref().cmp(local_name))
            .ok()
            .map(|i| &self.qnames[i])
    }
}

/// The frozen, schema-derived (or default) table of URI entries.
#[derive(Debug, Clone, Default)]
pub struct GrammarContext {
    uris: Vec<GrammarUriContext>,
    /// Namen die vor `seal` gesammelt wurden (Ids noch ungueltig).
    pending: Vec<(u16, Rc<str>)>,
    sealed: bool,
}

impl GrammarContext {
    /// Die Default-Eintraege die jeder EXI-Strom kennt (Appendix D):
    /// uri 0 = "", uri 1 = XML-Namespace, uri 2 = XSI.
    pub fn default_entries() -> Self {
        let mut ctx = Self::default();
        let empty = ctx.declare_uri("");
        ctx.declare_prefix(empty, "");
        let xml = ctx.declare_uri(XML_NS_URI);
        ctx.declare_prefix(xml, "xml");
        for local in ["base", "id", "lang", "space"] {
            ctx.declare_name(xml, local);
        }
        let xsi = ctx.declare_uri(XSI_URI);
        ctx.declare_prefix(xsi, "xsi");
        for local in ["nil", "type"] {
            ctx.declare_name(xsi, local);
        }
        ctx
    }

    /// Default-Eintraege plus uri 3 = XSD mit den eingebauten Typnamen
    /// (Appendix D.3) — die Basis jedes schema-informierten Kontexts.
    pub fn schema_informed_entries() -> Self {
        let mut ctx = Self::default_entries();
        let xsd = ctx.declare_uri(XSD_URI);
        for local in XSD_LOCAL_NAMES {
            ctx.declare_name(xsd, local);
        }
        ctx
    }

    /// Registers a URI (no-op if present) and returns its id.
    pub fn declare_uri(&mut self, uri: &str) -> u16 {
        if let Some(id) = self.uri_id(uri) {
            return id;
        }
        let id = self.uris.len() as u16;
        self.uris.push(GrammarUriContext {
            uri_id: id,
            uri: Rc::from(uri),
            prefixes: Vec::new(),
            qnames: Vec::new(),
        });
        id
    }

    pub fn declare_prefix(&mut self, uri_id: u16, prefix: &str) {
        if let Some(u) = self.uris.get_mut(uri_id as usize)
            && !u.prefixes.iter().any(|p| p.as_ref() == prefix)
        {
            u.prefixes.push(Rc::from(prefix));
        }
    }

    /// Sammelt einen lokalen Namen; Ids werden erst bei [`Self::seal`]
    /// vergeben (die Partition wird sortiert, spaetes Einfuegen wuerde
    /// bereits vergebene Ids verschieben).
    pub fn declare_name(&mut self, uri_id: u16, local_name: &str) {
        self.pending.push((uri_id, Rc::from(local_name)));
    }

    /// Sortiert jede Partition nach lokalem Namen und vergibt die Ids.
    pub fn seal(&mut self) {
        for (uri_id, local) in std::mem::take(&mut self.pending) {
            if let Some(u) = self.uris.get_mut(uri_id as usize)
                && !u.qnames.iter().any(|q| q.local_name == local)
            {
                u.qnames.push(QNameContext {
                    id: QNameId { uri_id, local_id: 0 },
                    local_name: local,
                    global_element_grammar: None,
                    type_grammar: None,
                    global_attribute_datatype: None,
                });
            }
        }
        for u in &mut self.uris {
            u.qnames.sort_by(|a, b| a.local_name.cmp(&b.local_name));
            for (i, q) in u.qnames.iter_mut().enumerate() {
                q.id.local_id = i as u16;
            }
        }
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn uri_count(&self) -> usize {
        self.uris.len()
    }

    pub fn uri_context(&self, uri_id: u16) -> Option<&GrammarUriContext> {
        self.uris.get(uri_id as usize)
    }

    pub fn uri_id(&self, uri: &str) -> Option<u16> {
        self.uris.iter().find(|u| u.uri.as_ref() == uri).map(|u| u.uri_id)
    }

    /// Lookup nach `seal`; vorher sind die Ids nicht stabil.
    pub fn qname_id(&self, uri: &str, local_name: &str) -> Option<QNameId> {
        let u = &self.uris[self.uri_id(uri)? as usize];
        u.find_local(local_name).map(|q| q.id)
    }

    pub fn qname_context(&self, id: QNameId) -> Option<&QNameContext> {
        self.uris.get(id.uri_id as usize)?.qname(id.local_id)
    }

    fn qname_context_mut(&mut self, id: QNameId) -> Option<&mut QNameContext> {
        self.uris.get_mut(id.uri_id as usize)?.qnames.get_mut(id.local_id as usize)
    }

    pub fn set_global_element_grammar(&mut self, id: QNameId, grammar: GrammarId) {
        if let Some(q) = self.qname_context_mut(id) {
            q.global_element_grammar = Some(grammar);
        }
    }

    pub fn set_type_grammar(&mut self, id: QNameId, grammar: GrammarId) {
        if let Some(q) = self.qname_context_mut(id) {
            q.type_grammar = Some(grammar);
        }
    }

    pub fn set_global_attribute_datatype(&mut self, id: QNameId, datatype: Datatype) {
        if let Some(q) = self.qname_context_mut(id) {
            q.global_attribute_datatype = Some(datatype);
        }
    }
}

/// Runtime-Erweiterung einer URI-Partition: gelernte Namen und Prefixes
/// haengen hinter den gefrorenen Eintraegen.
#[derive(Debug, Clone, Default)]
struct RuntimeUriContext {
    extra_locals: Vec<Rc<str>>,
    extra_prefixes: Vec<Rc<str>>,
}

/// Zur Laufzeit gelernte URI (ohne gefrorenes Gegenstueck).
#[derive(Debug, Clone)]
struct RuntimeUri {
    uri: Rc<str>,
    rt: RuntimeUriContext,
}

/// The per-coder name registry: frozen context plus runtime growth.
#[derive(Debug, Clone)]
pub struct CoderContext {
    grammar: Rc<GrammarContext>,
    /// Parallel zu den gefrorenen URIs, Index = uri_id.
    frozen_rt: Vec<RuntimeUriContext>,
    /// Gelernte URIs, Ids ab `grammar.uri_count()`.
    runtime_uris: Vec<RuntimeUri>,
}

impl CoderContext {
    pub fn new(grammar: Rc<GrammarContext>) -> Self {
        let frozen_rt = vec![RuntimeUriContext::default(); grammar.uri_count()];
        Self { grammar, frozen_rt, runtime_uris: Vec::new() }
    }

    pub fn grammar_context(&self) -> &GrammarContext {
        &self.grammar
    }

    pub fn uri_count(&self) -> usize {
        self.grammar.uri_count() + self.runtime_uris.len()
    }

    pub fn uri(&self, uri_id: u16) -> Result<Rc<str>> {
        let frozen = self.grammar.uri_count();
        if let Some(u) = self.grammar.uri_context(uri_id) {
            Ok(Rc::clone(&u.uri))
        } else {
            self.runtime_uris
                .get(uri_id as usize - frozen)
                .map(|r| Rc::clone(&r.uri))
                .ok_or_else(|| Error::unknown_context_id("uri", uri_id as usize))
        }
    }

    pub fn uri_id(&self, uri: &str) -> Option<u16> {
        self.grammar.uri_id(uri).or_else(|| {
            self.runtime_uris
                .iter()
                .position(|r| r.uri.as_ref() == uri)
                .map(|i| (self.grammar.uri_count() + i) as u16)
        })
    }

    pub fn add_uri(&mut self, uri: &str) -> u16 {
        if let Some(id) = self.uri_id(uri) {
            return id;
        }
        let id = self.uri_count() as u16;
        self.runtime_uris.push(RuntimeUri {
            uri: Rc::from(uri),
            rt: RuntimeUriContext::default(),
        });
        log::trace!("learned uri {id}: {uri}");
        id
    }

    fn runtime_of(&self, uri_id: u16) -> Result<&RuntimeUriContext> {
        let frozen = self.grammar.uri_count();
        if (uri_id as usize) < frozen {
            Ok(&self.frozen_rt[uri_id as usize])
        } else {
            self.runtime_uris
                .get(uri_id as usize - frozen)
                .map(|r| &r.rt)
                .ok_or_else(|| Error::unknown_context_id("uri", uri_id as usize))
        }
    }

    fn runtime_of_mut(&mut self, uri_id: u16) -> Result<&mut RuntimeUriContext> {
        let frozen = self.grammar.uri_count();
        if (uri_id as usize) < frozen {
            Ok(&mut self.frozen_rt[uri_id as usize])
        } else {
            self.runtime_uris
                .get_mut(uri_id as usize - frozen)
                .map(|r| &mut r.rt)
                .ok_or_else(|| Error::unknown_context_id("uri", uri_id as usize))
        }
    }

    fn frozen_local_count(&self, uri_id: u16) -> usize {
        self.grammar.uri_context(uri_id).map_or(0, GrammarUriContext::qname_count)
    }

    pub fn local_count(&self, uri_id: u16) -> Result<usize> {
        Ok(self.frozen_local_count(uri_id) + self.runtime_of(uri_id)?.extra_locals.len())
    }

    pub fn local_id(&self, uri_id: u16, local_name: &str) -> Result<Option<u16>> {
        if let Some(u) = self.grammar.uri_context(uri_id)
            && let Some(q) = u.find_local(local_name)
        {
            return Ok(Some(q.id.local_id));
        }
        let frozen = self.frozen_local_count(uri_id);
        Ok(self
            .runtime_of(uri_id)?
            .extra_locals
            .iter()
            .position(|l| l.as_ref() == local_name)
            .map(|i| (frozen + i) as u16))
    }

    pub fn add_local(&mut self, uri_id: u16, local_name: &str) -> Result<QNameId> {
        if let Some(local_id) = self.local_id(uri_id, local_name)? {
            return Ok(QNameId { uri_id, local_id });
        }
        let local_id = self.local_count(uri_id)? as u16;
        self.runtime_of_mut(uri_id)?.extra_locals.push(Rc::from(local_name));
        Ok(QNameId { uri_id, local_id })
    }

    pub fn local_name(&self, id: QNameId) -> Result<Rc<str>> {
        if let Some(q) = self.grammar.qname_context(id) {
            return Ok(Rc::clone(&q.local_name));
        }
        let frozen = self.frozen_local_count(id.uri_id);
        self.runtime_of(id.uri_id)?
            .extra_locals
            .get(id.local_id as usize - frozen)
            .map(Rc::clone)
            .ok_or_else(|| Error::unknown_context_id("local-name", id.local_id as usize))
    }

    pub fn prefix_count(&self, uri_id: u16) -> Result<usize> {
        let frozen = self.grammar.uri_context(uri_id).map_or(0, |u| u.prefixes.len());
        Ok(frozen + self.runtime_of(uri_id)?.extra_prefixes.len())
    }

    pub fn prefix_id(&self, uri_id: u16, prefix: &str) -> Result<Option<u16>> {
        if let Some(u) = self.grammar.uri_context(uri_id)
            && let Some(i) = u.prefixes.iter().position(|p| p.as_ref() == prefix)
        {
            return Ok(Some(i as u16));
        }
        let frozen = self.grammar.uri_context(uri_id).map_or(0, |u| u.prefixes.len());
        Ok(self
            .runtime_of(uri_id)?
            .extra_prefixes
            .iter()
            .position(|p| p.as_ref() == prefix)
            .map(|i| (frozen + i) as u16))
    }

    pub fn add_prefix(&mut self, uri_id: u16, prefix: &str) -> Result<u16> {
        if let Some(id) = self.prefix_id(uri_id, prefix)? {
            return Ok(id);
        }
        let id = self.prefix_count(uri_id)? as u16;
        self.runtime_of_mut(uri_id)?.extra_prefixes.push(Rc::from(prefix));
        Ok(id)
    }

    pub fn prefix(&self, uri_id: u16, prefix_id: u16) -> Result<Rc<str>> {
        if let Some(u) = self.grammar.uri_context(uri_id)
            && let Some(p) = u.prefixes.get(prefix_id as usize)
        {
            return Ok(Rc::clone(p));
        }
        let frozen = self.grammar.uri_context(uri_id).map_or(0, |u| u.prefixes.len());
        self.runtime_of(uri_id)?
            .extra_prefixes
            .get(prefix_id as usize - frozen)
            .map(Rc::clone)
            .ok_or_else(|| Error::unknown_context_id("prefix", prefix_id as usize))
    }

    /// Default-Prefix einer URI wenn keiner erhalten wurde (Appendix D.2).
    pub fn default_prefix(uri_id: u16) -> String {
        match uri_id {
            0 => String::new(),
            1 => "xml".to_owned(),
            2 => "xsi".to_owned(),
            id => format!("ns{id}"),
        }
    }

    /// Aufgeloester [`QName`] fuer die Event-Oberflaeche.
    pub fn resolve(&self, id: QNameId, prefix: Option<Rc<str>>) -> Result<QName> {
        Ok(QName {
            uri: self.uri(id.uri_id)?,
            local_name: self.local_name(id)?,
            prefix,
        })
    }

    // ---- Wire form (Spec 7.3.3) --------------------------------------

    /// URI: n-Bit ueber count+1; 0 = Miss + Literal, i+1 = Hit auf i.
    pub fn encode_uri(&mut self, channel: &mut EncoderChannel, uri: &str) -> Result<u16> {
        let count = self.uri_count();
        let width = bit_width::coding_length(count + 1);
        match self.uri_id(uri) {
            Some(id) => {
                n_bit_unsigned_integer::encode(channel, id as u64 + 1, width);
                Ok(id)
            }
            None => {
                n_bit_unsigned_integer::encode(channel, 0, width);
                string::encode(channel, uri);
                Ok(self.add_uri(uri))
            }
        }
    }

    pub fn decode_uri(&mut self, channel: &mut DecoderChannel) -> Result<u16> {
        let count = self.uri_count();
        let width = bit_width::coding_length(count + 1);
        let code = n_bit_unsigned_integer::decode(channel, width)?;
        if code == 0 {
            let uri = string::decode(channel)?;
            Ok(self.add_uri(&uri))
        } else {
            let id = (code - 1) as usize;
            if id >= count {
                return Err(Error::unknown_context_id("uri", id));
            }
            Ok(id as u16)
        }
    }

    /// Lokaler Name: Unsigned Integer m; m = 0 → Hit + n-Bit Compact-Id,
    /// m > 0 → Literal der Laenge m-1.
    pub fn encode_local_name(
        &mut self,
        channel: &mut EncoderChannel,
        uri_id: u16,
        local_name: &str,
    ) -> Result<QNameId> {
        match self.local_id(uri_id, local_name)? {
            Some(local_id) => {
                unsigned_integer::encode(channel, 0);
                let width = bit_width::coding_length(self.local_count(uri_id)?);
                n_bit_unsigned_integer::encode(channel, local_id as u64, width);
                Ok(QNameId { uri_id, local_id })
            }
            None => {
                string::encode_with_offset(channel, local_name, 1);
                self.add_local(uri_id, local_name)
            }
        }
    }

    pub fn decode_local_name(
        &mut self,
        channel: &mut DecoderChannel,
        uri_id: u16,
    ) -> Result<QNameId> {
        let m = unsigned_integer::decode(channel)?;
        if m == 0 {
            let count = self.local_count(uri_id)?;
            let width = bit_width::coding_length(count);
            let local_id = n_bit_unsigned_integer::decode(channel, width)? as usize;
            if local_id >= count {
                return Err(Error::unknown_context_id("local-name", local_id));
            }
            Ok(QNameId { uri_id, local_id: local_id as u16 })
        } else {
            let local = string::decode_codepoints(channel, m - 1)?;
            self.add_local(uri_id, &local)
        }
    }

    /// Prefix (nur bei Preserve.prefixes): gleicher Umschlag wie URIs
    /// ueber die Prefix-Partition der URI.
    pub fn encode_prefix(
        &mut self,
        channel: &mut EncoderChannel,
        uri_id: u16,
        prefix: &str,
    ) -> Result<u16> {
        let count = self.prefix_count(uri_id)?;
        let width = bit_width::coding_length(count + 1);
        match self.prefix_id(uri_id, prefix)? {
            Some(id) => {
                n_bit_unsigned_integer::encode(channel, id as u64 + 1, width);
                Ok(id)
            }
            None => {
                n_bit_unsigned_integer::encode(channel, 0, width);
                string::encode(channel, prefix);
                self.add_prefix(uri_id, prefix)
            }
        }
    }

    pub fn decode_prefix(&mut self, channel: &mut DecoderChannel, uri_id: u16) -> Result<u16> {
        let count = self.prefix_count(uri_id)?;
        let width = bit_width::coding_length(count + 1);
        let code = n_bit_unsigned_integer::decode(channel, width)?;
        if code == 0 {
            let prefix = string::decode(channel)?;
            self.add_prefix(uri_id, &prefix)
        } else {
            let id = (code - 1) as usize;
            if id >= count {
                return Err(Error::unknown_context_id("prefix", id));
            }
            Ok(id as u16)
        }
    }
}

/// Appendix D.3: die eingebauten XSD-Typnamen (bereits sortiert).
const XSD_LOCAL_NAMES: [&str; 46] = [
    "ENTITIES",
    "ENTITY",
    "ID",
    "IDREF",
    "IDREFS",
    "NCName",
    "NMTOKEN",
    "NMTOKENS",
    "NOTATION",
    "Name",
    "QName",
    "anySimpleType",
    "anyType",
    "anyURI",
    "base64Binary",
    "boolean",
    "byte",
    "date",
    "dateTime",
    "decimal",
    "double",
    "duration",
    "float",
    "gDay",
    "gMonth",
    "gMonthDay",
    "gYear",
    "gYearMonth",
    "hexBinary",
    "int",
    "integer",
    "language",
    "long",
    "negativeInteger",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "normalizedString",
    "positiveInteger",
    "short",
    "string",
    "time",
    "token",
    "unsignedByte",
    "unsignedInt",
    "unsignedLong",
    "unsignedShort",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn sealed_default() -> Rc<GrammarContext> {
        let mut ctx = GrammarContext::default_entries();
        ctx.seal();
        Rc::new(ctx)
    }

    /// Appendix D.1: uri 0 = "", 1 = xml, 2 = xsi.
    #[test]
    fn default_uri_partition() {
        let ctx = sealed_default();
        assert_eq!(ctx.uri_count(), 3);
        assert_eq!(ctx.uri_id(""), Some(0));
        assert_eq!(ctx.uri_id(XML_NS_URI), Some(1));
        assert_eq!(ctx.uri_id(XSI_URI), Some(2));
        assert_eq!(ctx.uri_id(XSD_URI), None);
    }

    /// Appendix D.3: sortierte lokale Namen mit Binaersuche.
    #[test]
    fn default_local_names_sorted() {
        let ctx = sealed_default();
        // xml: base < id < lang < space
        assert_eq!(ctx.qname_id(XML_NS_URI, "base"), Some(QNameId { uri_id: 1, local_id: 0 }));
        assert_eq!(ctx.qname_id(XML_NS_URI, "space"), Some(QNameId { uri_id: 1, local_id: 3 }));
        assert_eq!(ctx.qname_id(XSI_URI, "nil"), Some(QNameId { uri_id: 2, local_id: 0 }));
        assert_eq!(ctx.qname_id(XSI_URI, "type"), Some(QNameId { uri_id: 2, local_id: 1 }));
    }

    #[test]
    fn schema_informed_adds_xsd() {
        let mut ctx = GrammarContext::schema_informed_entries();
        ctx.seal();
        assert_eq!(ctx.uri_id(XSD_URI), Some(3));
        assert_eq!(ctx.uri_context(3).unwrap().qname_count(), 46);
        assert!(ctx.qname_id(XSD_URI, "dateTime").is_some());
    }

    /// Seal sortiert und dedupliziert gesammelte Namen.
    #[test]
    fn seal_sortiert_und_dedupliziert() {
        let mut ctx = GrammarContext::default_entries();
        let u = ctx.declare_uri("urn:test");
        ctx.declare_name(u, "zebra");
        ctx.declare_name(u, "alpha");
        ctx.declare_name(u, "zebra");
        ctx.seal();
        assert_eq!(ctx.qname_id("urn:test", "alpha").unwrap().local_id, 0);
        assert_eq!(ctx.qname_id("urn:test", "zebra").unwrap().local_id, 1);
        assert_eq!(ctx.uri_context(u).unwrap().qname_count(), 2);
    }

    #[test]
    fn runtime_growth_appends_after_frozen() {
        let mut coder = CoderContext::new(sealed_default());
        let xml_extra = coder.add_local(1, "zzz").unwrap();
        // 4 gefrorene xml-Namen, der gelernte bekommt Id 4
        assert_eq!(xml_extra.local_id, 4);
        assert_eq!(&*coder.local_name(xml_extra).unwrap(), "zzz");

        let new_uri = coder.add_uri("urn:runtime");
        assert_eq!(new_uri, 3);
        assert_eq!(coder.add_uri("urn:runtime"), 3, "idempotent");
        let q = coder.add_local(new_uri, "first").unwrap();
        assert_eq!(q, QNameId { uri_id: 3, local_id: 0 });
    }

    /// Spec 7.3.3: URI-Hit = i+1 in codingLength(count+1) Bits.
    #[test]
    fn uri_wire_hit_and_miss() {
        let mut enc = CoderContext::new(sealed_default());
        let mut c = EncoderChannel::new(false);
        assert_eq!(enc.encode_uri(&mut c, XML_NS_URI).unwrap(), 1);
        assert_eq!(enc.encode_uri(&mut c, "urn:new").unwrap(), 3);
        // nach dem Miss ist die Partition groesser, Hit auf die neue URI
        assert_eq!(enc.encode_uri(&mut c, "urn:new").unwrap(), 3);

        let mut dec = CoderContext::new(sealed_default());
        let mut d = DecoderChannel::new(c.into_vec(), false);
        assert_eq!(dec.decode_uri(&mut d).unwrap(), 1);
        assert_eq!(dec.decode_uri(&mut d).unwrap(), 3);
        assert_eq!(dec.decode_uri(&mut d).unwrap(), 3);
        assert_eq!(&*dec.uri(3).unwrap(), "urn:new");
    }

    /// Spec 7.3.3: lokaler Name m=0 Hit, m>0 Literal der Laenge m-1.
    #[test]
    fn local_name_wire_hit_and_miss() {
        let mut enc = CoderContext::new(sealed_default());
        let mut c = EncoderChannel::new(false);
        let a = enc.encode_local_name(&mut c, 0, "doc").unwrap();
        let b = enc.encode_local_name(&mut c, 0, "doc").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, QNameId { uri_id: 0, local_id: 0 });

        let mut dec = CoderContext::new(sealed_default());
        let mut d = DecoderChannel::new(c.into_vec(), false);
        assert_eq!(dec.decode_local_name(&mut d, 0).unwrap(), a);
        assert_eq!(dec.decode_local_name(&mut d, 0).unwrap(), a);
        assert_eq!(&*dec.local_name(a).unwrap(), "doc");
    }

    /// Hit auf Partition der Groesse 1 kostet 0 Bits fuer die Compact-Id.
    #[test]
    fn single_entry_partition_zero_bits() {
        let mut enc = CoderContext::new(sealed_default());
        let mut c = EncoderChannel::new(false);
        enc.encode_local_name(&mut c, 0, "x").unwrap();
        let miss_len = c.byte_len();
        enc.encode_local_name(&mut c, 0, "x").unwrap();
        // Hit = nur das eine Unsigned-Integer-Byte 0
        assert_eq!(c.byte_len(), miss_len + 1);
    }

    #[test]
    fn prefix_wire_round_trip() {
        let mut enc = CoderContext::new(sealed_default());
        let mut c = EncoderChannel::new(false);
        enc.encode_prefix(&mut c, 1, "xml").unwrap();
        enc.encode_prefix(&mut c, 0, "p").unwrap();
        enc.encode_prefix(&mut c, 0, "p").unwrap();

        let mut dec = CoderContext::new(sealed_default());
        let mut d = DecoderChannel::new(c.into_vec(), false);
        assert_eq!(dec.decode_prefix(&mut d, 1).unwrap(), 0);
        let p = dec.decode_prefix(&mut d, 0).unwrap();
        assert_eq!(dec.decode_prefix(&mut d, 0).unwrap(), p);
        assert_eq!(&*dec.prefix(0, p).unwrap(), "p");
    }

    #[test]
    fn default_prefixes() {
        assert_eq!(CoderContext::default_prefix(0), "");
        assert_eq!(CoderContext::default_prefix(1), "xml");
        assert_eq!(CoderContext::default_prefix(2), "xsi");
        assert_eq!(CoderContext::default_prefix(7), "ns7");
    }

    #[test]
    fn unknown_ids_are_errors() {
        let coder = CoderContext::new(sealed_default());
        assert!(coder.uri(9).is_err());
        assert!(coder.local_name(QNameId { uri_id: 0, local_id: 5 }).is_err());
    }
}
