//! EXI body encoder (Spec 6, 8, 9).
//!
//! Push-API: der Aufrufer meldet Events (`start_element`, `attribute`,
//! `characters`, ...), der Encoder schreibt Event-Codes ueber die
//! aktuelle Grammatik, laesst built-in Grammatiken lernen und schickt
//! Werte durch den typisierten Coder. In den channelized Modi
//! (Pre-Compression/Compression) laeuft die Struktur in den Structure
//! Channel und jeder Wert aufgeschoben in den Channel seines QNames.
//!
//! Selbstenthaltene Elemente (Spec 8.4.3 SC) laufen als eigenstaendiges
//! Fragment mit frischen Tabellen und frischen gelernten Grammatiken;
//! der aeussere Strom traegt fuer sie kein EE.

use crate::block::{Block, BlockWriter};
use crate::channel::EncoderChannel;
use crate::context::{CoderContext, QNameId};
use crate::datatype::Datatype;
use crate::dtr::DtrResolver;
use crate::event::Event;
use crate::grammar::{CoderGrammars, GrammarId, GrammarKind, Grammars, SecondLevel, third_level};
use crate::options::ExiOptions;
use crate::string_table::ValueTable;
use crate::typed_coder::TypeEncoder;
use crate::{Error, Result, bit_width, boolean, n_bit_unsigned_integer, string};

/// Callback fuer selbstenthaltene Elemente: gerufen unmittelbar nach
/// dem SC-Event-Code und dem Byte-Alignment, `byte_offset` zeigt auf
/// den Fragment-Anfang im Gesamtstrom (Spec 8.4.3).
pub trait SelfContainedHandler {
    fn self_contained(&mut self, uri: &str, local_name: &str, byte_offset: usize);
}

/// Ein offenes Element: QName plus die Grammatik in der der Parent
/// nach dem EE weitermacht.
#[derive(Debug, Clone, Copy)]
struct StackEntry {
    qname: QNameId,
    continuation: GrammarId,
}

/// Wie ein SE/AT-Event im ersten Level gefunden wurde.
enum Plan {
    /// Deklarierte Produktion: Code schreiben, QName ist implizit.
    Declared { code: u64, width: u8, next: GrammarId, datatype: Option<Datatype> },
    /// SE(uri,*)/AT(uri,*): Code + lokaler Name.
    Ns { code: u64, width: u8, next: GrammarId, uri_id: u16 },
    /// SE(*)/AT(*) im ersten Level: Code + voller QName.
    Generic { code: u64, width: u8, next: GrammarId },
    /// Zweiter Level (undeclared).
    Undeclared,
}

pub struct BodyEncoder {
    options: ExiOptions,
    grammars: CoderGrammars,
    context: CoderContext,
    tables: ValueTable,
    types: TypeEncoder,
    channel: EncoderChannel,
    /// Nur in channelized Modi belegt.
    block: Option<Block>,
    writer: Option<BlockWriter>,
    state: GrammarId,
    stack: Vec<StackEntry>,
    started: bool,
    finished: bool,
    /// Aktives SC-Fragment; solange gesetzt werden alle Events
    /// durchgereicht.
    sc_inner: Option<Box<BodyEncoder>>,
    sc_handler: Option<Box<dyn SelfContainedHandler>>,
    /// Das erste SE eines Fragment-Coders ist das SC-Element selbst
    /// und darf nicht erneut als SC starten.
    suppress_sc_once: bool,
}

impl BodyEncoder {
    pub fn new(options: ExiOptions, grammars: Grammars) -> Result<Self> {
        options.validate()?;
        let dtr = DtrResolver::new(&options, grammars.context())?;
        let types = TypeEncoder::new(options.fidelity().lexical_values, dtr);
        let tables = ValueTable::new(&options);
        let context = CoderContext::new(grammars.context().clone());
        let state = if options.fragment() { grammars.fragment() } else { grammars.document() };
        let channelized = options.coding_mode().channelized();
        Ok(Self {
            channel: EncoderChannel::new(options.coding_mode().byte_aligned()),
            block: channelized.then(Block::new),
            writer: channelized.then(|| BlockWriter::new(&options)),
            grammars: CoderGrammars::new(grammars),
            context,
            tables,
            types,
            options,
            state,
            stack: Vec::new(),
            started: false,
            finished: false,
            sc_inner: None,
            sc_handler: None,
            suppress_sc_once: false,
        })
    }

    pub fn set_self_contained_handler(&mut self, handler: Box<dyn SelfContainedHandler>) {
        self.sc_handler = Some(handler);
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }

    // ---- Emission primitives -----------------------------------------

    fn structure(&mut self) -> &mut EncoderChannel {
        match &mut self.block {
            Some(b) => b.structure(),
            None => &mut self.channel,
        }
    }

    fn emit(&mut self, value: u64, bits: u8) {
        n_bit_unsigned_integer::encode(self.structure(), value, bits);
    }

    fn emit_string(&mut self, value: &str) {
        string::encode(self.structure(), value);
    }

    /// QName-Drahtform (Spec 7.3.3): URI, dann lokaler Name.
    fn encode_qname(&mut self, uri: &str, local_name: &str) -> Result<QNameId> {
        let ch = match &mut self.block {
            Some(b) => b.structure(),
            None => &mut self.channel,
        };
        let uri_id = self.context.encode_uri(ch, uri)?;
        self.context.encode_local_name(ch, uri_id, local_name)
    }

    fn encode_local(&mut self, uri_id: u16, local_name: &str) -> Result<QNameId> {
        let ch = match &mut self.block {
            Some(b) => b.structure(),
            None => &mut self.channel,
        };
        self.context.encode_local_name(ch, uri_id, local_name)
    }

    /// Prefix-Komponente, nur bei Preserve.prefixes (Spec 7.3.3).
    fn encode_prefix_part(&mut self, uri_id: u16, prefix: Option<&str>) -> Result<()> {
        if !self.options.fidelity().prefixes {
            return Ok(());
        }
        let p = match prefix {
            Some(p) => p.to_owned(),
            None => CoderContext::default_prefix(uri_id),
        };
        let ch = match &mut self.block {
            Some(b) => b.structure(),
            None => &mut self.channel,
        };
        self.context.encode_prefix(ch, uri_id, &p)?;
        Ok(())
    }

    /// First-Level-Code der aktuellen Grammatik.
    fn emit_first_level(&mut self, code: u64) -> Result<()> {
        let (width,) = {
            let g = self.grammars.grammar(self.state)?;
            (g.first_level_width(!g.second_level(&self.options).is_empty()),)
        };
        self.emit(code, width);
        Ok(())
    }

    /// Escape in den zweiten (und ggf. dritten) Level (Spec 6.2).
    fn emit_second_level(&mut self, target: SecondLevel) -> Result<()> {
        let (escape, width_first, level) = {
            let g = self.grammars.grammar(self.state)?;
            (g.len() as u64, g.first_level_width(true), g.second_level(&self.options))
        };
        if level.is_empty() {
            return Err(Error::invalid_event_code(
                format!("{target:?}"),
                format!("{:?}", self.grammar_kind()?),
            ));
        }
        let second_width = bit_width::coding_length(level.len());
        match level.iter().position(|s| *s == target) {
            Some(i) => {
                self.emit(escape, width_first);
                self.emit(i as u64, second_width);
            }
            None => {
                let esc = level
                    .iter()
                    .position(|s| *s == SecondLevel::CommentPiEscape)
                    .ok_or_else(|| {
                        Error::invalid_event_code(
                            format!("{target:?}"),
                            format!("{:?}", self.grammar_kind().unwrap_or(GrammarKind::Document)),
                        )
                    })?;
                let third = third_level(self.options.fidelity());
                let t = third.iter().position(|s| *s == target).ok_or_else(|| {
                    Error::invalid_event_code(format!("{target:?}"), "third level")
                })?;
                self.emit(escape, width_first);
                self.emit(esc as u64, second_width);
                self.emit(t as u64, bit_width::coding_length(third.len()));
            }
        }
        Ok(())
    }

    fn grammar_kind(&self) -> Result<GrammarKind> {
        Ok(self.grammars.grammar(self.state)?.kind)
    }

    // ---- Values ------------------------------------------------------

    /// Typisierter Wert; channelized aufgeschoben, sonst direkt.
    fn write_encoded(
        &mut self,
        qname: QNameId,
        encoded: crate::typed_coder::EncodedValue,
    ) -> Result<()> {
        match &mut self.block {
            Some(b) => b.push_value(qname, encoded),
            None => self.types.write(&encoded, qname, &mut self.channel, &mut self.tables)?,
        }
        self.maybe_flush()
    }

    fn write_string_value(&mut self, qname: QNameId, lexical: &str) -> Result<()> {
        let encoded = self
            .types
            .try_encode(&Datatype::string(), lexical)?
            .ok_or_else(|| Error::InvalidValue(lexical.to_owned()))?;
        self.write_encoded(qname, encoded)
    }

    fn maybe_flush(&mut self) -> Result<()> {
        if let (Some(block), Some(writer)) = (&mut self.block, &mut self.writer)
            && block.is_full(self.options.block_size())
        {
            let full = core::mem::take(block);
            writer.flush_block(full, &self.types, &mut self.tables)?;
        }
        Ok(())
    }

    // ---- Document events ---------------------------------------------

    pub fn start_document(&mut self) -> Result<()> {
        if self.started {
            return Err(Error::ordering_violation("SD exactly once", "second SD"));
        }
        let (code, next) = {
            let g = self.grammars.grammar(self.state)?;
            let (code, p) = g.find_event(Event::StartDocument).ok_or_else(|| {
                Error::invalid_event_code("SD", format!("{:?}", g.kind))
            })?;
            (code, p.next)
        };
        self.emit_first_level(code)?;
        self.state = next;
        self.started = true;
        Ok(())
    }

    pub fn end_document(&mut self) -> Result<()> {
        if let Some(inner) = self.sc_inner.as_mut() {
            return inner.end_document();
        }
        if !self.stack.is_empty() {
            return Err(Error::ordering_violation("EE", "ED with open elements"));
        }
        let code = {
            let g = self.grammars.grammar(self.state)?;
            g.find_event(Event::EndDocument)
                .ok_or_else(|| Error::invalid_event_code("ED", format!("{:?}", g.kind)))?
                .0
        };
        self.emit_first_level(code)?;
        // letzter Block, auch unterhalb der block_size (Spec 9.1)
        if let (Some(block), Some(writer)) = (&mut self.block, &mut self.writer) {
            let last = core::mem::take(block);
            writer.flush_block(last, &self.types, &mut self.tables)?;
        }
        self.finished = true;
        Ok(())
    }

    /// Schliesst den Strom ab; bit-packed wird auf die Byte-Grenze
    /// aufgefuellt.
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.finished {
            return Err(Error::ordering_violation("ED", "finish on open stream"));
        }
        match self.writer {
            Some(w) => Ok(w.finish()),
            None => Ok(self.channel.into_vec()),
        }
    }

    // ---- Element structure -------------------------------------------

    pub fn start_element(&mut self, uri: &str, local_name: &str, prefix: Option<&str>) -> Result<()> {
        if let Some(inner) = self.sc_inner.as_mut() {
            return inner.start_element(uri, local_name, prefix);
        }
        let sc = self.self_contained_applies(uri, local_name);
        self.encode_start_element(uri, local_name, prefix)?;
        if sc {
            self.begin_self_contained(uri, local_name, prefix)?;
        }
        Ok(())
    }

    fn known_qname(&self, uri: &str, local_name: &str) -> Result<Option<QNameId>> {
        match self.context.uri_id(uri) {
            Some(uri_id) => Ok(self
                .context
                .local_id(uri_id, local_name)?
                .map(|local_id| QNameId { uri_id, local_id })),
            None => Ok(None),
        }
    }

    fn encode_start_element(
        &mut self,
        uri: &str,
        local_name: &str,
        prefix: Option<&str>,
    ) -> Result<()> {
        if !self.started {
            return Err(Error::ordering_violation("SD", "SE"));
        }
        let known = self.known_qname(uri, local_name)?;
        let (plan, learning, kind) = {
            let g = self.grammars.grammar(self.state)?;
            let width = g.first_level_width(!g.second_level(&self.options).is_empty());
            let plan = if let Some(qid) = known
                && let Some((code, p)) = g.find_event(Event::StartElement(qid))
            {
                Plan::Declared { code, width, next: p.next, datatype: None }
            } else if let Some(qid) = known
                && let Some((code, p)) = g.find_event(Event::StartElementNs(qid.uri_id))
            {
                Plan::Ns { code, width, next: p.next, uri_id: qid.uri_id }
            } else if let Some((code, p)) = g.find_event(Event::StartElementGeneric) {
                Plan::Generic { code, width, next: p.next }
            } else {
                Plan::Undeclared
            };
            (plan, g.is_learning(), g.kind)
        };

        let (qid, continuation) = match plan {
            Plan::Declared { code, width, next, .. } => {
                self.emit(code, width);
                // deklariert wird nur mit bekanntem QName geplant
                let qid = known
                    .ok_or_else(|| Error::invalid_event_code("SE(qname)", "unknown qname"))?;
                self.encode_prefix_part(qid.uri_id, prefix)?;
                (qid, next)
            }
            Plan::Ns { code, width, next, uri_id } => {
                self.emit(code, width);
                let qid = self.encode_local(uri_id, local_name)?;
                self.encode_prefix_part(uri_id, prefix)?;
                (qid, next)
            }
            Plan::Generic { code, width, next } => {
                self.emit(code, width);
                let qid = self.encode_qname(uri, local_name)?;
                self.encode_prefix_part(qid.uri_id, prefix)?;
                if learning {
                    self.grammars.learn(self.state, Event::StartElement(qid), next)?;
                }
                (qid, next)
            }
            Plan::Undeclared => {
                self.emit_second_level(SecondLevel::StartElementGenericUndeclared)?;
                let qid = self.encode_qname(uri, local_name)?;
                self.encode_prefix_part(qid.uri_id, prefix)?;
                let continuation = match kind {
                    GrammarKind::StartTag => self.grammars.content_of(self.state),
                    GrammarKind::ElementContent => self.state,
                    _ => {
                        return Err(Error::invalid_event_code("SE", format!("{kind:?}")));
                    }
                };
                if learning {
                    self.grammars.learn(self.state, Event::StartElement(qid), continuation)?;
                }
                (qid, continuation)
            }
        };

        self.stack.push(StackEntry { qname: qid, continuation });
        self.state = self.element_grammar_for(qid);
        Ok(())
    }

    /// Die Grammatik des betretenen Elements: global deklariert wenn das
    /// Schema eine hat, sonst die gelernte built-in (Spec 8.4.3, 8.5.3).
    fn element_grammar_for(&mut self, qid: QNameId) -> GrammarId {
        match self.grammars.base().global_element(qid) {
            Some(g) => g,
            None => self.grammars.element_grammar(qid),
        }
    }

    pub fn end_element(&mut self) -> Result<()> {
        if self.sc_inner.is_some() {
            return self.end_element_in_fragment();
        }
        let found = {
            let g = self.grammars.grammar(self.state)?;
            g.find_event(Event::EndElement).map(|(code, _)| code)
        };
        match found {
            Some(code) => self.emit_first_level(code)?,
            None => {
                self.emit_second_level(SecondLevel::EndElementUndeclared)?;
                if self.grammars.grammar(self.state)?.is_learning() {
                    self.grammars.learn(self.state, Event::EndElement, self.state)?;
                }
            }
        }
        let entry = self
            .stack
            .pop()
            .ok_or_else(|| Error::ordering_violation("SE", "EE without open element"))?;
        self.state = entry.continuation;
        Ok(())
    }

    // ---- Attributes & characters -------------------------------------

    pub fn attribute(
        &mut self,
        uri: &str,
        local_name: &str,
        prefix: Option<&str>,
        value: &str,
    ) -> Result<()> {
        if let Some(inner) = self.sc_inner.as_mut() {
            return inner.attribute(uri, local_name, prefix, value);
        }
        let known = self.known_qname(uri, local_name)?;
        let (plan, learning, kind) = {
            let g = self.grammars.grammar(self.state)?;
            let width = g.first_level_width(!g.second_level(&self.options).is_empty());
            let plan = if let Some(qid) = known
                && let Some((code, p)) = g.find_event(Event::Attribute(qid))
            {
                Plan::Declared { code, width, next: p.next, datatype: p.datatype.clone() }
            } else if let Some(qid) = known
                && let Some((code, p)) = g.find_event(Event::AttributeNs(qid.uri_id))
            {
                Plan::Ns { code, width, next: p.next, uri_id: qid.uri_id }
            } else if let Some((code, p)) = g.find_event(Event::AttributeGeneric) {
                Plan::Generic { code, width, next: p.next }
            } else {
                Plan::Undeclared
            };
            (plan, g.is_learning(), g.kind)
        };

        match plan {
            Plan::Declared { code, width, next, datatype } => {
                let datatype = datatype.unwrap_or_else(Datatype::string);
                let qid = known
                    .ok_or_else(|| Error::invalid_event_code("AT(qname)", "unknown qname"))?;
                // Ungueltige lexikalische Form faellt auf den undeclared
                // Pfad zurueck (dort als String, Spec 8.5.4.4.2)
                match self.types.try_encode(&datatype, value)? {
                    Some(encoded) => {
                        self.emit(code, width);
                        self.encode_prefix_part(qid.uri_id, prefix)?;
                        self.write_encoded(qid, encoded)?;
                        self.state = next;
                    }
                    None => {
                        self.attribute_undeclared(uri, local_name, prefix, value, learning, kind)?;
                    }
                }
            }
            Plan::Ns { code, width, next, uri_id } => {
                self.emit(code, width);
                let qid = self.encode_local(uri_id, local_name)?;
                self.encode_prefix_part(uri_id, prefix)?;
                self.write_string_value(qid, value)?;
                self.state = next;
            }
            Plan::Generic { code, width, next } => {
                self.emit(code, width);
                let qid = self.encode_qname(uri, local_name)?;
                self.encode_prefix_part(qid.uri_id, prefix)?;
                self.write_string_value(qid, value)?;
                self.state = next;
            }
            Plan::Undeclared => {
                self.attribute_undeclared(uri, local_name, prefix, value, learning, kind)?;
            }
        }
        Ok(())
    }

    /// AT(*) im zweiten Level; der Wert ist hier immer ein String.
    fn attribute_undeclared(
        &mut self,
        uri: &str,
        local_name: &str,
        prefix: Option<&str>,
        value: &str,
        learning: bool,
        kind: GrammarKind,
    ) -> Result<()> {
        if !matches!(kind, GrammarKind::StartTag) {
            return Err(Error::ordering_violation("AT before content", "AT"));
        }
        self.emit_second_level(SecondLevel::AttributeGenericUndeclared)?;
        let qid = self.encode_qname(uri, local_name)?;
        self.encode_prefix_part(qid.uri_id, prefix)?;
        // AT(qname) -> StartTagContent, die Grammatik bleibt
        if learning {
            self.grammars.learn(self.state, Event::Attribute(qid), self.state)?;
        }
        self.write_string_value(qid, value)
    }

    pub fn characters(&mut self, value: &str) -> Result<()> {
        if let Some(inner) = self.sc_inner.as_mut() {
            return inner.characters(value);
        }
        let element = self
            .stack
            .last()
            .ok_or_else(|| Error::ordering_violation("SE", "CH at document level"))?
            .qname;
        let (declared, learning, kind) = {
            let g = self.grammars.grammar(self.state)?;
            let width = g.first_level_width(!g.second_level(&self.options).is_empty());
            (
                g.find_event(Event::Characters)
                    .map(|(code, p)| (code, width, p.next, p.datatype.clone())),
                g.is_learning(),
                g.kind,
            )
        };

        if let Some((code, width, next, datatype)) = declared {
            let datatype = datatype.unwrap_or_else(Datatype::string);
            if let Some(encoded) = self.types.try_encode(&datatype, value)? {
                self.emit(code, width);
                self.write_encoded(element, encoded)?;
                self.state = next;
                return Ok(());
            }
        }

        self.emit_second_level(SecondLevel::CharactersGenericUndeclared)?;
        let continuation = match kind {
            GrammarKind::StartTag => self.grammars.content_of(self.state),
            GrammarKind::ElementContent => self.state,
            _ => return Err(Error::invalid_event_code("CH", format!("{kind:?}"))),
        };
        if learning {
            self.grammars.learn(self.state, Event::Characters, continuation)?;
        }
        self.write_string_value(element, value)?;
        self.state = continuation;
        Ok(())
    }

    // ---- Fidelity events ---------------------------------------------

    /// NS-Event (Spec 7.3.3); ohne Preserve.prefixes stillschweigend
    /// verworfen.
    pub fn namespace_declaration(
        &mut self,
        uri: &str,
        prefix: &str,
        local_element_ns: bool,
    ) -> Result<()> {
        if let Some(inner) = self.sc_inner.as_mut() {
            return inner.namespace_declaration(uri, prefix, local_element_ns);
        }
        if !self.options.fidelity().prefixes {
            return Ok(());
        }
        self.emit_second_level(SecondLevel::NamespaceDeclaration)?;
        let ch = match &mut self.block {
            Some(b) => b.structure(),
            None => &mut self.channel,
        };
        let uri_id = self.context.encode_uri(ch, uri)?;
        self.context.encode_prefix(ch, uri_id, prefix)?;
        boolean::encode(
            match &mut self.block {
                Some(b) => b.structure(),
                None => &mut self.channel,
            },
            local_element_ns,
        );
        Ok(())
    }

    pub fn comment(&mut self, text: &str) -> Result<()> {
        if let Some(inner) = self.sc_inner.as_mut() {
            return inner.comment(text);
        }
        if !self.options.fidelity().comments {
            return Ok(());
        }
        self.emit_second_level(SecondLevel::Comment)?;
        self.emit_string(text);
        self.leave_start_tag();
        Ok(())
    }

    pub fn processing_instruction(&mut self, name: &str, text: &str) -> Result<()> {
        if let Some(inner) = self.sc_inner.as_mut() {
            return inner.processing_instruction(name, text);
        }
        if !self.options.fidelity().pis {
            return Ok(());
        }
        self.emit_second_level(SecondLevel::ProcessingInstruction)?;
        self.emit_string(name);
        self.emit_string(text);
        self.leave_start_tag();
        Ok(())
    }

    pub fn doctype(&mut self, name: &str, public: &str, system: &str, text: &str) -> Result<()> {
        if let Some(inner) = self.sc_inner.as_mut() {
            return inner.doctype(name, public, system, text);
        }
        if !self.options.fidelity().dtd {
            return Ok(());
        }
        self.emit_second_level(SecondLevel::DocType)?;
        self.emit_string(name);
        self.emit_string(public);
        self.emit_string(system);
        self.emit_string(text);
        Ok(())
    }

    pub fn entity_reference(&mut self, name: &str) -> Result<()> {
        if let Some(inner) = self.sc_inner.as_mut() {
            return inner.entity_reference(name);
        }
        if !self.options.fidelity().dtd {
            return Ok(());
        }
        self.emit_second_level(SecondLevel::EntityReference)?;
        self.emit_string(name);
        self.leave_start_tag();
        Ok(())
    }

    /// CM/PI/ER beenden den Start-Tag (Spec 8.4.3: -> ElementContent).
    fn leave_start_tag(&mut self) {
        if let Ok(GrammarKind::StartTag) = self.grammar_kind() {
            self.state = self.grammars.content_of(self.state);
        }
    }

    // ---- Self-contained fragments (Spec 8.4.3 SC) --------------------

    fn self_contained_applies(&mut self, uri: &str, local_name: &str) -> bool {
        if self.suppress_sc_once {
            self.suppress_sc_once = false;
            return false;
        }
        self.options.fidelity().self_contained
            && !self.options.coding_mode().channelized()
            && self.options.is_self_contained_element(uri, local_name)
    }

    fn begin_self_contained(
        &mut self,
        uri: &str,
        local_name: &str,
        prefix: Option<&str>,
    ) -> Result<()> {
        // SC-Code aus der StartTag-Grammatik des gerade betretenen
        // Elements, dann Byte-Grenze
        self.emit_second_level(SecondLevel::SelfContained)?;
        self.channel.align();
        let offset = self.channel.byte_len();
        if let Some(h) = self.sc_handler.as_mut() {
            h.self_contained(uri, local_name, offset);
        }
        log::debug!("self-contained fragment {{{uri}}}{local_name} at byte {offset}");

        // Fragment-Coder: frische Tabellen, frische gelernte Grammatiken
        let mut inner =
            BodyEncoder::new(self.options.clone().with_fragment(), self.grammars.base().clone())?;
        inner.suppress_sc_once = true;
        inner.start_document()?;
        inner.start_element(uri, local_name, prefix)?;
        self.sc_inner = Some(Box::new(inner));
        Ok(())
    }

    fn end_element_in_fragment(&mut self) -> Result<()> {
        if let Some(inner) = self.sc_inner.as_mut() {
            inner.end_element()?;
            if inner.depth() > 0 {
                return Ok(());
            }
        }
        // Das SC-Element selbst ist zu: Fragment mit ED abschliessen und
        // als rohe Bytes anhaengen; der aeussere Strom traegt kein EE.
        if let Some(mut inner) = self.sc_inner.take() {
            inner.end_document()?;
            let bytes = inner.finish()?;
            self.channel.encode_octets(&bytes);
            let entry = self
                .stack
                .pop()
                .ok_or_else(|| Error::ordering_violation("SE", "EE without open element"))?;
            self.state = entry.continuation;
        }
        Ok(())
    }
}

impl core::fmt::Debug for BodyEncoder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BodyEncoder")
            .field("state", &self.state)
            .field("depth", &self.stack.len())
            .field("started", &self.started)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
