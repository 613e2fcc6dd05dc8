//! EXI body decoder (Spec 6, 8, 9).
//!
//! Pull-API: `next_event` liefert die Events des Bodys in
//! Dokumentreihenfolge als [`ExiEvent`]. Der Decoder laeuft dieselben
//! Grammatiken wie der Encoder und lernt synchron mit ihm, dadurch
//! stimmen Event-Code-Breiten und Tabellen auf beiden Seiten ueberein.
//!
//! In den channelized Modi wird blockweise decodiert (Spec 9.1): erst
//! der Structure Channel, der fuer jeden AT/CH-Wert nur einen Slot
//! hinterlaesst, dann die Value Channels in der Reihenfolge ihres
//! ersten Auftretens. Die fertig gefuellten Events werden gepuffert
//! und in Dokumentreihenfolge ausgeliefert.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::block::{BlockReader, MAX_COMBINED_VALUES};
use crate::channel::DecoderChannel;
use crate::context::{CoderContext, QNameId};
use crate::datatype::Datatype;
use crate::dtr::DtrResolver;
use crate::event::{
    AtContent, ChContent, CmContent, DtContent, ErContent, Event, ExiEvent, NsContent, PiContent,
};
use crate::grammar::{CoderGrammars, GrammarId, GrammarKind, Grammars, SecondLevel, third_level};
use crate::options::ExiOptions;
use crate::string_table::ValueTable;
use crate::typed_coder::TypeDecoder;
use crate::value::Value;
use crate::{Error, FastIndexMap, Result, bit_width, boolean, n_bit_unsigned_integer, string};

/// Offene Elemente, spiegelbildlich zum Encoder.
#[derive(Debug, Clone, Copy)]
struct StackEntry {
    qname: QNameId,
    continuation: GrammarId,
}

/// Wert-Slots eines Blocks: pro QName die Event-Indizes und Datentypen
/// in Dokumentreihenfolge, die Map selbst in Erstauftritts-Reihenfolge.
type Slots = FastIndexMap<QNameId, Vec<(usize, Datatype)>>;

pub struct BodyDecoder {
    options: ExiOptions,
    grammars: CoderGrammars,
    context: CoderContext,
    tables: ValueTable,
    types: TypeDecoder,
    channel: DecoderChannel,
    /// Nur im Compression-Modus belegt.
    reader: Option<BlockReader>,
    channelized: bool,
    state: GrammarId,
    stack: Vec<StackEntry>,
    started: bool,
    finished: bool,
    /// Replay-Puffer der channelized Modi.
    pending: VecDeque<ExiEvent>,
    /// Aktives SC-Fragment.
    sc_inner: Option<Box<BodyDecoder>>,
}

impl BodyDecoder {
    pub fn new(options: ExiOptions, grammars: Grammars, data: &[u8]) -> Result<Self> {
        options.validate()?;
        let dtr = DtrResolver::new(&options, grammars.context())?;
        let types = TypeDecoder::new(options.fidelity().lexical_values, dtr);
        let tables = ValueTable::new(&options);
        let context = CoderContext::new(grammars.context().clone());
        let state = if options.fragment() { grammars.fragment() } else { grammars.document() };
        let channelized = options.coding_mode().channelized();
        let deflate = options.coding_mode().deflate();
        // Compression: die Streams liegen hinter DEFLATE-Grenzen, der
        // Kanal wird pro Stream neu belegt. Sonst ist der Body ein
        // fortlaufender Strom.
        let (channel, reader) = if deflate {
            (DecoderChannel::new(Vec::new(), true), Some(BlockReader::new(data.to_vec())))
        } else {
            (DecoderChannel::new(data.to_vec(), options.coding_mode().byte_aligned()), None)
        };
        Ok(Self {
            options,
            grammars: CoderGrammars::new(grammars),
            context,
            tables,
            types,
            channel,
            reader,
            channelized,
            state,
            stack: Vec::new(),
            started: false,
            finished: false,
            pending: VecDeque::new(),
            sc_inner: None,
        })
    }

    /// Das naechste Event, `None` nach ED.
    pub fn next_event(&mut self) -> Result<Option<ExiEvent>> {
        if self.sc_inner.is_some() {
            return self.next_from_fragment();
        }
        if let Some(ev) = self.pending.pop_front() {
            return Ok(Some(ev));
        }
        if self.finished {
            return Ok(None);
        }
        if self.channelized {
            self.decode_block()?;
            return Ok(self.pending.pop_front());
        }
        self.decode_event(None).map(Some)
    }

    // ---- Channelized blocks (Spec 9) ---------------------------------

    fn next_stream_into_channel(&mut self) -> Result<()> {
        if let Some(reader) = &mut self.reader {
            let stream = reader.next_stream()?;
            self.channel = DecoderChannel::new(stream, true);
        }
        Ok(())
    }

    /// Decodiert einen ganzen Block in den Replay-Puffer (Spec 9.1-9.3).
    fn decode_block(&mut self) -> Result<()> {
        self.next_stream_into_channel()?;
        let block_size = self.options.block_size() as usize;
        let mut events: Vec<ExiEvent> = Vec::new();
        let mut slots = Slots::default();

        // Structure-Pass: Werte hinterlassen nur Slots
        loop {
            let idx = events.len();
            let ev = self.decode_event(Some((&mut slots, idx)))?;
            let is_end = matches!(ev, ExiEvent::EndDocument);
            events.push(ev);
            if is_end {
                break;
            }
            let count: usize = slots.values().map(Vec::len).sum();
            if count >= block_size {
                break;
            }
        }
        let count: usize = slots.values().map(Vec::len).sum();

        // Value-Pass in Channel-Reihenfolge (Spec 9.2.2, 9.3). Bei <= 100
        // Werten folgen die Channels im selben Stream wie die Struktur.
        // Ueber 100 gilt die Buendelung kleine-Channels-zuerst in beiden
        // channelized Modi; Pre-Compression legt die Streams nur
        // fortlaufend ab statt hinter DEFLATE-Grenzen.
        if count > MAX_COMBINED_VALUES {
            if slots.values().any(|s| s.len() <= MAX_COMBINED_VALUES) {
                self.next_stream_into_channel()?;
                for i in 0..slots.len() {
                    let (qname, slot) = slot_at(&slots, i)?;
                    if slot.len() <= MAX_COMBINED_VALUES {
                        self.read_channel_values(qname, &slot, &mut events)?;
                    }
                }
            }
            for i in 0..slots.len() {
                let (qname, slot) = slot_at(&slots, i)?;
                if slot.len() > MAX_COMBINED_VALUES {
                    self.next_stream_into_channel()?;
                    self.read_channel_values(qname, &slot, &mut events)?;
                }
            }
        } else {
            for i in 0..slots.len() {
                let (qname, slot) = slot_at(&slots, i)?;
                self.read_channel_values(qname, &slot, &mut events)?;
            }
        }

        log::debug!("block decoded: {} events, {count} values", events.len());
        self.pending.extend(events);
        Ok(())
    }

    fn read_channel_values(
        &mut self,
        qname: QNameId,
        slot: &[(usize, Datatype)],
        events: &mut [ExiEvent],
    ) -> Result<()> {
        for (idx, datatype) in slot {
            let value = self.types.read(datatype, qname, &mut self.channel, &mut self.tables)?;
            match events.get_mut(*idx) {
                Some(ExiEvent::Attribute(at)) => at.value = value,
                Some(ExiEvent::Characters(ch)) => ch.value = value,
                _ => {
                    return Err(Error::invalid_event_code("AT/CH value slot", "structure"));
                }
            }
        }
        Ok(())
    }

    // ---- Event decoding ----------------------------------------------

    fn decode_event(&mut self, deferred: Option<(&mut Slots, usize)>) -> Result<ExiEvent> {
        let (len, width, second, kind, learning) = {
            let g = self.grammars.grammar(self.state)?;
            let second = g.second_level(&self.options);
            (
                g.len() as u64,
                g.first_level_width(!second.is_empty()),
                second,
                g.kind,
                g.is_learning(),
            )
        };
        let code = n_bit_unsigned_integer::decode(&mut self.channel, width)?;
        if code < len {
            let (event, next, datatype) = {
                let g = self.grammars.grammar(self.state)?;
                let p = g.production_by_code(code).ok_or_else(|| {
                    Error::invalid_event_code(format!("code {code}"), format!("{kind:?}"))
                })?;
                (p.event, p.next, p.datatype.clone())
            };
            return self.apply_declared(event, next, datatype, learning, deferred);
        }

        if second.is_empty() {
            return Err(Error::invalid_event_code(format!("code {code}"), format!("{kind:?}")));
        }
        let second_width = bit_width::coding_length(second.len());
        let index = n_bit_unsigned_integer::decode(&mut self.channel, second_width)? as usize;
        let mut target = *second.get(index).ok_or_else(|| {
            Error::invalid_event_code(format!("2nd level {index}"), format!("{kind:?}"))
        })?;
        if target == SecondLevel::CommentPiEscape {
            let third = third_level(self.options.fidelity());
            let third_width = bit_width::coding_length(third.len());
            let t = n_bit_unsigned_integer::decode(&mut self.channel, third_width)? as usize;
            target = *third.get(t).ok_or_else(|| {
                Error::invalid_event_code(format!("3rd level {t}"), format!("{kind:?}"))
            })?;
        }
        self.apply_undeclared(target, kind, learning, deferred)
    }

    fn apply_declared(
        &mut self,
        event: Event,
        next: GrammarId,
        datatype: Option<Datatype>,
        learning: bool,
        deferred: Option<(&mut Slots, usize)>,
    ) -> Result<ExiEvent> {
        match event {
            Event::StartDocument => {
                self.started = true;
                self.state = next;
                Ok(ExiEvent::StartDocument)
            }
            Event::EndDocument => {
                self.finished = true;
                Ok(ExiEvent::EndDocument)
            }
            Event::StartElement(qid) => {
                let prefix = self.decode_prefix_part(qid.uri_id)?;
                self.enter_element(qid, next);
                Ok(ExiEvent::StartElement(Rc::new(self.context.resolve(qid, prefix)?)))
            }
            Event::StartElementNs(uri_id) => {
                let qid = self.context.decode_local_name(&mut self.channel, uri_id)?;
                let prefix = self.decode_prefix_part(uri_id)?;
                self.enter_element(qid, next);
                Ok(ExiEvent::StartElement(Rc::new(self.context.resolve(qid, prefix)?)))
            }
            Event::StartElementGeneric => {
                let qid = self.decode_qname()?;
                let prefix = self.decode_prefix_part(qid.uri_id)?;
                if learning {
                    self.grammars.learn(self.state, Event::StartElement(qid), next)?;
                }
                self.enter_element(qid, next);
                Ok(ExiEvent::StartElement(Rc::new(self.context.resolve(qid, prefix)?)))
            }
            Event::EndElement => self.leave_element(),
            Event::Attribute(qid) => {
                let prefix = self.decode_prefix_part(qid.uri_id)?;
                let datatype = datatype.unwrap_or_else(Datatype::string);
                let value = self.read_value(qid, &datatype, deferred)?;
                self.state = next;
                Ok(ExiEvent::Attribute(AtContent {
                    qname: Rc::new(self.context.resolve(qid, prefix)?),
                    value,
                }))
            }
            Event::AttributeNs(uri_id) => {
                let qid = self.context.decode_local_name(&mut self.channel, uri_id)?;
                let prefix = self.decode_prefix_part(uri_id)?;
                let value = self.read_value(qid, &Datatype::string(), deferred)?;
                self.state = next;
                Ok(ExiEvent::Attribute(AtContent {
                    qname: Rc::new(self.context.resolve(qid, prefix)?),
                    value,
                }))
            }
            Event::AttributeGeneric => {
                let qid = self.decode_qname()?;
                let prefix = self.decode_prefix_part(qid.uri_id)?;
                let value = self.read_value(qid, &Datatype::string(), deferred)?;
                self.state = next;
                Ok(ExiEvent::Attribute(AtContent {
                    qname: Rc::new(self.context.resolve(qid, prefix)?),
                    value,
                }))
            }
            Event::Characters => {
                let element = self.enclosing_element()?;
                let datatype = datatype.unwrap_or_else(Datatype::string);
                let value = self.read_value(element, &datatype, deferred)?;
                self.state = next;
                Ok(ExiEvent::Characters(ChContent { value }))
            }
            other => Err(Error::invalid_event_code(other.label(), "first level")),
        }
    }

    fn apply_undeclared(
        &mut self,
        target: SecondLevel,
        kind: GrammarKind,
        learning: bool,
        deferred: Option<(&mut Slots, usize)>,
    ) -> Result<ExiEvent> {
        match target {
            SecondLevel::EndElementUndeclared => {
                if learning {
                    self.grammars.learn(self.state, Event::EndElement, self.state)?;
                }
                self.leave_element()
            }
            SecondLevel::AttributeGenericUndeclared => {
                let qid = self.decode_qname()?;
                let prefix = self.decode_prefix_part(qid.uri_id)?;
                if learning {
                    self.grammars.learn(self.state, Event::Attribute(qid), self.state)?;
                }
                let value = self.read_value(qid, &Datatype::string(), deferred)?;
                Ok(ExiEvent::Attribute(AtContent {
                    qname: Rc::new(self.context.resolve(qid, prefix)?),
                    value,
                }))
            }
            SecondLevel::StartElementGenericUndeclared => {
                let qid = self.decode_qname()?;
                let prefix = self.decode_prefix_part(qid.uri_id)?;
                let continuation = self.content_continuation(kind, "SE")?;
                if learning {
                    self.grammars.learn(self.state, Event::StartElement(qid), continuation)?;
                }
                self.enter_element(qid, continuation);
                Ok(ExiEvent::StartElement(Rc::new(self.context.resolve(qid, prefix)?)))
            }
            SecondLevel::CharactersGenericUndeclared => {
                let element = self.enclosing_element()?;
                let continuation = self.content_continuation(kind, "CH")?;
                if learning {
                    self.grammars.learn(self.state, Event::Characters, continuation)?;
                }
                let value = self.read_value(element, &Datatype::string(), deferred)?;
                self.state = continuation;
                Ok(ExiEvent::Characters(ChContent { value }))
            }
            SecondLevel::NamespaceDeclaration => {
                let uri_id = self.context.decode_uri(&mut self.channel)?;
                let prefix_id = self.context.decode_prefix(&mut self.channel, uri_id)?;
                let local_element_ns = boolean::decode(&mut self.channel)?;
                Ok(ExiEvent::NamespaceDeclaration(NsContent {
                    uri: self.context.uri(uri_id)?,
                    prefix: self.context.prefix(uri_id, prefix_id)?,
                    local_element_ns,
                }))
            }
            SecondLevel::SelfContained => self.begin_self_contained(),
            SecondLevel::EntityReference => {
                let name = string::decode(&mut self.channel)?;
                self.leave_start_tag();
                Ok(ExiEvent::EntityReference(ErContent { name: name.into() }))
            }
            SecondLevel::DocType => {
                let name = string::decode(&mut self.channel)?;
                let public = string::decode(&mut self.channel)?;
                let system = string::decode(&mut self.channel)?;
                let text = string::decode(&mut self.channel)?;
                Ok(ExiEvent::DocType(DtContent {
                    name: name.into(),
                    public: public.into(),
                    system: system.into(),
                    text: text.into(),
                }))
            }
            SecondLevel::Comment => {
                let text = string::decode(&mut self.channel)?;
                self.leave_start_tag();
                Ok(ExiEvent::Comment(CmContent { text: text.into() }))
            }
            SecondLevel::ProcessingInstruction => {
                let name = string::decode(&mut self.channel)?;
                let text = string::decode(&mut self.channel)?;
                self.leave_start_tag();
                Ok(ExiEvent::ProcessingInstruction(PiContent {
                    name: name.into(),
                    text: text.into(),
                }))
            }
            SecondLevel::CommentPiEscape => {
                Err(Error::invalid_event_code("CM/PI escape", "resolved level"))
            }
        }
    }

    // ---- Shared transitions ------------------------------------------

    fn enter_element(&mut self, qid: QNameId, continuation: GrammarId) {
        self.stack.push(StackEntry { qname: qid, continuation });
        self.state = match self.grammars.base().global_element(qid) {
            Some(g) => g,
            None => self.grammars.element_grammar(qid),
        };
    }

    fn leave_element(&mut self) -> Result<ExiEvent> {
        let entry = self
            .stack
            .pop()
            .ok_or_else(|| Error::ordering_violation("SE", "EE without open element"))?;
        self.state = entry.continuation;
        Ok(ExiEvent::EndElement)
    }

    fn enclosing_element(&self) -> Result<QNameId> {
        Ok(self
            .stack
            .last()
            .ok_or_else(|| Error::ordering_violation("SE", "CH at document level"))?
            .qname)
    }

    fn content_continuation(&self, kind: GrammarKind, label: &'static str) -> Result<GrammarId> {
        match kind {
            GrammarKind::StartTag => Ok(self.grammars.content_of(self.state)),
            GrammarKind::ElementContent => Ok(self.state),
            _ => Err(Error::invalid_event_code(label, format!("{kind:?}"))),
        }
    }

    fn leave_start_tag(&mut self) {
        if let Ok(g) = self.grammars.grammar(self.state)
            && g.kind == GrammarKind::StartTag
        {
            self.state = self.grammars.content_of(self.state);
        }
    }

    fn decode_qname(&mut self) -> Result<QNameId> {
        let uri_id = self.context.decode_uri(&mut self.channel)?;
        self.context.decode_local_name(&mut self.channel, uri_id)
    }

    fn decode_prefix_part(&mut self, uri_id: u16) -> Result<Option<Rc<str>>> {
        if !self.options.fidelity().prefixes {
            return Ok(None);
        }
        let prefix_id = self.context.decode_prefix(&mut self.channel, uri_id)?;
        Ok(Some(self.context.prefix(uri_id, prefix_id)?))
    }

    /// Direkt gelesen oder als Slot fuer den Value-Pass hinterlassen.
    fn read_value(
        &mut self,
        qname: QNameId,
        datatype: &Datatype,
        deferred: Option<(&mut Slots, usize)>,
    ) -> Result<Value> {
        match deferred {
            Some((slots, idx)) => {
                slots.entry(qname).or_default().push((idx, datatype.clone()));
                Ok(Value::string(""))
            }
            None => self.types.read(datatype, qname, &mut self.channel, &mut self.tables),
        }
    }

    // ---- Self-contained fragments (Spec 8.4.3 SC) --------------------

    /// SC-Code gelesen: ab der naechsten Byte-Grenze liegt ein
    /// eigenstaendiges Fragment mit frischen Tabellen.
    fn begin_self_contained(&mut self) -> Result<ExiEvent> {
        if self.channelized {
            return Err(Error::invalid_event_code("SC", "channelized stream"));
        }
        self.channel.align();
        let rest = core::mem::replace(&mut self.channel, DecoderChannel::new(Vec::new(), true))
            .into_remaining();
        let mut inner = BodyDecoder::new(
            self.options.clone().with_fragment(),
            self.grammars.base().clone(),
            &rest,
        )?;
        // SD und das SE des SC-Elements sind im aeusseren Strom schon
        // aufgetaucht
        match inner.next_event()? {
            Some(ExiEvent::StartDocument) => {}
            other => {
                return Err(Error::ordering_violation("SD", format!("{other:?}")));
            }
        }
        match inner.next_event()? {
            Some(ExiEvent::StartElement(_)) => {}
            other => {
                return Err(Error::ordering_violation("SE", format!("{other:?}")));
            }
        }
        self.sc_inner = Some(Box::new(inner));
        Ok(ExiEvent::SelfContained)
    }

    fn next_from_fragment(&mut self) -> Result<Option<ExiEvent>> {
        let ev = match self.sc_inner.as_mut() {
            Some(inner) => inner.next_event()?,
            None => None,
        };
        match ev {
            Some(ExiEvent::EndDocument) | None => {
                // Fragment fertig: Restbytes zurueck in den aeusseren
                // Kanal, das SC-Element ohne eigenes aeusseres EE zu
                if let Some(inner) = self.sc_inner.take() {
                    let mut ch = inner.channel;
                    ch.align();
                    let rest = ch.into_remaining();
                    self.channel =
                        DecoderChannel::new(rest, self.options.coding_mode().byte_aligned());
                    let entry = self.stack.pop().ok_or_else(|| {
                        Error::ordering_violation("SE", "fragment end without open element")
                    })?;
                    self.state = entry.continuation;
                }
                self.next_event()
            }
            Some(ev) => Ok(Some(ev)),
        }
    }
}

impl core::fmt::Debug for BodyDecoder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BodyDecoder")
            .field("state", &self.state)
            .field("depth", &self.stack.len())
            .field("started", &self.started)
            .field("finished", &self.finished)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

/// Slot-Zugriff per Index; die Map gehoert dem Aufrufer, geliehen wird
/// nur kurz.
fn slot_at(slots: &Slots, i: usize) -> Result<(QNameId, Vec<(usize, Datatype)>)> {
    slots
        .get_index(i)
        .map(|(q, s)| (*q, s.clone()))
        .ok_or_else(|| Error::invalid_event_code("value channel", "missing slot"))
}
