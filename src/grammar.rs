//! EXI grammars (Spec 8.1 - 8.5).
//!
//! Grammatiken leben in einer Arena und referenzieren sich ueber
//! [`GrammarId`]-Indizes (zyklische rechte Seiten sind damit einfache
//! Zahlen). Zwei Welten teilen sich die Struktur:
//!
//! - **Built-in** Grammatiken (Spec 8.4) lernen: neue Produktionen werden
//!   logisch vorangestellt, intern haengen sie in Append-Reihenfolge und
//!   der oeffentliche Event-Code von Index i ist `n - 1 - i`.
//! - **Schema-informierte** Grammatiken (Spec 8.5) werden ueber den
//!   [`SchemaInformedGrammarBuilder`] gebaut, beim Freeze sortiert und
//!   sind danach unveraenderlich.
//!
//! Die Zweit- und Drittlevel-Escape-Mengen (Spec 8.4.3, 8.5.4.4) haengen
//! von Grammatik-Art und Fidelity ab und werden hier berechnet, damit
//! Encoder und Decoder identisch zaehlen.

use std::rc::Rc;

use crate::context::{GrammarContext, QNameId};
use crate::datatype::Datatype;
use crate::event::Event;
use crate::options::{ExiOptions, Fidelity};
use crate::{Error, FastHashMap, Result, bit_width};

/// Index handle into a grammar arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GrammarId(pub(crate) usize);

/// A production: event plus right-hand side (Spec 8.1).
///
/// Schema-informierte AT/CH-Produktionen tragen den Datentyp des Werts
/// (Spec 7.1, Table 7-1).
#[derive(Debug, Clone, PartialEq)]
pub struct Production {
    pub event: Event,
    pub next: GrammarId,
    pub datatype: Option<Datatype>,
}

impl Production {
    pub fn new(event: Event, next: GrammarId) -> Self {
        Self { event, next, datatype: None }
    }

    pub fn typed(event: Event, next: GrammarId, datatype: Datatype) -> Self {
        Self { event, next, datatype: Some(datatype) }
    }
}

/// Welche Rolle eine Grammatik spielt; bestimmt die Escape-Mengen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarKind {
    /// Vor SD (Spec 8.4.1 / 8.5.4.1).
    Document,
    /// Zwischen SD und dem Wurzelelement.
    DocContent,
    /// Nach dem Wurzelelement.
    DocEnd,
    /// Vor SD im Fragment-Modus (Spec 8.4.2).
    Fragment,
    /// Fragment-Inhalt: beliebig viele Wurzelelemente.
    FragmentContent,
    /// Elementanfang: Attribute noch erlaubt (Spec 8.4.3 StartTagContent).
    StartTag,
    /// Elementinhalt nach dem ersten Kind/Text.
    ElementContent,
}

/// Second-level (and third-level) escape events (Spec 8.4.3, 8.5.4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondLevel {
    EndElementUndeclared,
    AttributeGenericUndeclared,
    NamespaceDeclaration,
    SelfContained,
    StartElementGenericUndeclared,
    CharactersGenericUndeclared,
    EntityReference,
    DocType,
    Comment,
    ProcessingInstruction,
    /// Escape in den dritten Level (CM/PI).
    CommentPiEscape,
}

/// Drittlevel-Menge: CM und/oder PI je nach Fidelity (Spec 8.4.3).
pub fn third_level(fidelity: &Fidelity) -> Vec<SecondLevel> {
    let mut level = Vec::with_capacity(2);
    if fidelity.comments {
        level.push(SecondLevel::Comment);
    }
    if fidelity.pis {
        level.push(SecondLevel::ProcessingInstruction);
    }
    level
}

/// One grammar: productions plus the values precomputed for event-code
/// coding (Spec 6.2).
#[derive(Debug, Clone)]
pub struct Grammar {
    pub kind: GrammarKind,
    /// Built-in Grammatiken lernen; ihre Codes laufen rueckwaerts.
    learning: bool,
    frozen: bool,
    productions: Vec<Production>,
    code_length_a: u8,
    code_length_b: u8,
    least_attribute_code: usize,
    attribute_count: usize,
    has_end_element: bool,
}

impl Grammar {
    /// Built-in Grammatik; `seed` in oeffentlicher Code-Reihenfolge
    /// (intern gespiegelt, damit Lernen vorne anfuegt).
    pub fn new_learning(kind: GrammarKind, seed: Vec<Production>) -> Self {
        let mut g = Self {
            kind,
            learning: true,
            frozen: false,
            productions: seed.into_iter().rev().collect(),
            code_length_a: 0,
            code_length_b: 0,
            least_attribute_code: 0,
            attribute_count: 0,
            has_end_element: false,
        };
        g.recompute();
        g
    }

    /// Leere schema-informierte Grammatik; Produktionen kommen ueber den
    /// Builder, Codes gelten erst nach [`Self::freeze`].
    pub fn new_schema(kind: GrammarKind) -> Self {
        Self {
            kind,
            learning: false,
            frozen: false,
            productions: Vec::new(),
            code_length_a: 0,
            code_length_b: 0,
            least_attribute_code: 0,
            attribute_count: 0,
            has_end_element: false,
        }
    }

    pub fn len(&self) -> usize {
        self.productions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Built-in Grammatiken lernen; schema-informierte nie (Spec 8.4.3).
    pub fn is_learning(&self) -> bool {
        self.learning
    }

    pub fn has_end_element(&self) -> bool {
        self.has_end_element
    }

    /// codingLength(n) (Spec 6.2, kein Escape-Level).
    pub fn code_length_a(&self) -> u8 {
        self.code_length_a
    }

    /// codingLength(n+1) (Spec 6.2, mit Escape in den zweiten Level).
    pub fn code_length_b(&self) -> u8 {
        self.code_length_b
    }

    /// Kleinster First-Level-Code einer AT-Produktion; `len()` wenn keine.
    pub fn least_attribute_code(&self) -> usize {
        self.least_attribute_code
    }

    /// Anzahl deklarierter AT(qname)-Produktionen.
    pub fn attribute_count(&self) -> usize {
        self.attribute_count
    }

    fn recompute(&mut self) {
        let n = self.productions.len();
        self.code_length_a = bit_width::coding_length(n);
        self.code_length_b = bit_width::coding_length(n + 1);
        self.has_end_element =
            self.productions.iter().any(|p| p.event == Event::EndElement);
        self.attribute_count = self
            .productions
            .iter()
            .filter(|p| matches!(p.event, Event::Attribute(_)))
            .count();
        self.least_attribute_code = (0..n)
            .find(|&code| {
                self.production_by_code(code as u64)
                    .is_some_and(|p| p.event.is_attribute())
            })
            .unwrap_or(n);
    }

    fn internal_index(&self, code: u64) -> usize {
        if self.learning {
            self.productions.len() - 1 - code as usize
        } else {
            code as usize
        }
    }

    /// Produktion zum oeffentlichen First-Level-Code.
    pub fn production_by_code(&self, code: u64) -> Option<&Production> {
        if (code as usize) < self.productions.len() {
            Some(&self.productions[self.internal_index(code)])
        } else {
            None
        }
    }

    /// Oeffentlicher Code + Produktion zu einem Event (exakter Match).
    pub fn find_event(&self, event: Event) -> Option<(u64, &Production)> {
        let i = self.productions.iter().position(|p| p.event == event)?;
        let code = if self.learning {
            self.productions.len() - 1 - i
        } else {
            i
        } as u64;
        Some((code, &self.productions[i]))
    }

    /// Schema-Builder-Pfad (Spec 8.5.4.4.1): Duplikate von EE, AT(*) und
    /// SE(*) mit gleicher rechter Seite sind ein No-op; dasselbe Event
    /// mit anderer rechter Seite ist ein Konflikt.
    pub fn add_production(&mut self, production: Production) -> Result<()> {
        if self.frozen {
            return Err(Error::FrozenGrammarModified);
        }
        if let Some(existing) = self.productions.iter().find(|p| p.event == production.event) {
            let mergeable = matches!(
                production.event,
                Event::EndElement | Event::AttributeGeneric | Event::StartElementGeneric
            );
            if mergeable && existing.next == production.next {
                return Ok(());
            }
            return Err(Error::conflicting_production(production.event.label()));
        }
        self.productions.push(production);
        Ok(())
    }

    /// Built-in-Lernen (Spec 8.4.3): logisch vorangestellt; ein bereits
    /// bekanntes Event ist ein No-op.
    pub fn learn(&mut self, event: Event, next: GrammarId) -> Result<()> {
        if self.frozen || !self.learning {
            return Err(Error::FrozenGrammarModified);
        }
        if self.productions.iter().any(|p| p.event == event) {
            return Ok(());
        }
        log::trace!("grammar learns {} (n={})", event.label(), self.len() + 1);
        self.productions.push(Production::new(event, next));
        self.recompute();
        Ok(())
    }

    /// Sortiert (Spec 8.5.4.4.1) und friert ein. Die Gesamtordnung:
    /// Event-Ordinal zuerst; AT(qname) nach lokalem Namen, dann URI;
    /// AT(uri:*) nach URI; SE behaelt Schema-Reihenfolge.
    pub fn freeze(&mut self, context: &GrammarContext) -> Result<()> {
        if self.frozen {
            return Err(Error::FrozenGrammarModified);
        }
        let sort_name = |id: &QNameId| -> (Rc<str>, Rc<str>) {
            match context.qname_context(*id) {
                Some(q) => {
                    let uri = context
                        .uri_context(id.uri_id)
                        .map(|u| Rc::clone(&u.uri))
                        .unwrap_or_else(|| Rc::from(""));
                    (Rc::clone(&q.local_name), uri)
                }
                None => (Rc::from(""), Rc::from("")),
            }
        };
        let sort_uri = |uri_id: u16| -> Rc<str> {
            context
                .uri_context(uri_id)
                .map(|u| Rc::clone(&u.uri))
                .unwrap_or_else(|| Rc::from(""))
        };
        self.productions.sort_by(|a, b| {
            a.event.ordinal().cmp(&b.event.ordinal()).then_with(|| match (&a.event, &b.event) {
                (Event::Attribute(x), Event::Attribute(y)) => sort_name(x).cmp(&sort_name(y)),
                (Event::AttributeNs(x), Event::AttributeNs(y)) => sort_uri(*x).cmp(&sort_uri(*y)),
                // SE-Produktionen behalten die Schema-Reihenfolge
                _ => core::cmp::Ordering::Equal,
            })
        });
        self.frozen = true;
        self.recompute();
        Ok(())
    }

    /// Die Zweitlevel-Menge dieser Grammatik (Spec 8.4.3 built-in,
    /// Spec 8.5.4.4 schema-informiert). Der letzte Eintrag ist der
    /// CM/PI-Escape falls der dritte Level existiert.
    pub fn second_level(&self, options: &ExiOptions) -> Vec<SecondLevel> {
        let fid = options.fidelity();
        let cm_pi = fid.comments || fid.pis;
        let mut level = Vec::new();
        match self.kind {
            GrammarKind::Document | GrammarKind::Fragment => {}
            GrammarKind::DocContent => {
                if fid.dtd {
                    level.push(SecondLevel::DocType);
                }
                if cm_pi {
                    level.push(SecondLevel::CommentPiEscape);
                }
            }
            // Spec 8.4.1 / 8.4.2: CM und PI liegen hier direkt im
            // zweiten Level, ohne Escape.
            GrammarKind::DocEnd | GrammarKind::FragmentContent => {
                if fid.comments {
                    level.push(SecondLevel::Comment);
                }
                if fid.pis {
                    level.push(SecondLevel::ProcessingInstruction);
                }
            }
            GrammarKind::StartTag => {
                if options.strict() && !self.learning {
                    return level;
                }
                if self.learning || !self.has_end_element {
                    level.push(SecondLevel::EndElementUndeclared);
                }
                level.push(SecondLevel::AttributeGenericUndeclared);
                if fid.prefixes {
                    level.push(SecondLevel::NamespaceDeclaration);
                }
                if fid.self_contained {
                    level.push(SecondLevel::SelfContained);
                }
                level.push(SecondLevel::StartElementGenericUndeclared);
                level.push(SecondLevel::CharactersGenericUndeclared);
                if fid.dtd {
                    level.push(SecondLevel::EntityReference);
                }
                if cm_pi {
                    level.push(SecondLevel::CommentPiEscape);
                }
            }
            GrammarKind::ElementContent => {
                if options.strict() && !self.learning {
                    return level;
                }
                if !self.learning && !self.has_end_element {
                    level.push(SecondLevel::EndElementUndeclared);
                }
                level.push(SecondLevel::StartElementGenericUndeclared);
                level.push(SecondLevel::CharactersGenericUndeclared);
                if fid.dtd {
                    level.push(SecondLevel::EntityReference);
                }
                if cm_pi {
                    level.push(SecondLevel::CommentPiEscape);
                }
            }
        }
        level
    }

    /// First-Level-Code-Breite: `code_length_b` wenn ein zweiter Level
    /// existiert, sonst `code_length_a` (Spec 6.2).
    pub fn first_level_width(&self, has_second_level: bool) -> u8 {
        if has_second_level {
            self.code_length_b
        } else {
            self.code_length_a
        }
    }
}

/// Arena of grammars; ids are plain indices.
#[derive(Debug, Clone, Default)]
pub struct GrammarArena {
    grammars: Vec<Grammar>,
}

impl GrammarArena {
    pub fn add(&mut self, grammar: Grammar) -> GrammarId {
        let id = GrammarId(self.grammars.len());
        self.grammars.push(grammar);
        id
    }

    pub fn get(&self, id: GrammarId) -> Option<&Grammar> {
        self.grammars.get(id.0)
    }

    pub fn get_mut(&mut self, id: GrammarId) -> Option<&mut Grammar> {
        self.grammars.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }
}

/// The frozen grammar set shared by coders (clone is cheap, Rc inside).
#[derive(Debug, Clone)]
pub struct Grammars {
    context: Rc<GrammarContext>,
    arena: Rc<GrammarArena>,
    document: GrammarId,
    doc_end: GrammarId,
    fragment: GrammarId,
    schema_informed: bool,
}

impl Grammars {
    /// Die built-in Grammatiken ohne Schema (Spec 8.4): Document,
    /// DocContent, DocEnd plus die Fragment-Seite.
    pub fn schema_less() -> Self {
        let mut context = GrammarContext::default_entries();
        context.seal();
        let mut arena = GrammarArena::default();

        // Ids vorab: 0 Document, 1 DocContent, 2 DocEnd, 3 Fragment,
        // 4 FragmentContent.
        let document = GrammarId(0);
        let doc_content = GrammarId(1);
        let doc_end = GrammarId(2);
        let fragment = GrammarId(3);
        let fragment_content = GrammarId(4);

        arena.add(Grammar::new_learning(
            GrammarKind::Document,
            vec![Production::new(Event::StartDocument, doc_content)],
        ));
        // Spec 8.4.1: DocContent lernt SE(qname) -> DocEnd
        arena.add(Grammar::new_learning(
            GrammarKind::DocContent,
            vec![Production::new(Event::StartElementGeneric, doc_end)],
        ));
        arena.add(Grammar::new_learning(
            GrammarKind::DocEnd,
            vec![Production::new(Event::EndDocument, doc_end)],
        ));
        arena.add(Grammar::new_learning(
            GrammarKind::Fragment,
            vec![Production::new(Event::StartDocument, fragment_content)],
        ));
        // Spec 8.4.2: SE(*) vor ED; gelernte SE(qname) ruecken davor
        arena.add(Grammar::new_learning(
            GrammarKind::FragmentContent,
            vec![
                Production::new(Event::StartElementGeneric, fragment_content),
                Production::new(Event::EndDocument, fragment_content),
            ],
        ));

        Self {
            context: Rc::new(context),
            arena: Rc::new(arena),
            document,
            doc_end,
            fragment,
            schema_informed: false,
        }
    }

    pub fn context(&self) -> &Rc<GrammarContext> {
        &self.context
    }

    pub fn arena(&self) -> &Rc<GrammarArena> {
        &self.arena
    }

    pub fn document(&self) -> GrammarId {
        self.document
    }

    pub fn doc_end(&self) -> GrammarId {
        self.doc_end
    }

    pub fn fragment(&self) -> GrammarId {
        self.fragment
    }

    pub fn is_schema_informed(&self) -> bool {
        self.schema_informed
    }

    /// Grammatik eines globalen Elements (nur schema-informiert).
    pub fn global_element(&self, id: QNameId) -> Option<GrammarId> {
        self.context.qname_context(id)?.global_element_grammar
    }
}

/// Builds the frozen grammar set from schema information (Spec 8.5).
///
/// Ablauf: Namen deklarieren, [`Self::seal_names`], dann Grammatiken
/// anlegen und Produktionen einfuegen, zum Schluss [`Self::freeze`].
#[derive(Debug)]
pub struct SchemaInformedGrammarBuilder {
    context: GrammarContext,
    arena: GrammarArena,
    global_elements: Vec<QNameId>,
}

impl Default for SchemaInformedGrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaInformedGrammarBuilder {
    pub fn new() -> Self {
        Self {
            context: GrammarContext::schema_informed_entries(),
            arena: GrammarArena::default(),
            global_elements: Vec::new(),
        }
    }

    pub fn declare_uri(&mut self, uri: &str) -> u16 {
        self.context.declare_uri(uri)
    }

    pub fn declare_prefix(&mut self, uri_id: u16, prefix: &str) {
        self.context.declare_prefix(uri_id, prefix);
    }

    pub fn declare_name(&mut self, uri_id: u16, local_name: &str) {
        self.context.declare_name(uri_id, local_name);
    }

    /// Vergibt die QName-Ids; danach sind Lookups stabil.
    pub fn seal_names(&mut self) {
        self.context.seal();
    }

    pub fn qname_id(&self, uri: &str, local_name: &str) -> Option<QNameId> {
        self.context.qname_id(uri, local_name)
    }

    pub fn new_grammar(&mut self, kind: GrammarKind) -> GrammarId {
        self.arena.add(Grammar::new_schema(kind))
    }

    pub fn add_production(
        &mut self,
        grammar: GrammarId,
        event: Event,
        next: GrammarId,
    ) -> Result<()> {
        self.grammar_mut(grammar)?.add_production(Production::new(event, next))
    }

    /// AT/CH-Produktion mit Wert-Datentyp (Spec 7.1).
    pub fn add_typed_production(
        &mut self,
        grammar: GrammarId,
        event: Event,
        next: GrammarId,
        datatype: Datatype,
    ) -> Result<()> {
        self.grammar_mut(grammar)?.add_production(Production::typed(event, next, datatype))
    }

    fn grammar_mut(&mut self, id: GrammarId) -> Result<&mut Grammar> {
        self.arena
            .get_mut(id)
            .ok_or_else(|| Error::unknown_context_id("grammar", id.0))
    }

    /// Registriert ein globales Element mit seiner StartTag-Grammatik.
    pub fn set_global_element(&mut self, qname: QNameId, grammar: GrammarId) {
        self.context.set_global_element_grammar(qname, grammar);
        self.global_elements.push(qname);
    }

    pub fn set_type_grammar(&mut self, qname: QNameId, grammar: GrammarId) {
        self.context.set_type_grammar(qname, grammar);
    }

    pub fn set_global_attribute_datatype(&mut self, qname: QNameId, datatype: Datatype) {
        self.context.set_global_attribute_datatype(qname, datatype);
    }

    /// Baut die Dokument- und Fragment-Grammatiken (Spec 8.5.4.1, 8.5.4.2),
    /// friert alles ein und liefert das fertige Set.
    pub fn freeze(mut self) -> Result<Grammars> {
        if !self.context.is_sealed() {
            self.context.seal();
        }

        // Spec 8.5.4.1.2: globale Elemente lexikografisch nach
        // lokalem Namen, dann URI
        let mut elements = self.global_elements.clone();
        elements.sort_by(|a, b| {
            let name = |id: &QNameId| {
                self.context
                    .qname_context(*id)
                    .map(|q| Rc::clone(&q.local_name))
                    .unwrap_or_else(|| Rc::from(""))
            };
            let uri = |id: &QNameId| {
                self.context
                    .uri_context(id.uri_id)
                    .map(|u| Rc::clone(&u.uri))
                    .unwrap_or_else(|| Rc::from(""))
            };
            (name(a), uri(a)).cmp(&(name(b), uri(b)))
        });
        elements.dedup();

        let document = self.arena.add(Grammar::new_schema(GrammarKind::Document));
        let doc_content = self.arena.add(Grammar::new_schema(GrammarKind::DocContent));
        let doc_end = self.arena.add(Grammar::new_schema(GrammarKind::DocEnd));
        let fragment = self.arena.add(Grammar::new_schema(GrammarKind::Fragment));
        let fragment_content =
            self.arena.add(Grammar::new_schema(GrammarKind::FragmentContent));

        self.add_production(document, Event::StartDocument, doc_content)?;
        for qname in &elements {
            self.add_production(doc_content, Event::StartElement(*qname), doc_end)?;
        }
        self.add_production(doc_content, Event::StartElementGeneric, doc_end)?;
        self.add_production(doc_end, Event::EndDocument, doc_end)?;

        self.add_production(fragment, Event::StartDocument, fragment_content)?;
        for qname in &elements {
            self.add_production(fragment_content, Event::StartElement(*qname), fragment_content)?;
        }
        self.add_production(fragment_content, Event::StartElementGeneric, fragment_content)?;
        self.add_production(fragment_content, Event::EndDocument, fragment_content)?;

        for g in &mut self.arena.grammars {
            g.freeze(&self.context)?;
        }

        log::debug!(
            "froze {} grammars, {} global elements",
            self.arena.len(),
            elements.len()
        );
        Ok(Grammars {
            context: Rc::new(self.context),
            arena: Rc::new(self.arena),
            document,
            doc_end,
            fragment,
            schema_informed: true,
        })
    }
}

/// Per-coder grammar state: the shared frozen set plus copy-on-write
/// overlays for everything that learns (Spec 8.4.3 — Lernen ist
/// Coder-lokal, nie im geteilten Set).
#[derive(Debug, Clone)]
pub(crate) struct CoderGrammars {
    base: Grammars,
    /// Kopierte lernende Basis-Grammatiken, Key = Basis-Index.
    overlay: FastHashMap<usize, Grammar>,
    /// Zur Laufzeit erzeugte Element-Grammatiken, Ids ab `base.arena.len()`.
    runtime: Vec<Grammar>,
    /// StartTag-Grammatik pro Element-QName (Spec 8.4.3).
    element_grammars: FastHashMap<QNameId, GrammarId>,
}

impl CoderGrammars {
    pub fn new(base: Grammars) -> Self {
        Self {
            base,
            overlay: FastHashMap::default(),
            runtime: Vec::new(),
            element_grammars: FastHashMap::default(),
        }
    }

    pub fn base(&self) -> &Grammars {
        &self.base
    }

    pub fn grammar(&self, id: GrammarId) -> Result<&Grammar> {
        let base_len = self.base.arena.len();
        if id.0 < base_len {
            if let Some(g) = self.overlay.get(&id.0) {
                return Ok(g);
            }
            self.base.arena.get(id).ok_or_else(|| Error::unknown_context_id("grammar", id.0))
        } else {
            self.runtime
                .get(id.0 - base_len)
                .ok_or_else(|| Error::unknown_context_id("grammar", id.0))
        }
    }

    /// Lernt eine Produktion; Basis-Grammatiken werden beim ersten
    /// Lernen in den Overlay kopiert.
    pub fn learn(&mut self, id: GrammarId, event: Event, next: GrammarId) -> Result<()> {
        let base_len = self.base.arena.len();
        if id.0 < base_len {
            if !self.overlay.contains_key(&id.0) {
                let copy = self
                    .base
                    .arena
                    .get(id)
                    .ok_or_else(|| Error::unknown_context_id("grammar", id.0))?
                    .clone();
                self.overlay.insert(id.0, copy);
            }
            // frisch eingefuegt oder schon vorhanden, der Eintrag existiert
            match self.overlay.get_mut(&id.0) {
                Some(g) => g.learn(event, next),
                None => Err(Error::unknown_context_id("grammar", id.0)),
            }
        } else {
            self.runtime
                .get_mut(id.0 - base_len)
                .ok_or_else(|| Error::unknown_context_id("grammar", id.0))?
                .learn(event, next)
        }
    }

    /// StartTag-Grammatik eines Elements; beim ersten Treffer entsteht
    /// das Paar StartTagContent/ElementContent (Spec 8.4.3), letzteres
    /// mit EE vorbesetzt.
    pub fn element_grammar(&mut self, qname: QNameId) -> GrammarId {
        if let Some(&id) = self.element_grammars.get(&qname) {
            return id;
        }
        let base_len = self.base.arena.len();
        let start = GrammarId(base_len + self.runtime.len());
        let content = GrammarId(start.0 + 1);
        self.runtime.push(Grammar::new_learning(GrammarKind::StartTag, Vec::new()));
        self.runtime.push(Grammar::new_learning(
            GrammarKind::ElementContent,
            vec![Production::new(Event::EndElement, content)],
        ));
        self.element_grammars.insert(qname, start);
        start
    }

    /// ElementContent-Grammatik zu einer StartTag-Grammatik (das Paar
    /// liegt nebeneinander in der Runtime-Arena).
    pub fn content_of(&self, start: GrammarId) -> GrammarId {
        GrammarId(start.0 + 1)
    }
}
