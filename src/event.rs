//! EXI Event Model (Spec Section 4, Table 4-1, Table 4-2).
//!
//! Zwei Ebenen: [`ExiEvent`] ist die oeffentliche, aufgeloeste Form die
//! der Decoder liefert (Strings statt Tabellen-Ids, typisierte Werte);
//! [`Event`] ist die interne Grammatik-Form mit [`QNameId`]s und dem
//! festen Ordinal das die Produktionsreihenfolge schema-informierter
//! Grammatiken bestimmt (Spec 8.5.4.4.1).

use std::rc::Rc;

use crate::context::QNameId;
use crate::value::Value;

/// A resolved qualified name as surfaced in decoder events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub uri: Rc<str>,
    pub local_name: Rc<str>,
    /// Nur gesetzt wenn Prefixes erhalten werden (Preserve.prefixes).
    pub prefix: Option<Rc<str>>,
}

impl QName {
    pub fn new(uri: impl Into<Rc<str>>, local_name: impl Into<Rc<str>>) -> Self {
        Self { uri: uri.into(), local_name: local_name.into(), prefix: None }
    }

    pub fn with_prefix(
        uri: impl Into<Rc<str>>,
        local_name: impl Into<Rc<str>>,
        prefix: impl Into<Rc<str>>,
    ) -> Self {
        Self { uri: uri.into(), local_name: local_name.into(), prefix: Some(prefix.into()) }
    }
}

/// Content for Namespace Declaration (NS) events.
///
/// Spec 4, Table 4-1: NS events associate a prefix with a URI or rescind
/// such associations.
///
/// **Constraint (Spec 4):** When `local_element_ns` is true, the `uri` MUST
/// match the URI of the associated SE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsContent {
    /// The namespace URI being declared.
    pub uri: Rc<str>,
    /// The prefix bound to this URI (empty string for default namespace).
    pub prefix: Rc<str>,
    /// True if this NS event specifies the namespace of the associated element.
    pub local_element_ns: bool,
}

/// Content for Attribute (AT) events.
///
/// Spec 4, Table 4-1: qname + value. The value is typed when a
/// schema-informed grammar supplies a datatype (Table 4-2), otherwise a
/// plain string.
#[derive(Debug, Clone, PartialEq)]
pub struct AtContent {
    pub qname: Rc<QName>,
    pub value: Value,
}

/// Content for Characters (CH) events.
///
/// Spec 4, Table 4-1: value (typed like attribute values).
#[derive(Debug, Clone, PartialEq)]
pub struct ChContent {
    pub value: Value,
}

/// Content for Comment (CM) events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmContent {
    pub text: Rc<str>,
}

/// Content for Processing Instruction (PI) events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiContent {
    pub name: Rc<str>,
    pub text: Rc<str>,
}

/// Content for DOCTYPE (DT) events.
///
/// Spec 4, Table 4-1: name + public + system + text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtContent {
    pub name: Rc<str>,
    /// The public identifier (empty if none).
    pub public: Rc<str>,
    /// The system identifier (empty if none).
    pub system: Rc<str>,
    /// The internal subset text (empty if none).
    pub text: Rc<str>,
}

/// Content for Entity Reference (ER) events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErContent {
    pub name: Rc<str>,
}

impl Default for NsContent {
    fn default() -> Self {
        Self { uri: Rc::from(""), prefix: Rc::from(""), local_element_ns: false }
    }
}

impl Default for CmContent {
    fn default() -> Self {
        Self { text: Rc::from("") }
    }
}

impl Default for PiContent {
    fn default() -> Self {
        Self { name: Rc::from(""), text: Rc::from("") }
    }
}

impl Default for DtContent {
    fn default() -> Self {
        Self {
            name: Rc::from(""),
            public: Rc::from(""),
            system: Rc::from(""),
            text: Rc::from(""),
        }
    }
}

impl Default for ErContent {
    fn default() -> Self {
        Self { name: Rc::from("") }
    }
}

/// EXI event types as surfaced by the decoder (Spec Section 4, Table 4-1).
#[derive(Debug, Clone, PartialEq)]
pub enum ExiEvent {
    /// Start Document - marks the beginning of an EXI body.
    StartDocument,
    /// End Document - marks the end of an EXI body.
    EndDocument,
    /// Start Element - begins an element with the given qname.
    StartElement(Rc<QName>),
    /// End Element - closes the current element.
    EndElement,
    /// Attribute - an attribute with qname and (typed) value.
    Attribute(AtContent),
    /// Characters - (typed) character data content.
    Characters(ChContent),
    /// Namespace Declaration - binds a prefix to a URI.
    NamespaceDeclaration(NsContent),
    /// Comment - an XML comment.
    Comment(CmContent),
    /// Processing Instruction - an XML PI.
    ProcessingInstruction(PiContent),
    /// DOCTYPE - document type declaration.
    DocType(DtContent),
    /// Entity Reference - an unexpanded entity reference.
    EntityReference(ErContent),
    /// Self Contained - the following element was coded as an independent
    /// fragment (Spec 4).
    SelfContained,
}

/// Grammar-level event (Spec 8.5.4.4.1). Productions pair one of these
/// with a next-grammar id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    StartDocument,
    EndDocument,
    /// AT(qname)
    Attribute(QNameId),
    /// AT(uri:*)
    AttributeNs(u16),
    /// AT(*)
    AttributeGeneric,
    /// SE(qname)
    StartElement(QNameId),
    /// SE(uri:*)
    StartElementNs(u16),
    /// SE(*)
    StartElementGeneric,
    EndElement,
    Characters,
    NamespaceDeclaration,
    SelfContained,
    DocType,
    EntityReference,
    Comment,
    ProcessingInstruction,
}

impl Event {
    /// Primaerer Sortierschluessel fuer schema-informierte Produktionen
    /// (Spec 8.5.4.4.1): AT vor SE vor EE vor CH, Rest dahinter.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::StartDocument => 0,
            Self::EndDocument => 1,
            Self::Attribute(_) => 2,
            Self::AttributeNs(_) => 3,
            Self::AttributeGeneric => 4,
            Self::StartElement(_) => 5,
            Self::StartElementNs(_) => 6,
            Self::StartElementGeneric => 7,
            Self::EndElement => 8,
            Self::Characters => 9,
            Self::NamespaceDeclaration => 10,
            Self::SelfContained => 11,
            Self::DocType => 12,
            Self::EntityReference => 13,
            Self::Comment => 14,
            Self::ProcessingInstruction => 15,
        }
    }

    /// Kurzname wie in Spec Table 4-1 (fuer Fehlermeldungen und Logs).
    pub fn label(self) -> &'static str {
        match self {
            Self::StartDocument => "SD",
            Self::EndDocument => "ED",
            Self::Attribute(_) => "AT(qname)",
            Self::AttributeNs(_) => "AT(uri:*)",
            Self::AttributeGeneric => "AT(*)",
            Self::StartElement(_) => "SE(qname)",
            Self::StartElementNs(_) => "SE(uri:*)",
            Self::StartElementGeneric => "SE(*)",
            Self::EndElement => "EE",
            Self::Characters => "CH",
            Self::NamespaceDeclaration => "NS",
            Self::SelfContained => "SC",
            Self::DocType => "DT",
            Self::EntityReference => "ER",
            Self::Comment => "CM",
            Self::ProcessingInstruction => "PI",
        }
    }

    pub fn is_attribute(self) -> bool {
        matches!(self, Self::Attribute(_) | Self::AttributeNs(_) | Self::AttributeGeneric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qname_local(local_name: &str) -> Rc<QName> {
        Rc::new(QName::new("", local_name))
    }

    /// Spec 4, Table 4-1: SE event contains qname.
    #[test]
    fn start_element_konstruktion() {
        let qname = Rc::new(QName::with_prefix("http://example.org", "element", "ex"));
        let ExiEvent::StartElement(q) = ExiEvent::StartElement(qname.clone()) else {
            panic!("Expected StartElement");
        };

        assert_eq!(&*q.uri, "http://example.org");
        assert_eq!(&*q.local_name, "element");
        assert_eq!(q.prefix.as_deref(), Some("ex"));
    }

    /// Spec 4, Table 4-1: AT event contains qname + value.
    #[test]
    fn attribute_konstruktion() {
        let content = AtContent {
            qname: qname_local("id"),
            value: Value::string("123"),
        };
        let ExiEvent::Attribute(at) = ExiEvent::Attribute(content) else {
            panic!("Expected Attribute");
        };

        assert_eq!(&*at.qname.local_name, "id");
        assert_eq!(at.value.to_string(), "123");
    }

    /// Spec 4: NS event with empty URI rescinds namespace association.
    #[test]
    fn ns_undeclare_namespace() {
        let ns = NsContent {
            uri: "".into(),
            prefix: "ex".into(),
            local_element_ns: false,
        };
        assert!(ns.uri.is_empty(), "Empty URI rescinds the prefix binding");
        assert_eq!(&*ns.prefix, "ex");
    }

    /// Spec 8.5.4.4.1: AT-Produktionen sortieren vor SE, SE vor EE, EE vor CH.
    #[test]
    fn ordinal_ordnung() {
        let at = Event::Attribute(QNameId { uri_id: 0, local_id: 0 });
        let se = Event::StartElement(QNameId { uri_id: 0, local_id: 0 });
        assert!(at.ordinal() < Event::AttributeGeneric.ordinal());
        assert!(Event::AttributeGeneric.ordinal() < se.ordinal());
        assert!(se.ordinal() < Event::EndElement.ordinal());
        assert!(Event::EndElement.ordinal() < Event::Characters.ordinal());
    }

    #[test]
    fn label_und_attribute_erkennung() {
        assert_eq!(Event::AttributeGeneric.label(), "AT(*)");
        assert_eq!(Event::EndElement.label(), "EE");
        assert!(Event::AttributeNs(3).is_attribute());
        assert!(!Event::Characters.is_attribute());
    }

    /// Alle Event-Typen müssen Clone implementieren.
    #[test]
    fn events_are_clone() {
        let events = [
            ExiEvent::StartDocument,
            ExiEvent::EndDocument,
            ExiEvent::StartElement(qname_local("test")),
            ExiEvent::EndElement,
            ExiEvent::Attribute(AtContent {
                qname: qname_local("attr"),
                value: Value::string("val"),
            }),
            ExiEvent::Characters(ChContent { value: Value::string("text") }),
            ExiEvent::NamespaceDeclaration(NsContent {
                uri: "http://example.org".into(),
                prefix: "ex".into(),
                local_element_ns: false,
            }),
            ExiEvent::Comment(CmContent { text: "comment".into() }),
            ExiEvent::ProcessingInstruction(PiContent {
                name: "pi".into(),
                text: "data".into(),
            }),
            ExiEvent::DocType(DtContent::default()),
            ExiEvent::EntityReference(ErContent { name: "amp".into() }),
            ExiEvent::SelfContained,
        ];

        for event in &events {
            assert_eq!(event, &event.clone());
        }
    }

    /// Characters mit leerem String sind valide.
    #[test]
    fn characters_leerer_string() {
        let content = ChContent { value: Value::string("") };
        assert_eq!(content.value.to_string(), "");
    }
}
