//! Ganzdokument-Roundtrips durch Encoder und Decoder: alle vier
//! Alignments, schema-less und schema-informiert, Bloecke, Fragmente
//! und selbstenthaltene Elemente.

use exicore::event::Event;
use exicore::grammar::GrammarKind;
use exicore::{
    BodyDecoder, BodyEncoder, CodingMode, Datatype, ExiEvent, ExiOptions, Fidelity, Grammars,
    QName, SchemaInformedGrammarBuilder, Value,
};

/// Ein kleines gemischtes Dokument, schema-less.
fn encode_sample(options: &ExiOptions) -> Vec<u8> {
    let mut enc = BodyEncoder::new(options.clone(), Grammars::schema_less()).unwrap();
    enc.start_document().unwrap();
    enc.start_element("", "order", None).unwrap();
    enc.attribute("", "id", None, "4711").unwrap();
    enc.start_element("", "item", None).unwrap();
    enc.characters("Kaffee").unwrap();
    enc.end_element().unwrap();
    enc.start_element("", "item", None).unwrap();
    enc.characters("Tee").unwrap();
    enc.end_element().unwrap();
    enc.end_element().unwrap();
    enc.end_document().unwrap();
    enc.finish().unwrap()
}

fn decode_all(options: &ExiOptions, grammars: Grammars, bytes: &[u8]) -> Vec<ExiEvent> {
    let mut dec = BodyDecoder::new(options.clone(), grammars, bytes).unwrap();
    let mut events = Vec::new();
    while let Some(ev) = dec.next_event().unwrap() {
        events.push(ev);
    }
    events
}

fn characters_of(events: &[ExiEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ExiEvent::Characters(c) => Some(c.value.to_string()),
            _ => None,
        })
        .collect()
}

/// Spec 5.4: alle vier Alignments tragen denselben Event-Strom.
#[test]
fn sample_document_all_coding_modes() {
    for mode in [
        CodingMode::BitPacked,
        CodingMode::BytePacked,
        CodingMode::PreCompression,
        CodingMode::Compression,
    ] {
        let options = ExiOptions::default().with_coding_mode(mode);
        let bytes = encode_sample(&options);
        let events = decode_all(&options, Grammars::schema_less(), &bytes);

        assert_eq!(events.first(), Some(&ExiEvent::StartDocument), "{mode:?}");
        assert_eq!(events.last(), Some(&ExiEvent::EndDocument), "{mode:?}");
        assert_eq!(characters_of(&events), vec!["Kaffee", "Tee"], "{mode:?}");
        let at = events.iter().find_map(|e| match e {
            ExiEvent::Attribute(at) => Some(at),
            _ => None,
        });
        let at = at.unwrap_or_else(|| panic!("kein AT in {mode:?}"));
        assert_eq!(&*at.qname.local_name, "id");
        assert_eq!(at.value.to_string(), "4711");
    }
}

/// Bit-packed ist kompakter als byte-aligned; beide decodieren gleich.
#[test]
fn bit_packed_is_denser() {
    let bit = encode_sample(&ExiOptions::default());
    let byte = encode_sample(&ExiOptions::default().with_coding_mode(CodingMode::BytePacked));
    assert!(bit.len() < byte.len(), "bit={} byte={}", bit.len(), byte.len());
}

fn price_grammars() -> Grammars {
    let mut b = SchemaInformedGrammarBuilder::new();
    let u = b.declare_uri("");
    b.declare_name(u, "price");
    b.declare_name(u, "currency");
    b.seal_names();
    let price = b.qname_id("", "price").unwrap();
    let currency = b.qname_id("", "currency").unwrap();

    let start = b.new_grammar(GrammarKind::StartTag);
    let end = b.new_grammar(GrammarKind::ElementContent);
    b.add_typed_production(start, Event::Attribute(currency), start, Datatype::string())
        .unwrap();
    b.add_typed_production(start, Event::Characters, end, Datatype::decimal()).unwrap();
    b.add_production(end, Event::EndElement, end).unwrap();
    b.set_global_element(price, start);
    b.freeze().unwrap()
}

/// Spec 8.5: schema-informiert und strict, Werte typisiert.
#[test]
fn schema_informed_strict_round_trip() {
    let options = ExiOptions::default().with_strict();
    let mut enc = BodyEncoder::new(options.clone(), price_grammars()).unwrap();
    enc.start_document().unwrap();
    enc.start_element("", "price", None).unwrap();
    enc.attribute("", "currency", None, "EUR").unwrap();
    enc.characters("12.5").unwrap();
    enc.end_element().unwrap();
    enc.end_document().unwrap();
    let bytes = enc.finish().unwrap();

    let events = decode_all(&options, price_grammars(), &bytes);
    assert_eq!(events.len(), 6);
    let ExiEvent::Characters(ch) = &events[3] else {
        panic!("expected CH, got {:?}", events[3]);
    };
    assert!(matches!(ch.value, Value::Decimal(_)), "{:?}", ch.value);
    assert_eq!(ch.value.to_string(), "12.5");
}

/// Spec 8.5.4.4.2: ungueltige lexikalische Form weicht auf den
/// undeclared String-Pfad aus (nicht-strict) und ueberlebt woertlich.
#[test]
fn invalid_typed_value_falls_back_to_string() {
    let options = ExiOptions::default();
    let mut enc = BodyEncoder::new(options.clone(), price_grammars()).unwrap();
    enc.start_document().unwrap();
    enc.start_element("", "price", None).unwrap();
    enc.characters("billig").unwrap();
    enc.end_element().unwrap();
    enc.end_document().unwrap();
    let bytes = enc.finish().unwrap();

    let events = decode_all(&options, price_grammars(), &bytes);
    assert_eq!(characters_of(&events), vec!["billig"]);
    let ch = events.iter().find_map(|e| match e {
        ExiEvent::Characters(c) => Some(c),
        _ => None,
    });
    assert!(matches!(ch.map(|c| &c.value), Some(Value::String(_))));
}

/// Spec 9.3: ein Channel mit mehr als 100 Werten bekommt im
/// Compression-Modus seinen eigenen Stream.
#[test]
fn compression_splits_large_channels() {
    let options = ExiOptions::default().with_coding_mode(CodingMode::Compression);
    let mut enc = BodyEncoder::new(options.clone(), Grammars::schema_less()).unwrap();
    enc.start_document().unwrap();
    enc.start_element("", "log", None).unwrap();
    enc.attribute("", "host", None, "alpha").unwrap();
    for i in 0..130 {
        enc.start_element("", "entry", None).unwrap();
        enc.characters(&format!("zeile {i}")).unwrap();
        enc.end_element().unwrap();
    }
    enc.end_element().unwrap();
    enc.end_document().unwrap();
    let bytes = enc.finish().unwrap();

    let events = decode_all(&options, Grammars::schema_less(), &bytes);
    let values = characters_of(&events);
    assert_eq!(values.len(), 130);
    assert_eq!(values[0], "zeile 0");
    assert_eq!(values[129], "zeile 129");
}

/// Spec 9.1: kleine block_size partitioniert den Strom in mehrere
/// Bloecke; die String-Tabelle ueberlebt die Blockgrenzen.
#[test]
fn small_blocks_round_trip() {
    let options = ExiOptions::default()
        .with_coding_mode(CodingMode::Compression)
        .with_block_size(3);
    let mut enc = BodyEncoder::new(options.clone(), Grammars::schema_less()).unwrap();
    enc.start_document().unwrap();
    enc.start_element("", "list", None).unwrap();
    for word in ["eins", "zwei", "eins", "drei", "zwei", "eins", "vier"] {
        enc.start_element("", "w", None).unwrap();
        enc.characters(word).unwrap();
        enc.end_element().unwrap();
    }
    enc.end_element().unwrap();
    enc.end_document().unwrap();
    let bytes = enc.finish().unwrap();

    let events = decode_all(&options, Grammars::schema_less(), &bytes);
    assert_eq!(
        characters_of(&events),
        vec!["eins", "zwei", "eins", "drei", "zwei", "eins", "vier"]
    );
}

/// Spec 7.3.3: value_max_length verhindert nur den Tabelleneintrag,
/// der Wert selbst ueberlebt als Literal.
#[test]
fn value_max_length_limits_table_not_values() {
    let options = ExiOptions::default().with_value_max_length(4);
    let mut enc = BodyEncoder::new(options.clone(), Grammars::schema_less()).unwrap();
    enc.start_document().unwrap();
    enc.start_element("", "a", None).unwrap();
    for _ in 0..2 {
        enc.start_element("", "b", None).unwrap();
        // zu lang fuer die Tabelle, wird zweimal woertlich codiert
        enc.characters("wiederholung").unwrap();
        enc.end_element().unwrap();
    }
    enc.end_element().unwrap();
    enc.end_document().unwrap();
    let bytes = enc.finish().unwrap();

    let events = decode_all(&options, Grammars::schema_less(), &bytes);
    assert_eq!(characters_of(&events), vec!["wiederholung", "wiederholung"]);
}

/// Spec 8.4.2: Fragment-Modus traegt mehrere Wurzelelemente.
#[test]
fn fragment_with_multiple_roots() {
    let options = ExiOptions::default().with_fragment();
    let mut enc = BodyEncoder::new(options.clone(), Grammars::schema_less()).unwrap();
    enc.start_document().unwrap();
    for name in ["a", "b", "a"] {
        enc.start_element("", name, None).unwrap();
        enc.end_element().unwrap();
    }
    enc.end_document().unwrap();
    let bytes = enc.finish().unwrap();

    let events = decode_all(&options, Grammars::schema_less(), &bytes);
    let roots: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            ExiEvent::StartElement(q) => Some(q.local_name.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(roots, vec!["a", "b", "a"]);
}

/// Preserve.prefixes: Prefixe und NS-Events ueberleben den Draht.
#[test]
fn prefixes_and_namespaces_round_trip() {
    let options = ExiOptions::default()
        .with_fidelity(Fidelity { prefixes: true, ..Fidelity::default() });
    let mut enc = BodyEncoder::new(options.clone(), Grammars::schema_less()).unwrap();
    enc.start_document().unwrap();
    enc.start_element("urn:beispiel", "e", Some("p")).unwrap();
    enc.namespace_declaration("urn:beispiel", "p", true).unwrap();
    enc.characters("x").unwrap();
    enc.end_element().unwrap();
    enc.end_document().unwrap();
    let bytes = enc.finish().unwrap();

    let events = decode_all(&options, Grammars::schema_less(), &bytes);
    let ExiEvent::StartElement(q) = &events[1] else {
        panic!("expected SE, got {:?}", events[1]);
    };
    assert_eq!(&*q.uri, "urn:beispiel");
    assert_eq!(q.prefix.as_deref(), Some("p"));
    let ns = events.iter().find_map(|e| match e {
        ExiEvent::NamespaceDeclaration(ns) => Some(ns),
        _ => None,
    });
    let ns = ns.expect("NS event fehlt");
    assert_eq!(&*ns.prefix, "p");
    assert!(ns.local_element_ns);
}

/// Preserve.comments/pis: CM und PI laufen ueber den dritten Level und
/// kommen unveraendert zurueck.
#[test]
fn comments_and_pis_round_trip() {
    let options = ExiOptions::default()
        .with_fidelity(Fidelity { comments: true, pis: true, ..Fidelity::default() });
    let mut enc = BodyEncoder::new(options.clone(), Grammars::schema_less()).unwrap();
    enc.start_document().unwrap();
    enc.comment(" Kopf ").unwrap();
    enc.start_element("", "doc", None).unwrap();
    enc.processing_instruction("ziel", "daten").unwrap();
    enc.end_element().unwrap();
    enc.comment(" Fuss ").unwrap();
    enc.end_document().unwrap();
    let bytes = enc.finish().unwrap();

    let events = decode_all(&options, Grammars::schema_less(), &bytes);
    let comments: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            ExiEvent::Comment(c) => Some(c.text.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(comments, vec![" Kopf ", " Fuss "]);
    let pi = events.iter().find_map(|e| match e {
        ExiEvent::ProcessingInstruction(pi) => Some(pi),
        _ => None,
    });
    let pi = pi.expect("PI event fehlt");
    assert_eq!(&*pi.name, "ziel");
    assert_eq!(&*pi.text, "daten");
}

/// Spec 8.4.3 SC: das selbstenthaltene Element laeuft als Fragment mit
/// frischen Tabellen und taucht beim Decodieren als SC-Event auf; ein
/// aeusseres EE traegt es nicht.
#[test]
fn self_contained_round_trip() {
    let options = ExiOptions::default()
        .with_fidelity(Fidelity { self_contained: true, ..Fidelity::default() })
        .with_self_contained_elements(vec![QName::new("", "part")]);
    let mut enc = BodyEncoder::new(options.clone(), Grammars::schema_less()).unwrap();
    enc.start_document().unwrap();
    enc.start_element("", "root", None).unwrap();
    enc.characters("davor").unwrap();
    enc.start_element("", "part", None).unwrap();
    enc.attribute("", "nr", None, "1").unwrap();
    enc.characters("innen").unwrap();
    enc.end_element().unwrap();
    enc.characters("danach").unwrap();
    enc.end_element().unwrap();
    enc.end_document().unwrap();
    let bytes = enc.finish().unwrap();

    let events = decode_all(&options, Grammars::schema_less(), &bytes);
    assert_eq!(characters_of(&events), vec!["davor", "innen", "danach"]);
    let sc_pos = events.iter().position(|e| matches!(e, ExiEvent::SelfContained));
    let sc_pos = sc_pos.expect("SC event fehlt");
    // SC folgt direkt auf das SE des Elements
    assert!(
        matches!(&events[sc_pos - 1], ExiEvent::StartElement(q) if &*q.local_name == "part")
    );
    // Struktur bleibt balanciert: zwei SE-Paare plus das SC-Element
    let ses = events.iter().filter(|e| matches!(e, ExiEvent::StartElement(_))).count();
    let ees = events.iter().filter(|e| matches!(e, ExiEvent::EndElement)).count();
    assert_eq!(ses, 2);
    assert_eq!(ees, 2);
    assert_eq!(events.last(), Some(&ExiEvent::EndDocument));
}
