//! Value string table (Spec 7.3, 7.3.3).
//!
//! Werte haengen doppelt: in der **lokalen** Partition ihres QNames und
//! in der einen **globalen** Partition. Ein zentrales Lookup
//! value → (Owner, globale Id, lokale Id) traegt die Encoder-Seite; die
//! Partitionen selbst sind Id → Wert mit Loechern, denn die begrenzte
//! globale Partition (valuePartitionCapacity) verdraengt FIFO und
//! reisst den Wert dabei auch aus seiner lokalen Partition. Lokale Ids
//! werden nie wiederverwendet — die Bitbreite einer lokalen Partition
//! richtet sich nach der Zahl je hinzugefuegter Werte.
//!
//! Encoder und Decoder muessen aus derselben Event-Folge identisch
//! wachsen (Spec 7.3.1).

use std::rc::Rc;

use crate::channel::{DecoderChannel, EncoderChannel};
use crate::context::QNameId;
use crate::options::ExiOptions;
use crate::{Error, FastHashMap, Result, bit_width, n_bit_unsigned_integer, string, unsigned_integer};

/// Where a value lives (central lookup entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueInfo {
    /// Owner-QName; `None` fuer vorab geteilte Strings ohne lokale Heimat.
    pub owner: Option<QNameId>,
    pub global_id: usize,
    pub local_id: usize,
}

/// Lokale Partition: Slots mit Loechern, `next_id` zaehlt je Hinzugefuegte.
#[derive(Debug, Clone, Default)]
struct LocalPartition {
    entries: Vec<Option<Rc<str>>>,
    next_id: usize,
}

impl LocalPartition {
    fn add(&mut self, value: Rc<str>) -> usize {
        let id = self.next_id;
        self.entries.push(Some(value));
        self.next_id += 1;
        id
    }

    fn width(&self) -> u8 {
        bit_width::coding_length(self.next_id)
    }
}

/// The value table of one coder side.
#[derive(Debug, Clone)]
pub struct ValueTable {
    locals: FastHashMap<QNameId, LocalPartition>,
    /// Globale Partition; bei Kapazitaet wickelt `next_id` FIFO.
    global: Vec<Option<Rc<str>>>,
    global_next: usize,
    at_capacity: bool,
    lookup: FastHashMap<Rc<str>, ValueInfo>,
    capacity: Option<usize>,
    value_max_length: Option<usize>,
}

impl ValueTable {
    pub fn new(options: &ExiOptions) -> Self {
        let mut table = Self {
            locals: FastHashMap::default(),
            global: Vec::new(),
            global_next: 0,
            at_capacity: false,
            lookup: FastHashMap::default(),
            capacity: options.value_partition_capacity().map(|c| c as usize),
            value_max_length: options.value_max_length().map(|l| l as usize),
        };
        // EXI Profile: vorab bekannte Strings fuellen die globale
        // Partition in Reihenfolge, ohne lokalen Owner.
        for s in options.shared_strings() {
            table.add_shared(Rc::from(s.as_str()));
        }
        table
    }

    pub fn get(&self, value: &str) -> Option<ValueInfo> {
        self.lookup.get(value).copied()
    }

    /// Spec 7.3.3: leere Literale und Werte ueber valueMaxLength kommen
    /// nie in die Tabelle.
    pub fn should_add(&self, value: &str) -> bool {
        !value.is_empty()
            && self.capacity != Some(0)
            && self.value_max_length.is_none_or(|max| value.chars().count() <= max)
    }

    fn add_shared(&mut self, value: Rc<str>) {
        if self.lookup.contains_key(&value) {
            return;
        }
        let global_id = self.push_global(Rc::clone(&value));
        self.lookup.insert(value, ValueInfo { owner: None, global_id, local_id: 0 });
    }

    /// Fuegt einen Wert beiden Partitionen hinzu (nach Literal-Codierung
    /// bzw. -Decodierung). Der Aufrufer hat `should_add` geprueft.
    pub fn add(&mut self, qname: QNameId, value: Rc<str>) {
        if self.lookup.contains_key(&value) {
            return;
        }
        let local_id = self.locals.entry(qname).or_default().add(Rc::clone(&value));
        let global_id = self.push_global(Rc::clone(&value));
        self.lookup
            .insert(value, ValueInfo { owner: Some(qname), global_id, local_id });
    }

    fn push_global(&mut self, value: Rc<str>) -> usize {
        match self.capacity {
            Some(cap) if cap == 0 => 0,
            Some(cap) if self.at_capacity || self.global.len() >= cap => {
                self.at_capacity = true;
                let slot = self.global_next % cap;
                if let Some(old) = self.global[slot].take() {
                    self.evict(&old);
                }
                self.global[slot] = Some(value);
                self.global_next = (slot + 1) % cap;
                slot
            }
            _ => {
                let id = self.global.len();
                self.global.push(Some(value));
                self.global_next = if self.capacity == Some(id + 1) { 0 } else { id + 1 };
                id
            }
        }
    }

    /// FIFO-Verdraengung: raus aus dem Lookup und aus der lokalen
    /// Partition des Owners (dort bleibt ein Loch).
    fn evict(&mut self, value: &Rc<str>) {
        if let Some(info) = self.lookup.remove(value) {
            log::trace!("value table evicts {value:?}");
            if let Some(owner) = info.owner
                && let Some(local) = self.locals.get_mut(&owner)
                && let Some(slot) = local.entries.get_mut(info.local_id)
            {
                *slot = None;
            }
        }
    }

    pub fn local_width(&self, qname: QNameId) -> u8 {
        self.locals.get(&qname).map_or(0, LocalPartition::width)
    }

    /// Breite der globalen Compact-Id; bei erreichter Kapazitaet bleibt
    /// sie auf der Kapazitaet stehen.
    pub fn global_width(&self) -> u8 {
        bit_width::coding_length(self.global.len())
    }

    pub fn local_value(&self, qname: QNameId, id: usize) -> Result<Rc<str>> {
        self.locals
            .get(&qname)
            .and_then(|l| l.entries.get(id))
            .and_then(Option::clone)
            .ok_or_else(|| Error::unknown_context_id("local value", id))
    }

    pub fn global_value(&self, id: usize) -> Result<Rc<str>> {
        self.global
            .get(id)
            .and_then(Option::clone)
            .ok_or_else(|| Error::unknown_context_id("global value", id))
    }

    // ---- String-Umschlag (Spec 7.3.3) --------------------------------

    /// Unsigned Integer i: 0 = lokaler Hit + Compact-Id, 1 = globaler
    /// Hit + Compact-Id, i >= 2 = Literal der Laenge i-2.
    pub fn encode_value(
        &mut self,
        channel: &mut EncoderChannel,
        qname: QNameId,
        value: &str,
    ) -> Result<()> {
        match self.get(value) {
            Some(info) if info.owner == Some(qname) => {
                unsigned_integer::encode(channel, 0);
                n_bit_unsigned_integer::encode(
                    channel,
                    info.local_id as u64,
                    self.local_width(qname),
                );
            }
            Some(info) => {
                unsigned_integer::encode(channel, 1);
                n_bit_unsigned_integer::encode(
                    channel,
                    info.global_id as u64,
                    self.global_width(),
                );
            }
            None => {
                string::encode_with_offset(channel, value, 2);
                if self.should_add(value) {
                    self.add(qname, Rc::from(value));
                }
            }
        }
        Ok(())
    }

    pub fn decode_value(
        &mut self,
        channel: &mut DecoderChannel,
        qname: QNameId,
    ) -> Result<Rc<str>> {
        let i = unsigned_integer::decode(channel)?;
        match i {
            0 => {
                let id = n_bit_unsigned_integer::decode(channel, self.local_width(qname))?;
                self.local_value(qname, id as usize)
            }
            1 => {
                let id = n_bit_unsigned_integer::decode(channel, self.global_width())?;
                self.global_value(id as usize)
            }
            _ => {
                let value: Rc<str> = Rc::from(string::decode_codepoints(channel, i - 2)?);
                if self.should_add(&value) {
                    self.add(qname, Rc::clone(&value));
                }
                Ok(value)
            }
        }
    }

    // ---- Extended String (EXI Profile) -------------------------------

    /// Erweiterter Umschlag: 0 = lokal, 1 = global, 2 = Treffer in der
    /// Grammar-Strings-Enumeration, 3/4/5 = reserviert (Decodier-Fehler),
    /// i >= 6 = Literal der Laenge i-6.
    pub fn encode_value_extended(
        &mut self,
        channel: &mut EncoderChannel,
        qname: QNameId,
        value: &str,
        grammar_strings: Option<&[Rc<str>]>,
    ) -> Result<()> {
        match self.get(value) {
            Some(info) if info.owner == Some(qname) => {
                unsigned_integer::encode(channel, 0);
                n_bit_unsigned_integer::encode(
                    channel,
                    info.local_id as u64,
                    self.local_width(qname),
                );
                return Ok(());
            }
            Some(info) => {
                unsigned_integer::encode(channel, 1);
                n_bit_unsigned_integer::encode(
                    channel,
                    info.global_id as u64,
                    self.global_width(),
                );
                return Ok(());
            }
            None => {}
        }
        if let Some(strings) = grammar_strings
            && let Some(index) = strings.iter().position(|s| s.as_ref() == value)
        {
            unsigned_integer::encode(channel, 2);
            let width = bit_width::coding_length(strings.len());
            n_bit_unsigned_integer::encode(channel, index as u64, width);
            return Ok(());
        }
        string::encode_with_offset(channel, value, 6);
        if self.should_add(value) {
            self.add(qname, Rc::from(value));
        }
        Ok(())
    }

    pub fn decode_value_extended(
        &mut self,
        channel: &mut DecoderChannel,
        qname: QNameId,
        grammar_strings: Option<&[Rc<str>]>,
    ) -> Result<Rc<str>> {
        let i = unsigned_integer::decode(channel)?;
        match i {
            0 => {
                let id = n_bit_unsigned_integer::decode(channel, self.local_width(qname))?;
                self.local_value(qname, id as usize)
            }
            1 => {
                let id = n_bit_unsigned_integer::decode(channel, self.global_width())?;
                self.global_value(id as usize)
            }
            2 => {
                let strings = grammar_strings.ok_or(Error::UnsupportedExtendedString(2))?;
                let width = bit_width::coding_length(strings.len());
                let index = n_bit_unsigned_integer::decode(channel, width)? as usize;
                strings
                    .get(index)
                    .map(Rc::clone)
                    .ok_or_else(|| Error::unknown_context_id("grammar string", index))
            }
            // shared string / split string / undefined: nicht getragen
            3..=5 => Err(Error::UnsupportedExtendedString(i)),
            _ => {
                let value: Rc<str> = Rc::from(string::decode_codepoints(channel, i - 6)?);
                if self.should_add(&value) {
                    self.add(qname, Rc::clone(&value));
                }
                Ok(value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q: QNameId = QNameId { uri_id: 0, local_id: 0 };
    const Q2: QNameId = QNameId { uri_id: 0, local_id: 1 };

    fn table() -> ValueTable {
        ValueTable::new(&ExiOptions::default())
    }

    fn bounded(cap: u32) -> ValueTable {
        ValueTable::new(&ExiOptions::default().with_value_partition_capacity(cap))
    }

    #[test]
    fn add_and_lookup() {
        let mut t = table();
        t.add(Q, "hello".into());
        let info = t.get("hello").unwrap();
        assert_eq!(info.owner, Some(Q));
        assert_eq!(info.global_id, 0);
        assert_eq!(info.local_id, 0);
        assert!(t.get("other").is_none());

        t.add(Q2, "hello".into());
        assert_eq!(t.get("hello").unwrap().owner, Some(Q), "Duplikat-Add ist No-op");
    }

    /// Spec 7.3.3: FIFO-Verdraengung bei valuePartitionCapacity, der
    /// verdraengte Wert verschwindet auch lokal.
    #[test]
    fn bounded_global_partition_sequence() {
        let mut t = bounded(3);
        t.add(Q, "1".into());
        t.add(Q, "12".into());
        t.add(Q, "123".into());
        assert_eq!(t.get("1").unwrap().global_id, 0);
        assert_eq!(t.get("123").unwrap().global_id, 2);

        // Kapazitaet erreicht: "1234" verdraengt "1" (FIFO, Slot 0)
        t.add(Q, "1234".into());
        assert!(t.get("1").is_none());
        assert_eq!(t.get("1234").unwrap().global_id, 0);

        // "1" neu: verdraengt "12" (Slot 1), bekommt frische lokale Id
        t.add(Q, "1".into());
        assert!(t.get("12").is_none());
        assert_eq!(t.get("1").unwrap().global_id, 1);
        assert_eq!(t.get("1").unwrap().local_id, 4);
        assert!(t.get("123").is_some());
        assert!(t.get("1234").is_some());
    }

    /// Lokale Ids werden nie wiederverwendet; die Breite basiert auf
    /// der Zahl je hinzugefuegter Werte.
    #[test]
    fn local_width_is_monotone() {
        let mut t = bounded(1);
        t.add(Q, "a".into());
        t.add(Q, "b".into()); // verdraengt "a" auch lokal
        t.add(Q, "c".into());
        assert_eq!(t.local_width(Q), 2, "3 je hinzugefuegt -> 2 Bits");
        assert!(t.local_value(Q, 0).is_err(), "Loch");
        assert_eq!(&*t.local_value(Q, 2).unwrap(), "c");
    }

    /// valueMaxLength: ueberlange Literale umgehen die Tabelle.
    #[test]
    fn value_max_length_bypass() {
        let opts = ExiOptions::default().with_value_max_length(3);
        let mut t = ValueTable::new(&opts);
        assert!(t.should_add("abc"));
        assert!(!t.should_add("abcd"));
        assert!(!t.should_add(""));

        let mut c = EncoderChannel::new(false);
        t.encode_value(&mut c, Q, "abcd").unwrap();
        assert!(t.get("abcd").is_none());
    }

    /// Spec 7.3.3: Miss = Laenge+2, danach Hits lokal (0) und global (1).
    #[test]
    fn envelope_round_trip() {
        let mut enc = table();
        let mut c = EncoderChannel::new(false);
        enc.encode_value(&mut c, Q, "val").unwrap(); // Miss: 5, 'v','a','l'
        enc.encode_value(&mut c, Q, "val").unwrap(); // lokaler Hit
        enc.encode_value(&mut c, Q2, "val").unwrap(); // globaler Hit

        let bytes = c.into_vec();
        assert_eq!(bytes[0], 5, "Laenge 3 + Offset 2");

        let mut dec = table();
        let mut d = DecoderChannel::new(bytes, false);
        assert_eq!(&*dec.decode_value(&mut d, Q).unwrap(), "val");
        assert_eq!(&*dec.decode_value(&mut d, Q).unwrap(), "val");
        assert_eq!(&*dec.decode_value(&mut d, Q2).unwrap(), "val");
    }

    #[test]
    fn shared_strings_preload_global() {
        let opts = ExiOptions::default()
            .with_shared_strings(vec!["alpha".into(), "beta".into()]);
        let mut enc = ValueTable::new(&opts);
        let mut c = EncoderChannel::new(false);
        enc.encode_value(&mut c, Q, "beta").unwrap();

        let bytes = c.into_vec();
        assert_eq!(bytes[0], 1, "globaler Hit");

        let mut dec = ValueTable::new(&opts);
        let mut d = DecoderChannel::new(bytes, false);
        assert_eq!(&*dec.decode_value(&mut d, Q).unwrap(), "beta");
    }

    /// Extended String: Grammar-Strings-Treffer hinter Diskriminator 2.
    #[test]
    fn extended_string_grammar_strings() {
        let strings: Vec<Rc<str>> = vec!["on".into(), "off".into()];
        let mut enc = table();
        let mut c = EncoderChannel::new(false);
        enc.encode_value_extended(&mut c, Q, "off", Some(&strings)).unwrap();
        enc.encode_value_extended(&mut c, Q, "other", Some(&strings)).unwrap();

        let mut dec = table();
        let mut d = DecoderChannel::new(c.into_vec(), false);
        assert_eq!(&*dec.decode_value_extended(&mut d, Q, Some(&strings)).unwrap(), "off");
        assert_eq!(&*dec.decode_value_extended(&mut d, Q, Some(&strings)).unwrap(), "other");
    }

    /// Diskriminatoren 3..5 sind reserviert und fuehren zum Fehler.
    #[test]
    fn extended_string_reserved_discriminators() {
        for disc in 3..=5u64 {
            let mut c = EncoderChannel::new(false);
            unsigned_integer::encode(&mut c, disc);
            let mut dec = table();
            let mut d = DecoderChannel::new(c.into_vec(), false);
            assert_eq!(
                dec.decode_value_extended(&mut d, Q, None).unwrap_err(),
                Error::UnsupportedExtendedString(disc)
            );
        }
    }

    /// Extended-Literal traegt Offset 6 und landet in der Tabelle.
    #[test]
    fn extended_string_literal_offset() {
        let mut enc = table();
        let mut c = EncoderChannel::new(false);
        enc.encode_value_extended(&mut c, Q, "ab", None).unwrap();
        let bytes = c.into_vec();
        assert_eq!(bytes[0], 8, "Laenge 2 + Offset 6");
        assert!(enc.get("ab").is_some());
    }

    /// Encoder und Decoder wachsen identisch (Breiten nach Eviction).
    #[test]
    fn both_sides_evolve_identically() {
        let opts = ExiOptions::default().with_value_partition_capacity(2);
        let mut enc = ValueTable::new(&opts);
        let mut c = EncoderChannel::new(false);
        for v in ["a", "b", "c", "a", "c", "c"] {
            enc.encode_value(&mut c, Q, v).unwrap();
        }
        let mut dec = ValueTable::new(&opts);
        let mut d = DecoderChannel::new(c.into_vec(), false);
        let out: Vec<String> = (0..6)
            .map(|_| dec.decode_value(&mut d, Q).unwrap().to_string())
            .collect();
        assert_eq!(out, ["a", "b", "c", "a", "c", "c"]);
    }
}
