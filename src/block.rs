//! Channels und Blocks fuer die channelized Alignments (Spec 9).
//!
//! In Pre-Compression und Compression wird der Event-Strom in Bloecke
//! partitioniert (Spec 9.1): ein Structure Channel traegt Event-Codes
//! und Struktur-Content, je ein Value Channel pro QName die AT/CH-Werte
//! (Spec 9.2). Beim Blockende werden die Channels zu Streams gebuendelt
//! (Spec 9.3) und im Compression-Modus einzeln mit DEFLATE (RFC 1951,
//! roh ohne zlib-Header) komprimiert.
//!
//! Werte werden erst beim Block-Flush serialisiert, nicht beim Event:
//! die String-Tabelle muss auf beiden Seiten in Channel-Reihenfolge
//! wachsen, und der Decoder liest die Channels nun mal nacheinander.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::channel::EncoderChannel;
use crate::context::QNameId;
use crate::options::ExiOptions;
use crate::string_table::ValueTable;
use crate::typed_coder::{EncodedValue, TypeEncoder};
use crate::{Error, FastIndexMap, Result};

/// Spec 9.3: Channels mit hoechstens so vielen Werten werden zu einem
/// Stream kombiniert.
pub const MAX_COMBINED_VALUES: usize = 100;

/// Ein Block: Structure Channel plus aufgeschobene Werte pro QName in
/// der Reihenfolge des ersten Auftretens (Spec 9.1, 9.2).
#[derive(Debug)]
pub struct Block {
    structure: EncoderChannel,
    channels: FastIndexMap<QNameId, Vec<EncodedValue>>,
    value_count: usize,
}

impl Block {
    pub fn new() -> Self {
        // Channelized Alignments sind immer byte-aligned (Spec 9)
        Self {
            structure: EncoderChannel::new(true),
            channels: FastIndexMap::default(),
            value_count: 0,
        }
    }

    pub fn structure(&mut self) -> &mut EncoderChannel {
        &mut self.structure
    }

    /// Stellt einen Wert in den Channel seines QNames zurueck
    /// (Spec 9.2.2); serialisiert wird beim Flush.
    pub fn push_value(&mut self, qname: QNameId, value: EncodedValue) {
        self.channels.entry(qname).or_default().push(value);
        self.value_count += 1;
    }

    pub fn value_count(&self) -> usize {
        self.value_count
    }

    /// Spec 9.1: jeder Block ausser dem letzten traegt genau
    /// `block_size` Werte.
    pub fn is_full(&self, block_size: u32) -> bool {
        self.value_count >= block_size as usize
    }

    /// Serialisiert die Channels und buendelt sie zu Streams (Spec 9.3).
    ///
    /// <= 100 Werte: ein kombinierter Stream (Structure, dann Channels).
    /// > 100 Werte: Structure allein, dann die kleinen Channels
    /// (<= 100 Werte) kombiniert, dann jeder grosse Channel einzeln —
    /// alles in der Reihenfolge des ersten Auftretens. Leere Streams
    /// werden uebersprungen. Die Tabelle waechst hier, in
    /// Channel-Reihenfolge.
    pub fn into_streams(
        self,
        encoder: &TypeEncoder,
        tables: &mut ValueTable,
    ) -> Result<Vec<Vec<u8>>> {
        let mut streams = Vec::new();
        let structure = self.structure.into_vec();

        let mut serialized: Vec<(usize, Vec<u8>)> = Vec::with_capacity(self.channels.len());
        for (qname, values) in self.channels {
            let mut channel = EncoderChannel::new(true);
            let count = values.len();
            for value in &values {
                encoder.write(value, qname, &mut channel, tables)?;
            }
            serialized.push((count, channel.into_vec()));
        }

        if self.value_count <= MAX_COMBINED_VALUES {
            let mut combined = structure;
            for (_, bytes) in serialized {
                combined.extend_from_slice(&bytes);
            }
            streams.push(combined);
        } else {
            streams.push(structure);
            let mut small = Vec::new();
            let mut large = Vec::new();
            for (count, bytes) in serialized {
                if count <= MAX_COMBINED_VALUES {
                    small.extend_from_slice(&bytes);
                } else {
                    large.push(bytes);
                }
            }
            streams.push(small);
            streams.extend(large);
        }

        streams.retain(|s| !s.is_empty());
        Ok(streams)
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

/// Write side of the channelized body (Spec 9.3).
///
/// Die Compress-Instanz wird ueber alle Streams wiederverwendet
/// (`reset` zwischen den Streams), das spart die internen
/// zlib-Strukturen pro Stream.
#[derive(Debug)]
pub struct BlockWriter {
    deflate: bool,
    compressor: Compress,
    out: Vec<u8>,
}

impl BlockWriter {
    pub fn new(options: &ExiOptions) -> Self {
        let level = match options.compression_level() {
            Some(l) => Compression::new(l),
            None => Compression::default(),
        };
        Self {
            deflate: options.coding_mode().deflate(),
            // false = raw DEFLATE (RFC 1951), kein zlib-Header
            compressor: Compress::new(level, false),
            out: Vec::new(),
        }
    }

    /// Serialisiert und schreibt alle Streams eines fertigen Blocks.
    pub fn flush_block(
        &mut self,
        block: Block,
        encoder: &TypeEncoder,
        tables: &mut ValueTable,
    ) -> Result<()> {
        let streams = block.into_streams(encoder, tables)?;
        log::debug!("block flushed: {} streams", streams.len());
        for stream in streams {
            if self.deflate {
                let compressed = deflate_compress(&stream, &mut self.compressor)?;
                self.out.extend_from_slice(&compressed);
            } else {
                self.out.extend_from_slice(&stream);
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Vec<u8> {
        self.out
    }
}

/// Read side: liefert die dekomprimierten Streams der Reihe nach.
///
/// Nur fuer den Compression-Modus; Pre-Compression hat keine
/// Stream-Grenzen im Draht und wird als ein fortlaufender Byte-Strom
/// decodiert.
#[derive(Debug)]
pub struct BlockReader {
    data: Vec<u8>,
    offset: usize,
    decompressor: Decompress,
}

impl BlockReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, offset: 0, decompressor: Decompress::new(false) }
    }

    pub fn has_more(&self) -> bool {
        self.offset < self.data.len()
    }

    /// Dekomprimiert den naechsten DEFLATE-Stream (Spec 9.3). Die
    /// Stream-Grenze ergibt sich aus dem DEFLATE-Ende selbst.
    pub fn next_stream(&mut self) -> Result<Vec<u8>> {
        if !self.has_more() {
            return Err(Error::PrematureEndOfStream);
        }
        let (stream, consumed) =
            deflate_decompress(&self.data[self.offset..], &mut self.decompressor)?;
        self.offset += consumed;
        Ok(stream)
    }
}

/// Raw-DEFLATE-Kompression mit wiederverwendeter Compress-Instanz.
pub fn deflate_compress(data: &[u8], compressor: &mut Compress) -> Result<Vec<u8>> {
    compressor.reset();
    let mut output = Vec::with_capacity(data.len() / 2 + 64);
    let mut offset = 0;
    loop {
        let mut buf = [0u8; 8192];
        let before_in = compressor.total_in() as usize;
        let before_out = compressor.total_out() as usize;

        let flush =
            if offset >= data.len() { FlushCompress::Finish } else { FlushCompress::None };
        let status = compressor
            .compress(&data[offset..], &mut buf, flush)
            .map_err(|e| Error::CompressionError(format!("deflate failed: {e}")))?;

        let consumed = (compressor.total_in() as usize).saturating_sub(before_in);
        let produced = (compressor.total_out() as usize).saturating_sub(before_out);
        offset += consumed;
        output.extend_from_slice(&buf[..produced]);

        match status {
            Status::StreamEnd => return Ok(output),
            Status::Ok | Status::BufError => {
                if consumed == 0 && produced == 0 && offset >= data.len() {
                    return Err(Error::CompressionError("deflate stalled".into()));
                }
            }
        }
    }
}

/// Raw-DEFLATE-Dekompression; liefert (Daten, verbrauchte Input-Bytes).
///
/// Die verbrauchten Bytes markieren die Stream-Grenze fuer den
/// naechsten Stream im Block (Spec 9.3).
pub fn deflate_decompress(data: &[u8], decompressor: &mut Decompress) -> Result<(Vec<u8>, usize)> {
    decompressor.reset(false);
    let mut output = Vec::new();
    let mut offset = 0;
    loop {
        let mut buf = [0u8; 8192];
        let before_in = decompressor.total_in() as usize;
        let before_out = decompressor.total_out() as usize;

        let flush =
            if offset >= data.len() { FlushDecompress::Finish } else { FlushDecompress::None };
        let status = decompressor
            .decompress(&data[offset..], &mut buf, flush)
            .map_err(|e| Error::DecompressionError(format!("inflate failed: {e}")))?;

        let consumed = (decompressor.total_in() as usize).saturating_sub(before_in);
        let produced = (decompressor.total_out() as usize).saturating_sub(before_out);
        offset += consumed;
        output.extend_from_slice(&buf[..produced]);

        match status {
            Status::StreamEnd => return Ok((output, offset)),
            Status::Ok | Status::BufError => {
                if consumed == 0 && produced == 0 {
                    return Err(Error::DecompressionError(
                        "inflate stalled before stream end".into(),
                    ));
                }
            }
        }
    }
}
