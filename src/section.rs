//! Byte sections: a length followed by either Huffman-coded or raw bytes.
//!
//! Short sections do not pay for a code-length table and are stored as plain
//! 8-bit values. The cutoff is [`CodecConfig::huffman_threshold`].

use tracing::debug;

use crate::{
    bitstreams::{BitReader, BitWriter},
    config::CodecConfig,
    error::{CodecError, Result},
    huffman::{decoder::HuffmanDecoder, encoder::HuffmanEncoder},
};

/// Alphabet of a byte section.
pub const BYTE_SYMS: usize = 256;

/// What [`write_section`] spent on a section.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SectionSummary {
    pub symbols: usize,
    /// Bits spent on the code-length table; zero for raw sections.
    pub table_bits: u32,
    /// Bits spent on the bytes themselves.
    pub data_bits: u64,
}

impl SectionSummary {
    pub fn is_huffman(&self) -> bool {
        self.table_bits > 0
    }
}

fn histogram(data: &[u8]) -> [u32; BYTE_SYMS] {
    let mut freqs = [0u32; BYTE_SYMS];
    for &byte in data.iter() {
        freqs[byte as usize] += 1;
    }
    freqs
}

pub fn write_section(data: &[u8], config: &CodecConfig, writer: &mut BitWriter) -> Result<SectionSummary> {
    let symbols = u32::try_from(data.len())
        .map_err(|_| CodecError::invalid(format!("section of {} bytes is too long", data.len())))?;

    if data.len() > config.max_symbols {
        return Err(CodecError::invalid(format!(
            "section of {} bytes above the limit of {}",
            data.len(),
            config.max_symbols
        )));
    }

    writer.write9(symbols);

    let mut summary = SectionSummary { symbols: data.len(), ..Default::default() };

    if data.len() >= config.huffman_threshold {
        let encoder = HuffmanEncoder::new(&histogram(data))?;

        summary.table_bits = encoder.write_table(writer)?;

        for &byte in data.iter() {
            summary.data_bits += encoder.write_symbol(byte as u16, writer) as u64;
        }
    } else {
        for &byte in data.iter() {
            summary.data_bits += writer.write_bits(byte as u32, 8) as u64;
        }
    }

    debug!(
        symbols = summary.symbols,
        table_bits = summary.table_bits,
        data_bits = summary.data_bits,
        "wrote section"
    );

    Ok(summary)
}

pub fn read_section(reader: &mut BitReader, config: &CodecConfig) -> Result<Vec<u8>> {
    let symbols = reader.read9() as usize;

    if reader.overrun() {
        return Err(CodecError::header("section length runs past the end of the input"));
    }

    // Single-symbol codes spend no bits per symbol, so the length alone bounds the output.
    if symbols > config.max_symbols {
        return Err(CodecError::header(format!(
            "section announces {symbols} symbols, the limit is {}",
            config.max_symbols
        )));
    }

    let mut data = Vec::with_capacity(symbols.min(reader.total_bits()));

    if symbols >= config.huffman_threshold {
        let decoder = HuffmanDecoder::read_table(reader, BYTE_SYMS, config.table_bits)?;

        for _ in 0..symbols {
            data.push(decoder.next(reader)? as u8);
        }
    } else {
        for _ in 0..symbols {
            data.push(reader.read_bits(8) as u8);
        }

        if reader.overrun() {
            return Err(CodecError::CorruptStream { position: reader.position() });
        }
    }

    debug!(symbols, position = reader.position(), "read section");

    Ok(data)
}
