use crate::{
    bitstreams::BitReader,
    error::{CodecError, Result},
};

use super::{meta::read_code_lengths, table::CanonicalCodeTable, MAX_CODE_SIZE};

#[derive(Clone, Debug)]
pub struct HuffmanDecoder {
    table: CanonicalCodeTable,
}

impl HuffmanDecoder {
    pub fn from_code_lengths(code_lens: &[u8], table_bits: u32) -> Result<Self> {
        Ok(Self {
            table: CanonicalCodeTable::build(code_lens, table_bits)?,
        })
    }

    /// Reads a transmitted code-length table for an alphabet of `num_syms`
    /// symbols and builds its decoder.
    pub fn read_table(reader: &mut BitReader, num_syms: usize, table_bits: u32) -> Result<Self> {
        let code_lens = read_code_lengths(reader, num_syms)?;

        let table = CanonicalCodeTable::build(&code_lens, table_bits)
            .map_err(|e| CodecError::header(format!("outer table: {e}")))?;

        Ok(Self { table })
    }

    /// Replaces the current table. On failure the previous table stays in place.
    pub fn rebuild(&mut self, code_lens: &[u8], table_bits: u32) -> Result<()> {
        self.table = CanonicalCodeTable::build(code_lens, table_bits)?;
        Ok(())
    }

    /// Decodes one symbol, consuming exactly its code length.
    #[inline(always)]
    pub fn next(&self, reader: &mut BitReader) -> Result<u16> {
        if let Some(sym) = self.table.one_symbol() {
            return Ok(sym);
        }

        let code = reader.peek(MAX_CODE_SIZE as u32);

        let entry = self
            .table
            .resolve(code)
            .ok_or(CodecError::CorruptStream { position: reader.position() })?;

        reader.eat(entry.len as u32);

        if reader.overrun() {
            return Err(CodecError::CorruptStream { position: reader.position() });
        }

        Ok(entry.symbol)
    }

    pub fn table(&self) -> &CanonicalCodeTable {
        &self.table
    }
}
