pub mod table;
pub mod decoder;
pub mod encoder;
pub mod meta;

use crate::error::{CodecError, Result};

/// Longest code any symbol may be assigned.
pub const MAX_CODE_SIZE: usize = 16;
/// Widest direct lookup table a decoder may build.
pub const MAX_TABLE_BITS: u32 = 11;
pub const MAX_SUPPORTED_SYMS: usize = 4096;
/// Length tables of at most this many symbols, after shaving, are sent directly.
pub const TABLE_THRESH: usize = 20;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct HuffmanSymbolInfo {
    pub nbits: u8,
    pub bits: u32,
}

pub trait Huffman {
    /// For a given array of HuffmanSymbolInfo, where only the `nbits` field is
    /// set, fill up the `bits` field by building a canonical Huffman code.
    ///
    /// Codes go out by increasing length, ties broken by symbol index.
    fn compute_symbol_bits(info: &mut [HuffmanSymbolInfo]) {
        let mut syms = info
            .iter()
            .enumerate()
            .filter(|(_, inf)| inf.nbits > 0)
            .map(|(i, inf)| (inf.nbits, i))
            .collect::<Vec<_>>();

        syms.sort();

        let mut x = 0u32;

        for (s, &(nbits, sym)) in syms.iter().enumerate() {
            info[sym].bits = x;
            x += 1;
            if s + 1 != syms.len() {
                x <<= syms[s + 1].0 - nbits;
            }
        }
    }
}

/// Counts symbols per code length, rejecting lengths over [`MAX_CODE_SIZE`]
/// and arrays that oversubscribe the code space.
pub(crate) fn length_histogram(code_lens: &[u8]) -> Result<[u32; MAX_CODE_SIZE + 1]> {
    let mut num_codes = [0u32; MAX_CODE_SIZE + 1];

    for (sym, &len) in code_lens.iter().enumerate() {
        if len as usize > MAX_CODE_SIZE {
            return Err(CodecError::invalid(format!(
                "symbol {sym} has code length {len}, the maximum is {MAX_CODE_SIZE}"
            )));
        }
        num_codes[len as usize] += 1;
    }

    // Sum of 2^(MAX - len) must not exceed 2^MAX.
    let kraft: u64 = (1..=MAX_CODE_SIZE)
        .map(|len| (num_codes[len] as u64) << (MAX_CODE_SIZE - len))
        .sum();

    if kraft > 1 << MAX_CODE_SIZE {
        return Err(CodecError::invalid("code lengths oversubscribe the code space"));
    }

    Ok(num_codes)
}

pub(crate) fn check_alphabet_size(count: usize) -> Result<()> {
    if count == 0 || count > MAX_SUPPORTED_SYMS {
        return Err(CodecError::invalid(format!(
            "alphabet size {count} outside 1..={MAX_SUPPORTED_SYMS}"
        )));
    }
    Ok(())
}
