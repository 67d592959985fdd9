use std::mem::take;

use crate::{
    bitstreams::BitWriter,
    error::{CodecError, Result},
};

use super::{
    check_alphabet_size, length_histogram, meta::write_code_lengths, Huffman, HuffmanSymbolInfo,
    MAX_CODE_SIZE,
};

#[derive(Clone, Debug)]
pub struct HuffmanEncoder {
    info: Vec<HuffmanSymbolInfo>,
    used_syms: usize,
}

impl Huffman for HuffmanEncoder {}

impl HuffmanEncoder {
    /// Derives a length-limited code from per-symbol frequencies.
    pub fn new(freqs: &[u32]) -> Result<Self> {
        check_alphabet_size(freqs.len())?;

        if freqs.iter().all(|&f| f == 0) {
            return Err(CodecError::invalid("every symbol frequency is zero"));
        }

        let code_lens = Self::compute_symbol_num_bits(freqs, MAX_CODE_SIZE);
        Self::from_code_lengths(&code_lens)
    }

    pub fn from_code_lengths(code_lens: &[u8]) -> Result<Self> {
        check_alphabet_size(code_lens.len())?;
        length_histogram(code_lens)?;

        let used_syms = code_lens.iter().filter(|&&len| len > 0).count();
        if used_syms == 0 {
            return Err(CodecError::invalid("every code length is zero"));
        }

        let mut info = code_lens
            .iter()
            .map(|&nbits| HuffmanSymbolInfo { nbits, bits: 0 })
            .collect::<Vec<_>>();

        HuffmanEncoder::compute_symbol_bits(&mut info);

        Ok(Self { info, used_syms })
    }

    /// Computes the optimal number of bits for each symbol given the input
    /// distribution, never exceeding `max_bits`. Uses a (quadratic version) of
    /// the package-merge/coin-collector algorithm.
    fn compute_symbol_num_bits(histo: &[u32], max_bits: usize) -> Vec<u8> {
        let mut nbits = vec![0u8; histo.len()];

        let present = histo
            .iter()
            .enumerate()
            .filter(|&(_, &freq)| freq > 0)
            .map(|(s, _)| s)
            .collect::<Vec<_>>();

        if present.len() <= 1 {
            for &s in present.iter() {
                nbits[s] = 1;
            }
            return nbits;
        }

        // Create a list of symbols for any given cost.
        let leaves = present
            .iter()
            .map(|&s| (histo[s] as u64, vec![s as u16]))
            .collect::<Vec<_>>();
        let mut bags = vec![leaves; max_bits];

        // Pair up symbols (or groups of symbols) of a given bit-length to create
        // symbols of the following bit-length, creating pairs by merging (groups of)
        // symbols consecutively in increasing order of cost.
        for i in 0..(max_bits - 1) {
            bags[i].sort();

            let mut j = 0;
            while j + 1 < bags[i].len() {
                let nf = bags[i][j].0 + bags[i][j + 1].0;

                let mut nsym = take(&mut bags[i][j].1);
                nsym.extend_from_slice(&bags[i][j + 1].1);

                bags[i + 1].push((nf, nsym));

                j += 2;
            }
        }
        bags[max_bits - 1].sort();

        // In the groups of symbols for the highest bit length we need to select the
        // cheapest 2*num_symbols-2 groups, and assign to each symbol one bit of cost for
        // each of its occurrences in these groups.
        for (_, syms) in bags[max_bits - 1].iter().take(2 * present.len() - 2) {
            for &s in syms.iter() {
                nbits[s as usize] += 1;
            }
        }

        // In a properly-constructed set of lengths for a set of symbols, the sum
        // across the symbols of 2^-sym_length equals 1.
        let cost_check: u64 = present.iter().map(|&s| 1u64 << (max_bits - nbits[s] as usize)).sum();
        assert_eq!(cost_check, 1 << max_bits);

        nbits
    }

    pub fn num_symbols(&self) -> usize {
        self.info.len()
    }

    pub fn used_symbols(&self) -> usize {
        self.used_syms
    }

    pub fn code_lengths(&self) -> Vec<u8> {
        self.info.iter().map(|inf| inf.nbits).collect()
    }

    fn symbol_info(&self, symbol: u16) -> &HuffmanSymbolInfo {
        match self.info.get(symbol as usize) {
            Some(inf) if inf.nbits > 0 => inf,
            _ => panic!("Symbol {symbol} has no code"),
        }
    }

    /// Bits [`write_symbol`](Self::write_symbol) spends on `symbol`.
    pub fn symbol_cost(&self, symbol: u16) -> u32 {
        let inf = self.symbol_info(symbol);

        if self.used_syms <= 1 {
            0
        } else {
            inf.nbits as u32
        }
    }

    /// Emits the code of `symbol` and returns its length. A code with a single
    /// used symbol costs zero bits, as the decoder reads nothing for it.
    #[inline(always)]
    pub fn write_symbol(&self, symbol: u16, writer: &mut BitWriter) -> u32 {
        let inf = self.symbol_info(symbol);

        if self.used_syms <= 1 {
            return 0;
        }

        writer.write_bits(inf.bits, inf.nbits as u32)
    }

    /// Serializes the code-length table and returns the bits it took.
    pub fn write_table(&self, writer: &mut BitWriter) -> Result<u32> {
        write_code_lengths(&self.code_lengths(), writer)
    }
}
