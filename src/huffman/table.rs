use tracing::debug;

use crate::error::{CodecError, Result};

use super::{check_alphabet_size, length_histogram, MAX_CODE_SIZE, MAX_TABLE_BITS};

/// A symbol resolved from the head of the bit stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookupEntry {
    pub symbol: u16,
    pub len: u8,
}

/// Decoding data for a canonical code, rebuilt wholesale from a code-length array.
///
/// Codes whose length fits in `table_bits` resolve with one lookup; longer
/// ones fall back to a scan over the per-length code ranges.
#[derive(Clone, Debug)]
pub struct CanonicalCodeTable {
    num_syms: usize,
    used_syms: usize,
    /// Set when at most one symbol is used: decoding yields it without reading.
    one_sym: Option<u16>,
    /// Used symbols by increasing code length, then by symbol index.
    sorted_symbol_order: Vec<u16>,
    min_code_size: u32,
    max_code_size: u32,
    /// Last code of each length, left-justified to 16 bits, plus one. Zero for unused lengths.
    max_codes: [u32; MAX_CODE_SIZE],
    /// Offset into `sorted_symbol_order` minus the first code of each length.
    val_ptrs: [i32; MAX_CODE_SIZE],
    table_bits: u32,
    lookup: Vec<Option<LookupEntry>>,
    table_max_code: u32,
    decode_start_code_size: u32,
}

impl CanonicalCodeTable {
    pub fn build(code_lens: &[u8], table_bits: u32) -> Result<Self> {
        check_alphabet_size(code_lens.len())?;

        if table_bits > MAX_TABLE_BITS {
            return Err(CodecError::invalid(format!(
                "table width {table_bits} above the maximum of {MAX_TABLE_BITS}"
            )));
        }

        let num_codes = length_histogram(code_lens)?;

        let mut min_codes = [0u32; MAX_CODE_SIZE];
        let mut max_codes = [0u32; MAX_CODE_SIZE];
        let mut val_ptrs = [0i32; MAX_CODE_SIZE];
        let mut sorted_positions = [0usize; MAX_CODE_SIZE + 1];

        let mut next_code = 0u32;
        let mut total_used_syms = 0usize;
        let mut min_code_size = u32::MAX;
        let mut max_code_size = 0u32;

        for len in 1..=MAX_CODE_SIZE {
            let n = num_codes[len];

            if n > 0 {
                min_code_size = min_code_size.min(len as u32);
                max_code_size = max_code_size.max(len as u32);

                min_codes[len - 1] = next_code;

                let last_code = next_code + n - 1;
                let pad = MAX_CODE_SIZE - len;
                max_codes[len - 1] = 1 + ((last_code << pad) | ((1 << pad) - 1));

                val_ptrs[len - 1] = total_used_syms as i32;
                sorted_positions[len] = total_used_syms;

                next_code += n;
                total_used_syms += n as usize;
            }

            next_code <<= 1;
        }

        if total_used_syms == 0 {
            return Err(CodecError::invalid("every code length is zero"));
        }

        if total_used_syms == 1 {
            let one_sym = code_lens.iter().position(|&len| len > 0).map(|sym| sym as u16);

            debug!(num_syms = code_lens.len(), symbol = ?one_sym, "single-symbol code");

            return Ok(Self {
                num_syms: code_lens.len(),
                used_syms: 1,
                one_sym,
                sorted_symbol_order: Vec::new(),
                min_code_size,
                max_code_size,
                max_codes,
                val_ptrs,
                table_bits: 0,
                lookup: Vec::new(),
                table_max_code: 0,
                decode_start_code_size: min_code_size,
            });
        }

        let mut sorted_symbol_order = vec![0u16; total_used_syms];

        for (sym, &len) in code_lens.iter().enumerate() {
            if len > 0 {
                let spos = &mut sorted_positions[len as usize];
                sorted_symbol_order[*spos] = sym as u16;
                *spos += 1;
            }
        }

        // A table no wider than the shortest code cannot skip the scan.
        let table_bits = if table_bits <= min_code_size { 0 } else { table_bits };

        let mut lookup = Vec::new();

        if table_bits > 0 {
            lookup = vec![None; 1 << table_bits];

            for codesize in 1..=table_bits as usize {
                let n = num_codes[codesize];
                if n == 0 {
                    continue;
                }

                let fillsize = table_bits as usize - codesize;
                let min_code = min_codes[codesize - 1];
                let val_ptr = val_ptrs[codesize - 1] as usize;

                for code in min_code..min_code + n {
                    let entry = LookupEntry {
                        symbol: sorted_symbol_order[val_ptr + (code - min_code) as usize],
                        len: codesize as u8,
                    };

                    let first = (code as usize) << fillsize;
                    lookup[first..first + (1 << fillsize)].fill(Some(entry));
                }
            }
        }

        for (val_ptr, &min_code) in val_ptrs.iter_mut().zip(min_codes.iter()) {
            *val_ptr -= min_code as i32;
        }

        let mut table_max_code = 0;
        let mut decode_start_code_size = min_code_size;

        if table_bits > 0 {
            if let Some(len) = (1..=table_bits).rev().find(|&len| num_codes[len as usize] > 0) {
                table_max_code = max_codes[len as usize - 1];

                decode_start_code_size = (table_bits + 1..=max_code_size)
                    .find(|&len| num_codes[len as usize] > 0)
                    .unwrap_or(table_bits + 1);
            }
        }

        debug!(
            num_syms = code_lens.len(),
            used_syms = total_used_syms,
            min_code_size,
            max_code_size,
            table_bits,
            "built canonical code table"
        );

        Ok(Self {
            num_syms: code_lens.len(),
            used_syms: total_used_syms,
            one_sym: None,
            sorted_symbol_order,
            min_code_size,
            max_code_size,
            max_codes,
            val_ptrs,
            table_bits,
            lookup,
            table_max_code,
            decode_start_code_size,
        })
    }

    /// Resolves the symbol whose code starts the 16 bits `code`, most
    /// significant bit first. `None` means no code of this table matches.
    #[inline(always)]
    pub fn resolve(&self, code: u32) -> Option<LookupEntry> {
        debug_assert!(code >> MAX_CODE_SIZE == 0);

        let k = code + 1;

        if k <= self.table_max_code {
            return self.lookup[(code >> (MAX_CODE_SIZE as u32 - self.table_bits)) as usize];
        }

        let mut len = self.decode_start_code_size as usize;

        while len <= MAX_CODE_SIZE && k > self.max_codes[len - 1] {
            len += 1;
        }

        if len > MAX_CODE_SIZE {
            return None;
        }

        let index = self.val_ptrs[len - 1] as i64 + (code >> (MAX_CODE_SIZE - len)) as i64;
        let symbol = usize::try_from(index)
            .ok()
            .and_then(|index| self.sorted_symbol_order.get(index))
            .copied()?;

        Some(LookupEntry { symbol, len: len as u8 })
    }

    pub fn num_symbols(&self) -> usize {
        self.num_syms
    }

    pub fn used_symbols(&self) -> usize {
        self.used_syms
    }

    pub fn one_symbol(&self) -> Option<u16> {
        self.one_sym
    }

    pub fn sorted_symbols(&self) -> &[u16] {
        &self.sorted_symbol_order
    }

    /// Width of the direct lookup table; zero when it was disabled.
    pub fn table_bits(&self) -> u32 {
        self.table_bits
    }

    pub fn min_code_size(&self) -> u32 {
        self.min_code_size
    }

    pub fn max_code_size(&self) -> u32 {
        self.max_code_size
    }
}
