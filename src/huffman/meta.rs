//! Transmission of code-length tables.
//!
//! A length table starts with a shave flag: when a suffix of the alphabet is
//! unused only the leading `shaved` lengths are sent. Short tables then carry
//! each length in 4 bits (15 escapes to one more bit, reaching 15 or 16).
//! Longer tables are coded with a second Huffman code over the 17 possible
//! lengths, after a predictor has turned each length into a residual modulo 17.
//! Runs of zero residuals use an escalating 3/3/5-bit run-length escape.

use tracing::{debug, trace};

use crate::{
    bitstreams::{BitReader, BitWriter},
    error::{CodecError, Result},
};

use super::{
    decoder::HuffmanDecoder, encoder::HuffmanEncoder, MAX_CODE_SIZE, MAX_SUPPORTED_SYMS,
    TABLE_THRESH,
};

/// Size of the meta alphabet: one symbol per code length 0..=16.
pub const META_SYMS: usize = MAX_CODE_SIZE + 1;
pub const META_TABLE_BITS: u32 = 8;

/// Number of leading lengths [`Predictor::RoundedWarmup`] predicts.
const PREDICTOR_WARMUP: usize = 32;

const RUN_SHORT_BITS: u32 = 3;
const RUN_SHORT_MAX: u32 = (1 << RUN_SHORT_BITS) - 1;
const RUN_LONG_BITS: u32 = 5;
const RUN_LONG_MAX: u32 = (1 << RUN_LONG_BITS) - 1;

/// How a length is predicted from the two previously emitted ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Predictor {
    /// Lengths are sent as they are.
    Raw,
    /// Rounded mean of the two previous lengths for the first 32 symbols, nothing after.
    RoundedWarmup,
    /// Rounded mean of the two previous lengths.
    Rounded,
    /// Truncated mean of the two previous lengths.
    Floor,
}

impl Predictor {
    pub const ALL: [Predictor; 4] = [
        Predictor::Raw,
        Predictor::RoundedWarmup,
        Predictor::Rounded,
        Predictor::Floor,
    ];

    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Predictor::Raw,
            1 => Predictor::RoundedWarmup,
            2 => Predictor::Rounded,
            _ => Predictor::Floor,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Predictor::Raw => 0,
            Predictor::RoundedWarmup => 1,
            Predictor::Rounded => 2,
            Predictor::Floor => 3,
        }
    }

    fn predict(self, index: usize, lag0: u32, lag1: u32) -> u32 {
        match self {
            Predictor::Raw => 0,
            Predictor::RoundedWarmup if index >= PREDICTOR_WARMUP => 0,
            Predictor::RoundedWarmup | Predictor::Rounded => (lag0 + lag1 + 1) >> 1,
            Predictor::Floor => (lag0 + lag1) >> 1,
        }
    }
}

/// Running predictor state over one length table.
struct LengthPredictor {
    method: Predictor,
    index: usize,
    lag0: u32,
    lag1: u32,
}

impl LengthPredictor {
    fn new(method: Predictor) -> Self {
        Self { method, index: 0, lag0: 1, lag1: 1 }
    }

    fn push(&mut self, len: u32) {
        self.lag1 = self.lag0;
        self.lag0 = len;
        self.index += 1;
    }

    fn decode(&mut self, residual: u8) -> u8 {
        let pred = self.method.predict(self.index, self.lag0, self.lag1);
        let len = (residual as u32 + pred) % META_SYMS as u32;
        self.push(len);
        len as u8
    }

    fn encode(&mut self, len: u8) -> u8 {
        let pred = self.method.predict(self.index, self.lag0, self.lag1);
        let residual = (len as u32 + META_SYMS as u32 - pred) % META_SYMS as u32;
        self.push(len as u32);
        residual as u8
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MetaToken {
    Symbol(u8),
    /// Zeros following a zero that itself followed a zero.
    ZeroRun(u32),
}

/// Splits residuals into meta symbols and zero runs, mirroring the state kept
/// by [`MetaTableDecoder`]: once a zero follows a zero, a run count covering
/// every further zero comes next.
fn tokenize(residuals: &[u8]) -> Vec<MetaToken> {
    let mut tokens = Vec::with_capacity(residuals.len());
    let mut last_zero = false;
    let mut i = 0;

    while i < residuals.len() {
        let sym = residuals[i];
        tokens.push(MetaToken::Symbol(sym));
        i += 1;

        if sym != 0 {
            last_zero = false;
            continue;
        }

        if last_zero {
            let run = residuals[i..].iter().take_while(|&&r| r == 0).count();
            trace!(run, "zero run");

            tokens.push(MetaToken::ZeroRun(run as u32));
            i += run;
        }
        last_zero = true;
    }

    tokens
}

fn zero_run_cost(run: u32) -> u32 {
    if run < RUN_SHORT_MAX {
        return RUN_SHORT_BITS;
    }
    let run = run - RUN_SHORT_MAX;
    if run < RUN_SHORT_MAX {
        return 2 * RUN_SHORT_BITS;
    }
    let run = run - RUN_SHORT_MAX;

    2 * RUN_SHORT_BITS + (run / RUN_LONG_MAX + 1) * RUN_LONG_BITS
}

fn write_zero_run(run: u32, writer: &mut BitWriter) -> u32 {
    if run < RUN_SHORT_MAX {
        return writer.write_bits(run, RUN_SHORT_BITS);
    }
    let mut bits = writer.write_bits(RUN_SHORT_MAX, RUN_SHORT_BITS);

    let run = run - RUN_SHORT_MAX;
    if run < RUN_SHORT_MAX {
        return bits + writer.write_bits(run, RUN_SHORT_BITS);
    }
    bits += writer.write_bits(RUN_SHORT_MAX, RUN_SHORT_BITS);

    let mut run = run - RUN_SHORT_MAX;
    while run >= RUN_LONG_MAX {
        bits += writer.write_bits(RUN_LONG_MAX, RUN_LONG_BITS);
        run -= RUN_LONG_MAX;
    }

    bits + writer.write_bits(run, RUN_LONG_BITS)
}

fn read_zero_run(reader: &mut BitReader) -> u32 {
    let mut run = reader.read_bits(RUN_SHORT_BITS);

    if run == RUN_SHORT_MAX {
        let s = reader.read_bits(RUN_SHORT_BITS);
        run += s;

        if s == RUN_SHORT_MAX {
            loop {
                let s = reader.read_bits(RUN_LONG_BITS);
                run += s;

                // Cannot spin on a truncated stream: past the end every read is zero.
                if s != RUN_LONG_MAX {
                    break;
                }
            }
        }
    }

    run
}

fn direct_length_cost(len: u8) -> u32 {
    if len >= 15 {
        5
    } else {
        4
    }
}

fn write_direct_length(len: u8, writer: &mut BitWriter) -> u32 {
    debug_assert!(len as usize <= MAX_CODE_SIZE);

    if len >= 15 {
        writer.write_bits(15, 4) + writer.write_bit((len - 15) as u32)
    } else {
        writer.write_bits(len as u32, 4)
    }
}

fn read_direct_length(reader: &mut BitReader) -> u8 {
    let mut len = reader.read_bits(4);

    if len >= 15 {
        len += reader.read_bit();
    }

    len as u8
}

/// Encoder side of the meta code: a residual coding of one length table
/// under a fixed predictor.
#[derive(Clone, Debug)]
pub struct MetaTableEncoder {
    predictor: Predictor,
    encoder: HuffmanEncoder,
    tokens: Vec<MetaToken>,
}

impl MetaTableEncoder {
    /// Tries every predictor and keeps the cheapest.
    pub fn new(code_lens: &[u8]) -> Result<Self> {
        let mut best = Self::with_predictor(code_lens, Predictor::Raw)?;
        let mut best_cost = best.cost();

        for predictor in Predictor::ALL.into_iter().skip(1) {
            let candidate = Self::with_predictor(code_lens, predictor)?;
            let cost = candidate.cost();

            debug!(?predictor, cost, best_cost, "meta table candidate");

            if cost < best_cost {
                best = candidate;
                best_cost = cost;
            }
        }

        Ok(best)
    }

    pub fn with_predictor(code_lens: &[u8], predictor: Predictor) -> Result<Self> {
        if code_lens.is_empty() {
            return Err(CodecError::invalid("cannot meta-code an empty length table"));
        }

        let mut state = LengthPredictor::new(predictor);
        let residuals = code_lens.iter().map(|&len| state.encode(len)).collect::<Vec<_>>();

        let tokens = tokenize(&residuals);

        let mut freqs = [0u32; META_SYMS];
        for token in tokens.iter() {
            if let MetaToken::Symbol(sym) = *token {
                freqs[sym as usize] += 1;
            }
        }

        let encoder = HuffmanEncoder::new(&freqs)?;

        Ok(Self { predictor, encoder, tokens })
    }

    pub fn predictor(&self) -> Predictor {
        self.predictor
    }

    fn last_nonzero(&self) -> usize {
        let meta_lens = self.encoder.code_lengths();
        meta_lens.iter().rposition(|&len| len > 0).map_or(0, |i| i + 1)
    }

    /// Bits [`write`](Self::write) will emit.
    pub fn cost(&self) -> u32 {
        let meta_lens = self.encoder.code_lengths();
        let last_nzt = self.last_nonzero();

        let mut bits = 1;
        if last_nzt < META_SYMS {
            bits += 4;
        }
        bits += meta_lens[..last_nzt].iter().map(|&len| direct_length_cost(len)).sum::<u32>();
        bits += 2;

        bits + self
            .tokens
            .iter()
            .map(|token| match *token {
                MetaToken::Symbol(sym) => self.encoder.symbol_cost(sym as u16),
                MetaToken::ZeroRun(run) => zero_run_cost(run),
            })
            .sum::<u32>()
    }

    pub fn write(&self, writer: &mut BitWriter) -> u32 {
        let meta_lens = self.encoder.code_lengths();
        let last_nzt = self.last_nonzero();

        let mut bits = if last_nzt < META_SYMS {
            writer.write_bit(1) + writer.write_bits(last_nzt as u32 - 1, 4)
        } else {
            writer.write_bit(0)
        };

        for &len in meta_lens[..last_nzt].iter() {
            bits += write_direct_length(len, writer);
        }

        bits += writer.write_bits(self.predictor.bits(), 2);

        for token in self.tokens.iter() {
            bits += match *token {
                MetaToken::Symbol(sym) => self.encoder.write_symbol(sym as u16, writer),
                MetaToken::ZeroRun(run) => write_zero_run(run, writer),
            };
        }

        bits
    }
}

/// Decoder side of the meta code. Keeps the zero-run state across calls.
#[derive(Clone, Debug)]
pub struct MetaTableDecoder {
    decoder: HuffmanDecoder,
    zero_run: u32,
    last_zero: bool,
}

impl MetaTableDecoder {
    /// Reads the meta code's own length table.
    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let mut table_codelens = [0u8; META_SYMS];

        let last_nzt = if reader.read_bit() == 1 {
            reader.read_bits(4) as usize + 1
        } else {
            META_SYMS
        };

        for len in table_codelens.iter_mut().take(last_nzt) {
            *len = read_direct_length(reader);
        }

        let decoder = HuffmanDecoder::from_code_lengths(&table_codelens, META_TABLE_BITS)
            .map_err(|e| CodecError::header(format!("meta table: {e}")))?;

        Ok(Self { decoder, zero_run: 0, last_zero: false })
    }

    /// Returns the next residual.
    pub fn next(&mut self, reader: &mut BitReader) -> Result<u8> {
        if self.zero_run > 0 {
            self.zero_run -= 1;
            return Ok(0);
        }

        let sym = self.decoder.next(reader)?;

        if sym == 0 {
            if self.last_zero {
                self.zero_run = read_zero_run(reader);
            }
            self.last_zero = true;
            Ok(0)
        } else {
            self.last_zero = false;
            Ok(sym as u8)
        }
    }
}

fn shave_bits(num_syms: usize) -> u32 {
    usize::BITS - (num_syms - 1).leading_zeros()
}

fn check_table_alphabet(num_syms: usize) -> Result<()> {
    if !(2..=MAX_SUPPORTED_SYMS).contains(&num_syms) {
        return Err(CodecError::invalid(format!(
            "length tables need an alphabet of 2..={MAX_SUPPORTED_SYMS} symbols, got {num_syms}"
        )));
    }
    Ok(())
}

/// Writes a code-length table and returns the number of bits it took.
pub fn write_code_lengths(code_lens: &[u8], writer: &mut BitWriter) -> Result<u32> {
    let num_syms = code_lens.len();
    check_table_alphabet(num_syms)?;

    let shaved = code_lens
        .iter()
        .rposition(|&len| len > 0)
        .map(|i| i + 1)
        .ok_or_else(|| CodecError::invalid("every code length is zero"))?;

    let mut bits = 0;

    let code_lens = if shaved < num_syms {
        bits += writer.write_bit(1);
        bits += writer.write_bits(shaved as u32 - 1, shave_bits(num_syms));
        &code_lens[..shaved]
    } else {
        bits += writer.write_bit(0);
        code_lens
    };

    if code_lens.len() <= TABLE_THRESH {
        for &len in code_lens.iter() {
            bits += write_direct_length(len, writer);
        }

        debug!(num_syms, shaved, bits, "wrote direct length table");
    } else {
        let meta = MetaTableEncoder::new(code_lens)?;
        bits += meta.write(writer);

        debug!(num_syms, shaved, predictor = ?meta.predictor(), bits, "wrote meta-coded length table");
    }

    Ok(bits)
}

/// Reads a code-length table for an alphabet of `num_syms` symbols. Shaved
/// symbols come back with length zero.
pub fn read_code_lengths(reader: &mut BitReader, num_syms: usize) -> Result<Vec<u8>> {
    check_table_alphabet(num_syms)?;

    let mut code_lens = vec![0u8; num_syms];
    let mut active = num_syms;

    if reader.read_bit() == 1 {
        let shaved = reader.read_bits(shave_bits(num_syms)) as usize + 1;
        if shaved >= num_syms {
            return Err(CodecError::header(format!(
                "shaved count {shaved} not below alphabet size {num_syms}"
            )));
        }
        active = shaved;
    }

    if active <= TABLE_THRESH {
        for len in code_lens[..active].iter_mut() {
            *len = read_direct_length(reader);
        }
    } else {
        let mut table = MetaTableDecoder::read(reader)?;
        let mut predictor = LengthPredictor::new(Predictor::from_bits(reader.read_bits(2)));

        for len in code_lens[..active].iter_mut() {
            let residual = table
                .next(reader)
                .map_err(|e| CodecError::header(format!("length residuals: {e}")))?;
            *len = predictor.decode(residual);
        }

        debug!(num_syms, active, method = ?predictor.method, "read meta-coded length table");
    }

    if reader.overrun() {
        return Err(CodecError::header("length table runs past the end of the input"));
    }

    Ok(code_lens)
}
