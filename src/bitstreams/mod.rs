mod rope;

pub use rope::{GrowBuffer, HEAD_SIZE};

/// MSB-first bit writer packing codes into 32-bit words.
///
/// Bits gather in a 64-bit accumulator; every time 32 or more are pending the
/// high word is pushed into the backing [`GrowBuffer`].
pub struct BitWriter {
    words: GrowBuffer,
    work: u64,
    bits: u32,
    pub written_bits: usize,
}

impl Default for BitWriter {
    fn default() -> Self {
        BitWriter {
            words: GrowBuffer::new(),
            work: 0,
            bits: 0,
            written_bits: 0,
        }
    }
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the low `len` bits of `code`, most significant first.
    #[inline(always)]
    pub fn write_bits(&mut self, code: u32, len: u32) -> u32 {
        assert!((1..=32).contains(&len), "Cannot write {} bits at once", len);
        debug_assert!(len == 32 || (code >> len) == 0, "Code {code:#x} does not fit in {len} bits");

        let bits = self.bits;

        self.work |= (code as u64) << (64 - len - bits);

        let bits = bits + len;

        if bits >= 32 {
            self.words.push((self.work >> 32) as u32);

            self.work <<= 32;
            self.bits = bits - 32;
        } else {
            self.bits = bits;
        }

        self.written_bits += len as usize;
        len
    }

    #[inline(always)]
    pub fn write_bit(&mut self, bit: u32) -> u32 {
        self.write_bits(bit & 1, 1)
    }

    pub fn write_word(&mut self, word: u32) -> u32 {
        self.write_bits(word, 32)
    }

    /// Variable-length integer in 9-bit chunks: eight payload bits, low byte
    /// first, then a continuation bit.
    pub fn write9(&mut self, value: u32) -> u32 {
        let mut value = value;
        let mut written = 0;

        loop {
            let chunk = value & 0xFF;
            value >>= 8;

            let more = (value != 0) as u32;
            written += self.write_bits((chunk << 1) | more, 9);

            if more == 0 {
                return written;
            }
        }
    }

    /// Flushes the partial word, if any, and returns the total word count.
    ///
    /// The flushed word is zero-padded; bits written afterwards start a new word.
    pub fn finalize(&mut self) -> usize {
        debug_assert!(self.bits < 32);

        if self.bits > 0 {
            self.words.push((self.work >> 32) as u32);

            self.work = 0;
            self.bits = 0;
        }

        self.words.word_count()
    }

    pub fn words(&self) -> &GrowBuffer {
        &self.words
    }

    pub fn into_words(mut self) -> Vec<u32> {
        self.finalize();
        self.words.to_words()
    }

    /// Finalizes and serializes every word in little-endian byte order.
    pub fn into_bytes(self) -> Vec<u8> {
        self.into_words()
            .into_iter()
            .flat_map(u32::to_le_bytes)
            .collect()
    }
}

/// MSB-first bit reader over the word stream produced by [`BitWriter`].
///
/// Reads past the end of the input yield zero bits; callers detect this with
/// [`overrun`](BitReader::overrun).
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct BitReader {
    words: Box<[u32]>,
    position: usize,
}

impl BitReader {
    pub fn new(words: Box<[u32]>) -> Self {
        BitReader { words, position: 0 }
    }

    /// Rebuilds the word stream from little-endian bytes; a trailing partial
    /// word is zero-padded.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let words = bytes
            .chunks(4)
            .map(|chunk| {
                let mut word = [0u8; 4];
                word[..chunk.len()].copy_from_slice(chunk);
                u32::from_le_bytes(word)
            })
            .collect::<Vec<_>>();

        Self::new(words.into_boxed_slice())
    }

    #[inline(always)]
    fn window(&self) -> u64 {
        let index = self.position >> 5;

        let hi = self.words.get(index).copied().unwrap_or(0) as u64;
        let lo = self.words.get(index + 1).copied().unwrap_or(0) as u64;

        ((hi << 32) | lo) << (self.position & 31)
    }

    /// Returns the next `len` bits right-justified without consuming them.
    #[inline(always)]
    pub fn peek(&self, len: u32) -> u32 {
        debug_assert!((1..=32).contains(&len));

        (self.window() >> (64 - len)) as u32
    }

    #[inline(always)]
    pub fn eat(&mut self, len: u32) {
        self.position += len as usize;
    }

    #[inline(always)]
    pub fn read_bits(&mut self, len: u32) -> u32 {
        let value = self.peek(len);
        self.eat(len);
        value
    }

    #[inline(always)]
    pub fn read_bit(&mut self) -> u32 {
        self.read_bits(1)
    }

    pub fn read_word(&mut self) -> u32 {
        self.read_bits(32)
    }

    pub fn read9(&mut self) -> u32 {
        let mut value = 0;
        let mut shift = 0;

        loop {
            let chunk = self.read_bits(9);
            value |= (chunk >> 1) << shift;
            shift += 8;

            if chunk & 1 == 0 || shift >= 32 {
                return value;
            }
        }
    }

    /// Number of bits consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn total_bits(&self) -> usize {
        self.words.len() * 32
    }

    /// True once more bits were consumed than the input holds.
    pub fn overrun(&self) -> bool {
        self.position > self.total_bits()
    }
}
