/// Number of words in the first segment of a [`GrowBuffer`].
pub const HEAD_SIZE: usize = 1024;

struct Segment {
    words: Box<[u32]>,
    next: Option<Box<Segment>>,
}

/// Hangs `segment` off the end of the chain starting at `slot`. Chains stay
/// short since every segment doubles the previous one.
fn append(slot: &mut Option<Box<Segment>>, segment: Box<Segment>) {
    match slot {
        Some(node) => append(&mut node.next, segment),
        None => *slot = Some(segment),
    }
}

/// Append-only word buffer made of segments that double in size.
///
/// Filled segments are moved into an owned chain and never copied again;
/// the whole buffer is linearized once, after the last write.
pub struct GrowBuffer {
    /// Filled segments, oldest first. Each one owns the following one.
    head: Option<Box<Segment>>,
    /// Segment currently being written.
    work: Vec<u32>,
    allocated: usize,
    size: usize,
}

impl Default for GrowBuffer {
    fn default() -> Self {
        Self::with_head_size(HEAD_SIZE)
    }
}

impl GrowBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_head_size(head_size: usize) -> Self {
        assert!(head_size > 0, "The first segment must hold at least one word");

        Self {
            head: None,
            work: Vec::with_capacity(head_size),
            allocated: head_size,
            size: 0,
        }
    }

    #[inline(always)]
    pub fn push(&mut self, word: u32) {
        if self.work.len() == self.allocated {
            self.grow();
        }

        self.work.push(word);
        self.size += 1;
    }

    fn grow(&mut self) {
        let new_allocated = self.allocated << 1;
        let full = std::mem::replace(&mut self.work, Vec::with_capacity(new_allocated));

        let segment = Box::new(Segment {
            words: full.into_boxed_slice(),
            next: None,
        });

        append(&mut self.head, segment);

        self.allocated = new_allocated;
    }

    /// Total number of words pushed so far.
    pub fn word_count(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of segments in use, the one being written included.
    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }

    /// Walks the chain, full segments first and the partial work segment last.
    pub fn segments(&self) -> impl Iterator<Item = &[u32]> {
        std::iter::successors(self.head.as_deref(), |segment| segment.next.as_deref())
            .map(|segment| &*segment.words)
            .chain(std::iter::once(self.work.as_slice()))
    }

    /// Copies every word into `target`, which must hold at least [`word_count`](Self::word_count) words.
    pub fn write_to(&self, target: &mut [u32]) -> usize {
        assert!(target.len() >= self.size, "Target holds {} words, {} needed", target.len(), self.size);

        let mut offset = 0;
        for words in self.segments() {
            target[offset..offset + words.len()].copy_from_slice(words);
            offset += words.len();
        }

        offset
    }

    pub fn to_words(&self) -> Vec<u32> {
        let mut out = vec![0u32; self.size];
        self.write_to(&mut out);
        out
    }
}
