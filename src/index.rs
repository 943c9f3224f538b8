//! Suffix indexing of an input buffer.
//!
//! A [`SuffixIndex`] holds the suffix array of the input together with its inverse
//! (ranks), the LCP array between neighbouring suffixes, and the first suffix-array
//! slot for every leading byte value. It can be produced two ways:
//! * [`SuffixIndex::induced`] sorts the suffixes with SA-IS
//! * [`SuffixIndex::from_suffix_tree`] builds a suffix tree with Ukkonen's algorithm
//!   and reads the sorted suffixes back from a lexicographic walk of its leaves
//!
//! Both produce identical indices. The index is immutable once built.

mod sais;
mod tree;

pub use self::tree::SuffixTree;

/// How a [`SuffixIndex`] is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Suffix array by induced sorting
    InducedSort,
    /// Suffix array read from an arena-based suffix tree
    SuffixTree,
}

#[derive(Debug, Clone)]
pub struct SuffixIndex<'a> {
    input: &'a [u8],
    suffixes: Vec<usize>,
    ranks: Vec<usize>,
    /// `lcp[i]` = common prefix of `suffixes[i - 1]` and `suffixes[i]`; `lcp[0]` = 0
    lcp: Vec<usize>,
    /// first slot in `suffixes` whose suffix starts with each byte value, plus an end marker
    bucket_start: [usize; 257],
}

impl<'a> SuffixIndex<'a> {
    pub fn build(input: &'a [u8], kind: IndexKind) -> Self {
        match kind {
            IndexKind::InducedSort => Self::induced(input),
            IndexKind::SuffixTree => Self::from_suffix_tree(input),
        }
    }

    /// Build the index with SA-IS and Kasai's LCP construction.
    pub fn induced(input: &'a [u8]) -> Self {
        let suffixes = sais::suffix_array(input);
        let ranks = invert(&suffixes);
        let lcp = kasai(input, &suffixes, &ranks);
        Self::assemble(input, suffixes, ranks, lcp)
    }

    /// Build the index from a suffix tree.
    pub fn from_suffix_tree(input: &'a [u8]) -> Self {
        let tree = SuffixTree::new(input);
        let (suffixes, lcp) = tree.sorted_suffixes();
        let ranks = invert(&suffixes);
        Self::assemble(input, suffixes, ranks, lcp)
    }

    fn assemble(input: &'a [u8], suffixes: Vec<usize>, ranks: Vec<usize>, lcp: Vec<usize>) -> Self {
        let mut counts = [0usize; 256];
        for &b in input {
            counts[b as usize] += 1;
        }
        let mut bucket_start = [0usize; 257];
        for b in 0..256 {
            bucket_start[b + 1] = bucket_start[b] + counts[b];
        }

        Self {
            input,
            suffixes,
            ranks,
            lcp,
            bucket_start,
        }
    }

    #[inline]
    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.suffixes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }

    /// Input positions ordered by their suffixes.
    #[inline]
    pub fn suffixes(&self) -> &[usize] {
        &self.suffixes
    }

    /// Slot of `position` in [`suffixes`](Self::suffixes).
    #[inline]
    pub fn rank(&self, position: usize) -> usize {
        self.ranks[position]
    }

    #[inline]
    pub fn lcp(&self) -> &[usize] {
        &self.lcp
    }

    /// Range of suffix-array slots whose suffixes start with `byte`.
    #[inline]
    pub fn bucket(&self, byte: u8) -> std::ops::Range<usize> {
        let b = byte as usize;
        self.bucket_start[b]..self.bucket_start[b + 1]
    }
}

fn invert(suffixes: &[usize]) -> Vec<usize> {
    let mut ranks = vec![0; suffixes.len()];
    for (rank, &pos) in suffixes.iter().enumerate() {
        ranks[pos] = rank;
    }
    ranks
}

/// Kasai et al. linear-time LCP construction
fn kasai(input: &[u8], suffixes: &[usize], ranks: &[usize]) -> Vec<usize> {
    let n = input.len();
    let mut lcp = vec![0; n];
    let mut h = 0;
    for i in 0..n {
        let r = ranks[i];
        if r == 0 {
            h = 0;
            continue;
        }
        let j = suffixes[r - 1];
        while i + h < n && j + h < n && input[i + h] == input[j + h] {
            h += 1;
        }
        lcp[r] = h;
        h = h.saturating_sub(1);
    }
    lcp
}
