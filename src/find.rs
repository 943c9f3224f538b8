//! Candidate back-reference discovery.
//!
//! A [`MatchFinder`] reports, for a single input position, every useful back-reference
//! that starts there. "Useful" means the Pareto front: ordered by increasing
//! displacement, each candidate is strictly longer than the previous one. A candidate
//! of length `L` at displacement `d` also stands for every shorter length down to
//! [`FindLimitations::min_length`] at the same displacement, which lets the parser pick
//! a shorter but cheaper match.

use smallvec::SmallVec;
use std::fmt;

use crate::index::{IndexKind, SuffixIndex};

mod history;
mod rle;
mod suffix;

pub use self::{history::HistoryMatchFinder, rle::RunLengthMatchFinder, suffix::SuffixMatchFinder};

/// A back-reference into already processed data.
///
/// A `displacement` of zero marks a run: `length` copies of the byte at `position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Match {
    pub position: usize,
    pub length: usize,
    pub displacement: usize,
}

impl Match {
    pub const fn new(position: usize, length: usize, displacement: usize) -> Self {
        Self {
            position,
            length,
            displacement,
        }
    }

    #[inline]
    pub const fn end(&self) -> usize {
        self.position + self.length
    }

    #[inline]
    pub const fn is_run(&self) -> bool {
        self.displacement == 0
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:06x}: len {} disp {}",
            self.position, self.length, self.displacement
        )
    }
}

/// Candidate matches starting at one position, by increasing displacement and length.
pub type Candidates = SmallVec<[Match; 8]>;

/// Codec limits a match must satisfy. Violating matches are dropped, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FindLimitations {
    pub min_length: usize,
    pub max_length: usize,
    pub min_displacement: usize,
    pub max_displacement: usize,
    /// positions, lengths, and displacements must be multiples of this
    pub alignment: usize,
    /// in-window suffix-array neighbours inspected per direction (`None` for unbounded)
    pub search_depth: Option<usize>,
}

impl FindLimitations {
    pub const DEFAULT_SEARCH_DEPTH: usize = 256;

    pub const fn new(
        min_length: usize,
        max_length: usize,
        min_displacement: usize,
        max_displacement: usize,
    ) -> Self {
        Self {
            min_length,
            max_length,
            min_displacement,
            max_displacement,
            alignment: 1,
            search_depth: Some(Self::DEFAULT_SEARCH_DEPTH),
        }
    }

    /// Limits for run-length finders, which only report zero-displacement matches.
    pub const fn runs(min_length: usize, max_length: usize) -> Self {
        Self::new(min_length, max_length, 0, 0)
    }

    pub const fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    pub const fn with_search_depth(mut self, depth: Option<usize>) -> Self {
        self.search_depth = depth;
        self
    }

    #[inline]
    pub(crate) fn aligned(&self, value: usize) -> bool {
        self.alignment <= 1 || value % self.alignment == 0
    }

    /// Longest usable length no greater than `length`, honoring alignment.
    #[inline]
    pub(crate) fn usable_length(&self, length: usize) -> Option<usize> {
        let mut length = length.min(self.max_length);
        if self.alignment > 1 {
            length -= length % self.alignment;
        }
        if length >= self.min_length && length > 0 {
            Some(length)
        } else {
            None
        }
    }

    #[inline]
    pub(crate) fn displacement_ok(&self, displacement: usize) -> bool {
        displacement >= self.min_displacement
            && displacement <= self.max_displacement
            && self.aligned(displacement)
    }
}

/// Searches one input for matches.
pub trait MatchFinder {
    fn limits(&self) -> &FindLimitations;

    /// Pareto candidates starting at `position`.
    fn find_at(&self, position: usize) -> Candidates;

    /// Length of the input being searched.
    fn input_len(&self) -> usize;
}

/// The algorithm used to find matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinderBackend {
    /// Neighbourhood search in a suffix array built by induced sorting
    SuffixArray,
    /// Neighbourhood search in a suffix array read from a suffix tree
    SuffixTree,
    /// Brute force scan of the trailing window; fine for windows of a few KiB
    History,
    /// Runs of a single repeated byte, reported with a displacement of zero
    RunLength,
}

/// One finder slot of a configuration: a backend and the limits it enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FinderConfig {
    pub backend: FinderBackend,
    pub limits: FindLimitations,
}

impl FinderConfig {
    /// Build the per-call finder over `input`.
    pub fn build<'a>(&self, input: &'a [u8]) -> Box<dyn MatchFinder + 'a> {
        let limits = self.limits;
        match self.backend {
            FinderBackend::SuffixArray => Box::new(SuffixMatchFinder::new(
                SuffixIndex::build(input, IndexKind::InducedSort),
                limits,
            )),
            FinderBackend::SuffixTree => Box::new(SuffixMatchFinder::new(
                SuffixIndex::build(input, IndexKind::SuffixTree),
                limits,
            )),
            FinderBackend::History => Box::new(HistoryMatchFinder::new(input, limits)),
            FinderBackend::RunLength => Box::new(RunLengthMatchFinder::new(input, limits)),
        }
    }
}

/// Lazily yields every candidate of `finder` in increasing position order.
pub fn find_matches<'f>(finder: &'f dyn MatchFinder) -> impl Iterator<Item = Match> + 'f {
    (0..finder.input_len()).flat_map(move |pos| finder.find_at(pos))
}

/// Reduce raw `(length, displacement)` hits at `position` to the Pareto front.
pub(crate) fn pareto(position: usize, mut hits: SmallVec<[(usize, usize); 16]>) -> Candidates {
    hits.sort_unstable_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)));
    let mut best = 0;
    let mut out = Candidates::new();
    for (length, displacement) in hits {
        if length > best {
            best = length;
            out.push(Match::new(position, length, displacement));
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    const SCENARIO: [u8; 15] = [0, 1, 2, 2, 0, 0, 0, 0, 1, 2, 2, 0, 0, 0, 0];

    #[test]
    fn all_backends_agree_on_longest_match() {
        let mut inputs = vec![SCENARIO.to_vec(), b"abcabcabcabd abcab".to_vec()];
        inputs.push(b"the rain in spain falls mainly on the plain".to_vec());
        inputs.push((0..600u32).map(|i| (i * 7 % 13) as u8).collect());

        let limits = FindLimitations::new(3, 18, 1, 64).with_search_depth(None);
        for input in &inputs {
            let finders: Vec<Box<dyn MatchFinder>> = [
                FinderBackend::SuffixArray,
                FinderBackend::SuffixTree,
                FinderBackend::History,
            ]
            .iter()
            .map(|&backend| FinderConfig { backend, limits }.build(input))
            .collect();

            for pos in 0..input.len() {
                let found: Vec<Candidates> = finders.iter().map(|f| f.find_at(pos)).collect();
                assert_eq!(found[0], found[1], "position {}", pos);
                assert_eq!(found[0], found[2], "position {}", pos);
            }
        }
    }

    #[test]
    fn scenario_repeat_is_found() {
        let limits = FindLimitations::new(4, 18, 1, 16);
        let config = FinderConfig {
            backend: FinderBackend::SuffixArray,
            limits,
        };
        let finder = config.build(&SCENARIO);
        let at_seven = finder.find_at(7);
        assert_eq!(&at_seven[..], &[Match::new(7, 8, 7)]);

        for m in find_matches(&*finder) {
            assert!(m.length >= 4 && m.length <= 18);
            assert!(m.displacement >= 1 && m.displacement <= 16);
            assert_eq!(
                SCENARIO[m.position..m.end()],
                SCENARIO[m.position - m.displacement..m.end() - m.displacement]
            );
        }
    }

    #[test]
    fn candidates_form_a_pareto_front() {
        let input = b"abcd_abc_ab_abcd_abcdabcd";
        let limits = FindLimitations::new(2, 18, 1, 32);
        let finder = HistoryMatchFinder::new(input, limits);
        for pos in 0..input.len() {
            let found = finder.find_at(pos);
            for pair in found.windows(2) {
                assert!(pair[0].displacement < pair[1].displacement);
                assert!(pair[0].length < pair[1].length);
            }
        }
    }

    #[test]
    fn alignment_discards_unaligned_matches() {
        let input = b"ababababababab";
        let limits = FindLimitations::new(2, 8, 1, 8).with_alignment(2);
        let finder = HistoryMatchFinder::new(input, limits);
        assert!(finder.find_at(3).is_empty());
        for m in finder.find_at(4) {
            assert_eq!(m.length % 2, 0);
            assert_eq!(m.displacement % 2, 0);
        }
        assert!(!finder.find_at(4).is_empty());
    }
}
