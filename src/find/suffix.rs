use smallvec::SmallVec;

use super::{pareto, Candidates, FindLimitations, MatchFinder};
use crate::index::SuffixIndex;

/// Finds matches by scanning the suffix-array neighbourhood of each position.
///
/// Walking away from the position's rank in either direction, the running minimum
/// of the LCP array is the common prefix with every suffix passed so far. Once it
/// drops below the minimum match length, nothing further out can match.
#[derive(Debug, Clone)]
pub struct SuffixMatchFinder<'a> {
    index: SuffixIndex<'a>,
    limits: FindLimitations,
}

impl<'a> SuffixMatchFinder<'a> {
    /// Neighbours scanned per direction, in or out of the window, per unit of search depth.
    const SCAN_FACTOR: usize = 16;

    pub fn new(index: SuffixIndex<'a>, limits: FindLimitations) -> Self {
        Self { index, limits }
    }

    pub fn index(&self) -> &SuffixIndex<'a> {
        &self.index
    }

    /// Record `source` as a match source; false if it lies outside the window.
    fn consider(
        &self,
        position: usize,
        source: usize,
        common: usize,
        hits: &mut SmallVec<[(usize, usize); 16]>,
    ) -> bool {
        if source >= position || !self.limits.displacement_ok(position - source) {
            return false;
        }
        if let Some(length) = self.limits.usable_length(common) {
            hits.push((length, position - source));
        }
        true
    }
}

impl<'a> MatchFinder for SuffixMatchFinder<'a> {
    fn limits(&self) -> &FindLimitations {
        &self.limits
    }

    fn input_len(&self) -> usize {
        self.index.len()
    }

    fn find_at(&self, position: usize) -> Candidates {
        let limits = &self.limits;
        if !limits.aligned(position) || limits.max_displacement == 0 {
            return Candidates::new();
        }

        let suffixes = self.index.suffixes();
        let lcp = self.index.lcp();
        let rank = self.index.rank(position);
        let depth = limits.search_depth.unwrap_or(usize::MAX);
        let scan_limit = depth.saturating_mul(Self::SCAN_FACTOR);
        let floor = limits.min_length.max(1);

        let mut hits = SmallVec::new();

        // towards smaller suffixes
        let mut common = usize::MAX;
        let mut slot = rank;
        let (mut steps, mut scanned) = (0, 0);
        while slot > 0 && steps < depth && scanned < scan_limit {
            common = common.min(lcp[slot]);
            if common < floor {
                break;
            }
            slot -= 1;
            scanned += 1;
            if self.consider(position, suffixes[slot], common, &mut hits) {
                steps += 1;
            }
        }

        // towards larger suffixes
        let mut common = usize::MAX;
        let mut slot = rank + 1;
        let (mut steps, mut scanned) = (0, 0);
        while slot < suffixes.len() && steps < depth && scanned < scan_limit {
            common = common.min(lcp[slot]);
            if common < floor {
                break;
            }
            scanned += 1;
            if self.consider(position, suffixes[slot], common, &mut hits) {
                steps += 1;
            }
            slot += 1;
        }

        pareto(position, hits)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::find::Match;
    use crate::index::IndexKind;

    #[test]
    fn depth_counts_only_sources_in_the_window() {
        // in a run, every neighbour on one side of a suffix starts later
        let input = [b'a'; 40];
        let limits = FindLimitations::new(3, 18, 2, 16).with_search_depth(Some(1));
        let index = SuffixIndex::build(&input, IndexKind::InducedSort);
        let finder = SuffixMatchFinder::new(index, limits);
        assert_eq!(&finder.find_at(20)[..], &[Match::new(20, 18, 2)]);
    }
}
