use smallvec::SmallVec;

use super::{pareto, Candidates, FindLimitations, MatchFinder};

/// Naive search of the trailing window.
///
/// Every displacement in the window is compared against the bytes at the current
/// position. Sources may run past the current position ("self-matches"), which is how
/// a short pattern gets repeated.
#[derive(Debug, Clone)]
pub struct HistoryMatchFinder<'a> {
    input: &'a [u8],
    limits: FindLimitations,
}

impl<'a> HistoryMatchFinder<'a> {
    pub fn new(input: &'a [u8], limits: FindLimitations) -> Self {
        Self { input, limits }
    }
}

impl<'a> MatchFinder for HistoryMatchFinder<'a> {
    fn limits(&self) -> &FindLimitations {
        &self.limits
    }

    fn input_len(&self) -> usize {
        self.input.len()
    }

    fn find_at(&self, position: usize) -> Candidates {
        let limits = &self.limits;
        if !limits.aligned(position) {
            return Candidates::new();
        }

        let ahead = &self.input[position..];
        let farthest = limits.max_displacement.min(position);
        let nearest = limits.min_displacement.max(1);

        let hits: SmallVec<[(usize, usize); 16]> = (nearest..=farthest)
            .filter(|&d| limits.displacement_ok(d))
            .filter_map(|d| {
                let src = &self.input[position - d..];
                let length = src
                    .iter()
                    .zip(ahead)
                    .take_while(|(s, a)| s == a)
                    .take(limits.max_length)
                    .count();

                limits.usable_length(length).map(|l| (l, d))
            })
            .collect();

        pareto(position, hits)
    }
}
