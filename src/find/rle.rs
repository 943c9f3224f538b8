use super::{Candidates, FindLimitations, Match, MatchFinder};

/// Reports runs of one repeated byte as zero-displacement matches.
#[derive(Debug, Clone)]
pub struct RunLengthMatchFinder<'a> {
    input: &'a [u8],
    limits: FindLimitations,
}

impl<'a> RunLengthMatchFinder<'a> {
    pub fn new(input: &'a [u8], limits: FindLimitations) -> Self {
        Self { input, limits }
    }
}

impl<'a> MatchFinder for RunLengthMatchFinder<'a> {
    fn limits(&self) -> &FindLimitations {
        &self.limits
    }

    fn input_len(&self) -> usize {
        self.input.len()
    }

    fn find_at(&self, position: usize) -> Candidates {
        let mut out = Candidates::new();
        if !self.limits.aligned(position) {
            return out;
        }

        let value = self.input[position];
        let run = self.input[position..]
            .iter()
            .take(self.limits.max_length)
            .take_while(|&&b| b == value)
            .count();

        if let Some(length) = self.limits.usable_length(run) {
            out.push(Match::new(position, length, 0));
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reports_runs_with_zero_displacement() {
        let input = b"abbbbbc";
        let finder = RunLengthMatchFinder::new(input, FindLimitations::runs(3, 4));
        assert!(finder.find_at(0).is_empty());
        assert_eq!(&finder.find_at(1)[..], &[Match::new(1, 4, 0)]);
        assert_eq!(&finder.find_at(3)[..], &[Match::new(3, 3, 0)]);
        assert!(finder.find_at(4).is_empty());
    }
}
