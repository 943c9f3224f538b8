//! Minimum-cost cover of an input by literals and matches.
//!
//! The parser is a shortest path over positions `0..=n`. From every reachable
//! position it may emit one literal byte or any match the finders reported there,
//! including every shorter length of a reported match. Costs come from a
//! [`PriceCalculator`], so the chosen cover is optimal for that price model.

use log::trace;

use crate::find::{Match, MatchFinder};
use crate::price::PriceCalculator;

/// One decision of a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// a single input byte stored verbatim
    Literal(u8),
    Match(Match),
}

impl Token {
    /// Number of input bytes the token covers.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Literal(_) => 1,
            Self::Match(m) => m.length,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Restrictions on where matches may sit near the end of the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TailGuard {
    /// the final bytes that must be stored as literals
    pub trailing_literals: usize,
    /// no match may start within this many bytes of the end
    pub last_match_margin: usize,
}

impl TailGuard {
    #[inline]
    fn allows(&self, n: usize, m: &Match) -> bool {
        m.position + self.last_match_margin <= n && m.end() + self.trailing_literals <= n
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParserOptions {
    pub tail: TailGuard,
    /// shorter lengths tried per candidate before only the full length is
    pub sub_length_limit: usize,
}

impl ParserOptions {
    pub const DEFAULT_SUB_LENGTH_LIMIT: usize = 512;
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            tail: TailGuard::default(),
            sub_length_limit: Self::DEFAULT_SUB_LENGTH_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Start,
    Literal,
    Match { length: usize, displacement: usize },
}

#[derive(Debug, Clone, Copy)]
struct Node {
    cost: u64,
    /// literal bytes ending here; zero after a match
    run: usize,
    step: Step,
}

const UNREACHED: Node = Node {
    cost: u64::MAX,
    run: 0,
    step: Step::Start,
};

#[derive(Debug, Clone, Default)]
pub struct MatchParser {
    options: ParserOptions,
}

impl MatchParser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Cover `input` with the cheapest sequence of tokens.
    pub fn parse(
        &self,
        input: &[u8],
        finders: &[Box<dyn MatchFinder + '_>],
        prices: &dyn PriceCalculator,
    ) -> Vec<Token> {
        let n = input.len();
        let tail = self.options.tail;
        let mut nodes = vec![UNREACHED; n + 1];
        nodes[0] = Node {
            cost: 0,
            run: 0,
            step: Step::Start,
        };

        for pos in 0..n {
            let here = nodes[pos];
            debug_assert!(here.cost != u64::MAX, "every position is reachable by literals");

            let literal = here.cost
                + u64::from(prices.literal_cost(here.run + 1))
                - u64::from(prices.literal_cost(here.run));
            // equal cost keeps whatever already reached pos + 1, which may be a match
            if literal < nodes[pos + 1].cost {
                nodes[pos + 1] = Node {
                    cost: literal,
                    run: here.run + 1,
                    step: Step::Literal,
                };
            }

            for finder in finders {
                let limits = finder.limits();
                for candidate in finder.find_at(pos) {
                    if !tail.allows(n, &Match::new(pos, limits.min_length.max(1), 0)) {
                        continue;
                    }
                    for length in self.lengths(candidate.length, limits.min_length, limits.alignment) {
                        let m = Match::new(pos, length, candidate.displacement);
                        if !tail.allows(n, &m) {
                            continue;
                        }
                        let cost = here.cost + u64::from(prices.match_cost(length, m.displacement));
                        let target = &mut nodes[m.end()];
                        // ties go to the match
                        let better = cost < target.cost
                            || (cost == target.cost && matches!(target.step, Step::Literal));
                        if better {
                            *target = Node {
                                cost,
                                run: 0,
                                step: Step::Match {
                                    length,
                                    displacement: m.displacement,
                                },
                            };
                        }
                    }
                }
            }
        }

        let tokens = backtrack(input, &nodes);
        trace!(
            "parsed {} bytes into {} tokens ({} bits)",
            n,
            tokens.len(),
            nodes[n].cost
        );
        tokens
    }

    /// Lengths worth trying for a candidate of `longest` bytes.
    fn lengths(&self, longest: usize, min: usize, alignment: usize) -> impl Iterator<Item = usize> {
        let step = alignment.max(1);
        let mut min = min.max(1);
        if min % step != 0 {
            min += step - min % step;
        }
        let capped = longest.min(min.saturating_add(self.options.sub_length_limit));
        let tail = if capped < longest { Some(longest) } else { None };
        (min..=capped).step_by(step).chain(tail)
    }
}

fn backtrack(input: &[u8], nodes: &[Node]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = input.len();
    while pos > 0 {
        match nodes[pos].step {
            Step::Literal => {
                pos -= 1;
                tokens.push(Token::Literal(input[pos]));
            }
            Step::Match {
                length,
                displacement,
            } => {
                pos -= length;
                tokens.push(Token::Match(Match::new(pos, length, displacement)));
            }
            Step::Start => break,
        }
    }
    tokens.reverse();
    tokens
}

/// Sum of literal runs and matches, priced the way the parser prices them.
pub fn cost_of(tokens: &[Token], prices: &dyn PriceCalculator) -> u64 {
    let mut total = 0u64;
    let mut run = 0;
    for token in tokens {
        match token {
            Token::Literal(_) => run += 1,
            Token::Match(m) => {
                total += u64::from(prices.literal_cost(run));
                run = 0;
                total += u64::from(prices.match_cost(m.length, m.displacement));
            }
        }
    }
    total + u64::from(prices.literal_cost(run))
}
