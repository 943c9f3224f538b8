//! Cost models used by the parser to compare covers of the input.

/// Bit cost of the tokens a format can emit.
///
/// Implementations are pure functions of the format's encoding rules.
pub trait PriceCalculator {
    /// Total bits needed to store a run of `run` literal bytes.
    ///
    /// The parser charges the difference between successive run lengths, so formats
    /// whose literal runs carry a length prefix price that prefix here.
    fn literal_cost(&self, run: usize) -> u32;

    /// Bits needed to store a match of `length` bytes from `displacement` back.
    ///
    /// A displacement of zero prices a run of one repeated byte.
    fn match_cost(&self, length: usize, displacement: usize) -> u32;
}

/// Formats that spend a flag bit on every token and store literals verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlaggedPrices {
    pub flag_bits: u32,
    pub short_match: u32,
    /// matches longer than this cost `long_match` bits
    pub short_limit: usize,
    pub long_match: u32,
}

impl FlaggedPrices {
    /// Every match costs the same two bytes.
    pub const fn fixed(match_bytes: u32) -> Self {
        Self {
            flag_bits: 1,
            short_match: match_bytes * 8,
            short_limit: usize::MAX,
            long_match: match_bytes * 8,
        }
    }

    /// Matches up to `short_limit` take `short_bytes`; longer ones take `long_bytes`.
    pub const fn two_tier(short_bytes: u32, short_limit: usize, long_bytes: u32) -> Self {
        Self {
            flag_bits: 1,
            short_match: short_bytes * 8,
            short_limit,
            long_match: long_bytes * 8,
        }
    }
}

impl PriceCalculator for FlaggedPrices {
    fn literal_cost(&self, run: usize) -> u32 {
        run as u32 * (8 + self.flag_bits)
    }

    fn match_cost(&self, length: usize, _displacement: usize) -> u32 {
        self.flag_bits
            + if length <= self.short_limit {
                self.short_match
            } else {
                self.long_match
            }
    }
}

/// Number of bits needed to write `value` (zero needs none).
#[inline]
pub(crate) const fn bit_width(value: usize) -> u32 {
    usize::BITS - value.leading_zeros()
}
