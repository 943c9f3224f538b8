//! Optimal-parse LZ compression for legacy game data formats.
//!
//! Compressing runs a fixed pipeline: the input is indexed ([`index`]), candidate
//! back-references are found ([`find`]), a minimum-cost cover of the input is
//! chosen under the format's [`PriceCalculator`] ([`parse`]), and a format
//! [`Encoder`](codec::Encoder) writes that cover out ([`codec`]). Decoding replays
//! the stream through a [`CircularBuffer`].
//!
//! Most callers only need a [`Format`]:
//! ```
//! use kompression::Format;
//!
//! let input = b"an input, an input, an input";
//! let packed = kompression::compress(Format::Lz10, input).unwrap();
//! assert_eq!(kompression::decompress(Format::Lz10, &packed).unwrap(), &input[..]);
//! ```
//! A [`Configuration`] composes finders, prices and codecs by hand.

pub mod codec;
pub mod config;
pub mod errors;
pub mod find;
pub mod format;
pub mod huffman;
pub mod index;
pub mod parse;
pub mod price;
pub mod window;

pub use crate::config::{Compression, Configuration};
pub use crate::errors::{Corruption, KompressionError, Result};
pub use crate::find::{FindLimitations, FinderBackend, Match, MatchFinder};
pub use crate::format::Format;
pub use crate::huffman::{BitDepth, HuffmanTreeBuilder, NibbleOrder};
pub use crate::index::{IndexKind, SuffixIndex};
pub use crate::parse::{MatchParser, ParserOptions, TailGuard, Token};
pub use crate::price::PriceCalculator;
pub use crate::window::CircularBuffer;

/// Compress `input` with the preset for `format`.
///
/// Build a [`Compression`] once with [`Format::configuration`] when compressing many
/// inputs.
pub fn compress(format: Format, input: &[u8]) -> Result<Vec<u8>> {
    format.configuration().build()?.compress(input)
}

/// Decompress `input`, which must be in `format`.
pub fn decompress(format: Format, input: &[u8]) -> Result<Vec<u8>> {
    format.configuration().build()?.decompress(input)
}
