//! Composing finders, prices and a codec into a reusable [`Compression`].
//!
//! A [`Configuration`] holds factories rather than instances. Every call to
//! [`Compression::compress`] builds its own index, finders and parser state from
//! them, so one `Compression` can serve any number of threads at once.
//! ```
//! # use kompression::{Configuration, FinderBackend};
//! # use kompression::codec::lz10::Lz10;
//! let lz10 = Configuration::new()
//!     .encode_with(|| Lz10)
//!     .decode_with(|| Lz10)
//!     .calculate_prices_with(|| Lz10)
//!     .find_with(FinderBackend::SuffixArray, Lz10::LIMITS)
//!     .build()
//!     .unwrap();
//!
//! let compressed = lz10.compress(b"abracadabra abracadabra").unwrap();
//! assert_eq!(lz10.decompress(&compressed).unwrap(), b"abracadabra abracadabra");
//! ```

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use log::debug;

use crate::codec::{Decoder, Direction, EncodeInput, Encoder, Policy};
use crate::errors::{KompressionError, Result};
use crate::find::{FindLimitations, FinderBackend, FinderConfig, MatchFinder};
use crate::huffman::HuffmanTreeBuilder;
use crate::parse::{MatchParser, ParserOptions, TailGuard, Token};
use crate::price::PriceCalculator;

type EncoderFactory = Arc<dyn Fn() -> Box<dyn Encoder> + Send + Sync>;
type DecoderFactory = Arc<dyn Fn() -> Box<dyn Decoder> + Send + Sync>;
type PriceFactory = Arc<dyn Fn() -> Box<dyn PriceCalculator> + Send + Sync>;

/// Builder for a [`Compression`].
///
/// An encoder and a decoder are always required. Encoders whose [`Policy`] needs
/// matches also need a price calculator and at least one finder; Huffman encoders
/// need a [`HuffmanTreeBuilder`].
#[derive(Clone, Default)]
pub struct Configuration {
    encoder: Option<EncoderFactory>,
    decoder: Option<DecoderFactory>,
    prices: Option<PriceFactory>,
    finders: Vec<FinderConfig>,
    huffman: Option<HuffmanTreeBuilder>,
    parser: ParserOptions,
}

impl Configuration {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode_with<F, E>(&mut self, factory: F) -> &mut Self
    where
        F: Fn() -> E + Send + Sync + 'static,
        E: Encoder + 'static,
    {
        self.encoder = Some(Arc::new(move || Box::new(factory()) as Box<dyn Encoder>));
        self
    }

    pub fn decode_with<F, D>(&mut self, factory: F) -> &mut Self
    where
        F: Fn() -> D + Send + Sync + 'static,
        D: Decoder + 'static,
    {
        self.decoder = Some(Arc::new(move || Box::new(factory()) as Box<dyn Decoder>));
        self
    }

    pub fn calculate_prices_with<F, P>(&mut self, factory: F) -> &mut Self
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: PriceCalculator + 'static,
    {
        self.prices = Some(Arc::new(move || Box::new(factory()) as Box<dyn PriceCalculator>));
        self
    }

    /// Add a match finder. Candidates from every finder are offered to the parser.
    #[inline]
    pub fn find_with(&mut self, backend: FinderBackend, limits: FindLimitations) -> &mut Self {
        self.finders.push(FinderConfig { backend, limits });
        self
    }

    #[inline]
    pub fn with_huffman(&mut self, builder: HuffmanTreeBuilder) -> &mut Self {
        self.huffman = Some(builder);
        self
    }

    #[inline]
    pub fn with_parser(&mut self, options: ParserOptions) -> &mut Self {
        self.parser = options;
        self
    }

    /// Check that every component the encoder needs is present.
    pub fn build(&self) -> Result<Compression> {
        let encoder = self
            .encoder
            .clone()
            .ok_or(KompressionError::InvalidConfiguration("no encoder"))?;
        let decoder = self
            .decoder
            .clone()
            .ok_or(KompressionError::InvalidConfiguration("no decoder"))?;

        let probe = encoder();
        let policy = probe.policy();
        if policy.needs_matches {
            if self.prices.is_none() {
                return Err(KompressionError::InvalidConfiguration(
                    "encoder needs matches but no price calculator was given",
                ));
            }
            if self.finders.is_empty() {
                return Err(KompressionError::InvalidConfiguration(
                    "encoder needs matches but no match finder was given",
                ));
            }
        }
        if policy.needs_huffman && self.huffman.is_none() {
            return Err(KompressionError::InvalidConfiguration(
                "encoder needs a huffman tree builder",
            ));
        }

        let mut parser = self.parser;
        parser.tail = TailGuard {
            trailing_literals: parser.tail.trailing_literals.max(policy.tail.trailing_literals),
            last_match_margin: parser.tail.last_match_margin.max(policy.tail.last_match_margin),
        };

        Ok(Compression {
            name: probe.name(),
            policy,
            encoder,
            decoder,
            prices: self.prices.clone(),
            finders: self.finders.clone(),
            huffman: self.huffman,
            parser,
        })
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("encoder", &self.encoder.is_some())
            .field("decoder", &self.decoder.is_some())
            .field("prices", &self.prices.is_some())
            .field("finders", &self.finders)
            .field("huffman", &self.huffman)
            .field("parser", &self.parser)
            .finish()
    }
}

/// A composed compressor and decompressor for one format.
#[derive(Clone)]
pub struct Compression {
    name: &'static str,
    policy: Policy,
    encoder: EncoderFactory,
    decoder: DecoderFactory,
    prices: Option<PriceFactory>,
    finders: Vec<FinderConfig>,
    huffman: Option<HuffmanTreeBuilder>,
    parser: ParserOptions,
}

impl Compression {
    /// Name of the encoder, as used in log messages.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Compress `input`. The same input always gives the same output.
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let encoder = (self.encoder)();
        let split = self.policy.raw_prefix.min(input.len());
        let (prefix, body) = input.split_at(split);

        let reversed: Vec<u8>;
        let data = match self.policy.direction {
            Direction::Forward => body,
            Direction::Backward => {
                reversed = body.iter().rev().copied().collect();
                &reversed[..]
            }
        };

        let tokens = self.parse(data);
        let output = encoder.encode(&EncodeInput {
            prefix,
            data,
            tokens: &tokens,
            huffman: self.huffman.as_ref(),
        })?;

        debug!(
            "{}: compressed {} bytes to {} ({} matches)",
            self.name,
            input.len(),
            output.len(),
            tokens.iter().filter(|t| matches!(t, Token::Match(_))).count()
        );
        Ok(output)
    }

    fn parse(&self, data: &[u8]) -> Vec<Token> {
        let prices = match (&self.prices, self.policy.needs_matches) {
            (Some(prices), true) => prices(),
            _ => return Vec::new(),
        };
        let finders: Vec<Box<dyn MatchFinder + '_>> =
            self.finders.iter().map(|finder| finder.build(data)).collect();
        MatchParser::new(self.parser).parse(data, &finders, &*prices)
    }

    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let output = (self.decoder)().decode(input)?;
        debug!(
            "{}: decompressed {} bytes to {}",
            self.name,
            input.len(),
            output.len()
        );
        Ok(output)
    }

    /// Read all of `rdr`, then write its compressed form to `wtr`.
    pub fn compress_to_writer<R: Read, W: Write>(&self, mut rdr: R, mut wtr: W) -> Result<()> {
        let mut input = Vec::new();
        rdr.read_to_end(&mut input).map_err(KompressionError::Io)?;
        let output = self.compress(&input)?;
        wtr.write_all(&output).map_err(KompressionError::Io)
    }

    /// Read all of `rdr`, then write its decompressed form to `wtr`.
    pub fn decompress_to_writer<R: Read, W: Write>(&self, mut rdr: R, mut wtr: W) -> Result<()> {
        let mut input = Vec::new();
        rdr.read_to_end(&mut input).map_err(KompressionError::Io)?;
        let output = self.decompress(&input)?;
        wtr.write_all(&output).map_err(KompressionError::Io)
    }
}

impl fmt::Debug for Compression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Compression")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("finders", &self.finders)
            .field("huffman", &self.huffman)
            .field("parser", &self.parser)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::{crilayla::Crilayla, huff::NintendoHuffman, lz10::Lz10, lz4::Lz4};
    use crate::huffman::{BitDepth, NibbleOrder};

    fn lz10() -> Configuration {
        let mut config = Configuration::new();
        config
            .encode_with(|| Lz10)
            .decode_with(|| Lz10)
            .calculate_prices_with(|| Lz10)
            .find_with(FinderBackend::SuffixArray, Lz10::LIMITS);
        config
    }

    fn is_invalid<T: fmt::Debug>(result: Result<T>) -> bool {
        matches!(result, Err(KompressionError::InvalidConfiguration(_)))
    }

    #[test]
    fn missing_components_fail_at_build() {
        assert!(is_invalid(Configuration::new().build()));
        assert!(is_invalid(Configuration::new().encode_with(|| Lz10).build()));
        assert!(is_invalid(
            Configuration::new()
                .encode_with(|| Lz10)
                .decode_with(|| Lz10)
                .find_with(FinderBackend::History, Lz10::LIMITS)
                .build()
        ));
        assert!(is_invalid(
            Configuration::new()
                .encode_with(|| Lz10)
                .decode_with(|| Lz10)
                .calculate_prices_with(|| Lz10)
                .build()
        ));
        assert!(is_invalid(
            Configuration::new()
                .encode_with(NintendoHuffman::default)
                .decode_with(NintendoHuffman::default)
                .build()
        ));
        assert!(lz10().build().is_ok());
        assert!(Configuration::new()
            .encode_with(NintendoHuffman::default)
            .decode_with(NintendoHuffman::default)
            .with_huffman(HuffmanTreeBuilder::new(BitDepth::Eight, NibbleOrder::LowFirst))
            .build()
            .is_ok());
    }

    #[test]
    fn policy_tail_joins_the_parser_options() {
        let lz4 = Configuration::new()
            .encode_with(|| Lz4)
            .decode_with(|| Lz4)
            .calculate_prices_with(|| Lz4)
            .find_with(FinderBackend::SuffixArray, Lz4::LIMITS)
            .with_parser(ParserOptions {
                tail: TailGuard {
                    trailing_literals: 8,
                    last_match_margin: 0,
                },
                ..ParserOptions::default()
            })
            .build()
            .unwrap();
        assert_eq!(
            lz4.parser.tail,
            TailGuard {
                trailing_literals: 8,
                last_match_margin: 12,
            }
        );
    }

    #[test]
    fn raw_prefix_and_direction() {
        let crilayla = Configuration::new()
            .encode_with(|| Crilayla)
            .decode_with(|| Crilayla)
            .calculate_prices_with(|| Crilayla)
            .find_with(FinderBackend::SuffixArray, Crilayla::LIMITS)
            .build()
            .unwrap();
        let input: Vec<u8> = (0..0x400u32).map(|i| (i % 37) as u8).collect();
        let compressed = crilayla.compress(&input).unwrap();
        assert_eq!(&compressed[compressed.len() - 0x100..], &input[..0x100]);
        assert_eq!(crilayla.decompress(&compressed).unwrap(), input);
    }

    #[test]
    fn streams() {
        let lz10 = lz10().build().unwrap();
        let input = b"stream stream stream".to_vec();
        let mut compressed = Vec::new();
        lz10.compress_to_writer(&input[..], &mut compressed).unwrap();
        let mut output = Vec::new();
        lz10.decompress_to_writer(&compressed[..], &mut output).unwrap();
        assert_eq!(output, input);
    }
}
