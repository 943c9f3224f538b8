//! `vpk0`, the LZSS variant used by Nintendo in **Super Smash Bros. 64** and other
//! N64 titles.
//!
//! | Byte Num | Description |
//! | :------: | ----------- |
//! | 0..4     | magic bytes (`"vpk0"`) |
//! | 4..8     | decompressed size, big endian |
//! | 8        | sample method (0 one sample, 1 two sample) |
//!
//! Two bit-width trees follow the header, one for offsets and one for lengths (see
//! [`tree`]). The rest of the file is a big endian bitstream: a `0` bit and an 8-bit
//! literal, or a `1` bit, an offset and a length. Each value is its tree code
//! followed by the value itself in the width that code names.
//!
//! With two sample offsets, the displacement plus eight is divided by four. A zero
//! remainder stores the quotient alone; otherwise `remainder - 1` (always below
//! three) is stored first and the quotient second.

use std::io::Cursor;

use bitstream_io::{BigEndian, BitReader, BitWriter};
use log::trace;

use super::{check_match, check_size, ByteOrder, ByteReader, Decoder, EncodeInput, Encoder};
use crate::errors::{Corruption, KompressionError, Result};
use crate::find::FindLimitations;
use crate::parse::Token;
use crate::price::{bit_width, PriceCalculator};
use crate::window::CircularBuffer;

pub(crate) mod tree;

use self::tree::{SizeTable, SizeTree, WidthCounts};

const MAGIC: &[u8; 4] = b"vpk0";
const HEADER: usize = 9;
/// Largest window a decoder keeps; displacements beyond it are rejected.
const MAX_WINDOW: usize = 1 << 24;

/// How offsets are stored.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Vpk0Method {
    OneSample = 0,
    TwoSample = 1,
}

/// An offset as it is written to the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sample {
    One(u32),
    Two { first: u32, second: u32 },
}

impl Sample {
    fn new(method: Vpk0Method, displacement: usize) -> Self {
        match method {
            Vpk0Method::OneSample => Self::One(displacement as u32),
            Vpk0Method::TwoSample => {
                let biased = displacement as u32 + 8;
                match biased % 4 {
                    0 => Self::One(biased / 4),
                    rem => Self::Two {
                        first: rem - 1,
                        second: biased / 4,
                    },
                }
            }
        }
    }

    fn values(self) -> impl Iterator<Item = u32> {
        let (a, b) = match self {
            Self::One(v) => (v, None),
            Self::Two { first, second } => (first, Some(second)),
        };
        std::iter::once(a).chain(b)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Vpk0 {
    method: Vpk0Method,
}

impl Vpk0 {
    pub const LIMITS: FindLimitations = FindLimitations::new(3, 0xFF, 1, 0xFFFF);

    pub fn new(method: Vpk0Method) -> Self {
        Self { method }
    }
}

impl Default for Vpk0 {
    fn default() -> Self {
        Self::new(Vpk0Method::OneSample)
    }
}

/// Assumed code length for each tree lookup; the real trees are built after parsing.
const CODE_ESTIMATE: u32 = 2;

impl PriceCalculator for Vpk0 {
    fn literal_cost(&self, run: usize) -> u32 {
        run as u32 * 9
    }

    fn match_cost(&self, length: usize, displacement: usize) -> u32 {
        let offset: u32 = Sample::new(self.method, displacement)
            .values()
            .map(|v| CODE_ESTIMATE + bit_width(v as usize))
            .sum();
        1 + offset + CODE_ESTIMATE + bit_width(length)
    }
}

impl Encoder for Vpk0 {
    fn name(&self) -> &'static str {
        match self.method {
            Vpk0Method::OneSample => "vpk0",
            Vpk0Method::TwoSample => "vpk0-two-sample",
        }
    }

    fn encode(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>> {
        check_size(self.name(), input.data.len(), 32)?;

        let mut offset_widths = WidthCounts::new();
        let mut length_widths = WidthCounts::new();
        for token in input.tokens {
            if let Token::Match(m) = *token {
                check_match(&m, &Self::LIMITS)?;
                for v in Sample::new(self.method, m.displacement).values() {
                    *offset_widths.entry(tree::bit_width(v)).or_insert(0) += 1;
                }
                *length_widths.entry(tree::bit_width(m.length as u32)).or_insert(0) += 1;
            }
        }
        let offsets = SizeTree::from_counts(&offset_widths);
        let lengths = SizeTree::from_counts(&length_widths);
        trace!("vpk0 offsets {}", offsets);
        trace!("vpk0 lengths {}", lengths);

        let mut out = Vec::with_capacity(input.data.len() / 2 + 16);
        {
            let mut bits = BitWriter::endian(&mut out, BigEndian);
            bits.write_bytes(MAGIC)?;
            bits.write(32, input.data.len() as u32)?;
            bits.write(8, self.method as u8)?;
            offsets.table.write(&mut bits)?;
            lengths.table.write(&mut bits)?;

            for token in input.tokens {
                match *token {
                    Token::Literal(byte) => {
                        bits.write_bit(false)?;
                        bits.write(8, byte)?;
                    }
                    Token::Match(m) => {
                        bits.write_bit(true)?;
                        for v in Sample::new(self.method, m.displacement).values() {
                            offsets.write_value(&mut bits, v)?;
                        }
                        lengths.write_value(&mut bits, m.length as u32)?;
                    }
                }
            }
            bits.byte_align()?;
        }
        Ok(out)
    }
}

impl Decoder for Vpk0 {
    /// Decodes either sample method; the header decides, not `self`.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut header = ByteReader::new(input);
        header.magic(MAGIC)?;
        let size = header.u32(ByteOrder::Big)? as usize;
        let method = match header.u8()? {
            0 => Vpk0Method::OneSample,
            1 => Vpk0Method::TwoSample,
            unknown => {
                return Err(KompressionError::corrupt(
                    HEADER - 1,
                    Corruption::UnknownMethod(unknown),
                ))
            }
        };

        let mut bits = BitReader::endian(Cursor::new(header.rest()), BigEndian);
        let offsets = SizeTable::read(&mut bits)?;
        let lengths = SizeTable::read(&mut bits)?;
        trace!("vpk0 {:?}: {} bytes, offsets {}, lengths {}", method, size, offsets, lengths);

        let capacity = size.min(MAX_WINDOW).max(1);
        let mut window = CircularBuffer::new(capacity);
        let mut out = Vec::with_capacity(capacity);

        while out.len() < size {
            if !bits.read_bit()? {
                let byte = bits.read(8)?;
                window.write(byte);
                out.push(byte);
                continue;
            }

            let first = offsets.read_value(&mut bits)? as usize;
            let displacement = match method {
                Vpk0Method::OneSample => first,
                Vpk0Method::TwoSample if first < 3 => {
                    let second = offsets.read_value(&mut bits)? as usize;
                    (first + 1 + (second << 2)).saturating_sub(8)
                }
                Vpk0Method::TwoSample => (first << 2).saturating_sub(8),
            };
            let length = lengths.read_value(&mut bits)? as usize;
            if length == 0 {
                return Err(KompressionError::corrupt_at_unknown(Corruption::InvalidLength(0)));
            }
            window.copy(displacement, length, &mut out)?;
        }

        if out.len() != size {
            return Err(KompressionError::corrupt_at_unknown(Corruption::SizeMismatch {
                expected: size,
                actual: out.len(),
            }));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::find::Match;

    fn encode(method: Vpk0Method, data: &[u8], tokens: &[Token]) -> Vec<u8> {
        let input = EncodeInput {
            prefix: &[],
            data,
            tokens,
            huffman: None,
        };
        Vpk0::new(method).encode(&input).unwrap()
    }

    #[test]
    fn two_sample_split() {
        assert_eq!(Sample::new(Vpk0Method::TwoSample, 4), Sample::One(3));
        assert_eq!(Sample::new(Vpk0Method::TwoSample, 1), Sample::Two { first: 0, second: 2 });
        assert_eq!(Sample::new(Vpk0Method::TwoSample, 7), Sample::Two { first: 2, second: 3 });
        assert_eq!(Sample::new(Vpk0Method::OneSample, 7), Sample::One(7));
    }

    #[test]
    fn header_layout() {
        let out = encode(Vpk0Method::TwoSample, b"", &[]);
        // magic, size, method, then two empty trees (a single set bit each)
        assert_eq!(out, [b'v', b'p', b'k', b'0', 0, 0, 0, 0, 1, 0b1100_0000]);
        assert!(Vpk0::default().decode(&out).unwrap().is_empty());
    }

    #[test]
    fn both_methods_decode() {
        let data = b"YAAAAAAAAAAAAAA";
        let tokens = [
            Token::Literal(b'Y'),
            Token::Literal(b'A'),
            Token::Match(Match::new(2, 13, 1)),
        ];
        for &method in &[Vpk0Method::OneSample, Vpk0Method::TwoSample] {
            let out = encode(method, data, &tokens);
            assert_eq!(out[8], method as u8);
            assert_eq!(Vpk0::default().decode(&out).unwrap(), &data[..]);
        }
    }

    #[test]
    fn rejects_bad_header() {
        assert!(Vpk0::default().decode(b"vpk1\0\0\0\0\0\xFF").is_err());
        match Vpk0::default().decode(b"vpk0\0\0\0\x01\x02\xFF") {
            Err(KompressionError::CorruptStream {
                offset: Some(8),
                reason: Corruption::UnknownMethod(2),
            }) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn prices_are_monotone() {
        crate::price::test::assert_monotone(&Vpk0::default(), 3..=255, &[1, 300, 0xFFFF]);
        crate::price::test::assert_monotone(
            &Vpk0::new(Vpk0Method::TwoSample),
            3..=255,
            &[1, 4, 0xFFFF],
        );
    }
}
