//! Okumura's LZSS and the headered variant found in Tales of games.
//!
//! The decoder's 4096-byte ring starts out filled with one byte value and its
//! write cursor at `0xFEE`. Flag bytes are read least significant bit first, a set
//! bit meaning a literal. A match names an absolute ring index rather than a
//! distance: `[index & 0xFF, (index >> 4 & 0xF0) | (length - 3)]`.

use super::{
    check_match, check_output, BitOrder, BlockWriter, ByteOrder, ByteReader, Decoder, EncodeInput,
    Encoder, FlagReader,
};
use crate::errors::{Corruption, KompressionError, Result};
use crate::find::FindLimitations;
use crate::parse::Token;
use crate::price::{FlaggedPrices, PriceCalculator};
use crate::window::{CircularBuffer, Replay};

const RING: usize = 0x1000;
const START: usize = 0xFEE;
const PRICES: FlaggedPrices = FlaggedPrices::fixed(2);

pub const LIMITS: FindLimitations = FindLimitations::new(3, 18, 1, RING);

fn encode_body(tokens: &[Token], out: &mut Vec<u8>) -> Result<()> {
    let mut blocks = BlockWriter::new(out, BitOrder::LsbFirst);
    for token in tokens {
        match *token {
            Token::Literal(byte) => {
                blocks.flag(true);
                blocks.push(byte);
            }
            Token::Match(m) => {
                check_match(&m, &LIMITS)?;
                let index = (START + m.position + RING - m.displacement) % RING;
                blocks.flag(false);
                blocks.push(index as u8);
                blocks.push((index >> 4 & 0xF0) as u8 | (m.length - 3) as u8);
            }
        }
    }
    Ok(())
}

/// Decode until `size` bytes are produced, or until the input ends when `size` is `None`.
fn decode_body(reader: &mut ByteReader<'_>, fill: u8, size: Option<usize>) -> Result<Vec<u8>> {
    let expected = size.unwrap_or(reader.remaining() * 2);
    let mut replay = Replay::new(CircularBuffer::prefilled(RING, fill, START), expected);
    let mut flags = FlagReader::new(BitOrder::LsbFirst);

    loop {
        match size {
            Some(size) if replay.len() >= size => break,
            None if reader.is_empty() => break,
            _ => (),
        }

        let literal = flags.next(reader)?;
        if size.is_none() && reader.is_empty() {
            // the stream may end right after a flag byte
            break;
        }
        if literal {
            replay.literal(reader.u8()?);
        } else {
            let at = reader.offset();
            let (lo, hi) = (reader.u8()? as usize, reader.u8()? as usize);
            let index = lo | (hi & 0xF0) << 4;
            replay.copy_from_index(index, (hi & 0xF) + 3, at)?;
        }
    }

    let out = replay.into_inner();
    if let Some(size) = size {
        check_output(&out, size, reader.offset())?;
    }
    Ok(out)
}

/// Headerless LZSS with a space-filled ring; the stream ends where the input ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct Okumura;

impl PriceCalculator for Okumura {
    fn literal_cost(&self, run: usize) -> u32 {
        PRICES.literal_cost(run)
    }

    fn match_cost(&self, length: usize, displacement: usize) -> u32 {
        PRICES.match_cost(length, displacement)
    }
}

impl Encoder for Okumura {
    fn name(&self) -> &'static str {
        "lzss"
    }

    fn encode(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len());
        encode_body(input.tokens, &mut out)?;
        Ok(out)
    }
}

impl Decoder for Okumura {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        decode_body(&mut ByteReader::new(input), b' ', None)
    }
}

/// Tales of compression type 1: a 9-byte header and a zero-filled ring.
///
/// | Offset | Description |
/// | :----: | ----------- |
/// | 0      | type, `0x01` |
/// | 1..5   | compressed body size, little-endian |
/// | 5..9   | decompressed size, little-endian |
#[derive(Debug, Clone, Copy, Default)]
pub struct TalesOf01;

impl TalesOf01 {
    const TYPE: u8 = 0x01;
    const HEADER: usize = 9;
}

impl PriceCalculator for TalesOf01 {
    fn literal_cost(&self, run: usize) -> u32 {
        PRICES.literal_cost(run)
    }

    fn match_cost(&self, length: usize, displacement: usize) -> u32 {
        PRICES.match_cost(length, displacement)
    }
}

impl Encoder for TalesOf01 {
    fn name(&self) -> &'static str {
        "tales-of-01"
    }

    fn encode(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>> {
        super::check_size(self.name(), input.data.len(), 32)?;
        let mut out = vec![0; Self::HEADER];
        out[0] = Self::TYPE;
        encode_body(input.tokens, &mut out)?;

        let body = out.len() - Self::HEADER;
        super::check_size(self.name(), body, 32)?;
        ByteOrder::Little.set_u32(&mut out, 1, body as u32);
        ByteOrder::Little.set_u32(&mut out, 5, input.data.len() as u32);
        Ok(out)
    }
}

impl Decoder for TalesOf01 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut header = ByteReader::new(input);
        let kind = header.u8()?;
        if kind != Self::TYPE {
            return Err(KompressionError::corrupt(0, Corruption::UnknownMethod(kind)));
        }
        let body = header.u32(ByteOrder::Little)? as usize;
        let size = header.u32(ByteOrder::Little)? as usize;
        let mut reader = ByteReader::with_base(header.take(body)?, Self::HEADER);
        decode_body(&mut reader, 0, Some(size))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::find::Match;

    #[test]
    fn matches_name_ring_indices() {
        let tokens = [
            Token::Literal(b'a'),
            Token::Literal(b'b'),
            Token::Match(Match::new(2, 4, 2)),
        ];
        let mut out = Vec::new();
        encode_body(&tokens, &mut out).unwrap();
        // source index 0xFEE, the ring position of 'a'
        assert_eq!(out, [0b011, b'a', b'b', 0xEE, 0xF1]);
        assert_eq!(Okumura.decode(&out).unwrap(), b"ababab");
    }

    #[test]
    fn prefilled_spaces_are_referencable() {
        // a match against the initial ring contents yields spaces
        let stream = [0b0, 0x00, 0x00];
        assert_eq!(Okumura.decode(&stream).unwrap(), b"   ");
    }

    #[test]
    fn stream_ends_with_the_input() {
        assert_eq!(Okumura.decode(&[0b1, b'x']).unwrap(), b"x");
        let mut stream = vec![0xFF];
        stream.extend_from_slice(b"abcdefgh");
        stream.push(0xFF);
        assert_eq!(Okumura.decode(&stream).unwrap(), b"abcdefgh");
    }

    #[test]
    fn half_a_match_is_truncation() {
        assert!(Okumura.decode(&[0b0, 0x00]).is_err());
    }

    #[test]
    fn tales_header() {
        let tokens = [Token::Literal(1), Token::Match(Match::new(1, 3, 1))];
        let input = EncodeInput {
            prefix: &[],
            data: &[1, 1, 1, 1],
            tokens: &tokens,
            huffman: None,
        };
        let out = TalesOf01.encode(&input).unwrap();
        assert_eq!(&out[..9], &[1, 4, 0, 0, 0, 4, 0, 0, 0]);
        assert_eq!(TalesOf01.decode(&out).unwrap(), [1, 1, 1, 1]);
    }
}
