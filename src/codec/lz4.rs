//! Headerless LZ4 blocks.
//!
//! A block is a list of sequences. Each sequence starts with a token whose high
//! nibble counts literals and whose low nibble holds `match length - 4`; a nibble of
//! 15 is continued by bytes of 255 and a final byte below 255. The literals follow,
//! then a little-endian u16 offset and the match length continuation. The last
//! sequence carries literals only.

use log::trace;

use super::{check_match, ByteOrder, ByteReader, Decoder, EncodeInput, Encoder, Policy};
use crate::errors::{Corruption, KompressionError, Result};
use crate::find::FindLimitations;
use crate::parse::{TailGuard, Token};
use crate::price::PriceCalculator;
use crate::window::{CircularBuffer, Replay};

const MIN_MATCH: usize = 4;
const WINDOW: usize = 0x1_0000;

#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4;

impl Lz4 {
    pub const LIMITS: FindLimitations = FindLimitations::new(MIN_MATCH, WINDOW, 1, WINDOW - 1);
    pub const TAIL: TailGuard = TailGuard {
        trailing_literals: 5,
        last_match_margin: 12,
    };
}

/// Bytes needed to continue a nibble that saturated at 15.
#[inline]
fn extension_bytes(value: usize) -> usize {
    if value < 15 {
        0
    } else {
        (value - 15) / 255 + 1
    }
}

fn push_extension(out: &mut Vec<u8>, value: usize) {
    if value < 15 {
        return;
    }
    let mut rest = value - 15;
    while rest >= 255 {
        out.push(255);
        rest -= 255;
    }
    out.push(rest as u8);
}

fn read_extension(reader: &mut ByteReader<'_>, nibble: usize) -> Result<usize> {
    let mut value = nibble;
    if nibble == 15 {
        loop {
            let byte = reader.u8()?;
            value += byte as usize;
            if byte != 255 {
                break;
            }
        }
    }
    Ok(value)
}

fn write_sequence(out: &mut Vec<u8>, literals: &[u8], m: Option<(usize, usize)>) {
    let lits = literals.len();
    let match_nibble = m.map_or(0, |(length, _)| (length - MIN_MATCH).min(15));
    out.push((lits.min(15) << 4 | match_nibble) as u8);
    push_extension(out, lits);
    out.extend_from_slice(literals);
    if let Some((length, displacement)) = m {
        ByteOrder::Little.put_u16(out, displacement as u16);
        push_extension(out, length - MIN_MATCH);
    }
}

impl PriceCalculator for Lz4 {
    fn literal_cost(&self, run: usize) -> u32 {
        (run + extension_bytes(run)) as u32 * 8
    }

    fn match_cost(&self, length: usize, _displacement: usize) -> u32 {
        (3 + extension_bytes(length - MIN_MATCH)) as u32 * 8
    }
}

impl Encoder for Lz4 {
    fn name(&self) -> &'static str {
        "lz4-headerless"
    }

    fn policy(&self) -> Policy {
        Policy::matches().with_tail(Self::TAIL)
    }

    fn encode(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>> {
        let data = input.data;
        let mut out = Vec::with_capacity(data.len() + data.len() / 255 + 16);
        let mut anchor = 0;
        for token in input.tokens {
            if let Token::Match(m) = *token {
                check_match(&m, &Self::LIMITS)?;
                write_sequence(&mut out, &data[anchor..m.position], Some((m.length, m.displacement)));
                anchor = m.end();
            }
        }
        write_sequence(&mut out, &data[anchor..], None);
        trace!("lz4: {} bytes in {} bytes", data.len(), out.len());
        Ok(out)
    }
}

impl Decoder for Lz4 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut reader = ByteReader::new(input);
        let mut replay = Replay::new(CircularBuffer::new(WINDOW), input.len() * 4);

        loop {
            let token = reader.u8()? as usize;
            let literals = read_extension(&mut reader, token >> 4)?;
            for &byte in reader.take(literals)? {
                replay.literal(byte);
            }
            if reader.is_empty() {
                break;
            }

            let at = reader.offset();
            let displacement = reader.u16(ByteOrder::Little)? as usize;
            if displacement == 0 {
                return Err(KompressionError::corrupt(
                    at,
                    Corruption::InvalidDisplacement {
                        displacement,
                        available: replay.len().min(WINDOW),
                    },
                ));
            }
            let length = read_extension(&mut reader, token & 0xF)? + MIN_MATCH;
            replay.copy(displacement, length, at)?;
        }

        Ok(replay.into_inner())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::find::Match;

    fn input<'a>(data: &'a [u8], tokens: &'a [Token]) -> EncodeInput<'a> {
        EncodeInput {
            prefix: &[],
            data,
            tokens,
            huffman: None,
        }
    }

    #[test]
    fn empty_block_is_one_token() {
        let out = Lz4.encode(&input(&[], &[])).unwrap();
        assert_eq!(out, [0x00]);
        assert!(Lz4.decode(&out).unwrap().is_empty());
    }

    #[test]
    fn long_lengths_continue_past_the_nibble() {
        let data = vec![7u8; 300];
        let mut tokens = vec![Token::Literal(7)];
        tokens.push(Token::Match(Match::new(1, 294, 1)));
        tokens.extend(std::iter::repeat(Token::Literal(7)).take(5));
        let out = Lz4.encode(&input(&data, &tokens)).unwrap();
        // 294 - 4 = 290 = 15 + 255 + 20
        assert_eq!(&out[..6], &[0x1F, 7, 0x01, 0x00, 255, 20]);
        assert_eq!(Lz4.decode(&out).unwrap(), data);
    }

    #[test]
    fn zero_offset_is_corrupt() {
        let stream = [0x10, b'a', 0x00, 0x00, 0x00];
        assert!(Lz4.decode(&stream).is_err());
    }

    #[test]
    fn extension_sizes() {
        assert_eq!(extension_bytes(14), 0);
        assert_eq!(extension_bytes(15), 1);
        assert_eq!(extension_bytes(269), 1);
        assert_eq!(extension_bytes(270), 2);
    }

    #[test]
    fn prices_are_monotone() {
        crate::price::test::assert_monotone(&Lz4, 4..=600, &[1, 0xFFFF]);
    }
}
