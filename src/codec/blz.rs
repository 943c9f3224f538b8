//! Backward LZ77, as used for compressed DS overlays and ARM9 binaries.
//!
//! The file is decompressed in place from its end toward its start, so metadata sits
//! in an 8-byte footer:
//!
//! | Offset from end | Description |
//! | :-------------: | ----------- |
//! | -8 | u32 LE: low 24 bits `top`, the size of the compressed region including padding and footer; high 8 bits `bottom`, the size of padding plus footer |
//! | -4 | u32 LE: decompressed size minus file size |
//!
//! Bytes before `top` are stored uncompressed. Inside the region the token stream is
//! read from the highest address down: flag bytes most significant bit first, a set
//! bit marking a match stored as a u16 `(length - 3) << 12 | (displacement - 3)`.
//! Read in reverse, the stream is an ordinary forward LZ77 stream of the reversed
//! output, which is how this codec writes and reads it.

use log::trace;

use super::{
    check_match, check_output, check_size, BitOrder, BlockWriter, ByteOrder, ByteReader, Decoder, EncodeInput,
    Encoder, FlagReader, Policy,
};
use crate::errors::{Corruption, KompressionError, Result};
use crate::find::FindLimitations;
use crate::parse::Token;
use crate::price::{FlaggedPrices, PriceCalculator};
use crate::window::{CircularBuffer, Replay};

const FOOTER: usize = 8;
const PAD: u8 = 0xFF;

#[derive(Debug, Clone, Copy, Default)]
pub struct BackwardLz77;

impl BackwardLz77 {
    pub const LIMITS: FindLimitations = FindLimitations::new(3, 18, 3, 0x1002);
    const PRICES: FlaggedPrices = FlaggedPrices::fixed(2);
}

impl PriceCalculator for BackwardLz77 {
    fn literal_cost(&self, run: usize) -> u32 {
        Self::PRICES.literal_cost(run)
    }

    fn match_cost(&self, length: usize, displacement: usize) -> u32 {
        Self::PRICES.match_cost(length, displacement)
    }
}

impl Encoder for BackwardLz77 {
    fn name(&self) -> &'static str {
        "backward-lz77"
    }

    fn policy(&self) -> Policy {
        Policy::matches().backward()
    }

    fn encode(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>> {
        check_size(self.name(), input.len(), 32)?;

        let mut stream = Vec::with_capacity(input.data.len() / 2 + 8);
        {
            let mut blocks = BlockWriter::new(&mut stream, BitOrder::MsbFirst);
            for token in input.tokens {
                match *token {
                    Token::Literal(byte) => {
                        blocks.flag(false);
                        blocks.push(byte);
                    }
                    Token::Match(m) => {
                        check_match(&m, &Self::LIMITS)?;
                        let d = m.displacement - 3;
                        blocks.flag(true);
                        blocks.push(((m.length - 3) << 4 | d >> 8) as u8);
                        blocks.push(d as u8);
                    }
                }
            }
        }

        let mut out = Vec::with_capacity(input.prefix.len() + stream.len() + FOOTER + 3);
        out.extend_from_slice(input.prefix);
        out.extend(stream.iter().rev());
        let mut padding = 0;
        while out.len() % 4 != 0 {
            out.push(PAD);
            padding += 1;
        }

        let bottom = padding + FOOTER;
        let top = stream.len() + bottom;
        check_size(self.name(), top, 24)?;
        ByteOrder::Little.put_u32(&mut out, (top | bottom << 24) as u32);

        let file_len = out.len() + 4;
        let delta = input.len() as i64 - file_len as i64;
        ByteOrder::Little.put_u32(&mut out, delta as i32 as u32);

        trace!("backward-lz77: top {:#x}, bottom {:#x}, delta {}", top, bottom, delta);
        Ok(out)
    }
}

impl Decoder for BackwardLz77 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let bad_footer =
            || KompressionError::corrupt(input.len().saturating_sub(FOOTER), Corruption::BadFooter);
        if input.len() < FOOTER {
            return Err(KompressionError::corrupt(input.len(), Corruption::Truncated));
        }

        let mut footer = ByteReader::with_base(&input[input.len() - FOOTER..], input.len() - FOOTER);
        let bounds = footer.u32(ByteOrder::Little)? as usize;
        let delta = footer.u32(ByteOrder::Little)? as i32;
        let (top, bottom) = (bounds & 0xFF_FFFF, bounds >> 24);
        if bottom < FOOTER || top < bottom || top > input.len() {
            return Err(bad_footer());
        }

        let total = input.len() as i64 + i64::from(delta);
        let raw = input.len() - top;
        if total < raw as i64 {
            return Err(bad_footer());
        }
        let size = total as usize - raw;

        let region: Vec<u8> = input[raw..input.len() - bottom].iter().rev().copied().collect();
        let mut reader = ByteReader::new(&region);
        let mut replay = Replay::new(CircularBuffer::new(0x1002), size);
        let mut flags = FlagReader::new(BitOrder::MsbFirst);

        while replay.len() < size {
            let at = (input.len() - bottom).saturating_sub(reader.offset() + 1);
            if flags.next(&mut reader)? {
                let (hi, lo) = (reader.u8()? as usize, reader.u8()? as usize);
                let length = (hi >> 4) + 3;
                let displacement = ((hi & 0xF) << 8 | lo) + 3;
                replay.copy(displacement, length, at)?;
            } else {
                replay.literal(reader.u8()?);
            }
        }

        let decoded = replay.into_inner();
        check_output(&decoded, size, raw)?;

        let mut out = Vec::with_capacity(raw + size);
        out.extend_from_slice(&input[..raw]);
        out.extend(decoded.iter().rev());
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::find::Match;

    #[test]
    fn empty_input_is_a_bare_footer() {
        let input = EncodeInput {
            prefix: &[],
            data: &[],
            tokens: &[],
            huffman: None,
        };
        let out = BackwardLz77.encode(&input).unwrap();
        assert_eq!(out, [0x08, 0, 0, 0x08, 0xF8, 0xFF, 0xFF, 0xFF]);
        assert!(BackwardLz77.decode(&out).unwrap().is_empty());
    }

    #[test]
    fn stream_is_stored_reversed() {
        // "xyzxyz" reversed is "zyxzyx": three literals, then a match 3 back
        let data = b"zyxzyx";
        let tokens = [
            Token::Literal(b'z'),
            Token::Literal(b'y'),
            Token::Literal(b'x'),
            Token::Match(Match::new(3, 3, 3)),
        ];
        let input = EncodeInput {
            prefix: &[],
            data,
            tokens: &tokens,
            huffman: None,
        };
        let out = BackwardLz77.encode(&input).unwrap();
        // flags 0b0001_0000, z, y, x, 0x00, 0x00, reversed, then two bytes of padding
        assert_eq!(&out[..8], &[0x00, 0x00, b'x', b'y', b'z', 0x10, PAD, PAD]);
        assert_eq!(&out[8..12], &[16, 0, 0, 10]);
        assert_eq!(BackwardLz77.decode(&out).unwrap(), b"xyzxyz");
    }

    #[test]
    fn uncompressed_prefix_is_copied() {
        let mut file = b"head".to_vec();
        // an empty region: top = bottom = 8
        file.extend_from_slice(&[0x08, 0, 0, 0x08, 0xF8, 0xFF, 0xFF, 0xFF]);
        assert_eq!(BackwardLz77.decode(&file).unwrap(), b"head");
    }

    #[test]
    fn footer_out_of_bounds() {
        let file = [0x20, 0, 0, 0x08, 0, 0, 0, 0];
        match BackwardLz77.decode(&file) {
            Err(KompressionError::CorruptStream {
                reason: Corruption::BadFooter,
                ..
            }) => (),
            other => panic!("unexpected {:?}", other),
        }
    }
}
