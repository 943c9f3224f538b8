//! Yay0, the N64 and GameCube relative of Yaz0 that keeps its streams apart.
//!
//! | Offset | Description |
//! | :----: | ----------- |
//! | 0..4   | magic `"Yay0"` |
//! | 4..8   | decompressed size |
//! | 8..12  | offset of the link table |
//! | 12..16 | offset of the chunk stream |
//!
//! Flag words (big-endian, set bit = literal) start at 16. Each match takes a
//! big-endian `u16` link, `n << 12 | (displacement - 1)`, from the link table. A
//! zero `n` takes a `length - 0x12` byte from the chunk stream, otherwise the length
//! is `n + 2`. Literal bytes also come from the chunk stream.

use super::{
    check_match, check_output, check_size, ByteOrder, ByteReader, Decoder, EncodeInput, Encoder,
    WordFlagReader, WordFlags,
};
use crate::errors::{Corruption, KompressionError, Result};
use crate::find::FindLimitations;
use crate::parse::Token;
use crate::price::{FlaggedPrices, PriceCalculator};
use crate::window::{CircularBuffer, Replay};

const MAGIC: &[u8; 4] = b"Yay0";
const HEADER: usize = 16;

#[derive(Debug, Clone, Copy, Default)]
pub struct Yay0;

impl Yay0 {
    pub const LIMITS: FindLimitations = FindLimitations::new(3, 0x111, 1, 0x1000);
    const PRICES: FlaggedPrices = FlaggedPrices::two_tier(2, 17, 3);
}

impl PriceCalculator for Yay0 {
    fn literal_cost(&self, run: usize) -> u32 {
        Self::PRICES.literal_cost(run)
    }

    fn match_cost(&self, length: usize, displacement: usize) -> u32 {
        Self::PRICES.match_cost(length, displacement)
    }
}

impl Encoder for Yay0 {
    fn name(&self) -> &'static str {
        "yay0"
    }

    fn encode(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>> {
        check_size(self.name(), input.data.len(), 32)?;
        let mut flags = WordFlags::default();
        let mut links = Vec::new();
        let mut chunks = Vec::with_capacity(input.data.len() / 2);

        for token in input.tokens {
            match *token {
                Token::Literal(byte) => {
                    flags.push(true);
                    chunks.push(byte);
                }
                Token::Match(m) => {
                    check_match(&m, &Self::LIMITS)?;
                    flags.push(false);
                    let d = (m.displacement - 1) as u16;
                    if m.length < 0x12 {
                        ByteOrder::Big.put_u16(&mut links, ((m.length - 2) as u16) << 12 | d);
                    } else {
                        ByteOrder::Big.put_u16(&mut links, d);
                        chunks.push((m.length - 0x12) as u8);
                    }
                }
            }
        }

        let link_offset = HEADER + flags.byte_len();
        let chunk_offset = link_offset + links.len();
        let mut out = Vec::with_capacity(chunk_offset + chunks.len());
        out.extend_from_slice(MAGIC);
        ByteOrder::Big.put_u32(&mut out, input.data.len() as u32);
        ByteOrder::Big.put_u32(&mut out, link_offset as u32);
        ByteOrder::Big.put_u32(&mut out, chunk_offset as u32);
        flags.write(ByteOrder::Big, &mut out);
        out.extend_from_slice(&links);
        out.extend_from_slice(&chunks);
        Ok(out)
    }
}

impl Decoder for Yay0 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut header = ByteReader::new(input);
        header.magic(MAGIC)?;
        let size = header.u32(ByteOrder::Big)? as usize;
        let link_offset = header.u32(ByteOrder::Big)? as usize;
        let chunk_offset = header.u32(ByteOrder::Big)? as usize;
        if link_offset < HEADER || chunk_offset < link_offset || chunk_offset > input.len() {
            return Err(KompressionError::corrupt(8, Corruption::BadMagic));
        }

        let mut flag_words = ByteReader::with_base(&input[HEADER..link_offset], HEADER);
        let mut links = ByteReader::with_base(&input[link_offset..chunk_offset], link_offset);
        let mut chunks = ByteReader::with_base(&input[chunk_offset..], chunk_offset);

        let mut replay = Replay::new(CircularBuffer::new(0x1000), size);
        let mut flags = WordFlagReader::new(ByteOrder::Big);
        while replay.len() < size {
            if flags.next(&mut flag_words)? {
                replay.literal(chunks.u8()?);
                continue;
            }
            let at = links.offset();
            let link = links.u16(ByteOrder::Big)? as usize;
            let length = match link >> 12 {
                0 => chunks.u8()? as usize + 0x12,
                n => n + 2,
            };
            replay.copy((link & 0xFFF) + 1, length, at)?;
        }

        let out = replay.into_inner();
        check_output(&out, size, chunks.offset())?;
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::find::Match;

    #[test]
    fn streams_are_separated() {
        let tokens = [
            Token::Literal(b'y'),
            Token::Match(Match::new(1, 4, 1)),
            Token::Match(Match::new(5, 20, 1)),
        ];
        let data = [b'y'; 25];
        let input = EncodeInput {
            prefix: &[],
            data: &data,
            tokens: &tokens,
            huffman: None,
        };
        let out = Yay0.encode(&input).unwrap();
        assert_eq!(&out[8..16], &[0, 0, 0, 0x14, 0, 0, 0, 0x18]);
        assert_eq!(&out[16..20], &[0x80, 0, 0, 0]);
        assert_eq!(&out[20..24], &[0x20, 0x00, 0x00, 0x00]);
        assert_eq!(&out[24..], &[b'y', 20 - 0x12]);
        assert_eq!(Yay0.decode(&out).unwrap(), &data[..]);
    }

    #[test]
    fn offsets_out_of_order() {
        let mut bad = b"Yay0".to_vec();
        bad.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 0x20, 0, 0, 0, 0x10]);
        assert!(Yay0.decode(&bad).is_err());
    }
}
