//! MIO0, the N64 format behind most first-party cartridge data.
//!
//! | Offset | Description |
//! | :----: | ----------- |
//! | 0..4   | magic `"MIO0"` |
//! | 4..8   | decompressed size |
//! | 8..12  | offset of the compressed (match) stream |
//! | 12..16 | offset of the uncompressed (literal) stream |
//!
//! Flag words start at 16, set bit = literal. A match is a `u16` holding
//! `(length - 3) << 12 | (displacement - 1)`.

use super::{
    check_match, check_output, check_size, ByteOrder, ByteReader, Decoder, EncodeInput, Encoder,
    WordFlagReader, WordFlags,
};
use crate::errors::{Corruption, KompressionError, Result};
use crate::find::FindLimitations;
use crate::parse::Token;
use crate::price::{FlaggedPrices, PriceCalculator};
use crate::window::{CircularBuffer, Replay};

const MAGIC: &[u8; 4] = b"MIO0";
const HEADER: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct Mio0 {
    pub order: ByteOrder,
}

impl Mio0 {
    pub const LIMITS: FindLimitations = FindLimitations::new(3, 18, 1, 0x1000);
    const PRICES: FlaggedPrices = FlaggedPrices::fixed(2);

    pub const fn new(order: ByteOrder) -> Self {
        Self { order }
    }
}

impl PriceCalculator for Mio0 {
    fn literal_cost(&self, run: usize) -> u32 {
        Self::PRICES.literal_cost(run)
    }

    fn match_cost(&self, length: usize, displacement: usize) -> u32 {
        Self::PRICES.match_cost(length, displacement)
    }
}

impl Encoder for Mio0 {
    fn name(&self) -> &'static str {
        "mio0"
    }

    fn encode(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>> {
        check_size(self.name(), input.data.len(), 32)?;
        let mut flags = WordFlags::default();
        let mut matches = Vec::new();
        let mut literals = Vec::with_capacity(input.data.len() / 2);

        for token in input.tokens {
            match *token {
                Token::Literal(byte) => {
                    flags.push(true);
                    literals.push(byte);
                }
                Token::Match(m) => {
                    check_match(&m, &Self::LIMITS)?;
                    flags.push(false);
                    let word = ((m.length - 3) << 12 | (m.displacement - 1)) as u16;
                    self.order.put_u16(&mut matches, word);
                }
            }
        }

        let comp_offset = HEADER + flags.byte_len();
        let uncomp_offset = comp_offset + matches.len();
        let mut out = Vec::with_capacity(uncomp_offset + literals.len());
        out.extend_from_slice(MAGIC);
        self.order.put_u32(&mut out, input.data.len() as u32);
        self.order.put_u32(&mut out, comp_offset as u32);
        self.order.put_u32(&mut out, uncomp_offset as u32);
        flags.write(self.order, &mut out);
        out.extend_from_slice(&matches);
        out.extend_from_slice(&literals);
        Ok(out)
    }
}

impl Decoder for Mio0 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut header = ByteReader::new(input);
        header.magic(MAGIC)?;
        let size = header.u32(self.order)? as usize;
        let comp_offset = header.u32(self.order)? as usize;
        let uncomp_offset = header.u32(self.order)? as usize;
        if comp_offset < HEADER || comp_offset > input.len() || uncomp_offset > input.len() {
            return Err(KompressionError::corrupt(8, Corruption::BadMagic));
        }

        let mut flag_words = ByteReader::with_base(&input[HEADER..comp_offset], HEADER);
        let mut matches = ByteReader::with_base(&input[comp_offset..], comp_offset);
        let mut literals = ByteReader::with_base(&input[uncomp_offset..], uncomp_offset);

        let mut replay = Replay::new(CircularBuffer::new(0x1000), size);
        let mut flags = WordFlagReader::new(self.order);
        while replay.len() < size {
            if flags.next(&mut flag_words)? {
                replay.literal(literals.u8()?);
            } else {
                let at = matches.offset();
                let word = matches.u16(self.order)? as usize;
                replay.copy((word & 0xFFF) + 1, (word >> 12) + 3, at)?;
            }
        }

        let out = replay.into_inner();
        check_output(&out, size, literals.offset())?;
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::find::Match;

    #[test]
    fn little_endian_variant() {
        let tokens = [Token::Literal(b'm'), Token::Match(Match::new(1, 18, 1))];
        let data = [b'm'; 19];
        let input = EncodeInput {
            prefix: &[],
            data: &data,
            tokens: &tokens,
            huffman: None,
        };
        let mio0 = Mio0::new(ByteOrder::Little);
        let out = mio0.encode(&input).unwrap();
        assert_eq!(&out[4..16], &[19, 0, 0, 0, 0x14, 0, 0, 0, 0x16, 0, 0, 0]);
        assert_eq!(&out[16..], &[0, 0, 0, 0x80, 0x00, 0xF0, b'm']);
        assert_eq!(mio0.decode(&out).unwrap(), &data[..]);
        assert!(Mio0::new(ByteOrder::Big).decode(&out).is_err());
    }
}
