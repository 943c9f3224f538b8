//! Yaz0, used across Nintendo's GameCube, Wii and Switch titles.
//!
//! | Offset | Description |
//! | :----: | ----------- |
//! | 0..4   | magic `"Yaz0"` |
//! | 4..8   | decompressed size |
//! | 8..16  | reserved, zero |
//!
//! Blocks start with a flag byte, most significant bit first, where a set bit marks
//! a literal. A match is `n << 4 | (displacement - 1) >> 8` and the low displacement
//! byte; `n == 0` adds a third byte holding `length - 0x12`, otherwise the length
//! is `n + 2`.

use super::{
    check_match, check_output, check_size, BitOrder, BlockWriter, ByteOrder, ByteReader, Decoder,
    EncodeInput, Encoder, FlagReader,
};
use crate::errors::Result;
use crate::find::FindLimitations;
use crate::parse::Token;
use crate::price::{FlaggedPrices, PriceCalculator};
use crate::window::{CircularBuffer, Replay};

const MAGIC: &[u8; 4] = b"Yaz0";

#[derive(Debug, Clone, Copy)]
pub struct Yaz0 {
    /// order of the size field; big-endian on every console but the Switch
    pub order: ByteOrder,
}

impl Yaz0 {
    pub const LIMITS: FindLimitations = FindLimitations::new(3, 0x111, 1, 0x1000);
    const PRICES: FlaggedPrices = FlaggedPrices::two_tier(2, 17, 3);

    pub const fn new(order: ByteOrder) -> Self {
        Self { order }
    }
}

impl PriceCalculator for Yaz0 {
    fn literal_cost(&self, run: usize) -> u32 {
        Self::PRICES.literal_cost(run)
    }

    fn match_cost(&self, length: usize, displacement: usize) -> u32 {
        Self::PRICES.match_cost(length, displacement)
    }
}

impl Encoder for Yaz0 {
    fn name(&self) -> &'static str {
        "yaz0"
    }

    fn encode(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>> {
        check_size(self.name(), input.data.len(), 32)?;
        let mut out = Vec::with_capacity(input.len() / 2 + 16);
        out.extend_from_slice(MAGIC);
        self.order.put_u32(&mut out, input.data.len() as u32);
        out.extend_from_slice(&[0; 8]);

        let mut blocks = BlockWriter::new(&mut out, BitOrder::MsbFirst);
        for token in input.tokens {
            match *token {
                Token::Literal(byte) => {
                    blocks.flag(true);
                    blocks.push(byte);
                }
                Token::Match(m) => {
                    check_match(&m, &Self::LIMITS)?;
                    let d = m.displacement - 1;
                    blocks.flag(false);
                    if m.length < 0x12 {
                        blocks.push(((m.length - 2) << 4 | d >> 8) as u8);
                        blocks.push(d as u8);
                    } else {
                        blocks.push((d >> 8) as u8);
                        blocks.push(d as u8);
                        blocks.push((m.length - 0x12) as u8);
                    }
                }
            }
        }
        Ok(out)
    }
}

impl Decoder for Yaz0 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut reader = ByteReader::new(input);
        reader.magic(MAGIC)?;
        let size = reader.u32(self.order)? as usize;
        reader.take(8)?;

        let mut replay = Replay::new(CircularBuffer::new(0x1000), size);
        let mut flags = FlagReader::new(BitOrder::MsbFirst);
        while replay.len() < size {
            if flags.next(&mut reader)? {
                replay.literal(reader.u8()?);
                continue;
            }
            let at = reader.offset();
            let (hi, lo) = (reader.u8()? as usize, reader.u8()? as usize);
            let length = match hi >> 4 {
                0 => reader.u8()? as usize + 0x12,
                n => n + 2,
            };
            replay.copy(((hi & 0xF) << 8 | lo) + 1, length, at)?;
        }

        let out = replay.into_inner();
        check_output(&out, size, reader.offset())?;
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::find::Match;

    #[test]
    fn long_match_uses_third_byte() {
        let tokens = [Token::Literal(7), Token::Match(Match::new(1, 0x111, 1))];
        let input = EncodeInput {
            prefix: &[],
            data: &[7; 0x112],
            tokens: &tokens,
            huffman: None,
        };
        let yaz0 = Yaz0::new(ByteOrder::Big);
        let out = yaz0.encode(&input).unwrap();
        assert_eq!(&out[16..], &[0b1000_0000, 7, 0x00, 0x00, 0xFF]);
        assert_eq!(yaz0.decode(&out).unwrap(), vec![7; 0x112]);
    }

    #[test]
    fn bad_magic() {
        let yaz0 = Yaz0::new(ByteOrder::Big);
        assert!(yaz0.decode(b"Yay0\0\0\0\0\0\0\0\0\0\0\0\0").is_err());
    }
}
