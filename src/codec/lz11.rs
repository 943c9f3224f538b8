//! LZ11, the extended-length variant of LZ10 used by later DS titles.
//!
//! Flags work as in LZ10. The high nibble of a match's first byte picks its size:
//!
//! | Nibble | Bytes | Length |
//! | :----: | :---: | ------ |
//! | 0      | 3     | 17..=272, stored as `length - 17` in 8 bits |
//! | 1      | 4     | 273..=65808, stored as `length - 273` in 16 bits |
//! | 2..=15 | 2     | `nibble + 1` |
//!
//! The last 12 bits of every match hold `displacement - 1`.

use super::{
    check_match, check_output, nintendo, pad_to, BitOrder, BlockWriter, ByteReader, Decoder,
    EncodeInput, Encoder, FlagReader,
};
use crate::errors::Result;
use crate::find::{FindLimitations, Match};
use crate::parse::Token;
use crate::price::PriceCalculator;
use crate::window::{CircularBuffer, Replay};

#[derive(Debug, Clone, Copy, Default)]
pub struct Lz11;

impl Lz11 {
    pub const LIMITS: FindLimitations = FindLimitations::new(3, 0x10110, 1, 0x1000);

    fn push_match(blocks: &mut BlockWriter<'_>, m: &Match) {
        let d = m.displacement - 1;
        let (len, disp_hi, disp_lo) = (m.length, (d >> 8) as u8, d as u8);
        match len {
            3..=16 => {
                blocks.push(((len - 1) << 4) as u8 | disp_hi);
            }
            17..=272 => {
                let l = len - 0x11;
                blocks.push((l >> 4) as u8);
                blocks.push(((l & 0xF) << 4) as u8 | disp_hi);
            }
            _ => {
                let l = len - 0x111;
                blocks.push(0x10 | (l >> 12) as u8);
                blocks.push((l >> 4) as u8);
                blocks.push(((l & 0xF) << 4) as u8 | disp_hi);
            }
        }
        blocks.push(disp_lo);
    }

    pub(crate) fn encode_body(tokens: &[Token], out: &mut Vec<u8>) -> Result<()> {
        let mut blocks = BlockWriter::new(out, BitOrder::MsbFirst);
        for token in tokens {
            match *token {
                Token::Literal(byte) => {
                    blocks.flag(false);
                    blocks.push(byte);
                }
                Token::Match(m) => {
                    check_match(&m, &Self::LIMITS)?;
                    blocks.flag(true);
                    Self::push_match(&mut blocks, &m);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn decode_body(reader: &mut ByteReader<'_>, size: usize) -> Result<Vec<u8>> {
        let mut replay = Replay::new(CircularBuffer::new(0x1000), size);
        let mut flags = FlagReader::new(BitOrder::MsbFirst);

        while replay.len() < size {
            if !flags.next(reader)? {
                replay.literal(reader.u8()?);
                continue;
            }

            let at = reader.offset();
            let first = reader.u8()? as usize;
            let (length, hi) = match first >> 4 {
                0 => {
                    let next = reader.u8()? as usize;
                    (((first & 0xF) << 4 | next >> 4) + 0x11, next & 0xF)
                }
                1 => {
                    let (b1, b2) = (reader.u8()? as usize, reader.u8()? as usize);
                    (((first & 0xF) << 12 | b1 << 4 | b2 >> 4) + 0x111, b2 & 0xF)
                }
                n => (n + 1, first & 0xF),
            };
            let displacement = (hi << 8 | reader.u8()? as usize) + 1;
            replay.copy(displacement, length, at)?;
        }

        let out = replay.into_inner();
        check_output(&out, size, reader.offset())?;
        Ok(out)
    }
}

impl PriceCalculator for Lz11 {
    fn literal_cost(&self, run: usize) -> u32 {
        run as u32 * 9
    }

    fn match_cost(&self, length: usize, _displacement: usize) -> u32 {
        1 + match length {
            0..=16 => 16,
            17..=272 => 24,
            _ => 32,
        }
    }
}

impl Encoder for Lz11 {
    fn name(&self) -> &'static str {
        "lz11"
    }

    fn encode(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len() / 2 + 8);
        nintendo::write_header(&mut out, self.name(), nintendo::LZ11, input.data.len())?;
        Self::encode_body(input.tokens, &mut out)?;
        pad_to(&mut out, 4);
        Ok(out)
    }
}

impl Decoder for Lz11 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut reader = ByteReader::new(input);
        let size = nintendo::read_header(&mut reader, nintendo::LZ11)?;
        Self::decode_body(&mut reader, size)
    }
}
