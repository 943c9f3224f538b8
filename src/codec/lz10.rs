//! LZ10, the GBA/DS BIOS `LZ77UnComp` format.
//!
//! Each block is a flag byte, most significant bit first, where a set bit marks a
//! match. A match is two bytes: `(length - 3) << 4 | (displacement - 1) >> 8`, then
//! the low eight bits of `displacement - 1`.

use log::trace;

use super::{
    check_match, check_output, nintendo, pad_to, BitOrder, BlockWriter, ByteReader, Decoder,
    EncodeInput, Encoder, FlagReader,
};
use crate::errors::Result;
use crate::find::FindLimitations;
use crate::parse::Token;
use crate::price::{FlaggedPrices, PriceCalculator};
use crate::window::{CircularBuffer, Replay};

#[derive(Debug, Clone, Copy, Default)]
pub struct Lz10;

impl Lz10 {
    pub const LIMITS: FindLimitations = FindLimitations::new(3, 18, 1, 0x1000);
    const PRICES: FlaggedPrices = FlaggedPrices::fixed(2);

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
                    let d = m.displacement - 1;
                    blocks.flag(true);
                    blocks.push(((m.length - 3) << 4 | d >> 8) as u8);
                    blocks.push(d as u8);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn decode_body(reader: &mut ByteReader<'_>, size: usize) -> Result<Vec<u8>> {
        let mut replay = Replay::new(CircularBuffer::new(0x1000), size);
        let mut flags = FlagReader::new(BitOrder::MsbFirst);

        while replay.len() < size {
            if flags.next(reader)? {
                let at = reader.offset();
                let (hi, lo) = (reader.u8()? as usize, reader.u8()? as usize);
                let length = (hi >> 4) + 3;
                let displacement = ((hi & 0xF) << 8 | lo) + 1;
                replay.copy(displacement, length, at)?;
            } else {
                replay.literal(reader.u8()?);
            }
        }

        let out = replay.into_inner();
        check_output(&out, size, reader.offset())?;
        Ok(out)
    }
}

impl PriceCalculator for Lz10 {
    fn literal_cost(&self, run: usize) -> u32 {
        Self::PRICES.literal_cost(run)
    }

    fn match_cost(&self, length: usize, displacement: usize) -> u32 {
        Self::PRICES.match_cost(length, displacement)
    }
}

impl Encoder for Lz10 {
    fn name(&self) -> &'static str {
        "lz10"
    }

    fn encode(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len() / 2 + 8);
        nintendo::write_header(&mut out, self.name(), nintendo::LZ10, input.data.len())?;
        Self::encode_body(input.tokens, &mut out)?;
        pad_to(&mut out, 4);
        Ok(out)
    }
}

impl Decoder for Lz10 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut reader = ByteReader::new(input);
        let size = nintendo::read_header(&mut reader, nintendo::LZ10)?;
        trace!("lz10: {} bytes compressed to {}", size, input.len());
        Self::decode_body(&mut reader, size)
    }
}
