//! Level-5's container around the Nintendo bodies.
//!
//! A little-endian `u32` holds `size << 3 | method`, followed by a body in the
//! matching Nintendo format without that format's own header.

use log::debug;

use super::{
    check_size, huff::NintendoHuffman, lz10::Lz10, pad_to, rle::Rle, ByteOrder, ByteReader,
    Decoder, EncodeInput, Encoder, Policy,
};
use crate::errors::{Corruption, KompressionError, Result};
use crate::huffman::{BitDepth, HuffmanTreeBuilder, NibbleOrder};
use crate::price::PriceCalculator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level5Method {
    Raw = 0,
    Lz10 = 1,
    Huffman4 = 2,
    Huffman8 = 3,
    Rle = 4,
}

impl Level5Method {
    fn from_bits(bits: u8, at: usize) -> Result<Self> {
        Ok(match bits {
            0 => Self::Raw,
            1 => Self::Lz10,
            2 => Self::Huffman4,
            3 => Self::Huffman8,
            4 => Self::Rle,
            unk => return Err(KompressionError::corrupt(at, Corruption::UnknownMethod(unk))),
        })
    }

    fn huffman(self) -> Option<HuffmanTreeBuilder> {
        let depth = match self {
            Self::Huffman4 => BitDepth::Four,
            Self::Huffman8 => BitDepth::Eight,
            _ => return None,
        };
        Some(HuffmanTreeBuilder::new(depth, NibbleOrder::LowFirst))
    }
}

/// Encodes with one method; decodes whatever method the header names.
#[derive(Debug, Clone, Copy)]
pub struct Level5 {
    pub method: Level5Method,
}

impl Level5 {
    pub const MAX_SIZE: usize = (1 << 29) - 1;

    pub const fn new(method: Level5Method) -> Self {
        Self { method }
    }
}

impl PriceCalculator for Level5 {
    fn literal_cost(&self, run: usize) -> u32 {
        match self.method {
            Level5Method::Rle => Rle.literal_cost(run),
            _ => Lz10.literal_cost(run),
        }
    }

    fn match_cost(&self, length: usize, displacement: usize) -> u32 {
        match self.method {
            Level5Method::Rle => Rle.match_cost(length, displacement),
            _ => Lz10.match_cost(length, displacement),
        }
    }
}

impl Encoder for Level5 {
    fn name(&self) -> &'static str {
        "level5"
    }

    fn policy(&self) -> Policy {
        match self.method {
            Level5Method::Lz10 | Level5Method::Rle => Policy::matches(),
            _ => Policy::plain(),
        }
    }

    fn encode(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>> {
        let size = input.data.len();
        check_size(self.name(), size, 29)?;

        let mut out = Vec::with_capacity(size / 2 + 8);
        ByteOrder::Little.put_u32(&mut out, (size as u32) << 3 | self.method as u32);
        match self.method {
            Level5Method::Raw => out.extend_from_slice(input.data),
            Level5Method::Lz10 => Lz10::encode_body(input.tokens, &mut out)?,
            Level5Method::Rle => Rle::encode_body(input.data, input.tokens, &mut out)?,
            Level5Method::Huffman4 | Level5Method::Huffman8 => {
                let builder = self.method.huffman().ok_or(
                    KompressionError::InvalidConfiguration("level5 method has no huffman depth"),
                )?;
                NintendoHuffman::encode_body(&builder, input.data, &mut out)?;
            }
        }
        pad_to(&mut out, 4);
        Ok(out)
    }
}

impl Decoder for Level5 {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut reader = ByteReader::new(input);
        let word = reader
            .u32(ByteOrder::Little)
            .map_err(|_| KompressionError::corrupt(0, Corruption::BadMagic))?;
        let method = Level5Method::from_bits((word & 0x7) as u8, 0)?;
        let size = (word >> 3) as usize;
        debug!("level5: method {:?}, {} bytes", method, size);

        match method {
            Level5Method::Raw => Ok(reader.take(size)?.to_vec()),
            Level5Method::Lz10 => Lz10::decode_body(&mut reader, size),
            Level5Method::Rle => Rle::decode_body(&mut reader, size),
            Level5Method::Huffman4 | Level5Method::Huffman8 => match method.huffman() {
                Some(builder) => NintendoHuffman::decode_body(&reader, &builder, size),
                None => Err(KompressionError::corrupt(0, Corruption::UnknownMethod(method as u8))),
            },
        }
    }
}
