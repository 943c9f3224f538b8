//! Nintendo Huffman (`HuffUnComp`) with 4-bit or 8-bit symbols.
//!
//! The header's method byte is `0x20 | bits`. It is followed by the tree table and
//! the coded words described in [`crate::huffman`]. The header does not record
//! nibble order, so the decoder is told which one to expect.

use super::{nintendo, ByteReader, Decoder, EncodeInput, Encoder, Policy};
use crate::errors::{Corruption, KompressionError, Result};
use crate::huffman::{BitDepth, HuffmanTreeBuilder, NibbleOrder};

#[derive(Debug, Clone, Copy)]
pub struct NintendoHuffman {
    /// nibble order used when decoding 4-bit data
    pub order: NibbleOrder,
}

impl Default for NintendoHuffman {
    fn default() -> Self {
        Self {
            order: NibbleOrder::LowFirst,
        }
    }
}

impl NintendoHuffman {
    pub(crate) fn encode_body(builder: &HuffmanTreeBuilder, data: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let tree = builder.build(data)?;
        builder.encode(&tree, data, out)
    }

    pub(crate) fn decode_body(
        reader: &ByteReader<'_>,
        builder: &HuffmanTreeBuilder,
        size: usize,
    ) -> Result<Vec<u8>> {
        builder.decode(reader.rest(), size, reader.offset())
    }

    fn depth_of(method: u8, at: usize) -> Result<BitDepth> {
        match method & 0x0F {
            4 => Ok(BitDepth::Four),
            8 => Ok(BitDepth::Eight),
            _ => Err(KompressionError::corrupt(at, Corruption::UnknownMethod(method))),
        }
    }
}

impl Encoder for NintendoHuffman {
    fn name(&self) -> &'static str {
        "huffman"
    }

    fn policy(&self) -> Policy {
        Policy::plain().with_huffman()
    }

    fn encode(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>> {
        let builder = input.huffman()?;
        let mut out = Vec::with_capacity(input.len() + 520);
        let method = nintendo::HUFFMAN | builder.depth.bits() as u8;
        nintendo::write_header(&mut out, self.name(), method, input.data.len())?;
        Self::encode_body(builder, input.data, &mut out)?;
        Ok(out)
    }
}

impl Decoder for NintendoHuffman {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let method = *input
            .first()
            .ok_or_else(|| KompressionError::corrupt(0, Corruption::BadMagic))?;
        if method & 0xF0 != nintendo::HUFFMAN {
            return Err(KompressionError::corrupt(0, Corruption::UnknownMethod(method)));
        }
        let depth = Self::depth_of(method, 0)?;

        let mut reader = ByteReader::new(input);
        let size = nintendo::read_header(&mut reader, method)?;
        Self::decode_body(&reader, &HuffmanTreeBuilder::new(depth, self.order), size)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode_with(builder: HuffmanTreeBuilder, data: &[u8]) -> Vec<u8> {
        let input = EncodeInput {
            prefix: &[],
            data,
            tokens: &[],
            huffman: Some(&builder),
        };
        NintendoHuffman::default().encode(&input).unwrap()
    }

    #[test]
    fn aab_golden() {
        let builder = HuffmanTreeBuilder::new(BitDepth::Eight, NibbleOrder::LowFirst);
        assert_eq!(
            encode_with(builder, b"AAB"),
            [0x28, 0x03, 0x00, 0x00, 0x01, 0xC0, b'B', b'A', 0x00, 0x00, 0x00, 0xC0]
        );
    }

    #[test]
    fn nibble_order_must_match() {
        let data = b"nibbles in a row, nibbles in a column";
        let builder = HuffmanTreeBuilder::new(BitDepth::Four, NibbleOrder::HighFirst);
        let coded = encode_with(builder, data);
        assert_eq!(coded[0], 0x24);

        let high = NintendoHuffman {
            order: NibbleOrder::HighFirst,
        };
        assert_eq!(high.decode(&coded).unwrap(), &data[..]);
        assert_ne!(NintendoHuffman::default().decode(&coded).unwrap(), &data[..]);
    }

    #[test]
    fn missing_builder_is_a_configuration_error() {
        let input = EncodeInput {
            prefix: &[],
            data: b"abc",
            tokens: &[],
            huffman: None,
        };
        match NintendoHuffman::default().encode(&input) {
            Err(KompressionError::InvalidConfiguration(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_other_methods() {
        assert!(NintendoHuffman::default().decode(&[0x10, 0, 0, 0]).is_err());
        assert!(NintendoHuffman::default().decode(&[0x23, 1, 0, 0]).is_err());
    }
}
