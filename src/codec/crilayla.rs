//! CRI Middleware's CRILAYLA, found inside CPK archives.
//!
//! | Offset | Description |
//! | :----: | ----------- |
//! | 0x00   | `"CRILAYLA"` |
//! | 0x08   | u32 LE: size of the decompressed region |
//! | 0x0C   | u32 LE: size of the compressed data |
//! | 0x10   | compressed data |
//! | ...    | the first 0x100 bytes of the output, stored raw |
//!
//! The compressed data is a bitstream read from its last byte toward its first, each
//! byte most significant bit first, and the region is produced from its end toward
//! its start. A `0` bit is followed by an 8-bit literal. A `1` bit is followed by a
//! 13-bit `displacement - 3` and a length coded in 2, 3, 5 and 8-bit fields, each
//! all-ones field continuing into the next, then further 8-bit fields while they
//! read 255.

use std::io::Cursor;

use bitstream_io::{BigEndian, BitReader, BitWriter};
use log::trace;

use super::{
    check_match, check_output, check_size, ByteOrder, ByteReader, Decoder, EncodeInput, Encoder,
    Policy,
};
use crate::errors::{Corruption, KompressionError, Result};
use crate::find::FindLimitations;
use crate::parse::Token;
use crate::price::PriceCalculator;
use crate::window::{CircularBuffer, Replay};

const MAGIC: &[u8; 8] = b"CRILAYLA";
const HEADER: usize = 0x10;
const LENGTH_FIELDS: [u32; 4] = [2, 3, 5, 8];

#[derive(Debug, Clone, Copy, Default)]
pub struct Crilayla;

impl Crilayla {
    pub const RAW_PREFIX: usize = 0x100;
    pub const LIMITS: FindLimitations = FindLimitations::new(3, 0x1_0000, 3, 0x2002);
}

/// Bits used by the length code of a match `length` bytes long.
fn length_bits(length: usize) -> u32 {
    let mut rest = length - 3;
    let mut bits = 0;
    for &width in &LENGTH_FIELDS {
        let max = (1usize << width) - 1;
        bits += width;
        if rest < max {
            return bits;
        }
        rest -= max;
    }
    bits + 8 * (rest / 255 + 1) as u32
}

fn write_length(writer: &mut BitWriter<&mut Vec<u8>, BigEndian>, length: usize) -> Result<()> {
    let mut rest = length - 3;
    for &width in &LENGTH_FIELDS {
        let max = (1usize << width) - 1;
        if rest < max {
            writer.write(width, rest as u32)?;
            return Ok(());
        }
        writer.write(width, max as u32)?;
        rest -= max;
    }
    while rest >= 255 {
        writer.write(8, 255u32)?;
        rest -= 255;
    }
    writer.write(8, rest as u32)?;
    Ok(())
}

impl PriceCalculator for Crilayla {
    fn literal_cost(&self, run: usize) -> u32 {
        run as u32 * 9
    }

    fn match_cost(&self, length: usize, _displacement: usize) -> u32 {
        1 + 13 + length_bits(length)
    }
}

impl Encoder for Crilayla {
    fn name(&self) -> &'static str {
        "crilayla"
    }

    fn policy(&self) -> Policy {
        Policy::matches().backward().with_raw_prefix(Self::RAW_PREFIX)
    }

    fn encode(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>> {
        check_size(self.name(), input.len(), 32)?;

        let mut bits = Vec::with_capacity(input.data.len() / 2 + 4);
        {
            let mut writer = BitWriter::endian(&mut bits, BigEndian);
            for token in input.tokens {
                match *token {
                    Token::Literal(byte) => {
                        writer.write_bit(false)?;
                        writer.write(8, byte)?;
                    }
                    Token::Match(m) => {
                        check_match(&m, &Self::LIMITS)?;
                        writer.write_bit(true)?;
                        writer.write(13, (m.displacement - 3) as u32)?;
                        write_length(&mut writer, m.length)?;
                    }
                }
            }
            writer.byte_align()?;
        }

        let mut out = Vec::with_capacity(HEADER + bits.len() + input.prefix.len());
        out.extend_from_slice(MAGIC);
        ByteOrder::Little.put_u32(&mut out, input.data.len() as u32);
        ByteOrder::Little.put_u32(&mut out, bits.len() as u32);
        out.extend(bits.iter().rev());
        out.extend_from_slice(input.prefix);
        Ok(out)
    }
}

impl Decoder for Crilayla {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut reader = ByteReader::new(input);
        reader.magic(MAGIC)?;
        let size = reader.u32(ByteOrder::Little)? as usize;
        let compressed = reader.u32(ByteOrder::Little)? as usize;
        let body = reader.take(compressed)?;
        let prefix = reader.rest();

        // short files may store fewer raw bytes, but only when nothing follows them
        let prefix_ok =
            prefix.len() == Self::RAW_PREFIX || (size == 0 && prefix.len() < Self::RAW_PREFIX);
        if !prefix_ok {
            return Err(KompressionError::corrupt(
                HEADER + compressed,
                Corruption::SizeMismatch {
                    expected: Self::RAW_PREFIX,
                    actual: prefix.len(),
                },
            ));
        }
        trace!("crilayla: {} raw bytes, {} bytes from {}", prefix.len(), size, compressed);

        let reversed: Vec<u8> = body.iter().rev().copied().collect();
        let mut bits = BitReader::endian(Cursor::new(&reversed[..]), BigEndian);
        let mut replay = Replay::new(CircularBuffer::new(0x2002), size);
        let truncated = || KompressionError::corrupt(HEADER, Corruption::Truncated);

        while replay.len() < size {
            if bits.read_bit().map_err(|_| truncated())? {
                let displacement = bits.read::<u32>(13).map_err(|_| truncated())? as usize + 3;
                let mut length = 3;
                let mut saturated = true;
                for &width in &LENGTH_FIELDS {
                    let field = bits.read::<u32>(width).map_err(|_| truncated())? as usize;
                    length += field;
                    if field != (1 << width) - 1 {
                        saturated = false;
                        break;
                    }
                }
                if saturated {
                    loop {
                        let field = bits.read::<u32>(8).map_err(|_| truncated())? as usize;
                        length += field;
                        if field != 255 {
                            break;
                        }
                    }
                }
                replay.copy(displacement, length, HEADER)?;
            } else {
                replay.literal(bits.read::<u8>(8).map_err(|_| truncated())?);
            }
        }

        let region = replay.into_inner();
        check_output(&region, size, HEADER)?;

        let mut out = Vec::with_capacity(prefix.len() + size);
        out.extend_from_slice(prefix);
        out.extend(region.iter().rev());
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::find::Match;

    #[test]
    fn length_code_widths() {
        assert_eq!(length_bits(3), 2);
        assert_eq!(length_bits(5), 2);
        assert_eq!(length_bits(6), 5);
        assert_eq!(length_bits(13), 10);
        assert_eq!(length_bits(44), 18);
        assert_eq!(length_bits(298), 18);
        assert_eq!(length_bits(299), 26);
    }

    #[test]
    fn region_follows_the_raw_prefix() {
        let prefix = vec![0xAB; Crilayla::RAW_PREFIX];
        // the region "qrsqrsqrs" is handed over reversed
        let data = b"srqsrqsrq";
        let tokens = [
            Token::Literal(b's'),
            Token::Literal(b'r'),
            Token::Literal(b'q'),
            Token::Match(Match::new(3, 6, 3)),
        ];
        let input = EncodeInput {
            prefix: &prefix,
            data,
            tokens: &tokens,
            huffman: None,
        };
        let out = Crilayla.encode(&input).unwrap();
        assert_eq!(&out[..8], MAGIC);
        assert_eq!(&out[8..12], &[9, 0, 0, 0]);
        // 3 * 9 literal bits + 1 + 13 + 5 match bits
        assert_eq!(&out[12..16], &[6, 0, 0, 0]);
        assert_eq!(&out[out.len() - 0x100..], &prefix[..]);

        let mut expected = prefix.clone();
        expected.extend_from_slice(b"qrsqrsqrs");
        assert_eq!(Crilayla.decode(&out).unwrap(), expected);
    }

    #[test]
    fn short_raw_prefix_needs_an_empty_region() {
        let mut file = MAGIC.to_vec();
        file.extend_from_slice(&[0; 8]);
        file.extend_from_slice(b"tiny");
        assert_eq!(Crilayla.decode(&file).unwrap(), b"tiny");

        file[8] = 1;
        assert!(Crilayla.decode(&file).is_err());
    }

    #[test]
    fn bad_magic() {
        assert!(Crilayla.decode(b"CRILAYLB\0\0\0\0\0\0\0\0").is_err());
    }

    #[test]
    fn prices_are_monotone() {
        crate::price::test::assert_monotone(&Crilayla, 3..=600, &[3, 0x2002]);
    }
}
