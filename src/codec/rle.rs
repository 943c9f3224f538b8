//! Nintendo RLE (`RLUnComp`).
//!
//! A control byte with bit 7 set starts a run of `(byte & 0x7F) + 3` copies of the
//! next byte. Otherwise `byte + 1` raw bytes follow.

use super::{check_output, nintendo, pad_to, ByteReader, Decoder, EncodeInput, Encoder};
use crate::errors::{KompressionError, Result};
use crate::find::FindLimitations;
use crate::parse::Token;
use crate::price::PriceCalculator;

#[derive(Debug, Clone, Copy, Default)]
pub struct Rle;

impl Rle {
    pub const LIMITS: FindLimitations = FindLimitations::runs(3, 130);
    const MAX_RAW: usize = 128;

    fn flush(raw: &mut Vec<u8>, out: &mut Vec<u8>) {
        if !raw.is_empty() {
            out.push((raw.len() - 1) as u8);
            out.append(raw);
        }
    }

    pub(crate) fn encode_body(data: &[u8], tokens: &[Token], out: &mut Vec<u8>) -> Result<()> {
        let mut raw = Vec::with_capacity(Self::MAX_RAW);
        for token in tokens {
            match *token {
                Token::Literal(byte) => {
                    raw.push(byte);
                    if raw.len() == Self::MAX_RAW {
                        Self::flush(&mut raw, out);
                    }
                }
                Token::Match(m) if m.is_run() && m.length >= 3 && m.length <= 130 => {
                    Self::flush(&mut raw, out);
                    out.push(0x80 | (m.length - 3) as u8);
                    out.push(data[m.position]);
                }
                Token::Match(_) => {
                    return Err(KompressionError::InvalidConfiguration(
                        "rle stores runs only, not back-references",
                    ))
                }
            }
        }
        Self::flush(&mut raw, out);
        Ok(())
    }

    pub(crate) fn decode_body(reader: &mut ByteReader<'_>, size: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(size);
        while out.len() < size {
            let control = reader.u8()?;
            if control & 0x80 != 0 {
                let byte = reader.u8()?;
                let length = (control & 0x7F) as usize + 3;
                out.extend(std::iter::repeat(byte).take(length));
            } else {
                out.extend_from_slice(reader.take(control as usize + 1)?);
            }
        }
        check_output(&out, size, reader.offset())?;
        Ok(out)
    }
}

impl PriceCalculator for Rle {
    fn literal_cost(&self, run: usize) -> u32 {
        let controls = (run + Self::MAX_RAW - 1) / Self::MAX_RAW;
        (run + controls) as u32 * 8
    }

    fn match_cost(&self, _length: usize, _displacement: usize) -> u32 {
        16
    }
}

impl Encoder for Rle {
    fn name(&self) -> &'static str {
        "rle"
    }

    fn encode(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len() + 8);
        nintendo::write_header(&mut out, self.name(), nintendo::RLE, input.data.len())?;
        Self::encode_body(input.data, input.tokens, &mut out)?;
        pad_to(&mut out, 4);
        Ok(out)
    }
}

impl Decoder for Rle {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut reader = ByteReader::new(input);
        let size = nintendo::read_header(&mut reader, nintendo::RLE)?;
        Self::decode_body(&mut reader, size)
    }
}
