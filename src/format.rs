//! Named presets for every supported format.
//!
//! | Name | Format |
//! | ---- | ------ |
//! | `lz10`, `lz11`, `rle` | GBA/DS BIOS LZ77 and RLE |
//! | `huffman4-le`, `huffman4-be`, `huffman8` | GBA/DS BIOS Huffman |
//! | `yaz0-be`, `yaz0-le`, `yay0` | Nintendo EAD |
//! | `mio0-be`, `mio0-le`, `vpk0`, `vpk0-two-sample` | N64 |
//! | `lzss`, `tales-of-01` | Okumura LZSS and the Tales of type 1 container |
//! | `lz4-headerless` | LZ4 block |
//! | `backward-lz77` | DS overlays |
//! | `crilayla` | CRI Middleware |
//! | `level5-*` | Level-5 wrappers around the BIOS bodies |
//! ```
//! # use kompression::Format;
//! let yaz0: Format = "yaz0-be".parse().unwrap();
//! let compression = yaz0.configuration().build().unwrap();
//! let packed = compression.compress(b"AAAAAAAA").unwrap();
//! assert_eq!(&packed[..4], b"Yaz0");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::codec::{
    blz::BackwardLz77,
    crilayla::Crilayla,
    huff::NintendoHuffman,
    level5::{Level5, Level5Method},
    lz10::Lz10,
    lz11::Lz11,
    lz4::Lz4,
    lzss::{self, Okumura, TalesOf01},
    mio0::Mio0,
    rle::Rle,
    vpk0::{Vpk0, Vpk0Method},
    yay0::Yay0,
    yaz0::Yaz0,
    ByteOrder,
};
use crate::config::Configuration;
use crate::errors::KompressionError;
use crate::find::FinderBackend;
use crate::huffman::{BitDepth, HuffmanTreeBuilder, NibbleOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Lz10,
    Lz11,
    Rle,
    Huffman4Le,
    Huffman4Be,
    Huffman8,
    Yaz0Be,
    Yaz0Le,
    Yay0,
    Mio0Be,
    Mio0Le,
    Lzss,
    TalesOf01,
    Lz4Headerless,
    BackwardLz77,
    Crilayla,
    Level5Lz10,
    Level5Huffman4,
    Level5Huffman8,
    Level5Rle,
    Level5Raw,
    Vpk0,
    Vpk0TwoSample,
}

/// Every format and the name it goes by.
pub static PRESETS: [(Format, &str); 23] = [
    (Format::Lz10, "lz10"),
    (Format::Lz11, "lz11"),
    (Format::Rle, "rle"),
    (Format::Huffman4Le, "huffman4-le"),
    (Format::Huffman4Be, "huffman4-be"),
    (Format::Huffman8, "huffman8"),
    (Format::Yaz0Be, "yaz0-be"),
    (Format::Yaz0Le, "yaz0-le"),
    (Format::Yay0, "yay0"),
    (Format::Mio0Be, "mio0-be"),
    (Format::Mio0Le, "mio0-le"),
    (Format::Lzss, "lzss"),
    (Format::TalesOf01, "tales-of-01"),
    (Format::Lz4Headerless, "lz4-headerless"),
    (Format::BackwardLz77, "backward-lz77"),
    (Format::Crilayla, "crilayla"),
    (Format::Level5Lz10, "level5-lz10"),
    (Format::Level5Huffman4, "level5-huffman4"),
    (Format::Level5Huffman8, "level5-huffman8"),
    (Format::Level5Rle, "level5-rle"),
    (Format::Level5Raw, "level5-raw"),
    (Format::Vpk0, "vpk0"),
    (Format::Vpk0TwoSample, "vpk0-two-sample"),
];

/// Wire up a codec type that is its own encoder, decoder and price calculator.
macro_rules! lz_configuration {
    ($codec:expr, $backend:expr, $limits:expr) => {{
        let mut config = Configuration::new();
        config
            .encode_with(|| $codec)
            .decode_with(|| $codec)
            .calculate_prices_with(|| $codec)
            .find_with($backend, $limits);
        config
    }};
}

impl Format {
    pub fn all() -> impl Iterator<Item = Format> {
        PRESETS.iter().map(|&(format, _)| format)
    }

    pub fn name(self) -> &'static str {
        PRESETS
            .iter()
            .find(|&&(format, _)| format == self)
            .map_or("", |&(_, name)| name)
    }

    /// A configuration ready to [`build`](Configuration::build), which callers may
    /// still adjust (e.g. with other finder limits).
    pub fn configuration(self) -> Configuration {
        use FinderBackend::{RunLength, SuffixArray};

        match self {
            Self::Lz10 => lz_configuration!(Lz10, SuffixArray, Lz10::LIMITS),
            Self::Lz11 => lz_configuration!(Lz11, SuffixArray, Lz11::LIMITS),
            Self::Rle => lz_configuration!(Rle, RunLength, Rle::LIMITS),
            Self::Huffman4Le => huffman(BitDepth::Four, NibbleOrder::LowFirst),
            Self::Huffman4Be => huffman(BitDepth::Four, NibbleOrder::HighFirst),
            Self::Huffman8 => huffman(BitDepth::Eight, NibbleOrder::LowFirst),
            Self::Yaz0Be => lz_configuration!(Yaz0::new(ByteOrder::Big), SuffixArray, Yaz0::LIMITS),
            Self::Yaz0Le => {
                lz_configuration!(Yaz0::new(ByteOrder::Little), SuffixArray, Yaz0::LIMITS)
            }
            Self::Yay0 => lz_configuration!(Yay0, SuffixArray, Yay0::LIMITS),
            Self::Mio0Be => lz_configuration!(Mio0::new(ByteOrder::Big), SuffixArray, Mio0::LIMITS),
            Self::Mio0Le => {
                lz_configuration!(Mio0::new(ByteOrder::Little), SuffixArray, Mio0::LIMITS)
            }
            Self::Lzss => lz_configuration!(Okumura, SuffixArray, lzss::LIMITS),
            Self::TalesOf01 => lz_configuration!(TalesOf01, SuffixArray, lzss::LIMITS),
            Self::Lz4Headerless => lz_configuration!(Lz4, SuffixArray, Lz4::LIMITS),
            Self::BackwardLz77 => {
                lz_configuration!(BackwardLz77, SuffixArray, BackwardLz77::LIMITS)
            }
            Self::Crilayla => lz_configuration!(Crilayla, SuffixArray, Crilayla::LIMITS),
            Self::Level5Lz10 => {
                lz_configuration!(Level5::new(Level5Method::Lz10), SuffixArray, Lz10::LIMITS)
            }
            Self::Level5Rle => {
                lz_configuration!(Level5::new(Level5Method::Rle), RunLength, Rle::LIMITS)
            }
            Self::Level5Huffman4 => level5(Level5Method::Huffman4),
            Self::Level5Huffman8 => level5(Level5Method::Huffman8),
            Self::Level5Raw => level5(Level5Method::Raw),
            Self::Vpk0 => {
                lz_configuration!(Vpk0::new(Vpk0Method::OneSample), SuffixArray, Vpk0::LIMITS)
            }
            Self::Vpk0TwoSample => {
                lz_configuration!(Vpk0::new(Vpk0Method::TwoSample), SuffixArray, Vpk0::LIMITS)
            }
        }
    }
}

fn huffman(depth: BitDepth, order: NibbleOrder) -> Configuration {
    let mut config = Configuration::new();
    config
        .encode_with(move || NintendoHuffman { order })
        .decode_with(move || NintendoHuffman { order })
        .with_huffman(HuffmanTreeBuilder::new(depth, order));
    config
}

fn level5(method: Level5Method) -> Configuration {
    let mut config = Configuration::new();
    config
        .encode_with(move || Level5::new(method))
        .decode_with(move || Level5::new(method));
    config
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Format {
    type Err = KompressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PRESETS
            .iter()
            .find(|&&(_, name)| name.eq_ignore_ascii_case(s))
            .map(|&(format, _)| format)
            .ok_or_else(|| KompressionError::UnsupportedInput(format!("unknown format '{}'", s)))
    }
}
