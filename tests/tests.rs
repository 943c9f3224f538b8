use std::sync::Arc;
use std::thread;

use kompression::{
    compress, decompress, Compression, Corruption, FindLimitations, FinderBackend, Format,
    KompressionError, Match, MatchParser, ParserOptions, Token,
};
use proptest::collection::vec;
use proptest::num::u8;
use proptest::prop_assert_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};
use test_strategy::proptest;

fn corpora() -> Vec<(&'static str, Vec<u8>)> {
    let mut rng = StdRng::seed_from_u64(0x6b6f6d70);
    let random: Vec<u8> = (0..3000).map(|_| rng.gen()).collect();
    let few_symbols: Vec<u8> = (0..3000).map(|_| rng.gen_range(0..4)).collect();
    let text = b"It was the best of times, it was the worst of times, it was the age of wisdom, \
it was the age of foolishness, it was the epoch of belief, it was the epoch of incredulity"
        .to_vec();
    let repetitive: Vec<u8> = text.iter().cycle().take(5000).copied().collect();

    vec![
        ("empty", Vec::new()),
        ("one byte", vec![0x42]),
        ("zeros", vec![0; 4096]),
        ("text", text),
        ("repetitive", repetitive),
        ("few symbols", few_symbols),
        ("random", random),
    ]
}

fn roundtrip(compression: &Compression, input: &[u8]) -> Vec<u8> {
    let packed = compression.compress(input).unwrap_or_else(|e| {
        panic!("{}: compressing {} bytes failed: {}", compression.name(), input.len(), e)
    });
    compression.decompress(&packed).unwrap_or_else(|e| {
        panic!("{}: decompressing {} bytes failed: {}", compression.name(), packed.len(), e)
    })
}

#[test]
fn every_format_roundtrips_corpora() {
    for format in Format::all() {
        let compression = format.configuration().build().unwrap();
        for (name, input) in corpora() {
            assert!(
                roundtrip(&compression, &input) == input,
                "{} failed the {} corpus",
                format,
                name
            );
        }
    }
}

#[test]
fn redundant_input_shrinks() {
    let input = vec![0u8; 4096];
    for format in Format::all() {
        if format == Format::Level5Raw {
            continue;
        }
        let packed = compress(format, &input).unwrap();
        assert!(packed.len() < input.len() / 2, "{}: {} bytes", format, packed.len());
    }
}

#[proptest]
fn low_entropy_roundtrips(#[strategy(vec(0..4u8, 0..600))] data: Vec<u8>) {
    for format in Format::all() {
        let packed = compress(format, &data).unwrap();
        prop_assert_eq!(&decompress(format, &packed).unwrap(), &data);
    }
}

#[proptest]
fn arbitrary_bytes_roundtrip(#[strategy(vec(u8::ANY, 0..400))] data: Vec<u8>) {
    for format in Format::all() {
        let packed = compress(format, &data).unwrap();
        prop_assert_eq!(&decompress(format, &packed).unwrap(), &data);
    }
}

#[test]
fn golden_bytes() {
    let eight = b"AAAAAAAA";
    assert_eq!(
        compress(Format::Lz10, eight).unwrap(),
        [0x10, 0x08, 0x00, 0x00, 0x40, 0x41, 0x40, 0x00]
    );
    assert_eq!(
        compress(Format::Rle, eight).unwrap(),
        [0x30, 0x08, 0x00, 0x00, 0x85, 0x41, 0x00, 0x00]
    );

    let mut yaz0 = b"Yaz0".to_vec();
    yaz0.extend_from_slice(&[0, 0, 0, 8, 0, 0, 0, 0, 0, 0, 0, 0, 0x80, 0x41, 0x50, 0x00]);
    assert_eq!(compress(Format::Yaz0Be, eight).unwrap(), yaz0);

    let mut mio0 = b"MIO0".to_vec();
    mio0.extend_from_slice(&[0, 0, 0, 8, 0, 0, 0, 0x14, 0, 0, 0, 0x16]);
    mio0.extend_from_slice(&[0x80, 0, 0, 0, 0x40, 0x00, 0x41]);
    assert_eq!(compress(Format::Mio0Be, eight).unwrap(), mio0);

    assert_eq!(
        compress(Format::Lz4Headerless, &[b'A'; 20]).unwrap(),
        [0x1A, 0x41, 0x01, 0x00, 0x50, 0x41, 0x41, 0x41, 0x41, 0x41]
    );

    assert_eq!(
        compress(Format::Huffman8, b"AAB").unwrap(),
        [0x28, 0x03, 0x00, 0x00, 0x01, 0xC0, 0x42, 0x41, 0x00, 0x00, 0x00, 0xC0]
    );
}

#[test]
fn empty_input_gives_minimal_streams() {
    assert_eq!(compress(Format::Lz10, b"").unwrap(), [0x10, 0, 0, 0]);
    assert_eq!(compress(Format::Lz4Headerless, b"").unwrap(), [0x00]);
    assert!(compress(Format::Lzss, b"").unwrap().is_empty());
    assert_eq!(compress(Format::Crilayla, b"").unwrap().len(), 0x10);
    assert_eq!(compress(Format::Level5Raw, b"").unwrap(), [0, 0, 0, 0]);
    assert_eq!(&compress(Format::Vpk0, b"").unwrap()[..4], b"vpk0");
}

fn corrupt_reason(result: kompression::Result<Vec<u8>>) -> Option<Corruption> {
    match result {
        Err(KompressionError::CorruptStream { reason, .. }) => Some(reason),
        _ => None,
    }
}

#[test]
fn bad_magic_is_rejected() {
    let input = b"magic magic magic magic";
    for &format in &[
        Format::Yaz0Be,
        Format::Yay0,
        Format::Mio0Be,
        Format::Crilayla,
        Format::Vpk0,
    ] {
        let mut packed = compress(format, input).unwrap();
        packed[0] ^= 0x20;
        assert_eq!(
            corrupt_reason(decompress(format, &packed)),
            Some(Corruption::BadMagic),
            "{}",
            format
        );
    }

    let mut packed = compress(Format::Lz10, input).unwrap();
    packed[0] = 0x11;
    assert_eq!(
        corrupt_reason(decompress(Format::Lz10, &packed)),
        Some(Corruption::UnknownMethod(0x11))
    );
}

#[test]
fn truncated_streams_are_rejected() {
    let mut rng = StdRng::seed_from_u64(7);
    let input: Vec<u8> = (0..2000).map(|_| rng.gen_range(0..8)).collect();
    for &format in &[
        Format::Lz10,
        Format::Lz11,
        Format::Rle,
        Format::Huffman4Le,
        Format::Huffman8,
        Format::Yaz0Le,
        Format::Yay0,
        Format::Mio0Le,
        Format::TalesOf01,
        Format::Crilayla,
        Format::Level5Lz10,
        Format::Vpk0TwoSample,
    ] {
        let packed = compress(format, &input).unwrap();
        let cut = &packed[..packed.len() / 2];
        assert!(
            corrupt_reason(decompress(format, cut)).is_some(),
            "{} accepted a truncated stream",
            format
        );
    }
}

#[test]
fn oversized_inputs_are_unsupported() {
    let input = vec![0u8; kompression::codec::nintendo::MAX_SIZE + 1];
    match compress(Format::Huffman8, &input) {
        Err(KompressionError::UnsupportedInput(_)) => (),
        other => panic!("expected an unsupported input error, got {:?}", other.map(|v| v.len())),
    }
}

#[test]
fn parser_finds_the_scenario_repeat() {
    let input = [0, 1, 2, 2, 0, 0, 0, 0, 1, 2, 2, 0, 0, 0, 0];
    let limits = FindLimitations::new(4, 18, 1, 16);
    let finder = kompression::find::FinderConfig {
        backend: FinderBackend::SuffixTree,
        limits,
    }
    .build(&input);
    let tokens = MatchParser::new(ParserOptions::default()).parse(
        &input,
        &[finder],
        &kompression::codec::lz10::Lz10,
    );
    let matches: Vec<Match> = tokens
        .into_iter()
        .filter_map(|t| match t {
            Token::Match(m) => Some(m),
            Token::Literal(_) => None,
        })
        .collect();
    assert_eq!(matches, [Match::new(7, 8, 7)]);
}

#[test]
fn compression_is_shareable_and_deterministic() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Compression>();

    let compression = Arc::new(Format::Yaz0Be.configuration().build().unwrap());
    let (_, input) = corpora().remove(4);
    let input = Arc::new(input);
    let expected = compression.compress(&input).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let compression = Arc::clone(&compression);
            let input = Arc::clone(&input);
            thread::spawn(move || compression.compress(&input).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
