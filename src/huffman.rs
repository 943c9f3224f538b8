//! Huffman coding over 4-bit or 8-bit symbols in the Nintendo table layout.
//!
//! The serialized tree is a table of byte pairs. Byte 0 holds the table size
//! (`pairs - 1`), byte 1 is the root. An internal node at address `a` stores a 6-bit
//! `offset` and two flags: bit 7 marks the left child as a leaf, bit 6 the right.
//! Its children sit at `(a & !1) + offset * 2 + 2` (left) and the byte after (right).
//! Leaves hold the symbol value. Because `offset` is only six bits, every child pair
//! must land within 64 pairs of its parent; [`HuffmanTree::relabel`] assigns the
//! table addresses (the node `code`s) so that it does.
//!
//! The bitstream that follows is a sequence of little-endian `u32` words whose bits
//! are consumed most significant first.

use bitstream_io::{BigEndian, BitReader, BitWriter};
use log::trace;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::io::Cursor;

use crate::errors::{Corruption, KompressionError, Result};

/// Size of the symbols being coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitDepth {
    Four,
    Eight,
}

impl BitDepth {
    pub const fn bits(self) -> u32 {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
        }
    }

    pub const fn alphabet(self) -> usize {
        1 << self.bits()
    }
}

/// Which half of a byte is coded first when symbols are nibbles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NibbleOrder {
    LowFirst,
    HighFirst,
}

/// Builds trees and codes data for one symbol size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HuffmanTreeBuilder {
    pub depth: BitDepth,
    pub order: NibbleOrder,
}

impl HuffmanTreeBuilder {
    pub const fn new(depth: BitDepth, order: NibbleOrder) -> Self {
        Self { depth, order }
    }

    /// Split `data` into the symbols that get coded.
    pub fn symbols(&self, data: &[u8]) -> Vec<u8> {
        match self.depth {
            BitDepth::Eight => data.to_vec(),
            BitDepth::Four => data
                .iter()
                .flat_map(|&b| match self.order {
                    NibbleOrder::LowFirst => [b & 0xF, b >> 4],
                    NibbleOrder::HighFirst => [b >> 4, b & 0xF],
                })
                .collect(),
        }
    }

    /// Join decoded symbols back into bytes.
    fn join(&self, symbols: Vec<u8>) -> Vec<u8> {
        match self.depth {
            BitDepth::Eight => symbols,
            BitDepth::Four => symbols
                .chunks(2)
                .map(|pair| {
                    let (first, second) = (pair[0], pair.get(1).copied().unwrap_or(0));
                    match self.order {
                        NibbleOrder::LowFirst => first | second << 4,
                        NibbleOrder::HighFirst => first << 4 | second,
                    }
                })
                .collect(),
        }
    }

    /// Build a relabelled tree weighted by the symbol frequencies of `data`.
    pub fn build(&self, data: &[u8]) -> Result<HuffmanTree> {
        let mut freq = vec![0u64; self.depth.alphabet()];
        for s in self.symbols(data) {
            freq[s as usize] += 1;
        }
        HuffmanTree::from_frequencies(&freq)
    }

    /// Serialize the table for `tree` followed by the coded `data`.
    pub fn encode(&self, tree: &HuffmanTree, data: &[u8], out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&tree.table());
        tree.encode_symbols(&self.symbols(data), out)
    }

    /// Decode `size` bytes from a table plus bitstream starting at `body[0]`.
    ///
    /// `base` is the position of `body` in the whole stream, for error offsets.
    pub fn decode(&self, body: &[u8], size: usize, base: usize) -> Result<Vec<u8>> {
        let count = match self.depth {
            BitDepth::Eight => size,
            BitDepth::Four => size * 2,
        };
        let symbols = decode_symbols(body, count, base)?;
        Ok(self.join(symbols))
    }
}

/// A node of a [`HuffmanTree`]; children are indices into the tree's arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTreeNode {
    /// table address assigned by relabelling
    pub code: usize,
    /// `[left, right]`; left is reached by a 0 bit
    pub children: Option<[usize; 2]>,
    pub is_leaf: bool,
    pub symbol: u8,
    weight: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
    nodes: Vec<HuffmanTreeNode>,
    root: usize,
    /// table pairs, including the one holding the size byte and root
    pairs: usize,
}

impl HuffmanTree {
    /// Maximum distance, in pairs, from a node to its children.
    const MAX_OFFSET: usize = 63;

    /// Classic lowest-pair merging over `freq[symbol]`.
    ///
    /// Symbols with zero frequency are left out, except that the tree always has at
    /// least two leaves so that every symbol gets a non-empty code.
    pub fn from_frequencies(freq: &[u64]) -> Result<Self> {
        let mut used: Vec<usize> = (0..freq.len()).filter(|&s| freq[s] > 0).collect();
        for filler in 0..freq.len() {
            if used.len() >= 2 {
                break;
            }
            if !used.contains(&filler) {
                used.push(filler);
            }
        }
        used.sort_unstable();

        let mut nodes: Vec<HuffmanTreeNode> = used
            .iter()
            .map(|&s| HuffmanTreeNode {
                code: 0,
                children: None,
                is_leaf: true,
                symbol: s as u8,
                weight: freq[s],
            })
            .collect();

        // ties resolve towards the older node
        let mut heap: BinaryHeap<Reverse<(u64, usize)>> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| Reverse((n.weight, i)))
            .collect();

        while heap.len() >= 2 {
            let (Reverse((wl, left)), Reverse((wr, right))) = match (heap.pop(), heap.pop()) {
                (Some(l), Some(r)) => (l, r),
                _ => break,
            };
            nodes.push(HuffmanTreeNode {
                code: 0,
                children: Some([left, right]),
                is_leaf: false,
                symbol: 0,
                weight: wl + wr,
            });
            heap.push(Reverse((wl + wr, nodes.len() - 1)));
        }

        let mut tree = Self {
            root: nodes.len() - 1,
            nodes,
            pairs: 0,
        };
        tree.relabel()?;
        Ok(tree)
    }

    pub fn nodes(&self) -> &[HuffmanTreeNode] {
        &self.nodes
    }

    pub fn root(&self) -> &HuffmanTreeNode {
        &self.nodes[self.root]
    }

    /// Assign table addresses so that every child pair is within reach of its parent.
    ///
    /// Pairs are handed out breadth first. Wide trees, such as a near-uniform 8-bit
    /// alphabet, would push their lower levels more than 64 pairs away; for those a
    /// node is taken breadth first only while the compact order can still finish
    /// the table from there, and the compact choice is taken otherwise.
    pub fn relabel(&mut self) -> Result<usize> {
        self.nodes[self.root].code = 1;
        // (node, pair holding the node)
        let mut waiting: VecDeque<(usize, usize)> = VecDeque::new();
        waiting.push_back((self.root, 0));
        let mut next = 1;
        let breadth_first = self.completes(&waiting, next, |_, _| 0);

        while !waiting.is_empty() {
            let pick = if breadth_first || self.completes_after_front(&waiting, next) {
                0
            } else {
                compact_pick(&waiting, next)
            };
            let (node, home) = match waiting.remove(pick) {
                Some(w) => w,
                None => break,
            };
            if next > deadline(home) {
                return Err(KompressionError::UnsupportedInput(
                    "huffman tree cannot be laid out within 6-bit offsets".into(),
                ));
            }

            if let Some([left, right]) = self.nodes[node].children {
                self.nodes[left].code = next * 2;
                self.nodes[right].code = next * 2 + 1;
            }
            self.queue_children(node, next, &mut waiting);
            next += 1;
        }

        // the bitstream after the table must be word aligned
        self.pairs = next + next % 2;
        trace!(
            "huffman table: {} leaves, {} pairs, breadth first: {}",
            self.leaves().count(),
            self.pairs,
            breadth_first
        );
        Ok(self.pairs)
    }

    fn queue_children(&self, node: usize, home: usize, waiting: &mut VecDeque<(usize, usize)>) {
        if let Some(children) = self.nodes[node].children {
            for &child in &children {
                if !self.nodes[child].is_leaf {
                    waiting.push_back((child, home));
                }
            }
        }
    }

    fn completes_after_front(&self, waiting: &VecDeque<(usize, usize)>, next: usize) -> bool {
        let mut first = true;
        self.completes(waiting, next, |waiting, next| {
            if first {
                first = false;
                0
            } else {
                compact_pick(waiting, next)
            }
        })
    }

    /// Whether placing nodes in the order `choose` picks keeps every child pair in reach.
    fn completes<F>(
        &self,
        waiting: &VecDeque<(usize, usize)>,
        mut next: usize,
        mut choose: F,
    ) -> bool
    where
        F: FnMut(&VecDeque<(usize, usize)>, usize) -> usize,
    {
        let mut waiting = waiting.clone();
        while !waiting.is_empty() {
            let pick = choose(&waiting, next);
            let (node, home) = match waiting.remove(pick) {
                Some(w) => w,
                None => return false,
            };
            if next > deadline(home) {
                return false;
            }
            self.queue_children(node, next, &mut waiting);
            next += 1;
        }
        true
    }

    fn leaves(&self) -> impl Iterator<Item = &HuffmanTreeNode> {
        self.nodes.iter().filter(|n| n.is_leaf)
    }

    /// `(code, length)` of every symbol in the tree, indexed by symbol.
    pub fn codes(&self) -> Vec<Option<(u64, u32)>> {
        let alphabet = self.leaves().map(|n| n.symbol as usize + 1).max().unwrap_or(0);
        let mut codes = vec![None; alphabet];
        let mut stack = vec![(self.root, 0u64, 0u32)];
        while let Some((idx, code, len)) = stack.pop() {
            let node = &self.nodes[idx];
            match node.children {
                Some([left, right]) => {
                    stack.push((left, code << 1, len + 1));
                    stack.push((right, code << 1 | 1, len + 1));
                }
                None => codes[node.symbol as usize] = Some((code, len)),
            }
        }
        codes
    }

    /// The serialized table, including the size byte.
    pub fn table(&self) -> Vec<u8> {
        let mut table = vec![0u8; self.pairs * 2];
        table[0] = (self.pairs - 1) as u8;
        for node in &self.nodes {
            table[node.code] = match node.children {
                None => node.symbol,
                Some([left, right]) => {
                    let offset = self.nodes[left].code / 2 - node.code / 2 - 1;
                    let mut byte = offset as u8;
                    if self.nodes[left].is_leaf {
                        byte |= 0x80;
                    }
                    if self.nodes[right].is_leaf {
                        byte |= 0x40;
                    }
                    byte
                }
            };
        }
        table
    }

    /// Write the codes of `symbols` as little-endian words, most significant bit first.
    pub fn encode_symbols(&self, symbols: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let codes = self.codes();
        let mut bits = Vec::with_capacity(symbols.len() / 2 + 4);
        {
            let mut writer = BitWriter::endian(&mut bits, BigEndian);
            for &s in symbols {
                let (code, len) = codes
                    .get(s as usize)
                    .copied()
                    .flatten()
                    .ok_or(KompressionError::InvalidConfiguration(
                        "symbol missing from huffman tree",
                    ))?;
                writer.write(len, code)?;
            }
            writer.byte_align()?;
        }
        while bits.len() % 4 != 0 {
            bits.push(0);
        }
        for word in bits.chunks_exact(4) {
            out.extend(word.iter().rev());
        }
        Ok(())
    }
}

/// Last pair that can hold the children of a node stored in pair `home`.
#[inline]
fn deadline(home: usize) -> usize {
    home + HuffmanTree::MAX_OFFSET + 1
}

/// The most recently queued node, which keeps subtrees close together, unless that
/// would leave another waiting node out of reach; then the one with the earliest
/// deadline.
fn compact_pick(waiting: &VecDeque<(usize, usize)>, next: usize) -> usize {
    let last = match waiting.len().checked_sub(1) {
        Some(last) => last,
        None => return 0,
    };
    let others = waiting.iter().take(last).map(|w| deadline(w.1));
    if next <= deadline(waiting[last].1) && feasible(others, next) {
        last
    } else {
        (0..waiting.len()).min_by_key(|&i| waiting[i].1).unwrap_or(0)
    }
}

/// Whether jobs with these deadlines can all be placed in pairs `next + 1..`.
fn feasible(deadlines: impl Iterator<Item = usize>, next: usize) -> bool {
    let mut sorted: Vec<usize> = deadlines.collect();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .all(|(k, &d)| d >= next + k + 1)
}

/// Walk a serialized table to decode `count` symbols.
pub(crate) fn decode_symbols(body: &[u8], count: usize, base: usize) -> Result<Vec<u8>> {
    let truncated = || KompressionError::corrupt(base + body.len(), Corruption::Truncated);
    let bad_tree = |at: usize| KompressionError::corrupt(base + at, Corruption::BadTree);

    let size_byte = *body.first().ok_or_else(truncated)?;
    let table_len = (size_byte as usize + 1) * 2;
    if body.len() < table_len {
        return Err(truncated());
    }
    let table = &body[..table_len];

    // words are little-endian; present them to the reader most significant byte first
    let words: Vec<u8> = body[table_len..]
        .chunks_exact(4)
        .flat_map(|w| w.iter().rev().copied())
        .collect();
    let mut reader = BitReader::endian(Cursor::new(&words[..]), BigEndian);

    let mut out = Vec::with_capacity(count);
    let mut addr = 1;
    while out.len() < count {
        let bit = reader.read_bit().map_err(|_| truncated())?;
        let node = table[addr];
        let child = (addr & !1) + (node & 0x3F) as usize * 2 + 2 + bit as usize;
        if child >= table.len() {
            return Err(bad_tree(addr));
        }
        let leaf = if bit { node & 0x40 != 0 } else { node & 0x80 != 0 };
        if leaf {
            out.push(table[child]);
            addr = 1;
        } else {
            addr = child;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn kraft_sum(tree: &HuffmanTree) -> f64 {
        tree.codes()
            .iter()
            .flatten()
            .map(|&(_, len)| 0.5f64.powi(len as i32))
            .sum()
    }

    fn assert_prefix_free(tree: &HuffmanTree) {
        let codes: Vec<(u64, u32)> = tree.codes().into_iter().flatten().collect();
        for (i, &(a, la)) in codes.iter().enumerate() {
            for &(b, lb) in &codes[i + 1..] {
                let shared = la.min(lb);
                assert_ne!(a >> (la - shared), b >> (lb - shared), "codes share a prefix");
            }
        }
    }

    #[test]
    fn codes_satisfy_kraft_and_are_prefix_free() {
        let mut rng = StdRng::seed_from_u64(0x4F0F);
        for round in 0..200 {
            let alphabet = if round % 2 == 0 { 16 } else { 256 };
            let freq: Vec<u64> = (0..alphabet)
                .map(|_| match rng.gen_range(0..4) {
                    0 => 0,
                    1 => rng.gen_range(1..4),
                    _ => rng.gen_range(1..1_000_000),
                })
                .collect();
            let tree = HuffmanTree::from_frequencies(&freq).unwrap();
            assert!((kraft_sum(&tree) - 1.0).abs() < 1e-9);
            assert_prefix_free(&tree);
        }
    }

    #[test]
    fn table_offsets_fit_six_bits() {
        let balanced = vec![1u64; 256];
        let mut fib = vec![1u64, 1];
        while fib.len() < 40 {
            let next = fib[fib.len() - 1] + fib[fib.len() - 2];
            fib.push(next);
        }
        fib.resize(256, 1);

        for freq in &[balanced, fib] {
            let tree = HuffmanTree::from_frequencies(freq).unwrap();
            assert!(tree.table().len() <= 512);
            for node in tree.nodes() {
                if let Some([left, right]) = node.children {
                    assert_eq!(tree.nodes()[left].code + 1, tree.nodes()[right].code);
                    assert!(tree.nodes()[left].code / 2 > node.code / 2);
                    assert!(tree.nodes()[left].code / 2 - node.code / 2 - 1 <= 63);
                }
            }
        }
    }

    #[test]
    fn single_symbol_gets_a_partner() {
        let tree = HuffmanTree::from_frequencies(&[0, 0, 7, 0]).unwrap();
        let codes = tree.codes();
        assert_eq!(codes[2].map(|c| c.1), Some(1));
        assert_eq!(tree.leaves().count(), 2);
    }

    #[test]
    fn two_symbol_table_layout() {
        let builder = HuffmanTreeBuilder::new(BitDepth::Eight, NibbleOrder::LowFirst);
        let tree = builder.build(b"AAB").unwrap();
        let mut out = Vec::new();
        builder.encode(&tree, b"AAB", &mut out).unwrap();
        // B is rarer and takes the 0 branch
        assert_eq!(out, [0x01, 0xC0, b'B', b'A', 0x00, 0x00, 0x00, 0xC0]);
    }

    #[test]
    fn table_is_laid_out_breadth_first() {
        // eight equally likely symbols make a complete tree of depth three
        let tree = HuffmanTree::from_frequencies(&[1; 8]).unwrap();
        assert_eq!(
            tree.table(),
            [7, 0x00, 0x00, 0x01, 0xC1, 0xC2, 0xC2, 0xC3, 0, 1, 2, 3, 4, 5, 6, 7]
        );

        let pairs_of_depth_two: Vec<usize> = tree
            .nodes()
            .iter()
            .filter(|n| !n.is_leaf && n.code / 2 == 1)
            .filter_map(|n| n.children.map(|[left, _]| tree.nodes()[left].code / 2))
            .collect();
        assert_eq!(pairs_of_depth_two, [2, 3]);
    }

    #[test]
    fn decode_reverses_encode() {
        let mut rng = StdRng::seed_from_u64(7);
        let text: Vec<u8> = (0..3000)
            .map(|i| if i % 3 == 0 { rng.gen() } else { b"etaoin shrdlu"[rng.gen_range(0..13)] })
            .collect();

        for &builder in &[
            HuffmanTreeBuilder::new(BitDepth::Eight, NibbleOrder::LowFirst),
            HuffmanTreeBuilder::new(BitDepth::Four, NibbleOrder::LowFirst),
            HuffmanTreeBuilder::new(BitDepth::Four, NibbleOrder::HighFirst),
        ] {
            let tree = builder.build(&text).unwrap();
            let mut coded = Vec::new();
            builder.encode(&tree, &text, &mut coded).unwrap();
            assert_eq!(coded.len() % 4, 0);
            assert_eq!(builder.decode(&coded, text.len(), 0).unwrap(), text);
        }
    }

    #[test]
    fn truncated_bitstream_is_reported() {
        let builder = HuffmanTreeBuilder::new(BitDepth::Eight, NibbleOrder::LowFirst);
        let data = b"a longer message that needs several words of bits";
        let tree = builder.build(data).unwrap();
        let mut coded = Vec::new();
        builder.encode(&tree, data, &mut coded).unwrap();
        coded.truncate(coded.len() - 4);
        assert!(builder.decode(&coded, data.len(), 0).is_err());
    }
}
