//! Bit-size Huffman trees.
//!
//! vpk0 codes the *bit width* of each offset and length with a Huffman tree and
//! then writes the value itself in that many bits. The tree is stored in postorder:
//! `0` plus an 8-bit width for a leaf, `1` to join the two most recent entries,
//! and a final `1` once a single entry remains.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use std::fmt;
use std::io::{Read, Write};

use bitstream_io::{BitReader, BitWriter, BE};
use smallvec::{smallvec, SmallVec};

use crate::errors::{Corruption, KompressionError, Result};

pub(crate) type BitWidth = u8;
pub(crate) type Frequency = u64;

/// Occurrences of each bit width, kept ordered so tree construction is deterministic.
pub(crate) type WidthCounts = BTreeMap<BitWidth, Frequency>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Join { left: usize, right: usize },
    Width(BitWidth),
}

/// A tree in its serialized, postorder form. The root is the last entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SizeTable {
    entries: Vec<Entry>,
}

impl SizeTable {
    pub(crate) fn read<R: Read>(bits: &mut BitReader<R, BE>) -> Result<Self> {
        let mut entries = Vec::new();
        let mut pending: SmallVec<[usize; 8]> = SmallVec::new();

        loop {
            let at = entries.len();
            if bits.read_bit()? {
                match (pending.pop(), pending.pop()) {
                    (Some(right), Some(left)) => entries.push(Entry::Join { left, right }),
                    // fewer than two outstanding entries ends the tree
                    _ => break,
                }
            } else {
                entries.push(Entry::Width(bits.read(8)?));
            }
            pending.push(at);
        }

        Ok(Self { entries })
    }

    /// Read one value: walk to a leaf, then read as many bits as it names.
    ///
    /// An empty table yields zero without consuming input.
    pub(crate) fn read_value<R: Read>(&self, bits: &mut BitReader<R, BE>) -> Result<u32> {
        let mut idx = match self.entries.len() {
            0 => return Ok(0),
            n => n - 1,
        };
        loop {
            match self.entries[idx] {
                Entry::Join { left, right } => idx = if bits.read_bit()? { right } else { left },
                Entry::Width(0) => return Ok(0),
                Entry::Width(width) if width <= 32 => return Ok(bits.read(u32::from(width))?),
                Entry::Width(_) => {
                    return Err(KompressionError::corrupt_at_unknown(Corruption::BadTree))
                }
            }
        }
    }

    pub(crate) fn write<W: Write>(&self, out: &mut BitWriter<W, BE>) -> Result<()> {
        for entry in &self.entries {
            match *entry {
                Entry::Width(width) => {
                    out.write_bit(false)?;
                    out.write(8, width)?;
                }
                Entry::Join { .. } => out.write_bit(true)?,
            }
        }
        out.write_bit(true)?;
        Ok(())
    }

    fn fmt_entry(&self, idx: usize, f: &mut fmt::Formatter) -> fmt::Result {
        match self.entries[idx] {
            Entry::Width(width) => write!(f, "{}", width),
            Entry::Join { left, right } => {
                write!(f, "(")?;
                self.fmt_entry(left, f)?;
                write!(f, ", ")?;
                self.fmt_entry(right, f)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for SizeTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.entries.len() {
            0 => write!(f, "()"),
            n => self.fmt_entry(n - 1, f),
        }
    }
}

/// A prefix code of up to 32 bits, most significant bit first.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub(crate) struct Code {
    pub(crate) bits: u32,
    pub(crate) len: u32,
}

impl Code {
    fn then(self, bit: bool) -> Self {
        debug_assert!(self.len < 32, "bit width trees are at most 33 leaves deep");
        Self {
            bits: self.bits << 1 | bit as u32,
            len: self.len + 1,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:0width$b}", self.bits, width = self.len as usize)
    }
}

/// How to write a value of a given bit width: the code of the leaf it shares, and
/// how many bits that leaf reads.
pub(crate) type SizeCodes = BTreeMap<BitWidth, (Code, BitWidth)>;

enum Node {
    Leaf {
        width: BitWidth,
        freq: Frequency,
    },
    /// a leaf that also stores the narrower widths folded into it
    Shared {
        width: BitWidth,
        freq: Frequency,
        narrower: SmallVec<[BitWidth; 8]>,
    },
    Join {
        freq: Frequency,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn freq(&self) -> Frequency {
        match *self {
            Self::Leaf { freq, .. } | Self::Shared { freq, .. } | Self::Join { freq, .. } => freq,
        }
    }

    fn width(&self) -> Option<BitWidth> {
        match *self {
            Self::Leaf { width, .. } | Self::Shared { width, .. } => Some(width),
            Self::Join { .. } => None,
        }
    }

    fn narrower(&self) -> &[BitWidth] {
        match self {
            Self::Shared { narrower, .. } => narrower,
            _ => &[],
        }
    }

    /// Merge two nodes, folding two leaves into one when that saves bits.
    fn combine(l: Self, r: Self) -> Self {
        if let Some(shared) = share_leaves(&l, &r) {
            return shared;
        }
        Self::Join {
            freq: l.freq() + r.freq(),
            left: Box::new(l),
            right: Box::new(r),
        }
    }

    fn assign(&self, prefix: Code, codes: &mut SizeCodes) {
        match self {
            Self::Leaf { width, .. } => {
                codes.insert(*width, (prefix, *width));
            }
            Self::Shared { width, narrower, .. } => {
                codes.insert(*width, (prefix, *width));
                codes.extend(narrower.iter().map(|&n| (n, (prefix, *width))));
            }
            Self::Join { left, right, .. } => {
                left.assign(prefix.then(false), codes);
                right.assign(prefix.then(true), codes);
            }
        }
    }

    fn flatten(&self, entries: &mut Vec<Entry>) -> usize {
        match self {
            Self::Leaf { width, .. } | Self::Shared { width, .. } => {
                entries.push(Entry::Width(*width));
            }
            Self::Join { left, right, .. } => {
                let left = left.flatten(entries);
                let right = right.flatten(entries);
                entries.push(Entry::Join { left, right });
            }
        }
        entries.len() - 1
    }
}

// lowest frequency first out of the max-heap
impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other.freq().cmp(&self.freq())
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.freq() == other.freq()
    }
}

impl Eq for Node {}

/// Writing the narrower leaf's values with the wider leaf's width drops one code
/// bit from every use of the wider leaf, at the cost of the extra value bits.
fn share_leaves(l: &Node, r: &Node) -> Option<Node> {
    let (lw, rw) = (l.width()?, r.width()?);
    let (wide, narrow) = if lw >= rw { (l, r) } else { (r, l) };
    let (ww, nw) = (lw.max(rw), lw.min(rw));

    let gained = wide.freq() as i64;
    let lost = (i64::from(ww) - i64::from(nw) - 1) * narrow.freq() as i64;
    if gained < lost {
        return None;
    }

    let mut narrower: SmallVec<[BitWidth; 8]> = smallvec![nw];
    narrower.extend(wide.narrower().iter().chain(narrow.narrower()).copied());
    Some(Node::Shared {
        width: ww,
        freq: wide.freq() + narrow.freq(),
        narrower,
    })
}

/// A bit-width tree built from the widths a parse actually uses.
#[derive(Debug, Clone, Default)]
pub(crate) struct SizeTree {
    pub(crate) table: SizeTable,
    codes: SizeCodes,
}

impl SizeTree {
    pub(crate) fn from_counts(counts: &WidthCounts) -> Self {
        let mut heap: BinaryHeap<Node> = counts
            .iter()
            .map(|(&width, &freq)| Node::Leaf { width, freq })
            .collect();

        while heap.len() > 1 {
            if let (Some(l), Some(r)) = (heap.pop(), heap.pop()) {
                heap.push(Node::combine(l, r));
            }
        }

        match heap.pop() {
            Some(root) => {
                let mut codes = SizeCodes::new();
                root.assign(Code::default(), &mut codes);
                let mut entries = Vec::new();
                root.flatten(&mut entries);
                Self {
                    table: SizeTable { entries },
                    codes,
                }
            }
            None => Self::default(),
        }
    }

    /// Write `value` as its leaf's code followed by the value bits.
    pub(crate) fn write_value<W: Write>(&self, out: &mut BitWriter<W, BE>, value: u32) -> Result<()> {
        let width = bit_width(value);
        let (code, stored) = self.codes.get(&width).copied().ok_or(
            KompressionError::InvalidConfiguration("value width missing from vpk0 tree"),
        )?;
        if code.len > 0 {
            out.write(code.len, code.bits)?;
        }
        if stored > 0 {
            out.write(u32::from(stored), value)?;
        }
        Ok(())
    }

    /// Bits [`write_value`](Self::write_value) spends on `value`.
    #[cfg(test)]
    pub(crate) fn cost(&self, value: u32) -> Option<u32> {
        self.codes
            .get(&bit_width(value))
            .map(|&(code, stored)| code.len + u32::from(stored))
    }
}

impl fmt::Display for SizeTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.table)?;
        for (width, (code, stored)) in &self.codes {
            write!(f, " {}:{}/{}", width, code, stored)?;
        }
        Ok(())
    }
}

#[inline]
pub(crate) fn bit_width(value: u32) -> BitWidth {
    (32 - value.leading_zeros()) as BitWidth
}

#[cfg(test)]
mod test {
    use super::*;
    use bitstream_io::BigEndian;
    use std::io::Cursor;

    fn roundtrip(table: &SizeTable) -> SizeTable {
        let mut bytes = Vec::new();
        {
            let mut out = BitWriter::endian(&mut bytes, BigEndian);
            table.write(&mut out).unwrap();
            out.byte_align().unwrap();
        }
        SizeTable::read(&mut BitReader::endian(Cursor::new(&bytes), BigEndian)).unwrap()
    }

    #[test]
    fn reads_documented_tree() {
        // (1, (4, 7))
        let bits = ["0", "00000001", "0", "00000100", "0", "00000111", "1", "1", "1"].concat();
        let mut bytes = Vec::new();
        {
            let mut out = BitWriter::endian(&mut bytes, BigEndian);
            for c in bits.chars() {
                out.write_bit(c == '1').unwrap();
            }
            out.byte_align().unwrap();
        }
        let table = SizeTable::read(&mut BitReader::endian(Cursor::new(&bytes), BigEndian)).unwrap();
        assert_eq!(table.to_string(), "(1, (4, 7))");
        assert_eq!(roundtrip(&table), table);
    }

    #[test]
    fn empty_and_single_leaf_tables() {
        let empty = SizeTree::from_counts(&WidthCounts::new());
        assert_eq!(empty.table.to_string(), "()");
        assert_eq!(roundtrip(&empty.table), empty.table);

        let single: WidthCounts = [(5, 10)].iter().copied().collect();
        let tree = SizeTree::from_counts(&single);
        assert_eq!(tree.table.to_string(), "5");
        assert_eq!(tree.cost(17), Some(5));
        assert_eq!(roundtrip(&tree.table), tree.table);
    }

    #[test]
    fn rare_narrow_width_shares_a_leaf() {
        // a single 3-bit value costs one extra bit inside the 4-bit leaf,
        // while every 4-bit value saves a code bit
        let counts: WidthCounts = [(3, 1), (4, 20), (9, 30)].iter().copied().collect();
        let tree = SizeTree::from_counts(&counts);
        assert_eq!(tree.cost(0b100), tree.cost(0b1000));
        assert!(tree.codes.values().all(|&(_, stored)| stored != 3));
    }

    #[test]
    fn values_read_back() {
        let counts: WidthCounts = [(1, 4), (4, 2), (7, 1), (12, 1)].iter().copied().collect();
        let tree = SizeTree::from_counts(&counts);
        let values = [1u32, 9, 100, 4000, 1, 15];

        let mut bytes = Vec::new();
        {
            let mut out = BitWriter::endian(&mut bytes, BigEndian);
            tree.table.write(&mut out).unwrap();
            for &v in &values {
                tree.write_value(&mut out, v).unwrap();
            }
            out.byte_align().unwrap();
        }

        let mut bits = BitReader::endian(Cursor::new(&bytes), BigEndian);
        let table = SizeTable::read(&mut bits).unwrap();
        for &v in &values {
            assert_eq!(table.read_value(&mut bits).unwrap(), v);
        }
    }
}
