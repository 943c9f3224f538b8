//! Fixed-capacity sliding window used to replay back-references.

use crate::errors::{Corruption, KompressionError, Result};

/// A fixed-size ring of the most recently produced bytes.
///
/// Every decoder replays its literals and matches through one of these, which keeps
/// self-overlapping copies (`displacement < length`) correct: each copied byte is
/// written back into the ring before the next one is read.
#[derive(Debug, Clone)]
pub struct CircularBuffer {
    buf: Box<[u8]>,
    /// next write position
    cursor: usize,
    /// bytes that may be referenced; starts at capacity when pre-filled
    available: usize,
}

impl CircularBuffer {
    /// Create an empty window that can reference up to `capacity` bytes back.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be non-zero");
        Self {
            buf: vec![0; capacity].into_boxed_slice(),
            cursor: 0,
            available: 0,
        }
    }

    /// Create a window whose history is already filled with `fill`, writing next at `cursor`.
    ///
    /// Okumura-style LZSS streams may reference this pre-filled history.
    pub fn prefilled(capacity: usize, fill: u8, cursor: usize) -> Self {
        assert!(capacity > 0, "window capacity must be non-zero");
        Self {
            buf: vec![fill; capacity].into_boxed_slice(),
            cursor: cursor % capacity,
            available: capacity,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Absolute ring index of the next write.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn write(&mut self, byte: u8) {
        self.buf[self.cursor] = byte;
        self.cursor += 1;
        if self.cursor == self.buf.len() {
            self.cursor = 0;
        }
        if self.available < self.buf.len() {
            self.available += 1;
        }
    }

    /// Copy `length` bytes starting `displacement` bytes back into both the ring and `out`.
    ///
    /// The copy runs byte by byte, so a displacement shorter than the length repeats
    /// the freshly written bytes.
    pub fn copy(&mut self, displacement: usize, length: usize, out: &mut Vec<u8>) -> Result<()> {
        if displacement == 0 || displacement > self.available {
            return Err(KompressionError::corrupt_at_unknown(
                Corruption::InvalidDisplacement {
                    displacement,
                    available: self.available,
                },
            ));
        }

        let cap = self.buf.len();
        let mut src = (self.cursor + cap - displacement) % cap;
        out.reserve(length);
        for _ in 0..length {
            let byte = self.buf[src];
            self.write(byte);
            out.push(byte);
            src += 1;
            if src == cap {
                src = 0;
            }
        }

        Ok(())
    }

    /// Copy `length` bytes starting at the absolute ring index `index`.
    ///
    /// An index equal to the cursor refers to the oldest byte in the ring.
    pub fn copy_from_index(&mut self, index: usize, length: usize, out: &mut Vec<u8>) -> Result<()> {
        let cap = self.buf.len();
        let displacement = match (self.cursor + cap - index % cap) % cap {
            0 => cap,
            d => d,
        };
        self.copy(displacement, length, out)
    }
}

/// Decoder-side output paired with its replay window.
#[derive(Debug)]
pub(crate) struct Replay {
    window: CircularBuffer,
    out: Vec<u8>,
}

impl Replay {
    pub(crate) fn new(window: CircularBuffer, expected: usize) -> Self {
        Self {
            window,
            out: Vec::with_capacity(expected),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.out.len()
    }

    #[inline]
    pub(crate) fn literal(&mut self, byte: u8) {
        self.window.write(byte);
        self.out.push(byte);
    }

    /// Copy a back-reference, reporting `offset` in the compressed input on failure.
    pub(crate) fn copy(&mut self, displacement: usize, length: usize, offset: usize) -> Result<()> {
        if length == 0 {
            return Err(KompressionError::corrupt(offset, Corruption::InvalidLength(0)));
        }
        self.window
            .copy(displacement, length, &mut self.out)
            .map_err(|e| at_offset(e, offset))
    }

    pub(crate) fn copy_from_index(&mut self, index: usize, length: usize, offset: usize) -> Result<()> {
        self.window
            .copy_from_index(index, length, &mut self.out)
            .map_err(|e| at_offset(e, offset))
    }

    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.out
    }
}

fn at_offset(err: KompressionError, offset: usize) -> KompressionError {
    match err {
        KompressionError::CorruptStream { offset: None, reason } => {
            KompressionError::corrupt(offset, reason)
        }
        other => other,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Read-after-write reference: out[i] = out[i - d]
    fn reference_copy(history: &[u8], displacement: usize, length: usize) -> Vec<u8> {
        let mut out = history.to_vec();
        for _ in 0..length {
            let b = out[out.len() - displacement];
            out.push(b);
        }
        out[history.len()..].to_vec()
    }

    #[test]
    fn overlapping_copy_repeats_pattern() {
        let history = b"xyzABC";
        for displacement in 1..=history.len() {
            for length in 1..20 {
                let mut window = CircularBuffer::new(16);
                for &b in history {
                    window.write(b);
                }
                let mut out = Vec::new();
                window.copy(displacement, length, &mut out).unwrap();
                assert_eq!(
                    out,
                    reference_copy(history, displacement, length),
                    "d={} l={}",
                    displacement,
                    length
                );
            }
        }
    }

    #[test]
    fn copy_wraps_around_the_ring() {
        let mut window = CircularBuffer::new(4);
        for &b in b"abcdef" {
            window.write(b);
        }
        // ring now holds "cdef" with the cursor at index 2
        let mut out = Vec::new();
        window.copy(4, 6, &mut out).unwrap();
        assert_eq!(out, b"cdefcd");
    }

    #[test]
    fn rejects_displacement_outside_history() {
        let mut window = CircularBuffer::new(8);
        window.write(1);
        let mut out = Vec::new();
        assert!(window.copy(0, 3, &mut out).is_err());
        assert!(window.copy(2, 3, &mut out).is_err());
        assert!(window.copy(1, 3, &mut out).is_ok());
        assert_eq!(out, [1, 1, 1]);
    }

    #[test]
    fn prefilled_history_is_referencable() {
        let mut window = CircularBuffer::prefilled(4096, b' ', 0xFEE);
        let mut out = Vec::new();
        window.copy_from_index(0, 3, &mut out).unwrap();
        assert_eq!(out, b"   ");
        assert_eq!(window.cursor(), 0xFF1);
    }
}
