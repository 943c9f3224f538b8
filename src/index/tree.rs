//! Ukkonen suffix tree stored in an index arena.
//!
//! Leaf edges do not own their end position. They all read the tree-wide `leaf_end`,
//! so extending every leaf by one symbol is a single store.

use smallvec::SmallVec;

const ROOT: usize = 0;
const NONE: usize = usize::MAX;
/// Terminal symbol; input bytes are shifted up by one
const TERMINAL: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeEnd {
    /// follows the tree's current `leaf_end`
    Leaf,
    Fixed(usize),
}

#[derive(Debug, Clone)]
struct Node {
    start: usize,
    end: EdgeEnd,
    link: usize,
    /// suffix start for leaves
    suffix: usize,
    children: SmallVec<[(u16, usize); 4]>,
}

impl Node {
    fn internal(start: usize, end: usize) -> Self {
        Self {
            start,
            end: EdgeEnd::Fixed(end),
            link: ROOT,
            suffix: NONE,
            children: SmallVec::new(),
        }
    }

    fn leaf(start: usize, suffix: usize) -> Self {
        Self {
            start,
            end: EdgeEnd::Leaf,
            link: ROOT,
            suffix,
            children: SmallVec::new(),
        }
    }

    fn child(&self, symbol: u16) -> Option<usize> {
        self.children
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|&(_, idx)| idx)
    }

    fn set_child(&mut self, symbol: u16, idx: usize) {
        match self.children.iter_mut().find(|(s, _)| *s == symbol) {
            Some(entry) => entry.1 = idx,
            None => self.children.push((symbol, idx)),
        }
    }
}

/// Suffix tree over `input` followed by a unique terminal.
#[derive(Debug, Clone)]
pub struct SuffixTree {
    text: Vec<u16>,
    nodes: Vec<Node>,
    leaf_end: usize,
}

impl SuffixTree {
    pub fn new(input: &[u8]) -> Self {
        let mut text: Vec<u16> = input.iter().map(|&b| b as u16 + 1).collect();
        text.push(TERMINAL);

        let mut tree = Self {
            nodes: Vec::with_capacity(2 * text.len()),
            text,
            leaf_end: 0,
        };
        tree.nodes.push(Node::internal(0, 0));
        tree.construct();
        tree
    }

    fn end(&self, idx: usize) -> usize {
        match self.nodes[idx].end {
            EdgeEnd::Leaf => self.leaf_end,
            EdgeEnd::Fixed(e) => e,
        }
    }

    fn edge_len(&self, idx: usize) -> usize {
        self.end(idx) - self.nodes[idx].start
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn construct(&mut self) {
        let mut active_node = ROOT;
        let mut active_edge = 0;
        let mut active_length = 0;
        let mut remainder = 0;

        for i in 0..self.text.len() {
            // every leaf grows by one symbol
            self.leaf_end = i + 1;
            remainder += 1;
            let mut last_internal = NONE;

            while remainder > 0 {
                if active_length == 0 {
                    active_edge = i;
                }
                let edge_symbol = self.text[active_edge];

                match self.nodes[active_node].child(edge_symbol) {
                    None => {
                        let leaf = self.push(Node::leaf(i, i + 1 - remainder));
                        self.nodes[active_node].set_child(self.text[i], leaf);
                        if last_internal != NONE {
                            self.nodes[last_internal].link = active_node;
                            last_internal = NONE;
                        }
                    }
                    Some(next) => {
                        let edge_len = self.edge_len(next);
                        if active_length >= edge_len {
                            // walk down
                            active_edge += edge_len;
                            active_length -= edge_len;
                            active_node = next;
                            continue;
                        }

                        let next_start = self.nodes[next].start;
                        if self.text[next_start + active_length] == self.text[i] {
                            // already present; extend the active point and stop this phase
                            if last_internal != NONE && active_node != ROOT {
                                self.nodes[last_internal].link = active_node;
                            }
                            active_length += 1;
                            break;
                        }

                        let split = self.push(Node::internal(next_start, next_start + active_length));
                        self.nodes[active_node].set_child(edge_symbol, split);

                        let leaf = self.push(Node::leaf(i, i + 1 - remainder));
                        self.nodes[split].set_child(self.text[i], leaf);

                        self.nodes[next].start += active_length;
                        let moved_symbol = self.text[self.nodes[next].start];
                        self.nodes[split].set_child(moved_symbol, next);

                        if last_internal != NONE {
                            self.nodes[last_internal].link = split;
                        }
                        last_internal = split;
                    }
                }

                remainder -= 1;
                if active_node == ROOT && active_length > 0 {
                    active_length -= 1;
                    active_edge = i + 1 - remainder;
                } else if active_node != ROOT {
                    active_node = self.nodes[active_node].link;
                }
            }
        }
    }

    /// Number of arena nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Walk the leaves in lexicographic order.
    ///
    /// Returns the suffix array of the original input together with its LCP array
    /// (string depth of the lowest common ancestor of neighbouring leaves).
    pub fn sorted_suffixes(&self) -> (Vec<usize>, Vec<usize>) {
        let n = self.text.len() - 1;
        let mut suffixes = Vec::with_capacity(n);
        let mut lcp = Vec::with_capacity(n);

        // (node, string depth of its parent)
        let mut stack: Vec<(usize, usize)> = vec![(ROOT, 0)];
        let mut min_depth = 0;

        while let Some((idx, parent_depth)) = stack.pop() {
            min_depth = min_depth.min(parent_depth);
            let node = &self.nodes[idx];

            if node.children.is_empty() && idx != ROOT {
                // the terminal-only suffix sorts first and is not part of the input
                if node.suffix < n {
                    lcp.push(if suffixes.is_empty() { 0 } else { min_depth });
                    suffixes.push(node.suffix);
                }
                min_depth = usize::MAX;
                continue;
            }

            let depth = if idx == ROOT {
                0
            } else {
                parent_depth + self.edge_len(idx)
            };
            let mut children = node.children.clone();
            children.sort_unstable_by_key(|&(symbol, _)| symbol);
            // push in reverse so the smallest symbol is visited first
            stack.extend(children.iter().rev().map(|&(_, child)| (child, depth)));
        }

        (suffixes, lcp)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_suffix_becomes_a_leaf() {
        let input = b"abcabxabcd";
        let tree = SuffixTree::new(input);
        let (suffixes, _) = tree.sorted_suffixes();
        let mut seen = suffixes.clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..input.len()).collect::<Vec<_>>());
        // a suffix tree over n symbols has at most 2n nodes
        assert!(tree.node_count() <= 2 * (input.len() + 1));
    }

    #[test]
    fn leaves_share_the_global_end() {
        let tree = SuffixTree::new(b"aaaa");
        let leaves = tree
            .nodes
            .iter()
            .filter(|n| n.end == EdgeEnd::Leaf)
            .count();
        // one leaf per suffix plus the terminal-only suffix
        assert_eq!(leaves, 5);
        assert_eq!(tree.leaf_end, 5);
    }
}
