use std::cmp::Ordering;

use bitvec::prelude::*;
use tracing::debug;

use crate::error::{HuffmanError, Result};
use crate::min_heap::{HeapErr, MinHeap};
use crate::registry::SymbolRegistry;
use crate::symbol::Code;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuffNode {
    /// Points at a registry slot.
    Leaf { weight: u64, slot: usize },
    Internal {
        weight: u64,
        left: NodeId,
        right: NodeId,
    },
}

impl HuffNode {
    pub fn weight(&self) -> u64 {
        match self {
            HuffNode::Leaf { weight, .. } => *weight,
            HuffNode::Internal { weight, .. } => *weight,
        }
    }
}

/// Heap key: lowest weight first, then lowest arena index. Leaves enter the
/// arena in registration order and merged nodes are appended as they are made,
/// so the arena index is the order a left-to-right scan would visit them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    weight: u64,
    id: NodeId,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .cmp(&other.weight)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A Huffman tree stored as an arena; children and parents are indices into it.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    nodes: Vec<HuffNode>,
    parents: Vec<Option<NodeId>>,
    root: NodeId,
}

impl HuffmanTree {
    /// Builds the tree from every registry entry with a nonzero count.
    ///
    /// The registry must be sealed so the EOF sentinel takes part; that also
    /// guarantees at least one leaf.
    pub fn build(registry: &SymbolRegistry) -> Result<Self> {
        let leaves: Vec<HuffNode> = registry
            .live_slots()
            .filter_map(|slot| {
                registry.get(slot).map(|s| HuffNode::Leaf {
                    weight: s.count,
                    slot,
                })
            })
            .collect();
        if leaves.is_empty() {
            return Err(HuffmanError::MissingEof);
        }
        Ok(Self::from_leaves(leaves))
    }

    fn from_leaves(leaves: Vec<HuffNode>) -> Self {
        let leaf_count = leaves.len();
        let mut nodes = leaves;
        nodes.reserve(leaf_count.saturating_sub(1));

        let candidates: Vec<Candidate> = nodes
            .iter()
            .enumerate()
            .map(|(id, n)| Candidate {
                weight: n.weight(),
                id,
            })
            .collect();
        let mut heap = MinHeap::build(candidates);
        let mut parents = vec![None; leaf_count];

        for _ in 1..leaf_count {
            let (x, y) = match Self::take_two(&mut heap) {
                Ok(pair) => pair,
                Err(HeapErr::HeapUnderflow) => break,
            };
            let id = nodes.len();
            nodes.push(HuffNode::Internal {
                weight: x.weight + y.weight,
                left: x.id,
                right: y.id,
            });
            debug_assert!(parents[x.id].is_none() && parents[y.id].is_none());
            parents[x.id] = Some(id);
            parents[y.id] = Some(id);
            parents.push(None);
            heap.insert(Candidate {
                weight: x.weight + y.weight,
                id,
            });
        }

        let root = nodes.len() - 1;
        debug!(
            leaves = leaf_count,
            nodes = nodes.len(),
            weight = nodes[root].weight(),
            "built huffman tree"
        );
        HuffmanTree {
            nodes,
            parents,
            root,
        }
    }

    fn take_two(
        heap: &mut MinHeap<Candidate>,
    ) -> std::result::Result<(Candidate, Candidate), HeapErr> {
        let x = heap.extract_min()?;
        let y = heap.extract_min()?;
        Ok((x, y))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &HuffNode {
        &self.nodes[id]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents[id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, HuffNode::Leaf { .. }))
            .count()
    }

    /// Walks the tree depth first, appending 0 for the left branch and 1 for
    /// the right, and returns `(registry slot, code)` for every leaf in visit
    /// order. A tree that is a single leaf gives that leaf the code `0`.
    pub fn generate_codes(&self) -> Vec<(usize, Code)> {
        let mut table = Vec::with_capacity(self.leaf_count());
        if let HuffNode::Leaf { slot, .. } = self.nodes[self.root] {
            table.push((slot, bitvec![u8, Msb0; 0]));
            return table;
        }

        // explicit stack: a skewed tree can be as deep as it has leaves
        let mut stack: Vec<(NodeId, Code)> = vec![(self.root, Code::new())];
        while let Some((id, path)) = stack.pop() {
            match self.nodes[id] {
                HuffNode::Leaf { slot, .. } => table.push((slot, path)),
                HuffNode::Internal { left, right, .. } => {
                    let mut right_path = path.clone();
                    right_path.push(true);
                    let mut left_path = path;
                    left_path.push(false);
                    stack.push((right, right_path));
                    stack.push((left, left_path));
                }
            }
        }
        table
    }

    /// Generates codes and stores them on the registry entries.
    pub fn assign_codes(&self, registry: &mut SymbolRegistry) -> usize {
        let mut max_len = 0;
        for (slot, code) in self.generate_codes() {
            max_len = max_len.max(code.len());
            registry.set_code(slot, code);
        }
        max_len
    }
}

/// What a decoder tree leaf stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedSymbol {
    Data(Vec<u8>),
    Eof,
}

#[derive(Debug, Clone, Default)]
struct DecodeNode {
    children: [Option<NodeId>; 2],
    leaf: Option<DecodedSymbol>,
}

/// The decoder's tree, grown one code at a time from codebook records.
#[derive(Debug, Clone)]
pub struct DecodeTree {
    nodes: Vec<DecodeNode>,
    has_eof: bool,
}

impl Default for DecodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeTree {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        DecodeTree {
            nodes: vec![DecodeNode::default()],
            has_eof: false,
        }
    }

    /// Walks `code` from the root, creating nodes as needed, and marks the end
    /// as a leaf. Fails if the code is empty, runs through an existing leaf, or
    /// ends on a node that already has a leaf or children.
    pub fn insert(&mut self, code: &BitSlice<u8, Msb0>, symbol: DecodedSymbol) -> Result<()> {
        let conflict = || HuffmanError::CodeConflict {
            code: code.iter().map(|b| if *b { '1' } else { '0' }).collect(),
        };
        if code.is_empty() {
            return Err(conflict());
        }
        if symbol == DecodedSymbol::Eof && self.has_eof {
            return Err(HuffmanError::DuplicateEof);
        }

        let mut current = Self::ROOT;
        for bit in code.iter().by_vals() {
            if self.nodes[current].leaf.is_some() {
                return Err(conflict());
            }
            let branch = bit as usize;
            current = match self.nodes[current].children[branch] {
                Some(next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(DecodeNode::default());
                    self.nodes[current].children[branch] = Some(next);
                    next
                }
            };
        }

        let terminal = &mut self.nodes[current];
        if terminal.leaf.is_some() || terminal.children.iter().any(Option::is_some) {
            return Err(conflict());
        }
        if symbol == DecodedSymbol::Eof {
            self.has_eof = true;
        }
        terminal.leaf = Some(symbol);
        Ok(())
    }

    pub fn has_eof(&self) -> bool {
        self.has_eof
    }

    /// Follows one bit from `node`; `None` when that branch was never created.
    pub fn step(&self, node: NodeId, bit: bool) -> Option<NodeId> {
        self.nodes[node].children[bit as usize]
    }

    pub fn leaf(&self, node: NodeId) -> Option<&DecodedSymbol> {
        self.nodes[node].leaf.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolBytes;

    fn code_string(code: &Code) -> String {
        code.iter().map(|b| if *b { '1' } else { '0' }).collect()
    }

    fn codes_for(input: &[u8]) -> (SymbolRegistry, HuffmanTree) {
        let mut registry = SymbolRegistry::from_input(input, 3000).unwrap();
        let tree = HuffmanTree::build(&registry).unwrap();
        tree.assign_codes(&mut registry);
        (registry, tree)
    }

    #[test]
    fn test_aaab_tree_shape() {
        let (registry, tree) = codes_for(b"AAAB");
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.node(tree.root()).weight(), 5);

        let a = registry.code_for(&SymbolBytes::single(b'A')).unwrap();
        let b = registry.code_for(&SymbolBytes::single(b'B')).unwrap();
        let eof = registry.eof_code().unwrap();
        // B and EOF merge first (B registered earlier so it goes left), that
        // pair then has weight 2 and beats A
        assert_eq!(code_string(b), "00");
        assert_eq!(code_string(eof), "01");
        assert_eq!(code_string(a), "1");
    }

    #[test]
    fn test_single_leaf_gets_one_bit() {
        let (registry, tree) = codes_for(b"");
        assert_eq!(tree.node_count(), 1);
        assert_eq!(code_string(registry.eof_code().unwrap()), "0");
    }

    #[test]
    fn test_single_symbol_with_eof() {
        let (registry, _) = codes_for(b"zzzz");
        assert_eq!(registry.code_for(&SymbolBytes::single(b'z')).unwrap().len(), 1);
        assert_eq!(registry.eof_code().unwrap().len(), 1);
    }

    #[test]
    fn test_every_node_but_root_has_one_parent() {
        let (_, tree) = codes_for(b"the quick brown fox jumps over the lazy dog");
        assert_eq!(tree.node_count(), 2 * tree.leaf_count() - 1);
        for id in 0..tree.node_count() {
            assert_eq!(tree.parent(id).is_none(), id == tree.root());
        }
    }

    #[test]
    fn test_skewed_tree_depth() {
        // doubling weights (with EOF at 1) merge into a single spine
        let mut input = Vec::new();
        let weights = [1usize, 2, 4, 8, 16];
        for (i, w) in weights.iter().enumerate() {
            input.extend(std::iter::repeat(b'a' + i as u8).take(*w));
        }
        let (_, tree) = codes_for(&input);
        let max = tree.generate_codes().iter().map(|(_, c)| c.len()).max().unwrap();
        assert_eq!(max, tree.leaf_count() - 1);
    }

    #[test]
    fn test_build_is_deterministic() {
        let input = "abracadabra \u{4e2d}\u{6587} abracadabra".as_bytes();
        let (_, first) = codes_for(input);
        let (_, second) = codes_for(input);
        assert_eq!(first.generate_codes(), second.generate_codes());
    }

    #[test]
    fn test_decode_tree_rejects_conflicts() {
        let mut tree = DecodeTree::new();
        tree.insert(bits![u8, Msb0; 0, 1], DecodedSymbol::Data(b"a".to_vec()))
            .unwrap();
        // through a leaf
        assert!(matches!(
            tree.insert(bits![u8, Msb0; 0, 1, 1], DecodedSymbol::Data(b"b".to_vec())),
            Err(HuffmanError::CodeConflict { .. })
        ));
        // onto an internal node
        assert!(matches!(
            tree.insert(bits![u8, Msb0; 0], DecodedSymbol::Data(b"c".to_vec())),
            Err(HuffmanError::CodeConflict { .. })
        ));
        // empty code
        assert!(tree.insert(&Code::new(), DecodedSymbol::Eof).is_err());

        tree.insert(bits![u8, Msb0; 1], DecodedSymbol::Eof).unwrap();
        assert!(tree.has_eof());
        assert!(matches!(
            tree.insert(bits![u8, Msb0; 0, 0], DecodedSymbol::Eof),
            Err(HuffmanError::DuplicateEof)
        ));
    }

    #[test]
    fn test_decode_tree_walk() {
        let mut tree = DecodeTree::new();
        tree.insert(bits![u8, Msb0; 1, 0], DecodedSymbol::Data(b"x".to_vec()))
            .unwrap();
        let n = tree.step(DecodeTree::ROOT, true).unwrap();
        assert!(tree.leaf(n).is_none());
        let n = tree.step(n, false).unwrap();
        assert_eq!(tree.leaf(n), Some(&DecodedSymbol::Data(b"x".to_vec())));
        assert!(tree.step(DecodeTree::ROOT, false).is_none());
    }
}
