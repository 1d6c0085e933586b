/*!
Custom datastructures used while reading a sentence. The `EdgeTable` holds the flat child → parent
relation of a sentence exactly as it appears in the export records, without assuming that a parent
is defined before its children. Yields are computed from it in a single dependency-ordered pass.
*/
use ahash::{HashMap as AHashMap, HashSet as AHashSet};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::{self, Display};

/// Identifier of the implicit virtual root. Every sentence has exactly one, and it is always the
/// topmost node.
pub const ROOT_ID: u32 = 0;

/// Node identifiers below this value are terminal indices, identifiers at or above it are
/// non-terminals.
pub const NONTERMINAL_THRESHOLD: u32 = 500;

/// Label given to the implicit root.
pub const ROOT_LABEL: &str = "VROOT";

/// The set of terminal positions dominated by a node. The positions are always sorted and
/// deduplicated, which makes two yields equal exactly when they cover the same positions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Yield(Box<[usize]>);

impl Yield {
    /// Canonicalizes the positions. Order and duplicates in the input do not matter.
    pub fn new<I: IntoIterator<Item = usize>>(positions: I) -> Self {
        Self(positions.into_iter().sorted_unstable().dedup().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn positions(&self) -> &[usize] {
        &self.0
    }

    pub fn contains(&self, position: usize) -> bool {
        self.0.binary_search(&position).is_ok()
    }

    /// A yield is contiguous when it has no gap. The empty yield is contiguous.
    pub fn is_contiguous(&self) -> bool {
        self.0.iter().tuple_windows().all(|(a, b)| b - a == 1)
    }

    /// Keeps the positions accepted by `keep`. The result is still canonical.
    pub fn retain<P: FnMut(usize) -> bool>(&self, mut keep: P) -> Self {
        Self(self.0.iter().copied().filter(|p| keep(*p)).collect())
    }
}

impl From<Vec<usize>> for Yield {
    fn from(value: Vec<usize>) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> From<[usize; N]> for Yield {
    fn from(value: [usize; N]) -> Self {
        Self::new(value)
    }
}

impl Display for Yield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0.iter().join(","))
    }
}

/// A node whose yield is fully resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Identifier as written in the record. `ROOT_ID` for the implicit root.
    pub id: u32,
    pub label: String,
    /// Identifier of the parent node. `None` only for the root.
    pub parent: Option<u32>,
    /// The yield of the node.
    pub terminals: Yield,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// The child end of an edge, used when reporting a broken reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    Terminal(usize),
    NonTerminal(u32),
}

impl Display for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal(position) => write!(f, "terminal {}", position),
            Self::NonTerminal(id) => write!(f, "node #{}", id),
        }
    }
}

/// Structural defects found in an edge table. They carry the source line when there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TableError {
    DuplicateNode { id: u32, line: usize },
    UnresolvedParent { child: Child, parent: u32, line: usize },
    Cycle { id: u32, line: usize },
    Childless { id: u32, line: usize },
}

#[derive(Debug, Clone)]
struct NonTerminalEdge {
    label: String,
    parent: u32,
    line: usize,
}

/// Flat child → parent table of one sentence.
#[derive(Debug, Clone, Default)]
pub(crate) struct EdgeTable {
    /// Parent of each terminal, indexed by terminal position, with the source line.
    terminals: Vec<(u32, usize)>,
    nonterminals: AHashMap<u32, NonTerminalEdge>,
}

impl EdgeTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers the next terminal and returns its position.
    pub(crate) fn push_terminal(&mut self, parent: u32, line: usize) -> usize {
        self.terminals.push((parent, line));
        self.terminals.len() - 1
    }

    pub(crate) fn insert_nonterminal(
        &mut self,
        id: u32,
        label: String,
        parent: u32,
        line: usize,
    ) -> Result<(), TableError> {
        if self.nonterminals.contains_key(&id) {
            return Err(TableError::DuplicateNode { id, line });
        }
        self.nonterminals
            .insert(id, NonTerminalEdge { label, parent, line });
        Ok(())
    }

    pub(crate) fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    fn is_defined(&self, id: u32) -> bool {
        id == ROOT_ID || self.nonterminals.contains_key(&id)
    }

    /// Checks that every parent reference names a defined node. Terminals are checked first,
    /// then non-terminals in ascending identifier order, so the reported defect is deterministic.
    fn check_references(&self) -> Result<(), TableError> {
        for (position, (parent, line)) in self.terminals.iter().enumerate() {
            if !self.is_defined(*parent) {
                return Err(TableError::UnresolvedParent {
                    child: Child::Terminal(position),
                    parent: *parent,
                    line: *line,
                });
            }
        }
        for (id, edge) in self.nonterminals.iter().sorted_unstable_by_key(|(id, _)| **id) {
            if !self.is_defined(edge.parent) {
                return Err(TableError::UnresolvedParent {
                    child: Child::NonTerminal(*id),
                    parent: edge.parent,
                    line: edge.line,
                });
            }
        }
        Ok(())
    }

    /// Computes the yield of every node. A node is resolved only once all of its non-terminal
    /// children are, so forward references are harmless and cycles are exactly the nodes that
    /// never become ready. The returned nodes start with the root, followed by the non-terminals in
    /// ascending identifier order.
    pub(crate) fn resolve(self) -> Result<Vec<Node>, TableError> {
        self.check_references()?;

        let mut positions: AHashMap<u32, Vec<usize>> = AHashMap::default();
        for (position, (parent, _)) in self.terminals.iter().enumerate() {
            positions.entry(*parent).or_default().push(position);
        }
        let mut pending: AHashMap<u32, usize> = AHashMap::default();
        for edge in self.nonterminals.values() {
            *pending.entry(edge.parent).or_default() += 1;
        }

        let mut ready: VecDeque<u32> = self
            .nonterminals
            .keys()
            .copied()
            .filter(|id| !pending.contains_key(id))
            .sorted_unstable()
            .collect();

        let mut nodes = Vec::with_capacity(self.nonterminals.len() + 1);
        while let Some(id) = ready.pop_front() {
            let edge = &self.nonterminals[&id];
            let terminals = Yield::new(positions.remove(&id).unwrap_or_default());
            if terminals.is_empty() {
                return Err(TableError::Childless { id, line: edge.line });
            }
            positions
                .entry(edge.parent)
                .or_default()
                .extend_from_slice(terminals.positions());
            if let Some(count) = pending.get_mut(&edge.parent) {
                *count -= 1;
                if *count == 0 && edge.parent != ROOT_ID {
                    ready.push_back(edge.parent);
                }
            }
            nodes.push(Node {
                id,
                label: edge.label.clone(),
                parent: Some(edge.parent),
                terminals,
            });
        }

        let resolved: AHashSet<u32> = nodes.iter().map(|n| n.id).collect();
        if let Some((id, edge)) = self
            .nonterminals
            .iter()
            .filter(|(id, _)| !resolved.contains(*id))
            .min_by_key(|(id, _)| **id)
        {
            return Err(TableError::Cycle {
                id: *id,
                line: edge.line,
            });
        }

        nodes.sort_unstable_by_key(|n| n.id);
        let root = Node {
            id: ROOT_ID,
            label: String::from(ROOT_LABEL),
            parent: None,
            terminals: Yield::new(positions.remove(&ROOT_ID).unwrap_or_default()),
        };
        nodes.insert(0, root);
        Ok(nodes)
    }
}
