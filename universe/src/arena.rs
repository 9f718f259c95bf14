//! Canonical node storage
//!
//! Every node of every quadtree lives in one [`Arena`], deduplicated on
//! construction, so structurally equal subtrees are the same [`NodeId`] and
//! equality checks anywhere above the arena are handle comparisons.

use std::collections::HashMap;

use crate::pos::Pos;
use crate::quad::{Quad, Quadrant};

/// Handle to an interned node.
///
/// Two handles from the same arena compare equal iff the nodes are
/// structurally identical.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u32);

const DEAD: NodeId = NodeId(0);
const ALIVE: NodeId = NodeId(1);

/// The interning key: everything that determines a node's shape.
///
/// An inner node's key holds child *handles*; because children are interned
/// first, hashing and equality are O(1) no matter how deep the subtree is.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum NodeKey {
    Leaf(bool),
    Inner(Quad<NodeId>),
}

struct NodeRecord {
    key: NodeKey,
    /// 0 for a single cell; a level-L node spans a 2^L x 2^L square.
    level: u8,
    /// Count of alive cells below, fixed at construction.
    population: u64,
}

pub struct Arena {
    records: Vec<NodeRecord>,
    ids: HashMap<NodeKey, NodeId>,
    /// `empty[level]` is the shared all-dead node of that level.
    empty: Vec<NodeId>,
}

impl Arena {
    pub fn new() -> Self {
        let mut arena = Arena {
            records: Vec::new(),
            ids: HashMap::new(),
            empty: Vec::new(),
        };
        let dead = arena.intern(NodeKey::Leaf(false));
        let alive = arena.intern(NodeKey::Leaf(true));
        debug_assert_eq!(dead, DEAD);
        debug_assert_eq!(alive, ALIVE);
        arena.empty.push(dead);
        arena
    }

    /// Number of distinct nodes ever interned.
    pub fn node_count(&self) -> usize {
        self.records.len()
    }

    pub fn leaf(&self, alive: bool) -> NodeId {
        if alive {
            ALIVE
        } else {
            DEAD
        }
    }

    /// Interns the node with the given four children.
    ///
    /// The children must all be canonical handles of equal level; the new
    /// node's level and population are derived from them.
    pub fn inner(&mut self, children: Quad<NodeId>) -> NodeId {
        self.intern(NodeKey::Inner(children))
    }

    /// The all-dead node of the given level.
    ///
    /// Built bottom-up through the interner, so there is exactly one such
    /// node per level regardless of how it is reached.
    pub fn empty(&mut self, level: u8) -> NodeId {
        while self.empty.len() <= usize::from(level) {
            let below = *self.empty.last().unwrap();
            let node = self.inner(Quad::splat(below));
            self.empty.push(node);
        }
        self.empty[usize::from(level)]
    }

    fn intern(&mut self, key: NodeKey) -> NodeId {
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }
        let (level, population) = match key {
            NodeKey::Leaf(alive) => (0, u64::from(alive)),
            NodeKey::Inner(children) => {
                let child_level = self.level(children.nw);
                debug_assert!(
                    children.iter().all(|&c| self.level(c) == child_level),
                    "inconsistent child level"
                );
                let population = children
                    .iter()
                    .map(|&c| self.population(c))
                    .fold(0, u64::saturating_add);
                (child_level + 1, population)
            }
        };
        let id = NodeId(u32::try_from(self.records.len()).expect("too many nodes"));
        self.records.push(NodeRecord {
            key,
            level,
            population,
        });
        self.ids.insert(key, id);
        id
    }

    pub fn level(&self, node: NodeId) -> u8 {
        self.record(node).level
    }
    pub fn population(&self, node: NodeId) -> u64 {
        self.record(node).population
    }
    pub fn is_empty(&self, node: NodeId) -> bool {
        self.record(node).population == 0
    }
    /// Half the side length of the node's square.
    pub fn half_width(&self, node: NodeId) -> i64 {
        1i64 << (self.level(node) - 1)
    }
    pub fn children(&self, node: NodeId) -> Quad<NodeId> {
        match self.record(node).key {
            NodeKey::Leaf(_) => panic!("leaf node has no children"),
            NodeKey::Inner(children) => children,
        }
    }

    /// Reads one cell, `pos` relative to the node's center.
    pub fn get(&self, node: NodeId, pos: Pos) -> bool {
        match self.record(node).key {
            NodeKey::Leaf(alive) => alive,
            NodeKey::Inner(children) => {
                let q = Quadrant::from_pos(pos);
                let pos = pos.re_center(self.half_width(node) / 2);
                self.get(children[q], pos)
            }
        }
    }

    /// One level taller, the old content centered against empty borders.
    ///
    /// Preserves every cell's absolute coordinate while doubling the
    /// addressable square.
    pub fn expand(&mut self, node: NodeId) -> NodeId {
        let border = self.empty(self.level(node) - 1);
        let c = self.children(node);
        let children = Quad {
            nw: self.inner(Quad {
                nw: border,
                ne: border,
                sw: border,
                se: c.nw,
            }),
            ne: self.inner(Quad {
                nw: border,
                ne: border,
                sw: c.ne,
                se: border,
            }),
            sw: self.inner(Quad {
                nw: border,
                ne: c.sw,
                sw: border,
                se: border,
            }),
            se: self.inner(Quad {
                nw: c.se,
                ne: border,
                sw: border,
                se: border,
            }),
        };
        self.inner(children)
    }

    fn record(&self, node: NodeId) -> &NodeRecord {
        &self.records[node.0 as usize]
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}
