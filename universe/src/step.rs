//! The memoized generation engine
//!
//! Advancing a level-L node yields its level-(L-1) center some number of
//! generations later: exactly 1 in [`StepMode::Single`], `2^(L-2)` in
//! [`StepMode::Accelerated`]. Results are cached per canonical handle, so
//! each distinct pattern is advanced at most once no matter how often it
//! recurs in space or time.

use lru::LruCache;
use std::num::NonZeroUsize;

use crate::arena::{Arena, NodeId};
use crate::pos::Pos;
use crate::quad::Quad;

const STEP_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(1 << 22) {
    Some(size) => size,
    None => unreachable!(),
};

/// Bits adjacent to bit 5 in a 4x4 row-major window.
const NEIGHBOUR_MASK: u16 = 0x0757;

/// How far one engine call moves a node through time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum StepMode {
    /// Each call advances exactly one generation.
    Single,
    /// Each call on a level-L node advances `2^(L-2)` generations.
    Accelerated,
}

/// Cumulative cache counters, for diagnostics and tests.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

pub(crate) struct Engine {
    cache: LruCache<(NodeId, StepMode), NodeId>,
    stats: CacheStats,
}

impl Engine {
    pub(crate) fn new() -> Self {
        Self {
            cache: LruCache::new(STEP_CACHE_SIZE),
            stats: CacheStats::default(),
        }
    }

    pub(crate) fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Advances `node` (level >= 2), returning its advanced center.
    pub(crate) fn advance(&mut self, arena: &mut Arena, node: NodeId, mode: StepMode) -> NodeId {
        let level = arena.level(node);
        debug_assert!(level >= 2, "stepped below the 4x4 base case");
        // dead stays dead, and the shared empty nodes make this a handle lookup
        if arena.is_empty(node) {
            return arena.empty(level - 1);
        }
        let key = (node, mode);
        if let Some(&result) = self.cache.get(&key) {
            self.stats.hits += 1;
            return result;
        }
        self.stats.misses += 1;
        let result = if level == 2 {
            base_step(arena, node)
        } else {
            match mode {
                StepMode::Single => self.single_step(arena, node),
                StepMode::Accelerated => self.accelerated_step(arena, node),
            }
        };
        self.cache.put(key, result);
        result
    }

    /// Level >= 3, one generation.
    ///
    /// The nine centered sub-nodes tile the node's interior one level down;
    /// the four overlapping 2x2 groups of them recurse, and their centers
    /// reassemble into the advanced center.
    fn single_step(&mut self, arena: &mut Arena, node: NodeId) -> NodeId {
        let c = arena.children(node);
        let n00 = centered_sub(arena, c.nw);
        let n01 = centered_horizontal(arena, c.nw, c.ne);
        let n02 = centered_sub(arena, c.ne);
        let n10 = centered_vertical(arena, c.nw, c.sw);
        let n11 = centered_core(arena, node);
        let n12 = centered_vertical(arena, c.ne, c.se);
        let n20 = centered_sub(arena, c.sw);
        let n21 = centered_horizontal(arena, c.sw, c.se);
        let n22 = centered_sub(arena, c.se);

        let groups = Quad {
            nw: arena.inner(Quad {
                nw: n00,
                ne: n01,
                sw: n10,
                se: n11,
            }),
            ne: arena.inner(Quad {
                nw: n01,
                ne: n02,
                sw: n11,
                se: n12,
            }),
            sw: arena.inner(Quad {
                nw: n10,
                ne: n11,
                sw: n20,
                se: n21,
            }),
            se: arena.inner(Quad {
                nw: n11,
                ne: n12,
                sw: n21,
                se: n22,
            }),
        };
        let advanced = groups.map(|g| self.advance(arena, g, StepMode::Single));
        arena.inner(advanced)
    }

    /// Level >= 3, `2^(level-2)` generations.
    ///
    /// Same shape as [`Self::single_step`], except the nine sub-nodes are
    /// themselves advanced results (each worth `2^(level-3)` generations),
    /// and the group recursion contributes the other half.
    fn accelerated_step(&mut self, arena: &mut Arena, node: NodeId) -> NodeId {
        let c = arena.children(node);
        let cnw = arena.children(c.nw);
        let cne = arena.children(c.ne);
        let csw = arena.children(c.sw);
        let cse = arena.children(c.se);

        let north = arena.inner(Quad {
            nw: cnw.ne,
            ne: cne.nw,
            sw: cnw.se,
            se: cne.sw,
        });
        let west = arena.inner(Quad {
            nw: cnw.sw,
            ne: cnw.se,
            sw: csw.nw,
            se: csw.ne,
        });
        let core = arena.inner(Quad {
            nw: cnw.se,
            ne: cne.sw,
            sw: csw.ne,
            se: cse.nw,
        });
        let east = arena.inner(Quad {
            nw: cne.sw,
            ne: cne.se,
            sw: cse.nw,
            se: cse.ne,
        });
        let south = arena.inner(Quad {
            nw: csw.ne,
            ne: cse.nw,
            sw: csw.se,
            se: cse.sw,
        });

        let n00 = self.advance(arena, c.nw, StepMode::Accelerated);
        let n01 = self.advance(arena, north, StepMode::Accelerated);
        let n02 = self.advance(arena, c.ne, StepMode::Accelerated);
        let n10 = self.advance(arena, west, StepMode::Accelerated);
        let n11 = self.advance(arena, core, StepMode::Accelerated);
        let n12 = self.advance(arena, east, StepMode::Accelerated);
        let n20 = self.advance(arena, c.sw, StepMode::Accelerated);
        let n21 = self.advance(arena, south, StepMode::Accelerated);
        let n22 = self.advance(arena, c.se, StepMode::Accelerated);

        let groups = Quad {
            nw: arena.inner(Quad {
                nw: n00,
                ne: n01,
                sw: n10,
                se: n11,
            }),
            ne: arena.inner(Quad {
                nw: n01,
                ne: n02,
                sw: n11,
                se: n12,
            }),
            sw: arena.inner(Quad {
                nw: n10,
                ne: n11,
                sw: n20,
                se: n21,
            }),
            se: arena.inner(Quad {
                nw: n11,
                ne: n12,
                sw: n21,
                se: n22,
            }),
        };
        let advanced = groups.map(|g| self.advance(arena, g, StepMode::Accelerated));
        arena.inner(advanced)
    }
}

/// Level-2 base case: direct simulation of the 2x2 center of a 4x4 window.
fn base_step(arena: &mut Arena, node: NodeId) -> NodeId {
    let mut window: u16 = 0;
    for y in -2..2 {
        for x in -2..2 {
            window = (window << 1) | u16::from(arena.get(node, Pos { x, y }));
        }
    }
    let next = Quad {
        nw: window >> 5,
        ne: window >> 4,
        sw: window >> 1,
        se: window,
    }
    .map(|w| arena.leaf(life_rule(w)));
    arena.inner(next)
}

/// The rule, applied to the cell at bit 5 of a row-major 4x4 window.
fn life_rule(window: u16) -> bool {
    let alive = window >> 5 & 1 != 0;
    let neighbours = (window & NEIGHBOUR_MASK).count_ones();
    neighbours == 3 || (neighbours == 2 && alive)
}

/// The level-(M-1) node centered inside a level-M node.
fn centered_sub(arena: &mut Arena, node: NodeId) -> NodeId {
    let c = arena.children(node).map(|child| arena.children(child));
    arena.inner(Quad {
        nw: c.nw.se,
        ne: c.ne.sw,
        sw: c.sw.ne,
        se: c.se.nw,
    })
}

/// The level-(M-1) node centered on the seam of two level-M neighbours.
fn centered_horizontal(arena: &mut Arena, west: NodeId, east: NodeId) -> NodeId {
    let w = arena.children(west);
    let e = arena.children(east);
    let children = Quad {
        nw: arena.children(w.ne).se,
        ne: arena.children(e.nw).sw,
        sw: arena.children(w.se).ne,
        se: arena.children(e.sw).nw,
    };
    arena.inner(children)
}

fn centered_vertical(arena: &mut Arena, north: NodeId, south: NodeId) -> NodeId {
    let n = arena.children(north);
    let s = arena.children(south);
    let children = Quad {
        nw: arena.children(n.sw).se,
        ne: arena.children(n.se).sw,
        sw: arena.children(s.nw).ne,
        se: arena.children(s.ne).nw,
    };
    arena.inner(children)
}

/// The level-(M-2) node at the very center of a level-M node.
fn centered_core(arena: &mut Arena, node: NodeId) -> NodeId {
    let c = arena.children(node);
    let twice = |arena: &Arena, node, pick: fn(Quad<NodeId>) -> NodeId| {
        pick(arena.children(pick(arena.children(node))))
    };
    let children = Quad {
        nw: twice(arena, c.nw, |q| q.se),
        ne: twice(arena, c.ne, |q| q.sw),
        sw: twice(arena, c.sw, |q| q.ne),
        se: twice(arena, c.se, |q| q.nw),
    };
    arena.inner(children)
}
