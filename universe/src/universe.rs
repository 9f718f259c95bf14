use thiserror::Error;
use tracing::{trace, trace_span};

use crate::arena::{Arena, NodeId};
use crate::pos::Pos;
use crate::quad::Quadrant;
use crate::step::{CacheStats, Engine, StepMode};

/// Root levels beyond this would overflow the `i64` coordinate space.
const MAX_LEVEL: u8 = 63;

#[derive(Clone, Copy, PartialEq, Eq, Error, Debug)]
pub enum Error {
    /// The coordinate cannot be represented at any supported root level.
    #[error("coordinate ({x}, {y}) is outside the supported universe")]
    CoordinateOutOfRange { x: i64, y: i64 },
    /// Growing for a step would exceed the supported root level.
    #[error("universe grew past the maximum supported size")]
    SizeLimit,
}

/// An unbounded Life grid: a canonical quadtree root plus a generation
/// counter.
///
/// Each universe owns its own [`Arena`] and step cache, so independent
/// universes never share canonical state.
pub struct Universe {
    arena: Arena,
    engine: Engine,
    root: NodeId,
    generation: u64,
    mode: StepMode,
}

impl Universe {
    /// An all-dead universe advancing one generation per step.
    pub fn new() -> Self {
        Self::with_mode(StepMode::Single)
    }

    pub fn with_mode(mode: StepMode) -> Self {
        let mut arena = Arena::new();
        let root = arena.empty(3);
        Self {
            arena,
            engine: Engine::new(),
            root,
            generation: 0,
            mode,
        }
    }

    /// Writes one cell, growing the root until the coordinate is
    /// addressable.
    ///
    /// # Errors
    /// [`Error::CoordinateOutOfRange`] if no supported root level can
    /// address `pos`.
    pub fn set(&mut self, pos: Pos, alive: bool) -> Result<(), Error> {
        while !self.in_bounds(pos) {
            if self.level() >= MAX_LEVEL {
                return Err(Error::CoordinateOutOfRange { x: pos.x, y: pos.y });
            }
            self.root = self.arena.expand(self.root);
        }
        self.root = set_in(&mut self.arena, self.root, pos, alive);
        Ok(())
    }

    /// Reads one cell; coordinates outside the root read as dead.
    pub fn get(&self, pos: Pos) -> bool {
        self.in_bounds(pos) && self.arena.get(self.root, pos)
    }

    /// Advances by `generations`.
    ///
    /// In [`StepMode::Single`] this is exactly `generations` ticks. In
    /// [`StepMode::Accelerated`] it is the smallest run of power-of-two
    /// macro-steps covering at least `generations`; check [`Self::generation`]
    /// for where the universe actually landed.
    ///
    /// # Errors
    /// [`Error::SizeLimit`] if the pattern outgrows the maximum root level.
    pub fn advance(&mut self, generations: u64) -> Result<(), Error> {
        let target = self.generation.saturating_add(generations);
        match self.mode {
            StepMode::Single => {
                for _ in 0..generations {
                    self.step()?;
                }
            }
            StepMode::Accelerated => {
                while self.generation < target {
                    self.step()?;
                }
            }
        }
        Ok(())
    }

    /// One engine invocation: 1 generation, or `2^(level-2)` when
    /// accelerated.
    ///
    /// # Errors
    /// [`Error::SizeLimit`] if the pattern outgrows the maximum root level.
    pub fn step(&mut self) -> Result<(), Error> {
        self.grow_for_step()?;
        let level = self.level();
        let _span = trace_span!("step", level, mode = ?self.mode).entered();
        let before = self.engine.stats();
        self.root = self.engine.advance(&mut self.arena, self.root, self.mode);
        let stats = self.engine.stats();
        trace!(
            hits = stats.hits - before.hits,
            misses = stats.misses - before.misses,
            "cache activity"
        );
        self.generation = self.generation.saturating_add(match self.mode {
            StepMode::Single => 1,
            StepMode::Accelerated => 1 << (level - 2),
        });
        Ok(())
    }

    pub fn population(&self) -> u64 {
        self.arena.population(self.root)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current root level; the addressable square has half-extent
    /// `2^(level-1)` around the origin.
    pub fn level(&self) -> u8 {
        self.arena.level(self.root)
    }

    /// Distinct nodes interned so far.
    pub fn node_count(&self) -> usize {
        self.arena.node_count()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.engine.stats()
    }

    /// Coordinates of every live cell, unordered.
    ///
    /// Empty subtrees are shared canonical nodes, so the walk skips dead
    /// regions in O(1) each.
    pub fn live_cells(&self) -> Vec<Pos> {
        let mut cells = Vec::new();
        let half = self.arena.half_width(self.root);
        self.collect_live(self.root, Pos { x: -half, y: -half }, &mut cells);
        cells
    }

    fn collect_live(&self, node: NodeId, min: Pos, cells: &mut Vec<Pos>) {
        if self.arena.is_empty(node) {
            return;
        }
        let level = self.arena.level(node);
        if level == 0 {
            cells.push(min);
            return;
        }
        let half = 1i64 << (level - 1);
        let c = self.arena.children(node);
        self.collect_live(c.nw, min, cells);
        self.collect_live(c.ne, min + Pos { x: half, y: 0 }, cells);
        self.collect_live(c.sw, min + Pos { x: 0, y: half }, cells);
        self.collect_live(c.se, min + Pos { x: half, y: half }, cells);
    }

    fn in_bounds(&self, pos: Pos) -> bool {
        let half = self.arena.half_width(self.root);
        pos.x >= -half && pos.x < half && pos.y >= -half && pos.y < half
    }

    /// Grows the root until stepping cannot lose cells: level >= 3 and all
    /// population concentrated two levels inside each quadrant.
    ///
    /// The check per quadrant is one comparison of precomputed populations.
    fn grow_for_step(&mut self) -> Result<(), Error> {
        while self.level() < 3 || !self.population_is_interior() {
            if self.level() >= MAX_LEVEL {
                return Err(Error::SizeLimit);
            }
            self.root = self.arena.expand(self.root);
        }
        Ok(())
    }

    fn population_is_interior(&self) -> bool {
        let children = self.arena.children(self.root);
        Quadrant::ALL.iter().all(|&q| {
            let child = children[q];
            let inward = self.arena.children(child)[q.opposite()];
            let core = self.arena.children(inward)[q.opposite()];
            self.arena.population(child) == self.arena.population(core)
        })
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

/// Path-copy update: rebuilds the spine from `pos` back to the root,
/// re-interning one node per level.
fn set_in(arena: &mut Arena, node: NodeId, pos: Pos, alive: bool) -> NodeId {
    if arena.level(node) == 0 {
        return arena.leaf(alive);
    }
    let q = Quadrant::from_pos(pos);
    let pos = pos.re_center(arena.half_width(node) / 2);
    let mut children = arena.children(node);
    children[q] = set_in(arena, children[q], pos, alive);
    arena.inner(children)
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use itertools::Itertools;
    use proptest::collection::hash_set;
    use proptest::prelude::*;

    use super::{Error, Universe};
    use crate::pos::Pos;
    use crate::step::StepMode;

    fn place(universe: &mut Universe, cells: &[(i64, i64)]) {
        for &(x, y) in cells {
            universe.set(Pos { x, y }, true).unwrap();
        }
    }

    fn cells(universe: &Universe) -> Vec<(i64, i64)> {
        universe
            .live_cells()
            .into_iter()
            .map(|pos| (pos.x, pos.y))
            .sorted()
            .collect()
    }

    fn sorted(mut cells: Vec<(i64, i64)>) -> Vec<(i64, i64)> {
        cells.sort_unstable();
        cells
    }

    /// Straightforward set-based simulation, as a reference.
    fn naive_step(cells: &HashSet<(i64, i64)>) -> HashSet<(i64, i64)> {
        let mut counts = std::collections::HashMap::new();
        for &(x, y) in cells {
            for (dx, dy) in (-1..=1).cartesian_product(-1..=1) {
                if (dx, dy) != (0, 0) {
                    *counts.entry((x + dx, y + dy)).or_insert(0u8) += 1;
                }
            }
        }
        counts
            .into_iter()
            .filter(|&(cell, n)| n == 3 || (n == 2 && cells.contains(&cell)))
            .map(|(cell, _)| cell)
            .collect()
    }

    #[test]
    fn set_then_get() {
        let mut universe = Universe::new();
        universe.set(Pos { x: 2, y: -5 }, true).unwrap();
        assert!(universe.get(Pos { x: 2, y: -5 }));
        assert!(!universe.get(Pos { x: -5, y: 2 }));
        assert!(!universe.get(Pos { x: 1000, y: 1000 }));
        assert_eq!(universe.population(), 1);

        universe.set(Pos { x: 2, y: -5 }, false).unwrap();
        assert_eq!(universe.population(), 0);
    }

    #[test]
    fn empty_universe_is_idempotent() {
        let mut universe = Universe::new();
        universe.advance(25).unwrap();
        assert_eq!(universe.population(), 0);
        assert_eq!(universe.generation(), 25);
        assert!(universe.live_cells().is_empty());
    }

    #[test]
    fn blinker_oscillates() {
        let mut universe = Universe::new();
        place(&mut universe, &[(0, 0), (1, 0), (2, 0)]);

        universe.advance(1).unwrap();
        assert_eq!(cells(&universe), sorted(vec![(1, -1), (1, 0), (1, 1)]));

        universe.advance(1).unwrap();
        assert_eq!(cells(&universe), sorted(vec![(0, 0), (1, 0), (2, 0)]));
        assert_eq!(universe.generation(), 2);
    }

    #[test]
    fn glider_translates_diagonally() {
        let glider = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];
        let mut universe = Universe::new();
        place(&mut universe, &glider);

        universe.advance(4).unwrap();

        let expected = sorted(glider.iter().map(|&(x, y)| (x + 1, y + 1)).collect());
        assert_eq!(cells(&universe), expected);
        assert_eq!(universe.population(), 5);
    }

    #[test]
    fn growth_is_minimal() {
        let mut universe = Universe::new();
        assert_eq!(universe.level(), 3);

        // the level-3 root addresses [-4, 3]
        universe.set(Pos { x: 3, y: 3 }, true).unwrap();
        assert_eq!(universe.level(), 3);
        universe.set(Pos { x: -4, y: -4 }, true).unwrap();
        assert_eq!(universe.level(), 3);

        universe.set(Pos { x: 4, y: 0 }, true).unwrap();
        assert_eq!(universe.level(), 4);

        universe.set(Pos { x: -9, y: 0 }, true).unwrap();
        assert_eq!(universe.level(), 5);
    }

    #[test]
    fn out_of_range_coordinate_is_an_error() {
        let mut universe = Universe::new();
        let result = universe.set(Pos { x: i64::MAX, y: 0 }, true);
        assert_eq!(
            result,
            Err(Error::CoordinateOutOfRange { x: i64::MAX, y: 0 })
        );
    }

    #[test]
    fn accelerated_blinker_lands_on_an_even_generation() {
        let mut universe = Universe::with_mode(StepMode::Accelerated);
        place(&mut universe, &[(0, 0), (1, 0), (2, 0)]);

        universe.advance(1).unwrap();

        let generation = universe.generation();
        assert!(generation >= 1 && generation.is_power_of_two());
        // a period-2 oscillator on an even generation is back where it began
        assert_eq!(generation % 2, 0);
        assert_eq!(cells(&universe), sorted(vec![(0, 0), (1, 0), (2, 0)]));
    }

    #[test]
    fn periodic_pattern_stops_missing_the_cache() {
        let mut universe = Universe::new();
        place(&mut universe, &[(0, 0), (1, 0), (2, 0)]);

        // let the padding levels settle into their cycle
        universe.advance(8).unwrap();
        let settled = universe.cache_stats();
        universe.advance(2).unwrap();
        let after = universe.cache_stats();

        assert_eq!(after.misses, settled.misses);
        assert!(after.hits > settled.hits);
    }

    #[test]
    fn aligned_gliders_share_work() {
        let glider = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];

        let mut solo = Universe::new();
        place(&mut solo, &glider);
        solo.advance(8).unwrap();
        let solo_misses = solo.cache_stats().misses;

        let mut fleet = Universe::new();
        for i in 0..16 {
            for &(x, y) in &glider {
                fleet.set(Pos { x: x + i * 64, y }, true).unwrap();
            }
        }
        fleet.advance(8).unwrap();
        let fleet_misses = fleet.cache_stats().misses;

        assert_eq!(fleet.population(), 16 * 5);
        // identical aligned sub-patterns are the same canonical nodes, so
        // the fleet costs far less than sixteen separate simulations
        assert!(
            fleet_misses < 8 * solo_misses,
            "fleet {fleet_misses} vs solo {solo_misses}"
        );
    }

    proptest! {
        #[test]
        fn matches_naive_simulation(
            seed in hash_set((-8i64..8, -8i64..8), 0..40),
            steps in 1usize..4,
        ) {
            let mut universe = Universe::new();
            let mut reference: HashSet<(i64, i64)> = seed.clone();
            for &(x, y) in &seed {
                universe.set(Pos { x, y }, true).unwrap();
            }
            for _ in 0..steps {
                universe.advance(1).unwrap();
                reference = naive_step(&reference);
            }
            let expected = sorted(reference.into_iter().collect());
            prop_assert_eq!(cells(&universe), expected);
        }
    }
}
