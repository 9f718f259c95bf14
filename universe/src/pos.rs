use std::ops::{Add, Neg, Sub};

use crate::quad::Quadrant;

/// A cell coordinate.
///
/// x increases to the east, y increases to the south.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Pos {
    pub x: i64,
    pub y: i64,
}
impl Pos {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
    /// Offset of the given quadrant's center from its parent's center.
    pub fn in_dir(q: Quadrant, dist: i64) -> Self {
        Self {
            x: if q.is_west() { -dist } else { dist },
            y: if q.is_north() { -dist } else { dist },
        }
    }
    /// Moves the coordinate `amount` closer to (0, 0) on both axes.
    ///
    /// Rebases a parent-relative coordinate to the child quadrant it
    /// falls in, when `amount` is the child's half width.
    pub(crate) fn re_center(self, amount: i64) -> Self {
        Self {
            x: self.x + if self.x < 0 { amount } else { -amount },
            y: self.y + if self.y < 0 { amount } else { -amount },
        }
    }
}
impl Add for Pos {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}
impl Sub for Pos {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}
impl Neg for Pos {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}
