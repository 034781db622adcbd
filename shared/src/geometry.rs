//! Plane geometry used by both the coordinator and its clients.
//!
//! Everything in here is pure: no clocks, no randomness, no shared state.

use serde::{Deserialize, Serialize};

/// A point in world space. `x` grows to the right, `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Position {
        Position {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Inclusive axis-aligned rectangle that positions are clamped into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Bounds {
    /// Playable area of a `width` × `height` world, inset by `margin` on every side.
    ///
    /// A world narrower than twice the margin collapses to a single line at
    /// `margin` so that `min <= max` always holds.
    pub fn for_world(width: f32, height: f32, margin: f32) -> Self {
        Self {
            min_x: margin,
            max_x: (width - margin).max(margin),
            min_y: margin,
            max_y: (height - margin).max(margin),
        }
    }

    pub fn contains(&self, position: &Position) -> bool {
        (self.min_x..=self.max_x).contains(&position.x)
            && (self.min_y..=self.max_y).contains(&position.y)
    }
}

/// Constrains each axis of `position` to the `[min, max]` range of `bounds`.
pub fn clamp(position: Position, bounds: &Bounds) -> Position {
    Position {
        x: position.x.clamp(bounds.min_x, bounds.max_x),
        y: position.y.clamp(bounds.min_y, bounds.max_y),
    }
}

/// True iff `a` and `b` are strictly closer than `radius`.
pub fn colliding(a: &Position, b: &Position, radius: f32) -> bool {
    a.distance(b) < radius
}
