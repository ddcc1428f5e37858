//! Rotation axis of the transformation space.

use crate::space::dimension_size;
use crate::util::math::sin_cos_deg;
use crate::util::{EdgeMatchError, EdgeMatchResult};

/// Discrete, circular grid of integer rotation angles in `[0, max_deg)`.
#[derive(Clone, Debug)]
pub struct AngleGrid {
    step_deg: u32,
    max_deg: u32,
    trig: Vec<(f32, f32)>,
}

impl AngleGrid {
    /// Creates a grid with `ceil(max_deg / step_deg)` samples starting at 0°.
    pub fn new(step_deg: u32, max_deg: u32) -> EdgeMatchResult<Self> {
        if step_deg == 0 {
            return Err(EdgeMatchError::InvalidSpace {
                reason: "rotation step must be > 0",
            });
        }
        if max_deg == 0 {
            return Err(EdgeMatchError::InvalidSpace {
                reason: "max rotation must be > 0",
            });
        }
        let len = dimension_size(max_deg as f32, step_deg as f32).max(1);
        let trig = (0..len)
            .map(|idx| sin_cos_deg(wrapped(idx, step_deg, max_deg) as f32))
            .collect();
        Ok(Self {
            step_deg,
            max_deg,
            trig,
        })
    }

    /// Returns the number of discrete angles.
    pub fn len(&self) -> usize {
        self.trig.len()
    }

    /// Returns true if the grid has no angles.
    pub fn is_empty(&self) -> bool {
        self.trig.is_empty()
    }

    /// Returns the step between consecutive angles in degrees.
    pub fn step_deg(&self) -> u32 {
        self.step_deg
    }

    /// Returns the exclusive upper end of the angle range.
    pub fn max_deg(&self) -> u32 {
        self.max_deg
    }

    /// Returns the angle in degrees for a depth index.
    pub fn angle_at(&self, idx: usize) -> u32 {
        debug_assert!(idx < self.len());
        wrapped(idx, self.step_deg, self.max_deg)
    }

    /// Returns the precomputed `(sin, cos)` for a depth index.
    pub fn sin_cos_at(&self, idx: usize) -> (f32, f32) {
        self.trig[idx]
    }

    /// Iterates over all angles in depth order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len()).map(|idx| self.angle_at(idx))
    }
}

fn wrapped(idx: usize, step_deg: u32, max_deg: u32) -> u32 {
    ((idx as u64 * step_deg as u64) % max_deg as u64) as u32
}
