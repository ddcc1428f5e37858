//! Discretized transformation space for the exemplar.
//!
//! The space is a dense 3D grid of `(sx, sy, angle)` candidates indexed by
//! `(row, col, depth)`: grid rows walk the vertical scale `sy`, grid columns
//! walk the horizontal scale `sx` and depth walks the rotation angle. Scale
//! bounds come from a fixed maximum working dimension divided by the
//! exemplar's extent on that axis, clamped to `[scale_floor, max_scale]`.
//!
//! The grid is built once per exemplar and is read-only afterwards, so one
//! space can be shared by any number of concurrent searches.

mod angles;

pub use angles::AngleGrid;

use crate::trace::{trace_event, trace_span};
use crate::util::{EdgeMatchError, EdgeMatchResult};
use std::fmt;

/// Parameters for building a transformation space.
#[derive(Clone, Debug, PartialEq)]
pub struct SpaceConfig {
    /// Largest image extent (pixels) a scaled exemplar may reach.
    pub max_working_dim: f32,
    /// Upper clamp on either scale factor.
    pub max_scale: f32,
    /// Smallest scale factor; also the value of the first grid cell.
    pub scale_floor: f32,
    /// Scale increment between neighbouring rows/columns.
    pub scale_step: f32,
    /// Rotation increment between neighbouring depth slices.
    pub rotation_step_deg: u32,
    /// Exclusive upper end of the rotation range.
    pub max_rotation_deg: u32,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            max_working_dim: 750.0,
            max_scale: 2.0,
            scale_floor: 0.05,
            scale_step: 0.05,
            rotation_step_deg: 5,
            max_rotation_deg: 360,
        }
    }
}

impl SpaceConfig {
    fn validate(&self) -> EdgeMatchResult<()> {
        let finite_positive = |v: f32| v.is_finite() && v > 0.0;
        if !finite_positive(self.max_working_dim) {
            return Err(EdgeMatchError::InvalidSpace {
                reason: "max_working_dim must be finite and > 0",
            });
        }
        if !finite_positive(self.scale_step) {
            return Err(EdgeMatchError::InvalidSpace {
                reason: "scale_step must be finite and > 0",
            });
        }
        if !finite_positive(self.scale_floor) {
            return Err(EdgeMatchError::InvalidSpace {
                reason: "scale_floor must be finite and > 0",
            });
        }
        if !self.max_scale.is_finite() || self.max_scale < self.scale_floor {
            return Err(EdgeMatchError::InvalidSpace {
                reason: "max_scale must be finite and >= scale_floor",
            });
        }
        Ok(())
    }
}

/// One candidate geometric transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Horizontal (column) scale factor.
    pub sx: f32,
    /// Vertical (row) scale factor.
    pub sy: f32,
    /// Rotation in whole degrees, in `[0, max_rotation_deg)`.
    pub angle_deg: u32,
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Transform = Transform {
        sx: 1.0,
        sy: 1.0,
        angle_deg: 0,
    };
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sx={:.3} sy={:.3} angle={}°",
            self.sx, self.sy, self.angle_deg
        )
    }
}

/// Number of grid samples needed to cover `span` in steps of `increment`.
///
/// Rounds up, with a small tolerance so float noise on an exact multiple does
/// not add a spurious step. The result never undershoots the span and is
/// non-decreasing in `span`. Non-positive or non-finite inputs yield 0.
pub fn dimension_size(span: f32, increment: f32) -> usize {
    const FRACTION_EPS: f64 = 1e-4;
    if !span.is_finite() || !increment.is_finite() || span <= 0.0 || increment <= 0.0 {
        return 0;
    }
    let steps = span as f64 / increment as f64;
    let whole = steps.floor();
    let fraction = steps - whole;
    if fraction > FRACTION_EPS {
        whole as usize + 1
    } else {
        whole as usize
    }
}

/// Dense `(row, col, depth)` grid of candidate transforms.
#[derive(Clone, Debug)]
pub struct TransformSpace {
    cfg: SpaceConfig,
    rows: usize,
    cols: usize,
    angles: AngleGrid,
    max_sx: f32,
    max_sy: f32,
    cells: Vec<Transform>,
}

impl TransformSpace {
    /// Builds the space for an exemplar of `width x height` pixels.
    pub fn build(width: usize, height: usize, cfg: SpaceConfig) -> EdgeMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(EdgeMatchError::InvalidDimensions { width, height });
        }
        cfg.validate()?;
        let _span = trace_span!("build_space", width = width, height = height).entered();

        let max_sy = axis_limit(cfg.max_working_dim, height, &cfg);
        let max_sx = axis_limit(cfg.max_working_dim, width, &cfg);
        let rows = dimension_size(max_sy, cfg.scale_step).max(1);
        let cols = dimension_size(max_sx, cfg.scale_step).max(1);
        let angles = AngleGrid::new(cfg.rotation_step_deg, cfg.max_rotation_deg)?;
        let depths = angles.len();

        let len = rows
            .checked_mul(cols)
            .and_then(|v| v.checked_mul(depths))
            .ok_or(EdgeMatchError::InvalidSpace {
                reason: "transformation grid is too large",
            })?;
        let mut cells = Vec::with_capacity(len);
        for row in 0..rows {
            let sy = cfg.scale_floor + row as f32 * cfg.scale_step;
            for col in 0..cols {
                let sx = cfg.scale_floor + col as f32 * cfg.scale_step;
                for depth in 0..depths {
                    cells.push(Transform {
                        sx,
                        sy,
                        angle_deg: angles.angle_at(depth),
                    });
                }
            }
        }

        trace_event!(
            "space_built",
            rows = rows,
            cols = cols,
            depths = depths,
            max_sx = max_sx,
            max_sy = max_sy
        );

        Ok(Self {
            cfg,
            rows,
            cols,
            angles,
            max_sx,
            max_sy,
            cells,
        })
    }

    /// Returns `(rows, cols, depths)`.
    pub fn extents(&self) -> (usize, usize, usize) {
        (self.rows, self.cols, self.angles.len())
    }

    /// Total number of candidate transforms.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the grid holds no transforms.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the configuration the space was built with.
    pub fn config(&self) -> &SpaceConfig {
        &self.cfg
    }

    /// Clamped maximum horizontal scale.
    pub fn max_sx(&self) -> f32 {
        self.max_sx
    }

    /// Clamped maximum vertical scale.
    pub fn max_sy(&self) -> f32 {
        self.max_sy
    }

    /// Returns the rotation axis.
    pub fn angles(&self) -> &AngleGrid {
        &self.angles
    }

    /// Returns the transform at `(row, col, depth)`.
    pub fn get(&self, row: usize, col: usize, depth: usize) -> Option<Transform> {
        if row >= self.rows || col >= self.cols || depth >= self.angles.len() {
            return None;
        }
        self.cells
            .get((row * self.cols + col) * self.angles.len() + depth)
            .copied()
    }

    /// Returns every rotation of one scale cell, in depth order.
    pub fn cell(&self, row: usize, col: usize) -> Option<&[Transform]> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let depths = self.angles.len();
        let start = (row * self.cols + col) * depths;
        self.cells.get(start..start + depths)
    }

    /// Returns `(sx, sy)` of a grid cell, shared by all its depths.
    pub fn scale_at(&self, row: usize, col: usize) -> EdgeMatchResult<(f32, f32)> {
        let t = self
            .get(row, col, 0)
            .ok_or(EdgeMatchError::IndexOutOfBounds {
                index: row * self.cols + col,
                len: self.rows * self.cols,
                context: "scale cell",
            })?;
        Ok((t.sx, t.sy))
    }

    /// Lists every entry as `(row, col, depth, transform)` in storage order.
    pub fn dump(&self) -> Vec<(usize, usize, usize, Transform)> {
        let depths = self.angles.len();
        self.cells
            .iter()
            .enumerate()
            .map(|(idx, t)| {
                let depth = idx % depths;
                let col = (idx / depths) % self.cols;
                let row = idx / (depths * self.cols);
                (row, col, depth, *t)
            })
            .collect()
    }
}

impl fmt::Display for TransformSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rows, cols, depths) = self.extents();
        writeln!(f, "transform space {rows}x{cols}x{depths}")?;
        for (row, col, depth, t) in self.dump() {
            writeln!(f, "[{row},{col},{depth}] {t}")?;
        }
        Ok(())
    }
}

fn axis_limit(max_working_dim: f32, extent: usize, cfg: &SpaceConfig) -> f32 {
    (max_working_dim / extent as f32)
        .min(cfg.max_scale)
        .max(cfg.scale_floor)
}

#[cfg(test)]
mod tests {
    use super::{dimension_size, SpaceConfig, TransformSpace};

    #[test]
    fn dimension_size_rounds_up_partial_steps() {
        assert_eq!(dimension_size(2.0, 0.05), 40);
        assert_eq!(dimension_size(360.0, 5.0), 72);
        assert_eq!(dimension_size(1.875, 0.05), 38);
        assert_eq!(dimension_size(1.01, 0.5), 3);
        assert_eq!(dimension_size(0.0, 0.5), 0);
        assert_eq!(dimension_size(1.0, 0.0), 0);
    }

    #[test]
    fn dump_indices_round_trip_through_get() {
        let cfg = SpaceConfig {
            scale_step: 0.5,
            scale_floor: 0.5,
            rotation_step_deg: 120,
            ..SpaceConfig::default()
        };
        let space = TransformSpace::build(30, 20, cfg).unwrap();
        for (row, col, depth, t) in space.dump() {
            assert_eq!(space.get(row, col, depth), Some(t));
        }
    }
}
