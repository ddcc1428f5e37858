//! Binary edge maps.
//!
//! An `EdgeMap` is an owned, row-major grid where each pixel is either an
//! edge or not. Coordinates are `(x, y)` with `x` the column and `y` the row.
//! Maps are produced by an edge detector outside the matcher (see the
//! `io` module behind the `image-io` feature) and are treated as immutable
//! once handed to a `Matcher`.

use crate::util::{EdgeMatchError, EdgeMatchResult};

#[cfg(feature = "image-io")]
pub mod io;

const EDGE: u8 = 1;
const NOT_EDGE: u8 = 0;

/// Edge-pixel and total-pixel counts of a map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeStats {
    /// Number of edge pixels.
    pub edges: usize,
    /// Total number of pixels.
    pub pixels: usize,
}

impl EdgeStats {
    /// Edge density `edges / pixels`, or 0 for an empty map.
    pub fn ratio(&self) -> f32 {
        crate::util::math::safe_ratio(self.edges, self.pixels)
    }
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// Owned binary edge map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeMap {
    data: Vec<u8>,
    width: usize,
    height: usize,
    edges: usize,
}

impl EdgeMap {
    /// Creates a map with no edge pixels.
    pub fn new(width: usize, height: usize) -> EdgeMatchResult<Self> {
        let len = pixel_len(width, height)?;
        Ok(Self {
            data: vec![NOT_EDGE; len],
            width,
            height,
            edges: 0,
        })
    }

    /// Builds a map from a contiguous mask; any non-zero value is an edge.
    pub fn from_mask(data: &[u8], width: usize, height: usize) -> EdgeMatchResult<Self> {
        Self::from_strided(data, width, height, width)
    }

    /// Builds a map from a mask whose rows start `stride` elements apart.
    pub fn from_strided(
        data: &[u8],
        width: usize,
        height: usize,
        stride: usize,
    ) -> EdgeMatchResult<Self> {
        let len = pixel_len(width, height)?;
        if stride < width {
            return Err(EdgeMatchError::InvalidStride { width, stride });
        }
        let needed = (height - 1)
            .checked_mul(stride)
            .and_then(|v| v.checked_add(width))
            .ok_or(EdgeMatchError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(EdgeMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }

        let mut out = Vec::with_capacity(len);
        for y in 0..height {
            let start = y * stride;
            out.extend(
                data[start..start + width]
                    .iter()
                    .map(|&v| if v != 0 { EDGE } else { NOT_EDGE }),
            );
        }
        let edges = out.iter().filter(|&&v| v == EDGE).count();
        Ok(Self {
            data: out,
            width,
            height,
            edges,
        })
    }

    /// Builds a map from a list of edge coordinates; points outside are ignored.
    pub fn from_points<I>(width: usize, height: usize, points: I) -> EdgeMatchResult<Self>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut map = Self::new(width, height)?;
        for (x, y) in points {
            map.set(x, y, true);
        }
        Ok(map)
    }

    /// Returns the map width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the map height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of edge pixels.
    pub fn edge_count(&self) -> usize {
        self.edges
    }

    /// Returns `width * height`.
    pub fn pixel_count(&self) -> usize {
        self.data.len()
    }

    /// Returns edge and pixel counts together.
    pub fn stats(&self) -> EdgeStats {
        EdgeStats {
            edges: self.edges,
            pixels: self.data.len(),
        }
    }

    /// Returns the row-major mask, one byte per pixel (0 or 1).
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Returns true if `(x, y)` is inside the map and is an edge.
    pub fn is_edge(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data[y * self.width + x] == EDGE
    }

    /// Signed lookup used for projected coordinates; outside is never an edge.
    #[inline]
    pub fn is_edge_at(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        self.is_edge(x as usize, y as usize)
    }

    /// Marks or clears a pixel. Out-of-bounds coordinates are ignored.
    pub fn set(&mut self, x: usize, y: usize, edge: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let cell = &mut self.data[y * self.width + x];
        let was = *cell == EDGE;
        match (was, edge) {
            (false, true) => {
                *cell = EDGE;
                self.edges += 1;
            }
            (true, false) => {
                *cell = NOT_EDGE;
                self.edges -= 1;
            }
            _ => {}
        }
    }

    /// Iterates edge pixel coordinates in row-major order.
    pub fn edge_points(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == EDGE)
            .map(move |(idx, _)| (idx % width, idx / width))
    }

    /// Tight bounding box of all edge pixels, or `None` when there are none.
    pub fn edge_bounds(&self) -> Option<CropRect> {
        let mut min_x = usize::MAX;
        let mut min_y = usize::MAX;
        let mut max_x = 0usize;
        let mut max_y = 0usize;
        for (x, y) in self.edge_points() {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        if min_x == usize::MAX {
            return None;
        }
        Some(CropRect {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }

    /// Copies out a rectangular region.
    pub fn crop(&self, rect: CropRect) -> EdgeMatchResult<EdgeMap> {
        let end_x = rect.x.checked_add(rect.width);
        let end_y = rect.y.checked_add(rect.height);
        match (end_x, end_y) {
            (Some(ex), Some(ey)) if ex <= self.width && ey <= self.height => {}
            _ => {
                return Err(EdgeMatchError::InvalidDimensions {
                    width: rect.width,
                    height: rect.height,
                })
            }
        }
        let start = rect.y * self.width + rect.x;
        EdgeMap::from_strided(
            self.data.get(start..).unwrap_or(&[]),
            rect.width,
            rect.height,
            self.width,
        )
    }

    /// Trims the map to the tight bounding box of its edge pixels.
    ///
    /// Returns the cropped map together with the rectangle it was cut from, so
    /// a companion color image can be cropped identically.
    pub fn crop_to_edges(&self) -> Option<(EdgeMap, CropRect)> {
        let rect = self.edge_bounds()?;
        self.crop(rect).ok().map(|map| (map, rect))
    }
}

fn pixel_len(width: usize, height: usize) -> EdgeMatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(EdgeMatchError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .ok_or(EdgeMatchError::InvalidDimensions { width, height })
}
