//! Rectangular regions and their quadrant split.
//!
//! Shared by the translation search (pixels) and the scale search
//! (grid cells, with `x` as column and `y` as row).

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Region {
    pub(crate) x: usize,
    pub(crate) y: usize,
    pub(crate) w: usize,
    pub(crate) h: usize,
}

impl Region {
    pub(crate) fn new(x: usize, y: usize, w: usize, h: usize) -> Self {
        Self { x, y, w, h }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// A single cell cannot be split any further.
    pub(crate) fn is_unit(&self) -> bool {
        self.w <= 1 && self.h <= 1
    }

    pub(crate) fn center(&self) -> (usize, usize) {
        (self.x + self.w / 2, self.y + self.h / 2)
    }

    /// Bisects both axes; an axis of extent 1 is left whole.
    ///
    /// Quadrants come out row by row: top-left, top-right, bottom-left,
    /// bottom-right.
    pub(crate) fn quadrants(&self) -> Vec<Region> {
        if self.is_empty() {
            return Vec::new();
        }
        let xs = halves(self.x, self.w);
        let ys = halves(self.y, self.h);
        let mut out = Vec::with_capacity(4);
        for &(y, h) in ys.iter().flatten() {
            for &(x, w) in xs.iter().flatten() {
                out.push(Region { x, y, w, h });
            }
        }
        out
    }
}

fn halves(start: usize, len: usize) -> [Option<(usize, usize)>; 2] {
    if len < 2 {
        return [Some((start, len)), None];
    }
    let first = len / 2;
    [Some((start, first)), Some((start + first, len - first))]
}
