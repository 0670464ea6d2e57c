use crate::flds::field::{FieldDim, Pos};
use crate::projector::shape::{Block, STENCIL};
use crate::Float;

/// Mutable window onto a run of x-planes of a `Field`.
///
/// Indices are relative to the first plane of the window. Each view
/// carries the extents of the component it was cut from, so dual axes
/// keep their extra slot.
pub struct GridView<'a> {
    name: &'a str,
    data: &'a mut [Float],
    dim: FieldDim,
}

impl<'a> GridView<'a> {
    pub fn new(name: &'a str, data: &'a mut [Float], dim: FieldDim) -> GridView<'a> {
        assert!(
            data.len() >= dim.len(),
            "{}: view of {} values over a slice of {}",
            name,
            dim.len(),
            data.len()
        );
        GridView { name, data, dim }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn dim(&self) -> FieldDim {
        self.dim
    }

    #[inline(always)]
    pub fn get(&self, pos: Pos) -> Float {
        self.data[self.dim.get_index(pos)]
    }

    /// Adds a 5x5x5 block whose (0, 0, 0) corner lands on `origin`.
    #[inline(always)]
    pub fn deposit(&mut self, origin: [i64; 3], vals: &Block) {
        if !cfg!(feature = "unchecked") {
            let sizes = [self.dim.size_x, self.dim.size_y, self.dim.size_z];
            for (axis, (&o, &size)) in origin.iter().zip(sizes.iter()).enumerate() {
                assert!(
                    o >= 0 && o as usize + STENCIL <= size,
                    "{}: stencil at {:?} leaves the view along axis {} (size {})",
                    self.name,
                    origin,
                    axis,
                    size
                );
            }
        }
        let (oi, oj, ok) = (origin[0] as usize, origin[1] as usize, origin[2] as usize);
        for (i, plane) in vals.iter().enumerate() {
            for (j, row) in plane.iter().enumerate() {
                let start = ((oi + i) * self.dim.size_y + oj + j) * self.dim.size_z + ok;
                for (k, v) in row.iter().enumerate() {
                    unsafe {
                        // in range thanks to the assertion above, unless
                        // built with the unchecked feature.
                        *self.data.get_unchecked_mut(start + k) += v;
                    }
                }
            }
        }
    }
}
