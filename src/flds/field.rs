use crate::flds::view::GridView;
use crate::Float;

pub struct Pos {
    pub i: usize,
    pub j: usize,
    pub k: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDim {
    pub size_x: usize,
    pub size_y: usize,
    pub size_z: usize,
}

/// A named 3D array for one field component.
///
/// Dual axes live on cell faces rather than nodes and carry one more slot
/// than the primal extent the field was built from.
pub struct Field {
    pub name: String,
    pub data: Vec<Float>,
    pub dim: FieldDim,
    pub is_dual: [bool; 3],
}

impl FieldDim {
    pub fn new(prim: [usize; 3], is_dual: [bool; 3]) -> FieldDim {
        FieldDim {
            size_x: prim[0] + is_dual[0] as usize,
            size_y: prim[1] + is_dual[1] as usize,
            size_z: prim[2] + is_dual[2] as usize,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.size_x * self.size_y * self.size_z
    }

    /// Number of values in one x-plane.
    #[inline(always)]
    pub fn plane_len(&self) -> usize {
        self.size_y * self.size_z
    }

    #[inline(always)]
    pub fn get_index(&self, pos: Pos) -> usize {
        // Row major with x as the slowest axis, so that a slab of
        // consecutive x-planes is one contiguous run of memory.
        if !cfg!(feature = "unchecked") {
            assert!(pos.i < self.size_x);
            assert!(pos.j < self.size_y);
            assert!(pos.k < self.size_z);
        }
        (pos.i * self.size_y + pos.j) * self.size_z + pos.k
    }
}

impl Field {
    pub fn new(name: &str, prim: [usize; 3], is_dual: [bool; 3]) -> Field {
        let dim = FieldDim::new(prim, is_dual);
        Field {
            name: name.to_string(),
            data: vec![0.0; dim.len()],
            dim,
            is_dual,
        }
    }

    #[inline(always)]
    pub fn get(&self, pos: Pos) -> Float {
        self.data[self.dim.get_index(pos)]
    }

    #[inline(always)]
    pub fn get_mut(&mut self, pos: Pos) -> &mut Float {
        let ind = self.dim.get_index(pos);
        &mut self.data[ind]
    }

    pub fn put_to(&mut self, val: Float) {
        for v in self.data.iter_mut() {
            *v = val;
        }
    }

    pub fn multiply(&mut self, val: Float) {
        for v in self.data.iter_mut() {
            *v *= val;
        }
    }

    /// Sum over the box `start..end` (end exclusive on every axis).
    pub fn sum(&self, start: [usize; 3], end: [usize; 3]) -> Float {
        if !cfg!(feature = "unchecked") {
            assert!(end[0] <= self.dim.size_x);
            assert!(end[1] <= self.dim.size_y);
            assert!(end[2] <= self.dim.size_z);
        }
        let mut sum = 0.0;
        for i in start[0]..end[0] {
            for j in start[1]..end[1] {
                let row = self.dim.get_index(Pos { i, j, k: 0 });
                sum += self.data[row + start[2]..row + end[2]].iter().sum::<Float>();
            }
        }
        sum
    }

    pub fn sum_all(&self) -> Float {
        self.data.iter().sum()
    }

    /// Squared L2 norm.
    pub fn norm(&self) -> Float {
        self.data.iter().map(|v| v * v).sum()
    }

    pub fn copy_from(&mut self, other: &Field) {
        assert_eq!(
            self.dim, other.dim,
            "Field size do not match {} {}",
            self.name, other.name
        );
        self.data.copy_from_slice(&other.data);
    }

    pub fn add_from(&mut self, other: &Field) {
        assert_eq!(
            self.dim, other.dim,
            "Field size do not match {} {}",
            self.name, other.name
        );
        for (v, o) in self.data.iter_mut().zip(other.data.iter()) {
            *v += o;
        }
    }

    /// View of every x-plane from `first_plane` to the end of the field.
    pub fn view_from(&mut self, first_plane: usize) -> GridView<'_> {
        assert!(
            first_plane < self.dim.size_x,
            "{}: plane {} past the end of the field",
            self.name,
            first_plane
        );
        let plane = self.dim.plane_len();
        let dim = FieldDim {
            size_x: self.dim.size_x - first_plane,
            ..self.dim
        };
        GridView::new(&self.name, &mut self.data[first_plane * plane..], dim)
    }

    /// Disjoint slabs for every second bin starting at `color`.
    ///
    /// Bin `b` owns the x-planes `b*clrw .. b*clrw + clrw + halo`, the last
    /// bin runs to the end of the field. Bins of one colour never overlap as
    /// long as `clrw >= halo`.
    pub fn bin_slabs(
        &mut self,
        clrw: usize,
        halo: usize,
        n_bins: usize,
        color: usize,
    ) -> Vec<(usize, GridView<'_>)> {
        assert!(clrw >= halo, "bins of width {} overlap", clrw);
        assert!(n_bins * clrw <= self.dim.size_x);
        let plane = self.dim.plane_len();
        let size_x = self.dim.size_x;
        let name = &self.name;
        let mut rest: &mut [Float] = &mut self.data;
        let mut consumed = 0;
        let mut slabs = Vec::with_capacity(n_bins / 2 + 1);
        for ibin in (color..n_bins).step_by(2) {
            let start = ibin * clrw;
            let end = if ibin + 1 == n_bins {
                size_x
            } else {
                (start + clrw + halo).min(size_x)
            };
            let (_, tail) = std::mem::take(&mut rest).split_at_mut((start - consumed) * plane);
            let (slab, tail) = tail.split_at_mut((end - start) * plane);
            rest = tail;
            consumed = end;
            let dim = FieldDim {
                size_x: end - start,
                ..self.dim
            };
            slabs.push((ibin, GridView::new(name, slab, dim)));
        }
        slabs
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::build_test_sim;

    #[test]
    fn field_init() {
        let sim = build_test_sim();
        let fld = Field::new("Jy", sim.dims_prim, [false, true, false]);
        assert_eq!(fld.dim.size_x, sim.dims_prim[0]);
        assert_eq!(fld.dim.size_y, sim.dims_prim[1] + 1);
        assert_eq!(fld.dim.size_z, sim.dims_prim[2]);
        assert_eq!(fld.data.len(), fld.dim.len());
        for v in fld.data.iter() {
            assert_eq!(*v, 0.0);
        }
    }

    #[test]
    fn row_major_order() {
        let fld = Field::new("rho", [3, 4, 5], [false; 3]);
        let mut index = 0;
        for i in 0..fld.dim.size_x {
            for j in 0..fld.dim.size_y {
                for k in 0..fld.dim.size_z {
                    assert_eq!(fld.dim.get_index(Pos { i, j, k }), index);
                    index += 1;
                }
            }
        }
        assert_eq!(index, fld.data.len());
    }

    #[test]
    fn region_sum_and_norm() {
        let mut fld = Field::new("rho", [4, 4, 4], [false; 3]);
        fld.put_to(2.0);
        assert_eq!(fld.sum_all(), 128.0);
        assert_eq!(fld.sum([1, 1, 1], [3, 3, 3]), 16.0);
        assert_eq!(fld.norm(), 256.0);
        fld.multiply(0.5);
        assert_eq!(fld.sum([0, 0, 0], [4, 4, 4]), 64.0);
        *fld.get_mut(Pos { i: 2, j: 1, k: 3 }) = 7.0;
        assert_eq!(fld.get(Pos { i: 2, j: 1, k: 3 }), 7.0);
    }

    #[test]
    fn copy_and_add() {
        let mut a = Field::new("a", [2, 3, 2], [true, false, false]);
        let mut b = Field::new("b", [2, 3, 2], [true, false, false]);
        b.put_to(1.5);
        a.copy_from(&b);
        a.add_from(&b);
        assert!(a.data.iter().all(|&v| v == 3.0));
    }

    #[test]
    #[should_panic]
    fn copy_mismatched_fields() {
        let mut a = Field::new("Jx", [2, 3, 2], [true, false, false]);
        let b = Field::new("Jy", [2, 3, 2], [false, true, false]);
        a.copy_from(&b);
    }

    #[test]
    fn slabs_are_disjoint_and_cover_their_bins() {
        let mut fld = Field::new("Jz", [17, 3, 3], [false, false, true]);
        let plane = fld.dim.plane_len();
        for color in 0..2 {
            let slabs = fld.bin_slabs(4, 4, 3, color);
            let bins: Vec<usize> = slabs.iter().map(|(ibin, _)| *ibin).collect();
            if color == 0 {
                assert_eq!(bins, vec![0, 2]);
                assert_eq!(slabs[0].1.dim().size_x, 8);
                // last bin runs to the end of the field
                assert_eq!(slabs[1].1.dim().size_x, 17 - 8);
            } else {
                assert_eq!(bins, vec![1]);
                assert_eq!(slabs[0].1.dim().size_x, 8);
            }
            for (_, slab) in slabs.iter() {
                assert_eq!(slab.dim().plane_len(), plane);
            }
        }
    }
}
