use crate::flds::field::Field;
use crate::flds::view::GridView;
use crate::flds::LocalFields;
use crate::projector::shape::{stencil, Block, Stencil, STENCIL};
use crate::projector::DepositError;
use crate::prtls::scratch::History;
use crate::prtls::Prtls;
use crate::{Float, Sim};
use tracing::error;

const ONE_THIRD: Float = 1.0 / 3.0;

const EMPTY: Block = [[[0.0; STENCIL]; STENCIL]; STENCIL];

/// Shape factors of one particle before and after its move, all in the
/// window centred on the old node.
struct Shapes {
    s0: [Stencil; 3],
    s1: [Stencil; 3],
    ds: [Stencil; 3],
}

/// Esirkepov projector with quadratic shape functions in 3D.
pub struct Projector3D2Order {
    pub inv_cell_length: [Float; 3],
    /// dx / dt along each axis.
    pub cell_length_over_dt: [Float; 3],
    pub domain_begin: [i64; 3],
    pub clrw: usize,
    pub n_bins: usize,
    /// Planes a bin reaches past its own `clrw`.
    pub halo: usize,
}

/// Esirkepov weights for the current along `axis`.
///
/// With `a` the index along `axis` and `b`, `c` the next two in cyclic
/// order:
///
///   W[a][b][c] = DS_a (S0_b S0_c + DS_b S0_c / 2 + S0_b DS_c / 2 + DS_b DS_c / 3)
fn weights(sh: &Shapes, axis: usize) -> Block {
    let (ax_b, ax_c) = ((axis + 1) % 3, (axis + 2) % 3);
    let mut w = EMPTY;
    for i in 0..STENCIL {
        for j in 0..STENCIL {
            for k in 0..STENCIL {
                let n = [i, j, k];
                let (a, b, c) = (n[axis], n[ax_b], n[ax_c]);
                let (s0b, s0c) = (sh.s0[ax_b][b], sh.s0[ax_c][c]);
                let (dsb, dsc) = (sh.ds[ax_b][b], sh.ds[ax_c][c]);
                w[i][j][k] = sh.ds[axis][a]
                    * (s0b * s0c + 0.5 * dsb * s0c + 0.5 * s0b * dsc + ONE_THIRD * dsb * dsc);
            }
        }
    }
    w
}

/// Running sum of `-cr * W` along `axis`. Slot 0 stays empty; the sum
/// past the last slot vanishes because both shapes are normalized.
fn accumulate(w: &Block, cr: Float, axis: usize) -> Block {
    let mut cur = EMPTY;
    // lexicographic order visits the lower neighbour along any axis first
    for i in 0..STENCIL {
        for j in 0..STENCIL {
            for k in 0..STENCIL {
                let mut prev = [i, j, k];
                if prev[axis] == 0 {
                    continue;
                }
                prev[axis] -= 1;
                let [pi, pj, pk] = prev;
                cur[i][j][k] = cur[pi][pj][pk] - cr * w[pi][pj][pk];
            }
        }
    }
    cur
}

#[inline(always)]
fn outer(cw: Float, s: &[Stencil; 3]) -> Block {
    let mut out = EMPTY;
    for (i, plane) in out.iter_mut().enumerate() {
        for (j, row) in plane.iter_mut().enumerate() {
            for (k, v) in row.iter_mut().enumerate() {
                *v = cw * s[0][i] * s[1][j] * s[2][k];
            }
        }
    }
    out
}

impl Projector3D2Order {
    pub fn new(sim: &Sim) -> Projector3D2Order {
        let mut cell_length_over_dt = [0.0; 3];
        for (c, dx) in cell_length_over_dt.iter_mut().zip(sim.cell_length.iter()) {
            *c = dx / sim.dt;
        }
        Projector3D2Order {
            inv_cell_length: sim.inv_cell_length,
            cell_length_over_dt,
            domain_begin: sim.domain_begin,
            clrw: sim.clrw,
            n_bins: sim.n_bins,
            halo: sim.oversize + 2,
        }
    }

    /// Nearest node in patch-local slots, and the offset from it.
    #[inline(always)]
    fn locate(&self, prtls: &Prtls, ipart: usize, axis: usize) -> (i64, Float) {
        let xpn = prtls.position(axis, ipart) * self.inv_cell_length[axis];
        let ip = xpn.round();
        (ip as i64 - self.domain_begin[axis], xpn - ip)
    }

    fn shapes(&self, prtls: &Prtls, ipart: usize, hist: &History) -> Shapes {
        let mut sh = Shapes {
            s0: [[0.0; STENCIL]; 3],
            s1: [[0.0; STENCIL]; 3],
            ds: [[0.0; STENCIL]; 3],
        };
        for axis in 0..3 {
            let (ip, delta) = self.locate(prtls, ipart, axis);
            sh.s0[axis] = stencil(hist.deltaold[axis], 0);
            sh.s1[axis] = stencil(delta, ip - hist.iold[axis] as i64);
            for i in 0..STENCIL {
                sh.ds[axis][i] = sh.s1[axis][i] - sh.s0[axis][i];
            }
        }
        sh
    }

    /// Corner of the window in a view that starts at x-plane `bin`.
    #[inline(always)]
    fn window(hist: &History, bin: usize) -> [i64; 3] {
        [
            hist.iold[0] as i64 - bin as i64 - 2,
            hist.iold[1] as i64 - 2,
            hist.iold[2] as i64 - 2,
        ]
    }

    fn current_blocks(&self, sh: &Shapes, cw: Float) -> [Block; 3] {
        let mut blocks = [EMPTY; 3];
        for (axis, block) in blocks.iter_mut().enumerate() {
            let cr = cw * self.cell_length_over_dt[axis];
            *block = accumulate(&weights(sh, axis), cr, axis);
        }
        blocks
    }

    /// Deposits the current particle `ipart` carried from the node stored in
    /// `hist` to where it sits now. The views start at x-plane `bin`.
    #[inline(always)]
    pub fn currents(
        &self,
        j_x: &mut GridView,
        j_y: &mut GridView,
        j_z: &mut GridView,
        prtls: &Prtls,
        ipart: usize,
        bin: usize,
        hist: &History,
    ) {
        let sh = self.shapes(prtls, ipart, hist);
        let [bx, by, bz] = self.current_blocks(&sh, prtls.charge_weight(ipart));
        let origin = Self::window(hist, bin);
        j_x.deposit(origin, &bx);
        j_y.deposit(origin, &by);
        j_z.deposit(origin, &bz);
    }

    /// Like `currents`, and adds the charge at the new position to `rho`.
    #[inline(always)]
    pub fn currents_and_density(
        &self,
        j_x: &mut GridView,
        j_y: &mut GridView,
        j_z: &mut GridView,
        rho: &mut GridView,
        prtls: &Prtls,
        ipart: usize,
        bin: usize,
        hist: &History,
    ) {
        let sh = self.shapes(prtls, ipart, hist);
        let cw = prtls.charge_weight(ipart);
        let [bx, by, bz] = self.current_blocks(&sh, cw);
        let origin = Self::window(hist, bin);
        j_x.deposit(origin, &bx);
        j_y.deposit(origin, &by);
        j_z.deposit(origin, &bz);
        rho.deposit(origin, &outer(cw, &sh.s1));
    }

    /// Charge of a particle that does not move, centred on its own nearest
    /// node.
    #[inline(always)]
    pub fn density(&self, rho: &mut GridView, prtls: &Prtls, ipart: usize, bin: usize) {
        let mut s1 = [[0.0; STENCIL]; 3];
        let mut origin = [0i64; 3];
        for axis in 0..3 {
            let (ip, delta) = self.locate(prtls, ipart, axis);
            s1[axis] = stencil(delta, 0);
            origin[axis] = ip - 2;
        }
        origin[0] -= bin as i64;
        rho.deposit(origin, &outer(prtls.charge_weight(ipart), &s1));
    }

    pub fn ionization_currents(
        &self,
        _j_x: &mut Field,
        _j_y: &mut Field,
        _j_z: &mut Field,
        _prtls: &Prtls,
        ipart: usize,
        _jion: LocalFields,
    ) -> Result<(), DepositError> {
        error!(ipart, "ionization currents requested from the 3D order 2 projector");
        Err(DepositError::Unsupported {
            operation: "ionization current",
            dim: 3,
            order: 2,
        })
    }
}
