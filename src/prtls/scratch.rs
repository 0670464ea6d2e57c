use crate::prtls::Prtls;
use crate::{Float, Sim};
use itertools::izip;

/// What the interpolator remembers about one particle from the previous
/// substep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct History {
    /// Nearest primal node, relative to the first slot of the patch.
    pub iold: [i32; 3],
    /// Offset from that node, in cells, within [-0.5, 0.5).
    pub deltaold: [Float; 3],
    /// Lorentz factor.
    pub gf: Float,
}

/// Per-worker history buffers, indexed by absolute particle index.
///
/// Grown once to the size of the largest species the worker handles and
/// reused from then on. Only read during deposition.
#[derive(Default)]
pub struct Scratch {
    pub iold: Vec<i32>,
    pub deltaold: Vec<Float>,
    pub gf: Vec<Float>,
}

impl Scratch {
    pub fn new() -> Scratch {
        Scratch::default()
    }

    pub fn with_capacity(n: usize) -> Scratch {
        let mut scratch = Scratch::new();
        scratch.reserve(n);
        scratch
    }

    /// Makes room for `n` particles. Never shrinks.
    pub fn reserve(&mut self, n: usize) {
        if self.gf.len() < n {
            self.iold.resize(3 * n, 0);
            self.deltaold.resize(3 * n, 0.0);
            self.gf.resize(n, 1.0);
        }
    }

    pub fn len(&self) -> usize {
        self.gf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gf.is_empty()
    }

    #[inline(always)]
    pub fn history(&self, ipart: usize) -> History {
        let i = 3 * ipart;
        History {
            iold: [self.iold[i], self.iold[i + 1], self.iold[i + 2]],
            deltaold: [self.deltaold[i], self.deltaold[i + 1], self.deltaold[i + 2]],
            gf: self.gf[ipart],
        }
    }

    pub fn set(&mut self, ipart: usize, hist: &History) {
        let i = 3 * ipart;
        self.iold[i..i + 3].copy_from_slice(&hist.iold);
        self.deltaold[i..i + 3].copy_from_slice(&hist.deltaold);
        self.gf[ipart] = hist.gf;
    }

    /// Records the current position of every particle the way the
    /// interpolator does before the push.
    pub fn record(&mut self, prtls: &Prtls, sim: &Sim) {
        self.reserve(prtls.len());
        for (ipart, (iold, deltaold, gf)) in izip!(
            self.iold.chunks_exact_mut(3),
            self.deltaold.chunks_exact_mut(3),
            self.gf.iter_mut()
        )
        .take(prtls.len())
        .enumerate()
        {
            for axis in 0..3 {
                let xpn = prtls.position(axis, ipart) * sim.inv_cell_length[axis];
                let ip = xpn.round();
                iold[axis] = (ip as i64 - sim.domain_begin[axis]) as i32;
                deltaold[axis] = xpn - ip;
            }
            *gf = prtls.lorentz_factor(ipart);
        }
    }
}
