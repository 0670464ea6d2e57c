use crate::projector::DepositError;
use crate::{Float, Sim};
use itertools::izip;
use rand::prelude::*;
use rand_distr::StandardNormal;
use std::ops::Range;

pub mod scratch;

/// Macro-particles of one species, stored as separate arrays.
///
/// Positions are in the same length units as the cell lengths, momenta
/// are `gamma * v` in units of c (c = 1).
#[derive(Default)]
pub struct Prtls {
    pub x: Vec<Float>,
    pub y: Vec<Float>,
    pub z: Vec<Float>,
    pub px: Vec<Float>,
    pub py: Vec<Float>,
    pub pz: Vec<Float>,
    pub charge: Vec<i16>,
    pub weight: Vec<Float>,
}

fn permute<T: Copy>(v: &mut Vec<T>, order: &[usize]) {
    *v = order.iter().map(|&i| v[i]).collect();
}

/// Mirrors a coordinate that left `[lo, hi]` back inside and flips the
/// matching momentum.
#[inline(always)]
fn reflect(pos: &mut Float, mom: &mut Float, lo: Float, hi: Float) {
    if *pos < lo {
        *pos = 2.0 * lo - *pos;
        *mom *= -1.0;
    } else if *pos > hi {
        *pos = 2.0 * hi - *pos;
        *mom *= -1.0;
    }
}

impl Prtls {
    pub fn new() -> Prtls {
        Prtls::default()
    }

    pub fn with_capacity(n: usize) -> Prtls {
        Prtls {
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
            px: Vec::with_capacity(n),
            py: Vec::with_capacity(n),
            pz: Vec::with_capacity(n),
            charge: Vec::with_capacity(n),
            weight: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, pos: [Float; 3], mom: [Float; 3], charge: i16, weight: Float) {
        self.x.push(pos[0]);
        self.y.push(pos[1]);
        self.z.push(pos[2]);
        self.px.push(mom[0]);
        self.py.push(mom[1]);
        self.pz.push(mom[2]);
        self.charge.push(charge);
        self.weight.push(weight);
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    #[inline(always)]
    pub fn position(&self, axis: usize, ipart: usize) -> Float {
        match axis {
            0 => self.x[ipart],
            1 => self.y[ipart],
            _ => self.z[ipart],
        }
    }

    #[inline(always)]
    pub fn charge_weight(&self, ipart: usize) -> Float {
        self.charge[ipart] as Float * self.weight[ipart]
    }

    #[inline(always)]
    pub fn lorentz_factor(&self, ipart: usize) -> Float {
        let (px, py, pz) = (self.px[ipart], self.py[ipart], self.pz[ipart]);
        (1.0 + px * px + py * py + pz * pz).sqrt()
    }

    /// Fills every physical cell of the patch with `ppc` particles at
    /// random places inside the cell, with a thermal spread `vth` on each
    /// momentum component. Each particle weighs `1 / ppc`.
    pub fn load_thermal<R: Rng>(
        sim: &Sim,
        ppc: usize,
        charge: i16,
        vth: Float,
        rng: &mut R,
    ) -> Prtls {
        let [nx, ny, nz] = sim.n_space;
        let mut prtls = Prtls::with_capacity(nx * ny * nz * ppc);
        let weight = 1.0 / ppc as Float;
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    let cell = [i, j, k];
                    for _ in 0..ppc {
                        let mut pos = [0.0; 3];
                        let mut mom = [0.0; 3];
                        for axis in 0..3 {
                            let r: Float = rng.gen();
                            pos[axis] = (sim.patch_offset[axis] as Float + cell[axis] as Float + r)
                                * sim.cell_length[axis];
                            let u: Float = rng.sample(StandardNormal);
                            mom[axis] = u * vth;
                        }
                        prtls.push(pos, mom, charge, weight);
                    }
                }
            }
        }
        prtls
    }

    /// Stand-in for the pusher: moves every particle along its momentum
    /// for one timestep and reflects it off the walls of the patch.
    pub fn drift(&mut self, sim: &Sim) {
        let dt = sim.dt;
        let mut lo = [0.0; 3];
        let mut hi = [0.0; 3];
        for axis in 0..3 {
            lo[axis] = sim.patch_offset[axis] as Float * sim.cell_length[axis];
            hi[axis] = lo[axis] + sim.n_space[axis] as Float * sim.cell_length[axis];
        }
        for (x, y, z, px, py, pz) in izip!(
            &mut self.x,
            &mut self.y,
            &mut self.z,
            &mut self.px,
            &mut self.py,
            &mut self.pz
        ) {
            let c1 = dt / (1.0 + *px * *px + *py * *py + *pz * *pz).sqrt();
            *x += c1 * *px;
            *y += c1 * *py;
            *z += c1 * *pz;
            reflect(x, px, lo[0], hi[0]);
            reflect(y, py, lo[1], hi[1]);
            reflect(z, pz, lo[2], hi[2]);
        }
    }

    /// Counting sort of the particles by bin of their current position.
    /// Returns the particle range of every bin.
    pub fn sort_by_bin(&mut self, sim: &Sim) -> Result<Vec<Range<usize>>, DepositError> {
        let mut bin_of = Vec::with_capacity(self.len());
        for ipart in 0..self.len() {
            let mut local = [0i64; 3];
            for (axis, loc) in local.iter_mut().enumerate() {
                let ip = (self.position(axis, ipart) * sim.inv_cell_length[axis]).round();
                *loc = ip as i64 - sim.domain_begin[axis];
            }
            let ibin = sim
                .bin_of(local)
                .ok_or(DepositError::OutsidePatch { ipart, index: local })?;
            bin_of.push(ibin);
        }

        let mut first = vec![0usize; sim.n_bins + 1];
        for &ibin in bin_of.iter() {
            first[ibin + 1] += 1;
        }
        for ibin in 0..sim.n_bins {
            first[ibin + 1] += first[ibin];
        }
        let mut next = first.clone();
        let mut order = vec![0usize; self.len()];
        for (ipart, &ibin) in bin_of.iter().enumerate() {
            order[next[ibin]] = ipart;
            next[ibin] += 1;
        }

        permute(&mut self.x, &order);
        permute(&mut self.y, &order);
        permute(&mut self.z, &order);
        permute(&mut self.px, &order);
        permute(&mut self.py, &order);
        permute(&mut self.pz, &order);
        permute(&mut self.charge, &order);
        permute(&mut self.weight, &order);

        Ok(first.windows(2).map(|w| w[0]..w[1]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_test_sim;

    #[test]
    fn thermal_load_stays_in_patch() {
        let sim = build_test_sim();
        let mut rng = StdRng::seed_from_u64(7);
        let prtls = Prtls::load_thermal(&sim, 2, -1, 0.1, &mut rng);
        assert_eq!(prtls.len(), 2 * sim.n_space.iter().product::<usize>());
        for ipart in 0..prtls.len() {
            for axis in 0..3 {
                let cell = prtls.position(axis, ipart) * sim.inv_cell_length[axis]
                    - sim.patch_offset[axis] as Float;
                assert!(cell >= 0.0 && cell < sim.n_space[axis] as Float);
            }
            assert_eq!(prtls.charge_weight(ipart), -0.5);
            assert!(prtls.lorentz_factor(ipart) >= 1.0);
        }
    }

    #[test]
    fn sort_groups_bins() {
        let sim = build_test_sim();
        let mut rng = StdRng::seed_from_u64(11);
        let mut prtls = Prtls::load_thermal(&sim, 3, 1, 0.2, &mut rng);
        let n = prtls.len();
        let total_x: Float = prtls.x.iter().sum();
        let bins = prtls.sort_by_bin(&sim).unwrap();
        assert_eq!(bins.len(), sim.n_bins);
        assert_eq!(bins.first().unwrap().start, 0);
        assert_eq!(bins.last().unwrap().end, n);
        assert!((prtls.x.iter().sum::<Float>() - total_x).abs() < 1e-3);
        for (ibin, range) in bins.iter().enumerate() {
            for ipart in range.clone() {
                let ip = (prtls.x[ipart] * sim.inv_cell_length[0]).round() as i64;
                let local = ip - sim.domain_begin[0];
                let rel = (local - sim.oversize as i64) as usize;
                assert_eq!((rel / sim.clrw).min(sim.n_bins - 1), ibin);
            }
        }
    }

    #[test]
    fn sort_rejects_strays() {
        let sim = build_test_sim();
        let mut prtls = Prtls::new();
        let far = (sim.patch_offset[0] as Float - 3.0) * sim.cell_length[0];
        prtls.push([far, 0.5, 2.0], [0.0; 3], 1, 1.0);
        assert!(matches!(
            prtls.sort_by_bin(&sim),
            Err(DepositError::OutsidePatch { ipart: 0, .. })
        ));
    }

    #[test]
    fn drift_reflects_and_moves_less_than_a_cell() {
        let sim = build_test_sim();
        let mut rng = StdRng::seed_from_u64(3);
        let mut prtls = Prtls::load_thermal(&sim, 1, 1, 5.0, &mut rng);
        let before = prtls.x.clone();
        for _ in 0..20 {
            prtls.drift(&sim);
        }
        prtls.sort_by_bin(&sim).unwrap();
        let mut once = Prtls::load_thermal(&sim, 1, 1, 5.0, &mut StdRng::seed_from_u64(3));
        once.drift(&sim);
        for (a, b) in before.iter().zip(once.x.iter()) {
            assert!((a - b).abs() < sim.cell_length[0]);
        }
    }
}
