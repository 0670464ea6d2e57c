use crate::{Float, Sim};

pub mod field;
pub mod view;
use crate::flds::field::{Field, Pos};

/// A field value sampled at one place, e.g. the current a freshly
/// ionized electron carries.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFields {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

/// Current and charge density of a single species. Only allocated when a
/// diagnostic asks for per-species output.
pub struct SpeciesFlds {
    pub j_x: Field,
    pub j_y: Field,
    pub j_z: Field,
    pub rho: Field,
}

pub struct Flds {
    // The sources deposited by the particles, staggered as
    // Jx (d,p,p), Jy (p,d,p), Jz (p,p,d) and rho (p,p,p).
    pub j_x: Field,
    pub j_y: Field,
    pub j_z: Field,
    pub rho: Field,
    pub species: Vec<SpeciesFlds>,
}

impl SpeciesFlds {
    fn new(sim: &Sim, ispec: usize) -> SpeciesFlds {
        SpeciesFlds {
            j_x: Field::new(&format!("Jx_s{}", ispec), sim.dims_prim, [true, false, false]),
            j_y: Field::new(&format!("Jy_s{}", ispec), sim.dims_prim, [false, true, false]),
            j_z: Field::new(&format!("Jz_s{}", ispec), sim.dims_prim, [false, false, true]),
            rho: Field::new(&format!("Rho_s{}", ispec), sim.dims_prim, [false; 3]),
        }
    }
}

impl Flds {
    pub fn new(sim: &Sim) -> Flds {
        Flds {
            j_x: Field::new("Jx", sim.dims_prim, [true, false, false]),
            j_y: Field::new("Jy", sim.dims_prim, [false, true, false]),
            j_z: Field::new("Jz", sim.dims_prim, [false, false, true]),
            rho: Field::new("Rho", sim.dims_prim, [false; 3]),
            species: Vec::new(),
        }
    }

    /// Makes sure per-species buffers exist for species `0..n_species`.
    pub fn allocate_species(&mut self, sim: &Sim, n_species: usize) {
        for ispec in self.species.len()..n_species {
            self.species.push(SpeciesFlds::new(sim, ispec));
        }
    }

    /// Zero out currents and density, per-species buffers included.
    pub fn zero(&mut self) {
        for fld in &mut [&mut self.j_x, &mut self.j_y, &mut self.j_z, &mut self.rho] {
            fld.put_to(0.0);
        }
        for spec in self.species.iter_mut() {
            for fld in &mut [&mut spec.j_x, &mut spec.j_y, &mut spec.j_z, &mut spec.rho] {
                fld.put_to(0.0);
            }
        }
    }

    /// Adds every per-species buffer onto the totals.
    pub fn compute_total_rho_j(&mut self) {
        for spec in self.species.iter() {
            self.j_x.add_from(&spec.j_x);
            self.j_y.add_from(&spec.j_y);
            self.j_z.add_from(&spec.j_z);
            self.rho.add_from(&spec.rho);
        }
    }

    /// Largest violation of the discrete continuity equation
    ///
    ///   (rho_new - rho_old) / dt + div J = 0
    ///
    /// over all primal nodes. Dual index `i` of Jx sits half a cell below
    /// primal node `i`, so the divergence at a node uses the faces `i` and
    /// `i + 1`.
    pub fn continuity_residual(&self, rho_old: &Field, rho_new: &Field, sim: &Sim) -> Float {
        let [nx, ny, nz] = sim.dims_prim;
        let inv_dt = 1.0 / sim.dt;
        let [inv_dx, inv_dy, inv_dz] = sim.inv_cell_length;
        let mut residual: Float = 0.0;
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    let drho = rho_new.get(Pos { i, j, k }) - rho_old.get(Pos { i, j, k });
                    let div_j = (self.j_x.get(Pos { i: i + 1, j, k })
                        - self.j_x.get(Pos { i, j, k }))
                        * inv_dx
                        + (self.j_y.get(Pos { i, j: j + 1, k }) - self.j_y.get(Pos { i, j, k }))
                            * inv_dy
                        + (self.j_z.get(Pos { i, j, k: k + 1 }) - self.j_z.get(Pos { i, j, k }))
                            * inv_dz;
                    residual = residual.max((drho * inv_dt + div_j).abs());
                }
            }
        }
        residual
    }
}
