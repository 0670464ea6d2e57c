use rand::prelude::*;
use serde::Deserialize;
use std::fs;

use anyhow::{Context, Result};
use tracing::info;

pub mod flds;
pub mod projector;
pub mod prtls;

use flds::field::Field;
use flds::Flds;
use projector::{DepositMode, Projector};
use prtls::scratch::Scratch;
use prtls::Prtls;

// We use a type alias for f64/Float to easily support
// double and single precision.
#[cfg(feature = "dprec")]
pub type Float = f64;

#[cfg(not(feature = "dprec"))]
pub type Float = f32;

/// Tolerance for conservation checks at the working precision.
#[cfg(feature = "dprec")]
pub const E_TOL: Float = 1e-12;

#[cfg(not(feature = "dprec"))]
pub const E_TOL: Float = 1e-5;

#[derive(Deserialize)]
pub struct Config {
    pub params: Params,
    pub setup: Setup,
    pub output: Output,
    #[serde(default)]
    pub species: Vec<SpeciesCfg>,
}

#[derive(Deserialize)]
pub struct Setup {
    pub t_final: u32,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Deserialize)]
pub struct Output {
    /// Steps between two diagnostic steps. 0 turns them off.
    pub log_interval: u32,
    /// Deposit every species into its own buffers on diagnostic steps.
    #[serde(default)]
    pub per_species: bool,
}

fn default_oversize() -> usize {
    2
}

#[derive(Deserialize)]
pub struct Params {
    pub n_dim: usize,
    pub interpolation_order: usize,
    pub cell_length: [Float; 3],
    pub timestep: Float,
    /// Physical cells of the patch along each axis.
    pub n_space: [usize; 3],
    /// Global index of the first physical node of the patch.
    pub patch_offset: [i64; 3],
    /// Ghost cells on each side of the patch.
    #[serde(default = "default_oversize")]
    pub oversize: usize,
    /// Cells per bin along x.
    pub clrw: usize,
}

#[derive(Deserialize)]
pub struct SpeciesCfg {
    pub name: String,
    pub charge: i16,
    /// Particles per cell.
    pub ppc: usize,
    pub vth: Float,
    /// Frozen species only contribute their charge density.
    #[serde(default)]
    pub frozen: bool,
}

impl Config {
    pub fn new() -> Result<Config> {
        let contents =
            fs::read_to_string("config.toml").context("Could not open the config.toml file")?;
        Config::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Config> {
        toml::from_str(contents).with_context(|| "Could not parse Config file")
    }
}

/// Geometry and timing of one patch, fixed for the whole run.
pub struct Sim {
    pub t_final: u32,
    pub n_dim: usize,
    pub interpolation_order: usize,
    pub cell_length: [Float; 3],
    pub inv_cell_length: [Float; 3],
    pub dt: Float,
    pub n_space: [usize; 3],
    pub patch_offset: [i64; 3],
    pub oversize: usize,
    pub clrw: usize,
    pub n_bins: usize,
    /// Global index of the first slot of the patch arrays, ghosts included.
    pub domain_begin: [i64; 3],
    /// Primal extents of the patch arrays, ghosts included.
    pub dims_prim: [usize; 3],
}

impl Sim {
    pub fn new(cfg: &Config) -> Result<Sim> {
        let params = &cfg.params;
        if params.clrw == 0 || params.n_space[0] % params.clrw != 0 {
            return Err(anyhow::Error::msg(format!(
                "Number of cells in x direction ({}) must be a multiple of clrw ({})",
                params.n_space[0], params.clrw
            )));
        }
        if params.n_space.iter().any(|&n| n == 0) {
            return Err(anyhow::Error::msg("The patch needs at least one cell per axis"));
        }
        if params.cell_length.iter().any(|&dx| dx <= 0.0) || params.timestep <= 0.0 {
            return Err(anyhow::Error::msg(
                "Cell lengths and timestep must be positive",
            ));
        }
        if params.oversize < 2 {
            return Err(anyhow::Error::msg(
                "A quadratic shape needs at least 2 ghost cells",
            ));
        }
        // particles must not cross more than one cell per step
        let cfl: Float = params
            .cell_length
            .iter()
            .map(|dx| 1.0 / (dx * dx))
            .sum::<Float>()
            .sqrt()
            .recip();
        if params.timestep >= cfl {
            return Err(anyhow::Error::msg(format!(
                "Timestep {} violates the CFL condition dt < {}",
                params.timestep, cfl
            )));
        }

        let mut inv_cell_length = [0.0; 3];
        let mut domain_begin = [0; 3];
        let mut dims_prim = [0; 3];
        for axis in 0..3 {
            inv_cell_length[axis] = 1.0 / params.cell_length[axis];
            domain_begin[axis] = params.patch_offset[axis] - params.oversize as i64;
            dims_prim[axis] = params.n_space[axis] + 1 + 2 * params.oversize;
        }
        Ok(Sim {
            t_final: cfg.setup.t_final,
            n_dim: params.n_dim,
            interpolation_order: params.interpolation_order,
            cell_length: params.cell_length,
            inv_cell_length,
            dt: params.timestep,
            n_space: params.n_space,
            patch_offset: params.patch_offset,
            oversize: params.oversize,
            clrw: params.clrw,
            n_bins: params.n_space[0] / params.clrw,
            domain_begin,
            dims_prim,
        })
    }

    /// Bin of a particle whose nearest node is `local` (patch-local
    /// slots), or `None` when that node is not a physical node of the
    /// patch. The node on the upper face belongs to the last bin.
    pub fn bin_of(&self, local: [i64; 3]) -> Option<usize> {
        for (axis, &index) in local.iter().enumerate() {
            let rel = index - self.oversize as i64;
            if rel < 0 || rel > self.n_space[axis] as i64 {
                return None;
            }
        }
        let rel_x = (local[0] - self.oversize as i64) as usize;
        Some((rel_x / self.clrw).min(self.n_bins - 1))
    }
}

/// What a diagnostic step saw.
#[derive(Debug, Clone, Copy)]
pub struct StepReport {
    pub t: u32,
    /// Charge on the grid, frozen species included.
    pub total_charge: Float,
    /// Largest violation of the continuity equation over the patch.
    pub residual: Float,
}

/// Charge of every particle in `prtls`, which must be sorted into `bins`.
fn deposit_density(
    projector: &Projector,
    rho: &mut Field,
    prtls: &Prtls,
    bins: &[std::ops::Range<usize>],
) {
    for (ibin, range) in bins.iter().enumerate() {
        projector.frozen_batch(rho, prtls, range.start, range.end, ibin);
    }
}

pub fn run(cfg: Config) -> Result<Vec<StepReport>> {
    let sim = Sim::new(&cfg)?;
    let projector = Projector::new(&sim).context("Could not set up the projector")?;
    let mut rng = StdRng::seed_from_u64(cfg.setup.seed);

    info!(n_species = cfg.species.len(), "initializing prtls");
    let mut species: Vec<Prtls> = cfg
        .species
        .iter()
        .map(|spec| Prtls::load_thermal(&sim, spec.ppc, spec.charge, spec.vth, &mut rng))
        .collect();

    let mut flds = Flds::new(&sim);
    if cfg.output.per_species {
        flds.allocate_species(&sim, species.len());
    }
    let mut scratch = Scratch::with_capacity(species.iter().map(|p| p.len()).max().unwrap_or(0));
    let mut rho_old = Field::new("Rho_old", sim.dims_prim, [false; 3]);
    let mut rho_new = Field::new("Rho_new", sim.dims_prim, [false; 3]);
    let mut reports = Vec::new();

    for t in 0..=sim.t_final {
        let diag = cfg.output.log_interval > 0 && t % cfg.output.log_interval == 0;
        flds.zero();
        rho_old.put_to(0.0);
        rho_new.put_to(0.0);

        for (ispec, (spec, prtls)) in cfg.species.iter().zip(species.iter_mut()).enumerate() {
            let bins = prtls
                .sort_by_bin(&sim)
                .with_context(|| format!("Could not sort species {}", spec.name))?;
            if spec.frozen {
                deposit_density(&projector, &mut flds.rho, prtls, &bins);
                continue;
            }

            scratch.record(prtls, &sim);
            deposit_density(&projector, &mut rho_old, prtls, &bins);
            prtls.drift(&sim);

            let mode = if diag && cfg.output.per_species {
                DepositMode::PerSpecies(ispec)
            } else {
                DepositMode::Aggregate
            };
            projector
                .project_bins_par(&mut flds, prtls, &scratch, &bins, mode)
                .with_context(|| format!("Could not deposit species {}", spec.name))?;

            // the frozen path centres on the new node, so it needs the new bins
            let bins = prtls
                .sort_by_bin(&sim)
                .with_context(|| format!("Could not sort species {}", spec.name))?;
            deposit_density(&projector, &mut rho_new, prtls, &bins);
        }

        if diag {
            flds.compute_total_rho_j();
            if !cfg.output.per_species {
                flds.rho.add_from(&rho_new);
            }
            let report = StepReport {
                t,
                total_charge: flds.rho.sum_all(),
                residual: flds.continuity_residual(&rho_old, &rho_new, &sim),
            };
            info!(
                t,
                total_charge = report.total_charge,
                residual = report.residual,
                "deposited"
            );
            reports.push(report);
        }
    }
    Ok(reports)
}

#[cfg(test)]
pub(crate) fn build_test_sim() -> Sim {
    // A small patch, three bins wide, shifted away from the origin on
    // two axes.
    let cfg = Config {
        params: Params {
            n_dim: 3,
            interpolation_order: 2,
            cell_length: [0.5, 0.4, 0.3],
            timestep: 0.1,
            n_space: [12, 6, 6],
            patch_offset: [16, 0, 6],
            oversize: 2,
            clrw: 4,
        },
        setup: Setup {
            t_final: 10,
            seed: 0,
        },
        output: Output {
            log_interval: 1,
            per_species: false,
        },
        species: Vec::new(),
    };
    Sim::new(&cfg).unwrap()
}
