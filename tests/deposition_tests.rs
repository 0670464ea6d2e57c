mod common;

use esirkepov_rs::flds::field::Field;
use esirkepov_rs::flds::Flds;
use esirkepov_rs::projector::{DepositMode, Projector};
use esirkepov_rs::prtls::scratch::Scratch;
use esirkepov_rs::prtls::Prtls;
use esirkepov_rs::{run, Config, Float, Sim, E_TOL};
use rand::prelude::*;

/// Random particles inside the patch, each moved by at most `reach`
/// cells along every axis. Returns the largest continuity residual
/// relative to q / dt, and the total charge before and after.
fn move_and_check(sim: &Sim, seed: u64, reach: Float) -> (Float, Float, Float) {
    let proj = Projector::new(sim).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut prtls = Prtls::new();
    for _ in 0..400 {
        let mut pos = [0.0; 3];
        for axis in 0..3 {
            // keep a cell of margin so the move stays inside the patch
            let cell: Float = rng.gen_range(1.0..(sim.n_space[axis] - 1) as Float);
            pos[axis] = (sim.patch_offset[axis] as Float + cell) * sim.cell_length[axis];
        }
        let charge = if rng.gen::<bool>() { 1 } else { -2 };
        prtls.push(pos, [0.0; 3], charge, rng.gen_range(0.5..1.5));
    }

    let mut flds = Flds::new(sim);
    let mut rho_old = Field::new("rho_old", sim.dims_prim, [false; 3]);
    let mut rho_new = Field::new("rho_new", sim.dims_prim, [false; 3]);

    let bins = prtls.sort_by_bin(sim).unwrap();
    let mut scratch = Scratch::new();
    scratch.record(&prtls, sim);
    for (ibin, range) in bins.iter().enumerate() {
        proj.frozen_batch(&mut rho_old, &prtls, range.start, range.end, ibin);
    }

    for ipart in 0..prtls.len() {
        prtls.x[ipart] += reach * rng.gen_range::<Float, _>(-1.0..1.0) * sim.cell_length[0];
        prtls.y[ipart] += reach * rng.gen_range::<Float, _>(-1.0..1.0) * sim.cell_length[1];
        prtls.z[ipart] += reach * rng.gen_range::<Float, _>(-1.0..1.0) * sim.cell_length[2];
    }
    proj.project_bins_par(&mut flds, &prtls, &scratch, &bins, DepositMode::Aggregate)
        .unwrap();

    let bins = prtls.sort_by_bin(sim).unwrap();
    for (ibin, range) in bins.iter().enumerate() {
        proj.frozen_batch(&mut rho_new, &prtls, range.start, range.end, ibin);
    }
    let residual = flds.continuity_residual(&rho_old, &rho_new, sim) * sim.dt;
    (residual, rho_old.sum_all(), rho_new.sum_all())
}

#[test]
fn stationary_particles_conserve_charge() {
    let sim = common::setup_sim();
    let (residual, before, after) = move_and_check(&sim, 1, 0.0);
    assert!(residual < 1e3 * E_TOL, "residual {}", residual);
    assert!((before - after).abs() < 1e3 * E_TOL);
}

#[test]
fn slow_particles_conserve_charge() {
    let sim = common::setup_sim();
    for seed in 0..3 {
        let (residual, before, after) = move_and_check(&sim, seed, 0.1);
        assert!(residual < 1e3 * E_TOL, "seed {}: residual {}", seed, residual);
        assert!((before - after).abs() < 1e3 * E_TOL);
    }
}

#[test]
fn fast_particles_conserve_charge() {
    let sim = common::setup_sim();
    for seed in 10..13 {
        let (residual, before, after) = move_and_check(&sim, seed, 0.99);
        assert!(residual < 1e3 * E_TOL, "seed {}: residual {}", seed, residual);
        assert!((before - after).abs() < 1e3 * E_TOL);
    }
}

#[test]
fn driver_with_per_species_diagnostics() {
    let cfg = Config::from_toml_str(
        r#"
[params]
n_dim = 3
interpolation_order = 2
cell_length = [0.5, 0.5, 0.5]
timestep = 0.25
n_space = [16, 8, 8]
patch_offset = [16, 16, 16]
clrw = 8

[setup]
t_final = 6
seed = 3

[output]
log_interval = 3
per_species = true

[[species]]
name = "ion"
charge = 1
ppc = 1
vth = 0.0
frozen = true

[[species]]
name = "electron"
charge = -1
ppc = 2
vth = 0.3
"#,
    )
    .unwrap();
    let reports = run(cfg).unwrap();
    assert_eq!(reports.len(), 3);
    for report in reports.iter() {
        assert!(report.total_charge.abs() < 1e3 * E_TOL);
        assert!(report.residual * 0.25 < 1e3 * E_TOL);
    }
}

#[test]
fn unsupported_order_stops_the_driver() {
    let cfg = Config::from_toml_str(
        r#"
[params]
n_dim = 3
interpolation_order = 4
cell_length = [1.0, 1.0, 1.0]
timestep = 0.5
n_space = [8, 8, 8]
patch_offset = [0, 0, 0]
clrw = 4

[setup]
t_final = 1

[output]
log_interval = 1
"#,
    )
    .unwrap();
    let err = run(cfg).unwrap_err();
    assert!(format!("{:?}", err).contains("order 4"));
}
