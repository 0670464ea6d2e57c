use esirkepov_rs::{Config, Output, Params, Setup, Sim};

pub fn setup_sim() -> Sim {
    // A small patch that can be used in testing. Four bins of four
    // cells along x, away from the global origin on every axis.
    let cfg = Config {
        output: Output {
            log_interval: 1,
            per_species: false,
        },
        setup: Setup {
            t_final: 10,
            seed: 0,
        },
        params: Params {
            n_dim: 3,
            interpolation_order: 2,
            cell_length: [0.4, 0.5, 0.6],
            timestep: 0.15,
            n_space: [16, 8, 6],
            patch_offset: [48, 8, 30],
            oversize: 2,
            clrw: 4,
        },
        species: Vec::new(),
    };
    Sim::new(&cfg).unwrap()
}
