//! Charge conserving deposition of particle currents and densities onto
//! the grid.

use crate::flds::field::Field;
use crate::flds::view::GridView;
use crate::flds::LocalFields;
use crate::prtls::scratch::History;
use crate::prtls::Prtls;
use crate::Sim;
use thiserror::Error;
use tracing::debug;

pub mod dispatch;
pub mod esirkepov;
pub mod shape;

pub use esirkepov::Projector3D2Order;

#[derive(Debug, Error)]
pub enum DepositError {
    #[error("{operation} is not defined for {dim}D order {order} projection")]
    Unsupported {
        operation: &'static str,
        dim: usize,
        order: usize,
    },

    #[error("no per-species buffers for species {ispec} ({allocated} allocated)")]
    MissingSpeciesFields { ispec: usize, allocated: usize },

    #[error("bins of width {clrw} overlap, parallel deposition needs at least {min}")]
    BinTooNarrow { clrw: usize, min: usize },

    #[error("expected {expected} bins, got {got}")]
    BinCount { expected: usize, got: usize },

    #[error("particle {ipart} at local node {index:?} is outside the patch")]
    OutsidePatch { ipart: usize, index: [i64; 3] },
}

/// Where a batch of currents goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DepositMode {
    /// Currents of every species summed into the patch totals.
    Aggregate,
    /// Currents and density of one species into its own buffers, for
    /// diagnostics.
    PerSpecies(usize),
}

/// Projector for one (dimension, order) pair, chosen once at setup.
pub enum Projector {
    ThreeDOrder2(Projector3D2Order),
}

impl Projector {
    pub fn new(sim: &Sim) -> Result<Projector, DepositError> {
        match (sim.n_dim, sim.interpolation_order) {
            (3, 2) => {
                debug!(
                    cell_length = ?sim.cell_length,
                    dt = sim.dt,
                    clrw = sim.clrw,
                    "using 3D order 2 Esirkepov projector"
                );
                Ok(Projector::ThreeDOrder2(Projector3D2Order::new(sim)))
            }
            (dim, order) => Err(DepositError::Unsupported {
                operation: "current projection",
                dim,
                order,
            }),
        }
    }

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
        match self {
            Projector::ThreeDOrder2(p) => p.currents(j_x, j_y, j_z, prtls, ipart, bin, hist),
        }
    }

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
        match self {
            Projector::ThreeDOrder2(p) => {
                p.currents_and_density(j_x, j_y, j_z, rho, prtls, ipart, bin, hist)
            }
        }
    }

    #[inline(always)]
    pub fn density(&self, rho: &mut GridView, prtls: &Prtls, ipart: usize, bin: usize) {
        match self {
            Projector::ThreeDOrder2(p) => p.density(rho, prtls, ipart, bin),
        }
    }

    pub fn ionization_currents(
        &self,
        j_x: &mut Field,
        j_y: &mut Field,
        j_z: &mut Field,
        prtls: &Prtls,
        ipart: usize,
        jion: LocalFields,
    ) -> Result<(), DepositError> {
        match self {
            Projector::ThreeDOrder2(p) => p.ionization_currents(j_x, j_y, j_z, prtls, ipart, jion),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_test_sim;

    #[test]
    fn only_3d_order_2_exists() {
        let mut sim = build_test_sim();
        assert!(matches!(
            Projector::new(&sim),
            Ok(Projector::ThreeDOrder2(_))
        ));
        sim.interpolation_order = 4;
        match Projector::new(&sim) {
            Err(DepositError::Unsupported { dim, order, .. }) => {
                assert_eq!(dim, 3);
                assert_eq!(order, 4);
            }
            _ => panic!("order 4 should be unsupported"),
        }
        sim.interpolation_order = 2;
        sim.n_dim = 2;
        assert!(Projector::new(&sim).is_err());
    }

    #[test]
    fn error_messages() {
        let err = DepositError::MissingSpeciesFields {
            ispec: 3,
            allocated: 1,
        };
        assert_eq!(
            err.to_string(),
            "no per-species buffers for species 3 (1 allocated)"
        );
        let err = DepositError::Unsupported {
            operation: "ionization current",
            dim: 3,
            order: 2,
        };
        assert_eq!(
            err.to_string(),
            "ionization current is not defined for 3D order 2 projection"
        );
    }
}
