use crate::flds::field::Field;
use crate::flds::Flds;
use crate::projector::{DepositError, DepositMode, Projector};
use crate::prtls::scratch::Scratch;
use crate::prtls::Prtls;
use itertools::izip;
use rayon::prelude::*;
use std::ops::Range;
use tracing::debug;

/// The buffers one deposition mode writes to.
struct Targets<'a> {
    j_x: &'a mut Field,
    j_y: &'a mut Field,
    j_z: &'a mut Field,
    rho: Option<&'a mut Field>,
}

impl Projector {
    /// (clrw, n_bins, halo) of the patch this projector was set up for.
    fn binning(&self) -> (usize, usize, usize) {
        match self {
            Projector::ThreeDOrder2(p) => (p.clrw, p.n_bins, p.halo),
        }
    }

    fn targets(flds: &mut Flds, mode: DepositMode) -> Result<Targets<'_>, DepositError> {
        match mode {
            DepositMode::Aggregate => Ok(Targets {
                j_x: &mut flds.j_x,
                j_y: &mut flds.j_y,
                j_z: &mut flds.j_z,
                rho: None,
            }),
            DepositMode::PerSpecies(ispec) => {
                let allocated = flds.species.len();
                let spec = flds
                    .species
                    .get_mut(ispec)
                    .ok_or(DepositError::MissingSpeciesFields { ispec, allocated })?;
                Ok(Targets {
                    j_x: &mut spec.j_x,
                    j_y: &mut spec.j_y,
                    j_z: &mut spec.j_z,
                    rho: Some(&mut spec.rho),
                })
            }
        }
    }

    /// Deposits particles `istart..iend`, all sorted into bin `ibin`, on a
    /// single thread.
    pub fn run_batch(
        &self,
        flds: &mut Flds,
        prtls: &Prtls,
        scratch: &Scratch,
        istart: usize,
        iend: usize,
        ibin: usize,
        mode: DepositMode,
    ) -> Result<(), DepositError> {
        let (clrw, _, _) = self.binning();
        let bin = ibin * clrw;
        let out = Self::targets(flds, mode)?;
        let mut j_x = out.j_x.view_from(bin);
        let mut j_y = out.j_y.view_from(bin);
        let mut j_z = out.j_z.view_from(bin);
        match out.rho {
            Some(rho) => {
                let mut rho = rho.view_from(bin);
                for ipart in istart..iend {
                    let hist = scratch.history(ipart);
                    self.currents_and_density(
                        &mut j_x, &mut j_y, &mut j_z, &mut rho, prtls, ipart, bin, &hist,
                    );
                }
            }
            None => {
                for ipart in istart..iend {
                    let hist = scratch.history(ipart);
                    self.currents(&mut j_x, &mut j_y, &mut j_z, prtls, ipart, bin, &hist);
                }
            }
        }
        Ok(())
    }

    /// Charge of particles `istart..iend` in bin `ibin`, without any motion.
    pub fn frozen_batch(
        &self,
        rho: &mut Field,
        prtls: &Prtls,
        istart: usize,
        iend: usize,
        ibin: usize,
    ) {
        let (clrw, _, _) = self.binning();
        let bin = ibin * clrw;
        let mut rho = rho.view_from(bin);
        for ipart in istart..iend {
            self.density(&mut rho, prtls, ipart, bin);
        }
    }

    /// Deposits every bin of a species on the rayon pool.
    ///
    /// Bins are processed in two colours, even bins first. Within a colour
    /// every bin gets its own disjoint slab of each buffer, so no two
    /// threads ever touch the same value.
    pub fn project_bins_par(
        &self,
        flds: &mut Flds,
        prtls: &Prtls,
        scratch: &Scratch,
        bins: &[Range<usize>],
        mode: DepositMode,
    ) -> Result<(), DepositError> {
        let (clrw, n_bins, halo) = self.binning();
        if clrw < halo {
            return Err(DepositError::BinTooNarrow { clrw, min: halo });
        }
        if bins.len() != n_bins {
            return Err(DepositError::BinCount {
                expected: n_bins,
                got: bins.len(),
            });
        }
        let Targets {
            j_x,
            j_y,
            j_z,
            mut rho,
        } = Self::targets(flds, mode)?;
        debug!(
            n_prtls = prtls.len(),
            n_bins,
            ?mode,
            "depositing currents"
        );

        for color in 0..2 {
            let slabs_x = j_x.bin_slabs(clrw, halo, n_bins, color);
            let slabs_y = j_y.bin_slabs(clrw, halo, n_bins, color);
            let slabs_z = j_z.bin_slabs(clrw, halo, n_bins, color);
            match rho.as_mut() {
                Some(rho) => {
                    let slabs_rho = rho.bin_slabs(clrw, halo, n_bins, color);
                    izip!(slabs_x, slabs_y, slabs_z, slabs_rho)
                        .collect::<Vec<_>>()
                        .into_par_iter()
                        .for_each(|((ibin, mut j_x), (_, mut j_y), (_, mut j_z), (_, mut rho))| {
                            let bin = ibin * clrw;
                            for ipart in bins[ibin].clone() {
                                let hist = scratch.history(ipart);
                                self.currents_and_density(
                                    &mut j_x, &mut j_y, &mut j_z, &mut rho, prtls, ipart, bin,
                                    &hist,
                                );
                            }
                        });
                }
                None => {
                    izip!(slabs_x, slabs_y, slabs_z)
                        .collect::<Vec<_>>()
                        .into_par_iter()
                        .for_each(|((ibin, mut j_x), (_, mut j_y), (_, mut j_z))| {
                            let bin = ibin * clrw;
                            for ipart in bins[ibin].clone() {
                                let hist = scratch.history(ipart);
                                self.currents(
                                    &mut j_x, &mut j_y, &mut j_z, prtls, ipart, bin, &hist,
                                );
                            }
                        });
                }
            }
        }
        Ok(())
    }
}
