//! # Potential Evaluator
//!
//! Non-bonded pair forces: shifted-force Coulomb plus one non-Coulomb law per
//! run. The pair tables are resolved once at setup from [`ForceFieldParams`];
//! per-step evaluation only visits pairs, either exhaustively
//! ([`NeighborMethod::BruteForce`]) or through a periodic cell list
//! ([`NeighborMethod::CellList`]). Both strategies share one pair kernel.

mod brute_force;
mod cell_list;

use crate::core::constants::COULOMB_CONSTANT;
use crate::core::forcefield::params::{ForceFieldParams, NonCoulombLaw, PairParam};
use crate::core::forcefield::potentials::{
    Buckingham, LennardJones, Morse, PairLaw, Shifted, coulomb_shifted_force,
};
use crate::core::forcefield::term::EnergyTerm;
use crate::core::models::simulation_box::SimulationBox;
use crate::core::models::state::{FlatView, SimulationState};
use crate::engine::config::{ConfigError, NeighborMethod, PotentialConfig};
use crate::engine::device::Device;
use crate::engine::error::EngineError;
use nalgebra::Vector3;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, trace};

/// Dense `n × n` table of shifted pair laws, indexed by atom type.
#[derive(Debug, Clone)]
struct PairTable<L> {
    number_of_types: usize,
    entries: Vec<Option<Shifted<L>>>,
}

impl<L: PairLaw> PairTable<L> {
    #[inline]
    fn get(&self, a: usize, b: usize) -> Option<&Shifted<L>> {
        self.entries[a * self.number_of_types + b].as_ref()
    }
}

#[derive(Debug, Clone)]
enum LawTable {
    LennardJones(PairTable<LennardJones>),
    Buckingham(PairTable<Buckingham>),
    Morse(PairTable<Morse>),
}

/// Per-worker force and energy buffers, merged after the pair sweep.
#[derive(Debug, Clone)]
struct Accumulator {
    forces: Vec<f64>,
    shift_forces: Vec<f64>,
    energy: EnergyTerm,
}

impl Accumulator {
    fn new(number_of_atoms: usize) -> Self {
        Self {
            forces: vec![0.0; 3 * number_of_atoms],
            shift_forces: vec![0.0; 3 * number_of_atoms],
            energy: EnergyTerm::default(),
        }
    }

    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    fn merge(mut self, other: Self) -> Self {
        for (a, b) in self.forces.iter_mut().zip(&other.forces) {
            *a += b;
        }
        for (a, b) in self.shift_forces.iter_mut().zip(&other.shift_forces) {
            *a += b;
        }
        self.energy += other.energy;
        self
    }

    fn add_into(&self, view: &mut FlatView) {
        let acc = view.force_accumulators();
        for (a, b) in acc.forces.iter_mut().zip(&self.forces) {
            *a += b;
        }
        for (a, b) in acc.shift_forces.iter_mut().zip(&self.shift_forces) {
            *a += b;
        }
    }
}

/// Everything one pair evaluation reads.
struct PairKernel<'a, L> {
    table: &'a PairTable<L>,
    sim_box: &'a SimulationBox,
    positions: &'a [f64],
    charges: &'a [f64],
    atom_types: &'a [usize],
    molecule_of_atom: &'a [usize],
    exclusions: &'a HashSet<(usize, usize)>,
    include_intramolecular: bool,
    cutoff: f64,
    coulomb_scale: f64,
}

impl<L: PairLaw> PairKernel<'_, L> {
    #[inline]
    fn position(&self, atom: usize) -> Vector3<f64> {
        Vector3::new(
            self.positions[3 * atom],
            self.positions[3 * atom + 1],
            self.positions[3 * atom + 2],
        )
    }

    /// Whether an intramolecular pair takes part in the non-bonded sum.
    #[inline]
    fn intramolecular_allowed(&self, i: usize, j: usize) -> bool {
        self.include_intramolecular && !self.exclusions.contains(&(i.min(j), i.max(j)))
    }

    /// Filters same-molecule pairs, then evaluates.
    #[inline]
    fn visit(&self, i: usize, j: usize, acc: &mut Accumulator) {
        if self.molecule_of_atom[i] == self.molecule_of_atom[j] && !self.intramolecular_allowed(i, j) {
            return;
        }
        self.interact(i, j, acc);
    }

    #[inline]
    fn interact(&self, i: usize, j: usize, acc: &mut Accumulator) {
        let (image, shift) = self.sim_box.minimum_image(&(self.position(i) - self.position(j)));
        let dist_sq = image.norm_squared();
        if dist_sq >= self.cutoff * self.cutoff {
            return;
        }
        let dist = dist_sq.sqrt();

        let mut force = 0.0;
        let charge_product = self.charges[i] * self.charges[j];
        if charge_product != 0.0 {
            let (energy, f) = coulomb_shifted_force(dist, self.coulomb_scale * charge_product, self.cutoff);
            acc.energy.coulomb += energy;
            force += f;
        }
        if let Some(law) = self.table.get(self.atom_types[i], self.atom_types[j]) {
            let (energy, f) = law.evaluate(dist);
            acc.energy.non_coulomb += energy;
            force += f;
        }

        let pair_force = image * (force / dist);
        for k in 0..3 {
            acc.forces[3 * i + k] += pair_force[k];
            acc.forces[3 * j + k] -= pair_force[k];
            acc.shift_forces[3 * i + k] += pair_force[k] * shift[k];
        }
    }
}

/// Resolved non-bonded model for one simulation.
#[derive(Debug, Clone)]
pub struct Potential {
    table: LawTable,
    law: NonCoulombLaw,
    cutoff: f64,
    method: NeighborMethod,
    include_intramolecular: bool,
    coulomb_scale: f64,
    exclusions: HashSet<(usize, usize)>,
}

impl Potential {
    /// Resolves pair parameters for every atom-type pair present in `state`.
    ///
    /// `constrained_pairs` are flat atom pairs (typically constrained bonds and
    /// rigid-body pairs) that are never evaluated; molecule-type exclusions
    /// are added on top.
    pub fn new(
        params: &ForceFieldParams,
        state: &SimulationState,
        config: &PotentialConfig,
        constrained_pairs: &[(usize, usize)],
    ) -> Result<Self, ConfigError> {
        let law = params
            .non_coulomb_law()
            .map_err(|e| ConfigError::UnknownLaw(e.0))?;
        let dielectric = params.globals.dielectric_constant;
        if dielectric <= 0.0 || !dielectric.is_finite() {
            return Err(ConfigError::NotPositive {
                parameter: "dielectric_constant",
                value: dielectric,
            });
        }
        check_cutoff(config.cutoff, state.simulation_box())?;

        let count = params.number_of_types();
        let mut present = BTreeSet::new();
        for atom in state.atoms_iter() {
            if atom.atom_type >= count {
                return Err(ConfigError::UnknownAtomType {
                    index: atom.atom_type,
                    count,
                });
            }
            present.insert(atom.atom_type);
        }
        let present: Vec<usize> = present.into_iter().collect();

        let table = match law {
            NonCoulombLaw::LennardJones => {
                LawTable::LennardJones(build_table(params, &present, law, config.cutoff, |p| match *p {
                    PairParam::LennardJones { c6, c12 } => Some(LennardJones { c6, c12 }),
                    _ => None,
                })?)
            }
            NonCoulombLaw::Buckingham => {
                LawTable::Buckingham(build_table(params, &present, law, config.cutoff, |p| match *p {
                    PairParam::Buckingham { a, rho, c6 } => Some(Buckingham { a, rho, c6 }),
                    _ => None,
                })?)
            }
            NonCoulombLaw::Morse => LawTable::Morse(build_table(params, &present, law, config.cutoff, |p| {
                match *p {
                    PairParam::Morse {
                        dissociation_energy,
                        well_width,
                        equilibrium_distance,
                    } => Some(Morse {
                        dissociation_energy,
                        well_width,
                        equilibrium_distance,
                    }),
                    _ => None,
                }
            })?),
        };

        let mut exclusions: HashSet<(usize, usize)> = constrained_pairs
            .iter()
            .map(|&(i, j)| (i.min(j), i.max(j)))
            .collect();
        for (molecule, range) in state.molecules().iter().zip(state.molecule_ranges()) {
            if let Some(molecule_type) = state.molecule_type(molecule.molecule_type) {
                for &(a, b) in &molecule_type.exclusions {
                    let (i, j) = (range.start + a, range.start + b);
                    exclusions.insert((i.min(j), i.max(j)));
                }
            }
        }

        info!(
            law = %law,
            cutoff = config.cutoff,
            method = ?config.method,
            atom_types = present.len(),
            exclusions = exclusions.len(),
            "Potential initialized."
        );

        Ok(Self {
            table,
            law,
            cutoff: config.cutoff,
            method: config.method,
            include_intramolecular: config.include_intramolecular,
            coulomb_scale: COULOMB_CONSTANT / dielectric,
            exclusions,
        })
    }

    #[inline]
    pub fn law(&self) -> NonCoulombLaw {
        self.law
    }

    #[inline]
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    #[inline]
    pub fn method(&self) -> NeighborMethod {
        self.method
    }

    /// Adds pair forces and shift forces to `view` and returns the energy totals.
    ///
    /// The cutoff is re-checked against the current box because the manostat
    /// may have shrunk it since setup.
    pub fn evaluate(
        &self,
        view: &mut FlatView,
        sim_box: &SimulationBox,
        device: &Device,
    ) -> Result<EnergyTerm, EngineError> {
        check_cutoff(self.cutoff, sim_box)?;
        let energy = device.install(|| match &self.table {
            LawTable::LennardJones(table) => self.evaluate_with(table, view, sim_box),
            LawTable::Buckingham(table) => self.evaluate_with(table, view, sim_box),
            LawTable::Morse(table) => self.evaluate_with(table, view, sim_box),
        });
        trace!(
            coulomb = energy.coulomb,
            non_coulomb = energy.non_coulomb,
            "Pair energies evaluated."
        );
        Ok(energy)
    }

    fn evaluate_with<L: PairLaw>(
        &self,
        table: &PairTable<L>,
        view: &mut FlatView,
        sim_box: &SimulationBox,
    ) -> EnergyTerm {
        let acc = {
            let kernel = PairKernel {
                table,
                sim_box,
                positions: view.positions(),
                charges: view.charges(),
                atom_types: view.atom_types(),
                molecule_of_atom: view.molecule_of_atom(),
                exclusions: &self.exclusions,
                include_intramolecular: self.include_intramolecular,
                cutoff: self.cutoff,
                coulomb_scale: self.coulomb_scale,
            };
            match self.method {
                NeighborMethod::BruteForce => brute_force::sweep(&kernel, view.molecule_ranges()),
                NeighborMethod::CellList => cell_list::sweep(&kernel, view.number_of_atoms()),
            }
        };
        acc.add_into(view);
        acc.energy
    }
}

fn check_cutoff(cutoff: f64, sim_box: &SimulationBox) -> Result<(), ConfigError> {
    if cutoff <= 0.0 || !cutoff.is_finite() {
        return Err(ConfigError::NotPositive {
            parameter: "cutoff",
            value: cutoff,
        });
    }
    let max = 0.5 * sim_box.perpendicular_widths().min();
    if cutoff > max {
        return Err(ConfigError::CutoffTooLarge { cutoff, max });
    }
    Ok(())
}

fn build_table<L: PairLaw>(
    params: &ForceFieldParams,
    present: &[usize],
    law: NonCoulombLaw,
    cutoff: f64,
    convert: impl Fn(&PairParam) -> Option<L>,
) -> Result<PairTable<L>, ConfigError> {
    let n = params.number_of_types();
    let mut entries = vec![None; n * n];
    for (index, &a) in present.iter().enumerate() {
        for &b in &present[index..] {
            let type_names = || (params.atom_types[a].clone(), params.atom_types[b].clone());
            let param = params.pair(a, b).ok_or_else(|| {
                let (type_a, type_b) = type_names();
                ConfigError::MissingPairParameters { type_a, type_b }
            })?;
            let resolved = convert(param).ok_or_else(|| {
                let (type_a, type_b) = type_names();
                ConfigError::WrongLawParameters {
                    type_a,
                    type_b,
                    expected: law,
                    found: param.law(),
                }
            })?;
            let shifted = Shifted::new(resolved, cutoff);
            entries[a * n + b] = Some(shifted);
            entries[b * n + a] = Some(shifted);
            debug!(type_a = %params.atom_types[a], type_b = %params.atom_types[b], "Pair law resolved.");
        }
    }
    Ok(PairTable {
        number_of_types: n,
        entries,
    })
}
