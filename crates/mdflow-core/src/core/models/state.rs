use super::atom::Atom;
use super::ids::AtomId;
use super::molecule::{Molecule, MoleculeType};
use super::simulation_box::SimulationBox;
use nalgebra::Vector3;
use slotmap::SlotMap;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    #[error("Invalid simulation box: {0}")]
    InvalidBox(String),
    #[error("Molecule {molecule} references unknown molecule type {molecule_type}")]
    UnknownMoleculeType { molecule: usize, molecule_type: usize },
    #[error(
        "Atoms of molecule {molecule} do not match molecule type '{type_name}': expected {expected:?}, found {found:?}"
    )]
    AtomNameMismatch {
        molecule: usize,
        type_name: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("Atom {atom} of molecule {molecule} has invalid mass {mass}")]
    InvalidMass {
        molecule: usize,
        atom: usize,
        mass: f64,
    },
    #[error("Molecule {0} contains no atoms")]
    EmptyMolecule(usize),
    #[error("The simulation state contains no molecules")]
    Empty,
}

/// Owns every atom and molecule of the simulation together with the periodic box.
///
/// The object view (atoms in a slot map, molecules referencing them by id) is
/// used for setup and for external consumers. Kernels work on a [`FlatView`],
/// which only exists inside [`SimulationState::with_flattened`]: the state is
/// flattened on entry and de-flattened on exit, so the two views are never
/// writable at the same time.
#[derive(Debug, Clone)]
pub struct SimulationState {
    atoms: SlotMap<AtomId, Atom>,
    molecules: Vec<Molecule>,
    molecule_types: Vec<MoleculeType>,
    sim_box: SimulationBox,
    constrained_degrees_of_freedom: usize,
}

impl SimulationState {
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Iterates atoms in flat order (molecule by molecule, atoms in molecule order).
    pub fn atoms_iter(&self) -> impl Iterator<Item = &Atom> {
        self.molecules
            .iter()
            .flat_map(|m| m.atoms().iter())
            .filter_map(|id| self.atoms.get(*id))
    }

    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    pub fn molecule(&self, index: usize) -> Option<&Molecule> {
        self.molecules.get(index)
    }

    pub fn molecule_types(&self) -> &[MoleculeType] {
        &self.molecule_types
    }

    pub fn molecule_type(&self, id: usize) -> Option<&MoleculeType> {
        self.molecule_types.iter().find(|t| t.id == id)
    }

    pub fn simulation_box(&self) -> &SimulationBox {
        &self.sim_box
    }

    #[inline]
    pub fn number_of_atoms(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn number_of_molecules(&self) -> usize {
        self.molecules.len()
    }

    /// Translational degrees of freedom minus centre-of-mass motion and constraints.
    pub fn degrees_of_freedom(&self) -> f64 {
        (3 * self.number_of_atoms())
            .saturating_sub(3)
            .saturating_sub(self.constrained_degrees_of_freedom) as f64
    }

    pub(crate) fn set_constrained_degrees_of_freedom(&mut self, count: usize) {
        self.constrained_degrees_of_freedom = count;
    }

    /// Flat index ranges of every molecule, in molecule order.
    pub fn molecule_ranges(&self) -> Vec<Range<usize>> {
        let mut offset = 0;
        self.molecules
            .iter()
            .map(|m| {
                let range = offset..offset + m.number_of_atoms();
                offset = range.end;
                range
            })
            .collect()
    }

    /// Runs `kernel` on the flattened array view of the state.
    ///
    /// All atom data is copied into contiguous arrays before the call and copied
    /// back afterwards, including whatever the kernel did not touch.
    pub fn with_flattened<R>(
        &mut self,
        kernel: impl FnOnce(&mut FlatView, &mut SimulationBox) -> R,
    ) -> R {
        let mut view = self.flatten();
        let result = kernel(&mut view, &mut self.sim_box);
        self.deflatten(view);
        result
    }

    fn flatten(&self) -> FlatView {
        let n = self.number_of_atoms();
        let mut view = FlatView {
            positions: Vec::with_capacity(3 * n),
            velocities: Vec::with_capacity(3 * n),
            forces: Vec::with_capacity(3 * n),
            shift_forces: Vec::with_capacity(3 * n),
            masses: Vec::with_capacity(n),
            charges: Vec::with_capacity(n),
            atom_types: Vec::with_capacity(n),
            molecule_types: Vec::with_capacity(n),
            molecule_of_atom: Vec::with_capacity(n),
            molecule_ranges: self.molecule_ranges(),
            centers_of_mass: Vec::with_capacity(self.molecules.len()),
            molecule_masses: Vec::with_capacity(self.molecules.len()),
        };

        for (mol_index, molecule) in self.molecules.iter().enumerate() {
            for &atom_id in molecule.atoms() {
                let atom = &self.atoms[atom_id];
                view.positions.extend_from_slice(atom.position.as_slice());
                view.velocities.extend_from_slice(atom.velocity.as_slice());
                view.forces.extend_from_slice(atom.force.as_slice());
                view.shift_forces.extend_from_slice(atom.shift_force.as_slice());
                view.masses.push(atom.mass);
                view.charges.push(atom.charge);
                view.atom_types.push(atom.atom_type);
                view.molecule_types.push(molecule.molecule_type);
                view.molecule_of_atom.push(mol_index);
            }
            view.centers_of_mass.push(molecule.center_of_mass);
            view.molecule_masses.push(molecule.total_mass);
        }
        view
    }

    fn deflatten(&mut self, view: FlatView) {
        let mut flat = 0;
        for (molecule, com) in self.molecules.iter_mut().zip(view.centers_of_mass) {
            for &atom_id in molecule.atoms() {
                let atom = &mut self.atoms[atom_id];
                atom.position = read_vec(&view.positions, flat);
                atom.velocity = read_vec(&view.velocities, flat);
                atom.force = read_vec(&view.forces, flat);
                atom.shift_force = read_vec(&view.shift_forces, flat);
                flat += 1;
            }
            molecule.center_of_mass = com;
        }
    }

    /// Recomputes every molecule's centre of mass from the object view.
    pub fn update_centers_of_mass(&mut self) {
        self.with_flattened(|view, sim_box| view.recompute_centers_of_mass(sim_box));
    }
}

#[inline]
fn read_vec(data: &[f64], index: usize) -> Vector3<f64> {
    Vector3::new(data[3 * index], data[3 * index + 1], data[3 * index + 2])
}

#[inline]
fn write_vec(data: &mut [f64], index: usize, value: &Vector3<f64>) {
    data[3 * index..3 * index + 3].copy_from_slice(value.as_slice());
}

/// Contiguous array view of the simulation state used by data-parallel kernels.
///
/// Vector quantities are stored as `3 * N` arrays (`x0, y0, z0, x1, ...`).
/// The view can only be obtained through [`SimulationState::with_flattened`].
#[derive(Debug)]
pub struct FlatView {
    positions: Vec<f64>,
    velocities: Vec<f64>,
    forces: Vec<f64>,
    shift_forces: Vec<f64>,
    masses: Vec<f64>,
    charges: Vec<f64>,
    atom_types: Vec<usize>,
    molecule_types: Vec<usize>,
    molecule_of_atom: Vec<usize>,
    molecule_ranges: Vec<Range<usize>>,
    centers_of_mass: Vec<Vector3<f64>>,
    molecule_masses: Vec<f64>,
}

/// Simultaneous mutable access to the per-atom kinematic arrays.
pub struct KinematicsMut<'a> {
    pub positions: &'a mut [f64],
    pub velocities: &'a mut [f64],
    pub forces: &'a mut [f64],
    pub masses: &'a [f64],
}

/// Simultaneous access for pair kernels: read positions, accumulate forces.
pub struct ForceAccumulators<'a> {
    pub positions: &'a [f64],
    pub forces: &'a mut [f64],
    pub shift_forces: &'a mut [f64],
}

impl FlatView {
    #[inline]
    pub fn number_of_atoms(&self) -> usize {
        self.masses.len()
    }

    #[inline]
    pub fn number_of_molecules(&self) -> usize {
        self.molecule_ranges.len()
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn velocities(&self) -> &[f64] {
        &self.velocities
    }

    pub fn forces(&self) -> &[f64] {
        &self.forces
    }

    pub fn shift_forces(&self) -> &[f64] {
        &self.shift_forces
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn charges(&self) -> &[f64] {
        &self.charges
    }

    pub fn atom_types(&self) -> &[usize] {
        &self.atom_types
    }

    pub fn molecule_types(&self) -> &[usize] {
        &self.molecule_types
    }

    pub fn molecule_of_atom(&self) -> &[usize] {
        &self.molecule_of_atom
    }

    pub fn molecule_ranges(&self) -> &[Range<usize>] {
        &self.molecule_ranges
    }

    pub fn centers_of_mass(&self) -> &[Vector3<f64>] {
        &self.centers_of_mass
    }

    pub fn molecule_masses(&self) -> &[f64] {
        &self.molecule_masses
    }

    pub fn velocities_mut(&mut self) -> &mut [f64] {
        &mut self.velocities
    }

    pub fn positions_mut(&mut self) -> &mut [f64] {
        &mut self.positions
    }

    pub fn forces_mut(&mut self) -> &mut [f64] {
        &mut self.forces
    }

    pub fn kinematics_mut(&mut self) -> KinematicsMut<'_> {
        KinematicsMut {
            positions: &mut self.positions,
            velocities: &mut self.velocities,
            forces: &mut self.forces,
            masses: &self.masses,
        }
    }

    pub fn force_accumulators(&mut self) -> ForceAccumulators<'_> {
        ForceAccumulators {
            positions: &self.positions,
            forces: &mut self.forces,
            shift_forces: &mut self.shift_forces,
        }
    }

    #[inline]
    pub fn position(&self, atom: usize) -> Vector3<f64> {
        read_vec(&self.positions, atom)
    }

    #[inline]
    pub fn velocity(&self, atom: usize) -> Vector3<f64> {
        read_vec(&self.velocities, atom)
    }

    #[inline]
    pub fn force(&self, atom: usize) -> Vector3<f64> {
        read_vec(&self.forces, atom)
    }

    #[inline]
    pub fn shift_force(&self, atom: usize) -> Vector3<f64> {
        read_vec(&self.shift_forces, atom)
    }

    #[inline]
    pub fn set_position(&mut self, atom: usize, value: Vector3<f64>) {
        write_vec(&mut self.positions, atom, &value);
    }

    #[inline]
    pub fn set_velocity(&mut self, atom: usize, value: Vector3<f64>) {
        write_vec(&mut self.velocities, atom, &value);
    }

    #[inline]
    pub fn set_force(&mut self, atom: usize, value: Vector3<f64>) {
        write_vec(&mut self.forces, atom, &value);
    }

    #[inline]
    pub fn add_force(&mut self, atom: usize, value: Vector3<f64>) {
        let current = self.force(atom);
        write_vec(&mut self.forces, atom, &(current + value));
    }

    pub fn reset_forces(&mut self) {
        self.forces.fill(0.0);
    }

    pub fn reset_shift_forces(&mut self) {
        self.shift_forces.fill(0.0);
    }

    /// Recomputes molecular centres of mass about each molecule's first atom,
    /// so molecules split across the periodic boundary stay whole.
    pub fn recompute_centers_of_mass(&mut self, sim_box: &SimulationBox) {
        for (mol, range) in self.molecule_ranges.iter().enumerate() {
            let anchor = read_vec(&self.positions, range.start);
            let mut weighted = Vector3::zeros();
            for atom in range.clone() {
                let (image, _) = sim_box.minimum_image(&(read_vec(&self.positions, atom) - anchor));
                weighted += image * self.masses[atom];
            }
            self.centers_of_mass[mol] = anchor + weighted / self.molecule_masses[mol];
        }
    }

    /// Translates every atom of molecule `mol` by `delta`.
    pub fn translate_molecule(&mut self, mol: usize, delta: &Vector3<f64>) {
        for atom in self.molecule_ranges[mol].clone() {
            let moved = read_vec(&self.positions, atom) + delta;
            write_vec(&mut self.positions, atom, &moved);
        }
        self.centers_of_mass[mol] += delta;
    }
}

/// Assembles a [`SimulationState`] from molecule types and per-molecule atom lists.
#[derive(Debug, Default)]
pub struct SimulationStateBuilder {
    molecule_types: Vec<MoleculeType>,
    molecules: Vec<(usize, Vec<Atom>)>,
    sim_box: Option<SimulationBox>,
}

impl SimulationStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn simulation_box(mut self, sim_box: SimulationBox) -> Self {
        self.sim_box = Some(sim_box);
        self
    }

    pub fn molecule_type(mut self, molecule_type: MoleculeType) -> Self {
        self.molecule_types.push(molecule_type);
        self
    }

    pub fn molecule(mut self, molecule_type: usize, atoms: Vec<Atom>) -> Self {
        self.molecules.push((molecule_type, atoms));
        self
    }

    pub fn build(self) -> Result<SimulationState, StateError> {
        let sim_box = self
            .sim_box
            .ok_or_else(|| StateError::InvalidBox("no simulation box was given".to_string()))?;
        if self.molecules.is_empty() {
            return Err(StateError::Empty);
        }

        let mut atoms = SlotMap::with_key();
        let mut molecules = Vec::with_capacity(self.molecules.len());

        for (mol_index, (type_id, mol_atoms)) in self.molecules.into_iter().enumerate() {
            let molecule_type = self
                .molecule_types
                .iter()
                .find(|t| t.id == type_id)
                .ok_or(StateError::UnknownMoleculeType {
                    molecule: mol_index,
                    molecule_type: type_id,
                })?;
            if mol_atoms.is_empty() {
                return Err(StateError::EmptyMolecule(mol_index));
            }

            let names: Vec<String> = mol_atoms.iter().map(|a| a.name.clone()).collect();
            if !molecule_type.atom_names.is_empty() && names != molecule_type.atom_names {
                return Err(StateError::AtomNameMismatch {
                    molecule: mol_index,
                    type_name: molecule_type.name.clone(),
                    expected: molecule_type.atom_names.clone(),
                    found: names,
                });
            }

            let mut ids = Vec::with_capacity(mol_atoms.len());
            let mut total_mass = 0.0;
            for (atom_index, atom) in mol_atoms.into_iter().enumerate() {
                if atom.mass <= 0.0 || !atom.mass.is_finite() {
                    return Err(StateError::InvalidMass {
                        molecule: mol_index,
                        atom: atom_index,
                        mass: atom.mass,
                    });
                }
                total_mass += atom.mass;
                ids.push(atoms.insert(atom));
            }
            molecules.push(Molecule::new(type_id, ids, total_mass));
        }

        let mut state = SimulationState {
            atoms,
            molecules,
            molecule_types: self.molecule_types,
            sim_box,
            constrained_degrees_of_freedom: 0,
        };
        state.update_centers_of_mass();
        Ok(state)
    }
}
