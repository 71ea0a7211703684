use super::ids::AtomId;
use nalgebra::Vector3;

/// Template shared by all molecules of one kind.
///
/// Atom names are ordered; every molecule instance of this type must list its
/// atoms in the same order. `exclusions` holds pairs of local atom indices whose
/// non-bonded interaction is skipped when intramolecular pairs are evaluated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MoleculeType {
    pub id: usize,
    pub name: String,
    pub atom_names: Vec<String>,
    pub exclusions: Vec<(usize, usize)>,
}

impl MoleculeType {
    pub fn new(id: usize, name: &str, atom_names: &[&str]) -> Self {
        Self {
            id,
            name: name.to_string(),
            atom_names: atom_names.iter().map(|n| n.to_string()).collect(),
            exclusions: Vec::new(),
        }
    }

    pub fn with_exclusions(mut self, exclusions: Vec<(usize, usize)>) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Whether the local pair `(a, b)` is excluded, in either order.
    pub fn is_excluded(&self, a: usize, b: usize) -> bool {
        self.exclusions
            .iter()
            .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
    }
}

/// An ordered group of atoms moving under one molecule type.
///
/// Molecules reference their atoms by [`AtomId`]; the atoms themselves are owned
/// by the [`SimulationState`](super::state::SimulationState).
#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    pub molecule_type: usize,
    atoms: Vec<AtomId>,
    pub center_of_mass: Vector3<f64>,
    pub total_mass: f64,
}

impl Molecule {
    pub(crate) fn new(molecule_type: usize, atoms: Vec<AtomId>, total_mass: f64) -> Self {
        Self {
            molecule_type,
            atoms,
            center_of_mass: Vector3::zeros(),
            total_mass,
        }
    }

    #[inline]
    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    #[inline]
    pub fn number_of_atoms(&self) -> usize {
        self.atoms.len()
    }
}
