use nalgebra::Vector3;

/// Represents a single atom of the simulated system.
///
/// Atoms carry their identity (name and force-field type index), their
/// kinematic state and the force accumulators filled during force evaluation.
/// The `shift_force` accumulator collects the minimum-image correction of the
/// virial and is drained every step by the virial calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "OW", "HW1").
    pub name: String,
    /// Index of the atom's type in the force-field parameter table.
    pub atom_type: usize,
    /// Cartesian position in Å.
    pub position: Vector3<f64>,
    /// Velocity in Å/s.
    pub velocity: Vector3<f64>,
    /// Accumulated force in kcal/(mol·Å).
    pub force: Vector3<f64>,
    /// Minimum-image correction accumulator used by the virial.
    pub shift_force: Vector3<f64>,
    /// Mass in g/mol.
    pub mass: f64,
    /// Partial charge in elementary charge units.
    pub charge: f64,
}

impl Atom {
    /// Creates a new `Atom` at rest with zero charge and unit mass.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom.
    /// * `atom_type` - The force-field type index of the atom.
    /// * `position` - The Cartesian position of the atom.
    pub fn new(name: &str, atom_type: usize, position: Vector3<f64>) -> Self {
        Self {
            name: name.to_string(),
            atom_type,
            position,
            velocity: Vector3::zeros(),
            force: Vector3::zeros(),
            shift_force: Vector3::zeros(),
            mass: 1.0,
            charge: 0.0,
        }
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.velocity = velocity;
        self
    }
}
