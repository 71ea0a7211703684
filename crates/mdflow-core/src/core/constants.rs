//! Unit-conversion constants shared by the integrator, thermostats and observables.
//!
//! Internal units: positions in Å, velocities in Å/s, forces in kcal/(mol·Å),
//! masses in g/mol, charges in e, time steps in fs, energies in kcal/mol.

pub const KCAL_TO_J: f64 = 4184.0;
pub const GRAM_TO_KG: f64 = 1.0e-3;
pub const M_TO_ANGSTROM: f64 = 1.0e10;
pub const FS_TO_S: f64 = 1.0e-15;
pub const PS_TO_FS: f64 = 1.0e3;
pub const AVOGADRO: f64 = 6.022_140_76e23;
pub const PA_TO_BAR: f64 = 1.0e-5;

/// Boltzmann constant in kcal/(mol·K).
pub const BOLTZMANN_KCAL_PER_MOL: f64 = 8.314_462_618 / KCAL_TO_J;

/// Coulomb prefactor in kcal·Å/(mol·e²).
pub const COULOMB_CONSTANT: f64 = 332.0637;

/// Half-kick prefactor: `dt[fs] * F[kcal/(mol·Å)] / m[g/mol] * factor` yields Å/s.
pub const V_VERLET_VELOCITY_FACTOR: f64 =
    0.5 * KCAL_TO_J / GRAM_TO_KG * M_TO_ANGSTROM * M_TO_ANGSTROM * FS_TO_S;

/// `m[g/mol] * v²[Å²/s²] * factor` yields the kinetic energy in kcal/mol.
pub const KINETIC_ENERGY_FACTOR: f64 =
    0.5 * GRAM_TO_KG / (M_TO_ANGSTROM * M_TO_ANGSTROM) / KCAL_TO_J;

/// Converts a momentum rate `m[g/mol] * v[Å/s] * [1/s]` into kcal/(mol·Å).
pub const MOMENTUM_TO_FORCE: f64 = GRAM_TO_KG / M_TO_ANGSTROM / M_TO_ANGSTROM / KCAL_TO_J;

/// Converts kcal/(mol·Å³) into bar.
pub const PRESSURE_FACTOR: f64 =
    KCAL_TO_J / AVOGADRO * M_TO_ANGSTROM * M_TO_ANGSTROM * M_TO_ANGSTROM * PA_TO_BAR;
