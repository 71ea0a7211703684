//! # Core Models Module
//!
//! Data structures describing the simulated system: atoms, molecules, molecule
//! types, the periodic box and the owning [`state::SimulationState`].
//!
//! ## Key Components
//!
//! - [`atom`] - Individual atom with identity, kinematics and force accumulators
//! - [`molecule`] - Molecule instances and the molecule-type templates they follow
//! - [`simulation_box`] - Periodic cell with minimum-image mapping
//! - [`state`] - Owning container with the object view and the flattened array view
//! - [`ids`] - Key type for atoms stored in the state's slot map
//!
//! ## Usage
//!
//! ```ignore
//! use mdflow::core::models::{atom::Atom, molecule::MoleculeType};
//! use mdflow::core::models::{simulation_box::SimulationBox, state::SimulationStateBuilder};
//!
//! let state = SimulationStateBuilder::new()
//!     .simulation_box(SimulationBox::orthorhombic(Vector3::new(30.0, 30.0, 30.0))?)
//!     .molecule_type(MoleculeType::new(0, "Ar", &["Ar"]))
//!     .molecule(0, vec![Atom::new("Ar", 0, Vector3::zeros()).with_mass(39.948)])
//!     .build()?;
//! ```

pub mod atom;
pub mod ids;
pub mod molecule;
pub mod simulation_box;
pub mod state;
