//! # Core Module
//!
//! Stateless building blocks of the engine: the data model of the simulated
//! system, the pairwise force-field laws with their parameter tables, and the
//! fixed unit-conversion constants.
//!
//! ## Architecture
//!
//! - **System Representation** ([`models`]) - Atoms, molecules, the periodic box and the simulation state
//! - **Force Field** ([`forcefield`]) - Coulomb and non-Coulomb pair laws, parameter tables and loading
//! - **Units** ([`constants`]) - Conversion factors between the internal unit system and SI

pub mod constants;
pub mod forcefield;
pub mod models;
