//! # mdflow Core Library
//!
//! A molecular-dynamics engine that advances atoms under force-field forces or
//! forces supplied by an external quantum-mechanical provider, subject to bond
//! and rigid-body constraints and to temperature and pressure coupling.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** The data model of the system (`SimulationState`,
//!   `SimulationBox`), the pairwise force-field laws and the unit constants.
//!
//! - **[`engine`]: The Logic Core.** Every stage of one timestep: the velocity-Verlet
//!   integrator, the brute-force and cell-list potential evaluators, the SHAKE/RATTLE and
//!   M-Shake constraint solvers, thermostats, manostats, the virial, the device abstraction
//!   and the physical-data aggregator.
//!
//! - **[`workflows`]: The Public API.** Ties `engine` and `core` together in the step
//!   driver ([`workflows::simulate::Engine`]) and the [`workflows::simulate::run`] entry point.

pub mod core;
pub mod engine;
pub mod workflows;
