//! # Engine Module
//!
//! Every stage of one molecular-dynamics timestep, plus the configuration and
//! error types that drive them.
//!
//! ## Overview
//!
//! The engine operates on the flattened array view of a
//! [`SimulationState`](crate::core::models::state::SimulationState). Each stage is a
//! synchronous kernel; data-parallel loops run on the bound [`device::Device`]'s
//! worker pool when the `parallel` feature is enabled.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Validated, immutable simulation parameters
//! - **Error Handling** ([`error`]) - One error variant per failure category
//! - **Device** ([`device`]) - Backend binding with aggregated error checkpoints
//! - **Integration** ([`integrator`]) - Velocity-Verlet half steps behind a phase machine
//! - **Forces** ([`potential`], [`qm`]) - Pair potentials or an external QM provider
//! - **Constraints** ([`constraints`]) - SHAKE, RATTLE and rigid-body M-Shake
//! - **Coupling** ([`thermostat`], [`manostat`]) - Temperature and pressure control
//! - **Observables** ([`virial`], [`physical_data`], [`velocities`]) - Per-step
//!   thermodynamic data and initial velocities
//! - **Bookkeeping** ([`timings`], [`progress`]) - Step counting and progress callbacks

pub mod config;
pub mod constraints;
pub mod device;
pub mod error;
pub mod integrator;
pub mod manostat;
pub mod physical_data;
pub mod potential;
pub mod progress;
pub mod qm;
pub mod thermostat;
pub mod timings;
pub mod velocities;
pub mod virial;
