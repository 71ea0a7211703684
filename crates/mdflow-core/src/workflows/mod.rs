//! # Workflows Module
//!
//! High-level entry points that tie the engine stages together.
//!
//! ## Overview
//!
//! A workflow owns the complete lifecycle of a run: binding the device,
//! resolving force-field parameters and constraints against the system,
//! computing initial forces, stepping, and handing every snapshot of
//! [`PhysicalData`](crate::engine::physical_data::PhysicalData) to the caller.
//!
//! ## Architecture
//!
//! - **Simulation Workflow** ([`simulate`]) - The step driver [`simulate::Engine`],
//!   its builder and the [`simulate::run`] loop with progress reporting and
//!   running averages.

pub mod simulate;
