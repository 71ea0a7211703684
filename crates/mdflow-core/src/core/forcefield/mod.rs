//! # Force Field Module
//!
//! Non-bonded pair interactions used by the potential evaluators.
//!
//! ## Overview
//!
//! Every evaluated pair contributes a Coulomb term and exactly one non-Coulomb
//! term. The non-Coulomb law is chosen once per run:
//!
//! - **Lennard-Jones** `c12/r^12 - c6/r^6`
//! - **Buckingham** `a exp(-r/rho) - c6/r^6`
//! - **Morse** `D (1 - exp(-a (r - r0)))^2`
//!
//! All laws are energy- and force-shifted so that both vanish at the cutoff.
//!
//! ## Key Components
//!
//! - [`potentials`] - The pair laws and the shifting wrapper
//! - [`params`] - Force-field parameter tables loaded from TOML
//! - [`term`] - Energy term aggregation

pub mod params;
pub mod potentials;
pub mod term;
