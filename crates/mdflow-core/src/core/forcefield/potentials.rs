//! Pair laws returning `(energy, force)` where `force = -dE/dr`.
//!
//! A positive force is repulsive. All laws are wrapped in [`Shifted`] at setup,
//! so energy and force both vanish at the cutoff.

/// A radial pair interaction.
pub trait PairLaw: Copy + Send + Sync {
    fn evaluate(&self, dist: f64) -> (f64, f64);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LennardJones {
    pub c6: f64,
    pub c12: f64,
}

impl PairLaw for LennardJones {
    #[inline]
    fn evaluate(&self, dist: f64) -> (f64, f64) {
        let inv = 1.0 / dist;
        let inv6 = inv.powi(6);
        let inv12 = inv6 * inv6;
        let energy = self.c12 * inv12 - self.c6 * inv6;
        let force = (12.0 * self.c12 * inv12 - 6.0 * self.c6 * inv6) * inv;
        (energy, force)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Buckingham {
    pub a: f64,
    pub rho: f64,
    pub c6: f64,
}

impl PairLaw for Buckingham {
    #[inline]
    fn evaluate(&self, dist: f64) -> (f64, f64) {
        let repulsion = self.a * (-dist / self.rho).exp();
        let inv6 = dist.powi(-6);
        let energy = repulsion - self.c6 * inv6;
        let force = repulsion / self.rho - 6.0 * self.c6 * inv6 / dist;
        (energy, force)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Morse {
    pub dissociation_energy: f64,
    pub well_width: f64,
    pub equilibrium_distance: f64,
}

impl PairLaw for Morse {
    #[inline]
    fn evaluate(&self, dist: f64) -> (f64, f64) {
        let decay = (-self.well_width * (dist - self.equilibrium_distance)).exp();
        let one_minus = 1.0 - decay;
        let energy = self.dissociation_energy * one_minus * one_minus;
        let force = -2.0 * self.dissociation_energy * self.well_width * one_minus * decay;
        (energy, force)
    }
}

/// Coulomb interaction with a precomputed prefactor `k * q_i * q_j / dielectric`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coulomb {
    pub prefactor: f64,
}

impl PairLaw for Coulomb {
    #[inline]
    fn evaluate(&self, dist: f64) -> (f64, f64) {
        let inv = 1.0 / dist;
        (self.prefactor * inv, self.prefactor * inv * inv)
    }
}

/// Energy- and force-shifted wrapper: `E(r) - E(rc) + (r - rc) F(rc)` and `F(r) - F(rc)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shifted<L> {
    law: L,
    cutoff: f64,
    energy_at_cutoff: f64,
    force_at_cutoff: f64,
}

impl<L: PairLaw> Shifted<L> {
    pub fn new(law: L, cutoff: f64) -> Self {
        let (energy_at_cutoff, force_at_cutoff) = law.evaluate(cutoff);
        Self {
            law,
            cutoff,
            energy_at_cutoff,
            force_at_cutoff,
        }
    }

    pub fn law(&self) -> &L {
        &self.law
    }
}

impl<L: PairLaw> PairLaw for Shifted<L> {
    #[inline]
    fn evaluate(&self, dist: f64) -> (f64, f64) {
        let (energy, force) = self.law.evaluate(dist);
        (
            energy - self.energy_at_cutoff + (dist - self.cutoff) * self.force_at_cutoff,
            force - self.force_at_cutoff,
        )
    }
}

/// Shifted-force Coulomb for the charge product `q_i * q_j` already scaled by `k / dielectric`.
#[inline]
pub fn coulomb_shifted_force(dist: f64, prefactor: f64, cutoff: f64) -> (f64, f64) {
    let inv = 1.0 / dist;
    let inv_cut = 1.0 / cutoff;
    let energy = prefactor * (inv - inv_cut + (dist - cutoff) * inv_cut * inv_cut);
    let force = prefactor * (inv * inv - inv_cut * inv_cut);
    (energy, force)
}
