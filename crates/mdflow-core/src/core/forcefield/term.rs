use std::ops::{Add, AddAssign};

/// Coulomb and non-Coulomb energy totals in kcal/mol.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyTerm {
    pub coulomb: f64,
    pub non_coulomb: f64,
}

impl EnergyTerm {
    pub fn new(coulomb: f64, non_coulomb: f64) -> Self {
        Self {
            coulomb,
            non_coulomb,
        }
    }

    #[inline]
    pub fn total(&self) -> f64 {
        self.coulomb + self.non_coulomb
    }
}

impl Add for EnergyTerm {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            coulomb: self.coulomb + rhs.coulomb,
            non_coulomb: self.non_coulomb + rhs.non_coulomb,
        }
    }
}

impl AddAssign for EnergyTerm {
    fn add_assign(&mut self, rhs: Self) {
        self.coulomb += rhs.coulomb;
        self.non_coulomb += rhs.non_coulomb;
    }
}
