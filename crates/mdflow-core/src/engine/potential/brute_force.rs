//! Exhaustive pair sweep over molecule pairs.

use super::{Accumulator, PairKernel};
use crate::core::forcefield::potentials::PairLaw;
use std::ops::Range;

pub(super) fn sweep<L: PairLaw>(kernel: &PairKernel<'_, L>, molecule_ranges: &[Range<usize>]) -> Accumulator {
    let number_of_atoms = molecule_ranges.last().map_or(0, |r| r.end);
    let mut acc = Accumulator::new(number_of_atoms);

    for (mol1, first) in molecule_ranges.iter().enumerate() {
        for second in &molecule_ranges[..mol1] {
            for i in first.clone() {
                for j in second.clone() {
                    kernel.interact(i, j, &mut acc);
                }
            }
        }
    }

    if kernel.include_intramolecular {
        for range in molecule_ranges {
            for i in range.clone() {
                for j in i + 1..range.end {
                    if kernel.intramolecular_allowed(i, j) {
                        kernel.interact(i, j, &mut acc);
                    }
                }
            }
        }
    }

    acc
}
