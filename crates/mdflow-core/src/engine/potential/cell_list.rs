//! Periodic cell list in fractional coordinates.
//!
//! Each axis is split into `max(1, floor(width / cutoff))` cells, where `width`
//! is the perpendicular distance between opposite faces. Atoms within the
//! cutoff therefore always sit in the same or adjacent cells, including
//! across the periodic boundary.

use super::{Accumulator, PairKernel};
use crate::core::forcefield::potentials::PairLaw;
use crate::core::models::simulation_box::SimulationBox;
use nalgebra::Vector3;
use tracing::trace;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Atoms sorted by cell, with the neighbour cells of every cell.
#[derive(Debug)]
pub(super) struct CellList {
    dims: [usize; 3],
    cell_start: Vec<usize>,
    cell_count: Vec<usize>,
    sorted: Vec<usize>,
}

impl CellList {
    pub(super) fn build(positions: &[f64], sim_box: &SimulationBox, cutoff: f64) -> Self {
        let widths = sim_box.perpendicular_widths();
        let dims = [0, 1, 2].map(|k| ((widths[k] / cutoff).floor() as usize).max(1));
        let number_of_cells = dims[0] * dims[1] * dims[2];

        let cell_of_atom: Vec<usize> = positions
            .chunks_exact(3)
            .map(|p| {
                let fractional = sim_box.to_fractional(&Vector3::new(p[0], p[1], p[2]));
                let index = [0, 1, 2].map(|k| {
                    let wrapped = fractional[k] - fractional[k].floor();
                    ((wrapped * dims[k] as f64) as usize).min(dims[k] - 1)
                });
                (index[0] * dims[1] + index[1]) * dims[2] + index[2]
            })
            .collect();

        let mut cell_count = vec![0; number_of_cells];
        for &cell in &cell_of_atom {
            cell_count[cell] += 1;
        }
        let mut cell_start = vec![0; number_of_cells];
        for cell in 1..number_of_cells {
            cell_start[cell] = cell_start[cell - 1] + cell_count[cell - 1];
        }
        let mut fill = cell_start.clone();
        let mut sorted = vec![0; cell_of_atom.len()];
        for (atom, &cell) in cell_of_atom.iter().enumerate() {
            sorted[fill[cell]] = atom;
            fill[cell] += 1;
        }

        trace!(?dims, atoms = sorted.len(), "Cell list built.");
        Self {
            dims,
            cell_start,
            cell_count,
            sorted,
        }
    }

    #[inline]
    pub(super) fn number_of_cells(&self) -> usize {
        self.cell_count.len()
    }

    #[inline]
    fn atoms_in(&self, cell: usize) -> &[usize] {
        &self.sorted[self.cell_start[cell]..self.cell_start[cell] + self.cell_count[cell]]
    }

    /// Distinct cells of the periodic 27-neighbourhood of `cell`, itself included.
    pub(super) fn neighbors(&self, cell: usize) -> Vec<usize> {
        let [nx, ny, nz] = self.dims;
        let (cx, cy, cz) = (cell / (ny * nz), (cell / nz) % ny, cell % nz);
        let wrap = |c: usize, offset: isize, n: usize| (c as isize + offset).rem_euclid(n as isize) as usize;

        let mut cells = Vec::with_capacity(27);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let neighbor =
                        (wrap(cx, dx, nx) * ny + wrap(cy, dy, ny)) * nz + wrap(cz, dz, nz);
                    cells.push(neighbor);
                }
            }
        }
        cells.sort_unstable();
        cells.dedup();
        cells
    }

    /// Visits every pair with at least one atom in `cell` exactly once
    /// across all cells.
    fn visit_cell<L: PairLaw>(&self, cell: usize, kernel: &PairKernel<'_, L>, acc: &mut Accumulator) {
        let own = self.atoms_in(cell);
        if own.is_empty() {
            return;
        }
        for neighbor in self.neighbors(cell) {
            if neighbor < cell {
                continue;
            }
            if neighbor == cell {
                for (index, &i) in own.iter().enumerate() {
                    for &j in &own[index + 1..] {
                        kernel.visit(i, j, acc);
                    }
                }
            } else {
                for &i in own {
                    for &j in self.atoms_in(neighbor) {
                        kernel.visit(i, j, acc);
                    }
                }
            }
        }
    }
}

pub(super) fn sweep<L: PairLaw>(kernel: &PairKernel<'_, L>, number_of_atoms: usize) -> Accumulator {
    let cells = CellList::build(kernel.positions, kernel.sim_box, kernel.cutoff);

    #[cfg(not(feature = "parallel"))]
    let acc = {
        let mut acc = Accumulator::new(number_of_atoms);
        for cell in 0..cells.number_of_cells() {
            cells.visit_cell(cell, kernel, &mut acc);
        }
        acc
    };

    #[cfg(feature = "parallel")]
    let acc = (0..cells.number_of_cells())
        .into_par_iter()
        .fold(
            || Accumulator::new(number_of_atoms),
            |mut acc, cell| {
                cells.visit_cell(cell, kernel, &mut acc);
                acc
            },
        )
        .reduce(|| Accumulator::new(number_of_atoms), Accumulator::merge);

    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(edge: f64) -> SimulationBox {
        SimulationBox::orthorhombic(Vector3::new(edge, edge, edge)).unwrap()
    }

    #[test]
    fn atoms_are_sorted_into_their_cells() {
        let positions = [1.0, 1.0, 1.0, 29.0, 1.0, 1.0, -0.5, 15.0, 15.0];
        let cells = CellList::build(&positions, &cube(30.0), 10.0);
        assert_eq!(cells.number_of_cells(), 27);
        assert_eq!(cells.atoms_in(0), &[0]);
        // x = 29 falls in the last x slab, and x = -0.5 wraps to it.
        let last_slab = 2 * 9;
        assert_eq!(cells.atoms_in(last_slab), &[1]);
        assert_eq!(cells.atoms_in(last_slab + 3 + 1), &[2]);
        assert_eq!(cells.sorted.len(), 3);
    }

    #[test]
    fn neighbours_wrap_and_are_unique() {
        let three = CellList::build(&[], &cube(30.0), 10.0);
        let neighbors = three.neighbors(0);
        assert_eq!(neighbors.len(), 27);
        assert!(neighbors.contains(&26));

        let two = CellList::build(&[], &cube(20.0), 10.0);
        assert_eq!(two.neighbors(0).len(), 8);

        let one = CellList::build(&[], &cube(15.0), 10.0);
        assert_eq!(one.neighbors(0), vec![0]);
    }
}
