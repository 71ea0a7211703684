use super::config::VirialKind;
use crate::core::models::simulation_box::SimulationBox;
use crate::core::models::state::FlatView;
use nalgebra::Vector3;

/// Diagonal virial `Σ F ⊙ x + Σ shift_force`, draining the shift-force accumulators.
///
/// The molecular variant also subtracts `Σ F ⊙ (x - com)` so that only
/// intermolecular contributions remain.
pub fn compute_virial(view: &mut FlatView, sim_box: &SimulationBox, kind: VirialKind) -> Vector3<f64> {
    let mut virial = Vector3::zeros();
    for atom in 0..view.number_of_atoms() {
        virial += view.force(atom).component_mul(&view.position(atom)) + view.shift_force(atom);
    }
    view.reset_shift_forces();

    if kind == VirialKind::Molecular {
        let molecule_of_atom = view.molecule_of_atom();
        let centers = view.centers_of_mass();
        let mut correction = Vector3::zeros();
        for (atom, &mol) in molecule_of_atom.iter().enumerate() {
            let (relative, _) = sim_box.minimum_image(&(view.position(atom) - centers[mol]));
            correction += view.force(atom).component_mul(&relative);
        }
        virial -= correction;
    }
    virial
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::molecule::MoleculeType;
    use crate::core::models::state::{SimulationState, SimulationStateBuilder};

    fn two_molecules_three_atoms() -> SimulationState {
        SimulationStateBuilder::new()
            .simulation_box(SimulationBox::orthorhombic(Vector3::new(10.0, 10.0, 10.0)).unwrap())
            .molecule_type(MoleculeType::new(0, "AB", &["A", "B"]))
            .molecule_type(MoleculeType::new(1, "C", &["C"]))
            .molecule(
                0,
                vec![
                    Atom::new("A", 0, Vector3::new(1.0, 2.0, 3.0)),
                    Atom::new("B", 0, Vector3::new(2.0, 2.0, 3.0)),
                ],
            )
            .molecule(1, vec![Atom::new("C", 0, Vector3::new(4.0, 5.0, 6.0))])
            .build()
            .unwrap()
    }

    #[test]
    fn atomic_virial_sums_force_position_products_and_shift_forces() {
        let mut state = two_molecules_three_atoms();
        let virial = state.with_flattened(|view, sim_box| {
            view.set_force(0, Vector3::new(1.0, 2.0, 3.0));
            view.set_force(1, Vector3::new(-1.0, 0.5, 0.0));
            view.set_force(2, Vector3::new(0.0, -2.5, -3.0));
            let mut acc = view.force_accumulators();
            acc.shift_forces[0..3].copy_from_slice(&[0.5, 0.0, -1.0]);
            acc.shift_forces[6..9].copy_from_slice(&[0.25, 0.25, 0.25]);

            let virial = compute_virial(view, sim_box, VirialKind::Atomic);
            assert!(view.shift_forces().iter().all(|&s| s == 0.0));
            virial
        });

        let expected = Vector3::new(
            1.0 * 1.0 - 1.0 * 2.0 + 0.0 * 4.0 + 0.5 + 0.25,
            2.0 * 2.0 + 0.5 * 2.0 - 2.5 * 5.0 + 0.25,
            3.0 * 3.0 + 0.0 * 3.0 - 3.0 * 6.0 - 1.0 + 0.25,
        );
        assert!((virial - expected).norm() < 1e-12);
        assert!(state.atoms_iter().all(|a| a.shift_force == Vector3::zeros()));
    }

    #[test]
    fn second_call_does_not_count_shift_forces_twice() {
        let mut state = two_molecules_three_atoms();
        state.with_flattened(|view, sim_box| {
            view.force_accumulators().shift_forces.fill(1.0);
            let first = compute_virial(view, sim_box, VirialKind::Atomic);
            let second = compute_virial(view, sim_box, VirialKind::Atomic);
            assert!((first - second - Vector3::new(3.0, 3.0, 3.0)).norm() < 1e-12);
        });
    }

    #[test]
    fn molecular_virial_removes_intramolecular_part() {
        let mut state = two_molecules_three_atoms();
        state.with_flattened(|view, sim_box| {
            // Equal and opposite forces inside molecule 0 carry no intermolecular virial.
            view.set_force(0, Vector3::new(2.0, 0.0, 0.0));
            view.set_force(1, Vector3::new(-2.0, 0.0, 0.0));
            let atomic = compute_virial(view, sim_box, VirialKind::Atomic);
            let molecular = compute_virial(view, sim_box, VirialKind::Molecular);
            assert!((atomic.x - (2.0 * 1.0 - 2.0 * 2.0)).abs() < 1e-12);
            assert!(molecular.norm() < 1e-12);
        });
    }
}
