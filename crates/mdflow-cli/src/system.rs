//! System description files.
//!
//! A system file lists the periodic box, the molecule types and every
//! molecule with its atoms. Atom types are referred to by name and resolved
//! against the loaded force field. Velocities are given in Å/ps.

use crate::error::{CliError, Result};
use mdflow::core::constants::{FS_TO_S, PS_TO_FS};
use mdflow::core::forcefield::params::ForceFieldParams;
use mdflow::core::models::atom::Atom;
use mdflow::core::models::molecule::MoleculeType;
use mdflow::core::models::simulation_box::SimulationBox;
use mdflow::core::models::state::{SimulationState, SimulationStateBuilder};
use mdflow::engine::constraints::{BondConstraint, MShakeReference};
use nalgebra::Vector3;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

const ANGSTROM_PER_PS_TO_PER_S: f64 = 1.0 / (PS_TO_FS * FS_TO_S);

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct FileBox {
    lengths: [f64; 3],
    angles: Option<[f64; 3]>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct FileBond {
    atoms: [usize; 2],
    length: f64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct FileMoleculeType {
    name: String,
    atoms: Vec<String>,
    #[serde(default)]
    exclusions: Vec<[usize; 2]>,
    #[serde(default)]
    bonds: Vec<FileBond>,
    /// Reference geometry; its presence makes every molecule of the type rigid.
    rigid: Option<Vec<[f64; 3]>>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct FileAtom {
    name: String,
    #[serde(rename = "type")]
    atom_type: String,
    position: [f64; 3],
    mass: f64,
    #[serde(default)]
    charge: f64,
    velocity: Option<[f64; 3]>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct FileMolecule {
    #[serde(rename = "type")]
    molecule_type: String,
    atoms: Vec<FileAtom>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct SystemFile {
    #[serde(rename = "box")]
    sim_box: FileBox,
    molecule_types: Vec<FileMoleculeType>,
    molecules: Vec<FileMolecule>,
}

/// Everything the engine needs besides the run configuration and force field.
#[derive(Debug, Clone)]
pub struct SystemDescription {
    pub state: SimulationState,
    pub bonds: Vec<BondConstraint>,
    pub rigid_references: Vec<MShakeReference>,
}

pub fn load_system(path: &Path, params: &ForceFieldParams) -> Result<SystemDescription> {
    debug!("Reading system description from {:?}", path);
    let content = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    let file: SystemFile = toml::from_str(&content).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    let system = build_system(file, params)?;
    info!(
        atoms = system.state.number_of_atoms(),
        molecules = system.state.number_of_molecules(),
        bonds = system.bonds.len(),
        rigid_types = system.rigid_references.len(),
        "Loaded system description."
    );
    Ok(system)
}

fn to_vector(v: [f64; 3]) -> Vector3<f64> {
    Vector3::new(v[0], v[1], v[2])
}

fn build_system(file: SystemFile, params: &ForceFieldParams) -> Result<SystemDescription> {
    let lengths = to_vector(file.sim_box.lengths);
    let sim_box = match file.sim_box.angles {
        Some(angles) if angles != [90.0; 3] => {
            SimulationBox::from_lengths_and_angles(lengths, to_vector(angles))?
        }
        _ => SimulationBox::orthorhombic(lengths)?,
    };

    let mut builder = SimulationStateBuilder::new().simulation_box(sim_box);
    let mut rigid_references = Vec::new();
    for (id, mol_type) in file.molecule_types.iter().enumerate() {
        let names: Vec<&str> = mol_type.atoms.iter().map(String::as_str).collect();
        let exclusions = mol_type.exclusions.iter().map(|&[a, b]| (a, b)).collect();
        builder = builder
            .molecule_type(MoleculeType::new(id, &mol_type.name, &names).with_exclusions(exclusions));
        if let Some(reference) = &mol_type.rigid {
            rigid_references.push(MShakeReference {
                molecule_type: id,
                atom_names: mol_type.atoms.clone(),
                positions: reference.iter().copied().map(to_vector).collect(),
            });
        }
    }

    let mut bonds = Vec::new();
    for (index, molecule) in file.molecules.into_iter().enumerate() {
        let type_id = file
            .molecule_types
            .iter()
            .position(|t| t.name == molecule.molecule_type)
            .ok_or_else(|| {
                CliError::Config(format!(
                    "molecule {index} uses undefined molecule type '{}'",
                    molecule.molecule_type
                ))
            })?;

        let atoms = molecule
            .atoms
            .into_iter()
            .map(|a| -> Result<Atom> {
                let atom_type = params.type_index(&a.atom_type).ok_or_else(|| {
                    CliError::Config(format!(
                        "atom '{}' of molecule {index} has atom type '{}' which the force field does not define",
                        a.name, a.atom_type
                    ))
                })?;
                let velocity = a
                    .velocity
                    .map(|v| to_vector(v) * ANGSTROM_PER_PS_TO_PER_S)
                    .unwrap_or_else(Vector3::zeros);
                Ok(Atom::new(&a.name, atom_type, to_vector(a.position))
                    .with_mass(a.mass)
                    .with_charge(a.charge)
                    .with_velocity(velocity))
            })
            .collect::<Result<Vec<_>>>()?;

        bonds.extend(
            file.molecule_types[type_id]
                .bonds
                .iter()
                .map(|bond| BondConstraint {
                    molecule: index,
                    atom_a: bond.atoms[0],
                    atom_b: bond.atoms[1],
                    length: bond.length,
                }),
        );
        builder = builder.molecule(type_id, atoms);
    }

    Ok(SystemDescription {
        state: builder.build()?,
        bonds,
        rigid_references,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdflow::core::forcefield::params::GlobalParams;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    fn water_params() -> ForceFieldParams {
        ForceFieldParams {
            atom_types: vec!["OW".to_string(), "HW".to_string()],
            globals: GlobalParams {
                dielectric_constant: 1.0,
                non_coulomb: "lennard-jones".to_string(),
            },
            pairs: HashMap::new(),
        }
    }

    const WATER_SYSTEM: &str = r#"
        [box]
        lengths = [20.0, 20.0, 20.0]

        [[molecule-types]]
        name = "water"
        atoms = ["OW", "HW1", "HW2"]
        exclusions = [[0, 1], [0, 2]]
        bonds = [{ atoms = [0, 1], length = 1.0 }, { atoms = [0, 2], length = 1.0 }]

        [[molecules]]
        type = "water"
        atoms = [
            { name = "OW", type = "OW", position = [1.0, 1.0, 1.0], mass = 15.999, charge = -0.82 },
            { name = "HW1", type = "HW", position = [2.0, 1.0, 1.0], mass = 1.008, charge = 0.41, velocity = [0.5, 0.0, 0.0] },
            { name = "HW2", type = "HW", position = [1.0, 2.0, 1.0], mass = 1.008, charge = 0.41 },
        ]

        [[molecules]]
        type = "water"
        atoms = [
            { name = "OW", type = "OW", position = [6.0, 6.0, 6.0], mass = 15.999, charge = -0.82 },
            { name = "HW1", type = "HW", position = [7.0, 6.0, 6.0], mass = 1.008, charge = 0.41 },
            { name = "HW2", type = "HW", position = [6.0, 7.0, 6.0], mass = 1.008, charge = 0.41 },
        ]
    "#;

    fn parse(content: &str) -> Result<SystemDescription> {
        let file: SystemFile = toml::from_str(content).map_err(|e| CliError::Other(e.into()))?;
        build_system(file, &water_params())
    }

    #[test]
    fn water_system_builds_state_and_per_molecule_bonds() {
        let system = parse(WATER_SYSTEM).unwrap();
        assert_eq!(system.state.number_of_atoms(), 6);
        assert_eq!(system.state.number_of_molecules(), 2);
        assert!(system.state.simulation_box().is_orthorhombic());
        assert_eq!(system.bonds.len(), 4);
        assert_eq!(system.bonds[2].molecule, 1);
        assert!(system.rigid_references.is_empty());

        let water = system.state.molecule_type(0).unwrap();
        assert!(water.is_excluded(1, 0));

        let hydrogen = system.state.atoms_iter().nth(1).unwrap();
        assert_eq!(hydrogen.atom_type, 1);
        assert!((hydrogen.velocity.x - 0.5e12).abs() < 1.0);
        assert_eq!(hydrogen.charge, 0.41);
    }

    #[test]
    fn rigid_reference_is_attached_to_its_type() {
        let content = WATER_SYSTEM.replace(
            "bonds = [{ atoms = [0, 1], length = 1.0 }, { atoms = [0, 2], length = 1.0 }]",
            "rigid = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]",
        );
        let system = parse(&content).unwrap();
        assert!(system.bonds.is_empty());
        assert_eq!(system.rigid_references.len(), 1);
        let reference = &system.rigid_references[0];
        assert_eq!(reference.molecule_type, 0);
        assert_eq!(reference.atom_names, vec!["OW", "HW1", "HW2"]);
        assert_eq!(reference.positions[1], Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn unknown_names_are_reported() {
        let bad_atom_type = WATER_SYSTEM.replacen("type = \"HW\"", "type = \"CT\"", 1);
        assert!(matches!(parse(&bad_atom_type), Err(CliError::Config(_))));

        let bad_molecule_type = WATER_SYSTEM.replacen("type = \"water\"", "type = \"ice\"", 1);
        assert!(matches!(parse(&bad_molecule_type), Err(CliError::Config(_))));
    }

    #[test]
    fn invalid_state_surfaces_as_system_error() {
        let bad_box = WATER_SYSTEM.replace("[20.0, 20.0, 20.0]", "[20.0, 0.0, 20.0]");
        assert!(matches!(parse(&bad_box), Err(CliError::System(_))));

        let bad_mass = WATER_SYSTEM.replacen("mass = 15.999", "mass = 0.0", 1);
        assert!(matches!(parse(&bad_mass), Err(CliError::System(_))));
    }

    #[test]
    fn triclinic_angles_select_a_general_cell() {
        let content = WATER_SYSTEM.replace(
            "lengths = [20.0, 20.0, 20.0]",
            "lengths = [20.0, 20.0, 20.0]\nangles = [90.0, 90.0, 75.0]",
        );
        let system = parse(&content).unwrap();
        assert!(!system.state.simulation_box().is_orthorhombic());
    }

    #[test]
    fn load_system_reads_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("system.toml");
        fs::write(&path, WATER_SYSTEM).unwrap();
        let system = load_system(&path, &water_params()).unwrap();
        assert_eq!(system.state.number_of_molecules(), 2);

        let missing = load_system(&dir.path().join("none.toml"), &water_params());
        assert!(matches!(missing, Err(CliError::FileParsing { .. })));
    }
}
