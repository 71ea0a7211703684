use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum PairParam {
    Buckingham {
        a: f64,
        rho: f64,
        c6: f64,
    },
    Morse {
        dissociation_energy: f64,
        well_width: f64,
        equilibrium_distance: f64,
    },
    LennardJones {
        c6: f64,
        c12: f64,
    },
}

impl PairParam {
    pub fn law(&self) -> NonCoulombLaw {
        match self {
            PairParam::Buckingham { .. } => NonCoulombLaw::Buckingham,
            PairParam::Morse { .. } => NonCoulombLaw::Morse,
            PairParam::LennardJones { .. } => NonCoulombLaw::LennardJones,
        }
    }
}

/// The non-Coulomb pair law used for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonCoulombLaw {
    LennardJones,
    Buckingham,
    Morse,
}

impl fmt::Display for NonCoulombLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NonCoulombLaw::LennardJones => "lennard-jones",
            NonCoulombLaw::Buckingham => "buckingham",
            NonCoulombLaw::Morse => "morse",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown non-Coulomb law '{0}' (expected 'lennard-jones', 'buckingham' or 'morse')")]
pub struct UnknownLawError(pub String);

impl FromStr for NonCoulombLaw {
    type Err = UnknownLawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lennard-jones" | "lj" => Ok(NonCoulombLaw::LennardJones),
            "buckingham" | "buck" => Ok(NonCoulombLaw::Buckingham),
            "morse" => Ok(NonCoulombLaw::Morse),
            _ => Err(UnknownLawError(s.to_string())),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GlobalParams {
    pub dielectric_constant: f64,
    pub non_coulomb: String,
}

/// Non-bonded force-field parameters.
///
/// Atom types are addressed by their position in `atom_types`; pair parameters
/// are stored under `[pairs.<type>.<type>]` and looked up in either order.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ForceFieldParams {
    pub atom_types: Vec<String>,
    pub globals: GlobalParams,
    #[serde(default)]
    pub pairs: HashMap<String, HashMap<String, PairParam>>,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

impl ForceFieldParams {
    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn type_index(&self, name: &str) -> Option<usize> {
        self.atom_types.iter().position(|t| t == name)
    }

    #[inline]
    pub fn number_of_types(&self) -> usize {
        self.atom_types.len()
    }

    /// Pair parameters for two type indices, regardless of order.
    pub fn pair(&self, a: usize, b: usize) -> Option<&PairParam> {
        let name_a = self.atom_types.get(a)?;
        let name_b = self.atom_types.get(b)?;
        self.lookup(name_a, name_b)
            .or_else(|| self.lookup(name_b, name_a))
    }

    fn lookup(&self, a: &str, b: &str) -> Option<&PairParam> {
        self.pairs.get(a).and_then(|inner| inner.get(b))
    }

    pub fn non_coulomb_law(&self) -> Result<NonCoulombLaw, UnknownLawError> {
        self.globals.non_coulomb.parse()
    }

    /// Adds or replaces the parameters of a pair.
    pub fn insert_pair(&mut self, a: &str, b: &str, param: PairParam) {
        self.pairs
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string(), param);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn load_succeeds_with_valid_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("ff.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(
            file,
            r#"
            atom_types = ["OW", "HW", "Na"]

            [globals]
            dielectric_constant = 1.0
            non_coulomb = "buckingham"

            [pairs.OW.OW]
            a = 25000.0
            rho = 0.28
            c6 = 600.0

            [pairs.OW.Na]
            dissociation_energy = 10.0
            well_width = 1.5
            equilibrium_distance = 2.4

            [pairs.HW.OW]
            c6 = 0.0
            c12 = 1.0
            "#
        )
        .unwrap();

        let params = ForceFieldParams::load(&file_path).unwrap();
        assert_eq!(params.globals.dielectric_constant, 1.0);
        assert_eq!(params.non_coulomb_law().unwrap(), NonCoulombLaw::Buckingham);
        assert_eq!(params.type_index("Na"), Some(2));
        assert_eq!(
            params.pair(0, 0),
            Some(&PairParam::Buckingham {
                a: 25000.0,
                rho: 0.28,
                c6: 600.0
            })
        );
        assert_eq!(params.pair(2, 0).map(PairParam::law), Some(NonCoulombLaw::Morse));
        assert_eq!(
            params.pair(0, 1),
            Some(&PairParam::LennardJones { c6: 0.0, c12: 1.0 })
        );
        assert_eq!(params.pair(1, 1), None);
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("non_existent.toml");
        let result = ForceFieldParams::load(&file_path);
        assert!(matches!(result, Err(ParamLoadError::Io { .. })));
    }

    #[test]
    fn load_fails_for_malformed_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("malformed.toml");
        fs::write(&file_path, "this is not toml").unwrap();
        let result = ForceFieldParams::load(&file_path);
        assert!(matches!(result, Err(ParamLoadError::Toml { .. })));
    }

    #[test]
    fn law_names_parse_case_insensitively() {
        assert_eq!("Lennard-Jones".parse::<NonCoulombLaw>(), Ok(NonCoulombLaw::LennardJones));
        assert_eq!("lj".parse::<NonCoulombLaw>(), Ok(NonCoulombLaw::LennardJones));
        assert_eq!("MORSE".parse::<NonCoulombLaw>(), Ok(NonCoulombLaw::Morse));
        assert_eq!(
            "guggenheim-mccglashan".parse::<NonCoulombLaw>(),
            Err(UnknownLawError("guggenheim-mccglashan".to_string()))
        );
    }

    #[test]
    fn insert_pair_makes_pair_visible_in_both_orders() {
        let mut params = ForceFieldParams {
            atom_types: vec!["A".into(), "B".into()],
            globals: GlobalParams {
                dielectric_constant: 1.0,
                non_coulomb: "lennard-jones".into(),
            },
            pairs: HashMap::new(),
        };
        params.insert_pair("A", "B", PairParam::LennardJones { c6: 1.0, c12: 2.0 });
        assert!(params.pair(0, 1).is_some());
        assert!(params.pair(1, 0).is_some());
        assert!(params.pair(0, 0).is_none());
    }
}
