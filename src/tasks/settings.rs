/* ********************************************************************** **
**  This file is part of fdcheck.                                         **
**                                                                        **
**  fdcheck is free software: you can redistribute it and/or modify it    **
**  under the terms of the GNU General Public License as published by the **
**  Free Software Foundation, either version 3 of the License, or (at     **
**  your option) any later version.                                       **
**                                                                        **
**      http://www.gnu.org/licenses/                                      **
**                                                                        **
** Do note that, while the whole of fdcheck is licensed under the GPL,    **
** many parts of it are licensed under more permissive terms.             **
** ********************************************************************** */

use std::fmt;

use fdcheck_model::YamlRead;
use fdcheck_structure::CellStyle;

/// A quantity reported by a model that is a derivative of its energy.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Quantity {
    /// `-dE/dx` for each atomic coordinate.
    Force,
    /// `-(dE/dB)ᵀ · B` for the cell matrix `B`.
    Virial,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Force => write!(f, "force"),
            Quantity::Virial => write!(f, "virial"),
        }
    }
}

/// How to draw a test structure and how strictly to compare.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CheckSettings {
    /// Values agree when they differ by less than `1.5 * 10^-places`.
    pub places: i32,
    /// Step of the central difference.
    pub delta: f64,
    /// Type of each atom in the test structure.
    pub atom_types: Vec<usize>,
    pub cell_style: CellStyle,
    pub diagonal_bias: f64,
}

impl CheckSettings {
    pub fn force() -> Self {
        CheckSettings {
            places: 8,
            delta: 1e-5,
            atom_types: vec![0, 0, 0, 1, 1],
            cell_style: CellStyle::Symmetrized,
            diagonal_bias: 5.0,
        }
    }

    pub fn virial() -> Self {
        CheckSettings {
            delta: 1e-4,
            cell_style: CellStyle::Plain,
            ..Self::force()
        }
    }

    pub fn for_quantity(quantity: Quantity) -> Self {
        match quantity {
            Quantity::Force => Self::force(),
            Quantity::Virial => Self::virial(),
        }
    }
}

impl YamlRead for CheckSettings {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_differ_only_where_expected() {
        let (force, virial) = (CheckSettings::force(), CheckSettings::virial());
        assert_eq!(force.places, virial.places);
        assert_eq!(force.atom_types, virial.atom_types);
        assert_eq!((force.delta, virial.delta), (1e-5, 1e-4));
        assert_eq!(force.cell_style, CellStyle::Symmetrized);
        assert_eq!(virial.cell_style, CellStyle::Plain);
        assert_eq!(CheckSettings::for_quantity(Quantity::Virial), virial);
    }

    #[test]
    fn read_from_yaml() -> fdcheck_model::Result<()> {
        let text = "
places: 6
delta: 1.0e-3
atom-types: [0, 1]
cell-style: plain
diagonal-bias: 4.5
";
        let settings = CheckSettings::from_yaml_str(text)?;
        assert_eq!(settings, CheckSettings {
            places: 6,
            delta: 1e-3,
            atom_types: vec![0, 1],
            cell_style: CellStyle::Plain,
            diagonal_bias: 4.5,
        });

        let yaml = serde_yaml::to_string(&CheckSettings::force()).unwrap();
        assert!(yaml.contains("cell-style: symmetrized"), "{}", yaml);
        Ok(())
    }
}
