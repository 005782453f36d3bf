/* ************************************************************************ **
** This file is part of fdcheck, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
**                                                                          **
** Be aware that not all of fdcheck is provided under this permissive       **
** license, and that the project as a whole is licensed under the GPL 3.0.  **
** ************************************************************************ */

//! A smooth-cutoff descriptor energy model, and everything needed to build one.
//!
//! The model exists to be checked. It is a genuine many-body energy function
//! of periodic structures, and it reports analytic forces and virials that
//! are computed independently of the energy.

#[macro_use] extern crate log;
#[macro_use] extern crate serde;
#[cfg(test)]
#[macro_use] extern crate fdcheck_assert_close;

use ndarray::{Array2, Array3, ArrayView3};

pub use crate::config::{ModelConfig, DescriptorConfig, FittingNetConfig};
pub use crate::sample::{make_sample, Sample, Frame};
pub use crate::construct::{build_model, DescriptorModel};
pub use crate::yaml::YamlRead;

pub mod config;
pub mod presets;
mod network;
mod env;
mod descriptor;
mod sample;
mod construct;
mod yaml;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("inconsistent input: {0}")]
    ShapeMismatch(String),

    #[error("atom type {found} is out of range for a type map of {num_types} types")]
    UnknownType { found: usize, num_types: usize },

    #[error("the dpa2 descriptor needs explicit `rcut` and `sel` to draw a sample")]
    MissingSampleCutoff,

    #[error("bad model config: {0}")]
    BadConfig(String),

    #[error(transparent)]
    Structure(#[from] fdcheck_structure::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Output of a batched evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput {
    /// Shape `(nframes, 1)`.
    pub energy: Array2<f64>,
    /// Shape `(nframes, natoms, 3)`.
    pub force: Array3<f64>,
    /// Shape `(nframes, 3, 3)`.
    pub virial: Array3<f64>,
}

/// An energy model that can be evaluated on a batch of periodic frames.
///
/// All frames in a batch share the same atom types.
pub trait EnergyModel: Send + Sync {
    fn type_map(&self) -> &[String];

    /// `coords` has shape `(nframes, natoms, 3)`, `cells` has shape `(nframes, 3, 3)`
    /// with lattice vectors as rows, and `atype` has length `natoms`.
    fn evaluate(
        &self,
        coords: ArrayView3<'_, f64>,
        cells: ArrayView3<'_, f64>,
        atype: &[usize],
    ) -> Result<BatchOutput>;
}
