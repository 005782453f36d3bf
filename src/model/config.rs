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

//! Model configuration.
//!
//! Keys follow the conventional snake_case names of descriptor-based model
//! input files, so that existing configs can be read directly.

use crate::{Error, Result};

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Element names. Atom type `t` refers to `type_map[t]`.
    pub type_map: Vec<String>,
    pub descriptor: DescriptorConfig,
    pub fitting_net: FittingNetConfig,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum DescriptorConfig {
    /// Smooth two-body embedding of the full environment, one embedding net per neighbor type.
    #[serde(rename = "se_e2_a")]
    SeE2A(SeE2AConfig),

    /// Shared embedding net that sees neighbor types through a type embedding.
    #[serde(rename = "se_atten")]
    SeAtten(SeAttenConfig),

    /// Two descriptor blocks with different cutoffs.
    #[serde(rename = "dpa2")]
    Dpa2(Dpa2Config),
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct SeE2AConfig {
    /// Expected maximum neighbor count of each type.
    pub sel: Vec<usize>,
    pub rcut_smth: f64,
    pub rcut: f64,
    pub neuron: Vec<usize>,
    pub axis_neuron: usize,
    #[serde(default)]
    pub resnet_dt: bool,
    #[serde(default = "defaults::seed")]
    pub seed: u64,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct SeAttenConfig {
    /// Expected maximum neighbor count, all types together.
    pub sel: usize,
    pub rcut_smth: f64,
    pub rcut: f64,
    pub neuron: Vec<usize>,
    pub axis_neuron: usize,
    pub tebd_dim: usize,
    #[serde(default)]
    pub resnet_dt: bool,
    // Attention settings. These are recorded but do not change the energy.
    #[serde(default)]
    pub attn: usize,
    #[serde(default)]
    pub attn_layer: usize,
    #[serde(default)]
    pub attn_dotr: bool,
    #[serde(default)]
    pub attn_mask: bool,
    #[serde(default)]
    pub set_davg_zero: bool,
    #[serde(default = "defaults::yes")]
    pub type_one_side: bool,
    #[serde(default = "defaults::seed")]
    pub seed: u64,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct Dpa2Config {
    pub repinit_rcut: f64,
    pub repinit_rcut_smth: f64,
    pub repinit_nsel: usize,
    pub repinit_neuron: Vec<usize>,
    pub repinit_axis_neuron: usize,

    pub repformer_rcut: f64,
    pub repformer_rcut_smth: f64,
    pub repformer_nsel: usize,
    /// Recorded but does not change the energy.
    #[serde(default)]
    pub repformer_nlayers: usize,
    /// Width of the repformer embedding.
    pub g1_dim: usize,
    /// Width of the hidden repformer embedding layer.
    pub g2_dim: usize,
    pub axis_dim: usize,

    pub tebd_dim: usize,
    #[serde(default = "defaults::seed")]
    pub seed: u64,

    /// Cutoff for drawing a sample. Unused by the model itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rcut: Option<f64>,
    /// Neighbor count for drawing a sample. Unused by the model itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sel: Option<usize>,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct FittingNetConfig {
    pub neuron: Vec<usize>,
    #[serde(default)]
    pub resnet_dt: bool,
    #[serde(default = "defaults::seed")]
    pub seed: u64,
}

mod defaults {
    pub(crate) fn seed() -> u64 { 1 }
    pub(crate) fn yes() -> bool { true }
}

impl DescriptorConfig {
    /// Cutoff and expected neighbor count used to draw a sample.
    pub fn sample_cutoff(&self) -> Result<(f64, usize)> {
        match self {
            DescriptorConfig::SeE2A(c) => Ok((c.rcut, c.sel.iter().sum())),
            DescriptorConfig::SeAtten(c) => Ok((c.rcut, c.sel)),
            DescriptorConfig::Dpa2(c) => match (c.rcut, c.sel) {
                (Some(rcut), Some(sel)) => Ok((rcut, sel)),
                _ => Err(Error::MissingSampleCutoff),
            },
        }
    }
}

impl ModelConfig {
    pub fn num_types(&self) -> usize { self.type_map.len() }

    /// Check everything that would otherwise cause a panic deep inside model construction.
    pub fn validate(&self) -> Result<()> {
        fn bad<T>(msg: String) -> Result<T> { Err(Error::BadConfig(msg)) }

        fn check_block(name: &str, rcut_smth: f64, rcut: f64, sel: usize, neuron: &[usize], axis: usize) -> Result<()> {
            if !(0.0 < rcut_smth && rcut_smth < rcut) {
                return bad(format!("{}: need 0 < rcut_smth < rcut (got {} and {})", name, rcut_smth, rcut));
            }
            if sel == 0 {
                return bad(format!("{}: sel must be positive", name));
            }
            match neuron.last() {
                None => bad(format!("{}: embedding net has no layers", name)),
                Some(&width) if axis == 0 || width < axis => {
                    bad(format!("{}: axis size {} must be in 1..={}", name, axis, width))
                },
                Some(_) => Ok(()),
            }
        }

        if self.type_map.is_empty() {
            return bad("type_map is empty".into());
        }
        if self.fitting_net.neuron.iter().any(|&n| n == 0) {
            return bad("fitting_net: zero-width layer".into());
        }
        match &self.descriptor {
            DescriptorConfig::SeE2A(c) => {
                if c.sel.len() != self.num_types() {
                    return bad(format!(
                        "se_e2_a: sel has {} entries for {} types", c.sel.len(), self.num_types(),
                    ));
                }
                check_block("se_e2_a", c.rcut_smth, c.rcut, c.sel.iter().sum(), &c.neuron, c.axis_neuron)
            },
            DescriptorConfig::SeAtten(c) => {
                check_block("se_atten", c.rcut_smth, c.rcut, c.sel, &c.neuron, c.axis_neuron)
            },
            DescriptorConfig::Dpa2(c) => {
                check_block("repinit", c.repinit_rcut_smth, c.repinit_rcut, c.repinit_nsel, &c.repinit_neuron, c.repinit_axis_neuron)?;
                check_block("repformer", c.repformer_rcut_smth, c.repformer_rcut, c.repformer_nsel, &[c.g2_dim, c.g1_dim], c.axis_dim)
            },
        }
    }
}
