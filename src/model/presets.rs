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

//! Small model configurations for testing.
//!
//! Each call returns a fresh value, so callers may modify theirs freely.

use fdcheck_util_macros::from_json;

use crate::ModelConfig;

pub fn se_e2_a() -> ModelConfig {
    from_json!({
        "type_map": ["O", "H", "B"],
        "descriptor": {
            "type": "se_e2_a",
            "sel": [46, 92, 4],
            "rcut_smth": 0.50,
            "rcut": 4.00,
            "neuron": [25, 50, 100],
            "resnet_dt": false,
            "axis_neuron": 16,
            "seed": 1,
        },
        "fitting_net": {
            "neuron": [24, 24, 24],
            "resnet_dt": true,
            "seed": 1,
        },
    })
}

pub fn dpa1() -> ModelConfig {
    from_json!({
        "type_map": ["O", "H", "B"],
        "descriptor": {
            "type": "se_atten",
            "sel": 40,
            "rcut_smth": 0.5,
            "rcut": 4.0,
            "neuron": [25, 50, 100],
            "axis_neuron": 16,
            "attn": 64,
            "attn_layer": 2,
            "attn_dotr": true,
            "attn_mask": false,
            "set_davg_zero": true,
            "type_one_side": true,
            "tebd_dim": 8,
            "seed": 1,
        },
        "fitting_net": {
            "neuron": [24, 24, 24],
            "resnet_dt": true,
            "seed": 1,
        },
    })
}

pub fn dpa2() -> ModelConfig {
    from_json!({
        "type_map": ["O", "H", "B"],
        "descriptor": {
            "type": "dpa2",
            "repinit_rcut": 6.0,
            "repinit_rcut_smth": 2.0,
            "repinit_nsel": 30,
            "repinit_neuron": [2, 4, 8],
            "repinit_axis_neuron": 4,
            "repformer_rcut": 4.0,
            "repformer_rcut_smth": 3.5,
            "repformer_nsel": 20,
            "repformer_nlayers": 12,
            "g1_dim": 8,
            "g2_dim": 5,
            "axis_dim": 4,
            "tebd_dim": 8,
            "seed": 1,
        },
        "fitting_net": {
            "neuron": [24, 24, 24],
            "resnet_dt": true,
            "seed": 1,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DescriptorConfig;

    #[test]
    fn fresh_copies() {
        let mut a = dpa2();
        if let DescriptorConfig::Dpa2(c) = &mut a.descriptor {
            c.rcut = Some(6.0);
        }
        assert_ne!(a, dpa2());
        assert_eq!(dpa2(), dpa2());
    }

    #[test]
    fn descriptor_kinds() {
        assert!(matches!(se_e2_a().descriptor, DescriptorConfig::SeE2A(_)));
        assert!(matches!(dpa1().descriptor, DescriptorConfig::SeAtten(_)));
        assert!(matches!(dpa2().descriptor, DescriptorConfig::Dpa2(_)));
    }
}
