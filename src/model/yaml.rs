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

use std::io::Read;

use serde::de::DeserializeOwned;

use crate::Result;

/// Read a config from YAML (or JSON, which is also YAML).
///
/// Uses `serde_ignored` to warn on unrecognized keys rather than failing.
pub trait YamlRead: DeserializeOwned {
    fn from_reader(mut r: impl Read) -> Result<Self> {
        let mut s = String::new();
        r.read_to_string(&mut s)?;
        Self::from_yaml_str(&s)
    }

    fn from_yaml_str(s: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(s)?;

        let ignored = serde_ignored::deserialize(
            value,
            |path| warn!("Unused config item (possible typo?): {}", path),
        );
        match ignored {
            Ok(out) => Ok(out),
            Err(_) => {
                // deserializing through a Value loses the location of the error,
                // so produce the error again from the original text
                Ok(serde_yaml::from_str(s)?)
            },
        }
    }
}

impl YamlRead for crate::ModelConfig {}
