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

use ndarray::Array2;
use rand::Rng;
use fdcheck_structure::{Lattice, CellStyle};
use fdcheck_structure::random::{random_cell, random_carts};

use crate::{ModelConfig, Result};

/// A periodic structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub lattice: Lattice,
    /// Shape `(natoms, 3)`.
    pub carts: Array2<f64>,
    pub atype: Vec<usize>,
}

/// Structures from which a model computes its environment statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub frames: Vec<Frame>,
}

const NUM_FRAMES: usize = 4;

/// Draw random frames suitable for computing environment statistics.
///
/// Every type in the type map appears in every frame. Cells have a diagonal
/// at least as long as the sampling cutoff, and hold about as many atoms as
/// would put `sel / 2` neighbors inside the cutoff sphere.
pub fn make_sample<R: Rng + ?Sized>(config: &ModelConfig, rng: &mut R) -> Result<Sample> {
    let (rcut, sel) = config.descriptor.sample_cutoff()?;
    let num_types = config.num_types();

    let mut frames = vec![];
    for _ in 0..NUM_FRAMES {
        let lattice = random_cell(rng, CellStyle::Plain, rcut);
        let sphere = 4.0 / 3.0 * std::f64::consts::PI * rcut.powi(3);
        let density = 0.5 * sel as f64 / sphere;
        let natoms = ((density * lattice.volume()).round() as usize).max(2 * num_types);

        let carts = random_carts(rng, natoms, &lattice);
        let atype = (0..natoms).map(|i| i % num_types).collect();
        frames.push(Frame { lattice, carts, atype });
    }
    debug!(
        "sample: {} frames of {:?} atoms (rcut = {}, sel = {})",
        frames.len(), frames.iter().map(|f| f.atype.len()).collect::<Vec<_>>(), rcut, sel,
    );
    Ok(Sample { frames })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{presets, DescriptorConfig, Error};
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn every_type_present() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(1);
        let sample = make_sample(&presets::se_e2_a(), &mut rng)?;
        assert_eq!(sample.frames.len(), NUM_FRAMES);
        for frame in &sample.frames {
            assert_eq!(frame.carts.nrows(), frame.atype.len());
            for ty in 0..3 {
                assert!(frame.atype.contains(&ty));
            }
            assert!(frame.lattice.matrix().iter().enumerate().all(|(k, row)| row[k] >= 4.0));
        }
        Ok(())
    }

    #[test]
    fn dpa2_needs_override() {
        let mut rng = StdRng::seed_from_u64(2);
        match make_sample(&presets::dpa2(), &mut rng) {
            Err(Error::MissingSampleCutoff) => {},
            other => panic!("unexpected: {:?}", other),
        }

        let mut config = presets::dpa2();
        if let DescriptorConfig::Dpa2(c) = &mut config.descriptor {
            c.rcut = Some(c.repinit_rcut);
            c.sel = Some(c.repinit_nsel);
        }
        assert!(make_sample(&config, &mut rng).is_ok());
    }

    #[test]
    fn reproducible() -> Result<()> {
        let a = make_sample(&presets::dpa1(), &mut StdRng::seed_from_u64(3))?;
        let b = make_sample(&presets::dpa1(), &mut StdRng::seed_from_u64(3))?;
        assert_eq!(a, b);
        Ok(())
    }
}
