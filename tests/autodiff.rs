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

//! Forces and virials of each preset model, checked against finite differences
//! of its energy.

use rand::{SeedableRng, rngs::StdRng};

use fdcheck_model::{build_model, make_sample, presets, DescriptorConfig, EnergyModel, ModelConfig};
use fdcheck_tasks::{init_test_logger, verify, CheckSettings, Quantity, Result};

fn model_from(config: &ModelConfig, sample_config: &ModelConfig, seed: u64) -> Result<Box<dyn EnergyModel>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let sample = make_sample(sample_config, &mut rng)?;
    Ok(build_model(config, &sample)?)
}

fn se_e2_a_model() -> Result<Box<dyn EnergyModel>> {
    let config = presets::se_e2_a();
    model_from(&config, &config, 10)
}

fn dpa1_model() -> Result<Box<dyn EnergyModel>> {
    let config = presets::dpa1();
    model_from(&config, &config, 20)
}

fn dpa2_model() -> Result<Box<dyn EnergyModel>> {
    let config = presets::dpa2();
    // the sample is drawn for the wider of the two blocks
    let mut sample_config = config.clone();
    match &mut sample_config.descriptor {
        DescriptorConfig::Dpa2(c) => {
            c.rcut = Some(c.repinit_rcut);
            c.sel = Some(c.repinit_nsel);
        },
        other => panic!("dpa2 preset has descriptor {:?}", other),
    }
    model_from(&config, &sample_config, 30)
}

fn run(model: &dyn EnergyModel, quantity: Quantity, seed: u64) -> Result<()> {
    init_test_logger();
    let mut rng = StdRng::seed_from_u64(seed);
    let report = verify(quantity, model, &CheckSettings::for_quantity(quantity), &mut rng)?;
    assert!(report.max_abs_error < 1.5e-8);

    // agreement means little if everything is close to zero
    let largest = report.reported.iter().fold(0.0, |m: f64, x| m.max(x.abs()));
    assert!(largest > 100.0 * 1.5e-8, "{} is too small: {}", quantity, largest);
    Ok(())
}

#[test]
fn se_e2a_force() -> Result<()> { run(&*se_e2_a_model()?, Quantity::Force, 1) }

#[test]
fn se_e2a_virial() -> Result<()> { run(&*se_e2_a_model()?, Quantity::Virial, 2) }

#[test]
fn dpa1_force() -> Result<()> { run(&*dpa1_model()?, Quantity::Force, 3) }

#[test]
fn dpa1_virial() -> Result<()> { run(&*dpa1_model()?, Quantity::Virial, 4) }

#[test]
fn dpa2_force() -> Result<()> { run(&*dpa2_model()?, Quantity::Force, 5) }

#[test]
fn dpa2_virial() -> Result<()> { run(&*dpa2_model()?, Quantity::Virial, 6) }

#[test]
fn repeated_checks_are_identical() -> Result<()> {
    init_test_logger();
    let model = dpa1_model()?;
    let settings = CheckSettings::force();
    let a = verify(Quantity::Force, &*model, &settings, &mut StdRng::seed_from_u64(7))?;
    let b = verify(Quantity::Force, &*model, &settings, &mut StdRng::seed_from_u64(7))?;
    assert_eq!(a.estimate, b.estimate);
    assert_eq!(a.reported, b.reported);
    Ok(())
}
