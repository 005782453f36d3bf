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

//! The checks themselves.
//!
//! Each check draws a random periodic structure, asks the model for the
//! quantity under test, and compares it against a central difference of
//! the model's energy. Forces are `-dE/dx`. The virial is `-(dE/dB)ᵀ · B`,
//! where each perturbed cell `B` carries the atoms along with it.

use ndarray::{arr0, Array0, Array2, Ix2};
use rand::Rng;

use fdcheck_assert_close::{CheckClose, Tolerances};
use fdcheck_model::EnergyModel;
use fdcheck_numerical::{try_jacobian, DerivativeKind};
use fdcheck_structure::{Lattice, stretch_box};
use fdcheck_structure::random::{random_cell, random_carts};

use crate::{infer, CheckSettings, Error, Quantity, Result};

/// A passing comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub quantity: Quantity,
    pub places: i32,
    /// Largest absolute difference between estimate and reported value.
    pub max_abs_error: f64,
    /// Finite-difference estimate.
    pub estimate: Array2<f64>,
    /// What the model reported.
    pub reported: Array2<f64>,
}

/// Check the model's forces on a random structure.
pub fn check_force<R: Rng + ?Sized>(
    model: &dyn EnergyModel,
    settings: &CheckSettings,
    rng: &mut R,
) -> Result<CheckReport> {
    log_settings(Quantity::Force, settings);
    let lattice = random_cell(rng, settings.cell_style, settings.diagonal_bias);
    let carts = random_carts(rng, settings.atom_types.len(), &lattice);
    let cell = lattice.to_array();
    let atype = &settings.atom_types[..];

    let energy = |carts: &Array2<f64>| -> Result<Array0<f64>> {
        Ok(arr0(infer(model, carts.view(), cell.view(), atype)?.energy))
    };
    let gradient = try_jacobian(settings.delta, DerivativeKind::CentralDifference, &carts, energy)?;
    let estimate = -gradient.into_dimensionality::<Ix2>()?;

    let reported = infer(model, carts.view(), cell.view(), atype)?.force;
    compare(Quantity::Force, settings.places, estimate, reported)
}

/// Check the model's virial on a random structure.
pub fn check_virial<R: Rng + ?Sized>(
    model: &dyn EnergyModel,
    settings: &CheckSettings,
    rng: &mut R,
) -> Result<CheckReport> {
    log_settings(Quantity::Virial, settings);
    let lattice = random_cell(rng, settings.cell_style, settings.diagonal_bias);
    let carts = random_carts(rng, settings.atom_types.len(), &lattice);
    let cell = lattice.to_array();
    let atype = &settings.atom_types[..];

    let energy = |new_cell: &Array2<f64>| -> Result<Array0<f64>> {
        let new_lattice = Lattice::from_array(new_cell.view())?;
        let new_carts = stretch_box(carts.view(), &lattice, &new_lattice);
        Ok(arr0(infer(model, new_carts.view(), new_cell.view(), atype)?.energy))
    };
    let gradient = try_jacobian(settings.delta, DerivativeKind::CentralDifference, &cell, energy)?;
    let estimate = -gradient.into_dimensionality::<Ix2>()?.t().dot(&cell);

    let reported = infer(model, carts.view(), cell.view(), atype)?.virial;
    compare(Quantity::Virial, settings.places, estimate, reported)
}

/// Run the check for one quantity.
pub fn verify<R: Rng + ?Sized>(
    quantity: Quantity,
    model: &dyn EnergyModel,
    settings: &CheckSettings,
    rng: &mut R,
) -> Result<CheckReport> {
    match quantity {
        Quantity::Force => check_force(model, settings, rng),
        Quantity::Virial => check_virial(model, settings, rng),
    }
}

fn log_settings(quantity: Quantity, settings: &CheckSettings) {
    info!(
        "{} check: types {:?}, {:?} cell (bias {}), delta = {:e}, {} places",
        quantity, settings.atom_types, settings.cell_style, settings.diagonal_bias,
        settings.delta, settings.places,
    );
}

fn compare(
    quantity: Quantity,
    places: i32,
    estimate: Array2<f64>,
    reported: Array2<f64>,
) -> Result<CheckReport> {
    if let Err(detail) = estimate.check_close(&reported, Tolerances::places(places)) {
        warn!("{} check failed: {}", quantity, detail);
        return Err(Error::Mismatch { quantity, places, detail });
    }

    let max_abs_error = estimate.iter().zip(&reported)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    info!("{} check passed ({} places, max deviation {:.3e})", quantity, places, max_abs_error);
    Ok(CheckReport { quantity, places, max_abs_error, estimate, reported })
}
