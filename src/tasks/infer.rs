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

use ndarray::{Array2, ArrayView2, Axis};

use fdcheck_model::EnergyModel;

use crate::{Error, Result};

/// Model outputs for a single structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub energy: f64,
    /// Shape `(natoms, 3)`.
    pub force: Array2<f64>,
    /// Shape `(3, 3)`.
    pub virial: Array2<f64>,
}

/// Evaluate a model on one structure by wrapping it as a batch of one frame.
pub fn infer(
    model: &dyn EnergyModel,
    coord: ArrayView2<'_, f64>,
    cell: ArrayView2<'_, f64>,
    atype: &[usize],
) -> Result<Inference> {
    let out = model.evaluate(coord.insert_axis(Axis(0)), cell.insert_axis(Axis(0)), atype)?;

    let natoms = coord.nrows();
    let check = |what: &str, found: &[usize], expected: &[usize]| match found == expected {
        true => Ok(()),
        false => Err(Error::BadOutput(format!("{}: expected {:?}, got {:?}", what, expected, found))),
    };
    check("energy", out.energy.shape(), &[1, 1])?;
    check("force", out.force.shape(), &[1, natoms, 3])?;
    check("virial", out.virial.shape(), &[1, 3, 3])?;

    trace!("evaluated {} atoms: energy = {}", natoms, out.energy[(0, 0)]);
    Ok(Inference {
        energy: out.energy[(0, 0)],
        force: out.force.index_axis_move(Axis(0), 0),
        virial: out.virial.index_axis_move(Axis(0), 0),
    })
}
