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

//! Finite-difference verification of the forces and virials reported by
//! energy models of periodic structures.
//!
//! The work is split across the workspace:
//!
//! * `fdcheck-numerical` differentiates array-valued functions.
//! * `fdcheck-structure` holds lattices, cell stretching and neighbor search.
//! * `fdcheck-model` builds descriptor models from configs and samples.
//! * `fdcheck-tasks` runs the checks.

pub use fdcheck_tasks::{
    check_force, check_virial, verify, infer,
    CheckReport, CheckSettings, Inference, Quantity, Error, Result,
};

pub use fdcheck_model as model;
pub use fdcheck_structure as structure;
pub use fdcheck_numerical as numerical;
