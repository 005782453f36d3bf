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

//! Checks that a model's reported forces and virial agree with finite
//! differences of its energy.

#[macro_use] extern crate log;
#[macro_use] extern crate serde;
#[cfg(test)] #[macro_use] extern crate fdcheck_assert_close;

mod logging;
mod infer;
mod settings;
mod check;

pub use crate::logging::{setup_global_logger, init_test_logger, ColorizedLevel};
pub use crate::infer::{infer, Inference};
pub use crate::settings::{CheckSettings, Quantity};
pub use crate::check::{check_force, check_virial, verify, CheckReport};

use fdcheck_assert_close::CheckCloseError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{quantity} disagrees with its finite-difference estimate at {places} places: {detail}")]
    Mismatch {
        quantity: Quantity,
        places: i32,
        detail: CheckCloseError,
    },

    #[error("model output has the wrong shape: {0}")]
    BadOutput(String),

    #[error(transparent)]
    Model(#[from] fdcheck_model::Error),

    #[error(transparent)]
    Structure(#[from] fdcheck_structure::Error),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error("could not install logger: {0}")]
    Logger(#[from] log::SetLoggerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
