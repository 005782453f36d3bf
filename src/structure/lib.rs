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

//! Periodic cells and the operations on them needed to check derivatives.

#[macro_use] extern crate log;
#[macro_use] extern crate itertools;
#[macro_use] extern crate serde;

pub use crate::lattice::{Lattice, M33, V3};
pub use crate::stretch::{stretch_box, stretch_box_dyn};
pub use crate::neighbors::{neighbors_within, Neighbor};
pub use crate::random::CellStyle;

mod lattice;
mod stretch;
mod neighbors;
pub mod random;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error("{what}: expected shape {expected:?}, found {found:?}")]
    BadShape {
        what: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}
