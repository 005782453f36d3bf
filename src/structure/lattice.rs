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

use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use slice_of_array::prelude::*;
use fdcheck_assert_close::{CheckClose, Tolerances, CheckCloseError};

use crate::{Error, Result};

pub type V3 = [f64; 3];
pub type M33 = [[f64; 3]; 3];

/// Defines a vector basis for periodic boundary conditions in three dimensions.
///
/// The rows of the matrix are the lattice vectors. Coordinates are row vectors
/// throughout, so that `cart = frac · matrix` and `frac = cart · inverse`.
///
/// Construction never checks for singularity. A degenerate matrix produces a
/// non-finite inverse, and everything derived from it is garbage.
#[derive(Debug, Clone)]
pub struct Lattice {
    matrix: Arc<M33>,
    inverse: Arc<M33>,
}

// Manual impl that doesn't compare the inverse.
impl PartialEq<Lattice> for Lattice {
    fn eq(&self, other: &Lattice) -> bool {
        // deconstruct to get errors when new fields are added
        let Lattice { ref matrix, inverse: _ } = *self;
        matrix == &other.matrix
    }
}

impl Lattice {
    /// Create a lattice from a matrix where the rows are lattice vectors.
    #[inline]
    pub fn new(matrix: &M33) -> Self {
        let inverse = Arc::new(inv(matrix));
        let matrix = Arc::new(*matrix);
        Self { matrix, inverse }
    }

    /// Create a lattice from a `(3, 3)` array whose rows are lattice vectors.
    pub fn from_array(matrix: ArrayView2<'_, f64>) -> Result<Self> {
        if matrix.shape() != [3, 3] {
            return Err(Error::BadShape {
                what: "lattice matrix",
                expected: vec![3, 3],
                found: matrix.shape().to_vec(),
            });
        }
        let mut m = [[0.0; 3]; 3];
        for ((r, c), &x) in matrix.indexed_iter() {
            m[r][c] = x;
        }
        Ok(Lattice::new(&m))
    }

    /// Matrix where lattice vectors are rows.
    #[inline]
    pub fn matrix(&self) -> &M33
    { &self.matrix }

    /// Get the (precomputed) inverse of the matrix where lattice vectors are rows.
    #[inline]
    pub fn inverse_matrix(&self) -> &M33
    { &self.inverse }

    #[inline]
    pub fn vectors(&self) -> &[V3; 3]
    { &self.matrix }

    pub fn to_array(&self) -> Array2<f64>
    { m33_to_array(self.matrix()) }

    pub fn inverse_array(&self) -> Array2<f64>
    { m33_to_array(self.inverse_matrix()) }

    /// Signed determinant of the matrix.
    pub fn det(&self) -> f64
    { det(self.matrix()) }

    /// Get the (positive) volume of the lattice cell.
    pub fn volume(&self) -> f64
    { self.det().abs() }

    /// Norms of the columns of the inverse matrix.
    ///
    /// For any cartesian displacement `d`, fractional component `k` of `d`
    /// is bounded in magnitude by `|d| * recip_norms()[k]`. (these are the
    /// lengths of the reciprocal vectors, without the 2 PI)
    pub fn recip_norms(&self) -> [f64; 3] {
        let inv = self.inverse_matrix();
        let col = |k: usize| norm(&[inv[0][k], inv[1][k], inv[2][k]]);
        [col(0), col(1), col(2)]
    }

    /// Convert cartesian row vectors (shape `(n, 3)`) to fractional.
    pub fn carts_to_fracs(&self, carts: ArrayView2<'_, f64>) -> Array2<f64>
    { carts.dot(&self.inverse_array()) }

    /// Convert fractional row vectors (shape `(n, 3)`) to cartesian.
    pub fn fracs_to_carts(&self, fracs: ArrayView2<'_, f64>) -> Array2<f64>
    { fracs.dot(&self.to_array()) }
}

/// Helper constructors
impl Lattice {
    /// The identity lattice.
    #[inline]
    pub fn eye() -> Self { Self::cubic(1.0) }

    #[inline]
    pub fn diagonal(&[x, y, z]: &[f64; 3]) -> Self { Self::orthorhombic(x, y, z) }

    /// A cubic lattice ((a, a, a), (90, 90, 90))
    #[inline]
    pub fn cubic(a: f64) -> Self { Self::orthorhombic(a, a, a) }

    /// An orthorhombic lattice ((a, b, c), (90, 90, 90))
    #[inline]
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Self
    { Self::from(&[[a, 0., 0.], [0., b, 0.], [0., 0., c]]) }
}

impl<'a> From<&'a M33> for Lattice {
    #[inline(always)]
    fn from(m: &'a M33) -> Self
    { Lattice::new(m) }
}

impl CheckClose for Lattice {
    fn check_close(&self, other: &Lattice, tol: Tolerances) -> std::result::Result<(), CheckCloseError> {
        self.matrix().check_close(other.matrix(), tol)
    }
}

//---------------------------------------------------------

fn m33_to_array(m: &M33) -> Array2<f64> {
    Array2::from_shape_vec((3, 3), m.flat().to_vec()).expect("(BUG) 3x3 is 9 elements")
}

fn norm(v: &V3) -> f64
{ (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt() }

fn det(m: &M33) -> f64 {
    let [
        [a0, a1, a2],
        [b0, b1, b2],
        [c0, c1, c2],
    ] = *m;

    0.0
    + a0 * b1 * c2
    + a1 * b2 * c0
    + a2 * b0 * c1
    - a0 * b2 * c1
    - a1 * b0 * c2
    - a2 * b1 * c0
}

fn inv(m: &M33) -> M33 {
    let mut cofactors = [[0.0; 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            cofactors[r][c] = 0.0
                + m[(r+1) % 3][(c+1) % 3] * m[(r+2) % 3][(c+2) % 3]
                - m[(r+1) % 3][(c+2) % 3] * m[(r+2) % 3][(c+1) % 3];
        }
    }
    let det = (0..3).map(|k| m[0][k] * cofactors[0][k]).sum::<f64>();
    let rdet = 1.0 / det;

    let mut out = [[0.0; 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            out[r][c] = rdet * cofactors[c][r];
        }
    }
    out
}

#[cfg(test)]
#[deny(unused)]
mod tests {
    use super::*;
    use fdcheck_assert_close::assert_close;
    use ndarray::arr2;

    #[test]
    fn get_inverse() {
        // matrix whose inverse should be able to be computed exactly
        // by any reasonable matrix inversion algorithm working on f64s
        let matrix = [
            [2.0, 2.0, 0.0],
            [0.0, 4.0, 0.0],
            [0.0, 0.0, 2.0],
        ];
        let exact_inverse = [
            [0.5, -0.25, 0.0],
            [0.0,  0.25, 0.0],
            [0.0,   0.0, 0.5],
        ];

        let lattice = Lattice::new(&matrix);
        assert_eq!(&matrix, lattice.matrix());
        assert_eq!(&exact_inverse, lattice.inverse_matrix());
        assert_eq!(lattice.volume(), 16.0);
        assert_ne!(&Lattice::eye(), &lattice);
    }

    #[test]
    fn inverse_of_skewed_cell() {
        let lattice = Lattice::from(&[
            [5.3, 0.2, 0.7],
            [0.1, 5.9, 0.4],
            [0.6, 0.8, 5.1],
        ]);
        let product = lattice.to_array().dot(&lattice.inverse_array());
        assert_close!(abs=1e-14, product, Array2::<f64>::eye(3));
    }

    #[test]
    fn singular_is_not_finite() {
        let lattice = Lattice::from(&[
            [1.0, 2.0, 3.0],
            [2.0, 4.0, 6.0],
            [0.0, 0.0, 1.0],
        ]);
        assert_eq!(lattice.det(), 0.0);
        assert!(lattice.inverse_matrix().iter().flatten().any(|x| !x.is_finite()));
    }

    #[test]
    fn from_array_checks_shape() {
        let ok = Lattice::from_array(arr2(&[[1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 3.0]]).view());
        assert_eq!(ok.unwrap(), Lattice::diagonal(&[1.0, 2.0, 3.0]));

        let bad = Lattice::from_array(arr2(&[[1.0, 0.0], [0.0, 2.0]]).view());
        match bad {
            Err(Error::BadShape { found, .. }) => assert_eq!(found, vec![2, 2]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn fracs_round_trip() {
        let lattice = Lattice::from(&[
            [4.0, 1.0, 0.0],
            [0.5, 6.0, 0.0],
            [0.0, 0.3, 5.0],
        ]);
        let fracs = arr2(&[[0.25, 0.5, 0.75], [0.1, 0.9, 0.0]]);
        let carts = lattice.fracs_to_carts(fracs.view());
        // first row of carts is 0.25 a + 0.5 b + 0.75 c
        assert_close!(abs=1e-14, carts.row(0).to_owned(), ndarray::arr1(&[1.25, 3.475, 3.75]));
        assert_close!(abs=1e-14, lattice.carts_to_fracs(carts.view()), fracs);
    }

    #[test]
    fn recip_norms_bound_fracs() {
        let lattice = Lattice::from(&[
            [4.0, 1.0, 0.0],
            [0.5, 6.0, 0.0],
            [0.0, 0.3, 5.0],
        ]);
        let d = arr2(&[[0.3, -1.7, 2.2]]);
        let len = d.iter().map(|x| x * x).sum::<f64>().sqrt();
        let fracs = lattice.carts_to_fracs(d.view());
        for k in 0..3 {
            assert!(fracs[[0, k]].abs() <= len * lattice.recip_norms()[k]);
        }
    }
}
