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

use ndarray::{Array2, ArrayD, ArrayView2};

use crate::{Lattice, Result};

/// Carry cartesian coordinates from one cell into another, keeping every
/// fractional coordinate fixed.
///
/// Computes `old_coords · old_box⁻¹ · new_box` on row vectors of shape `(n, 3)`.
///
/// If the two boxes are identical, the coordinates are returned unchanged
/// (not merely to within rounding).
///
/// `old_box` must be non-singular; this is not checked.
pub fn stretch_box(
    old_coords: ArrayView2<'_, f64>,
    old_box: &Lattice,
    new_box: &Lattice,
) -> Array2<f64> {
    if old_box == new_box {
        return old_coords.to_owned();
    }
    let fracs = old_box.carts_to_fracs(old_coords);
    new_box.fracs_to_carts(fracs.view())
}

/// `stretch_box` for arrays of arbitrary shape.
///
/// The coordinates may have any shape whose size is a multiple of 3 (they
/// are read as rows of 3), and each box any shape with 9 elements (read as a
/// row-major 3x3 matrix). The output has the shape of `old_coords`.
pub fn stretch_box_dyn(
    old_coords: &ArrayD<f64>,
    old_box: &ArrayD<f64>,
    new_box: &ArrayD<f64>,
) -> Result<ArrayD<f64>> {
    let rows = old_coords.len() / 3;
    let coords = old_coords.as_standard_layout().into_owned().into_shape((rows, 3))?;
    let old_box = Lattice::from_array(as_matrix(old_box)?.view())?;
    let new_box = Lattice::from_array(as_matrix(new_box)?.view())?;

    let stretched = stretch_box(coords.view(), &old_box, &new_box);
    Ok(stretched.into_shape(old_coords.raw_dim())?)
}

fn as_matrix(m: &ArrayD<f64>) -> Result<Array2<f64>> {
    Ok(m.as_standard_layout().into_owned().into_shape((3, 3))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{random_cell, random_carts, CellStyle};
    use crate::Error;
    use fdcheck_assert_close::assert_close;
    use ndarray::{Array3, IxDyn};
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn same_box_is_exact_identity() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            let cell = random_cell(&mut rng, CellStyle::Plain, 5.0);
            let carts = random_carts(&mut rng, 5, &cell);
            assert_eq!(stretch_box(carts.view(), &cell, &cell.clone()), carts);
        }
    }

    #[test]
    fn round_trip() {
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..10 {
            let a = random_cell(&mut rng, CellStyle::Plain, 5.0);
            let b = random_cell(&mut rng, CellStyle::Symmetrized, 5.0);
            let carts = random_carts(&mut rng, 5, &a);
            let there = stretch_box(carts.view(), &a, &b);
            let back = stretch_box(there.view(), &b, &a);
            assert_close!(abs=1e-12, back, carts);
        }
    }

    #[test]
    fn fractional_coords_are_preserved() {
        let mut rng = StdRng::seed_from_u64(9);
        let a = random_cell(&mut rng, CellStyle::Plain, 5.0);
        let b = random_cell(&mut rng, CellStyle::Plain, 5.0);
        let carts = random_carts(&mut rng, 4, &a);
        let stretched = stretch_box(carts.view(), &a, &b);
        assert_close!(
            abs=1e-12,
            b.carts_to_fracs(stretched.view()),
            a.carts_to_fracs(carts.view()),
        );
    }

    #[test]
    fn uniform_scaling() {
        let a = Lattice::cubic(2.0);
        let b = Lattice::cubic(3.0);
        let carts = ndarray::arr2(&[[1.0, 0.5, 0.0], [2.0, 2.0, 2.0]]);
        assert_close!(abs=1e-14, stretch_box(carts.view(), &a, &b), &carts * 1.5);
    }

    #[test]
    fn dyn_preserves_shape() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(10);
        let a = random_cell(&mut rng, CellStyle::Plain, 5.0);
        let b = random_cell(&mut rng, CellStyle::Plain, 5.0);
        let carts = random_carts(&mut rng, 4, &a);

        // batched layout, (1, 4, 3), with flat 9-element boxes
        let batched = carts.clone().into_shape((1, 4, 3))?.into_dyn();
        let a_flat = a.to_array().into_shape(9)?.into_dyn();
        let b_flat = b.to_array().into_shape(9)?.into_dyn();

        let out = stretch_box_dyn(&batched, &a_flat, &b_flat)?;
        assert_eq!(out.shape(), &[1, 4, 3]);
        let expected: Array3<f64> = stretch_box(carts.view(), &a, &b).into_shape((1, 4, 3))?;
        assert_close!(abs=1e-14, out, expected);
        Ok(())
    }

    #[test]
    fn dyn_rejects_bad_shapes() {
        let coords = ArrayD::<f64>::zeros(IxDyn(&[4]));
        let cell = Lattice::cubic(2.0).to_array().into_dyn();
        match stretch_box_dyn(&coords, &cell, &cell) {
            Err(Error::Shape(_)) => {},
            other => panic!("unexpected: {:?}", other),
        }

        let coords = ArrayD::<f64>::zeros(IxDyn(&[2, 3]));
        let bad_cell = ArrayD::<f64>::zeros(IxDyn(&[2, 3]));
        assert!(stretch_box_dyn(&coords, &bad_cell, &cell).is_err());
    }
}
