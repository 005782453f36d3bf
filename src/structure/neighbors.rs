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

use ndarray::ArrayView2;

use crate::{Lattice, Result, Error, V3};

/// A directed interaction between a site and some periodic image of another.
///
/// The image is chosen such that:
///
/// ```text
/// cart_vector == carts[to] - carts[from] + image_diff * lattice
/// ```
///
/// Any change to the positions or the lattice invalidates `cart_vector`,
/// but `(from, to, image_diff)` stays meaningful so long as the atoms do not
/// move far enough to change which images are in range.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Neighbor {
    /// Source atom of this edge.
    pub from: usize,
    /// Target atom of this edge.
    pub to: usize,
    /// Determines which ghost of `to` is interacting with `from`.
    pub image_diff: [i32; 3],
    pub cart_vector: V3,
    pub distance: f64,
}

/// Every `(from, to, image)` whose cartesian separation is strictly less than `cutoff`.
///
/// Self-interactions are included for nonzero images (small cells interact with
/// their own ghosts). Output is sorted by `from`, and within that by `to`.
///
/// This is a brute force search over all pairs. For each pair, the range of images
/// is bounded using the reciprocal vector norms, so no image within range is ever
/// missed regardless of how skewed the cell is.
pub fn neighbors_within(
    carts: ArrayView2<'_, f64>,
    lattice: &Lattice,
    cutoff: f64,
) -> Result<Vec<Neighbor>> {
    if carts.ncols() != 3 {
        return Err(Error::BadShape {
            what: "coordinates",
            expected: vec![carts.nrows(), 3],
            found: carts.shape().to_vec(),
        });
    }
    let fracs = lattice.carts_to_fracs(carts);
    let recip_norms = lattice.recip_norms();
    let vecs = lattice.vectors();

    let mut out = vec![];
    for from in 0..carts.nrows() {
        for to in 0..carts.nrows() {
            let frac_diff: V3 = [
                fracs[[to, 0]] - fracs[[from, 0]],
                fracs[[to, 1]] - fracs[[from, 1]],
                fracs[[to, 2]] - fracs[[from, 2]],
            ];
            // |frac_diff[k] + n[k]| <= cutoff * recip_norms[k]
            let range = |k: usize| {
                let reach = cutoff * recip_norms[k];
                let lo = (-reach - frac_diff[k]).floor() as i32;
                let hi = (reach - frac_diff[k]).ceil() as i32;
                lo..=hi
            };

            for (a, b, c) in iproduct!(range(0), range(1), range(2)) {
                if from == to && (a, b, c) == (0, 0, 0) {
                    continue;
                }
                let image = [a as f64, b as f64, c as f64];
                let mut cart_vector = [0.0; 3];
                for (k, x) in cart_vector.iter_mut().enumerate() {
                    *x = carts[[to, k]] - carts[[from, k]]
                        + image[0] * vecs[0][k]
                        + image[1] * vecs[1][k]
                        + image[2] * vecs[2][k];
                }
                let distance = cart_vector.iter().map(|x| x * x).sum::<f64>().sqrt();
                if distance < cutoff {
                    out.push(Neighbor { from, to, image_diff: [a, b, c], cart_vector, distance });
                }
            }
        }
    }
    trace!("found {} neighbors within {} for {} sites", out.len(), cutoff, carts.nrows());
    Ok(out)
}
