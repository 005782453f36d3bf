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

//! Random structures for derivative checks.

use ndarray::Array2;
use rand::Rng;

use crate::Lattice;

/// How the off-diagonal part of a random cell is drawn.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CellStyle {
    /// `R + Rᵀ` for uniform `R`, giving a symmetric matrix. Used for force checks.
    Symmetrized,
    /// Uniform `R` as-is. Used for virial checks.
    Plain,
}

/// A cell whose entries are uniform in `[0, 1)` (or their symmetrized sum),
/// plus `diagonal_bias` on each diagonal element.
///
/// A large enough bias keeps the cell well-conditioned; 5.0 is customary.
pub fn random_cell<R: Rng + ?Sized>(rng: &mut R, style: CellStyle, diagonal_bias: f64) -> Lattice {
    let mut m = [[0.0; 3]; 3];
    for row in &mut m {
        for x in row.iter_mut() {
            *x = rng.gen::<f64>();
        }
    }
    if style == CellStyle::Symmetrized {
        let r = m;
        for i in 0..3 {
            for j in 0..3 {
                m[i][j] = r[i][j] + r[j][i];
            }
        }
    }
    for (k, row) in m.iter_mut().enumerate() {
        row[k] += diagonal_bias;
    }
    trace!("random cell: {:?}", m);
    Lattice::new(&m)
}

/// `n` cartesian positions with fractional coordinates uniform in `[0, 1)`.
pub fn random_carts<R: Rng + ?Sized>(rng: &mut R, n: usize, lattice: &Lattice) -> Array2<f64> {
    let fracs = Array2::from_shape_fn((n, 3), |_| rng.gen::<f64>());
    lattice.fracs_to_carts(fracs.view())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn symmetrized_cell() {
        let mut rng = StdRng::seed_from_u64(1);
        let cell = random_cell(&mut rng, CellStyle::Symmetrized, 5.0);
        let m = cell.matrix();
        for i in 0..3 {
            assert!(5.0 <= m[i][i] && m[i][i] < 7.0);
            for j in 0..3 {
                assert_eq!(m[i][j], m[j][i]);
            }
        }
    }

    #[test]
    fn plain_cell() {
        let mut rng = StdRng::seed_from_u64(2);
        let cell = random_cell(&mut rng, CellStyle::Plain, 5.0);
        let m = cell.matrix();
        for i in 0..3 {
            for j in 0..3 {
                let lo = if i == j { 5.0 } else { 0.0 };
                assert!(lo <= m[i][j] && m[i][j] < lo + 1.0);
            }
        }
        // diagonally dominant, so certainly well away from singular
        assert!(cell.volume() > 8.0);
    }

    #[test]
    fn carts_lie_in_cell() {
        let mut rng = StdRng::seed_from_u64(3);
        let cell = random_cell(&mut rng, CellStyle::Plain, 5.0);
        let carts = random_carts(&mut rng, 20, &cell);
        assert_eq!(carts.shape(), &[20, 3]);
        let fracs = cell.carts_to_fracs(carts.view());
        assert!(fracs.iter().all(|&x| -1e-12 <= x && x < 1.0 + 1e-12));
    }

    #[test]
    fn seeded_is_reproducible() {
        let a = random_cell(&mut StdRng::seed_from_u64(5), CellStyle::Plain, 5.0);
        let b = random_cell(&mut StdRng::seed_from_u64(5), CellStyle::Plain, 5.0);
        assert_eq!(a, b);
    }
}
