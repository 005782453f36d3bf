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

//! Utilities for numeric differentiation.
//!
//! These exist to produce a model-agnostic estimate of a derivative, which can
//! then be compared against whatever a potential claims its derivative to be.

#[macro_use] extern crate log;

use ndarray::{Array, ArrayD, Dimension, IxDyn};

/// Approximation method for a numerical derivative.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DerivativeKind {
    /// n-point stencil. `n` must be odd. Only implemented for `n = 3, 5, 7, 9`.
    Stencil(u32),
}

impl DerivativeKind {
    /// Alias for `DerivativeKind::Stencil(3)`.
    #[allow(bad_style)]
    pub const CentralDifference: Self = DerivativeKind::Stencil(3);
}

impl Default for DerivativeKind {
    fn default() -> DerivativeKind {
        DerivativeKind::CentralDifference
    }
}

enum Never {}

/// Offsets (in units of the step) and their weights. The weighted sum is
/// divided by `denom * step`.
struct Stencil {
    terms: &'static [(f64, f64)],
    denom: f64,
}

// http://www.holoborodko.com/pavel/numerical-methods/numerical-derivative/central-differences/
fn first_derivative_stencil(kind: DerivativeKind) -> Stencil {
    match kind {
        DerivativeKind::Stencil(3) => Stencil {
            terms: &[(-1.0, -1.0), (1.0, 1.0)],
            denom: 2.0,
        },
        DerivativeKind::Stencil(5) => Stencil {
            terms: &[(-2.0, 1.0), (-1.0, -8.0), (1.0, 8.0), (2.0, -1.0)],
            denom: 12.0,
        },
        DerivativeKind::Stencil(7) => Stencil {
            terms: &[
                (-3.0, -1.0), (-2.0, 9.0), (-1.0, -45.0),
                (1.0, 45.0), (2.0, -9.0), (3.0, 1.0),
            ],
            denom: 60.0,
        },
        DerivativeKind::Stencil(9) => Stencil {
            terms: &[
                (-4.0, 3.0), (-3.0, -32.0), (-2.0, 168.0), (-1.0, -672.0),
                (1.0, 672.0), (2.0, -168.0), (3.0, 32.0), (4.0, -3.0),
            ],
            denom: 840.0,
        },

        DerivativeKind::Stencil(n@0) |
        DerivativeKind::Stencil(n@1) |
        DerivativeKind::Stencil(n) if n % 2 == 0 => {
            panic!("{}-point stencil does not exist", n);
        },

        DerivativeKind::Stencil(n) => {
            panic!("{}-point stencil is not implemented", n);
        },
    }
}

/// Compute a numerical derivative of a scalar function using finite differences.
pub fn slope(
    step: f64,
    kind: DerivativeKind,
    point: f64,
    mut value_fn: impl FnMut(f64) -> f64,
) -> f64 {
    try_slope::<Never, _>(step, kind, point, |x| Ok(value_fn(x)))
        .unwrap_or_else(|e| match e {})
}

/// `slope` for functions that can fail.
pub fn try_slope<E, F>(
    step: f64,
    kind: DerivativeKind,
    point: f64,
    mut value_fn: F,
) -> Result<f64, E>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    let Stencil { terms, denom } = first_derivative_stencil(kind);
    let mut numer = 0.0;
    for &(offset, coeff) in terms {
        numer += coeff * value_fn(point + offset * step)?;
    }
    Ok(numer / (denom * step))
}

/// Numerically compute the Jacobian of an array-valued function.
///
/// For an input of shape `S_in` and an output of shape `S_out`, the result has
/// shape `S_out ++ S_in`; element `[o.., i..]` approximates `d out[o..] / d in[i..]`.
///
/// Every element of the input is displaced independently (on a copy; `point`
/// itself is never touched), so the number of function calls is one (to learn
/// the output shape) plus the stencil size times the number of input elements.
/// This might be prohibitively expensive!!
///
/// An input with no elements produces an empty result of the correct shape.
pub fn jacobian<D, Do>(
    step: f64,
    kind: DerivativeKind,
    point: &Array<f64, D>,
    mut value_fn: impl FnMut(&Array<f64, D>) -> Array<f64, Do>,
) -> ArrayD<f64>
where
    D: Dimension,
    Do: Dimension,
{
    try_jacobian::<_, _, Never, _>(step, kind, point, |x| Ok(value_fn(x)))
        .unwrap_or_else(|e| match e {})
}

/// `jacobian` for functions that can fail.
///
/// The first error produced by `value_fn` is returned unmodified.
///
/// # Panics
///
/// Panics if `value_fn` does not produce the same output shape on every call.
pub fn try_jacobian<D, Do, E, F>(
    step: f64,
    kind: DerivativeKind,
    point: &Array<f64, D>,
    mut value_fn: F,
) -> Result<ArrayD<f64>, E>
where
    D: Dimension,
    Do: Dimension,
    F: FnMut(&Array<f64, D>) -> Result<Array<f64, Do>, E>,
{
    let Stencil { terms, denom } = first_derivative_stencil(kind);

    // a C-order copy lets us address input elements by their row-major position
    let center = point.as_standard_layout().into_owned();
    let in_shape = center.shape().to_vec();
    let in_len = center.len();

    let out_shape = value_fn(&center)?.shape().to_vec();
    let out_len = out_shape.iter().product::<usize>();
    trace!("jacobian: {:?} -> {:?} ({}-point stencil)", in_shape, out_shape, terms.len() + 1);

    // output axes come first, so (o, i) lives at o * in_len + i
    let mut data = vec![0.0; out_len * in_len];
    let mut numer = vec![0.0; out_len];
    for i in 0..in_len {
        for x in &mut numer { *x = 0.0; }

        for &(offset, coeff) in terms {
            let mut displaced = center.clone();
            let flat = displaced.as_slice_mut().expect("(BUG) not c-order!!");
            flat[i] += offset * step;

            let value = value_fn(&displaced)?;
            assert_eq!(
                value.shape(), &out_shape[..],
                "function output changed shape between evaluations",
            );
            for (acc, y) in numer.iter_mut().zip(value.iter()) {
                *acc += coeff * y;
            }
        }

        for (o, &acc) in numer.iter().enumerate() {
            data[o * in_len + i] = acc / (denom * step);
        }
    }

    let full_shape = out_shape.iter().chain(&in_shape).cloned().collect::<Vec<_>>();
    Ok(ArrayD::from_shape_vec(IxDyn(&full_shape), data).expect("(BUG) jacobian shape"))
}

//---------------------------------------------------------
