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

//! Approximate comparison of floating point data.
//!
//! Two flavors of tolerance are supported:
//!
//! * `rel=` / `abs=`, using the same test as Python's `math.isclose`.
//! * `places=N`, the "equal to N decimal places" test that is customary
//!   for comparing numerical derivatives: `|a - b| < 1.5 * 10^-N`.

use ndarray::{ArrayBase, Data, Dimension};

pub const DEFAULT_NONZERO_TOL: f64 = 1e-9;

#[macro_export]
macro_rules! assert_close {
    ($($t:tt)*) => {$crate::assert_close_impl!{@parsing [$($t)*] [[@rel $crate::DEFAULT_NONZERO_TOL] [@abs 0.0]]}};
}

#[macro_export]
macro_rules! debug_assert_close {
    ($($t:tt)*) => {{
        #[cfg(debug_assertions)] {
            $crate::assert_close!{$($t)*}
        }
    }};
}

/// `assert_almost_eq!(places=N, a, b)`, the same as `assert_close!(places=N, a, b)`.
#[macro_export]
macro_rules! assert_almost_eq {
    (places=$n:expr, $($t:tt)*) => {$crate::assert_close!{places=$n, $($t)*}};
}

#[doc(hidden)]
#[macro_export]
macro_rules! assert_close_impl {
    (@parsing [rel=$tol:expr, $($rest:tt)*] [$($assignment:tt)*]) => {
        $crate::assert_close_impl!(@parsing [$($rest)*] [$($assignment)* [@rel $tol]]);
    };
    (@parsing [abs=$tol:expr, $($rest:tt)*] [$($assignment:tt)*]) => {
        $crate::assert_close_impl!(@parsing [$($rest)*] [$($assignment)* [@abs $tol]]);
    };
    (@parsing [places=$n:expr, $($rest:tt)*] [$($assignment:tt)*]) => {
        $crate::assert_close_impl!(@parsing [$($rest)*] [$($assignment)* [@places $n]]);
    };
    (@parsing [$a:expr, $b:expr $(,)*] $assignments:tt) => {
        $crate::assert_close_impl!(@expand $assignments [@comp $a, $b] [@fmt "not nearly equal!"])
    };
    (@parsing [$a:expr, $b:expr, $($fmt:tt)+] $assignments:tt) => {
        $crate::assert_close_impl!(@expand $assignments [@comp $a, $b] [@fmt $($fmt)+])
    };
    (@expand [$($assignment:tt)*] [@comp $a:expr, $b:expr] [@fmt $($fmt:tt)+] ) => {
        #[allow(unused_mut)]
        #[allow(unused_assignments)]
        {
            let a = $a;
            let b = $b;

            let mut abs: f64;
            let mut rel: f64;
            $(
                $crate::assert_close_impl!{@stmt::assign [abs, rel] $assignment}
            )*

            if let Err(e) = $crate::CheckClose::check_close(&a, &b, $crate::Tolerances { abs, rel }) {
                panic!(
                "{} (tolerances: rel={}, abs={})\n left: {:?}\nright: {:?}\n{}",
                 format!($($fmt)*), rel, abs, a, b, e);
            }
        }
    };
    (@stmt::assign [$abs:ident, $rel:ident] [@abs $tol:expr]) => { $abs = $tol; };
    (@stmt::assign [$abs:ident, $rel:ident] [@rel $tol:expr]) => { $rel = $tol; };
    (@stmt::assign [$abs:ident, $rel:ident] [@places $n:expr]) => {
        let tol = $crate::Tolerances::places($n);
        $abs = tol.abs;
        $rel = tol.rel;
    };
}

#[doc(hidden)]
#[allow(non_snake_case)]
#[inline]
pub fn __is_close(a: f64, b: f64, Tolerances { abs, rel }: Tolerances) -> bool {
    // Implementation from Python 3.5.
    // https://hg.python.org/cpython/file/tip/Modules/mathmodule.c#l1993
    assert!(rel >= 0.0);
    assert!(abs >= 0.0);

    // catch infinities of same sign
    if a == b { return true; }

    // catch infinities of opposite sign, avoiding infinite relative tolerance
    if a.is_infinite() || b.is_infinite() { return false; }

    // case for general values and NaN.
    (a - b).abs() < abs.max(rel * a.abs()).max(rel * b.abs())
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tolerances {
    pub abs: f64,
    pub rel: f64,
}

impl Tolerances {
    /// Absolute tolerance of `1.5 * 10^-places`, no relative tolerance.
    ///
    /// Unlike numpy's `assert_almost_equal`, a NaN is not close to anything,
    /// not even another NaN.
    pub fn places(places: i32) -> Self {
        Tolerances { abs: 1.5 * 10f64.powi(-places), rel: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckCloseError {
    #[error("failed at index {index:?}:\n  left: {left:?}\n right: {right:?}\n   tol: {tol:?}")]
    NotClose {
        /// Position of the first offending element, outermost axis first.
        index: Vec<usize>,
        left: f64,
        right: f64,
        tol: Tolerances,
    },
    #[error("shapes differ: left {left:?}, right {right:?}")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },
}

impl CheckCloseError {
    /// Prefix the reported position with outer indices.
    fn at(self, outer: &[usize]) -> Self {
        match self {
            CheckCloseError::NotClose { index, left, right, tol } => {
                let index = outer.iter().cloned().chain(index).collect();
                CheckCloseError::NotClose { index, left, right, tol }
            },
            e @ CheckCloseError::ShapeMismatch { .. } => e,
        }
    }

    /// Absolute difference of the offending pair, if there is one.
    pub fn abs_diff(&self) -> Option<f64> {
        match *self {
            CheckCloseError::NotClose { left, right, .. } => Some((left - right).abs()),
            CheckCloseError::ShapeMismatch { .. } => None,
        }
    }
}

pub trait CheckClose<Rhs: ?Sized = Self> {
    /// Test that all values of self and other are close.
    fn check_close(&self, other: &Rhs, tol: Tolerances) -> Result<(), CheckCloseError>;
}

impl CheckClose for f64 {
    #[inline]
    fn check_close(&self, other: &Self, tol: Tolerances) -> Result<(), CheckCloseError> {
        if __is_close(*self, *other, tol) {
            Ok(())
        } else {
            Err(CheckCloseError::NotClose { index: vec![], left: *self, right: *other, tol })
        }
    }
}

impl<'a, T: ?Sized + CheckClose> CheckClose for &'a T {
    fn check_close(&self, other: &Self, tol: Tolerances) -> Result<(), CheckCloseError>
    { CheckClose::check_close(*self, *other, tol) }
}

impl<T: CheckClose> CheckClose for [T] {
    fn check_close(&self, other: &Self, tol: Tolerances) -> Result<(), CheckCloseError> {
        if self.len() != other.len() {
            return Err(CheckCloseError::ShapeMismatch {
                left: vec![self.len()],
                right: vec![other.len()],
            });
        }
        for (i, (a, b)) in self.iter().zip(other).enumerate() {
            a.check_close(b, tol).map_err(|e| e.at(&[i]))?;
        }
        Ok(())
    }
}

impl<T: CheckClose> CheckClose for Vec<T> {
    fn check_close(&self, other: &Self, tol: Tolerances) -> Result<(), CheckCloseError>
    { self[..].check_close(&other[..], tol) }
}

impl<T: CheckClose> CheckClose<[T]> for Vec<T> {
    fn check_close(&self, other: &[T], tol: Tolerances) -> Result<(), CheckCloseError>
    { self[..].check_close(other, tol) }
}

impl<T: CheckClose, const N: usize> CheckClose for [T; N] {
    fn check_close(&self, other: &Self, tol: Tolerances) -> Result<(), CheckCloseError>
    { self[..].check_close(&other[..], tol) }
}

/// Elementwise comparison of arrays with equal shapes (dimensionality may differ
/// in type, e.g. `ArrayD` against `Array2`).
impl<S1, S2, D1, D2> CheckClose<ArrayBase<S2, D2>> for ArrayBase<S1, D1>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D1: Dimension,
    D2: Dimension,
{
    fn check_close(&self, other: &ArrayBase<S2, D2>, tol: Tolerances) -> Result<(), CheckCloseError> {
        if self.shape() != other.shape() {
            return Err(CheckCloseError::ShapeMismatch {
                left: self.shape().to_vec(),
                right: other.shape().to_vec(),
            });
        }
        let left = self.view().into_dyn();
        let right = other.view().into_dyn();
        for ((index, a), b) in left.indexed_iter().zip(right.iter()) {
            a.check_close(b, tol).map_err(|e| e.at(index.slice()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[deny(unused)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array2};

    #[test]
    fn macro_output_can_compile() {
        assert_close!(1.0, 1.0);
        assert_close!(abs=1e-8, 1.0, 1.0);
        assert_close!(rel=1e-8, abs=1e-8, 1.0, 1.0);
        assert_close!(places=8, 1.0, 1.0);
        assert_close!(1.0, 1.0,);
        assert_close!(abs=1e-8, 1.0, 1.0,);
        assert_close!(places=8, 1.0, 1.0, "{}", "hello");
        assert_almost_eq!(places=8, 1.0, 1.0 + 1e-9);
        assert_almost_eq!(places=8, 1.0, 1.0, "{}", "hello");
    }

    #[test]
    fn bad_parse_regression() {
        #[derive(Debug)] struct S;
        impl S { fn x(self) -> S { self } }
        impl CheckClose for S {
            fn check_close(&self, _: &S, _: Tolerances) -> Result<(), CheckCloseError> { Ok(()) }
        }
        assert_close!(
            abs=1e-10,
            S.x().x().x(),
            S.x().x().x(),
        );
        debug_assert_close!(
            abs=1e-10,
            S.x().x().x(),
            S.x().x().x(),
        );
        assert_close!(
            abs=1e-10,
            S.x().x().x(),
            S.x().x().x(),
            "{}", "hello",
        );
    }

    #[test]
    #[should_panic]
    fn not_close() {
        assert_close!(abs=0.0, rel=0.0, 1.0, 1.1);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic)]
    fn debug_not_close() {
        debug_assert_close!(abs=0.0, rel=0.0, 1.0, 1.1);
    }

    #[test]
    fn places_boundary() {
        let tol = Tolerances::places(8);
        assert!(1.0f64.check_close(&(1.0 + 1.4e-8), tol).is_ok());
        assert!(1.0f64.check_close(&(1.0 + 1.6e-8), tol).is_err());
        // no relative slack for large values
        assert!(1e6f64.check_close(&(1e6 + 1e-3), tol).is_err());
    }

    #[test]
    fn nan_is_never_close() {
        let tol = Tolerances::places(8);
        assert!(std::f64::NAN.check_close(&std::f64::NAN, tol).is_err());
        assert!(1.0f64.check_close(&std::f64::NAN, tol).is_err());
        assert!(ndarray::arr1(&[0.0, std::f64::NAN]).check_close(&ndarray::arr1(&[0.0, std::f64::NAN]), tol).is_err());
    }

    #[test]
    fn array_reports_index() {
        let a = arr2(&[[0.0, 1.0], [2.0, 3.0]]);
        let mut b = a.clone();
        b[[1, 0]] += 1e-3;
        match a.check_close(&b, Tolerances::places(8)) {
            Err(CheckCloseError::NotClose { index, .. }) => assert_eq!(index, vec![1, 0]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn array_mixed_dimensionality() {
        let a: Array2<f64> = arr2(&[[0.5, 1.5]]);
        let b = a.clone().into_dyn();
        assert_close!(places=8, a, b);
    }

    #[test]
    fn array_shape_mismatch() {
        let a = arr1(&[1.0, 2.0, 3.0]);
        let b = arr2(&[[1.0, 2.0, 3.0]]);
        let err = a.check_close(&b, Tolerances::places(8)).unwrap_err();
        assert_eq!(err, CheckCloseError::ShapeMismatch { left: vec![3], right: vec![1, 3] });
        assert_eq!(err.abs_diff(), None);
    }

    #[test]
    fn nested_slices_report_full_index() {
        let a = vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]];
        let mut b = a.clone();
        b[1][2] = 2.0;
        let err = a.check_close(&b, Tolerances { abs: 1e-12, rel: 0.0 }).unwrap_err();
        match err {
            CheckCloseError::NotClose { ref index, .. } => assert_eq!(index, &vec![1, 2]),
            _ => panic!("{}", err),
        }
        assert_eq!(err.abs_diff(), Some(1.0));
    }
}
