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

#[doc(hidden)]
pub use serde_json as __serde_json;

/// Does `::serde_json::from_value(json!($($arg)*)).unwrap()`
///
/// Why? Because if you're writing a json literal, then you're probably
/// already quite certain that it is valid!
#[macro_export]
macro_rules! from_json {
    ($($arg:tt)*) => {
        $crate::__serde_json::from_value($crate::__serde_json::json!($($arg)*)).unwrap()
    };
}

/// `Iterator::zip`, but panics if the lengths differ.
///
/// Accepts up to four iterables, producing flat tuples.
#[macro_export]
macro_rules! zip_eq {
    ($a:expr $(,)*) => {
        $a.into_iter().map(|a| (a,))
    };
    ($a:expr, $b:expr $(,)*) => {
        $crate::__zip_eq($a, $b)
    };
    ($a:expr, $b:expr, $c:expr $(,)*) => {
        $crate::__zip_eq($crate::__zip_eq($a, $b), $c)
            .map(|((a, b), c)| (a, b, c))
    };
    ($a:expr, $b:expr, $c:expr, $d:expr $(,)*) => {
        $crate::__zip_eq($crate::__zip_eq($crate::__zip_eq($a, $b), $c), $d)
            .map(|(((a, b), c), d)| (a, b, c, d))
    };
}

#[doc(hidden)]
pub fn __zip_eq<As, Bs>(a: As, b: Bs) -> std::iter::Zip<As::IntoIter, Bs::IntoIter>
where
    As: IntoIterator, As::IntoIter: ExactSizeIterator,
    Bs: IntoIterator, Bs::IntoIter: ExactSizeIterator,
{
    let (a, b) = (a.into_iter(), b.into_iter());
    assert_eq!(a.len(), b.len(), "zip_eq: length mismatch");
    a.zip(b)
}

#[cfg(test)]
mod tests {
    #[test]
    fn zip_eq_tuples() {
        let out: Vec<_> = zip_eq!(vec![1, 2], vec!['a', 'b'], vec![0.5, 1.5]).collect();
        assert_eq!(out, vec![(1, 'a', 0.5), (2, 'b', 1.5)]);
    }

    #[test]
    #[should_panic(expected = "length mismatch")]
    fn zip_eq_mismatch() {
        let _ = zip_eq!(vec![1, 2, 3], vec![1, 2]).count();
    }

    #[test]
    fn from_json_struct() {
        let v: Vec<u32> = from_json!([1, 2, 3]);
        assert_eq!(v, vec![1, 2, 3]);
    }
}
