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

//! The smooth environment matrix.
//!
//! Each neighbor at bond vector `d` (with `r = |d|`) contributes a row
//!
//! ```text
//! R = (s, s x / r, s y / r, s z / r),    s = sw(r) / r
//! ```
//!
//! where `sw` is 1 inside `rcut_smth`, 0 beyond `rcut`, and a quintic
//! polynomial in between whose first and second derivatives vanish at both ends.

use fdcheck_structure::V3;

/// One row of the environment matrix, along with what is needed to
/// differentiate it with respect to the bond vector.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct EnvRow {
    pub(crate) value: [f64; 4],
    d: V3,
    r: f64,
    // t = sw/r^2, and the radial derivatives of s = sw/r and of t
    t: f64,
    ds_dr: f64,
    dt_dr: f64,
}

impl EnvRow {
    pub(crate) fn new(d: V3, rcut_smth: f64, rcut: f64) -> Self {
        let r = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
        let (sw, dsw) = switch::poly5((rcut, rcut_smth), r);
        let s = sw / r;
        let t = sw / (r * r);
        let ds_dr = dsw / r - sw / (r * r);
        let dt_dr = dsw / (r * r) - 2.0 * sw / (r * r * r);
        let value = [s, t * d[0], t * d[1], t * d[2]];
        EnvRow { value, d, r, t, ds_dr, dt_dr }
    }

    /// The bond vector this row was computed from.
    pub(crate) fn bond(&self) -> V3 { self.d }

    /// Pull a gradient with respect to the row back to the bond vector.
    pub(crate) fn pullback(&self, g: [f64; 4]) -> V3 {
        let EnvRow { d, r, t, ds_dr, dt_dr, .. } = *self;
        let g_dot_d = g[1] * d[0] + g[2] * d[1] + g[3] * d[2];
        let mut out = [0.0; 3];
        for e in 0..3 {
            let unit = d[e] / r;
            out[e] = g[0] * ds_dr * unit + dt_dr * unit * g_dot_d + t * g[e + 1];
        }
        out
    }
}

/// Per-center-type normalization of environment rows.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EnvStats {
    pub(crate) avg: Vec<[f64; 4]>,
    pub(crate) std: Vec<[f64; 4]>,
}

/// Standard deviations are clamped to at least this.
const MIN_STD: f64 = 1e-2;

#[derive(Debug, Default, Copy, Clone)]
struct Moments {
    count: usize,
    sum_r: f64,
    sum_r2: f64,
    sum_a2: f64,
}

/// Collects environment rows per center type to produce `EnvStats`.
#[derive(Debug, Clone)]
pub(crate) struct EnvStatsBuilder {
    moments: Vec<Moments>,
}

impl EnvStatsBuilder {
    pub(crate) fn new(num_types: usize) -> Self {
        EnvStatsBuilder { moments: vec![Moments::default(); num_types] }
    }

    pub(crate) fn add(&mut self, center_type: usize, row: &EnvRow) {
        let m = &mut self.moments[center_type];
        let [r, x, y, z] = row.value;
        m.count += 1;
        m.sum_r += r;
        m.sum_r2 += r * r;
        m.sum_a2 += x * x + y * y + z * z;
    }

    /// The radial component gets its own mean and standard deviation. The angular
    /// components have mean zero by symmetry, and share a standard deviation.
    ///
    /// Types that were never seen as a center keep the identity normalization.
    pub(crate) fn finish(self, davg_zero: bool) -> EnvStats {
        let mut avg = vec![];
        let mut std = vec![];
        for (ty, m) in self.moments.into_iter().enumerate() {
            if m.count == 0 {
                debug!("no environment statistics for type {}", ty);
                avg.push([0.0; 4]);
                std.push([1.0; 4]);
                continue;
            }
            let n = m.count as f64;
            let mean_r = m.sum_r / n;
            let std_r = (m.sum_r2 / n - mean_r * mean_r).max(0.0).sqrt().max(MIN_STD);
            let std_a = (m.sum_a2 / (3.0 * n)).sqrt().max(MIN_STD);
            let mean_r = if davg_zero { 0.0 } else { mean_r };
            avg.push([mean_r, 0.0, 0.0, 0.0]);
            std.push([std_r, std_a, std_a, std_a]);
        }
        EnvStats { avg, std }
    }
}

impl EnvStats {
    /// Divide a row by its standard deviations.
    ///
    /// The mean is not subtracted here, so that a neighbor leaving the cutoff
    /// sphere still contributes a row that smoothly goes to zero.
    pub(crate) fn scale(&self, center_type: usize, row: &[f64; 4]) -> [f64; 4] {
        let std = &self.std[center_type];
        [row[0] / std[0], row[1] / std[1], row[2] / std[2], row[3] / std[3]]
    }

    /// The standardized radial component, as seen by an embedding net.
    pub(crate) fn embedding_input(&self, center_type: usize, radial: f64) -> f64 {
        (radial - self.avg[center_type][0]) / self.std[center_type][0]
    }

    /// Chain a gradient with respect to a scaled row (or the embedding input,
    /// for the radial component) back to the raw row.
    pub(crate) fn pullback(&self, center_type: usize, g: &[f64; 4]) -> [f64; 4] {
        self.scale(center_type, g)
    }
}

pub(crate) mod switch {
    /// Switches from 0 to 1 as x goes from `interval.0` to `interval.1`.
    ///
    /// Returns the value and its derivative.
    pub(crate) fn poly5(interval: (f64, f64), x: f64) -> (f64, f64) {
        super::switch(raw_poly5, interval, x)
    }

    // Solution to:  y[0] = 0;  y'[0] = y''[0] = 0;
    //               y[1] = 1;  y'[1] = y''[1] = 0;
    pub(crate) fn raw_poly5(x: f64) -> (f64, f64) {
        let value = (x*x*x)*(10.0 + x*(-15.0 + x*6.0));
        let d_x = (30.0*x*x)*(1.0 + x*(-2.0 + x));
        (value, d_x)
    }
}

#[inline(always)]
fn switch(
    interpolate: impl FnOnce(f64) -> (f64, f64),
    interval: (f64, f64),
    x: f64,
) -> (f64, f64) {
    match IntervalSide::classify(interval, x) {
        IntervalSide::Left => (0.0, 0.0),
        IntervalSide::Inside => {
            let width = interval.1 - interval.0;
            let alpha = (x - interval.0) / width;
            let (value, d_alpha) = interpolate(alpha);
            (value, d_alpha / width)
        },
        IntervalSide::Right => (1.0, 0.0),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum IntervalSide { Left, Inside, Right }

impl IntervalSide {
    /// Determine if a value is before the beginning or after the end of a directed
    /// interval. (`interval.1 < interval.0` is ok and flips the classifications of ±∞)
    ///
    /// Neither endpoint is considered to lie in the interval.
    #[inline(always)]
    fn classify(interval: (f64, f64), x: f64) -> Self {
        if interval.0 < interval.1 {
            match x {
                x if x <= interval.0 => IntervalSide::Left,
                x if interval.1 <= x => IntervalSide::Right,
                _ => IntervalSide::Inside,
            }
        } else {
            match x {
                x if interval.0 <= x => IntervalSide::Left,
                x if x <= interval.1 => IntervalSide::Right,
                _ => IntervalSide::Inside,
            }
        }
    }
}

#[cfg(test)]
#[deny(unused)]
mod tests {
    use super::*;
    use fdcheck_numerical::{jacobian, slope, DerivativeKind};
    use ndarray::{arr1, Array1};

    #[test]
    fn switch_direction() {
        assert_eq!(switch::poly5((1.5, 2.0), 1.0).0, 0.0);
        assert_eq!(switch::poly5((1.5, 2.0), 2.5).0, 1.0);
        assert_eq!(switch::poly5((2.0, 1.5), 1.0).0, 1.0);
        assert_eq!(switch::poly5((2.0, 1.5), 2.5).0, 0.0);
        assert_close!(switch::poly5((2.0, 1.5), 1.75).0, 0.5);
    }

    #[test]
    fn switch_num_deriv() {
        let interval = (4.0, 0.5);
        for &x in &[0.7, 1.3, 2.25, 3.1, 3.9] {
            let (_, d_x) = switch::poly5(interval, x);
            let expected = slope(1e-4, DerivativeKind::Stencil(5), x, |x| switch::poly5(interval, x).0);
            assert_close!(rel=1e-9, abs=1e-10, d_x, expected);
        }
    }

    #[test]
    fn row_inside_smooth_radius() {
        // sw == 1, so s = 1/r and the angular part is d/r^2
        let row = EnvRow::new([0.0, 0.3, 0.4], 1.0, 4.0);
        assert_close!(abs=1e-15, row.value.to_vec(), vec![2.0, 0.0, 1.2, 1.6]);
    }

    #[test]
    fn row_vanishes_at_cutoff() {
        let row = EnvRow::new([4.0, 0.0, 0.0], 0.5, 4.0);
        assert_eq!(row.value, [0.0; 4]);
        assert_eq!(row.pullback([1.0; 4]), [0.0; 3]);
    }

    #[test]
    fn pullback_matches_numerical() {
        let g = [0.3, -1.1, 0.7, 2.0];
        for &d in &[[0.2, 0.3, -0.1], [1.0, -2.0, 1.5], [2.9, 1.1, -1.7]] {
            let row = EnvRow::new(d, 0.5, 4.0);
            let actual = row.pullback(g);

            let point: Array1<f64> = arr1(&d);
            let expected = jacobian(1e-6, DerivativeKind::Stencil(5), &point, |d| {
                let row = EnvRow::new([d[0], d[1], d[2]], 0.5, 4.0);
                arr1(&[(0..4).map(|k| g[k] * row.value[k]).sum::<f64>()])
            });
            assert_close!(rel=1e-7, abs=1e-8, arr1(&actual), expected.index_axis(ndarray::Axis(0), 0));
        }
    }

    #[test]
    fn stats() {
        let rows = [
            EnvRow::new([1.0, 0.0, 0.0], 2.0, 4.0),
            EnvRow::new([0.0, 2.0, 0.0], 2.0, 4.0),
        ];
        let mut builder = EnvStatsBuilder::new(2);
        for row in &rows {
            builder.add(0, row);
        }
        let stats = builder.clone().finish(false);
        // radial parts are 1.0 and 0.5
        assert_close!(abs=1e-15, stats.avg[0].to_vec(), vec![0.75, 0.0, 0.0, 0.0]);
        assert_close!(abs=1e-15, stats.std[0][0], 0.25);
        // angular parts: (1, 0, 0) and (0, 0.5, 0)
        assert_close!(abs=1e-15, stats.std[0][1], (1.25f64 / 6.0).sqrt());
        // type 1 was never seen
        assert_eq!(stats.std[1], [1.0; 4]);

        let zeroed = builder.finish(true);
        assert_eq!(zeroed.avg[0], [0.0; 4]);
        assert_eq!(zeroed.std, stats.std);

        assert_close!(abs=1e-14, stats.scale(0, &rows[0].value)[0], 4.0);
        assert_close!(abs=1e-14, stats.embedding_input(0, rows[0].value[0]), 1.0);
        let g = stats.pullback(0, &[1.0, 1.0, 0.0, 0.0]);
        assert_close!(abs=1e-14, g[0], 4.0);
    }
}
