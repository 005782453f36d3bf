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

//! Small dense networks with tanh activations and their derivatives.
//!
//! Hidden layers carry a residual connection whenever the widths permit one:
//!
//! * `out == in`: `h' = h + y`
//! * `out == 2 * in`: `h' = (h, h) + y`
//! * otherwise: `h' = y`
//!
//! where `y = tanh(W h + b)`, optionally scaled elementwise by a trainable
//! "timestep" vector (`resnet_dt`).

use ndarray::{s, Array1, Array2, ArrayView1, Zip};
use rand::Rng;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Residual { None, Identity, Doubled }

#[derive(Debug, Clone)]
struct Layer {
    /// Shape `(out, in)`.
    weight: Array2<f64>,
    bias: Array1<f64>,
    timestep: Option<Array1<f64>>,
    activated: bool,
    residual: Residual,
}

#[derive(Debug, Clone)]
pub(crate) struct Mlp {
    layers: Vec<Layer>,
}

impl Layer {
    fn random<R: Rng + ?Sized>(
        rng: &mut R,
        in_dim: usize,
        out_dim: usize,
        activated: bool,
        resnet_dt: bool,
    ) -> Self {
        // uniform with standard deviation 1/sqrt(in + out)
        let reach = (3.0 / (in_dim + out_dim) as f64).sqrt();
        let weight = Array2::from_shape_fn((out_dim, in_dim), |_| rng.gen_range(-reach..reach));
        let bias = Array1::from_shape_fn(out_dim, |_| rng.gen_range(-1.0..1.0));

        let residual = match activated {
            false => Residual::None,
            true if out_dim == in_dim => Residual::Identity,
            true if out_dim == 2 * in_dim => Residual::Doubled,
            true => Residual::None,
        };
        let timestep = match resnet_dt && activated {
            true => Some(Array1::from_shape_fn(out_dim, |_| 0.1 + rng.gen_range(-1e-3..1e-3))),
            false => None,
        };
        Layer { weight, bias, timestep, activated, residual }
    }

    fn in_dim(&self) -> usize { self.weight.ncols() }
    fn out_dim(&self) -> usize { self.weight.nrows() }

    /// Returns the layer output and `y` (the activation, before any timestep).
    fn forward(&self, h: ArrayView1<'_, f64>) -> (Array1<f64>, Array1<f64>) {
        let mut y = self.weight.dot(&h) + &self.bias;
        if self.activated {
            y.mapv_inplace(f64::tanh);
        }
        let mut out = y.clone();
        if let Some(dt) = &self.timestep {
            out *= dt;
        }
        self.add_residual(&mut out, h);
        (out, y)
    }

    /// Given the activation `y` and a tangent `dh` of the input, produce the tangent of the output.
    fn tangent(&self, y: &Array1<f64>, dh: ArrayView1<'_, f64>) -> Array1<f64> {
        let mut dy = self.weight.dot(&dh);
        if self.activated {
            Zip::from(&mut dy).and(y).for_each(|d, &y| *d *= 1.0 - y * y);
        }
        if let Some(dt) = &self.timestep {
            dy *= dt;
        }
        self.add_residual(&mut dy, dh);
        dy
    }

    /// Pull a gradient with respect to the output back to the input.
    fn pullback(&self, y: &Array1<f64>, g_out: ArrayView1<'_, f64>) -> Array1<f64> {
        let mut g_z = g_out.to_owned();
        if let Some(dt) = &self.timestep {
            g_z *= dt;
        }
        if self.activated {
            Zip::from(&mut g_z).and(y).for_each(|g, &y| *g *= 1.0 - y * y);
        }
        let mut g_in = self.weight.t().dot(&g_z);
        let n = self.in_dim();
        match self.residual {
            Residual::None => {},
            Residual::Identity => g_in += &g_out,
            Residual::Doubled => {
                g_in += &g_out.slice(s![..n]);
                g_in += &g_out.slice(s![n..]);
            },
        }
        g_in
    }

    fn add_residual(&self, out: &mut Array1<f64>, h: ArrayView1<'_, f64>) {
        let n = self.in_dim();
        match self.residual {
            Residual::None => {},
            Residual::Identity => *out += &h,
            Residual::Doubled => {
                let mut lo = out.slice_mut(s![..n]);
                lo += &h;
                let mut hi = out.slice_mut(s![n..]);
                hi += &h;
            },
        }
    }
}

impl Mlp {
    /// `tanh` layers with the given widths, followed by a linear layer of
    /// width `linear_out` if one is requested.
    pub(crate) fn random<R: Rng + ?Sized>(
        rng: &mut R,
        in_dim: usize,
        hidden: &[usize],
        linear_out: Option<usize>,
        resnet_dt: bool,
    ) -> Self {
        let mut layers = vec![];
        let mut width = in_dim;
        for &out_dim in hidden {
            layers.push(Layer::random(rng, width, out_dim, true, resnet_dt));
            width = out_dim;
        }
        if let Some(out_dim) = linear_out {
            layers.push(Layer::random(rng, width, out_dim, false, false));
        }
        Mlp { layers }
    }

    pub(crate) fn in_dim(&self) -> usize {
        self.layers.first().map(Layer::in_dim).unwrap_or(0)
    }

    pub(crate) fn out_dim(&self) -> usize {
        self.layers.last().map(Layer::out_dim).unwrap_or_else(|| self.in_dim())
    }

    #[cfg(test)]
    pub(crate) fn forward(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        self.record(x).0
    }

    /// Forward-mode derivative along a single input direction `dx`.
    ///
    /// Returns the output and its derivative along `dx`.
    pub(crate) fn forward_tangent(
        &self,
        x: ArrayView1<'_, f64>,
        dx: ArrayView1<'_, f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        let mut h = x.to_owned();
        let mut dh = dx.to_owned();
        for layer in &self.layers {
            let (out, y) = layer.forward(h.view());
            dh = layer.tangent(&y, dh.view());
            h = out;
        }
        (h, dh)
    }

    /// Reverse-mode derivative.
    ///
    /// Returns the output and the gradient of `g_out · output` with respect to the input.
    pub(crate) fn vjp(
        &self,
        x: ArrayView1<'_, f64>,
        g_out: ArrayView1<'_, f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        let (out, activations) = self.record(x);
        assert_eq!(g_out.len(), out.len(), "(BUG) vjp cotangent has wrong length");

        let mut g = g_out.to_owned();
        for (layer, y) in self.layers.iter().zip(&activations).rev() {
            g = layer.pullback(y, g.view());
        }
        (out, g)
    }

    /// Forward pass, keeping each layer's activation for the backward pass.
    fn record(&self, x: ArrayView1<'_, f64>) -> (Array1<f64>, Vec<Array1<f64>>) {
        let mut activations = vec![];
        let mut h = x.to_owned();
        for layer in &self.layers {
            let (out, y) = layer.forward(h.view());
            activations.push(y);
            h = out;
        }
        (h, activations)
    }
}
