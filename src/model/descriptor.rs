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

//! A single descriptor block.
//!
//! For a center atom with environment rows `R_j`, scaled by their standard
//! deviations to `R̂_j`, each neighbor gets an embedding `G_j = G(x_j, type_j)`
//! of width `M`, where `x_j` is the standardized radial component. Then
//!
//! ```text
//! T = (1 / nnei) Σ_j  G_j ⊗ R̂_j          (M x 4)
//! D = T · T[..axis]ᵀ                      (M x axis)
//! ```

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use fdcheck_structure::V3;

use crate::env::{EnvRow, EnvStats};
use crate::network::Mlp;

/// How an embedding net learns the type of a neighbor.
#[derive(Debug, Clone)]
pub(crate) enum Embedding {
    /// One net per neighbor type, each taking only the radial component.
    PerType(Vec<Mlp>),
    /// One net taking the radial component followed by the type embedding
    /// of the neighbor.
    Shared(Mlp),
}

#[derive(Debug, Clone)]
pub(crate) struct Block {
    pub(crate) rcut_smth: f64,
    pub(crate) rcut: f64,
    /// Normalization constant for the sum over neighbors.
    pub(crate) nnei: usize,
    pub(crate) axis: usize,
    pub(crate) embedding: Embedding,
    pub(crate) stats: EnvStats,
}

/// A neighbor as seen by a block.
#[derive(Debug, Clone)]
pub(crate) struct NeighborEnv {
    pub(crate) to: usize,
    pub(crate) to_type: usize,
    pub(crate) row: EnvRow,
}

/// Intermediate values of a forward pass, kept for the backward pass.
pub(crate) struct BlockPass {
    pub(crate) descriptor: Array2<f64>,
    t: Array2<f64>,
    rows: Vec<[f64; 4]>,
    g: Vec<Array1<f64>>,
    dg: Vec<Array1<f64>>,
}

impl Block {
    pub(crate) fn width(&self) -> usize {
        match &self.embedding {
            Embedding::PerType(nets) => nets[0].out_dim(),
            Embedding::Shared(net) => net.out_dim(),
        }
    }

    pub(crate) fn descriptor_len(&self) -> usize { self.width() * self.axis }

    fn embed(
        &self,
        radial: f64,
        to_type: usize,
        type_embedding: Option<ArrayView2<'_, f64>>,
    ) -> (Array1<f64>, Array1<f64>) {
        match &self.embedding {
            Embedding::PerType(nets) => {
                let x = Array1::from_elem(1, radial);
                let dx = Array1::from_elem(1, 1.0);
                nets[to_type].forward_tangent(x.view(), dx.view())
            },
            Embedding::Shared(net) => {
                let tebd = type_embedding.expect("(BUG) shared embedding without type embedding");
                let row = tebd.row(to_type);
                let mut x = Array1::zeros(1 + row.len());
                x[0] = radial;
                x.slice_mut(s![1..]).assign(&row);
                let mut dx = Array1::zeros(x.len());
                dx[0] = 1.0;
                net.forward_tangent(x.view(), dx.view())
            },
        }
    }

    pub(crate) fn forward(
        &self,
        center_type: usize,
        neighbors: &[NeighborEnv],
        type_embedding: Option<ArrayView2<'_, f64>>,
    ) -> BlockPass {
        let width = self.width();
        let scale = 1.0 / self.nnei as f64;

        let mut t = Array2::zeros((width, 4));
        let mut rows = Vec::with_capacity(neighbors.len());
        let mut g = Vec::with_capacity(neighbors.len());
        let mut dg = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            let row = self.stats.scale(center_type, &neighbor.row.value);
            let x = self.stats.embedding_input(center_type, neighbor.row.value[0]);
            let (g_j, dg_j) = self.embed(x, neighbor.to_type, type_embedding);
            for m in 0..width {
                for k in 0..4 {
                    t[(m, k)] += scale * g_j[m] * row[k];
                }
            }
            rows.push(row);
            g.push(g_j);
            dg.push(dg_j);
        }
        let descriptor = t.dot(&t.slice(s![..self.axis, ..]).t());
        BlockPass { descriptor, t, rows, g, dg }
    }

    /// Given the gradient of the energy with respect to the descriptor, produce
    /// the gradient with respect to each neighbor's bond vector.
    pub(crate) fn backward(
        &self,
        center_type: usize,
        neighbors: &[NeighborEnv],
        pass: &BlockPass,
        g_descriptor: ArrayView2<'_, f64>,
    ) -> Vec<V3> {
        let BlockPass { t, rows, g, dg, .. } = pass;
        let width = self.width();
        let scale = 1.0 / self.nnei as f64;

        // D[m][l] = Σ_k T[m][k] T[l][k]  for l < axis
        let mut g_t = g_descriptor.dot(&t.slice(s![..self.axis, ..]));
        {
            let mut head = g_t.slice_mut(s![..self.axis, ..]);
            head += &g_descriptor.t().dot(t);
        }

        let mut out = Vec::with_capacity(neighbors.len());
        for (j, neighbor) in neighbors.iter().enumerate() {
            // T[m][k] += scale * G_j[m] * R̂_j[k]
            let row = &rows[j];
            let mut g_row = [0.0; 4];
            let mut g_radial_via_g = 0.0;
            for m in 0..width {
                let mut g_gm = 0.0;
                for k in 0..4 {
                    g_row[k] += scale * g_t[(m, k)] * g[j][m];
                    g_gm += scale * g_t[(m, k)] * row[k];
                }
                g_radial_via_g += g_gm * dg[j][m];
            }
            // x and R̂[0] both have derivative 1/std[0] with respect to R[0]
            g_row[0] += g_radial_via_g;

            let g_raw = self.stats.pullback(center_type, &g_row);
            out.push(neighbor.row.pullback(g_raw));
        }
        out
    }
}

pub(crate) fn flatten(descriptor: &Array2<f64>) -> ArrayView1<'_, f64> {
    descriptor.as_slice().map(ArrayView1::from).expect("(BUG) not c-order!!")
}

#[cfg(test)]
#[deny(unused)]
mod tests {
    use super::*;
    use crate::env::EnvStatsBuilder;
    use fdcheck_numerical::{jacobian, DerivativeKind};
    use ndarray::{arr1, Array};
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn test_block(rng: &mut StdRng, shared: bool) -> (Block, Option<Array2<f64>>) {
        let tebd = Array2::from_shape_fn((2, 3), |_| rng.gen_range(-1.0..1.0));
        let embedding = match shared {
            true => Embedding::Shared(Mlp::random(rng, 4, &[4, 8], None, false)),
            false => Embedding::PerType(vec![
                Mlp::random(rng, 1, &[4, 8], None, false),
                Mlp::random(rng, 1, &[4, 8], None, false),
            ]),
        };
        let mut stats = EnvStatsBuilder::new(2);
        for _ in 0..10 {
            let d = [rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0)];
            stats.add(0, &EnvRow::new(d, 0.5, 3.0));
        }
        let block = Block {
            rcut_smth: 0.5,
            rcut: 3.0,
            nnei: 6,
            axis: 3,
            embedding,
            stats: stats.finish(false),
        };
        (block, if shared { Some(tebd) } else { None })
    }

    fn neighbors_from(flat: &Array1<f64>, block: &Block) -> Vec<NeighborEnv> {
        flat.as_slice().unwrap().chunks(3).enumerate().map(|(j, d)| {
            NeighborEnv {
                to: j,
                to_type: j % 2,
                row: EnvRow::new([d[0], d[1], d[2]], block.rcut_smth, block.rcut),
            }
        }).collect()
    }

    #[test]
    fn descriptor_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let (block, tebd) = test_block(&mut rng, true);
        let bonds = arr1(&[1.0, 0.5, 0.0, -0.7, 1.2, 0.4]);
        let pass = block.forward(0, &neighbors_from(&bonds, &block), tebd.as_ref().map(|t| t.view()));
        assert_eq!(pass.descriptor.shape(), &[8, 3]);
        assert_eq!(block.descriptor_len(), 24);
        assert_eq!(flatten(&pass.descriptor).len(), 24);

        // no neighbors is no descriptor
        let pass = block.forward(0, &[], tebd.as_ref().map(|t| t.view()));
        assert!(pass.descriptor.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn backward_matches_numerical() {
        let mut rng = StdRng::seed_from_u64(2);
        for &shared in &[false, true] {
            let (block, tebd) = test_block(&mut rng, shared);
            let tebd = tebd.as_ref().map(|t| t.view());
            // one neighbor is inside the smoothing region and one is outside the cutoff
            let bonds = arr1(&[
                1.0, 0.5, 0.0,
                -0.7, 1.2, 0.4,
                0.2, -0.1, 0.3,
                2.0, 1.5, 0.9,
                3.5, 0.0, 0.0,
            ]);
            let weights = Array::from_shape_fn((8, 3), |_| rng.gen_range(-1.0..1.0));

            let neighbors = neighbors_from(&bonds, &block);
            let pass = block.forward(0, &neighbors, tebd);
            let grads = block.backward(0, &neighbors, &pass, weights.view());
            let actual: Vec<f64> = grads.iter().flat_map(|g| g.iter().cloned()).collect();

            let expected = jacobian(1e-6, DerivativeKind::Stencil(5), &bonds, |bonds| {
                let pass = block.forward(0, &neighbors_from(bonds, &block), tebd);
                arr1(&[(&pass.descriptor * &weights).sum()])
            });
            assert_close!(rel=1e-6, abs=1e-8, arr1(&actual), expected.index_axis(ndarray::Axis(0), 0));
        }
    }
}
