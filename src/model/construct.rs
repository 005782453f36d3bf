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

use ndarray::{s, Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};
use rand::{Rng, SeedableRng, rngs::StdRng};
use fdcheck_structure::{neighbors_within, Lattice};
use fdcheck_util_macros::zip_eq;

use crate::{BatchOutput, EnergyModel, Error, ModelConfig, Result, Sample};
use crate::config::DescriptorConfig;
use crate::descriptor::{self, Block, Embedding, NeighborEnv};
use crate::env::{EnvRow, EnvStatsBuilder};
use crate::network::Mlp;

/// Energy model made of descriptor blocks and a fitting net.
///
/// The energy is a sum of atomic energies. Each atomic energy is the output of
/// a fitting net applied to the concatenated descriptors of the atom (followed
/// by the type embedding of the atom, when the model has one).
#[derive(Debug, Clone)]
pub struct DescriptorModel {
    type_map: Vec<String>,
    blocks: Vec<Block>,
    type_embedding: Option<Array2<f64>>,
    fitting: Fitting,
}

#[derive(Debug, Clone)]
enum Fitting {
    /// One net per center type.
    PerType(Vec<Mlp>),
    /// A single net that sees the center type through the type embedding.
    Shared(Mlp),
}

/// Hyperparameters of a block, before it has statistics.
struct BlockSpec {
    name: &'static str,
    rcut_smth: f64,
    rcut: f64,
    nnei: usize,
    neuron: Vec<usize>,
    axis: usize,
    resnet_dt: bool,
}

/// Build a model with seeded parameters and environment statistics from `sample`.
pub fn build_model(config: &ModelConfig, sample: &Sample) -> Result<Box<dyn EnergyModel>> {
    Ok(Box::new(DescriptorModel::new(config, sample)?))
}

impl DescriptorModel {
    pub fn new(config: &ModelConfig, sample: &Sample) -> Result<Self> {
        config.validate()?;
        let num_types = config.num_types();

        let (specs, tebd_dim, davg_zero) = match &config.descriptor {
            DescriptorConfig::SeE2A(c) => {
                let spec = BlockSpec {
                    name: "se_e2_a",
                    rcut_smth: c.rcut_smth,
                    rcut: c.rcut,
                    nnei: c.sel.iter().sum(),
                    neuron: c.neuron.clone(),
                    axis: c.axis_neuron,
                    resnet_dt: c.resnet_dt,
                };
                (vec![spec], None, false)
            },
            DescriptorConfig::SeAtten(c) => {
                debug!(
                    "se_atten: attention settings (attn = {}, attn_layer = {}) do not affect this model",
                    c.attn, c.attn_layer,
                );
                let spec = BlockSpec {
                    name: "se_atten",
                    rcut_smth: c.rcut_smth,
                    rcut: c.rcut,
                    nnei: c.sel,
                    neuron: c.neuron.clone(),
                    axis: c.axis_neuron,
                    resnet_dt: c.resnet_dt,
                };
                (vec![spec], Some(c.tebd_dim), c.set_davg_zero)
            },
            DescriptorConfig::Dpa2(c) => {
                let repinit = BlockSpec {
                    name: "repinit",
                    rcut_smth: c.repinit_rcut_smth,
                    rcut: c.repinit_rcut,
                    nnei: c.repinit_nsel,
                    neuron: c.repinit_neuron.clone(),
                    axis: c.repinit_axis_neuron,
                    resnet_dt: false,
                };
                let repformer = BlockSpec {
                    name: "repformer",
                    rcut_smth: c.repformer_rcut_smth,
                    rcut: c.repformer_rcut,
                    nnei: c.repformer_nsel,
                    neuron: vec![c.g2_dim, c.g1_dim],
                    axis: c.axis_dim,
                    resnet_dt: false,
                };
                (vec![repinit, repformer], Some(c.tebd_dim), false)
            },
        };

        let mut rng = StdRng::seed_from_u64(descriptor_seed(&config.descriptor));
        let type_embedding = tebd_dim.map(|dim| {
            Array2::from_shape_fn((num_types, dim), |_| rng.gen_range(-1.0..1.0))
        });

        let mut blocks = vec![];
        for spec in specs {
            let embedding = match tebd_dim {
                None => Embedding::PerType({
                    (0..num_types)
                        .map(|_| Mlp::random(&mut rng, 1, &spec.neuron, None, spec.resnet_dt))
                        .collect()
                }),
                Some(dim) => Embedding::Shared({
                    Mlp::random(&mut rng, 1 + dim, &spec.neuron, None, spec.resnet_dt)
                }),
            };
            let stats = env_stats(&spec, num_types, sample, davg_zero)?;
            info!(
                "{}: rcut = {}, rcut_smth = {}, nnei = {}, embedding {:?}, axis {}",
                spec.name, spec.rcut, spec.rcut_smth, spec.nnei, spec.neuron, spec.axis,
            );
            blocks.push(Block {
                rcut_smth: spec.rcut_smth,
                rcut: spec.rcut,
                nnei: spec.nnei,
                axis: spec.axis,
                embedding,
                stats,
            });
        }

        let descriptor_len = blocks.iter().map(Block::descriptor_len).sum::<usize>();
        let fit = &config.fitting_net;
        let mut rng = StdRng::seed_from_u64(fit.seed);
        let fitting = match tebd_dim {
            None => Fitting::PerType({
                (0..num_types)
                    .map(|_| Mlp::random(&mut rng, descriptor_len, &fit.neuron, Some(1), fit.resnet_dt))
                    .collect()
            }),
            Some(dim) => Fitting::Shared({
                Mlp::random(&mut rng, descriptor_len + dim, &fit.neuron, Some(1), fit.resnet_dt)
            }),
        };

        Ok(DescriptorModel {
            type_map: config.type_map.clone(),
            blocks,
            type_embedding,
            fitting,
        })
    }

    fn num_types(&self) -> usize { self.type_map.len() }

    fn check_types(&self, atype: &[usize]) -> Result<()> {
        match atype.iter().find(|&&t| t >= self.num_types()) {
            Some(&found) => Err(Error::UnknownType { found, num_types: self.num_types() }),
            None => Ok(()),
        }
    }

    /// Energy, forces `(natoms, 3)` and virial `(3, 3)` of a single structure.
    pub fn evaluate_frame(
        &self,
        carts: ArrayView2<'_, f64>,
        lattice: &Lattice,
        atype: &[usize],
    ) -> Result<(f64, Array2<f64>, Array2<f64>)> {
        if carts.dim() != (atype.len(), 3) {
            return Err(Error::ShapeMismatch(format!(
                "coordinates of shape {:?} for {} atom types", carts.shape(), atype.len(),
            )));
        }
        self.check_types(atype)?;
        let natoms = atype.len();
        let tebd = self.type_embedding.as_ref().map(|t| t.view());

        // per block, per center atom
        let mut envs = vec![];
        for block in &self.blocks {
            let mut per_atom = vec![vec![]; natoms];
            for n in neighbors_within(carts, lattice, block.rcut)? {
                per_atom[n.from].push(NeighborEnv {
                    to: n.to,
                    to_type: atype[n.to],
                    row: EnvRow::new(n.cart_vector, block.rcut_smth, block.rcut),
                });
            }
            for (i, list) in per_atom.iter().enumerate() {
                if list.len() > block.nnei {
                    debug!("atom {} has {} neighbors, more than the expected {}", i, list.len(), block.nnei);
                }
            }
            envs.push(per_atom);
        }

        let mut energy = 0.0;
        let mut force = Array2::zeros((natoms, 3));
        let mut virial = Array2::zeros((3, 3));
        for i in 0..natoms {
            let center = atype[i];
            let passes: Vec<_> = {
                zip_eq!(&self.blocks, &envs)
                    .map(|(block, env)| block.forward(center, &env[i], tebd))
                    .collect()
            };

            let mut input = vec![];
            for pass in &passes {
                input.extend(descriptor::flatten(&pass.descriptor).iter().cloned());
            }
            let net = match &self.fitting {
                Fitting::PerType(nets) => &nets[center],
                Fitting::Shared(net) => {
                    let tebd = tebd.expect("(BUG) shared fitting without type embedding");
                    input.extend(tebd.row(center).iter().cloned());
                    net
                },
            };
            let (atom_energy, g_input) = net.vjp(Array1::from(input).view(), Array1::from_elem(1, 1.0).view());
            energy += atom_energy[0];

            let mut offset = 0;
            for (block, env, pass) in zip_eq!(&self.blocks, &envs, &passes) {
                let len = block.descriptor_len();
                let g_descriptor = {
                    Array2::from_shape_vec(
                        (block.width(), block.axis),
                        g_input.slice(s![offset..offset + len]).to_vec(),
                    ).expect("(BUG) descriptor gradient shape")
                };
                offset += len;

                let neighbors = &env[i];
                let grads = block.backward(center, neighbors, pass, g_descriptor.view());
                for (neighbor, g) in zip_eq!(neighbors, grads) {
                    let d = neighbor.row.bond();
                    for a in 0..3 {
                        force[(i, a)] += g[a];
                        force[(neighbor.to, a)] -= g[a];
                        for c in 0..3 {
                            virial[(a, c)] -= g[a] * d[c];
                        }
                    }
                }
            }
        }
        trace!("energy {}", energy);
        Ok((energy, force, virial))
    }
}

impl EnergyModel for DescriptorModel {
    fn type_map(&self) -> &[String] { &self.type_map }

    fn evaluate(
        &self,
        coords: ArrayView3<'_, f64>,
        cells: ArrayView3<'_, f64>,
        atype: &[usize],
    ) -> Result<BatchOutput> {
        let (nframes, natoms, three) = coords.dim();
        if three != 3 || natoms != atype.len() {
            return Err(Error::ShapeMismatch(format!(
                "coordinates of shape {:?} for {} atom types", coords.shape(), atype.len(),
            )));
        }
        if cells.dim() != (nframes, 3, 3) {
            return Err(Error::ShapeMismatch(format!(
                "cells of shape {:?} for {} frames", cells.shape(), nframes,
            )));
        }
        self.check_types(atype)?;

        let mut energy = Array2::zeros((nframes, 1));
        let mut force = Array3::zeros((nframes, natoms, 3));
        let mut virial = Array3::zeros((nframes, 3, 3));
        for frame in 0..nframes {
            let lattice = Lattice::from_array(cells.index_axis(Axis(0), frame))?;
            let carts = coords.index_axis(Axis(0), frame);
            let (e, f, v) = self.evaluate_frame(carts, &lattice, atype)?;
            energy[(frame, 0)] = e;
            force.index_axis_mut(Axis(0), frame).assign(&f);
            virial.index_axis_mut(Axis(0), frame).assign(&v);
        }
        Ok(BatchOutput { energy, force, virial })
    }
}

fn descriptor_seed(config: &DescriptorConfig) -> u64 {
    match config {
        DescriptorConfig::SeE2A(c) => c.seed,
        DescriptorConfig::SeAtten(c) => c.seed,
        DescriptorConfig::Dpa2(c) => c.seed,
    }
}

fn env_stats(
    spec: &BlockSpec,
    num_types: usize,
    sample: &Sample,
    davg_zero: bool,
) -> Result<crate::env::EnvStats> {
    let mut builder = EnvStatsBuilder::new(num_types);
    for frame in &sample.frames {
        if let Some(&found) = frame.atype.iter().find(|&&t| t >= num_types) {
            return Err(Error::UnknownType { found, num_types });
        }
        for n in neighbors_within(frame.carts.view(), &frame.lattice, spec.rcut)? {
            builder.add(frame.atype[n.from], &EnvRow::new(n.cart_vector, spec.rcut_smth, spec.rcut));
        }
    }
    let stats = builder.finish(davg_zero);
    debug!("{}: avg {:?}, std {:?}", spec.name, stats.avg, stats.std);
    Ok(stats)
}
