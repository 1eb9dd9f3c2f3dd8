//! Kernel generation
//!
//! The orchestrator only depends on [`KernelGenerator`]. The bundled
//! [`RandomEinsumGenerator`] draws a fresh einsum kernel per iteration from a
//! seed derived from the campaign seed and the iteration index, so a case can
//! be regenerated from those two numbers regardless of worker scheduling.

use crate::config::GeneratorConfig;
use crate::error::FuzzError;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::path::Path;
use tensure_model::{
    Computation, DataSource, FormatAssignment, FormatLabel, Kernel, TensorData, TensorDescriptor,
};

/// Source of candidate kernels
pub trait KernelGenerator: Send + Sync {
    /// Produce the kernel for `iteration`, writing its input data under `data_dir`
    ///
    /// # Errors
    /// `FuzzError::Generator` or IO failures while writing data
    fn generate(&self, iteration: u64, data_dir: &Path) -> Result<Kernel, FuzzError>;
}

const INDEX_POOL: &[char] = &['i', 'j', 'k', 'l', 'm', 'n', 'o', 'p'];
const OUTPUT_NAME: char = 'A';
const NONZERO_VALUES: std::ops::RangeInclusive<i32> = 1..=9;

/// Seeded random einsum generator
#[derive(Debug, Clone)]
pub struct RandomEinsumGenerator {
    seed: u64,
    config: GeneratorConfig,
}

impl RandomEinsumGenerator {
    #[must_use]
    pub fn new(seed: u64, config: GeneratorConfig) -> Self {
        Self { seed, config }
    }

    fn rng_for(&self, iteration: u64) -> StdRng {
        // splitmix-style mixing keeps neighbouring iterations uncorrelated
        let mut z = self.seed ^ iteration.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        StdRng::seed_from_u64(z ^ (z >> 31))
    }

    /// Build tensor descriptors and the equation, without touching disk
    fn draw_structure(&self, rng: &mut StdRng) -> (Vec<TensorDescriptor>, String) {
        let cfg = &self.config;
        let max_rank = cfg.max_rank.min(INDEX_POOL.len());
        let min_rank = cfg.min_rank.min(max_rank);
        let n_inputs = rng.random_range(2..=cfg.max_inputs.max(2));

        let dims: BTreeMap<char, usize> = INDEX_POOL
            .iter()
            .map(|&c| (c, rng.random_range(1..=cfg.max_dim.max(1))))
            .collect();
        let pool_size = (max_rank + 1).min(INDEX_POOL.len()).max(1);
        let pool = &INDEX_POOL[..pool_size];

        let mut inputs = Vec::with_capacity(n_inputs);
        for n in 0..n_inputs {
            let rank = rng.random_range(min_rank..=max_rank).min(pool.len());
            let idxs: Vec<char> = pool.choose_multiple(rng, rank).copied().collect();
            let name = char::from(b'B' + u8::try_from(n).unwrap_or(0));
            inputs.push(self.descriptor(rng, name, idxs, &dims));
        }

        let mut bound: Vec<char> = Vec::new();
        for t in &inputs {
            for &c in &t.idxs {
                if !bound.contains(&c) {
                    bound.push(c);
                }
            }
        }
        let out_max = max_rank.min(bound.len());
        let out_rank = rng.random_range(min_rank.min(out_max)..=out_max);
        let mut out_idxs: Vec<char> = bound.choose_multiple(rng, out_rank).copied().collect();
        out_idxs.sort_by_key(|c| bound.iter().position(|b| b == c));
        let output = self.descriptor(rng, OUTPUT_NAME, out_idxs, &dims);

        let rhs: Vec<&str> = inputs.iter().map(|t| t.str_repr.as_str()).collect();
        let equation = format!("{} = {}", output.str_repr, rhs.join(" * "));

        let mut tensors = Vec::with_capacity(n_inputs + 1);
        tensors.push(output);
        tensors.extend(inputs);
        (tensors, equation)
    }

    fn descriptor(
        &self,
        rng: &mut StdRng,
        name: char,
        idxs: Vec<char>,
        dims: &BTreeMap<char, usize>,
    ) -> TensorDescriptor {
        let shape = idxs.iter().map(|c| dims.get(c).copied().unwrap_or(1)).collect();
        let labels = idxs
            .iter()
            .map(|_| {
                if rng.random_bool(0.5) {
                    FormatLabel::Dense
                } else {
                    FormatLabel::Sparse
                }
            })
            .collect();
        TensorDescriptor::new(name, idxs, shape, FormatAssignment::new(labels))
    }

    fn draw_data(&self, rng: &mut StdRng, tensor: &TensorDescriptor) -> TensorData {
        let volume: usize = tensor.shape.iter().product();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let target = ((volume as f64) * self.config.density).ceil() as usize;
        let mut data = TensorData::new();
        // bounded number of draws; duplicates simply overwrite
        for _ in 0..target.max(1) {
            let coord = tensor
                .shape
                .iter()
                .map(|&d| i64::try_from(rng.random_range(0..d)).unwrap_or(0))
                .collect();
            let magnitude = f64::from(rng.random_range(NONZERO_VALUES)) / 2.0;
            let value = if rng.random_bool(0.5) { magnitude } else { -magnitude };
            data.insert(coord, value);
        }
        data
    }
}

impl KernelGenerator for RandomEinsumGenerator {
    fn generate(&self, iteration: u64, data_dir: &Path) -> Result<Kernel, FuzzError> {
        let mut rng = self.rng_for(iteration);
        let (tensors, equation) = self.draw_structure(&mut rng);

        let mut sources = Vec::with_capacity(tensors.len());
        sources.push(DataSource::Fresh);
        for tensor in &tensors[1..] {
            // no `.tns` form for scalars; the backend fills them
            if tensor.rank() == 0 {
                sources.push(DataSource::Fresh);
                continue;
            }
            let path = data_dir.join(format!("{}.tns", tensor.name));
            self.draw_data(&mut rng, tensor).write_tns(&path)?;
            sources.push(DataSource::File(path));
        }

        tensure_einsum::validate(&equation)
            .map_err(|e| FuzzError::Generator(format!("produced invalid equation {equation:?}: {e}")))?;
        let kernel = Kernel::from_parts(tensors, vec![Computation::new(equation)], sources)?;
        tracing::debug!(iteration, tensors = kernel.tensors.len(), "kernel generated");
        Ok(kernel)
    }
}
