// ============================================================
// Layer 5 — Sentence Cost Model (Burn)
// ============================================================
// Forward pass only: turns a checkpoint's parameter arrays into
// device-resident tensors once, then scores batches.
//
// Parameters read from the checkpoint:
//   Wemb        [n_words_source, dim]   source embeddings
//   Wemb_dec    [n_words_target, dim]   target embeddings
//   ff_logit_W  [dim, n_words_target]   output projection
//   ff_logit_b  [n_words_target]        output bias
//
// Per sentence pair:
//   c    = masked mean of the source embeddings
//   h_t  = tanh(c + E_dec[y_{t-1}])     (zero embedding at t = 0)
//   p_t  = softmax(h_t · W + b)
//   cost = Σ_t mask_t · −log p_t[y_t]
//
// The batch cost is the mean sentence cost.
//
// Devices:
//   ComputeDevice::Cpu    → NdArray backend
//   ComputeDevice::Gpu(n) → Wgpu backend, discrete GPU n
//
// Reference: Burn Book §3 (Building Blocks)
//            Bahdanau et al. (2015), the encoder-decoder cost

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    module::Param,
    prelude::*,
    tensor::{activation, ElementConversion},
};

use crate::data::vocabulary::UNK_ID;
use crate::domain::{
    batch::Batch,
    device::ComputeDevice,
    errors::EvalError,
    options::ModelOptions,
    parameters::{ParamArray, ParameterSet},
    traits::{CostFunction, CostFunctionBuilder},
};

// ─── Builder ──────────────────────────────────────────────────────────────────
/// Builds a SentenceCostModel on the backend matching the device.
#[derive(Debug, Clone, Copy, Default)]
pub struct BurnCostBuilder;

impl CostFunctionBuilder for BurnCostBuilder {
    fn validate(&self, params: &ParameterSet, options: &ModelOptions) -> Result<(), EvalError> {
        ModelShape::check(params, options).map(|_| ())
    }

    fn build(
        &self,
        params:  &ParameterSet,
        options: &ModelOptions,
        device:  ComputeDevice,
    ) -> Result<Box<dyn CostFunction>> {
        match device {
            ComputeDevice::Cpu => Ok(Box::new(SentenceCostModel::<NdArray>::from_params(
                params,
                options,
                &NdArrayDevice::Cpu,
            )?)),
            ComputeDevice::Gpu(n) => Ok(Box::new(SentenceCostModel::<Wgpu>::from_params(
                params,
                options,
                &WgpuDevice::DiscreteGpu(n),
            )?)),
        }
    }
}

// ─── Model ────────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct SentenceCostModel<B: Backend> {
    pub src_embedding: Param<Tensor<B, 2>>,
    pub tgt_embedding: Param<Tensor<B, 2>>,
    pub logit_weight:  Param<Tensor<B, 2>>,
    pub logit_bias:    Param<Tensor<B, 1>>,
    pub n_words_source: usize,
    pub n_words_target: usize,
    pub dim:            usize,
}

/// Sizes read off the checkpoint arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelShape {
    pub n_words_source: usize,
    pub n_words_target: usize,
    pub dim:            usize,
}

impl ModelShape {
    /// Check that every array the model reads is present and that
    /// their shapes agree with each other.
    pub fn check(params: &ParameterSet, options: &ModelOptions) -> Result<Self, EvalError> {
        let origin = params.origin();
        let shape_error = |name: &str, a: &ParamArray, expected: String| {
            EvalError::model_load(
                origin,
                format!("'{name}' has shape {:?}, expected {expected}", a.shape),
            )
        };

        let wemb = params.require("Wemb")?;
        let [n_src, dim] = wemb
            .dims2()
            .ok_or_else(|| shape_error("Wemb", wemb, "a matrix".into()))?;

        let wemb_dec = params.require("Wemb_dec")?;
        let [n_tgt, dim_dec] = wemb_dec
            .dims2()
            .ok_or_else(|| shape_error("Wemb_dec", wemb_dec, "a matrix".into()))?;
        if dim_dec != dim {
            return Err(shape_error("Wemb_dec", wemb_dec, format!("[_, {dim}]")));
        }

        let weight = params.require("ff_logit_W")?;
        if weight.dims2() != Some([dim, n_tgt]) {
            return Err(shape_error("ff_logit_W", weight, format!("[{dim}, {n_tgt}]")));
        }

        let bias = params.require("ff_logit_b")?;
        if bias.numel() != n_tgt {
            return Err(shape_error("ff_logit_b", bias, format!("[{n_tgt}]")));
        }

        if n_src <= UNK_ID as usize || n_tgt <= UNK_ID as usize {
            return Err(EvalError::model_load(origin, "embeddings need at least 2 rows"));
        }

        if let Some(dim_word) = options.get_usize("dim_word") {
            if dim_word != dim {
                tracing::warn!("dim_word={} in options but embeddings have {} columns", dim_word, dim);
            }
        }

        Ok(Self {
            n_words_source: n_src,
            n_words_target: n_tgt,
            dim,
        })
    }
}

impl<B: Backend> SentenceCostModel<B> {
    /// Copy the checkpoint arrays onto `device`, checking their shapes.
    pub fn from_params(
        params:  &ParameterSet,
        options: &ModelOptions,
        device:  &B::Device,
    ) -> Result<Self, EvalError> {
        let ModelShape { n_words_source: n_src, n_words_target: n_tgt, dim } =
            ModelShape::check(params, options)?;

        tracing::debug!("Cost model: n_src={}, n_tgt={}, dim={}", n_src, n_tgt, dim);

        // check() guarantees these arrays exist
        let wemb     = params.require("Wemb")?;
        let wemb_dec = params.require("Wemb_dec")?;
        let weight   = params.require("ff_logit_W")?;
        let bias     = params.require("ff_logit_b")?;

        Ok(Self {
            src_embedding:  Param::from_tensor(matrix(wemb, [n_src, dim], device)),
            tgt_embedding:  Param::from_tensor(matrix(wemb_dec, [n_tgt, dim], device)),
            logit_weight:   Param::from_tensor(matrix(weight, [dim, n_tgt], device)),
            logit_bias:     Param::from_tensor(Tensor::from_data(
                TensorData::new(bias.values.clone(), [n_tgt]),
                device,
            )),
            n_words_source: n_src,
            n_words_target: n_tgt,
            dim,
        })
    }

    /// Mean per-sentence negative log-likelihood of the batch.
    pub fn forward_cost(&self, batch: &Batch) -> f64 {
        let device = self.src_embedding.device();
        let n  = batch.n_samples;
        let ls = batch.source_len;
        let lt = batch.target_len;
        let d  = self.dim;

        // ── Source context: masked mean of embeddings ─────────────────────────
        let x = int_tensor::<B, 1>(clamp_ids(&batch.source_ids, self.n_words_source), [n * ls], &device);
        let x_mask = Tensor::<B, 2>::from_data(TensorData::new(batch.source_mask.clone(), [n, ls]), &device);

        let src_emb = self.src_embedding.val().select(0, x).reshape([n, ls, d]);
        let summed  = (src_emb * x_mask.clone().reshape([n, ls, 1])).sum_dim(1); // [n, 1, d]
        let context = summed / x_mask.sum_dim(1).reshape([n, 1, 1]);

        // ── Decoder inputs: previous target token, zero at t = 0 ──────────────
        let y_ids = clamp_ids(&batch.target_ids, self.n_words_target);
        let (prev_ids, not_first) = shift_right(&y_ids, n, lt);
        let prev = int_tensor::<B, 1>(prev_ids, [n * lt], &device);
        let not_first = Tensor::<B, 3>::from_data(TensorData::new(not_first, [n, lt, 1]), &device);

        let prev_emb = self.tgt_embedding.val().select(0, prev).reshape([n, lt, d]) * not_first;
        let hidden   = activation::tanh(prev_emb + context); // [n, lt, d]

        // ── Output distribution and per-token NLL ─────────────────────────────
        let logits = hidden.reshape([n * lt, d]).matmul(self.logit_weight.val())
            + self.logit_bias.val().unsqueeze::<2>();
        let log_probs = activation::log_softmax(logits, 1);

        let y   = int_tensor::<B, 2>(y_ids, [n * lt, 1], &device);
        let nll = log_probs.gather(1, y).neg().reshape([n, lt]);

        let y_mask = Tensor::<B, 2>::from_data(TensorData::new(batch.target_mask.clone(), [n, lt]), &device);
        let per_sentence = (nll * y_mask).sum_dim(1); // [n, 1]

        per_sentence.mean().into_scalar().elem::<f64>()
    }
}

impl<B: Backend> CostFunction for SentenceCostModel<B> {
    fn cost(&self, batch: &Batch) -> Result<f64> {
        if batch.n_samples == 0 {
            return Err(anyhow::anyhow!("cannot score an empty batch"));
        }
        Ok(self.forward_cost(batch))
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────
fn matrix<B: Backend>(array: &ParamArray, shape: [usize; 2], device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(TensorData::new(array.values.clone(), shape), device)
}

fn int_tensor<B: Backend, const D: usize>(ids: Vec<i64>, shape: [usize; D], device: &B::Device) -> Tensor<B, D, Int> {
    Tensor::from_data(TensorData::new(ids, shape), device)
}

/// Ids outside the embedding table become UNK.
fn clamp_ids(ids: &[i64], rows: usize) -> Vec<i64> {
    ids.iter()
        .map(|&id| if id >= 0 && (id as usize) < rows { id } else { UNK_ID })
        .collect()
}

/// Previous-token ids for every position and a mask that is 0 at
/// the first position of each row (no previous token there).
fn shift_right(ids: &[i64], rows: usize, width: usize) -> (Vec<i64>, Vec<f32>) {
    let mut prev = Vec::with_capacity(rows * width);
    let mut mask = Vec::with_capacity(rows * width);
    for row in ids.chunks(width).take(rows) {
        prev.push(0);
        prev.extend_from_slice(&row[..width - 1]);
        mask.push(0.0);
        mask.resize(mask.len() + width - 1, 1.0);
    }
    (prev, mask)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::{PairBatcher, SentencePair};

    type TestBackend = NdArray;

    fn options() -> ModelOptions {
        ModelOptions::from_json(r#"{"maxlen": 10, "n_words_source": 4, "n_words_target": 5, "characters": false}"#)
            .unwrap()
    }

    /// Parameters whose output projection is scaled by `logit_scale`;
    /// zero gives a uniform output distribution.
    fn params(logit_scale: f32) -> ParameterSet {
        let (n_src, n_tgt, dim) = (4, 5, 3);
        let ramp = |len: usize| (0..len).map(|i| (i as f32 * 0.37).sin()).collect::<Vec<_>>();

        let mut p = ParameterSet::new("test.npz");
        p.insert("Wemb", ParamArray::new(vec![n_src, dim], ramp(n_src * dim)).unwrap());
        p.insert("Wemb_dec", ParamArray::new(vec![n_tgt, dim], ramp(n_tgt * dim)).unwrap());
        p.insert("ff_logit_W", ParamArray::new(vec![dim, n_tgt], ramp(dim * n_tgt).iter().map(|w| w * logit_scale).collect()).unwrap());
        p.insert("ff_logit_b", ParamArray::new(vec![n_tgt], vec![0.0; n_tgt]).unwrap());
        p
    }

    fn batch() -> Batch {
        PairBatcher::new().batch(&[
            SentencePair { source: vec![2, 3], target: vec![4] },
            SentencePair { source: vec![2],    target: vec![2, 3] },
        ])
    }

    fn model(p: &ParameterSet) -> SentenceCostModel<TestBackend> {
        SentenceCostModel::from_params(p, &options(), &NdArrayDevice::Cpu).unwrap()
    }

    #[test]
    fn test_uniform_logits_cost_is_tokens_times_log_vocab() {
        // zero projection: uniform distribution over 5 words
        let cost = model(&params(0.0)).cost(&batch()).unwrap();
        // sentences have 2 and 3 target positions (EOS included)
        let expected = (2.0 + 3.0) / 2.0 * (5.0f64).ln();
        assert!((cost - expected).abs() < 1e-4, "cost {cost} vs {expected}");
    }

    #[test]
    fn test_cost_is_deterministic_and_depends_on_params() {
        let m = model(&params(0.8));
        let a = m.cost(&batch()).unwrap();
        let b = m.cost(&batch()).unwrap();
        assert_eq!(a, b);
        assert!(a.is_finite() && a > 0.0);

        let uniform = model(&params(0.0)).cost(&batch()).unwrap();
        assert!((a - uniform).abs() > 1e-6);
    }

    #[test]
    fn test_builder_builds_cpu_model() {
        let f = BurnCostBuilder.build(&params(0.0), &options(), ComputeDevice::Cpu).unwrap();
        assert!(f.cost(&batch()).unwrap() > 0.0);
    }

    #[test]
    fn test_missing_parameter_is_model_load_error() {
        let mut p = ParameterSet::new("partial.npz");
        p.insert("Wemb", ParamArray::new(vec![4, 3], vec![0.0; 12]).unwrap());
        let err = SentenceCostModel::<TestBackend>::from_params(&p, &options(), &NdArrayDevice::Cpu).unwrap_err();
        assert!(matches!(err, EvalError::ModelLoad { .. }));
    }

    #[test]
    fn test_mismatched_shapes_are_model_load_errors() {
        let mut p = params(0.0);
        p.insert("ff_logit_W", ParamArray::new(vec![5, 3], vec![0.0; 15]).unwrap());
        let err = SentenceCostModel::<TestBackend>::from_params(&p, &options(), &NdArrayDevice::Cpu).unwrap_err();
        assert!(err.to_string().contains("ff_logit_W"));
    }

    #[test]
    fn test_out_of_range_ids_fall_back_to_unk() {
        assert_eq!(clamp_ids(&[0, 3, 4, 9, -1], 4), vec![0, 3, 1, 1, 1]);
    }

    #[test]
    fn test_evaluate_real_checkpoint_on_cpu_workers() {
        use crate::application::evaluate_use_case::{EvalConfig, EvaluateUseCase, ModelFiles};
        use crate::test_support::{write_corpus, write_options};
        use ndarray::{arr1, Array2};
        use ndarray_npy::NpzWriter;
        use std::{fs::File, time::Duration};
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let model = ModelFiles {
            options: dir.path().join("model.json"),
            params:  dir.path().join("model.npz"),
        };
        write_options(&model.options);

        // sized to write_options: 5 words per side, dim_word 4
        let wave = |r: usize, c: usize| Array2::from_shape_fn((r, c), |(i, j)| ((i * c + j) as f32 * 0.3).cos());
        let mut npz = NpzWriter::new(File::create(&model.params).unwrap());
        npz.add_array("Wemb", &wave(5, 4)).unwrap();
        npz.add_array("Wemb_dec", &wave(5, 4)).unwrap();
        npz.add_array("ff_logit_W", &wave(4, 5)).unwrap();
        npz.add_array("ff_logit_b", &arr1(&[0.1f32, 0.0, -0.1, 0.2, 0.0])).unwrap();
        npz.finish().unwrap();

        let corpus = write_corpus(dir.path(), 9);
        let config = |workers: usize| EvalConfig {
            source_vocab:   corpus.source_vocab.clone(),
            target_vocab:   corpus.target_vocab.clone(),
            source_file:    corpus.source_file.clone(),
            target_file:    corpus.target_file.clone(),
            devices:        vec![ComputeDevice::Cpu; workers],
            batch_size:     2,
            result_timeout: Duration::from_secs(60),
        };

        let single = EvaluateUseCase::new(config(1), BurnCostBuilder).evaluate(&model).unwrap();
        let multi  = EvaluateUseCase::new(config(3), BurnCostBuilder).evaluate(&model).unwrap();
        assert!(single.is_finite() && single > 0.0);
        assert!((single - multi).abs() < 1e-6);
    }

    #[test]
    fn test_checkpoint_without_model_arrays_is_model_load_error() {
        use crate::application::evaluate_use_case::{EvalConfig, EvaluateUseCase, ModelFiles};
        use crate::test_support::{write_corpus, write_options, write_stub_checkpoint};
        use std::time::Duration;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let model = ModelFiles {
            options: dir.path().join("model.json"),
            params:  dir.path().join("model.npz"),
        };
        write_options(&model.options);
        // a readable archive that only holds `score`
        write_stub_checkpoint(&model.params, 1.0);

        let corpus = write_corpus(dir.path(), 4);
        let config = EvalConfig {
            source_vocab:   corpus.source_vocab,
            target_vocab:   corpus.target_vocab,
            source_file:    corpus.source_file,
            target_file:    corpus.target_file,
            devices:        vec![ComputeDevice::Cpu; 2],
            batch_size:     2,
            result_timeout: Duration::from_secs(60),
        };

        let err = EvaluateUseCase::new(config, BurnCostBuilder).evaluate(&model).unwrap_err();
        match err.downcast_ref::<EvalError>() {
            Some(EvalError::ModelLoad { reason, .. }) => assert!(reason.contains("Wemb")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_bad_shapes_without_a_device() {
        let mut p = params(0.0);
        p.insert("ff_logit_b", ParamArray::new(vec![3], vec![0.0; 3]).unwrap());
        let err = BurnCostBuilder.validate(&p, &options()).unwrap_err();
        assert!(matches!(err, EvalError::ModelLoad { .. }));

        let shape = ModelShape::check(&params(0.0), &options()).unwrap();
        assert_eq!(shape, ModelShape { n_words_source: 4, n_words_target: 5, dim: 3 });
    }

    #[test]
    fn test_shift_right() {
        let (prev, mask) = shift_right(&[7, 8, 9, 4, 5, 6], 2, 3);
        assert_eq!(prev, vec![0, 7, 8, 0, 4, 5]);
        assert_eq!(mask, vec![0.0, 1.0, 1.0, 0.0, 1.0, 1.0]);
    }
}
