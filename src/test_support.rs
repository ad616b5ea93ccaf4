// Shared fixtures for the unit tests: stub cost functions that need
// no device, and helpers that lay out a small model directory.

use anyhow::{anyhow, Result};
use ndarray::arr1;
use ndarray_npy::NpzWriter;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use crate::domain::{
    batch::Batch,
    device::ComputeDevice,
    errors::EvalError,
    options::ModelOptions,
    parameters::{ParamArray, ParameterSet},
    traits::{CostFunction, CostFunctionBuilder},
};

pub fn stub_options() -> ModelOptions {
    ModelOptions::from_json(r#"{"maxlen": 10, "n_words_source": 0, "n_words_target": 0, "characters": false}"#)
        .unwrap()
}

/// Parameters holding a single `score` scalar the stub adds to every cost.
pub fn stub_params(score: f32) -> ParameterSet {
    let mut p = ParameterSet::new("stub");
    p.insert("score", ParamArray::new(vec![1], vec![score]).unwrap());
    p
}

/// A batch of `n` one-token sentence pairs.
pub fn batch_of(n: usize) -> Batch {
    Batch {
        n_samples:   n,
        source_len:  2,
        target_len:  2,
        source_ids:  [2, 0].repeat(n),
        source_mask: vec![1.0; 2 * n],
        target_ids:  [2, 0].repeat(n),
        target_mask: vec![1.0; 2 * n],
    }
}

// ─── Stub cost functions ──────────────────────────────────────────────────────
/// cost = score + sum of target ids, so results depend on both the
/// checkpoint and the batch contents.
#[derive(Default)]
pub struct StubBuilder;

struct StubCost {
    score: f64,
}

impl CostFunction for StubCost {
    fn cost(&self, batch: &Batch) -> Result<f64> {
        let ids: i64 = batch.target_ids.iter().sum();
        Ok(self.score + ids as f64 / 2.0)
    }
}

impl CostFunctionBuilder for StubBuilder {
    fn validate(&self, params: &ParameterSet, _: &ModelOptions) -> Result<(), EvalError> {
        params.require("score").map(|_| ())
    }

    fn build(&self, params: &ParameterSet, _: &ModelOptions, _: ComputeDevice) -> Result<Box<dyn CostFunction>> {
        let score = params.require("score")?.values[0] as f64;
        Ok(Box::new(StubCost { score }))
    }
}

pub struct FailingBuilder;

impl CostFunctionBuilder for FailingBuilder {
    fn build(&self, _: &ParameterSet, _: &ModelOptions, device: ComputeDevice) -> Result<Box<dyn CostFunction>> {
        Err(anyhow!("device unavailable: {device}"))
    }
}

pub struct PanickingBuilder;

struct PanickingCost;

impl CostFunction for PanickingCost {
    fn cost(&self, _: &Batch) -> Result<f64> {
        panic!("forward pass blew up")
    }
}

impl CostFunctionBuilder for PanickingBuilder {
    fn build(&self, _: &ParameterSet, _: &ModelOptions, _: ComputeDevice) -> Result<Box<dyn CostFunction>> {
        Ok(Box::new(PanickingCost))
    }
}

// ─── On-disk fixtures ─────────────────────────────────────────────────────────
/// Paths of a vocabulary pair and an aligned corpus written by `write_corpus`.
pub struct CorpusFixture {
    pub source_vocab: PathBuf,
    pub target_vocab: PathBuf,
    pub source_file:  PathBuf,
    pub target_file:  PathBuf,
}

/// Writes vocabularies and a corpus of `lines` sentence pairs into `dir`.
pub fn write_corpus(dir: &Path, lines: usize) -> CorpusFixture {
    let fixture = CorpusFixture {
        source_vocab: dir.join("vocab.src.json"),
        target_vocab: dir.join("vocab.tgt.json"),
        source_file:  dir.join("dev.src"),
        target_file:  dir.join("dev.tgt"),
    };
    fs::write(&fixture.source_vocab, r#"{"eos": 0, "UNK": 1, "a": 2, "b": 3, "c": 4}"#).unwrap();
    fs::write(&fixture.target_vocab, r#"{"eos": 0, "UNK": 1, "x": 2, "y": 3, "z": 4}"#).unwrap();

    let src_words = ["a", "b c", "c a b", "b"];
    let tgt_words = ["x y", "z", "y y x", "x z"];
    let mut src = String::new();
    let mut tgt = String::new();
    for i in 0..lines {
        src.push_str(src_words[i % src_words.len()]);
        src.push('\n');
        tgt.push_str(tgt_words[i % tgt_words.len()]);
        tgt.push('\n');
    }
    fs::write(&fixture.source_file, src).unwrap();
    fs::write(&fixture.target_file, tgt).unwrap();
    fixture
}

/// Writes an options file matching the fixture vocabularies.
pub fn write_options(path: &Path) {
    fs::write(
        path,
        r#"{"maxlen": 10, "n_words_source": 5, "n_words_target": 5, "characters": false, "dim_word": 4}"#,
    )
    .unwrap();
}

/// Writes a checkpoint whose only array is the stub's `score`.
pub fn write_stub_checkpoint(path: &Path, score: f32) {
    let mut npz = NpzWriter::new(File::create(path).unwrap());
    npz.add_array("score", &arr1(&[score])).unwrap();
    npz.finish().unwrap();
}
