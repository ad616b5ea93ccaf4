// ============================================================
// Layer 6 — Checkpoint Loading
// ============================================================
// Reads what a training run leaves behind:
//
//   models/
//     model.json                       ← options, one per directory
//     model_epoch_1_update_5000.npz    ← parameters after update 5000
//     model_epoch_2_update_10000.npz
//     ...
//
// .npz files are zip archives of NumPy arrays. ndarray-npy reads
// them; each float array becomes a ParamArray. Integer or other
// non-float entries (training bookkeeping such as `uidx` or
// `history_errs`) are skipped.
//
// Reference: ndarray-npy documentation (NpzReader)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use ndarray::{ArrayD, IxDyn, OwnedRepr};
use ndarray_npy::NpzReader;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use crate::domain::{
    errors::EvalError,
    options::ModelOptions,
    parameters::{ParamArray, ParameterSet},
};

/// Load the model options JSON.
/// Unreadable files and malformed or incomplete JSON are config errors.
pub fn load_options(path: impl AsRef<Path>) -> Result<ModelOptions> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|e| {
        EvalError::Config(format!("cannot read model options '{}': {e}", path.display()))
    })?;

    let options = ModelOptions::from_json(&json)
        .map_err(|e| EvalError::Config(format!("{} ('{}')", e, path.display())))?;

    tracing::debug!(
        "Options: maxlen={}, n_words_source={}, n_words_target={}, characters={}",
        options.maxlen,
        options.n_words_source,
        options.n_words_target,
        options.characters,
    );
    Ok(options)
}

/// Load every float array stored in an .npz checkpoint.
pub fn load_params(path: impl AsRef<Path>) -> Result<ParameterSet> {
    let path   = path.as_ref();
    let origin = path.display().to_string();
    let fail   = |reason: String| EvalError::model_load(&origin, reason);

    let file = File::open(path).map_err(|e| fail(e.to_string()))?;
    let mut npz = NpzReader::new(file).map_err(|e| fail(e.to_string()))?;
    let names = npz.names().map_err(|e| fail(e.to_string()))?;

    let mut params = ParameterSet::new(&origin);
    for name in names {
        let key = name.strip_suffix(".npy").unwrap_or(&name).to_string();

        let array: ArrayD<f32> = match npz.by_name::<OwnedRepr<f32>, IxDyn>(&name) {
            Ok(a) => a,
            Err(_) => match npz.by_name::<OwnedRepr<f64>, IxDyn>(&name) {
                Ok(a) => a.mapv(|v| v as f32),
                Err(e) => {
                    tracing::debug!("Skipping non-float entry '{}' in '{}': {}", key, origin, e);
                    continue;
                }
            },
        };

        let shape  = array.shape().to_vec();
        let values = array.iter().copied().collect();
        let array  = ParamArray::new(shape, values).map_err(|e| fail(format!("'{key}': {e}")))?;
        params.insert(key, array);
    }

    if params.is_empty() {
        return Err(fail("no float arrays found".into()).into());
    }

    tracing::debug!(
        "Loaded {} parameter arrays from '{}': {}",
        params.len(),
        origin,
        params.names().collect::<Vec<_>>().join(", ")
    );
    Ok(params)
}

// ─── Model directory discovery ────────────────────────────────────────────────
/// The checkpoints of one training run plus their shared options file.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDirectory {
    pub options_file: PathBuf,
    /// .npz files, sorted by path
    pub checkpoints:  Vec<PathBuf>,
}

impl ModelDirectory {
    /// List the regular files directly under `dir`.
    ///
    /// Exactly one .json file must be present; none or several is a
    /// config error rather than a guess. Subdirectories are ignored.
    pub fn scan(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let mut checkpoints  = Vec::new();
        let mut option_files = Vec::new();

        for entry in fs::read_dir(dir)
            .with_context(|| format!("Cannot read model directory '{}'", dir.display()))?
        {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            match path.extension().and_then(|e| e.to_str()) {
                Some("npz")  => checkpoints.push(path),
                Some("json") => option_files.push(path),
                _ => {}
            }
        }

        checkpoints.sort();
        option_files.sort();

        let options_file = match option_files.len() {
            1 => option_files.remove(0),
            0 => {
                return Err(EvalError::Config(format!(
                    "no .json options file in '{}'",
                    dir.display()
                ))
                .into())
            }
            _ => {
                return Err(EvalError::Config(format!(
                    "expected one .json options file in '{}', found {}: {:?}",
                    dir.display(),
                    option_files.len(),
                    option_files,
                ))
                .into())
            }
        };

        tracing::info!(
            "Found {} checkpoints in '{}' (options: '{}')",
            checkpoints.len(),
            dir.display(),
            options_file.display()
        );
        Ok(Self { options_file, checkpoints })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array1};
    use ndarray_npy::NpzWriter;
    use tempfile::TempDir;

    fn config_error(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<EvalError>(), Some(EvalError::Config(_)))
    }

    fn model_load_error(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<EvalError>(), Some(EvalError::ModelLoad { .. }))
    }

    #[test]
    fn test_load_params_reads_floats_and_skips_ints() {
        let dir  = TempDir::new().unwrap();
        let path = dir.path().join("model.npz");
        let mut npz = NpzWriter::new(File::create(&path).unwrap());
        npz.add_array("Wemb", &arr2(&[[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]])).unwrap();
        npz.add_array("ff_logit_b", &arr1(&[0.5f64, -0.5])).unwrap();
        npz.add_array("uidx", &Array1::<i64>::from_elem(1, 7)).unwrap();
        npz.finish().unwrap();

        let params = load_params(&path).unwrap();
        assert_eq!(params.len(), 2);

        let wemb = params.get("Wemb").unwrap();
        assert_eq!(wemb.shape, vec![3, 2]);
        assert_eq!(wemb.values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let bias = params.get("ff_logit_b").unwrap();
        assert_eq!(bias.values, vec![0.5, -0.5]);
        assert!(params.get("uidx").is_none());
    }

    #[test]
    fn test_load_params_corrupt_file_is_model_load_error() {
        let dir  = TempDir::new().unwrap();
        let path = dir.path().join("broken.npz");
        fs::write(&path, b"not a zip archive").unwrap();
        assert!(model_load_error(&load_params(&path).unwrap_err()));
    }

    #[test]
    fn test_load_params_missing_file_is_model_load_error() {
        assert!(model_load_error(&load_params("/no/such/model.npz").unwrap_err()));
    }

    #[test]
    fn test_load_options_errors() {
        let dir  = TempDir::new().unwrap();
        let path = dir.path().join("model.json");

        fs::write(&path, r#"{"maxlen": 20}"#).unwrap();
        assert!(config_error(&load_options(&path).unwrap_err()));

        fs::write(
            &path,
            r#"{"maxlen": 20, "n_words_source": 5, "n_words_target": 6, "characters": false}"#,
        )
        .unwrap();
        assert_eq!(load_options(&path).unwrap().maxlen, 20);
    }

    #[test]
    fn test_scan_partitions_files() {
        let dir = TempDir::new().unwrap();
        for name in ["b_epoch_2_update_9.npz", "a_epoch_1_update_3.npz", "model.json", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.npz")).unwrap();

        let md = ModelDirectory::scan(dir.path()).unwrap();
        assert_eq!(md.options_file, dir.path().join("model.json"));
        assert_eq!(
            md.checkpoints,
            vec![
                dir.path().join("a_epoch_1_update_3.npz"),
                dir.path().join("b_epoch_2_update_9.npz"),
            ]
        );
    }

    #[test]
    fn test_scan_requires_exactly_one_options_file() {
        let none = TempDir::new().unwrap();
        fs::write(none.path().join("m.npz"), b"").unwrap();
        assert!(config_error(&ModelDirectory::scan(none.path()).unwrap_err()));

        let two = TempDir::new().unwrap();
        fs::write(two.path().join("a.json"), b"{}").unwrap();
        fs::write(two.path().join("b.json"), b"{}").unwrap();
        assert!(config_error(&ModelDirectory::scan(two.path()).unwrap_err()));
    }
}
