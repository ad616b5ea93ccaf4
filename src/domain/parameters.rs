// ============================================================
// Layer 3 — Parameter Set
// ============================================================
// Named numeric arrays restored from a checkpoint file.
// Stored row-major as f32 with an explicit shape so this
// layer stays free of ndarray/burn types; each worker copies
// the values into its own device-resident tensors.

use std::collections::BTreeMap;

use crate::domain::errors::EvalError;

/// One dense array, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamArray {
    pub shape:  Vec<usize>,
    pub values: Vec<f32>,
}

impl ParamArray {
    /// Build an array, checking that `values` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Result<Self, String> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(format!(
                "shape {:?} needs {} values, got {}",
                shape,
                expected,
                values.len()
            ));
        }
        Ok(Self { shape, values })
    }

    /// Number of elements.
    pub fn numel(&self) -> usize {
        self.values.len()
    }

    /// The shape as `[rows, cols]` if the array is a matrix.
    pub fn dims2(&self) -> Option<[usize; 2]> {
        match self.shape.as_slice() {
            &[rows, cols] => Some([rows, cols]),
            _ => None,
        }
    }
}

/// All parameters of one checkpoint, keyed by name.
/// Immutable after loading; `origin` names the file for error messages.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    origin: String,
    arrays: BTreeMap<String, ParamArray>,
}

impl ParameterSet {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            arrays: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, array: ParamArray) {
        self.arrays.insert(name.into(), array);
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn get(&self, name: &str) -> Option<&ParamArray> {
        self.arrays.get(name)
    }

    /// Fetch an array the cost function cannot do without.
    pub fn require(&self, name: &str) -> Result<&ParamArray, EvalError> {
        self.get(name).ok_or_else(|| {
            EvalError::model_load(&self.origin, format!("missing parameter '{name}'"))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}
