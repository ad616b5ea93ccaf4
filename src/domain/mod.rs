// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that describe what the
// evaluator works with. Nothing in here touches the filesystem,
// spawns threads or imports burn.
//
//   options.rs    — ModelOptions (hyperparameters from JSON)
//   parameters.rs — ParameterSet (named arrays from a checkpoint)
//   batch.rs      — one padded mini-batch of sentence pairs
//   device.rs     — ComputeDevice, the opaque backend selector
//   record.rs     — CheckpointRecord, one row of a sweep report
//   errors.rs     — the typed error taxonomy
//   traits.rs     — the cost-function seam the workers depend on
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

pub mod options;

pub mod parameters;

pub mod batch;

pub mod device;

pub mod record;

pub mod errors;

pub mod traits;
