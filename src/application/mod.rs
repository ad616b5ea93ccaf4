// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: these use cases tell the other
// layers what to do, in which order, and never do the numeric
// work themselves.
//
//   evaluate_use_case.rs — one checkpoint: load, spawn workers,
//                          stream batches, average the costs
//   sweep_use_case.rs    — every checkpoint in a directory, in
//                          modification-time order
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Single-checkpoint evaluation (the coordinator)
pub mod evaluate_use_case;

// Checkpoint directory sweep
pub mod sweep_use_case;
