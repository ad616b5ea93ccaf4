// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem or spawns threads:
//
//   checkpoint.rs  — reading model options (.json) and parameters
//                    (.npz), and discovering the checkpoints in a
//                    model directory
//
//   worker_pool.rs — one worker thread per compute device, fed
//                    through a shared task queue and reporting
//                    through a result queue; joined on drop
//
//   report.rs      — the sweep report: tab-separated table on
//                    stdout and an optional CSV file
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Rust Book §16 (Fearless Concurrency)
//            Rust Book §20 (Building a Multithreaded Server)

/// Options, parameters and model-directory discovery
pub mod checkpoint;

/// Device worker threads and the task/result queues
pub mod worker_pool;

/// Sweep report table and CSV
pub mod report;
