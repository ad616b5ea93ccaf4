// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The worker pool never knows how a cost is computed. It only
// sees these two traits:
//
//   CostFunctionBuilder — shared by every worker (Send + Sync);
//                         checks the parameters once on the
//                         coordinator, then turns parameters +
//                         options + a device into a ready-to-run
//                         cost function.
//   CostFunction        — built inside the worker thread that
//                         owns the device and never leaves it,
//                         so it does not have to be Send.
//
// Implementations:
//   - ml::model::BurnCostBuilder → forward pass with burn
//   - test doubles in the application/infra tests
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::{
    batch::Batch,
    device::ComputeDevice,
    options::ModelOptions,
    errors::EvalError,
    parameters::ParameterSet,
};

// ─── CostFunction ─────────────────────────────────────────────────────────────
/// A compiled, deterministic scalar cost over one batch.
/// Must not mutate any shared state.
pub trait CostFunction {
    fn cost(&self, batch: &Batch) -> Result<f64>;
}

// ─── CostFunctionBuilder ──────────────────────────────────────────────────────
/// Builds one cost function per worker, bound to that worker's device.
pub trait CostFunctionBuilder: Send + Sync + 'static {
    /// Check that `params` holds every array `build` needs, with the
    /// right shapes. Runs on the coordinator before any worker exists,
    /// so a bad checkpoint is a `ModelLoad` error and not a worker
    /// failure.
    fn validate(&self, _params: &ParameterSet, _options: &ModelOptions) -> Result<(), EvalError> {
        Ok(())
    }

    fn build(
        &self,
        params:  &ParameterSet,
        options: &ModelOptions,
        device:  ComputeDevice,
    ) -> Result<Box<dyn CostFunction>>;
}
