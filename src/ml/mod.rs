// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn framework code lives here. The coordinator only sees
// the CostFunction / CostFunctionBuilder traits from the domain
// layer, so everything above this layer is testable without a
// GPU or a real checkpoint.
//
//   model.rs — the encoder-decoder cost model and the builder
//              that places it on the NdArray or Wgpu backend
//
// Reference: Burn Book §3 (Building Blocks)
//            Bahdanau et al. (2015) Neural Machine Translation
//            by Jointly Learning to Align and Translate

/// Forward-pass cost model and its per-device builder
pub mod model;
