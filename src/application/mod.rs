// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one goal each: a training
// run, or scoring a finished run on a split.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

// The fine-tuning workflow
pub mod train_use_case;

// Test-split evaluation of a finished run
pub mod evaluate_use_case;
