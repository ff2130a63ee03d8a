// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing relation extraction:
// what an example is, which labels exist, how predictions are
// scored, and which encoding/pooling methods a run may select.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only plain structs, enums, traits and pure functions

/// Typed failures of the training core
pub mod error;

/// A TACRED-style relation example with subject/object spans
pub mod example;

/// The closed relation label inventory and id ↔ label lookup
pub mod labels;

/// Input encoding, output pooling, optimizer and scheduler selectors
pub mod methods;

/// Micro-averaged precision / recall / F1
pub mod scorer;

/// Core abstractions implemented by the data layer
pub mod traits;
