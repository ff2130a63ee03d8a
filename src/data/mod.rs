// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From TACRED JSON files to device-ready tensor batches:
//
//   {split}.json
//       │
//       ▼
//   TacredLoader      → parses and validates RelationExamples
//       │
//       ▼
//   RelationEncoder   → [CLS] tokens [SEP] ids, mask, entity positions
//       │
//       ▼
//   RelationSplit     → encoded samples + gold labels, scores predictions
//       │
//       ▼
//   RelationBatcher   → stacks samples into tensor batches
//       │
//       ▼
//   BatchStream       → shuffled (train) or ordered (eval) batches
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads TACRED-format split files
pub mod loader;

/// Tokenises examples into fixed-length samples
pub mod encoder;

/// Burn Dataset over encoded samples, plus per-split gold labels
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Restartable batch streams over one split
pub mod stream;
