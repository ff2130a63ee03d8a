// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong in a business layer:
//
//   checkpoint.rs      — gzipped MessagePack checkpoints per epoch,
//                        best_model tracking, pruning, and the
//                        run's config.json
//
//   tokenizer_store.rs — loads tokenizer.json, registers the
//                        entity marker tokens when needed
//
//   metrics.rs         — per-epoch metrics history and TSV log
//
//   plot.rs            — loss/F1 curves (feature `plots`)
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving, best tracking and pruning
pub mod checkpoint;

/// Tokenizer loading and entity markers
pub mod tokenizer_store;

/// Epoch metrics history and TSV logger
pub mod metrics;

/// Training curve rendering
pub mod plot;
