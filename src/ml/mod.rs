// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model, optimisation and training-loop code.
//
//   model.rs     — transformer encoder + relation head
//                  • token and position embeddings
//                  • optional relative-position embeddings
//                  • pre-norm self-attention blocks
//                  • cls / mention-pooling / entity-start heads
//
//   scheduler.rs — linear warmup/decay learning-rate schedule
//
//   step.rs      — one batch: forward, backward, gradient
//                  accumulation, optimizer + schedule step
//
//   epoch.rs     — one TRAIN pass and one EVAL pass
//
//   trainer.rs   — the epoch loop: checkpoints, metrics, plots
//
//   evaluator.rs — best_model of a finished run on any split
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Transformer encoder relation classifier
pub mod model;

/// Learning-rate schedules
pub mod scheduler;

/// Single training step and run counters
pub mod step;

/// Train and eval passes over one stream
pub mod epoch;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Reloads best_model and scores a split
pub mod evaluator;

#[cfg(test)]
pub(crate) mod fixtures;
