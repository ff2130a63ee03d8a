// ============================================================
// Layer 5 — Step Executor
// ============================================================
// One training batch:
//
//   1. batch → device, validate shapes
//   2. forward → logits → mean cross-entropy
//   3. backward, add gradients to the accumulator
//   4. every A-th batch of the epoch: optimizer step at the
//      schedule's rate, schedule step, clear the accumulator
//
// All counters live in TrainingState, which the caller owns and
// passes in explicitly. Over an epoch of B batches the optimizer
// steps exactly floor(B / A) times.

use burn::{
    optim::{GradientsAccumulator, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
    LearningRate,
};

use crate::data::batcher::RelationBatch;
use crate::domain::error::TrainError;
use crate::ml::{model::RelationClassifier, scheduler::LrSchedule};

/// Progress counters of one training run. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrainingState {
    /// Batches processed since the start of the run
    pub global_step: usize,
    /// Current epoch, 1-based once training starts
    pub epoch: usize,
    /// Batches processed in the current epoch
    pub batch_in_epoch: usize,
    /// Batches accumulated since the last optimizer step, in [0, A)
    pub accumulation_counter: usize,
    /// Optimizer steps applied since the start of the run
    pub optimizer_steps: usize,
}

impl TrainingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
        self.batch_in_epoch = 0;
        self.accumulation_counter = 0;
    }

    /// Count one processed batch. Returns true when this batch closes an
    /// accumulation group, i.e. `(batch_in_epoch + 1) % A == 0`.
    pub fn record_batch(&mut self, grad_acc_steps: usize) -> bool {
        self.batch_in_epoch += 1;
        self.global_step += 1;
        self.accumulation_counter += 1;

        if self.accumulation_counter == grad_acc_steps {
            self.accumulation_counter = 0;
            self.optimizer_steps += 1;
            true
        } else {
            false
        }
    }
}

pub struct StepExecutor<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<RelationClassifier<B>, B>,
{
    optim:          O,
    scheduler:      Option<Box<dyn LrSchedule>>,
    accumulator:    GradientsAccumulator<RelationClassifier<B>>,
    grad_acc_steps: usize,
    base_lr:        LearningRate,
}

impl<B, O> StepExecutor<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<RelationClassifier<B>, B>,
{
    pub fn new(
        optim:          O,
        scheduler:      Option<Box<dyn LrSchedule>>,
        grad_acc_steps: usize,
        base_lr:        LearningRate,
    ) -> Self {
        Self {
            optim,
            scheduler,
            accumulator: GradientsAccumulator::new(),
            grad_acc_steps: grad_acc_steps.max(1),
            base_lr,
        }
    }

    /// Learning rate the next optimizer step will use
    pub fn current_lr(&self) -> LearningRate {
        self.scheduler.as_ref().map_or(self.base_lr, |s| s.lr())
    }

    /// Run one batch. Returns the updated model and the batch's scalar loss,
    /// whether or not an optimizer step happened.
    pub fn step(
        &mut self,
        model:  RelationClassifier<B>,
        batch:  RelationBatch<B>,
        state:  &mut TrainingState,
        device: &B::Device,
    ) -> Result<(RelationClassifier<B>, f64), TrainError> {
        let batch = batch.to_device(device);
        batch.validate()?;

        let output = model.forward_classification(batch)?;
        let loss_val: f64 = output.loss.clone().into_scalar().elem::<f64>();
        if !loss_val.is_finite() {
            return Err(TrainError::NonFiniteLoss {
                epoch: state.epoch,
                step:  state.global_step,
                loss:  loss_val,
            });
        }

        let grads = output.loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        self.accumulator.accumulate::<B>(&model, grads);

        if !state.record_batch(self.grad_acc_steps) {
            return Ok((model, loss_val));
        }

        let lr    = self.current_lr();
        let grads = self.accumulator.grads();
        let model = self.optim.step(lr, model, grads);
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.step();
        }
        Ok((model, loss_val))
    }

    /// Drop gradients left over from an incomplete accumulation group.
    pub fn discard_pending(&mut self) {
        let _ = self.accumulator.grads();
    }
}
