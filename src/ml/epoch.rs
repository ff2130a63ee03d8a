// ============================================================
// Layer 5 — Epoch Runner
// ============================================================
// TRAIN: every batch of the shuffled stream goes through the
//        StepExecutor on the autodiff backend.
// EVAL:  model.valid() on the inner backend, ordered stream,
//        no backward pass. Predictions come back in dataset
//        order so they line up with the split's gold labels.
//
// Both passes report sum(batch_loss) / num_examples * batch_size,
// i.e. the mean per-batch loss when every batch is full. A
// non-finite loss in either pass ends the run.

use std::time::Instant;

use burn::{optim::Optimizer, prelude::*, tensor::backend::AutodiffBackend};

use crate::data::stream::BatchStream;
use crate::domain::{error::TrainError, labels::LabelMap};
use crate::ml::{
    model::RelationClassifier,
    step::{StepExecutor, TrainingState},
};

/// When and how to print training progress.
#[derive(Debug, Clone, Copy)]
pub struct StepLog {
    /// Log every `every` global steps; 0 disables progress lines
    pub every:       usize,
    /// Batches over the whole run
    pub total_steps: usize,
    pub num_epoch:   usize,
}

impl StepLog {
    /// Progress is printed for the batch that starts at `global_step`,
    /// so the first batch of the run is always logged.
    pub fn logs_at(&self, global_step: usize) -> bool {
        self.every > 0 && global_step % self.every == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutcome {
    pub loss:        f64,
    pub predictions: Vec<String>,
}

fn normalize(loss_sum: f64, num_examples: usize, batch_size: usize) -> f64 {
    if num_examples == 0 {
        return f64::NAN;
    }
    loss_sum / num_examples as f64 * batch_size as f64
}

pub fn train_epoch<B, O>(
    mut model: RelationClassifier<B>,
    stream:    &BatchStream<B>,
    executor:  &mut StepExecutor<B, O>,
    state:     &mut TrainingState,
    epoch:     usize,
    log:       &StepLog,
    device:    &B::Device,
) -> Result<(RelationClassifier<B>, f64), TrainError>
where
    B: AutodiffBackend,
    O: Optimizer<RelationClassifier<B>, B>,
{
    state.begin_epoch(epoch);
    executor.discard_pending();

    let mut loss_sum = 0.0f64;

    for batch in stream.iter() {
        let step = state.global_step;
        let started = Instant::now();
        let (next, loss) = executor.step(model, batch, state, device)?;
        model = next;
        loss_sum += loss;

        if log.logs_at(step) {
            tracing::info!(
                "step {}/{} (epoch {}/{}), loss = {:.4} ({:.3} sec/batch)",
                step,
                log.total_steps,
                epoch,
                log.num_epoch,
                loss,
                started.elapsed().as_secs_f64(),
            );
        }
    }

    if state.accumulation_counter > 0 {
        tracing::debug!(
            "Epoch {}: {} trailing batch(es) did not fill an accumulation group",
            epoch,
            state.accumulation_counter
        );
    }

    Ok((model, normalize(loss_sum, stream.num_examples(), stream.batch_size())))
}

pub fn eval_epoch<B: Backend>(
    model:  &RelationClassifier<B>,
    stream: &BatchStream<B>,
    labels: &LabelMap,
) -> Result<EvalOutcome, TrainError> {
    let mut loss_sum = 0.0f64;
    let mut predictions = Vec::with_capacity(stream.num_examples());

    for (index, batch) in stream.iter().enumerate() {
        batch.validate()?;
        let output = model.forward_classification(batch)?;
        let loss: f64 = output.loss.into_scalar().elem::<f64>();
        if !loss.is_finite() {
            return Err(TrainError::NonFiniteEvalLoss { batch: index, loss });
        }
        loss_sum += loss;

        // argmax(1) is [batch, 1]; flatten to [batch]
        let ids = output
            .logits
            .argmax(1)
            .flatten::<1>(0, 1)
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| TrainError::data("eval", format!("unreadable predictions: {e:?}")))?;

        for id in ids {
            predictions.push(labels.label(id as usize)?.to_string());
        }
    }

    if predictions.len() != stream.num_examples() {
        return Err(TrainError::data(
            "eval",
            format!(
                "{} predictions for {} examples",
                predictions.len(),
                stream.num_examples()
            ),
        ));
    }

    Ok(EvalOutcome {
        loss: normalize(loss_sum, stream.num_examples(), stream.batch_size()),
        predictions,
    })
}
