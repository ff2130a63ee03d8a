// ============================================================
// Layer 5 — Training Controller
// ============================================================
// Runs epochs 1..=num_epoch strictly in sequence:
//
//   TRAIN   shuffled train stream through the StepExecutor
//   EVAL    model.valid() over the ordered dev stream
//   SCORE   micro P/R/F1 against the dev gold labels
//   COMMIT  checkpoint save → best copy → prune
//   REPORT  structured tracing event, TSV row, curve redraw
//
// No early stopping. Training runs on Autodiff<Wgpu>; evaluation
// runs on the inner Wgpu backend so no graph is recorded.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use burn::{
    backend::{wgpu::WgpuDevice, Autodiff, Wgpu},
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, AdamConfig, AdamWConfig, Optimizer, SgdConfig},
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{dataset::RelationSplit, stream::BatchStream};
use crate::domain::{labels::LabelMap, methods::OptimizerKind, traits::Scorer};
use crate::infra::{
    checkpoint::{self, CheckpointManager},
    metrics::{EpochMetrics, MetricsHistory, MetricsLogger},
    plot::{plot_history, PLOT_FILE},
};
use crate::ml::{
    epoch::{eval_epoch, train_epoch, StepLog},
    model::{RelationClassifier, RelationClassifierConfig},
    scheduler::build_schedule,
    step::{StepExecutor, TrainingState},
};

pub type MyBackend = Autodiff<Wgpu>;

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub history:    MetricsHistory,
    /// (epoch, dev_f1) of best_model
    pub best:       Option<(usize, f64)>,
    /// Full path of the best_model file
    pub best_model: PathBuf,
}

/// Everything an epoch loop needs besides the optimizer.
struct RunContext<'a, B: AutodiffBackend> {
    cfg:     &'a TrainConfig,
    dev:     &'a RelationSplit,
    labels:  &'a LabelMap,
    run_dir: &'a Path,
    train:   BatchStream<B>,
    eval:    BatchStream<B::InnerBackend>,
    device:  B::Device,
}

pub fn run_training(
    cfg:        &TrainConfig,
    train:      &RelationSplit,
    dev:        &RelationSplit,
    labels:     &LabelMap,
    vocab_size: usize,
    run_dir:    &Path,
) -> Result<TrainingRun> {
    let device = WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    fit::<MyBackend>(cfg, train, dev, labels, vocab_size, run_dir, device)
}

pub fn fit<B: AutodiffBackend>(
    cfg:        &TrainConfig,
    train:      &RelationSplit,
    dev:        &RelationSplit,
    labels:     &LabelMap,
    vocab_size: usize,
    run_dir:    &Path,
    device:     B::Device,
) -> Result<TrainingRun> {
    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = RelationClassifierConfig::from_train_config(cfg, vocab_size, labels.len());
    let mut model: RelationClassifier<B> = model_cfg.init(&device);
    if let Some(init_from) = &cfg.init_from {
        let stem = checkpoint::checkpoint_stem::<B>(init_from);
        model = checkpoint::load_model(model, &stem, &device)
            .with_context(|| format!("Cannot initialise from '{}'", init_from.display()))?;
        tracing::info!("Initialised weights from '{}'", init_from.display());
    }
    tracing::info!(
        "Model ready: {} layers, d_model={}, {} labels, input={}, output={}",
        cfg.num_layers,
        cfg.d_model,
        labels.len(),
        cfg.input_method,
        cfg.output_method,
    );

    // ── Streams ───────────────────────────────────────────────────────────────
    let ctx = RunContext::<B> {
        cfg,
        dev,
        labels,
        run_dir,
        train: BatchStream::shuffled(train.dataset(), cfg.batch_size, cfg.seed, device.clone()),
        eval: BatchStream::ordered(dev.dataset(), cfg.batch_size, device.clone()),
        device,
    };

    // ── Optimizer ─────────────────────────────────────────────────────────────
    let decay = cfg.weight_decay as f32;
    match cfg.optim {
        OptimizerKind::Sgd => {
            let optim = SgdConfig::new()
                .with_weight_decay(Some(WeightDecayConfig::new(decay)))
                .init::<B, RelationClassifier<B>>();
            run_epochs(ctx, model, optim)
        }
        OptimizerKind::Adam => {
            let optim = AdamConfig::new()
                .with_epsilon(1e-8)
                .with_weight_decay(Some(WeightDecayConfig::new(decay)))
                .init::<B, RelationClassifier<B>>();
            run_epochs(ctx, model, optim)
        }
        OptimizerKind::AdamW => {
            let optim = AdamWConfig::new()
                .with_epsilon(1e-8)
                .with_weight_decay(decay)
                .init::<B, RelationClassifier<B>>();
            run_epochs(ctx, model, optim)
        }
    }
}

fn run_epochs<B, O>(
    ctx:       RunContext<'_, B>,
    mut model: RelationClassifier<B>,
    optim:     O,
) -> Result<TrainingRun>
where
    B: AutodiffBackend,
    O: Optimizer<RelationClassifier<B>, B>,
{
    let cfg = ctx.cfg;
    let grad_acc = cfg.grad_acc_steps();
    let num_batches = ctx.train.num_batches();

    let schedule = build_schedule(
        cfg.scheduler,
        cfg.lr,
        cfg.warmup_steps,
        (num_batches / grad_acc) * cfg.num_epoch,
    );
    let mut executor = StepExecutor::new(optim, schedule, grad_acc, cfg.lr);
    let mut state = TrainingState::new();
    let step_log = StepLog {
        every:       cfg.log_step,
        total_steps: num_batches * cfg.num_epoch,
        num_epoch:   cfg.num_epoch,
    };

    let mut checkpoints = CheckpointManager::new(ctx.run_dir, cfg.save_epoch)?;
    let logger = MetricsLogger::create(ctx.run_dir, &cfg.log)?;
    let mut history = MetricsHistory::new();
    tracing::info!("Logging epochs to '{}'", logger.path().display());

    tracing::info!(
        "Training on {} examples ({} batches of {}, {} per optimizer step), {} dev examples",
        ctx.train.num_examples(),
        num_batches,
        cfg.batch_size,
        grad_acc,
        ctx.eval.num_examples(),
    );

    for epoch in 1..=cfg.num_epoch {
        // ── Training phase ────────────────────────────────────────────────────
        let (trained, train_loss) = train_epoch(
            model,
            &ctx.train,
            &mut executor,
            &mut state,
            epoch,
            &step_log,
            &ctx.device,
        )
        .with_context(|| format!("Training failed in epoch {epoch}"))?;
        model = trained;

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let eval = eval_epoch(&model_valid, &ctx.eval, ctx.labels)
            .with_context(|| format!("Evaluation failed in epoch {epoch}"))?;
        let dev_score = ctx.dev.evaluate(&eval.predictions)?;

        // ── Checkpoint ────────────────────────────────────────────────────────
        let record = checkpoints
            .commit(epoch, dev_score.f1, |stem| checkpoint::save_model(&model, stem))
            .with_context(|| format!("Checkpointing failed in epoch {epoch}"))?;

        // ── Report ────────────────────────────────────────────────────────────
        let metrics = EpochMetrics::new(epoch, train_loss, eval.loss, dev_score);
        tracing::info!(
            epoch,
            train_loss,
            dev_loss = eval.loss,
            dev_p = dev_score.precision,
            dev_r = dev_score.recall,
            dev_f1 = dev_score.f1,
            best = record.is_best,
            "epoch {}/{} finished",
            epoch,
            cfg.num_epoch,
        );
        logger.log(&metrics)?;
        history.push(metrics);

        if cfg.plot {
            if let Err(e) = plot_history(ctx.run_dir.join(PLOT_FILE), &history) {
                tracing::warn!("Could not draw training curves: {e}");
            }
        }
    }

    if let Some(m) = history.best() {
        tracing::info!(
            "Best dev F1 {:.4} at epoch {} (dev loss {:.4})",
            m.dev_f1,
            m.epoch,
            m.dev_loss
        );
    }

    let best = checkpoints.best();
    let best_model = checkpoints
        .best_stem()
        .with_extension(checkpoint::checkpoint_extension::<B>());
    Ok(TrainingRun { history, best, best_model })
}
