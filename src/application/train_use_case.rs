// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one fine-tuning run in order:
//
//   Step 1: Validate the configuration   (Layer 2)
//   Step 2: Load the tokenizer           (Layer 6 - infra)
//   Step 3: Load train/dev splits        (Layer 4 - data)
//   Step 4: Encode both splits           (Layer 4 - data)
//   Step 5: Create run dir, save config  (Layer 6 - infra)
//   Step 6: Run the epoch loop           (Layer 5 - ml)
//
// Everything a run writes lives under <save_dir>/<name>/.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use serde::{Deserialize, Serialize};

use crate::data::{dataset::RelationSplit, encoder::RelationEncoder, loader::TacredLoader};
use crate::domain::{
    error::TrainError,
    labels::LabelMap,
    methods::{InputMethod, OptimizerKind, OutputMethod, SchedulerKind},
    traits::{ExampleSource, Split},
};
use crate::infra::{
    checkpoint,
    tokenizer_store::{vocab_size, TokenizerStore},
};
use crate::ml::trainer::{run_training, TrainingRun};

// ─── Training Configuration ──────────────────────────────────────────────────
// The fully resolved settings of a run. Written to config.json
// before training so `evaluate` can rebuild the same model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:          PathBuf,
    /// Defaults to <data_dir>/tokenizer.json
    pub tokenizer:         Option<PathBuf>,
    pub save_dir:          PathBuf,
    pub name:              String,
    /// TSV log file name inside the run directory
    pub log:               String,

    pub lr:                f64,
    pub optim:             OptimizerKind,
    pub num_epoch:         usize,
    pub batch_size:        usize,
    pub target_batch_size: usize,
    pub scheduler:         SchedulerKind,
    pub warmup_steps:      usize,
    pub weight_decay:      f64,
    pub seed:              u64,
    pub init_from:         Option<PathBuf>,

    pub input_method:      InputMethod,
    pub output_method:     OutputMethod,
    pub max_length:        usize,

    pub log_step:          usize,
    pub save_epoch:        usize,
    pub plot:              bool,

    pub d_model:           usize,
    pub num_heads:         usize,
    pub num_layers:        usize,
    pub d_ff:              usize,
    pub dropout:           f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:          PathBuf::from("dataset/tacred-small"),
            tokenizer:         None,
            save_dir:          PathBuf::from("./saved_models"),
            name:              "test".to_string(),
            log:               "logs.txt".to_string(),
            lr:                2e-5,
            optim:             OptimizerKind::AdamW,
            num_epoch:         10,
            batch_size:        64,
            target_batch_size: 64,
            scheduler:         SchedulerKind::LinearWarmup,
            warmup_steps:      300,
            weight_decay:      1e-5,
            seed:              12345,
            init_from:         None,
            input_method:      InputMethod::EntityMarkers,
            output_method:     OutputMethod::EntityStart,
            max_length:        128,
            log_step:          50,
            save_epoch:        1,
            plot:              true,
            d_model:           256,
            num_heads:         8,
            num_layers:        6,
            d_ff:              1024,
            dropout:           0.1,
        }
    }
}

impl TrainConfig {
    /// Reject settings that would fail later, before any data is read.
    pub fn validate(&self) -> Result<(), TrainError> {
        let positive = [
            ("num_epoch", self.num_epoch),
            ("batch_size", self.batch_size),
            ("target_batch_size", self.target_batch_size),
            ("save_epoch", self.save_epoch),
            ("num_heads", self.num_heads),
            ("num_layers", self.num_layers),
            ("d_ff", self.d_ff),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(TrainError::config(format!("{field} must be positive")));
            }
        }
        // [CLS] + at least one token + [SEP]
        if self.max_length < 3 {
            return Err(TrainError::config(format!(
                "max_length must be at least 3, got {}",
                self.max_length
            )));
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(TrainError::config(format!("lr must be positive, got {}", self.lr)));
        }
        if !(self.weight_decay.is_finite() && self.weight_decay >= 0.0) {
            return Err(TrainError::config(format!(
                "weight_decay must be non-negative, got {}",
                self.weight_decay
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(TrainError::config(format!("dropout must be in [0, 1), got {}", self.dropout)));
        }
        if self.d_model == 0 || self.d_model % self.num_heads != 0 {
            return Err(TrainError::config(format!(
                "d_model ({}) must be a positive multiple of num_heads ({})",
                self.d_model, self.num_heads
            )));
        }
        if self.name.trim().is_empty() || self.log.trim().is_empty() {
            return Err(TrainError::config("name and log must not be empty"));
        }
        Ok(())
    }

    /// Batches per optimizer step: ceil(target_batch_size / batch_size).
    pub fn grad_acc_steps(&self) -> usize {
        self.target_batch_size.div_ceil(self.batch_size.max(1)).max(1)
    }

    pub fn run_dir(&self) -> PathBuf {
        self.save_dir.join(&self.name)
    }

    pub fn tokenizer_path(&self) -> PathBuf {
        self.tokenizer
            .clone()
            .unwrap_or_else(|| self.data_dir.join("tokenizer.json"))
    }

    /// Every setting as an aligned `key  value` block.
    pub fn table(&self) -> Result<String> {
        let value = serde_json::to_value(self)?;
        let Some(fields) = value.as_object() else {
            return Ok(String::new());
        };
        let width = fields.keys().map(String::len).max().unwrap_or(0);
        let lines: Vec<String> = fields
            .iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => format!("  {key:<width$}  {s}"),
                other => format!("  {key:<width$}  {other}"),
            })
            .collect();
        Ok(lines.join("\n"))
    }
}

/// Encoded data and sizes a run needs before touching the model.
pub struct PreparedRun {
    pub train:      RelationSplit,
    pub dev:        RelationSplit,
    pub labels:     LabelMap,
    pub vocab_size: usize,
    pub run_dir:    PathBuf,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Steps 1–5: everything up to the first epoch.
    pub fn prepare(&self) -> Result<PreparedRun> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Tokenizer ─────────────────────────────────────────────────
        // Entity markers are registered here when the input method needs them
        let tokenizer = TokenizerStore::new(cfg.tokenizer_path()).load(cfg.input_method)?;
        let vocab_size = vocab_size(&tokenizer);

        // ── Step 3: Load splits ───────────────────────────────────────────────
        let labels = LabelMap::tacred();
        let loader = TacredLoader::new(&cfg.data_dir);
        let train_examples = loader.load_split(Split::Train)?;
        let dev_examples = loader.load_split(Split::Dev)?;

        // ── Step 4: Encode ────────────────────────────────────────────────────
        let encoder =
            RelationEncoder::new(&tokenizer, cfg.max_length, cfg.input_method, cfg.output_method)?;
        let train = RelationSplit::encode(Split::Train, &train_examples, &encoder, &labels)?;
        let dev = RelationSplit::encode(Split::Dev, &dev_examples, &encoder, &labels)?;

        // ── Step 5: Run directory and config ──────────────────────────────────
        let run_dir = cfg.run_dir();
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("Cannot create run directory '{}'", run_dir.display()))?;
        checkpoint::save_config(&run_dir, cfg)?;
        tracing::info!("Run configuration:\n{}", cfg.table()?);

        Ok(PreparedRun { train, dev, labels, vocab_size, run_dir })
    }

    /// Execute the full training run end to end.
    pub fn execute(&self) -> Result<TrainingRun> {
        let prepared = self.prepare()?;

        // ── Step 6: Epoch loop (Layer 5) ──────────────────────────────────────
        run_training(
            &self.config,
            &prepared.train,
            &prepared.dev,
            &prepared.labels,
            prepared.vocab_size,
            &prepared.run_dir,
        )
    }
}
