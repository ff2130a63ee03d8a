// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands: `train` and `evaluate`.
//
// Method selectors are parsed with their FromStr impls, so
// `--input-method entity_markers` and `--input-method 3` are
// the same thing and a bad value stops clap before any work.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::domain::{
    methods::{InputMethod, OptimizerKind, OutputMethod, SchedulerKind},
    traits::Split,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune a relation classifier on a TACRED-format corpus
    Train(TrainArgs),

    /// Score the best checkpoint of a finished run on one split
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory holding train.json, dev.json and test.json
    #[arg(long, default_value = "dataset/tacred-small")]
    pub data_dir: PathBuf,

    /// HuggingFace tokenizer.json [default: <data-dir>/tokenizer.json]
    #[arg(long)]
    pub tokenizer: Option<PathBuf>,

    #[arg(long, default_value_t = 2e-5)]
    pub lr: f64,

    /// sgd, adam or adamw
    #[arg(long, default_value = "adamw")]
    pub optim: OptimizerKind,

    #[arg(long, default_value_t = 10)]
    pub num_epoch: usize,

    /// Examples per forward pass
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Examples per optimizer step; gradients are accumulated over
    /// ceil(target_batch_size / batch_size) batches
    #[arg(long, default_value_t = 64)]
    pub target_batch_size: usize,

    /// standard (1), positional_embedding (2) or entity_markers (3)
    #[arg(long, default_value = "entity_markers")]
    pub input_method: InputMethod,

    /// cls_token (1), mention_pooling (2) or entity_start (3)
    #[arg(long, default_value = "entity_start")]
    pub output_method: OutputMethod,

    /// linear_warmup or constant
    #[arg(long, default_value = "linear_warmup")]
    pub scheduler: SchedulerKind,

    /// Optimizer steps of linear warmup
    #[arg(long, default_value_t = 300)]
    pub warmup_steps: usize,

    #[arg(long, default_value_t = 1e-5)]
    pub weight_decay: f64,

    /// Tokens per example, including [CLS] and [SEP]
    #[arg(long, default_value_t = 128)]
    pub max_length: usize,

    #[arg(long, default_value_t = 12345)]
    pub seed: u64,

    /// Start from the weights of an earlier checkpoint
    #[arg(long)]
    pub init_from: Option<PathBuf>,

    /// Print training progress every N batches
    #[arg(long, default_value_t = 50)]
    pub log_step: usize,

    /// TSV log file name, written inside the run directory
    #[arg(long, default_value = "logs.txt")]
    pub log: String,

    /// Keep the checkpoint of every N-th epoch
    #[arg(long, default_value_t = 1)]
    pub save_epoch: usize,

    #[arg(long, default_value = "./saved_models")]
    pub save_dir: PathBuf,

    /// Run name; artifacts go to <save-dir>/<name>
    #[arg(long, default_value = "test")]
    pub name: String,

    /// Skip drawing loss_f1_vs_epoch.png
    #[arg(long)]
    pub no_plot: bool,

    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:          a.data_dir,
            tokenizer:         a.tokenizer,
            save_dir:          a.save_dir,
            name:              a.name,
            log:               a.log,
            lr:                a.lr,
            optim:             a.optim,
            num_epoch:         a.num_epoch,
            batch_size:        a.batch_size,
            target_batch_size: a.target_batch_size,
            scheduler:         a.scheduler,
            warmup_steps:      a.warmup_steps,
            weight_decay:      a.weight_decay,
            seed:              a.seed,
            init_from:         a.init_from,
            input_method:      a.input_method,
            output_method:     a.output_method,
            max_length:        a.max_length,
            log_step:          a.log_step,
            save_epoch:        a.save_epoch,
            plot:              !a.no_plot,
            d_model:           a.d_model,
            num_heads:         a.num_heads,
            num_layers:        a.num_layers,
            d_ff:              a.d_ff,
            dropout:           a.dropout,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Run directory written by `train` (<save-dir>/<name>)
    #[arg(long)]
    pub run_dir: PathBuf,

    /// train, dev or test
    #[arg(long, default_value = "test")]
    pub split: Split,

    /// Read the split from here instead of the run's data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}
