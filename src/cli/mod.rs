// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2.
//
//   1. `train`    — fine-tune on a TACRED-format corpus
//   2. `evaluate` — score a finished run's best_model on a split

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "relation-finetune",
    version = "0.1.0",
    about = "Fine-tune and evaluate a transformer relation classifier on TACRED-format data."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Routes to the use case; never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on data in: {}", args.data_dir.display());

    let use_case = TrainUseCase::new(args.into());
    let run = use_case.execute()?;

    let run_dir = use_case.config().run_dir();
    println!("Training complete after {} epoch(s).", run.history.len());
    if let Some((epoch, f1)) = run.best {
        println!("Best dev F1 {:.4} at epoch {}: '{}'", f1, epoch, run.best_model.display());
    }
    println!("Artifacts in '{}'.", run_dir.display());
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let use_case = EvaluateUseCase::new(&args.run_dir, args.split, args.data_dir);
    let report = use_case.execute()?;

    println!(
        "{} ({} examples): loss = {:.4}, P = {:.4}, R = {:.4}, F1 = {:.4}",
        args.split.name(),
        report.num_examples,
        report.loss,
        report.score.precision,
        report.score.recall,
        report.score.f1,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::domain::{
        methods::{InputMethod, OptimizerKind, OutputMethod},
        traits::Split,
    };

    fn train_config(args: &[&str]) -> TrainConfig {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Train(a) => a.into(),
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let parsed = train_config(&["relation-finetune", "train"]);
        let default = TrainConfig::default();
        assert_eq!(
            serde_json::to_value(&parsed).unwrap(),
            serde_json::to_value(&default).unwrap()
        );
    }

    #[test]
    fn test_legacy_codes_and_names() {
        let cfg = train_config(&[
            "relation-finetune", "train",
            "--input-method", "2",
            "--output-method", "cls_token",
            "--optim", "sgd",
            "--batch-size", "16",
            "--no-plot",
        ]);
        assert_eq!(cfg.input_method, InputMethod::PositionalEmbedding);
        assert_eq!(cfg.output_method, OutputMethod::ClsToken);
        assert_eq!(cfg.optim, OptimizerKind::Sgd);
        assert_eq!(cfg.grad_acc_steps(), 4);
        assert!(!cfg.plot);
    }

    #[test]
    fn test_bad_selector_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["relation-finetune", "train", "--input-method", "4"]).is_err());
        assert!(Cli::try_parse_from(["relation-finetune", "train", "--optim", "lbfgs"]).is_err());
    }

    #[test]
    fn test_evaluate_defaults_to_test_split() {
        let cli = Cli::try_parse_from(["relation-finetune", "evaluate", "--run-dir", "saved_models/test"])
            .unwrap();
        match cli.command {
            Commands::Evaluate(a) => {
                assert_eq!(a.split, Split::Test);
                assert!(a.data_dir.is_none());
            }
            other => panic!("expected evaluate, got {other:?}"),
        }
    }
}
