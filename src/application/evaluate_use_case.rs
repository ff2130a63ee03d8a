// ============================================================
// Layer 2 — Evaluate Use Case
// ============================================================
// Scores the best_model of a finished run on one split:
//   1. read and validate <run_dir>/config.json
//   2. load the same tokenizer and encode the split the same way
//   3. rebuild the model, load best_model, evaluate

use anyhow::Result;
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::data::{dataset::RelationSplit, encoder::RelationEncoder, loader::TacredLoader};
use crate::domain::{
    labels::LabelMap,
    traits::{ExampleSource, Split},
};
use crate::infra::{
    checkpoint,
    tokenizer_store::{vocab_size, TokenizerStore},
};
use crate::ml::evaluator::{EvaluationReport, Evaluator};

pub struct PreparedEvaluation {
    pub config:     TrainConfig,
    pub split:      RelationSplit,
    pub labels:     LabelMap,
    pub vocab_size: usize,
}

pub struct EvaluateUseCase {
    run_dir:  PathBuf,
    split:    Split,
    /// Read the split from here instead of the run's data_dir
    data_dir: Option<PathBuf>,
}

impl EvaluateUseCase {
    pub fn new(run_dir: impl Into<PathBuf>, split: Split, data_dir: Option<PathBuf>) -> Self {
        Self { run_dir: run_dir.into(), split, data_dir }
    }

    pub fn prepare(&self) -> Result<PreparedEvaluation> {
        let config = checkpoint::load_config(&self.run_dir)?;
        config.validate()?;

        let tokenizer = TokenizerStore::new(config.tokenizer_path()).load(config.input_method)?;
        let labels = LabelMap::tacred();
        let data_dir = self.data_dir.clone().unwrap_or_else(|| config.data_dir.clone());
        let examples = TacredLoader::new(data_dir).load_split(self.split)?;

        let encoder = RelationEncoder::new(
            &tokenizer,
            config.max_length,
            config.input_method,
            config.output_method,
        )?;
        let split = RelationSplit::encode(self.split, &examples, &encoder, &labels)?;

        Ok(PreparedEvaluation { vocab_size: vocab_size(&tokenizer), config, split, labels })
    }

    pub fn execute(&self) -> Result<EvaluationReport> {
        let prepared = self.prepare()?;
        let evaluator = Evaluator::from_run_dir(
            &self.run_dir,
            &prepared.config,
            prepared.vocab_size,
            prepared.labels.len(),
        )?;
        let report = evaluator.evaluate(&prepared.split, &prepared.labels)?;

        tracing::info!(
            split = self.split.name(),
            loss = report.loss,
            p = report.score.precision,
            r = report.score.recall,
            f1 = report.score.f1,
            "evaluated {} examples",
            report.num_examples,
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::application::train_use_case::tests::write_corpus;
    use crate::domain::methods::{InputMethod, OutputMethod};

    fn saved_run(root: &std::path::Path, input_method: InputMethod) -> PathBuf {
        save_run(TrainConfig {
            data_dir: root.to_path_buf(),
            save_dir: root.join("runs"),
            name: "eval".to_string(),
            input_method,
            output_method: OutputMethod::ClsToken,
            max_length: 12,
            ..TrainConfig::default()
        })
    }

    fn save_run(cfg: TrainConfig) -> PathBuf {
        let run_dir = cfg.run_dir();
        std::fs::create_dir_all(&run_dir).unwrap();
        checkpoint::save_config(&run_dir, &cfg).unwrap();
        run_dir
    }

    #[test]
    fn test_prepare_encodes_with_the_saved_settings() {
        let tmp = tempdir().unwrap();
        write_corpus(tmp.path());
        let run_dir = saved_run(tmp.path(), InputMethod::Standard);

        let prepared = EvaluateUseCase::new(&run_dir, Split::Test, None).prepare().unwrap();
        assert_eq!(prepared.config.max_length, 12);
        assert_eq!(prepared.split.split, Split::Test);
        assert_eq!(prepared.split.len(), 2);
        // no entity markers registered for the standard encoding
        assert_eq!(prepared.vocab_size, 11);
    }

    #[test]
    fn test_data_dir_override() {
        let tmp = tempdir().unwrap();
        write_corpus(tmp.path());
        let run_dir = saved_run(tmp.path(), InputMethod::EntityMarkers);

        let elsewhere = tempdir().unwrap();
        let err = EvaluateUseCase::new(&run_dir, Split::Dev, Some(elsewhere.path().to_path_buf()))
            .prepare()
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("dev.json"));
    }

    #[test]
    fn test_edited_config_is_validated_before_encoding() {
        let tmp = tempdir().unwrap();
        write_corpus(tmp.path());
        let run_dir = save_run(TrainConfig {
            data_dir: tmp.path().to_path_buf(),
            save_dir: tmp.path().join("runs"),
            name: "edited".to_string(),
            max_length: 0,
            ..TrainConfig::default()
        });

        let err = EvaluateUseCase::new(&run_dir, Split::Test, None)
            .prepare()
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("max_length"));
    }

    #[test]
    fn test_missing_run_is_reported() {
        let tmp = tempdir().unwrap();
        let err = EvaluateUseCase::new(tmp.path().join("nope"), Split::Test, None)
            .prepare()
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("config.json"));
    }
}
