// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Rebuilds the classifier of a finished run from its
// config.json, loads best_model into it and scores a split.
// Runs on plain Wgpu: no autodiff, dropout off.

use anyhow::{Context, Result};
use std::path::Path;
use burn::{
    backend::{wgpu::WgpuDevice, Wgpu},
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{dataset::RelationSplit, stream::BatchStream};
use crate::domain::{labels::LabelMap, scorer::Score, traits::Scorer};
use crate::infra::checkpoint::{self, BEST_MODEL};
use crate::ml::{
    epoch::eval_epoch,
    model::{RelationClassifier, RelationClassifierConfig},
};

pub type EvalBackend = Wgpu;

#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub num_examples: usize,
    pub loss:         f64,
    pub score:        Score,
}

pub struct Evaluator<B: Backend> {
    model:      RelationClassifier<B>,
    batch_size: usize,
    device:     B::Device,
}

impl Evaluator<EvalBackend> {
    pub fn from_run_dir(
        run_dir:    &Path,
        cfg:        &TrainConfig,
        vocab_size: usize,
        num_labels: usize,
    ) -> Result<Self> {
        let device = WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        Self::load(run_dir, cfg, vocab_size, num_labels, device)
    }
}

impl<B: Backend> Evaluator<B> {
    pub fn load(
        run_dir:    &Path,
        cfg:        &TrainConfig,
        vocab_size: usize,
        num_labels: usize,
        device:     B::Device,
    ) -> Result<Self> {
        let inference_cfg = TrainConfig { dropout: 0.0, ..cfg.clone() };
        let model: RelationClassifier<B> =
            RelationClassifierConfig::from_train_config(&inference_cfg, vocab_size, num_labels)
                .init(&device);
        let model = checkpoint::load_model(model, &run_dir.join(BEST_MODEL), &device)
            .with_context(|| format!("No usable {BEST_MODEL} in '{}'", run_dir.display()))?;
        tracing::info!("Loaded {} from '{}'", BEST_MODEL, run_dir.display());
        Ok(Self { model, batch_size: cfg.batch_size, device })
    }

    pub fn evaluate(&self, split: &RelationSplit, labels: &LabelMap) -> Result<EvaluationReport> {
        let stream = BatchStream::<B>::ordered(split.dataset(), self.batch_size, self.device.clone());
        let outcome = eval_epoch(&self.model, &stream, labels)
            .with_context(|| format!("Evaluation of the {} split failed", split.split.name()))?;
        let score = split.evaluate(&outcome.predictions)?;

        Ok(EvaluationReport {
            num_examples: split.len(),
            loss:         outcome.loss,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::domain::{
        methods::{InputMethod, OutputMethod},
        traits::Split,
    };
    use crate::ml::fixtures::{synthetic_samples, TestBackend, SEQ_LEN, TEST_DEVICE, VOCAB};

    #[test]
    fn test_evaluator_scores_the_saved_best_model() {
        let tmp = tempdir().unwrap();
        let labels = LabelMap::new(["no_relation", "per:title", "org:founded", "per:age"]);
        let cfg = TrainConfig {
            batch_size:    3,
            max_length:    SEQ_LEN,
            input_method:  InputMethod::EntityMarkers,
            output_method: OutputMethod::MentionPooling,
            d_model:       8,
            num_heads:     2,
            num_layers:    1,
            d_ff:          16,
            ..TrainConfig::default()
        };

        let model: RelationClassifier<TestBackend> =
            RelationClassifierConfig::from_train_config(&cfg, VOCAB, labels.len()).init(&TEST_DEVICE);
        checkpoint::save_model(&model, &tmp.path().join(BEST_MODEL)).unwrap();

        let samples = synthetic_samples(5, true);
        let gold = samples.iter().map(|s| labels.label(s.label).unwrap().to_string()).collect();
        let split = RelationSplit::new(Split::Test, samples, gold).unwrap();

        let reloaded = checkpoint::load_model(
            RelationClassifierConfig::from_train_config(&cfg, VOCAB, labels.len()).init(&TEST_DEVICE),
            &tmp.path().join(BEST_MODEL),
            &TEST_DEVICE,
        )
        .unwrap();
        let expected = eval_epoch(
            &reloaded,
            &BatchStream::<TestBackend>::ordered(split.dataset(), 3, TEST_DEVICE),
            &labels,
        )
        .unwrap();

        let evaluator =
            Evaluator::<TestBackend>::load(tmp.path(), &cfg, VOCAB, labels.len(), TEST_DEVICE).unwrap();
        let report = evaluator.evaluate(&split, &labels).unwrap();

        assert_eq!(cfg.dropout, 0.1);
        assert_eq!(report.num_examples, 5);
        assert_eq!(report.score, split.evaluate(&expected.predictions).unwrap());
        assert!((report.loss - expected.loss).abs() < 1e-5);
    }

    #[test]
    fn test_missing_checkpoint_is_reported() {
        let tmp = tempdir().unwrap();
        let cfg = TrainConfig { max_length: SEQ_LEN, d_model: 8, num_heads: 2, num_layers: 1, d_ff: 16, ..TrainConfig::default() };
        let err = Evaluator::<TestBackend>::load(tmp.path(), &cfg, VOCAB, 4, TEST_DEVICE)
            .err()
            .unwrap();
        assert!(err.to_string().contains(BEST_MODEL));
    }
}
