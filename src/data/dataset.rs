use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::encoder::RelationEncoder;
use crate::domain::{
    error::TrainError,
    example::RelationExample,
    labels::LabelMap,
    scorer::{self, Score},
    traits::{Scorer, Split},
};

/// One encoded, padded example.
/// Sequence format: [CLS] tokens [SEP] [PAD]...
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationSample {
    pub label: usize,
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub entity1_pos: Option<usize>,
    pub entity2_pos: Option<usize>,
}

impl RelationSample {
    /// Number of non-padding tokens
    pub fn token_count(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m != 0).count()
    }
}

#[derive(Clone)]
pub struct RelationDataset {
    samples: Vec<RelationSample>,
}

impl RelationDataset {
    pub fn new(samples: Vec<RelationSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<RelationSample> for RelationDataset {
    fn get(&self, index: usize) -> Option<RelationSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// An encoded split together with its gold relations, in file order.
pub struct RelationSplit {
    pub split: Split,
    samples: Vec<RelationSample>,
    gold: Vec<String>,
}

impl RelationSplit {
    pub fn new(split: Split, samples: Vec<RelationSample>, gold: Vec<String>) -> Result<Self> {
        if samples.is_empty() {
            return Err(TrainError::data("dataset", format!("{} split is empty", split.name())).into());
        }
        if samples.len() != gold.len() {
            return Err(TrainError::data(
                "dataset",
                format!("{} samples but {} gold labels", samples.len(), gold.len()),
            )
            .into());
        }
        Ok(Self { split, samples, gold })
    }

    /// Encode every example of a split.
    pub fn encode(
        split: Split,
        examples: &[RelationExample],
        encoder: &RelationEncoder<'_>,
        labels: &LabelMap,
    ) -> Result<Self> {
        let samples = examples
            .iter()
            .map(|ex| encoder.encode(ex, labels))
            .collect::<Result<Vec<_>>>()?;
        let gold = examples.iter().map(|ex| ex.relation.clone()).collect();

        let full_window = samples
            .iter()
            .filter(|s| s.token_count() == s.input_ids.len())
            .count();
        tracing::info!(
            "Encoded {} {} examples ({} filled the whole window)",
            samples.len(),
            split.name(),
            full_window
        );

        Self::new(split, samples, gold)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn dataset(&self) -> RelationDataset {
        RelationDataset::new(self.samples.clone())
    }
}

impl Scorer for RelationSplit {
    fn evaluate(&self, predictions: &[String]) -> Result<Score> {
        Ok(scorer::score(&self.gold, predictions)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(label: usize) -> RelationSample {
        RelationSample {
            label,
            input_ids: vec![2, 9, 3, 0],
            attention_mask: vec![1, 1, 1, 0],
            entity1_pos: None,
            entity2_pos: None,
        }
    }

    #[test]
    fn test_dataset_get_and_len() {
        let ds = RelationDataset::new(vec![sample(0), sample(4)]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1).unwrap().label, 4);
        assert!(ds.get(2).is_none());
        assert_eq!(ds.get(0).unwrap().token_count(), 3);
    }

    #[test]
    fn test_split_scores_against_its_gold() {
        let split = RelationSplit::new(
            Split::Dev,
            vec![sample(1), sample(0)],
            vec!["per:title".into(), "no_relation".into()],
        )
        .unwrap();

        let perfect = split.evaluate(&["per:title".into(), "no_relation".into()]).unwrap();
        assert_eq!(perfect.f1, 1.0);

        // predictions shorter than gold
        assert!(split.evaluate(&["per:title".into()]).is_err());
    }

    #[test]
    fn test_empty_split_is_rejected() {
        assert!(RelationSplit::new(Split::Dev, Vec::new(), Vec::new()).is_err());
    }
}
