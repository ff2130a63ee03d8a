// ============================================================
// Layer 4 — Batch Stream
// ============================================================
// Wraps Burn's DataLoader into a restartable, finite pass over
// one split and exposes the counts the training loop needs:
//
//   num_examples  → loss normalisation
//   num_batches   → total step budget, accumulation boundaries
//
// No worker threads are configured, so batches always come out
// in a single deterministic order: dataset order for `ordered`,
// a seeded permutation for `shuffled`.

use std::sync::Arc;

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};

use crate::data::{
    batcher::{RelationBatch, RelationBatcher},
    dataset::RelationDataset,
};

pub struct BatchStream<B: Backend> {
    loader: Arc<dyn DataLoader<RelationBatch<B>>>,
    num_examples: usize,
    batch_size: usize,
}

impl<B: Backend> BatchStream<B> {
    /// Batches in dataset order, for evaluation.
    pub fn ordered(dataset: RelationDataset, batch_size: usize, device: B::Device) -> Self {
        let num_examples = dataset.sample_count();
        let loader = DataLoaderBuilder::new(RelationBatcher::<B>::new(device))
            .batch_size(batch_size)
            .build(dataset);
        Self { loader, num_examples, batch_size }
    }

    /// Batches in a seeded random order, for training.
    pub fn shuffled(dataset: RelationDataset, batch_size: usize, seed: u64, device: B::Device) -> Self {
        let num_examples = dataset.sample_count();
        let loader = DataLoaderBuilder::new(RelationBatcher::<B>::new(device))
            .batch_size(batch_size)
            .shuffle(seed)
            .build(dataset);
        Self { loader, num_examples, batch_size }
    }

    pub fn iter(&self) -> impl Iterator<Item = RelationBatch<B>> + '_ {
        self.loader.iter()
    }

    pub fn num_examples(&self) -> usize {
        self.num_examples
    }

    pub fn num_batches(&self) -> usize {
        self.num_examples.div_ceil(self.batch_size)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::fixtures::{synthetic_samples, TestBackend, TEST_DEVICE};

    #[test]
    fn test_counts() {
        let stream = BatchStream::<TestBackend>::ordered(
            RelationDataset::new(synthetic_samples(10, true)),
            4,
            TEST_DEVICE,
        );
        assert_eq!(stream.num_examples(), 10);
        assert_eq!(stream.num_batches(), 3);

        let sizes: Vec<usize> = stream.iter().map(|b| b.validate().unwrap()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_ordered_stream_preserves_dataset_order_and_restarts() {
        let samples = synthetic_samples(7, false);
        let expected: Vec<i64> = samples.iter().map(|s| s.label as i64).collect();
        let stream = BatchStream::<TestBackend>::ordered(RelationDataset::new(samples), 3, TEST_DEVICE);

        for _ in 0..2 {
            let labels: Vec<i64> = stream
                .iter()
                .flat_map(|b| b.labels.into_data().convert::<i64>().to_vec::<i64>().unwrap())
                .collect();
            assert_eq!(labels, expected);
        }
    }

    #[test]
    fn test_shuffled_stream_is_a_permutation() {
        let samples = synthetic_samples(9, false);
        let mut expected: Vec<i64> = samples.iter().map(|s| s.label as i64).collect();
        let stream =
            BatchStream::<TestBackend>::shuffled(RelationDataset::new(samples), 4, 7, TEST_DEVICE);

        let mut labels: Vec<i64> = stream
            .iter()
            .flat_map(|b| b.labels.into_data().convert::<i64>().to_vec::<i64>().unwrap())
            .collect();
        labels.sort_unstable();
        expected.sort_unstable();
        assert_eq!(labels, expected);
    }
}
