//! Small deterministic models and samples shared by the unit tests.

use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    module::Param,
    prelude::*,
};

use crate::data::dataset::RelationSample;
use crate::domain::methods::{InputMethod, OutputMethod};
use crate::ml::model::{RelationClassifier, RelationClassifierConfig};

pub type TestBackend = NdArray<f32>;
pub type TestAutodiffBackend = Autodiff<TestBackend>;

pub const TEST_DEVICE: NdArrayDevice = NdArrayDevice::Cpu;

pub const VOCAB: usize = 16;
pub const SEQ_LEN: usize = 6;
pub const NUM_LABELS: usize = 4;

pub fn tiny_config(input: InputMethod, output: OutputMethod) -> RelationClassifierConfig {
    RelationClassifierConfig::new(VOCAB, SEQ_LEN, NUM_LABELS, 8, 2, 1, 16, 0.0, input, output)
        .with_max_relative_distance(4)
}

/// `n` padded samples with labels cycling through 0..NUM_LABELS.
pub fn synthetic_samples(n: usize, with_positions: bool) -> Vec<RelationSample> {
    (0..n)
        .map(|i| {
            let label = i % NUM_LABELS;
            let body = [
                4 + (i % 5) as u32,
                4 + label as u32 * 2,
                5 + (i % 3) as u32,
            ];
            let mut input_ids = vec![2];
            input_ids.extend_from_slice(&body);
            input_ids.push(3);
            input_ids.push(0);
            RelationSample {
                label,
                input_ids,
                attention_mask: vec![1, 1, 1, 1, 1, 0],
                entity1_pos: with_positions.then_some(1),
                entity2_pos: with_positions.then_some(3),
            }
        })
        .collect()
}

/// Replace the output head's weights with NaN so every loss is NaN.
pub fn poison_head<B: Backend>(mut model: RelationClassifier<B>, device: &B::Device) -> RelationClassifier<B> {
    let dims = model.classifier.weight.val().dims();
    model.classifier.weight = Param::from_tensor(Tensor::full(dims, f32::NAN, device));
    model
}
