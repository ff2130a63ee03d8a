// ============================================================
// Layer 4 — Relation Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks N RelationSamples of
// sequence length L into one RelationBatch.
//
//   labels          [N]
//   input_ids       [N, L]
//   attention_mask  [N, L]   (optional)
//   entity1_pos     [N]      (optional)
//   entity2_pos     [N]      (optional)
//
// Optional fields stay `None` when the encoding did not produce
// them; they are never zero-filled.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::RelationSample;
use crate::domain::error::TrainError;

#[derive(Debug, Clone)]
pub struct RelationBatch<B: Backend> {
    pub labels: Tensor<B, 1, Int>,
    pub input_ids: Tensor<B, 2, Int>,
    pub attention_mask: Option<Tensor<B, 2, Int>>,
    pub entity1_pos: Option<Tensor<B, 1, Int>>,
    pub entity2_pos: Option<Tensor<B, 1, Int>>,
}

impl<B: Backend> RelationBatch<B> {
    /// Move every present field to `device`; absent fields stay absent.
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            labels: self.labels.to_device(device),
            input_ids: self.input_ids.to_device(device),
            attention_mask: self.attention_mask.map(|t| t.to_device(device)),
            entity1_pos: self.entity1_pos.map(|t| t.to_device(device)),
            entity2_pos: self.entity2_pos.map(|t| t.to_device(device)),
        }
    }

    /// Check that every present field shares the leading dimension.
    /// Returns the batch size.
    pub fn validate(&self) -> Result<usize, TrainError> {
        let [n, seq_len] = self.input_ids.dims();

        let mut leading = vec![("labels", self.labels.dims()[0])];
        if let Some(mask) = &self.attention_mask {
            let [rows, cols] = mask.dims();
            if cols != seq_len {
                return Err(TrainError::data(
                    "batch",
                    format!("attention_mask has {cols} columns, input_ids has {seq_len}"),
                ));
            }
            leading.push(("attention_mask", rows));
        }
        if let Some(pos) = &self.entity1_pos {
            leading.push(("entity1_pos", pos.dims()[0]));
        }
        if let Some(pos) = &self.entity2_pos {
            leading.push(("entity2_pos", pos.dims()[0]));
        }

        for (field, rows) in leading {
            if rows != n {
                return Err(TrainError::data(
                    "batch",
                    format!("{field} has {rows} rows, input_ids has {n}"),
                ));
            }
        }
        Ok(n)
    }
}

#[derive(Clone, Debug)]
pub struct RelationBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> RelationBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn positions(&self, items: &[RelationSample], pick: fn(&RelationSample) -> Option<usize>) -> Option<Tensor<B, 1, Int>> {
        // Any sample without a position drops the field for the whole batch
        let values: Option<Vec<i32>> = items.iter().map(|s| pick(s).map(|p| p as i32)).collect();
        values.map(|v| Tensor::<B, 1, Int>::from_ints(v.as_slice(), &self.device))
    }
}

impl<B: Backend> Batcher<RelationSample, RelationBatch<B>> for RelationBatcher<B> {
    fn batch(&self, items: Vec<RelationSample>) -> RelationBatch<B> {
        let batch_size = items.len();
        // All sequences have the same length (pre-padded)
        let seq_len = items[0].input_ids.len();

        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&x| x as i32))
            .collect();

        let mask_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.attention_mask.iter().map(|&x| x as i32))
            .collect();

        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(input_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        let attention_mask = (!mask_flat.is_empty()).then(|| {
            Tensor::<B, 1, Int>::from_ints(mask_flat.as_slice(), &self.device)
                .reshape([batch_size, seq_len])
        });

        RelationBatch {
            labels: Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device),
            input_ids,
            attention_mask,
            entity1_pos: self.positions(&items, |s| s.entity1_pos),
            entity2_pos: self.positions(&items, |s| s.entity2_pos),
        }
    }
}
