use burn::{
    module::Ignored,
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::batcher::RelationBatch;
use crate::domain::{
    error::TrainError,
    methods::{InputMethod, OutputMethod},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally: do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct RelationClassifierConfig {
    pub vocab_size:    usize,
    pub max_seq_len:   usize,
    pub num_labels:    usize,
    pub d_model:       usize,
    pub num_heads:     usize,
    pub num_layers:    usize,
    pub d_ff:          usize,
    pub dropout:       f64,
    pub input_method:  InputMethod,
    pub output_method: OutputMethod,
    /// Token-to-entity distances are clipped to ±this value
    #[config(default = 32)]
    pub max_relative_distance: usize,
}

impl RelationClassifierConfig {
    pub fn from_train_config(cfg: &TrainConfig, vocab_size: usize, num_labels: usize) -> Self {
        Self::new(
            vocab_size, cfg.max_length, num_labels,
            cfg.d_model, cfg.num_heads, cfg.num_layers, cfg.d_ff, cfg.dropout,
            cfg.input_method, cfg.output_method,
        )
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> RelationClassifier<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device);

        let distance_table = || {
            EmbeddingConfig::new(2 * self.max_relative_distance + 1, self.d_model).init(device)
        };
        let (entity1_distance, entity2_distance) = if self.input_method.uses_relative_positions() {
            (Some(distance_table()), Some(distance_table()))
        } else {
            (None, None)
        };

        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.d_model).init(device);
        let pooled_dim = self.d_model * self.output_method.pooled_width();
        let classifier = LinearConfig::new(pooled_dim, self.num_labels).init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();

        RelationClassifier {
            token_embedding, position_embedding,
            entity1_distance, entity2_distance,
            layers, final_norm, classifier, dropout,
            max_relative_distance: self.max_relative_distance,
            output_method: Ignored(self.output_method),
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `pad_mask` is true at padding positions.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Option<Tensor<B, 2, Bool>>) -> Tensor<B, 3> {
        let mut input = MhaInput::self_attn(x.clone());
        if let Some(mask) = pad_mask {
            input = input.mask_pad(mask);
        }
        let attn_output = self.self_attn.forward(input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct RelationClassifier<B: Backend> {
    pub token_embedding:       Embedding<B>,
    pub position_embedding:    Embedding<B>,
    pub entity1_distance:      Option<Embedding<B>>,
    pub entity2_distance:      Option<Embedding<B>>,
    pub layers:                Vec<EncoderBlock<B>>,
    pub final_norm:            LayerNorm<B>,
    pub classifier:            Linear<B>,
    pub dropout:               Dropout,
    pub max_relative_distance: usize,
    pub output_method:         Ignored<OutputMethod>,
}

pub struct ClassificationOutput<B: Backend> {
    /// Mean cross-entropy over the batch, shape [1]
    pub loss:   Tensor<B, 1>,
    /// Per-class scores, shape [batch, num_labels]
    pub logits: Tensor<B, 2>,
}

impl<B: Backend> RelationClassifier<B> {
    /// input_ids: [batch, seq_len] → logits: [batch, num_labels]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Option<Tensor<B, 2, Int>>,
        entity1_pos:    Option<Tensor<B, 1, Int>>,
        entity2_pos:    Option<Tensor<B, 1, Int>>,
    ) -> Result<Tensor<B, 2>, TrainError> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);

        let mut x = self.token_embedding.forward(input_ids)
            + self.position_embedding.forward(positions.clone());

        for (table, anchor, field) in [
            (&self.entity1_distance, &entity1_pos, "entity1_pos"),
            (&self.entity2_distance, &entity2_pos, "entity2_pos"),
        ] {
            if let Some(table) = table {
                let anchor = require(anchor, field)?;
                x = x + table.forward(self.relative_distance(positions.clone(), anchor.clone()));
            }
        }

        let pad_mask = attention_mask.map(|m| m.equal_elem(0));
        let mut x = self.dropout.forward(x);
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }
        let hidden = self.final_norm.forward(x); // [batch, seq_len, d_model]
        let [_, _, d_model] = hidden.dims();

        let pooled = match self.output_method.0 {
            OutputMethod::ClsToken => hidden
                .slice([0..batch_size, 0..1, 0..d_model])
                .reshape([batch_size, d_model]),
            OutputMethod::MentionPooling => {
                let subj = gather_rows(hidden.clone(), require(&entity1_pos, "entity1_pos")?.clone());
                let obj  = gather_rows(hidden, require(&entity2_pos, "entity2_pos")?.clone());
                (subj + obj).div_scalar(2.0)
            }
            OutputMethod::EntityStart => {
                let subj = gather_rows(hidden.clone(), require(&entity1_pos, "entity1_pos")?.clone());
                let obj  = gather_rows(hidden, require(&entity2_pos, "entity2_pos")?.clone());
                Tensor::cat(vec![subj, obj], 1)
            }
        };

        Ok(self.classifier.forward(self.dropout.forward(pooled)))
    }

    /// Forward the batch and score it against its labels.
    pub fn forward_classification(
        &self,
        batch: RelationBatch<B>,
    ) -> Result<ClassificationOutput<B>, TrainError> {
        let logits = self.forward(
            batch.input_ids,
            batch.attention_mask,
            batch.entity1_pos,
            batch.entity2_pos,
        )?;
        let ce = CrossEntropyLossConfig::new().init(&logits.device());
        let loss = ce.forward(logits.clone(), batch.labels);
        Ok(ClassificationOutput { loss, logits })
    }

    /// Clipped signed distance of every position to `anchor`, shifted to
    /// a non-negative embedding index.
    fn relative_distance(&self, positions: Tensor<B, 2, Int>, anchor: Tensor<B, 1, Int>) -> Tensor<B, 2, Int> {
        let [batch_size, seq_len] = positions.dims();
        let max = self.max_relative_distance as i64;
        let anchor = anchor.reshape([batch_size, 1]).expand([batch_size, seq_len]);
        (positions - anchor).clamp(-max, max).add_scalar(max)
    }
}

fn require<'a, T>(value: &'a Option<T>, field: &'static str) -> Result<&'a T, TrainError> {
    value
        .as_ref()
        .ok_or_else(|| TrainError::data("model", format!("{field} is required by this encoding")))
}

/// hidden: [batch, seq_len, d] at per-row positions [batch] → [batch, d]
fn gather_rows<B: Backend>(hidden: Tensor<B, 3>, positions: Tensor<B, 1, Int>) -> Tensor<B, 2> {
    let [batch_size, _, d_model] = hidden.dims();
    let index = positions
        .reshape([batch_size, 1, 1])
        .expand([batch_size, 1, d_model]);
    hidden.gather(1, index).reshape([batch_size, d_model])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::RelationBatcher;
    use crate::ml::fixtures::{synthetic_samples, tiny_config, TestBackend, NUM_LABELS, TEST_DEVICE};
    use burn::data::dataloader::batcher::Batcher;

    fn batch(with_positions: bool) -> RelationBatch<TestBackend> {
        RelationBatcher::<TestBackend>::new(TEST_DEVICE).batch(synthetic_samples(3, with_positions))
    }

    #[test]
    fn test_logit_shape_for_every_pooling() {
        for output in [OutputMethod::ClsToken, OutputMethod::MentionPooling, OutputMethod::EntityStart] {
            for input in [InputMethod::Standard, InputMethod::PositionalEmbedding, InputMethod::EntityMarkers] {
                let model = tiny_config(input, output).init::<TestBackend>(&TEST_DEVICE);
                let out = model.forward_classification(batch(true)).unwrap();
                assert_eq!(out.logits.dims(), [3, NUM_LABELS]);
                let loss: f64 = out.loss.into_scalar().elem::<f64>();
                assert!(loss.is_finite());
            }
        }
    }

    #[test]
    fn test_missing_positions_are_a_data_error() {
        let model = tiny_config(InputMethod::Standard, OutputMethod::EntityStart)
            .init::<TestBackend>(&TEST_DEVICE);
        assert!(matches!(
            model.forward_classification(batch(false)),
            Err(TrainError::Data { .. })
        ));

        let model = tiny_config(InputMethod::PositionalEmbedding, OutputMethod::ClsToken)
            .init::<TestBackend>(&TEST_DEVICE);
        assert!(model.forward_classification(batch(false)).is_err());
    }

    #[test]
    fn test_cls_pooling_runs_without_positions() {
        let model = tiny_config(InputMethod::Standard, OutputMethod::ClsToken)
            .init::<TestBackend>(&TEST_DEVICE);
        assert!(model.forward_classification(batch(false)).is_ok());
    }

    #[test]
    fn test_relative_distance_is_clipped() {
        let model = tiny_config(InputMethod::PositionalEmbedding, OutputMethod::ClsToken)
            .init::<TestBackend>(&TEST_DEVICE);
        let positions = Tensor::<TestBackend, 1, Int>::arange(0..6, &TEST_DEVICE)
            .unsqueeze::<2>()
            .expand([1, 6]);
        let anchor = Tensor::<TestBackend, 1, Int>::from_ints([5], &TEST_DEVICE);
        let idx = model
            .relative_distance(positions, anchor)
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .unwrap();
        // distances -5..=0 clipped to -4, shifted by +4
        assert_eq!(idx, vec![0, 0, 1, 2, 3, 4]);
    }
}
