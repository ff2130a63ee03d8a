// ============================================================
// Layer 4 — Relation Encoder
// ============================================================
// Turns one RelationExample into a fixed-length RelationSample:
//
//   standard / positional_embedding:
//     [CLS] w0 w1 … wn [SEP] [PAD]…
//   entity_markers:
//     [CLS] … [E1] subj … [/E1] … [E2] obj … [/E2] … [SEP] [PAD]…
//
// Words are tokenized one at a time so the first sub-token of
// each word is known exactly. The entity positions point at the
// first sub-token of each mention, or at its opening marker.

use anyhow::{Context, Result};
use tokenizers::Tokenizer;

use crate::data::dataset::RelationSample;
use crate::domain::{
    error::TrainError,
    example::RelationExample,
    labels::LabelMap,
    methods::{carries_entity_positions, InputMethod, OutputMethod},
};
use crate::infra::tokenizer_store::{OBJECT_END, OBJECT_START, SUBJECT_END, SUBJECT_START};

struct SpecialIds {
    cls: u32,
    sep: u32,
    pad: u32,
    markers: Option<[u32; 4]>,
}

pub struct RelationEncoder<'a> {
    tokenizer: &'a Tokenizer,
    max_length: usize,
    with_positions: bool,
    ids: SpecialIds,
}

impl<'a> RelationEncoder<'a> {
    pub fn new(
        tokenizer: &'a Tokenizer,
        max_length: usize,
        input_method: InputMethod,
        output_method: OutputMethod,
    ) -> Result<Self> {
        let lookup = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| TrainError::data("tokenizer", format!("vocabulary has no '{token}'")))
        };

        let markers = if input_method.uses_entity_markers() {
            Some([
                lookup(SUBJECT_START)?,
                lookup(SUBJECT_END)?,
                lookup(OBJECT_START)?,
                lookup(OBJECT_END)?,
            ])
        } else {
            None
        };

        let ids = SpecialIds {
            cls: lookup("[CLS]")?,
            sep: lookup("[SEP]")?,
            pad: lookup("[PAD]")?,
            markers,
        };

        Ok(Self {
            tokenizer,
            max_length,
            with_positions: carries_entity_positions(input_method, output_method),
            ids,
        })
    }

    pub fn encode(&self, example: &RelationExample, labels: &LabelMap) -> Result<RelationSample> {
        let label = labels.id(&example.relation)?;
        let markers = self.ids.markers;

        let mut input_ids = vec![self.ids.cls];
        let mut subj_pos = 0usize;
        let mut obj_pos = 0usize;

        for (i, word) in example.tokens.iter().enumerate() {
            if i == example.subj_start {
                subj_pos = input_ids.len();
                if let Some([e1, ..]) = markers {
                    input_ids.push(e1);
                }
            }
            if i == example.obj_start {
                obj_pos = input_ids.len();
                if let Some([_, _, e2, _]) = markers {
                    input_ids.push(e2);
                }
            }

            let enc = self
                .tokenizer
                .encode(ptb_unescape(word), false)
                .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))
                .with_context(|| format!("example '{}', word {i}", example.id))?;
            input_ids.extend_from_slice(enc.get_ids());

            if i == example.subj_end {
                if let Some([_, e1_end, ..]) = markers {
                    input_ids.push(e1_end);
                }
            }
            if i == example.obj_end {
                if let Some([.., e2_end]) = markers {
                    input_ids.push(e2_end);
                }
            }
        }

        // Keep room for the closing [SEP]
        input_ids.truncate(self.max_length - 1);
        input_ids.push(self.ids.sep);

        let last = self.max_length - 1;
        if subj_pos > last || obj_pos > last {
            tracing::debug!(
                "Example '{}' truncated past an entity; clamping positions",
                example.id
            );
        }

        let seq_len = input_ids.len();
        let mut attention_mask = vec![1u32; seq_len];
        input_ids.resize(self.max_length, self.ids.pad);
        attention_mask.resize(self.max_length, 0);

        let (entity1_pos, entity2_pos) = if self.with_positions {
            (Some(subj_pos.min(last)), Some(obj_pos.min(last)))
        } else {
            (None, None)
        };

        Ok(RelationSample {
            label,
            input_ids,
            attention_mask,
            entity1_pos,
            entity2_pos,
        })
    }
}

/// Undo the Penn Treebank bracket escapes used in TACRED tokens.
fn ptb_unescape(word: &str) -> &str {
    match word {
        "-LRB-" => "(",
        "-RRB-" => ")",
        "-LSB-" => "[",
        "-RSB-" => "]",
        "-LCB-" => "{",
        "-RCB-" => "}",
        other => other,
    }
}
