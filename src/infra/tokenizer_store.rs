// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads a HuggingFace `tokenizer.json` and, for the
// entity-marker encoding, registers the four marker tokens as
// special tokens so they are never split or lower-cased.
//
// Training and evaluation both go through `load`, so the marker
// ids (and therefore the vocabulary size) always agree.

use anyhow::Result;
use std::path::PathBuf;
use tokenizers::{AddedToken, Tokenizer};

use crate::domain::methods::InputMethod;

pub const SUBJECT_START: &str = "[E1]";
pub const SUBJECT_END: &str = "[/E1]";
pub const OBJECT_START: &str = "[E2]";
pub const OBJECT_END: &str = "[/E2]";

pub const ENTITY_MARKERS: [&str; 4] = [SUBJECT_START, SUBJECT_END, OBJECT_START, OBJECT_END];

pub struct TokenizerStore {
    path: PathBuf,
}

impl TokenizerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the tokenizer prepared for `input_method`.
    pub fn load(&self, input_method: InputMethod) -> Result<Tokenizer> {
        let mut tokenizer = Tokenizer::from_file(&self.path).map_err(|e| {
            anyhow::anyhow!("Cannot load tokenizer from '{}': {}", self.path.display(), e)
        })?;

        if input_method.uses_entity_markers() {
            let added = register_entity_markers(&mut tokenizer);
            tracing::debug!("Registered {} entity marker tokens", added);
        }

        tracing::info!(
            "Tokenizer loaded from '{}' (vocab size {})",
            self.path.display(),
            vocab_size(&tokenizer)
        );
        Ok(tokenizer)
    }
}

/// Embedding table size needed to cover every id the tokenizer can emit.
pub fn vocab_size(tokenizer: &Tokenizer) -> usize {
    tokenizer
        .get_vocab(true)
        .values()
        .max()
        .map_or(0, |&max| max as usize + 1)
}

/// Add the entity markers as special tokens; returns how many were new.
pub fn register_entity_markers(tokenizer: &mut Tokenizer) -> usize {
    let markers: Vec<AddedToken> = ENTITY_MARKERS
        .iter()
        .map(|m| AddedToken::from(*m, true))
        .collect();
    tokenizer.add_special_tokens(&markers)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::str::FromStr;

    /// A whitespace word-level tokenizer over `words` plus BERT specials.
    pub(crate) fn word_level_tokenizer(words: &[&str]) -> Tokenizer {
        let mut vocab = serde_json::json!({
            "[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "[SEP]": 3,
        });
        for (i, w) in words.iter().enumerate() {
            vocab[*w] = serde_json::json!(4 + i);
        }
        let special = |id: u32, content: &str| {
            serde_json::json!({
                "id": id, "content": content, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            })
        };
        let json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                special(0, "[PAD]"), special(1, "[UNK]"),
                special(2, "[CLS]"), special(3, "[SEP]"),
            ],
            "normalizer": null,
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": { "type": "WordLevel", "vocab": vocab, "unk_token": "[UNK]" }
        });
        Tokenizer::from_str(&json.to_string()).unwrap()
    }

    #[test]
    fn test_markers_get_fresh_ids() {
        let mut tok = word_level_tokenizer(&["alice", "works"]);
        let model_vocab = tok.get_vocab_size(false);
        assert_eq!(register_entity_markers(&mut tok), 4);

        let mut ids: Vec<u32> = ENTITY_MARKERS
            .iter()
            .map(|m| tok.token_to_id(m).unwrap())
            .collect();
        assert!(ids.iter().all(|&id| id as usize >= model_vocab));
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert_eq!(vocab_size(&tok), model_vocab + 4);
    }

    #[test]
    fn test_load_from_file_adds_markers_only_when_asked() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tokenizer.json");
        word_level_tokenizer(&["alice"]).save(&path, false).unwrap();

        let store = TokenizerStore::new(&path);
        let plain = store.load(InputMethod::Standard).unwrap();
        let marked = store.load(InputMethod::EntityMarkers).unwrap();
        assert!(plain.token_to_id(SUBJECT_START).is_none());
        assert!(marked.token_to_id(SUBJECT_START).is_some());
    }
}
