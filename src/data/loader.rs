// ============================================================
// Layer 4 — TACRED Loader
// ============================================================
// Reads `{data_dir}/{split}.json`, each file a JSON array of
// RelationExample records.
//
// Unlike a best-effort document crawler, a broken record is not
// skipped: a malformed file or an out-of-range span aborts the
// run before training starts.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::{
    example::RelationExample,
    traits::{ExampleSource, Split},
};

/// Loads TACRED-format JSON splits from a directory.
pub struct TacredLoader {
    dir: PathBuf,
}

impl TacredLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn split_path(&self, split: Split) -> PathBuf {
        self.dir.join(format!("{}.json", split.name()))
    }
}

impl ExampleSource for TacredLoader {
    fn load_split(&self, split: Split) -> Result<Vec<RelationExample>> {
        let path = self.split_path(split);

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read {} split '{}'", split.name(), path.display()))?;

        let examples: Vec<RelationExample> = serde_json::from_str(&json)
            .with_context(|| format!("Malformed {} split '{}'", split.name(), path.display()))?;

        for ex in &examples {
            ex.validate()
                .with_context(|| format!("Invalid record in '{}'", path.display()))?;
        }

        tracing::info!(
            "Loaded {} {} examples from '{}'",
            examples.len(),
            split.name(),
            path.display()
        );
        Ok(examples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_split(dir: &std::path::Path, split: Split, body: &str) {
        fs::write(dir.join(format!("{}.json", split.name())), body).unwrap();
    }

    #[test]
    fn test_loads_records_in_file_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_split(
            tmp.path(),
            Split::Dev,
            r#"[
                {"id": "a", "relation": "per:title", "token": ["Ann", "is", "CEO"],
                 "subj_start": 0, "subj_end": 0, "obj_start": 2, "obj_end": 2},
                {"id": "b", "relation": "no_relation", "token": ["It", "rained"],
                 "subj_start": 0, "subj_end": 0, "obj_start": 1, "obj_end": 1}
            ]"#,
        );

        let examples = TacredLoader::new(tmp.path()).load_split(Split::Dev).unwrap();
        let ids: Vec<&str> = examples.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_missing_split_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(TacredLoader::new(tmp.path()).load_split(Split::Test).is_err());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_split(tmp.path(), Split::Train, r#"[{"id": "a"}]"#);
        assert!(TacredLoader::new(tmp.path()).load_split(Split::Train).is_err());
    }

    #[test]
    fn test_invalid_span_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_split(
            tmp.path(),
            Split::Train,
            r#"[{"relation": "per:title", "token": ["Ann"],
                 "subj_start": 0, "subj_end": 0, "obj_start": 0, "obj_end": 3}]"#,
        );
        assert!(TacredLoader::new(tmp.path()).load_split(Split::Train).is_err());
    }
}
