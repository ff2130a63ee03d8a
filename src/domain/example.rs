// ============================================================
// Layer 3 — RelationExample Domain Type
// ============================================================
// One sentence with a subject mention, an object mention and
// the gold relation between them. Field names follow the TACRED
// JSON release so records deserialize directly.
//
// Spans are inclusive word indices into `tokens`:
//   tokens:  ["Bill", "Gates", "founded", "Microsoft", "."]
//   subject: 0..=1   object: 3..=3   relation: "org:founded_by"

use serde::{Deserialize, Serialize};

use crate::domain::error::TrainError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationExample {
    #[serde(default)]
    pub id: String,

    pub relation: String,

    #[serde(rename = "token")]
    pub tokens: Vec<String>,

    pub subj_start: usize,
    pub subj_end: usize,
    pub obj_start: usize,
    pub obj_end: usize,

    #[serde(default)]
    pub subj_type: String,
    #[serde(default)]
    pub obj_type: String,
}

impl RelationExample {
    /// Check that both spans are ordered and lie inside the sentence.
    pub fn validate(&self) -> Result<(), TrainError> {
        let n = self.tokens.len();
        for (role, start, end) in [
            ("subject", self.subj_start, self.subj_end),
            ("object", self.obj_start, self.obj_end),
        ] {
            if start > end || end >= n {
                return Err(TrainError::data(
                    "example",
                    format!(
                        "{role} span {start}..={end} invalid for {n} tokens in example '{}'",
                        self.id
                    ),
                ));
            }
        }
        Ok(())
    }
}
