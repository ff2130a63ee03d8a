// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training core only talks to its collaborators through
// these traits:
//   - TacredLoader implements ExampleSource
//   - RelationSplit implements Scorer
// A different corpus format only needs a new ExampleSource.

use anyhow::Result;

use crate::domain::{example::RelationExample, scorer::Score};

// ─── Split ────────────────────────────────────────────────────────────────────
/// The three partitions of a relation-extraction corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Dev,
    Test,
}

impl Split {
    pub fn name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Dev => "dev",
            Split::Test => "test",
        }
    }
}

impl std::str::FromStr for Split {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "train" => Ok(Split::Train),
            "dev" => Ok(Split::Dev),
            "test" => Ok(Split::Test),
            other => anyhow::bail!("unknown split '{other}' (expected train, dev or test)"),
        }
    }
}

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Any component that can produce the examples of one split.
pub trait ExampleSource {
    /// Load every example of `split`, in file order.
    fn load_split(&self, split: Split) -> Result<Vec<RelationExample>>;
}

// ─── Scorer ───────────────────────────────────────────────────────────────────
/// A split that knows its own gold labels and can score predictions
/// given in the same example order.
pub trait Scorer {
    fn evaluate(&self, predictions: &[String]) -> Result<Score>;
}
