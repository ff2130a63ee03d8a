// ============================================================
// Layer 3 — Method Selectors
// ============================================================
// Each selector is a closed enumeration. Values arrive from the
// command line either by name ("entity_markers") or by the legacy
// 1-based numeric code ("3"); anything else is rejected while the
// configuration is parsed, long before the first batch runs.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::error::TrainError;

/// Shared parsing for the closed selector enums.
pub trait Selector: Sized + Copy + PartialEq + 'static {
    /// Human readable kind used in error messages
    const KIND: &'static str;

    /// Every member with its canonical name, in legacy code order
    const VARIANTS: &'static [(Self, &'static str)];

    fn name(self) -> &'static str {
        Self::VARIANTS
            .iter()
            .find(|(v, _)| *v == self)
            .map(|(_, n)| *n)
            .unwrap_or("unknown")
    }

    fn parse_selector(raw: &str) -> Result<Self, TrainError> {
        let raw = raw.trim();

        if let Ok(code) = raw.parse::<usize>() {
            return code
                .checked_sub(1)
                .and_then(|i| Self::VARIANTS.get(i))
                .map(|(v, _)| *v)
                .ok_or_else(|| {
                    TrainError::config(format!(
                        "{} code {} is out of range 1..={}",
                        Self::KIND,
                        code,
                        Self::VARIANTS.len()
                    ))
                });
        }

        Self::VARIANTS
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(raw))
            .map(|(v, _)| *v)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::VARIANTS.iter().map(|(_, n)| *n).collect();
                TrainError::config(format!(
                    "unknown {} '{}' (expected one of: {})",
                    Self::KIND,
                    raw,
                    known.join(", ")
                ))
            })
    }
}

macro_rules! selector_traits {
    ($ty:ty) => {
        impl FromStr for $ty {
            type Err = TrainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty as Selector>::parse_selector(s)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

// ─── InputMethod ──────────────────────────────────────────────────────────────
/// How the subject and object are made visible to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMethod {
    /// Plain sentence, no entity information in the input
    Standard,
    /// Learned embeddings of each token's distance to both entities
    PositionalEmbedding,
    /// `[E1] … [/E1]` and `[E2] … [/E2]` inserted around the mentions
    EntityMarkers,
}

impl Selector for InputMethod {
    const KIND: &'static str = "input method";
    const VARIANTS: &'static [(Self, &'static str)] = &[
        (Self::Standard, "standard"),
        (Self::PositionalEmbedding, "positional_embedding"),
        (Self::EntityMarkers, "entity_markers"),
    ];
}

selector_traits!(InputMethod);

impl InputMethod {
    pub fn uses_entity_markers(self) -> bool {
        matches!(self, Self::EntityMarkers)
    }

    pub fn uses_relative_positions(self) -> bool {
        matches!(self, Self::PositionalEmbedding)
    }
}

// ─── OutputMethod ─────────────────────────────────────────────────────────────
/// How the encoder's hidden states are pooled into one vector per example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMethod {
    /// Hidden state of the leading `[CLS]` token
    ClsToken,
    /// Mean of the subject and object hidden states
    MentionPooling,
    /// Concatenation of the subject and object start hidden states
    EntityStart,
}

impl Selector for OutputMethod {
    const KIND: &'static str = "output method";
    const VARIANTS: &'static [(Self, &'static str)] = &[
        (Self::ClsToken, "cls_token"),
        (Self::MentionPooling, "mention_pooling"),
        (Self::EntityStart, "entity_start"),
    ];
}

selector_traits!(OutputMethod);

impl OutputMethod {
    pub fn needs_entity_positions(self) -> bool {
        !matches!(self, Self::ClsToken)
    }

    /// Width of the pooled vector in multiples of d_model
    pub fn pooled_width(self) -> usize {
        match self {
            Self::ClsToken | Self::MentionPooling => 1,
            Self::EntityStart => 2,
        }
    }
}

/// Whether batches for this encoding carry entity position tensors.
/// Decided once per run so presence is consistent across all batches.
pub fn carries_entity_positions(input: InputMethod, output: OutputMethod) -> bool {
    input != InputMethod::Standard || output.needs_entity_positions()
}

// ─── OptimizerKind ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    #[serde(rename = "sgd")]
    Sgd,
    #[serde(rename = "adam")]
    Adam,
    #[serde(rename = "adamw")]
    AdamW,
}

impl Selector for OptimizerKind {
    const KIND: &'static str = "optimizer";
    const VARIANTS: &'static [(Self, &'static str)] = &[
        (Self::Sgd, "sgd"),
        (Self::Adam, "adam"),
        (Self::AdamW, "adamw"),
    ];
}

selector_traits!(OptimizerKind);

// ─── SchedulerKind ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    /// Linear warmup followed by linear decay to zero
    LinearWarmup,
    /// No scheduler: every optimizer step uses the base learning rate
    Constant,
}

impl Selector for SchedulerKind {
    const KIND: &'static str = "scheduler";
    const VARIANTS: &'static [(Self, &'static str)] = &[
        (Self::LinearWarmup, "linear_warmup"),
        (Self::Constant, "constant"),
    ];
}

selector_traits!(SchedulerKind);
