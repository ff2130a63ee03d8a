use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions raised by the training core.
///
/// None of these are retried: each one surfaces to the training
/// controller and terminates the run.
#[derive(Error, Debug)]
pub enum TrainError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("data error in {component}: {message}")]
    Data {
        component: &'static str,
        message: String,
    },

    #[error("non-finite loss {loss} at epoch {epoch}, global step {step}")]
    NonFiniteLoss { epoch: usize, step: usize, loss: f64 },

    #[error("non-finite evaluation loss {loss} in batch {batch}")]
    NonFiniteEvalLoss { batch: usize, loss: f64 },

    #[error("checkpoint {action} failed for epoch {epoch} at '{}'", path.display())]
    Persistence {
        action: &'static str,
        epoch: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TrainError {
    pub fn data(component: &'static str, message: impl Into<String>) -> Self {
        Self::Data {
            component,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_location() {
        let err = TrainError::NonFiniteLoss { epoch: 3, step: 120, loss: f64::NAN };
        assert_eq!(err.to_string(), "non-finite loss NaN at epoch 3, global step 120");

        let err = TrainError::NonFiniteEvalLoss { batch: 2, loss: f64::INFINITY };
        assert_eq!(err.to_string(), "non-finite evaluation loss inf in batch 2");

        let err = TrainError::data("batcher", "labels has 4 rows, input_ids has 3");
        assert_eq!(
            err.to_string(),
            "data error in batcher: labels has 4 rows, input_ids has 3"
        );
    }
}
