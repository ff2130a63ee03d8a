// ============================================================
// Layer 6 — Metrics History and TSV Log
// ============================================================
// One EpochMetrics row per finished epoch. The history stays in
// memory (plots are redrawn from it) and each row is also written
// to a tab-separated log in the run directory:
//
//   # epoch	train_loss	dev_loss	dev_f1
//   1	2.314512	2.101934	0.4120
//   2	1.876020	1.944871	0.4873
//
// The log is recreated at the start of every run.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::domain::scorer::Score;

pub const LOG_HEADER: &str = "# epoch\ttrain_loss\tdev_loss\tdev_f1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:         usize,
    pub train_loss:    f64,
    pub dev_loss:      f64,
    pub dev_precision: f64,
    pub dev_recall:    f64,
    pub dev_f1:        f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, dev_loss: f64, dev: Score) -> Self {
        Self {
            epoch,
            train_loss,
            dev_loss,
            dev_precision: dev.precision,
            dev_recall:    dev.recall,
            dev_f1:        dev.f1,
        }
    }

    /// The row written to the TSV log, without newline.
    pub fn log_row(&self) -> String {
        format!(
            "{}\t{:.6}\t{:.6}\t{:.4}",
            self.epoch, self.train_loss, self.dev_loss, self.dev_f1
        )
    }
}

/// Append-only, epoch-ordered record of a run.
#[derive(Debug, Clone, Default)]
pub struct MetricsHistory {
    records: Vec<EpochMetrics>,
}

impl MetricsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, m: EpochMetrics) {
        self.records.push(m);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn train_loss(&self) -> Vec<(usize, f64)> {
        self.records.iter().map(|m| (m.epoch, m.train_loss)).collect()
    }

    pub fn dev_loss(&self) -> Vec<(usize, f64)> {
        self.records.iter().map(|m| (m.epoch, m.dev_loss)).collect()
    }

    pub fn dev_f1(&self) -> Vec<(usize, f64)> {
        self.records.iter().map(|m| (m.epoch, m.dev_f1)).collect()
    }

    /// First epoch reaching the highest dev F1.
    pub fn best(&self) -> Option<&EpochMetrics> {
        let mut best: Option<&EpochMetrics> = None;
        for m in &self.records {
            let better = match best {
                None => true,
                Some(b) if b.dev_f1.is_nan() => !m.dev_f1.is_nan(),
                Some(b) => m.dev_f1 > b.dev_f1,
            };
            if better {
                best = Some(m);
            }
        }
        best
    }
}

pub struct MetricsLogger {
    path: PathBuf,
}

impl MetricsLogger {
    /// Truncate (or create) `dir/filename` and write the header.
    pub fn create(dir: &Path, filename: &str) -> Result<Self> {
        let path = dir.join(filename);
        let mut f = fs::File::create(&path)
            .with_context(|| format!("Cannot create log file '{}'", path.display()))?;
        writeln!(f, "{LOG_HEADER}")?;
        tracing::debug!("Created epoch log: '{}'", path.display());
        Ok(Self { path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Cannot append to log file '{}'", self.path.display()))?;
        writeln!(f, "{}", m.log_row())?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn metrics(epoch: usize, f1: f64) -> EpochMetrics {
        EpochMetrics::new(
            epoch,
            1.0 / epoch as f64,
            0.5,
            Score { precision: f1, recall: f1, f1 },
        )
    }

    #[test]
    fn test_row_format() {
        let m = EpochMetrics::new(
            3,
            0.123456789,
            2.0,
            Score { precision: 0.5, recall: 0.25, f1: 1.0 / 3.0 },
        );
        assert_eq!(m.log_row(), "3\t0.123457\t2.000000\t0.3333");
    }

    #[test]
    fn test_best_is_first_maximum() {
        let mut h = MetricsHistory::new();
        assert!(h.best().is_none());
        for (e, f1) in [(1, 0.4), (2, 0.7), (3, 0.7), (4, 0.65)] {
            h.push(metrics(e, f1));
        }
        assert_eq!(h.best().unwrap().epoch, 2);
        assert_eq!(h.dev_f1(), vec![(1, 0.4), (2, 0.7), (3, 0.7), (4, 0.65)]);
        assert_eq!(h.len(), 4);
    }

    #[test]
    fn test_nan_never_displaces_a_best() {
        let mut h = MetricsHistory::new();
        h.push(metrics(1, 0.3));
        h.push(metrics(2, f64::NAN));
        assert_eq!(h.best().unwrap().epoch, 1);
    }

    #[test]
    fn test_log_is_recreated_each_run() {
        let tmp = tempdir().unwrap();

        let logger = MetricsLogger::create(tmp.path(), "logs.txt").unwrap();
        logger.log(&metrics(1, 0.5)).unwrap();
        logger.log(&metrics(2, 0.6)).unwrap();
        let text = fs::read_to_string(logger.path()).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(text.lines().next(), Some(LOG_HEADER));

        let logger = MetricsLogger::create(tmp.path(), "logs.txt").unwrap();
        logger.log(&metrics(1, 0.5)).unwrap();
        let text = fs::read_to_string(logger.path()).unwrap();
        assert_eq!(text, format!("{LOG_HEADER}\n1\t1.000000\t0.500000\t0.5000\n"));
    }
}
