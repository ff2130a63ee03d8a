// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Owns the on-disk checkpoint set of one run directory:
//
//   <run_dir>/
//     ckpt_epoch_{n}.mpk.gz   ← kept only when n % save_epoch == 0
//     best_model.mpk.gz       ← copy of the earliest epoch with the
//                               highest dev F1 seen so far
//     config.json             ← resolved TrainConfig
//
// After every epoch `commit` does, in order:
//   1. SAVE     the model under ckpt_epoch_{n}
//   2. COMPARE  dev F1 against the best so far (strictly greater wins)
//               and copy the saved file over best_model
//   3. PRUNE    the per-epoch file unless the epoch is retained
//
// Any failure in these steps is fatal for the run.
//
// Checkpoints are half-precision gzipped MessagePack (.mpk.gz);
// best_model always gets the same extension as the saved file.

use anyhow::{Context, Result};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{FileRecorder, HalfPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::error::TrainError;
use crate::ml::model::RelationClassifier;

pub const BEST_MODEL: &str = "best_model";
pub const CONFIG_FILE: &str = "config.json";

type CheckpointRecorder = NamedMpkGzFileRecorder<HalfPrecisionSettings>;

/// What happened to one epoch's checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointRecord {
    pub epoch:     usize,
    /// Where the per-epoch checkpoint was written
    pub file_path: PathBuf,
    pub is_best:   bool,
    /// False when the per-epoch file was deleted again
    pub retained:  bool,
}

pub struct CheckpointManager {
    dir:        PathBuf,
    save_epoch: usize,
    /// (epoch, dev_f1) of the current best_model
    best:       Option<(usize, f64)>,
}

impl CheckpointManager {
    /// Creates `dir` (and parents) if needed.
    pub fn new(dir: impl Into<PathBuf>, save_epoch: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create run directory '{}'", dir.display()))?;
        Ok(Self { dir, save_epoch: save_epoch.max(1), best: None })
    }

    /// Path handed to the recorder for `epoch`, without extension.
    pub fn epoch_stem(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("ckpt_epoch_{epoch}"))
    }

    pub fn best_stem(&self) -> PathBuf {
        self.dir.join(BEST_MODEL)
    }

    /// (epoch, dev_f1) of the current best checkpoint.
    pub fn best(&self) -> Option<(usize, f64)> {
        self.best
    }

    fn improves(&self, dev_f1: f64) -> bool {
        match self.best {
            None => true,
            Some((_, best)) if best.is_nan() => !dev_f1.is_nan(),
            Some((_, best)) => dev_f1 > best,
        }
    }

    /// Save, compare and prune for one finished epoch.
    ///
    /// `save` receives the extension-less stem and returns the path of
    /// the file it actually wrote.
    pub fn commit<F>(&mut self, epoch: usize, dev_f1: f64, save: F) -> Result<CheckpointRecord, TrainError>
    where
        F: FnOnce(&Path) -> io::Result<PathBuf>,
    {
        let stem = self.epoch_stem(epoch);
        let file_path = save(&stem).map_err(|source| TrainError::Persistence {
            action: "save",
            epoch,
            path: stem.clone(),
            source,
        })?;

        let is_best = self.improves(dev_f1);
        if is_best {
            let best_path = self.best_path_for(&stem, &file_path);
            fs::copy(&file_path, &best_path).map_err(|source| TrainError::Persistence {
                action: "copy",
                epoch,
                path: best_path.clone(),
                source,
            })?;
            self.best = Some((epoch, dev_f1));
            tracing::debug!("Epoch {} is the new best, copied to '{}'", epoch, best_path.display());
        }

        let retained = epoch % self.save_epoch == 0;
        if !retained {
            fs::remove_file(&file_path).map_err(|source| TrainError::Persistence {
                action: "delete",
                epoch,
                path: file_path.clone(),
                source,
            })?;
        }

        Ok(CheckpointRecord { epoch, file_path, is_best, retained })
    }

    /// best_model plus whatever suffix the recorder put after `stem`.
    fn best_path_for(&self, stem: &Path, written: &Path) -> PathBuf {
        let stem_name = stem.file_name().and_then(|s| s.to_str()).unwrap_or_default();
        let suffix = written
            .file_name()
            .and_then(|s| s.to_str())
            .and_then(|name| name.strip_prefix(stem_name))
            .unwrap_or_default();
        self.dir.join(format!("{BEST_MODEL}{suffix}"))
    }
}

/// Extension the checkpoint recorder appends to a stem.
pub fn checkpoint_extension<B: Backend>() -> &'static str {
    <CheckpointRecorder as FileRecorder<B>>::file_extension()
}

/// Serialise `model` under `stem`. Returns the full path of the written file.
pub fn save_model<B: Backend>(model: &RelationClassifier<B>, stem: &Path) -> io::Result<PathBuf> {
    CheckpointRecorder::new()
        .record(model.clone().into_record(), stem.to_path_buf())
        .map_err(|e| io::Error::other(e.to_string()))?;
    Ok(stem.with_extension(checkpoint_extension::<B>()))
}

/// `runs/x/best_model.mpk.gz` and `runs/x/best_model` both name the
/// checkpoint stored under the stem `runs/x/best_model`.
pub fn checkpoint_stem<B: Backend>(path: &Path) -> PathBuf {
    let suffix = format!(".{}", checkpoint_extension::<B>());
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or_default();
    match name.strip_suffix(suffix.as_str()) {
        Some(stem) if !stem.is_empty() => path.with_file_name(stem),
        _ => path.to_path_buf(),
    }
}

/// Restore weights saved under `stem` into a model of the same shape.
pub fn load_model<B: Backend>(
    model:  RelationClassifier<B>,
    stem:   &Path,
    device: &B::Device,
) -> Result<RelationClassifier<B>> {
    let record = CheckpointRecorder::new()
        .load(stem.to_path_buf(), device)
        .with_context(|| format!("Cannot load checkpoint '{}'", stem.display()))?;
    Ok(model.load_record(record))
}

pub fn save_config(dir: &Path, cfg: &TrainConfig) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(cfg)?;
    fs::write(&path, json)
        .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
    tracing::debug!("Saved run config to '{}'", path.display());
    Ok(path)
}

pub fn load_config(dir: &Path) -> Result<TrainConfig> {
    let path = dir.join(CONFIG_FILE);
    let json = fs::read_to_string(&path).with_context(|| {
        format!(
            "Cannot read config from '{}'. Is this a training run directory?",
            path.display()
        )
    })?;
    serde_json::from_str(&json).with_context(|| format!("Malformed config '{}'", path.display()))
}
