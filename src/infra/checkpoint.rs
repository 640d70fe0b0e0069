// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model parameters with Burn's gzipped named
// MessagePack recorder (half precision),
// together with the TrainingState they belong to.
//
// Layout of one run directory (`<checkpoint_dir>/<model_dir>`):
//
//   model_step_500.mpk.gz    ← parameters after global step 500
//   model_step_1000.mpk.gz
//   ...
//   latest.json              ← {"global_step": 1000, "epoch": 2}
//   train_config.json        ← the ModelConfig of the run
//   vocab.json               ← written by VocabStore
//
// latest.json is written only after the parameters were recorded,
// so it never points at a missing file.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{HalfPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

use crate::application::config::ModelConfig;
use crate::domain::state::TrainingState;
use crate::ml::model::RcmnModel;

const LATEST_FILE: &str = "latest.json";
const CONFIG_FILE: &str = "train_config.json";

type CheckpointRecorder = NamedMpkGzFileRecorder<HalfPrecisionSettings>;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn model_path(&self, global_step: usize) -> PathBuf {
        // The recorder appends .mpk.gz itself
        self.dir.join(format!("model_step_{global_step}"))
    }

    /// Record the parameters under the state's global step and
    /// point latest.json at them.
    pub fn save<B: Backend>(&self, model: &RcmnModel<B>, state: &TrainingState) -> Result<()> {
        let path = self.model_path(state.global_step);

        CheckpointRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest = self.dir.join(LATEST_FILE);
        fs::write(&latest, serde_json::to_string(state)?)
            .with_context(|| format!("Failed to write '{}'", latest.display()))?;

        tracing::debug!(
            "Saved checkpoint: step {} (epoch {})",
            state.global_step, state.epoch
        );
        Ok(())
    }

    /// The state of the newest checkpoint, or None before the first save.
    pub fn latest_state(&self) -> Result<Option<TrainingState>> {
        let path = self.dir.join(LATEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        let state = serde_json::from_str(&json)
            .with_context(|| format!("Corrupt checkpoint pointer '{}'", path.display()))?;
        Ok(Some(state))
    }

    /// Restore the newest checkpoint into `model`.
    /// Ok(None) means nothing has been saved yet.
    pub fn load_latest<B: Backend>(
        &self,
        model:  RcmnModel<B>,
        device: &B::Device,
    ) -> Result<Option<(RcmnModel<B>, TrainingState)>> {
        let Some(state) = self.latest_state()? else {
            return Ok(None);
        };
        let path = self.model_path(state.global_step);

        tracing::info!(
            "Loading checkpoint from step {} (epoch {})",
            state.global_step, state.epoch
        );

        let record = CheckpointRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Does it match the configured architecture?",
                    path.display()
                )
            })?;

        Ok(Some((model.load_record(record), state)))
    }

    /// Written before training so eval can rebuild the exact model.
    pub fn save_config(&self, cfg: &ModelConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<ModelConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' first.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid config in '{}'", path.display()))
    }
}
