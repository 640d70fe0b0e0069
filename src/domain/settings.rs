// ============================================================
// Layer 3 — Settings Enums
// ============================================================
// The closed sets of choices a run can be configured with.
// Each one parses from the exact strings the CLI and the saved
// train_config.json use. Anything else is a configuration error
// and is rejected before a model is ever built.
//
//   RnnType       → "GRU" | "LSTM"
//   OptimizerKind → "adam" | "adagrad" (alias "ada")
//   DatasetKind   → "ptb"
//   RunMode       → "train" | "eval"

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Kind of recurrent cell stacked inside the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RnnType {
    #[serde(rename = "GRU")]
    Gru,
    #[serde(rename = "LSTM")]
    Lstm,
}

impl FromStr for RnnType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GRU" => Ok(Self::Gru),
            "LSTM" => Ok(Self::Lstm),
            other => bail!("Unknown rnn cell type: '{other}' (expected GRU or LSTM)"),
        }
    }
}

impl fmt::Display for RnnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gru => write!(f, "GRU"),
            Self::Lstm => write!(f, "LSTM"),
        }
    }
}

/// Adaptive optimizer applied to the clipped gradients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    #[serde(rename = "adam")]
    Adam,
    #[serde(rename = "adagrad", alias = "ada")]
    AdaGrad,
}

impl FromStr for OptimizerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "adam" => Ok(Self::Adam),
            "adagrad" | "ada" => Ok(Self::AdaGrad),
            other => bail!("Unknown optimizer: '{other}' (expected adam or adagrad)"),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adam => write!(f, "adam"),
            Self::AdaGrad => write!(f, "adagrad"),
        }
    }
}

/// Corpora the reader knows how to load.
/// Only the Penn Treebank layout is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetKind {
    #[serde(rename = "ptb")]
    Ptb,
}

impl DatasetKind {
    /// Directory name under the data root, e.g. `./data/ptb`
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Ptb => "ptb",
        }
    }
}

impl FromStr for DatasetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ptb" => Ok(Self::Ptb),
            other => bail!("Unknown dataset: '{other}' (only 'ptb' is supported)"),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Whether a run trains the model or only scores a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    #[serde(rename = "train")]
    Train,
    #[serde(rename = "eval")]
    Eval,
}

impl FromStr for RunMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train" => Ok(Self::Train),
            "eval" => Ok(Self::Eval),
            other => bail!("Unknown mode: '{other}' (expected train or eval)"),
        }
    }
}
