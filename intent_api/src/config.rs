// src/config.rs

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_WARMUP_TEXT: &str = "查询移民融入服务站及相关信息";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Process-level settings, read from the environment after `.env` is loaded.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub nlu_config: PathBuf,
    pub log_dir: PathBuf,
    pub log_prefix: String,
    pub log_keep: usize,
    pub cors_origin: Option<String>,
    pub warmup_text: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests don't have to touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let port_raw = get("INTENT_PORT", "8080");
        let port = port_raw
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue {
                key: "INTENT_PORT",
                value: port_raw.clone(),
            })?;

        let keep_raw = get("INTENT_LOG_KEEP", "7");
        let log_keep = match keep_raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "INTENT_LOG_KEEP",
                    value: keep_raw,
                });
            }
        };

        Ok(Self {
            host: get("INTENT_HOST", "127.0.0.1"),
            port,
            nlu_config: PathBuf::from(get("INTENT_NLU_CONFIG", "config/crosswoz_all.json")),
            log_dir: PathBuf::from(get("INTENT_LOG_DIR", "log")),
            log_prefix: get("INTENT_LOG_PREFIX", "intent"),
            log_keep,
            cors_origin: lookup("INTENT_CORS_ORIGIN").filter(|v| !v.trim().is_empty()),
            warmup_text: get("INTENT_WARMUP_TEXT", DEFAULT_WARMUP_TEXT),
        })
    }
}

/// JointBERT settings, in the layout of the training config files.
#[derive(Debug, Clone, Deserialize)]
pub struct NluConfig {
    #[serde(rename = "DEVICE", default = "default_device")]
    pub device: String,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub model: ModelConfig,
    #[serde(skip)]
    root_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub pretrained_weights: String,
    #[serde(default)]
    pub context: bool,
    #[serde(default)]
    pub hidden_units: usize,
    #[serde(default = "default_context_size")]
    pub context_size: usize,
    #[serde(default = "default_max_seq_len")]
    pub max_seq_len: usize,
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_context_size() -> usize {
    1
}

fn default_max_seq_len() -> usize {
    512
}

impl NluConfig {
    /// Reads the config file. Relative `data_dir`/`output_dir` resolve against
    /// the project root, i.e. the parent of the directory holding the file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: NluConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.root_dir = path
            .parent()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root_dir.join(p)
        }
    }

    pub fn intent_vocab_path(&self) -> PathBuf {
        self.resolve(&self.data_dir).join("intent_vocab.json")
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    /// `pretrained_weights` as a local directory, if it names one.
    pub fn local_pretrained_dir(&self) -> Option<PathBuf> {
        let candidate = self.resolve(Path::new(&self.model.pretrained_weights));
        candidate.is_dir().then_some(candidate)
    }

    pub fn wants_cuda(&self) -> bool {
        self.device.starts_with("cuda")
    }
}
