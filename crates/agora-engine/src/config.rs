//! Engine configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! db_path = "agora.db"
//! busy_timeout_ms = 5000
//! vote_policy = "ledger"
//!
//! [pool]
//! worker_count = 4
//! queue_capacity = 64
//! saturation = "block"
//! ```

use agora_core::errors::{ExError, ExErrorKind};
use agora_store::StoreOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

type Result<T> = std::result::Result<T, ExError>;

/// What `dispatch` does when the selected worker's queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaturationPolicy {
    /// Wait for a free slot
    #[default]
    Block,
    /// Fail with `PoolSaturated` before any envelope is built
    Reject,
}

/// How repeated votes by one user on one target are recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotePolicy {
    /// Every cast appends a ledger row and applies its full value
    #[default]
    Ledger,
    /// One row per (user, target); a re-cast applies `new - previous`
    SingleVote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub worker_count: usize,
    /// Bounded inbound queue length per worker
    pub queue_capacity: usize,
    pub saturation: SaturationPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            queue_capacity: 64,
            saturation: SaturationPolicy::Block,
        }
    }
}

impl PoolConfig {
    /// # Errors
    /// `InvalidConfig` when either size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(invalid("pool.worker_count must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("pool.queue_capacity must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub db_path: PathBuf,
    pub busy_timeout_ms: u64,
    pub pool: PoolConfig,
    pub vote_policy: VotePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("agora.db"),
            busy_timeout_ms: 5_000,
            pool: PoolConfig::default(),
            vote_policy: VotePolicy::Ledger,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// `InvalidConfig` on a parse failure or an out-of-range value.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(source).map_err(|e| {
            ExError::new(ExErrorKind::InvalidConfig)
                .with_op("load_config")
                .with_message(e.to_string())
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// `Io` if the file cannot be read, otherwise as `from_toml_str`.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("load_config")
                .with_entity_id(path.display().to_string())
                .with_message(e.to_string())
        })?;
        Self::from_toml_str(&source)
    }

    /// # Errors
    /// `InvalidConfig` for a zero pool size or busy timeout.
    pub fn validate(&self) -> Result<()> {
        self.pool.validate()?;
        if self.busy_timeout_ms == 0 {
            return Err(invalid("busy_timeout_ms must be positive"));
        }
        Ok(())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}

fn invalid(message: &str) -> ExError {
    ExError::new(ExErrorKind::InvalidConfig)
        .with_op("validate_config")
        .with_message(message)
}
