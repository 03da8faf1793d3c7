// Ledger configuration: consensus parameters plus operator settings, loaded from JSON.

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Parameters that shape state transitions. Persisted with the ledger so a
/// reloaded chain replays under the rules it was built with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerParams {
    #[serde(default = "default_binding_factor")]
    pub energy_binding_factor: f64,
    #[serde(default)]
    pub genesis_timestamp: u64,
    #[serde(default = "default_max_tx_per_block")]
    pub max_tx_per_block: usize,
    #[serde(default = "default_max_token_types")]
    pub max_token_types: usize,
    #[serde(default = "default_stake_lock_period")]
    pub stake_lock_period: u64,
    #[serde(default = "default_reward_rate")]
    pub reward_rate: f64,
    #[serde(default = "default_reward_period")]
    pub reward_period: u64,
    #[serde(default = "default_swap_fee_bps")]
    pub swap_fee_bps: u32,
}

fn default_binding_factor() -> f64 {
    0.75
}

fn default_max_tx_per_block() -> usize {
    256
}

fn default_max_token_types() -> usize {
    64
}

fn default_stake_lock_period() -> u64 {
    604_800 // one week of seconds
}

fn default_reward_rate() -> f64 {
    0.05
}

fn default_reward_period() -> u64 {
    31_536_000 // one year of seconds
}

fn default_swap_fee_bps() -> u32 {
    30
}

impl Default for LedgerParams {
    fn default() -> Self {
        LedgerParams {
            energy_binding_factor: default_binding_factor(),
            genesis_timestamp: 0,
            max_tx_per_block: default_max_tx_per_block(),
            max_token_types: default_max_token_types(),
            stake_lock_period: default_stake_lock_period(),
            reward_rate: default_reward_rate(),
            reward_period: default_reward_period(),
            swap_fee_bps: default_swap_fee_bps(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub params: LedgerParams,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            params: LedgerParams::default(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

impl LedgerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_takes_defaults() {
        let cfg: LedgerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, LedgerConfig::default());
        assert_eq!(cfg.params.energy_binding_factor, 0.75);
        assert_eq!(cfg.params.max_tx_per_block, 256);
    }

    #[test]
    fn partial_params_override() {
        let cfg: LedgerConfig =
            serde_json::from_str(r#"{"params":{"stake_lock_period":10},"log_level":"debug"}"#).unwrap();
        assert_eq!(cfg.params.stake_lock_period, 10);
        assert_eq!(cfg.params.reward_period, 31_536_000);
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.config.json");
        fs::write(&path, r#"{"data_dir":"/tmp/eltt"}"#).unwrap();
        let cfg = LedgerConfig::load(&path).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/eltt"));
        assert!(LedgerConfig::load(dir.path().join("missing.json")).is_err());
    }
}
