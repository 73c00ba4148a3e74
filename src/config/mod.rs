//! Lab configuration
//!
//! Loaded from a TOML file (created with defaults when missing), then
//! overridden by `HASHCHAIN_*` environment variables.

use crate::chain::ChainParams;
use crate::errors::ConfigError;
use crate::genesis::{GenesisParams, GENESIS_PAYLOAD};
use crate::ledger::LedgerParams;
use crate::miner::MAX_BATCH_SIZE;
use crate::pow::{DifficultyPattern, PreimageVersion};
use crate::workbench::SingleParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_CONFIG_PATH: &str = "hashchain.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleSection {
    pub pattern: DifficultyPattern,
    pub base_batch: u64,
    pub default_speed_multiplier: u64,
    pub max_speed_multiplier: u64,
}

impl Default for SingleSection {
    fn default() -> Self {
        Self {
            pattern: DifficultyPattern::leading_zeros(4),
            base_batch: 1000,
            default_speed_multiplier: 1,
            max_speed_multiplier: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSection {
    pub pattern: DifficultyPattern,
    pub batch_size: u64,
    pub preimage: PreimageVersion,
}

impl Default for ChainSection {
    fn default() -> Self {
        Self {
            pattern: DifficultyPattern::leading_zeros(4),
            batch_size: 50_000,
            preimage: PreimageVersion::V1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    pub pattern: DifficultyPattern,
    pub batch_size: u64,
    pub genesis_pattern: DifficultyPattern,
    pub genesis_batch_size: u64,
    pub genesis_payload: String,
    pub initial_balance: u64,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            pattern: DifficultyPattern::leading_zeros(4),
            batch_size: 50_000,
            genesis_pattern: DifficultyPattern::leading_zeros(3),
            genesis_batch_size: 1,
            genesis_payload: GENESIS_PAYLOAD.to_string(),
            initial_balance: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerSection {
    /// Digest worker threads; unset means one per core
    pub threads: Option<usize>,
    pub event_capacity: usize,
}

impl Default for MinerSection {
    fn default() -> Self {
        Self {
            threads: None,
            event_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSection {
    /// Minutes east of UTC used when rendering timestamps
    pub utc_offset_minutes: i32,
}

impl Default for ClockSection {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 7 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7070".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    pub single: SingleSection,
    pub chain: ChainSection,
    pub ledger: LedgerSection,
    pub miner: MinerSection,
    pub clock: ClockSection,
    pub server: ServerSection,
}

impl LabConfig {
    /// Load config from file, creating the default if missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if path.exists() {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            let config: LabConfig = toml::from_str(&content)?;
            config.validate()?;
            tracing::debug!(path = %path.display(), "config loaded");
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path)?;
            tracing::info!(path = %path.display(), "wrote default config");
            Ok(config)
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply `HASHCHAIN_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("HASHCHAIN_SINGLE_PATTERN") {
            self.single.pattern = DifficultyPattern::new(v)?;
        }
        if let Some(v) = lookup("HASHCHAIN_CHAIN_PATTERN") {
            self.chain.pattern = DifficultyPattern::new(v)?;
        }
        if let Some(v) = lookup("HASHCHAIN_CHAIN_BATCH") {
            self.chain.batch_size = parse_override("HASHCHAIN_CHAIN_BATCH", v)?;
        }
        if let Some(v) = lookup("HASHCHAIN_LEDGER_PATTERN") {
            self.ledger.pattern = DifficultyPattern::new(v)?;
        }
        if let Some(v) = lookup("HASHCHAIN_LEDGER_BATCH") {
            self.ledger.batch_size = parse_override("HASHCHAIN_LEDGER_BATCH", v)?;
        }
        if let Some(v) = lookup("HASHCHAIN_GENESIS_PATTERN") {
            self.ledger.genesis_pattern = DifficultyPattern::new(v)?;
        }
        if let Some(v) = lookup("HASHCHAIN_THREADS") {
            self.miner.threads = Some(parse_override("HASHCHAIN_THREADS", v)?);
        }
        if let Some(v) = lookup("HASHCHAIN_UTC_OFFSET_MINUTES") {
            self.clock.utc_offset_minutes = parse_override("HASHCHAIN_UTC_OFFSET_MINUTES", v)?;
        }
        if let Some(v) = lookup("HASHCHAIN_BIND") {
            self.server.bind = v;
        }
        self.validate()
    }

    /// Reject batch sizes the search would refuse
    pub fn validate(&self) -> Result<(), ConfigError> {
        let batches = [
            ("single.base_batch", self.single.base_batch),
            ("chain.batch_size", self.chain.batch_size),
            ("ledger.batch_size", self.ledger.batch_size),
            ("ledger.genesis_batch_size", self.ledger.genesis_batch_size),
        ];
        for (key, value) in batches {
            if value > MAX_BATCH_SIZE {
                return Err(ConfigError::BatchTooLarge {
                    key,
                    value,
                    max: MAX_BATCH_SIZE,
                });
            }
        }
        Ok(())
    }

    pub fn single_params(&self) -> SingleParams {
        SingleParams {
            pattern: self.single.pattern.clone(),
            base_batch: self.single.base_batch,
            max_speed_multiplier: self.single.max_speed_multiplier,
        }
    }

    pub fn chain_params(&self) -> ChainParams {
        ChainParams {
            pattern: self.chain.pattern.clone(),
            batch_size: self.chain.batch_size,
            preimage: self.chain.preimage,
        }
    }

    pub fn ledger_params(&self) -> LedgerParams {
        LedgerParams {
            chain: ChainParams {
                pattern: self.ledger.pattern.clone(),
                batch_size: self.ledger.batch_size,
                preimage: self.chain.preimage,
            },
            genesis: GenesisParams {
                pattern: self.ledger.genesis_pattern.clone(),
                batch_size: self.ledger.genesis_batch_size,
                payload: self.ledger.genesis_payload.clone(),
                preimage: self.chain.preimage,
            },
            initial_balance: self.ledger.initial_balance,
        }
    }
}

fn parse_override<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MiningError;
    use std::collections::HashMap;

    #[test]
    fn creates_default_file_then_reads_it_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.toml");
        let created = LabConfig::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, LabConfig::default());

        let loaded = LabConfig::load_or_create(&path).unwrap();
        assert_eq!(loaded, created);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.toml");
        fs::write(&path, "[chain]\npattern = \"00\"\n").unwrap();
        let cfg = LabConfig::load_or_create(&path).unwrap();
        assert_eq!(cfg.chain.pattern.as_str(), "00");
        assert_eq!(cfg.chain.batch_size, 50_000);
        assert_eq!(cfg.ledger.genesis_pattern.as_str(), "000");
        assert_eq!(cfg.ledger.initial_balance, 100);
    }

    #[test]
    fn malformed_pattern_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.toml");
        fs::write(&path, "[chain]\npattern = \"0x0\"\n").unwrap();
        assert!(matches!(
            LabConfig::load_or_create(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            ("HASHCHAIN_CHAIN_PATTERN", "000"),
            ("HASHCHAIN_CHAIN_BATCH", "1024"),
            ("HASHCHAIN_THREADS", "2"),
            ("HASHCHAIN_BIND", "0.0.0.0:9000"),
        ]
        .into_iter()
        .collect();
        let mut cfg = LabConfig::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.chain_params().pattern.as_str(), "000");
        assert_eq!(cfg.chain_params().batch_size, 1024);
        assert_eq!(cfg.miner.threads, Some(2));
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
    }

    #[test]
    fn bad_overrides_are_errors() {
        let mut cfg = LabConfig::default();
        let err = cfg
            .apply_overrides(|k| (k == "HASHCHAIN_CHAIN_BATCH").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOverride { key: "HASHCHAIN_CHAIN_BATCH", .. }
        ));

        let err = cfg
            .apply_overrides(|k| (k == "HASHCHAIN_GENESIS_PATTERN").then(|| "ZZ".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Mining(MiningError::MalformedPattern { .. })
        ));
    }

    #[test]
    fn oversized_batches_are_rejected() {
        let mut cfg = LabConfig::default();
        let err = cfg
            .apply_overrides(|k| (k == "HASHCHAIN_CHAIN_BATCH").then(|| u64::MAX.to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::BatchTooLarge { key: "chain.batch_size", value: u64::MAX, .. }
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.toml");
        fs::write(&path, "[ledger]\nbatch_size = 4294967296\n").unwrap();
        assert!(matches!(
            LabConfig::load_or_create(&path),
            Err(ConfigError::BatchTooLarge { key: "ledger.batch_size", .. })
        ));

        let at_limit = MAX_BATCH_SIZE.to_string();
        let mut cfg = LabConfig::default();
        cfg.apply_overrides(|k| (k == "HASHCHAIN_LEDGER_BATCH").then(|| at_limit.clone()))
            .unwrap();
        assert_eq!(cfg.ledger.batch_size, MAX_BATCH_SIZE);
    }

    #[test]
    fn ledger_params_follow_sections() {
        let p = LabConfig::default().ledger_params();
        assert_eq!(p.genesis.pattern.as_str(), "000");
        assert_eq!(p.genesis.batch_size, 1);
        assert_eq!(p.genesis.payload, GENESIS_PAYLOAD);
        assert_eq!(p.chain.batch_size, 50_000);
    }
}
