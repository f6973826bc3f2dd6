//! Crash-range configuration: an ordered set of weighted multiplier bands
//! the generator samples from. Read-only to the engine.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum ConfigError {
    #[error("failed to read crash range config: {0}")]
    Read(String),
    #[error("failed to parse crash range config: {0}")]
    Parse(String),
    #[error("crash range config must contain at least one range")]
    Empty,
    #[error("invalid crash range [{min}, {max}) weight {weight}: {reason}")]
    InvalidRange {
        min: Decimal,
        max: Decimal,
        weight: u32,
        reason: &'static str,
    },
}

/// One sampling band. Weights are relative; they need not sum to 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashRange {
    pub min: Decimal,
    pub max: Decimal,
    pub weight: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrashRangeConfig {
    ranges: Vec<CrashRange>,
}

impl CrashRangeConfig {
    pub fn new(ranges: Vec<CrashRange>) -> Result<Self, ConfigError> {
        if ranges.is_empty() {
            return Err(ConfigError::Empty);
        }
        for range in &ranges {
            let invalid = |reason| ConfigError::InvalidRange {
                min: range.min,
                max: range.max,
                weight: range.weight,
                reason,
            };
            if range.min < Decimal::ONE {
                return Err(invalid("min must be at least 1.00"));
            }
            if range.max <= range.min {
                return Err(invalid("max must exceed min"));
            }
            if range.weight == 0 {
                return Err(invalid("weight must be positive"));
            }
        }
        Ok(Self { ranges })
    }

    /// Loads ranges from a YAML file: a sequence of `{min, max, weight}`
    /// mappings.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Read(err.to_string()))?;
        let ranges: Vec<CrashRange> =
            serde_yaml::from_str(&raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        Self::new(ranges)
    }

    pub fn ranges(&self) -> &[CrashRange] {
        &self.ranges
    }

    pub fn total_weight(&self) -> u64 {
        self.ranges.iter().map(|range| range.weight as u64).sum()
    }

    /// True when `value` falls inside one of the configured bands.
    pub fn contains(&self, value: Decimal) -> bool {
        self.ranges
            .iter()
            .any(|range| value >= range.min && value < range.max)
    }
}

impl Default for CrashRangeConfig {
    /// The built-in table used when no config file is supplied: mostly low
    /// crashes, a thin tail of large ones.
    fn default() -> Self {
        Self {
            ranges: vec![
                CrashRange {
                    min: dec!(1.00),
                    max: dec!(3.00),
                    weight: 80,
                },
                CrashRange {
                    min: dec!(3.01),
                    max: dec!(10.00),
                    weight: 12,
                },
                CrashRange {
                    min: dec!(10.01),
                    max: dec!(30.00),
                    weight: 7,
                },
                CrashRange {
                    min: dec!(30.01),
                    max: dec!(1000.00),
                    weight: 1,
                },
            ],
        }
    }
}
