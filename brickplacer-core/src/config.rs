// vim: tw=80
//! Placer configuration.
//!
//! All sizes are in KiB.  Every field has a default, so an empty document is a
//! valid configuration.

use crate::types::*;
use serde_derive::{Deserialize, Serialize};

/// Constants governing how bricks are sized
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizingConfig {
    /// Space an arbiter brick needs for each file in the volume
    pub arbiter_entry_size: u64,

    /// LVM extent size.  Thin pools and their metadata are rounded up to it.
    pub extent_size: u64,

    /// Thin pool metadata, as a fraction of the pool size
    pub metadata_ratio: f64,

    /// Upper bound on the thin pool metadata size
    pub metadata_max: u64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        SizingConfig {
            arbiter_entry_size: 4 * KIB,
            extent_size: 4 * MIB,
            metadata_ratio: 0.005,
            metadata_max: 16 * GIB,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlacerConfig {
    /// Smallest brick that a volume may be split into
    pub brick_min_size: u64,

    /// Largest brick that a volume may be split into
    pub brick_max_size: u64,

    pub sizing: SizingConfig,
}

impl Default for PlacerConfig {
    fn default() -> Self {
        PlacerConfig {
            brick_min_size: GIB,
            brick_max_size: 4 * TIB,
            sizing: SizingConfig::default(),
        }
    }
}

impl PlacerConfig {
    /// Parse a YAML document
    pub fn from_yaml(s: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(s)
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.brick_min_size == 0 {
            return Err(Error::Config("brick_min_size must be nonzero".into()));
        }
        if self.brick_min_size > self.brick_max_size {
            return Err(Error::Config(format!(
                "brick_min_size ({}) exceeds brick_max_size ({})",
                self.brick_min_size, self.brick_max_size)));
        }
        if !(0.0..1.0).contains(&self.sizing.metadata_ratio) {
            return Err(Error::Config(format!(
                "metadata_ratio ({}) must lie in [0, 1)",
                self.sizing.metadata_ratio)));
        }
        Ok(())
    }
}
