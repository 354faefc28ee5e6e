use anyhow::{bail, Result};
use serde::Deserialize;

use crate::sim::config::Config;

/// Depth of the result ring buffer.
pub const RESULT_QUEUE_DEPTH: usize = 2;

/// Widest lane stripe a strobe fragment can hold (one strobe bit per byte, packed in a `u64`).
pub const MAX_STRIPE_WIDTH: usize = 64;

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct MaskUnitConfig {
    pub num_lanes: usize,
    /// Bytes each lane contributes to one operand bundle / one result slot.
    pub stripe_width: usize,
    /// Number of distinct instruction ids the sequencer hands out.
    pub num_insn_ids: usize,
}

impl Config for MaskUnitConfig {}

impl Default for MaskUnitConfig {
    fn default() -> Self {
        Self {
            num_lanes: 2,
            stripe_width: 8,
            num_insn_ids: 8,
        }
    }
}

impl MaskUnitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_lanes == 0 || self.num_lanes > 16 {
            bail!("num_lanes must be within 1..=16, got {}", self.num_lanes);
        }
        if !self.stripe_width.is_power_of_two()
            || self.stripe_width < 8
            || self.stripe_width > MAX_STRIPE_WIDTH
        {
            bail!(
                "stripe_width must be a power of two within 8..={}, got {}",
                MAX_STRIPE_WIDTH,
                self.stripe_width
            );
        }
        if self.num_insn_ids == 0 || self.num_insn_ids > 64 {
            bail!("num_insn_ids must be within 1..=64, got {}", self.num_insn_ids);
        }
        Ok(())
    }

    /// Destination bytes covered by one result slot, across all lanes.
    pub fn slot_bytes(&self) -> usize {
        self.num_lanes * self.stripe_width
    }

    /// Predicate bits carried by one operand bundle, across all lanes.
    pub fn bundle_bits(&self) -> usize {
        self.slot_bytes() * 8
    }
}

#[cfg(test)]
mod tests {
    use super::MaskUnitConfig;

    #[test]
    fn default_config_is_valid() {
        let cfg = MaskUnitConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.slot_bytes(), 16);
        assert_eq!(cfg.bundle_bits(), 128);
    }

    #[test]
    fn rejects_narrow_or_odd_stripes() {
        let mut cfg = MaskUnitConfig::default();
        cfg.stripe_width = 4;
        assert!(cfg.validate().is_err());
        cfg.stripe_width = 12;
        assert!(cfg.validate().is_err());
        cfg.stripe_width = 128;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_lanes_and_ids() {
        let mut cfg = MaskUnitConfig::default();
        cfg.num_lanes = 0;
        assert!(cfg.validate().is_err());
        cfg.num_lanes = 4;
        cfg.num_insn_ids = 65;
        assert!(cfg.validate().is_err());
    }
}
