use anyhow::{bail, Result};
use serde::Deserialize;

use crate::masku::config::MaskUnitConfig;
use crate::masku::types::ElementWidth;
use crate::sim::config::Config;
use crate::traffic::patterns::MaskPattern;

/// Which unit reads the mask of an instruction.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerKind {
    /// Every lane takes its own fragment.
    #[default]
    Lanes,
    /// The load unit takes whole slots.
    Load,
    /// The store unit takes whole slots.
    Store,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrafficConfig {
    pub seed: u64,
    /// Chance per cycle that a lane still holding back its operand asserts valid.
    pub operand_valid_rate: f64,
    /// Chance per cycle that a lane accepts its offered fragment.
    pub lane_ready_rate: f64,
    /// Chance per cycle that the load/store unit accepts the offered slot.
    pub bulk_ready_rate: f64,
    pub instructions: Vec<TrafficInsnSpec>,
}

impl Config for TrafficConfig {}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            operand_valid_rate: 0.75,
            lane_ready_rate: 0.5,
            bulk_ready_rate: 0.5,
            instructions: default_workload(),
        }
    }
}

impl TrafficConfig {
    pub fn validate(&self, masku: &MaskUnitConfig) -> Result<()> {
        for (name, rate) in [
            ("operand_valid_rate", self.operand_valid_rate),
            ("lane_ready_rate", self.lane_ready_rate),
            ("bulk_ready_rate", self.bulk_ready_rate),
        ] {
            if !(rate > 0.0 && rate <= 1.0) {
                bail!("{} must be within (0, 1], got {}", name, rate);
            }
        }
        for spec in &self.instructions {
            if let Some(id) = spec.id {
                if id >= masku.num_insn_ids {
                    bail!("instruction id {} exceeds num_insn_ids {}", id, masku.num_insn_ids);
                }
            }
            spec.pattern.parse::<MaskPattern>().map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrafficInsnSpec {
    /// Fixed instruction id; allocated round-robin when absent.
    pub id: Option<usize>,
    pub vl: usize,
    pub ew: ElementWidth,
    pub masked: bool,
    pub consumer: ConsumerKind,
    pub pattern: String,
    pub seed: u64,
    pub repeat: u32,
}

impl Default for TrafficInsnSpec {
    fn default() -> Self {
        Self {
            id: None,
            vl: 16,
            ew: ElementWidth::E8,
            masked: true,
            consumer: ConsumerKind::Lanes,
            pattern: "random".to_string(),
            seed: 0,
            repeat: 1,
        }
    }
}

fn default_workload() -> Vec<TrafficInsnSpec> {
    let mut specs = Vec::new();
    for (i, ew) in ElementWidth::ALL.into_iter().enumerate() {
        specs.push(TrafficInsnSpec {
            vl: 64 + 13 * i,
            ew,
            seed: i as u64,
            ..TrafficInsnSpec::default()
        });
    }
    specs.push(TrafficInsnSpec {
        vl: 300,
        ew: ElementWidth::E16,
        consumer: ConsumerKind::Load,
        pattern: "alternating".to_string(),
        ..TrafficInsnSpec::default()
    });
    specs.push(TrafficInsnSpec {
        vl: 5,
        ew: ElementWidth::E64,
        consumer: ConsumerKind::Store,
        pattern: "ones".to_string(),
        repeat: 3,
        ..TrafficInsnSpec::default()
    });
    specs.push(TrafficInsnSpec {
        vl: 32,
        masked: false,
        ..TrafficInsnSpec::default()
    });
    specs
}
