use std::sync::Arc;

use anyhow::{bail, Result};

use crate::base::module::IsModule;
use crate::masku::config::MaskUnitConfig;
use crate::masku::step::{MaskUnitInputs, MaskUnitOutputs};
use crate::masku::unit::MaskUnit;
use crate::sim::config::SimConfig;
use crate::sim::log::Logger;
use crate::sim::stats::{LatencySummary, SimSummary};
use crate::traffic::config::TrafficConfig;
use crate::traffic::consumers::ResultConsumers;
use crate::traffic::lanes::LaneOperandSource;
use crate::traffic::sequencer::Sequencer;
use crate::{debug, info};

/// A mask unit surrounded by its sequencer, the lanes feeding it operands, and the consumers
/// draining its results.
pub struct Sim {
    config: SimConfig,
    logger: Arc<Logger>,
    pub unit: MaskUnit,
    sequencer: Sequencer,
    lanes: LaneOperandSource,
    consumers: ResultConsumers,
    bytes_strobed: u64,
}

impl Sim {
    pub fn new(config: SimConfig, masku_config: MaskUnitConfig, traffic: TrafficConfig) -> Result<Self> {
        masku_config.validate()?;
        traffic.validate(&masku_config)?;
        let sequencer = Sequencer::new(&traffic, &masku_config)?;
        Ok(Self {
            logger: Arc::new(Logger::new(config.log_level)),
            config,
            unit: MaskUnit::new(Arc::new(masku_config)),
            sequencer,
            lanes: LaneOperandSource::new(&masku_config, traffic.operand_valid_rate, traffic.seed),
            consumers: ResultConsumers::new(&masku_config, &traffic),
            bytes_strobed: 0,
        })
    }

    pub fn with_sequencer(mut self, sequencer: Sequencer) -> Self {
        self.sequencer = sequencer;
        self
    }

    /// One clock cycle of the whole system.
    pub fn tick(&mut self) -> Result<MaskUnitOutputs> {
        let cycle = self.unit.cycle();
        self.logger.set_cycle(cycle);

        let view = self.unit.peek_dispatch();
        let acks = self.consumers.acks(view.as_ref())?;
        let inputs = MaskUnitInputs {
            request: self.sequencer.request(),
            running_mask: self.sequencer.running_mask(),
            operands: self.lanes.operands(),
            acks,
        };
        debug!(
            self.logger,
            "request {:?}, running {}, operands valid {}, acks {:?}",
            inputs.request.map(|d| d.id),
            inputs.running_mask,
            inputs.operands.iter().filter(|o| o.valid).count(),
            inputs.acks
        );

        let out = self.unit.tick(inputs).clone();

        if out.operand_advance {
            self.lanes.advance();
        }
        if let Some(item) = self.sequencer.observe(cycle, &out) {
            info!(self.logger, "admitted {}", item.desc);
            self.lanes.push(&item.predicates);
            self.consumers.expect(&item);
        }
        for id in out.completion.iter() {
            let report = self.consumers.complete(id)?;
            info!(
                self.logger,
                "vinsn {} delivered in {} slots, {} bytes strobed",
                report.id,
                report.slots,
                report.bytes_strobed
            );
            self.bytes_strobed += report.bytes_strobed as u64;
        }
        Ok(out)
    }

    pub fn finished(&self) -> bool {
        self.sequencer.is_done() && self.consumers.outstanding() == 0 && self.lanes.is_idle()
    }

    pub fn simulate(&mut self) -> Result<SimSummary> {
        while !self.finished() {
            if self.unit.cycle() >= self.config.timeout {
                bail!(
                    "timed out after {} cycles with {} instructions pending, unit {}",
                    self.config.timeout,
                    self.sequencer.pending_len(),
                    self.unit.phase()
                );
            }
            self.tick()?;
        }

        let counters = self.unit.counters().clone();
        let summary = SimSummary {
            cycles: self.unit.cycle(),
            completed: self.sequencer.completed().len(),
            dropped: self.sequencer.dropped(),
            bundles_delivered: self.lanes.bundles_delivered(),
            bytes_strobed: self.bytes_strobed,
            queue_utilization: counters.queue_utilization(),
            latency: LatencySummary::from_records(self.sequencer.completed()),
            masku: counters,
            completions: self.sequencer.completed().to_vec(),
        };
        if let Some(path) = self.config.stats_json.as_ref() {
            summary.write_json(path)?;
        }
        Ok(summary)
    }
}
