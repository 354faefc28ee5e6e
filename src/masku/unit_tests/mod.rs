use std::sync::Arc;

use smallvec::SmallVec;

use crate::masku::dispatch::DispatchAck;
use crate::masku::step::{MaskUnitInputs, MaskUnitOutputs};
use crate::masku::types::{IdMask, InstructionDescriptor, LaneOperand};
use crate::masku::{MaskUnit, MaskUnitConfig};
use crate::traffic::lanes::build_bundle;


/// Drives a mask unit cycle by cycle the way the sequencer does: an id counts as running from
/// the cycle after its admission until its completion bit has been seen.
pub(super) struct Bench {
    pub unit: MaskUnit,
    pub cfg: MaskUnitConfig,
    pub running: IdMask,
    pub history: Vec<MaskUnitOutputs>,
}

impl Bench {
    pub fn new(cfg: MaskUnitConfig) -> Self {
        Self {
            unit: MaskUnit::new(Arc::new(cfg)),
            cfg,
            running: IdMask::EMPTY,
            history: Vec::new(),
        }
    }

    pub fn cycle(
        &mut self,
        request: Option<InstructionDescriptor>,
        operands: Vec<LaneOperand>,
        acks: &[DispatchAck],
    ) -> MaskUnitOutputs {
        let running_mask = self.running;
        let out = self
            .unit
            .tick(MaskUnitInputs {
                request,
                running_mask,
                operands,
                acks: SmallVec::from_slice(acks),
            })
            .clone();
        if let Some(id) = out.admitted {
            self.running.set(id);
        }
        for id in out.completion.iter() {
            self.running.clear(id);
        }
        self.history.push(out.clone());
        out
    }

    pub fn ones(&self) -> Vec<LaneOperand> {
        build_bundle(&self.cfg, &vec![true; self.cfg.bundle_bits()], 0)
    }

    pub fn silent(&self) -> Vec<LaneOperand> {
        (0..self.cfg.num_lanes)
            .map(|_| LaneOperand::invalid(self.cfg.stripe_width))
            .collect()
    }

    pub fn all_lane_acks(&self) -> Vec<DispatchAck> {
        (0..self.cfg.num_lanes).map(DispatchAck::Lane).collect()
    }

    pub fn advances(&self) -> usize {
        self.history.iter().filter(|o| o.operand_advance).count()
    }

    pub fn beats(&self) -> usize {
        self.history.iter().filter(|o| o.issued.is_some()).count()
    }
}
