use std::sync::Arc;

use log::{debug, info};

use crate::base::behavior::{ModuleBehaviors, Parameterizable};
use crate::base::module::IsModule;
use crate::base::module::{module, ModuleBase};
use crate::masku::admission::{ResidentInsn, ResidentPhase};
use crate::masku::config::MaskUnitConfig;
use crate::masku::counters::MaskUnitCounters;
use crate::masku::dispatch::DispatchView;
use crate::masku::shuffle::ShuffleTables;
use crate::masku::step::{step, MaskUnitInputs, MaskUnitOutputs, MaskUnitState};

/// Clocked wrapper around [`step`]: latches the inputs for a cycle, applies the next-state
/// function once per `tick_one`, and keeps the outputs and counters.
pub struct MaskUnit {
    base: ModuleBase<MaskUnitState, MaskUnitConfig>,
    tables: ShuffleTables,
    inputs: MaskUnitInputs,
    outputs: MaskUnitOutputs,
    counters: MaskUnitCounters,
}

module!(MaskUnit, MaskUnitState, MaskUnitConfig,);

impl ModuleBehaviors for MaskUnit {
    fn tick_one(&mut self) {
        let inputs = std::mem::take(&mut self.inputs);
        let (next, out) = step(self.conf(), &self.tables, self.state(), &inputs);
        let occupancy = self.base.state.results.occupancy();
        self.counters.record(&out, occupancy);

        let cycle = self.base.cycle;
        if let Some(id) = out.admitted {
            info!("masku cycle {}: admitted vinsn {}", cycle, id);
        }
        if let Some(bits) = out.issued {
            debug!(
                "masku cycle {}: issued {} bits, vrf_pnt {} -> {}, advance {}",
                cycle,
                bits,
                self.state().issue.vrf_pnt(),
                next.issue.vrf_pnt(),
                out.operand_advance
            );
        }
        if let Some(bits) = out.committed {
            debug!("masku cycle {}: retired slot, committed {} bits", cycle, bits);
        }
        if !out.completion.is_empty() {
            info!("masku cycle {}: completed {}", cycle, out.completion);
        }

        self.base.state = next;
        self.outputs = out;
        self.base.cycle += 1;
    }

    fn reset(&mut self) {
        self.base.state = MaskUnitState::new(self.conf());
        self.base.cycle = 0;
        self.inputs = MaskUnitInputs::default();
        self.outputs = MaskUnitOutputs::default();
        self.counters = MaskUnitCounters::default();
    }
}

impl MaskUnit {
    pub fn new(config: Arc<MaskUnitConfig>) -> Self {
        if let Err(err) = config.validate() {
            panic!("invalid mask unit config: {err}");
        }
        let mut me = MaskUnit {
            base: ModuleBase::new(MaskUnitState::new(&config)),
            tables: ShuffleTables::new(&config),
            inputs: MaskUnitInputs::default(),
            outputs: MaskUnitOutputs::default(),
            counters: MaskUnitCounters::default(),
        };
        me.init_conf(config);
        me
    }

    /// Present the inputs sampled at the next clock edge.
    pub fn drive(&mut self, inputs: MaskUnitInputs) {
        self.inputs = inputs;
    }

    pub fn tick(&mut self, inputs: MaskUnitInputs) -> &MaskUnitOutputs {
        self.drive(inputs);
        self.tick_one();
        &self.outputs
    }

    /// Outputs of the last cycle.
    pub fn outputs(&self) -> &MaskUnitOutputs {
        &self.outputs
    }

    /// Free to take an instruction; a presented request may still be refused.
    pub fn admission_ready(&self) -> bool {
        self.state().queue.ready()
    }

    pub fn peek_dispatch(&self) -> Option<DispatchView> {
        self.state().dispatch_view()
    }

    pub fn resident(&self) -> Option<&ResidentInsn> {
        self.state().queue.resident()
    }

    pub fn phase(&self) -> ResidentPhase {
        self.state().phase()
    }

    pub fn counters(&self) -> &MaskUnitCounters {
        &self.counters
    }
}
