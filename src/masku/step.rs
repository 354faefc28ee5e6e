//! Next-state function of the mask unit.
//!
//! Every guard reads the current state, every write lands in the next state, so the order in
//! which admission, dispatch and issue are evaluated below has no observable effect.

use smallvec::SmallVec;

use crate::masku::admission::{AdmissionQueue, AdmitReject, ResidentPhase};
use crate::masku::config::MaskUnitConfig;
use crate::masku::dispatch::{DispatchAck, DispatchArbiter, DispatchOutcome, DispatchView};
use crate::masku::issue::{IssueStage, IssueStall};
use crate::masku::result_queue::ResultRingBuffer;
use crate::masku::shuffle::ShuffleTables;
use crate::masku::tracker::RunningInstructionTracker;
use crate::masku::types::{IdMask, InsnId, InstructionDescriptor, LaneOperand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskUnitState {
    pub tracker: RunningInstructionTracker,
    pub queue: AdmissionQueue,
    pub issue: IssueStage,
    pub results: ResultRingBuffer,
}

impl MaskUnitState {
    pub fn new(config: &MaskUnitConfig) -> Self {
        Self {
            tracker: RunningInstructionTracker::default(),
            queue: AdmissionQueue::default(),
            issue: IssueStage::default(),
            results: ResultRingBuffer::new(config.num_lanes),
        }
    }

    pub fn phase(&self) -> ResidentPhase {
        self.queue.phase()
    }

    /// The slot the consumers see this cycle.
    pub fn dispatch_view(&self) -> Option<DispatchView> {
        DispatchArbiter::view(&self.results, self.queue.resident())
    }
}

/// Everything sampled from outside the unit in one cycle.
#[derive(Debug, Clone, Default)]
pub struct MaskUnitInputs {
    pub request: Option<InstructionDescriptor>,
    pub running_mask: IdMask,
    pub operands: Vec<LaneOperand>,
    pub acks: SmallVec<[DispatchAck; 4]>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaskUnitOutputs {
    /// Low whenever the presented request is not admitted this cycle.
    pub admission_ready: bool,
    pub admitted: Option<InsnId>,
    pub rejected: Option<AdmitReject>,
    /// One-shot completion bits by instruction id.
    pub completion: IdMask,
    /// Shared pulse asking every lane for its next operand bundle.
    pub operand_advance: bool,
    /// Predicate bits issued this cycle.
    pub issued: Option<usize>,
    pub issue_stall: Option<IssueStall>,
    pub dispatch: Option<DispatchOutcome>,
    /// Predicate bits committed this cycle.
    pub committed: Option<usize>,
    pub phase: ResidentPhase,
}

pub fn step(
    config: &MaskUnitConfig,
    tables: &ShuffleTables,
    state: &MaskUnitState,
    inputs: &MaskUnitInputs,
) -> (MaskUnitState, MaskUnitOutputs) {
    let mut next = state.clone();
    let mut out = MaskUnitOutputs::default();

    // admission; ready is withheld from any request that would be rejected
    out.admission_ready = state.queue.ready();
    if let Some(req) = inputs.request.as_ref() {
        assert!(
            req.id < config.num_insn_ids,
            "vinsn id {} out of range, the unit tracks {} ids",
            req.id,
            config.num_insn_ids
        );
        let verdict = state.queue.check(req, &state.tracker);
        out.admission_ready = verdict.is_ok();
        match verdict {
            Ok(()) => {
                next.queue.admit(req);
                out.admitted = Some(req.id);
            }
            Err(reason) => out.rejected = Some(reason),
        }
    }
    next.tracker = state.tracker.next(inputs.running_mask, out.admitted);

    // dispatch of the oldest slot
    if !state.results.is_empty() {
        let slot = next
            .results
            .oldest_mut()
            .expect("result queue emptied within a cycle");
        let outcome = DispatchArbiter::acknowledge(slot, &inputs.acks);
        if outcome.retired {
            next.results.pop();
            let resident = next
                .queue
                .resident_mut()
                .expect("retired a slot without a resident instruction");
            let elements = IssueStage::elements_per_beat(config, resident.desc.ew);
            let committed = resident.commit_pending.min(elements);
            resident.commit_pending -= committed;
            out.committed = Some(committed);
        }
        out.dispatch = Some(outcome);
    }

    // issue into the write slot
    match state
        .issue
        .can_fire(state.queue.resident(), &inputs.operands, &state.results)
    {
        Ok(()) => {
            let current = state.queue.resident().expect("issue without a resident instruction");
            let beat = state.issue.fire(config, tables, current, &inputs.operands);
            next.issue = beat.next;
            next.results.push(beat.slot);
            let resident = next.queue.resident_mut().expect("resident vanished while issuing");
            out.issued = Some(resident.issue_pending - beat.issue_pending);
            resident.issue_pending = beat.issue_pending;
            out.operand_advance = beat.operand_advance;
        }
        Err(stall) => out.issue_stall = Some(stall),
    }

    if let Some(resident) = next.queue.resident() {
        assert!(
            resident.commit_pending >= resident.issue_pending,
            "committed more than was issued"
        );
    }

    // completion of the instruction that was resident at the start of the cycle
    let finished = state.queue.resident().is_some()
        && next.queue.phase() == ResidentPhase::Done;
    out.phase = if finished {
        assert!(next.results.is_empty(), "completion with results still queued");
        let resident = next.queue.free();
        out.completion = IdMask::single(resident.desc.id);
        ResidentPhase::Done
    } else if out.admitted.is_some() {
        ResidentPhase::Admitted
    } else {
        next.queue.phase()
    };

    (next, out)
}
