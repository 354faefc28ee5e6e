use serde::Serialize;

use crate::masku::admission::AdmitReject;
use crate::masku::config::RESULT_QUEUE_DEPTH;
use crate::masku::issue::IssueStall;
use crate::masku::step::MaskUnitOutputs;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RejectCounts {
    pub busy: u64,
    pub already_running: u64,
    pub unmasked: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueStallCounts {
    pub operands_not_valid: u64,
    pub queue_full: u64,
}

/// Event counts of one mask unit, accumulated per cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaskUnitCounters {
    pub cycles: u64,
    pub admissions: u64,
    pub rejects: RejectCounts,
    pub beats: u64,
    pub bits_issued: u64,
    pub operand_advances: u64,
    pub issue_stalls: IssueStallCounts,
    pub slots_retired: u64,
    pub bits_committed: u64,
    /// Cycles a slot was offered but not fully acknowledged.
    pub dispatch_stalls: u64,
    pub completions: u64,
    /// Cycles spent at each result queue occupancy.
    pub occupancy_hist: [u64; RESULT_QUEUE_DEPTH + 1],
}

impl MaskUnitCounters {
    /// `occupancy` is the result queue occupancy the outputs were computed from.
    pub fn record(&mut self, out: &MaskUnitOutputs, occupancy: usize) {
        self.cycles += 1;
        self.occupancy_hist[occupancy] += 1;
        if out.admitted.is_some() {
            self.admissions += 1;
        }
        match out.rejected {
            Some(AdmitReject::Busy) => self.rejects.busy += 1,
            Some(AdmitReject::AlreadyRunning) => self.rejects.already_running += 1,
            Some(AdmitReject::Unmasked) => self.rejects.unmasked += 1,
            None => {}
        }
        if let Some(bits) = out.issued {
            self.beats += 1;
            self.bits_issued += bits as u64;
        }
        match out.issue_stall {
            Some(IssueStall::OperandsNotValid) => self.issue_stalls.operands_not_valid += 1,
            Some(IssueStall::QueueFull) => self.issue_stalls.queue_full += 1,
            Some(IssueStall::NoWork) | None => {}
        }
        if out.operand_advance {
            self.operand_advances += 1;
        }
        if let Some(dispatch) = out.dispatch {
            if !dispatch.retired {
                self.dispatch_stalls += 1;
            }
        }
        if let Some(bits) = out.committed {
            self.slots_retired += 1;
            self.bits_committed += bits as u64;
        }
        self.completions += out.completion.bits().count_ones() as u64;
    }

    /// Fraction of cycles the result queue held at least one slot.
    pub fn queue_utilization(&self) -> f64 {
        if self.cycles == 0 {
            return 0.0;
        }
        let busy: u64 = self.occupancy_hist[1..].iter().sum();
        busy as f64 / self.cycles as f64
    }
}
