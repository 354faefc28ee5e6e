use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::masku::tracker::RunningInstructionTracker;
use crate::masku::types::InstructionDescriptor;

/// The single instruction currently owning the unit, with its progress counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidentInsn {
    pub desc: InstructionDescriptor,
    /// Predicate bits not yet written into the result queue.
    pub issue_pending: usize,
    /// Predicate bits not yet acknowledged by the consumers.
    pub commit_pending: usize,
}

impl ResidentInsn {
    /// Elements already issued; the base element index of the next beat.
    pub fn issued(&self) -> usize {
        self.desc.total_bit_count() - self.issue_pending
    }

    pub fn phase(&self) -> ResidentPhase {
        if self.issue_pending == self.desc.total_bit_count() && self.commit_pending > 0 {
            ResidentPhase::Admitted
        } else if self.issue_pending > 0 {
            ResidentPhase::Issuing
        } else if self.commit_pending > 0 {
            ResidentPhase::PendingCommit
        } else {
            ResidentPhase::Done
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidentPhase {
    #[default]
    Idle,
    Admitted,
    Issuing,
    PendingCommit,
    Done,
}

impl Display for ResidentPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResidentPhase::Idle => "idle",
            ResidentPhase::Admitted => "admitted",
            ResidentPhase::Issuing => "issuing",
            ResidentPhase::PendingCommit => "pending commit",
            ResidentPhase::Done => "done",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitReject {
    /// Another instruction is resident.
    Busy,
    /// The id is still marked running.
    AlreadyRunning,
    /// The instruction does not execute under a predicate.
    Unmasked,
}

/// One-deep instruction queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionQueue {
    resident: Option<ResidentInsn>,
}

impl AdmissionQueue {
    pub fn is_full(&self) -> bool {
        self.resident.is_some()
    }

    pub fn ready(&self) -> bool {
        !self.is_full()
    }

    pub fn resident(&self) -> Option<&ResidentInsn> {
        self.resident.as_ref()
    }

    pub fn resident_mut(&mut self) -> Option<&mut ResidentInsn> {
        self.resident.as_mut()
    }

    pub fn phase(&self) -> ResidentPhase {
        self.resident
            .as_ref()
            .map_or(ResidentPhase::Idle, ResidentInsn::phase)
    }

    pub fn check(
        &self,
        desc: &InstructionDescriptor,
        tracker: &RunningInstructionTracker,
    ) -> Result<(), AdmitReject> {
        if self.is_full() {
            Err(AdmitReject::Busy)
        } else if !desc.masked {
            Err(AdmitReject::Unmasked)
        } else if tracker.is_running(desc.id) {
            Err(AdmitReject::AlreadyRunning)
        } else {
            Ok(())
        }
    }

    pub fn admit(&mut self, desc: &InstructionDescriptor) -> ResidentInsn {
        assert!(!self.is_full(), "admission into an occupied queue");
        let resident = ResidentInsn {
            desc: InstructionDescriptor {
                vstart: 0,
                ..*desc
            },
            issue_pending: desc.total_bit_count(),
            commit_pending: desc.total_bit_count(),
        };
        self.resident = Some(resident);
        resident
    }

    /// Release the slot once every predicate bit has been committed.
    pub fn free(&mut self) -> ResidentInsn {
        let resident = self.resident.take().expect("freeing an empty admission queue");
        assert_eq!(resident.issue_pending, 0, "freed before issue finished");
        assert_eq!(resident.commit_pending, 0, "freed before commit finished");
        resident
    }
}
