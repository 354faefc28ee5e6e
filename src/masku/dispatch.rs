use smallvec::SmallVec;

use crate::masku::admission::ResidentInsn;
use crate::masku::result_queue::{LaneFragment, ResultRingBuffer, ResultSlot};
use crate::masku::types::InsnId;

/// Source of an acknowledgment for the slot currently offered by the arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAck {
    /// A lane accepted its own fragment.
    Lane(usize),
    /// The load unit read the whole slot.
    LoadUnit,
    /// The store unit read the whole slot.
    StoreUnit,
}

impl DispatchAck {
    pub fn clears(&self, lane: usize) -> bool {
        match self {
            DispatchAck::Lane(l) => *l == lane,
            DispatchAck::LoadUnit | DispatchAck::StoreUnit => true,
        }
    }
}

/// What the consumers observe this cycle: the oldest slot and whose it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchView {
    pub id: InsnId,
    pub seq: u64,
    pub lanes: SmallVec<[LaneFragment; 4]>,
}

impl DispatchView {
    pub fn any_valid(&self) -> bool {
        self.lanes.iter().any(|l| l.valid)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Lanes whose valid bit dropped this cycle.
    pub cleared: usize,
    /// The slot was fully acknowledged and leaves the queue.
    pub retired: bool,
}

pub struct DispatchArbiter;

impl DispatchArbiter {
    pub fn view(rq: &ResultRingBuffer, resident: Option<&ResidentInsn>) -> Option<DispatchView> {
        let slot = rq.oldest()?;
        let resident = resident.expect("result queue holds data without a resident instruction");
        Some(DispatchView {
            id: resident.desc.id,
            seq: slot.seq,
            lanes: slot.lanes.clone(),
        })
    }

    /// Apply this cycle's acknowledgments to `slot`.
    pub fn acknowledge(slot: &mut ResultSlot, acks: &[DispatchAck]) -> DispatchOutcome {
        let num_lanes = slot.lanes.len();
        for ack in acks {
            if let DispatchAck::Lane(lane) = ack {
                assert!(*lane < num_lanes, "ack from nonexistent lane {}", lane);
            }
        }
        let mut cleared = 0;
        for (lane, frag) in slot.lanes.iter_mut().enumerate() {
            if frag.valid && acks.iter().any(|ack| ack.clears(lane)) {
                frag.valid = false;
                cleared += 1;
            }
        }
        DispatchOutcome {
            cleared,
            retired: slot.all_clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_slot(lanes: usize) -> ResultSlot {
        let mut slot = ResultSlot::new(lanes);
        slot.set_all_valid();
        slot
    }

    #[test]
    fn lane_ack_clears_only_its_lane() {
        let mut slot = full_slot(4);
        let out = DispatchArbiter::acknowledge(&mut slot, &[DispatchAck::Lane(2)]);
        assert_eq!(out, DispatchOutcome { cleared: 1, retired: false });
        assert!(slot.lanes[0].valid && slot.lanes[1].valid && slot.lanes[3].valid);
        assert!(!slot.lanes[2].valid);
    }

    #[test]
    fn bulk_ack_clears_every_lane_at_once() {
        for bulk in [DispatchAck::LoadUnit, DispatchAck::StoreUnit] {
            let mut slot = full_slot(4);
            slot.lanes[1].valid = false;
            let out = DispatchArbiter::acknowledge(&mut slot, &[bulk]);
            assert_eq!(out, DispatchOutcome { cleared: 3, retired: true });
        }
    }

    #[test]
    fn slot_retires_when_the_last_lane_acks() {
        let mut slot = full_slot(2);
        let first = DispatchArbiter::acknowledge(&mut slot, &[DispatchAck::Lane(0)]);
        assert!(!first.retired);
        let repeat = DispatchArbiter::acknowledge(&mut slot, &[DispatchAck::Lane(0)]);
        assert_eq!(repeat.cleared, 0);
        let last = DispatchArbiter::acknowledge(&mut slot, &[DispatchAck::Lane(1)]);
        assert!(last.retired);
    }

    #[test]
    fn no_acks_no_progress() {
        let mut slot = full_slot(2);
        let out = DispatchArbiter::acknowledge(&mut slot, &[]);
        assert_eq!(out, DispatchOutcome::default());
    }

    #[test]
    #[should_panic(expected = "nonexistent lane")]
    fn rejects_out_of_range_lane() {
        let mut slot = full_slot(2);
        DispatchArbiter::acknowledge(&mut slot, &[DispatchAck::Lane(2)]);
    }
}
