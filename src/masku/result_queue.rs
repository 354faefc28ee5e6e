use smallvec::SmallVec;

use crate::masku::config::RESULT_QUEUE_DEPTH;

/// Strobe bits destined for one lane, one bit per byte of the lane's stripe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaneFragment {
    pub strobe: u64,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSlot {
    /// Sequence number of the slot in write order.
    pub seq: u64,
    pub lanes: SmallVec<[LaneFragment; 4]>,
}

impl ResultSlot {
    pub fn new(num_lanes: usize) -> Self {
        Self {
            seq: 0,
            lanes: SmallVec::from_elem(LaneFragment::default(), num_lanes),
        }
    }

    pub fn all_clear(&self) -> bool {
        self.lanes.iter().all(|l| !l.valid)
    }

    pub fn set_all_valid(&mut self) {
        self.lanes.iter_mut().for_each(|l| l.valid = true);
    }
}

/// Fixed two-entry circular buffer of result slots awaiting dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRingBuffer {
    slots: [ResultSlot; RESULT_QUEUE_DEPTH],
    write_pnt: usize,
    read_pnt: usize,
    occupancy: usize,
    written: u64,
}

impl ResultRingBuffer {
    pub fn new(num_lanes: usize) -> Self {
        Self {
            slots: std::array::from_fn(|_| ResultSlot::new(num_lanes)),
            write_pnt: 0,
            read_pnt: 0,
            occupancy: 0,
            written: 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.occupancy == RESULT_QUEUE_DEPTH
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy == 0
    }

    pub fn occupancy(&self) -> usize {
        self.occupancy
    }

    pub fn write_pnt(&self) -> usize {
        self.write_pnt
    }

    pub fn read_pnt(&self) -> usize {
        self.read_pnt
    }

    /// Number of slots ever written.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Commit a fully written slot at the write pointer.
    pub fn push(&mut self, mut slot: ResultSlot) {
        assert!(!self.is_full(), "result queue overflow");
        assert!(
            slot.lanes.iter().all(|l| l.valid),
            "slot exposed before every lane was written"
        );
        slot.seq = self.written;
        self.slots[self.write_pnt] = slot;
        self.write_pnt = (self.write_pnt + 1) % RESULT_QUEUE_DEPTH;
        self.occupancy += 1;
        self.written += 1;
    }

    pub fn oldest(&self) -> Option<&ResultSlot> {
        (!self.is_empty()).then(|| &self.slots[self.read_pnt])
    }

    pub fn oldest_mut(&mut self) -> Option<&mut ResultSlot> {
        if self.is_empty() {
            return None;
        }
        Some(&mut self.slots[self.read_pnt])
    }

    /// Retire the oldest slot once every lane has acknowledged it.
    pub fn pop(&mut self) -> ResultSlot {
        assert!(!self.is_empty(), "result queue underflow");
        let slot = self.slots[self.read_pnt].clone();
        assert!(slot.all_clear(), "retiring a slot with pending lanes");
        self.read_pnt = (self.read_pnt + 1) % RESULT_QUEUE_DEPTH;
        self.occupancy -= 1;
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written_slot(lanes: usize, strobe: u64) -> ResultSlot {
        let mut slot = ResultSlot::new(lanes);
        slot.lanes.iter_mut().for_each(|l| l.strobe = strobe);
        slot.set_all_valid();
        slot
    }

    fn drain(slot: &mut ResultSlot) {
        slot.lanes.iter_mut().for_each(|l| l.valid = false);
    }

    #[test]
    fn fills_to_two_and_wraps() {
        let mut rq = ResultRingBuffer::new(2);
        assert!(rq.is_empty());
        rq.push(written_slot(2, 0x1));
        rq.push(written_slot(2, 0x2));
        assert!(rq.is_full());
        assert_eq!(rq.write_pnt(), 0);

        drain(rq.oldest_mut().unwrap());
        assert_eq!(rq.pop().lanes[0].strobe, 0x1);
        rq.push(written_slot(2, 0x3));
        assert_eq!(rq.occupancy(), 2);

        drain(rq.oldest_mut().unwrap());
        assert_eq!(rq.pop().lanes[0].strobe, 0x2);
        drain(rq.oldest_mut().unwrap());
        let last = rq.pop();
        assert_eq!(last.lanes[1].strobe, 0x3);
        assert_eq!(last.seq, 2);
        assert!(rq.is_empty());
        assert_eq!(rq.read_pnt(), rq.write_pnt());
    }

    #[test]
    #[should_panic(expected = "result queue overflow")]
    fn third_push_overflows() {
        let mut rq = ResultRingBuffer::new(1);
        for _ in 0..3 {
            rq.push(written_slot(1, 0));
        }
    }

    #[test]
    #[should_panic(expected = "retiring a slot with pending lanes")]
    fn pop_requires_all_lanes_clear() {
        let mut rq = ResultRingBuffer::new(2);
        rq.push(written_slot(2, 0));
        rq.oldest_mut().unwrap().lanes[0].valid = false;
        rq.pop();
    }
}
