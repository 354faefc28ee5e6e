use crate::masku::admission::ResidentInsn;
use crate::masku::config::MaskUnitConfig;
use crate::masku::result_queue::{ResultRingBuffer, ResultSlot};
use crate::masku::shuffle::ShuffleTables;
use crate::masku::types::{ElementWidth, LaneOperand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueStall {
    /// Nothing resident, or everything already issued.
    NoWork,
    /// At least one lane has not delivered its operand.
    OperandsNotValid,
    /// Both result slots are occupied.
    QueueFull,
}

/// Result of one issue beat, computed from the current state only.
#[derive(Debug, Clone)]
pub struct IssueBeat {
    pub slot: ResultSlot,
    /// Elements covered by the beat, before clamping to the remaining count.
    pub elements: usize,
    /// Remaining predicate bits after the beat.
    pub issue_pending: usize,
    /// Request the next operand bundle from every lane.
    pub operand_advance: bool,
    pub next: IssueStage,
}

/// Turns packed predicate bits into per-lane byte strobes, one slot per beat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueStage {
    /// Predicate bit offset into the current operand bundle.
    vrf_pnt: usize,
}

impl IssueStage {
    pub fn vrf_pnt(&self) -> usize {
        self.vrf_pnt
    }

    pub fn elements_per_beat(config: &MaskUnitConfig, ew: ElementWidth) -> usize {
        config.slot_bytes() >> ew.code()
    }

    pub fn can_fire(
        &self,
        resident: Option<&ResidentInsn>,
        operands: &[LaneOperand],
        rq: &ResultRingBuffer,
    ) -> Result<(), IssueStall> {
        match resident {
            Some(r) if r.issue_pending > 0 => {}
            _ => return Err(IssueStall::NoWork),
        }
        if operands.is_empty() || !operands.iter().all(|op| op.valid) {
            return Err(IssueStall::OperandsNotValid);
        }
        if rq.is_full() {
            return Err(IssueStall::QueueFull);
        }
        Ok(())
    }

    pub fn fire(
        &self,
        config: &MaskUnitConfig,
        tables: &ShuffleTables,
        resident: &ResidentInsn,
        operands: &[LaneOperand],
    ) -> IssueBeat {
        assert_eq!(operands.len(), config.num_lanes, "one operand per lane");
        assert!(
            operands.iter().all(|op| op.bytes.len() == config.stripe_width),
            "operand narrower than the stripe"
        );
        let ew = resident.desc.ew;
        let code = ew.code();
        let vl = resident.desc.total_bit_count();
        let base_elem = resident.issued();
        let elements = Self::elements_per_beat(config, ew);

        let mut slot = ResultSlot::new(config.num_lanes);
        for b in 0..config.slot_bytes() {
            let dest = tables.locate(b, ew);
            let rel = b >> code;
            let bit = base_elem + rel < vl && operand_bit(tables, operands, self.vrf_pnt + rel);
            slot.lanes[dest.lane].strobe |= (bit as u64) << dest.offset;
        }
        slot.set_all_valid();

        let issue_pending = resident.issue_pending.saturating_sub(elements);
        let mut vrf_pnt = self.vrf_pnt + elements;
        assert!(vrf_pnt <= config.bundle_bits(), "operand pointer ran past the bundle");
        let operand_advance = vrf_pnt == config.bundle_bits() || issue_pending == 0;
        if operand_advance {
            vrf_pnt = 0;
        }

        IssueBeat {
            slot,
            elements,
            issue_pending,
            operand_advance,
            next: IssueStage { vrf_pnt },
        }
    }
}

/// Predicate bit `m` of the bundle; the predicate register is laid out byte-wise across lanes.
fn operand_bit(tables: &ShuffleTables, operands: &[LaneOperand], m: usize) -> bool {
    let loc = tables.locate(m >> 3, ElementWidth::E8);
    (operands[loc.lane].bytes[loc.offset] >> (m & 7)) & 1 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masku::admission::AdmissionQueue;
    use crate::masku::types::InstructionDescriptor;

    fn setup(vl: usize, ew: ElementWidth) -> (MaskUnitConfig, ShuffleTables, ResidentInsn) {
        let cfg = MaskUnitConfig::default();
        let tables = ShuffleTables::new(&cfg);
        let mut queue = AdmissionQueue::default();
        let resident = queue.admit(&InstructionDescriptor::new(0, vl, ew));
        (cfg, tables, resident)
    }

    fn all_ones(cfg: &MaskUnitConfig) -> Vec<LaneOperand> {
        (0..cfg.num_lanes)
            .map(|_| LaneOperand::new(&vec![0xff; cfg.stripe_width]))
            .collect()
    }

    #[test]
    fn stalls_are_reported_in_priority_order() {
        let (cfg, _, resident) = setup(16, ElementWidth::E8);
        let stage = IssueStage::default();
        let mut rq = ResultRingBuffer::new(cfg.num_lanes);
        let mut ops = all_ones(&cfg);

        assert_eq!(stage.can_fire(None, &ops, &rq), Err(IssueStall::NoWork));
        ops[1].valid = false;
        assert_eq!(stage.can_fire(Some(&resident), &ops, &rq), Err(IssueStall::OperandsNotValid));
        ops[1].valid = true;
        for _ in 0..2 {
            let mut slot = ResultSlot::new(cfg.num_lanes);
            slot.set_all_valid();
            rq.push(slot);
        }
        assert_eq!(stage.can_fire(Some(&resident), &ops, &rq), Err(IssueStall::QueueFull));
    }

    #[test]
    fn e8_beat_maps_each_bit_to_one_byte() {
        let (cfg, tables, resident) = setup(16, ElementWidth::E8);
        // sequential predicate bytes 0xa5, 0x0f; byte 0 lives in lane 0, byte 1 in lane 1
        let mut ops = vec![LaneOperand::new(&[0; 8]), LaneOperand::new(&[0; 8])];
        ops[0].bytes[0] = 0xa5;
        ops[1].bytes[0] = 0x0f;
        let beat = IssueStage::default().fire(&cfg, &tables, &resident, &ops);

        assert_eq!(beat.elements, 16);
        assert_eq!(beat.issue_pending, 0);
        assert!(beat.operand_advance);
        assert_eq!(beat.next.vrf_pnt(), 0);
        // even elements go to lane 0, odd elements to lane 1
        let mut expect = [0u64; 2];
        for e in 0..16 {
            let pred = if e < 8 { (0xa5 >> e) & 1 } else { (0x0f >> (e - 8)) & 1 };
            expect[e % 2] |= (pred as u64) << (e / 2);
        }
        assert_eq!(beat.slot.lanes[0].strobe, expect[0]);
        assert_eq!(beat.slot.lanes[1].strobe, expect[1]);
        assert!(beat.slot.lanes.iter().all(|l| l.valid));
    }

    #[test]
    fn e64_replicates_one_bit_over_eight_bytes() {
        let (cfg, tables, resident) = setup(4, ElementWidth::E64);
        let mut ops = vec![LaneOperand::new(&[0; 8]), LaneOperand::new(&[0; 8])];
        ops[0].bytes[0] = 0b0110;
        let first = IssueStage::default().fire(&cfg, &tables, &resident, &ops);
        assert_eq!(first.elements, 2);
        assert_eq!(first.issue_pending, 2);
        assert!(!first.operand_advance);
        assert_eq!(first.next.vrf_pnt(), 2);
        // element 0 (lane 0) inactive, element 1 (lane 1) active
        assert_eq!(first.slot.lanes[0].strobe, 0x00);
        assert_eq!(first.slot.lanes[1].strobe, 0xff);

        let resident = ResidentInsn {
            issue_pending: first.issue_pending,
            ..resident
        };
        let second = first.next.fire(&cfg, &tables, &resident, &ops);
        assert_eq!(second.issue_pending, 0);
        assert!(second.operand_advance);
        assert_eq!(second.slot.lanes[0].strobe, 0xff);
        assert_eq!(second.slot.lanes[1].strobe, 0x00);
    }

    #[test]
    fn tail_elements_are_never_strobed() {
        let (cfg, tables, resident) = setup(3, ElementWidth::E8);
        let beat = IssueStage::default().fire(&cfg, &tables, &resident, &all_ones(&cfg));
        // elements 0 and 2 in lane 0, element 1 in lane 1
        assert_eq!(beat.slot.lanes[0].strobe, 0b11);
        assert_eq!(beat.slot.lanes[1].strobe, 0b1);
        assert_eq!(beat.issue_pending, 0);
    }

    #[test]
    fn pointer_wraps_at_the_end_of_a_bundle() {
        // 128 predicate bits per bundle, 16 per E8 beat
        let (cfg, tables, resident) = setup(256, ElementWidth::E8);
        let ops = all_ones(&cfg);
        let mut stage = IssueStage::default();
        let mut resident = resident;
        let mut advances = Vec::new();
        while resident.issue_pending > 0 {
            let beat = stage.fire(&cfg, &tables, &resident, &ops);
            advances.push(beat.operand_advance);
            resident.issue_pending = beat.issue_pending;
            stage = beat.next;
        }
        assert_eq!(advances.len(), 16);
        assert_eq!(advances.iter().filter(|a| **a).count(), 2);
        assert!(advances[7] && advances[15]);
    }
}
