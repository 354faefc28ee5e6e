use std::collections::VecDeque;

use anyhow::{bail, ensure, Result};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;

use crate::masku::config::MaskUnitConfig;
use crate::masku::dispatch::{DispatchAck, DispatchView};
use crate::masku::issue::IssueStage;
use crate::masku::shuffle::deshuffle_index;
use crate::masku::types::InsnId;
use crate::traffic::config::{ConsumerKind, TrafficConfig};
use crate::traffic::sequencer::WorkItem;

/// Fragments received for one instruction, indexed by slot then lane.
struct Reassembly {
    item: WorkItem,
    first_seq: Option<u64>,
    slots: Vec<SmallVec<[Option<u64>; 4]>>,
}

/// Outcome of checking one completed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub id: InsnId,
    pub slots: usize,
    pub bytes_strobed: usize,
}

/// The lanes and the load/store units on the receiving side of the dispatch interface.
/// Decides the ready inputs each cycle and checks every delivered strobe against the
/// instruction's predicate.
pub struct ResultConsumers {
    config: MaskUnitConfig,
    rng: StdRng,
    lane_ready_rate: f64,
    bulk_ready_rate: f64,
    expected: VecDeque<Reassembly>,
}

impl ResultConsumers {
    pub fn new(config: &MaskUnitConfig, traffic: &TrafficConfig) -> Self {
        Self {
            config: *config,
            rng: StdRng::seed_from_u64(traffic.seed.wrapping_add(1)),
            lane_ready_rate: traffic.lane_ready_rate,
            bulk_ready_rate: traffic.bulk_ready_rate,
            expected: VecDeque::new(),
        }
    }

    pub fn expect(&mut self, item: &WorkItem) {
        self.expected.push_back(Reassembly {
            item: item.clone(),
            first_seq: None,
            slots: Vec::new(),
        });
    }

    /// Ready inputs for the slot offered this cycle. Every acknowledged fragment is recorded.
    pub fn acks(&mut self, view: Option<&DispatchView>) -> Result<SmallVec<[DispatchAck; 4]>> {
        let mut acks = SmallVec::new();
        let Some(view) = view else {
            return Ok(acks);
        };
        let Some(head) = self.expected.front_mut() else {
            bail!("slot {} offered for vinsn {} nobody expects", view.seq, view.id);
        };
        ensure!(
            head.item.desc.id == view.id,
            "slot for vinsn {} offered while vinsn {} is outstanding",
            view.id,
            head.item.desc.id
        );

        let first_seq = *head.first_seq.get_or_insert(view.seq);
        let index = (view.seq - first_seq) as usize;
        if head.slots.len() == index {
            head.slots.push(SmallVec::from_elem(None, self.config.num_lanes));
        }
        ensure!(index < head.slots.len(), "slot {} skipped ahead of order", view.seq);
        let received = &mut head.slots[index];

        match head.item.consumer {
            ConsumerKind::Lanes => {
                for (lane, frag) in view.lanes.iter().enumerate() {
                    if frag.valid && self.rng.gen_bool(self.lane_ready_rate) {
                        ensure!(received[lane].is_none(), "lane {} received slot {} twice", lane, view.seq);
                        received[lane] = Some(frag.strobe);
                        acks.push(DispatchAck::Lane(lane));
                    }
                }
            }
            ConsumerKind::Load | ConsumerKind::Store => {
                if view.any_valid() && self.rng.gen_bool(self.bulk_ready_rate) {
                    for (lane, frag) in view.lanes.iter().enumerate() {
                        if frag.valid {
                            received[lane] = Some(frag.strobe);
                        }
                    }
                    acks.push(match head.item.consumer {
                        ConsumerKind::Load => DispatchAck::LoadUnit,
                        _ => DispatchAck::StoreUnit,
                    });
                }
            }
        }
        if !acks.is_empty() {
            debug!("consumers: vinsn {} slot {} acks {:?}", view.id, view.seq, acks);
        }
        Ok(acks)
    }

    /// Check everything received for `id` against its predicate.
    pub fn complete(&mut self, id: InsnId) -> Result<DeliveryReport> {
        let Some(done) = self.expected.pop_front() else {
            bail!("completion for vinsn {} nobody expects", id);
        };
        ensure!(done.item.desc.id == id, "vinsn {} completed before vinsn {}", id, done.item.desc.id);
        verify_delivery(&self.config, &done.item, &done.slots)
    }

    pub fn outstanding(&self) -> usize {
        self.expected.len()
    }
}

/// Rebuild the per-element strobes from the received fragments and compare with the predicate:
/// every byte of an active element strobed, nothing else.
pub fn verify_delivery(
    config: &MaskUnitConfig,
    item: &WorkItem,
    slots: &[SmallVec<[Option<u64>; 4]>],
) -> Result<DeliveryReport> {
    let desc = &item.desc;
    let ew = desc.ew;
    let per_slot = IssueStage::elements_per_beat(config, ew);
    let expected_slots = desc.vl.div_ceil(per_slot);
    ensure!(
        slots.len() == expected_slots,
        "vinsn {}: received {} slots, expected {}",
        desc.id,
        slots.len(),
        expected_slots
    );

    let mut bytes_strobed = 0;
    for (k, lanes) in slots.iter().enumerate() {
        for (lane, frag) in lanes.iter().enumerate() {
            let Some(strobe) = frag else {
                bail!("vinsn {}: lane {} never received slot {}", desc.id, lane, k);
            };
            for offset in 0..config.stripe_width {
                let phys = lane * config.stripe_width + offset;
                let seq = deshuffle_index(phys, config.num_lanes, config.stripe_width, ew);
                let elem = k * per_slot + (seq >> ew.code());
                let want = elem < desc.vl && item.predicates[elem];
                let got = (strobe >> offset) & 1 == 1;
                ensure!(
                    want == got,
                    "vinsn {}: element {} byte {} strobe {} expected {}",
                    desc.id,
                    elem,
                    seq & (ew.bytes() - 1),
                    got,
                    want
                );
                bytes_strobed += got as usize;
            }
        }
    }
    Ok(DeliveryReport {
        id: desc.id,
        slots: slots.len(),
        bytes_strobed,
    })
}
