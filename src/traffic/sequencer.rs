use std::collections::{HashMap, VecDeque};

use anyhow::Result;
use log::{info, warn};
use serde::Serialize;

use crate::masku::admission::AdmitReject;
use crate::masku::config::MaskUnitConfig;
use crate::masku::step::MaskUnitOutputs;
use crate::masku::types::{ElementWidth, IdMask, InsnId, InstructionDescriptor};
use crate::traffic::config::{ConsumerKind, TrafficConfig};
use crate::traffic::patterns::MaskPattern;

/// One instruction of the workload together with the predicate it runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub desc: InstructionDescriptor,
    pub consumer: ConsumerKind,
    pub predicates: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionRecord {
    pub id: InsnId,
    pub vl: usize,
    pub ew_bytes: usize,
    pub admitted_at: u64,
    pub completed_at: u64,
}

impl CompletionRecord {
    pub fn latency(&self) -> u64 {
        self.completed_at.saturating_sub(self.admitted_at)
    }
}

/// Stands in for the vector sequencer: hands instructions to the mask unit in program order
/// and keeps the running mask.
#[derive(Debug, Default)]
pub struct Sequencer {
    pending: VecDeque<WorkItem>,
    running: IdMask,
    inflight: HashMap<InsnId, (InstructionDescriptor, u64)>,
    completed: Vec<CompletionRecord>,
    dropped: usize,
}

impl Sequencer {
    pub fn new(traffic: &TrafficConfig, masku: &MaskUnitConfig) -> Result<Self> {
        let mut pending = VecDeque::new();
        let mut next_id = 0;
        for spec in &traffic.instructions {
            let pattern: MaskPattern = spec.pattern.parse().map_err(anyhow::Error::msg)?;
            for rep in 0..spec.repeat {
                let id = spec.id.unwrap_or_else(|| {
                    let id = next_id;
                    next_id = (next_id + 1) % masku.num_insn_ids;
                    id
                });
                let seed = traffic.seed ^ spec.seed.wrapping_mul(0x9e37_79b9) ^ rep as u64;
                pending.push_back(WorkItem {
                    desc: InstructionDescriptor {
                        id,
                        vl: spec.vl,
                        ew: spec.ew,
                        masked: spec.masked,
                        vstart: 0,
                    },
                    consumer: spec.consumer,
                    predicates: pattern.predicates(spec.vl, seed),
                });
            }
        }
        Ok(Self {
            pending,
            ..Self::default()
        })
    }

    pub fn from_items(items: impl IntoIterator<Item = WorkItem>) -> Self {
        Self {
            pending: items.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Instruction presented to the unit this cycle.
    pub fn request(&self) -> Option<InstructionDescriptor> {
        self.pending.front().map(|item| item.desc)
    }

    pub fn running_mask(&self) -> IdMask {
        self.running
    }

    /// Update from the unit's outputs; returns the instruction admitted this cycle, if any.
    pub fn observe(&mut self, cycle: u64, out: &MaskUnitOutputs) -> Option<WorkItem> {
        for id in out.completion.iter() {
            let (desc, admitted_at) = self
                .inflight
                .remove(&id)
                .unwrap_or_else(|| panic!("completion for vinsn {} that was never admitted", id));
            self.running.clear(id);
            info!("sequencer: {} completed after {} cycles", desc, cycle - admitted_at);
            self.completed.push(CompletionRecord {
                id,
                vl: desc.vl,
                ew_bytes: desc.ew.bytes(),
                admitted_at,
                completed_at: cycle,
            });
        }

        if out.rejected == Some(AdmitReject::Unmasked) {
            if let Some(item) = self.pending.pop_front() {
                warn!("sequencer: {} does not need the mask unit, dropping", item.desc);
                self.dropped += 1;
            }
        }

        let id = out.admitted?;
        let item = self.pending.pop_front().expect("admission without a pending instruction");
        assert_eq!(item.desc.id, id, "admitted an instruction out of order");
        self.running.set(id);
        self.inflight.insert(id, (item.desc, cycle));
        Some(item)
    }

    pub fn is_done(&self) -> bool {
        self.pending.is_empty() && self.inflight.is_empty()
    }

    pub fn completed(&self) -> &[CompletionRecord] {
        &self.completed
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl WorkItem {
    pub fn new(id: InsnId, vl: usize, ew: ElementWidth, consumer: ConsumerKind, predicates: Vec<bool>) -> Self {
        assert_eq!(predicates.len(), vl, "one predicate per element");
        Self {
            desc: InstructionDescriptor::new(id, vl, ew),
            consumer,
            predicates,
        }
    }
}
