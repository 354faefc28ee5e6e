use crate::masku::types::{IdMask, InsnId};

/// Local copy of which instruction ids are in flight somewhere in the pipeline.
/// Only used to veto admitting an id twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningInstructionTracker {
    running: IdMask,
}

impl RunningInstructionTracker {
    pub fn is_running(&self, id: InsnId) -> bool {
        self.running.contains(id)
    }

    pub fn mask(&self) -> IdMask {
        self.running
    }

    /// Next value: ids the pipeline no longer reports are dropped, a freshly admitted id is added.
    pub fn next(&self, external: IdMask, admitted: Option<InsnId>) -> Self {
        let mut running = self.running & external;
        if let Some(id) = admitted {
            running.set(id);
        }
        Self { running }
    }
}

#[cfg(test)]
mod tests {
    use super::RunningInstructionTracker;
    use crate::masku::types::IdMask;

    #[test]
    fn admitted_id_stays_until_external_mask_drops_it() {
        let t = RunningInstructionTracker::default();
        let t = t.next(IdMask::EMPTY, Some(2));
        assert!(t.is_running(2));
        let t = t.next(IdMask::single(2), None);
        assert!(t.is_running(2));
        let t = t.next(IdMask::single(1), None);
        assert!(!t.is_running(2));
    }

    #[test]
    fn external_mask_never_sets_bits() {
        let t = RunningInstructionTracker::default().next(IdMask::from_bits(0xff), None);
        assert!(t.mask().is_empty());
    }
}
