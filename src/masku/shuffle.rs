//! Byte shuffling between the sequential element order of a vector register and the physical
//! order in which lanes store it.
//!
//! Element `k` of a wide word lives in lane `k % num_lanes`, at element slot `k / num_lanes`
//! inside that lane's stripe. Bytes of a multi-byte element stay contiguous.

use crate::masku::config::MaskUnitConfig;
use crate::masku::types::ElementWidth;

/// Map a sequential byte index within one wide word to its physical byte index.
pub fn shuffle_index(seq: usize, num_lanes: usize, stripe_width: usize, ew: ElementWidth) -> usize {
    assert!(seq < num_lanes * stripe_width, "byte {} outside the wide word", seq);
    let code = ew.code();
    let elem = seq >> code;
    let lane = elem % num_lanes;
    let slot = elem / num_lanes;
    lane * stripe_width + (slot << code) + (seq & (ew.bytes() - 1))
}

/// Inverse of [`shuffle_index`].
pub fn deshuffle_index(phys: usize, num_lanes: usize, stripe_width: usize, ew: ElementWidth) -> usize {
    assert!(phys < num_lanes * stripe_width, "byte {} outside the wide word", phys);
    let code = ew.code();
    let lane = phys / stripe_width;
    let in_lane = phys % stripe_width;
    let slot = in_lane >> code;
    let elem = slot * num_lanes + lane;
    (elem << code) + (in_lane & (ew.bytes() - 1))
}

/// Physical location of a byte: which lane, and which byte within the lane's stripe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneByte {
    pub lane: usize,
    pub offset: usize,
}

/// Precomputed shuffle tables, one per element width.
#[derive(Debug, Clone)]
pub struct ShuffleTables {
    stripe_width: usize,
    forward: [Vec<LaneByte>; 4],
}

impl ShuffleTables {
    pub fn new(config: &MaskUnitConfig) -> Self {
        let n = config.slot_bytes();
        let build = |ew: ElementWidth| -> Vec<LaneByte> {
            (0..n)
                .map(|seq| {
                    let phys = shuffle_index(seq, config.num_lanes, config.stripe_width, ew);
                    LaneByte {
                        lane: phys / config.stripe_width,
                        offset: phys % config.stripe_width,
                    }
                })
                .collect()
        };
        Self {
            stripe_width: config.stripe_width,
            forward: ElementWidth::ALL.map(build),
        }
    }

    pub fn locate(&self, seq: usize, ew: ElementWidth) -> LaneByte {
        self.forward[ew.code() as usize][seq]
    }

    pub fn stripe_width(&self) -> usize {
        self.stripe_width
    }
}
