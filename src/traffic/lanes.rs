use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::masku::config::MaskUnitConfig;
use crate::masku::shuffle::shuffle_index;
use crate::masku::types::{ElementWidth, LaneOperand};

/// Bundle `index` of a predicate register, as the lanes hold it: predicate bit `m` sits in
/// sequential byte `m / 8`, and sequential bytes are spread over the lanes like E8 elements.
pub fn build_bundle(config: &MaskUnitConfig, predicates: &[bool], index: usize) -> Vec<LaneOperand> {
    let bits = config.bundle_bits();
    let mut lanes: Vec<LaneOperand> = (0..config.num_lanes)
        .map(|_| LaneOperand::new(&vec![0u8; config.stripe_width]))
        .collect();
    let start = index * bits;
    for (m, active) in predicates.iter().skip(start).take(bits).enumerate() {
        if !*active {
            continue;
        }
        let phys = shuffle_index(m >> 3, config.num_lanes, config.stripe_width, ElementWidth::E8);
        let lane = &mut lanes[phys / config.stripe_width];
        lane.bytes[phys % config.stripe_width] |= 1 << (m & 7);
    }
    lanes
}

struct OperandStream {
    predicates: Vec<bool>,
    bundles: usize,
    next: usize,
}

/// The lanes' side of the operand interface. Streams predicate bundles of admitted
/// instructions in admission order; each lane raises valid on its own and holds it until the
/// shared advance pulse.
pub struct LaneOperandSource {
    config: MaskUnitConfig,
    rng: StdRng,
    valid_rate: f64,
    streams: VecDeque<OperandStream>,
    lane_valid: Vec<bool>,
    bundles_delivered: u64,
}

impl LaneOperandSource {
    pub fn new(config: &MaskUnitConfig, valid_rate: f64, seed: u64) -> Self {
        Self {
            config: *config,
            rng: StdRng::seed_from_u64(seed),
            valid_rate,
            streams: VecDeque::new(),
            lane_valid: vec![false; config.num_lanes],
            bundles_delivered: 0,
        }
    }

    /// Queue the predicate register of a freshly admitted instruction.
    pub fn push(&mut self, predicates: &[bool]) {
        let bundles = predicates.len().div_ceil(self.config.bundle_bits());
        if bundles == 0 {
            return;
        }
        self.streams.push_back(OperandStream {
            predicates: predicates.to_vec(),
            bundles,
            next: 0,
        });
    }

    /// Operands presented this cycle.
    pub fn operands(&mut self) -> Vec<LaneOperand> {
        let Some(stream) = self.streams.front() else {
            return (0..self.config.num_lanes)
                .map(|_| LaneOperand::invalid(self.config.stripe_width))
                .collect();
        };
        let mut bundle = build_bundle(&self.config, &stream.predicates, stream.next);
        for (lane, valid) in self.lane_valid.iter_mut().enumerate() {
            if !*valid {
                *valid = self.rng.gen_bool(self.valid_rate);
            }
            bundle[lane].valid = *valid;
        }
        bundle
    }

    /// The unit consumed the current bundle.
    pub fn advance(&mut self) {
        let stream = self
            .streams
            .front_mut()
            .expect("operand advance with no bundle outstanding");
        assert!(
            self.lane_valid.iter().all(|v| *v),
            "operand advance while a lane was not valid"
        );
        stream.next += 1;
        if stream.next == stream.bundles {
            self.streams.pop_front();
        }
        self.lane_valid.iter_mut().for_each(|v| *v = false);
        self.bundles_delivered += 1;
    }

    pub fn is_idle(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn bundles_delivered(&self) -> u64 {
        self.bundles_delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_places_bytes_round_robin_over_lanes() {
        let cfg = MaskUnitConfig::default();
        // bits 0 and 9: sequential bytes 0 and 1, which land in lanes 0 and 1
        let mut predicates = vec![false; 16];
        predicates[0] = true;
        predicates[9] = true;
        let bundle = build_bundle(&cfg, &predicates, 0);
        assert_eq!(bundle[0].bytes[0], 0b1);
        assert_eq!(bundle[1].bytes[0], 0b10);
        assert!(bundle.iter().all(|l| l.valid && l.bytes.len() == 8));
    }

    #[test]
    fn second_bundle_starts_after_the_first() {
        let cfg = MaskUnitConfig::default();
        let mut predicates = vec![false; 130];
        predicates[128] = true;
        assert!(build_bundle(&cfg, &predicates, 0).iter().all(|l| l.bytes.iter().all(|b| *b == 0)));
        assert_eq!(build_bundle(&cfg, &predicates, 1)[0].bytes[0], 1);
    }

    #[test]
    fn streams_one_bundle_per_advance() {
        let cfg = MaskUnitConfig::default();
        let mut source = LaneOperandSource::new(&cfg, 1.0, 0);
        assert!(source.operands().iter().all(|l| !l.valid));
        source.push(&vec![true; 200]);
        source.push(&[]);
        assert!(source.operands().iter().all(|l| l.valid));
        source.advance();
        assert!(!source.is_idle());
        source.operands();
        source.advance();
        assert!(source.is_idle());
        assert_eq!(source.bundles_delivered(), 2);
    }

    #[test]
    fn valid_is_sticky_until_advance() {
        let cfg = MaskUnitConfig::default();
        let mut source = LaneOperandSource::new(&cfg, 0.3, 42);
        source.push(&vec![true; 16]);
        let mut seen = vec![false; cfg.num_lanes];
        for _ in 0..200 {
            let ops = source.operands();
            for (lane, op) in ops.iter().enumerate() {
                assert!(op.valid || !seen[lane], "lane {} dropped valid", lane);
                seen[lane] |= op.valid;
            }
        }
        assert!(seen.iter().all(|v| *v));
    }
}
