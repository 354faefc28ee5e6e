use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generator for the predicate bits of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskPattern {
    Ones,
    Zeros,
    Alternating,
    Random,
    /// The first `n` elements active, the rest inactive.
    FirstN(usize),
}

impl FromStr for MaskPattern {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ones" => Ok(Self::Ones),
            "zeros" => Ok(Self::Zeros),
            "alternating" => Ok(Self::Alternating),
            "random" => Ok(Self::Random),
            _ => match value.strip_prefix("first:") {
                Some(n) => n
                    .parse::<usize>()
                    .map(Self::FirstN)
                    .map_err(|_| format!("bad element count in pattern '{}'", value)),
                None => Err(format!(
                    "unsupported mask pattern '{}', expected one of: ones, zeros, alternating, random, first:N",
                    value
                )),
            },
        }
    }
}

impl MaskPattern {
    pub fn predicates(self, vl: usize, seed: u64) -> Vec<bool> {
        match self {
            Self::Ones => vec![true; vl],
            Self::Zeros => vec![false; vl],
            Self::Alternating => (0..vl).map(|e| e % 2 == 0).collect(),
            Self::FirstN(n) => (0..vl).map(|e| e < n).collect(),
            Self::Random => {
                let mut rng = StdRng::seed_from_u64(seed);
                (0..vl).map(|_| rng.gen_bool(0.5)).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MaskPattern;

    #[test]
    fn parses_every_pattern() {
        assert_eq!("ones".parse(), Ok(MaskPattern::Ones));
        assert_eq!("first:12".parse(), Ok(MaskPattern::FirstN(12)));
        assert!("first:x".parse::<MaskPattern>().is_err());
        assert!("checker".parse::<MaskPattern>().is_err());
    }

    #[test]
    fn deterministic_patterns() {
        assert_eq!(MaskPattern::Alternating.predicates(4, 0), vec![true, false, true, false]);
        assert_eq!(MaskPattern::FirstN(2).predicates(3, 0), vec![true, true, false]);
        assert_eq!(MaskPattern::Zeros.predicates(2, 0), vec![false, false]);
    }

    #[test]
    fn random_pattern_is_seeded() {
        let a = MaskPattern::Random.predicates(200, 9);
        assert_eq!(a, MaskPattern::Random.predicates(200, 9));
        assert_ne!(a, MaskPattern::Random.predicates(200, 10));
        assert!(a.iter().any(|b| *b) && a.iter().any(|b| !*b));
    }
}
