use std::fmt::{Display, Formatter};
use std::ops::{BitAnd, BitOr};

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use smallvec::SmallVec;

pub type InsnId = usize;

/// Element width of a vector instruction. The discriminant is the width code.
#[derive(Debug, FromPrimitive, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ElementWidth {
    #[default]
    E8 = 0,
    E16 = 1,
    E32 = 2,
    E64 = 3,
}

impl ElementWidth {
    pub const ALL: [ElementWidth; 4] = [Self::E8, Self::E16, Self::E32, Self::E64];

    pub fn from_code(code: u8) -> Option<Self> {
        FromPrimitive::from_u8(code)
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn bytes(self) -> usize {
        1 << self.code()
    }

    /// Destination bytes that share one predicate bit.
    pub fn replication_factor(self) -> usize {
        self.bytes()
    }
}

impl Display for ElementWidth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.bytes() * 8)
    }
}

/// Accepts either the name (`"e32"`) or the raw width code (`2`).
impl<'de> Deserialize<'de> for ElementWidth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(u8),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => ElementWidth::from_code(code)
                .ok_or_else(|| D::Error::custom(format!("invalid element width code {}", code))),
            Repr::Name(name) => ElementWidth::ALL
                .into_iter()
                .find(|ew| ew.to_string() == name)
                .ok_or_else(|| {
                    D::Error::custom(format!("unknown element width '{}', expected e8, e16, e32 or e64", name))
                }),
        }
    }
}

/// Bitset over instruction ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct IdMask(u64);

impl IdMask {
    pub const EMPTY: IdMask = IdMask(0);

    pub fn from_bits(bits: u64) -> Self {
        IdMask(bits)
    }

    pub fn single(id: InsnId) -> Self {
        assert!(id < 64, "instruction id {} out of range", id);
        IdMask(1u64 << id)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn contains(self, id: InsnId) -> bool {
        id < 64 && (self.0 >> id) & 1 == 1
    }

    pub fn set(&mut self, id: InsnId) {
        *self = *self | IdMask::single(id);
    }

    pub fn clear(&mut self, id: InsnId) {
        self.0 &= !IdMask::single(id).0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = InsnId> {
        (0..64).filter(move |id| self.contains(*id))
    }
}

impl BitAnd for IdMask {
    type Output = IdMask;

    fn bitand(self, rhs: Self) -> Self::Output {
        IdMask(self.0 & rhs.0)
    }
}

impl BitOr for IdMask {
    type Output = IdMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        IdMask(self.0 | rhs.0)
    }
}

impl Display for IdMask {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionDescriptor {
    pub id: InsnId,
    /// Number of elements.
    pub vl: usize,
    pub ew: ElementWidth,
    /// Whether the instruction executes under a predicate.
    pub masked: bool,
    /// Sequencer bookkeeping; the resident copy always has it zeroed.
    pub vstart: usize,
}

impl InstructionDescriptor {
    pub fn new(id: InsnId, vl: usize, ew: ElementWidth) -> Self {
        Self {
            id,
            vl,
            ew,
            masked: true,
            vstart: 0,
        }
    }

    /// Predicate bits the unit has to move for this instruction, one per element.
    pub fn total_bit_count(&self) -> usize {
        self.vl
    }
}

impl Display for InstructionDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "vinsn [id: {}, vl: {}, ew: {}, masked: {}]",
            self.id, self.vl, self.ew, self.masked
        )
    }
}

/// Raw predicate bytes delivered by one lane for the current bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneOperand {
    pub valid: bool,
    pub bytes: SmallVec<[u8; 8]>,
}

impl LaneOperand {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            valid: true,
            bytes: SmallVec::from_slice(bytes),
        }
    }

    pub fn invalid(stripe_width: usize) -> Self {
        Self {
            valid: false,
            bytes: SmallVec::from_elem(0, stripe_width),
        }
    }
}
