pub mod admission;
pub mod config;
pub mod counters;
pub mod dispatch;
pub mod issue;
pub mod result_queue;
pub mod shuffle;
pub mod step;
pub mod tracker;
pub mod types;
pub mod unit;

#[cfg(test)]
mod unit_tests;

pub use config::MaskUnitConfig;
pub use dispatch::{DispatchAck, DispatchView};
pub use step::{MaskUnitInputs, MaskUnitOutputs, MaskUnitState};
pub use types::{ElementWidth, IdMask, InsnId, InstructionDescriptor, LaneOperand};
pub use unit::MaskUnit;
