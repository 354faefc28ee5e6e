pub mod config;
pub mod consumers;
pub mod lanes;
pub mod patterns;
pub mod sequencer;
