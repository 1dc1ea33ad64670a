pub mod sequencer;
pub mod session;
