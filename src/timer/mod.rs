//! Timer lifecycle: stopped, paused, running.

pub mod machine;

pub use machine::{TimerSnapshot, TimerStateMachine, Transition, TransitionOutcome, UserIntent};
