//! Onboarding system — the step sequencer and progress state machine.
//!
//! A session walks a fixed, linear sequence of steps. Progress is a set of
//! completed slugs plus an optional explicit "next" override; the sequencer
//! derives the current step from it, enforces no-skip-ahead, and persists
//! completion events through the session store.

pub mod sequence;
pub mod sequencer;

pub use sequence::{StepSequence, compute_next};
pub use sequencer::{Sequencer, StepAccess};
