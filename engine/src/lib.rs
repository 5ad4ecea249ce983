pub mod actions;
pub mod error;
pub mod recovery;
pub mod runtime;
pub mod schedule;
pub mod scheduler;
pub mod two_phase;
