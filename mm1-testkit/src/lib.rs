//! Test support for mm1: job fixtures, a recording consumer, and helpers for
//! collecting and checking the output stream of a running queue.

mod job;
mod mock;
mod queue;

pub use job::*;
pub use mock::*;
pub use queue::*;
