//! Compressor header-selection strategies.

pub mod belief;
pub mod timer;

pub use belief::BeliefController;
pub use timer::TimerController;
