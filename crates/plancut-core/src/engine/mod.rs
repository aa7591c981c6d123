//! The abstraction engine.
//!
//! This module provides:
//! - **transition_system**: immutable CSR graphs over abstract states
//! - **abstraction**: perfect-hash abstraction functions
//! - **projection**: pattern projections with dead-part pruning
//! - **queue**: the adaptive priority queue of the relaxed exploration
//! - **lmcut**: the relaxed-exploration / lm-cut engine
//! - **justification**: justification-graph abstractions per lm-cut
//!   iteration
//! - **cuts**: cut-to-landmark drivers over an abstraction

pub mod abstraction;
pub mod cuts;
pub mod justification;
pub mod lmcut;
pub mod projection;
pub mod queue;
pub mod transition_system;
