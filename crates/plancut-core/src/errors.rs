//! Error types for abstraction and landmark-graph construction.
//!
//! Only construction-time failures are errors. Query-time dead ends are
//! reported as a flag on the returned landmark graph, never as an `Err`.

use thiserror::Error;

/// Errors raised while building abstractions or landmark-graph factories.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BuildError {
    /// The task violates the supported shape (axioms, conditional effects,
    /// or an operator with two effects on the same variable).
    #[error("unsupported task shape: {0}")]
    UnsupportedTaskShape(String),

    /// The product of the pattern's variable domains overflows.
    #[error("pattern {pattern:?} is too large: abstract state count overflows")]
    DomainTooLarge { pattern: Vec<usize> },

    /// Dead-part pruning determined that the initial state cannot reach a
    /// goal in this abstraction, so the task itself is unsolvable.
    #[error("task is unsolvable: the initial abstract state is dead")]
    UnsolvableTask,
}
