//! Error types for a render cycle.
//!
//! Errors never escape a cycle: the work loop catches them at `render_root`,
//! logs them, drops the work-in-progress tree and reports the failure in the
//! returned [`RenderOutcome`](crate::RenderOutcome).

use thiserror::Error;

use crate::element::Node;
use crate::fiber::FiberId;

/// What a component render returns.
pub type RenderResult = Result<Node, RenderError>;

/// Misuse of the hook API, detected while walking the previous render's hook
/// chain.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("rendered more hooks than during the previous render (hook #{index} has no counterpart)")]
    RenderedMoreHooks { index: usize },

    #[error("rendered fewer hooks than during the previous render ({rendered} of {expected})")]
    RenderedFewerHooks { rendered: usize, expected: usize },

    #[error("hook #{index} changed its state type between renders (now `{expected}`)")]
    TypeMismatch { index: usize, expected: &'static str },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Hook(#[from] HookError),

    /// Failure raised by component code, usually an `anyhow::Error` lifted with `?`.
    #[error("component error: {0}")]
    Component(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum WorkLoopError {
    #[error("rendering `{component}` ({fiber:?}) failed")]
    Render {
        fiber: FiberId,
        component: String,
        #[source]
        source: RenderError,
    },

    #[error("render panicked: {message}")]
    Panicked { message: String },

    #[error("maximum update depth exceeded ({limit} nested updates)")]
    NestedUpdateLimit { limit: usize },
}
