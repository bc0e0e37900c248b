//! Errors surfaced by the builder.
//!
//! The merge engine recognizes exactly one failure mode: growing the node
//! pool or the save stack failed. Everything else -- wrong argument counts,
//! a binary op with no preceding value, an unclosed grouping -- is the
//! driver's responsibility and is never reported here (see the crate docs).

use thiserror::Error;

/// The sole error the builder can report.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EabError {
    /// Growing the node pool or the save stack ran out of memory.
    #[error("out of memory while growing the node pool or save stack")]
    OutOfMemory,
}

pub type Result<T> = std::result::Result<T, EabError>;
