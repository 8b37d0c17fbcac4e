//! Core engine error taxonomy.
//!
//! `NotFound` is deliberately absent here — `cancel` reports it as a plain
//! `bool`, per the spec's error design (a failed cancel is not exceptional).

use thiserror::Error;

/// Errors a submission can fail with, before any state is mutated and
/// before any id is consumed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid order: {reason}")]
    InvalidOrder { reason: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
