use std::io;

use thiserror::Error;

use crate::error::{ExtractError, MalformedDocument, ReconcileError};

/// Fatal error returned by the public API
///
/// Findings that do not abort a run are reported as diagnostics or mismatches instead.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Malformed(#[from] MalformedDocument),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error("unsupported register map version {0}, only version 1 is supported")]
    UnsupportedVersion(u64),
    #[error("refusing to generate from a register map with {0} validation error(s)")]
    InvalidRegisterMap(usize),
}
