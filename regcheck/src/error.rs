//! Errors that abort a run before any diagnostics can be collected

use std::{fmt, io, path};

use thiserror::Error;

use crate::frontend::SourceLocation;

/// The register map document cannot be turned into a declaration tree
///
/// Loading is atomic: when this error is returned, nothing from the document is used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed document at {path}: {kind}")]
pub struct MalformedDocument {
    /// Location of the offending value, e.g., `blocks[1].registers[0].offset`
    pub path: String,
    pub kind: Malformation,
}

impl MalformedDocument {
    pub(crate) fn new(path: impl Into<String>, kind: Malformation) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Malformation {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("missing required key {0:?}")]
    MissingKey(String),
    #[error("cannot interpret {0:?} as an unsigned integer")]
    InvalidInteger(String),
    #[error("{0:#x} does not fit in 32 bits")]
    OutOfRange(u64),
    #[error("unsupported value {0}")]
    UnsupportedValue(String),
}

/// Error that happened while reading addresses from an HDL source
///
/// No partial address table exists when any of these is returned.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("include cycle detected at {}", path.display())]
    IncludeCycle { path: path::PathBuf },
    #[error("duplicate declaration {name} at {second} (first declared at {first})")]
    DuplicateDeclaration {
        name: String,
        first: SourceLocation,
        second: SourceLocation,
    },
    #[error("no {tag}* declarations found in {} (after include expansion)", path.display())]
    NoDeclarationsFound { tag: String, path: path::PathBuf },
    #[error("{location}: 32'h{literal} is not a valid 32-bit literal")]
    InvalidLiteral {
        literal: String,
        location: SourceLocation,
    },
    #[error("error while compiling declaration pattern")]
    Regex(#[from] regex::Error),
}

/// The register map side cannot be turned into a name-indexed address table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("registers {first} and {second} both map to {key}")]
    AmbiguousName {
        key: String,
        first: String,
        second: String,
    },
}

/// Formats an address the way every report in this crate does, e.g., `0x00000104`
pub(crate) struct Hex32(pub u64);

impl fmt::Display for Hex32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}
