//! The one error mode of this crate: a fatal invariant violation.
//!
//! Squashing operates on data the crate either produced itself or
//! trusts as an input contract (the type registry). Any mismatch here
//! indicates a bug in the generator, the descriptor compiler, or the
//! squasher itself — there is nothing to recover from, only something
//! to report. Grounded on `apfs-core::block::BlockReadError`'s shape:
//! a `thiserror`-derived enum with one variant per failure mode.

use squash_types::RegistryError;
use thiserror::Error;

/// A fatal invariant violation encountered while classifying or
/// squashing an argument graph.
#[derive(Debug, Error)]
pub enum SquashError {
    #[error("type registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("squash_ptr called on an arg with no pointee or a reserved VMA")]
    SquashNonPointer,

    #[error("squash changed size {before} -> {after}")]
    SizeMismatch { before: u64, after: u64 },

    #[error("bitfield argument passed to top-level squash dispatch")]
    BitfieldAtTopLevel,

    #[error("unsupported result arg size {0}")]
    UnsupportedResultSize(u64),

    #[error("bitfield has non-native format after value resolution")]
    BitfieldBadFormat,

    #[error("squashing an overlay struct is not supported")]
    OverlayStruct,

    #[error("squashed const encoding has wrong size: expected {expected}, got {actual}")]
    ConstEncodingSizeMismatch { expected: u64, actual: usize },

    #[error("cannot byte-swap a {0}-byte const value")]
    BadConstUnitSize(u64),

    #[error("a ResultArg inside a bitfield carrier is not supported")]
    BitfieldResultUnsupported,

    #[error("nested pointer inside a squashed pointee is not supported")]
    NestedPointerUnsupported,
}
