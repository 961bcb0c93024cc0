//! Engine error taxonomy
//!
//! Load-time errors (`UnsupportedVersion`, `MalformedClassFile`, `Syntax`)
//! are non-recoverable for that input. Write-time `InconsistentModel` means a
//! mutation left the model unserializable. The remaining kinds are mutation
//! errors carrying enough context for the caller to decide on rollback.

use crate::model::Origin;
use opal_bytecode::ClassFileError;
use opal_syntax::ParseError;
use thiserror::Error;

/// Errors produced by the transformation engine
#[derive(Debug, Error)]
pub enum TransformError {
    /// A descriptor string could not be canonicalized
    #[error("Malformed descriptor `{descriptor}`: {reason}")]
    MalformedDescriptor {
        /// The rejected descriptor text
        descriptor: String,
        /// Why it was rejected
        reason: String,
    },

    /// Binary input carries a class-file version this engine cannot decode
    #[error("Unsupported class-file version: {0}")]
    UnsupportedVersion(u32),

    /// Binary input could not be decoded
    #[error("Malformed class file: {0}")]
    MalformedClassFile(#[from] ClassFileError),

    /// Source input could not be parsed
    #[error("Syntax error: {0}")]
    Syntax(#[from] ParseError),

    /// Source input did not contain exactly one class declaration
    #[error("Expected exactly one class declaration, found {found}")]
    ExpectedSingleClass {
        /// Number of class declarations in the input
        found: usize,
    },

    /// The model contains structurally invalid state and cannot be written
    #[error("Model is not serializable: {0}")]
    InconsistentModel(String),

    /// An added member collides with an existing name + descriptor
    #[error("Duplicate member `{name}` with descriptor `{descriptor}`")]
    DuplicateMember {
        /// Member name
        name: String,
        /// Member descriptor (compiled syntax)
        descriptor: String,
    },

    /// A targeted member does not exist in the model
    #[error("Member `{name}` with descriptor `{descriptor}` not found")]
    MemberNotFound {
        /// Member name
        name: String,
        /// Member descriptor (compiled syntax)
        descriptor: String,
    },

    /// A body handle was used against a model from a different adapter
    #[error("Body handle belongs to the {actual} representation, expected {expected}")]
    ForeignBodyHandle {
        /// Origin of the model being mutated or written
        expected: Origin,
        /// Origin of the offending handle
        actual: Origin,
    },

    /// An edit in a batch failed; earlier edits in the batch remain applied
    #[error("Edit #{index} failed: {source}")]
    EditFailed {
        /// Zero-based position of the failing edit in the batch
        index: usize,
        /// The underlying failure
        #[source]
        source: Box<TransformError>,
    },
}

impl TransformError {
    /// Wrap a mutation failure with the index of the edit that caused it
    pub(crate) fn at_edit(self, index: usize) -> Self {
        TransformError::EditFailed {
            index,
            source: Box::new(self),
        }
    }
}
