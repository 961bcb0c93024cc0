//! Representation adapters
//!
//! An adapter translates between one native class representation and the
//! unified [`ClassModel`]. The two sides never share a base type; they share
//! this capability set, so representation details stay out of the model.

use crate::error::TransformError;
use crate::model::{BodyHandle, ClassModel, Origin};

pub mod bytecode;
pub mod source;

pub use bytecode::{BytecodeAdapter, InstructionSpec};
pub use source::{SourceAdapter, StatementSpec};

/// The adapter capability set
///
/// `Raw` is the native serialized form (bytes or text); `BodySpec` is the
/// adapter-specific recipe for constructing a new method body. Bodies are
/// never interchangeable between adapters: a [`BodyHandle`] is only valid for
/// the adapter family that created it.
pub trait ClassAdapter {
    /// Native serialized form of a class
    type Raw;
    /// Adapter-specific specification for building a method body
    type BodySpec;

    /// The representation family this adapter handles
    fn origin(&self) -> Origin;

    /// Decode raw input into a class model
    ///
    /// Load failures (`UnsupportedVersion`, `MalformedClassFile`, `Syntax`)
    /// are non-recoverable for that input.
    fn load(&self, raw: &Self::Raw) -> Result<ClassModel, TransformError>;

    /// Serialize a (possibly mutated) model back to native form
    ///
    /// Fails with `InconsistentModel` if the model contains structurally
    /// invalid state, including body handles belonging to another adapter.
    /// The output is verified before it is returned; a malformed result is an
    /// error, never a best-effort artifact.
    fn write(&self, class: &ClassModel) -> Result<Self::Raw, TransformError>;

    /// Construct a representation-native method body
    fn create_body(&self, spec: Self::BodySpec) -> Result<BodyHandle, TransformError>;
}
