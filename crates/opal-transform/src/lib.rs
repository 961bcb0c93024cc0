//! Opal Class Transformation Engine
//!
//! A single API for locating, inspecting and mutating types, fields and
//! methods of compiled Opal classes, independent of whether the underlying
//! representation is a binary class file or parsed source text.
//!
//! The pieces:
//!
//! - [`descriptor`] — canonical type and method-signature encoding, the
//!   common vocabulary for matching across representations.
//! - [`model`] — the unified in-memory class graph both adapters produce.
//! - [`adapter`] — the [`adapter::ClassAdapter`] capability set plus the
//!   binary ([`adapter::BytecodeAdapter`]) and source
//!   ([`adapter::SourceAdapter`]) implementations.
//! - [`matcher`] — declarative member selection over the model.
//! - [`mutate`] — ordered structural edits applied to the model.
//! - [`pipeline`] — load → match → mutate → write orchestration.
//!
//! Method bodies stay opaque: the engine moves them around as
//! [`model::BodyHandle`] tokens that only the owning adapter can interpret,
//! so bytecode instruction lists and source statement blocks never leak into
//! shared logic.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod adapter;
pub mod descriptor;
pub mod error;
pub mod matcher;
pub mod model;
pub mod mutate;
pub mod pipeline;

pub use adapter::{BytecodeAdapter, ClassAdapter, InstructionSpec, SourceAdapter, StatementSpec};
pub use descriptor::{Descriptor, MethodDesc, TypeDesc};
pub use error::TransformError;
pub use matcher::{MatchCriteria, MemberKind};
pub use model::{
    AnnotationModel, BodyHandle, ClassModel, FieldModel, MemberModel, MemberRef, MethodModel,
    Origin, Value,
};
pub use mutate::{apply, Edit, EditTarget};
pub use pipeline::{Pipeline, PipelineOptions, Transformer};
