//! The mutation engine
//!
//! Applies ordered structural edits to a class model. Edits are applied in
//! caller order and later edits see the effects of earlier ones. There is no
//! automatic rollback: on failure the error names the offending edit and the
//! already-applied prefix remains in the model, leaving the caller to keep or
//! discard it.

use crate::error::TransformError;
use crate::model::{AnnotationModel, BodyHandle, ClassModel, MemberModel, MemberRef};

/// What an edit applies to: the class itself or one member
#[derive(Debug, Clone, PartialEq)]
pub enum EditTarget {
    /// The class declaration
    Class,
    /// The member identified by name + descriptor
    Member(MemberRef),
}

/// A single requested structural mutation
#[derive(Debug, Clone)]
pub enum Edit {
    /// Append a member; fails with `DuplicateMember` if the name + descriptor
    /// already exists
    Add(MemberModel),
    /// Remove the identified member; fails with `MemberNotFound` if it no
    /// longer exists
    Remove(MemberRef),
    /// Replace the identified member in its declaration slot
    Replace(MemberRef, MemberModel),
    /// Replace the access flags wholesale (no implicit merging)
    SetModifiers(EditTarget, u32),
    /// Replace the annotation list wholesale
    SetAnnotations(EditTarget, Vec<AnnotationModel>),
    /// Replace a method's body with one built by the owning adapter; fails
    /// with `ForeignBodyHandle` for a handle from another representation
    ReplaceBody(MemberRef, BodyHandle),
}

/// Apply edits to a class model, in order
///
/// On failure the result wraps the underlying error in
/// [`TransformError::EditFailed`] carrying the index of the failing edit.
pub fn apply(
    class: &mut ClassModel,
    edits: impl IntoIterator<Item = Edit>,
) -> Result<(), TransformError> {
    for (index, edit) in edits.into_iter().enumerate() {
        apply_one(class, edit).map_err(|e| e.at_edit(index))?;
    }
    Ok(())
}

fn apply_one(class: &mut ClassModel, edit: Edit) -> Result<(), TransformError> {
    match edit {
        Edit::Add(member) => {
            let reference = member.reference();
            if class.index_of(&reference).is_some() {
                return Err(TransformError::DuplicateMember {
                    name: reference.name,
                    descriptor: reference.descriptor,
                });
            }
            class.push_member(member);
            Ok(())
        }

        Edit::Remove(reference) => {
            let index = require_member(class, &reference)?;
            class.members_mut().remove(index);
            Ok(())
        }

        Edit::Replace(reference, mut member) => {
            let index = require_member(class, &reference)?;
            let new_reference = member.reference();
            if new_reference != reference {
                // A renamed replacement must not collide with another slot
                if let Some(existing) = class.index_of(&new_reference) {
                    if existing != index {
                        return Err(TransformError::DuplicateMember {
                            name: new_reference.name,
                            descriptor: new_reference.descriptor,
                        });
                    }
                }
            }
            member.set_declaring(&class.name);
            class.members_mut()[index] = member;
            Ok(())
        }

        Edit::SetModifiers(target, access) => match target {
            EditTarget::Class => {
                class.access = access;
                Ok(())
            }
            EditTarget::Member(reference) => {
                let index = require_member(class, &reference)?;
                class.members_mut()[index].set_access(access);
                Ok(())
            }
        },

        Edit::SetAnnotations(target, annotations) => match target {
            EditTarget::Class => {
                class.annotations = annotations;
                Ok(())
            }
            EditTarget::Member(reference) => {
                let index = require_member(class, &reference)?;
                class.members_mut()[index].set_annotations(annotations);
                Ok(())
            }
        },

        Edit::ReplaceBody(reference, body) => {
            // Origin is checked before any lookup so a failure provably
            // leaves the model unmodified
            if body.origin() != class.origin() {
                return Err(TransformError::ForeignBodyHandle {
                    expected: class.origin(),
                    actual: body.origin(),
                });
            }
            let index = require_method(class, &reference)?;
            if let MemberModel::Method(method) = &mut class.members_mut()[index] {
                method.body = Some(body);
            }
            Ok(())
        }
    }
}

fn require_member(class: &ClassModel, reference: &MemberRef) -> Result<usize, TransformError> {
    class
        .index_of(reference)
        .ok_or_else(|| TransformError::MemberNotFound {
            name: reference.name.clone(),
            descriptor: reference.descriptor.clone(),
        })
}

fn require_method(class: &ClassModel, reference: &MemberRef) -> Result<usize, TransformError> {
    class
        .members()
        .iter()
        .position(|m| reference.matches(m) && m.as_method().is_some())
        .ok_or_else(|| TransformError::MemberNotFound {
            name: reference.name.clone(),
            descriptor: reference.descriptor.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{MethodDesc, TypeDesc};
    use crate::model::{BodyRepr, FieldModel, MethodModel, Origin};
    use opal_bytecode::access;

    fn method(name: &str, descriptor: &str) -> MemberModel {
        MemberModel::Method(MethodModel::new(name, MethodDesc::parse(descriptor).unwrap()))
    }

    fn sample_class() -> ClassModel {
        let mut class = ClassModel::new(Origin::Bytecode, "demo.Counter");
        class.push_member(method("foo", "()V"));
        class.push_member(method("bar", "(I)V"));
        class
    }

    fn member_names(class: &ClassModel) -> Vec<&str> {
        class.members().iter().map(|m| m.name()).collect()
    }

    #[test]
    fn test_add_then_remove_restores_sequence() {
        let mut class = sample_class();
        let before = class.clone();

        apply(
            &mut class,
            vec![Edit::Add(MemberModel::Field(FieldModel::new(
                "count",
                TypeDesc::Int,
            )))],
        )
        .unwrap();
        assert_eq!(member_names(&class), vec!["foo", "bar", "count"]);

        apply(&mut class, vec![Edit::Remove(MemberRef::new("count", "I"))]).unwrap();
        assert_eq!(class, before);
    }

    #[test]
    fn test_add_duplicate_fails_with_context() {
        let mut class = sample_class();
        let err = apply(
            &mut class,
            vec![
                Edit::Add(method("baz", "()V")),
                Edit::Add(method("bar", "(I)V")),
            ],
        )
        .unwrap_err();

        let TransformError::EditFailed { index, source } = err else {
            panic!("expected EditFailed, got {err:?}");
        };
        assert_eq!(index, 1);
        assert!(matches!(
            *source,
            TransformError::DuplicateMember { .. }
        ));
        // The successful prefix stays applied
        assert_eq!(member_names(&class), vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn test_remove_twice_in_one_batch_fails() {
        let mut class = sample_class();
        let err = apply(
            &mut class,
            vec![
                Edit::Remove(MemberRef::new("bar", "(I)V")),
                Edit::Remove(MemberRef::new("bar", "(I)V")),
            ],
        )
        .unwrap_err();

        let TransformError::EditFailed { index, source } = err else {
            panic!("expected EditFailed, got {err:?}");
        };
        assert_eq!(index, 1);
        assert!(matches!(*source, TransformError::MemberNotFound { .. }));
        assert_eq!(member_names(&class), vec!["foo"]);
    }

    #[test]
    fn test_replace_preserves_slot() {
        let mut class = sample_class();
        class.push_member(method("tail", "()V"));

        apply(
            &mut class,
            vec![Edit::Replace(
                MemberRef::new("bar", "(I)V"),
                method("bar2", "(II)V"),
            )],
        )
        .unwrap();

        assert_eq!(member_names(&class), vec!["foo", "bar2", "tail"]);
        assert_eq!(class.members()[1].declaring_class(), "demo.Counter");
    }

    #[test]
    fn test_replace_rename_collision_fails() {
        let mut class = sample_class();
        let err = apply(
            &mut class,
            vec![Edit::Replace(
                MemberRef::new("bar", "(I)V"),
                method("foo", "()V"),
            )],
        )
        .unwrap_err();

        let TransformError::EditFailed { source, .. } = err else {
            panic!("expected EditFailed, got {err:?}");
        };
        assert!(matches!(*source, TransformError::DuplicateMember { .. }));
    }

    #[test]
    fn test_set_modifiers_replaces_wholesale() {
        let mut class = sample_class();
        apply(
            &mut class,
            vec![
                Edit::SetModifiers(
                    EditTarget::Member(MemberRef::new("bar", "(I)V")),
                    access::PRIVATE,
                ),
                Edit::SetModifiers(EditTarget::Class, access::PUBLIC | access::FINAL),
            ],
        )
        .unwrap();

        assert_eq!(class.members()[1].access(), access::PRIVATE);
        assert_eq!(class.access, access::PUBLIC | access::FINAL);
    }

    #[test]
    fn test_set_annotations_replaces_wholesale() {
        let mut class = sample_class();
        apply(
            &mut class,
            vec![Edit::SetAnnotations(
                EditTarget::Member(MemberRef::new("foo", "()V")),
                vec![AnnotationModel::marker("demo.Slow")],
            )],
        )
        .unwrap();
        assert_eq!(class.members()[0].annotations().len(), 1);

        apply(
            &mut class,
            vec![Edit::SetAnnotations(
                EditTarget::Member(MemberRef::new("foo", "()V")),
                Vec::new(),
            )],
        )
        .unwrap();
        assert!(class.members()[0].annotations().is_empty());
    }

    #[test]
    fn test_replace_body_rejects_foreign_handle() {
        let mut class = sample_class();
        let before = class.clone();
        let foreign = BodyHandle::new(Origin::Source, BodyRepr::Source(Vec::new()));

        let err = apply(
            &mut class,
            vec![Edit::ReplaceBody(MemberRef::new("bar", "(I)V"), foreign)],
        )
        .unwrap_err();

        let TransformError::EditFailed { source, .. } = err else {
            panic!("expected EditFailed, got {err:?}");
        };
        assert!(matches!(
            *source,
            TransformError::ForeignBodyHandle { .. }
        ));
        // The model is untouched after a foreign-handle failure
        assert_eq!(class, before);
    }

    #[test]
    fn test_replace_body_accepts_owned_handle() {
        let mut class = sample_class();
        let body = BodyHandle::new(
            Origin::Bytecode,
            BodyRepr::Bytecode {
                max_locals: 2,
                code: vec![opal_bytecode::Opcode::ReturnVoid.to_u8()],
            },
        );

        apply(
            &mut class,
            vec![Edit::ReplaceBody(MemberRef::new("bar", "(I)V"), body)],
        )
        .unwrap();

        let method = class.members()[1].as_method().unwrap();
        assert!(method.body.is_some());
    }
}
