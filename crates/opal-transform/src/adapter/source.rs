//! The source-text adapter
//!
//! Parses `.opal` text into the class model and re-renders models through
//! the deterministic printer, so written output reparses to a structurally
//! equivalent tree. Statement blocks travel through the model as opaque
//! body handles.

use crate::adapter::ClassAdapter;
use crate::descriptor::{MethodDesc, TypeDesc};
use crate::error::TransformError;
use crate::model::{
    AnnotationModel, BodyHandle, BodyRepr, ClassModel, FieldModel, MemberModel, MethodModel,
    Origin, Value,
};
use opal_bytecode::access;
use opal_syntax::ast::{
    Annotation, ClassDecl, FieldDecl, Literal, Member, MethodDecl, Modifier, Param, Program,
    Statement, TypeAnnotation,
};
use opal_syntax::token::Span;
use opal_syntax::{parse, print};

/// Specification for a new source method body: a statement block
#[derive(Debug, Clone)]
pub struct StatementSpec {
    /// Statements of the new body, in order
    pub statements: Vec<Statement>,
}

/// Adapter for the parsed source representation
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceAdapter;

impl SourceAdapter {
    /// Create a source adapter
    pub fn new() -> Self {
        Self
    }
}

fn type_desc_from_annotation(ty: &TypeAnnotation) -> Result<TypeDesc, TransformError> {
    match ty {
        TypeAnnotation::Named(name) => TypeDesc::from_source_name(name),
        TypeAnnotation::Array(elem) => {
            let elem = type_desc_from_annotation(elem)?;
            if elem == TypeDesc::Void {
                return Err(TransformError::MalformedDescriptor {
                    descriptor: ty.render(),
                    reason: "array of void".to_string(),
                });
            }
            Ok(TypeDesc::Array(Box::new(elem)))
        }
    }
}

fn annotation_from_type_desc(ty: &TypeDesc) -> TypeAnnotation {
    match ty {
        TypeDesc::Array(elem) => TypeAnnotation::Array(Box::new(annotation_from_type_desc(elem))),
        other => TypeAnnotation::Named(other.source_name()),
    }
}

fn value_from_literal(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::Str(s) => Value::Str(s.clone()),
    }
}

fn literal_from_value(value: &Value) -> Literal {
    match value {
        Value::Null => Literal::Null,
        Value::Bool(b) => Literal::Bool(*b),
        Value::Int(i) => Literal::Int(*i),
        Value::Float(f) => Literal::Float(*f),
        Value::Str(s) => Literal::Str(s.clone()),
    }
}

fn access_from_modifiers(modifiers: &[Modifier]) -> u32 {
    modifiers.iter().fold(0, |flags, modifier| {
        flags
            | match modifier {
                Modifier::Public => access::PUBLIC,
                Modifier::Private => access::PRIVATE,
                Modifier::Protected => access::PROTECTED,
                Modifier::Static => access::STATIC,
                Modifier::Final => access::FINAL,
                Modifier::Abstract => access::ABSTRACT,
            }
    })
}

/// Modifier keywords for an access word, in canonical source order
fn modifiers_from_access(flags: u32) -> Vec<Modifier> {
    let order = [
        (access::PUBLIC, Modifier::Public),
        (access::PRIVATE, Modifier::Private),
        (access::PROTECTED, Modifier::Protected),
        (access::STATIC, Modifier::Static),
        (access::FINAL, Modifier::Final),
        (access::ABSTRACT, Modifier::Abstract),
    ];
    order
        .into_iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, modifier)| modifier)
        .collect()
}

fn annotations_from_ast(annotations: &[Annotation]) -> Vec<AnnotationModel> {
    annotations
        .iter()
        .map(|annotation| AnnotationModel {
            ty: TypeDesc::Object(annotation.name.clone()),
            values: annotation
                .values
                .iter()
                .map(|(name, literal)| (name.clone(), value_from_literal(literal)))
                .collect(),
        })
        .collect()
}

fn ast_from_annotations(
    annotations: &[AnnotationModel],
) -> Result<Vec<Annotation>, TransformError> {
    annotations
        .iter()
        .map(|annotation| {
            let TypeDesc::Object(name) = &annotation.ty else {
                return Err(TransformError::InconsistentModel(format!(
                    "annotation type `{}` is not a class type",
                    annotation.ty
                )));
            };
            Ok(Annotation {
                name: name.clone(),
                values: annotation
                    .values
                    .iter()
                    .map(|(name, value)| (name.clone(), literal_from_value(value)))
                    .collect(),
            })
        })
        .collect()
}

impl ClassAdapter for SourceAdapter {
    type Raw = String;
    type BodySpec = StatementSpec;

    fn origin(&self) -> Origin {
        Origin::Source
    }

    fn load(&self, raw: &String) -> Result<ClassModel, TransformError> {
        let program = parse(raw)?;
        let found = program.classes.len();
        let Some(decl) = (found == 1)
            .then(|| program.classes.into_iter().next())
            .flatten()
        else {
            return Err(TransformError::ExpectedSingleClass { found });
        };

        let mut model = ClassModel::new(Origin::Source, decl.name);
        model.access = access_from_modifiers(&decl.modifiers);
        model.superclass = decl.superclass;
        model.interfaces = decl.interfaces;
        model.annotations = annotations_from_ast(&decl.annotations);

        for member in decl.members {
            match member {
                Member::Field(field) => {
                    let mut entry =
                        FieldModel::new(field.name, type_desc_from_annotation(&field.ty)?);
                    entry.access = access_from_modifiers(&field.modifiers);
                    entry.annotations = annotations_from_ast(&field.annotations);
                    entry.constant = field.initializer.as_ref().map(value_from_literal);
                    model.push_member(MemberModel::Field(entry));
                }
                Member::Method(method) => {
                    let params = method
                        .params
                        .iter()
                        .map(|param| type_desc_from_annotation(&param.ty))
                        .collect::<Result<Vec<_>, _>>()?;
                    let ret = method
                        .return_type
                        .as_ref()
                        .map(type_desc_from_annotation)
                        .transpose()?
                        .unwrap_or(TypeDesc::Void);

                    let mut entry =
                        MethodModel::new(method.name, MethodDesc { params, ret });
                    entry.access = access_from_modifiers(&method.modifiers);
                    entry.annotations = annotations_from_ast(&method.annotations);
                    entry.param_names =
                        method.params.into_iter().map(|param| param.name).collect();
                    entry.body = method
                        .body
                        .map(|statements| {
                            BodyHandle::new(Origin::Source, BodyRepr::Source(statements))
                        });
                    model.push_member(MemberModel::Method(entry));
                }
            }
        }

        Ok(model)
    }

    fn write(&self, class: &ClassModel) -> Result<String, TransformError> {
        let mut members = Vec::with_capacity(class.members().len());
        for member in class.members() {
            match member {
                MemberModel::Field(field) => {
                    members.push(Member::Field(FieldDecl {
                        annotations: ast_from_annotations(&field.annotations)?,
                        modifiers: modifiers_from_access(field.access),
                        name: field.name.clone(),
                        ty: annotation_from_type_desc(&field.descriptor),
                        initializer: field.constant.as_ref().map(literal_from_value),
                        span: Span::default(),
                    }));
                }
                MemberModel::Method(method) => {
                    if method.param_names.len() != method.descriptor.params.len() {
                        return Err(TransformError::InconsistentModel(format!(
                            "method `{}` has {} parameter names for {} parameters",
                            method.name,
                            method.param_names.len(),
                            method.descriptor.params.len(),
                        )));
                    }
                    let params = method
                        .param_names
                        .iter()
                        .zip(&method.descriptor.params)
                        .map(|(name, ty)| Param {
                            name: name.clone(),
                            ty: annotation_from_type_desc(ty),
                        })
                        .collect();
                    let return_type = match &method.descriptor.ret {
                        TypeDesc::Void => None,
                        other => Some(annotation_from_type_desc(other)),
                    };
                    let body = match &method.body {
                        None => None,
                        Some(handle) => match &handle.repr {
                            BodyRepr::Source(statements) => Some(statements.clone()),
                            BodyRepr::Bytecode { .. } => {
                                return Err(TransformError::InconsistentModel(format!(
                                    "method `{}` carries a {} body handle",
                                    method.name,
                                    handle.origin(),
                                )));
                            }
                        },
                    };

                    members.push(Member::Method(MethodDecl {
                        annotations: ast_from_annotations(&method.annotations)?,
                        modifiers: modifiers_from_access(method.access),
                        name: method.name.clone(),
                        params,
                        return_type,
                        body,
                        span: Span::default(),
                    }));
                }
            }
        }

        let program = Program {
            classes: vec![ClassDecl {
                annotations: ast_from_annotations(&class.annotations)?,
                modifiers: modifiers_from_access(class.access),
                name: class.name.clone(),
                superclass: class.superclass.clone(),
                interfaces: class.interfaces.clone(),
                members,
                span: Span::default(),
            }],
        };

        Ok(print(&program))
    }

    fn create_body(&self, spec: StatementSpec) -> Result<BodyHandle, TransformError> {
        Ok(BodyHandle::new(
            Origin::Source,
            BodyRepr::Source(spec.statements),
        ))
    }
}
