//! The binary class-file adapter
//!
//! Loads `.opc` bytes into the class model and writes models back out. On
//! write, a fresh constant pool is built (pool indices are consistent by
//! construction) and the `max_stack` of every body is recomputed from its
//! instruction stream; the encoded result is verified before it is returned.

use crate::adapter::ClassAdapter;
use crate::descriptor::{MethodDesc, TypeDesc};
use crate::error::TransformError;
use crate::model::{
    AnnotationModel, BodyHandle, BodyRepr, ClassModel, FieldModel, MemberModel, MethodModel,
    Origin, Value,
};
use opal_bytecode::{
    classfile, compute_max_stack, verify_class, AnnotationDef, ClassFile, ClassFileError,
    CodeAttr, ConstValue, ConstantPool, FieldDef, MethodDef,
};

/// Specification for a new bytecode method body: an encoded instruction list
///
/// Build the instruction bytes with [`opal_bytecode::BytecodeWriter`]. The
/// required `max_stack` is derived from the instructions, not supplied.
#[derive(Debug, Clone)]
pub struct InstructionSpec {
    /// Local variable slots the body uses, parameters included
    pub max_locals: u16,
    /// Encoded instruction stream
    pub code: Vec<u8>,
}

/// Adapter for the compiled binary representation
#[derive(Debug, Clone, Copy, Default)]
pub struct BytecodeAdapter;

impl BytecodeAdapter {
    /// Create a binary adapter
    pub fn new() -> Self {
        Self
    }
}

fn to_dotted(internal: &str) -> String {
    internal.replace('/', ".")
}

fn to_internal(dotted: &str) -> String {
    dotted.replace('.', "/")
}

fn resolve(pool: &ConstantPool, index: u32) -> Result<&str, TransformError> {
    pool.get_string(index)
        .ok_or(TransformError::MalformedClassFile(
            ClassFileError::InvalidPoolIndex(index),
        ))
}

fn value_from_const(pool: &ConstantPool, value: &ConstValue) -> Result<Value, TransformError> {
    Ok(match value {
        ConstValue::Bool(b) => Value::Bool(*b),
        ConstValue::Int(i) => Value::Int(*i),
        ConstValue::Float(f) => Value::Float(*f),
        ConstValue::Str(index) => Value::Str(resolve(pool, *index)?.to_string()),
        ConstValue::Null => Value::Null,
    })
}

fn const_from_value(pool: &mut ConstantPool, value: &Value) -> ConstValue {
    match value {
        Value::Null => ConstValue::Null,
        Value::Bool(b) => ConstValue::Bool(*b),
        Value::Int(i) => ConstValue::Int(*i),
        Value::Float(f) => ConstValue::Float(*f),
        Value::Str(s) => ConstValue::Str(pool.add_string(s.clone())),
    }
}

fn annotations_from_defs(
    pool: &ConstantPool,
    defs: &[AnnotationDef],
) -> Result<Vec<AnnotationModel>, TransformError> {
    defs.iter()
        .map(|def| {
            let ty = TypeDesc::parse(resolve(pool, def.type_desc)?)?;
            let values = def
                .values
                .iter()
                .map(|(name, value)| {
                    Ok((
                        resolve(pool, *name)?.to_string(),
                        value_from_const(pool, value)?,
                    ))
                })
                .collect::<Result<Vec<_>, TransformError>>()?;
            Ok(AnnotationModel { ty, values })
        })
        .collect()
}

fn defs_from_annotations(
    pool: &mut ConstantPool,
    annotations: &[AnnotationModel],
) -> Vec<AnnotationDef> {
    annotations
        .iter()
        .map(|annotation| AnnotationDef {
            type_desc: pool.add_string(annotation.ty.descriptor()),
            values: annotation
                .values
                .iter()
                .map(|(name, value)| {
                    (pool.add_string(name.clone()), const_from_value(pool, value))
                })
                .collect(),
        })
        .collect()
}

impl ClassAdapter for BytecodeAdapter {
    type Raw = Vec<u8>;
    type BodySpec = InstructionSpec;

    fn origin(&self) -> Origin {
        Origin::Bytecode
    }

    fn load(&self, raw: &Vec<u8>) -> Result<ClassModel, TransformError> {
        let file = ClassFile::decode(raw).map_err(|e| match e {
            ClassFileError::UnsupportedVersion(version) => {
                TransformError::UnsupportedVersion(version)
            }
            other => TransformError::MalformedClassFile(other),
        })?;
        let pool = &file.constants;

        let mut model = ClassModel::new(Origin::Bytecode, to_dotted(resolve(pool, file.class.name)?));
        model.access = file.class.flags;
        model.source_file = file.metadata.source_file.clone();
        if let Some(index) = file.class.super_name {
            model.superclass = Some(to_dotted(resolve(pool, index)?));
        }
        for &index in &file.class.interfaces {
            model.interfaces.push(to_dotted(resolve(pool, index)?));
        }
        model.annotations = annotations_from_defs(pool, &file.class.annotations)?;

        for field in &file.class.fields {
            let mut member = FieldModel::new(
                resolve(pool, field.name)?,
                TypeDesc::parse(resolve(pool, field.descriptor)?)?,
            );
            member.access = field.flags;
            member.annotations = annotations_from_defs(pool, &field.annotations)?;
            member.constant = field
                .constant
                .as_ref()
                .map(|value| value_from_const(pool, value))
                .transpose()?;
            model.push_member(MemberModel::Field(member));
        }

        for method in &file.class.methods {
            let mut member = MethodModel::new(
                resolve(pool, method.name)?,
                MethodDesc::parse(resolve(pool, method.descriptor)?)?,
            );
            member.access = method.flags;
            member.annotations = annotations_from_defs(pool, &method.annotations)?;
            member.param_names = method
                .param_names
                .iter()
                .map(|&index| resolve(pool, index).map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?;
            member.body = method.code.as_ref().map(|code| {
                BodyHandle::new(
                    Origin::Bytecode,
                    BodyRepr::Bytecode {
                        max_locals: code.max_locals,
                        code: code.code.clone(),
                    },
                )
            });
            model.push_member(MemberModel::Method(member));
        }

        Ok(model)
    }

    fn write(&self, class: &ClassModel) -> Result<Vec<u8>, TransformError> {
        let mut file = ClassFile::new(&to_internal(&class.name));
        file.class.flags = class.access;
        file.metadata.source_file = class.source_file.clone();
        if class.source_file.is_some() {
            file.flags |= classfile::flags::HAS_DEBUG_INFO;
        }

        if let Some(superclass) = &class.superclass {
            file.class.super_name = Some(file.constants.add_string(to_internal(superclass)));
        }
        for interface in &class.interfaces {
            let index = file.constants.add_string(to_internal(interface));
            file.class.interfaces.push(index);
        }
        file.class.annotations = defs_from_annotations(&mut file.constants, &class.annotations);

        for member in class.members() {
            match member {
                MemberModel::Field(field) => {
                    let def = FieldDef {
                        name: file.constants.add_string(field.name.clone()),
                        descriptor: file.constants.add_string(field.descriptor.descriptor()),
                        flags: field.access,
                        annotations: defs_from_annotations(&mut file.constants, &field.annotations),
                        constant: field
                            .constant
                            .as_ref()
                            .map(|value| const_from_value(&mut file.constants, value)),
                    };
                    file.class.fields.push(def);
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

                    let code = match &method.body {
                        None => None,
                        Some(handle) => match &handle.repr {
                            BodyRepr::Bytecode { max_locals, code } => {
                                // Recompute the derived stack metadata; a
                                // stale declared value must never be trusted
                                let max_stack = compute_max_stack(code).map_err(|e| {
                                    TransformError::InconsistentModel(format!(
                                        "method `{}` body: {e}",
                                        method.name
                                    ))
                                })?;
                                Some(CodeAttr {
                                    max_stack,
                                    max_locals: *max_locals,
                                    code: code.clone(),
                                })
                            }
                            BodyRepr::Source(_) => {
                                return Err(TransformError::InconsistentModel(format!(
                                    "method `{}` carries a {} body handle",
                                    method.name,
                                    handle.origin(),
                                )));
                            }
                        },
                    };

                    let def = MethodDef {
                        name: file.constants.add_string(method.name.clone()),
                        descriptor: file.constants.add_string(method.descriptor.descriptor()),
                        flags: method.access,
                        annotations: defs_from_annotations(
                            &mut file.constants,
                            &method.annotations,
                        ),
                        param_names: method
                            .param_names
                            .iter()
                            .map(|name| file.constants.add_string(name.clone()))
                            .collect(),
                        code,
                    };
                    file.class.methods.push(def);
                }
            }
        }

        // Full verification before any bytes leave the adapter
        verify_class(&file).map_err(|e| TransformError::InconsistentModel(e.to_string()))?;
        Ok(file.encode())
    }

    fn create_body(&self, spec: InstructionSpec) -> Result<BodyHandle, TransformError> {
        // Instruction streams are validated up front; pool references can
        // only be checked against the target class at write time
        compute_max_stack(&spec.code).map_err(|e| {
            TransformError::InconsistentModel(format!("invalid instruction stream: {e}"))
        })?;
        Ok(BodyHandle::new(
            Origin::Bytecode,
            BodyRepr::Bytecode {
                max_locals: spec.max_locals,
                code: spec.code,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opal_bytecode::{access, BytecodeWriter};

    fn encoded_counter() -> Vec<u8> {
        let mut file = ClassFile::new("demo/Counter");
        file.class.flags = access::PUBLIC;
        let super_name = file.constants.add_string("demo/Base");
        file.class.super_name = Some(super_name);

        let name = file.constants.add_string("count");
        let descriptor = file.constants.add_string("I");
        file.class.fields.push(FieldDef {
            name,
            descriptor,
            flags: access::PRIVATE,
            annotations: Vec::new(),
            constant: Some(ConstValue::Int(0)),
        });

        let mut writer = BytecodeWriter::new();
        writer.emit_return_void();
        let name = file.constants.add_string("reset");
        let descriptor = file.constants.add_string("()V");
        file.class.methods.push(MethodDef {
            name,
            descriptor,
            flags: access::PUBLIC,
            annotations: Vec::new(),
            param_names: Vec::new(),
            code: Some(CodeAttr {
                max_stack: 0,
                max_locals: 1,
                code: writer.into_bytes(),
            }),
        });

        file.encode()
    }

    #[test]
    fn test_load_translates_names_and_descriptors() {
        let adapter = BytecodeAdapter::new();
        let model = adapter.load(&encoded_counter()).unwrap();

        assert_eq!(model.origin(), Origin::Bytecode);
        assert_eq!(model.name, "demo.Counter");
        assert_eq!(model.superclass.as_deref(), Some("demo.Base"));
        assert_eq!(model.members().len(), 2);

        let field = model.members()[0].as_field().unwrap();
        assert_eq!(field.name, "count");
        assert_eq!(field.descriptor, TypeDesc::Int);
        assert_eq!(field.constant, Some(Value::Int(0)));
        assert_eq!(field.declaring_class(), "demo.Counter");

        let method = model.members()[1].as_method().unwrap();
        assert_eq!(method.descriptor.descriptor(), "()V");
        assert!(method.body.is_some());
    }

    #[test]
    fn test_roundtrip_without_edits() {
        let adapter = BytecodeAdapter::new();
        let raw = encoded_counter();
        let model = adapter.load(&raw).unwrap();
        let written = adapter.write(&model).unwrap();
        let reloaded = adapter.load(&written).unwrap();
        assert_eq!(reloaded, model);
    }

    #[test]
    fn test_write_recomputes_max_stack() {
        let adapter = BytecodeAdapter::new();

        let mut writer = BytecodeWriter::new();
        writer.emit_const_i32(1);
        writer.emit_const_i32(2);
        writer.emit_iadd();
        writer.emit_return();
        let body = adapter
            .create_body(InstructionSpec {
                max_locals: 1,
                code: writer.into_bytes(),
            })
            .unwrap();

        let mut model = adapter.load(&encoded_counter()).unwrap();
        let mut method = MethodModel::new("sum", MethodDesc::parse("()I").unwrap());
        method.body = Some(body);
        model.push_member(MemberModel::Method(method));

        let written = adapter.write(&model).unwrap();
        let file = ClassFile::decode(&written).unwrap();
        let def = file
            .class
            .methods
            .iter()
            .find(|m| file.constants.get_string(m.name) == Some("sum"))
            .unwrap();
        assert_eq!(def.code.as_ref().unwrap().max_stack, 2);
    }

    #[test]
    fn test_unsupported_version_is_mapped() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"OPAL");
        bytes.extend_from_slice(&99u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let adapter = BytecodeAdapter::new();
        assert!(matches!(
            adapter.load(&bytes),
            Err(TransformError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_write_rejects_source_body() {
        let adapter = BytecodeAdapter::new();
        let mut model = adapter.load(&encoded_counter()).unwrap();

        let mut method = MethodModel::new("alien", MethodDesc::parse("()V").unwrap());
        method.body = Some(BodyHandle::new(Origin::Source, BodyRepr::Source(Vec::new())));
        model.push_member(MemberModel::Method(method));

        assert!(matches!(
            adapter.write(&model),
            Err(TransformError::InconsistentModel(_))
        ));
    }

    #[test]
    fn test_create_body_rejects_bad_instructions() {
        let adapter = BytecodeAdapter::new();
        let result = adapter.create_body(InstructionSpec {
            max_locals: 0,
            code: vec![0xFF],
        });
        assert!(matches!(
            result,
            Err(TransformError::InconsistentModel(_))
        ));
    }
}
