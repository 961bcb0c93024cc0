//! Integration tests for the class-file format

use opal_bytecode::{
    access, compute_max_stack, verify_class, AnnotationDef, BytecodeWriter, ClassFile,
    ClassFileError, CodeAttr, ConstValue, FieldDef, MethodDef,
};

fn counter_class() -> ClassFile {
    let mut file = ClassFile::new("demo/Counter");
    file.class.flags = access::PUBLIC;

    let count_name = file.constants.add_string("count");
    let count_desc = file.constants.add_string("I");
    file.class.fields.push(FieldDef {
        name: count_name,
        descriptor: count_desc,
        flags: access::PRIVATE,
        annotations: Vec::new(),
        constant: Some(ConstValue::Int(0)),
    });

    let symbol = file.constants.add_string("demo/Counter.count:I");
    let mut writer = BytecodeWriter::new();
    writer.emit_load_static(symbol);
    writer.emit_load_local(1);
    writer.emit_iadd();
    writer.emit_store_static(symbol);
    writer.emit_return_void();
    let code = writer.into_bytes();

    let name = file.constants.add_string("increment");
    let descriptor = file.constants.add_string("(I)V");
    let step = file.constants.add_string("step");
    let max_stack = compute_max_stack(&code).unwrap();
    file.class.methods.push(MethodDef {
        name,
        descriptor,
        flags: access::PUBLIC,
        annotations: Vec::new(),
        param_names: vec![step],
        code: Some(CodeAttr {
            max_stack,
            max_locals: 2,
            code,
        }),
    });

    file
}

#[test]
fn test_create_encode_verify() {
    let file = counter_class();
    assert!(verify_class(&file).is_ok());

    let bytes = file.encode();
    assert!(bytes.len() > 16);
}

#[test]
fn test_roundtrip_preserves_structure() {
    let file = counter_class();
    let bytes = file.encode();
    let decoded = ClassFile::decode(&bytes).expect("decode failed");

    assert_eq!(decoded, file);
    assert_eq!(decoded.class_name().unwrap(), "demo/Counter");
    assert_eq!(decoded.class.fields.len(), 1);
    assert_eq!(decoded.class.methods.len(), 1);
    assert_eq!(
        decoded
            .constants
            .get_string(decoded.class.methods[0].descriptor),
        Some("(I)V")
    );
}

#[test]
fn test_reencode_is_stable() {
    let file = counter_class();
    let once = file.encode();
    let twice = ClassFile::decode(&once).unwrap().encode();
    assert_eq!(once, twice);
}

#[test]
fn test_annotated_member_roundtrip() {
    let mut file = counter_class();
    let type_desc = file.constants.add_string("Ldemo/Atomic;");
    file.class.fields[0].annotations.push(AnnotationDef {
        type_desc,
        values: Vec::new(),
    });

    let bytes = file.encode();
    let decoded = ClassFile::decode(&bytes).unwrap();
    assert_eq!(decoded.class.fields[0].annotations.len(), 1);
    assert_eq!(
        decoded
            .constants
            .get_string(decoded.class.fields[0].annotations[0].type_desc),
        Some("Ldemo/Atomic;")
    );
}

#[test]
fn test_truncated_input_rejected() {
    let file = counter_class();
    let bytes = file.encode();
    let result = ClassFile::decode(&bytes[..bytes.len() - 4]);
    assert!(matches!(
        result,
        Err(ClassFileError::ChecksumMismatch { .. }) | Err(ClassFileError::DecodeError(_))
    ));
}
