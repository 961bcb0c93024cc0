//! End-to-end tests: load → select → mutate → write → reload, on both
//! representations.

use opal_bytecode::{access, BytecodeWriter, ClassFile, CodeAttr, MethodDef};
use opal_syntax::parse;
use opal_transform::{
    BytecodeAdapter, ClassAdapter, ClassModel, Edit, EditTarget, FieldModel, MatchCriteria,
    MemberModel, MemberRef, Pipeline, SourceAdapter, StatementSpec, TransformError, TypeDesc,
};

/// A compiled class `demo.Counter` with methods `foo()V` and `bar(I)V`
fn counter_bytes() -> Vec<u8> {
    let mut file = ClassFile::new("demo/Counter");
    file.class.flags = access::PUBLIC;

    let mut writer = BytecodeWriter::new();
    writer.emit_return_void();
    let body = writer.into_bytes();

    let name = file.constants.add_string("foo");
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
            code: body.clone(),
        }),
    });

    let name = file.constants.add_string("bar");
    let descriptor = file.constants.add_string("(I)V");
    let param = file.constants.add_string("x");
    file.class.methods.push(MethodDef {
        name,
        descriptor,
        flags: access::PUBLIC,
        annotations: Vec::new(),
        param_names: vec![param],
        code: Some(CodeAttr {
            max_stack: 0,
            max_locals: 2,
            code: body,
        }),
    });

    file.encode()
}

const COUNTER_SOURCE: &str = "\
public class Counter {
    public function foo() {
    }

    public function bar(x: int) {
    }
}
";

fn select_names(class: &ClassModel, criteria: &MatchCriteria) -> Vec<String> {
    criteria
        .select(class)
        .iter()
        .map(|m| m.name().to_string())
        .collect()
}

#[test]
fn binary_roundtrip_without_edits_is_stable() {
    let adapter = BytecodeAdapter::new();
    let raw = counter_bytes();

    let model = adapter.load(&raw).unwrap();
    let written = adapter.write(&model).unwrap();
    let reloaded = adapter.load(&written).unwrap();

    assert_eq!(reloaded, model);
}

#[test]
fn source_roundtrip_without_edits_reparses_equivalent() {
    let adapter = SourceAdapter::new();
    let raw = COUNTER_SOURCE.to_string();

    let model = adapter.load(&raw).unwrap();
    let written = adapter.write(&model).unwrap();

    assert!(parse(&raw)
        .unwrap()
        .structurally_equals(&parse(&written).unwrap()));
}

#[test]
fn selection_is_ordered_and_idempotent_across_representations() {
    let from_bytes = BytecodeAdapter::new().load(&counter_bytes()).unwrap();
    let from_source = SourceAdapter::new()
        .load(&COUNTER_SOURCE.to_string())
        .unwrap();

    let criteria = MatchCriteria::methods();
    for model in [&from_bytes, &from_source] {
        assert_eq!(select_names(model, &criteria), vec!["foo", "bar"]);
        assert_eq!(select_names(model, &criteria), vec!["foo", "bar"]);
    }
}

#[test]
fn privatize_bar_by_pattern_end_to_end_binary() {
    let pipeline = Pipeline::new(BytecodeAdapter::new());

    let transformer = |class: &ClassModel| -> Vec<Edit> {
        let refs = MatchCriteria::methods()
            .with_name_pattern("ba*")
            .unwrap()
            .select_refs(class);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0], MemberRef::new("bar", "(I)V"));
        refs.into_iter()
            .map(|r| Edit::SetModifiers(EditTarget::Member(r), access::PRIVATE))
            .collect()
    };

    let written = pipeline.transform(&counter_bytes(), &transformer).unwrap();
    let reloaded = pipeline.adapter().load(&written).unwrap();

    let bar = reloaded.find(&MemberRef::new("bar", "(I)V")).unwrap();
    assert_eq!(bar.access(), access::PRIVATE);
    let foo = reloaded.find(&MemberRef::new("foo", "()V")).unwrap();
    assert_eq!(foo.access(), access::PUBLIC);
}

#[test]
fn privatize_bar_by_pattern_end_to_end_source() {
    let pipeline = Pipeline::new(SourceAdapter::new());

    let transformer = |class: &ClassModel| -> Vec<Edit> {
        MatchCriteria::methods()
            .with_name_pattern("ba*")
            .unwrap()
            .select_refs(class)
            .into_iter()
            .map(|r| Edit::SetModifiers(EditTarget::Member(r), access::PRIVATE))
            .collect()
    };

    let written = pipeline
        .transform(&COUNTER_SOURCE.to_string(), &transformer)
        .unwrap();
    assert!(written.contains("private function bar(x: int)"));
    assert!(written.contains("public function foo()"));
}

#[test]
fn add_field_end_to_end_binary() {
    let pipeline = Pipeline::new(BytecodeAdapter::new());

    let transformer = |class: &ClassModel| {
        assert!(class.find(&MemberRef::new("count", "I")).is_none());
        vec![Edit::Add(MemberModel::Field(FieldModel::new(
            "count",
            TypeDesc::Int,
        )))]
    };

    let written = pipeline.transform(&counter_bytes(), &transformer).unwrap();
    let reloaded = pipeline.adapter().load(&written).unwrap();

    let counts: Vec<_> = reloaded
        .fields()
        .filter(|f| f.name == "count")
        .collect();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0].descriptor, TypeDesc::Int);
    assert!(counts[0].constant.is_none());
}

#[test]
fn foreign_body_handle_is_rejected_and_model_untouched() {
    let bytecode = BytecodeAdapter::new();
    let source = SourceAdapter::new();

    let mut model = bytecode.load(&counter_bytes()).unwrap();
    let before = model.clone();

    let foreign = source
        .create_body(StatementSpec {
            statements: Vec::new(),
        })
        .unwrap();

    let err = opal_transform::apply(
        &mut model,
        vec![Edit::ReplaceBody(MemberRef::new("bar", "(I)V"), foreign)],
    )
    .unwrap_err();

    let TransformError::EditFailed { index: 0, source } = err else {
        panic!("expected EditFailed at index 0, got {err:?}");
    };
    assert!(matches!(
        *source,
        TransformError::ForeignBodyHandle { .. }
    ));
    assert_eq!(model, before);
}

#[test]
fn replace_body_from_owning_adapter_survives_roundtrip() {
    let adapter = BytecodeAdapter::new();
    let mut model = adapter.load(&counter_bytes()).unwrap();

    let mut writer = BytecodeWriter::new();
    writer.emit_const_i32(7);
    writer.emit_store_local(1);
    writer.emit_return_void();
    let body = adapter
        .create_body(opal_transform::InstructionSpec {
            max_locals: 2,
            code: writer.into_bytes(),
        })
        .unwrap();

    opal_transform::apply(
        &mut model,
        vec![Edit::ReplaceBody(MemberRef::new("bar", "(I)V"), body)],
    )
    .unwrap();

    let written = adapter.write(&model).unwrap();
    let file = ClassFile::decode(&written).unwrap();
    let bar = file
        .class
        .methods
        .iter()
        .find(|m| file.constants.get_string(m.name) == Some("bar"))
        .unwrap();
    let code = bar.code.as_ref().unwrap();
    assert_eq!(code.max_stack, 1);
    assert_eq!(code.max_locals, 2);
}

#[test]
fn batch_reports_per_input_results() {
    let pipeline = Pipeline::new(BytecodeAdapter::new());
    let passthrough = |_: &ClassModel| Vec::<Edit>::new();

    let inputs = vec![
        ("counter.opc".to_string(), counter_bytes()),
        ("broken.opc".to_string(), vec![0xDE, 0xAD]),
    ];
    let results = pipeline.transform_batch(&inputs, &passthrough);

    assert_eq!(results.len(), 2);
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_err());
}

#[test]
fn add_remove_restores_member_sequence_via_model() {
    let adapter = SourceAdapter::new();
    let mut model = adapter.load(&COUNTER_SOURCE.to_string()).unwrap();
    let before = model.clone();

    opal_transform::apply(
        &mut model,
        vec![Edit::Add(MemberModel::Field(FieldModel::new(
            "count",
            TypeDesc::Int,
        )))],
    )
    .unwrap();
    opal_transform::apply(&mut model, vec![Edit::Remove(MemberRef::new("count", "I"))])
        .unwrap();

    assert_eq!(model, before);
}
