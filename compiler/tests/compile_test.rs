#![cfg(test)]

use std::collections::HashMap;

use brine_tl_compiler::{
    build_mapping, compile_schema, compile_schema_to_rust, compile_sources, generate_rust, CompileError, Config,
    Source,
};
use brine_tl_schema::{Primitive, TypeRef, Value, WireError};
use proptest::prelude::*;

const CONFIG: &str = r#"{
    "namespaces": { "global": "Ton::TonlibApi" },
    "sections": ["read-write"],
    "skip": ["vector {t:Type} # [ t ] = Vector t;"],
    "builtin": ["int32", "int64", "string", "bytes", "bool"],
    "builtinTemplates": ["vector"],
    "nullable": ["note"]
}"#;

const SCHEMA: &str = r#"
    // Builtins are dropped, templates are skipped.
    int32 = Int32;
    boolTrue = Bool;
    vector {t:Type} # [ t ] = Vector t;

    note text:string = Note;
    row cells:vector<vector<int32>> label:string flag:Bool note:note = Row;
    table rows:vector<Row> = Table;

    ---functions---
    getTable name:string = Table;
"#;

fn config() -> Config {
    Config::from_json(CONFIG).expect("config")
}

#[test]
fn test_compile_schema() {
    let schema = compile_schema(&config(), SCHEMA).expect("compile_schema failed");

    let names: Vec<&str> = schema.combinators.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["note", "row", "table"]);
    assert_eq!(schema.functions.len(), 1);

    let row = schema.combinator("row").unwrap();
    assert_eq!(row.fields.len(), 4);
    assert!(matches!(&row.fields[0].type_, TypeRef::Template { args, .. } if args.len() == 1));
    assert_eq!(
        row.fields[2].type_,
        TypeRef::Builtin { name: "bool".to_string(), primitive: Primitive::Bool }
    );
    assert!(row.fields[3].type_.is_nullable());
    assert_eq!(schema.type_def("Row").unwrap().constructors, ["row"]);
}

#[test]
fn test_compile_schema_to_rust() {
    let config = config();
    let schema = compile_schema(&config, SCHEMA).expect("compile_schema failed");
    let rust_code = compile_schema_to_rust(&config, &schema, None).expect("codegen failed");

    assert!(rust_code.contains("pub mod ton {\npub mod tonlib_api {"));
    assert!(rust_code.contains("pub struct TLDrow {"));
    assert!(rust_code.contains("    pub cells: TLvector<TLvector<TLint32>>,"));
    assert!(rust_code.contains("    pub note: Option<TLDnote>,"));
    assert!(rust_code.contains("pub struct TLGetTable {"));
    assert!(rust_code.contains("    type Output = TLTable;"));
    assert!(rust_code.contains("impl TlRead for TLDrow {"));
}

#[test]
fn test_errors_are_located() {
    let err = compile_sources(
        &config(),
        &[Source::new("a.tl", "ok = Ok;"), Source::new("b.tl", "\n\nm x:Missing = M;")],
    )
    .unwrap_err();
    match err {
        CompileError::UnresolvedType { type_name, location } => {
            assert_eq!(type_name, "Missing");
            assert!(location.contains("b.tl"), "{}", location);
            assert!(location.contains("line 3"), "{}", location);
        }
        other => panic!("expected UnresolvedType but got {:?}", other),
    }
}

#[test]
fn test_conversion_pipeline() {
    let foreign_config = config();
    let foreign = compile_schema(&foreign_config, SCHEMA).unwrap();

    let native_config = Config::from_json(
        r#"{
            "namespaces": { "global": "Ton::details" },
            "builtin": ["int32", "string"],
            "builtinTemplates": ["vector"],
            "nullable": ["note"],
            "conversion": {
                "include": "crate::api",
                "namespace": "ton::tonlib_api",
                "builtinAdditional": ["bool"]
            }
        }"#,
    )
    .unwrap();
    let native_text = "boolFalse = Bool;\nboolTrue = Bool;\nnote text:string = Note;\n\
                       row cells:vector<vector<int32>> label:string flag:Bool note:note = Row;";

    let native = compile_schema(&native_config, native_text).unwrap();
    let mapping = build_mapping(&native, &foreign, native_config.conversion.as_ref().unwrap()).unwrap();
    assert_eq!(mapping.types.len(), 2);

    let code = generate_rust(&native_config, &[Source::new("native.tl", native_text)], Some(&foreign)).unwrap();
    assert!(code.contains("pub mod conversion {"));
    assert!(code.contains(
        "            cells: value.cells.into_iter().map(|item| item.into_iter().map(|item| \
         <foreign::TLint32>::from(item)).collect::<Vec<_>>()).collect::<Vec<_>>(),"
    ));
}

#[test]
fn test_dynamic_values() {
    let schema = compile_schema(&config(), SCHEMA).unwrap();

    let mut note = HashMap::new();
    note.insert("text", Value::String("hi".to_string()));
    let mut fields = HashMap::new();
    fields.insert("cells", Value::Vector(vec![Value::Vector(vec![Value::Int32(1)])]));
    fields.insert("label", Value::String("a".to_string()));
    fields.insert("flag", Value::Bool(true));
    fields.insert("note", Value::Object("note", note));
    let row = Value::Object("row", fields);

    let row_ref = schema.combinator("row").unwrap().result.clone();
    let bytes = row.encode(&schema, &row_ref).unwrap();
    assert_eq!(Value::decode_type(&schema, "Row", &bytes).unwrap(), row);

    assert_eq!(
        Value::decode_type(&schema, "Row", &[0, 0, 0, 0]),
        Err(WireError::UnknownId { type_name: "Row".to_string(), id: 0 })
    );
}

fn cells() -> impl Strategy<Value = Vec<Vec<i32>>> {
    proptest::collection::vec(proptest::collection::vec(any::<i32>(), 0..5), 0..5)
}

proptest! {
    #[test]
    fn dynamic_rows_round_trip(
        cells in cells(),
        label in ".{0,300}",
        flag in any::<bool>(),
        note in proptest::option::of(".{0,20}"),
    ) {
        let schema = compile_schema(&config(), SCHEMA).unwrap();

        let mut fields = HashMap::new();
        fields.insert(
            "cells",
            Value::Vector(
                cells
                    .into_iter()
                    .map(|row| Value::Vector(row.into_iter().map(Value::Int32).collect()))
                    .collect(),
            ),
        );
        fields.insert("label", Value::String(label));
        fields.insert("flag", Value::Bool(flag));
        fields.insert(
            "note",
            match note {
                Some(text) => {
                    let mut note = HashMap::new();
                    note.insert("text", Value::String(text));
                    Value::Object("note", note)
                }
                None => Value::Null,
            },
        );
        let row = Value::Object("row", fields);

        let row_ref = schema.combinator("row").unwrap().result.clone();
        let bytes = row.encode(&schema, &row_ref).unwrap();
        prop_assert_eq!(bytes.len() % 4, 0);
        prop_assert_eq!(Value::decode(&schema, &row_ref, &bytes).unwrap(), row);
    }
}
