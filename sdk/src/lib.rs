//! brine-tl
//!
//! This crate provides runtime support for working with TL-encoded data.
//!
//! - The `TlRead` / `TlWrite` / `TlFunction` traits and byte buffers that
//!   generated code is written against
//! - `builtins`, the Rust representations of the TL builtin types
//! - Dynamic `Value`s and their JSON rendering

pub use brine_tl_compiler::error::CompileError;
pub use brine_tl_schema::{
    from_bytes, to_bytes, ByteBuffer, ByteBufferMut, Schema, TlFunction, TlRead, TlWrite, TypeRef,
    Value, WireError,
};

use serde_json::{json, Map};

/// Renders a dynamic value as JSON. Objects carry their constructor name
/// under `@type`, bytes are rendered as lowercase hex.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Int32(v) => json!(v),
        Value::Int64(v) => json!(v),
        Value::Double(v) => json!(v),
        Value::String(v) => json!(v),
        Value::Bytes(v) => json!(v.iter().map(|b| format!("{:02x}", b)).collect::<String>()),
        Value::Bool(v) => json!(v),
        Value::Vector(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Object(name, fields) => {
            let mut object = Map::new();
            object.insert("@type".to_string(), json!(name));
            let mut keys: Vec<&&str> = fields.keys().collect();
            keys.sort();
            for key in keys {
                object.insert(key.to_string(), value_to_json(&fields[*key]));
            }
            serde_json::Value::Object(object)
        }
        Value::Null => serde_json::Value::Null,
    }
}

/// Pretty-printed JSON description of a resolved schema, identifiers
/// included.
pub fn describe_to_json(schema: &Schema) -> Result<String, CompileError> {
    serde_json::to_string_pretty(schema)
        .map_err(|e| CompileError::Config(format!("Failed to describe schema: {}", e)))
}

pub mod builtins {
    pub use brine_tl_schema::builtins::*;
}

pub mod error {
    pub use brine_tl_compiler::error::CompileError;
    pub use brine_tl_schema::WireError;
}

pub mod schema {
    pub use brine_tl_schema::{Combinator, Field, Primitive, Schema, Template, TypeDef, TypeRef, Value};
}
