use crate::{
    bb::{ByteBuffer, ByteBufferMut},
    codec::{BOOL_FALSE_ID, BOOL_TRUE_ID},
    error::WireError,
    schema::{Combinator, Primitive, Schema, TypeRef},
};

use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

/// This type holds dynamic TL data.
///
/// Values can represent anything in a TL schema and can be converted to and
/// from byte arrays using the corresponding [Schema](struct.Schema.html) and
/// a [TypeRef](enum.TypeRef.html). Constructor and field names are stored
/// using string slices from their Schema, so a Value can outlive the buffer it
/// was parsed from but can't outlive the schema.
#[derive(Clone, PartialEq)]
pub enum Value<'a> {
    Int32(i32),
    /// Both `int53` and `int64` use this variant.
    Int64(i64),
    Double(f64),
    String(String),
    /// `bytes`, `secureString` and `secureBytes`.
    Bytes(Vec<u8>),
    Bool(bool),
    Vector(Vec<Value<'a>>),
    /// A constructor name and its fields.
    Object(&'a str, HashMap<&'a str, Value<'a>>),
    /// An absent nullable value.
    Null,
}

impl<'a> Value<'a> {
    /// A convenience method to extract the value out of an [Int32](#variant.Int32).
    /// Returns `0` for other value kinds.
    pub fn as_int32(&self) -> i32 {
        match *self {
            Value::Int32(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of an [Int64](#variant.Int64).
    /// Returns `0` for other value kinds.
    pub fn as_int64(&self) -> i64 {
        match *self {
            Value::Int64(value) => value,
            _ => 0,
        }
    }

    pub fn as_double(&self) -> f64 {
        match *self {
            Value::Double(value) => value,
            _ => 0.0,
        }
    }

    pub fn as_bool(&self) -> bool {
        matches!(*self, Value::Bool(true))
    }

    /// Returns `""` for other value kinds.
    pub fn as_string(&self) -> &str {
        match *self {
            Value::String(ref value) => value.as_str(),
            _ => "",
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match *self {
            Value::Bytes(ref value) => value.as_slice(),
            _ => &[],
        }
    }

    /// A convenience method to get the items out of a [Vector](#variant.Vector).
    /// Returns an empty slice for other value kinds.
    pub fn as_vector(&self) -> &[Value<'a>] {
        match *self {
            Value::Vector(ref values) => values.as_slice(),
            _ => &[],
        }
    }

    /// The constructor name of an [Object](#variant.Object), if this is one.
    pub fn constructor(&self) -> Option<&'a str> {
        match *self {
            Value::Object(name, _) => Some(name),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(*self, Value::Null)
    }

    /// Returns `0` for other value kinds.
    pub fn len(&self) -> usize {
        match *self {
            Value::Vector(ref values) => values.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A convenience method to append to a [Vector](#variant.Vector). Does
    /// nothing for other value kinds.
    pub fn push(&mut self, value: Value<'a>) {
        if let Value::Vector(ref mut values) = *self {
            values.push(value);
        }
    }

    /// A convenience method to extract a field out of an [Object](#variant.Object).
    /// Returns `None` for other value kinds or if the field isn't present.
    pub fn get(&self, name: &str) -> Option<&Value<'a>> {
        match *self {
            Value::Object(_, ref fields) => fields.get(name),
            _ => None,
        }
    }

    /// A convenience method to update a field on an [Object](#variant.Object).
    /// Does nothing for other value kinds.
    pub fn set(&mut self, name: &'a str, value: Value<'a>) {
        if let Value::Object(_, ref mut fields) = *self {
            fields.insert(name, value);
        }
    }

    /// Decodes a value of type `type_ref` from `bytes`. Every byte must be
    /// consumed.
    pub fn decode(
        schema: &'a Schema,
        type_ref: &TypeRef,
        bytes: &[u8],
    ) -> Result<Value<'a>, WireError> {
        let mut bb = ByteBuffer::new(bytes);
        let value = Value::decode_bb(schema, type_ref, &mut bb)?;
        match bb.remaining() {
            0 => Ok(value),
            trailing => Err(WireError::TrailingBytes { trailing }),
        }
    }

    /// Decodes a boxed value of the result type `type_name`.
    pub fn decode_type(
        schema: &'a Schema,
        type_name: &str,
        bytes: &[u8],
    ) -> Result<Value<'a>, WireError> {
        if schema.type_def(type_name).is_none() {
            return Err(WireError::UnknownType(type_name.to_owned()));
        }
        let type_ref = TypeRef::User {
            name:     type_name.to_owned(),
            boxed:    true,
            nullable: false,
        };
        Value::decode(schema, &type_ref, bytes)
    }

    /// Encodes this value as `type_ref` into an array of bytes.
    pub fn encode(&self, schema: &Schema, type_ref: &TypeRef) -> Result<Vec<u8>, WireError> {
        let mut bb = ByteBufferMut::new();
        self.encode_bb(schema, type_ref, &mut bb)?;
        Ok(bb.data())
    }

    /// Decodes a value of type `type_ref` from `bb` starting at the current
    /// index. This is mainly useful as a helper routine for
    /// [decode](#method.decode), which you probably want to use instead.
    pub fn decode_bb(
        schema: &'a Schema,
        type_ref: &TypeRef,
        bb: &mut ByteBuffer,
    ) -> Result<Value<'a>, WireError> {
        match type_ref {
            TypeRef::Builtin { primitive, .. } => decode_primitive(*primitive, bb),

            TypeRef::Template { args, .. } => {
                let count = bb.read_count()?;
                let mut items = Vec::with_capacity(count.min(bb.remaining()));
                for _ in 0..count {
                    items.push(Value::decode_bb(schema, &args[0], bb)?);
                }
                Ok(Value::Vector(items))
            }

            TypeRef::User { name, boxed, nullable } => {
                if *nullable {
                    match bb.read_i32()? {
                        0 => return Ok(Value::Null),
                        1 => {}
                        flag => return Err(WireError::InvalidPresenceFlag(flag)),
                    }
                }

                let combinator = if *boxed {
                    let id = bb.read_u32()?;
                    // Only the constructors of this result type may appear here.
                    match schema.combinator_by_id(id) {
                        Some(c) if c.result_name() == name.as_str() => c,
                        _ => {
                            return Err(WireError::UnknownId {
                                type_name: name.clone(),
                                id,
                            })
                        }
                    }
                } else {
                    schema
                        .combinator(name)
                        .ok_or_else(|| WireError::UnknownType(name.clone()))?
                };

                Value::decode_fields_bb(schema, combinator, bb)
            }
        }
    }

    /// Decodes the fields of `combinator` in declared order.
    pub fn decode_fields_bb(
        schema: &'a Schema,
        combinator: &'a Combinator,
        bb: &mut ByteBuffer,
    ) -> Result<Value<'a>, WireError> {
        let mut fields = HashMap::new();
        for field in &combinator.fields {
            let value = Value::decode_bb(schema, &field.type_, bb)
                .map_err(|e| e.in_field(&combinator.name, &field.name))?;
            fields.insert(field.name.as_str(), value);
        }
        Ok(Value::Object(combinator.name.as_str(), fields))
    }

    /// Encodes the current value as `type_ref` to the end of `bb`.
    pub fn encode_bb(
        &self,
        schema: &Schema,
        type_ref: &TypeRef,
        bb: &mut ByteBufferMut,
    ) -> Result<(), WireError> {
        match (type_ref, self) {
            (TypeRef::Builtin { primitive, .. }, _) => self.encode_primitive(*primitive, bb),

            (TypeRef::Template { args, .. }, Value::Vector(items)) => {
                bb.write_count(items.len())?;
                for item in items {
                    item.encode_bb(schema, &args[0], bb)?;
                }
                Ok(())
            }

            (TypeRef::User { nullable: true, .. }, Value::Null) => {
                bb.write_i32(0);
                Ok(())
            }

            (TypeRef::User { name, boxed, nullable }, Value::Object(ctor, fields)) => {
                let combinator = schema
                    .combinator(ctor)
                    .ok_or_else(|| WireError::UnknownType((*ctor).to_owned()))?;
                let fits = if *boxed {
                    combinator.result_name() == name.as_str()
                } else {
                    combinator.name == *name
                };
                if !fits {
                    return Err(self.mismatch(type_ref));
                }

                if *nullable {
                    bb.write_i32(1);
                }
                if *boxed {
                    bb.write_u32(combinator.id);
                }
                for field in &combinator.fields {
                    let value = fields.get(field.name.as_str()).ok_or_else(|| {
                        WireError::Mismatch {
                            expected: format!("field \"{}\" of {}", field.name, combinator.name),
                            found:    "nothing".to_owned(),
                        }
                    })?;
                    value.encode_bb(schema, &field.type_, bb)?;
                }
                Ok(())
            }

            _ => Err(self.mismatch(type_ref)),
        }
    }

    fn encode_primitive(&self, primitive: Primitive, bb: &mut ByteBufferMut) -> Result<(), WireError> {
        match (primitive, self) {
            (Primitive::Int32, Value::Int32(v)) => bb.write_i32(*v),
            (Primitive::Int53 | Primitive::Int64, Value::Int64(v)) => bb.write_i64(*v),
            (Primitive::Double, Value::Double(v)) => bb.write_f64(*v),
            (Primitive::String, Value::String(v)) => bb.write_string(v)?,
            (Primitive::Bytes | Primitive::SecureString | Primitive::SecureBytes, Value::Bytes(v)) => {
                bb.write_bytes(v)?
            }
            (Primitive::Bool, Value::Bool(v)) => {
                bb.write_u32(if *v { BOOL_TRUE_ID } else { BOOL_FALSE_ID })
            }
            _ => {
                return Err(WireError::Mismatch {
                    expected: primitive.name().to_owned(),
                    found:    format!("{:?}", self),
                })
            }
        }
        Ok(())
    }

    fn mismatch(&self, type_ref: &TypeRef) -> WireError {
        WireError::Mismatch {
            expected: type_ref.name().to_owned(),
            found:    format!("{:?}", self),
        }
    }
}

fn decode_primitive<'a>(primitive: Primitive, bb: &mut ByteBuffer) -> Result<Value<'a>, WireError> {
    Ok(match primitive {
        Primitive::Int32 => Value::Int32(bb.read_i32()?),
        Primitive::Int53 | Primitive::Int64 => Value::Int64(bb.read_i64()?),
        Primitive::Double => Value::Double(bb.read_f64()?),
        Primitive::String => Value::String(bb.read_string()?),
        Primitive::Bytes | Primitive::SecureString | Primitive::SecureBytes => {
            Value::Bytes(bb.read_bytes()?.to_vec())
        }
        Primitive::Bool => match bb.read_u32()? {
            BOOL_TRUE_ID => Value::Bool(true),
            BOOL_FALSE_ID => Value::Bool(false),
            id => {
                return Err(WireError::UnknownId {
                    type_name: "Bool".to_owned(),
                    id,
                })
            }
        },
    })
}

impl<'a> Index<usize> for Value<'a> {
    type Output = Value<'a>;

    /// A convenience method that adds support for `self[index]` expressions.
    /// It will panic if this value isn't a [Vector](#variant.Vector) or if the
    /// provided index is out of bounds.
    fn index(&self, index: usize) -> &Value<'a> {
        match *self {
            Value::Vector(ref values) => &values[index],
            _ => panic!("cannot index into a non-vector value"),
        }
    }
}

impl<'a> fmt::Debug for Value<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Value::Int32(value) => value.fmt(f),
            Value::Int64(value) => value.fmt(f),
            Value::Double(value) => value.fmt(f),
            Value::String(ref value) => value.fmt(f),
            Value::Bytes(ref value) => write!(f, "bytes{:?}", value),
            Value::Bool(value) => value.fmt(f),
            Value::Vector(ref values) => values.fmt(f),
            Value::Null => write!(f, "null"),

            Value::Object(name, ref fields) => {
                let mut keys: Vec<_> = fields.keys().collect();
                let mut first = true;
                keys.sort();
                write!(f, "{} {{", name)?;

                for key in keys {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {:?}", key, fields[key])?;
                }

                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Combinator, Field, Template};

    fn int32() -> TypeRef {
        TypeRef::Builtin { name: "int32".to_owned(), primitive: Primitive::Int32 }
    }

    fn string() -> TypeRef {
        TypeRef::Builtin { name: "string".to_owned(), primitive: Primitive::String }
    }

    fn boxed(name: &str) -> TypeRef {
        TypeRef::User { name: name.to_owned(), boxed: true, nullable: false }
    }

    fn field(name: &str, type_: TypeRef) -> Field {
        Field { name: name.to_owned(), type_ }
    }

    fn bar_schema() -> Schema {
        Schema::new(
            vec!["int32".to_owned(), "string".to_owned()],
            vec![
                Combinator {
                    name:   "foo".to_owned(),
                    id:     0x11111111,
                    fields: vec![field("a", int32()), field("b", string())],
                    result: boxed("Bar"),
                },
                Combinator {
                    name:   "baz".to_owned(),
                    id:     0x22222222,
                    fields: vec![field("c", int32())],
                    result: boxed("Bar"),
                },
                Combinator {
                    name:   "holder".to_owned(),
                    id:     0x33333333,
                    fields: vec![
                        field("items", TypeRef::Template {
                            name:     "vector".to_owned(),
                            template: Template::Vector,
                            args:     vec![int32()],
                        }),
                        field("bar", TypeRef::User {
                            name:     "Bar".to_owned(),
                            boxed:    true,
                            nullable: true,
                        }),
                    ],
                    result: boxed("Holder"),
                },
            ],
            vec![],
        )
    }

    #[test]
    fn value_basic() {
        let value = Value::Vector(vec![
            Value::Int32(-1),
            Value::Int64(1),
            Value::String("abc".to_owned()),
            Value::Bool(true),
            Value::Null,
            Value::Object("Obj", {
                let mut map = HashMap::new();
                map.insert("key1", Value::String("value1".to_owned()));
                map.insert("key2", Value::Int32(2));
                map
            }),
        ]);

        assert_eq!(value.len(), 6);
        assert_eq!(value[0].as_int32(), -1);
        assert_eq!(value[1].as_int64(), 1);
        assert_eq!(value[2].as_string(), "abc");
        assert!(value[3].as_bool());
        assert!(value[4].is_null());
        assert_eq!(value[5].constructor(), Some("Obj"));
        assert_eq!(value[5].get("key2"), Some(&Value::Int32(2)));
        assert_eq!(value.get("key1"), None);

        assert_eq!(
            format!("{:?}", value),
            "[-1, 1, \"abc\", true, null, Obj {key1: \"value1\", key2: 2}]"
        );
    }

    #[test]
    fn value_set_and_push() {
        let mut object = Value::Object("Foo", HashMap::new());
        object.set("x", Value::Int32(123));
        assert_eq!(object.get("x"), Some(&Value::Int32(123)));

        let mut vector = Value::Vector(vec![]);
        vector.push(Value::Int32(1));
        vector.push(Value::Int32(2));
        assert_eq!(vector.len(), 2);
        assert_eq!(vector[1], Value::Int32(2));
    }

    #[test]
    fn boxed_value_encodes_identifier_then_fields() {
        let schema = bar_schema();
        let foo = Value::Object("foo", {
            let mut map = HashMap::new();
            map.insert("a", Value::Int32(5));
            map.insert("b", Value::String("x".to_owned()));
            map
        });

        let bytes = foo.encode(&schema, &boxed("Bar")).unwrap();
        assert_eq!(bytes, [0x11, 0x11, 0x11, 0x11, 5, 0, 0, 0, 1, b'x', 0, 0]);

        let decoded = Value::decode_type(&schema, "Bar", &bytes).unwrap();
        assert_eq!(decoded.constructor(), Some("foo"));
        assert_eq!(decoded, foo);
    }

    #[test]
    fn decoding_dispatches_on_the_identifier() {
        let schema = bar_schema();
        let bytes = [0x22, 0x22, 0x22, 0x22, 9, 0, 0, 0];
        let decoded = Value::decode_type(&schema, "Bar", &bytes).unwrap();
        assert_eq!(decoded.constructor(), Some("baz"));
        assert_eq!(decoded.get("c"), Some(&Value::Int32(9)));

        // `holder` is a known constructor, but not one of `Bar`.
        let bytes = [0x33, 0x33, 0x33, 0x33];
        assert_eq!(
            Value::decode_type(&schema, "Bar", &bytes),
            Err(WireError::UnknownId { type_name: "Bar".to_owned(), id: 0x33333333 })
        );
    }

    #[test]
    fn absent_nullable_field_is_only_a_flag() {
        let schema = bar_schema();
        let holder = Value::Object("holder", {
            let mut map = HashMap::new();
            map.insert("items", Value::Vector(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]));
            map.insert("bar", Value::Null);
            map
        });

        let bytes = holder.encode(&schema, &boxed("Holder")).unwrap();
        assert_eq!(bytes.len(), 4 + 4 + 12 + 4);
        assert_eq!(&bytes[20..], &[0, 0, 0, 0]);
        assert_eq!(Value::decode_type(&schema, "Holder", &bytes), Ok(holder));
    }

    #[test]
    fn truncated_field_reports_context() {
        let schema = bar_schema();
        let bytes = [0x11, 0x11, 0x11, 0x11, 5, 0, 0, 0];
        match Value::decode_type(&schema, "Bar", &bytes) {
            Err(WireError::Field { combinator, field, .. }) => {
                assert_eq!(combinator, "foo");
                assert_eq!(field, "b");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn mismatched_value_is_rejected() {
        let schema = bar_schema();
        assert!(Value::Int32(1).encode(&schema, &string()).is_err());
        assert!(Value::Object("holder", HashMap::new())
            .encode(&schema, &boxed("Bar"))
            .is_err());
    }

    #[test]
    fn oversized_string_is_rejected() {
        let schema = bar_schema();
        let long = Value::String("x".repeat(crate::bb::MAX_BYTES_LEN + 1));
        assert_eq!(
            long.encode(&schema, &string()),
            Err(WireError::TooLong { len: crate::bb::MAX_BYTES_LEN + 1, max: crate::bb::MAX_BYTES_LEN })
        );
    }
}
