//! Runtime support for the TL serialization format: the byte buffers, the
//! codec traits implemented by generated code, the builtin representations
//! and a dynamic [Value] codec driven by a resolved [Schema].
//!
//! ```
//! use brine_tl_schema::*;
//!
//! let int32 = TypeRef::Builtin { name: "int32".to_owned(), primitive: Primitive::Int32 };
//! let schema = Schema::new(vec!["int32".to_owned()], vec![
//!     Combinator {
//!         name: "point".to_owned(),
//!         id: 0x01020304,
//!         fields: vec![
//!             Field { name: "x".to_owned(), type_: int32.clone() },
//!             Field { name: "y".to_owned(), type_: int32 },
//!         ],
//!         result: TypeRef::User { name: "Point".to_owned(), boxed: true, nullable: false },
//!     },
//! ], vec![]);
//!
//! let bytes = [4, 3, 2, 1, 1, 0, 0, 0, 255, 255, 255, 255];
//! let value = Value::decode_type(&schema, "Point", &bytes).unwrap();
//! assert_eq!(format!("{:?}", value), "point {x: 1, y: -1}");
//! assert_eq!(value.encode(&schema, &schema.combinators[0].result).unwrap(), bytes);
//! ```

pub mod bb;
pub mod builtins;
pub mod codec;
pub mod error;
pub mod schema;
pub mod value;

pub use bb::*;
pub use codec::*;
pub use error::WireError;
pub use schema::*;
pub use value::*;
