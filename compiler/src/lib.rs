//! brine-tl-compiler
//!
//! This crate implements:
//!  1) A tokenizer + parser for `.tl` combinator schemas, merged across files,
//!  2) A resolver (builtins, templates, nullable references, closed sums, recursion),
//!  3) CRC-32 combinator identifiers over canonical signatures,
//!  4) Code generation (`compile_schema_to_rust` → `String`), including
//!     `From` conversions to a separately generated schema,
//!  5) The JSON generator configuration and the `CompileError` type.

pub mod error;
pub mod config;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod id;
pub mod resolver;
pub mod gen_rust;
pub mod conversion;
pub mod compiler;

pub use compiler::{compile_schema, compile_sources, generate_rust};
pub use config::Config;
pub use conversion::build_mapping;
pub use error::CompileError;
pub use gen_rust::compile_schema_to_rust;
pub use id::combinator_id;
pub use parser::Source;
