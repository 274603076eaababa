use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error in {file} at line {line}, column {column}: {msg}")]
    Parse {
        file:   String,
        line:   usize,
        column: usize,
        msg:    String,
    },

    #[error("Schema error in {combinator} (line {line}): {msg}")]
    Schema {
        combinator: String,
        line:       usize,
        msg:        String,
    },

    #[error("Unresolved type {type_name} in {location}")]
    UnresolvedType {
        type_name: String,
        location:  String,
    },

    #[error("Template arity error in {combinator} (line {line}): {msg}")]
    TemplateArity {
        combinator: String,
        line:       usize,
        msg:        String,
    },

    #[error("Ambiguous nullable declaration {name}: {msg}")]
    AmbiguousNullable { name: String, msg: String },

    #[error("Conversion error for {combinator}: {msg}")]
    Conversion { combinator: String, msg: String },

    #[error("Wire error: {0}")]
    Wire(#[from] brine_tl_schema::WireError),
}
