use thiserror::Error;

/// Failures raised while reading or writing TL-encoded data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WireError {
    #[error("Unexpected end of buffer at offset {offset}: {needed} more bytes needed")]
    UnexpectedEnd { offset: usize, needed: usize },

    #[error("Invalid length prefix at offset {offset}")]
    InvalidLength { offset: usize },

    #[error("Unknown constructor id {id:#010x} for type {type_name}")]
    UnknownId { type_name: String, id: u32 },

    #[error("Length {len} exceeds the encodable maximum of {max}")]
    TooLong { len: usize, max: usize },

    #[error("Invalid presence flag {0}, expected 0 or 1")]
    InvalidPresenceFlag(i32),

    #[error("String is not valid UTF-8")]
    InvalidUtf8,

    #[error("{trailing} trailing bytes after the decoded value")]
    TrailingBytes { trailing: usize },

    #[error("Failed to decode field \"{field}\" of {combinator}: {source}")]
    Field {
        combinator: String,
        field:      String,
        source:     Box<WireError>,
    },

    #[error("Value does not match {expected}: found {found}")]
    Mismatch { expected: String, found: String },

    #[error("Type {0} is not part of the schema")]
    UnknownType(String),
}

impl WireError {
    /// Wraps this error with the combinator and field being decoded.
    pub fn in_field(self, combinator: &str, field: &str) -> WireError {
        WireError::Field {
            combinator: combinator.to_owned(),
            field:      field.to_owned(),
            source:     Box::new(self),
        }
    }
}
