//! Representations of the TL builtin types.
//!
//! Generated code glob-imports this module (the default `builtinInclude`)
//! and refers to builtins as `TL` + builtin name, e.g. `TLint32`.

use std::{
    fmt,
    sync::atomic::{compiler_fence, Ordering},
};

pub type TLint32 = i32;
pub type TLint53 = i64;
pub type TLint64 = i64;
pub type TLdouble = f64;
pub type TLstring = String;
pub type TLbool = bool;
pub type TLvector<T> = Vec<T>;

/// Arbitrary binary data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TLbytes(pub Vec<u8>);

impl From<Vec<u8>> for TLbytes {
    fn from(value: Vec<u8>) -> Self {
        TLbytes(value)
    }
}

impl From<&[u8]> for TLbytes {
    fn from(value: &[u8]) -> Self {
        TLbytes(value.to_vec())
    }
}

/// Secret material. The buffer is wiped on drop and never printed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TLsecureString {
    v: Vec<u8>,
}

pub type TLsecureBytes = TLsecureString;

impl TLsecureString {
    pub fn new(value: Vec<u8>) -> Self {
        TLsecureString { v: value }
    }

    pub fn expose(&self) -> &[u8] {
        &self.v
    }

    pub fn len(&self) -> usize {
        self.v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }
}

impl fmt::Debug for TLsecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TLsecureString(<{} bytes>)", self.v.len())
    }
}

impl TLsecureString {
    fn wipe(&mut self) {
        self.v.fill(0);
        // Keeps the stores from being elided ahead of the deallocation.
        compiler_fence(Ordering::SeqCst);
    }
}

impl Drop for TLsecureString {
    fn drop(&mut self) {
        self.wipe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_string_debug_is_redacted() {
        let secret = TLsecureString::new(b"password".to_vec());
        assert_eq!(format!("{:?}", secret), "TLsecureString(<8 bytes>)");
        assert_eq!(secret.expose(), b"password");
    }

    #[test]
    fn wipe_zeroes_the_buffer() {
        let mut secret = TLsecureString::new(b"seed".to_vec());
        secret.wipe();
        assert_eq!(secret.expose(), [0, 0, 0, 0]);
        assert_eq!(secret.len(), 4);
    }
}
