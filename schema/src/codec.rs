use crate::{
    bb::{ByteBuffer, ByteBufferMut},
    builtins::{TLbytes, TLsecureString},
    error::WireError,
};

/// Constructor identifier of `boolTrue = Bool;`.
pub const BOOL_TRUE_ID: u32 = 0x997275b5;
/// Constructor identifier of `boolFalse = Bool;`.
pub const BOOL_FALSE_ID: u32 = 0xbc799737;

/// Types that can be decoded from a TL byte stream.
///
/// Generated data definitions implement this for their bare form, and
/// generated type declarations for their boxed form (identifier first).
pub trait TlRead: Sized {
    fn read(bb: &mut ByteBuffer<'_>) -> Result<Self, WireError>;
}

/// Types that can be encoded into a TL byte stream.
pub trait TlWrite {
    fn write(&self, bb: &mut ByteBufferMut) -> Result<(), WireError>;
}

/// A TL function (RPC request) together with the type it answers with.
pub trait TlFunction: TlWrite {
    const ID: u32;
    type Output: TlRead;
}

/// Encodes `value` into a fresh buffer.
pub fn to_bytes<T: TlWrite + ?Sized>(value: &T) -> Result<Vec<u8>, WireError> {
    let mut bb = ByteBufferMut::new();
    value.write(&mut bb)?;
    Ok(bb.data())
}

/// Decodes a `T` from `bytes`, requiring every byte to be consumed.
pub fn from_bytes<T: TlRead>(bytes: &[u8]) -> Result<T, WireError> {
    let mut bb = ByteBuffer::new(bytes);
    let value = T::read(&mut bb)?;
    match bb.remaining() {
        0 => Ok(value),
        trailing => Err(WireError::TrailingBytes { trailing }),
    }
}

impl TlRead for i32 {
    fn read(bb: &mut ByteBuffer<'_>) -> Result<Self, WireError> {
        bb.read_i32()
    }
}

impl TlWrite for i32 {
    fn write(&self, bb: &mut ByteBufferMut) -> Result<(), WireError> {
        bb.write_i32(*self);
        Ok(())
    }
}

impl TlRead for i64 {
    fn read(bb: &mut ByteBuffer<'_>) -> Result<Self, WireError> {
        bb.read_i64()
    }
}

impl TlWrite for i64 {
    fn write(&self, bb: &mut ByteBufferMut) -> Result<(), WireError> {
        bb.write_i64(*self);
        Ok(())
    }
}

impl TlRead for f64 {
    fn read(bb: &mut ByteBuffer<'_>) -> Result<Self, WireError> {
        bb.read_f64()
    }
}

impl TlWrite for f64 {
    fn write(&self, bb: &mut ByteBufferMut) -> Result<(), WireError> {
        bb.write_f64(*self);
        Ok(())
    }
}

impl TlRead for String {
    fn read(bb: &mut ByteBuffer<'_>) -> Result<Self, WireError> {
        bb.read_string()
    }
}

impl TlWrite for String {
    fn write(&self, bb: &mut ByteBufferMut) -> Result<(), WireError> {
        bb.write_string(self)
    }
}

impl TlRead for TLbytes {
    fn read(bb: &mut ByteBuffer<'_>) -> Result<Self, WireError> {
        Ok(TLbytes(bb.read_bytes()?.to_vec()))
    }
}

impl TlWrite for TLbytes {
    fn write(&self, bb: &mut ByteBufferMut) -> Result<(), WireError> {
        bb.write_bytes(&self.0)
    }
}

impl TlRead for TLsecureString {
    fn read(bb: &mut ByteBuffer<'_>) -> Result<Self, WireError> {
        Ok(TLsecureString::new(bb.read_bytes()?.to_vec()))
    }
}

impl TlWrite for TLsecureString {
    fn write(&self, bb: &mut ByteBufferMut) -> Result<(), WireError> {
        bb.write_bytes(self.expose())
    }
}

/// Booleans travel boxed, as one of the two zero-field constructors of `Bool`.
impl TlRead for bool {
    fn read(bb: &mut ByteBuffer<'_>) -> Result<Self, WireError> {
        match bb.read_u32()? {
            BOOL_TRUE_ID => Ok(true),
            BOOL_FALSE_ID => Ok(false),
            id => Err(WireError::UnknownId {
                type_name: "Bool".to_owned(),
                id,
            }),
        }
    }
}

impl TlWrite for bool {
    fn write(&self, bb: &mut ByteBufferMut) -> Result<(), WireError> {
        bb.write_u32(if *self { BOOL_TRUE_ID } else { BOOL_FALSE_ID });
        Ok(())
    }
}

impl<T: TlRead> TlRead for Vec<T> {
    fn read(bb: &mut ByteBuffer<'_>) -> Result<Self, WireError> {
        let count = bb.read_count()?;
        let mut items = Vec::with_capacity(count.min(bb.remaining()));
        for _ in 0..count {
            items.push(T::read(bb)?);
        }
        Ok(items)
    }
}

impl<T: TlWrite> TlWrite for Vec<T> {
    fn write(&self, bb: &mut ByteBufferMut) -> Result<(), WireError> {
        bb.write_count(self.len())?;
        for item in self {
            item.write(bb)?;
        }
        Ok(())
    }
}

/// Nullable values carry an int32 presence flag ahead of the payload.
impl<T: TlRead> TlRead for Option<T> {
    fn read(bb: &mut ByteBuffer<'_>) -> Result<Self, WireError> {
        match bb.read_i32()? {
            0 => Ok(None),
            1 => Ok(Some(T::read(bb)?)),
            flag => Err(WireError::InvalidPresenceFlag(flag)),
        }
    }
}

impl<T: TlWrite> TlWrite for Option<T> {
    fn write(&self, bb: &mut ByteBufferMut) -> Result<(), WireError> {
        match self {
            None => {
                bb.write_i32(0);
                Ok(())
            }
            Some(value) => {
                bb.write_i32(1);
                value.write(bb)
            }
        }
    }
}

impl<T: TlWrite + ?Sized> TlWrite for &T {
    fn write(&self, bb: &mut ByteBufferMut) -> Result<(), WireError> {
        (**self).write(bb)
    }
}
