use crate::error::WireError;

/// A TL byte buffer meant for reading.
///
/// All integers are little-endian. Byte strings carry a one or four byte
/// length prefix and are padded with zeroes to a multiple of four bytes.
///
/// Example usage:
///
/// ```
/// let mut bb = brine_tl_schema::ByteBuffer::new(&[5, 0, 0, 0, 2, 104, 105, 0]);
/// assert_eq!(bb.read_i32(), Ok(5));
/// assert_eq!(bb.read_string(), Ok("hi".to_owned()));
/// assert!(bb.is_empty());
/// ```
///
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Create a new ByteBuffer that wraps the provided byte slice.
    pub fn new(data: &'a [u8]) -> ByteBuffer<'a> {
        ByteBuffer { data, index: 0 }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current index into the underlying byte slice. This starts
    /// off as 0 and ends up as `self.data().len()` when everything has been
    /// read.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Try to read `len` raw bytes starting at the current index.
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if len > self.remaining() {
            return Err(WireError::UnexpectedEnd {
                offset: self.index,
                needed: len - self.remaining(),
            });
        }
        let value = &self.data[self.index..self.index + len];
        self.index += len;
        Ok(value)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_raw(N)?);
        Ok(out)
    }

    /// Try to read an unsigned 32-bit integer. Constructor identifiers are
    /// read with this.
    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Try to read a length-prefixed byte string, skipping its padding.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], WireError> {
        let start = self.index;
        let first = self.read_raw(1)?[0];
        let (len, header) = match first {
            254 => {
                let b = self.read_raw(3)?;
                (b[0] as usize | (b[1] as usize) << 8 | (b[2] as usize) << 16, 4)
            }
            255 => return Err(WireError::InvalidLength { offset: start }),
            len => (len as usize, 1),
        };
        let value = self.read_raw(len)?;
        self.read_raw(padding(header + len))?;
        Ok(value)
    }

    /// Try to read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, WireError> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8)
    }

    /// Try to read a vector length prefix.
    pub fn read_count(&mut self) -> Result<usize, WireError> {
        let offset = self.index;
        let count = self.read_i32()?;
        if count < 0 {
            return Err(WireError::InvalidLength { offset });
        }
        Ok(count as usize)
    }
}

/// Longest byte string the TL length prefix can describe.
pub const MAX_BYTES_LEN: usize = 0xFF_FFFF;

fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// A TL byte buffer meant for writing.
///
/// Example usage:
///
/// ```
/// let mut bb = brine_tl_schema::ByteBufferMut::new();
/// bb.write_i32(5);
/// bb.write_string("hi").unwrap();
/// assert_eq!(bb.data(), [5, 0, 0, 0, 2, 104, 105, 0]);
/// ```
///
#[derive(Debug, Default)]
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    /// Creates an empty ByteBufferMut ready for writing.
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    /// Consumes this buffer and returns the underlying backing store. Use this
    /// to get the data out when you're done writing to the buffer.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write raw bytes without any prefix or padding.
    pub fn write_raw(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_raw(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_raw(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_raw(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_raw(&value.to_le_bytes());
    }

    /// Write a length-prefixed byte string followed by zero padding.
    ///
    /// The long form carries a 24-bit length, so longer values are
    /// rejected instead of being written with a truncated length.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<(), WireError> {
        let len = value.len();
        if len > MAX_BYTES_LEN {
            return Err(WireError::TooLong { len, max: MAX_BYTES_LEN });
        }
        let header = if len < 254 {
            self.data.push(len as u8);
            1
        } else {
            self.write_raw(&[254, len as u8, (len >> 8) as u8, (len >> 16) as u8]);
            4
        };
        self.write_raw(value);
        self.data
            .extend(std::iter::repeat(0).take(padding(header + len)));
        Ok(())
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), WireError> {
        self.write_bytes(value.as_bytes())
    }

    pub fn write_count(&mut self, count: usize) -> Result<(), WireError> {
        let count = i32::try_from(count).map_err(|_| WireError::TooLong {
            len: count,
            max: i32::MAX as usize,
        })?;
        self.write_i32(count);
        Ok(())
    }
}

#[cfg(test)]
fn write_once(cb: fn(&mut ByteBufferMut) -> Result<(), WireError>) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    cb(&mut bb).unwrap();
    bb.data()
}

#[test]
fn read_fixed_width() {
    let mut bb = ByteBuffer::new(&[
        0xb5, 0x75, 0x72, 0x99, 0xff, 0xff, 0xff, 0xff, 1, 0, 0, 0, 0, 0, 0, 0x80,
    ]);
    assert_eq!(bb.read_u32(), Ok(0x997275b5));
    assert_eq!(bb.read_i32(), Ok(-1));
    assert_eq!(bb.read_i64(), Ok(i64::MIN + 1));
    assert!(bb.is_empty());
    assert_eq!(
        bb.read_i32(),
        Err(WireError::UnexpectedEnd { offset: 16, needed: 4 })
    );
}

#[test]
fn read_double() {
    let bytes = 1.5f64.to_le_bytes();
    assert_eq!(ByteBuffer::new(&bytes).read_f64(), Ok(1.5));
}

#[test]
fn read_short_bytes() {
    let read = |bytes| ByteBuffer::new(bytes).read_bytes().map(|b| b.to_vec());
    assert_eq!(read(&[0, 0, 0, 0]), Ok(vec![]));
    assert_eq!(read(&[1, 7, 0, 0]), Ok(vec![7]));
    assert_eq!(read(&[3, 1, 2, 3]), Ok(vec![1, 2, 3]));
    assert_eq!(read(&[4, 1, 2, 3, 4, 0, 0, 0]), Ok(vec![1, 2, 3, 4]));
    assert!(read(&[4, 1, 2, 3, 4]).is_err());
    assert_eq!(read(&[255, 0, 0, 0]), Err(WireError::InvalidLength { offset: 0 }));
}

#[test]
fn read_long_bytes() {
    let mut data = vec![254, 254, 0, 0];
    data.extend(std::iter::repeat(9).take(254));
    data.extend([0, 0]);
    let mut bb = ByteBuffer::new(&data);
    assert_eq!(bb.read_bytes().map(|b| b.len()), Ok(254));
    assert!(bb.is_empty());
}

#[test]
fn read_string() {
    let read = |bytes| ByteBuffer::new(bytes).read_string();
    assert_eq!(read(&[3, 97, 98, 99]), Ok("abc".to_owned()));
    assert_eq!(read(&[2, 0xc3, 0x28, 0]), Err(WireError::InvalidUtf8));
}

#[test]
fn read_count() {
    let read = |bytes| ByteBuffer::new(bytes).read_count();
    assert_eq!(read(&[0, 0, 0, 0]), Ok(0));
    assert_eq!(read(&[1, 0, 0, 0, 5, 0, 0, 0]), Ok(1));
    assert_eq!(read(&[255, 255, 255, 255]), Err(WireError::InvalidLength { offset: 0 }));
}

#[test]
fn write_fixed_width() {
    assert_eq!(write_once(|bb| Ok(bb.write_u32(0x997275b5))), [0xb5, 0x75, 0x72, 0x99]);
    assert_eq!(write_once(|bb| Ok(bb.write_i32(-2))), [0xfe, 0xff, 0xff, 0xff]);
    assert_eq!(write_once(|bb| Ok(bb.write_i64(1))), [1, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(write_once(|bb| Ok(bb.write_f64(1.5))), 1.5f64.to_le_bytes());
}

#[test]
fn write_bytes() {
    assert_eq!(write_once(|bb| bb.write_bytes(&[])), [0, 0, 0, 0]);
    assert_eq!(write_once(|bb| bb.write_bytes(&[7])), [1, 7, 0, 0]);
    assert_eq!(write_once(|bb| bb.write_bytes(&[1, 2, 3])), [3, 1, 2, 3]);
    assert_eq!(write_once(|bb| bb.write_string("abcd")), [4, 97, 98, 99, 100, 0, 0, 0]);

    let long = write_once(|bb| bb.write_bytes(&[9; 254]));
    assert_eq!(&long[..4], &[254, 254, 0, 0]);
    assert_eq!(long.len(), 260);
    assert_eq!(&long[258..], &[0, 0]);
}

#[test]
fn write_sequence() {
    let mut bb = ByteBufferMut::new();
    bb.write_count(2).unwrap();
    bb.write_string("x").unwrap();
    bb.write_i64(-1);
    let data = bb.data();
    assert_eq!(data.len(), 16);

    let mut bb = ByteBuffer::new(&data);
    assert_eq!(bb.read_count(), Ok(2));
    assert_eq!(bb.read_string(), Ok("x".to_owned()));
    assert_eq!(bb.read_i64(), Ok(-1));
    assert!(bb.is_empty());
}

#[test]
fn write_bytes_at_the_length_limit() {
    let mut bb = ByteBufferMut::new();
    bb.write_bytes(&vec![7; MAX_BYTES_LEN]).unwrap();
    let data = bb.data();
    assert_eq!(&data[..4], &[254, 0xff, 0xff, 0xff]);
    assert_eq!(data.len(), 4 + MAX_BYTES_LEN + 1);
    let mut read = ByteBuffer::new(&data);
    assert_eq!(read.read_bytes().map(|b| b.len()), Ok(MAX_BYTES_LEN));
    assert!(read.is_empty());

    let mut bb = ByteBufferMut::new();
    assert_eq!(
        bb.write_bytes(&vec![7; MAX_BYTES_LEN + 1]),
        Err(WireError::TooLong { len: 1 << 24, max: MAX_BYTES_LEN })
    );
    assert!(bb.is_empty());
}

#[test]
fn write_count_rejects_overflow() {
    let mut bb = ByteBufferMut::new();
    assert_eq!(
        bb.write_count(i32::MAX as usize + 1),
        Err(WireError::TooLong { len: i32::MAX as usize + 1, max: i32::MAX as usize })
    );
    assert!(bb.is_empty());
}
