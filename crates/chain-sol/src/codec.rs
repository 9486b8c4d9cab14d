//! Binary layout shared by account data and instruction payloads.
//!
//! ```text
//! integers     little-endian, fixed width
//! address      32 raw bytes, no prefix
//! Option<T>    u8 tag (0 = None, 1 = Some) then T if present
//! String       u32 LE byte length then UTF-8 bytes
//! Vec<T>       u32 LE element count then each element
//! ```
//!
//! Decoding never reads past the buffer: every shortfall is a
//! [`SolError::Decode`] carrying the absolute byte offset where it happened.

use crate::address::Address;
use crate::error::SolError;

/// Cursor over a byte buffer that remembers where it is.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader::with_base_offset(data, 0)
    }

    /// Reader whose reported offsets start at `base`, for buffers that are a
    /// suffix of a larger one (account data after its discriminator).
    pub fn with_base_offset(data: &'a [u8], base: usize) -> Self {
        Reader { data, pos: 0, base }
    }

    /// Absolute offset of the next unread byte.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Unread bytes, without consuming them.
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], SolError> {
        if self.remaining() < n {
            return Err(SolError::decode(
                self.offset(),
                format!("expected {n} bytes, {} remaining", self.remaining()),
            ));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], SolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, SolError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, SolError> {
        self.read_array::<4>().map(u32::from_le_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64, SolError> {
        self.read_array::<8>().map(u64::from_le_bytes)
    }
}

pub trait Decode: Sized {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, SolError>;
}

pub trait Encode {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), SolError>;
}

/// Encode a single value into a fresh buffer.
pub fn to_bytes<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>, SolError> {
    let mut out = Vec::new();
    value.encode(&mut out)?;
    Ok(out)
}

/// Decode a value from the start of `bytes`. Trailing bytes are ignored.
pub fn from_bytes<T: Decode>(bytes: &[u8]) -> Result<T, SolError> {
    T::decode(&mut Reader::new(bytes))
}

fn write_len(out: &mut Vec<u8>, len: usize) -> Result<(), SolError> {
    let len: u32 = len
        .try_into()
        .map_err(|_| SolError::Encode(format!("length {len} does not fit a u32 prefix")))?;
    out.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

impl Decode for u8 {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, SolError> {
        reader.read_u8()
    }
}

impl Encode for u8 {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), SolError> {
        out.push(*self);
        Ok(())
    }
}

impl Decode for u32 {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, SolError> {
        reader.read_u32()
    }
}

impl Encode for u32 {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), SolError> {
        out.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }
}

impl Decode for u64 {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, SolError> {
        reader.read_u64()
    }
}

impl Encode for u64 {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), SolError> {
        out.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }
}

impl Decode for bool {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, SolError> {
        let offset = reader.offset();
        match reader.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SolError::decode(offset, format!("invalid bool byte {other}"))),
        }
    }
}

impl Encode for bool {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), SolError> {
        out.push(u8::from(*self));
        Ok(())
    }
}

impl Decode for Address {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, SolError> {
        reader.read_array::<32>().map(Address)
    }
}

impl Encode for Address {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), SolError> {
        out.extend_from_slice(self.as_ref());
        Ok(())
    }
}

impl Decode for String {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, SolError> {
        let prefix_offset = reader.offset();
        let len = reader.read_u32()? as usize;
        if len > reader.remaining() {
            return Err(SolError::decode(
                prefix_offset,
                format!(
                    "string length {len} exceeds {} remaining bytes",
                    reader.remaining()
                ),
            ));
        }

        let body_offset = reader.offset();
        let bytes = reader.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| {
            SolError::decode(
                body_offset + e.utf8_error().valid_up_to(),
                "string is not valid UTF-8",
            )
        })
    }
}

impl Encode for String {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), SolError> {
        self.as_str().encode(out)
    }
}

impl Encode for str {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), SolError> {
        write_len(out, self.len())?;
        out.extend_from_slice(self.as_bytes());
        Ok(())
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, SolError> {
        let offset = reader.offset();
        match reader.read_u8()? {
            0 => Ok(None),
            1 => T::decode(reader).map(Some),
            other => Err(SolError::decode(
                offset,
                format!("invalid presence flag {other}"),
            )),
        }
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), SolError> {
        match self {
            None => {
                out.push(0);
                Ok(())
            }
            Some(value) => {
                out.push(1);
                value.encode(out)
            }
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, SolError> {
        let count = reader.read_u32()? as usize;
        // A hostile count must not drive the allocation.
        let mut items = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            items.push(T::decode(reader)?);
        }
        Ok(items)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), SolError> {
        write_len(out, self.len())?;
        for item in self {
            item.encode(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_err_offset(result: Result<impl std::fmt::Debug, SolError>) -> usize {
        match result {
            Err(SolError::Decode { offset, .. }) => offset,
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn integers_are_little_endian() {
        assert_eq!(to_bytes(&0x0102_0304u32).unwrap(), vec![4, 3, 2, 1]);
        assert_eq!(from_bytes::<u64>(&[1, 0, 0, 0, 0, 0, 0, 0]).unwrap(), 1);
    }

    #[test]
    fn string_layout_is_length_prefixed_bytes() {
        // Byte length, not character count.
        let bytes = to_bytes("héllo").unwrap();
        assert_eq!(&bytes[..4], &6u32.to_le_bytes());
        assert_eq!(&bytes[4..], "héllo".as_bytes());
    }

    #[test]
    fn empty_string_is_only_a_prefix() {
        assert_eq!(to_bytes("").unwrap(), vec![0, 0, 0, 0]);
        assert_eq!(from_bytes::<String>(&[0, 0, 0, 0]).unwrap(), "");
    }

    #[test]
    fn absent_option_consumes_one_byte() {
        let mut reader = Reader::new(&[0, 0xff]);
        assert_eq!(Option::<u64>::decode(&mut reader).unwrap(), None);
        assert_eq!(reader.offset(), 1);
    }

    #[test]
    fn present_option_reads_value() {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&42u64.to_le_bytes());
        assert_eq!(from_bytes::<Option<u64>>(&bytes).unwrap(), Some(42));
    }

    #[test]
    fn invalid_presence_flag_is_rejected() {
        let offset = decode_err_offset(from_bytes::<Option<u64>>(&[2, 0, 0, 0, 0, 0, 0, 0, 0]));
        assert_eq!(offset, 0);
    }

    #[test]
    fn vec_of_strings_layout() {
        let value = vec!["ab".to_string(), "c".to_string()];
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(
            bytes,
            vec![2, 0, 0, 0, 2, 0, 0, 0, b'a', b'b', 1, 0, 0, 0, b'c']
        );
        assert_eq!(from_bytes::<Vec<String>>(&bytes).unwrap(), value);
    }

    #[test]
    fn truncated_u64_reports_offset() {
        let mut reader = Reader::with_base_offset(&[1, 2, 3], 8);
        let err = reader.read_u64().unwrap_err();
        assert_eq!(
            err.to_string(),
            "decode error at byte 8: expected 8 bytes, 3 remaining"
        );
    }

    #[test]
    fn oversized_string_prefix_is_rejected_at_prefix() {
        let mut bytes = 100u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"short");
        let mut reader = Reader::with_base_offset(&bytes, 40);
        let offset = decode_err_offset(String::decode(&mut reader));
        assert_eq!(offset, 40);
    }

    #[test]
    fn invalid_utf8_points_at_bad_byte() {
        let bytes = [3, 0, 0, 0, b'o', b'k', 0xff];
        assert_eq!(decode_err_offset(from_bytes::<String>(&bytes)), 6);
    }

    #[test]
    fn huge_vec_count_fails_without_allocating() {
        let bytes = u32::MAX.to_le_bytes();
        assert_eq!(decode_err_offset(from_bytes::<Vec<u64>>(&bytes)), 4);
    }

    #[test]
    fn bool_rejects_other_bytes() {
        assert!(from_bytes::<bool>(&[1]).unwrap());
        assert_eq!(decode_err_offset(from_bytes::<bool>(&[7])), 0);
    }

    #[test]
    fn address_is_raw_32_bytes() {
        let address = Address([9; 32]);
        assert_eq!(to_bytes(&address).unwrap(), vec![9; 32]);
        assert_eq!(decode_err_offset(from_bytes::<Address>(&[9; 31])), 0);
    }
}
