use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::chunk_type::ChunkType;
use crate::error::{Error, Result};

pub(crate) const CHUNK_HEADER_SIZE: usize = 4;

/// ChunkHeader represents an SCTP chunk header, RFC 4960 section 3.2.
///
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|   Chunk Type  | Chunk  Flags  |        Chunk Length           |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                          Chunk Value                          |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, Clone)]
pub(crate) struct ChunkHeader {
    pub(crate) typ: ChunkType,
    pub(crate) flags: u8,
    pub(crate) value_length: u16,
}

impl fmt::Display for ChunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.typ)
    }
}

impl ChunkHeader {
    pub(crate) fn unmarshal(raw: &Bytes) -> Result<Self> {
        if raw.len() < CHUNK_HEADER_SIZE {
            return Err(Error::ErrChunkHeaderTooSmall);
        }

        let reader = &mut raw.clone();
        let typ = ChunkType(reader.get_u8());
        let flags = reader.get_u8();
        let length = reader.get_u16();

        // Length includes the chunk header but not the terminating padding.
        if (length as usize) < CHUNK_HEADER_SIZE || (length as usize) > raw.len() {
            return Err(Error::ErrChunkHeaderInvalidLength);
        }

        Ok(ChunkHeader {
            typ,
            flags,
            value_length: length - CHUNK_HEADER_SIZE as u16,
        })
    }

    pub(crate) fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        writer.put_u8(self.typ.0);
        writer.put_u8(self.flags);
        writer.put_u16(self.value_length + CHUNK_HEADER_SIZE as u16);
        Ok(writer.len())
    }

    pub(crate) fn value_length(&self) -> usize {
        self.value_length as usize
    }
}

#[cfg(test)]
mod test {
    use super::super::chunk_type::CT_INIT;
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let header = ChunkHeader {
            typ: CT_INIT,
            flags: 0,
            value_length: 16,
        };
        let mut buf = BytesMut::new();
        header.marshal_to(&mut buf).unwrap();
        buf.extend_from_slice(&[0u8; 16]);

        let decoded = ChunkHeader::unmarshal(&buf.freeze()).unwrap();
        assert_eq!(decoded.typ, CT_INIT);
        assert_eq!(decoded.flags, 0);
        assert_eq!(decoded.value_length(), 16);
    }

    #[test]
    fn test_header_rejects_bad_lengths() {
        assert!(ChunkHeader::unmarshal(&Bytes::from_static(&[0x01])).is_err());
        // self-reported length shorter than the header itself
        let raw = Bytes::from_static(&[0x01, 0x00, 0x00, 0x02]);
        assert!(ChunkHeader::unmarshal(&raw).is_err());
        // self-reported length longer than the buffer
        let raw = Bytes::from_static(&[0x01, 0x00, 0x00, 0x20, 0x00, 0x00]);
        assert!(ChunkHeader::unmarshal(&raw).is_err());
    }
}
