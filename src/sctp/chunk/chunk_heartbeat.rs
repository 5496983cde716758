use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use crate::error::{Error, Result};

pub(crate) const PARAM_TYPE_HEARTBEAT_INFO: u16 = 1;
const HEARTBEAT_PARAM_HEADER_LENGTH: usize = 4;

/// ChunkHeartbeat represents an SCTP chunk of type HEARTBEAT or
/// HEARTBEAT ACK. Both carry a single HEARTBEAT-INFO parameter whose value
/// is opaque to the receiver and echoed back verbatim.
///
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|   Type = 4    | Chunk  Flags  |      Heartbeat Length         |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|          Heartbeat Information TLV (Variable-Length)          |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Default, Debug, Clone)]
pub(crate) struct ChunkHeartbeat {
    pub(crate) is_ack: bool,
    pub(crate) heartbeat_info: Bytes,
}

impl fmt::Display for ChunkHeartbeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} info={}B", self.header(), self.heartbeat_info.len())
    }
}

impl ChunkHeartbeat {
    pub(crate) fn header(&self) -> ChunkHeader {
        ChunkHeader {
            typ: if self.is_ack { CT_HEARTBEAT_ACK } else { CT_HEARTBEAT },
            flags: 0,
            value_length: self.value_length() as u16,
        }
    }

    pub(crate) fn unmarshal(header: &ChunkHeader, value: &Bytes) -> Result<Self> {
        if header.value_length() < HEARTBEAT_PARAM_HEADER_LENGTH {
            return Err(Error::ErrHeartbeatNotLongEnoughInfo);
        }

        let reader = &mut value.clone();
        let param_type = reader.get_u16();
        let param_length = reader.get_u16() as usize;
        if param_type != PARAM_TYPE_HEARTBEAT_INFO {
            return Err(Error::ErrHeartbeatParam);
        }
        if param_length < HEARTBEAT_PARAM_HEADER_LENGTH || param_length > value.len() {
            return Err(Error::ErrHeartbeatNotLongEnoughInfo);
        }

        Ok(ChunkHeartbeat {
            is_ack: header.typ == CT_HEARTBEAT_ACK,
            heartbeat_info: value.slice(HEARTBEAT_PARAM_HEADER_LENGTH..param_length),
        })
    }

    pub(crate) fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(writer)?;
        writer.put_u16(PARAM_TYPE_HEARTBEAT_INFO);
        writer.put_u16((HEARTBEAT_PARAM_HEADER_LENGTH + self.heartbeat_info.len()) as u16);
        writer.extend_from_slice(&self.heartbeat_info);
        Ok(writer.len())
    }

    pub(crate) fn value_length(&self) -> usize {
        HEARTBEAT_PARAM_HEADER_LENGTH + self.heartbeat_info.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_heartbeat_round_trip() {
        let hb = ChunkHeartbeat {
            is_ack: false,
            heartbeat_info: Bytes::copy_from_slice(&42.5f64.to_be_bytes()),
        };
        let mut buf = BytesMut::new();
        hb.marshal_to(&mut buf).unwrap();
        let raw = buf.freeze();

        let header = ChunkHeader::unmarshal(&raw).unwrap();
        assert_eq!(header.typ, CT_HEARTBEAT);
        let decoded = ChunkHeartbeat::unmarshal(&header, &raw.slice(CHUNK_HEADER_SIZE..)).unwrap();
        assert!(!decoded.is_ack);
        assert_eq!(decoded.heartbeat_info.len(), 8);
        assert_eq!(&decoded.heartbeat_info[..], &42.5f64.to_be_bytes());
    }

    #[test]
    fn test_heartbeat_ack_echoes_info() {
        let hb = ChunkHeartbeat {
            is_ack: true,
            heartbeat_info: Bytes::from_static(b"opaque"),
        };
        let mut buf = BytesMut::new();
        hb.marshal_to(&mut buf).unwrap();
        let raw = buf.freeze();

        let header = ChunkHeader::unmarshal(&raw).unwrap();
        assert_eq!(header.typ, CT_HEARTBEAT_ACK);
        let decoded = ChunkHeartbeat::unmarshal(&header, &raw.slice(CHUNK_HEADER_SIZE..)).unwrap();
        assert!(decoded.is_ack);
        assert_eq!(&decoded.heartbeat_info[..], b"opaque");
    }

    #[test]
    fn test_heartbeat_requires_info_param() {
        let header = ChunkHeader {
            typ: CT_HEARTBEAT,
            flags: 0,
            value_length: 6,
        };
        // param type 9 is not HEARTBEAT-INFO
        let value = Bytes::from_static(&[0x00, 0x09, 0x00, 0x06, 0xaa, 0xbb]);
        assert_eq!(
            ChunkHeartbeat::unmarshal(&header, &value).unwrap_err(),
            Error::ErrHeartbeatParam
        );
    }
}
