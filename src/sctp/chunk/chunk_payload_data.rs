use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use crate::error::{Error, Result};

pub(crate) const PAYLOAD_DATA_ENDING_FRAGMENT_BITMASK: u8 = 1;
pub(crate) const PAYLOAD_DATA_BEGINNING_FRAGMENT_BITMASK: u8 = 2;
pub(crate) const PAYLOAD_DATA_UNORDERED_BITMASK: u8 = 4;
pub(crate) const PAYLOAD_DATA_HEADER_SIZE: usize = 12;

/// PayloadProtocolIdentifier selects the WebRTC data channel payload kind,
/// <https://www.iana.org/assignments/sctp-parameters/sctp-parameters.xhtml#sctp-parameters-25>
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum PayloadProtocolIdentifier {
    Dcep = 50,
    String = 51,
    Binary = 53,
    #[default]
    Unknown = 0,
}

impl fmt::Display for PayloadProtocolIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            PayloadProtocolIdentifier::Dcep => "WebRTC DCEP",
            PayloadProtocolIdentifier::String => "WebRTC String",
            PayloadProtocolIdentifier::Binary => "WebRTC Binary",
            PayloadProtocolIdentifier::Unknown => "Unknown Payload Protocol Identifier",
        };
        write!(f, "{s}")
    }
}

impl From<u32> for PayloadProtocolIdentifier {
    fn from(v: u32) -> PayloadProtocolIdentifier {
        match v {
            50 => PayloadProtocolIdentifier::Dcep,
            51 => PayloadProtocolIdentifier::String,
            53 => PayloadProtocolIdentifier::Binary,
            _ => PayloadProtocolIdentifier::Unknown,
        }
    }
}

/// ChunkPayloadData represents an SCTP chunk of type DATA.
///
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|   Type = 0    | Reserved|U|B|E|    Length                     |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                              TSN                              |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|      Stream Identifier S      |   Stream Sequence Number n    |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                  Payload Protocol Identifier                  |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                 User Data (seq n of Stream S)                 |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///
/// The engine only emits unfragmented unordered chunks (U, B and E all set)
/// and never retransmits.
#[derive(Default, Debug, Clone)]
pub(crate) struct ChunkPayloadData {
    pub(crate) unordered: bool,
    pub(crate) beginning_fragment: bool,
    pub(crate) ending_fragment: bool,

    pub(crate) tsn: u32,
    pub(crate) stream_identifier: u16,
    pub(crate) stream_sequence_number: u16,
    pub(crate) payload_type: PayloadProtocolIdentifier,
    pub(crate) user_data: Bytes,
}

impl fmt::Display for ChunkPayloadData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tsn={} ppi={}", self.header(), self.tsn, self.payload_type)
    }
}

impl ChunkPayloadData {
    /// Outbound chunk carrying one complete message, unordered, no
    /// reliability.
    pub(crate) fn complete_unreliable(
        tsn: u32,
        stream_identifier: u16,
        payload_type: PayloadProtocolIdentifier,
        user_data: Bytes,
    ) -> Self {
        ChunkPayloadData {
            unordered: true,
            beginning_fragment: true,
            ending_fragment: true,
            tsn,
            stream_identifier,
            stream_sequence_number: 0,
            payload_type,
            user_data,
        }
    }

    pub(crate) fn header(&self) -> ChunkHeader {
        let mut flags = 0u8;
        if self.ending_fragment {
            flags |= PAYLOAD_DATA_ENDING_FRAGMENT_BITMASK;
        }
        if self.beginning_fragment {
            flags |= PAYLOAD_DATA_BEGINNING_FRAGMENT_BITMASK;
        }
        if self.unordered {
            flags |= PAYLOAD_DATA_UNORDERED_BITMASK;
        }
        ChunkHeader {
            typ: CT_PAYLOAD_DATA,
            flags,
            value_length: self.value_length() as u16,
        }
    }

    pub(crate) fn unmarshal(header: &ChunkHeader, value: &Bytes) -> Result<Self> {
        if header.value_length() < PAYLOAD_DATA_HEADER_SIZE {
            return Err(Error::ErrChunkTooShort);
        }

        let reader = &mut value.clone();
        let tsn = reader.get_u32();
        let stream_identifier = reader.get_u16();
        let stream_sequence_number = reader.get_u16();
        let payload_type: PayloadProtocolIdentifier = reader.get_u32().into();
        let user_data = value.slice(PAYLOAD_DATA_HEADER_SIZE..);

        Ok(ChunkPayloadData {
            unordered: header.flags & PAYLOAD_DATA_UNORDERED_BITMASK != 0,
            beginning_fragment: header.flags & PAYLOAD_DATA_BEGINNING_FRAGMENT_BITMASK != 0,
            ending_fragment: header.flags & PAYLOAD_DATA_ENDING_FRAGMENT_BITMASK != 0,
            tsn,
            stream_identifier,
            stream_sequence_number,
            payload_type,
            user_data,
        })
    }

    pub(crate) fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(writer)?;
        writer.put_u32(self.tsn);
        writer.put_u16(self.stream_identifier);
        writer.put_u16(self.stream_sequence_number);
        writer.put_u32(self.payload_type as u32);
        writer.extend_from_slice(&self.user_data);
        Ok(writer.len())
    }

    pub(crate) fn value_length(&self) -> usize {
        PAYLOAD_DATA_HEADER_SIZE + self.user_data.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_payload_data_round_trip() {
        let chunk = ChunkPayloadData::complete_unreliable(
            101,
            0,
            PayloadProtocolIdentifier::String,
            Bytes::from_static(b"hello"),
        );
        let mut buf = BytesMut::new();
        chunk.marshal_to(&mut buf).unwrap();
        let raw = buf.freeze();

        let header = ChunkHeader::unmarshal(&raw).unwrap();
        assert_eq!(header.flags, 0x07); // U|B|E
        let decoded =
            ChunkPayloadData::unmarshal(&header, &raw.slice(CHUNK_HEADER_SIZE..)).unwrap();
        assert!(decoded.unordered && decoded.beginning_fragment && decoded.ending_fragment);
        assert_eq!(decoded.tsn, 101);
        assert_eq!(decoded.payload_type, PayloadProtocolIdentifier::String);
        assert_eq!(&decoded.user_data[..], b"hello");
    }

    #[test]
    fn test_unknown_ppid_is_preserved_as_unknown() {
        let mut buf = BytesMut::new();
        buf.put_u32(1);
        buf.put_u16(0);
        buf.put_u16(0);
        buf.put_u32(56); // WebRTC String (Empty), not handled
        let value = buf.freeze();
        let header = ChunkHeader {
            typ: CT_PAYLOAD_DATA,
            flags: 0x07,
            value_length: value.len() as u16,
        };
        let decoded = ChunkPayloadData::unmarshal(&header, &value).unwrap();
        assert_eq!(decoded.payload_type, PayloadProtocolIdentifier::Unknown);
        assert!(decoded.user_data.is_empty());
    }

    #[test]
    fn test_payload_data_too_short() {
        let header = ChunkHeader {
            typ: CT_PAYLOAD_DATA,
            flags: 0,
            value_length: 4,
        };
        let value = Bytes::from_static(&[0, 0, 0, 1]);
        assert!(ChunkPayloadData::unmarshal(&header, &value).is_err());
    }
}
