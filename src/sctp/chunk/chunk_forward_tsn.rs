use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use crate::error::{Error, Result};

pub(crate) const NEW_CUMULATIVE_TSN_LENGTH: usize = 4;

/// ChunkForwardTsn (RFC 3758) tells the receiver to move its cumulative
/// received TSN point forward past chunks that will never be retransmitted.
/// Since the engine only ever sends unordered unreliable data, no per-stream
/// entries are carried.
///
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|   Type = 192  |  Flags = 0x00 |        Length = Variable      |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                      New Cumulative TSN                       |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Default, Debug, Clone)]
pub(crate) struct ChunkForwardTsn {
    pub(crate) new_cumulative_tsn: u32,
}

impl fmt::Display for ChunkForwardTsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} newCumTsn={}", self.header(), self.new_cumulative_tsn)
    }
}

impl ChunkForwardTsn {
    pub(crate) fn header(&self) -> ChunkHeader {
        ChunkHeader {
            typ: CT_FORWARD_TSN,
            flags: 0,
            value_length: NEW_CUMULATIVE_TSN_LENGTH as u16,
        }
    }

    pub(crate) fn unmarshal(header: &ChunkHeader, value: &Bytes) -> Result<Self> {
        if header.value_length() < NEW_CUMULATIVE_TSN_LENGTH {
            return Err(Error::ErrChunkTooShort);
        }
        let reader = &mut value.clone();
        Ok(ChunkForwardTsn {
            new_cumulative_tsn: reader.get_u32(),
        })
    }

    pub(crate) fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(writer)?;
        writer.put_u32(self.new_cumulative_tsn);
        Ok(writer.len())
    }

    pub(crate) fn value_length(&self) -> usize {
        NEW_CUMULATIVE_TSN_LENGTH
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_forward_tsn_round_trip() {
        let fwd = ChunkForwardTsn {
            new_cumulative_tsn: 33,
        };
        let mut buf = BytesMut::new();
        fwd.marshal_to(&mut buf).unwrap();
        let raw = buf.freeze();

        let header = ChunkHeader::unmarshal(&raw).unwrap();
        let decoded = ChunkForwardTsn::unmarshal(&header, &raw.slice(CHUNK_HEADER_SIZE..)).unwrap();
        assert_eq!(decoded.new_cumulative_tsn, 33);
    }
}
