use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use crate::error::{Error, Result};

pub(crate) const SELECTIVE_ACK_HEADER_SIZE: usize = 12;

/// GapAckBlock reports one contiguous run of TSNs received past the
/// cumulative ack point, as offsets from it.
#[derive(Debug, Default, Copy, Clone)]
pub(crate) struct GapAckBlock {
    pub(crate) start: u16,
    pub(crate) end: u16,
}

impl fmt::Display for GapAckBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

/// ChunkSelectiveAck represents an SCTP chunk of type SACK.
///
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|   Type = 3    |Chunk  Flags   |      Chunk Length             |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                      Cumulative TSN Ack                       |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|          Advertised Receiver Window Credit (a_rwnd)           |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///| Number of Gap Ack Blocks = N  |  Number of Duplicate TSNs = X |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|  Gap Ack Block #1 Start       |   Gap Ack Block #1 End        |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                       Duplicate TSN 1..X                      |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Default, Debug, Clone)]
pub(crate) struct ChunkSelectiveAck {
    pub(crate) cumulative_tsn_ack: u32,
    pub(crate) advertised_receiver_window_credit: u32,
    pub(crate) gap_ack_blocks: Vec<GapAckBlock>,
    pub(crate) duplicate_tsn: Vec<u32>,
}

impl fmt::Display for ChunkSelectiveAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SACK cumTsnAck={} arwnd={} gaps={} dupTsn={:?}",
            self.cumulative_tsn_ack,
            self.advertised_receiver_window_credit,
            self.gap_ack_blocks.len(),
            self.duplicate_tsn
        )
    }
}

impl ChunkSelectiveAck {
    pub(crate) fn header(&self) -> ChunkHeader {
        ChunkHeader {
            typ: CT_SACK,
            flags: 0,
            value_length: self.value_length() as u16,
        }
    }

    pub(crate) fn unmarshal(header: &ChunkHeader, value: &Bytes) -> Result<Self> {
        if header.value_length() < SELECTIVE_ACK_HEADER_SIZE {
            return Err(Error::ErrSackSizeNotLargeEnoughInfo);
        }

        let reader = &mut value.clone();
        let cumulative_tsn_ack = reader.get_u32();
        let advertised_receiver_window_credit = reader.get_u32();
        let gap_ack_blocks_len = reader.get_u16() as usize;
        let duplicate_tsn_len = reader.get_u16() as usize;

        if header.value_length()
            < SELECTIVE_ACK_HEADER_SIZE + 4 * gap_ack_blocks_len + 4 * duplicate_tsn_len
        {
            return Err(Error::ErrSackSizeNotLargeEnoughInfo);
        }

        let mut gap_ack_blocks = Vec::with_capacity(gap_ack_blocks_len);
        for _ in 0..gap_ack_blocks_len {
            let start = reader.get_u16();
            let end = reader.get_u16();
            gap_ack_blocks.push(GapAckBlock { start, end });
        }
        let mut duplicate_tsn = Vec::with_capacity(duplicate_tsn_len);
        for _ in 0..duplicate_tsn_len {
            duplicate_tsn.push(reader.get_u32());
        }

        Ok(ChunkSelectiveAck {
            cumulative_tsn_ack,
            advertised_receiver_window_credit,
            gap_ack_blocks,
            duplicate_tsn,
        })
    }

    pub(crate) fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(writer)?;
        writer.put_u32(self.cumulative_tsn_ack);
        writer.put_u32(self.advertised_receiver_window_credit);
        writer.put_u16(self.gap_ack_blocks.len() as u16);
        writer.put_u16(self.duplicate_tsn.len() as u16);
        for gap in &self.gap_ack_blocks {
            writer.put_u16(gap.start);
            writer.put_u16(gap.end);
        }
        for tsn in &self.duplicate_tsn {
            writer.put_u32(*tsn);
        }
        Ok(writer.len())
    }

    pub(crate) fn value_length(&self) -> usize {
        SELECTIVE_ACK_HEADER_SIZE + 4 * self.gap_ack_blocks.len() + 4 * self.duplicate_tsn.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sack_round_trip() {
        let sack = ChunkSelectiveAck {
            cumulative_tsn_ack: 101,
            advertised_receiver_window_credit: 256 * 1024,
            gap_ack_blocks: vec![GapAckBlock { start: 2, end: 3 }],
            duplicate_tsn: vec![99],
        };
        let mut buf = BytesMut::new();
        sack.marshal_to(&mut buf).unwrap();
        let raw = buf.freeze();

        let header = ChunkHeader::unmarshal(&raw).unwrap();
        let decoded =
            ChunkSelectiveAck::unmarshal(&header, &raw.slice(CHUNK_HEADER_SIZE..)).unwrap();
        assert_eq!(decoded.cumulative_tsn_ack, 101);
        assert_eq!(decoded.gap_ack_blocks.len(), 1);
        assert_eq!(decoded.gap_ack_blocks[0].start, 2);
        assert_eq!(decoded.gap_ack_blocks[0].end, 3);
        assert_eq!(decoded.duplicate_tsn, vec![99]);
    }

    #[test]
    fn test_sack_counts_must_fit() {
        let mut buf = BytesMut::new();
        buf.put_u32(1);
        buf.put_u32(1500);
        buf.put_u16(5); // claims 5 gap blocks with no room for them
        buf.put_u16(0);
        let value = buf.freeze();
        let header = ChunkHeader {
            typ: CT_SACK,
            flags: 0,
            value_length: value.len() as u16,
        };
        assert!(ChunkSelectiveAck::unmarshal(&header, &value).is_err());
    }
}
