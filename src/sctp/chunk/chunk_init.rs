use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use crate::error::{Error, Result};
use crate::util::get_padding_size;

pub(crate) const INIT_CHUNK_MIN_LENGTH: usize = 16;
pub(crate) const PARAM_HEADER_LENGTH: usize = 4;
pub(crate) const PARAM_TYPE_STATE_COOKIE: u16 = 7;

/// ChunkInit represents an SCTP chunk of type INIT or INIT ACK.
///
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|   Type = 1    |  Chunk Flags  |      Chunk Length             |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                         Initiate Tag                          |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|           Advertised Receiver Window Credit (a_rwnd)          |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|  Number of Outbound Streams   |  Number of Inbound Streams    |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                          Initial TSN                          |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|              Optional/Variable-Length Parameters              |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///
/// Of the variable parameters only the INIT ACK STATE-COOKIE is acted on;
/// everything else a remote might send is skipped over.
#[derive(Default, Debug, Clone)]
pub(crate) struct ChunkInit {
    pub(crate) is_ack: bool,
    pub(crate) initiate_tag: u32,
    pub(crate) advertised_receiver_window_credit: u32,
    pub(crate) num_outbound_streams: u16,
    pub(crate) num_inbound_streams: u16,
    pub(crate) initial_tsn: u32,
    pub(crate) state_cookie: Option<Bytes>,
}

impl fmt::Display for ChunkInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} initiateTag={} arwnd={} out={} in={} initialTsn={}",
            self.header(),
            self.initiate_tag,
            self.advertised_receiver_window_credit,
            self.num_outbound_streams,
            self.num_inbound_streams,
            self.initial_tsn,
        )
    }
}

impl ChunkInit {
    pub(crate) fn header(&self) -> ChunkHeader {
        ChunkHeader {
            typ: if self.is_ack { CT_INIT_ACK } else { CT_INIT },
            flags: 0,
            value_length: self.value_length() as u16,
        }
    }

    pub(crate) fn unmarshal(header: &ChunkHeader, value: &Bytes) -> Result<Self> {
        // Chunk flags are reserved for INIT and ignored on receipt.
        if header.value_length() < INIT_CHUNK_MIN_LENGTH {
            return Err(Error::ErrChunkValueNotLongEnough);
        }

        let reader = &mut value.clone();
        let initiate_tag = reader.get_u32();
        let advertised_receiver_window_credit = reader.get_u32();
        let num_outbound_streams = reader.get_u16();
        let num_inbound_streams = reader.get_u16();
        let initial_tsn = reader.get_u32();

        // Walk the parameter TLVs, keeping only the state cookie. The length
        // of the last parameter excludes its padding, so the walk may step
        // past the end and simply terminates there.
        let mut state_cookie = None;
        let mut offset = INIT_CHUNK_MIN_LENGTH;
        while offset + PARAM_HEADER_LENGTH <= value.len() {
            let typ = u16::from_be_bytes([value[offset], value[offset + 1]]);
            let length = u16::from_be_bytes([value[offset + 2], value[offset + 3]]) as usize;
            if length < PARAM_HEADER_LENGTH || offset + length > value.len() {
                return Err(Error::ErrChunkValueNotLongEnough);
            }
            if typ == PARAM_TYPE_STATE_COOKIE {
                state_cookie = Some(value.slice(offset + PARAM_HEADER_LENGTH..offset + length));
            }
            offset += length + get_padding_size(length);
        }

        Ok(ChunkInit {
            is_ack: header.typ == CT_INIT_ACK,
            initiate_tag,
            advertised_receiver_window_credit,
            num_outbound_streams,
            num_inbound_streams,
            initial_tsn,
            state_cookie,
        })
    }

    pub(crate) fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(writer)?;

        writer.put_u32(self.initiate_tag);
        writer.put_u32(self.advertised_receiver_window_credit);
        writer.put_u16(self.num_outbound_streams);
        writer.put_u16(self.num_inbound_streams);
        writer.put_u32(self.initial_tsn);

        if let Some(cookie) = &self.state_cookie {
            writer.put_u16(PARAM_TYPE_STATE_COOKIE);
            writer.put_u16((PARAM_HEADER_LENGTH + cookie.len()) as u16);
            writer.extend_from_slice(cookie);
        }

        Ok(writer.len())
    }

    pub(crate) fn value_length(&self) -> usize {
        INIT_CHUNK_MIN_LENGTH
            + self
                .state_cookie
                .as_ref()
                .map_or(0, |c| PARAM_HEADER_LENGTH + c.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn round_trip(init: &ChunkInit) -> ChunkInit {
        let mut buf = BytesMut::new();
        init.marshal_to(&mut buf).unwrap();
        let raw = buf.freeze();
        let header = ChunkHeader::unmarshal(&raw).unwrap();
        ChunkInit::unmarshal(&header, &raw.slice(CHUNK_HEADER_SIZE..)).unwrap()
    }

    #[test]
    fn test_init_round_trip() {
        let init = ChunkInit {
            is_ack: false,
            initiate_tag: 0xdead_beef,
            advertised_receiver_window_credit: 1024 * 1024,
            num_outbound_streams: 1024,
            num_inbound_streams: 1024,
            initial_tsn: 100,
            state_cookie: None,
        };
        let decoded = round_trip(&init);
        assert!(!decoded.is_ack);
        assert_eq!(decoded.initiate_tag, 0xdead_beef);
        assert_eq!(decoded.initial_tsn, 100);
        assert_eq!(decoded.num_outbound_streams, 1024);
        assert!(decoded.state_cookie.is_none());
    }

    #[test]
    fn test_init_ack_carries_state_cookie() {
        let init = ChunkInit {
            is_ack: true,
            initiate_tag: 7,
            advertised_receiver_window_credit: 256 * 1024,
            num_outbound_streams: 1,
            num_inbound_streams: 1,
            initial_tsn: 1,
            state_cookie: Some(Bytes::from_static(b"opaque cookie bytes")),
        };
        let decoded = round_trip(&init);
        assert!(decoded.is_ack);
        assert_eq!(
            decoded.state_cookie.as_deref(),
            Some(&b"opaque cookie bytes"[..])
        );
    }

    #[test]
    fn test_init_skips_unknown_params() {
        // fixed part + an unknown param (type 0xc000, forward-tsn-supported)
        // followed by a state cookie
        let mut buf = BytesMut::new();
        buf.put_u32(1); // initiate tag
        buf.put_u32(1500); // a_rwnd
        buf.put_u16(2);
        buf.put_u16(2);
        buf.put_u32(42); // initial tsn
        buf.put_u16(0xc000);
        buf.put_u16(4);
        buf.put_u16(PARAM_TYPE_STATE_COOKIE);
        buf.put_u16(4 + 2);
        buf.put_slice(b"ck");
        let value = buf.freeze();
        let header = ChunkHeader {
            typ: CT_INIT,
            flags: 0,
            value_length: value.len() as u16,
        };
        let decoded = ChunkInit::unmarshal(&header, &value).unwrap();
        assert_eq!(decoded.initial_tsn, 42);
        assert_eq!(decoded.state_cookie.as_deref(), Some(&b"ck"[..]));
    }

    #[test]
    fn test_init_too_short() {
        let header = ChunkHeader {
            typ: CT_INIT,
            flags: 0,
            value_length: 4,
        };
        let value = Bytes::from_static(&[0, 0, 0, 1]);
        assert!(ChunkInit::unmarshal(&header, &value).is_err());
    }
}
