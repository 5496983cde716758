use std::fmt;

use bytes::{Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use crate::error::Result;

/// ChunkCookieAck represents an SCTP chunk of type COOKIE ACK. It has no
/// value.
#[derive(Default, Debug, Clone)]
pub(crate) struct ChunkCookieAck;

impl fmt::Display for ChunkCookieAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())
    }
}

impl ChunkCookieAck {
    pub(crate) fn header(&self) -> ChunkHeader {
        ChunkHeader {
            typ: CT_COOKIE_ACK,
            flags: 0,
            value_length: 0,
        }
    }

    pub(crate) fn unmarshal(_header: &ChunkHeader, _value: &Bytes) -> Result<Self> {
        Ok(ChunkCookieAck)
    }

    pub(crate) fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(writer)
    }

    pub(crate) fn value_length(&self) -> usize {
        0
    }
}
