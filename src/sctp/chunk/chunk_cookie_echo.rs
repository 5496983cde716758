use std::fmt;

use bytes::{Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use crate::error::Result;

/// ChunkCookieEcho represents an SCTP chunk of type COOKIE ECHO: the state
/// cookie from INIT ACK returned verbatim. The cookie is carried but not
/// validated by this engine.
#[derive(Default, Debug, Clone)]
pub(crate) struct ChunkCookieEcho {
    pub(crate) cookie: Bytes,
}

impl fmt::Display for ChunkCookieEcho {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())
    }
}

impl ChunkCookieEcho {
    pub(crate) fn header(&self) -> ChunkHeader {
        ChunkHeader {
            typ: CT_COOKIE_ECHO,
            flags: 0,
            value_length: self.value_length() as u16,
        }
    }

    pub(crate) fn unmarshal(_header: &ChunkHeader, value: &Bytes) -> Result<Self> {
        Ok(ChunkCookieEcho {
            cookie: value.clone(),
        })
    }

    pub(crate) fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(writer)?;
        writer.extend_from_slice(&self.cookie);
        Ok(writer.len())
    }

    pub(crate) fn value_length(&self) -> usize {
        self.cookie.len()
    }
}
