use std::fmt;

use bytes::{Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use crate::error::Result;

/// ChunkAbort represents an SCTP chunk of type ABORT. Error causes are kept
/// raw; the peer is torn down either way.
#[derive(Default, Debug, Clone)]
pub(crate) struct ChunkAbort {
    pub(crate) error_causes: Bytes,
}

impl fmt::Display for ChunkAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} causes={}B", self.header(), self.error_causes.len())
    }
}

impl ChunkAbort {
    pub(crate) fn header(&self) -> ChunkHeader {
        ChunkHeader {
            typ: CT_ABORT,
            flags: 0,
            value_length: self.value_length() as u16,
        }
    }

    pub(crate) fn unmarshal(_header: &ChunkHeader, value: &Bytes) -> Result<Self> {
        Ok(ChunkAbort {
            error_causes: value.clone(),
        })
    }

    pub(crate) fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(writer)?;
        writer.extend_from_slice(&self.error_causes);
        Ok(writer.len())
    }

    pub(crate) fn value_length(&self) -> usize {
        self.error_causes.len()
    }
}
