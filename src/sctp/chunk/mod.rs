pub(crate) mod chunk_abort;
pub(crate) mod chunk_cookie_ack;
pub(crate) mod chunk_cookie_echo;
pub(crate) mod chunk_forward_tsn;
pub(crate) mod chunk_header;
pub(crate) mod chunk_heartbeat;
pub(crate) mod chunk_init;
pub(crate) mod chunk_payload_data;
pub(crate) mod chunk_selective_ack;
pub(crate) mod chunk_shutdown;
pub(crate) mod chunk_type;

use std::fmt;

use bytes::{Bytes, BytesMut};

use chunk_abort::ChunkAbort;
use chunk_cookie_ack::ChunkCookieAck;
use chunk_cookie_echo::ChunkCookieEcho;
use chunk_forward_tsn::ChunkForwardTsn;
use chunk_header::ChunkHeader;
use chunk_heartbeat::ChunkHeartbeat;
use chunk_init::ChunkInit;
use chunk_payload_data::ChunkPayloadData;
use chunk_selective_ack::ChunkSelectiveAck;
use chunk_shutdown::ChunkShutdown;
use chunk_type::*;

use crate::error::Result;

/// Chunk is one parsed SCTP chunk, dispatched by type tag. Chunk types the
/// engine does not implement are skipped during packet parsing rather than
/// represented here.
#[derive(Debug, Clone)]
pub(crate) enum Chunk {
    PayloadData(ChunkPayloadData),
    Init(ChunkInit),
    SelectiveAck(ChunkSelectiveAck),
    Heartbeat(ChunkHeartbeat),
    Abort(ChunkAbort),
    Shutdown(ChunkShutdown),
    CookieEcho(ChunkCookieEcho),
    CookieAck(ChunkCookieAck),
    ForwardTsn(ChunkForwardTsn),
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chunk::PayloadData(c) => c.fmt(f),
            Chunk::Init(c) => c.fmt(f),
            Chunk::SelectiveAck(c) => c.fmt(f),
            Chunk::Heartbeat(c) => c.fmt(f),
            Chunk::Abort(c) => c.fmt(f),
            Chunk::Shutdown(c) => c.fmt(f),
            Chunk::CookieEcho(c) => c.fmt(f),
            Chunk::CookieAck(c) => c.fmt(f),
            Chunk::ForwardTsn(c) => c.fmt(f),
        }
    }
}

impl Chunk {
    /// Parses the chunk whose header has already been read. `value` is
    /// exactly the chunk value, without header or padding. Returns `None`
    /// for chunk types outside the implemented subset.
    pub(crate) fn unmarshal(header: &ChunkHeader, value: &Bytes) -> Result<Option<Self>> {
        let chunk = match header.typ {
            CT_PAYLOAD_DATA => Chunk::PayloadData(ChunkPayloadData::unmarshal(header, value)?),
            CT_INIT | CT_INIT_ACK => Chunk::Init(ChunkInit::unmarshal(header, value)?),
            CT_SACK => Chunk::SelectiveAck(ChunkSelectiveAck::unmarshal(header, value)?),
            CT_HEARTBEAT | CT_HEARTBEAT_ACK => {
                Chunk::Heartbeat(ChunkHeartbeat::unmarshal(header, value)?)
            }
            CT_ABORT => Chunk::Abort(ChunkAbort::unmarshal(header, value)?),
            CT_SHUTDOWN => Chunk::Shutdown(ChunkShutdown::unmarshal(header, value)?),
            CT_COOKIE_ECHO => Chunk::CookieEcho(ChunkCookieEcho::unmarshal(header, value)?),
            CT_COOKIE_ACK => Chunk::CookieAck(ChunkCookieAck::unmarshal(header, value)?),
            CT_FORWARD_TSN => Chunk::ForwardTsn(ChunkForwardTsn::unmarshal(header, value)?),
            _ => return Ok(None),
        };
        Ok(Some(chunk))
    }

    pub(crate) fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        match self {
            Chunk::PayloadData(c) => c.marshal_to(writer),
            Chunk::Init(c) => c.marshal_to(writer),
            Chunk::SelectiveAck(c) => c.marshal_to(writer),
            Chunk::Heartbeat(c) => c.marshal_to(writer),
            Chunk::Abort(c) => c.marshal_to(writer),
            Chunk::Shutdown(c) => c.marshal_to(writer),
            Chunk::CookieEcho(c) => c.marshal_to(writer),
            Chunk::CookieAck(c) => c.marshal_to(writer),
            Chunk::ForwardTsn(c) => c.marshal_to(writer),
        }
    }

    pub(crate) fn value_length(&self) -> usize {
        match self {
            Chunk::PayloadData(c) => c.value_length(),
            Chunk::Init(c) => c.value_length(),
            Chunk::SelectiveAck(c) => c.value_length(),
            Chunk::Heartbeat(c) => c.value_length(),
            Chunk::Abort(c) => c.value_length(),
            Chunk::Shutdown(c) => c.value_length(),
            Chunk::CookieEcho(c) => c.value_length(),
            Chunk::CookieAck(c) => c.value_length(),
            Chunk::ForwardTsn(c) => c.value_length(),
        }
    }
}
