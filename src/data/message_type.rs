use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Error, Result};

pub(crate) const MESSAGE_TYPE_LEN: usize = 1;

const MESSAGE_TYPE_ACK: u8 = 0x02;
const MESSAGE_TYPE_OPEN: u8 = 0x03;

/// The first byte in a DCEP message indicating its type, RFC 8832.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub(crate) enum MessageType {
    DataChannelAck,
    DataChannelOpen,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageType::DataChannelAck => "DATA_CHANNEL_ACK",
            MessageType::DataChannelOpen => "DATA_CHANNEL_OPEN",
        };
        write!(f, "{s}")
    }
}

impl MessageType {
    pub(crate) fn marshal_to(&self, buf: &mut BytesMut) -> usize {
        let byte = match self {
            MessageType::DataChannelAck => MESSAGE_TYPE_ACK,
            MessageType::DataChannelOpen => MESSAGE_TYPE_OPEN,
        };
        buf.put_u8(byte);
        MESSAGE_TYPE_LEN
    }

    pub(crate) fn unmarshal<B: Buf>(buf: &mut B) -> Result<Self> {
        if buf.remaining() < MESSAGE_TYPE_LEN {
            return Err(Error::ErrDcepTooShort);
        }
        let b0 = buf.get_u8();
        match b0 {
            MESSAGE_TYPE_ACK => Ok(MessageType::DataChannelAck),
            MESSAGE_TYPE_OPEN => Ok(MessageType::DataChannelOpen),
            _ => Err(Error::ErrDcepInvalidMessageType(b0)),
        }
    }
}
