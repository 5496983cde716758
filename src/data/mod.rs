pub(crate) mod message_channel_open;
pub(crate) mod message_type;

use std::fmt;

use bytes::{Buf, Bytes, BytesMut};

use message_channel_open::DataChannelOpen;
use message_type::*;

use crate::error::Result;

/// A parsed DCEP (data channel establishment protocol) message, RFC 8832.
/// ACK has no body; OPEN carries the channel parameters.
#[derive(Eq, PartialEq, Clone, Debug)]
pub(crate) enum Message {
    DataChannelAck,
    DataChannelOpen(DataChannelOpen),
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message_type())
    }
}

impl Message {
    pub(crate) fn message_type(&self) -> MessageType {
        match self {
            Self::DataChannelAck => MessageType::DataChannelAck,
            Self::DataChannelOpen(_) => MessageType::DataChannelOpen,
        }
    }

    pub(crate) fn marshal(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.marshal_size());
        self.message_type().marshal_to(&mut buf);
        if let Message::DataChannelOpen(open) = self {
            open.marshal_to(&mut buf);
        }
        buf.freeze()
    }

    pub(crate) fn marshal_size(&self) -> usize {
        match self {
            Message::DataChannelAck => MESSAGE_TYPE_LEN,
            Message::DataChannelOpen(open) => MESSAGE_TYPE_LEN + open.marshal_size(),
        }
    }

    pub(crate) fn unmarshal<B: Buf>(buf: &mut B) -> Result<Self> {
        match MessageType::unmarshal(buf)? {
            MessageType::DataChannelAck => Ok(Self::DataChannelAck),
            MessageType::DataChannelOpen => {
                Ok(Self::DataChannelOpen(DataChannelOpen::unmarshal(buf)?))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_open_message_round_trip() {
        let msg = Message::DataChannelOpen(DataChannelOpen {
            channel_type: 0x80,
            priority: 256,
            reliability_parameter: 0,
            label: b"chat".to_vec(),
            protocol: vec![],
        });
        let raw = msg.marshal();
        assert_eq!(raw[0], 0x03);
        assert_eq!(raw.len(), msg.marshal_size());
        let decoded = Message::unmarshal(&mut raw.clone()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_ack_message_is_one_byte() {
        let msg = Message::DataChannelAck;
        let raw = msg.marshal();
        assert_eq!(&raw[..], &[0x02]);
        let decoded = Message::unmarshal(&mut raw.clone()).unwrap();
        assert_eq!(decoded, Message::DataChannelAck);
    }

    #[test]
    fn test_unknown_message_type() {
        let mut raw = Bytes::from_static(&[0x01, 0x00]);
        assert_eq!(
            Message::unmarshal(&mut raw).unwrap_err(),
            Error::ErrDcepInvalidMessageType(0x01)
        );
    }
}
