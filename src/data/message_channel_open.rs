use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Error, Result};

const CHANNEL_OPEN_HEADER_LEN: usize = 11;

/// The data-part of a DCEP OPEN message without the message type.
///
/// The channel type byte is carried through untouched: whatever reliability
/// the remote asked for, replies go out on the engine's single unordered
/// unreliable mode.
///
/// # Memory layout
///
/// ```plain
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | (Message Type)|  Channel Type |            Priority           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                    Reliability Parameter                      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |         Label Length          |       Protocol Length         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             Label                             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            Protocol                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Eq, PartialEq, Clone, Debug)]
pub(crate) struct DataChannelOpen {
    pub(crate) channel_type: u8,
    pub(crate) priority: u16,
    pub(crate) reliability_parameter: u32,
    pub(crate) label: Vec<u8>,
    pub(crate) protocol: Vec<u8>,
}

impl DataChannelOpen {
    pub(crate) fn marshal_size(&self) -> usize {
        CHANNEL_OPEN_HEADER_LEN + self.label.len() + self.protocol.len()
    }

    pub(crate) fn marshal_to(&self, buf: &mut BytesMut) -> usize {
        buf.put_u8(self.channel_type);
        buf.put_u16(self.priority);
        buf.put_u32(self.reliability_parameter);
        buf.put_u16(self.label.len() as u16);
        buf.put_u16(self.protocol.len() as u16);
        buf.put_slice(self.label.as_slice());
        buf.put_slice(self.protocol.as_slice());
        self.marshal_size()
    }

    pub(crate) fn unmarshal<B: Buf>(buf: &mut B) -> Result<Self> {
        if buf.remaining() < CHANNEL_OPEN_HEADER_LEN {
            return Err(Error::ErrDcepTooShort);
        }

        let channel_type = buf.get_u8();
        let priority = buf.get_u16();
        let reliability_parameter = buf.get_u32();
        let label_len = buf.get_u16() as usize;
        let protocol_len = buf.get_u16() as usize;

        if buf.remaining() < label_len + protocol_len {
            return Err(Error::ErrDcepTooShort);
        }

        let mut label = vec![0; label_len];
        let mut protocol = vec![0; protocol_len];
        buf.copy_to_slice(&mut label[..]);
        buf.copy_to_slice(&mut protocol[..]);

        Ok(Self {
            channel_type,
            priority,
            reliability_parameter,
            label,
            protocol,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    static MARSHALED_BYTES: [u8; 24] = [
        0x00, // channel type
        0x0f, 0x35, // priority
        0x00, 0xff, 0x0f, 0x35, // reliability parameter
        0x00, 0x05, // label length
        0x00, 0x08, // protocol length
        0x6c, 0x61, 0x62, 0x65, 0x6c, // label
        0x70, 0x72, 0x6f, 0x74, 0x6f, 0x63, 0x6f, 0x6c, // protocol
    ];

    #[test]
    fn test_channel_open_unmarshal_success() {
        let mut bytes = Bytes::from_static(&MARSHALED_BYTES);
        let channel_open = DataChannelOpen::unmarshal(&mut bytes).unwrap();

        assert_eq!(channel_open.channel_type, 0x00);
        assert_eq!(channel_open.priority, 3893);
        assert_eq!(channel_open.reliability_parameter, 16715573);
        assert_eq!(channel_open.label, b"label");
        assert_eq!(channel_open.protocol, b"protocol");
    }

    #[test]
    fn test_channel_open_unmarshal_length_mismatch() {
        let mut bytes = Bytes::from_static(&[
            0x01, // channel type
            0x00, 0x00, // priority
            0x00, 0x00, 0x00, 0x00, // reliability parameter
            0x00, 0x05, // label length
            0x00, 0x08, // protocol length
        ]);
        assert_eq!(
            DataChannelOpen::unmarshal(&mut bytes).unwrap_err(),
            Error::ErrDcepTooShort
        );
    }

    #[test]
    fn test_channel_open_marshal() {
        let channel_open = DataChannelOpen {
            channel_type: 0x00,
            priority: 3893,
            reliability_parameter: 16715573,
            label: b"label".to_vec(),
            protocol: b"protocol".to_vec(),
        };

        let mut buf = BytesMut::new();
        let bytes_written = channel_open.marshal_to(&mut buf);
        assert_eq!(bytes_written, channel_open.marshal_size());
        assert_eq!(&buf.freeze()[..], &MARSHALED_BYTES);
    }
}
