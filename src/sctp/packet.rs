use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::chunk::chunk_header::*;
use super::chunk::Chunk;
use crate::error::{Error, Result};
use crate::util::*;

pub(crate) const PACKET_HEADER_SIZE: usize = 12;

/// At most this many chunks are taken from one packet; anything past that
/// is ignored.
pub(crate) const MAX_CHUNKS_PER_PACKET: usize = 8;

/// Packet represents an SCTP packet: a common header followed by chunks.
///
///SCTP Common Header Format
///
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|       Source Port Number      |    Destination Port Number    |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                      Verification Tag                         |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                           Checksum                            |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///
/// ## Specifications
///
/// * [RFC 4960 §3]
///
/// [RFC 4960 §3]: https://tools.ietf.org/html/rfc4960#section-3
#[derive(Default, Debug, Clone)]
pub(crate) struct Packet {
    pub(crate) source_port: u16,
    pub(crate) destination_port: u16,
    pub(crate) verification_tag: u32,
    pub(crate) chunks: Vec<Chunk>,
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut res = format!(
            "Packet: src={} dst={} tag={}",
            self.source_port, self.destination_port, self.verification_tag,
        );
        for chunk in &self.chunks {
            res += format!("\n - {chunk}").as_str();
        }
        write!(f, "{res}")
    }
}

impl Packet {
    pub(crate) fn unmarshal(raw: &Bytes) -> Result<Self> {
        if raw.len() < PACKET_HEADER_SIZE {
            return Err(Error::ErrPacketRawTooSmall);
        }

        let reader = &mut raw.clone();
        let source_port = reader.get_u16();
        let destination_port = reader.get_u16();
        let verification_tag = reader.get_u32();

        // The checksum goes over the wire little-endian so a straight
        // big-endian read would flip it.
        let their_checksum = reader.get_u32_le();
        let our_checksum = generate_packet_checksum(raw);
        if their_checksum != our_checksum {
            return Err(Error::ErrChecksumMismatch);
        }

        let mut chunks = vec![];
        let mut offset = PACKET_HEADER_SIZE;
        loop {
            // Exact match, no more chunks
            if offset == raw.len() || chunks.len() == MAX_CHUNKS_PER_PACKET {
                break;
            } else if offset + CHUNK_HEADER_SIZE > raw.len() {
                return Err(Error::ErrParseSctpChunkNotEnoughData);
            }

            let header = ChunkHeader::unmarshal(&raw.slice(offset..))?;
            let value =
                raw.slice(offset + CHUNK_HEADER_SIZE..offset + CHUNK_HEADER_SIZE + header.value_length());
            if let Some(chunk) = Chunk::unmarshal(&header, &value)? {
                chunks.push(chunk);
            }

            let chunk_value_padding = get_padding_size(header.value_length());
            offset += CHUNK_HEADER_SIZE + header.value_length() + chunk_value_padding;
        }

        Ok(Packet {
            source_port,
            destination_port,
            verification_tag,
            chunks,
        })
    }

    pub(crate) fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        // Populate static headers
        // 8-12 is the checksum, written once the packet is complete
        writer.put_u16(self.source_port);
        writer.put_u16(self.destination_port);
        writer.put_u32(self.verification_tag);

        let checksum_pos = writer.len();
        writer.extend_from_slice(&[0, 0, 0, 0]);

        // Populate chunks
        for c in &self.chunks {
            c.marshal_to(writer)?;

            let padding_needed = get_padding_size(writer.len());
            if padding_needed != 0 {
                writer.extend_from_slice(&[0u8; PADDING_MULTIPLE][..padding_needed]);
            }
        }

        let mut digest = ISCSI_CRC.digest();
        digest.update(writer);
        let checksum = digest.finalize();

        // The checksum is already big-endian; writing it little-endian
        // stops it from being flipped.
        let checksum_place = &mut writer[checksum_pos..checksum_pos + 4];
        checksum_place.copy_from_slice(&checksum.to_le_bytes());

        Ok(writer.len())
    }

    pub(crate) fn marshal(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(PACKET_HEADER_SIZE);
        self.marshal_to(&mut buf)?;
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod test {
    use super::super::chunk::chunk_init::ChunkInit;
    use super::super::chunk::chunk_payload_data::{
        ChunkPayloadData, PayloadProtocolIdentifier,
    };
    use super::*;

    #[test]
    fn test_packet_unmarshal() -> Result<()> {
        let result = Packet::unmarshal(&Bytes::new());
        assert!(
            result.is_err(),
            "Unmarshal should fail when a packet is too small to be SCTP"
        );

        let header_only = Bytes::from_static(&[
            0x13, 0x88, 0x13, 0x88, 0x00, 0x00, 0x00, 0x00, 0x06, 0xa9, 0x00, 0xe1,
        ]);
        let pkt = Packet::unmarshal(&header_only)?;
        assert_eq!(pkt.source_port, 5000);
        assert_eq!(pkt.destination_port, 5000);
        assert_eq!(pkt.verification_tag, 0);
        assert!(pkt.chunks.is_empty());

        Ok(())
    }

    #[test]
    fn test_packet_checksum_is_verified() {
        let mut corrupted = vec![
            0x13, 0x88, 0x13, 0x88, 0x00, 0x00, 0x00, 0x00, 0x06, 0xa9, 0x00, 0xe1,
        ];
        corrupted[8] ^= 0xff;
        assert_eq!(
            Packet::unmarshal(&Bytes::from(corrupted)).unwrap_err(),
            Error::ErrChecksumMismatch
        );
    }

    #[test]
    fn test_packet_marshal_round_trip() -> Result<()> {
        let header_only = Bytes::from_static(&[
            0x13, 0x88, 0x13, 0x88, 0x00, 0x00, 0x00, 0x00, 0x06, 0xa9, 0x00, 0xe1,
        ]);
        let pkt = Packet::unmarshal(&header_only)?;
        let marshaled = pkt.marshal()?;
        assert_eq!(header_only, marshaled);
        Ok(())
    }

    #[test]
    fn test_packet_with_chunks_round_trip() -> Result<()> {
        let packet = Packet {
            source_port: 5000,
            destination_port: 5000,
            verification_tag: 0xdead_beef,
            chunks: vec![
                Chunk::Init(ChunkInit {
                    is_ack: false,
                    initiate_tag: 1,
                    advertised_receiver_window_credit: 1500,
                    num_outbound_streams: 1,
                    num_inbound_streams: 1,
                    initial_tsn: 100,
                    state_cookie: None,
                }),
            ],
        };
        let raw = packet.marshal()?;
        let decoded = Packet::unmarshal(&raw)?;
        assert_eq!(decoded.verification_tag, 0xdead_beef);
        assert_eq!(decoded.chunks.len(), 1);
        Ok(())
    }

    #[test]
    fn test_packet_payload_padding_round_trip() -> Result<()> {
        // 5-byte payload forces 3 bytes of chunk padding
        let packet = Packet {
            source_port: 1,
            destination_port: 2,
            verification_tag: 3,
            chunks: vec![Chunk::PayloadData(ChunkPayloadData::complete_unreliable(
                7,
                0,
                PayloadProtocolIdentifier::String,
                Bytes::from_static(b"hello"),
            ))],
        };
        let raw = packet.marshal()?;
        assert_eq!(raw.len() % 4, 0);
        let decoded = Packet::unmarshal(&raw)?;
        match &decoded.chunks[0] {
            Chunk::PayloadData(data) => assert_eq!(&data.user_data[..], b"hello"),
            other => panic!("unexpected chunk {other}"),
        }
        Ok(())
    }

    #[test]
    fn test_packet_chunk_cap() -> Result<()> {
        let mut packet = Packet {
            source_port: 1,
            destination_port: 2,
            verification_tag: 3,
            chunks: vec![],
        };
        for tsn in 0..12u32 {
            packet
                .chunks
                .push(Chunk::PayloadData(ChunkPayloadData::complete_unreliable(
                    tsn,
                    0,
                    PayloadProtocolIdentifier::Binary,
                    Bytes::from_static(&[0u8; 4]),
                )));
        }
        let raw = packet.marshal()?;
        let decoded = Packet::unmarshal(&raw)?;
        assert_eq!(decoded.chunks.len(), MAX_CHUNKS_PER_PACKET);
        Ok(())
    }
}
