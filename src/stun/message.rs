use std::fmt;

use rand::Rng;

use super::attributes::*;
use crate::error::{Error, Result};

// MAGIC_COOKIE is the fixed value that aids in distinguishing STUN packets
// from packets of other protocols when STUN is multiplexed with those other
// protocols on the same port.
//
// Defined in "STUN Message Structure", RFC 5389 section 6.
pub(crate) const MAGIC_COOKIE: u32 = 0x2112A442;
pub(crate) const ATTRIBUTE_HEADER_SIZE: usize = 4;
pub(crate) const MESSAGE_HEADER_SIZE: usize = 20;

// TRANSACTION_ID_SIZE is the length of the transaction id array (in bytes).
pub(crate) const TRANSACTION_ID_SIZE: usize = 12; // 96 bit

pub(crate) const BINDING_REQUEST: u16 = 0x0001;
pub(crate) const BINDING_SUCCESS: u16 = 0x0101;

// is_message returns true if b looks like a STUN message: the two leading
// zero bits of the type field and the magic cookie at offset 4. Useful for
// multiplexing; it does not guarantee that decoding will succeed.
pub(crate) fn is_message(b: &[u8]) -> bool {
    b.len() >= MESSAGE_HEADER_SIZE
        && b[0] < 2
        && u32::from_be_bytes([b[4], b[5], b[6], b[7]]) == MAGIC_COOKIE
}

/// Message represents a single STUN packet. The raw encoding and the decoded
/// attribute list are kept in sync so integrity and fingerprint computations
/// can run over `raw` directly.
#[derive(Default, Debug, Clone)]
pub(crate) struct Message {
    pub(crate) typ: u16,
    pub(crate) length: u32, // len(raw) not including header
    pub(crate) transaction_id: [u8; TRANSACTION_ID_SIZE],
    pub(crate) attributes: Vec<RawAttribute>,
    pub(crate) raw: Vec<u8>,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:04x} l={} attrs={}",
            self.typ,
            self.length,
            self.attributes.len()
        )
    }
}

impl Message {
    pub(crate) fn new(typ: u16) -> Self {
        let mut m = Message {
            typ,
            raw: vec![0; MESSAGE_HEADER_SIZE],
            ..Default::default()
        };
        m.write_header();
        m
    }

    pub(crate) fn new_transaction_id(&mut self) {
        rand::thread_rng().fill(&mut self.transaction_id);
        self.write_transaction_id();
    }

    pub(crate) fn write_header(&mut self) {
        self.write_type();
        self.write_length();
        self.raw[4..8].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
        self.write_transaction_id();
    }

    pub(crate) fn write_type(&mut self) {
        self.raw[0..2].copy_from_slice(&self.typ.to_be_bytes());
    }

    pub(crate) fn write_length(&mut self) {
        self.raw[2..4].copy_from_slice(&(self.length as u16).to_be_bytes());
    }

    pub(crate) fn write_transaction_id(&mut self) {
        self.raw[8..MESSAGE_HEADER_SIZE].copy_from_slice(&self.transaction_id);
    }

    /// Appends a new attribute to the message. The value is copied into the
    /// internal buffer, padded out with zero bytes to a 4-byte boundary.
    pub(crate) fn add(&mut self, t: AttrType, v: &[u8]) {
        self.raw.extend_from_slice(&t.value().to_be_bytes());
        self.raw.extend_from_slice(&(v.len() as u16).to_be_bytes());
        self.raw.extend_from_slice(v);
        self.length += (ATTRIBUTE_HEADER_SIZE + v.len()) as u32;

        let padded = nearest_padded_value_length(v.len());
        if padded > v.len() {
            let pad = padded - v.len();
            self.raw.extend_from_slice(&[0u8; PADDING][..pad]);
            self.length += pad as u32;
        }

        self.attributes.push(RawAttribute {
            typ: t,
            length: v.len() as u16,
            value: v.to_vec(),
        });
        self.write_length();
    }

    pub(crate) fn get(&self, t: AttrType) -> Result<Vec<u8>> {
        self.attributes
            .iter()
            .find(|a| a.typ == t)
            .map(|a| a.value.clone())
            .ok_or(Error::ErrAttributeNotFound)
    }

    pub(crate) fn contains(&self, t: AttrType) -> bool {
        self.attributes.iter().any(|a| a.typ == t)
    }

    pub(crate) fn unmarshal_binary(&mut self, data: &[u8]) -> Result<()> {
        // The wire bytes are retained verbatim; integrity and fingerprint
        // checks recompute over them.
        self.raw.clear();
        self.raw.extend_from_slice(data);
        self.decode()
    }

    pub(crate) fn decode(&mut self) -> Result<()> {
        if self.raw.len() < MESSAGE_HEADER_SIZE {
            return Err(Error::ErrStunHeaderTooSmall);
        }

        self.typ = u16::from_be_bytes([self.raw[0], self.raw[1]]);
        let length = u16::from_be_bytes([self.raw[2], self.raw[3]]) as usize;
        let cookie = u32::from_be_bytes([self.raw[4], self.raw[5], self.raw[6], self.raw[7]]);
        if cookie != MAGIC_COOKIE {
            return Err(Error::ErrStunMagicCookieMismatch);
        }
        if self.raw.len() < MESSAGE_HEADER_SIZE + length {
            return Err(Error::ErrStunHeaderTooSmall);
        }
        self.length = length as u32;
        self.transaction_id
            .copy_from_slice(&self.raw[8..MESSAGE_HEADER_SIZE]);

        self.attributes.clear();
        let mut offset = MESSAGE_HEADER_SIZE;
        let end = MESSAGE_HEADER_SIZE + length;
        while offset < end {
            if offset + ATTRIBUTE_HEADER_SIZE > end {
                return Err(Error::ErrStunAttributeTruncated);
            }
            let typ = AttrType(u16::from_be_bytes([self.raw[offset], self.raw[offset + 1]]));
            let attr_len = u16::from_be_bytes([self.raw[offset + 2], self.raw[offset + 3]]) as usize;
            let value_start = offset + ATTRIBUTE_HEADER_SIZE;
            if value_start + attr_len > end {
                return Err(Error::ErrStunAttributeTruncated);
            }
            self.attributes.push(RawAttribute {
                typ,
                length: attr_len as u16,
                value: self.raw[value_start..value_start + attr_len].to_vec(),
            });
            offset = value_start + nearest_padded_value_length(attr_len);
        }

        Ok(())
    }
}
