use crc::{Crc, CRC_32_ISO_HDLC};

use super::attributes::*;
use super::message::*;
use crate::error::{Error, Result};

/// FingerprintAttr represents the FINGERPRINT attribute.
///
/// RFC 5389 Section 15.5
pub(crate) struct FingerprintAttr;

/// FINGERPRINT is shorthand for FingerprintAttr.
pub(crate) const FINGERPRINT: FingerprintAttr = FingerprintAttr {};

pub(crate) const FINGERPRINT_XOR_VALUE: u32 = 0x5354554e;
pub(crate) const FINGERPRINT_SIZE: usize = 4; // 32 bit

/// fingerprint_value returns CRC-32 of b XOR-ed by 0x5354554e.
///
/// The XOR helps in cases where an application packet is also using CRC-32.
pub(crate) fn fingerprint_value(b: &[u8]) -> u32 {
    let checksum = Crc::<u32>::new(&CRC_32_ISO_HDLC).checksum(b);
    checksum ^ FINGERPRINT_XOR_VALUE
}

impl FingerprintAttr {
    pub(crate) fn add_to(&self, m: &mut Message) -> Result<()> {
        let l = m.length;
        // length in the header should include the fingerprint attribute
        m.length += (FINGERPRINT_SIZE + ATTRIBUTE_HEADER_SIZE) as u32;
        m.write_length();
        let val = fingerprint_value(&m.raw);
        m.length = l;
        m.add(ATTR_FINGERPRINT, &val.to_be_bytes());
        Ok(())
    }

    /// Reads the fingerprint value from m and checks it. Assumes FINGERPRINT
    /// is the last attribute of the message.
    pub(crate) fn check(&self, m: &Message) -> Result<()> {
        let b = m.get(ATTR_FINGERPRINT)?;
        if b.len() != FINGERPRINT_SIZE {
            return Err(Error::ErrAttributeSizeInvalid);
        }
        let val = u32::from_be_bytes([b[0], b[1], b[2], b[3]]);
        let attr_start = m.raw.len() - (FINGERPRINT_SIZE + ATTRIBUTE_HEADER_SIZE);
        let expected = fingerprint_value(&m.raw[..attr_start]);
        if val != expected {
            return Err(Error::ErrFingerprintMismatch);
        }
        Ok(())
    }
}
