use ring::hmac;

use super::attributes::*;
use super::message::*;
use crate::error::{Error, Result};

/// MessageIntegrity represents the MESSAGE-INTEGRITY attribute keyed with
/// short-term credentials: HMAC-SHA1 over the message up to and including
/// the attribute preceding MESSAGE-INTEGRITY.
///
/// RFC 5389 Section 15.4
#[derive(Default, Clone)]
pub(crate) struct MessageIntegrity(pub(crate) Vec<u8>);

pub(crate) const MESSAGE_INTEGRITY_SIZE: usize = 20;

fn new_hmac(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mac = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, key);
    hmac::sign(&mac, message).as_ref().to_vec()
}

impl MessageIntegrity {
    /// Short-term credential key: the password itself, SASL-prepared.
    pub(crate) fn new_short_term_integrity(password: &str) -> Self {
        MessageIntegrity(password.as_bytes().to_vec())
    }

    pub(crate) fn add_to(&self, m: &mut Message) -> Result<()> {
        // The message must not already carry FINGERPRINT; it is the only
        // attribute allowed after MESSAGE-INTEGRITY.
        if m.contains(ATTR_FINGERPRINT) {
            return Err(Error::ErrFingerprintBeforeIntegrity);
        }
        // The length in the header is adjusted to include the
        // MESSAGE-INTEGRITY TLV before hashing.
        let length = m.length;
        m.length += (MESSAGE_INTEGRITY_SIZE + ATTRIBUTE_HEADER_SIZE) as u32;
        m.write_length();
        let v = new_hmac(&self.0, &m.raw);
        m.length = length;

        m.add(ATTR_MESSAGE_INTEGRITY, &v);
        Ok(())
    }

    pub(crate) fn check(&self, m: &mut Message) -> Result<()> {
        let v = m.get(ATTR_MESSAGE_INTEGRITY)?;
        if v.len() != MESSAGE_INTEGRITY_SIZE {
            return Err(Error::ErrAttributeSizeInvalid);
        }

        // Back the header length down to what the sender hashed: everything
        // after MESSAGE-INTEGRITY (i.e. FINGERPRINT) is excluded.
        let length = m.length;
        let mut after_integrity = false;
        let mut size_reduced = 0usize;
        for a in &m.attributes {
            if after_integrity {
                size_reduced += nearest_padded_value_length(a.length as usize);
                size_reduced += ATTRIBUTE_HEADER_SIZE;
            }
            if a.typ == ATTR_MESSAGE_INTEGRITY {
                after_integrity = true;
            }
        }
        m.length -= size_reduced as u32;
        m.write_length();

        let start_of_hmac = MESSAGE_HEADER_SIZE + m.length as usize
            - (ATTRIBUTE_HEADER_SIZE + MESSAGE_INTEGRITY_SIZE);
        let expected = new_hmac(&self.0, &m.raw[..start_of_hmac]);

        m.length = length;
        m.write_length();

        if ring::constant_time::verify_slices_are_equal(&v, &expected).is_err() {
            return Err(Error::ErrIntegrityMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::super::fingerprint::FINGERPRINT;
    use super::*;

    #[test]
    fn test_integrity_round_trip() {
        let i = MessageIntegrity::new_short_term_integrity("secret-password");
        let mut m = Message::new(BINDING_REQUEST);
        m.new_transaction_id();
        m.add(ATTR_USERNAME, b"srv:cli");
        i.add_to(&mut m).unwrap();

        let mut decoded = Message::default();
        decoded.unmarshal_binary(&m.raw).unwrap();
        i.check(&mut decoded).unwrap();
    }

    #[test]
    fn test_integrity_with_trailing_fingerprint() {
        let i = MessageIntegrity::new_short_term_integrity("secret-password");
        let mut m = Message::new(BINDING_REQUEST);
        m.new_transaction_id();
        i.add_to(&mut m).unwrap();
        FINGERPRINT.add_to(&mut m).unwrap();

        let mut decoded = Message::default();
        decoded.unmarshal_binary(&m.raw).unwrap();
        i.check(&mut decoded).unwrap();
    }

    #[test]
    fn test_integrity_wrong_key() {
        let i = MessageIntegrity::new_short_term_integrity("secret-password");
        let mut m = Message::new(BINDING_REQUEST);
        m.new_transaction_id();
        i.add_to(&mut m).unwrap();

        let wrong = MessageIntegrity::new_short_term_integrity("not-the-password");
        let mut decoded = Message::default();
        decoded.unmarshal_binary(&m.raw).unwrap();
        assert_eq!(
            wrong.check(&mut decoded),
            Err(Error::ErrIntegrityMismatch)
        );
    }

    #[test]
    fn test_fingerprint_must_come_last() {
        let i = MessageIntegrity::new_short_term_integrity("pw");
        let mut m = Message::new(BINDING_REQUEST);
        FINGERPRINT.add_to(&mut m).unwrap();
        assert_eq!(i.add_to(&mut m), Err(Error::ErrFingerprintBeforeIntegrity));
    }
}
