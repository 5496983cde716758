use std::fmt;

use super::attributes::*;
use super::message::Message;
use crate::error::{Error, Result};

/// Username represents the USERNAME attribute. WebRTC connectivity checks
/// carry `"<server-ufrag>:<client-ufrag>"`.
///
/// RFC 5389 Section 15.3
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) struct Username(pub(crate) String);

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Username {
    pub(crate) fn new(v: String) -> Self {
        Username(v)
    }

    pub(crate) fn add_to(&self, m: &mut Message) -> Result<()> {
        m.add(ATTR_USERNAME, self.0.as_bytes());
        Ok(())
    }

    pub(crate) fn get_from(&mut self, m: &Message) -> Result<()> {
        let v = m.get(ATTR_USERNAME)?;
        self.0 = String::from_utf8(v).map_err(|_| Error::ErrBadUsername)?;
        Ok(())
    }

    /// Splits the credential pair at the first colon.
    pub(crate) fn split_credentials(&self) -> Result<(&str, &str)> {
        self.0.split_once(':').ok_or(Error::ErrBadUsername)
    }
}

#[cfg(test)]
mod test {
    use super::super::message::{Message, BINDING_REQUEST};
    use super::*;

    #[test]
    fn test_username_round_trip_and_split() {
        let mut m = Message::new(BINDING_REQUEST);
        Username::new("srvu:cliu".to_owned()).add_to(&mut m).unwrap();

        let mut decoded = Message::default();
        decoded.unmarshal_binary(&m.raw).unwrap();
        let mut u = Username::default();
        u.get_from(&decoded).unwrap();
        assert_eq!(u.split_credentials().unwrap(), ("srvu", "cliu"));
    }

    #[test]
    fn test_username_without_separator() {
        let u = Username::new("nocolon".to_owned());
        assert_eq!(u.split_credentials(), Err(Error::ErrBadUsername));
    }
}
