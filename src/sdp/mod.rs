use std::net::Ipv4Addr;

use rand::Rng;

use crate::error::{Error, Result};

/// Fields pulled out of a remote SDP offer. Only the ICE credentials are
/// required; everything else is best-effort with sane fallbacks.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct IceSdpFields {
    pub(crate) ufrag: String,
    pub(crate) pwd: String,
    pub(crate) mid: String,
}

/// Extracts `a=ice-ufrag` / `a=ice-pwd` (and the first `a=mid`) from an
/// offer. Lines are scanned individually; an offer that never states the
/// credentials is rejected.
pub(crate) fn parse_offer(sdp: &str) -> Result<IceSdpFields> {
    let mut fields = IceSdpFields {
        mid: "0".to_owned(),
        ..Default::default()
    };
    let mut saw_mid = false;

    for line in sdp.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(v) = line.strip_prefix("a=ice-ufrag:") {
            if fields.ufrag.is_empty() {
                fields.ufrag = v.trim().to_owned();
            }
        } else if let Some(v) = line.strip_prefix("a=ice-pwd:") {
            if fields.pwd.is_empty() {
                fields.pwd = v.trim().to_owned();
            }
        } else if let Some(v) = line.strip_prefix("a=mid:") {
            if !saw_mid {
                fields.mid = v.trim().to_owned();
                saw_mid = true;
            }
        }
    }

    if fields.ufrag.is_empty() || fields.pwd.is_empty() {
        return Err(Error::ErrInvalidSdp);
    }
    Ok(fields)
}

pub(crate) struct AnswerParams<'a> {
    pub(crate) host: Ipv4Addr,
    pub(crate) port: u16,
    pub(crate) cert_fingerprint: &'a str,
    pub(crate) ufrag: &'a str,
    pub(crate) pwd: &'a str,
    pub(crate) mid: &'a str,
}

/// Builds the SDP answer for a browser offerer: our credentials and
/// fingerprint, a single application m-line for DTLS/SCTP, and one host
/// candidate. The answer is always `setup:passive`; the engine only ever
/// accepts DTLS.
pub(crate) fn generate_answer(p: &AnswerParams<'_>) -> String {
    let session_id: u64 = rand::thread_rng().gen();
    format!(
        "v=0\n\
         o=- {session_id} 2 IN IP4 {host}\n\
         s=-\n\
         t=0 0\n\
         m=application {port} DTLS/SCTP 5000\n\
         c=IN IP4 {host}\n\
         a=ice-lite\n\
         a=ice-ufrag:{ufrag}\n\
         a=ice-pwd:{pwd}\n\
         a=fingerprint:sha-256 {fingerprint}\n\
         a=setup:passive\n\
         a=mid:{mid}\n\
         a=sctpmap:5000 webrtc-datachannel 1024\n\
         a=candidate:candidate0 1 udp 2130706431 {host} {port} typ host\n",
        host = p.host,
        port = p.port,
        ufrag = p.ufrag,
        pwd = p.pwd,
        fingerprint = p.cert_fingerprint,
        mid = p.mid,
    )
}

#[cfg(test)]
mod test {
    use super::*;

    const OFFER: &str = "v=0\r\n\
        o=- 4962303333179871722 1 IN IP4 0.0.0.0\r\n\
        s=-\r\n\
        t=0 0\r\n\
        m=application 9 DTLS/SCTP 5000\r\n\
        c=IN IP4 0.0.0.0\r\n\
        a=ice-ufrag:abcd\r\n\
        a=ice-pwd:0123456789012345678901\r\n\
        a=fingerprint:sha-256 aa:bb:cc:dd\r\n\
        a=setup:actpass\r\n\
        a=mid:data\r\n\
        a=sctpmap:5000 webrtc-datachannel 1024\r\n";

    #[test]
    fn test_parse_offer() {
        let fields = parse_offer(OFFER).unwrap();
        assert_eq!(fields.ufrag, "abcd");
        assert_eq!(fields.pwd, "0123456789012345678901");
        assert_eq!(fields.mid, "data");
    }

    #[test]
    fn test_parse_offer_without_credentials() {
        assert_eq!(
            parse_offer("v=0\r\ns=-\r\n").unwrap_err(),
            Error::ErrInvalidSdp
        );
    }

    #[test]
    fn test_generate_answer_shape() {
        let answer = generate_answer(&AnswerParams {
            host: Ipv4Addr::new(192, 0, 2, 10),
            port: 9555,
            cert_fingerprint: "aa:bb:cc",
            ufrag: "wxyz",
            pwd: "012345678901234567890123",
            mid: "data",
        });
        assert!(answer.starts_with("v=0\n"));
        assert!(answer.contains("m=application 9555 DTLS/SCTP 5000\n"));
        assert!(answer.contains("a=ice-ufrag:wxyz\n"));
        assert!(answer.contains("a=ice-pwd:012345678901234567890123\n"));
        assert!(answer.contains("a=fingerprint:sha-256 aa:bb:cc\n"));
        assert!(answer.contains("a=setup:passive\n"));
        assert!(answer.contains("a=mid:data\n"));
        assert!(answer.contains("a=sctpmap:5000 webrtc-datachannel 1024\n"));
        assert!(answer.contains("a=candidate:candidate0 1 udp 2130706431 192.0.2.10 9555 typ host\n"));
    }
}
