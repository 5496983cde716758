use std::collections::VecDeque;
use std::io::{self, Read, Write};

use openssl::ec::EcKey;
use openssl::nid::Nid;
use openssl::ssl::{
    ErrorCode, Ssl, SslContext, SslContextRef, SslMethod, SslSessionCacheMode, SslStream,
    SslVerifyMode,
};

use super::cert::DtlsIdentity;
use crate::error::Result;

/// Everything but anonymous, export-grade and MD5 suites, strongest first.
const CIPHER_LIST: &str = "ALL:!ADH:!LOW:!EXP:!MD5:@STRENGTH";

/// In-memory stand-in for the UDP transport underneath the TLS engine: one
/// queue of inbound ciphertext datagrams, one of outbound. Each `read`
/// hands the engine exactly one datagram, each `write` captures one.
#[derive(Default)]
pub(crate) struct DatagramQueues {
    pub(crate) incoming: VecDeque<Vec<u8>>,
    pub(crate) outgoing: VecDeque<Vec<u8>>,
}

impl Read for DatagramQueues {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.incoming.pop_front() {
            Some(datagram) => {
                // A datagram that does not fit is truncated, not buffered;
                // the tail would not survive a real socket either.
                let n = datagram.len().min(buf.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                Ok(n)
            }
            None => Err(io::Error::new(io::ErrorKind::WouldBlock, "no datagram queued")),
        }
    }
}

impl Write for DatagramQueues {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.outgoing.push_back(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds the shared DTLS server context: restricted cipher list, ephemeral
/// P-256 ECDH, no session cache, no peer-certificate verification (WebRTC
/// binds identity out of band through the SDP fingerprint).
pub(crate) fn build_context(identity: &DtlsIdentity) -> Result<SslContext> {
    let mut builder = SslContext::builder(SslMethod::dtls())?;
    builder.set_cipher_list(CIPHER_LIST)?;
    builder.set_verify(SslVerifyMode::NONE);
    builder.set_session_cache_mode(SslSessionCacheMode::OFF);
    let ecdh = EcKey::from_curve_name(Nid::X9_62_PRIME256V1)?;
    builder.set_tmp_ecdh(&ecdh)?;
    builder.set_private_key(&identity.pkey)?;
    builder.set_certificate(&identity.x509)?;
    builder.check_private_key()?;
    Ok(builder.build())
}

pub(crate) enum HandshakeStatus {
    Done,
    InProgress,
    Failed,
}

/// One peer's DTLS engine in server-accept mode. The embedding state
/// machine only ever touches the four queues-and-predicates below; the TLS
/// library stays a black box behind them.
pub(crate) struct DtlsSession {
    stream: SslStream<DatagramQueues>,
}

impl DtlsSession {
    pub(crate) fn accept(ctx: &SslContextRef) -> Result<Self> {
        let mut ssl = Ssl::new(ctx)?;
        ssl.set_accept_state();
        let stream = SslStream::new(ssl, DatagramQueues::default())?;
        Ok(DtlsSession { stream })
    }

    pub(crate) fn handshake_done(&self) -> bool {
        self.stream.ssl().is_init_finished()
    }

    /// Queues one inbound ciphertext datagram for the engine.
    pub(crate) fn feed_input(&mut self, datagram: &[u8]) {
        self.stream.get_mut().incoming.push_back(datagram.to_vec());
    }

    /// Pops one outbound ciphertext datagram, if any.
    pub(crate) fn take_output(&mut self) -> Option<Vec<u8>> {
        self.stream.get_mut().outgoing.pop_front()
    }

    /// Advances the handshake. "Want read" just means the next flight has
    /// not arrived yet.
    pub(crate) fn do_handshake(&mut self) -> HandshakeStatus {
        match self.stream.do_handshake() {
            Ok(()) => HandshakeStatus::Done,
            Err(e) if e.code() == ErrorCode::WANT_READ || e.code() == ErrorCode::WANT_WRITE => {
                HandshakeStatus::InProgress
            }
            Err(e) => {
                log::debug!("dtls handshake error: {e}");
                HandshakeStatus::Failed
            }
        }
    }

    /// Encrypts one application datagram; ciphertext lands in the outbound
    /// queue. Dropped silently unless the handshake has finished.
    pub(crate) fn write_application(&mut self, data: &[u8]) {
        if data.is_empty() || !self.handshake_done() {
            return;
        }
        if let Err(e) = self.stream.ssl_write(data) {
            log::debug!("dtls write error: {e}");
        }
    }

    /// Decrypts the next buffered record into `buf`. `None` once the
    /// inbound queue is drained.
    pub(crate) fn read_application(&mut self, buf: &mut [u8]) -> Option<usize> {
        match self.stream.ssl_read(buf) {
            Ok(0) => None,
            Ok(n) => Some(n),
            Err(e) if e.code() == ErrorCode::WANT_READ => None,
            Err(e) => {
                log::trace!("dtls read error: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::cert::generate_identity;
    use super::*;

    fn client_stream() -> SslStream<DatagramQueues> {
        let mut builder = SslContext::builder(SslMethod::dtls()).unwrap();
        builder.set_verify(SslVerifyMode::NONE);
        let ctx = builder.build();
        let mut ssl = Ssl::new(&ctx).unwrap();
        ssl.set_connect_state();
        SslStream::new(ssl, DatagramQueues::default()).unwrap()
    }

    /// Shuttles datagrams between a connecting client stream and an
    /// accepting session until both report the handshake finished.
    fn run_handshake(client: &mut SslStream<DatagramQueues>, server: &mut DtlsSession) {
        for _ in 0..50 {
            if client.ssl().is_init_finished() && server.handshake_done() {
                return;
            }
            match client.do_handshake() {
                Ok(()) => {}
                Err(e) if e.code() == ErrorCode::WANT_READ => {}
                Err(e) => panic!("client handshake failed: {e}"),
            }
            while let Some(d) = client.get_mut().outgoing.pop_front() {
                server.feed_input(&d);
                server.do_handshake();
            }
            while let Some(d) = server.take_output() {
                client.get_mut().incoming.push_back(d);
            }
        }
        panic!("handshake did not converge");
    }

    #[test]
    fn test_handshake_and_echo() {
        let identity = generate_identity().unwrap();
        let ctx = build_context(&identity).unwrap();
        let mut server = DtlsSession::accept(&ctx).unwrap();
        let mut client = client_stream();

        run_handshake(&mut client, &mut server);

        client.ssl_write(b"ping").unwrap();
        while let Some(d) = client.get_mut().outgoing.pop_front() {
            server.feed_input(&d);
        }
        let mut buf = [0u8; 64];
        let n = server.read_application(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ping");

        server.write_application(b"pong");
        while let Some(d) = server.take_output() {
            client.get_mut().incoming.push_back(d);
        }
        let n = client.ssl_read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"pong");
    }

    #[test]
    fn test_garbage_input_does_not_finish_handshake() {
        let identity = generate_identity().unwrap();
        let ctx = build_context(&identity).unwrap();
        let mut server = DtlsSession::accept(&ctx).unwrap();

        server.feed_input(&[0xde, 0xad, 0xbe, 0xef]);
        server.do_handshake();
        assert!(!server.handshake_done());
    }
}
