use std::fmt;
use std::net::SocketAddrV4;

use crate::alloc::pool::Handle;
use crate::crypto::dtls::DtlsSession;

/// Seconds of silence before a peer is evicted. Reset by any inbound DATA,
/// HEARTBEAT or HEARTBEAT-ACK.
pub(crate) const MAX_CLIENT_TTL: f64 = 8.0;
/// Seconds between outbound HEARTBEAT chunks.
pub(crate) const HEARTBEAT_INTERVAL: f64 = 4.0;

/// Opaque handle to a connected (or connecting) client. Stays unique for
/// the lifetime of the host; handles to removed clients go stale instead of
/// aliasing a recycled slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub(crate) Handle);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session lifecycle. Ordering matters: a peer only ever moves forward,
/// except that every state can drop to `WaitingRemoval` and from there to
/// `Dead`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum PeerState {
    Dead,
    WaitingRemoval,
    DtlsHandshake,
    SctpEstablished,
    DataChannelOpen,
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PeerState::Dead => "dead",
            PeerState::WaitingRemoval => "waiting-removal",
            PeerState::DtlsHandshake => "dtls-handshake",
            PeerState::SctpEstablished => "sctp-established",
            PeerState::DataChannelOpen => "datachannel-open",
        };
        write!(f, "{s}")
    }
}

/// Per-client record. One exists per accepted SDP exchange; all mutation
/// happens on the single dispatcher thread.
pub(crate) struct Peer {
    /// ICE ufrag we generated for this session (4 chars).
    pub(crate) local_user: String,
    /// ICE password we generated (24 chars); keys MESSAGE-INTEGRITY.
    pub(crate) local_password: String,
    /// Remote's ufrag, from the offer.
    pub(crate) remote_user: String,
    /// Remote's password, from the offer. Kept for completeness; the server
    /// never initiates its own connectivity checks.
    pub(crate) remote_password: String,

    /// Locked by the first STUN binding that authenticates.
    pub(crate) address: Option<SocketAddrV4>,
    pub(crate) state: PeerState,

    pub(crate) local_sctp_port: u16,
    pub(crate) remote_sctp_port: u16,
    /// The remote's initiate tag; echoed on every outbound SCTP packet.
    pub(crate) sctp_verification_tag: u32,
    /// Highest TSN seen from the remote, reported back in SACKs.
    pub(crate) remote_tsn: u32,
    /// Next outbound TSN.
    pub(crate) tsn: u32,

    pub(crate) ttl: f64,
    pub(crate) next_heartbeat: f64,

    pub(crate) dtls: DtlsSession,
    pub(crate) user_data: u64,
}

impl Peer {
    pub(crate) fn new(
        dtls: DtlsSession,
        local_user: String,
        local_password: String,
        remote_user: String,
        remote_password: String,
    ) -> Self {
        Peer {
            local_user,
            local_password,
            remote_user,
            remote_password,
            address: None,
            state: PeerState::DtlsHandshake,
            local_sctp_port: 0,
            remote_sctp_port: 0,
            sctp_verification_tag: 0,
            remote_tsn: 0,
            tsn: 1,
            ttl: MAX_CLIENT_TTL,
            next_heartbeat: HEARTBEAT_INTERVAL,
            dtls,
            user_data: 0,
        }
    }

    pub(crate) fn refresh_ttl(&mut self) {
        self.ttl = MAX_CLIENT_TTL;
    }

    /// Tears the session down; the DTLS state goes with the record when the
    /// slot is released.
    pub(crate) fn finish(&mut self) {
        self.state = PeerState::Dead;
    }
}
