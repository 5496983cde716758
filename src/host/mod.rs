
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use rand::Rng;

use crate::alloc::arena::Arena;
use crate::alloc::pool::{Handle, Pool};
use crate::alloc::queue::BoundedQueue;
use crate::config::{HostConfig, DEFAULT_MAX_CLIENTS};
use crate::crypto::cert;
use crate::crypto::dtls::{self, DtlsSession, HandshakeStatus};
use crate::data;
use crate::error::{Error, Result};
use crate::peer::{Peer, PeerId, PeerState, HEARTBEAT_INTERVAL};
use crate::sctp::chunk::chunk_cookie_ack::ChunkCookieAck;
use crate::sctp::chunk::chunk_forward_tsn::ChunkForwardTsn;
use crate::sctp::chunk::chunk_heartbeat::ChunkHeartbeat;
use crate::sctp::chunk::chunk_init::ChunkInit;
use crate::sctp::chunk::chunk_payload_data::{ChunkPayloadData, PayloadProtocolIdentifier};
use crate::sctp::chunk::chunk_selective_ack::ChunkSelectiveAck;
use crate::sctp::chunk::chunk_shutdown::ChunkShutdown;
use crate::sctp::chunk::Chunk;
use crate::sctp::packet::Packet;
use crate::sdp;
use crate::stun::fingerprint::FINGERPRINT;
use crate::stun::integrity::MessageIntegrity;
use crate::stun::message::{self, Message, BINDING_REQUEST, BINDING_SUCCESS};
use crate::stun::textattrs::Username;
use crate::stun::xoraddr::XorMappedAddress;
use crate::util;

const EVENT_QUEUE_DEPTH: usize = 1024;
const ARENA_BLOCK_SIZE: usize = 1 << 20;
/// Window credit advertised in INIT-ACK and SACK.
const SCTP_DEFAULT_BUFFER_SPACE: u32 = 256 * 1024;
/// Largest DTLS plaintext record processed per read.
const TLS_READ_BUFFER_SIZE: usize = 8192;
const STATE_COOKIE_SIZE: usize = 16;
const LOCAL_UFRAG_LEN: usize = 4;
const LOCAL_PWD_LEN: usize = 24;

type UdpWriteFn = Box<dyn FnMut(&[u8], PeerId)>;
type ErrorFn = Box<dyn FnMut(&str)>;

/// What the host surfaces to the embedder, drained one per `update` call.
/// Payload bytes are refcounted slices of the current tick's scratch
/// region; copy-free to hold, valid for as long as they are held.
#[derive(Debug, Clone)]
pub enum Event {
    /// First data channel opened; the peer is ready for `send_text` /
    /// `send_binary`. Emitted exactly once per peer.
    ClientJoin { peer: PeerId },
    /// Last event for a peer: SCTP ABORT, TTL expiry, nothing after it.
    ClientLeave { peer: PeerId },
    TextData { peer: PeerId, data: Bytes },
    BinaryData { peer: PeerId, data: Bytes },
}

/// Successful result of an SDP offer/answer exchange.
#[derive(Debug)]
pub struct SdpExchange {
    pub peer: PeerId,
    pub answer: String,
}

/// The single-threaded core: terminates STUN, DTLS and enough SCTP to run
/// WebRTC data channels over one UDP socket the embedder owns.
///
/// The embedder feeds datagrams in with [`handle_udp`](Host::handle_udp),
/// drives time with [`update`](Host::update) and receives outbound
/// datagrams synchronously through the write callback.
pub struct Host {
    host: Ipv4Addr,
    port: u16,

    peers: Pool<Peer>,
    arena: Arena,
    events: BoundedQueue<Event>,

    ssl_ctx: openssl::ssl::SslContext,
    cert_fingerprint: String,

    write_udp: UdpWriteFn,
    on_error: ErrorFn,

    /// Monotonic seconds since startup; carried in heartbeat payloads.
    time: f64,
    last_tick: Instant,
}

impl Host {
    pub fn new(config: HostConfig) -> Result<Host> {
        let host: Ipv4Addr = config.host.parse().map_err(|_| Error::ErrInvalidAddress)?;
        let max_clients = if config.max_clients == 0 {
            DEFAULT_MAX_CLIENTS
        } else {
            config.max_clients
        };

        let identity = cert::generate_identity()?;
        let ssl_ctx = dtls::build_context(&identity)?;

        Ok(Host {
            host,
            port: config.port,
            peers: Pool::with_capacity(max_clients),
            arena: Arena::with_block_size(ARENA_BLOCK_SIZE),
            events: BoundedQueue::with_capacity(EVENT_QUEUE_DEPTH),
            ssl_ctx,
            cert_fingerprint: identity.fingerprint,
            write_udp: Box::new(|_, _| {}),
            on_error: Box::new(|_| {}),
            time: 0.0,
            last_tick: Instant::now(),
        })
    }

    /// Installs the outbound datagram callback. Until one is set, outbound
    /// traffic is silently discarded.
    pub fn set_udp_write_fn(&mut self, write: impl FnMut(&[u8], PeerId) + 'static) {
        self.write_udp = Box::new(write);
    }

    /// Installs a callback invoked with a short description whenever the
    /// host swallows an error on a peer's behalf.
    pub fn set_error_callback(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_error = Box::new(callback);
    }

    /// Parses a remote offer, allocates a peer and produces the answer.
    pub fn exchange_sdp(&mut self, offer: &str) -> Result<SdpExchange> {
        let fields = sdp::parse_offer(offer)?;
        if self.peers.is_full() {
            return Err(Error::ErrMaxClients);
        }

        let local_user = util::random_string(LOCAL_UFRAG_LEN);
        let local_password = util::random_string(LOCAL_PWD_LEN);
        let dtls = DtlsSession::accept(&self.ssl_ctx)?;
        let peer = Peer::new(
            dtls,
            local_user.clone(),
            local_password.clone(),
            fields.ufrag.clone(),
            fields.pwd.clone(),
        );
        let handle = self.peers.acquire(peer).ok_or(Error::ErrMaxClients)?;

        let answer = sdp::generate_answer(&sdp::AnswerParams {
            host: self.host,
            port: self.port,
            cert_fingerprint: &self.cert_fingerprint,
            ufrag: &local_user,
            pwd: &local_password,
            mid: &fields.mid,
        });

        log::debug!(
            "client {} created for remote ufrag {} ({} active)",
            handle,
            fields.ufrag,
            self.peers.len()
        );
        Ok(SdpExchange {
            peer: PeerId(handle),
            answer,
        })
    }

    /// Ingests one UDP datagram. The first byte and the magic cookie
    /// decide between STUN and DTLS; everything else about the payload is
    /// each engine's problem.
    pub fn handle_udp(&mut self, remote: SocketAddrV4, datagram: &[u8]) {
        if message::is_message(datagram) {
            self.handle_stun(remote, datagram);
        } else {
            self.handle_dtls(remote, datagram);
        }
    }

    /// Drains one queued event, or advances clocks and returns `None`. The
    /// embedder loops until `None` each tick.
    pub fn update(&mut self) -> Option<Event> {
        self.update_at(Instant::now())
    }

    /// `update` against a caller-supplied clock, for embedders (and tests)
    /// that pace time themselves.
    pub fn update_at(&mut self, now: Instant) -> Option<Event> {
        if let Some(event) = self.events.pop() {
            return Some(event);
        }

        let dt = now.saturating_duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;
        self.time += dt;

        let port = self.port;
        let time = self.time;
        let Host {
            peers, write_udp, ..
        } = self;
        for (handle, peer) in peers.iter_mut() {
            peer.ttl -= dt;
            peer.next_heartbeat -= dt;

            if peer.next_heartbeat <= 0.0 {
                peer.next_heartbeat = HEARTBEAT_INTERVAL;
                send_heartbeat(write_udp, port, time, PeerId(handle), peer);
            }

            flush_dtls(write_udp, PeerId(handle), peer);
        }

        self.arena.reset();
        self.purge_dead_clients();
        None
    }

    pub fn send_text(&mut self, peer: PeerId, text: &str) -> Result<()> {
        self.send_data(peer, text.as_bytes(), PayloadProtocolIdentifier::String)
    }

    pub fn send_binary(&mut self, peer: PeerId, data: &[u8]) -> Result<()> {
        self.send_data(peer, data, PayloadProtocolIdentifier::Binary)
    }

    /// Sends SHUTDOWN and releases the slot. No `ClientLeave` is emitted;
    /// the embedder asked for the removal itself.
    pub fn remove_client(&mut self, peer: PeerId) {
        let Host {
            peers, write_udp, ..
        } = self;
        let Some(record) = peers.get_mut(peer.0) else {
            return;
        };
        let packet = Packet {
            source_port: record.local_sctp_port,
            destination_port: record.remote_sctp_port,
            verification_tag: record.sctp_verification_tag,
            chunks: vec![Chunk::Shutdown(ChunkShutdown {
                cumulative_tsn_ack: record.remote_tsn,
            })],
        };
        send_sctp(write_udp, peer, record, &packet);
        record.finish();
        peers.release(peer.0);
        log::debug!("client {peer} removed");
    }

    pub fn client_address(&self, peer: PeerId) -> Option<SocketAddrV4> {
        self.peers.get(peer.0).and_then(|p| p.address)
    }

    /// Opaque embedder tag attached to a peer.
    pub fn client_set_user_data(&mut self, peer: PeerId, user_data: u64) {
        if let Some(p) = self.peers.get_mut(peer.0) {
            p.user_data = user_data;
        }
    }

    pub fn client_get_user_data(&self, peer: PeerId) -> Option<u64> {
        self.peers.get(peer.0).map(|p| p.user_data)
    }

    fn send_data(
        &mut self,
        peer: PeerId,
        data: &[u8],
        proto: PayloadProtocolIdentifier,
    ) -> Result<()> {
        let port = self.port;
        let Host {
            peers, write_udp, ..
        } = self;
        let record = peers.get_mut(peer.0).ok_or(Error::ErrUnknownClient)?;
        if record.state < PeerState::DataChannelOpen {
            return Err(Error::ErrNotConnected);
        }

        let tsn = record.tsn;
        record.tsn += 1;
        let packet = Packet {
            source_port: port,
            destination_port: record.remote_sctp_port,
            verification_tag: record.sctp_verification_tag,
            // TODO: stream id is pinned to 0; multiple channels per peer
            // would need the id negotiated in DCEP OPEN.
            chunks: vec![Chunk::PayloadData(ChunkPayloadData::complete_unreliable(
                tsn,
                0,
                proto,
                Bytes::copy_from_slice(data),
            ))],
        };
        send_sctp(write_udp, peer, record, &packet);
        Ok(())
    }

    fn handle_stun(&mut self, remote: SocketAddrV4, datagram: &[u8]) {
        let mut msg = Message::default();
        if msg.unmarshal_binary(datagram).is_err() {
            return;
        }
        if msg.typ != BINDING_REQUEST {
            return;
        }
        let mut username = Username::default();
        if username.get_from(&msg).is_err() {
            return;
        }
        let Ok((server_user, client_user)) = username.split_credentials() else {
            return;
        };

        let Host {
            peers, write_udp, ..
        } = self;
        // Two-key identity: credentials now, address once it is locked.
        let Some((handle, peer)) = peers
            .iter_mut()
            .find(|(_, p)| p.local_user == server_user && p.remote_user == client_user)
        else {
            // TODO: respond with 401 and rate-limit instead of staying
            // silent.
            return;
        };

        let integrity = MessageIntegrity::new_short_term_integrity(&peer.local_password);
        if integrity.check(&mut msg).is_err() {
            log::trace!("client {handle} STUN binding failed integrity check");
            return;
        }

        let mut response = Message::new(BINDING_SUCCESS);
        response.transaction_id = msg.transaction_id;
        response.write_transaction_id();
        let xor_addr = XorMappedAddress {
            ip: *remote.ip(),
            port: remote.port(),
        };
        if xor_addr.add_to(&mut response).is_err()
            || integrity.add_to(&mut response).is_err()
            || FINGERPRINT.add_to(&mut response).is_err()
        {
            return;
        }

        if peer.address.is_none() {
            // The SCTP port mirrors the first UDP source port seen;
            // arbitrary, but stable for the association.
            peer.address = Some(remote);
            peer.local_sctp_port = remote.port();
            log::debug!("client {handle} bound to {remote}");
        }

        (write_udp)(&response.raw, PeerId(handle));
    }

    fn handle_dtls(&mut self, remote: SocketAddrV4, datagram: &[u8]) {
        let Host {
            peers,
            write_udp,
            on_error,
            arena,
            events,
            ..
        } = self;
        let Some((handle, peer)) = peers
            .iter_mut()
            .find(|(_, p)| p.address == Some(remote))
        else {
            return;
        };
        let id = PeerId(handle);

        peer.dtls.feed_input(datagram);

        if !peer.dtls.handshake_done() {
            match peer.dtls.do_handshake() {
                HandshakeStatus::Done => log::debug!("client {id} DTLS handshake complete"),
                HandshakeStatus::InProgress => {}
                HandshakeStatus::Failed => {
                    (on_error)("dtls handshake failure");
                }
            }
            flush_dtls(write_udp, id, peer);
        } else {
            flush_dtls(write_udp, id, peer);

            let mut scratch = [0u8; TLS_READ_BUFFER_SIZE];
            while let Some(n) = peer.dtls.read_application(&mut scratch) {
                // Copied into the tick region so event payloads stay alive
                // through the embedder's drain loop.
                let plaintext = arena.push(&scratch[..n]);
                handle_sctp(write_udp, on_error, events, id, peer, &plaintext);
                if peer.state == PeerState::WaitingRemoval {
                    break;
                }
            }
        }
    }

    fn purge_dead_clients(&mut self) {
        let expired: Vec<Handle> = self
            .peers
            .iter()
            .filter(|(_, p)| p.ttl <= 0.0 || p.state == PeerState::WaitingRemoval)
            .map(|(handle, _)| handle)
            .collect();

        for handle in expired {
            if let Some(mut peer) = self.peers.release(handle) {
                log::debug!(
                    "client {handle} evicted in state {} (ttl {:.1})",
                    peer.state,
                    peer.ttl
                );
                peer.finish();
            }
            push_event(
                &mut self.events,
                Event::ClientLeave {
                    peer: PeerId(handle),
                },
            );
        }
    }
}

fn push_event(events: &mut BoundedQueue<Event>, event: Event) {
    if events.push(event).is_some() {
        log::warn!("event queue overflow, oldest event dropped");
    }
}

fn flush_dtls(write_udp: &mut UdpWriteFn, id: PeerId, peer: &mut Peer) {
    while let Some(datagram) = peer.dtls.take_output() {
        (write_udp)(&datagram, id);
    }
}

/// Serializes, encrypts and flushes one SCTP packet. Dropped silently while
/// the DTLS handshake is still running, exactly like a lost datagram.
fn send_sctp(write_udp: &mut UdpWriteFn, id: PeerId, peer: &mut Peer, packet: &Packet) {
    let mut buf = BytesMut::new();
    if let Err(e) = packet.marshal_to(&mut buf) {
        log::warn!("client {id} failed to marshal outbound SCTP: {e}");
        return;
    }
    if peer.state < PeerState::DtlsHandshake || !peer.dtls.handshake_done() {
        return;
    }
    peer.dtls.write_application(&buf);
    flush_dtls(write_udp, id, peer);
}

fn send_heartbeat(write_udp: &mut UdpWriteFn, port: u16, time: f64, id: PeerId, peer: &mut Peer) {
    let packet = Packet {
        source_port: port,
        destination_port: peer.remote_sctp_port,
        verification_tag: peer.sctp_verification_tag,
        chunks: vec![Chunk::Heartbeat(ChunkHeartbeat {
            is_ack: false,
            heartbeat_info: Bytes::copy_from_slice(&time.to_be_bytes()),
        })],
    };
    send_sctp(write_udp, id, peer, &packet);
}

/// Runs one decrypted SCTP packet through the per-chunk handling rules.
fn handle_sctp(
    write_udp: &mut UdpWriteFn,
    on_error: &mut ErrorFn,
    events: &mut BoundedQueue<Event>,
    id: PeerId,
    peer: &mut Peer,
    raw: &Bytes,
) {
    let packet = match Packet::unmarshal(raw) {
        Ok(packet) => packet,
        Err(e) => {
            log::warn!("client {id} dropping SCTP packet: {e}");
            (on_error)("sctp parse failure");
            return;
        }
    };

    let mut saw_data = false;
    for chunk in &packet.chunks {
        match chunk {
            Chunk::PayloadData(data) => {
                saw_data = true;
                peer.remote_tsn = peer.remote_tsn.max(data.tsn);
                peer.refresh_ttl();
                handle_payload_data(write_udp, events, id, peer, &packet, data);
            }
            Chunk::Init(init) if !init.is_ack => {
                handle_init(write_udp, id, peer, &packet, init);
                // An INIT must stand alone; nothing else in this packet is
                // worth looking at.
                break;
            }
            Chunk::CookieEcho(_) => {
                // The echoed cookie is not validated.
                if peer.state < PeerState::SctpEstablished {
                    peer.state = PeerState::SctpEstablished;
                    log::debug!("client {id} SCTP established");
                }
                let response = Packet {
                    source_port: packet.destination_port,
                    destination_port: packet.source_port,
                    verification_tag: peer.sctp_verification_tag,
                    chunks: vec![Chunk::CookieAck(ChunkCookieAck)],
                };
                send_sctp(write_udp, id, peer, &response);
            }
            Chunk::Heartbeat(hb) if !hb.is_ack => {
                peer.refresh_ttl();
                let response = Packet {
                    source_port: packet.destination_port,
                    destination_port: packet.source_port,
                    verification_tag: peer.sctp_verification_tag,
                    chunks: vec![Chunk::Heartbeat(ChunkHeartbeat {
                        is_ack: true,
                        heartbeat_info: hb.heartbeat_info.clone(),
                    })],
                };
                send_sctp(write_udp, id, peer, &response);
            }
            Chunk::Heartbeat(_) => {
                peer.refresh_ttl();
            }
            Chunk::Abort(_) => {
                log::debug!("client {id} received ABORT");
                peer.state = PeerState::WaitingRemoval;
                return;
            }
            Chunk::SelectiveAck(sack) => {
                // Nothing is ever retransmitted, so gaps on the remote side
                // are resolved by telling it to stop waiting.
                if !sack.gap_ack_blocks.is_empty() {
                    let response = Packet {
                        source_port: packet.destination_port,
                        destination_port: packet.source_port,
                        verification_tag: peer.sctp_verification_tag,
                        chunks: vec![Chunk::ForwardTsn(ChunkForwardTsn {
                            new_cumulative_tsn: peer.tsn,
                        })],
                    };
                    send_sctp(write_udp, id, peer, &response);
                }
            }
            Chunk::Init(_) | Chunk::Shutdown(_) | Chunk::CookieAck(_) | Chunk::ForwardTsn(_) => {}
        }
    }

    if saw_data {
        let sack = Packet {
            source_port: packet.destination_port,
            destination_port: packet.source_port,
            verification_tag: peer.sctp_verification_tag,
            chunks: vec![Chunk::SelectiveAck(ChunkSelectiveAck {
                cumulative_tsn_ack: peer.remote_tsn,
                advertised_receiver_window_credit: SCTP_DEFAULT_BUFFER_SPACE,
                gap_ack_blocks: vec![],
                duplicate_tsn: vec![],
            })],
        };
        send_sctp(write_udp, id, peer, &sack);
    }
}

fn handle_init(
    write_udp: &mut UdpWriteFn,
    id: PeerId,
    peer: &mut Peer,
    packet: &Packet,
    init: &ChunkInit,
) {
    peer.remote_sctp_port = packet.source_port;
    peer.sctp_verification_tag = init.initiate_tag;
    peer.remote_tsn = init.initial_tsn.wrapping_sub(1);

    let mut rng = rand::thread_rng();
    let mut cookie = [0u8; STATE_COOKIE_SIZE];
    rng.fill(&mut cookie);

    let response = Packet {
        source_port: packet.destination_port,
        destination_port: packet.source_port,
        verification_tag: init.initiate_tag,
        chunks: vec![Chunk::Init(ChunkInit {
            is_ack: true,
            initiate_tag: rng.gen(),
            advertised_receiver_window_credit: SCTP_DEFAULT_BUFFER_SPACE,
            num_outbound_streams: init.num_inbound_streams,
            num_inbound_streams: init.num_outbound_streams,
            initial_tsn: peer.tsn,
            state_cookie: Some(Bytes::copy_from_slice(&cookie)),
        })],
    };
    log::debug!("client {id} INIT, replying INIT-ACK");
    send_sctp(write_udp, id, peer, &response);
}

fn handle_payload_data(
    write_udp: &mut UdpWriteFn,
    events: &mut BoundedQueue<Event>,
    id: PeerId,
    peer: &mut Peer,
    packet: &Packet,
    data: &ChunkPayloadData,
) {
    match data.payload_type {
        PayloadProtocolIdentifier::Dcep => {
            let mut reader = data.user_data.clone();
            let Ok(data::Message::DataChannelOpen(_open)) = data::Message::unmarshal(&mut reader)
            else {
                return;
            };

            peer.remote_sctp_port = packet.source_port;
            let tsn = peer.tsn;
            peer.tsn += 1;
            let response = Packet {
                source_port: packet.destination_port,
                destination_port: packet.source_port,
                verification_tag: peer.sctp_verification_tag,
                chunks: vec![Chunk::PayloadData(ChunkPayloadData::complete_unreliable(
                    tsn,
                    data.stream_identifier,
                    PayloadProtocolIdentifier::Dcep,
                    data::Message::DataChannelAck.marshal(),
                ))],
            };

            if peer.state != PeerState::DataChannelOpen {
                peer.state = PeerState::DataChannelOpen;
                log::debug!("client {id} data channel open");
                push_event(events, Event::ClientJoin { peer: id });
            }

            send_sctp(write_udp, id, peer, &response);
        }
        PayloadProtocolIdentifier::String => {
            push_event(
                events,
                Event::TextData {
                    peer: id,
                    data: data.user_data.clone(),
                },
            );
        }
        PayloadProtocolIdentifier::Binary => {
            push_event(
                events,
                Event::BinaryData {
                    peer: id,
                    data: data.user_data.clone(),
                },
            );
        }
        PayloadProtocolIdentifier::Unknown => {}
    }
}
