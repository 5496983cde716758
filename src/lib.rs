//! Minimalist WebRTC data channel server.
//!
//! `tinyrtc` terminates just enough of the browser-side stack to accept
//! string and binary data channel messages over a single UDP socket: STUN
//! connectivity checks with short-term credentials, a DTLS handshake in
//! server-accept mode, and a small SCTP subset driven one chunk per packet
//! in unordered unreliable mode. No media, no renegotiation, no IPv6.
//!
//! The core is sans-IO and single-threaded: the embedder owns the socket
//! and the event loop, feeds inbound datagrams to [`Host::handle_udp`],
//! hands SDP offers to [`Host::exchange_sdp`], and pumps [`Host::update`]
//! until it returns `None` each tick. Outbound datagrams come back
//! synchronously through the callback installed with
//! [`Host::set_udp_write_fn`].
//!
//! ```no_run
//! use tinyrtc::{Event, Host, HostConfig};
//!
//! let mut host = Host::new(HostConfig {
//!     host: "192.0.2.10".to_owned(),
//!     port: 9555,
//!     ..Default::default()
//! })?;
//! host.set_udp_write_fn(|_datagram, _peer| {
//!     // sendto(...) on the embedder's socket
//! });
//!
//! // feed offers and datagrams, then each tick:
//! while let Some(event) = host.update() {
//!     match event {
//!         Event::ClientJoin { peer } => println!("{peer:?} joined"),
//!         Event::TextData { peer, data } => println!("{peer:?}: {data:?}"),
//!         _ => {}
//!     }
//! }
//! # Ok::<(), tinyrtc::Error>(())
//! ```

mod alloc;
mod config;
mod crypto;
mod data;
mod error;
mod host;
mod peer;
mod sctp;
mod sdp;
mod stun;
mod util;

pub use config::HostConfig;
pub use error::{Error, Result};
pub use host::{Event, Host, SdpExchange};
pub use peer::PeerId;
