//! # Network Module
//!
//! This module provides the framed TCP message transport linking the surface
//! station and the vehicle.
//!
//! A [`NetSock`] wraps one established TCP stream. Messages are sent as
//! length-prefixed frames (see [`frame`]) and inbound packets are routed to
//! the callbacks held in a [`PacketRegistry`] by a background receive
//! thread. The two endpoints differ only in how the stream is established:
//! the vehicle serves and accepts exactly one peer, the surface station
//! connects.
//!
//! The transport keeps a count of consecutive link failures which is reset
//! by any successful send or receive. Once the configured threshold is
//! reached the connection is closed. Framing violations (an implausible
//! length field, or the stream ending inside a frame) are unrecoverable and
//! close the connection immediately.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod dispatch;
pub mod frame;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::packet::{Packet, PacketError};
use self::frame::{FrameHeader, HEADER_SIZE};

// Re-exports
pub use self::dispatch::{HandlerResult, PacketRegistry, SockEvent};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters controlling the behaviour of a [`NetSock`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetParams {
    /// Largest payload the link will carry. Inbound headers claiming more
    /// than this are treated as stream corruption.
    pub max_payload_bytes: u32,

    /// Number of consecutive link failures tolerated before the connection
    /// is closed.
    pub error_threshold: u32,

    /// How often the receive thread re-checks for shutdown while the stream
    /// is idle, in milliseconds.
    pub poll_interval_ms: u64,

    /// How long `disconnect()` waits for the peer's acknowledgement before
    /// forcing the connection closed, in milliseconds.
    pub disconnect_timeout_ms: u64,
}

/// A framed TCP socket carrying [`Packet`]s between two endpoints.
///
/// All methods take `&self` so the socket can be shared between threads
/// behind an `Arc`. Frames from concurrent senders never interleave.
pub struct NetSock {
    shared: Arc<SockShared>,

    recv_handle: Option<thread::JoinHandle<()>>,
}

/// State shared between the socket handle and its receive thread.
struct SockShared {
    /// Extra handle onto the stream used to shut it down from any thread.
    ctrl: TcpStream,

    /// Write half of the stream. The lock keeps concurrent senders' frames
    /// from interleaving.
    writer: Mutex<TcpStream>,

    open: AtomicBool,

    consec_errors: AtomicU32,

    /// Set when the peer acknowledges our disconnect request.
    ack: Mutex<bool>,
    ack_cvar: Condvar,

    params: NetParams,

    registry: PacketRegistry,

    /// Peer address, for logging only.
    peer_addr: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum NetError {
    #[error("Could not bind to {0}: {1}")]
    BindError(String, std::io::Error),

    #[error("Error accepting a connection: {0}")]
    AcceptError(std::io::Error),

    #[error("Could not connect to {0}: {1}")]
    ConnectError(String, std::io::Error),

    #[error("Error configuring the socket: {0}")]
    SocketConfigError(std::io::Error),

    #[error("The socket is not open")]
    NotOpen,

    #[error("Payload of {0} bytes exceeds the {1} byte maximum")]
    PayloadTooLarge(usize, u32),

    #[error("Error sending packet: {0}")]
    SendError(std::io::Error),

    #[error("The peer did not acknowledge the disconnect request")]
    NoDisconnectAck,
}

/// Outcome of an exact-length read from the stream.
enum ReadOutcome {
    /// The buffer was filled.
    Complete,

    /// Clean end of stream before any byte of the buffer was read.
    EndOfStream,

    /// End of stream part way through the buffer.
    Truncated(usize),

    /// The open flag was dropped while reading.
    Abandoned,

    /// Read error after the given number of bytes.
    Failed(usize, std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NetSock {
    /// Listen on `addr`, accept exactly one peer, and return the connected
    /// socket. Blocks until a peer arrives.
    pub fn serve(
        addr: &str,
        params: NetParams,
        registry: PacketRegistry,
    ) -> Result<Self, NetError> {
        let listener =
            TcpListener::bind(addr).map_err(|e| NetError::BindError(addr.into(), e))?;

        info!("Listening on {}", addr);

        Self::accept(listener, params, registry)
    }

    /// Accept exactly one peer on an already bound listener.
    ///
    /// The listener is dropped once the peer has connected, no further
    /// connections are accepted.
    pub fn accept(
        listener: TcpListener,
        params: NetParams,
        registry: PacketRegistry,
    ) -> Result<Self, NetError> {
        let (stream, peer_addr) = listener.accept().map_err(NetError::AcceptError)?;

        info!("Accepted connection from {}", peer_addr);

        Self::from_stream(stream, peer_addr.to_string(), params, registry)
    }

    /// Connect to a serving peer at `addr`.
    pub fn connect(
        addr: &str,
        params: NetParams,
        registry: PacketRegistry,
    ) -> Result<Self, NetError> {
        let stream =
            TcpStream::connect(addr).map_err(|e| NetError::ConnectError(addr.into(), e))?;

        info!("Connected to {}", addr);

        Self::from_stream(stream, addr.into(), params, registry)
    }

    /// Send a packet to the peer.
    ///
    /// A failed send counts towards the consecutive error threshold. Sending
    /// a payload larger than `max_payload_bytes` is rejected without
    /// touching the stream and does not count, it is a caller bug rather
    /// than a link failure.
    pub fn send(&self, packet: &Packet) -> Result<(), NetError> {
        send_on(&self.shared, packet)
    }

    /// Perform an orderly shutdown handshake with the peer.
    ///
    /// Sends a disconnect request and blocks until the peer acknowledges it
    /// or `disconnect_timeout_ms` passes. The connection is closed in either
    /// case, on timeout `NoDisconnectAck` is returned.
    pub fn disconnect(&self) -> Result<(), NetError> {
        if !self.is_open() {
            return Err(NetError::NotOpen);
        }

        info!("Disconnecting from {}", self.shared.peer_addr);

        self.send(&Packet::Disconnect)?;

        let timeout = Duration::from_millis(self.shared.params.disconnect_timeout_ms);

        let ack = self.shared.ack.lock().unwrap_or_else(|e| e.into_inner());
        let (ack, _) = self
            .shared
            .ack_cvar
            .wait_timeout_while(ack, timeout, |acked| {
                !*acked && self.shared.open.load(Ordering::SeqCst)
            })
            .unwrap_or_else(|e| e.into_inner());

        // close_shared() takes the ack lock itself, so the guard must be
        // released before it is called
        let acked = *ack;
        drop(ack);

        if acked {
            close_shared(&self.shared, false);
            Ok(())
        } else {
            warn!(
                "No disconnect acknowledgement from {}",
                self.shared.peer_addr
            );
            close_shared(&self.shared, false);
            Err(NetError::NoDisconnectAck)
        }
    }

    /// Close the connection.
    ///
    /// Idempotent and safe to call from any thread. The receive thread is
    /// unblocked by shutting the underlying stream down.
    pub fn close(&self) {
        close_shared(&self.shared, false);
    }

    /// Whether the connection is open.
    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// Current count of consecutive link errors.
    pub fn error_count(&self) -> u32 {
        self.shared.consec_errors.load(Ordering::SeqCst)
    }

    /// Build a socket around an established stream and start its receive
    /// thread.
    fn from_stream(
        stream: TcpStream,
        peer_addr: String,
        params: NetParams,
        registry: PacketRegistry,
    ) -> Result<Self, NetError> {
        // Demand vectors are small and latency matters more than throughput
        stream.set_nodelay(true).map_err(NetError::SocketConfigError)?;

        let reader = stream.try_clone().map_err(NetError::SocketConfigError)?;
        reader
            .set_read_timeout(Some(Duration::from_millis(params.poll_interval_ms)))
            .map_err(NetError::SocketConfigError)?;

        let ctrl = stream.try_clone().map_err(NetError::SocketConfigError)?;

        let shared = Arc::new(SockShared {
            ctrl,
            writer: Mutex::new(stream),
            open: AtomicBool::new(true),
            consec_errors: AtomicU32::new(0),
            ack: Mutex::new(false),
            ack_cvar: Condvar::new(),
            params,
            registry,
            peer_addr,
        });

        shared.registry.notify(SockEvent::Opened);

        let recv_shared = shared.clone();
        let recv_handle = thread::spawn(move || recv_loop(recv_shared, reader));

        Ok(Self {
            shared,
            recv_handle: Some(recv_handle),
        })
    }
}

impl Drop for NetSock {
    fn drop(&mut self) {
        close_shared(&self.shared, false);

        if let Some(handle) = self.recv_handle.take() {
            if handle.join().is_err() {
                warn!("Receive thread panicked");
            }
        }
    }
}

impl Default for NetParams {
    fn default() -> Self {
        Self {
            max_payload_bytes: 16 * 1024 * 1024,
            error_threshold: 10,
            poll_interval_ms: 500,
            disconnect_timeout_ms: 2000,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Send a packet over the shared socket state.
fn send_on(shared: &SockShared, packet: &Packet) -> Result<(), NetError> {
    if !shared.open.load(Ordering::SeqCst) {
        return Err(NetError::NotOpen);
    }

    let payload_len = packet.payload_len();
    if payload_len > shared.params.max_payload_bytes as usize {
        return Err(NetError::PayloadTooLarge(
            payload_len,
            shared.params.max_payload_bytes,
        ));
    }

    let full_frame = frame::encode_frame(packet);

    let result = {
        let mut writer = shared.writer.lock().unwrap_or_else(|e| e.into_inner());
        writer.write_all(&full_frame).and_then(|_| writer.flush())
    };

    match result {
        Ok(()) => {
            shared.consec_errors.store(0, Ordering::SeqCst);
            trace!(
                "Sent {:?} packet ({} byte payload)",
                packet.packet_type(),
                payload_len
            );
            Ok(())
        }
        Err(e) => {
            warn!("Failed to send {:?} packet: {}", packet.packet_type(), e);
            record_error(shared);
            Err(NetError::SendError(e))
        }
    }
}

/// Record a link failure, closing the connection once the configured number
/// of consecutive failures is reached.
fn record_error(shared: &SockShared) {
    let errors = shared.consec_errors.fetch_add(1, Ordering::SeqCst) + 1;

    if errors >= shared.params.error_threshold {
        error!(
            "{} consecutive link errors, closing the connection",
            errors
        );
        close_shared(shared, true);
    }
}

/// Close the connection, firing events exactly once however many callers
/// race here.
fn close_shared(shared: &SockShared, errored: bool) {
    if !shared.open.swap(false, Ordering::SeqCst) {
        return;
    }

    // Unblocks the receive thread and the peer's reads
    if let Err(e) = shared.ctrl.shutdown(Shutdown::Both) {
        debug!("Socket shutdown failed (may already be down): {}", e);
    }

    // Wake a disconnect() caller waiting on the handshake. Taking the lock
    // orders the open flag change before the waiter's condition re-check.
    {
        let _ack = shared.ack.lock().unwrap_or_else(|e| e.into_inner());
        shared.ack_cvar.notify_all();
    }

    if errored {
        shared.registry.notify(SockEvent::Errored);
    }
    shared.registry.notify(SockEvent::Closed);

    info!("Connection to {} closed", shared.peer_addr);
}

/// Read exactly `buf.len()` bytes from the stream, looping over partial
/// reads.
///
/// Read timeouts are idle polls: they re-check the open flag and are never
/// reported as errors.
fn read_exact_polled(
    stream: &mut TcpStream,
    buf: &mut [u8],
    shared: &SockShared,
) -> ReadOutcome {
    let mut read = 0;

    while read < buf.len() {
        if !shared.open.load(Ordering::SeqCst) {
            return ReadOutcome::Abandoned;
        }

        match stream.read(&mut buf[read..]) {
            Ok(0) => {
                return if read == 0 {
                    ReadOutcome::EndOfStream
                } else {
                    ReadOutcome::Truncated(read)
                }
            }
            Ok(n) => read += n,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::Interrupted =>
            {
                continue
            }
            Err(e) => return ReadOutcome::Failed(read, e),
        }
    }

    ReadOutcome::Complete
}

/// The receive thread: accumulate frames, decode them, run the shutdown
/// handshake, and dispatch everything else to the registry.
fn recv_loop(shared: Arc<SockShared>, mut reader: TcpStream) {
    debug!("Receive thread for {} started", shared.peer_addr);

    let mut header_buf = [0u8; HEADER_SIZE];

    while shared.open.load(Ordering::SeqCst) {
        match read_exact_polled(&mut reader, &mut header_buf, &shared) {
            ReadOutcome::Complete => (),
            ReadOutcome::EndOfStream => {
                info!("Peer closed the connection");
                close_shared(&shared, false);
                break;
            }
            ReadOutcome::Truncated(n) => {
                error!("Stream ended {} bytes into a frame header", n);
                close_shared(&shared, true);
                break;
            }
            ReadOutcome::Abandoned => break,
            ReadOutcome::Failed(0, e) => {
                // Nothing was consumed so framing is intact and we can retry
                warn!("Read error at a frame boundary: {}", e);
                record_error(&shared);
                continue;
            }
            ReadOutcome::Failed(n, e) => {
                error!("Read error {} bytes into a frame header: {}", n, e);
                close_shared(&shared, true);
                break;
            }
        }

        let header = FrameHeader::decode(&header_buf);

        // An implausible length means the stream is misaligned or corrupt.
        // There is no way to resynchronise, so the link is dropped.
        if header.payload_len > shared.params.max_payload_bytes {
            error!(
                "Frame header claims a {} byte payload (maximum is {}), closing",
                header.payload_len, shared.params.max_payload_bytes
            );
            close_shared(&shared, true);
            break;
        }

        let mut payload = vec![0u8; header.payload_len as usize];

        if !payload.is_empty() {
            match read_exact_polled(&mut reader, &mut payload, &shared) {
                ReadOutcome::Complete => (),
                ReadOutcome::EndOfStream | ReadOutcome::Truncated(_) => {
                    error!(
                        "Stream ended inside a {} byte payload",
                        header.payload_len
                    );
                    close_shared(&shared, true);
                    break;
                }
                ReadOutcome::Abandoned => break,
                ReadOutcome::Failed(_, e) => {
                    error!("Read error inside a frame payload: {}", e);
                    close_shared(&shared, true);
                    break;
                }
            }
        }

        let packet = match Packet::decode(header.packet_type, payload) {
            Ok(p) => {
                // A decodable frame is proof of a healthy link
                shared.consec_errors.store(0, Ordering::SeqCst);
                p
            }
            Err(PacketError::UnknownType(t)) => {
                // Skipped silently so newer peers can talk to older software
                trace!("Ignoring packet of unknown type {}", t);
                continue;
            }
            Err(e) => {
                warn!("Dropping undecodable packet: {}", e);
                record_error(&shared);
                continue;
            }
        };

        trace!("Recieved {:?} packet", packet.packet_type());

        match packet {
            Packet::Disconnect => {
                info!("Peer requested disconnect");
                if let Err(e) = send_on(&shared, &Packet::DisconnectAck) {
                    warn!("Could not acknowledge the disconnect: {}", e);
                }
                close_shared(&shared, false);
                break;
            }
            Packet::DisconnectAck => {
                {
                    let mut ack = shared.ack.lock().unwrap_or_else(|e| e.into_inner());
                    *ack = true;
                }
                close_shared(&shared, false);
                break;
            }
            ref p => shared.registry.dispatch(p),
        }
    }

    debug!("Receive thread for {} exiting", shared.peer_addr);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eqpt::{ControlDems, ThrusterId};
    use crate::packet::PacketType;
    use std::time::Instant;

    fn test_params() -> NetParams {
        NetParams {
            max_payload_bytes: 1024,
            error_threshold: 3,
            poll_interval_ms: 20,
            disconnect_timeout_ms: 1000,
        }
    }

    /// Bind an ephemeral listener and return it along with its address.
    fn local_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("could not bind");
        let addr = listener.local_addr().expect("no local addr").to_string();
        (listener, addr)
    }

    /// Spawn a serving socket on an ephemeral port, connect a client to it,
    /// and return both ends.
    fn connected_pair(
        server_registry: PacketRegistry,
        client_registry: PacketRegistry,
    ) -> (NetSock, NetSock) {
        let (listener, addr) = local_listener();

        let server_thread = thread::spawn(move || {
            NetSock::accept(listener, test_params(), server_registry).expect("accept failed")
        });

        let client = NetSock::connect(&addr, test_params(), client_registry)
            .expect("connect failed");
        let server = server_thread.join().expect("server thread panicked");

        (server, client)
    }

    fn wait_for<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn test_control_packet_delivery() {
        let received = Arc::new(Mutex::new(Vec::new()));

        let mut registry = PacketRegistry::new();
        let sink = received.clone();
        registry.add_handler(PacketType::Control, move |packet| {
            if let Packet::Control(dems) = packet {
                sink.lock().unwrap().push(*dems);
            }
            Ok(())
        });

        let (server, client) = connected_pair(registry, PacketRegistry::new());

        let mut dems = ControlDems::neutral();
        dems[ThrusterId::FrontLeft] = 1.0;
        dems[ThrusterId::FrontRight] = -1.0;

        client.send(&Packet::Control(dems)).expect("send failed");

        assert!(wait_for(
            || !received.lock().unwrap().is_empty(),
            Duration::from_secs(2)
        ));

        {
            let received = received.lock().unwrap();
            assert_eq!(received.len(), 1);
            assert_eq!(received[0], dems);
        }

        assert!(server.is_open());
        assert!(client.is_open());
    }

    #[test]
    fn test_disconnect_handshake() {
        let (server, client) = connected_pair(PacketRegistry::new(), PacketRegistry::new());

        client.disconnect().expect("disconnect failed");

        assert!(!client.is_open());
        assert!(wait_for(|| !server.is_open(), Duration::from_secs(2)));
    }

    #[test]
    fn test_close_is_idempotent_and_fails_sends() {
        let (server, client) = connected_pair(PacketRegistry::new(), PacketRegistry::new());

        client.close();
        client.close();

        assert!(!client.is_open());
        assert!(matches!(
            client.send(&Packet::Msg(String::from("too late"))),
            Err(NetError::NotOpen)
        ));

        // The peer sees a clean end of stream
        assert!(wait_for(|| !server.is_open(), Duration::from_secs(2)));
    }

    #[test]
    fn test_close_events_fire_once() {
        let events = Arc::new(Mutex::new(Vec::new()));

        let mut registry = PacketRegistry::new();
        let log = events.clone();
        registry.add_event_listener(move |e| log.lock().unwrap().push(e));

        let (server, client) = connected_pair(PacketRegistry::new(), registry);

        client.close();
        client.close();
        drop(client);

        let events = events.lock().unwrap();
        assert_eq!(*events, vec![SockEvent::Opened, SockEvent::Closed]);

        drop(events);
        assert!(wait_for(|| !server.is_open(), Duration::from_secs(2)));
    }

    #[test]
    fn test_unknown_packet_types_are_ignored() {
        let msgs = Arc::new(Mutex::new(Vec::new()));

        let mut registry = PacketRegistry::new();
        let sink = msgs.clone();
        registry.add_handler(PacketType::Msg, move |packet| {
            if let Packet::Msg(s) = packet {
                sink.lock().unwrap().push(s.clone());
            }
            Ok(())
        });

        let (listener, addr) = local_listener();
        let server_thread = thread::spawn(move || {
            NetSock::accept(listener, test_params(), registry).expect("accept failed")
        });

        let mut raw = TcpStream::connect(&addr).expect("raw connect failed");
        let server = server_thread.join().expect("server thread panicked");

        // A frame of unrecognised type 42, then a normal MSG frame
        raw.write_all(&[0x00, 0x00, 0x00, 0x03, 0x00, 0x2a, 0x01, 0x02, 0x03])
            .expect("raw write failed");
        raw.write_all(&frame::encode_frame(&Packet::Msg(String::from("after"))))
            .expect("raw write failed");

        assert!(wait_for(
            || msgs.lock().unwrap().len() == 1,
            Duration::from_secs(2)
        ));
        assert_eq!(msgs.lock().unwrap()[0], "after");

        // The unknown frame was skipped without error
        assert!(server.is_open());
        assert_eq!(server.error_count(), 0);
    }

    #[test]
    fn test_oversize_length_is_fatal() {
        let events = Arc::new(Mutex::new(Vec::new()));

        let mut registry = PacketRegistry::new();
        let log = events.clone();
        registry.add_event_listener(move |e| log.lock().unwrap().push(e));

        let (listener, addr) = local_listener();
        let server_thread = thread::spawn(move || {
            NetSock::accept(listener, test_params(), registry).expect("accept failed")
        });

        let mut raw = TcpStream::connect(&addr).expect("raw connect failed");
        let server = server_thread.join().expect("server thread panicked");

        // Claims a 2000 byte payload against a 1024 byte maximum
        raw.write_all(&[0x00, 0x00, 0x07, 0xd0, 0x00, 0x01])
            .expect("raw write failed");

        assert!(wait_for(|| !server.is_open(), Duration::from_secs(2)));

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![SockEvent::Opened, SockEvent::Errored, SockEvent::Closed]
        );
    }

    #[test]
    fn test_eof_mid_frame_is_fatal() {
        let events = Arc::new(Mutex::new(Vec::new()));

        let mut registry = PacketRegistry::new();
        let log = events.clone();
        registry.add_event_listener(move |e| log.lock().unwrap().push(e));

        let (listener, addr) = local_listener();
        let server_thread = thread::spawn(move || {
            NetSock::accept(listener, test_params(), registry).expect("accept failed")
        });

        let mut raw = TcpStream::connect(&addr).expect("raw connect failed");
        let server = server_thread.join().expect("server thread panicked");

        // Half a header, then hang up
        raw.write_all(&[0x00, 0x00, 0x00]).expect("raw write failed");
        drop(raw);

        assert!(wait_for(|| !server.is_open(), Duration::from_secs(2)));

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![SockEvent::Opened, SockEvent::Errored, SockEvent::Closed]
        );
    }

    #[test]
    fn test_error_threshold_closes_the_link() {
        let (listener, addr) = local_listener();
        let server_thread = thread::spawn(move || {
            NetSock::accept(listener, test_params(), PacketRegistry::new())
                .expect("accept failed")
        });

        let mut raw = TcpStream::connect(&addr).expect("raw connect failed");
        let server = server_thread.join().expect("server thread panicked");

        // Well framed but undecodable: CONTROL payloads must be 36 bytes.
        // The test threshold is 3 consecutive errors.
        let bad_control = [0x00, 0x00, 0x00, 0x02, 0x00, 0x05, 0xaa, 0xbb];
        for _ in 0..3 {
            raw.write_all(&bad_control).expect("raw write failed");
        }

        assert!(wait_for(|| !server.is_open(), Duration::from_secs(2)));
    }

    #[test]
    fn test_error_count_resets_on_success() {
        let (listener, addr) = local_listener();
        let server_thread = thread::spawn(move || {
            NetSock::accept(listener, test_params(), PacketRegistry::new())
                .expect("accept failed")
        });

        let mut raw = TcpStream::connect(&addr).expect("raw connect failed");
        let server = server_thread.join().expect("server thread panicked");

        let bad_control = [0x00, 0x00, 0x00, 0x02, 0x00, 0x05, 0xaa, 0xbb];

        // Two errors, under the threshold of three
        raw.write_all(&bad_control).expect("raw write failed");
        raw.write_all(&bad_control).expect("raw write failed");
        assert!(wait_for(|| server.error_count() == 2, Duration::from_secs(2)));

        // A good packet resets the count
        raw.write_all(&frame::encode_frame(&Packet::None))
            .expect("raw write failed");
        assert!(wait_for(|| server.error_count() == 0, Duration::from_secs(2)));

        // Two more errors still stay under the threshold
        raw.write_all(&bad_control).expect("raw write failed");
        raw.write_all(&bad_control).expect("raw write failed");
        assert!(wait_for(|| server.error_count() == 2, Duration::from_secs(2)));

        assert!(server.is_open());
    }

    #[test]
    fn test_disconnect_timeout_without_ack() {
        let (listener, addr) = local_listener();
        let server_thread = thread::spawn(move || {
            NetSock::accept(listener, test_params(), PacketRegistry::new())
                .expect("accept failed")
        });

        // A raw peer which never acknowledges anything
        let raw = TcpStream::connect(&addr).expect("raw connect failed");
        let server = server_thread.join().expect("server thread panicked");

        let start = Instant::now();
        let result = server.disconnect();

        assert!(matches!(result, Err(NetError::NoDisconnectAck)));
        assert!(start.elapsed() >= Duration::from_millis(900));
        assert!(!server.is_open());

        drop(raw);
    }
}
