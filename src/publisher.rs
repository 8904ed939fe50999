//! Rate-limited OSC publishing over a datagram transport.
//!
//! A [`Publisher`] owns one destination and paces every send: if the previous
//! successful send was less than the configured interval ago, the call blocks
//! until the interval has elapsed. Pacing is not queuing; each call waits on
//! its own behalf and nothing is buffered.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use derive_more::{Display, Error, From};

use crate::osc::encoder::{self, EncodingError};
use crate::osc::message::{OscArg, OscMessage};
use crate::traits::Transport;

/// Construction failed; no publisher exists afterwards.
#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("0 is not a valid destination port")]
    BadPort,
    #[display("could not resolve {host:?}: {source}")]
    Resolve { host: String, source: io::Error },
    #[display("could not open UDP socket: {source}")]
    Socket { source: io::Error },
}

/// The datagram write failed. The publisher stays usable and the failed call
/// does not count against pacing.
#[derive(Debug, Display, Error, From)]
#[display("datagram send failed: {source}")]
pub struct TransportError {
    pub source: io::Error,
}

/// Everything [`Publisher::send`] can fail with.
#[derive(Debug, Display, Error, From)]
pub enum SendError {
    #[display("{_0}")]
    Encoding(EncodingError),
    #[display("{_0}")]
    Transport(TransportError),
    #[display("cancelled while waiting out the send interval")]
    Cancelled,
}

/// A connected UDP socket bound to an ephemeral local port in the
/// destination's address family.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub fn connect(host: &str, port: u16) -> Result<Self, ConfigError> {
        if port == 0 {
            return Err(ConfigError::BadPort);
        }
        let dest = resolve(host, port)?;
        let socket = match dest {
            SocketAddr::V4(_) => UdpSocket::bind("0.0.0.0:0"),
            SocketAddr::V6(_) => UdpSocket::bind("[::]:0"),
        }
        .map_err(|source| ConfigError::Socket { source })?;
        socket
            .connect(dest)
            .map_err(|source| ConfigError::Socket { source })?;
        Ok(UdpTransport { socket })
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    let mut addrs = (host, port).to_socket_addrs().map_err(|source| ConfigError::Resolve {
        host: host.to_string(),
        source,
    })?;
    addrs.next().ok_or_else(|| ConfigError::Resolve {
        host: host.to_string(),
        source: io::Error::new(io::ErrorKind::AddrNotAvailable, "no addresses returned"),
    })
}

impl Transport for UdpTransport {
    fn send_datagram(&mut self, payload: &[u8]) -> io::Result<()> {
        // UDP never splits a datagram, so a successful send wrote everything.
        self.socket.send(payload).map(drop)
    }
}

/// Aborts a pending pacing wait on the publisher it came from.
///
/// Cancellation is a one-shot latch: firing it while no send is waiting
/// cancels the next pacing wait instead. Sends that need no wait are not
/// affected.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Sender<()>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // A full queue means a cancel is already pending; dropping this one
        // is equivalent.
        let _ = self.tx.try_send(());
    }
}

/// Owns one destination and guarantees a calling loop cannot exceed the
/// configured message rate.
///
/// `send` takes `&mut self`, so exclusive access across the
/// pace-transmit-record sequence is enforced by the borrow checker rather
/// than a runtime lock. Callers sharing a publisher between threads wrap it
/// in a `Mutex`, which serializes sends in lock acquisition order. Publishers
/// are independent of each other.
pub struct Publisher<T: Transport = UdpTransport> {
    transport: T,
    min_interval: Duration,
    last_send: Option<Instant>,
    cancel_tx: Sender<()>,
    cancel_rx: Receiver<()>,
}

impl Publisher<UdpTransport> {
    /// Resolve the destination eagerly and open the socket.
    pub fn new(host: &str, port: u16, min_interval: Duration) -> Result<Self, ConfigError> {
        Ok(Self::with_transport(
            UdpTransport::connect(host, port)?,
            min_interval,
        ))
    }
}

impl<T: Transport> Publisher<T> {
    /// Build a publisher around an already-open transport. Tests use this to
    /// inject transports that fail on demand.
    pub fn with_transport(transport: T, min_interval: Duration) -> Self {
        let (cancel_tx, cancel_rx) = bounded(1);
        Publisher {
            transport,
            min_interval,
            last_send: None,
            cancel_tx,
            cancel_rx,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel_tx.clone(),
        }
    }

    /// Encode one message and transmit it as a single datagram, first waiting
    /// out the minimum interval since the last successful send.
    ///
    /// An encoding error propagates before anything touches the network or
    /// the pacing clock. A transport error leaves the pacing clock on the
    /// last *successful* send, so the next attempt is not delayed twice.
    pub fn send(&mut self, addr: &str, args: Vec<OscArg>) -> Result<(), SendError> {
        let payload = encoder::encode(&OscMessage::new(addr, args))?;
        self.pace()?;
        self.transport
            .send_datagram(&payload)
            .map_err(TransportError::from)?;
        self.last_send = Some(Instant::now());
        Ok(())
    }

    /// Block until `min_interval` has elapsed since the last successful send,
    /// or a cancel handle fires.
    fn pace(&mut self) -> Result<(), SendError> {
        let Some(last) = self.last_send else {
            return Ok(());
        };
        loop {
            let elapsed = last.elapsed();
            if elapsed >= self.min_interval {
                return Ok(());
            }
            match self.cancel_rx.recv_timeout(self.min_interval - elapsed) {
                Ok(()) => return Err(SendError::Cancelled),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    unreachable!("publisher holds its own cancel sender")
                }
            }
        }
    }
}
