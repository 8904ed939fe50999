// Integration tests for the rate-limited publisher
//
// These tests cover pacing (the minimum interval between consecutive sends),
// the error taxonomy, cancellation of an in-flight pacing wait, and actual
// delivery over a loopback UDP socket. Timing assertions use generous margins
// so they hold on a loaded machine.

use std::collections::VecDeque;
use std::io;
use std::net::UdpSocket;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use assert2::{assert, check};

use futar_rust::osc::{OscArg, OscMessage, encode};
use futar_rust::publisher::{ConfigError, Publisher, SendError};
use futar_rust::traits::Transport;

/// Transport double: records every datagram, fails when told to.
struct ScriptedTransport {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    failures: Arc<Mutex<VecDeque<io::Error>>>,
}

/// Returns the transport plus shared handles to its log and failure queue.
#[allow(clippy::type_complexity)]
fn scripted() -> (
    ScriptedTransport,
    Arc<Mutex<Vec<Vec<u8>>>>,
    Arc<Mutex<VecDeque<io::Error>>>,
) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let failures = Arc::new(Mutex::new(VecDeque::new()));
    let transport = ScriptedTransport {
        sent: sent.clone(),
        failures: failures.clone(),
    };
    (transport, sent, failures)
}

impl Transport for ScriptedTransport {
    fn send_datagram(&mut self, payload: &[u8]) -> io::Result<()> {
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.sent.lock().unwrap().push(payload.to_vec());
        Ok(())
    }
}

#[test]
fn delivers_encoded_bytes_over_loopback() {
    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    receiver
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let port = receiver.local_addr().unwrap().port();

    let mut publisher = Publisher::new("127.0.0.1", port, Duration::from_millis(0)).unwrap();
    publisher
        .send("/track/2/volume", vec![OscArg::Int(123)])
        .unwrap();

    let mut buf = [0u8; 1024];
    let (len, _) = receiver.recv_from(&mut buf).unwrap();
    let expected = encode(&OscMessage::new("/track/2/volume", vec![OscArg::Int(123)])).unwrap();
    assert!(buf[..len] == expected[..]);
}

#[test]
fn first_send_is_not_delayed() {
    let (transport, _sent, _failures) = scripted();
    let mut publisher = Publisher::with_transport(transport, Duration::from_millis(500));

    let start = Instant::now();
    publisher.send("/first", vec![OscArg::Int(1)]).unwrap();
    check!(start.elapsed() < Duration::from_millis(400));
}

#[test]
fn consecutive_sends_are_paced() {
    let (transport, sent, _failures) = scripted();
    let mut publisher = Publisher::with_transport(transport, Duration::from_millis(500));

    let start = Instant::now();
    publisher.send("/pace", vec![OscArg::Int(1)]).unwrap();
    publisher.send("/pace", vec![OscArg::Int(2)]).unwrap();

    // The second call must wait out the full interval after the first.
    check!(start.elapsed() >= Duration::from_millis(500));
    check!(sent.lock().unwrap().len() == 2);
}

#[test]
fn transport_failure_does_not_move_the_pacing_clock() {
    let (transport, sent, failures) = scripted();
    let mut publisher = Publisher::with_transport(transport, Duration::from_millis(400));

    publisher.send("/t", vec![OscArg::Int(1)]).unwrap();

    failures
        .lock()
        .unwrap()
        .push_back(io::Error::new(io::ErrorKind::Other, "network unreachable"));
    let result = publisher.send("/t", vec![OscArg::Int(2)]);
    assert!(let Err(SendError::Transport(_)) = result);

    // The failed attempt already waited out the interval relative to the
    // first send, and it must not count as a send itself: the retry goes
    // through immediately instead of waiting another 400 ms.
    let start = Instant::now();
    publisher.send("/t", vec![OscArg::Int(3)]).unwrap();
    check!(start.elapsed() < Duration::from_millis(200));
    check!(sent.lock().unwrap().len() == 2);
}

#[test]
fn encoding_failure_sends_nothing_and_does_not_pace() {
    let (transport, sent, _failures) = scripted();
    let mut publisher = Publisher::with_transport(transport, Duration::from_millis(500));

    publisher.send("/ok", vec![OscArg::Int(1)]).unwrap();

    // The bad message is rejected before pacing, so it returns immediately.
    let start = Instant::now();
    let result = publisher.send("no/leading/slash", vec![OscArg::Int(2)]);
    assert!(let Err(SendError::Encoding(_)) = result);
    check!(start.elapsed() < Duration::from_millis(200));
    check!(sent.lock().unwrap().len() == 1);
}

#[test]
fn cancel_aborts_a_pacing_wait_without_sending() {
    let (transport, sent, _failures) = scripted();
    let mut publisher = Publisher::with_transport(transport, Duration::from_secs(5));

    publisher.send("/c", vec![OscArg::Int(1)]).unwrap();

    let handle = publisher.cancel_handle();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        handle.cancel();
    });

    let start = Instant::now();
    let result = publisher.send("/c", vec![OscArg::Int(2)]);
    canceller.join().unwrap();

    assert!(let Err(SendError::Cancelled) = result);
    check!(start.elapsed() < Duration::from_secs(2));
    check!(sent.lock().unwrap().len() == 1);
}

#[test]
fn rejects_port_zero() {
    let result = Publisher::new("127.0.0.1", 0, Duration::from_millis(500));
    assert!(let Err(ConfigError::BadPort) = result);
}

#[test]
fn rejects_host_that_cannot_resolve() {
    let result = Publisher::new("", 9000, Duration::from_millis(500));
    assert!(let Err(ConfigError::Resolve { .. }) = result);
}
