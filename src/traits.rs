use std::io;

/// Writes single datagrams to a destination fixed at construction.
///
/// A call either completes or reports a failure; delivery is never
/// guaranteed. The publisher consumes this seam so tests can substitute a
/// transport that fails on demand.
pub trait Transport {
    fn send_datagram(&mut self, payload: &[u8]) -> io::Result<()>;
}
