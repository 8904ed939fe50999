//! Paced OSC message publishing over UDP.
//!
//! [`osc`] serializes typed messages into the OSC 1.0 binary wire format.
//! [`publisher`] owns a destination socket and guarantees a minimum interval
//! between consecutive sends, so a calling loop cannot flood the receiver no
//! matter how fast it runs.

pub mod osc;
pub mod publisher;
pub mod traits;
