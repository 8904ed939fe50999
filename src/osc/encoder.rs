//! OSC 1.0 wire format serialization.
//!
//! An encoded message is three sections back to back:
//!
//! `address (OSC-string) | type tags (OSC-string, ",if...") | payloads`
//!
//! Every section is NUL-padded out to a 4-byte boundary, so the whole packet
//! is always a multiple of 4 bytes long.

use derive_more::{Display, Error};

use crate::osc::message::{OscArg, OscMessage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, Error)]
pub enum EncodingError {
    #[display("address pattern must be non-empty ASCII, start with '/', and contain no NUL")]
    BadAddress,
    #[display("string argument contains an embedded NUL")]
    NulInString,
    #[display("blob argument does not fit the 32-bit length field")]
    BlobTooLarge,
}

/// Serialize `msg` into an OSC 1.0 packet.
///
/// Pure: the result depends only on the input, and an error leaves no partial
/// output behind.
pub fn encode(msg: &OscMessage) -> Result<Vec<u8>, EncodingError> {
    if !is_valid_address(&msg.addr) {
        return Err(EncodingError::BadAddress);
    }
    // Validate arguments up front so we never fail halfway through the buffer.
    for arg in &msg.args {
        match arg {
            OscArg::Str(s) if s.contains('\0') => return Err(EncodingError::NulInString),
            OscArg::Blob(b) if b.len() > i32::MAX as usize => {
                return Err(EncodingError::BlobTooLarge);
            }
            _ => {}
        }
    }

    let mut buf = Vec::new();
    push_osc_str(&mut buf, &msg.addr);

    let mut tags = String::with_capacity(1 + msg.args.len());
    tags.push(',');
    for arg in &msg.args {
        tags.push(arg.type_tag());
    }
    push_osc_str(&mut buf, &tags);

    for arg in &msg.args {
        match arg {
            OscArg::Int(v) => buf.extend_from_slice(&v.to_be_bytes()),
            OscArg::Float(v) => buf.extend_from_slice(&v.to_be_bytes()),
            OscArg::Str(s) => push_osc_str(&mut buf, s),
            OscArg::Blob(b) => push_blob(&mut buf, b),
        }
    }
    Ok(buf)
}

fn is_valid_address(addr: &str) -> bool {
    addr.starts_with('/') && addr.is_ascii() && !addr.contains('\0')
}

/// OSC-string: the bytes, a NUL terminator, then NUL padding to the next
/// 4-byte boundary. A string whose length is already a multiple of 4 still
/// gets four NULs, since the terminator is mandatory.
fn push_osc_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    let pad = 4 - s.len() % 4;
    buf.resize(buf.len() + pad, 0);
}

/// Blob: a big-endian byte count, the raw bytes, then NUL padding so the
/// count field plus data end on a 4-byte boundary. The count covers the data
/// only, not the padding.
fn push_blob(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buf.extend_from_slice(data);
    let pad = (4 - data.len() % 4) % 4;
    buf.resize(buf.len() + pad, 0);
}
