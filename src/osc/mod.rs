pub mod encoder;
pub mod message;

pub use encoder::{EncodingError, encode};
pub use message::{OscArg, OscMessage};
