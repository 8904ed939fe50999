/// A single OSC argument, tagged by the type tag character it encodes to.
///
/// This is the closed set of OSC 1.0 standard argument types we transmit.
/// Additional tags (bool, nil, timetag) would become new variants here.
#[derive(Clone, Debug, PartialEq)]
pub enum OscArg {
    Int(i32),
    Float(f32),
    Str(String),
    Blob(Vec<u8>),
}

impl OscArg {
    pub fn type_tag(&self) -> char {
        match self {
            OscArg::Int(_) => 'i',
            OscArg::Float(_) => 'f',
            OscArg::Str(_) => 's',
            OscArg::Blob(_) => 'b',
        }
    }
}

/// An address pattern plus its ordered arguments.
///
/// Built per send call and consumed by the encoder; nothing holds on to one
/// after its bytes are produced. The address must be non-empty ASCII starting
/// with `/` and free of NUL bytes; the encoder rejects anything else.
#[derive(Clone, Debug, PartialEq)]
pub struct OscMessage {
    pub addr: String,
    pub args: Vec<OscArg>,
}

impl OscMessage {
    pub fn new(addr: impl Into<String>, args: Vec<OscArg>) -> Self {
        OscMessage {
            addr: addr.into(),
            args,
        }
    }
}
