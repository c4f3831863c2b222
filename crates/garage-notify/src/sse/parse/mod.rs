//! Line-oriented frame decoder for the notification stream.
//!
//! The server writes one JSON notification per `data:` line. The decoder
//! buffers raw bytes across network reads, so a line (or a multi-byte UTF-8
//! character) split between two chunks is reassembled before it is parsed.

pub(crate) mod constants;
pub mod decoder;
pub(crate) mod parser;

pub use decoder::{FrameDecoder, FrameStream};
