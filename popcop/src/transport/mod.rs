//! Transport framing layer
//!
//! Converts between raw link bytes and typed frames. The receive side is a
//! single-byte-at-a-time [`Parser`] that recovers from arbitrary mid-stream
//! noise; the transmit side offers a one-shot [`BufferedEmitter`] and a lazy
//! [`StreamEmitter`] that never holds the payload in memory.

mod crc;
mod emitter;
mod parser;

pub use crc::CrcComputer;
pub use emitter::{BufferedEmitter, StreamEmitter};
pub use parser::{parser_capacity, Frame, Parser, ParserOutput, DEFAULT_PARSER_CAPACITY};

/// Byte marking both ends of a frame. One delimiter may close a frame and
/// open the next at the same time.
pub const FRAME_DELIMITER: u8 = 0x8E;

/// Byte announcing that the next byte travels complemented.
pub const ESCAPE_CHARACTER: u8 = 0x9E;

/// Framing bytes inside the delimiters: type code plus CRC-32C.
pub const FRAME_OVERHEAD: usize = 5;

/// Delivered frame payloads start at an address aligned to this boundary,
/// so receivers may reinterpret them as wider primitives.
pub const PARSER_BUFFER_ALIGNMENT: usize = 8;

fn needs_escaping(byte: u8) -> bool {
    byte == FRAME_DELIMITER || byte == ESCAPE_CHARACTER
}
