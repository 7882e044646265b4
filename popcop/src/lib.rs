//! Popcop: point-to-point serial protocol for embedded devices
//!
//! This crate implements the three layers of the protocol as used over
//! byte-oriented links (typically UART):
//!
//! - **Transport**: escape framing with CRC-32C termination. Frames carry an
//!   opaque payload and a one-byte type code:
//!
//! ```text
//! ┌───────────┬─────────────────┬───────────┬─────────────┬───────────┐
//! │ DELIMITER │ PAYLOAD         │ TYPE CODE │ CRC-32C     │ DELIMITER │
//! │ 0x8E      │ escaped         │ escaped   │ 4B LE, esc. │ 0x8E      │
//! └───────────┴─────────────────┴───────────┴─────────────┴───────────┘
//! ```
//!
//!   Any `0x8E`/`0x9E` between the delimiters travels as `0x9E` followed by
//!   the byte's complement. Adjacent frames may share a delimiter.
//!
//! - **Presentation**: a positional little-endian codec over a linear byte
//!   stream ([`presentation::StreamEncoder`] / [`presentation::StreamDecoder`]).
//!
//! - **Standard messages**: a catalogue of fixed message types identified by
//!   a 16-bit message ID (endpoint info, register exchange, device
//!   management, bootloader image transfer).
//!
//! The crate is synchronous and allocation-free; all buffers are bounded at
//! compile time.
//!
//! # Example
//!
//! ```
//! use popcop::transport::{BufferedEmitter, Parser, ParserOutput};
//!
//! let mut parser = Parser::<1029>::new();
//! let mut emitter = BufferedEmitter::new(90, &[42, 12, 34, 56, 78]);
//!
//! let mut received = false;
//! while !emitter.is_finished() {
//!     if let ParserOutput::Frame(frame) = parser.process_next_byte(emitter.next_byte()) {
//!         assert_eq!(frame.type_code, 90);
//!         assert_eq!(frame.payload, &[42, 12, 34, 56, 78]);
//!         received = true;
//!     }
//! }
//! assert!(received);
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod presentation;
pub mod standard;
pub mod transport;

pub use standard::StandardMessage;
pub use transport::{
    BufferedEmitter, CrcComputer, Frame, Parser, ParserOutput, StreamEmitter, ESCAPE_CHARACTER,
    FRAME_DELIMITER,
};
