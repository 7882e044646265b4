//! Frame emitters.
//!
//! [`BufferedEmitter`] walks a borrowed payload and hands out one wire byte
//! per call. [`StreamEmitter`] is the lazy counterpart: payload bytes are
//! escaped and forwarded to a sink as they are written, with the CRC
//! computed on the fly, so the payload never has to exist in memory at once.

use super::crc::CrcComputer;
use super::{needs_escaping, ESCAPE_CHARACTER, FRAME_DELIMITER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Payload,
    TypeCode,
    Crc,
    End,
    Done,
}

/// One-shot emitter over a complete payload.
///
/// Emission order: leading delimiter, escaped payload, escaped type code,
/// escaped little-endian CRC-32C of `payload ∥ type_code`, trailing
/// delimiter.
#[derive(Debug, Clone)]
pub struct BufferedEmitter<'a> {
    payload: &'a [u8],
    type_code: u8,
    crc: [u8; 4],
    stage: Stage,
    index: usize,
    /// Complement half of an escape sequence, emitted on the next call.
    pending: Option<u8>,
}

impl<'a> BufferedEmitter<'a> {
    pub fn new(type_code: u8, payload: &'a [u8]) -> Self {
        let mut crc = CrcComputer::new();
        crc.add_all(payload);
        crc.add(type_code);
        Self {
            payload,
            type_code,
            crc: crc.get().to_le_bytes(),
            stage: Stage::Start,
            index: 0,
            pending: None,
        }
    }

    /// True once the trailing delimiter has been produced.
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Produce the next wire byte.
    ///
    /// Once finished, further calls keep returning the delimiter, which is
    /// harmless on the wire.
    pub fn next_byte(&mut self) -> u8 {
        if let Some(complement) = self.pending.take() {
            self.advance();
            return complement;
        }
        match self.stage {
            Stage::Start => {
                self.advance();
                FRAME_DELIMITER
            }
            Stage::Payload => self.emit(self.payload[self.index]),
            Stage::TypeCode => self.emit(self.type_code),
            Stage::Crc => self.emit(self.crc[self.index]),
            Stage::End | Stage::Done => {
                self.stage = Stage::Done;
                FRAME_DELIMITER
            }
        }
    }

    fn emit(&mut self, byte: u8) -> u8 {
        if needs_escaping(byte) {
            self.pending = Some(byte ^ 0xFF);
            ESCAPE_CHARACTER
        } else {
            self.advance();
            byte
        }
    }

    fn advance(&mut self) {
        match self.stage {
            Stage::Start => {
                self.index = 0;
                self.stage = if self.payload.is_empty() {
                    Stage::TypeCode
                } else {
                    Stage::Payload
                };
            }
            Stage::Payload => {
                self.index += 1;
                if self.index == self.payload.len() {
                    self.stage = Stage::TypeCode;
                }
            }
            Stage::TypeCode => {
                self.index = 0;
                self.stage = Stage::Crc;
            }
            Stage::Crc => {
                self.index += 1;
                if self.index == 4 {
                    self.stage = Stage::End;
                }
            }
            Stage::End => self.stage = Stage::Done,
            Stage::Done => {}
        }
    }
}

impl Iterator for BufferedEmitter<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.is_finished() {
            None
        } else {
            Some(self.next_byte())
        }
    }
}

/// Lazy emitter feeding a byte sink.
///
/// The leading delimiter goes out on the first write (or on [`finish`] for
/// an empty payload); [`finish`] appends the escaped type code, the CRC and
/// the trailing delimiter. The sink must not call back into the emitter.
///
/// [`finish`]: StreamEmitter::finish
pub struct StreamEmitter<F: FnMut(u8)> {
    sink: F,
    type_code: u8,
    crc: CrcComputer,
    started: bool,
}

impl<F: FnMut(u8)> StreamEmitter<F> {
    pub fn new(type_code: u8, sink: F) -> Self {
        Self {
            sink,
            type_code,
            crc: CrcComputer::new(),
            started: false,
        }
    }

    /// Append one payload byte to the frame.
    pub fn write(&mut self, byte: u8) {
        self.start_if_needed();
        self.crc.add(byte);
        self.put_escaped(byte);
    }

    /// Append a run of payload bytes.
    pub fn write_all(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write(byte);
        }
    }

    /// Terminate the frame: escaped type code, escaped CRC, delimiter.
    pub fn finish(mut self) {
        self.start_if_needed();
        self.crc.add(self.type_code);
        let type_code = self.type_code;
        self.put_escaped(type_code);
        for byte in self.crc.get().to_le_bytes() {
            self.put_escaped(byte);
        }
        (self.sink)(FRAME_DELIMITER);
    }

    fn start_if_needed(&mut self) {
        if !self.started {
            self.started = true;
            (self.sink)(FRAME_DELIMITER);
        }
    }

    fn put_escaped(&mut self, byte: u8) {
        if needs_escaping(byte) {
            (self.sink)(ESCAPE_CHARACTER);
            (self.sink)(byte ^ 0xFF);
        } else {
            (self.sink)(byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    fn collect_buffered(type_code: u8, payload: &[u8]) -> Vec<u8, 64> {
        BufferedEmitter::new(type_code, payload).collect()
    }

    fn collect_streamed(type_code: u8, payload: &[u8]) -> Vec<u8, 64> {
        let mut wire: Vec<u8, 64> = Vec::new();
        let mut emitter = StreamEmitter::new(type_code, |byte| {
            wire.push(byte).unwrap();
        });
        emitter.write_all(payload);
        emitter.finish();
        wire
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(
            collect_buffered(123, &[]),
            [FRAME_DELIMITER, 123, 0x67, 0xAC, 0x6C, 0xBA, FRAME_DELIMITER]
        );
    }

    #[test]
    fn test_simple_payload() {
        assert_eq!(
            collect_buffered(90, &[42, 12, 34, 56, 78]),
            [
                FRAME_DELIMITER,
                42,
                12,
                34,
                56,
                78,
                90,
                0xCE,
                0x4E,
                0x88,
                0xBC,
                FRAME_DELIMITER
            ]
        );
    }

    #[test]
    fn test_reserved_bytes_are_escaped() {
        assert_eq!(
            collect_buffered(ESCAPE_CHARACTER, &[FRAME_DELIMITER]),
            [
                FRAME_DELIMITER,
                ESCAPE_CHARACTER,
                FRAME_DELIMITER ^ 0xFF,
                ESCAPE_CHARACTER,
                ESCAPE_CHARACTER ^ 0xFF,
                0x91,
                0x5C,
                0xA9,
                0xC0,
                FRAME_DELIMITER
            ]
        );
    }

    #[test]
    fn test_stream_emitter_matches_buffered() {
        let cases: [(u8, &[u8]); 4] = [
            (123, &[]),
            (90, &[42, 12, 34, 56, 78]),
            (ESCAPE_CHARACTER, &[FRAME_DELIMITER]),
            (FRAME_DELIMITER, &[0x8E, 0x9E, 0x00, 0xFF]),
        ];
        for (type_code, payload) in cases {
            assert_eq!(
                collect_streamed(type_code, payload),
                collect_buffered(type_code, payload),
            );
        }
    }

    #[test]
    fn test_finished_emitter_repeats_delimiter() {
        let mut emitter = BufferedEmitter::new(0, &[]);
        while !emitter.is_finished() {
            emitter.next_byte();
        }
        assert_eq!(emitter.next_byte(), FRAME_DELIMITER);
        assert!(emitter.is_finished());
    }
}
