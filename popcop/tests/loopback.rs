//! End-to-end exercise of the full stack: standard messages through the
//! emitters, over a noisy byte stream, back through the parser and the
//! message dispatcher.

use popcop::standard::{
    BootloaderState, BootloaderStatusResponseMessage, DeviceManagementCommand,
    DeviceManagementCommandRequestMessage, EndpointInfoMessage, RegisterDataRequestMessage,
    RegisterName, RegisterValue,
};
use popcop::transport::{
    parser_capacity, BufferedEmitter, Parser, ParserOutput, StreamEmitter, FRAME_DELIMITER,
};
use popcop::StandardMessage;

/// Deterministic xorshift32 byte source.
struct ByteSource(u32);

impl ByteSource {
    fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    fn next_byte(&mut self) -> u8 {
        (self.next_u32() >> 24) as u8
    }
}

fn emit_frame(type_code: u8, payload: &[u8]) -> Vec<u8> {
    BufferedEmitter::new(type_code, payload).collect()
}

#[derive(Debug, PartialEq, Eq)]
enum Output {
    Frame(u8, Vec<u8>),
    Extraneous(Vec<u8>),
}

impl Output {
    fn payload(&self) -> &[u8] {
        match self {
            Output::Frame(_, payload) => payload,
            Output::Extraneous(data) => data,
        }
    }
}

/// Feed a byte stream and collect every non-empty parser output as owned data.
fn run_parser<const CAP: usize>(parser: &mut Parser<CAP>, stream: &[u8]) -> Vec<Output> {
    let mut outputs = Vec::new();
    for &byte in stream {
        match parser.process_next_byte(byte) {
            ParserOutput::None => {}
            ParserOutput::Frame(frame) => {
                outputs.push(Output::Frame(frame.type_code, frame.payload.to_vec()));
            }
            ParserOutput::Extraneous(data) => outputs.push(Output::Extraneous(data.to_vec())),
        }
    }
    outputs
}

#[test]
fn message_survives_the_wire() {
    let message = RegisterDataRequestMessage {
        name: RegisterName::try_from("motor.rpm_setpoint").unwrap(),
        value: RegisterValue::String(heapless::String::try_from("3200").unwrap()),
    };
    let encoded = message.encode();

    let mut parser = Parser::<{ parser_capacity(1024) }>::new();
    let outputs = run_parser(&mut parser, &emit_frame(0, &encoded));

    assert_eq!(outputs.len(), 1);
    match &outputs[0] {
        Output::Frame(0, payload) => match StandardMessage::try_decode(payload) {
            Some(StandardMessage::RegisterDataRequest(decoded)) => assert_eq!(decoded, message),
            other => panic!("unexpected dispatch result: {:?}", other),
        },
        other => panic!("unexpected parser output: {:?}", other),
    }
}

#[test]
fn back_to_back_frames_share_delimiters() {
    let first = DeviceManagementCommandRequestMessage {
        command: DeviceManagementCommand::LaunchBootloader,
    };
    let second = BootloaderStatusResponseMessage {
        timestamp_usec: 1_234_567,
        flags: 0,
        state: BootloaderState::ReadyToBoot,
    };

    // Concatenated frames: the boundary carries two delimiters, which must
    // not produce spurious outputs.
    let mut stream = emit_frame(0, &first.encode());
    stream.extend(emit_frame(0, &second.encode()));

    let mut parser = Parser::<{ parser_capacity(1024) }>::new();
    let outputs = run_parser(&mut parser, &stream);

    assert_eq!(outputs.len(), 2);
    assert_eq!(
        StandardMessage::try_decode(outputs[0].payload()),
        Some(StandardMessage::DeviceManagementCommandRequest(first))
    );
    assert_eq!(
        StandardMessage::try_decode(outputs[1].payload()),
        Some(StandardMessage::BootloaderStatusResponse(second))
    );
}

#[test]
fn endpoint_info_roundtrip_through_frame() {
    let mut message = EndpointInfoMessage::response();
    message.software_version.major = 4;
    message.software_version.minor = 2;
    message.mode = popcop::standard::Mode::Bootloader;
    message.endpoint_name = heapless::String::try_from("com.example.esc").unwrap();
    message.globally_unique_id = *b"0123456789abcdef";

    let mut parser = Parser::<{ parser_capacity(1024) }>::new();
    let outputs = run_parser(&mut parser, &emit_frame(7, &message.encode()));

    assert_eq!(outputs.len(), 1);
    match &outputs[0] {
        Output::Frame(7, payload) => {
            let decoded = EndpointInfoMessage::try_decode(payload).unwrap();
            assert_eq!(decoded, message);
        }
        other => panic!("unexpected parser output: {:?}", other),
    }
}

#[test]
fn stream_and_buffered_emitters_agree() {
    let mut source = ByteSource(0xDEAD_BEEF);
    for _ in 0..100 {
        let length = (source.next_u32() % 512) as usize;
        let payload: Vec<u8> = (0..length).map(|_| source.next_byte()).collect();
        let type_code = source.next_byte();

        let buffered = emit_frame(type_code, &payload);

        let mut streamed = Vec::new();
        let mut emitter = StreamEmitter::new(type_code, |byte| streamed.push(byte));
        for &byte in &payload {
            emitter.write(byte);
        }
        emitter.finish();

        assert_eq!(streamed, buffered);
    }
}

#[test]
fn noise_between_frames_is_surfaced_not_lost() {
    let message = DeviceManagementCommandRequestMessage {
        command: DeviceManagementCommand::Restart,
    };
    let mut source = ByteSource(1);

    // Noise run without delimiters, then a valid frame.
    let noise: Vec<u8> = (0..64)
        .map(|_| loop {
            let byte = source.next_byte();
            if byte != FRAME_DELIMITER {
                break byte;
            }
        })
        .collect();
    let mut stream = noise.clone();
    stream.extend(emit_frame(0, &message.encode()));

    let mut parser = Parser::<{ parser_capacity(1024) }>::new();
    let outputs = run_parser(&mut parser, &stream);

    assert_eq!(outputs.len(), 2);
    // The leading delimiter of the frame closed the noise run.
    assert_eq!(outputs[0], Output::Extraneous(noise));
    assert_eq!(
        StandardMessage::try_decode(outputs[1].payload()),
        Some(StandardMessage::DeviceManagementCommandRequest(message))
    );
}

#[test]
fn random_payloads_roundtrip_with_reserved_bytes() {
    let mut source = ByteSource(42);
    let mut parser = Parser::<{ parser_capacity(4096) }>::new();

    for _ in 0..200 {
        let length = (source.next_u32() % 1024) as usize;
        let payload: Vec<u8> = (0..length).map(|_| source.next_byte()).collect();
        let type_code = source.next_byte();

        let outputs = run_parser(&mut parser, &emit_frame(type_code, &payload));
        assert_eq!(outputs, [Output::Frame(type_code, payload)]);
    }
}
