//! Codec Tests
//!
//! Tests for RESP decoding, encoding and the frame buffer.

use bytes::Bytes;
use relaykv::error::DecodeError;
use relaykv::protocol::{
    decode_next, encode_array, encode_bulk, encode_error, encode_integer, encode_null_bulk,
    encode_simple, encode_value, FrameBuffer, ProtocolValue, MAX_DEPTH, MAX_LINE_LEN,
};

fn bulk(text: &str) -> ProtocolValue {
    ProtocolValue::BulkString(Some(Bytes::copy_from_slice(text.as_bytes())))
}

fn assert_malformed(input: &[u8]) {
    match decode_next(input) {
        Err(DecodeError::Malformed(_)) => {}
        other => panic!(
            "expected malformed for {:?}, got {:?}",
            String::from_utf8_lossy(input),
            other
        ),
    }
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_request_array() {
    let input = b"*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n";
    let (value, consumed) = decode_next(input).unwrap();

    assert_eq!(value, ProtocolValue::Array(vec![bulk("ECHO"), bulk("hi")]));
    assert_eq!(consumed, input.len());
}

#[test]
fn test_decode_reports_only_first_frame_consumed() {
    let first = b"*1\r\n$4\r\nPING\r\n";
    let mut input = first.to_vec();
    input.extend_from_slice(b"*1\r\n$4\r\nPING\r\n");

    let (_, consumed) = decode_next(&input).unwrap();
    assert_eq!(consumed, first.len());
}

#[test]
fn test_decode_null_bulk() {
    let (value, consumed) = decode_next(b"$-1\r\n").unwrap();
    assert_eq!(value, ProtocolValue::BulkString(None));
    assert!(value.is_null());
    assert_eq!(consumed, 5);
}

#[test]
fn test_decode_empty_bulk() {
    let (value, _) = decode_next(b"$0\r\n\r\n").unwrap();
    assert_eq!(value, bulk(""));
}

#[test]
fn test_decode_simple_error_and_integer() {
    assert_eq!(
        decode_next(b"+PONG\r\n").unwrap().0,
        ProtocolValue::SimpleString("PONG".to_string())
    );
    assert_eq!(
        decode_next(b"-ERR unknown\r\n").unwrap().0,
        ProtocolValue::Error("ERR unknown".to_string())
    );
    assert_eq!(decode_next(b":-42\r\n").unwrap().0, ProtocolValue::Integer(-42));
}

#[test]
fn test_decode_nested_array() {
    let input = b"*2\r\n*1\r\n:1\r\n$3\r\nabc\r\n";
    let (value, _) = decode_next(input).unwrap();

    assert_eq!(
        value,
        ProtocolValue::Array(vec![
            ProtocolValue::Array(vec![ProtocolValue::Integer(1)]),
            bulk("abc"),
        ])
    );
}

#[test]
fn test_bulk_may_contain_terminator_bytes() {
    let encoded = encode_bulk("line\r\nbreak");
    let (value, consumed) = decode_next(&encoded).unwrap();

    assert_eq!(value, bulk("line\r\nbreak"));
    assert_eq!(consumed, encoded.len());
}

#[test]
fn test_bulk_round_trip() {
    for text in ["", "hello", "with spaces", "héllo wörld", "0123456789"] {
        let encoded = encode_bulk(text);
        let (value, consumed) = decode_next(&encoded).unwrap();
        assert_eq!(value, bulk(text));
        assert_eq!(consumed, encoded.len());
    }
}

// =============================================================================
// Incomplete vs Malformed
// =============================================================================

#[test]
fn test_every_prefix_is_incomplete() {
    let input = b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n";

    for end in 0..input.len() {
        assert_eq!(
            decode_next(&input[..end]),
            Err(DecodeError::Incomplete),
            "prefix of {} bytes",
            end
        );
    }
}

#[test]
fn test_unknown_type_tag_is_malformed() {
    assert_malformed(b"!oops\r\n");
    assert_malformed(b"PING\r\n");
}

#[test]
fn test_bulk_length_mismatch_is_malformed() {
    // Declared 3 bytes, 5 present before the terminator
    assert_malformed(b"$3\r\nhello\r\n");
}

#[test]
fn test_invalid_lengths_are_malformed() {
    assert_malformed(b"$abc\r\n");
    assert_malformed(b"$\r\n");
    assert_malformed(b"$-2\r\n");
    assert_malformed(b"*-5\r\n");
    assert_malformed(b"*x\r\n");
    assert_malformed(b"$999999999999\r\n");
}

#[test]
fn test_malformed_child_fails_whole_array() {
    assert_malformed(b"*2\r\n$4\r\nECHO\r\n?\r\n");
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_deep_nesting_is_malformed() {
    assert_malformed(&b"*1\r\n".repeat(200_000));

    // One level past the limit, even while the frame is still short
    assert_malformed(&b"*1\r\n".repeat(MAX_DEPTH + 1));
}

#[test]
fn test_nesting_at_limit_is_accepted() {
    let mut input = b"*1\r\n".repeat(MAX_DEPTH);
    input.extend_from_slice(b":7\r\n");

    let (mut value, consumed) = decode_next(&input).unwrap();
    assert_eq!(consumed, input.len());
    for _ in 0..MAX_DEPTH {
        value = match value {
            ProtocolValue::Array(mut items) => items.remove(0),
            other => panic!("expected array, got {:?}", other),
        };
    }
    assert_eq!(value, ProtocolValue::Integer(7));
}

#[test]
fn test_unterminated_long_line_is_malformed() {
    let mut simple = vec![b'+'];
    simple.extend(std::iter::repeat(b'a').take(MAX_LINE_LEN + 10));
    assert_malformed(&simple);

    let mut header = vec![b'$'];
    header.extend(std::iter::repeat(b'9').take(MAX_LINE_LEN + 10));
    assert_malformed(&header);
}

#[test]
fn test_line_at_limit_is_still_incomplete() {
    let mut simple = vec![b'+'];
    simple.extend(std::iter::repeat(b'a').take(MAX_LINE_LEN));
    assert_eq!(decode_next(&simple), Err(DecodeError::Incomplete));

    // Terminator split across reads
    simple.push(b'\r');
    assert_eq!(decode_next(&simple), Err(DecodeError::Incomplete));

    simple.push(b'\n');
    let (value, _) = decode_next(&simple).unwrap();
    assert_eq!(value, ProtocolValue::simple("a".repeat(MAX_LINE_LEN)));
}

#[test]
fn test_encode_wire_forms() {
    assert_eq!(encode_bulk("hi"), b"$2\r\nhi\r\n".to_vec());
    assert_eq!(encode_simple("OK"), b"+OK\r\n".to_vec());
    assert_eq!(encode_error("ERR bad"), b"-ERR bad\r\n".to_vec());
    assert_eq!(encode_integer(7), b":7\r\n".to_vec());
}

#[test]
fn test_encode_null_bulk_is_five_bytes() {
    let encoded = encode_null_bulk();
    assert_eq!(encoded, b"$-1\r\n".to_vec());
    assert_eq!(encoded.len(), 5);
    assert_eq!(encode_value(&ProtocolValue::null_bulk()), encoded);
}

#[test]
fn test_encode_array_of_bulks() {
    assert_eq!(
        encode_array(["ECHO", "hi"]),
        b"*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n".to_vec()
    );
    assert_eq!(encode_array(Vec::<String>::new()), b"*0\r\n".to_vec());
}

#[test]
fn test_encode_value_nested() {
    let value = ProtocolValue::Array(vec![
        ProtocolValue::simple("OK"),
        ProtocolValue::Integer(3),
        ProtocolValue::null_bulk(),
    ]);

    assert_eq!(encode_value(&value), b"*3\r\n+OK\r\n:3\r\n$-1\r\n".to_vec());
    assert_eq!(decode_next(&encode_value(&value)).unwrap().0, value);
}

// =============================================================================
// FrameBuffer Tests
// =============================================================================

#[test]
fn test_frame_buffer_waits_for_split_frame() {
    let mut buffer = FrameBuffer::new();

    buffer.extend(b"*2\r\n$4\r\nEC");
    assert_eq!(buffer.next_frame(), Ok(None));

    buffer.extend(b"HO\r\n$2\r\nhi");
    assert_eq!(buffer.next_frame(), Ok(None));

    buffer.extend(b"\r\n");
    assert_eq!(
        buffer.next_frame(),
        Ok(Some(ProtocolValue::Array(vec![bulk("ECHO"), bulk("hi")])))
    );
    assert!(buffer.is_empty());
}

#[test]
fn test_frame_buffer_yields_pipelined_frames_in_order() {
    let mut buffer = FrameBuffer::new();
    buffer.extend(b"+first\r\n+second\r\n+thi");

    assert_eq!(buffer.next_frame(), Ok(Some(ProtocolValue::simple("first"))));
    assert_eq!(buffer.next_frame(), Ok(Some(ProtocolValue::simple("second"))));
    assert_eq!(buffer.next_frame(), Ok(None));
    assert_eq!(buffer.len(), 4);
}

#[test]
fn test_frame_buffer_keeps_bytes_on_malformed_until_discarded() {
    let mut buffer = FrameBuffer::new();
    buffer.extend(b"garbage\r\n");

    assert!(matches!(buffer.next_frame(), Err(DecodeError::Malformed(_))));
    assert_eq!(buffer.len(), 9);

    assert_eq!(buffer.discard_pending(), 9);
    assert_eq!(buffer.next_frame(), Ok(None));
}

#[test]
fn test_frame_buffer_rejects_frame_over_pending_limit() {
    let mut buffer = FrameBuffer::with_limit(16);
    buffer.extend(b"$100\r\nabcdef");
    assert_eq!(buffer.next_frame(), Ok(None));

    buffer.extend(b"ghijklmnop");
    assert!(matches!(buffer.next_frame(), Err(DecodeError::Malformed(_))));

    buffer.discard_pending();
    buffer.extend(b"+OK\r\n");
    assert_eq!(buffer.next_frame(), Ok(Some(ProtocolValue::simple("OK"))));
}

#[test]
fn test_frame_buffer_read_frame_from_reader() {
    let mut reader: &[u8] = b"$5\r\nhello\r\n";
    let mut buffer = FrameBuffer::new();

    assert_eq!(buffer.read_frame(&mut reader).unwrap(), Some(bulk("hello")));
    // Clean end of stream between frames
    assert_eq!(buffer.read_frame(&mut reader).unwrap(), None);
}

#[test]
fn test_frame_buffer_read_frame_truncated_stream() {
    let mut reader: &[u8] = b"$5\r\nhel";
    let mut buffer = FrameBuffer::new();

    assert!(buffer.read_frame(&mut reader).is_err());
}
