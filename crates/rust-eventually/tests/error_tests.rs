//! Integration tests for error rendering and classification.

use std::time::Duration;

use rust_eventually::{EndOfStream, EventuallyError, TransportError, TransportErrorKind};

#[test]
fn timeout_shows_the_last_observation() {
    let err = EventuallyError::Timeout {
        duration: Duration::from_secs(1),
        attempts: 10,
        description: None,
        buffer: "line one\nline two".to_string(),
    };
    let msg = err.to_string();
    assert!(msg.contains("not satisfied within 1s (10 attempts)"));
    assert!(msg.contains("│ line one"));
    assert!(msg.contains("Tip:"));
    assert!(err.is_timeout());
    assert!(!err.is_contract());
}

#[test]
fn long_buffers_keep_the_tail() {
    let buffer: String = (0..200).map(|i| format!("log line {i}\n")).collect();
    let err = EventuallyError::Timeout {
        duration: Duration::from_millis(500),
        attempts: 5,
        description: None,
        buffer,
    };
    let msg = err.to_string();
    assert!(msg.contains("lines hidden"));
    assert!(msg.contains("log line 199"));
    assert!(!msg.contains("log line 0\n"));
}

#[test]
fn violation_names_the_offender() {
    let err = EventuallyError::PolarityViolated {
        window: Duration::from_millis(500),
        attempt: 5,
        matched: Some("11111".to_string()),
        offset: Some(42),
        description: Some("log rate limit not enforced".to_string()),
        buffer: "11111".to_string(),
    };
    let msg = err.to_string();
    assert!(msg.starts_with("log rate limit not enforced"));
    assert!(msg.contains("attempt 5 of a 500ms window"));
    assert!(msg.contains("'11111' at offset 42"));
    assert!(err.is_violation());
    assert_eq!(err.buffer(), Some("11111"));
}

#[test]
fn stream_ended_shows_reason() {
    let err = EventuallyError::StreamEnded {
        reason: EndOfStream::Failed("connection reset".to_string()),
        buffer: String::new(),
    };
    let msg = err.to_string();
    assert!(msg.contains("failed: connection reset"));
    assert!(msg.contains("(empty buffer)"));
}

#[test]
fn contract_errors() {
    assert!(EventuallyError::pattern_contract("(a)(b)", 2).is_contract());
    assert!(EventuallyError::invalid_config("zero interval").is_contract());
    assert!(!EventuallyError::Cancelled { attempts: 1, elapsed: Duration::ZERO }.is_contract());
}

#[test]
fn transport_error_kinds() {
    let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
    assert_eq!(*TransportError::from(refused).kind(), TransportErrorKind::Unreachable);

    let timed_out = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
    assert_eq!(*TransportError::from(timed_out).kind(), TransportErrorKind::Timeout);

    let status = TransportError::status(502, "bad gateway");
    assert_eq!(status.to_string(), "status 502: bad gateway");

    let plain: TransportError = "oops".into();
    assert_eq!(*plain.kind(), TransportErrorKind::Io);
    assert_eq!(plain.message(), "oops");
}

#[test]
fn transport_errors_convert() {
    let err: EventuallyError = TransportError::unreachable("down").into();
    assert!(matches!(err, EventuallyError::Transport(_)));
    assert_eq!(err.to_string(), "transport error: unreachable: down");
}
