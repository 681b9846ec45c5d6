// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for stream::negotiator
//!
//! Each test scripts the server's side of the conversation on a
//! `MockTransport` and checks both the outcome and the bytes the client wrote.

mod common;

use common::fixtures::*;
use common::init_tracing;
use parlance_core::stream::{
    negotiate, Credentials, Frame, MockTransport, Phase, StreamConfig, StreamError,
    StreamNegotiator, TlsPolicy,
};
use parlance_core::TrustError;

fn alice() -> Credentials {
    Credentials::new("alice", "secret")
}

#[test]
fn test_starttls_then_eof_reports_end_of_stream() {
    init_tracing();
    let transport = MockTransport::new([SERVER_HEADER, FEATURES_STARTTLS].concat());
    let server = transport.clone();

    let err = negotiate(transport, "domain", None, &StreamConfig::default()).unwrap_err();

    assert!(matches!(err, StreamError::EndOfStream(Phase::StartTls)));
    assert!(err.is_end_of_stream());
    assert_eq!(
        server.written_string(),
        format!("{}{}", client_header("domain"), STARTTLS_REQUEST)
    );
}

#[test]
fn test_proceed_starts_tls_handshake() {
    init_tracing();
    let transport = MockTransport::new([SERVER_HEADER, FEATURES_STARTTLS, PROCEED].concat());
    let server = transport.clone();

    let err = negotiate(transport, "domain", None, &StreamConfig::default()).unwrap_err();
    assert!(matches!(err, StreamError::EndOfStream(Phase::TlsHandshake)));

    let prefix = format!("{}{}", client_header("domain"), STARTTLS_REQUEST);
    let written = server.written();
    assert!(written.starts_with(prefix.as_bytes()));

    // A TLS handshake record follows the plaintext exchange.
    let record = &written[prefix.len()..];
    assert!(record.len() > 5);
    assert_eq!(record[0], 0x16);
    assert_eq!(record[1], 0x03);
}

#[test]
fn test_starttls_failure_is_rejection() {
    let transport =
        MockTransport::new([SERVER_HEADER, FEATURES_STARTTLS, STARTTLS_FAILURE].concat());
    let err = negotiate(transport, "example.org", None, &StreamConfig::default()).unwrap_err();
    assert!(matches!(err, StreamError::StartTlsRejected));
}

#[test]
fn test_data_after_proceed_is_protocol_error() {
    let transport = MockTransport::new(
        [SERVER_HEADER, FEATURES_STARTTLS, PROCEED, "<message/>"].concat(),
    );
    let err = negotiate(transport, "example.org", None, &StreamConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        StreamError::Protocol {
            phase: Phase::StartTls,
            ..
        }
    ));
}

#[test]
fn test_required_tls_without_offer_fails() {
    let transport = MockTransport::new([SERVER_HEADER, FEATURES_SASL].concat());
    let server = transport.clone();

    let err = negotiate(transport, "example.org", None, &StreamConfig::default()).unwrap_err();

    assert!(matches!(err, StreamError::TlsRequired));
    assert_eq!(server.written_string(), client_header("example.org"));
}

#[test]
fn test_empty_server_reports_end_of_stream_in_header() {
    let transport = MockTransport::new(Vec::new());
    let err = negotiate(transport, "example.org", None, &StreamConfig::default()).unwrap_err();
    assert!(matches!(err, StreamError::EndOfStream(Phase::StreamHeader)));
}

#[test]
fn test_stream_error_is_surfaced() {
    let transport = MockTransport::new([SERVER_HEADER, HOST_UNKNOWN].concat());
    let err = negotiate(transport, "nowhere.example", None, &StreamConfig::default()).unwrap_err();

    match err {
        StreamError::Stream { condition, text } => {
            assert_eq!(condition, "host-unknown");
            assert_eq!(text.as_deref(), Some("unknown host"));
        }
        other => panic!("Expected stream error, got {:?}", other),
    }
}

#[test]
fn test_server_closing_stream_is_end_of_stream() {
    let transport = MockTransport::new([SERVER_HEADER, "</str:stream>"].concat());
    let err = negotiate(transport, "example.org", None, &StreamConfig::default()).unwrap_err();
    assert!(matches!(err, StreamError::EndOfStream(Phase::Features)));
}

#[test]
fn test_invalid_utf8_in_features_is_protocol_error() {
    let mut script = SERVER_HEADER.as_bytes().to_vec();
    script.extend_from_slice(
        b"<str:features><mechanisms xmlns='urn:ietf:params:xml:ns:xmpp-sasl'><mechanism>\xff\xfe</mechanism></mechanisms></str:features>",
    );
    let transport = MockTransport::new(script);

    let err = negotiate(transport, "example.org", None, &StreamConfig::plaintext()).unwrap_err();

    assert!(!err.is_end_of_stream());
    assert!(matches!(
        err,
        StreamError::Protocol {
            phase: Phase::Features,
            ..
        }
    ));
}

#[test]
fn test_split_character_in_features_is_reassembled() {
    let transport = MockTransport::new(
        [
            SERVER_HEADER,
            "<str:features><mechanisms xmlns='urn:ietf:params:xml:ns:xmpp-sasl'><mechanism>PLAIN</mechanism></mechanisms><note>caf\u{e9}</note></str:features>",
        ]
        .concat(),
    )
    .with_max_read(1);

    let stream = negotiate(transport, "example.org", None, &StreamConfig::plaintext()).unwrap();

    assert_eq!(stream.features().child_named("note").unwrap().text, "caf\u{e9}");
}

#[test]
fn test_disabled_policy_ignores_offered_starttls() {
    let transport = MockTransport::new([SERVER_HEADER, FEATURES_STARTTLS_AND_SASL].concat());
    let server = transport.clone();

    let stream = negotiate(transport, "example.org", None, &StreamConfig::plaintext()).unwrap();

    assert!(!stream.is_secure());
    assert!(stream.trust().is_none());
    assert!(!stream.is_authenticated());
    assert!(stream
        .features()
        .child("mechanisms", "urn:ietf:params:xml:ns:xmpp-sasl")
        .is_some());
    assert!(!server.written_string().contains("starttls"));
}

#[test]
fn test_plaintext_login_binds_resource() {
    init_tracing();
    let transport = MockTransport::new(plaintext_login_script());
    let server = transport.clone();

    let config = StreamConfig {
        resource: Some("parlance".to_string()),
        ..StreamConfig::plaintext()
    };
    let negotiator = StreamNegotiator::new(config).unwrap();
    let stream = negotiator
        .negotiate(transport, "example.org", Some(&alice()))
        .unwrap();

    assert!(stream.is_authenticated());
    assert_eq!(
        stream.bound_jid().map(|j| j.to_string()).as_deref(),
        Some("alice@example.org/parlance")
    );

    let written = server.written_string();
    assert!(written.contains(&format!(
        "<auth xmlns='urn:ietf:params:xml:ns:xmpp-sasl' mechanism='PLAIN'>{}</auth>",
        ALICE_PLAIN_B64
    )));
    assert!(written.contains("<resource>parlance</resource>"));
    // The stream is restarted after authentication.
    assert_eq!(written.matches(&client_header("example.org")).count(), 2);
}

#[test]
fn test_login_survives_byte_at_a_time_reads() {
    let transport = MockTransport::new(plaintext_login_script()).with_max_read(1);

    let stream = negotiate(
        transport,
        "example.org",
        Some(&alice()),
        &StreamConfig::plaintext(),
    )
    .unwrap();

    assert_eq!(
        stream.bound_jid().unwrap().bare().as_str(),
        "alice@example.org"
    );
}

#[test]
fn test_authentication_failure_reports_condition() {
    let transport = MockTransport::new([SERVER_HEADER, FEATURES_SASL, SASL_FAILURE].concat());
    let err = negotiate(
        transport,
        "example.org",
        Some(&alice()),
        &StreamConfig::plaintext(),
    )
    .unwrap_err();

    match err {
        StreamError::AuthenticationFailed { condition } => assert_eq!(condition, "not-authorized"),
        other => panic!("Expected authentication failure, got {:?}", other),
    }
}

#[test]
fn test_plaintext_auth_refused_by_default() {
    let transport = MockTransport::new([SERVER_HEADER, FEATURES_SASL].concat());
    let server = transport.clone();
    let config = StreamConfig {
        tls: TlsPolicy::Opportunistic,
        ..StreamConfig::default()
    };

    let err = negotiate(transport, "example.org", Some(&alice()), &config).unwrap_err();

    assert!(matches!(err, StreamError::PlaintextAuthRefused));
    assert!(!server.written_string().contains("<auth"));
}

#[test]
fn test_no_supported_mechanism() {
    let transport = MockTransport::new([SERVER_HEADER, FEATURES_SCRAM_ONLY].concat());
    let err = negotiate(
        transport,
        "example.org",
        Some(&alice()),
        &StreamConfig::plaintext(),
    )
    .unwrap_err();
    assert!(matches!(err, StreamError::NoSupportedMechanism));
}

#[test]
fn test_bind_error_is_protocol_error() {
    let transport = MockTransport::new(
        [
            SERVER_HEADER,
            FEATURES_SASL,
            SASL_SUCCESS,
            SERVER_HEADER,
            FEATURES_BIND,
            BIND_CONFLICT,
        ]
        .concat(),
    );
    let err = negotiate(
        transport,
        "example.org",
        Some(&alice()),
        &StreamConfig::plaintext(),
    )
    .unwrap_err();

    match err {
        StreamError::Protocol { phase, detail } => {
            assert_eq!(phase, Phase::Binding);
            assert!(detail.contains("conflict"));
        }
        other => panic!("Expected binding error, got {:?}", other),
    }
}

#[test]
fn test_negotiated_stream_reads_and_closes() {
    let script = [
        plaintext_login_script().as_str(),
        "<message from='bob@example.org/pc' type='chat'><body>hi &amp; bye</body></message>",
    ]
    .concat();
    let transport = MockTransport::new(script);
    let server = transport.clone();

    let mut stream = negotiate(
        transport,
        "example.org",
        Some(&alice()),
        &StreamConfig::plaintext(),
    )
    .unwrap();

    match stream.read_frame().unwrap() {
        Frame::Element(message) => {
            assert_eq!(message.name, "message");
            assert_eq!(message.namespace.as_deref(), Some("jabber:client"));
            assert_eq!(message.attr("from"), Some("bob@example.org/pc"));
            assert_eq!(message.child_named("body").unwrap().text, "hi & bye");
        }
        other => panic!("Expected message, got {:?}", other),
    }

    let err = stream.read_frame().unwrap_err();
    assert!(matches!(err, StreamError::EndOfStream(Phase::Session)));

    stream.send("<presence/>").unwrap();
    stream.close().unwrap();

    assert!(server.is_closed());
    assert!(server
        .written_string()
        .ends_with("<presence/></stream:stream>"));
}

#[test]
fn test_invalid_pin_rejected_at_construction() {
    let err = StreamNegotiator::new(StreamConfig::with_pinned_certificate("not-hex")).unwrap_err();
    assert!(matches!(err, StreamError::Trust(TrustError::InvalidPin(_))));
}

#[test]
fn test_config_deserializes_from_json() {
    let json = r#"{
        "tls": "opportunistic",
        "verification": { "mode": "fingerprint", "sha256": "AB" },
        "allow_plaintext_auth": false,
        "resource": "desk"
    }"#;
    let config: StreamConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.tls, TlsPolicy::Opportunistic);
    assert_eq!(config.resource.as_deref(), Some("desk"));
    assert!(format!("{:?}", Credentials::new("alice", "secret")).contains("<redacted>"));
}
