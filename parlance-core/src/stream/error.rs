// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Stream error types.

use std::fmt;

use thiserror::Error;

/// Negotiation phase, carried by protocol errors for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    StreamHeader,
    Features,
    StartTls,
    TlsHandshake,
    Authentication,
    Binding,
    /// After negotiation, while exchanging stanzas.
    Session,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::StreamHeader => "stream header",
            Phase::Features => "features",
            Phase::StartTls => "starttls",
            Phase::TlsHandshake => "tls handshake",
            Phase::Authentication => "authentication",
            Phase::Binding => "resource binding",
            Phase::Session => "session",
        };
        f.write_str(name)
    }
}

/// Certificate trust failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustError {
    /// The leaf certificate digest differs from the pinned fingerprint.
    #[error("tls: server certificate does not match expected hash (got: {got}, want: {want})")]
    FingerprintMismatch { got: String, want: String },

    /// Chain validation against the trust anchors failed.
    #[error("tls: failed to verify certificate chain for {domain}: {reason}")]
    ChainInvalid { domain: String, reason: String },

    /// The server presented no certificate.
    #[error("tls: server presented no certificate")]
    NoCertificate,

    /// The pinned fingerprint is not a SHA-256 hex string.
    #[error("tls: pinned fingerprint is not valid hex: {0}")]
    InvalidPin(String),
}

/// Errors raised while negotiating a stream.
#[derive(Error, Debug)]
pub enum StreamError {
    /// The peer closed the connection.
    #[error("end of stream during {0}")]
    EndOfStream(Phase),

    #[error("i/o error during {phase}: {source}")]
    Io {
        phase: Phase,
        #[source]
        source: std::io::Error,
    },

    /// Malformed or unexpected stream content.
    #[error("protocol error during {phase}: {detail}")]
    Protocol { phase: Phase, detail: String },

    /// The server sent `<stream:error>`.
    #[error("stream error: {condition}")]
    Stream {
        condition: String,
        text: Option<String>,
    },

    /// TLS is required but the server does not offer it.
    #[error("server does not offer starttls but tls is required")]
    TlsRequired,

    /// The server answered `<starttls/>` with `<failure/>`.
    #[error("server refused starttls")]
    StartTlsRejected,

    #[error("tls error: {0}")]
    Tls(String),

    #[error(transparent)]
    Trust(#[from] TrustError),

    #[error("authentication failed: {condition}")]
    AuthenticationFailed { condition: String },

    #[error("server offers no supported authentication mechanism")]
    NoSupportedMechanism,

    /// Credentials would be sent over an unencrypted stream.
    #[error("refusing to authenticate over an unencrypted stream")]
    PlaintextAuthRefused,

    #[error("invalid domain name: {0}")]
    InvalidDomain(String),
}

impl StreamError {
    /// Returns true if the peer closed the connection.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, StreamError::EndOfStream(_))
    }

    pub(crate) fn protocol(phase: Phase, detail: impl Into<String>) -> Self {
        StreamError::Protocol {
            phase,
            detail: detail.into(),
        }
    }

    /// Maps an I/O error, folding clean closes into end-of-stream.
    pub(crate) fn io(phase: Phase, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe => StreamError::EndOfStream(phase),
            _ => StreamError::Io { phase, source },
        }
    }
}

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;
