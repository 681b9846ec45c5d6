// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Stream Negotiator
//!
//! Opens an XMPP stream over a caller-supplied transport, upgrades it with
//! STARTTLS, verifies the server certificate and optionally authenticates and
//! binds a resource.
//!
//! Negotiation is single-shot: any failure aborts with a typed error, the
//! transport is dropped and no partial stream is returned. Retrying is the
//! caller's decision.

use std::io::{Read, Write};
use std::sync::Arc;

use base64::prelude::*;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, StreamOwned};
use tracing::{debug, info, warn};

use super::config::{Credentials, StreamConfig, TlsPolicy};
use super::error::{Phase, StreamError, StreamResult, TrustError};
use super::transport::{SecureStream, Transport};
use super::verifier::{provider, CertificateVerifier, DeferredCertVerifier, TrustDecision};
use super::xml::{
    self, Element, Frame, FrameReader, NS_BIND, NS_SASL, NS_STREAM, NS_STREAM_ERRORS, NS_TLS,
    STARTTLS_REQUEST,
};
use crate::jid::Jid;

const BIND_ID: &str = "bind_1";

/// A negotiated stream, ready for stanzas.
#[derive(Debug)]
pub struct NegotiatedStream<T: Transport> {
    stream: SecureStream<T>,
    reader: FrameReader,
    features: Element,
    trust: Option<TrustDecision>,
    authenticated: bool,
    bound_jid: Option<Jid>,
}

impl<T: Transport> NegotiatedStream<T> {
    /// Returns true if TLS is active.
    pub fn is_secure(&self) -> bool {
        self.stream.is_secure()
    }

    /// Returns the certificate trust decision made during this negotiation.
    pub fn trust(&self) -> Option<&TrustDecision> {
        self.trust.as_ref()
    }

    /// Returns the features advertised on the final stream.
    pub fn features(&self) -> &Element {
        &self.features
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Returns the full address assigned by resource binding.
    pub fn bound_jid(&self) -> Option<&Jid> {
        self.bound_jid.as_ref()
    }

    /// Writes raw XML to the stream.
    pub fn send(&mut self, xml: &str) -> StreamResult<()> {
        send(&mut self.stream, xml, Phase::Session)
    }

    /// Reads the next frame, continuing from bytes already buffered.
    pub fn read_frame(&mut self) -> StreamResult<Frame> {
        self.reader.read_frame(&mut self.stream, Phase::Session)
    }

    /// Closes the stream and the underlying transport.
    pub fn close(&mut self) -> StreamResult<()> {
        // The peer may have hung up already.
        let _ = send(&mut self.stream, "</stream:stream>", Phase::Session);
        self.stream
            .close()
            .map_err(|e| StreamError::io(Phase::Session, e))
    }

    /// Gives up the stream, for example to negotiate again.
    pub fn into_inner(self) -> SecureStream<T> {
        self.stream
    }
}

/// Negotiates XMPP streams according to a [`StreamConfig`].
///
/// # Example
///
/// ```ignore
/// use std::net::TcpStream;
/// use parlance_core::stream::{Credentials, StreamConfig, StreamNegotiator};
///
/// let negotiator = StreamNegotiator::new(StreamConfig::default())?;
/// let tcp = TcpStream::connect("xmpp.example.org:5222")?;
/// let stream = negotiator.negotiate(tcp, "example.org", Some(&Credentials::new("alice", "secret")))?;
/// assert!(stream.is_secure());
/// ```
pub struct StreamNegotiator {
    config: StreamConfig,
    verifier: CertificateVerifier,
    tls_config: Arc<ClientConfig>,
}

impl StreamNegotiator {
    /// Creates a negotiator, building the verifier the config describes.
    pub fn new(config: StreamConfig) -> StreamResult<Self> {
        let verifier = CertificateVerifier::from_config(&config.verification)?;
        Self::with_verifier(config, verifier)
    }

    /// Creates a negotiator with an explicitly constructed verifier.
    ///
    /// `config.verification` is ignored in favour of `verifier`.
    pub fn with_verifier(config: StreamConfig, verifier: CertificateVerifier) -> StreamResult<Self> {
        let tls_config = ClientConfig::builder_with_provider(provider())
            .with_safe_default_protocol_versions()
            .map_err(|e| StreamError::Tls(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DeferredCertVerifier::new()))
            .with_no_client_auth();

        Ok(StreamNegotiator {
            config,
            verifier,
            tls_config: Arc::new(tls_config),
        })
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Negotiates a stream over a fresh transport.
    ///
    /// With credentials, authenticates using the local part in
    /// `credentials.username` and binds a resource if the server offers it.
    pub fn negotiate<T: Transport>(
        &self,
        transport: T,
        domain: &str,
        credentials: Option<&Credentials>,
    ) -> StreamResult<NegotiatedStream<T>> {
        self.negotiate_stream(SecureStream::plain(transport), domain, credentials)
    }

    /// Negotiates over a stream that may already be secured.
    ///
    /// An already-secured stream is never upgraded a second time.
    pub fn negotiate_stream<T: Transport>(
        &self,
        mut stream: SecureStream<T>,
        domain: &str,
        credentials: Option<&Credentials>,
    ) -> StreamResult<NegotiatedStream<T>> {
        let mut reader = FrameReader::new();
        let mut features = open_stream(&mut stream, &mut reader, domain)?;
        let mut trust = None;

        let offered = features.child("starttls", NS_TLS).is_some();
        if upgrade_required(stream.is_secure(), offered, self.config.tls)? {
            request_starttls(&mut stream, &mut reader)?;
            if reader.has_pending_data() {
                return Err(StreamError::protocol(
                    Phase::StartTls,
                    "unexpected data after <proceed/>",
                ));
            }

            stream = match stream {
                SecureStream::Plain(transport) => {
                    let (tls, decision) = self.handshake(transport, domain)?;
                    trust = Some(decision);
                    SecureStream::Tls(Box::new(tls))
                }
                secured => secured,
            };

            reader.reset();
            features = open_stream(&mut stream, &mut reader, domain)?;
        } else if offered {
            debug!(domain, secure = stream.is_secure(), "skipping starttls");
        }

        let mut negotiated = NegotiatedStream {
            stream,
            reader,
            features,
            trust,
            authenticated: false,
            bound_jid: None,
        };

        if let Some(credentials) = credentials {
            self.authenticate(&mut negotiated, credentials)?;
            // Keep buffered bytes; the new header replaces the namespace scope.
            negotiated.features = open_stream(&mut negotiated.stream, &mut negotiated.reader, domain)?;
            negotiated.authenticated = true;

            if negotiated.features.child("bind", NS_BIND).is_some() {
                let jid = bind(&mut negotiated, self.config.resource.as_deref())?;
                info!(jid = %jid, "resource bound");
                negotiated.bound_jid = Some(jid);
            }
        }

        Ok(negotiated)
    }

    /// Performs the TLS handshake in place and verifies the server certificate.
    fn handshake<T: Transport>(
        &self,
        mut transport: T,
        domain: &str,
    ) -> StreamResult<(StreamOwned<ClientConnection, T>, TrustDecision)> {
        let server_name = ServerName::try_from(domain.to_string())
            .map_err(|_| StreamError::InvalidDomain(domain.to_string()))?;
        let mut conn = ClientConnection::new(self.tls_config.clone(), server_name)
            .map_err(|e| StreamError::Tls(e.to_string()))?;

        while conn.is_handshaking() {
            conn.complete_io(&mut transport).map_err(|e| {
                if e.kind() == std::io::ErrorKind::InvalidData {
                    StreamError::Tls(e.to_string())
                } else {
                    StreamError::io(Phase::TlsHandshake, e)
                }
            })?;
        }

        let chain = conn.peer_certificates().ok_or(TrustError::NoCertificate)?;
        let decision = self.verifier.verify(chain, domain).inspect_err(|e| {
            warn!(domain, error = %e, "server certificate rejected");
        })?;
        info!(domain, fingerprint = %decision.fingerprint, "tls established");

        Ok((StreamOwned::new(conn, transport), decision))
    }

    /// Authenticates with SASL PLAIN.
    fn authenticate<T: Transport>(
        &self,
        negotiated: &mut NegotiatedStream<T>,
        credentials: &Credentials,
    ) -> StreamResult<()> {
        if !negotiated.stream.is_secure() && !self.config.allow_plaintext_auth {
            return Err(StreamError::PlaintextAuthRefused);
        }

        let offers_plain = negotiated
            .features
            .child("mechanisms", NS_SASL)
            .map(|m| {
                m.children
                    .iter()
                    .any(|c| c.name == "mechanism" && c.text.trim() == "PLAIN")
            })
            .unwrap_or(false);
        if !offers_plain {
            return Err(StreamError::NoSupportedMechanism);
        }

        let payload = BASE64_STANDARD.encode(format!(
            "\0{}\0{}",
            credentials.username, credentials.password
        ));
        send(
            &mut negotiated.stream,
            &xml::sasl_auth("PLAIN", &payload),
            Phase::Authentication,
        )?;

        let reply = expect_element(
            &mut negotiated.stream,
            &mut negotiated.reader,
            Phase::Authentication,
        )?;
        if reply.is("success", NS_SASL) {
            debug!(username = %credentials.username, "authenticated");
            Ok(())
        } else if reply.is("failure", NS_SASL) {
            let condition = reply
                .children
                .iter()
                .find(|c| c.name != "text")
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "not-authorized".to_string());
            Err(StreamError::AuthenticationFailed { condition })
        } else {
            Err(unexpected(Phase::Authentication, &reply))
        }
    }
}

impl std::fmt::Debug for StreamNegotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamNegotiator")
            .field("config", &self.config)
            .field("verifier", &self.verifier)
            .finish()
    }
}

/// Negotiates a stream with a one-off negotiator built from `config`.
pub fn negotiate<T: Transport>(
    transport: T,
    domain: &str,
    credentials: Option<&Credentials>,
    config: &StreamConfig,
) -> StreamResult<NegotiatedStream<T>> {
    StreamNegotiator::new(config.clone())?.negotiate(transport, domain, credentials)
}

/// Decides whether to request STARTTLS.
fn upgrade_required(secure: bool, offered: bool, policy: TlsPolicy) -> StreamResult<bool> {
    if secure {
        return Ok(false);
    }
    if offered {
        return Ok(policy.wants_upgrade());
    }
    match policy {
        TlsPolicy::Required => Err(StreamError::TlsRequired),
        _ => Ok(false),
    }
}

/// Sends the stream header and reads the server's header and features.
fn open_stream<S: Read + Write>(
    stream: &mut S,
    reader: &mut FrameReader,
    domain: &str,
) -> StreamResult<Element> {
    send(stream, &xml::stream_header(domain), Phase::StreamHeader)?;

    match reader.read_frame(stream, Phase::StreamHeader)? {
        Frame::StreamOpen(header) => {
            debug!(domain, stream_id = header.id().unwrap_or(""), "stream opened");
        }
        Frame::Element(e) if e.is("error", NS_STREAM) => return Err(stream_error(&e)),
        Frame::Element(e) => return Err(unexpected(Phase::StreamHeader, &e)),
        Frame::StreamClose => return Err(StreamError::EndOfStream(Phase::StreamHeader)),
    }

    let features = expect_element(stream, reader, Phase::Features)?;
    if !features.is("features", NS_STREAM) {
        return Err(unexpected(Phase::Features, &features));
    }
    Ok(features)
}

fn request_starttls<S: Read + Write>(stream: &mut S, reader: &mut FrameReader) -> StreamResult<()> {
    send(stream, STARTTLS_REQUEST, Phase::StartTls)?;

    let reply = expect_element(stream, reader, Phase::StartTls)?;
    if reply.is("proceed", NS_TLS) {
        Ok(())
    } else if reply.is("failure", NS_TLS) {
        Err(StreamError::StartTlsRejected)
    } else {
        Err(unexpected(Phase::StartTls, &reply))
    }
}

fn bind<T: Transport>(
    negotiated: &mut NegotiatedStream<T>,
    resource: Option<&str>,
) -> StreamResult<Jid> {
    send(
        &mut negotiated.stream,
        &xml::bind_request(BIND_ID, resource),
        Phase::Binding,
    )?;

    let reply = expect_element(&mut negotiated.stream, &mut negotiated.reader, Phase::Binding)?;
    if reply.name != "iq" || reply.attr("id") != Some(BIND_ID) {
        return Err(unexpected(Phase::Binding, &reply));
    }

    match reply.attr("type") {
        Some("result") => {
            let jid = reply
                .child("bind", NS_BIND)
                .and_then(|b| b.child("jid", NS_BIND))
                .ok_or_else(|| StreamError::protocol(Phase::Binding, "bind result without <jid>"))?;
            Jid::parse(jid.text.trim()).map_err(|e| StreamError::protocol(Phase::Binding, e.to_string()))
        }
        Some("error") => {
            let condition = reply
                .child_named("error")
                .and_then(|e| e.children.first())
                .map(|c| c.name.as_str())
                .unwrap_or("undefined-condition");
            Err(StreamError::protocol(
                Phase::Binding,
                format!("server refused binding: {}", condition),
            ))
        }
        _ => Err(unexpected(Phase::Binding, &reply)),
    }
}

/// Reads the next top-level element, surfacing stream errors and closes.
fn expect_element<S: Read>(
    stream: &mut S,
    reader: &mut FrameReader,
    phase: Phase,
) -> StreamResult<Element> {
    match reader.read_frame(stream, phase)? {
        Frame::Element(e) if e.is("error", NS_STREAM) => Err(stream_error(&e)),
        Frame::Element(e) => Ok(e),
        Frame::StreamClose => Err(StreamError::EndOfStream(phase)),
        Frame::StreamOpen(_) => Err(StreamError::protocol(phase, "unexpected stream header")),
    }
}

fn send<S: Write>(stream: &mut S, data: &str, phase: Phase) -> StreamResult<()> {
    stream
        .write_all(data.as_bytes())
        .and_then(|_| stream.flush())
        .map_err(|e| StreamError::io(phase, e))
}

fn stream_error(e: &Element) -> StreamError {
    let condition = e
        .children
        .iter()
        .find(|c| c.namespace.as_deref() == Some(NS_STREAM_ERRORS) && c.name != "text")
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "undefined-condition".to_string());
    let text = e
        .child("text", NS_STREAM_ERRORS)
        .map(|t| t.text.clone());
    warn!(condition = %condition, "server sent stream error");
    StreamError::Stream { condition, text }
}

fn unexpected(phase: Phase, e: &Element) -> StreamError {
    StreamError::protocol(
        phase,
        format!(
            "unexpected <{}> in namespace {}",
            e.name,
            e.namespace.as_deref().unwrap_or("(none)")
        ),
    )
}
