// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Server Certificate Verification
//!
//! Decides whether the certificate chain presented by a server is acceptable.
//! Pins are SHA-256 fingerprints of the DER-encoded leaf certificate, rendered
//! as lowercase hex. Without a pin the chain is validated against a root store.
//!
//! The TLS handshake itself runs with [`DeferredCertVerifier`], which checks
//! handshake signatures but leaves the trust decision to
//! [`CertificateVerifier::verify`] once the handshake has completed.

use std::sync::Arc;

use ring::digest;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::{self, CryptoProvider, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, RootCertStore, SignatureScheme};

use super::config::ServerVerification;
use super::error::TrustError;

/// Length in bytes of a SHA-256 digest.
pub const FINGERPRINT_LEN: usize = 32;

/// Computes the lowercase hex SHA-256 fingerprint of a DER-encoded certificate.
pub fn fingerprint(cert_der: &[u8]) -> String {
    hex::encode(digest::digest(&digest::SHA256, cert_der))
}

/// Why a certificate was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustOutcome {
    /// The leaf digest matched the pinned fingerprint.
    PinMatched,
    /// The chain validated against the root store.
    ChainValid,
}

/// The result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustDecision {
    /// Hex SHA-256 of the leaf certificate.
    pub fingerprint: String,
    pub outcome: TrustOutcome,
}

enum Mode {
    Fingerprint(String),
    TrustStore(Arc<WebPkiServerVerifier>),
}

/// Judges server certificate chains, by pin or by root store.
pub struct CertificateVerifier {
    mode: Mode,
}

impl CertificateVerifier {
    /// Creates a verifier that accepts only the certificate with this digest.
    ///
    /// The pin must be the hex encoding of a SHA-256 digest; case is ignored.
    pub fn pinned(sha256_hex: &str) -> Result<Self, TrustError> {
        let pin = sha256_hex.trim().to_ascii_lowercase();
        match hex::decode(&pin) {
            Ok(bytes) if bytes.len() == FINGERPRINT_LEN => Ok(CertificateVerifier {
                mode: Mode::Fingerprint(pin),
            }),
            _ => Err(TrustError::InvalidPin(sha256_hex.to_string())),
        }
    }

    /// Creates a verifier backed by the bundled Mozilla root store.
    pub fn trust_store() -> Result<Self, TrustError> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Self::with_roots(roots)
    }

    /// Creates a verifier backed by a caller-supplied root store.
    pub fn with_roots(roots: RootCertStore) -> Result<Self, TrustError> {
        let verifier =
            WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider())
                .build()
                .map_err(|e| TrustError::ChainInvalid {
                    domain: String::new(),
                    reason: e.to_string(),
                })?;
        Ok(CertificateVerifier {
            mode: Mode::TrustStore(verifier),
        })
    }

    /// Builds the verifier described by a stream config.
    pub fn from_config(verification: &ServerVerification) -> Result<Self, TrustError> {
        match verification {
            ServerVerification::TrustStore => Self::trust_store(),
            ServerVerification::Fingerprint { sha256 } => Self::pinned(sha256),
        }
    }

    /// Returns true if this verifier pins a fingerprint.
    pub fn is_pinned(&self) -> bool {
        matches!(self.mode, Mode::Fingerprint(_))
    }

    /// Verifies a chain (leaf first) presented by `domain`.
    pub fn verify(
        &self,
        chain: &[CertificateDer<'_>],
        domain: &str,
    ) -> Result<TrustDecision, TrustError> {
        let leaf = chain.first().ok_or(TrustError::NoCertificate)?;
        let got = fingerprint(leaf.as_ref());

        match &self.mode {
            Mode::Fingerprint(want) => {
                if got != *want {
                    return Err(TrustError::FingerprintMismatch {
                        got,
                        want: want.clone(),
                    });
                }
                Ok(TrustDecision {
                    fingerprint: got,
                    outcome: TrustOutcome::PinMatched,
                })
            }
            Mode::TrustStore(webpki) => {
                let chain_invalid = |reason: String| TrustError::ChainInvalid {
                    domain: domain.to_string(),
                    reason,
                };
                let server_name = ServerName::try_from(domain.to_string())
                    .map_err(|e| chain_invalid(e.to_string()))?;
                webpki
                    .verify_server_cert(leaf, &chain[1..], &server_name, &[], UnixTime::now())
                    .map_err(|e| chain_invalid(e.to_string()))?;
                Ok(TrustDecision {
                    fingerprint: got,
                    outcome: TrustOutcome::ChainValid,
                })
            }
        }
    }
}

impl std::fmt::Debug for CertificateVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.mode {
            Mode::Fingerprint(pin) => f.debug_tuple("CertificateVerifier::Pinned").field(pin).finish(),
            Mode::TrustStore(_) => f.write_str("CertificateVerifier::TrustStore"),
        }
    }
}

/// Handshake-time verifier that defers the trust decision.
///
/// Handshake signatures are still checked against the presented leaf, so a
/// peer cannot complete the handshake without the matching private key.
#[derive(Debug)]
pub(crate) struct DeferredCertVerifier {
    algorithms: WebPkiSupportedAlgorithms,
}

impl DeferredCertVerifier {
    pub(crate) fn new() -> Self {
        DeferredCertVerifier {
            algorithms: provider().signature_verification_algorithms,
        }
    }
}

impl ServerCertVerifier for DeferredCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

pub(crate) fn provider() -> Arc<CryptoProvider> {
    Arc::new(crypto::ring::default_provider())
}
