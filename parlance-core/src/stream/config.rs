// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Stream Configuration
//!
//! Settings that shape a single negotiation: when to upgrade to TLS, how to
//! judge the server certificate and what to do after the upgrade.

use serde::{Deserialize, Serialize};

/// When to perform the STARTTLS upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsPolicy {
    /// Upgrade, and fail if the server does not offer STARTTLS.
    #[default]
    Required,
    /// Upgrade when offered, otherwise continue in plaintext.
    Opportunistic,
    /// Never upgrade, even when offered.
    Disabled,
}

impl TlsPolicy {
    /// Returns true if the upgrade should be requested when offered.
    pub fn wants_upgrade(&self) -> bool {
        !matches!(self, TlsPolicy::Disabled)
    }
}

/// How the server certificate is judged after the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ServerVerification {
    /// Validate the chain against the bundled Mozilla root store.
    #[default]
    TrustStore,
    /// Trust exactly the certificate whose SHA-256 digest matches.
    Fingerprint {
        /// Lowercase (or uppercase) hex SHA-256 of the leaf certificate DER.
        sha256: String,
    },
}

impl ServerVerification {
    /// Pins the leaf certificate by its hex SHA-256 digest.
    pub fn pinned(sha256: &str) -> Self {
        ServerVerification::Fingerprint {
            sha256: sha256.to_string(),
        }
    }
}

/// Login credentials for SASL PLAIN.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration for stream negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// STARTTLS policy.
    pub tls: TlsPolicy,
    /// Server certificate verification mode.
    pub verification: ServerVerification,
    /// Allow SASL PLAIN over an unencrypted stream.
    pub allow_plaintext_auth: bool,
    /// Resource to request when binding; `None` lets the server choose.
    pub resource: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            tls: TlsPolicy::Required,
            verification: ServerVerification::TrustStore,
            allow_plaintext_auth: false,
            resource: None,
        }
    }
}

impl StreamConfig {
    /// Creates a config that pins the server certificate.
    pub fn with_pinned_certificate(sha256: &str) -> Self {
        StreamConfig {
            verification: ServerVerification::pinned(sha256),
            ..Default::default()
        }
    }

    /// Creates a config that never upgrades to TLS.
    ///
    /// Intended for loopback servers and tests.
    pub fn plaintext() -> Self {
        StreamConfig {
            tls: TlsPolicy::Disabled,
            allow_plaintext_auth: true,
            ..Default::default()
        }
    }
}
