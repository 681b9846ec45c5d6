// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Stream + TLS Layer
//!
//! Opens and secures an XMPP stream to a server.
//!
//! # Architecture
//!
//! - **Transport trait**: the duplex byte stream supplied by the caller
//! - **Framing**: incremental XML reader for stream headers and elements
//! - **Verifier**: certificate pinning or root-store validation
//! - **Negotiator**: header exchange, STARTTLS, SASL PLAIN, resource binding
//!
//! # Example
//!
//! ```ignore
//! use parlance_core::stream::{MockTransport, StreamConfig, StreamNegotiator};
//!
//! let transport = MockTransport::new(server_script);
//! let negotiator = StreamNegotiator::new(StreamConfig::plaintext())?;
//! let stream = negotiator.negotiate(transport, "example.org", None)?;
//! ```

pub mod config;
pub mod error;

#[cfg(feature = "testing")]
pub mod mock;
#[cfg(not(feature = "testing"))]
mod mock;

pub mod negotiator;
pub mod transport;
pub mod verifier;

#[cfg(feature = "testing")]
pub mod xml;
#[cfg(not(feature = "testing"))]
mod xml;

pub use config::{Credentials, ServerVerification, StreamConfig, TlsPolicy};
pub use error::{Phase, StreamError, StreamResult, TrustError};
pub use mock::MockTransport;
pub use negotiator::{negotiate, NegotiatedStream, StreamNegotiator};
pub use transport::{SecureStream, Transport};
pub use verifier::{fingerprint, CertificateVerifier, TrustDecision, TrustOutcome};
pub use xml::{Element, Frame, StreamHeader};
