//! Parlance Core Library
//!
//! Client core for XMPP messaging: stream negotiation with STARTTLS and
//! certificate pinning, per-contact encrypted conversation tracking and
//! roster reconciliation.
//! All TLS and digest operations use `rustls` and `ring`.

pub mod conversation;
pub mod error;
pub mod jid;
pub mod roster;
pub mod stream;

pub use conversation::{
    Conversation, ConversationBuilder, ConversationError, ConversationManager, DeliveryError,
    Sender, TerminationFailure, TerminationReport,
};
pub use error::{Error, Result};
pub use jid::{Address, BareJid, Jid, JidError, Resource};
pub use roster::{Peer, PeerError, PeerList, RosterEntry, RosterError};
pub use stream::{
    negotiate, CertificateVerifier, Credentials, NegotiatedStream, Phase, SecureStream,
    ServerVerification, StreamConfig, StreamError, StreamNegotiator, TlsPolicy, Transport,
    TrustError,
};
