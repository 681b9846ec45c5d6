// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Conversation Module
//!
//! Tracks which contacts have an encrypted conversation and who receives the
//! termination notices when it ends. The encryption engine itself is supplied
//! through [`ConversationBuilder`] and [`Conversation`]; delivery goes through
//! [`Sender`].

mod manager;

pub use manager::{ConversationManager, TerminationFailure, TerminationReport};

use thiserror::Error;

use crate::jid::{BareJid, Resource};

/// Delivery failures reported by a [`Sender`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("not connected")]
    NotConnected,

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Failures raised by the encryption engine while ending a conversation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("conversation error: {0}")]
pub struct ConversationError(pub String);

/// Encrypted-session state for one contact.
///
/// Implementations use interior mutability; the manager shares them behind
/// an `Arc` with every resource of the contact.
pub trait Conversation: Send + Sync {
    /// Returns true once the conversation has reached the encrypted state.
    fn is_encrypted(&self) -> bool;

    /// Ends the conversation, returning the protocol messages that notify the
    /// peer. An unencrypted conversation returns no messages.
    fn end(&self) -> Result<Vec<String>, ConversationError>;
}

/// Creates fresh conversation state for a contact.
pub trait ConversationBuilder: Send + Sync {
    type Conversation: Conversation;

    fn new_conversation(&self, peer: &BareJid) -> Self::Conversation;
}

/// Delivers a message to one resource of a contact.
pub trait Sender: Send + Sync {
    /// `resource` is `None` when no specific client instance is known.
    fn send(
        &self,
        peer: &BareJid,
        resource: Option<&Resource>,
        message: &str,
    ) -> Result<(), DeliveryError>;
}
