// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error Types
//!
//! Unified error type for callers that drive several layers at once.

use thiserror::Error;

use crate::conversation::{ConversationError, DeliveryError};
use crate::jid::JidError;
use crate::roster::RosterError;
use crate::stream::{StreamError, TrustError};

/// Unified error type for Parlance operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An address could not be parsed.
    #[error("address error: {0}")]
    Jid(#[from] JidError),

    /// Stream negotiation failed.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// The server certificate was not trusted.
    #[error("trust error: {0}")]
    Trust(#[from] TrustError),

    /// Roster reconciliation failed.
    #[error("roster error: {0}")]
    Roster(#[from] RosterError),

    /// A message could not be delivered.
    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Conversation(#[from] ConversationError),
}

/// Result type for Parlance operations.
pub type Result<T> = std::result::Result<T, Error>;
