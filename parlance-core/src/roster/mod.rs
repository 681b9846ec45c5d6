// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Roster Module
//!
//! The contact list of an account: per-peer records and the list that
//! reconciles them with roster pushes and presence updates.

mod list;
mod peer;

pub use list::PeerList;
pub use peer::{Peer, PeerError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::jid::{BareJid, JidError};

/// Roster errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("cannot merge peer {incoming} into {local}")]
    IdentityMismatch { local: BareJid, incoming: BareJid },

    #[error("invalid roster address: {0}")]
    InvalidJid(#[from] JidError),
}

/// One item of the server roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterEntry {
    pub jid: String,
    pub subscription: String,
    pub name: String,
    /// `"subscribe"` while our subscription request is pending.
    pub ask: String,
    pub groups: Vec<String>,
}
