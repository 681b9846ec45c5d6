// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Roster Peer
//!
//! Everything known about one contact of an account, reconciled from the
//! local cache, roster pushes and presence.

use std::collections::BTreeSet;

use parking_lot::RwLock;

use super::{RosterEntry, RosterError};
use crate::jid::{BareJid, Jid, Resource};

/// The last error reported for a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerError {
    pub code: String,
    pub kind: String,
    pub detail: String,
}

#[derive(Debug, Clone, Default)]
struct Routing {
    resources: BTreeSet<Resource>,
    /// Most recently seen resource; a hint for where to send messages.
    locked: Option<Resource>,
}

/// A contact of an account.
///
/// Records from different sources are combined with [`Peer::merge_with`],
/// which builds a new record rather than mutating either input. Only the
/// online resources and the routing hint change in place, behind a per-peer
/// lock.
#[derive(Debug)]
pub struct Peer {
    jid: BareJid,
    pub subscription: String,
    /// Name from the server roster.
    pub name: String,
    /// Locally assigned name.
    pub nickname: String,
    pub groups: BTreeSet<String>,
    pub status: String,
    pub status_msg: String,
    pub online: bool,
    /// A subscription request involving this peer is outstanding.
    pub asked: bool,
    pub pending_subscribe_id: String,
    /// The account this peer belongs to.
    pub belongs_to: String,
    pub latest_error: Option<PeerError>,
    /// True if `groups` was set deliberately rather than defaulted from the server.
    pub has_config_data: bool,
    routing: RwLock<Routing>,
}

impl Peer {
    /// Creates an empty record for `jid`.
    pub fn new(jid: BareJid) -> Self {
        Peer {
            jid,
            subscription: String::new(),
            name: String::new(),
            nickname: String::new(),
            groups: BTreeSet::new(),
            status: String::new(),
            status_msg: String::new(),
            online: false,
            asked: false,
            pending_subscribe_id: String::new(),
            belongs_to: String::new(),
            latest_error: None,
            has_config_data: false,
            routing: RwLock::new(Routing::default()),
        }
    }

    /// Creates a peer from a roster entry and locally cached data.
    ///
    /// Non-empty local groups take precedence over the entry's groups and mark
    /// the record as carrying config data.
    pub fn from_entry(
        entry: &RosterEntry,
        belongs_to: &str,
        nickname: &str,
        local_groups: &[String],
    ) -> Result<Self, RosterError> {
        let jid = BareJid::parse(&entry.jid)?;
        let groups = if local_groups.is_empty() {
            &entry.groups
        } else {
            local_groups
        };

        let mut peer = Peer::new(jid);
        peer.subscription = entry.subscription.clone();
        peer.name = entry.name.clone();
        peer.nickname = nickname.to_string();
        peer.groups = groups.iter().cloned().collect();
        peer.has_config_data = !local_groups.is_empty();
        peer.belongs_to = belongs_to.to_string();
        peer.asked = entry.ask == "subscribe";
        Ok(peer)
    }

    /// Creates an online peer from a presence.
    pub fn with_state(
        jid: BareJid,
        status: &str,
        status_msg: &str,
        belongs_to: &str,
        resource: Option<Resource>,
    ) -> Self {
        let mut peer = Peer::new(jid);
        peer.status = status.to_string();
        peer.status_msg = status_msg.to_string();
        peer.online = true;
        peer.belongs_to = belongs_to.to_string();
        if let Some(resource) = resource {
            peer.add_resource(resource);
        }
        peer
    }

    /// Creates a peer that has asked to subscribe to our presence.
    pub fn with_pending_subscribe(jid: BareJid, id: &str, belongs_to: &str) -> Self {
        let mut peer = Peer::new(jid);
        peer.pending_subscribe_id = id.to_string();
        peer.belongs_to = belongs_to.to_string();
        peer.asked = true;
        peer
    }

    pub fn jid(&self) -> &BareJid {
        &self.jid
    }

    /// Projects this peer back into a roster entry.
    pub fn to_entry(&self) -> RosterEntry {
        RosterEntry {
            jid: self.jid.to_string(),
            subscription: self.subscription.clone(),
            name: self.name.clone(),
            ask: if self.asked {
                "subscribe".to_string()
            } else {
                String::new()
            },
            groups: self.groups.iter().cloned().collect(),
        }
    }

    /// Combines this record with `incoming`, which takes precedence.
    ///
    /// Non-empty incoming scalars win, online is or-ed, `asked` follows the
    /// incoming record and resources are unioned. Deliberately configured
    /// local groups are never replaced, and neither are local groups when
    /// the incoming record has none.
    pub fn merge_with(&self, incoming: &Peer) -> Result<Peer, RosterError> {
        if self.jid != incoming.jid {
            return Err(RosterError::IdentityMismatch {
                local: self.jid.clone(),
                incoming: incoming.jid.clone(),
            });
        }
        Ok(self.merged(incoming))
    }

    /// Merge without the identity check, for callers keyed by `self.jid`.
    pub(crate) fn merged(&self, incoming: &Peer) -> Peer {
        let (groups, has_config_data) = if self.has_config_data || incoming.groups.is_empty() {
            (self.groups.clone(), self.has_config_data)
        } else {
            (incoming.groups.clone(), incoming.has_config_data)
        };

        // Snapshot one peer at a time; never hold two peer locks together.
        let mut routing = self.routing.read().clone();
        let incoming_resources = incoming.routing.read().resources.clone();
        routing.resources.extend(incoming_resources);

        Peer {
            jid: self.jid.clone(),
            subscription: prefer(&self.subscription, &incoming.subscription),
            name: prefer(&self.name, &incoming.name),
            nickname: prefer(&self.nickname, &incoming.nickname),
            groups,
            status: prefer(&self.status, &incoming.status),
            status_msg: prefer(&self.status_msg, &incoming.status_msg),
            online: self.online || incoming.online,
            asked: incoming.asked,
            pending_subscribe_id: prefer(&self.pending_subscribe_id, &incoming.pending_subscribe_id),
            belongs_to: prefer(&self.belongs_to, &incoming.belongs_to),
            latest_error: incoming
                .latest_error
                .clone()
                .or_else(|| self.latest_error.clone()),
            has_config_data,
            routing: RwLock::new(routing),
        }
    }

    /// Returns the name, else the nickname, else the address.
    pub fn name_for_presentation(&self) -> String {
        if !self.name.is_empty() {
            self.name.clone()
        } else if !self.nickname.is_empty() {
            self.nickname.clone()
        } else {
            self.jid.to_string()
        }
    }

    pub fn set_latest_error(&mut self, code: &str, kind: &str, detail: &str) {
        self.latest_error = Some(PeerError {
            code: code.to_string(),
            kind: kind.to_string(),
            detail: detail.to_string(),
        });
    }

    /// Replaces the groups. Does not touch `has_config_data`.
    pub fn set_groups<S: AsRef<str>>(&mut self, groups: &[S]) {
        self.groups = groups.iter().map(|g| g.as_ref().to_string()).collect();
    }

    // === Resources ===

    /// Marks a resource as online. Adding a known resource is a no-op.
    pub fn add_resource(&self, resource: Resource) {
        self.routing.write().resources.insert(resource);
    }

    /// Marks a resource as offline. Removing an unknown resource is a no-op.
    pub fn remove_resource(&self, resource: &Resource) {
        self.routing.write().resources.remove(resource);
    }

    /// Returns a sorted snapshot of the online resources.
    pub fn resources(&self) -> Vec<Resource> {
        self.routing.read().resources.iter().cloned().collect()
    }

    pub fn has_resources(&self) -> bool {
        !self.routing.read().resources.is_empty()
    }

    pub fn clear_resources(&self) {
        self.routing.write().resources.clear();
    }

    // === Routing hint ===

    /// Records that `jid` was just heard from; its resource becomes the
    /// default destination.
    pub fn last_seen(&self, jid: &Jid) {
        self.routing.write().locked = jid.resource().cloned();
    }

    /// Clears the routing hint after any presence change.
    pub fn presence(&self) {
        self.routing.write().locked = None;
    }

    /// Returns the preferred resource, or `None` if none is known.
    pub fn resource_to_use(&self) -> Option<Resource> {
        self.routing.read().locked.clone()
    }

    /// Renders every field, for debugging.
    pub fn dump(&self) -> String {
        let routing = self.routing.read();
        let resources: Vec<&str> = routing.resources.iter().map(Resource::as_str).collect();
        format!(
            "Peer{{{}[{} ({})], subscription='{}', status='{}'('{}') online={}, asked={}, pendingSubscribe='{}', belongsTo='{}', resources={:?}, lockedResource='{}'}}",
            self.jid,
            self.name,
            self.nickname,
            self.subscription,
            self.status,
            self.status_msg,
            self.online,
            self.asked,
            self.pending_subscribe_id,
            self.belongs_to,
            resources,
            routing.locked.as_ref().map(Resource::as_str).unwrap_or(""),
        )
    }
}

impl Clone for Peer {
    fn clone(&self) -> Self {
        Peer {
            jid: self.jid.clone(),
            subscription: self.subscription.clone(),
            name: self.name.clone(),
            nickname: self.nickname.clone(),
            groups: self.groups.clone(),
            status: self.status.clone(),
            status_msg: self.status_msg.clone(),
            online: self.online,
            asked: self.asked,
            pending_subscribe_id: self.pending_subscribe_id.clone(),
            belongs_to: self.belongs_to.clone(),
            latest_error: self.latest_error.clone(),
            has_config_data: self.has_config_data,
            routing: RwLock::new(self.routing.read().clone()),
        }
    }
}

/// Returns `incoming` if non-empty, otherwise `local`.
fn prefer(local: &str, incoming: &str) -> String {
    if incoming.is_empty() {
        local.to_string()
    } else {
        incoming.to_string()
    }
}
