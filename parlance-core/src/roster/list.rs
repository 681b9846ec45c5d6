// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Peer List
//!
//! Peers of one account keyed by bare address. Records are shared as
//! `Arc<Peer>` and replaced whole; only resources change in place.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::Peer;
use crate::jid::{BareJid, Jid};

/// Contact list of one account.
///
/// The list lock is always taken before any peer lock.
#[derive(Debug, Default)]
pub struct PeerList {
    peers: RwLock<HashMap<BareJid, Arc<Peer>>>,
}

impl PeerList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, jid: &BareJid) -> Option<Arc<Peer>> {
        self.peers.read().get(jid).cloned()
    }

    pub fn remove(&self, jid: &BareJid) -> Option<Arc<Peer>> {
        self.peers.write().remove(jid)
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    pub fn clear(&self) {
        self.peers.write().clear();
    }

    /// Adds `peer`, merging it into any existing record with the same address.
    ///
    /// Returns true if the peer was not in the list before.
    pub fn add_or_merge(&self, peer: Peer) -> bool {
        let mut peers = self.peers.write();
        match peers.get(peer.jid()) {
            Some(existing) => {
                let merged = existing.merged(&peer);
                peers.insert(peer.jid().clone(), Arc::new(merged));
                false
            }
            None => {
                peers.insert(peer.jid().clone(), Arc::new(peer));
                true
            }
        }
    }

    /// Adds `peer`, replacing any existing record. Returns true if it was new.
    pub fn add_or_replace(&self, peer: Peer) -> bool {
        let jid = peer.jid().clone();
        self.peers.write().insert(jid, Arc::new(peer)).is_none()
    }

    /// Applies an available presence from `from`.
    ///
    /// Returns true if the peer was unknown or its online state or status
    /// changed.
    pub fn peer_presence_update(
        &self,
        from: &Jid,
        status: &str,
        status_msg: &str,
        belongs_to: &str,
    ) -> bool {
        let mut peers = self.peers.write();
        let bare = from.bare();

        let Some(existing) = peers.get(bare) else {
            let peer = Peer::with_state(
                bare.clone(),
                status,
                status_msg,
                belongs_to,
                from.resource().cloned(),
            );
            peers.insert(bare.clone(), Arc::new(peer));
            debug!(peer = %bare, "presence from unknown peer");
            return true;
        };

        let changed =
            !existing.online || existing.status != status || existing.status_msg != status_msg;

        let mut updated = (**existing).clone();
        updated.status = status.to_string();
        updated.status_msg = status_msg.to_string();
        updated.online = true;
        if updated.belongs_to.is_empty() {
            updated.belongs_to = belongs_to.to_string();
        }
        if let Some(resource) = from.resource() {
            updated.add_resource(resource.clone());
        }
        updated.presence();
        peers.insert(bare.clone(), Arc::new(updated));

        changed
    }

    /// Applies an unavailable presence from `from`.
    ///
    /// A full address removes that resource; a bare address removes all of
    /// them. The peer goes offline once no resources remain. Returns true if
    /// the peer went offline.
    pub fn peer_became_unavailable(&self, from: &Jid) -> bool {
        let mut peers = self.peers.write();
        let bare = from.bare();

        let Some(existing) = peers.get(bare) else {
            return false;
        };

        let mut updated = (**existing).clone();
        match from.resource() {
            Some(resource) => updated.remove_resource(resource),
            None => updated.clear_resources(),
        }
        updated.presence();

        let went_offline = updated.online && !updated.has_resources();
        if went_offline {
            updated.online = false;
            updated.status.clear();
            updated.status_msg.clear();
        }
        peers.insert(bare.clone(), Arc::new(updated));

        went_offline
    }

    /// Records a subscription request from `jid`.
    pub fn subscribe_request(&self, jid: &BareJid, id: &str, belongs_to: &str) {
        self.upsert(
            jid,
            |peer| {
                peer.pending_subscribe_id = id.to_string();
                peer.asked = true;
                if peer.belongs_to.is_empty() {
                    peer.belongs_to = belongs_to.to_string();
                }
            },
            || Peer::with_pending_subscribe(jid.clone(), id, belongs_to),
        );
    }

    /// Clears and returns the pending subscription request id of `jid`.
    pub fn remove_pending_subscribe(&self, jid: &BareJid) -> Option<String> {
        self.update(jid, |peer| {
            let id = std::mem::take(&mut peer.pending_subscribe_id);
            (!id.is_empty()).then_some(id)
        })
        .flatten()
    }

    /// The peer approved our subscription request.
    pub fn subscribed(&self, jid: &BareJid) {
        self.update(jid, |peer| {
            peer.subscription = match peer.subscription.as_str() {
                "from" => "both",
                "both" => "both",
                _ => "to",
            }
            .to_string();
            peer.asked = false;
        });
    }

    /// The peer revoked or denied our subscription.
    pub fn unsubscribed(&self, jid: &BareJid) {
        self.update(jid, |peer| {
            peer.subscription = match peer.subscription.as_str() {
                "both" | "from" => "from",
                _ => "none",
            }
            .to_string();
            peer.asked = false;
        });
    }

    /// Records an error for `jid`, adding the peer if unknown.
    pub fn latest_error(&self, jid: &BareJid, code: &str, kind: &str, detail: &str) {
        self.upsert(
            jid,
            |peer| peer.set_latest_error(code, kind, detail),
            || {
                let mut peer = Peer::new(jid.clone());
                peer.set_latest_error(code, kind, detail);
                peer
            },
        );
    }

    /// Returns all peers, sorted by presentation name and then address.
    pub fn peers(&self) -> Vec<Arc<Peer>> {
        let mut peers: Vec<_> = self.peers.read().values().cloned().collect();
        peers.sort_by_cached_key(|p| (p.name_for_presentation(), p.jid().clone()));
        peers
    }

    /// Returns every group name used by any peer.
    pub fn group_names(&self) -> BTreeSet<String> {
        self.peers
            .read()
            .values()
            .flat_map(|p| p.groups.iter().cloned())
            .collect()
    }

    /// Replaces the record for `jid` with a modified copy.
    fn update<T>(&self, jid: &BareJid, f: impl FnOnce(&mut Peer) -> T) -> Option<T> {
        let mut peers = self.peers.write();
        let existing = peers.get(jid)?;
        let mut updated = (**existing).clone();
        let result = f(&mut updated);
        peers.insert(jid.clone(), Arc::new(updated));
        Some(result)
    }

    /// Modifies the record for `jid`, or inserts a fresh one if absent.
    fn upsert(&self, jid: &BareJid, modify: impl FnOnce(&mut Peer), create: impl FnOnce() -> Peer) {
        let mut peers = self.peers.write();
        let peer = match peers.get(jid) {
            Some(existing) => {
                let mut updated = (**existing).clone();
                modify(&mut updated);
                updated
            }
            None => create(),
        };
        peers.insert(jid.clone(), Arc::new(peer));
    }
}
