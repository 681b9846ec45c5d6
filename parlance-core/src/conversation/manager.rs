// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Conversation Manager
//!
//! Owns the map from bare contact address to conversation. At most one
//! conversation exists per bare address, shared by all of its resources.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{Conversation, ConversationBuilder, ConversationError, DeliveryError, Sender};
use crate::jid::{Address, BareJid, Resource};

struct Tracked<C> {
    conversation: Arc<C>,
    /// Best-known resource to address termination notices to.
    resource: Option<Resource>,
}

/// A failure recorded while terminating conversations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationFailure {
    /// The engine failed to produce termination notices.
    Conversation {
        peer: BareJid,
        error: ConversationError,
    },
    /// A termination notice could not be delivered.
    Delivery { peer: BareJid, error: DeliveryError },
}

/// Outcome of a termination pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminationReport {
    /// Peers whose conversations were removed.
    pub terminated: Vec<BareJid>,
    /// Number of notices handed to the sender successfully.
    pub notices_sent: usize,
    pub failures: Vec<TerminationFailure>,
}

impl TerminationReport {
    /// Returns true if every notice was produced and delivered.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Manages the conversations of one account.
///
/// # Example
///
/// ```ignore
/// let manager = ConversationManager::new(engine, sender);
/// let (conversation, created) = manager.ensure_conversation_with(&peer, resource.as_ref());
/// // ...
/// let report = manager.terminate_all();
/// assert!(manager.is_empty());
/// ```
pub struct ConversationManager<B: ConversationBuilder, S: Sender> {
    builder: B,
    sender: S,
    conversations: Mutex<HashMap<BareJid, Tracked<B::Conversation>>>,
}

impl<B: ConversationBuilder, S: Sender> ConversationManager<B, S> {
    pub fn new(builder: B, sender: S) -> Self {
        ConversationManager {
            builder,
            sender,
            conversations: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the conversation with `peer`, creating it if absent.
    ///
    /// The boolean is true only for the call that created the conversation.
    /// `resource` names the client instance that triggered the call and wins
    /// over any resource `peer` carries; when neither names one the previous
    /// destination for termination notices is kept.
    pub fn ensure_conversation_with(
        &self,
        peer: impl Address,
        resource: Option<&Resource>,
    ) -> (Arc<B::Conversation>, bool) {
        let resource = resource.or_else(|| peer.resource());
        let peer = peer.as_ref();
        let mut conversations = self.conversations.lock();

        if let Some(tracked) = conversations.get_mut(peer) {
            if let Some(resource) = resource {
                tracked.resource = Some(resource.clone());
            }
            return (Arc::clone(&tracked.conversation), false);
        }

        let conversation = Arc::new(self.builder.new_conversation(peer));
        conversations.insert(
            peer.clone(),
            Tracked {
                conversation: Arc::clone(&conversation),
                resource: resource.cloned(),
            },
        );
        debug!(peer = %peer, "conversation created");

        (conversation, true)
    }

    /// Returns the conversation with `peer`, if one exists.
    pub fn conversation_with(&self, peer: impl AsRef<BareJid>) -> Option<Arc<B::Conversation>> {
        self.conversations
            .lock()
            .get(peer.as_ref())
            .map(|t| Arc::clone(&t.conversation))
    }

    /// Returns the resource termination notices for `peer` would go to.
    pub fn resource_for(&self, peer: impl AsRef<BareJid>) -> Option<Resource> {
        self.conversations
            .lock()
            .get(peer.as_ref())
            .and_then(|t| t.resource.clone())
    }

    pub fn len(&self) -> usize {
        self.conversations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.lock().is_empty()
    }

    /// Terminates every conversation.
    ///
    /// The map is always empty afterwards; notices that could not be produced
    /// or delivered are listed in the report.
    pub fn terminate_all(&self) -> TerminationReport {
        let drained: Vec<_> = self.conversations.lock().drain().collect();

        let mut report = TerminationReport::default();
        for (peer, tracked) in drained {
            self.finish(peer, tracked, &mut report);
        }

        info!(
            terminated = report.terminated.len(),
            failures = report.failures.len(),
            "conversations terminated"
        );
        report
    }

    /// Terminates the conversation with `peer`, if any.
    pub fn terminate(&self, peer: impl AsRef<BareJid>) -> TerminationReport {
        let removed = self.conversations.lock().remove_entry(peer.as_ref());

        let mut report = TerminationReport::default();
        if let Some((peer, tracked)) = removed {
            self.finish(peer, tracked, &mut report);
        }
        report
    }

    /// Sends termination notices for a conversation already removed from the map.
    fn finish(&self, peer: BareJid, tracked: Tracked<B::Conversation>, report: &mut TerminationReport) {
        let engaged = tracked.conversation.is_encrypted();

        match tracked.conversation.end() {
            Ok(notices) if engaged => {
                for notice in notices {
                    match self.sender.send(&peer, tracked.resource.as_ref(), &notice) {
                        Ok(()) => report.notices_sent += 1,
                        Err(error) => {
                            warn!(peer = %peer, error = %error, "failed to deliver termination notice");
                            report.failures.push(TerminationFailure::Delivery {
                                peer: peer.clone(),
                                error,
                            });
                        }
                    }
                }
            }
            Ok(_) => debug!(peer = %peer, "conversation never engaged, nothing to send"),
            Err(error) => {
                warn!(peer = %peer, error = %error, "failed to end conversation");
                report.failures.push(TerminationFailure::Conversation {
                    peer: peer.clone(),
                    error,
                });
            }
        }

        report.terminated.push(peer);
    }
}
