// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Recording fakes for the conversation seams.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use parlance_core::{
    BareJid, Conversation, ConversationBuilder, ConversationError, DeliveryError, Resource,
    Sender,
};

/// A conversation that can be flipped into the encrypted state.
#[derive(Debug)]
pub struct FakeConversation {
    pub peer: BareJid,
    encrypted: AtomicBool,
    fail_end: AtomicBool,
    ended: AtomicBool,
}

impl FakeConversation {
    pub fn new(peer: &BareJid) -> Self {
        FakeConversation {
            peer: peer.clone(),
            encrypted: AtomicBool::new(false),
            fail_end: AtomicBool::new(false),
            ended: AtomicBool::new(false),
        }
    }

    pub fn engage(&self) {
        self.encrypted.store(true, Ordering::SeqCst);
    }

    pub fn fail_on_end(&self) {
        self.fail_end.store(true, Ordering::SeqCst);
    }

    pub fn was_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}

impl Conversation for FakeConversation {
    fn is_encrypted(&self) -> bool {
        self.encrypted.load(Ordering::SeqCst)
    }

    fn end(&self) -> Result<Vec<String>, ConversationError> {
        self.ended.store(true, Ordering::SeqCst);
        if self.fail_end.load(Ordering::SeqCst) {
            return Err(ConversationError("engine failure".to_string()));
        }
        if self.is_encrypted() {
            Ok(vec![format!("?OTR disconnect {}", self.peer)])
        } else {
            Ok(Vec::new())
        }
    }
}

/// Counts how often a conversation is built. Optionally slow, to widen races.
#[derive(Debug, Clone, Default)]
pub struct CountingBuilder {
    builds: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl CountingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow(delay: Duration) -> Self {
        CountingBuilder {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl ConversationBuilder for CountingBuilder {
    type Conversation = FakeConversation;

    fn new_conversation(&self, peer: &BareJid) -> FakeConversation {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        FakeConversation::new(peer)
    }
}

/// A message handed to the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub peer: BareJid,
    pub resource: Option<Resource>,
    pub message: String,
}

/// Records every send; can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingSender {
    sent: Arc<Mutex<Vec<Sent>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let sender = Self::default();
        sender.fail.store(true, Ordering::SeqCst);
        sender
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }
}

impl Sender for RecordingSender {
    fn send(
        &self,
        peer: &BareJid,
        resource: Option<&Resource>,
        message: &str,
    ) -> Result<(), DeliveryError> {
        self.sent.lock().push(Sent {
            peer: peer.clone(),
            resource: resource.cloned(),
            message: message.to_string(),
        });
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeliveryError::NotConnected);
        }
        Ok(())
    }
}
