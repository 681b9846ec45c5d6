// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common Test Utilities
//!
//! Shared fixtures and fakes used across test modules: scripted server
//! replies for the negotiator and recording stand-ins for the encryption
//! engine and message sender.

#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;
pub mod strategies;

use std::sync::Once;

use parlance_core::{BareJid, Jid, Resource};

static TRACING: Once = Once::new();

/// Installs a test subscriber once per test binary. Honours `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn bare(s: &str) -> BareJid {
    BareJid::parse(s).unwrap()
}

pub fn full(s: &str) -> Jid {
    Jid::parse(s).unwrap()
}

pub fn res(s: &str) -> Resource {
    Resource::new(s).unwrap()
}
