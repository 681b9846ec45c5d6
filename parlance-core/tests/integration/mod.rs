// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Integration Tests for Parlance Core
//!
//! These tests drive complete sessions: negotiating a stream, feeding
//! presence into the roster and ending encrypted conversations on logout.
//!
//! Run with: cargo test --test integration

#[path = "../common/mod.rs"]
mod common;

mod session_workflow_test;
