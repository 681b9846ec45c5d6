// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies
//!
//! Reusable proptest strategies for property-based testing.

use proptest::prelude::*;

// ============================================================
// Address Strategies
// ============================================================

/// Strategy for generating local parts of addresses.
pub fn local_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9._-]{0,15}"
}

/// Strategy for generating domains.
pub fn domain_strategy() -> impl Strategy<Value = String> {
    ("[a-z]{2,10}", "[a-z]{2,4}").prop_map(|(name, tld)| format!("{}.{}", name, tld))
}

/// Strategy for generating bare addresses.
pub fn bare_jid_strategy() -> impl Strategy<Value = String> {
    (local_strategy(), domain_strategy()).prop_map(|(local, domain)| format!("{}@{}", local, domain))
}

/// Strategy for generating resources, which may contain `/` and `@`.
pub fn resource_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9/@ ._-]{1,20}"
}

// ============================================================
// Certificate Strategies
// ============================================================

/// Strategy for generating opaque certificate bytes.
pub fn cert_der_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..512)
}

// ============================================================
// Roster Strategies
// ============================================================

/// Strategy for scalar peer fields; empty strings are common.
pub fn scalar_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[a-z]{1,8}"]
}

/// Strategy for group lists.
pub fn groups_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Z][a-z]{1,8}", 0..4)
}

/// Strategy for resource names.
pub fn resource_set_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,8}", 0..5)
}
