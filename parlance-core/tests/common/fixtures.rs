// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Server Script Fixtures
//!
//! Canned server output for driving the negotiator over a `MockTransport`.
//! The server uses the `str:` prefix for the streams namespace to make sure
//! prefixes are resolved rather than matched literally.

pub const SERVER_HEADER: &str = "<?xml version='1.0'?><str:stream xmlns='jabber:client' xmlns:str='http://etherx.jabber.org/streams' id='c2s_1' from='example.org' version='1.0'>";

pub const FEATURES_STARTTLS: &str = "<str:features><starttls xmlns='urn:ietf:params:xml:ns:xmpp-tls'><required/></starttls></str:features>";

pub const FEATURES_STARTTLS_AND_SASL: &str = "<str:features><starttls xmlns='urn:ietf:params:xml:ns:xmpp-tls'/><mechanisms xmlns='urn:ietf:params:xml:ns:xmpp-sasl'><mechanism>SCRAM-SHA-1</mechanism><mechanism>PLAIN</mechanism></mechanisms></str:features>";

pub const FEATURES_SASL: &str = "<str:features><mechanisms xmlns='urn:ietf:params:xml:ns:xmpp-sasl'><mechanism>PLAIN</mechanism></mechanisms></str:features>";

pub const FEATURES_SCRAM_ONLY: &str = "<str:features><mechanisms xmlns='urn:ietf:params:xml:ns:xmpp-sasl'><mechanism>SCRAM-SHA-1</mechanism></mechanisms></str:features>";

pub const FEATURES_BIND: &str =
    "<str:features><bind xmlns='urn:ietf:params:xml:ns:xmpp-bind'/></str:features>";

pub const PROCEED: &str = "<proceed xmlns='urn:ietf:params:xml:ns:xmpp-tls'/>";

pub const STARTTLS_FAILURE: &str = "<failure xmlns='urn:ietf:params:xml:ns:xmpp-tls'/>";

pub const SASL_SUCCESS: &str = "<success xmlns='urn:ietf:params:xml:ns:xmpp-sasl'/>";

pub const SASL_FAILURE: &str = "<failure xmlns='urn:ietf:params:xml:ns:xmpp-sasl'><not-authorized/><text xml:lang='en'>Invalid username or password</text></failure>";

pub const BIND_RESULT: &str = "<iq type='result' id='bind_1'><bind xmlns='urn:ietf:params:xml:ns:xmpp-bind'><jid>alice@example.org/parlance</jid></bind></iq>";

pub const BIND_CONFLICT: &str = "<iq type='error' id='bind_1'><error type='cancel'><conflict xmlns='urn:ietf:params:xml:ns:xmpp-stanzas'/></error></iq>";

pub const HOST_UNKNOWN: &str = "<str:error><host-unknown xmlns='urn:ietf:params:xml:ns:xmpp-streams'/><text xmlns='urn:ietf:params:xml:ns:xmpp-streams'>unknown host</text></str:error>";

/// Header the client sends for `domain`.
pub fn client_header(domain: &str) -> String {
    format!(
        "<?xml version='1.0'?><stream:stream to='{}' xmlns='jabber:client' xmlns:stream='http://etherx.jabber.org/streams' version='1.0'>\n",
        domain
    )
}

pub const STARTTLS_REQUEST: &str = "<starttls xmlns='urn:ietf:params:xml:ns:xmpp-tls'/>";

/// SASL PLAIN payload for alice / secret.
pub const ALICE_PLAIN_B64: &str = "AGFsaWNlAHNlY3JldA==";

/// Full script for a plaintext login that binds `alice@example.org/parlance`.
pub fn plaintext_login_script() -> String {
    [
        SERVER_HEADER,
        FEATURES_SASL,
        SASL_SUCCESS,
        SERVER_HEADER,
        FEATURES_BIND,
        BIND_RESULT,
    ]
    .concat()
}
