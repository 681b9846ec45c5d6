//! Session Workflow Integration Tests
//!
//! Login, presence handling and logout against a scripted server.

use parlance_core::stream::{negotiate, Frame, MockTransport, StreamConfig};
use parlance_core::{ConversationManager, Credentials, Jid, Peer, PeerList, RosterEntry};

use crate::common::fakes::{CountingBuilder, RecordingSender};
use crate::common::fixtures::plaintext_login_script;
use crate::common::{bare, init_tracing, res};

const PRESENCES: &str = "<presence from='bob@example.org/pc'><show>away</show><status>lunch</status></presence>\
<presence from='bob@example.org/phone'/>\
<presence from='bob@example.org/pc' type='unavailable'/>\
<message from='bob@example.org/phone' type='chat'><body>?OTR:AAMD</body></message>";

/// Test: full session from login to logout
#[test]
fn test_session_workflow() {
    init_tracing();

    let transport = MockTransport::new([plaintext_login_script().as_str(), PRESENCES].concat());
    let server = transport.clone();
    let credentials = Credentials::new("alice", "secret");

    // Login
    let mut stream = negotiate(
        transport,
        "example.org",
        Some(&credentials),
        &StreamConfig::plaintext(),
    )
    .unwrap();
    let me = stream.bound_jid().unwrap().clone();
    let account = me.bare().to_string();

    // Roster from the server
    let roster = PeerList::new();
    let entry = RosterEntry {
        jid: "bob@example.org".into(),
        subscription: "both".into(),
        name: "Bob".into(),
        ask: String::new(),
        groups: vec!["Friends".into()],
    };
    roster.add_or_merge(Peer::from_entry(&entry, &account, "", &[]).unwrap());

    let conversations =
        ConversationManager::new(CountingBuilder::new(), RecordingSender::new());

    // Drain stanzas until the stream runs dry.
    loop {
        let frame = match stream.read_frame() {
            Ok(frame) => frame,
            Err(e) if e.is_end_of_stream() => break,
            Err(e) => panic!("unexpected error: {}", e),
        };
        let Frame::Element(stanza) = frame else {
            break;
        };
        let from = Jid::parse(stanza.attr("from").unwrap()).unwrap();

        match (stanza.name.as_str(), stanza.attr("type")) {
            ("presence", Some("unavailable")) => {
                roster.peer_became_unavailable(&from);
            }
            ("presence", _) => {
                let show = stanza.child_named("show").map(|s| s.text.as_str()).unwrap_or("");
                let status = stanza.child_named("status").map(|s| s.text.as_str()).unwrap_or("");
                roster.peer_presence_update(&from, show, status, &account);
            }
            ("message", _) => {
                if let Some(peer) = roster.get(from.bare()) {
                    peer.last_seen(&from);
                }
                let (conversation, _) = conversations.ensure_conversation_with(&from, from.resource());
                conversation.engage();
            }
            (other, _) => panic!("unexpected stanza {}", other),
        }
    }

    let bob = roster.get(&bare("bob@example.org")).unwrap();
    assert!(bob.online);
    assert_eq!(bob.name, "Bob");
    assert_eq!(bob.status, "");
    assert_eq!(bob.resources(), vec![res("phone")]);
    assert_eq!(bob.resource_to_use(), Some(res("phone")));

    // Logout
    let report = conversations.terminate_all();
    assert!(report.is_clean());
    assert_eq!(report.notices_sent, 1);
    assert!(conversations.is_empty());

    stream.close().unwrap();
    assert!(server.is_closed());
}
