use chrono::{TimeZone, Utc};

use crate::alarm::AlarmSettings;
use crate::sync::codec::SyncMessage;
use crate::sync::transport::{LoopbackTransport, SyncPeer};
use crate::sync::types::{AlarmAction, MessageType};

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap()
}

#[test]
fn reachable_peer_gets_direct_messages() {
    let mut peer = SyncPeer::new(LoopbackTransport::new(true));
    peer.send_settings(&AlarmSettings::default(), now()).unwrap();
    peer.send_action(AlarmAction::Stop, now()).unwrap();

    let transport = peer.transport();
    assert_eq!(transport.sent.len(), 2);
    assert!(transport.context.is_none());
    assert_eq!(transport.sent[0].message_type, MessageType::AlarmSettings);
    assert_eq!(transport.sent[1].message_type, MessageType::AlarmAction);
}

#[test]
fn unreachable_peer_falls_back_to_context_update() {
    let mut peer = SyncPeer::new(LoopbackTransport::new(false));
    peer.send_settings(&AlarmSettings::default(), now()).unwrap();

    let transport = peer.transport();
    assert!(transport.sent.is_empty());
    let context = transport.context.as_ref().unwrap();
    assert_eq!(context.message_type, MessageType::AlarmSettings);
}

#[test]
fn context_update_keeps_only_the_latest() {
    let mut peer = SyncPeer::new(LoopbackTransport::new(false));
    let mut settings = AlarmSettings::default();
    peer.send_settings(&settings, now()).unwrap();
    settings.is_active = true;
    peer.send_settings(&settings, now()).unwrap();

    let context = peer.transport().context.as_ref().unwrap();
    match peer.receive(context).unwrap() {
        SyncMessage::Settings(decoded) => assert!(decoded.is_active),
        other => panic!("expected settings, got {other:?}"),
    }
}
