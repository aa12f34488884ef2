use actor_bus::address::{AddressError, PeerAddr};
use actor_bus::bus::{Bus, BusBuilder, BusError};
use actor_bus::cache::{AddressCache, CacheActor, CacheError, CacheHandle};
use actor_bus::codec::Codec;
use actor_bus::logger::BusEvent;
use actor_bus::message::Message;
use actor_bus::mock::{MockCache, MockTransport, RecordingLogger};
use actor_bus::transport::Transport;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;

fn build_bus(
    cache: impl AddressCache,
    transport: &MockTransport,
    logger: &RecordingLogger,
) -> Bus {
    Bus::builder()
        .cache(cache)
        .transport(transport.clone())
        .logger(logger.clone())
        .build()
        .expect("bus builds")
}

fn spawn_cache() -> CacheHandle {
    let (actor, cache) = CacheActor::new(32);
    tokio::spawn(actor.run());
    cache
}

/// Polls the cache until `actor_id` resolves to `expected`.
async fn wait_for_address(cache: &CacheHandle, actor_id: &str, expected: Option<&str>) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if cache.lookup(actor_id).await.unwrap().as_deref() == expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("{} never resolved to {:?}", actor_id, expected));
}

// =============================================================================
// Construction
// =============================================================================

#[tokio::test]
async fn test_build_requires_cache_and_transport() {
    let result = BusBuilder::new().transport(MockTransport::new()).build();
    assert!(matches!(result, Err(BusError::MissingCache)));

    let result = BusBuilder::new().cache(MockCache::new()).build();
    assert!(matches!(result, Err(BusError::MissingTransport)));
}

#[tokio::test]
async fn test_build_rejects_claimed_inbound_stream() {
    let transport = MockTransport::new();
    let _claimed = transport.take_inbound();

    let result = Bus::builder()
        .cache(MockCache::new())
        .transport(transport.clone())
        .build();
    assert!(matches!(result, Err(BusError::InboundClaimed)));
    assert!(transport.listen_calls().is_empty());
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_start_then_stop() {
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(MockCache::new(), &transport, &logger);

    let addr = bus.start(5000).await.unwrap();
    assert_eq!(addr.port(), 5000);
    assert_eq!(bus.local_addr(), Some(addr));

    bus.stop().await.unwrap();
    assert_eq!(bus.local_addr(), None);

    assert_eq!(transport.listen_calls(), vec![5000]);
    assert_eq!(transport.close_calls(), 1);
    assert_eq!(
        logger.events(),
        vec![BusEvent::Listening { addr }, BusEvent::Stopped]
    );

    // Already stopped: shutdown must not close again
    bus.shutdown().await.unwrap();
    assert_eq!(transport.close_calls(), 1);
}

#[tokio::test]
async fn test_double_start_is_rejected() {
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(MockCache::new(), &transport, &logger);

    bus.start(5000).await.unwrap();
    let second = bus.start(5001).await;
    assert!(matches!(second, Err(BusError::Transport(_))));

    bus.shutdown().await.unwrap();
    assert_eq!(transport.close_calls(), 1);
}

// =============================================================================
// Control messages
// =============================================================================

#[tokio::test]
async fn test_register_then_lookup() {
    let cache = spawn_cache();
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    transport
        .inject_json(&json!({
            "type": "REGISTER_ACTOR",
            "payload": { "actor_id": "a", "actor_address": "10.0.0.1:9000" }
        }))
        .await;

    wait_for_address(&cache, "a", Some("10.0.0.1:9000")).await;
    bus.shutdown().await.unwrap();

    assert!(transport.sent().is_empty());
    assert!(logger.warnings().is_empty());
}

#[tokio::test]
async fn test_update_then_deregister() {
    let cache = spawn_cache();
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    transport
        .inject_json(&serde_json::to_value(Message::register("a", "10.0.0.1:9000")).unwrap())
        .await;
    wait_for_address(&cache, "a", Some("10.0.0.1:9000")).await;

    transport
        .inject_json(&serde_json::to_value(Message::update_address("a", "10.0.0.9:9000")).unwrap())
        .await;
    wait_for_address(&cache, "a", Some("10.0.0.9:9000")).await;

    transport
        .inject_json(&serde_json::to_value(Message::deregister("a")).unwrap())
        .await;
    wait_for_address(&cache, "a", None).await;

    bus.shutdown().await.unwrap();
    assert!(logger.warnings().is_empty());
}

#[tokio::test]
async fn test_cache_get_only_logs() {
    let cache = MockCache::new();
    cache.expect_lookup("a").return_ok(Some("10.0.0.1:9000"));
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    transport
        .inject_json(&json!({ "type": "TEST_CACHE_GET", "payload": { "actor_id": "a" } }))
        .await;
    bus.shutdown().await.unwrap();

    cache.verify();
    assert!(transport.sent().is_empty());
    assert_eq!(
        logger.events(),
        vec![BusEvent::CacheEntry {
            actor_id: "a".into(),
            address: Some("10.0.0.1:9000".into())
        }]
    );
}

#[tokio::test]
async fn test_malformed_control_message_is_dropped() {
    let cache = MockCache::new();
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    transport
        .inject_json(&json!({ "type": "REGISTER_ACTOR", "payload": { "actor_id": "a" } }))
        .await;
    bus.shutdown().await.unwrap();

    cache.verify();
    assert_eq!(
        logger.warnings(),
        vec![BusEvent::MalformedCommand {
            kind: "REGISTER_ACTOR".into(),
            reason: "missing payload.actor_address"
        }]
    );
}

#[tokio::test]
async fn test_cache_failure_is_logged() {
    let cache = MockCache::new();
    cache
        .expect_upsert("a", "10.0.0.1:9000")
        .return_err(CacheError::Closed);
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    transport
        .inject_json(&serde_json::to_value(Message::register("a", "10.0.0.1:9000")).unwrap())
        .await;
    bus.shutdown().await.unwrap();

    cache.verify();
    assert!(matches!(
        logger.warnings().as_slice(),
        [BusEvent::DispatchFailed { command: "register", .. }]
    ));
}

// =============================================================================
// Passthrough and decode failures
// =============================================================================

#[tokio::test]
async fn test_passthrough_forwards_action() {
    let cache = MockCache::new();
    cache.expect_lookup("b").return_ok(Some("10.0.0.2:9100"));
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    transport
        .inject_json(&json!({ "action": { "op": "ping", "n": 1 }, "receiver_id": "b" }))
        .await;
    bus.shutdown().await.unwrap();

    cache.verify();
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, PeerAddr::new("10.0.0.2", 9100));
    let forwarded: Value = serde_json::from_slice(&sent[0].1).unwrap();
    assert_eq!(forwarded, json!({ "op": "ping", "n": 1 }));
}

#[tokio::test]
async fn test_unknown_type_is_passthrough() {
    let cache = MockCache::new();
    cache.expect_lookup("b").return_ok(Some("10.0.0.2:9100"));
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    transport
        .inject_json(&json!({ "type": "CHAT", "action": "hi", "receiver_id": "b" }))
        .await;
    bus.shutdown().await.unwrap();

    cache.verify();
    assert_eq!(transport.sent().len(), 1);
    assert_eq!(&transport.sent()[0].1[..], b"\"hi\"");
}

#[tokio::test]
async fn test_passthrough_with_structured_payload() {
    let cache = MockCache::new();
    cache.expect_lookup("b").return_ok(Some("10.0.0.2:9100"));
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    transport
        .inject_json(&json!({
            "type": "CHAT",
            "receiver_id": "b",
            "action": "hi",
            "payload": { "message": { "text": "hello" }, "actor_id": 7 }
        }))
        .await;
    bus.shutdown().await.unwrap();

    cache.verify();
    assert!(logger.warnings().is_empty());
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, PeerAddr::new("10.0.0.2", 9100));
    assert_eq!(&sent[0].1[..], b"\"hi\"");
}

#[tokio::test]
async fn test_control_message_with_numeric_actor_id_is_dropped() {
    let cache = MockCache::new();
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    transport
        .inject_json(&json!({ "type": "DEREGISTER_ACTOR", "payload": { "actor_id": 7 } }))
        .await;
    bus.shutdown().await.unwrap();

    cache.verify();
    assert_eq!(
        logger.warnings(),
        vec![BusEvent::MalformedCommand {
            kind: "DEREGISTER_ACTOR".into(),
            reason: "payload.actor_id is not a string"
        }]
    );
}

#[tokio::test]
async fn test_non_string_receiver_is_dropped() {
    let cache = MockCache::new();
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    transport
        .inject_json(&json!({ "action": "hi", "receiver_id": 42 }))
        .await;
    bus.shutdown().await.unwrap();

    cache.verify();
    assert!(transport.sent().is_empty());
    assert_eq!(logger.warnings(), vec![BusEvent::NoAddress { actor_id: None }]);
}

#[tokio::test]
async fn test_passthrough_without_receiver_is_dropped() {
    let cache = MockCache::new();
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    transport.inject_json(&json!({ "action": "orphan" })).await;
    bus.shutdown().await.unwrap();

    cache.verify();
    assert!(transport.sent().is_empty());
    assert_eq!(logger.warnings(), vec![BusEvent::NoAddress { actor_id: None }]);
}

#[tokio::test]
async fn test_undecodable_input_is_not_forwarded() {
    let cache = MockCache::new();
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    transport.inject(&b"{ not json"[..]).await;
    bus.shutdown().await.unwrap();

    cache.verify();
    assert!(transport.sent().is_empty());
    assert!(matches!(
        logger.warnings().as_slice(),
        [BusEvent::DecodeFailed { original_error: Some(_) }]
    ));
}

#[tokio::test]
async fn test_stop_keeps_dispatching_buffered_messages() {
    let cache = MockCache::new();
    cache.expect_upsert("a", "10.0.0.1:9000").return_ok();
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    bus.start(5000).await.unwrap();
    bus.stop().await.unwrap();

    transport
        .inject_json(&serde_json::to_value(Message::register("a", "10.0.0.1:9000")).unwrap())
        .await;
    bus.shutdown().await.unwrap();

    cache.verify();
}

#[tokio::test]
async fn test_listener_exits_when_inbound_closes() {
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(MockCache::new(), &transport, &logger);

    transport.close_inbound();
    tokio::time::timeout(Duration::from_secs(5), bus.shutdown())
        .await
        .expect("listener exits")
        .unwrap();
}

#[tokio::test]
async fn test_concurrent_registrations() {
    let cache = spawn_cache();
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    for i in 0..50 {
        let message = Message::register(format!("actor_{}", i), format!("10.0.0.{}:9000", i));
        transport
            .inject_json(&serde_json::to_value(message).unwrap())
            .await;
    }
    bus.shutdown().await.unwrap();

    for i in 0..50 {
        let address = cache.lookup(&format!("actor_{}", i)).await.unwrap();
        assert_eq!(address, Some(format!("10.0.0.{}:9000", i)));
    }
}

// =============================================================================
// Send path
// =============================================================================

#[tokio::test]
async fn test_send_to_unknown_actor_is_dropped() {
    let cache = MockCache::new();
    cache.expect_lookup("unknown").return_ok(None);
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    bus.send(&json!({ "op": "ping" }), "unknown").await;

    cache.verify();
    assert!(transport.sent().is_empty());
    assert_eq!(
        logger.warnings(),
        vec![BusEvent::NoAddress {
            actor_id: Some("unknown".into())
        }]
    );
    bus.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_send_to_known_actor() {
    let cache = MockCache::new();
    cache.expect_lookup("a").return_ok(Some("10.0.0.1:9000"));
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    let message = json!({ "op": "ping", "args": [1, 2] });
    bus.send(&message, "a").await;

    cache.verify();
    assert_eq!(
        transport.sent(),
        vec![(
            PeerAddr::new("10.0.0.1", 9000),
            Bytes::from(serde_json::to_vec(&message).unwrap())
        )]
    );
    assert!(logger.warnings().is_empty());
    bus.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_send_with_malformed_address() {
    let cache = MockCache::new();
    cache.expect_lookup("a").return_ok(Some("10.0.0.1"));
    cache.expect_lookup("b").return_ok(Some("h:1:2"));
    cache.expect_lookup("c").return_ok(Some(""));
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    bus.send(&json!(1), "a").await;
    bus.send(&json!(2), "b").await;
    bus.send(&json!(3), "c").await;

    cache.verify();
    assert!(transport.sent().is_empty());
    assert_eq!(
        logger.warnings(),
        vec![
            BusEvent::BadAddress {
                actor_id: "a".into(),
                error: AddressError::MissingDelimiter("10.0.0.1".into())
            },
            BusEvent::BadAddress {
                actor_id: "b".into(),
                error: AddressError::TooManyDelimiters("h:1:2".into())
            },
            BusEvent::NoAddress {
                actor_id: Some("c".into())
            },
        ]
    );
    bus.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_send_transport_failure_is_logged() {
    let cache = MockCache::new();
    cache.expect_lookup("a").return_ok(Some("10.0.0.1:9000"));
    let transport = MockTransport::new();
    transport.fail_sends();
    let logger = RecordingLogger::new();
    let bus = build_bus(cache.clone(), &transport, &logger);

    bus.send(&json!("hello"), "a").await;

    assert!(matches!(
        logger.warnings().as_slice(),
        [BusEvent::DeliveryFailed { actor_id, .. }] if actor_id == "a"
    ));
    bus.shutdown().await.unwrap();
}

struct RejectingCodec;

#[async_trait]
impl Codec for RejectingCodec {
    async fn decode(&self, _raw: &[u8]) -> Message {
        Message::decode_error("rejected")
    }

    async fn encode(&self, _value: &Value) -> Result<Bytes, Message> {
        Err(Message::encode_error("rejected"))
    }
}

#[tokio::test]
async fn test_custom_codec_failures() {
    let cache = MockCache::new();
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = Bus::builder()
        .cache(cache.clone())
        .transport(transport.clone())
        .codec(RejectingCodec)
        .logger(logger.clone())
        .build()
        .unwrap();

    // Encode failure stops the send before the cache is consulted.
    bus.send(&json!({ "op": "ping" }), "a").await;

    // Every inbound item becomes a decode sentinel.
    transport
        .inject_json(&serde_json::to_value(Message::register("a", "10.0.0.1:9000")).unwrap())
        .await;
    bus.shutdown().await.unwrap();

    cache.verify();
    assert!(transport.sent().is_empty());
    assert_eq!(
        logger.warnings(),
        vec![
            BusEvent::EncodeFailed {
                original_error: Some("rejected".into())
            },
            BusEvent::DecodeFailed {
                original_error: Some("rejected".into())
            },
        ]
    );
}

#[tokio::test]
async fn test_listening_event_carries_bound_address() {
    let transport = MockTransport::new();
    let logger = RecordingLogger::new();
    let bus = build_bus(MockCache::new(), &transport, &logger);

    let addr = bus.start(6123).await.unwrap();
    let expected: SocketAddr = "127.0.0.1:6123".parse().unwrap();
    assert_eq!(addr, expected);
    assert_eq!(logger.events(), vec![BusEvent::Listening { addr: expected }]);

    bus.shutdown().await.unwrap();
    assert_eq!(logger.events().last(), Some(&BusEvent::Stopped));
}
