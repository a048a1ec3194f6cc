//! Relay Integration Tests
//!
//! Each test starts the real gateway on an ephemeral port; no external
//! services are needed.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use integration_tests::{
    chat, environment_update, player_update, tight_config, TestClient, TestServer,
};
use relay_common::OverflowPolicy;
use serde_json::json;

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.unwrap();

    let response = server.get("/health").await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

// ============================================================================
// Connection Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_first_client_greeting() {
    let server = TestServer::start().await.unwrap();
    let mut client = TestClient::connect(&server.ws_url()).await.unwrap();

    let players = client.read_greeting().await.unwrap();

    assert_eq!(players, json!({}));
    assert_eq!(client.id().len(), 36);
    server.wait_for_sessions(1).await.unwrap();
}

#[tokio::test]
async fn test_join_visible_both_ways() {
    let server = TestServer::start().await.unwrap();
    let mut a = server.join().await.unwrap();

    let mut b = TestClient::connect(&server.ws_url()).await.unwrap();
    let players = b.read_greeting().await.unwrap();

    assert_eq!(players.as_object().unwrap().len(), 1);
    assert_eq!(players[a.id()]["id"], a.id());
    assert_eq!(players[a.id()]["animation"], "idle");
    assert_eq!(players[a.id()]["balloons"], json!([0xff_0000, 0x00_00ff, 0x00_ff00]));

    let joined = a.expect_type("player_joined").await.unwrap();
    assert_eq!(joined["player"]["id"], b.id());
    assert_eq!(joined["player"]["position"], json!({"x": 0, "y": 0, "z": 0}));
    b.assert_silent().await.unwrap();
}

#[tokio::test]
async fn test_ids_are_unique() {
    let server = TestServer::start().await.unwrap();

    let mut clients = Vec::new();
    for _ in 0..5 {
        clients.push(server.join().await.unwrap());
    }

    let mut ids: Vec<_> = clients.iter().map(|c| c.id().to_string()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}

#[tokio::test]
async fn test_leave_announced_to_remaining() {
    let server = TestServer::start().await.unwrap();
    let a = server.join().await.unwrap();
    let mut b = server.join().await.unwrap();
    let mut c = server.join().await.unwrap();

    let a_id = a.id().to_string();
    a.close().await.unwrap();

    for client in [&mut b, &mut c] {
        let left = client.wait_for_type("player_left").await.unwrap();
        assert_eq!(left["playerId"], a_id.as_str());
        client.assert_silent().await.unwrap();
    }
    server.wait_for_sessions(2).await.unwrap();

    let mut d = TestClient::connect(&server.ws_url()).await.unwrap();
    let players = d.read_greeting().await.unwrap();
    assert!(players.get(&a_id).is_none());
    assert_eq!(players.as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn test_dropped_socket_announced() {
    let server = TestServer::start().await.unwrap();
    let a = server.join().await.unwrap();
    let mut b = server.join().await.unwrap();

    let a_id = a.id().to_string();
    drop(a);

    let left = b.wait_for_type("player_left").await.unwrap();
    assert_eq!(left["playerId"], a_id.as_str());
}

// ============================================================================
// Relay Tests
// ============================================================================

#[tokio::test]
async fn test_player_update_relays_partial_and_stores_merge() {
    let server = TestServer::start().await.unwrap();
    let mut a = server.join().await.unwrap();
    let mut b = server.join().await.unwrap();
    a.expect_type("player_joined").await.unwrap();

    a.send_json(&player_update(json!({"animation": "jump"})))
        .await
        .unwrap();

    let msg = b.recv_json().await.unwrap();
    assert_eq!(
        msg,
        json!({"type": "player_state", "playerId": a.id(), "state": {"animation": "jump"}})
    );
    a.assert_silent().await.unwrap();

    let mut c = TestClient::connect(&server.ws_url()).await.unwrap();
    let players = c.read_greeting().await.unwrap();
    assert_eq!(players[a.id()]["animation"], "jump");
    assert_eq!(players[a.id()]["position"], json!({"x": 0, "y": 0, "z": 0}));
    assert_eq!(players[a.id()]["id"], a.id());
}

#[tokio::test]
async fn test_updates_arrive_in_send_order() {
    let server = TestServer::start().await.unwrap();
    let mut a = server.join().await.unwrap();
    let mut b = server.join().await.unwrap();
    a.expect_type("player_joined").await.unwrap();

    for step in 0..20 {
        a.send_json(&player_update(json!({"position": {"x": step, "y": 0, "z": 0}})))
            .await
            .unwrap();
    }

    for step in 0..20 {
        let msg = b.expect_type("player_state").await.unwrap();
        assert_eq!(msg["state"]["position"]["x"], step);
    }
}

#[tokio::test]
async fn test_chat_reaches_everyone_including_sender() {
    let server = TestServer::start().await.unwrap();
    let mut a = server.join().await.unwrap();
    let mut b = server.join().await.unwrap();
    a.expect_type("player_joined").await.unwrap();

    a.send_json(&chat("hi")).await.unwrap();

    let expected = json!({"type": "chat", "playerId": a.id(), "message": "hi"});
    assert_eq!(a.recv_json().await.unwrap(), expected);
    assert_eq!(b.recv_json().await.unwrap(), expected);
}

#[tokio::test]
async fn test_environment_update_excludes_sender() {
    let server = TestServer::start().await.unwrap();
    let mut a = server.join().await.unwrap();
    let mut b = server.join().await.unwrap();
    a.expect_type("player_joined").await.unwrap();

    a.send_json(&environment_update(
        "platform_cloud",
        json!({"index": 3, "isFading": true}),
    ))
    .await
    .unwrap();

    assert_eq!(
        b.recv_json().await.unwrap(),
        json!({
            "type": "environment_update",
            "target": "platform_cloud",
            "state": {"index": 3, "isFading": true}
        })
    );
    a.assert_silent().await.unwrap();
}

#[tokio::test]
async fn test_malformed_input_is_ignored() {
    let server = TestServer::start().await.unwrap();
    let mut a = server.join().await.unwrap();
    let mut b = server.join().await.unwrap();
    a.expect_type("player_joined").await.unwrap();

    a.send_text("{oops").await.unwrap();
    a.send_text("42").await.unwrap();
    a.send_json(&json!({"type": "fly"})).await.unwrap();
    a.send_json(&json!({"type": "player_update", "state": "jump"}))
        .await
        .unwrap();
    a.send_binary(vec![1, 2, 3]).await.unwrap();

    b.assert_silent().await.unwrap();

    a.send_json(&chat("after")).await.unwrap();
    assert_eq!(b.recv_json().await.unwrap()["message"], "after");
    assert_eq!(a.recv_json().await.unwrap()["message"], "after");
}

// ============================================================================
// Backpressure Tests
// ============================================================================

#[tokio::test]
async fn test_drop_newest_keeps_connections() {
    let server = TestServer::start_with_config(tight_config(OverflowPolicy::DropNewest))
        .await
        .unwrap();
    let mut a = server.join().await.unwrap();
    let mut b = server.join().await.unwrap();
    a.expect_type("player_joined").await.unwrap();

    a.send_json(&chat("one")).await.unwrap();
    assert_eq!(b.recv_json().await.unwrap()["message"], "one");
    assert_eq!(a.recv_json().await.unwrap()["message"], "one");

    server.wait_for_sessions(2).await.unwrap();
}

#[tokio::test]
async fn test_stalled_reader_evicted_others_unaffected() {
    let server = TestServer::start_with_config(tight_config(OverflowPolicy::Disconnect))
        .await
        .unwrap();
    let mut a = server.join().await.unwrap();
    let mut b = server.join().await.unwrap();
    a.expect_type("player_joined").await.unwrap();

    // Never reads, not even its greeting
    let stalled = TestClient::connect(&server.ws_url()).await.unwrap();
    let stalled_id = a.expect_type("player_joined").await.unwrap()["player"]["id"].clone();
    assert_eq!(b.expect_type("player_joined").await.unwrap()["player"]["id"], stalled_id);

    // Large frames fill the socket buffers, then the two-slot queue
    let padding = "x".repeat(128 * 1024);
    let mut relayed = 0;
    let mut left = None;
    for step in 0..300 {
        let state = json!({"position": {"x": step, "y": 0, "z": 0}, "pad": padding.as_str()});
        a.send_json(&player_update(state)).await.unwrap();

        let msg = b.recv_json().await.unwrap();
        if msg["type"] == "player_left" {
            left = Some(msg);
            break;
        }
        assert_eq!(msg["type"], "player_state");
        assert_eq!(msg["state"]["position"]["x"], step);
        relayed += 1;
    }

    let left = left.expect("stalled reader was never evicted");
    assert_eq!(left["playerId"], stalled_id);
    assert!(relayed > 0);
    server.wait_for_sessions(2).await.unwrap();

    assert_eq!(a.wait_for_type("player_left").await.unwrap()["playerId"], stalled_id);

    a.send_json(&player_update(json!({"animation": "jump"})))
        .await
        .unwrap();
    let msg = b.expect_type("player_state").await.unwrap();
    assert_eq!(msg["state"], json!({"animation": "jump"}));

    a.assert_silent().await.unwrap();
    b.assert_silent().await.unwrap();
    drop(stalled);
}
