use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use yieldroom_execution::{Engine, SharedSecret};
use yieldroom_server::{serve, Actor, Api, Metrics};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SECRET: &str = "hunter2";

async fn start_server() -> String {
    let metrics = Arc::new(Metrics::new());
    let (actor, mailbox) = Actor::new(Engine::new(SharedSecret::new(SECRET)), 64, metrics.clone());
    actor.start();
    let router = Api::new(mailbox, metrics, PathBuf::from("public"), 64).router();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        serve(listener, router).await.unwrap();
    });
    format!("ws://{addr}/ws")
}

async fn connect(url: &str) -> Client {
    let (client, _) = connect_async(url).await.unwrap();
    client
}

async fn emit(client: &mut Client, frame: Value) {
    client
        .send(Message::Text(frame.to_string()))
        .await
        .unwrap();
}

async fn recv(client: &mut Client) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for event")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn recv_event(client: &mut Client, event: &str) -> Value {
    loop {
        let frame = recv(client).await;
        if frame["event"] == event {
            return frame["data"].clone();
        }
    }
}

#[tokio::test]
async fn test_full_round_over_websocket() {
    let url = start_server().await;
    let mut gm = connect(&url).await;
    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;

    emit(
        &mut gm,
        json!({"event": "login", "data": {"type": "gm", "password": SECRET}}),
    )
    .await;
    let success = recv_event(&mut gm, "loginSuccess").await;
    assert_eq!(success["type"], "gm");
    assert_eq!(success["state"]["round"], 1);

    emit(
        &mut alice,
        json!({"event": "login", "data": {"type": "player", "name": "Alice"}}),
    )
    .await;
    let success = recv_event(&mut alice, "loginSuccess").await;
    assert_eq!(success["playerData"]["name"], "Alice");
    assert_eq!(success["playerData"]["balance"], 10_000.0);

    emit(
        &mut bob,
        json!({"event": "login", "data": {"type": "player", "name": "Bob"}}),
    )
    .await;
    recv_event(&mut bob, "loginSuccess").await;

    emit(
        &mut alice,
        json!({"event": "submitAllocation", "data": {"a": 100, "b": 0, "c": 0}}),
    )
    .await;
    recv_event(&mut alice, "submissionConfirmed").await;

    emit(
        &mut gm,
        json!({"event": "gmProcessRound", "data": {"a": 10, "b": 0, "c": 0}}),
    )
    .await;

    let result = recv_event(&mut alice, "roundResult").await;
    let balance = result["newBalance"].as_f64().unwrap();
    assert!((balance - 11_047.13).abs() < 0.01);
    assert_eq!(recv_event(&mut alice, "newRoundStarted").await, 2);

    // Bob never submitted, so his balance sits idle
    let result = recv_event(&mut bob, "roundResult").await;
    assert_eq!(result["gain"], 0.0);
    assert_eq!(result["newBalance"], 10_000.0);

    let update = loop {
        let update = recv_event(&mut gm, "gmUpdate").await;
        if update["state"]["round"] == 2 {
            break update;
        }
    };
    let leaderboard = update["leaderboard"].as_array().unwrap();
    assert_eq!(leaderboard.len(), 2);
    assert_eq!(leaderboard[0]["name"], "Alice");
    assert_eq!(leaderboard[0]["rank"], 1);
}

#[tokio::test]
async fn test_malformed_frames_are_ignored() {
    let url = start_server().await;
    let mut client = connect(&url).await;

    client
        .send(Message::Text("not json".to_string()))
        .await
        .unwrap();
    emit(&mut client, json!({"event": "unknown", "data": {}})).await;
    emit(
        &mut client,
        json!({"event": "login", "data": {"type": "gm", "password": "wrong"}}),
    )
    .await;

    // The connection survives and the first reply is to the login
    let frame = recv(&mut client).await;
    assert_eq!(frame["event"], "loginError");
}
