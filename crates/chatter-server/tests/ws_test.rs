//! End-to-end tests: a real server on a random port, real WebSocket clients.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use chatter_server::directory::SharedDatabase;
use chatter_server::registry::ConnectionRegistry;
use chatter_server::{ServerConfig, Service};
use chatter_shared::{ChatMessage, InboundMessage, TabId, UserId};
use chatter_store::{Database, Server, Tab, User};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const QUIET: Duration = Duration::from_millis(300);

struct TestServer {
    addr: SocketAddr,
    db: SharedDatabase,
    registry: Arc<ConnectionRegistry>,
    u1: UserId,
    u2: UserId,
    u3: UserId,
    tab: TabId,
    service: Option<Service>,
    _dir: tempfile::TempDir,
}

/// u1 and u2 are members of a server with one tab; u3 is not.
async fn start_test_server() -> TestServer {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db = Database::open_at(&dir.path().join("chatter.db")).expect("Failed to open DB");

    let mut ids = Vec::new();
    for name in ["alice", "bob", "carol"] {
        ids.push(db.create_user(&User::new(name, "pw")).unwrap());
    }
    let server = Server::new("Lobby");
    db.create_server(&server).unwrap();
    db.add_user_to_server(ids[0], server.id).unwrap();
    db.add_user_to_server(ids[1], server.id).unwrap();
    let tab = Tab::new("General", server.id);
    db.create_tab(&tab).unwrap();

    let db: SharedDatabase = Arc::new(Mutex::new(db));
    let config = ServerConfig {
        write_timeout: Duration::from_millis(500),
        shutdown_drain: Duration::from_secs(2),
        ..ServerConfig::default()
    };
    let service = Service::start(config, db.clone());
    let registry = service.state().registry.clone();
    let app = service.router();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        addr,
        db,
        registry,
        u1: ids[0],
        u2: ids[1],
        u3: ids[2],
        tab: tab.id,
        service: Some(service),
        _dir: dir,
    }
}

impl TestServer {
    async fn connect_raw(&self, uid: &str) -> Client {
        let url = format!("ws://{}/ws/messages?uid={}", self.addr, uid);
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("WebSocket handshake failed");
        ws
    }

    /// Connect and wait until the server has registered the connection.
    async fn connect(&self, user: UserId) -> Client {
        let ws = self.connect_raw(&user.to_string()).await;
        self.wait_until(|r| r.contains(user)).await;
        ws
    }

    async fn wait_until(&self, cond: impl Fn(&ConnectionRegistry) -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !cond(&self.registry) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("registry did not reach expected state");
    }

    fn stored_messages(&self) -> usize {
        self.db.lock().unwrap().list_messages().unwrap().len()
    }
}

async fn send(ws: &mut Client, msg: &InboundMessage) {
    ws.send(Message::Text(msg.to_json().unwrap())).await.unwrap();
}

/// Next chat message, skipping control frames.  `None` if nothing arrives
/// within `wait`.
async fn next_chat(ws: &mut Client, wait: Duration) -> Option<ChatMessage> {
    loop {
        match tokio::time::timeout(wait, ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                return Some(ChatMessage::from_json(text.as_bytes()).unwrap())
            }
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
            _ => return None,
        }
    }
}

#[tokio::test]
async fn message_reaches_members_but_not_outsiders() {
    let server = start_test_server().await;
    let mut c1 = server.connect(server.u1).await;
    let mut c2 = server.connect(server.u2).await;
    let mut c3 = server.connect(server.u3).await;

    send(&mut c1, &InboundMessage::new("hello lobby", server.tab)).await;

    for ws in [&mut c1, &mut c2] {
        let msg = next_chat(ws, Duration::from_secs(2))
            .await
            .expect("member should receive the message");
        assert_eq!(msg.text, "hello lobby");
        assert_eq!(msg.sender.id, server.u1);
        assert_eq!(msg.sender.username, "alice");
        assert_eq!(msg.tab.id, server.tab);
        assert_eq!(msg.tab.name, "General");
    }
    assert!(next_chat(&mut c3, QUIET).await.is_none());
    assert_eq!(server.stored_messages(), 1);
}

#[tokio::test]
async fn invalid_frame_is_skipped_and_connection_survives() {
    let server = start_test_server().await;
    let mut c1 = server.connect(server.u1).await;

    c1.send(Message::Text("{\"text\": 42".into())).await.unwrap();
    send(&mut c1, &InboundMessage::new("still works", server.tab)).await;

    let msg = next_chat(&mut c1, Duration::from_secs(2)).await.unwrap();
    assert_eq!(msg.text, "still works");
    assert!(server.registry.contains(server.u1));
    assert_eq!(server.stored_messages(), 1);
}

#[tokio::test]
async fn disconnected_member_is_deregistered_and_skipped() {
    let server = start_test_server().await;
    let mut c1 = server.connect(server.u1).await;
    let mut c2 = server.connect(server.u2).await;

    c2.close(None).await.unwrap();
    server.wait_until(|r| !r.contains(server.u2)).await;

    send(&mut c1, &InboundMessage::new("anyone?", server.tab)).await;

    assert!(next_chat(&mut c1, Duration::from_secs(2)).await.is_some());
    assert_eq!(server.registry.len(), 1);
    assert_eq!(server.stored_messages(), 1);
}

#[tokio::test]
async fn large_message_is_delivered() {
    let server = start_test_server().await;
    let mut c1 = server.connect(server.u1).await;
    let mut c2 = server.connect(server.u2).await;

    let text = "x".repeat(70 * 1024);
    send(&mut c1, &InboundMessage::new(text.clone(), server.tab)).await;

    let msg = next_chat(&mut c2, Duration::from_secs(2))
        .await
        .expect("large message should be delivered");
    assert_eq!(msg.text, text);
    assert!(server.registry.contains(server.u1));
    assert_eq!(server.stored_messages(), 1);
}

#[tokio::test]
async fn client_close_completes_handshake() {
    let server = start_test_server().await;
    let mut c1 = server.connect(server.u1).await;

    c1.close(None).await.unwrap();

    let mut saw_close = false;
    loop {
        match tokio::time::timeout(Duration::from_secs(2), c1.next()).await {
            Ok(Some(Ok(Message::Close(_)))) => saw_close = true,
            Ok(Some(Ok(_))) => continue,
            Ok(None) => break,
            Ok(Some(Err(e))) => panic!("connection was not closed cleanly: {e:?}"),
            Err(_) => panic!("server never finished the close handshake"),
        }
    }
    assert!(saw_close);
    server.wait_until(|r| !r.contains(server.u1)).await;
}

#[tokio::test]
async fn messages_from_one_client_arrive_in_order() {
    let server = start_test_server().await;
    let mut c1 = server.connect(server.u1).await;
    let mut c2 = server.connect(server.u2).await;

    for i in 0..5 {
        send(&mut c1, &InboundMessage::new(format!("m{i}"), server.tab)).await;
    }

    let mut ids = Vec::new();
    for i in 0..5 {
        let msg = next_chat(&mut c2, Duration::from_secs(2)).await.unwrap();
        assert_eq!(msg.text, format!("m{i}"));
        ids.push(msg.id);
    }
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn invalid_uid_is_closed_with_unsupported_data() {
    let server = start_test_server().await;
    let mut ws = server.connect_raw("not-a-uuid").await;

    let frame = match tokio::time::timeout(Duration::from_secs(2), ws.next()).await {
        Ok(Some(Ok(Message::Close(Some(frame))))) => frame,
        other => panic!("expected close frame, got {other:?}"),
    };
    assert_eq!(u16::from(frame.code), 1003);
    assert_eq!(frame.reason, "uid param is not a valid uuid: `not-a-uuid`");
    assert!(server.registry.is_empty());
}

#[tokio::test]
async fn reconnect_replaces_previous_connection() {
    let server = start_test_server().await;
    let mut old = server.connect(server.u2).await;
    let first = server.registry.lookup(server.u2).unwrap().id();

    let mut new = server.connect_raw(&server.u2.to_string()).await;
    server
        .wait_until(|r| r.lookup(server.u2).map(|c| c.id() != first).unwrap_or(false))
        .await;

    let mut c1 = server.connect(server.u1).await;
    send(&mut c1, &InboundMessage::new("to the new one", server.tab)).await;

    assert!(next_chat(&mut new, Duration::from_secs(2)).await.is_some());
    assert!(next_chat(&mut old, QUIET).await.is_none());

    // Closing the stale socket must not evict its successor.
    old.close(None).await.unwrap();
    tokio::time::sleep(QUIET).await;
    assert!(server.registry.contains(server.u2));
}

#[tokio::test]
async fn shutdown_closes_clients_going_away() {
    let mut server = start_test_server().await;
    let mut c1 = server.connect(server.u1).await;

    send(&mut c1, &InboundMessage::new("last words", server.tab)).await;
    assert!(next_chat(&mut c1, Duration::from_secs(2)).await.is_some());

    server.service.take().unwrap().shutdown().await;

    let frame = loop {
        match tokio::time::timeout(Duration::from_secs(2), c1.next()).await {
            Ok(Some(Ok(Message::Close(Some(frame))))) => break frame,
            Ok(Some(Ok(_))) => continue,
            other => panic!("expected close frame, got {other:?}"),
        }
    };
    assert_eq!(u16::from(frame.code), 1001);
    assert_eq!(server.stored_messages(), 1);
}
