//! Notification WebSocket handler
//!
//! Upgrades the request, then hands the socket to the hub connection pumps.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use tracing::debug;

use crate::api::server::AppState;
use crate::hub::connection;

/// WebSocket handler for notification streaming
pub async fn notifications_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    debug!("Upgrading HTTP request to WebSocket connection");

    // Taken before the upgrade so shutdown cannot miss a socket still in flight.
    let token = state.connections.token();
    let max_size = state.websocket.max_frame_size;
    ws.max_frame_size(max_size)
        .max_message_size(max_size)
        .on_upgrade(move |socket| async move {
            connection::serve(socket, state.hub, state.websocket).await;
            drop(token);
        })
}

#[cfg(test)]
mod tests {
    use crate::api::routes::create_router;
    use crate::api::server::AppState;
    use crate::config::WebSocketConfig;
    use crate::hub::{Hub, HubHandle};
    use futures::{SinkExt, StreamExt};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::watch;
    use tokio::time::{sleep, timeout};
    use tokio_tungstenite::tungstenite::Message;

    struct TestServer {
        addr: SocketAddr,
        hub: HubHandle,
        shutdown: watch::Sender<bool>,
    }

    async fn start_server(websocket: WebSocketConfig) -> TestServer {
        let (hub, handle) = Hub::new(64);
        let (shutdown, shutdown_rx) = watch::channel(false);
        tokio::spawn(hub.run(shutdown_rx));

        let app = create_router(AppState::new(handle.clone(), websocket));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer {
            addr,
            hub: handle,
            shutdown,
        }
    }

    async fn wait_for_connections(hub: &HubHandle, expected: usize) {
        let reached = timeout(Duration::from_secs(5), async {
            loop {
                if hub.stats().await.unwrap().connections == expected {
                    return;
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(reached.is_ok(), "hub never reached {} connections", expected);
    }

    fn fast_keepalive() -> WebSocketConfig {
        WebSocketConfig {
            read_timeout: Duration::from_millis(400),
            ping_interval: Duration::from_millis(100),
            write_timeout: Duration::from_secs(1),
            ..WebSocketConfig::default()
        }
    }

    #[tokio::test]
    async fn test_clients_receive_broadcasts() {
        let server = start_server(WebSocketConfig::default()).await;
        let url = format!("ws://{}/ws", server.addr);

        let (mut first, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        let (mut second, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        wait_for_connections(&server.hub, 2).await;

        server.hub.broadcast("hello").await.unwrap();
        server.hub.broadcast("world").await.unwrap();

        for client in [&mut first, &mut second] {
            assert_eq!(
                client.next().await.unwrap().unwrap(),
                Message::Text("hello".to_string())
            );
            assert_eq!(
                client.next().await.unwrap().unwrap(),
                Message::Text("world".to_string())
            );
        }
    }

    #[tokio::test]
    async fn test_client_close_unregisters() {
        let server = start_server(WebSocketConfig::default()).await;
        let url = format!("ws://{}/ws", server.addr);

        let (mut client, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        wait_for_connections(&server.hub, 1).await;

        client.close(None).await.unwrap();
        wait_for_connections(&server.hub, 0).await;
    }

    #[tokio::test]
    async fn test_oversized_frame_terminates_connection() {
        let server = start_server(WebSocketConfig::default()).await;
        let url = format!("ws://{}/ws", server.addr);

        let (mut client, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        wait_for_connections(&server.hub, 1).await;

        client.send(Message::Text("x".repeat(4096))).await.unwrap();
        wait_for_connections(&server.hub, 0).await;
    }

    #[tokio::test]
    async fn test_silent_client_is_dropped_after_read_timeout() {
        let server = start_server(fast_keepalive()).await;
        let url = format!("ws://{}/ws", server.addr);

        // Never polled, so server pings go unanswered.
        let (_client, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        wait_for_connections(&server.hub, 1).await;

        wait_for_connections(&server.hub, 0).await;
    }

    #[tokio::test]
    async fn test_responsive_client_survives_read_timeout() {
        let server = start_server(fast_keepalive()).await;
        let url = format!("ws://{}/ws", server.addr);

        let (client, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        let (_write, mut read) = client.split();
        // Reading answers pings with pongs.
        let reader = tokio::spawn(async move { while let Some(Ok(_)) = read.next().await {} });
        wait_for_connections(&server.hub, 1).await;

        sleep(Duration::from_millis(1200)).await;
        assert_eq!(server.hub.stats().await.unwrap().connections, 1);
        reader.abort();
    }

    #[tokio::test]
    async fn test_stalled_client_is_evicted_then_closed() {
        let server = start_server(WebSocketConfig {
            mailbox_capacity: 4,
            ..WebSocketConfig::default()
        })
        .await;
        let url = format!("ws://{}/ws", server.addr);

        // Not read until after eviction, so socket buffers and then the
        // mailbox fill up.
        let (mut client, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        wait_for_connections(&server.hub, 1).await;

        let payload = "x".repeat(64 * 1024);
        let mut evicted = false;
        for _ in 0..2048 {
            server.hub.broadcast(payload.clone()).await.unwrap();
            if server.hub.stats().await.unwrap().evictions == 1 {
                evicted = true;
                break;
            }
        }
        assert!(evicted, "stalled client was never evicted");
        assert_eq!(server.hub.stats().await.unwrap().connections, 0);

        let closed = timeout(Duration::from_secs(10), async {
            while let Some(frame) = client.next().await {
                match frame.unwrap() {
                    Message::Close(_) => return true,
                    Message::Text(text) => assert_eq!(text, payload),
                    _ => {}
                }
            }
            false
        })
        .await
        .expect("no close frame after eviction");
        assert!(closed);
    }

    #[tokio::test]
    async fn test_hub_shutdown_sends_close_frame() {
        let server = start_server(WebSocketConfig::default()).await;
        let url = format!("ws://{}/ws", server.addr);

        let (mut client, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        wait_for_connections(&server.hub, 1).await;

        server.shutdown.send(true).unwrap();

        let frame = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("no close frame after shutdown");
        assert!(matches!(frame, Some(Ok(Message::Close(_)))));
    }
}
