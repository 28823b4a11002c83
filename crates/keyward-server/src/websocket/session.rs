//! WebSocket session lifecycle — one connected client from upgrade to
//! teardown.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use keyward_store::LicenseStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::heartbeat::{HeartbeatOutcome, run_heartbeat};
use super::protocol::{self, Frame};
use super::registry::ConnectionRegistry;

/// Capacity of the outbound frame queue.
const SEND_QUEUE_CAPACITY: usize = 64;

/// How long teardown waits for the writer to flush the close frame.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionState {
    /// Actively reading frames.
    Open,
    /// Close handshake or error in progress.
    Closing,
    /// Resources released.
    Closed,
}

/// Outcome of handling one inbound frame.
enum FrameOutcome {
    Continue,
    Close,
}

/// Run one WebSocket session to completion.
///
/// Registers the connection, spawns the outbound writer and the heartbeat
/// monitor, then reads frames until the peer closes, sends `QUIT`, the
/// transport errors, or the monitor declares the peer dead. Teardown is
/// best-effort — every step runs regardless of earlier failures — and the
/// registry entry is gone before this function returns.
#[instrument(skip_all, fields(conn_id = %conn_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    conn_id: String,
    store: Arc<LicenseStore>,
    registry: Arc<ConnectionRegistry>,
    heartbeat_interval: Duration,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<Message>(SEND_QUEUE_CAPACITY);
    let connection = Arc::new(ClientConnection::new(conn_id.clone(), send_tx));

    registry.add(connection.clone()).await;
    info!("client connected");
    let mut state = SessionState::Open;

    // Writer: drains the outbound queue into the socket. A close frame is
    // the last thing it writes.
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = send_rx.recv().await {
            let closing = matches!(frame, Message::Close(_));
            if ws_tx.send(frame).await.is_err() || closing {
                break;
            }
        }
    });

    let cancel = CancellationToken::new();
    let mut heartbeat = tokio::spawn(run_heartbeat(
        connection.clone(),
        heartbeat_interval,
        cancel.clone(),
    ));

    while state == SessionState::Open {
        tokio::select! {
            inbound = ws_rx.next() => match inbound {
                Some(Ok(frame)) => {
                    if matches!(
                        handle_frame(frame, &connection, &store).await,
                        FrameOutcome::Close
                    ) {
                        state = SessionState::Closing;
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "read failed");
                    state = SessionState::Closing;
                }
                None => {
                    debug!("inbound stream ended");
                    state = SessionState::Closing;
                }
            },
            outcome = &mut heartbeat => {
                match outcome {
                    Ok(HeartbeatOutcome::TimedOut) => {
                        warn!("no acknowledgment since last probe, closing");
                    }
                    Ok(outcome) => debug!(?outcome, "heartbeat stopped"),
                    Err(e) => warn!(error = %e, "heartbeat task failed"),
                }
                state = SessionState::Closing;
            }
        }
    }

    // Teardown — every step runs even if an earlier one failed.
    registry.remove(&conn_id).await;
    let _ = connection.close("connection closed");
    cancel.cancel();
    if !heartbeat.is_finished() {
        let _ = (&mut heartbeat).await;
    }
    drop(connection);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        warn!("writer did not drain in time, aborting");
        writer.abort();
    }
    state = SessionState::Closed;
    debug!(?state, "session resources released");
    info!("client disconnected");
}

async fn handle_frame(
    frame: Message,
    connection: &ClientConnection,
    store: &Arc<LicenseStore>,
) -> FrameOutcome {
    match frame {
        Message::Text(text) => handle_text(text.as_str(), connection, store).await,
        Message::Close(_) => {
            info!("client sent close frame");
            FrameOutcome::Close
        }
        // Protocol-level pongs count as liveness too; axum answers
        // protocol pings by itself.
        Message::Pong(_) => {
            connection.mark_alive();
            FrameOutcome::Continue
        }
        Message::Ping(_) | Message::Binary(_) => FrameOutcome::Continue,
    }
}

async fn handle_text(
    text: &str,
    connection: &ClientConnection,
    store: &Arc<LicenseStore>,
) -> FrameOutcome {
    match protocol::parse_frame(text) {
        Frame::Ack => {
            connection.mark_alive();
            FrameOutcome::Continue
        }
        Frame::Quit => {
            info!("client sent QUIT");
            FrameOutcome::Close
        }
        Frame::CheckKey(check) => {
            let store = store.clone();
            let lookup = tokio::task::spawn_blocking(move || {
                store.verify(&check.app_name, &check.key, Utc::now())
            })
            .await;
            match lookup {
                Ok(Ok(verdict)) => {
                    if !connection.send_text(protocol::verdict_reply(verdict)) {
                        warn!("failed to enqueue verdict (queue full or closed)");
                    }
                }
                // A failed lookup is logged and produces no reply; the
                // session stays open.
                Ok(Err(e)) => warn!(error = %e, "license lookup failed"),
                Err(e) => warn!(error = %e, "license lookup task failed"),
            }
            FrameOutcome::Continue
        }
        Frame::Malformed => {
            debug!("malformed CHECK_KEY frame dropped");
            FrameOutcome::Continue
        }
        Frame::Unknown => FrameOutcome::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use keyward_store::{ConnectionConfig, LicenseDraft, new_in_memory, run_migrations};

    fn make_store() -> Arc<LicenseStore> {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }
        Arc::new(LicenseStore::new(pool))
    }

    fn make_connection() -> (ClientConnection, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(16);
        (ClientConnection::new("sess_conn".into(), tx), rx)
    }

    fn seed(store: &LicenseStore, key: &str, app: &str, days: i64) {
        let _ = store
            .create(&LicenseDraft {
                key: key.into(),
                app_name: app.into(),
                expires_at: Utc::now() + ChronoDuration::days(days),
                unlimited: false,
            })
            .unwrap();
    }

    #[tokio::test]
    async fn pong_marks_connection_alive() {
        let store = make_store();
        let (conn, _rx) = make_connection();
        let _ = conn.check_alive();

        let outcome = handle_text("pong", &conn, &store).await;
        assert!(matches!(outcome, FrameOutcome::Continue));
        assert!(conn.check_alive());
    }

    #[tokio::test]
    async fn pong_gets_no_reply() {
        let store = make_store();
        let (conn, mut rx) = make_connection();
        let _ = handle_text("pong", &conn, &store).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn quit_closes_the_session() {
        let store = make_store();
        let (conn, _rx) = make_connection();
        let outcome = handle_text("QUIT", &conn, &store).await;
        assert!(matches!(outcome, FrameOutcome::Close));
    }

    #[tokio::test]
    async fn check_key_replies_valid() {
        let store = make_store();
        seed(&store, "key1", "AppX", 30);
        let (conn, mut rx) = make_connection();

        let outcome = handle_text("CHECK_KEY:AppX,key1", &conn, &store).await;
        assert!(matches!(outcome, FrameOutcome::Continue));
        match rx.recv().await.unwrap() {
            Message::Text(t) => assert_eq!(t.as_str(), "VALID_KEY"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn check_key_replies_expired() {
        let store = make_store();
        seed(&store, "key1", "AppX", -1);
        let (conn, mut rx) = make_connection();

        let _ = handle_text("CHECK_KEY:AppX,key1", &conn, &store).await;
        match rx.recv().await.unwrap() {
            Message::Text(t) => assert_eq!(t.as_str(), "EXPIRED_KEY"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn check_key_replies_invalid_for_unknown_key() {
        let store = make_store();
        let (conn, mut rx) = make_connection();

        let _ = handle_text("CHECK_KEY:AppX,badkey", &conn, &store).await;
        match rx.recv().await.unwrap() {
            Message::Text(t) => assert_eq!(t.as_str(), "INVALID_KEY"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn check_key_replies_invalid_for_mismatched_app() {
        let store = make_store();
        seed(&store, "key1", "AppY", 30);
        let (conn, mut rx) = make_connection();

        let _ = handle_text("CHECK_KEY:AppX,key1", &conn, &store).await;
        match rx.recv().await.unwrap() {
            Message::Text(t) => assert_eq!(t.as_str(), "INVALID_KEY"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_check_key_is_dropped_silently() {
        let store = make_store();
        let (conn, mut rx) = make_connection();

        let outcome = handle_text("CHECK_KEY:onlyonefield", &conn, &store).await;
        assert!(matches!(outcome, FrameOutcome::Continue));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_payload_is_ignored() {
        let store = make_store();
        let (conn, mut rx) = make_connection();

        let outcome = handle_text("something else", &conn, &store).await;
        assert!(matches!(outcome, FrameOutcome::Continue));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn close_frame_closes_the_session() {
        let store = make_store();
        let (conn, _rx) = make_connection();
        let outcome = handle_frame(Message::Close(None), &conn, &store).await;
        assert!(matches!(outcome, FrameOutcome::Close));
    }

    #[tokio::test]
    async fn binary_frame_is_ignored() {
        let store = make_store();
        let (conn, mut rx) = make_connection();
        let outcome = handle_frame(Message::Binary(vec![1, 2, 3].into()), &conn, &store).await;
        assert!(matches!(outcome, FrameOutcome::Continue));
        assert!(rx.try_recv().is_err());
    }
}
