//! Per-client connection handle, shared by the session loop and its
//! heartbeat monitor.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes};
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Normal-closure status code (RFC 6455).
pub const NORMAL_CLOSURE: u16 = 1000;

/// A connected WebSocket client.
///
/// Outbound frames flow through a bounded queue drained by the session's
/// writer task; the session loop and the heartbeat monitor both enqueue
/// through this handle.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: String,
    /// Send half of the outbound frame queue.
    tx: mpsc::Sender<Message>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether an acknowledgment arrived since the last probe.
    is_alive: AtomicBool,
    /// When the last acknowledgment was received.
    last_ack: Mutex<Instant>,
    /// Set once a close frame has been enqueued.
    close_sent: AtomicBool,
    /// Frames dropped because the queue was full or closed.
    dropped_frames: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection handle.
    pub fn new(id: String, tx: mpsc::Sender<Message>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_ack: Mutex::new(now),
            close_sent: AtomicBool::new(false),
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Enqueue a frame.
    ///
    /// Returns `false` (and counts a drop) if the queue is full or the
    /// writer is gone.
    pub fn send(&self, frame: Message) -> bool {
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Enqueue a text frame.
    pub fn send_text(&self, text: impl Into<Utf8Bytes>) -> bool {
        self.send(Message::Text(text.into()))
    }

    /// Enqueue a normal-closure close frame, at most once per connection.
    ///
    /// Returns `false` if a close frame was already enqueued or the queue
    /// rejected the frame.
    pub fn close(&self, reason: &str) -> bool {
        if self.close_sent.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.send(Message::Close(Some(CloseFrame {
            code: NORMAL_CLOSURE,
            reason: reason.to_owned().into(),
        })))
    }

    /// Mark the peer alive (acknowledgment received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_ack.lock() = Instant::now();
    }

    /// Check and clear the liveness flag.
    ///
    /// Returns `true` if an acknowledgment arrived since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Duration since the last acknowledgment (or establishment).
    pub fn last_ack_elapsed(&self) -> Duration {
        self.last_ack.lock().elapsed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection() -> (ClientConnection, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(16);
        (ClientConnection::new("conn_1".into(), tx), rx)
    }

    #[tokio::test]
    async fn send_text_delivers_frame() {
        let (conn, mut rx) = make_connection();
        assert!(conn.send_text("hello"));
        match rx.recv().await.unwrap() {
            Message::Text(t) => assert_eq!(t.as_str(), "hello"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_to_closed_queue_counts_drop() {
        let (tx, rx) = mpsc::channel(16);
        let conn = ClientConnection::new("conn_2".into(), tx);
        drop(rx);
        assert!(!conn.send_text("hello"));
        assert_eq!(conn.drop_count(), 1);
    }

    #[tokio::test]
    async fn send_to_full_queue_counts_drop() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = ClientConnection::new("conn_3".into(), tx);
        assert!(conn.send_text("first"));
        assert!(!conn.send_text("second"));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn new_connection_starts_alive() {
        let (conn, _rx) = make_connection();
        assert!(conn.check_alive());
        // The swap cleared the flag
        assert!(!conn.check_alive());
    }

    #[test]
    fn mark_alive_sets_flag_again() {
        let (conn, _rx) = make_connection();
        let _ = conn.check_alive();
        conn.mark_alive();
        assert!(conn.check_alive());
    }

    #[tokio::test]
    async fn close_enqueues_normal_closure_frame() {
        let (conn, mut rx) = make_connection();
        assert!(conn.close("done"));
        match rx.recv().await.unwrap() {
            Message::Close(Some(frame)) => {
                assert_eq!(frame.code, NORMAL_CLOSURE);
                assert_eq!(frame.reason.as_str(), "done");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_is_sent_at_most_once() {
        let (conn, mut rx) = make_connection();
        assert!(conn.close("first"));
        assert!(!conn.close("second"));

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, Message::Close(_)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn ack_updates_last_ack_instant() {
        let (conn, _rx) = make_connection();
        std::thread::sleep(Duration::from_millis(10));
        assert!(conn.last_ack_elapsed() >= Duration::from_millis(10));
        conn.mark_alive();
        assert!(conn.last_ack_elapsed() < Duration::from_millis(10));
    }

    #[test]
    fn age_increases() {
        let (conn, _rx) = make_connection();
        let before = conn.age();
        std::thread::sleep(Duration::from_millis(5));
        assert!(conn.age() > before);
    }
}
