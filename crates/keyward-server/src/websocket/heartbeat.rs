//! Dead-peer detection via periodic `"ping"` probes.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use super::connection::ClientConnection;
use super::protocol;

/// Close reason sent when the peer stops acknowledging probes.
pub const TIMEOUT_REASON: &str = "PONG not received";

/// Outcome of the heartbeat loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// No acknowledgment since the previous probe; a close frame was
    /// enqueued before returning.
    TimedOut,
    /// The session ended and cancelled the monitor.
    Cancelled,
    /// The outbound queue closed underneath the monitor.
    ChannelClosed,
}

/// Probe the peer every `interval` until it goes quiet, the channel closes,
/// or the session cancels the monitor.
///
/// Each tick checks the acknowledgment flag. A peer that never answered the
/// previous probe is declared dead: the connection is closed with
/// [`TIMEOUT_REASON`] and the loop returns. Otherwise the flag is cleared
/// and a `"ping"` text frame goes out. A silent peer is therefore gone
/// within two intervals of its last acknowledgment.
pub async fn run_heartbeat(
    connection: Arc<ClientConnection>,
    interval: Duration,
    cancel: CancellationToken,
) -> HeartbeatOutcome {
    let mut ticker = time::interval(interval);
    // The first tick completes immediately; the first probe belongs one
    // interval after the session opens.
    let _ = ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !connection.check_alive() {
                    let _ = connection.close(TIMEOUT_REASON);
                    return HeartbeatOutcome::TimedOut;
                }
                if !connection.send_text(protocol::PROBE) {
                    return HeartbeatOutcome::ChannelClosed;
                }
            }
            () = cancel.cancelled() => {
                return HeartbeatOutcome::Cancelled;
            }
        }
    }
}
