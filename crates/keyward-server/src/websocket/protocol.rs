//! Text frame protocol: inbound command parsing and response literals.
//!
//! Parsing is pure. The malformed-input policy (drop, no reply) belongs to
//! the session loop, not here.

use keyward_store::Verdict;

/// Liveness probe payload (server → client).
pub const PROBE: &str = "ping";
/// Liveness acknowledgment payload (client → server).
pub const ACK: &str = "pong";
/// Graceful client-initiated close command.
pub const QUIT: &str = "QUIT";
/// Prefix of a key validation request.
pub const CHECK_KEY_PREFIX: &str = "CHECK_KEY:";

/// Reply for a record that is present and currently valid.
pub const VALID_KEY: &str = "VALID_KEY";
/// Reply for a record whose expiration has passed.
pub const EXPIRED_KEY: &str = "EXPIRED_KEY";
/// Reply when no record matches.
pub const INVALID_KEY: &str = "INVALID_KEY";

/// A parsed inbound text frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// Liveness acknowledgment.
    Ack,
    /// Graceful close request.
    Quit,
    /// Key validation request.
    CheckKey(CheckKey),
    /// A `CHECK_KEY` frame that did not parse.
    Malformed,
    /// Anything else.
    Unknown,
}

/// A validation request scoped to one application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckKey {
    /// Application name, trimmed.
    pub app_name: String,
    /// License key, trimmed.
    pub key: String,
}

/// Parse one inbound text payload.
pub fn parse_frame(text: &str) -> Frame {
    if text == ACK {
        return Frame::Ack;
    }
    if text == QUIT {
        return Frame::Quit;
    }
    if let Some(rest) = text.strip_prefix(CHECK_KEY_PREFIX) {
        return parse_check_key(rest).map_or(Frame::Malformed, Frame::CheckKey);
    }
    Frame::Unknown
}

/// The wire reply for a verdict.
pub fn verdict_reply(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Valid => VALID_KEY,
        Verdict::Expired => EXPIRED_KEY,
        Verdict::NotFound => INVALID_KEY,
    }
}

// `<app>,<key>` with surrounding whitespace trimmed on each field.
// Anything but exactly two fields is malformed.
fn parse_check_key(rest: &str) -> Option<CheckKey> {
    let fields: Vec<&str> = rest.trim().split(',').collect();
    let [app_name, key] = fields.as_slice() else {
        return None;
    };
    Some(CheckKey {
        app_name: app_name.trim().to_string(),
        key: key.trim().to_string(),
    })
}
