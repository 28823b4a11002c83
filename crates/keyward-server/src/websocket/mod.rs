//! WebSocket gateway: per-connection state, heartbeat, protocol parsing,
//! and the session read loop.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `connection` | Outbound frame queue + liveness flag per client |
//! | `registry` | Membership of currently open sessions |
//! | `heartbeat` | Periodic `"ping"` probes, dead-peer detection |
//! | `protocol` | Text frame parsing and response literals |
//! | `session` | Read loop, state machine, teardown |
//!
//! ## Data flow
//!
//! `session` reads frames → `protocol` parses → store lookup → reply through
//! `connection`'s queue. `heartbeat` runs as an owned child task per session
//! and shares the same queue.

pub mod connection;
pub mod heartbeat;
pub mod protocol;
pub mod registry;
pub mod session;
