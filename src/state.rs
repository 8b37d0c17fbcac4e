//! Shared application state for the HTTP/WebSocket demonstration layer.
//!
//! The engine itself is synchronous and single-threaded (see
//! [`crate::engine`]); this is the collaborator the spec requires: a single
//! `Mutex` serializing concurrent async handlers onto one `Engine`
//! instance. The lock is never held across an `.await`, so a plain
//! `std::sync::Mutex` is the right tool — no async mutex overhead for a
//! critical section that never suspends.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::engine::{Engine, Trade};

const BROADCAST_CAPACITY: usize = 1024;

/// Cloneable handle to the single running engine plus the broadcast
/// channels the WebSocket layer fans trades and book-change notifications
/// out on.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Mutex<Engine>>,
    pub trade_tx: broadcast::Sender<Trade>,
    /// Fired whenever a call may have changed the book, so `/ws` subscribers
    /// know to pull a fresh snapshot. Carries no payload; the snapshot is
    /// read from `engine` at the time it's needed, never stashed stale here.
    pub book_tx: broadcast::Sender<()>,
}

impl AppState {
    pub fn new() -> Self {
        let (trade_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (book_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        AppState {
            engine: Arc::new(Mutex::new(Engine::new())),
            trade_tx,
            book_tx,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new()
    }
}
