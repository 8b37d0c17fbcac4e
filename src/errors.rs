//! Error taxonomy for the collaborator layer surrounding the engine.
//!
//! [`crate::engine::EngineError`] is the only error the core itself raises;
//! everything here belongs to the adapters that drive it — the market maker
//! and the simulator each wrap their own transport failures separately so a
//! caller can tell which collaborator failed.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketMakerError {
    #[error("connection error: {0}")]
    ConnectError(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}
