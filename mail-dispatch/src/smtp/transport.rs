use crate::mime::ComposedMessage;
use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by a [`Transport`]
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("transport is not connected")]
    NotConnected,
}

/// A mail transport session used sequentially for a whole run.
///
/// `connect` opens, upgrades and authenticates once; `send` may then be
/// called any number of times; `close` ends the session and never fails.
#[async_trait]
pub trait Transport: Send {
    async fn connect(&mut self) -> Result<(), TransportError>;

    async fn send(&mut self, message: &ComposedMessage) -> Result<(), TransportError>;

    async fn close(&mut self);
}
