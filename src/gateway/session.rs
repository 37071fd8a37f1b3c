use std::sync::Arc;

use tokio::sync::mpsc;

use crate::models::connection::Connection;

/// The connection's outbound queue is gone (socket task ended).
#[derive(Debug, thiserror::Error)]
#[error("connection queue closed")]
pub struct SinkClosed;

/// Where frames for one connection are pushed.
///
/// Delivery must not block: implementations enqueue and return, and the
/// socket task drains the queue in order.
pub trait ConnectionSink: Send + Sync {
    fn deliver(&self, frame: &str) -> Result<(), SinkClosed>;
}

impl ConnectionSink for mpsc::UnboundedSender<String> {
    fn deliver(&self, frame: &str) -> Result<(), SinkClosed> {
        self.send(frame.to_string()).map_err(|_| SinkClosed)
    }
}

/// A connection accepted by the transport together with its outbound sink.
pub struct GatewaySession {
    pub connection: Connection,
    pub sink: Arc<dyn ConnectionSink>,
}
