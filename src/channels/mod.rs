pub mod whatsapp;

use crate::types::{ConversationId, OutboundBody, PairingEvent, ProtocolEvent};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Authenticated session to the messaging network.
///
/// The transport owns the session material; the bridge only drives the
/// lifecycle and the send path through this port.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Whether a paired device is persisted for this account.
    async fn has_session(&self) -> Result<bool>;

    /// Opens the pairing-code stream. Call before `connect` on an unpaired start.
    async fn pairing_events(&self) -> Result<mpsc::Receiver<PairingEvent>>;

    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    async fn send_message(&self, chat: &ConversationId, body: &OutboundBody) -> Result<()>;

    /// Registers the single event sink. Replaces any previous one.
    fn subscribe_events(&self, sink: mpsc::Sender<ProtocolEvent>);
}
