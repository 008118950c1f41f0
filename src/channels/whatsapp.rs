use crate::channels::ProtocolClient;
use crate::config::WhatsAppConfig;
use crate::store::{self, DbKind, DeviceRecord};
use crate::types::{ConversationId, OutboundBody, PairingEvent, ProtocolEvent};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use sqlx::AnyPool;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const PAIRING_BUFFER: usize = 16;

/// WhatsApp Web session driven through an HTTP sidecar.
///
/// Commands go out as JSON posts to the sidecar; events come back as webhooks
/// and are handed to [`SidecarClient::dispatch_event`] and
/// [`SidecarClient::dispatch_pairing`].
pub struct SidecarClient {
    http: Client,
    sidecar_url: String,
    account_id: String,
    pool: AnyPool,
    db_kind: DbKind,
    events: Mutex<Option<mpsc::Sender<ProtocolEvent>>>,
    pairing: Mutex<Option<mpsc::Sender<PairingEvent>>>,
}

impl SidecarClient {
    pub fn new(cfg: &WhatsAppConfig, pool: AnyPool, db_kind: DbKind) -> reqwest::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(http, cfg, pool, db_kind))
    }

    pub fn with_client(http: Client, cfg: &WhatsAppConfig, pool: AnyPool, db_kind: DbKind) -> Self {
        Self {
            http,
            sidecar_url: cfg.sidecar_url.trim_end_matches('/').to_string(),
            account_id: cfg.account_id.clone(),
            pool,
            db_kind,
            events: Mutex::new(None),
            pairing: Mutex::new(None),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    async fn post(&self, path: &str, payload: serde_json::Value) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}{}", self.sidecar_url, path))
            .json(&payload)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("whatsapp sidecar error: {} {}", status, body));
        }
        Ok(())
    }

    /// Hands a transport event to the registered sink, waiting for capacity.
    pub async fn dispatch_event(&self, event: ProtocolEvent) -> Result<()> {
        if let ProtocolEvent::LoggedOut { reason } = &event {
            warn!(account_id = %self.account_id, reason = ?reason, "device logged out, forgetting session");
            if let Err(err) = store::delete_device(&self.pool, self.db_kind, &self.account_id).await {
                error!(account_id = %self.account_id, error = %err, "could not forget logged out device");
            }
        }

        let sink = self.events.lock().ok().and_then(|guard| guard.clone());
        let Some(sink) = sink else {
            warn!("no event handler registered, dropping event");
            return Ok(());
        };
        sink.send(event)
            .await
            .map_err(|_| anyhow::anyhow!("event handler is gone"))
    }

    /// Feeds the open pairing stream. The device record is written before the
    /// success event is forwarded, and the stream closes on any terminal event.
    pub async fn dispatch_pairing(&self, event: PairingEvent) -> Result<()> {
        if let PairingEvent::Success { jid } = &event {
            let record = DeviceRecord {
                account_id: self.account_id.clone(),
                jid: jid.clone(),
                paired_at: Utc::now(),
            };
            store::save_device(&self.pool, self.db_kind, &record).await?;
            info!(account_id = %self.account_id, jid = ?jid, "device paired");
        }

        let terminal = event.is_terminal();
        let sink = match self.pairing.lock() {
            Ok(mut guard) if terminal => guard.take(),
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        let Some(sink) = sink else {
            warn!(event = %event.name(), "no pairing in progress, dropping pairing event");
            return Ok(());
        };
        sink.send(event)
            .await
            .map_err(|_| anyhow::anyhow!("pairing stream is closed"))
    }
}

#[async_trait]
impl ProtocolClient for SidecarClient {
    async fn has_session(&self) -> Result<bool> {
        let device = store::get_device(&self.pool, self.db_kind, &self.account_id).await?;
        Ok(device.is_some())
    }

    async fn pairing_events(&self) -> Result<mpsc::Receiver<PairingEvent>> {
        let (tx, rx) = mpsc::channel(PAIRING_BUFFER);
        let mut guard = self
            .pairing
            .lock()
            .map_err(|_| anyhow::anyhow!("pairing state poisoned"))?;
        *guard = Some(tx);
        Ok(rx)
    }

    async fn connect(&self) -> Result<()> {
        self.post(
            "/connect",
            serde_json::json!({ "account_id": self.account_id }),
        )
        .await
    }

    async fn disconnect(&self) -> Result<()> {
        self.post(
            "/disconnect",
            serde_json::json!({ "account_id": self.account_id }),
        )
        .await
    }

    async fn send_message(&self, chat: &ConversationId, body: &OutboundBody) -> Result<()> {
        self.post(
            "/send",
            serde_json::json!({
                "account_id": self.account_id,
                "to": chat,
                "text": body.text,
            }),
        )
        .await
    }

    fn subscribe_events(&self, sink: mpsc::Sender<ProtocolEvent>) {
        match self.events.lock() {
            Ok(mut guard) => *guard = Some(sink),
            Err(_) => warn!("event sink state poisoned, handler not registered"),
        }
    }
}
