//! Session lifecycle: decide between pairing and a direct connect, keep the
//! published state current, and disconnect on shutdown.
//!
//! ```text
//! Unpaired ──pairing stream──▶ Pairing ──success──▶ Connected ──shutdown──▶ Disconnected
//!                                                       ▲  │
//!        persisted device ── connect ───────────────────┘  └─ transport drop (no reconnect here)
//! ```

use crate::channels::ProtocolClient;
use crate::error::SessionError;
use crate::types::PairingEvent;
use qrcode::render::unicode;
use qrcode::{EcLevel, QrCode};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unpaired,
    Pairing,
    Connected,
    Disconnected,
}

/// Shared view of the current session state, read by the HTTP status route
/// and updated by the relay when the transport reports connection changes.
#[derive(Clone)]
pub struct SessionStatus {
    tx: Arc<watch::Sender<SessionState>>,
}

impl SessionStatus {
    pub fn new(initial: SessionState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> SessionState {
        *self.tx.borrow()
    }

    pub fn set(&self, state: SessionState) {
        self.tx.send_replace(state);
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::new(SessionState::Disconnected)
    }
}

/// Shows a pairing code to the operator.
pub trait CodeRenderer: Send + Sync {
    fn render(&self, code: &str) -> anyhow::Result<()>;
}

/// Half-block QR code on stdout, low error correction.
pub struct TerminalQrRenderer;

impl CodeRenderer for TerminalQrRenderer {
    fn render(&self, code: &str) -> anyhow::Result<()> {
        let qr = QrCode::with_error_correction_level(code, EcLevel::L)?;
        let image = qr
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build();
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", image)?;
        out.flush()?;
        Ok(())
    }
}

pub struct SessionManager {
    client: Arc<dyn ProtocolClient>,
    renderer: Arc<dyn CodeRenderer>,
    status: SessionStatus,
    transitions: Vec<SessionState>,
}

impl SessionManager {
    pub fn new(
        client: Arc<dyn ProtocolClient>,
        renderer: Arc<dyn CodeRenderer>,
        status: SessionStatus,
    ) -> Self {
        Self {
            client,
            renderer,
            status,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.status.get()
    }

    /// States entered by this manager, oldest first.
    pub fn transitions(&self) -> &[SessionState] {
        &self.transitions
    }

    fn transition(&mut self, next: SessionState) {
        info!(from = ?self.status.get(), to = ?next, "session state");
        self.transitions.push(next);
        self.status.set(next);
    }

    /// Brings the session to `Connected`, pairing first when no device is
    /// persisted. Every error returned here is fatal for the process.
    pub async fn start(&mut self, cancel: &CancellationToken) -> Result<(), SessionError> {
        let paired = self.client.has_session().await.map_err(SessionError::Store)?;
        if paired {
            info!("found persisted session, connecting");
            self.client.connect().await.map_err(SessionError::Connect)?;
            self.transition(SessionState::Connected);
            return Ok(());
        }

        self.transition(SessionState::Unpaired);
        self.pair(cancel).await
    }

    async fn pair(&mut self, cancel: &CancellationToken) -> Result<(), SessionError> {
        let mut codes = self
            .client
            .pairing_events()
            .await
            .map_err(SessionError::Connect)?;
        self.transition(SessionState::Pairing);
        self.client.connect().await.map_err(SessionError::Connect)?;

        loop {
            let event = tokio::select! {
                event = codes.recv() => event,
                _ = cancel.cancelled() => return Err(SessionError::Interrupted),
            };
            match event {
                Some(PairingEvent::Code(code)) => {
                    if let Err(err) = self.renderer.render(&code) {
                        warn!(error = %err, code = %code, "could not render pairing code");
                    }
                }
                Some(PairingEvent::Success { jid }) => {
                    info!(jid = ?jid, "pairing succeeded");
                    self.transition(SessionState::Connected);
                    return Ok(());
                }
                Some(other) => info!(event = %other.name(), "login event"),
                None => {
                    error!("pairing stream closed without success");
                    return Err(SessionError::PairingAborted);
                }
            }
        }
    }

    /// Disconnects a live session. Failures are logged; the state still ends
    /// as `Disconnected`.
    pub async fn shutdown(&mut self) {
        if self.status.get() == SessionState::Connected {
            if let Err(err) = self.client.disconnect().await {
                error!(error = %err, "disconnect failed");
            }
        }
        self.transition(SessionState::Disconnected);
    }
}
