use crate::alias::AliasTable;
use crate::channels::ProtocolClient;
use crate::config::RelayConfig;
use crate::extract::extract_text;
use crate::responder::Responder;
use crate::session::{SessionState, SessionStatus};
use crate::types::{InboundMessageEvent, OutboundBody, ProtocolEvent, RelayRequest, Reply};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How one inbound message ended. Only `Delivered` produced an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    EmptyText,
    ResponderFailed,
    NoReply,
    SendFailed,
    Delivered,
}

pub fn format_message(display_name: &str, text: &str) -> String {
    format!("{}: {}", display_name, text)
}

pub struct RelayEngine {
    aliases: Arc<AliasTable>,
    responder: Arc<dyn Responder>,
    client: Arc<dyn ProtocolClient>,
    status: SessionStatus,
    max_in_flight: usize,
    send_timeout: Duration,
    drain_timeout: Duration,
}

impl RelayEngine {
    pub fn new(
        cfg: &RelayConfig,
        aliases: Arc<AliasTable>,
        responder: Arc<dyn Responder>,
        client: Arc<dyn ProtocolClient>,
        status: SessionStatus,
    ) -> Self {
        Self {
            aliases,
            responder,
            client,
            status,
            max_in_flight: cfg.max_in_flight.max(1),
            send_timeout: Duration::from_secs(cfg.send_timeout_secs),
            drain_timeout: Duration::from_secs(cfg.drain_timeout_secs),
        }
    }

    /// Runs one inbound message through extract → alias → responder → send.
    /// Never fails: every failure is logged and ends the relay for this event.
    pub async fn relay(&self, event: &InboundMessageEvent) -> RelayOutcome {
        let text = extract_text(&event.payload);
        let sender_name = self.aliases.resolve(event.sender.user());
        if text.is_empty() {
            debug!(event_id = %event.id, sender = %sender_name, chat = %event.chat, "nothing to relay");
            return RelayOutcome::EmptyText;
        }

        if event.is_group {
            info!(sender = %sender_name, group = %event.chat.user(), text = %text, "group message");
        } else {
            info!(sender = %sender_name, text = %text, "private message");
        }

        let request = RelayRequest {
            text: format_message(sender_name, &text),
            chat: event.chat.clone(),
        };
        let reply = match self.responder.ask(&request).await {
            Ok(reply) => reply,
            Err(err) => {
                error!(chat = %event.chat, error = %err, "responder request failed");
                return RelayOutcome::ResponderFailed;
            }
        };

        let body = match reply {
            Reply::NoReply => {
                info!(chat = %event.chat, "response: no message");
                return RelayOutcome::NoReply;
            }
            Reply::Text(body) => body,
        };
        info!(chat = %event.chat, response = %body, "response");

        let outbound = OutboundBody::text(body);
        match tokio::time::timeout(
            self.send_timeout,
            self.client.send_message(&event.chat, &outbound),
        )
        .await
        {
            Ok(Ok(())) => RelayOutcome::Delivered,
            Ok(Err(err)) => {
                error!(chat = %event.chat, error = %err, "error sending message");
                RelayOutcome::SendFailed
            }
            Err(_) => {
                error!(chat = %event.chat, timeout = ?self.send_timeout, "sending message timed out");
                RelayOutcome::SendFailed
            }
        }
    }

    /// Consumes transport events until cancelled or the sender side closes,
    /// then drains in-flight relays for at most the drain timeout.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<ProtocolEvent>,
        cancel: CancellationToken,
    ) {
        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        let mut in_flight = JoinSet::new();

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(err) = joined {
                        error!(error = %err, "relay task failed");
                    }
                    continue;
                }
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                ProtocolEvent::Message(message) => {
                    let permit = tokio::select! {
                        _ = cancel.cancelled() => break,
                        permit = permits.clone().acquire_owned() => match permit {
                            Ok(permit) => permit,
                            Err(_) => break,
                        },
                    };
                    let engine = Arc::clone(&self);
                    in_flight.spawn(async move {
                        let _permit = permit;
                        engine.relay(&message).await
                    });
                }
                ProtocolEvent::Connected => {
                    info!("transport connected");
                    self.status.set(SessionState::Connected);
                }
                ProtocolEvent::Disconnected { reason } => {
                    warn!(reason = ?reason, "transport disconnected; reconnection is up to the transport");
                    self.status.set(SessionState::Disconnected);
                }
                ProtocolEvent::LoggedOut { reason } => {
                    error!(reason = ?reason, "device logged out; restart to pair again");
                    self.status.set(SessionState::Unpaired);
                }
            }
        }

        if in_flight.is_empty() {
            return;
        }
        info!(in_flight = in_flight.len(), "draining in-flight relays");
        let drained = tokio::time::timeout(self.drain_timeout, async {
            while let Some(joined) = in_flight.join_next().await {
                if let Err(err) = joined {
                    error!(error = %err, "relay task failed");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(remaining = in_flight.len(), "drain timed out, aborting in-flight relays");
            in_flight.abort_all();
        }
    }
}
