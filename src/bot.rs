use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use teloxide::payloads::DeleteWebhookSetters;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Update, UpdateKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::router::Router;

/// One inbound chat update, reduced to what dispatch needs. Owned by the
/// queue from ingestion until the processing loop consumes it.
#[derive(Debug, Clone)]
pub struct InboundUpdate {
    pub chat: ChatId,
    pub text: String,
}

/// Extracts an [`InboundUpdate`] from a webhook body.
///
/// `Err` means the body was not a Telegram update at all; `Ok(None)` means a
/// well-formed update we don't serve (edits, callbacks, non-text messages).
pub fn parse_update(body: Value) -> Result<Option<InboundUpdate>, serde_json::Error> {
    let update: Update = serde_json::from_value(body)?;
    let UpdateKind::Message(message) = update.kind else {
        return Ok(None);
    };
    let Some(text) = message.text() else {
        return Ok(None);
    };
    Ok(Some(InboundUpdate {
        chat: message.chat.id,
        text: text.to_string(),
    }))
}

/// Splits `/name@BotName arg text` into `("name", "arg text")`.
/// Returns `None` for plain text that isn't a command.
pub fn parse_command(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or(head);
    if name.is_empty() {
        return None;
    }
    Some((name, args))
}

/// Outbound side of a dispatch; the real implementation is the Telegram bot.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_reply(&self, chat: ChatId, text: String);
}

#[async_trait]
impl ReplySink for Bot {
    async fn send_reply(&self, chat: ChatId, text: String) {
        if let Err(e) = self.send_message(chat, text).await {
            error!("failed to send reply to chat {chat}: {e}");
        }
    }
}

/// Consumes queued updates in FIFO order, one at a time, and sends each
/// reply through the sink. Suspends on an empty queue; exits once the
/// producer side is dropped, after draining whatever is still queued.
pub async fn process_updates(
    mut updates: mpsc::UnboundedReceiver<InboundUpdate>,
    router: Router,
    sink: Arc<dyn ReplySink>,
) {
    while let Some(update) = updates.recv().await {
        let Some((command, args)) = parse_command(&update.text) else {
            debug!("ignoring non-command message in chat {}", update.chat);
            continue;
        };
        info!("dispatching /{command} for chat {}", update.chat);
        if let Some(reply) = router.dispatch(command, args).await {
            sink.send_reply(update.chat, reply).await;
        }
    }
    info!("update queue closed, processing loop exiting");
}

/// Owns the messaging session around the HTTP server's start/stop events.
pub struct BotSession {
    bot: Bot,
    public_url: Url,
}

impl BotSession {
    pub fn new(bot: Bot, public_url: Url) -> Self {
        Self { bot, public_url }
    }

    /// Clears any stale webhook registration (a leftover registration would
    /// double-deliver), then registers this deployment's `/telegram` path.
    pub async fn register_webhook(&self) -> Result<()> {
        self.bot
            .delete_webhook()
            .drop_pending_updates(true)
            .await
            .context("failed to clear previous webhook registration")?;

        let endpoint = self
            .public_url
            .join("/telegram")
            .context("could not build webhook URL from PUBLIC_URL")?;
        self.bot
            .set_webhook(endpoint.clone())
            .await
            .with_context(|| format!("failed to register webhook at {endpoint}"))?;

        info!("webhook registered at {endpoint}");
        Ok(())
    }

    /// Best-effort release: stop Telegram from delivering further updates.
    pub async fn release(&self) {
        if let Err(e) = self.bot.delete_webhook().await {
            warn!("failed to remove webhook during shutdown: {e}");
        }
    }
}
