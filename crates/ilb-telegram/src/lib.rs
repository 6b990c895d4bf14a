//! Telegram adapter (teloxide).
//!
//! Implements the `ilb-core` ports over the Telegram Bot API and hosts the
//! webhook listener that feeds updates into the core router.

pub mod directory;
pub mod gateway;
pub mod webhook;

use std::time::Duration;

use async_trait::async_trait;

use teloxide::payloads::SendMessageSetters;
use teloxide::requests::Requester;
use teloxide::types::ParseMode;
use teloxide::Bot;

use ilb_core::{
    domain::{ChatId, MessageId},
    errors::Error,
    ports::Messenger,
    Result,
};

/// Build a `Bot` whose every request carries a bounded deadline; a timeout
/// surfaces like any other transport failure.
pub fn bot_with_timeout(token: &str, timeout: Duration) -> Result<Bot> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Transport(format!("http client: {e}")))?;
    Ok(Bot::with_client(token, client))
}

pub(crate) fn tg_chat(id: i64) -> teloxide::types::ChatId {
    teloxide::types::ChatId(id)
}

pub(crate) fn map_err(e: teloxide::RequestError) -> Error {
    match e {
        teloxide::RequestError::Api(api) => Error::Upstream(api.to_string()),
        other => Error::Transport(other.to_string()),
    }
}

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_html(
        &self,
        chat: ChatId,
        reply_to: Option<MessageId>,
        html: &str,
    ) -> Result<()> {
        let mut req = self
            .bot
            .send_message(tg_chat(chat.0), html.to_string())
            .parse_mode(ParseMode::Html)
            .disable_web_page_preview(true);
        if let Some(id) = reply_to {
            req = req.reply_to_message_id(teloxide::types::MessageId(id.0));
        }
        req.await.map_err(map_err)?;
        Ok(())
    }
}
