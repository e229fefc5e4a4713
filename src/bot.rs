use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ReplyParameters};
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::l10n::Localizer;
use crate::messaging::{Courier, IncomingMessage, SentMessage};
use crate::router::Router;
use crate::storage::RouteStore;

/// Telegram implementation of the courier port.
struct TelegramCourier {
    bot: Bot,
}

#[async_trait]
impl Courier for TelegramCourier {
    async fn send(&self, chat_id: i64, text: &str, reply_to: Option<i32>) -> Result<SentMessage> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(message_id) = reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(message_id)));
        }
        let sent = request.await?;
        Ok(SentMessage {
            chat_id: sent.chat.id.0,
            message_id: sent.id.0,
        })
    }
}

/// Start the Telegram bot
pub async fn run(config: Config, localizer: Arc<Localizer>, store: Arc<dyn RouteStore>) -> Result<()> {
    let bot = Bot::new(&config.telegram.bot_token);

    let courier = Arc::new(TelegramCourier { bot: bot.clone() });
    let router = Arc::new(Router::new(
        config.telegram.clone(),
        localizer.clone(),
        store,
        courier,
    ));

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router, localizer])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("bot"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    router: Arc<Router>,
    localizer: Arc<Localizer>,
) -> ResponseResult<()> {
    let Some(incoming) = to_incoming(&msg) else {
        return Ok(());
    };

    let result = match command_of(&incoming.text) {
        Some("start") => router.handle_start(&incoming).await,
        Some("id") => router.handle_id(&incoming).await,
        Some("status") => router.handle_status(&incoming).await,
        Some("lng") => router.handle_language(&incoming).await,
        Some(other) => {
            debug!("Ignoring unknown command /{}", other);
            Ok(())
        }
        None => router.handle_text(&incoming).await,
    };

    if let Err(e) = result {
        error!("Failed to process message: {:#}", e);
        let text = localizer.get("relay_failed", incoming.language());
        bot.send_message(msg.chat.id, text).await?;
    }

    Ok(())
}

/// First token of a command message, without the leading slash and any
/// `@botname` suffix. `None` for plain text.
fn command_of(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    name.split('@').next()
}

fn to_incoming(msg: &Message) -> Option<IncomingMessage> {
    let from = msg.from.as_ref()?;
    let text = msg.text()?.to_string();
    Some(IncomingMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        sender_username: from.username.clone(),
        language_code: from.language_code.clone(),
        text,
        reply_to: msg.reply_to_message().map(|m| m.id.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_of_extracts_known_shapes() {
        assert_eq!(command_of("/start"), Some("start"));
        assert_eq!(command_of("/status extra words"), Some("status"));
        assert_eq!(command_of("/id@askrelay_bot"), Some("id"));
    }

    #[test]
    fn command_of_rejects_plain_text() {
        assert_eq!(command_of("hello"), None);
        assert_eq!(command_of("hello /start"), None);
        assert_eq!(command_of(""), None);
    }
}
