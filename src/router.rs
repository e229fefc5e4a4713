use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::config::TelegramConfig;
use crate::l10n::Localizer;
use crate::messaging::{Courier, IncomingMessage};
use crate::storage::RouteStore;

/// Decides, per incoming message, whether the sender is the owner or an
/// anonymous user and whether the message opens a new thread or continues
/// one, then performs the matching store/forward operation.
pub struct Router {
    telegram: TelegramConfig,
    localizer: Arc<Localizer>,
    store: Arc<dyn RouteStore>,
    courier: Arc<dyn Courier>,
}

impl Router {
    pub fn new(
        telegram: TelegramConfig,
        localizer: Arc<Localizer>,
        store: Arc<dyn RouteStore>,
        courier: Arc<dyn Courier>,
    ) -> Self {
        Self {
            telegram,
            localizer,
            store,
            courier,
        }
    }

    fn is_owner(&self, msg: &IncomingMessage) -> bool {
        msg.sender_username.as_deref() == Some(self.telegram.owner_username.as_str())
    }

    pub async fn handle_start(&self, msg: &IncomingMessage) -> Result<()> {
        let text = if self.is_owner(msg) {
            self.localizer.render(
                "owner_welcome",
                &self.telegram.owner_language,
                &[&self.telegram.owner_username],
            )
        } else {
            self.localizer.get("user_welcome", msg.language())
        };
        self.reply(msg, &text).await
    }

    pub async fn handle_id(&self, msg: &IncomingMessage) -> Result<()> {
        let text = if self.is_owner(msg) {
            self.localizer
                .render("your_chat_id", msg.language(), &[&msg.chat_id.to_string()])
        } else {
            self.localizer.get("not_owner", msg.language())
        };
        self.reply(msg, &text).await
    }

    pub async fn handle_status(&self, msg: &IncomingMessage) -> Result<()> {
        let lang = msg.language();
        let text = if self.is_owner(msg) {
            let mut text = self.localizer.get("status_title", lang);
            if self.telegram.owner_chat_id == 0 {
                text.push_str(&self.localizer.get("status_no_chat_id", lang));
            } else if self.telegram.owner_chat_id != msg.chat_id {
                text.push_str(&self.localizer.get("status_chat_id_mismatch", lang));
            } else {
                text.push_str(&self.localizer.get("status_ok", lang));
            }
            text
        } else {
            self.localizer.get("not_owner", lang)
        };
        self.reply(msg, &text).await
    }

    pub async fn handle_language(&self, msg: &IncomingMessage) -> Result<()> {
        let text = self
            .localizer
            .render("your_language", msg.language(), &[msg.language()]);
        self.reply(msg, &text).await
    }

    pub async fn handle_text(&self, msg: &IncomingMessage) -> Result<()> {
        if self.is_owner(msg) {
            self.handle_owner_text(msg).await
        } else {
            self.handle_user_text(msg).await
        }
    }

    async fn handle_owner_text(&self, msg: &IncomingMessage) -> Result<()> {
        let Some(reply_to) = msg.reply_to else {
            let hint = self.localizer.get("reply_hint", msg.language());
            return self.reply(msg, &hint).await;
        };
        self.relay_reply(msg, reply_to).await?;
        let ack = self.localizer.get("reply_sent", msg.language());
        self.reply(msg, &ack).await
    }

    async fn handle_user_text(&self, msg: &IncomingMessage) -> Result<()> {
        if let Some(reply_to) = msg.reply_to {
            self.relay_reply(msg, reply_to).await?;
            let ack = self.localizer.get("reply_sent", msg.language());
            return self.reply(msg, &ack).await;
        }

        if self.telegram.owner_chat_id == 0 {
            bail!("owner chat id is not configured, cannot forward the question");
        }

        debug!("Forwarding question from chat {}", msg.chat_id);
        let text = self.localizer.render(
            "incoming_question",
            &self.telegram.owner_language,
            &[&msg.text],
        );
        let forwarded = self
            .courier
            .send(self.telegram.owner_chat_id, &text, None)
            .await
            .context("unable to forward question to owner")?;
        self.store
            .set(
                forwarded.chat_id,
                forwarded.message_id,
                msg.chat_id,
                msg.message_id,
            )
            .await
            .context("unable to save route for question")?;

        // The question is already through; a lost acknowledgement is not
        // worth failing the whole relay over.
        let ack = self.localizer.get("question_sent", msg.language());
        self.courier
            .send(msg.chat_id, &ack, Some(msg.message_id))
            .await
            .ok();
        Ok(())
    }

    /// Common leg for both directions: find where the replied-to message was
    /// forwarded from, deliver the text there as a threaded reply, and record
    /// the reverse route so the conversation can keep alternating.
    async fn relay_reply(&self, msg: &IncomingMessage, reply_to: i32) -> Result<()> {
        let (origin_chat, origin_msg) = self
            .store
            .get(msg.chat_id, reply_to)
            .await?
            .context("replied-to message is not tracked")?;

        debug!(
            "Relaying reply from chat {} to chat {}",
            msg.chat_id, origin_chat
        );
        let delivered = self
            .courier
            .send(origin_chat, &msg.text, Some(origin_msg))
            .await
            .context("unable to deliver reply")?;
        self.store
            .set(
                delivered.chat_id,
                delivered.message_id,
                msg.chat_id,
                msg.message_id,
            )
            .await
            .context("unable to save route for reply")?;
        Ok(())
    }

    async fn reply(&self, msg: &IncomingMessage, text: &str) -> Result<()> {
        self.courier
            .send(msg.chat_id, text, Some(msg.message_id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::l10n::Bundle;
    use crate::messaging::SentMessage;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    const OWNER_CHAT: i64 = 10;
    const USER_CHAT: i64 = 55;

    #[derive(Debug, Clone, PartialEq)]
    struct Delivery {
        chat_id: i64,
        message_id: i32,
        text: String,
        reply_to: Option<i32>,
    }

    /// Records every send and hands out message ids from 100 upwards.
    #[derive(Default)]
    struct RecordingCourier {
        deliveries: Mutex<Vec<Delivery>>,
    }

    impl RecordingCourier {
        async fn deliveries(&self) -> Vec<Delivery> {
            self.deliveries.lock().await.clone()
        }
    }

    #[async_trait]
    impl Courier for RecordingCourier {
        async fn send(
            &self,
            chat_id: i64,
            text: &str,
            reply_to: Option<i32>,
        ) -> Result<SentMessage> {
            let mut deliveries = self.deliveries.lock().await;
            let message_id = 100 + deliveries.len() as i32;
            deliveries.push(Delivery {
                chat_id,
                message_id,
                text: text.to_string(),
                reply_to,
            });
            Ok(SentMessage {
                chat_id,
                message_id,
            })
        }
    }

    fn test_localizer() -> Localizer {
        let mut localizer = Localizer::new("en");
        localizer
            .add_bundle(
                Bundle::parse(
                    r#"
                    locale-code = "en"
                    display-name = "English"

                    [messages]
                    owner_welcome = "You are the owner: {}"
                    user_welcome = "Welcome, ask away"
                    reply_hint = "Reply to a forwarded question to answer it"
                    incoming_question = "New question: {}"
                    question_sent = "Question sent"
                    reply_sent = "Reply sent"
                    your_chat_id = "Your chat ID is: {}"
                    your_language = "Your language code is: {}"
                    status_title = "Bot status: "
                    status_no_chat_id = "owner chat ID is not configured"
                    status_chat_id_mismatch = "owner chat ID does not match this chat"
                    status_ok = "everything is configured"
                    not_owner = "Owner only"
                    "#,
                )
                .unwrap(),
            )
            .unwrap();
        localizer
    }

    fn test_router(owner_chat_id: i64) -> (Router, Arc<RecordingCourier>) {
        let telegram = TelegramConfig {
            bot_token: "token".to_string(),
            owner_username: "alice".to_string(),
            owner_chat_id,
            owner_language: "en".to_string(),
        };
        let courier = Arc::new(RecordingCourier::default());
        let router = Router::new(
            telegram,
            Arc::new(test_localizer()),
            Arc::new(MemoryStorage::new()),
            courier.clone(),
        );
        (router, courier)
    }

    fn owner_msg(message_id: i32, text: &str, reply_to: Option<i32>) -> IncomingMessage {
        IncomingMessage {
            chat_id: OWNER_CHAT,
            message_id,
            sender_username: Some("alice".to_string()),
            language_code: Some("en".to_string()),
            text: text.to_string(),
            reply_to,
        }
    }

    fn user_msg(message_id: i32, text: &str, reply_to: Option<i32>) -> IncomingMessage {
        IncomingMessage {
            chat_id: USER_CHAT,
            message_id,
            sender_username: Some("bob".to_string()),
            language_code: Some("de".to_string()),
            text: text.to_string(),
            reply_to,
        }
    }

    #[tokio::test]
    async fn question_and_replies_route_both_ways() {
        let (router, courier) = test_router(OWNER_CHAT);

        // Anonymous user asks a question.
        router.handle_text(&user_msg(1, "Hello", None)).await.unwrap();

        let sent = courier.deliveries().await;
        assert_eq!(sent.len(), 2);
        // Forwarded copy lands in the owner chat, not threaded to anything.
        assert_eq!(sent[0].chat_id, OWNER_CHAT);
        assert_eq!(sent[0].text, "New question: Hello");
        assert_eq!(sent[0].reply_to, None);
        let forwarded_id = sent[0].message_id;
        // User gets an acknowledgement threaded to their question.
        assert_eq!(sent[1].chat_id, USER_CHAT);
        assert_eq!(sent[1].text, "Question sent");
        assert_eq!(sent[1].reply_to, Some(1));

        // Owner answers by replying to the forwarded copy.
        router
            .handle_text(&owner_msg(2, "Hi there", Some(forwarded_id)))
            .await
            .unwrap();

        let sent = courier.deliveries().await;
        assert_eq!(sent.len(), 4);
        // The answer arrives in the user chat, threaded to the original question.
        assert_eq!(sent[2].chat_id, USER_CHAT);
        assert_eq!(sent[2].text, "Hi there");
        assert_eq!(sent[2].reply_to, Some(1));
        let answer_id = sent[2].message_id;
        assert_eq!(sent[3].text, "Reply sent");

        // User follows up by replying to the answer.
        router
            .handle_text(&user_msg(3, "Thanks!", Some(answer_id)))
            .await
            .unwrap();

        let sent = courier.deliveries().await;
        assert_eq!(sent.len(), 6);
        // Follow-up reaches the owner, threaded to the owner's answer message.
        assert_eq!(sent[4].chat_id, OWNER_CHAT);
        assert_eq!(sent[4].text, "Thanks!");
        assert_eq!(sent[4].reply_to, Some(2));
    }

    #[tokio::test]
    async fn owner_text_without_reply_gets_a_hint() {
        let (router, courier) = test_router(OWNER_CHAT);

        router
            .handle_text(&owner_msg(1, "Hello?", None))
            .await
            .unwrap();

        let sent = courier.deliveries().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, OWNER_CHAT);
        assert_eq!(sent[0].text, "Reply to a forwarded question to answer it");
    }

    #[tokio::test]
    async fn reply_to_untracked_message_is_an_error() {
        let (router, courier) = test_router(OWNER_CHAT);

        let result = router.handle_text(&owner_msg(2, "Answer", Some(999))).await;
        assert!(result.is_err());
        assert!(courier.deliveries().await.is_empty());
    }

    #[tokio::test]
    async fn question_without_configured_owner_chat_is_an_error() {
        let (router, courier) = test_router(0);

        let result = router.handle_text(&user_msg(1, "Hello", None)).await;
        assert!(result.is_err());
        assert!(courier.deliveries().await.is_empty());
    }

    #[tokio::test]
    async fn id_command_is_owner_only() {
        let (router, courier) = test_router(OWNER_CHAT);

        router.handle_id(&user_msg(1, "/id", None)).await.unwrap();
        router.handle_id(&owner_msg(2, "/id", None)).await.unwrap();

        let sent = courier.deliveries().await;
        assert_eq!(sent[0].text, "Owner only");
        assert_eq!(sent[1].text, format!("Your chat ID is: {}", OWNER_CHAT));
    }

    #[tokio::test]
    async fn status_reports_unconfigured_chat_id() {
        let (router, courier) = test_router(0);

        router
            .handle_status(&owner_msg(1, "/status", None))
            .await
            .unwrap();

        let sent = courier.deliveries().await;
        assert_eq!(
            sent[0].text,
            "Bot status: owner chat ID is not configured"
        );
    }

    #[tokio::test]
    async fn status_reports_mismatched_chat_id() {
        let (router, courier) = test_router(777);

        router
            .handle_status(&owner_msg(1, "/status", None))
            .await
            .unwrap();

        let sent = courier.deliveries().await;
        assert_eq!(
            sent[0].text,
            "Bot status: owner chat ID does not match this chat"
        );
    }

    #[tokio::test]
    async fn status_reports_ok_from_the_configured_chat() {
        let (router, courier) = test_router(OWNER_CHAT);

        router
            .handle_status(&owner_msg(1, "/status", None))
            .await
            .unwrap();

        let sent = courier.deliveries().await;
        assert_eq!(sent[0].text, "Bot status: everything is configured");
    }

    #[tokio::test]
    async fn start_greets_owner_and_user_differently() {
        let (router, courier) = test_router(OWNER_CHAT);

        router
            .handle_start(&owner_msg(1, "/start", None))
            .await
            .unwrap();
        router
            .handle_start(&user_msg(2, "/start", None))
            .await
            .unwrap();

        let sent = courier.deliveries().await;
        assert_eq!(sent[0].text, "You are the owner: alice");
        assert_eq!(sent[1].text, "Welcome, ask away");
    }

    #[tokio::test]
    async fn language_command_echoes_the_reported_code() {
        let (router, courier) = test_router(OWNER_CHAT);

        router
            .handle_language(&owner_msg(1, "/lng", None))
            .await
            .unwrap();

        let sent = courier.deliveries().await;
        assert_eq!(sent[0].text, "Your language code is: en");
    }
}
