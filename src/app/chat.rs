use std::sync::Arc;

use crate::domain::chat::{ChatMessage, NewChatMessage, Sender};
use crate::store::{Store, StoreError};

/// Keyword-routed assistant for the bidder chat widget. Replies are composed
/// locally; no model call is involved.
pub struct ChatService {
    store: Arc<dyn Store>,
}

pub struct ChatExchange {
    pub reply: String,
    /// Present only when the exchange was persisted for an identified bidder.
    pub messages: Option<(ChatMessage, ChatMessage)>,
}

impl ChatService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Answers one message. When `user_id` identifies a bidder the user
    /// message and the reply are both appended to that bidder's log, in that
    /// order; anonymous exchanges leave no trace.
    pub async fn post_message(
        &self,
        user_id: Option<i64>,
        content: &str,
    ) -> Result<ChatExchange, StoreError> {
        let reply = compose_reply(content);
        let messages = match user_id {
            Some(user_id) => {
                let user_msg = self
                    .store
                    .append_chat_message(NewChatMessage {
                        user_id,
                        content: content.to_string(),
                        sender: Sender::User,
                    })
                    .await?;
                let ai_msg = self
                    .store
                    .append_chat_message(NewChatMessage {
                        user_id,
                        content: reply.clone(),
                        sender: Sender::Ai,
                    })
                    .await?;
                Some((user_msg, ai_msg))
            }
            None => None,
        };
        Ok(ChatExchange { reply, messages })
    }

    pub async fn history(&self, user_id: i64) -> Result<Vec<ChatMessage>, StoreError> {
        self.store.chat_history(user_id).await
    }
}

/// Routes on the first matching keyword group; the fallback echoes the
/// question back so the widget never goes silent.
pub fn compose_reply(content: &str) -> String {
    let lower = content.to_lowercase();
    if lower.contains("tender") {
        return "I found several active tenders matching your profile. The Eastern Cape \
                construction tender has an 85% win chance based on your history. Would you \
                like me to prepare a bid draft?"
            .to_string();
    }
    if lower.contains("bee") || lower.contains("task") {
        return "Your worker bees have completed 12 tasks this week. Three tasks are still \
                in progress and one is awaiting your review."
            .to_string();
    }
    if lower.contains("quote") || lower.contains("pricing") {
        return "The latest supplier quote came in below your target price. I can compare \
                it against the previous three quotes if that helps."
            .to_string();
    }
    format!(
        "I'm not sure about \"{}\" yet, but I'm learning. Try asking about tenders, tasks, \
         or quotes.",
        content
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemStore;

    #[test]
    fn keyword_routing_covers_each_branch() {
        assert!(compose_reply("any open tenders?").contains("tender"));
        assert!(compose_reply("how are my bees doing").contains("tasks"));
        assert!(compose_reply("outstanding tasks?").contains("tasks"));
        assert!(compose_reply("latest quote please").contains("quote"));
        assert!(compose_reply("pricing update").contains("quote"));
    }

    #[test]
    fn fallback_echoes_the_question() {
        let reply = compose_reply("what is the weather");
        assert!(reply.contains("what is the weather"));
    }

    #[test]
    fn routing_is_case_insensitive() {
        assert_eq!(compose_reply("TENDER status"), compose_reply("tender status"));
    }

    #[tokio::test]
    async fn identified_exchange_appends_two_messages_in_order() {
        let store = Arc::new(MemStore::new());
        let service = ChatService::new(store.clone());

        let exchange = service.post_message(Some(7), "any tenders?").await.unwrap();
        let (user_msg, ai_msg) = exchange.messages.unwrap();
        assert_eq!(user_msg.sender, Sender::User);
        assert_eq!(ai_msg.sender, Sender::Ai);
        assert_eq!(ai_msg.content, exchange.reply);

        let history = service.history(7).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sender, Sender::User);
        assert_eq!(history[1].sender, Sender::Ai);
    }

    #[tokio::test]
    async fn anonymous_exchange_persists_nothing() {
        let store = Arc::new(MemStore::new());
        let service = ChatService::new(store.clone());

        let exchange = service.post_message(None, "hello").await.unwrap();
        assert!(exchange.messages.is_none());
        assert!(!exchange.reply.is_empty());
        assert!(store.chat_history(1).await.unwrap().is_empty());
    }
}
