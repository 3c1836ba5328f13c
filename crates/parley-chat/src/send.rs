use anyhow::anyhow;
use parley_db::{conversations, emojis, limits, messages, now_timestamp};
use parley_types::models::{ImageInfo, LimitStatus, Message, MessageBody, MessageType};
use tracing::{debug, info, warn};

use crate::conversation::open_conversation;
use crate::error::{ChatError, Result};
use crate::service::ChatService;

/// An unvalidated message as submitted by a client.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub message_type: MessageType,
    pub content: Option<String>,
    pub images: Option<Vec<ImageInfo>>,
    pub emoji_id: Option<i64>,
}

impl MessageDraft {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::Text,
            content: Some(content.into()),
            images: None,
            emoji_id: None,
        }
    }

    pub fn images(images: Vec<ImageInfo>) -> Self {
        Self {
            message_type: MessageType::Image,
            content: None,
            images: Some(images),
            emoji_id: None,
        }
    }

    pub fn emoji(emoji_id: i64) -> Self {
        Self {
            message_type: MessageType::Emoji,
            content: None,
            images: None,
            emoji_id: Some(emoji_id),
        }
    }

    /// Check the payload against the declared type. Fields that do not belong
    /// to the type are dropped.
    pub fn into_body(self) -> Result<MessageBody> {
        match self.message_type {
            MessageType::Text => self
                .content
                .filter(|text| !text.trim().is_empty())
                .map(MessageBody::Text)
                .ok_or_else(|| ChatError::invalid("text message content cannot be empty")),
            MessageType::Image => {
                let images = self
                    .images
                    .filter(|list| !list.is_empty())
                    .ok_or_else(|| ChatError::invalid("image message must include at least one image"))?;
                if images.iter().any(|img| img.url.trim().is_empty()) {
                    return Err(ChatError::invalid("every image needs a url"));
                }
                Ok(MessageBody::Image(images))
            }
            MessageType::Emoji => self
                .emoji_id
                .map(MessageBody::Emoji)
                .ok_or_else(|| ChatError::invalid("emoji message must reference an emoji")),
        }
    }
}

impl ChatService {
    /// Deliver a message from `sender_id` to `receiver_id`.
    ///
    /// Users who do not follow each other share a small daily allowance per
    /// direction. The allowance, the message row and the conversation summary
    /// commit together or not at all. The receiver is notified after commit,
    /// and a notification failure never fails the send.
    pub fn send_message(&self, sender_id: i64, receiver_id: i64, draft: MessageDraft) -> Result<Message> {
        if sender_id == receiver_id {
            return Err(ChatError::invalid("cannot send a message to yourself"));
        }
        let body = draft.into_body()?;

        // Follow state can change between messages; never cache it.
        let mutual = self.follows.is_mutual(sender_id, receiver_id)?;
        let today = self.clock.today();
        let limit = self.daily_limit;
        let preview = body.preview();

        let message = self.db.with_tx(|tx| {
            let now = now_timestamp();

            if !mutual && !limits::try_consume(tx, sender_id, receiver_id, today, limit, &now)? {
                return Err(ChatError::RateLimited { limit });
            }

            let conv = open_conversation(tx, sender_id, receiver_id, &now)?;

            if let MessageBody::Emoji(emoji_id) = &body {
                if !emojis::is_active(tx, *emoji_id)? {
                    return Err(ChatError::invalid(format!("emoji {} is not available", emoji_id)));
                }
            }

            let message_id = messages::insert(tx, conv.id, sender_id, receiver_id, &body, &now)?;

            let receiver_side = conv
                .side_of(receiver_id)
                .ok_or_else(|| anyhow!("receiver {} not in conversation {}", receiver_id, conv.id))?;
            conversations::record_message(
                tx,
                conv.id,
                message_id,
                &preview,
                body.message_type(),
                receiver_side,
                &now,
            )?;

            let message = messages::find_by_id(tx, message_id)?
                .ok_or_else(|| anyhow!("message {} missing after insert", message_id))?;
            Ok(message)
        });

        let message = match message {
            Ok(message) => message,
            Err(ChatError::RateLimited { limit }) => {
                info!(sender_id, receiver_id, limit, "Daily message limit reached");
                return Err(ChatError::RateLimited { limit });
            }
            Err(e) => return Err(e),
        };

        debug!(
            message_id = message.id,
            conversation_id = message.conversation_id,
            mutual,
            "Message stored"
        );

        if let Err(e) = self.sink.notify_new_message(&message, &preview) {
            warn!("Failed to notify user {} of message {}: {}", receiver_id, message.id, e);
        }

        Ok(message)
    }

    /// Pre-flight for the compose box: whether another message would pass the
    /// daily limit right now. Mutual follows are never limited.
    pub fn check_message_limit(&self, sender_id: i64, receiver_id: i64) -> Result<LimitStatus> {
        if sender_id == receiver_id {
            return Err(ChatError::invalid("cannot send a message to yourself"));
        }

        let daily_limit = self.daily_limit;
        if self.follows.is_mutual(sender_id, receiver_id)? {
            return Ok(LimitStatus {
                can_send: true,
                mutual_follow: true,
                message_count: 0,
                daily_limit,
            });
        }

        let today = self.clock.today();
        let used = self
            .db
            .with_conn(|conn| limits::used_on(conn, sender_id, receiver_id, today))?;

        Ok(LimitStatus {
            can_send: used < daily_limit,
            mutual_follow: false,
            message_count: used,
            daily_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parley_db::{conversations, limits};
    use parley_types::models::{ImageInfo, MessageType};

    use super::MessageDraft;
    use crate::clock::Clock;
    use crate::error::ChatError;
    use crate::ports::NotificationSink;
    use crate::service::ChatService;
    use crate::testing::{Harness, RecordingSink, SinkCall};

    fn image(url: &str) -> ImageInfo {
        ImageInfo {
            url: url.to_string(),
            width: 100,
            height: 100,
            size: 2048,
            thumbnail: None,
        }
    }

    fn conversation_count(h: &Harness) -> i64 {
        h.db
            .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM chat_conversations", [], |r| r.get(0))?))
            .unwrap()
    }

    fn message_count(h: &Harness) -> i64 {
        h.db
            .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM chat_messages", [], |r| r.get(0))?))
            .unwrap()
    }

    #[test]
    fn payload_must_match_type() {
        let cases = vec![
            MessageDraft::text(""),
            MessageDraft::text("   "),
            MessageDraft { content: None, ..MessageDraft::text("x") },
            MessageDraft::images(vec![]),
            MessageDraft::images(vec![image("")]),
            MessageDraft { emoji_id: None, ..MessageDraft::emoji(1) },
            // Text payload under the image type does not count.
            MessageDraft { message_type: MessageType::Image, ..MessageDraft::text("hello") },
        ];
        for draft in cases {
            assert!(
                matches!(draft.clone().into_body(), Err(ChatError::InvalidArgument(_))),
                "accepted {:?}",
                draft
            );
        }

        assert!(MessageDraft::text("hi").into_body().is_ok());
        assert!(MessageDraft::images(vec![image("/a.png")]).into_body().is_ok());
        assert!(MessageDraft::emoji(1).into_body().is_ok());
    }

    #[test]
    fn invalid_payload_has_no_side_effects() {
        let h = Harness::new();
        let a = h.user("alice");
        let b = h.user("bob");

        assert!(matches!(
            h.chat.send_message(a, b, MessageDraft::text("")),
            Err(ChatError::InvalidArgument(_))
        ));
        assert!(matches!(
            h.chat.send_message(a, a, MessageDraft::text("me")),
            Err(ChatError::InvalidArgument(_))
        ));
        assert_eq!(conversation_count(&h), 0);
        assert_eq!(h.chat.check_message_limit(a, b).unwrap().message_count, 0);
    }

    #[test]
    fn send_updates_summary_and_receiver_unread_only() {
        let h = Harness::new();
        let a = h.user("alice");
        let b = h.user("bob");

        let sent = h.chat.send_message(a, b, MessageDraft::text("hello bob")).unwrap();
        assert_eq!(sent.sender_id, a);
        assert_eq!(sent.receiver_id, b);
        assert!(!sent.is_read);
        assert!(!sent.is_deleted_by_sender && !sent.is_deleted_by_receiver);

        let conv = h
            .db
            .with_conn(|c| conversations::find_by_id(c, sent.conversation_id))
            .unwrap()
            .unwrap();
        let side_b = conv.side_of(b).unwrap();
        assert_eq!(conv.unread_count(side_b), 1);
        assert_eq!(conv.unread_count(side_b.other()), 0);
        assert_eq!(conv.last_message_id, Some(sent.id));
        assert_eq!(conv.last_message_preview.as_deref(), Some("hello bob"));
        assert_eq!(conv.last_message_type, Some(MessageType::Text));
        assert!(conv.last_message_at.is_some());
    }

    #[test]
    fn placeholders_for_non_text_previews() {
        let h = Harness::new();
        let a = h.user("alice");
        let b = h.user("bob");
        h.befriend(a, b);

        h.chat.send_message(a, b, MessageDraft::images(vec![image("/p.png")])).unwrap();
        let view = h.chat.get_or_create_conversation(a, b).unwrap();
        assert_eq!(view.conversation.last_message_preview.as_deref(), Some("[image]"));

        let smile = h.db.list_emojis().unwrap().remove(0);
        let sent = h.chat.send_message(b, a, MessageDraft::emoji(smile.id)).unwrap();
        assert_eq!(sent.emoji_id, Some(smile.id));
        assert_eq!(sent.emoji.as_ref().map(|e| e.code.as_str()), Some(smile.code.as_str()));

        let (listed, _) = h.chat.list_messages(sent.conversation_id, a, 1, 50).unwrap();
        let image_msg = &listed[0];
        assert!(image_msg.emoji.is_none());
        assert_eq!(listed[1].emoji.as_ref().map(|e| e.id), Some(smile.id));

        let view = h.chat.get_or_create_conversation(a, b).unwrap();
        assert_eq!(view.conversation.last_message_preview.as_deref(), Some("[emoji]"));
        assert_eq!(view.conversation.last_message_type, Some(MessageType::Emoji));

        assert!(h.sink.calls().iter().any(|call| matches!(
            call,
            SinkCall::Notified { preview, .. } if preview == "[emoji]"
        )));
    }

    #[test]
    fn unknown_emoji_rolls_back_everything() {
        let h = Harness::new();
        let a = h.user("alice");
        let b = h.user("bob");

        assert!(matches!(
            h.chat.send_message(a, b, MessageDraft::emoji(4_242)),
            Err(ChatError::InvalidArgument(_))
        ));
        assert_eq!(message_count(&h), 0);
        assert_eq!(conversation_count(&h), 0);
        assert_eq!(h.chat.check_message_limit(a, b).unwrap().message_count, 0);
    }

    #[test]
    fn fourth_message_to_stranger_is_rate_limited_until_mutual() {
        let h = Harness::new();
        let a = h.user("alice");
        let b = h.user("bob");

        for i in 0..3 {
            h.chat.send_message(a, b, MessageDraft::text(format!("msg {}", i))).unwrap();
        }
        let status = h.chat.check_message_limit(a, b).unwrap();
        assert_eq!(status.message_count, 3);
        assert!(!status.can_send);
        assert!(!status.mutual_follow);

        assert!(matches!(
            h.chat.send_message(a, b, MessageDraft::text("one more")),
            Err(ChatError::RateLimited { limit: 3 })
        ));
        assert_eq!(message_count(&h), 3);

        // The cap is per direction.
        h.chat.send_message(b, a, MessageDraft::text("hi back")).unwrap();

        h.befriend(a, b);
        h.chat.send_message(a, b, MessageDraft::text("now we are friends")).unwrap();
        let status = h.chat.check_message_limit(a, b).unwrap();
        assert!(status.can_send && status.mutual_follow);
        assert_eq!(status.message_count, 0);

        // Mutual sends never touch the ledger.
        let used = h
            .db
            .with_conn(|c| limits::used_on(c, a, b, h.clock.today()))
            .unwrap();
        assert_eq!(used, 3);
    }

    #[test]
    fn mutual_pairs_are_never_capped() {
        let h = Harness::new();
        let a = h.user("alice");
        let b = h.user("bob");
        h.befriend(a, b);

        for i in 0..20 {
            h.chat.send_message(a, b, MessageDraft::text(format!("{}", i))).unwrap();
        }
        assert_eq!(message_count(&h), 20);
    }

    #[test]
    fn allowance_resets_on_a_new_day() {
        let h = Harness::new();
        let a = h.user("alice");
        let b = h.user("bob");

        for _ in 0..3 {
            h.chat.send_message(a, b, MessageDraft::text("hey")).unwrap();
        }
        assert!(h.chat.send_message(a, b, MessageDraft::text("hey")).is_err());

        h.clock.advance_day();
        h.chat.send_message(a, b, MessageDraft::text("new day")).unwrap();
        assert_eq!(h.chat.check_message_limit(a, b).unwrap().message_count, 1);
    }

    #[test]
    fn unfollowing_brings_the_cap_back() {
        let h = Harness::new();
        let a = h.user("alice");
        let b = h.user("bob");
        h.befriend(a, b);
        for _ in 0..5 {
            h.chat.send_message(a, b, MessageDraft::text("free")).unwrap();
        }

        h.db.unfollow(b, a).unwrap();
        for _ in 0..3 {
            h.chat.send_message(a, b, MessageDraft::text("capped")).unwrap();
        }
        assert!(matches!(
            h.chat.send_message(a, b, MessageDraft::text("blocked")),
            Err(ChatError::RateLimited { .. })
        ));
    }

    #[test]
    fn failed_summary_update_rolls_back_message_and_allowance() {
        let h = Harness::new();
        let a = h.user("alice");
        let b = h.user("bob");
        h.db
            .with_conn(|c| {
                c.execute_batch(
                    "CREATE TRIGGER reject_summary BEFORE UPDATE OF last_message_id ON chat_conversations
                     BEGIN SELECT RAISE(ABORT, 'summary update rejected'); END;",
                )?;
                Ok(())
            })
            .unwrap();

        assert!(matches!(
            h.chat.send_message(a, b, MessageDraft::text("lost")),
            Err(ChatError::Internal(_))
        ));

        let limit_rows: i64 = h
            .db
            .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM chat_daily_limits", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(message_count(&h), 0);
        assert_eq!(limit_rows, 0);
        assert_eq!(conversation_count(&h), 0);
        assert!(h.sink.calls().is_empty());
    }

    /// Sends through one service serialize on its connection lock; this covers
    /// the end-to-end count. Cross-connection races on the allowance itself are
    /// covered in `parley_db::limits`.
    #[test]
    fn concurrent_sends_through_one_service_stop_at_the_cap() {
        let h = Harness::new();
        let a = h.user("alice");
        let b = h.user("bob");

        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let chat = &h.chat;
                    scope.spawn(move || chat.send_message(a, b, MessageDraft::text(format!("race {}", i))))
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        let sent = results.iter().filter(|r| r.is_ok()).count();
        let limited = results
            .iter()
            .filter(|r| matches!(r, Err(ChatError::RateLimited { .. })))
            .count();
        assert_eq!(sent, 3);
        assert_eq!(limited, 5);
        assert_eq!(message_count(&h), 3);
    }

    #[test]
    fn notification_failure_does_not_fail_send() {
        let h = Harness::new();
        let a = h.user("alice");
        let b = h.user("bob");

        h.sink.fail_all();
        let sent = h.chat.send_message(a, b, MessageDraft::text("still delivered")).unwrap();
        let (messages, _) = h.chat.list_messages(sent.conversation_id, b, 1, 50).unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn receiver_is_notified_after_commit() {
        let h = Harness::new();
        let a = h.user("alice");
        let b = h.user("bob");

        let sent = h.chat.send_message(a, b, MessageDraft::text("ping")).unwrap();
        assert_eq!(
            h.sink.calls(),
            vec![SinkCall::Notified {
                message_id: sent.id,
                receiver_id: b,
                preview: "ping".into(),
            }]
        );
    }

    #[test]
    fn configurable_limit() {
        let h = Harness::new();
        let a = h.user("alice");
        let b = h.user("bob");
        let sink: Arc<dyn NotificationSink> = Arc::new(RecordingSink::default());
        let chat = ChatService::new(h.db.clone(), h.db.clone(), sink).with_daily_limit(1);

        chat.send_message(a, b, MessageDraft::text("only one")).unwrap();
        assert!(matches!(
            chat.send_message(a, b, MessageDraft::text("second")),
            Err(ChatError::RateLimited { limit: 1 })
        ));
    }
}
