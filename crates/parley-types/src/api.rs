use serde::{Deserialize, Serialize};

use crate::models::{ConversationView, ImageInfo, Message, MessageType, Notification};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the websocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

// -- Pagination --

pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_CONVERSATION_PAGE_SIZE: u32 = 20;
pub const DEFAULT_MESSAGE_PAGE_SIZE: u32 = 50;

/// `?page=&limit=` query. Kept as raw strings so that missing, non-numeric
/// or out-of-range values fall back to defaults instead of erroring.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    /// Returns `(page, limit)` with `page >= 1` and `limit` in `1..=MAX_PAGE_SIZE`.
    pub fn resolve(&self, default_limit: u32) -> (u32, u32) {
        let page = parse_number(&self.page).filter(|p| *p >= 1).unwrap_or(1);
        let limit = parse_number(&self.limit)
            .filter(|l| (1..=MAX_PAGE_SIZE).contains(l))
            .unwrap_or(default_limit);
        (page, limit)
    }
}

fn parse_number(raw: &Option<String>) -> Option<u32> {
    raw.as_deref().and_then(|v| v.trim().parse().ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let limit_wide = u64::from(limit.max(1));
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit_wide),
        }
    }
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateConversationRequest {
    pub other_user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationView>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    /// Optional echo of the caller's id; must match the token when present.
    #[serde(default)]
    pub sender_id: Option<i64>,
    pub receiver_id: i64,
    pub message_type: MessageType,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<ImageInfo>>,
    #[serde(default)]
    pub emoji_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<Message>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub marked: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckLimitRequest {
    pub receiver_id: i64,
}

// -- Follows --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowResponse {
    pub following: bool,
    pub followed_by: bool,
}

// -- Notifications --

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub pagination: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_falls_back_on_bad_values() {
        let query = |page: &str, limit: &str| PageQuery {
            page: Some(page.to_string()),
            limit: Some(limit.to_string()),
        };

        assert_eq!(query("0", "500").resolve(20), (1, 20));
        assert_eq!(query("3", "10").resolve(20), (3, 10));
        assert_eq!(query("abc", "-5").resolve(20), (1, 20));
        assert_eq!(query("", "ten").resolve(50), (1, 50));

        assert_eq!(PageQuery::default().resolve(50), (1, 50));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(PaginationMeta::new(1, 20, 0).total_pages, 0);
        assert_eq!(PaginationMeta::new(1, 20, 20).total_pages, 1);
        assert_eq!(PaginationMeta::new(1, 20, 21).total_pages, 2);
    }

    #[test]
    fn send_request_accepts_original_client_shape() {
        let req: SendMessageRequest = serde_json::from_str(
            r#"{"sender_id":1,"receiver_id":2,"message_type":"image",
                "images":[{"url":"/u/a.png","width":10,"height":20,"size":300}]}"#,
        )
        .unwrap();
        assert_eq!(req.message_type, MessageType::Image);
        assert_eq!(req.images.unwrap()[0].url, "/u/a.png");
    }
}
