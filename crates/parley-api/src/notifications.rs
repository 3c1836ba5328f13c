use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};

use parley_chat::page_offset;
use parley_types::api::{
    Claims, DEFAULT_CONVERSATION_PAGE_SIZE, NotificationListResponse, PageQuery, PaginationMeta,
};

use crate::error::{ApiError, blocking};
use crate::state::AppState;

/// The caller's notifications, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit) = query.resolve(DEFAULT_CONVERSATION_PAGE_SIZE);
    let offset = page_offset(page, limit);

    let (notifications, total) = blocking(move || {
        let rows = state.db.list_notifications(claims.sub, limit, offset)?;
        let total = state.db.count_notifications(claims.sub)?;
        Ok((rows, total))
    })
    .await?;

    Ok(Json(NotificationListResponse {
        notifications,
        pagination: PaginationMeta::new(page, limit, total),
    }))
}
