use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;

use parley_types::api::{Claims, FollowResponse};

use crate::error::{ApiError, blocking};
use crate::state::AppState;

pub async fn follow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if user_id == claims.sub {
        return Err(ApiError::BadRequest("cannot follow yourself".into()));
    }

    let response = blocking(move || {
        if state.db.get_profile(user_id)?.is_none() {
            return Err(ApiError::UserNotFound);
        }
        if state.db.follow(claims.sub, user_id)? {
            info!("User {} followed {}", claims.sub, user_id);
        }
        Ok(FollowResponse {
            following: true,
            followed_by: state.db.is_following(user_id, claims.sub)?,
        })
    })
    .await?;

    Ok(Json(response))
}

pub async fn unfollow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let response = blocking(move || {
        if state.db.unfollow(claims.sub, user_id)? {
            info!("User {} unfollowed {}", claims.sub, user_id);
        }
        Ok(FollowResponse {
            following: false,
            followed_by: state.db.is_following(user_id, claims.sub)?,
        })
    })
    .await?;

    Ok(Json(response))
}
