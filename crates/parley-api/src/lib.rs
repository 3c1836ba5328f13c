pub mod auth;
pub mod chat;
pub mod error;
pub mod follows;
pub mod middleware;
pub mod notifications;
pub mod notifier;
pub mod state;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};

pub use state::{AppState, AppStateInner};

/// Every REST route. `/auth/*` is public; everything else needs a bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route(
            "/chat/conversations",
            get(chat::list_conversations).post(chat::create_conversation),
        )
        .route("/chat/conversations/{conversation_id}", delete(chat::delete_conversation))
        .route("/chat/conversations/{conversation_id}/messages", get(chat::list_messages))
        .route("/chat/conversations/{conversation_id}/read", put(chat::mark_read))
        .route("/chat/messages", post(chat::send_message))
        .route("/chat/messages/{message_id}", delete(chat::delete_message))
        .route("/chat/check-limit", post(chat::check_limit))
        .route("/chat/emojis", get(chat::list_emojis))
        .route("/users/{user_id}/follow", post(follows::follow).delete(follows::unfollow))
        .route("/notifications", get(notifications::list_notifications))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
