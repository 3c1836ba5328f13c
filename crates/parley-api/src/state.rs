use std::sync::Arc;

use parley_chat::ChatService;
use parley_db::Database;
use parley_gateway::dispatcher::Dispatcher;

use crate::notifier::Notifier;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub chat: ChatService,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
}

impl AppStateInner {
    /// Wire the chat core to the database and the gateway.
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher, jwt_secret: String, daily_limit: u32) -> AppState {
        let notifier = Arc::new(Notifier::new(db.clone(), dispatcher.clone()));
        let chat = ChatService::new(db.clone(), db.clone(), notifier).with_daily_limit(daily_limit);
        Arc::new(Self {
            db,
            chat,
            dispatcher,
            jwt_secret,
        })
    }
}
