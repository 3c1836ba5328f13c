use std::sync::Arc;

use parley_db::Database;

use crate::clock::{Clock, LocalClock};
use crate::ports::{FollowGraph, NotificationSink};

/// Messages per day a user may send to someone who is not a mutual follow.
pub const DEFAULT_DAILY_LIMIT: u32 = 3;

/// Entry point for every chat operation. Each operation that writes runs in
/// exactly one database transaction.
pub struct ChatService {
    pub(crate) db: Arc<Database>,
    pub(crate) follows: Arc<dyn FollowGraph>,
    pub(crate) sink: Arc<dyn NotificationSink>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) daily_limit: u32,
}

impl ChatService {
    pub fn new(
        db: Arc<Database>,
        follows: Arc<dyn FollowGraph>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            db,
            follows,
            sink,
            clock: Arc::new(LocalClock),
            daily_limit: DEFAULT_DAILY_LIMIT,
        }
    }

    pub fn with_daily_limit(mut self, limit: u32) -> Self {
        self.daily_limit = limit;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }
}

/// `(page, limit)` to a row offset; page numbers start at 1.
pub fn page_offset(page: u32, limit: u32) -> u64 {
    u64::from(page.max(1) - 1) * u64::from(limit)
}
