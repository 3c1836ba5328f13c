//! Shared fixtures for the chat unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use chrono::NaiveDate;
use parley_db::Database;
use parley_types::models::Message;

use crate::clock::Clock;
use crate::ports::NotificationSink;
use crate::service::ChatService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Notified { message_id: i64, receiver_id: i64, preview: String },
    Retracted { receiver_id: i64, actor_id: i64 },
}

#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: SinkCall) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("sink unavailable");
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl NotificationSink for RecordingSink {
    fn notify_new_message(&self, message: &Message, preview: &str) -> Result<()> {
        self.record(SinkCall::Notified {
            message_id: message.id,
            receiver_id: message.receiver_id,
            preview: preview.to_string(),
        })
    }

    fn retract_message_notifications(&self, receiver_id: i64, from_actor_id: i64) -> Result<()> {
        self.record(SinkCall::Retracted {
            receiver_id,
            actor_id: from_actor_id,
        })
    }
}

pub struct ManualClock {
    day: Mutex<NaiveDate>,
}

impl ManualClock {
    pub fn advance_day(&self) {
        let mut day = self.day.lock().unwrap();
        *day = day.succ_opt().unwrap();
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.day.lock().unwrap()
    }
}

pub struct Harness {
    pub db: Arc<Database>,
    pub sink: Arc<RecordingSink>,
    pub clock: Arc<ManualClock>,
    pub chat: ChatService,
}

impl Harness {
    pub fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let sink = Arc::new(RecordingSink::default());
        let clock = Arc::new(ManualClock {
            day: Mutex::new(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()),
        });
        let chat = ChatService::new(db.clone(), db.clone(), sink.clone()).with_clock(clock.clone());
        Self { db, sink, clock, chat }
    }

    pub fn user(&self, name: &str) -> i64 {
        self.db.create_user(name, None, "hash").unwrap()
    }

    pub fn befriend(&self, a: i64, b: i64) {
        self.db.follow(a, b).unwrap();
        self.db.follow(b, a).unwrap();
    }
}
