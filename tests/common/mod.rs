//! Shared test harness: an engine over a temp database with a collecting sink

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use bayun::commands::built_in_handlers;
use bayun::core::AppResult;
use bayun::dispatch::analyzers::{karma::KarmaAnalyzer, repeat::RepeatAnalyzer, talker::TalkerAnalyzer, turn::TurnAnalyzer};
use bayun::dispatch::event::RepliedMessage;
use bayun::dispatch::{Analyzer, CommandRegistry, Dispatcher, InboundEvent, OutboundResponse, ResponseSink};
use bayun::storage::db::{self, DbPool};

/// Collects everything the engine sends as analyzer side effects.
pub struct CollectingSink {
    sent: Mutex<Vec<OutboundResponse>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<OutboundResponse> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|r| r.text).collect()
    }
}

#[async_trait]
impl ResponseSink for CollectingSink {
    async fn deliver(&self, response: OutboundResponse) -> AppResult<()> {
        self.sent.lock().unwrap().push(response);
        Ok(())
    }
}

pub struct TestHarness {
    _dir: tempfile::TempDir,
    pub db_pool: Arc<DbPool>,
    pub engine: Dispatcher,
    pub sink: Arc<CollectingSink>,
}

/// Engine with the standard analyzer set, talker pinned to "never replies"
/// so tests stay deterministic.
pub fn harness() -> TestHarness {
    harness_with(vec![
        Arc::new(KarmaAnalyzer),
        Arc::new(TalkerAnalyzer::with_probability(0.0)),
        Arc::new(TurnAnalyzer),
        Arc::new(RepeatAnalyzer),
    ])
}

pub fn harness_with(analyzers: Vec<Arc<dyn Analyzer>>) -> TestHarness {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.sqlite");
    let db_pool = Arc::new(db::create_pool(path.to_str().unwrap()).unwrap());

    let registry = Arc::new(CommandRegistry::build(built_in_handlers()));
    let sink = Arc::new(CollectingSink::new());
    let engine = Dispatcher::new(Arc::clone(&db_pool), registry, analyzers, sink.clone());

    TestHarness {
        _dir: dir,
        db_pool,
        engine,
        sink,
    }
}

pub fn text_event(chat_id: i64, user_id: i64, text: &str) -> InboundEvent {
    InboundEvent::TextMessage {
        chat_id,
        user_id,
        message_id: 1,
        text: text.to_string(),
        reply_to: None,
    }
}

pub fn reply_event(chat_id: i64, user_id: i64, text: &str, replied_user: i64) -> InboundEvent {
    InboundEvent::TextMessage {
        chat_id,
        user_id,
        message_id: 2,
        text: text.to_string(),
        reply_to: Some(RepliedMessage {
            message_id: 1,
            user_id: replied_user,
            text: Some("original".to_string()),
        }),
    }
}

pub fn callback_event(chat_id: i64, user_id: i64, data: &str) -> InboundEvent {
    InboundEvent::CallbackQuery {
        chat_id,
        user_id,
        message_id: 3,
        data: data.to_string(),
    }
}

pub fn set_user_level(pool: &Arc<DbPool>, user_id: i64, level: i64) {
    let conn = db::get_connection(pool).unwrap();
    db::set_user_level(&conn, user_id, level).unwrap();
}

pub fn set_chat_level(pool: &Arc<DbPool>, chat_id: i64, level: i64) {
    let conn = db::get_connection(pool).unwrap();
    db::set_chat_level(&conn, chat_id, level).unwrap();
}

pub fn save_alias(pool: &Arc<DbPool>, chat_id: i64, user_id: i64, name: &str, value: &str) {
    let conn = db::get_connection(pool).unwrap();
    db::save_alias(&conn, chat_id, user_id, name, value).unwrap();
}

pub fn waiting_command(pool: &Arc<DbPool>, chat_id: i64, user_id: i64) -> Option<String> {
    let conn = db::get_connection(pool).unwrap();
    db::get_waiting_state(&conn, chat_id, user_id)
        .unwrap()
        .map(|s| s.command)
}

pub fn last_command(pool: &Arc<DbPool>, chat_id: i64) -> Option<String> {
    let conn = db::get_connection(pool).unwrap();
    db::get_last_command(&conn, chat_id).unwrap()
}

pub fn karma_of(pool: &Arc<DbPool>, chat_id: i64, user_id: i64) -> i64 {
    let conn = db::get_connection(pool).unwrap();
    db::get_karma(&conn, chat_id, user_id).unwrap()
}
