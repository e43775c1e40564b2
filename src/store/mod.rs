// src/store/mod.rs — Chatlog persistence

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};

use crate::core::types::{ConversationScores, GeneratedConversation, RunParams, Shift};
use crate::infra::errors::ConvoGenError;

/// Assumed span of a conversation when deriving its end timestamp.
const CONVERSATION_SPAN_MINUTES: i64 = 30;

/// One persisted chatlog row, built from an accepted conversation.
#[derive(Debug, Clone)]
pub struct ChatlogRecord {
    pub agent_name: String,
    pub shift: Shift,
    pub scenario: String,
    pub conversation_text: String,
    pub escalated: bool,
    /// Derived from the CPR score; None while unevaluated.
    pub satisfaction_pct: Option<f32>,
    pub behavior_pattern: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Raw scores, model identity and customer name, kept as a blob so
    /// the schema survives rubric changes.
    pub metadata: serde_json::Value,
}

impl ChatlogRecord {
    pub fn from_item(item: &GeneratedConversation, params: &RunParams) -> Self {
        let metadata = serde_json::json!({
            "item_id": item.id,
            "model": params.model,
            "customer_name": item.customer_name,
            "evaluated": item.evaluated,
            "scores": item.scores,
        });
        Self {
            agent_name: params.agent_name.clone(),
            shift: item.shift,
            scenario: item.scenario.clone(),
            conversation_text: item.text.clone(),
            escalated: item.escalated(),
            satisfaction_pct: item.scores.map(|s| s.satisfaction_pct()),
            behavior_pattern: item.behavior_pattern.clone(),
            started_at: item.scheduled_at,
            ended_at: item.scheduled_at + Duration::minutes(CONVERSATION_SPAN_MINUTES),
            metadata,
        }
    }
}

/// Persistence collaborator: accepts batches of accepted/evaluated
/// records. Failures are surfaced to the orchestrator as descriptive
/// errors and treated as non-fatal there.
#[async_trait]
pub trait ChatlogSink: Send + Sync {
    async fn persist(&self, records: &[ChatlogRecord]) -> Result<(), ConvoGenError>;
}

/// SQLite-backed sink.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, ConvoGenError> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, ConvoGenError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), ConvoGenError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS chatlogs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_name TEXT NOT NULL,
                shift TEXT NOT NULL,
                scenario TEXT NOT NULL,
                conversation_text TEXT NOT NULL,
                escalated INTEGER NOT NULL,
                satisfaction_pct REAL,
                behavior_pattern TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT NOT NULL,
                metadata TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Reconstruct accepted conversations from stored rows, newest runs
    /// last. Used by the export command.
    pub fn fetch_all_conversations(&self) -> Result<Vec<GeneratedConversation>, ConvoGenError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT shift, scenario, conversation_text, behavior_pattern, started_at, metadata
             FROM chatlogs ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            let shift_str: String = row.get(0)?;
            let scenario: String = row.get(1)?;
            let text: String = row.get(2)?;
            let behavior: String = row.get(3)?;
            let started_at: String = row.get(4)?;
            let metadata: String = row.get(5)?;
            Ok((shift_str, scenario, text, behavior, started_at, metadata))
        })?;

        let mut items = Vec::new();
        for row in rows {
            let (shift_str, scenario, text, behavior, started_at, metadata) = row?;
            let meta: serde_json::Value =
                serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null);
            let scores: Option<ConversationScores> =
                serde_json::from_value(meta["scores"].clone()).unwrap_or(None);
            items.push(GeneratedConversation {
                id: meta["item_id"].as_str().unwrap_or("").to_string(),
                text,
                customer_name: meta["customer_name"]
                    .as_str()
                    .unwrap_or("Customer")
                    .to_string(),
                scenario,
                behavior_pattern: behavior,
                shift: Shift::parse(&shift_str).unwrap_or(Shift::Morning),
                scheduled_at: DateTime::parse_from_rfc3339(&started_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
                evaluated: scores.is_some(),
                scores,
            });
        }
        Ok(items)
    }
}

#[async_trait]
impl ChatlogSink for SqliteStore {
    async fn persist(&self, records: &[ChatlogRecord]) -> Result<(), ConvoGenError> {
        let conn = self.lock();
        for record in records {
            conn.execute(
                "INSERT INTO chatlogs (agent_name, shift, scenario, conversation_text,
                 escalated, satisfaction_pct, behavior_pattern, started_at, ended_at, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.agent_name,
                    record.shift.as_str(),
                    record.scenario,
                    record.conversation_text,
                    record.escalated as i64,
                    record.satisfaction_pct.map(|p| p as f64),
                    record.behavior_pattern,
                    record.started_at.to_rfc3339(),
                    record.ended_at.to_rfc3339(),
                    record.metadata.to_string(),
                ],
            )?;
        }
        Ok(())
    }
}
