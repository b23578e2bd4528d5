//! SQLite corpus store
//!
//! Implements the `CorpusStore` contract on a single SQLite database:
//! - messages unique on (account, provider id), duplicate inserts ignored
//! - label table primary-keyed on message id (at most one label per message)
//! - taxonomy closure and confidence bounds enforced on every label write
//! - source precedence (manual > llm > model) applied at the write chokepoint
//! - WAL mode so readers are not blocked during a labeling run

use chrono::{DateTime, Utc};
use mailsift_core::{
    CorpusStore, Error, LabelAssignment, LabelSource, LabelWrite, Message, MessageId, NewMessage,
    Result, Taxonomy,
};
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account TEXT NOT NULL,
    provider_id TEXT NOT NULL,
    thread_id TEXT NOT NULL DEFAULT '',
    internal_date INTEGER NOT NULL DEFAULT 0,
    from_addr TEXT NOT NULL DEFAULT '',
    to_addr TEXT NOT NULL DEFAULT '',
    subject TEXT NOT NULL DEFAULT '',
    snippet TEXT NOT NULL DEFAULT '',
    body TEXT NOT NULL DEFAULT '',
    provider_labels TEXT NOT NULL DEFAULT '[]',
    ingested_at TEXT NOT NULL,
    UNIQUE(account, provider_id)
);

CREATE INDEX IF NOT EXISTS idx_messages_internal_date ON messages(internal_date);
CREATE INDEX IF NOT EXISTS idx_messages_account ON messages(account);

CREATE TABLE IF NOT EXISTS labels (
    message_id INTEGER PRIMARY KEY REFERENCES messages(id),
    category TEXT NOT NULL,
    confidence REAL NOT NULL,
    source TEXT NOT NULL,
    assigned_at TEXT NOT NULL
);
"#;

/// SQLite-backed corpus store
pub struct SqliteStore {
    conn: Mutex<Connection>,
    taxonomy: Arc<Taxonomy>,
}

impl SqliteStore {
    /// Open (or create) a store at `path` and apply the schema.
    pub fn open<P: AsRef<Path>>(path: P, taxonomy: Arc<Taxonomy>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path.as_ref()).map_err(store_err)?;
        info!("Opened corpus store at {}", path.as_ref().display());
        Self::init(conn, taxonomy)
    }

    /// In-memory store, used by tests
    pub fn in_memory(taxonomy: Arc<Taxonomy>) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::init(conn, taxonomy)
    }

    fn init(conn: Connection, taxonomy: Arc<Taxonomy>) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(store_err)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(store_err)?;
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        debug!("Corpus store schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
            taxonomy,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned mutex means a prior panic while holding the connection;
        // the connection itself is still usable for read/write.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn store_err(e: rusqlite::Error) -> Error {
    Error::store(e.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::store(format!("invalid timestamp '{raw}': {e}")))
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<(Message, String)> {
    let labels_json: String = row.get("provider_labels")?;
    let ingested_raw: String = row.get("ingested_at")?;
    let message = Message {
        id: MessageId(row.get("id")?),
        account: row.get("account")?,
        provider_id: row.get("provider_id")?,
        thread_id: row.get("thread_id")?,
        internal_date: row.get("internal_date")?,
        from_addr: row.get("from_addr")?,
        to_addr: row.get("to_addr")?,
        subject: row.get("subject")?,
        snippet: row.get("snippet")?,
        body: row.get("body")?,
        provider_labels: serde_json::from_str(&labels_json).unwrap_or_default(),
        ingested_at: Utc::now(), // replaced by the caller from ingested_raw
    };
    Ok((message, ingested_raw))
}

fn finish_message((mut message, ingested_raw): (Message, String)) -> Result<Message> {
    message.ingested_at = parse_timestamp(&ingested_raw)?;
    Ok(message)
}

const MESSAGE_COLUMNS: &str = "m.id, m.account, m.provider_id, m.thread_id, m.internal_date, \
     m.from_addr, m.to_addr, m.subject, m.snippet, m.body, m.provider_labels, m.ingested_at";

impl CorpusStore for SqliteStore {
    fn insert_message(&self, message: &NewMessage) -> Result<bool> {
        let labels_json = serde_json::to_string(&message.provider_labels)?;
        let conn = self.lock();
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO messages
                 (account, provider_id, thread_id, internal_date, from_addr, to_addr,
                  subject, snippet, body, provider_labels, ingested_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    message.account,
                    message.provider_id,
                    message.thread_id,
                    message.internal_date,
                    message.from_addr,
                    message.to_addr,
                    message.subject,
                    message.snippet,
                    message.body,
                    labels_json,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(store_err)?;
        Ok(inserted > 0)
    }

    fn get_unlabeled_messages(&self, limit: usize) -> Result<Vec<Message>> {
        // SQLite treats LIMIT -1 as unbounded
        let limit = i64::try_from(limit).unwrap_or(-1);
        let conn = self.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {MESSAGE_COLUMNS}
                 FROM messages m
                 LEFT JOIN labels l ON m.id = l.message_id
                 WHERE l.message_id IS NULL
                 ORDER BY m.id ASC
                 LIMIT ?1"
            ))
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![limit], message_from_row)
            .map_err(store_err)?;
        rows.map(|r| finish_message(r.map_err(store_err)?))
            .collect()
    }

    fn get_labeled_messages(&self) -> Result<Vec<(Message, LabelAssignment)>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {MESSAGE_COLUMNS}, l.category, l.confidence, l.source, l.assigned_at
                 FROM messages m
                 INNER JOIN labels l ON m.id = l.message_id
                 ORDER BY m.id ASC"
            ))
            .map_err(store_err)?;
        let rows = stmt
            .query_map([], |row| {
                let pair = message_from_row(row)?;
                let category: String = row.get("category")?;
                let confidence: f64 = row.get("confidence")?;
                let source: String = row.get("source")?;
                let assigned_raw: String = row.get("assigned_at")?;
                Ok((pair, category, confidence, source, assigned_raw))
            })
            .map_err(store_err)?;

        let mut labeled = Vec::new();
        for row in rows {
            let (pair, category, confidence, source, assigned_raw) = row.map_err(store_err)?;
            let message = finish_message(pair)?;
            let assignment = LabelAssignment {
                message_id: message.id,
                category,
                confidence: confidence as f32,
                source: LabelSource::from_str(&source)?,
                assigned_at: parse_timestamp(&assigned_raw)?,
            };
            labeled.push((message, assignment));
        }
        Ok(labeled)
    }

    fn upsert_label(
        &self,
        message_id: MessageId,
        category: &str,
        confidence: f32,
        source: LabelSource,
    ) -> Result<LabelWrite> {
        self.taxonomy.validate(category)?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::validation(format!(
                "confidence {confidence} out of range [0.0, 1.0] for message {message_id}"
            )));
        }

        let mut conn = self.lock();
        let tx = conn.transaction().map_err(store_err)?;

        let exists: bool = tx
            .query_row(
                "SELECT COUNT(*) FROM messages WHERE id = ?1",
                params![message_id.0],
                |row| row.get::<_, i64>(0),
            )
            .map_err(store_err)?
            > 0;
        if !exists {
            return Err(Error::validation(format!(
                "no message with id {message_id}"
            )));
        }

        let existing: Option<String> = tx
            .query_row(
                "SELECT source FROM labels WHERE message_id = ?1",
                params![message_id.0],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(store_err(other)),
            })?;

        let outcome = match existing {
            Some(raw) => {
                let current = LabelSource::from_str(&raw)?;
                if current.precedence() > source.precedence() {
                    debug!(
                        "Refusing {} write for message {}: existing {} label outranks it",
                        source, message_id, current
                    );
                    return Ok(LabelWrite::Rejected);
                }
                LabelWrite::Replaced
            }
            None => LabelWrite::Inserted,
        };

        tx.execute(
            "INSERT OR REPLACE INTO labels (message_id, category, confidence, source, assigned_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message_id.0,
                category,
                confidence as f64,
                source.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(store_err)?;
        tx.commit().map_err(store_err)?;
        Ok(outcome)
    }

    fn clear_labels(&self, sources: &[LabelSource]) -> Result<usize> {
        if sources.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; sources.len()].join(", ");
        let params_vec: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
        let conn = self.lock();
        let removed = conn
            .execute(
                &format!("DELETE FROM labels WHERE source IN ({placeholders})"),
                rusqlite::params_from_iter(params_vec.iter()),
            )
            .map_err(store_err)?;
        info!("Cleared {removed} label assignments (sources: {params_vec:?})");
        Ok(removed)
    }

    fn label_distribution(&self) -> Result<BTreeMap<String, u64>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT category, COUNT(*) FROM labels GROUP BY category")
            .map_err(store_err)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(store_err)?;
        let mut distribution = BTreeMap::new();
        for row in rows {
            let (category, count) = row.map_err(store_err)?;
            distribution.insert(category, count as u64);
        }
        Ok(distribution)
    }

    fn message_count(&self) -> Result<u64> {
        let conn = self.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .map_err(store_err)?;
        Ok(count as u64)
    }

    fn unlabeled_count(&self) -> Result<u64> {
        let conn = self.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*)
                 FROM messages m
                 LEFT JOIN labels l ON m.id = l.message_id
                 WHERE l.message_id IS NULL",
                [],
                |row| row.get(0),
            )
            .map_err(store_err)?;
        Ok(count as u64)
    }
}
