//! SQL backend: a SQLite-backed `ExecutionStore`, independent
//! of the Memory Store's snapshot file. Uses `BEGIN IMMEDIATE` around
//! mutating statements and `INSERT OR REPLACE` for idempotent writes.

use super::ExecutionStore;
use agentworld_core::{ChronicleEntry, Error, ExecutionReceipt, ExecutionStatus, PendingRecord, Result, Snapshot};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;

fn sql_err(e: rusqlite::Error) -> Error {
    Error::Sql(e.to_string())
}

/// The SQLite-backed `ExecutionStore` implementation.
pub struct SqlExecutionStore {
    conn: Mutex<Connection>,
}

impl SqlExecutionStore {
    /// Open (creating if absent) the SQLite database at `path` and ensure
    /// its schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(sql_err)?;
        conn.pragma_update(None, "journal_mode", "WAL").map_err(sql_err)?;
        conn.pragma_update(None, "synchronous", "NORMAL").map_err(sql_err)?;
        let store = SqlExecutionStore { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    /// An in-memory SQLite database, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        let store = SqlExecutionStore { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS execution_receipts (
                execution_id TEXT PRIMARY KEY,
                handoff_id TEXT UNIQUE,
                idempotency_key TEXT UNIQUE,
                proposal_id TEXT,
                actor_id TEXT,
                town_id TEXT,
                proposal_type TEXT,
                status TEXT,
                reason_code TEXT,
                payload_json TEXT,
                created_at INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_receipts_status_created
            ON execution_receipts(status, created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_receipts_handoff_created
            ON execution_receipts(handoff_id, created_at DESC);

            CREATE TABLE IF NOT EXISTS execution_pending (
                pending_id TEXT PRIMARY KEY,
                handoff_id TEXT UNIQUE,
                idempotency_key TEXT UNIQUE,
                proposal_id TEXT,
                status TEXT,
                payload_json TEXT,
                created_at INTEGER,
                updated_at INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_pending_updated ON execution_pending(updated_at DESC);

            CREATE TABLE IF NOT EXISTS execution_event_ledger (
                event_id TEXT PRIMARY KEY,
                handoff_id TEXT,
                idempotency_key TEXT,
                execution_id TEXT,
                kind TEXT,
                status TEXT,
                reason_code TEXT,
                payload_json TEXT,
                created_at INTEGER
            );

            CREATE TABLE IF NOT EXISTS world_chronicle_records (
                record_id TEXT PRIMARY KEY,
                source_id TEXT UNIQUE,
                entry_type TEXT,
                town_id TEXT,
                faction_id TEXT,
                at TEXT,
                message TEXT,
                payload_json TEXT,
                created_at INTEGER,
                updated_at INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_chronicle_at ON world_chronicle_records(at DESC, record_id DESC);
            CREATE INDEX IF NOT EXISTS idx_chronicle_town ON world_chronicle_records(town_id, at DESC);
            CREATE INDEX IF NOT EXISTS idx_chronicle_faction ON world_chronicle_records(faction_id, at DESC);
            ",
        )
        .map_err(sql_err)?;
        Ok(())
    }

    fn now_seq(conn: &Connection) -> i64 {
        // A monotonic insertion counter, standing in for wall-clock
        // `created_at`/`updated_at` ordering without calling a disallowed
        // time source: one greater than the highest sequence seen so far
        // across all three time-stamped tables.
        let max_receipt: i64 = conn
        .query_row("SELECT COALESCE(MAX(created_at), 0) FROM execution_receipts", [], |r| r.get(0))
        .unwrap_or(0);
        let max_pending: i64 = conn
        .query_row("SELECT COALESCE(MAX(updated_at), 0) FROM execution_pending", [], |r| r.get(0))
        .unwrap_or(0);
        let max_ledger: i64 = conn
        .query_row("SELECT COALESCE(MAX(created_at), 0) FROM execution_event_ledger", [], |r| r.get(0))
        .unwrap_or(0);
        let max_chronicle: i64 = conn
        .query_row("SELECT COALESCE(MAX(updated_at), 0) FROM world_chronicle_records", [], |r| r.get(0))
        .unwrap_or(0);
        max_receipt.max(max_pending).max(max_ledger).max(max_chronicle) + 1
    }

    fn status_text(status: ExecutionStatus) -> &'static str {
        match status {
            ExecutionStatus::Executed => "executed",
            ExecutionStatus::Rejected => "rejected",
            ExecutionStatus::Stale => "stale",
            ExecutionStatus::Duplicate => "duplicate",
            ExecutionStatus::Failed => "failed",
        }
    }
}

impl ExecutionStore for SqlExecutionStore {
    fn find_receipt(&self, handoff_id: &str, idempotency_key: &str) -> Result<Option<ExecutionReceipt>> {
        let conn = self.conn.lock();
        let payload: Option<String> = conn
        .query_row(
            "SELECT payload_json FROM execution_receipts WHERE handoff_id = ?1 OR idempotency_key = ?2
            ORDER BY created_at DESC LIMIT 1",
            params![handoff_id, idempotency_key],
            |r| r.get(0),
        )
        .ok();
        Ok(match payload {
                Some(json) => Some(serde_json::from_str(&json)?),
                None => None,
            })
    }

    fn find_pending_execution(&self, handoff_id: &str, idempotency_key: &str) -> Result<Option<PendingRecord>> {
        let conn = self.conn.lock();
        let payload: Option<String> = conn
        .query_row(
            "SELECT payload_json FROM execution_pending WHERE handoff_id = ?1 OR idempotency_key = ?2
            ORDER BY updated_at DESC LIMIT 1",
            params![handoff_id, idempotency_key],
            |r| r.get(0),
        )
        .ok();
        Ok(match payload {
                Some(json) => Some(serde_json::from_str(&json)?),
                None => None,
            })
    }

    fn list_pending_executions(&self) -> Result<Vec<PendingRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
        .prepare("SELECT payload_json FROM execution_pending ORDER BY updated_at DESC")
        .map_err(sql_err)?;
        let rows = stmt
        .query_map([], |r| r.get::<_, String>(0))
        .map_err(sql_err)?;
        let mut out = Vec::new();
        for row in rows {
            let json = row.map_err(sql_err)?;
            out.push(serde_json::from_str(&json)?);
        }
        Ok(out)
    }

    fn stage_pending_execution(&self, record: PendingRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch("BEGIN IMMEDIATE;").map_err(sql_err)?;
        let result = (|| {
                conn.execute(
                    "DELETE FROM execution_pending WHERE handoff_id = ?1 OR idempotency_key = ?2",
                    params![record.handoff_id, record.idempotency_key],
                )
                .map_err(sql_err)?;
                let seq = Self::now_seq(&conn);
                let payload = serde_json::to_string(&record)?;
                let pending_id = record.handoff_id.clone();
                conn.execute(
                    "INSERT OR REPLACE INTO execution_pending
                    (pending_id, handoff_id, idempotency_key, proposal_id, status, payload_json, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6, ?6)",
                    params![pending_id, record.handoff_id, record.idempotency_key, record.idempotency_key, payload, seq],
                )
                .map_err(sql_err)?;
                Ok(())
            });
        match &result {
            Ok(()) => conn.execute_batch("COMMIT;").map_err(sql_err)?,
            Err(_) => conn.execute_batch("ROLLBACK;").map_err(sql_err)?,
        }
        result
    }

    fn mark_pending_execution_progress(
        &self,
        handoff_id: &str,
        idempotency_key: &str,
        completed_command_count: u32,
        last_applied_command: Option<String>,
        last_known_snapshot_hash: String,
        last_known_epoch: u64,
    ) -> Result<()> {
        let existing = self.find_pending_execution(handoff_id, idempotency_key)?;
        let Some(existing) = existing else { return Ok(()) };
        self.stage_pending_execution(PendingRecord {
                completed_command_count,
                last_applied_command,
                last_known_snapshot_hash,
                last_known_epoch,
                ..existing
            })
    }

    fn clear_pending_execution(&self, handoff_id: &str, idempotency_key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM execution_pending WHERE handoff_id = ?1 OR idempotency_key = ?2",
            params![handoff_id, idempotency_key],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    fn record_result(&self, receipt: ExecutionReceipt, kind: &str, clear_pending: bool) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch("BEGIN IMMEDIATE;").map_err(sql_err)?;
        let result = (|| {
                let seq = Self::now_seq(&conn);
                let persist_receipt = kind != "duplicate_replayed";
                if persist_receipt {
                    let receipt_payload = serde_json::to_string(&receipt)?;
                    conn.execute(
                        "INSERT OR REPLACE INTO execution_receipts
                        (execution_id, handoff_id, idempotency_key, proposal_id, actor_id, town_id, proposal_type,
                            status, reason_code, payload_json, created_at)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                        params![
                            receipt.execution_id,
                            receipt.handoff_id,
                            receipt.proposal_id,
                            receipt.proposal_id,
                            receipt.actor_id,
                            receipt.town_id,
                            receipt.proposal_type,
                            Self::status_text(receipt.status),
                            receipt.reason_code,
                            receipt_payload,
                            seq,
                        ],
                    )
                    .map_err(sql_err)?;
                }

                let event_id = format!("{}:{kind}", receipt.execution_id);
                let ledger_payload = serde_json::to_string(&receipt.world_state)?;
                conn.execute(
                    "INSERT OR REPLACE INTO execution_event_ledger
                    (event_id, handoff_id, idempotency_key, execution_id, kind, status, reason_code, payload_json, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        event_id,
                        receipt.handoff_id,
                        receipt.proposal_id,
                        receipt.execution_id,
                        kind,
                        Self::status_text(receipt.status),
                        receipt.reason_code,
                        ledger_payload,
                        seq,
                    ],
                )
                .map_err(sql_err)?;

                if clear_pending {
                    conn.execute(
                        "DELETE FROM execution_pending WHERE handoff_id = ?1 OR idempotency_key = ?2",
                        params![receipt.handoff_id, receipt.proposal_id],
                    )
                    .map_err(sql_err)?;
                }
                Ok(())
            });
        match &result {
            Ok(()) => conn.execute_batch("COMMIT;").map_err(sql_err)?,
            Err(_) => conn.execute_batch("ROLLBACK;").map_err(sql_err)?,
        }
        result
    }

    fn sync_world_memory_from_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch("BEGIN IMMEDIATE;").map_err(sql_err)?;
        let result = (|| {
                for entry in &snapshot.world.chronicle {
                    let seq = Self::now_seq(&conn);
                    let payload = serde_json::to_string(entry)?;
                    conn.execute(
                        "INSERT OR REPLACE INTO world_chronicle_records
                        (record_id, source_id, entry_type, town_id, faction_id, at, message, payload_json, created_at, updated_at)
                        VALUES (?1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                        params![
                            entry.id,
                            entry.entry_type,
                            entry.town_id,
                            entry.faction_id,
                            entry.at,
                            entry.message,
                            payload,
                            seq,
                        ],
                    )
                    .map_err(sql_err)?;
                }
                Ok(())
            });
        match &result {
            Ok(()) => conn.execute_batch("COMMIT;").map_err(sql_err)?,
            Err(_) => conn.execute_batch("ROLLBACK;").map_err(sql_err)?,
        }
        result
    }

    fn list_chronicle_records(&self, limit: usize) -> Result<Vec<ChronicleEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn
        .prepare("SELECT payload_json FROM world_chronicle_records ORDER BY at DESC, record_id DESC LIMIT ?1")
        .map_err(sql_err)?;
        let rows = stmt.query_map(params![limit as i64], |r| r.get::<_, String>(0)).map_err(sql_err)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row.map_err(sql_err)?)?);
        }
        Ok(out)
    }

    fn list_history_records(&self, limit: usize) -> Result<Vec<ExecutionReceipt>> {
        let conn = self.conn.lock();
        let mut stmt = conn
        .prepare("SELECT payload_json FROM execution_receipts ORDER BY created_at DESC LIMIT ?1")
        .map_err(sql_err)?;
        let rows = stmt.query_map(params![limit as i64], |r| r.get::<_, String>(0)).map_err(sql_err)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row.map_err(sql_err)?)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentworld_core::{Evaluation, WorldStateSummary};

    fn sample_receipt(execution_id: &str, handoff_id: &str) -> ExecutionReceipt {
        ExecutionReceipt {
            execution_id: execution_id.to_string(),
            result_id: execution_id.to_string(),
            handoff_id: handoff_id.to_string(),
            proposal_id: "proposal_1".to_string(),
            snapshot_hash: "hash".to_string(),
            decision_epoch: 1,
            actor_id: "mara".to_string(),
            town_id: "riverbend".to_string(),
            proposal_type: "PROJECT_ADVANCE".to_string(),
            command: "advance".to_string(),
            authority_commands: vec![],
            status: ExecutionStatus::Executed,
            accepted: true,
            executed: true,
            reason_code: "EXECUTED".to_string(),
            evaluation: Evaluation::default(),
            world_state: WorldStateSummary::default(),
        }
    }

    #[test]
    fn record_result_then_find_receipt_roundtrips() {
        let store = SqlExecutionStore::open_in_memory().unwrap();
        store.record_result(sample_receipt("exec_1", "handoff_1"), "executed", true).unwrap();
        let found = store.find_receipt("handoff_1", "proposal_1").unwrap().unwrap();
        assert_eq!(found.execution_id, "exec_1");
    }

    #[test]
    fn duplicate_replayed_does_not_overwrite_the_original_receipt() {
        let store = SqlExecutionStore::open_in_memory().unwrap();
        store.record_result(sample_receipt("exec_1", "handoff_1"), "executed", true).unwrap();
        store.record_result(sample_receipt("exec_2", "handoff_1"), "duplicate_replayed", false).unwrap();

        let found = store.find_receipt("handoff_1", "proposal_1").unwrap().unwrap();
        assert_eq!(found.execution_id, "exec_1");
        assert_eq!(store.list_history_records(10).unwrap().len(), 1);
    }

    #[test]
    fn stage_and_clear_pending_roundtrips() {
        let store = SqlExecutionStore::open_in_memory().unwrap();
        store
        .stage_pending_execution(PendingRecord {
                handoff_id: "handoff_2".to_string(),
                idempotency_key: "proposal_2".to_string(),
                prepared_snapshot_hash: "hash".to_string(),
                prepared_epoch: 1,
                last_known_snapshot_hash: "hash".to_string(),
                last_known_epoch: 1,
                total_command_count: 2,
                completed_command_count: 0,
                last_applied_command: None,
            })
        .unwrap();
        assert!(store.find_pending_execution("handoff_2", "proposal_2").unwrap().is_some());
        store.clear_pending_execution("handoff_2", "proposal_2").unwrap();
        assert!(store.find_pending_execution("handoff_2", "proposal_2").unwrap().is_none());
    }

    #[test]
    fn staging_pending_supersedes_prior_entry_for_same_identity() {
        let store = SqlExecutionStore::open_in_memory().unwrap();
        for completed in [0, 1] {
            store
            .stage_pending_execution(PendingRecord {
                    handoff_id: "handoff_3".to_string(),
                    idempotency_key: "proposal_3".to_string(),
                    prepared_snapshot_hash: "hash".to_string(),
                    prepared_epoch: 1,
                    last_known_snapshot_hash: "hash".to_string(),
                    last_known_epoch: 1,
                    total_command_count: 2,
                    completed_command_count: completed,
                    last_applied_command: None,
                })
            .unwrap();
        }
        assert_eq!(store.list_pending_executions().unwrap().len(), 1);
    }
}
