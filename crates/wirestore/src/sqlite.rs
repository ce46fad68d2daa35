use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use wirecore::{
    Credential, CredentialStore, CredentialType, Execution, ExecutionStatus, ExecutionStore,
    StepStore, StoreError, Workflow, WorkflowStore,
};

fn backend(error: sqlx::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}

fn corrupt(error: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(error.to_string())
}

/// SQLite-backed implementation of every store trait
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `url` and apply the schema.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(backend)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is its own database
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(backend)?;

        let store = Self::new(pool);
        store.init_schema().await?;
        tracing::info!("Opened SQLite store at {}", url);
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables and indexes. Safe to call multiple times.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        const SCHEMA: &[&str] = &[
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                definition TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS executions (
                id TEXT PRIMARY KEY,
                workflow_id TEXT NOT NULL REFERENCES workflows(id) ON DELETE CASCADE,
                event_id TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                output TEXT,
                error TEXT,
                error_stack TEXT
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_executions_workflow ON executions(workflow_id, started_at)",
            r#"
            CREATE TABLE IF NOT EXISTS steps (
                run_key TEXT NOT NULL,
                step_id TEXT NOT NULL,
                value TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (run_key, step_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                type TEXT NOT NULL,
                secret TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        ];

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
        }
        Ok(())
    }

    /// Store a credential. The secret is written as given.
    pub async fn insert_credential(&self, credential: &Credential) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO credentials (id, owner_id, name, type, secret)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                name = excluded.name,
                type = excluded.type,
                secret = excluded.secret
            "#,
        )
        .bind(&credential.id)
        .bind(&credential.owner_id)
        .bind(&credential.name)
        .bind(credential.credential_type.as_str())
        .bind(&credential.secret)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn finish(
        &self,
        event_id: &str,
        status: ExecutionStatus,
        output: Option<String>,
        error: Option<&str>,
        stack: Option<&str>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE executions
            SET status = ?, completed_at = ?, output = ?, error = ?, error_stack = ?
            WHERE event_id = ? AND status = ?
            "#,
        )
        .bind(status.as_str())
        .bind(format_time(Utc::now()))
        .bind(output)
        .bind(error)
        .bind(stack)
        .bind(event_id)
        .bind(ExecutionStatus::Running.as_str())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }
}

/// Fixed-width RFC 3339 so that text ordering is time ordering
fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(corrupt)
}

fn execution_from_row(row: &SqliteRow) -> Result<Execution, StoreError> {
    let status: String = row.get("status");
    let started_at: String = row.get("started_at");
    let completed_at: Option<String> = row.get("completed_at");
    let output: Option<String> = row.get("output");

    Ok(Execution {
        id: row.get("id"),
        workflow_id: row.get("workflow_id"),
        event_id: row.get("event_id"),
        status: status.parse().map_err(StoreError::Corrupt)?,
        started_at: parse_time(&started_at)?,
        completed_at: completed_at.as_deref().map(parse_time).transpose()?,
        output: output
            .as_deref()
            .map(serde_json::from_str::<Value>)
            .transpose()
            .map_err(corrupt)?,
        error: row.get("error"),
        error_stack: row.get("error_stack"),
    })
}

fn workflow_from_row(row: &SqliteRow) -> Result<Workflow, StoreError> {
    let definition: String = row.get("definition");
    serde_json::from_str(&definition).map_err(corrupt)
}

const EXECUTION_COLUMNS: &str =
    "id, workflow_id, event_id, status, started_at, completed_at, output, error, error_stack";

#[async_trait]
impl WorkflowStore for SqliteStore {
    async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>, StoreError> {
        let row = sqlx::query("SELECT definition FROM workflows WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref().map(workflow_from_row).transpose()
    }

    async fn save_workflow(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let definition = serde_json::to_string(workflow).map_err(corrupt)?;

        sqlx::query(
            r#"
            INSERT INTO workflows (id, name, owner_id, definition, updated_at)
            VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                owner_id = excluded.owner_id,
                definition = excluded.definition,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&workflow.id)
        .bind(&workflow.name)
        .bind(&workflow.owner)
        .bind(&definition)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn list_workflows(&self) -> Result<Vec<Workflow>, StoreError> {
        let rows = sqlx::query("SELECT definition FROM workflows ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.iter().map(workflow_from_row).collect()
    }

    async fn delete_workflow(&self, id: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Steps are keyed by event id, so they go before the executions cascade away
        sqlx::query(
            "DELETE FROM steps WHERE run_key IN (SELECT event_id FROM executions WHERE workflow_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ExecutionStore for SqliteStore {
    async fn create_if_absent(
        &self,
        event_id: &str,
        workflow_id: &str,
    ) -> Result<(Execution, bool), StoreError> {
        let execution = Execution::started(event_id, workflow_id);

        let result = sqlx::query(
            r#"
            INSERT INTO executions (id, workflow_id, event_id, status, started_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(event_id) DO NOTHING
            "#,
        )
        .bind(&execution.id)
        .bind(&execution.workflow_id)
        .bind(&execution.event_id)
        .bind(execution.status.as_str())
        .bind(format_time(execution.started_at))
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        // Read back either way so callers see exactly what is stored
        let stored = self
            .get_by_event(event_id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("execution for event {} disappeared", event_id)))?;
        Ok((stored, result.rows_affected() > 0))
    }

    async fn mark_succeeded(&self, event_id: &str, output: &Value) -> Result<bool, StoreError> {
        self.finish(
            event_id,
            ExecutionStatus::Success,
            Some(output.to_string()),
            None,
            None,
        )
        .await
    }

    async fn mark_failed(
        &self,
        event_id: &str,
        error: &str,
        stack: &str,
    ) -> Result<bool, StoreError> {
        self.finish(event_id, ExecutionStatus::Failed, None, Some(error), Some(stack))
            .await
    }

    async fn get(&self, id: &str) -> Result<Option<Execution>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM executions WHERE id = ?", EXECUTION_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref().map(execution_from_row).transpose()
    }

    async fn get_by_event(&self, event_id: &str) -> Result<Option<Execution>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM executions WHERE event_id = ?",
            EXECUTION_COLUMNS
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref().map(execution_from_row).transpose()
    }

    async fn list_for_workflow(&self, workflow_id: &str) -> Result<Vec<Execution>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM executions WHERE workflow_id = ? ORDER BY started_at DESC",
            EXECUTION_COLUMNS
        ))
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(execution_from_row).collect()
    }
}

#[async_trait]
impl StepStore for SqliteStore {
    async fn load(&self, run_key: &str, step_id: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query("SELECT value FROM steps WHERE run_key = ? AND step_id = ?")
            .bind(run_key)
            .bind(step_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => {
                let raw: String = row.get("value");
                serde_json::from_str(&raw).map(Some).map_err(corrupt)
            }
            None => Ok(None),
        }
    }

    async fn save(&self, run_key: &str, step_id: &str, value: &Value) -> Result<(), StoreError> {
        // First write wins; a replayed step never overwrites its record
        sqlx::query(
            r#"
            INSERT INTO steps (run_key, step_id, value)
            VALUES (?, ?, ?)
            ON CONFLICT(run_key, step_id) DO NOTHING
            "#,
        )
        .bind(run_key)
        .bind(step_id)
        .bind(value.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn clear(&self, run_key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM steps WHERE run_key = ?")
            .bind(run_key)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn get_credential(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Option<Credential>, StoreError> {
        let row = sqlx::query(
            "SELECT id, owner_id, name, type, secret FROM credentials WHERE id = ? AND owner_id = ?",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let credential_type: String = row.get("type");
        Ok(Some(Credential {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            name: row.get("name"),
            credential_type: CredentialType::from_str(&credential_type).map_err(StoreError::Corrupt)?,
            secret: row.get("secret"),
        }))
    }
}
