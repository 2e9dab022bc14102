use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use libsql::{Row, params};
use probekit::Protocol;
use tracing::warn;
use uuid::Uuid;

use super::models::{CheckLogRow, from_unix_millis, to_unix_millis};
use crate::monitoring::types::Check;
use crate::pool::{LibsqlManager, LibsqlPool};

const CHECK_COLUMNS: &str = "id, name, target, protocol, method, headers, body, assertions, \
                             regions, alert_emails, frequency_seconds, timeout_ms, enabled";

/// Read side of the check definitions, rescanned every tick
#[async_trait]
pub trait CheckStore: Send + Sync {
    /// Get all enabled checks
    async fn enabled_checks(&self) -> Result<Vec<Check>>;

    /// Get a check by id, enabled or not
    async fn get_check(&self, id: Uuid) -> Result<Option<Check>>;

    /// Insert or replace a check
    async fn save_check(&self, check: &Check) -> Result<()>;
}

/// Durable sink for probe outcomes
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Write all rows in one call; returns the number written
    async fn write_batch(&self, rows: &[CheckLogRow]) -> Result<usize>;

    /// Most recent rows for a check, newest first
    async fn recent_logs(&self, check_id: Uuid, limit: usize) -> Result<Vec<CheckLogRow>>;
}

/// LibSQL database implementation
pub struct DatabaseImpl {
    pool: LibsqlPool,
}

impl DatabaseImpl {
    /// Create a new database instance from a pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        Ok(self.pool.get().await?)
    }
}

fn protocol_from_str(value: &str) -> Result<Protocol> {
    match value {
        "http" => Ok(Protocol::Http),
        "tcp" => Ok(Protocol::Tcp),
        other => anyhow::bail!("Unknown protocol '{other}'"),
    }
}

fn check_from_row(row: &Row) -> Result<Check> {
    let id: String = row.get(0)?;
    let protocol: String = row.get(3)?;
    let headers: String = row.get(5)?;
    let assertions: String = row.get(7)?;
    let regions: String = row.get(8)?;
    let alert_emails: String = row.get(9)?;

    Ok(Check {
        id: Uuid::parse_str(&id)?,
        name: row.get(1)?,
        target: row.get(2)?,
        protocol: protocol_from_str(&protocol)?,
        method: row.get(4)?,
        headers: serde_json::from_str(&headers).context("headers")?,
        body: row.get(6)?,
        assertions: serde_json::from_str(&assertions).context("assertions")?,
        regions: serde_json::from_str(&regions).context("regions")?,
        alert_emails: serde_json::from_str(&alert_emails).context("alert_emails")?,
        frequency_seconds: row.get::<i64>(10)? as u64,
        timeout_ms: row.get::<Option<i64>>(11)?.map(|v| v as u64),
        enabled: row.get::<i64>(12)? != 0,
    })
}

fn log_from_row(row: &Row) -> Result<CheckLogRow> {
    let check_id: String = row.get(1)?;

    Ok(CheckLogRow {
        id: Some(row.get(0)?),
        check_id: Uuid::parse_str(&check_id)?,
        region: row.get(2)?,
        is_up: row.get::<i64>(3)? != 0,
        status_code: row.get::<i64>(4)? as u16,
        response_time_ms: row.get::<i64>(5)? as u64,
        error: row.get(6)?,
        checked_at: from_unix_millis(row.get(7)?),
    })
}

#[async_trait]
impl CheckStore for DatabaseImpl {
    async fn enabled_checks(&self) -> Result<Vec<Check>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(&format!("SELECT {CHECK_COLUMNS} FROM checks WHERE enabled = 1"))
            .await?;

        let mut rows = stmt.query(()).await?;
        let mut checks = Vec::new();

        while let Some(row) = rows.next().await? {
            // One undecodable row must not hide every other check
            match check_from_row(&row) {
                Ok(check) => checks.push(check),
                Err(e) => warn!("Skipping unreadable check row: {e:#}"),
            }
        }

        Ok(checks)
    }

    async fn get_check(&self, id: Uuid) -> Result<Option<Check>> {
        let conn = self.get_conn().await?;
        let mut stmt =
            conn.prepare(&format!("SELECT {CHECK_COLUMNS} FROM checks WHERE id = ?")).await?;

        let mut rows = stmt.query(params![id.to_string()]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(check_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn save_check(&self, check: &Check) -> Result<()> {
        let conn = self.get_conn().await?;
        let now = Utc::now().timestamp();

        conn.execute(
            "INSERT INTO checks (id, name, target, protocol, method, headers, body, assertions, regions, alert_emails, frequency_seconds, timeout_ms, enabled, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                target = excluded.target,
                protocol = excluded.protocol,
                method = excluded.method,
                headers = excluded.headers,
                body = excluded.body,
                assertions = excluded.assertions,
                regions = excluded.regions,
                alert_emails = excluded.alert_emails,
                frequency_seconds = excluded.frequency_seconds,
                timeout_ms = excluded.timeout_ms,
                enabled = excluded.enabled,
                updated_at = excluded.updated_at",
            params![
                check.id.to_string(),
                check.name.clone(),
                check.target.clone(),
                check.protocol.to_string(),
                check.method.clone(),
                serde_json::to_string(&check.headers)?,
                check.body.clone(),
                serde_json::to_string(&check.assertions)?,
                serde_json::to_string(&check.regions)?,
                serde_json::to_string(&check.alert_emails)?,
                check.frequency_seconds as i64,
                check.timeout_ms.map(|v| v as i64),
                if check.enabled { 1 } else { 0 },
                now,
                now
            ],
        )
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ResultStore for DatabaseImpl {
    async fn write_batch(&self, rows: &[CheckLogRow]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let conn = self.get_conn().await?;
        let tx = conn.transaction().await?;

        for row in rows {
            tx.execute(
                "INSERT INTO check_logs (check_id, region, is_up, status_code, response_time_ms, error, checked_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    row.check_id.to_string(),
                    row.region.clone(),
                    if row.is_up { 1 } else { 0 },
                    row.status_code as i64,
                    row.response_time_ms as i64,
                    row.error.clone(),
                    to_unix_millis(row.checked_at)
                ],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(rows.len())
    }

    async fn recent_logs(&self, check_id: Uuid, limit: usize) -> Result<Vec<CheckLogRow>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare("SELECT id, check_id, region, is_up, status_code, response_time_ms, error, checked_at FROM check_logs WHERE check_id = ? ORDER BY checked_at DESC, id DESC LIMIT ?")
            .await?;

        let mut rows = stmt.query(params![check_id.to_string(), limit as i64]).await?;
        let mut logs = Vec::new();

        while let Some(row) = rows.next().await? {
            logs.push(log_from_row(&row)?);
        }

        Ok(logs)
    }
}
