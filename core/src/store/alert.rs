//! Alert persistence: inserts guarded by the per-transaction unique
//! index, compare-and-set status updates, and list/count queries.

use super::{bad_column, parse_timestamp, AmlStore};
use crate::{
    alerts::{Alert, AlertStatus},
    error::AmlResult,
    types::RiskLevel,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

impl AmlStore {
    /// Insert a new alert. Fails with a constraint violation when an
    /// alert already exists for the transaction — callers turn that into
    /// the idempotent-open path.
    pub fn insert_alert(&self, alert: &Alert) -> AmlResult<()> {
        self.conn.execute(
            "INSERT INTO alert
             (alert_id, transaction_id, customer_id, risk_level, summary,
              status, created_at, resolved_at, resolution_note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                alert.alert_id,
                alert.transaction_id,
                alert.customer_id,
                alert.level.as_str(),
                alert.summary,
                alert.status.as_str(),
                alert.created_at.to_rfc3339(),
                alert.resolved_at.map(|t| t.to_rfc3339()),
                alert.resolution_note,
            ],
        )?;
        Ok(())
    }

    pub fn get_alert(&self, alert_id: &str) -> AmlResult<Option<Alert>> {
        let row = self
            .conn
            .query_row(
                "SELECT alert_id, transaction_id, customer_id, risk_level, summary,
                        status, created_at, resolved_at, resolution_note
                 FROM alert WHERE alert_id = ?1",
                params![alert_id],
                alert_row,
            )
            .optional()?;
        row.map(AlertRow::into_alert).transpose()
    }

    pub fn alert_for_transaction(&self, transaction_id: &str) -> AmlResult<Option<Alert>> {
        let row = self
            .conn
            .query_row(
                "SELECT alert_id, transaction_id, customer_id, risk_level, summary,
                        status, created_at, resolved_at, resolution_note
                 FROM alert WHERE transaction_id = ?1",
                params![transaction_id],
                alert_row,
            )
            .optional()?;
        row.map(AlertRow::into_alert).transpose()
    }

    /// Compare-and-set status update. Returns false when the row was not
    /// in `expected` status (a concurrent transition won).
    pub fn update_alert_status(
        &self,
        alert_id: &str,
        expected: AlertStatus,
        next: AlertStatus,
        note: Option<&str>,
        resolved_at: Option<DateTime<Utc>>,
    ) -> AmlResult<bool> {
        let changed = self.conn.execute(
            "UPDATE alert
             SET status = ?1, resolution_note = ?2, resolved_at = ?3
             WHERE alert_id = ?4 AND status = ?5",
            params![
                next.as_str(),
                note,
                resolved_at.map(|t| t.to_rfc3339()),
                alert_id,
                expected.as_str(),
            ],
        )?;
        Ok(changed > 0)
    }

    /// Most recent alerts, optionally filtered by status.
    pub fn list_alerts(
        &self,
        status: Option<AlertStatus>,
        limit: usize,
    ) -> AmlResult<Vec<Alert>> {
        let mut stmt;
        let rows = match status {
            Some(status) => {
                stmt = self.conn.prepare(
                    "SELECT alert_id, transaction_id, customer_id, risk_level, summary,
                            status, created_at, resolved_at, resolution_note
                     FROM alert WHERE status = ?1
                     ORDER BY created_at DESC LIMIT ?2",
                )?;
                stmt.query_map(params![status.as_str(), limit as i64], alert_row)?
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => {
                stmt = self.conn.prepare(
                    "SELECT alert_id, transaction_id, customer_id, risk_level, summary,
                            status, created_at, resolved_at, resolution_note
                     FROM alert ORDER BY created_at DESC LIMIT ?1",
                )?;
                stmt.query_map(params![limit as i64], alert_row)?
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        rows.into_iter().map(AlertRow::into_alert).collect()
    }

    pub fn count_alerts(&self, status: AlertStatus) -> AmlResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM alert WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

struct AlertRow {
    alert_id: String,
    transaction_id: String,
    customer_id: String,
    risk_level: String,
    summary: String,
    status: String,
    created_at: String,
    resolved_at: Option<String>,
    resolution_note: Option<String>,
}

fn alert_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AlertRow> {
    Ok(AlertRow {
        alert_id: row.get(0)?,
        transaction_id: row.get(1)?,
        customer_id: row.get(2)?,
        risk_level: row.get(3)?,
        summary: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        resolved_at: row.get(7)?,
        resolution_note: row.get(8)?,
    })
}

impl AlertRow {
    fn into_alert(self) -> AmlResult<Alert> {
        Ok(Alert {
            alert_id: self.alert_id,
            transaction_id: self.transaction_id,
            customer_id: self.customer_id,
            level: RiskLevel::parse(&self.risk_level)
                .ok_or_else(|| bad_column("alert.risk_level", &self.risk_level))?,
            summary: self.summary,
            status: AlertStatus::parse(&self.status)
                .ok_or_else(|| bad_column("alert.status", &self.status))?,
            created_at: parse_timestamp(&self.created_at)?,
            resolved_at: self
                .resolved_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            resolution_note: self.resolution_note,
        })
    }
}
