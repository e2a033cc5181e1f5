//! STR report persistence. Draft-only updates are enforced in SQL
//! (`WHERE status = 'draft'`) so immutability after submission holds at
//! the storage boundary, not just in the manager.

use super::{bad_column, parse_timestamp, AmlStore};
use crate::{
    error::AmlResult,
    reports::{ReportStatus, StrReport},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

impl AmlStore {
    pub fn insert_report(&self, report: &StrReport) -> AmlResult<()> {
        self.conn.execute(
            "INSERT INTO str_report
             (report_id, alert_ids, status, narrative, created_at, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                report.report_id,
                serde_json::to_string(&report.alert_ids)?,
                report.status.as_str(),
                report.narrative,
                report.created_at.to_rfc3339(),
                report.submitted_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn get_report(&self, report_id: &str) -> AmlResult<Option<StrReport>> {
        let row = self
            .conn
            .query_row(
                "SELECT report_id, alert_ids, status, narrative, created_at, submitted_at
                 FROM str_report WHERE report_id = ?1",
                params![report_id],
                report_row,
            )
            .optional()?;
        row.map(ReportRow::into_report).transpose()
    }

    /// Replace the narrative of a DRAFT report. Returns false when the
    /// report is no longer a draft.
    pub fn update_report_narrative(&self, report_id: &str, narrative: &str) -> AmlResult<bool> {
        let changed = self.conn.execute(
            "UPDATE str_report SET narrative = ?1
             WHERE report_id = ?2 AND status = 'draft'",
            params![narrative, report_id],
        )?;
        Ok(changed > 0)
    }

    /// DRAFT -> SUBMITTED compare-and-set. Returns false when the report
    /// was already submitted.
    pub fn mark_report_submitted(
        &self,
        report_id: &str,
        submitted_at: DateTime<Utc>,
    ) -> AmlResult<bool> {
        let changed = self.conn.execute(
            "UPDATE str_report SET status = 'submitted', submitted_at = ?1
             WHERE report_id = ?2 AND status = 'draft'",
            params![submitted_at.to_rfc3339(), report_id],
        )?;
        Ok(changed > 0)
    }

    pub fn list_reports(&self, limit: usize) -> AmlResult<Vec<StrReport>> {
        let mut stmt = self.conn.prepare(
            "SELECT report_id, alert_ids, status, narrative, created_at, submitted_at
             FROM str_report ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], report_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ReportRow::into_report).collect()
    }

    pub fn count_reports(&self) -> AmlResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM str_report", [], |row| row.get(0))?;
        Ok(count)
    }
}

struct ReportRow {
    report_id: String,
    alert_ids: String,
    status: String,
    narrative: String,
    created_at: String,
    submitted_at: Option<String>,
}

fn report_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        report_id: row.get(0)?,
        alert_ids: row.get(1)?,
        status: row.get(2)?,
        narrative: row.get(3)?,
        created_at: row.get(4)?,
        submitted_at: row.get(5)?,
    })
}

impl ReportRow {
    fn into_report(self) -> AmlResult<StrReport> {
        Ok(StrReport {
            report_id: self.report_id,
            alert_ids: serde_json::from_str(&self.alert_ids)?,
            status: ReportStatus::parse(&self.status)
                .ok_or_else(|| bad_column("str_report.status", &self.status))?,
            narrative: self.narrative,
            created_at: parse_timestamp(&self.created_at)?,
            submitted_at: self
                .submitted_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}
