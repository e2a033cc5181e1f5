//! SQLite persistence layer.
//!
//! RULE: Only the store modules talk to the database. Managers and tools
//! call store methods — they never execute SQL directly.

use crate::{
    context::{KycStatus, TransactionContext, TransactionKind},
    engine::AnalysisResult,
    error::{AmlError, AmlResult},
    rules::RiskFlag,
    types::{RecommendedAction, RiskLevel},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

mod alert;
mod report;
mod screening;

pub struct AmlStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl AmlStore {
    pub fn open(path: &str) -> AmlResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        // Bounded wait on a locked database instead of an immediate
        // SQLITE_BUSY; lifecycle transitions race across processes.
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AmlResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database. For in-memory
    /// databases this returns a fresh, isolated database.
    pub fn reopen(&self) -> AmlResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AmlResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Transaction contexts ───────────────────────────────────

    pub fn insert_context(&self, ctx: &TransactionContext) -> AmlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO transaction_context
             (transaction_id, customer_id, customer_name, amount, kind, country,
              hour, tx_count_30d, account_age_months, kyc_status,
              previously_flagged, is_pep)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                ctx.transaction_id,
                ctx.customer_id,
                ctx.customer_name,
                ctx.amount,
                ctx.kind.as_str(),
                ctx.country,
                i64::from(ctx.hour),
                i64::from(ctx.tx_count_30d),
                i64::from(ctx.account_age_months),
                ctx.kyc_status.as_str(),
                ctx.previously_flagged as i64,
                ctx.is_pep as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_context(&self, transaction_id: &str) -> AmlResult<Option<TransactionContext>> {
        let row = self
            .conn
            .query_row(
                "SELECT transaction_id, customer_id, customer_name, amount, kind,
                        country, hour, tx_count_30d, account_age_months, kyc_status,
                        previously_flagged, is_pep
                 FROM transaction_context WHERE transaction_id = ?1",
                params![transaction_id],
                |row| {
                    Ok(ContextRow {
                        transaction_id: row.get(0)?,
                        customer_id: row.get(1)?,
                        customer_name: row.get(2)?,
                        amount: row.get(3)?,
                        kind: row.get(4)?,
                        country: row.get(5)?,
                        hour: row.get(6)?,
                        tx_count_30d: row.get(7)?,
                        account_age_months: row.get(8)?,
                        kyc_status: row.get(9)?,
                        previously_flagged: row.get(10)?,
                        is_pep: row.get(11)?,
                    })
                },
            )
            .optional()?;
        row.map(ContextRow::into_context).transpose()
    }

    // ── Analysis results ───────────────────────────────────────

    pub fn insert_analysis(&self, result: &AnalysisResult) -> AmlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO analysis_result
             (transaction_id, customer_id, score, risk_level, flags,
              classifier_probability, anomaly_score, action, str_required,
              model_version, ruleset_version, schema_version, analyzed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                result.transaction_id,
                result.customer_id,
                i64::from(result.score),
                result.level.as_str(),
                serde_json::to_string(&result.flags)?,
                result.classifier_probability,
                result.anomaly_score,
                result.action.as_str(),
                result.str_required as i64,
                result.model_version,
                result.ruleset_version,
                i64::from(result.schema_version),
                result.analyzed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_analysis(&self, transaction_id: &str) -> AmlResult<Option<AnalysisResult>> {
        let row = self
            .conn
            .query_row(
                "SELECT transaction_id, customer_id, score, risk_level, flags,
                        classifier_probability, anomaly_score, action, str_required,
                        model_version, ruleset_version, schema_version, analyzed_at
                 FROM analysis_result WHERE transaction_id = ?1",
                params![transaction_id],
                analysis_row,
            )
            .optional()?;
        row.map(AnalysisRow::into_result).transpose()
    }

    /// Most recent analyses, optionally filtered by risk level.
    pub fn list_analyses(
        &self,
        level: Option<RiskLevel>,
        limit: usize,
    ) -> AmlResult<Vec<AnalysisResult>> {
        let mut stmt;
        let rows = match level {
            Some(level) => {
                stmt = self.conn.prepare(
                    "SELECT transaction_id, customer_id, score, risk_level, flags,
                            classifier_probability, anomaly_score, action, str_required,
                            model_version, ruleset_version, schema_version, analyzed_at
                     FROM analysis_result WHERE risk_level = ?1
                     ORDER BY analyzed_at DESC LIMIT ?2",
                )?;
                stmt.query_map(params![level.as_str(), limit as i64], analysis_row)?
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => {
                stmt = self.conn.prepare(
                    "SELECT transaction_id, customer_id, score, risk_level, flags,
                            classifier_probability, anomaly_score, action, str_required,
                            model_version, ruleset_version, schema_version, analyzed_at
                     FROM analysis_result
                     ORDER BY analyzed_at DESC LIMIT ?1",
                )?;
                stmt.query_map(params![limit as i64], analysis_row)?
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        rows.into_iter().map(AnalysisRow::into_result).collect()
    }

    // ── Dashboard aggregates ───────────────────────────────────

    pub fn dashboard_stats(&self) -> AmlResult<DashboardStats> {
        let count_level = |levels: &str| -> AmlResult<i64> {
            let sql = format!(
                "SELECT COUNT(*) FROM analysis_result WHERE risk_level IN ({levels})"
            );
            Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
        };
        let high_risk = count_level("'high', 'critical'")?;
        let medium_risk = count_level("'medium'")?;
        let cleared = count_level("'low'")?;

        let flagged_amount: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(t.amount), 0)
             FROM analysis_result a
             JOIN transaction_context t ON t.transaction_id = a.transaction_id
             WHERE a.risk_level IN ('high', 'critical')",
            [],
            |row| row.get(0),
        )?;
        let open_alerts: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM alert WHERE status = 'open'",
            [],
            |row| row.get(0),
        )?;
        let str_reports: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM str_report", [], |row| row.get(0))?;

        Ok(DashboardStats {
            high_risk,
            medium_risk,
            cleared,
            flagged_amount,
            open_alerts,
            str_reports,
            total: high_risk + medium_risk + cleared,
        })
    }
}

/// Read-only aggregates for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub high_risk: i64,
    pub medium_risk: i64,
    pub cleared: i64,
    pub flagged_amount: f64,
    pub open_alerts: i64,
    pub str_reports: i64,
    pub total: i64,
}

// ── Row mapping helpers ──────────────────────────────────────────────────────

struct ContextRow {
    transaction_id: String,
    customer_id: String,
    customer_name: String,
    amount: f64,
    kind: String,
    country: String,
    hour: i64,
    tx_count_30d: i64,
    account_age_months: i64,
    kyc_status: String,
    previously_flagged: i64,
    is_pep: i64,
}

impl ContextRow {
    fn into_context(self) -> AmlResult<TransactionContext> {
        Ok(TransactionContext {
            transaction_id: self.transaction_id,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            amount: self.amount,
            kind: TransactionKind::parse(&self.kind)
                .ok_or_else(|| bad_column("transaction_context.kind", &self.kind))?,
            country: self.country,
            hour: self.hour as u8,
            tx_count_30d: self.tx_count_30d as u32,
            account_age_months: self.account_age_months as u32,
            kyc_status: KycStatus::parse(&self.kyc_status)
                .ok_or_else(|| bad_column("transaction_context.kyc_status", &self.kyc_status))?,
            previously_flagged: self.previously_flagged != 0,
            is_pep: self.is_pep != 0,
        })
    }
}

struct AnalysisRow {
    transaction_id: String,
    customer_id: String,
    score: i64,
    risk_level: String,
    flags: String,
    classifier_probability: Option<f64>,
    anomaly_score: Option<f64>,
    action: String,
    str_required: i64,
    model_version: String,
    ruleset_version: String,
    schema_version: i64,
    analyzed_at: String,
}

fn analysis_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AnalysisRow> {
    Ok(AnalysisRow {
        transaction_id: row.get(0)?,
        customer_id: row.get(1)?,
        score: row.get(2)?,
        risk_level: row.get(3)?,
        flags: row.get(4)?,
        classifier_probability: row.get(5)?,
        anomaly_score: row.get(6)?,
        action: row.get(7)?,
        str_required: row.get(8)?,
        model_version: row.get(9)?,
        ruleset_version: row.get(10)?,
        schema_version: row.get(11)?,
        analyzed_at: row.get(12)?,
    })
}

impl AnalysisRow {
    fn into_result(self) -> AmlResult<AnalysisResult> {
        let flags: Vec<RiskFlag> = serde_json::from_str(&self.flags)?;
        Ok(AnalysisResult {
            transaction_id: self.transaction_id,
            customer_id: self.customer_id,
            score: self.score as u8,
            level: RiskLevel::parse(&self.risk_level)
                .ok_or_else(|| bad_column("analysis_result.risk_level", &self.risk_level))?,
            flags,
            classifier_probability: self.classifier_probability,
            anomaly_score: self.anomaly_score,
            action: RecommendedAction::parse(&self.action)
                .ok_or_else(|| bad_column("analysis_result.action", &self.action))?,
            str_required: self.str_required != 0,
            model_version: self.model_version,
            ruleset_version: self.ruleset_version,
            schema_version: self.schema_version as u32,
            analyzed_at: parse_timestamp(&self.analyzed_at)?,
        })
    }
}

pub(crate) fn parse_timestamp(s: &str) -> AmlResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AmlError::Validation(format!("bad timestamp '{s}': {e}")))
}

pub(crate) fn bad_column(column: &str, value: &str) -> AmlError {
    AmlError::Validation(format!("unexpected value '{value}' in {column}"))
}
