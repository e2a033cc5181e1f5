//! Customer screening persistence: recorded after each screen so results
//! can be reused for onboarding and monitoring without re-screening.

use super::{bad_column, parse_timestamp, AmlStore};
use crate::{
    error::AmlResult,
    screening::{CustomerScreeningResult, MatchStatus},
};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

impl AmlStore {
    pub fn insert_screening_result(&self, result: &CustomerScreeningResult) -> AmlResult<()> {
        self.conn.execute(
            "INSERT INTO screening_result
             (screening_id, customer_id, customer_name, match_status,
              matched_lists, match_score, list_version, screened_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                format!("scr-{}", Uuid::new_v4()),
                result.customer_id,
                result.customer_name,
                result.match_status.as_str(),
                serde_json::to_string(&result.matched_lists)?,
                result.match_score,
                result.list_version,
                result.screened_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The most recent screening on record for a customer.
    pub fn latest_screening_for_customer(
        &self,
        customer_id: &str,
    ) -> AmlResult<Option<CustomerScreeningResult>> {
        let row = self
            .conn
            .query_row(
                "SELECT customer_id, customer_name, match_status, matched_lists,
                        match_score, list_version, screened_at
                 FROM screening_result WHERE customer_id = ?1
                 ORDER BY screened_at DESC LIMIT 1",
                params![customer_id],
                screening_row,
            )
            .optional()?;
        row.map(ScreeningRow::into_result).transpose()
    }

    pub fn list_screenings(&self, limit: usize) -> AmlResult<Vec<CustomerScreeningResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_id, customer_name, match_status, matched_lists,
                    match_score, list_version, screened_at
             FROM screening_result ORDER BY screened_at DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], screening_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ScreeningRow::into_result).collect()
    }
}

struct ScreeningRow {
    customer_id: String,
    customer_name: String,
    match_status: String,
    matched_lists: String,
    match_score: f64,
    list_version: String,
    screened_at: String,
}

fn screening_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScreeningRow> {
    Ok(ScreeningRow {
        customer_id: row.get(0)?,
        customer_name: row.get(1)?,
        match_status: row.get(2)?,
        matched_lists: row.get(3)?,
        match_score: row.get(4)?,
        list_version: row.get(5)?,
        screened_at: row.get(6)?,
    })
}

impl ScreeningRow {
    fn into_result(self) -> AmlResult<CustomerScreeningResult> {
        Ok(CustomerScreeningResult {
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            match_status: MatchStatus::parse(&self.match_status)
                .ok_or_else(|| bad_column("screening_result.match_status", &self.match_status))?,
            matched_lists: serde_json::from_str(&self.matched_lists)?,
            match_score: self.match_score,
            list_version: self.list_version,
            screened_at: parse_timestamp(&self.screened_at)?,
        })
    }
}
