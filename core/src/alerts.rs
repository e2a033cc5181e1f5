//! Alert Lifecycle Manager.
//!
//! State machine: OPEN -> UNDER_REVIEW -> {RESOLVED, ESCALATED}. The
//! transition table is the single source of truth; anything not in it is
//! an `InvalidTransition` error — state is never silently coerced, and
//! RESOLVED/ESCALATED are terminal.
//!
//! Exactly one alert may exist per transaction. `open_for` is idempotent
//! per transaction id, backed by the unique index on
//! `alert.transaction_id` so the guarantee holds even across processes.
//! Status updates are compare-and-set at the storage boundary for the
//! same reason.

use crate::{
    engine::AnalysisResult,
    error::{AmlError, AmlResult},
    store::AmlStore,
    types::{AlertId, CustomerId, RiskLevel, TransactionId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Open,
    UnderReview,
    Resolved,
    Escalated,
}

impl AlertStatus {
    /// The transition table. Everything else is rejected.
    pub fn can_transition_to(self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Open, AlertStatus::UnderReview)
                | (AlertStatus::UnderReview, AlertStatus::Resolved)
                | (AlertStatus::UnderReview, AlertStatus::Escalated)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::Escalated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::UnderReview => "under_review",
            Self::Resolved => "resolved",
            Self::Escalated => "escalated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "under_review" => Some(Self::UnderReview),
            "resolved" => Some(Self::Resolved),
            "escalated" => Some(Self::Escalated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: AlertId,
    pub transaction_id: TransactionId,
    pub customer_id: CustomerId,
    pub level: RiskLevel,
    /// Top triggered flag, for list views.
    pub summary: String,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Present only once RESOLVED.
    pub resolution_note: Option<String>,
}

pub struct AlertManager<'a> {
    store: &'a AmlStore,
    minimum_level: RiskLevel,
}

impl<'a> AlertManager<'a> {
    pub fn new(store: &'a AmlStore) -> Self {
        Self {
            store,
            minimum_level: RiskLevel::Medium,
        }
    }

    pub fn with_minimum_level(mut self, minimum_level: RiskLevel) -> Self {
        self.minimum_level = minimum_level;
        self
    }

    /// Open an alert for a qualifying analysis. Returns `None` below the
    /// configured minimum level. Re-analysis of the same transaction
    /// returns the existing alert instead of creating a duplicate.
    pub fn open_for(&self, analysis: &AnalysisResult) -> AmlResult<Option<Alert>> {
        if analysis.level < self.minimum_level {
            return Ok(None);
        }
        if let Some(existing) = self.store.alert_for_transaction(&analysis.transaction_id)? {
            return Ok(Some(existing));
        }

        let summary = analysis
            .flags
            .first()
            .map(|f| f.description.clone())
            .unwrap_or_else(|| format!("{} risk score {}", analysis.level.as_str(), analysis.score));
        let alert = Alert {
            alert_id: format!("alert-{}", Uuid::new_v4()),
            transaction_id: analysis.transaction_id.clone(),
            customer_id: analysis.customer_id.clone(),
            level: analysis.level,
            summary,
            status: AlertStatus::Open,
            created_at: Utc::now(),
            resolved_at: None,
            resolution_note: None,
        };

        match self.store.insert_alert(&alert) {
            Ok(()) => {
                log::info!(
                    "alert {} opened for tx {} ({})",
                    alert.alert_id,
                    alert.transaction_id,
                    alert.level.as_str(),
                );
                Ok(Some(alert))
            }
            // Another process won the unique-index race; theirs is the
            // alert of record.
            Err(AmlError::Database(e)) if is_unique_violation(&e) => {
                match self.store.alert_for_transaction(&analysis.transaction_id)? {
                    Some(existing) => Ok(Some(existing)),
                    None => Err(AmlError::DuplicateAlert {
                        transaction_id: analysis.transaction_id.clone(),
                    }),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// OPEN -> UNDER_REVIEW.
    pub fn begin_review(&self, alert_id: &str) -> AmlResult<Alert> {
        self.transition(alert_id, AlertStatus::UnderReview, None)
    }

    /// UNDER_REVIEW -> RESOLVED. A non-empty note is required.
    pub fn resolve(&self, alert_id: &str, note: &str) -> AmlResult<Alert> {
        if note.trim().is_empty() {
            return Err(AmlError::Validation(
                "resolution note must not be empty".to_string(),
            ));
        }
        self.transition(alert_id, AlertStatus::Resolved, Some(note))
    }

    /// UNDER_REVIEW -> ESCALATED.
    pub fn escalate(&self, alert_id: &str) -> AmlResult<Alert> {
        self.transition(alert_id, AlertStatus::Escalated, None)
    }

    fn transition(
        &self,
        alert_id: &str,
        next: AlertStatus,
        note: Option<&str>,
    ) -> AmlResult<Alert> {
        let current = self
            .store
            .get_alert(alert_id)?
            .ok_or_else(|| AmlError::NotFound {
                entity: "alert",
                id: alert_id.to_string(),
            })?;
        if !current.status.can_transition_to(next) {
            return Err(AmlError::InvalidTransition {
                entity: "alert",
                from: current.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        let resolved_at = next.is_terminal().then(Utc::now);
        let updated =
            self.store
                .update_alert_status(alert_id, current.status, next, note, resolved_at)?;
        if !updated {
            // A concurrent transition got there first; report the state
            // we actually observe now.
            let fresh = self
                .store
                .get_alert(alert_id)?
                .ok_or_else(|| AmlError::NotFound {
                    entity: "alert",
                    id: alert_id.to_string(),
                })?;
            return Err(AmlError::InvalidTransition {
                entity: "alert",
                from: fresh.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        log::info!(
            "alert {alert_id}: {} -> {}",
            current.status.as_str(),
            next.as_str(),
        );
        self.store
            .get_alert(alert_id)?
            .ok_or_else(|| AmlError::NotFound {
                entity: "alert",
                id: alert_id.to_string(),
            })
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
