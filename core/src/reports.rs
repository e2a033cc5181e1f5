//! STR Lifecycle Manager — regulator-facing report drafts.
//!
//! DRAFT -> SUBMITTED, and SUBMITTED is terminal: every later mutation
//! attempt fails with `ImmutableState`, never a silent no-op.
//!
//! Submission policy (fixed, documented): submitting a report walks each
//! contributing alert toward ESCALATED — an OPEN alert passes through
//! UNDER_REVIEW first, an UNDER_REVIEW alert escalates directly, and
//! alerts already RESOLVED or ESCALATED are left untouched.

use crate::{
    alerts::{AlertManager, AlertStatus},
    error::{AmlError, AmlResult},
    store::AmlStore,
    types::{AlertId, ReportId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    Submitted,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrReport {
    pub report_id: ReportId,
    /// Contributing alerts, in draft order. Never empty.
    pub alert_ids: Vec<AlertId>,
    pub status: ReportStatus,
    pub narrative: String,
    pub created_at: DateTime<Utc>,
    /// Present only once SUBMITTED.
    pub submitted_at: Option<DateTime<Utc>>,
}

pub struct StrReportManager<'a> {
    store: &'a AmlStore,
}

impl<'a> StrReportManager<'a> {
    pub fn new(store: &'a AmlStore) -> Self {
        Self { store }
    }

    /// Create a DRAFT report from one or more alerts, generating a
    /// narrative that cites each contributing alert's flags and score.
    pub fn draft(&self, alert_ids: &[AlertId]) -> AmlResult<StrReport> {
        if alert_ids.is_empty() {
            return Err(AmlError::Validation(
                "an STR report needs at least one contributing alert".to_string(),
            ));
        }

        let mut unique: Vec<AlertId> = Vec::with_capacity(alert_ids.len());
        for id in alert_ids {
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }

        let mut narrative = String::from(
            "SUSPICIOUS TRANSACTION REPORT\n\
             Prepared for filing with the financial intelligence unit.\n\n",
        );
        for alert_id in &unique {
            let alert = self
                .store
                .get_alert(alert_id)?
                .ok_or_else(|| AmlError::NotFound {
                    entity: "alert",
                    id: alert_id.clone(),
                })?;
            let analysis = self.store.get_analysis(&alert.transaction_id)?;

            let _ = writeln!(
                narrative,
                "Alert {alert_id} — transaction {} (customer {}):",
                alert.transaction_id, alert.customer_id,
            );
            match analysis {
                Some(result) => {
                    let _ = writeln!(
                        narrative,
                        "  Composite risk score {} ({}), recommended action: {}.",
                        result.score,
                        result.level.as_str(),
                        result.action.as_str(),
                    );
                    for flag in &result.flags {
                        let _ = writeln!(
                            narrative,
                            "  - [{}] {} (weight {})",
                            flag.code, flag.description, flag.weight,
                        );
                    }
                }
                None => {
                    let _ = writeln!(
                        narrative,
                        "  {} risk alert: {}",
                        alert.level.as_str(),
                        alert.summary,
                    );
                }
            }
            narrative.push('\n');
        }

        let report = StrReport {
            report_id: format!("str-{}", Uuid::new_v4()),
            alert_ids: unique,
            status: ReportStatus::Draft,
            narrative,
            created_at: Utc::now(),
            submitted_at: None,
        };
        self.store.insert_report(&report)?;
        log::info!(
            "STR {} drafted from {} alert(s)",
            report.report_id,
            report.alert_ids.len(),
        );
        Ok(report)
    }

    /// Replace the narrative. Permitted only while DRAFT.
    pub fn amend_narrative(&self, report_id: &str, narrative: &str) -> AmlResult<StrReport> {
        let report = self.get(report_id)?;
        if report.status == ReportStatus::Submitted {
            return Err(AmlError::ImmutableState {
                report_id: report_id.to_string(),
            });
        }

        let updated = self.store.update_report_narrative(report_id, narrative)?;
        if !updated {
            // Lost a race with submit().
            return Err(AmlError::ImmutableState {
                report_id: report_id.to_string(),
            });
        }
        self.get(report_id)
    }

    /// DRAFT -> SUBMITTED. Terminal; also escalates contributing alerts
    /// per the documented policy.
    pub fn submit(&self, report_id: &str) -> AmlResult<StrReport> {
        let report = self.get(report_id)?;
        if report.status == ReportStatus::Submitted {
            return Err(AmlError::ImmutableState {
                report_id: report_id.to_string(),
            });
        }

        let submitted_at = Utc::now();
        let updated = self.store.mark_report_submitted(report_id, submitted_at)?;
        if !updated {
            return Err(AmlError::ImmutableState {
                report_id: report_id.to_string(),
            });
        }

        let alerts = AlertManager::new(self.store);
        for alert_id in &report.alert_ids {
            let alert = self
                .store
                .get_alert(alert_id)?
                .ok_or_else(|| AmlError::NotFound {
                    entity: "alert",
                    id: alert_id.clone(),
                })?;
            match alert.status {
                AlertStatus::Open => {
                    alerts.begin_review(alert_id)?;
                    alerts.escalate(alert_id)?;
                }
                AlertStatus::UnderReview => {
                    alerts.escalate(alert_id)?;
                }
                AlertStatus::Resolved | AlertStatus::Escalated => {}
            }
        }

        log::info!("STR {report_id} submitted");
        self.get(report_id)
    }

    pub fn get(&self, report_id: &str) -> AmlResult<StrReport> {
        self.store
            .get_report(report_id)?
            .ok_or_else(|| AmlError::NotFound {
                entity: "str_report",
                id: report_id.to_string(),
            })
    }
}
