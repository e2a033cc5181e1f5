//! Shared primitive types used across the entire crate.

use serde::{Deserialize, Serialize};

/// A stable, unique transaction identifier.
pub type TransactionId = String;

/// A stable, unique customer identifier.
pub type CustomerId = String;

/// A stable, unique alert identifier.
pub type AlertId = String;

/// A stable, unique STR report identifier.
pub type ReportId = String;

/// Severity bucket for a composite risk score.
///
/// Strictly ordered: `Low < Medium < High < Critical`. The boundaries
/// between buckets live in [`crate::config::RiskThresholds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// What the compliance desk should do next with a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Monitor,
    Review,
    Escalate,
    FileStr,
}

impl RecommendedAction {
    /// The fixed level-to-action mapping.
    pub fn for_level(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => Self::Monitor,
            RiskLevel::Medium => Self::Review,
            RiskLevel::High => Self::Escalate,
            RiskLevel::Critical => Self::FileStr,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monitor => "monitor",
            Self::Review => "review",
            Self::Escalate => "escalate",
            Self::FileStr => "file_str",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monitor" => Some(Self::Monitor),
            "review" => Some(Self::Review),
            "escalate" => Some(Self::Escalate),
            "file_str" => Some(Self::FileStr),
            _ => None,
        }
    }
}
