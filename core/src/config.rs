//! Engine configuration: fusion weights, risk-level thresholds, rule
//! parameters, and country reference lists.
//!
//! Every value has a hard default in code; a JSON config file may override
//! any subset of fields. `validate()` runs before the engine accepts a
//! config — a non-monotonic threshold ladder or degenerate fusion weights
//! is a deploy error, not something to limp along with.

use crate::{
    error::{AmlError, AmlResult},
    types::RiskLevel,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Blend weights for the three composite-score signals.
/// Must sum to 1.0 (within rounding).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FusionWeights {
    pub classifier: f64,
    pub anomaly: f64,
    pub flags: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            classifier: 0.50,
            anomaly: 0.20,
            flags: 0.30,
        }
    }
}

/// Lower bounds of the MEDIUM, HIGH, and CRITICAL score bands.
///
/// Scores run 0-100 inclusive; everything below `medium` is LOW. The three
/// bounds must be strictly increasing so the bands are non-overlapping and
/// cover the full range with no gaps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub medium: u8,
    pub high: u8,
    pub critical: u8,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 40,
            high: 65,
            critical: 85,
        }
    }
}

impl RiskThresholds {
    /// Map a composite score onto its severity bucket.
    pub fn level_for(&self, score: u8) -> RiskLevel {
        if score >= self.critical {
            RiskLevel::Critical
        } else if score >= self.high {
            RiskLevel::High
        } else if score >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fusion: FusionWeights,
    pub thresholds: RiskThresholds,

    /// Cap on the summed flag weights before rescaling to 0-100. Keeps a
    /// single non-hard rule from forcing CRITICAL without model
    /// corroboration.
    pub flag_weight_cap: f64,

    /// Minimum analysis level that opens an alert.
    pub alert_minimum: RiskLevel,

    /// Mandatory-reporting threshold in currency units ($10,000 under the
    /// default ruleset).
    pub reporting_threshold: f64,

    /// Lower edge of the just-under-threshold structuring band.
    pub structuring_limit: f64,

    /// Accounts younger than this many months count as new.
    pub new_account_months: u32,

    /// Trailing-30-day transaction counts above this are high velocity.
    pub velocity_count_30d: u32,

    /// Hours strictly below this are the low-activity night window.
    pub night_end_hour: u8,

    /// ISO alpha-2 codes of sanctioned jurisdictions (lowercase).
    pub sanctioned_countries: Vec<String>,

    /// ISO alpha-2 codes of FATF high-risk jurisdictions (lowercase).
    /// A sanctioned country is implicitly high-risk as well.
    pub high_risk_countries: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fusion: FusionWeights::default(),
            thresholds: RiskThresholds::default(),
            flag_weight_cap: 80.0,
            alert_minimum: RiskLevel::Medium,
            reporting_threshold: 10_000.0,
            structuring_limit: 9_500.0,
            new_account_months: 3,
            velocity_count_30d: 15,
            night_end_hour: 6,
            sanctioned_countries: codes(&["ir", "kp", "ru", "sy", "sd", "by", "cu", "mm"]),
            high_risk_countries: codes(&[
                "ir", "kp", "ru", "sy", "sd", "pk", "af", "by", "cu", "mm", "iq", "ly", "ye",
                "so",
            ]),
        }
    }
}

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

impl EngineConfig {
    /// Load a config from a JSON file. Missing fields fall back to the
    /// defaults; the result is validated before being returned.
    pub fn from_json_file(path: &Path) -> AmlResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AmlError::Validation(format!("cannot read config {path:?}: {e}")))?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AmlResult<()> {
        let t = &self.thresholds;
        if !(t.medium < t.high && t.high < t.critical) {
            return Err(AmlError::Validation(format!(
                "risk thresholds must be strictly increasing, got {}/{}/{}",
                t.medium, t.high, t.critical
            )));
        }
        if t.critical > 100 || t.medium == 0 {
            return Err(AmlError::Validation(format!(
                "risk thresholds must lie inside (0, 100], got {}/{}/{}",
                t.medium, t.high, t.critical
            )));
        }

        let w = &self.fusion;
        if w.classifier < 0.0 || w.anomaly < 0.0 || w.flags < 0.0 {
            return Err(AmlError::Validation(
                "fusion weights must be non-negative".to_string(),
            ));
        }
        let sum = w.classifier + w.anomaly + w.flags;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(AmlError::Validation(format!(
                "fusion weights must sum to 1.0, got {sum}"
            )));
        }

        if !self.flag_weight_cap.is_finite() || self.flag_weight_cap <= 0.0 {
            return Err(AmlError::Validation(format!(
                "flag_weight_cap must be positive, got {}",
                self.flag_weight_cap
            )));
        }
        if self.structuring_limit >= self.reporting_threshold {
            return Err(AmlError::Validation(format!(
                "structuring_limit {} must be below reporting_threshold {}",
                self.structuring_limit, self.reporting_threshold
            )));
        }
        if self.night_end_hour > 23 {
            return Err(AmlError::Validation(format!(
                "night_end_hour must be 0-23, got {}",
                self.night_end_hour
            )));
        }
        Ok(())
    }

    pub fn is_sanctioned(&self, country: &str) -> bool {
        self.sanctioned_countries.iter().any(|c| c == country)
    }

    pub fn is_high_risk(&self, country: &str) -> bool {
        self.is_sanctioned(country) || self.high_risk_countries.iter().any(|c| c == country)
    }
}
