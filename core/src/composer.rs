//! Score Composer — deterministic fusion of the three risk signals.
//!
//! Fixed, documented mappings:
//!   1. Classifier probability and anomaly score map linearly onto 0-100.
//!   2. Flag weights are summed, capped at `flag_weight_cap`, and the
//!      capped sum is rescaled to 0-100.
//!   3. Composite = weighted blend of the three (default 50/20/30),
//!      clamped to [0, 100], rounded to nearest integer. An absent
//!      (degraded) signal contributes nothing; its blend weight is
//!      redistributed proportionally across the signals that are present,
//!      so a rule-only run still yields a full-range score.
//!   4. Level via the configured monotonic thresholds; action via the
//!      fixed level mapping.
//!   5. A hard flag overrides the blend: level CRITICAL,
//!      `str_required = true`, score raised to at least the CRITICAL
//!      threshold.
//!
//! `compose` is pure — identical inputs always produce the identical
//! scorecard, which is what makes regression against historical
//! transactions possible.

use crate::{
    config::{EngineConfig, FusionWeights, RiskThresholds},
    rules::RiskFlag,
    types::{RecommendedAction, RiskLevel},
};

/// The fused output, minus identifiers and timestamps (supplied by the
/// caller).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scorecard {
    pub score: u8,
    pub level: RiskLevel,
    pub action: RecommendedAction,
    pub str_required: bool,
}

pub struct ScoreComposer {
    fusion: FusionWeights,
    thresholds: RiskThresholds,
    flag_weight_cap: f64,
}

impl ScoreComposer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            fusion: config.fusion,
            thresholds: config.thresholds,
            flag_weight_cap: config.flag_weight_cap,
        }
    }

    pub fn compose(
        &self,
        flags: &[RiskFlag],
        classifier_probability: Option<f64>,
        anomaly_score: Option<f64>,
    ) -> Scorecard {
        let flag_sum: f64 = flags.iter().map(|f| f.weight).sum();
        let flag_component = 100.0 * flag_sum.min(self.flag_weight_cap) / self.flag_weight_cap;

        let mut blended = self.fusion.flags * flag_component;
        let mut weight_present = self.fusion.flags;
        if let Some(p) = classifier_probability {
            blended += self.fusion.classifier * (p.clamp(0.0, 1.0) * 100.0);
            weight_present += self.fusion.classifier;
        }
        if let Some(a) = anomaly_score {
            blended += self.fusion.anomaly * (a.clamp(0.0, 1.0) * 100.0);
            weight_present += self.fusion.anomaly;
        }
        let composite = if weight_present > 0.0 {
            (blended / weight_present).clamp(0.0, 100.0)
        } else {
            0.0
        };
        let mut score = composite.round() as u8;

        let hard = flags.iter().any(|f| f.hard);
        let level = if hard {
            score = score.max(self.thresholds.critical);
            RiskLevel::Critical
        } else {
            self.thresholds.level_for(score)
        };

        Scorecard {
            score,
            level,
            action: RecommendedAction::for_level(level),
            str_required: hard || level == RiskLevel::Critical,
        }
    }
}
