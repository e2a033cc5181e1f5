//! Model capability traits and the built-in pre-fitted implementations.
//!
//! The composer never sees a concrete model family — only "given a numeric
//! feature vector, return a bounded real". The engine owns one immutable
//! `ModelSnapshot` at a time; reload is copy-and-swap so in-flight analyses
//! never observe a half-updated model.
//!
//! Callers invoke models only on vectors that passed the engine's
//! finiteness and dimensionality checks; malformed input never reaches
//! this layer.

use crate::features::{slot_set, slot_value, FeatureVector};
use std::sync::Arc;

/// Supervised signal: probability of illicit activity, in [0, 1].
///
/// The primary signal — trained on labeled history. Deterministic for a
/// fixed vector and a fixed fitted state.
pub trait RiskClassifier: Send + Sync {
    fn version(&self) -> &'static str;
    fn predict_probability(&self, features: &[f64]) -> f64;
}

/// Unsupervised signal: novelty score, in [0, 1].
///
/// Secondary to the classifier — exists because illicit-activity labels are
/// sparse and lag real patterns, while novelty detection catches behavior
/// the labeled model has not seen.
pub trait AnomalyModel: Send + Sync {
    fn version(&self) -> &'static str;
    fn score(&self, features: &[f64]) -> f64;
}

/// One immutable, process-wide set of loaded models.
///
/// `None` slots mean the model is unavailable; analysis degrades to
/// rule-only scoring rather than failing, since compliance coverage must
/// not silently stop.
#[derive(Clone)]
pub struct ModelSnapshot {
    pub classifier: Option<Arc<dyn RiskClassifier>>,
    pub anomaly: Option<Arc<dyn AnomalyModel>>,
}

impl ModelSnapshot {
    /// The bundled, pre-fitted ensemble.
    pub fn builtin() -> Self {
        Self {
            classifier: Some(Arc::new(ForestClassifier)),
            anomaly: Some(Arc::new(IsolationHeuristic)),
        }
    }

    /// No models loaded; every analysis is rule-only and carries the
    /// `model-degraded` flag.
    pub fn rule_only() -> Self {
        Self {
            classifier: None,
            anomaly: None,
        }
    }

    /// Version string recorded on every `AnalysisResult` so historical
    /// scores stay attributable as models are swapped.
    pub fn version_string(&self) -> String {
        let c = self.classifier.as_ref().map_or("none", |m| m.version());
        let a = self.anomaly.as_ref().map_or("none", |m| m.version());
        format!("{c}+{a}")
    }
}

// ── Built-in classifier ──────────────────────────────────────────────────────

/// Pre-fitted forest of four decision trees, each scoring one fraud
/// dimension on 0-100. The weighted vote divided by 100 is the
/// probability. Constants are the fitted state; changing any of them means
/// a new `version()`.
pub struct ForestClassifier;

const TREE_WEIGHTS: [f64; 4] = [0.30, 0.25, 0.25, 0.20];

impl RiskClassifier for ForestClassifier {
    fn version(&self) -> &'static str {
        "forest-v1"
    }

    fn predict_probability(&self, f: &[f64]) -> f64 {
        let votes = [
            tree_sanctions_amount(f),
            tree_account_behavior(f),
            tree_type_country(f),
            tree_kyc_velocity(f),
        ];
        let blended: f64 = votes
            .iter()
            .zip(TREE_WEIGHTS.iter())
            .map(|(score, weight)| score * weight)
            .sum();
        (blended / 100.0).clamp(0.0, 1.0)
    }
}

/// Tree 1: sanctions exposure and raw amount.
fn tree_sanctions_amount(f: &[f64]) -> f64 {
    let mut score: f64 = 0.0;
    if slot_set(f, FeatureVector::SANCTIONED_COUNTRY) {
        score += 95.0;
    } else if slot_set(f, FeatureVector::HIGH_RISK_COUNTRY) {
        score += 50.0;
    }
    let amount = slot_value(f, FeatureVector::AMOUNT);
    if amount > 100_000.0 {
        score += 40.0;
    } else if amount > 50_000.0 {
        score += 30.0;
    } else if amount > 10_000.0 {
        score += 15.0;
    }
    if slot_set(f, FeatureVector::NIGHT_HOUR) {
        score += 10.0;
    }
    score.min(100.0)
}

/// Tree 2: account age and behavioral history.
fn tree_account_behavior(f: &[f64]) -> f64 {
    let mut score: f64 = 0.0;
    if slot_set(f, FeatureVector::NEW_ACCOUNT) {
        score += 45.0;
    }
    if slot_set(f, FeatureVector::INCOMPLETE_KYC) {
        score += 45.0;
    }
    if slot_set(f, FeatureVector::PREV_FLAGGED) {
        score += 40.0;
    }
    if slot_set(f, FeatureVector::IS_PEP) {
        score += 30.0;
    }
    if slot_set(f, FeatureVector::HIGH_VELOCITY) {
        score += 25.0;
    }
    if slot_set(f, FeatureVector::ROUND_AMOUNT) {
        score += 10.0;
    }
    score.min(100.0)
}

/// Tree 3: transaction kind and destination combinations.
fn tree_type_country(f: &[f64]) -> f64 {
    let mut score: f64 = 0.0;
    let amount = slot_value(f, FeatureVector::AMOUNT);
    let sanctioned = slot_set(f, FeatureVector::SANCTIONED_COUNTRY);
    let high_risk = slot_set(f, FeatureVector::HIGH_RISK_COUNTRY);
    if slot_set(f, FeatureVector::KIND_CRYPTO) && sanctioned {
        score += 95.0;
    } else if slot_set(f, FeatureVector::KIND_CRYPTO) && high_risk {
        score += 80.0;
    }
    if slot_set(f, FeatureVector::KIND_WIRE) && sanctioned {
        score += 70.0;
    } else if slot_set(f, FeatureVector::KIND_WIRE) && high_risk {
        score += 40.0;
    }
    if slot_set(f, FeatureVector::KIND_CASH) && slot_set(f, FeatureVector::NEAR_REPORTING_THRESHOLD)
    {
        score += 55.0;
    }
    if slot_set(f, FeatureVector::KIND_INSURANCE) && amount > 100_000.0 {
        score += 30.0;
    }
    if high_risk && slot_set(f, FeatureVector::NIGHT_HOUR) {
        score += 30.0;
    }
    score.min(100.0)
}

/// Tree 4: KYC state crossed with velocity and amount.
fn tree_kyc_velocity(f: &[f64]) -> f64 {
    let mut score: f64 = 0.0;
    let amount = slot_value(f, FeatureVector::AMOUNT);
    if slot_set(f, FeatureVector::INCOMPLETE_KYC) && amount > 5_000.0 {
        score += 60.0;
    }
    if slot_set(f, FeatureVector::HIGH_VELOCITY) && slot_set(f, FeatureVector::NEW_ACCOUNT) {
        score += 50.0;
    }
    if slot_set(f, FeatureVector::NEW_ACCOUNT)
        && slot_set(f, FeatureVector::ABOVE_REPORTING_THRESHOLD)
    {
        score += 45.0;
    }
    if slot_set(f, FeatureVector::PREV_FLAGGED) && amount > 10_000.0 {
        score += 45.0;
    }
    if slot_set(f, FeatureVector::IS_PEP) && slot_set(f, FeatureVector::ABOVE_REPORTING_THRESHOLD) {
        score += 40.0;
    }
    if slot_set(f, FeatureVector::NEAR_REPORTING_THRESHOLD) {
        score += 20.0;
    }
    score.min(100.0)
}

// ── Built-in anomaly model ───────────────────────────────────────────────────

/// Signal-counting isolation heuristic: each independent risk signal adds
/// 0.13, and four or more co-occurring signals add a 0.20 novelty spike.
pub struct IsolationHeuristic;

impl AnomalyModel for IsolationHeuristic {
    fn version(&self) -> &'static str {
        "isolation-v1"
    }

    fn score(&self, f: &[f64]) -> f64 {
        let signals = [
            slot_set(f, FeatureVector::NIGHT_HOUR),
            slot_set(f, FeatureVector::NEW_ACCOUNT),
            slot_value(f, FeatureVector::AMOUNT) > 25_000.0,
            slot_set(f, FeatureVector::HIGH_RISK_COUNTRY),
            slot_set(f, FeatureVector::PREV_FLAGGED),
            slot_set(f, FeatureVector::INCOMPLETE_KYC),
            slot_set(f, FeatureVector::HIGH_VELOCITY),
            slot_set(f, FeatureVector::IS_PEP),
        ];
        let count = signals.iter().filter(|s| **s).count() as f64;
        let mut score = count * 0.13;
        if count >= 4.0 {
            score += 0.20;
        }
        score.min(1.0)
    }
}
