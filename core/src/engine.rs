//! The risk-assessment engine — the single synchronous `analyze` entry
//! point.
//!
//! RULES:
//!   - Validation happens before any rule or model call; a malformed
//!     context yields `Validation` and nothing else.
//!   - Rules, models, and the composer are pure with respect to
//!     request-scoped data; analyses may run in parallel freely.
//!   - The loaded models are one immutable snapshot behind an `RwLock`;
//!     reload is copy-and-swap, never in-place mutation.
//!   - Model unavailability degrades to rule-only scoring with a
//!     `model-degraded` flag and a warning — it never aborts an analysis.

use crate::{
    composer::ScoreComposer,
    config::EngineConfig,
    context::TransactionContext,
    error::{AmlError, AmlResult},
    features::FeatureVector,
    model::ModelSnapshot,
    rules::{RiskFlag, RuleSet},
    screening::CustomerScreeningResult,
    types::{CustomerId, RecommendedAction, RiskLevel, TransactionId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Record-format version for persisted analyses. Bump on any field change.
pub const ANALYSIS_SCHEMA_VERSION: u32 = 1;

/// The complete output of one analysis. Created once, never mutated;
/// records the model and ruleset versions that produced it so historical
/// scores remain reproducible as models change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub transaction_id: TransactionId,
    pub customer_id: CustomerId,
    /// Composite score, 0-100.
    pub score: u8,
    pub level: RiskLevel,
    /// Triggered flags, sorted by descending weight.
    pub flags: Vec<RiskFlag>,
    /// `None` when the classifier was unavailable for this run.
    pub classifier_probability: Option<f64>,
    /// `None` when the anomaly model was unavailable for this run.
    pub anomaly_score: Option<f64>,
    pub action: RecommendedAction,
    pub str_required: bool,
    pub model_version: String,
    pub ruleset_version: String,
    pub schema_version: u32,
    pub analyzed_at: DateTime<Utc>,
}

pub struct RiskEngine {
    config: EngineConfig,
    composer: ScoreComposer,
    rules: RuleSet,
    models: RwLock<Arc<ModelSnapshot>>,
}

impl RiskEngine {
    /// Engine with the validated config, default ruleset, and built-in
    /// models.
    pub fn new(config: EngineConfig) -> AmlResult<Self> {
        Self::with_models(config, ModelSnapshot::builtin())
    }

    pub fn with_models(config: EngineConfig, models: ModelSnapshot) -> AmlResult<Self> {
        config.validate()?;
        let composer = ScoreComposer::new(&config);
        Ok(Self {
            config,
            composer,
            rules: RuleSet::fatf_default(),
            models: RwLock::new(Arc::new(models)),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The snapshot in-flight analyses are using right now.
    pub fn current_models(&self) -> Arc<ModelSnapshot> {
        self.models
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Deploy-time health check: errors when either model is missing
    /// from the current snapshot. `analyze` itself never fails for this,
    /// it degrades to rule-only scoring instead.
    pub fn ensure_models(&self) -> AmlResult<()> {
        let snapshot = self.current_models();
        if snapshot.classifier.is_none() {
            return Err(AmlError::ModelUnavailable { name: "classifier" });
        }
        if snapshot.anomaly.is_none() {
            return Err(AmlError::ModelUnavailable { name: "anomaly" });
        }
        Ok(())
    }

    /// Copy-and-swap model reload. Analyses already holding the old
    /// snapshot finish on it; new analyses pick up the replacement.
    pub fn swap_models(&self, models: ModelSnapshot) {
        let mut guard = self
            .models
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(models);
        log::info!("model snapshot swapped to {}", guard.version_string());
    }

    /// Analyze one transaction. Either a full `AnalysisResult` comes back
    /// or a typed error — never a partial result.
    pub fn analyze(
        &self,
        ctx: &TransactionContext,
        screening: Option<&CustomerScreeningResult>,
    ) -> AmlResult<AnalysisResult> {
        self.analyze_at(ctx, screening, Utc::now())
    }

    /// `analyze` with an explicit timestamp, for reproducible results in
    /// tests and replays.
    pub fn analyze_at(
        &self,
        ctx: &TransactionContext,
        screening: Option<&CustomerScreeningResult>,
        analyzed_at: DateTime<Utc>,
    ) -> AmlResult<AnalysisResult> {
        ctx.validate()?;

        let features = FeatureVector::extract(ctx, &self.config);
        let snapshot = self.current_models();

        // A vector that fails the finiteness check is treated the same as
        // a missing model: neutral signal, visible degradation.
        let vector_ok = features.is_finite();
        let classifier_probability = if vector_ok {
            snapshot
                .classifier
                .as_ref()
                .map(|m| m.predict_probability(features.as_slice()))
        } else {
            None
        };
        let anomaly_score = if vector_ok {
            snapshot.anomaly.as_ref().map(|m| m.score(features.as_slice()))
        } else {
            None
        };

        let mut flags = self.rules.evaluate(&features, screening);
        if classifier_probability.is_none() || anomaly_score.is_none() {
            log::warn!(
                "tx {}: degraded scoring (classifier={}, anomaly={}, vector_ok={})",
                ctx.transaction_id,
                classifier_probability.is_some(),
                anomaly_score.is_some(),
                vector_ok,
            );
            flags.push(RiskFlag::model_degraded());
        }

        let card = self.composer.compose(&flags, classifier_probability, anomaly_score);
        log::debug!(
            "tx {}: score={} level={} flags={}",
            ctx.transaction_id,
            card.score,
            card.level.as_str(),
            flags.len(),
        );

        Ok(AnalysisResult {
            transaction_id: ctx.transaction_id.clone(),
            customer_id: ctx.customer_id.clone(),
            score: card.score,
            level: card.level,
            flags,
            classifier_probability,
            anomaly_score,
            action: card.action,
            str_required: card.str_required,
            model_version: snapshot.version_string(),
            ruleset_version: self.rules.version.to_string(),
            schema_version: ANALYSIS_SCHEMA_VERSION,
            analyzed_at,
        })
    }
}
