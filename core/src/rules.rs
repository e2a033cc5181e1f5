//! Rule Flag Evaluator — the FATF-derived red-flag registry.
//!
//! Rules are data, not branching code: an ordered list of
//! (code, description, weight, severity, predicate) entries. Every rule is
//! evaluated independently on every transaction — no short-circuiting — so
//! all applicable flags surface even when one alone already forces
//! escalation. Output is sorted by descending weight; ties keep
//! registration order for reproducible top-flag reporting.

use crate::{features::FeatureVector, screening::{CustomerScreeningResult, MatchStatus}};
use serde::{Deserialize, Serialize};

/// Identifies the flag registry that produced a result. Bump whenever a
/// rule is added, removed, or re-weighted.
pub const RULESET_VERSION: &str = "fatf-core-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// One triggered red flag. Pure derivation of the input; flags never
/// mutate state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFlag {
    pub code: String,
    pub description: String,
    pub weight: f64,
    pub severity: FlagSeverity,
    /// A hard flag overrides score blending and forces CRITICAL with
    /// `str_required = true` (e.g. a confirmed sanctions match).
    pub hard: bool,
}

impl RiskFlag {
    /// Zero-weight marker attached when analysis ran without full model
    /// coverage and fell back to rule-only scoring.
    pub fn model_degraded() -> Self {
        Self {
            code: "model-degraded".to_string(),
            description: "Scored without full model coverage; rule signals only".to_string(),
            weight: 0.0,
            severity: FlagSeverity::Low,
            hard: false,
        }
    }
}

type Predicate = fn(&FeatureVector, Option<&CustomerScreeningResult>) -> bool;

struct Rule {
    code: &'static str,
    description: &'static str,
    weight: f64,
    severity: FlagSeverity,
    hard: bool,
    trigger: Predicate,
}

pub struct RuleSet {
    rules: Vec<Rule>,
    pub version: &'static str,
}

impl RuleSet {
    /// The default FATF-derived registry, in registration order.
    pub fn fatf_default() -> Self {
        use FlagSeverity::*;
        let rules = vec![
            Rule {
                code: "watchlist-match",
                description: "Customer confirmed on a sanctions watchlist",
                weight: 50.0,
                severity: Critical,
                hard: true,
                trigger: |_, s| matches!(s, Some(r) if r.match_status == MatchStatus::WatchlistMatch),
            },
            Rule {
                code: "sanctioned-destination",
                description: "Transaction to/from a sanctioned jurisdiction",
                weight: 45.0,
                severity: Critical,
                hard: true,
                trigger: |f, _| f.is_set(FeatureVector::SANCTIONED_COUNTRY),
            },
            Rule {
                code: "crypto-high-risk",
                description: "Cryptocurrency transfer to a high-risk jurisdiction",
                weight: 30.0,
                severity: Critical,
                hard: false,
                trigger: |f, _| {
                    f.is_set(FeatureVector::KIND_CRYPTO) && f.is_set(FeatureVector::HIGH_RISK_COUNTRY)
                },
            },
            Rule {
                code: "pep-exposure",
                description: "Customer is or matches a Politically Exposed Person",
                weight: 20.0,
                severity: High,
                hard: false,
                trigger: |f, s| {
                    f.is_set(FeatureVector::IS_PEP)
                        || matches!(s, Some(r) if r.match_status == MatchStatus::PepMatch)
                },
            },
            Rule {
                code: "high-risk-destination",
                description: "Destination is a FATF high-risk jurisdiction",
                weight: 20.0,
                severity: High,
                hard: false,
                trigger: |f, _| {
                    f.is_set(FeatureVector::HIGH_RISK_COUNTRY)
                        && !f.is_set(FeatureVector::SANCTIONED_COUNTRY)
                },
            },
            Rule {
                code: "prior-flagged",
                description: "Customer has prior suspicious activity on record",
                weight: 18.0,
                severity: High,
                hard: false,
                trigger: |f, _| f.is_set(FeatureVector::PREV_FLAGGED),
            },
            Rule {
                code: "structuring-pattern",
                description: "Amount sits just under the reporting threshold",
                weight: 15.0,
                severity: High,
                hard: false,
                trigger: |f, _| f.is_set(FeatureVector::NEAR_REPORTING_THRESHOLD),
            },
            Rule {
                code: "incomplete-kyc",
                description: "Customer identity not fully verified",
                weight: 15.0,
                severity: High,
                hard: false,
                trigger: |f, _| f.is_set(FeatureVector::INCOMPLETE_KYC),
            },
            Rule {
                code: "new-account",
                description: "Large transaction from a recently opened account",
                weight: 15.0,
                severity: High,
                hard: false,
                trigger: |f, _| {
                    f.is_set(FeatureVector::NEW_ACCOUNT)
                        && f.value(FeatureVector::AMOUNT) > 5_000.0
                },
            },
            Rule {
                code: "large-amount",
                description: "Amount exceeds the mandatory reporting threshold",
                weight: 12.0,
                severity: High,
                hard: false,
                trigger: |f, _| f.is_set(FeatureVector::ABOVE_REPORTING_THRESHOLD),
            },
            Rule {
                code: "high-velocity",
                description: "Abnormally high transaction count in the trailing 30 days",
                weight: 10.0,
                severity: Medium,
                hard: false,
                trigger: |f, _| f.is_set(FeatureVector::HIGH_VELOCITY),
            },
            Rule {
                code: "off-hours",
                description: "Transaction executed inside the low-activity night window",
                weight: 8.0,
                severity: Medium,
                hard: false,
                trigger: |f, _| f.is_set(FeatureVector::NIGHT_HOUR),
            },
            Rule {
                code: "round-amount",
                description: "Suspiciously round transaction amount",
                weight: 5.0,
                severity: Low,
                hard: false,
                trigger: |f, _| {
                    f.is_set(FeatureVector::ROUND_AMOUNT)
                        && f.value(FeatureVector::AMOUNT) > 5_000.0
                },
            },
        ];
        Self {
            rules,
            version: RULESET_VERSION,
        }
    }

    /// Evaluate every rule. Pure and total — no trigger means an empty vec.
    pub fn evaluate(
        &self,
        features: &FeatureVector,
        screening: Option<&CustomerScreeningResult>,
    ) -> Vec<RiskFlag> {
        let mut flags: Vec<RiskFlag> = self
            .rules
            .iter()
            .filter(|rule| (rule.trigger)(features, screening))
            .map(|rule| RiskFlag {
                code: rule.code.to_string(),
                description: rule.description.to_string(),
                weight: rule.weight,
                severity: rule.severity,
                hard: rule.hard,
            })
            .collect();
        // Stable sort: equal weights keep registration order.
        flags.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        flags
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::EngineConfig, context::{KycStatus, TransactionContext, TransactionKind}};

    fn features(amount: f64, country: &str) -> FeatureVector {
        let ctx = TransactionContext {
            transaction_id: "t".to_string(),
            customer_id: "c".to_string(),
            customer_name: "n".to_string(),
            amount,
            kind: TransactionKind::Cash,
            country: country.to_string(),
            hour: 12,
            tx_count_30d: 1,
            account_age_months: 60,
            kyc_status: KycStatus::Verified,
            previously_flagged: false,
            is_pep: false,
        };
        FeatureVector::extract(&ctx, &EngineConfig::default())
    }

    #[test]
    fn registry_is_populated() {
        let rules = RuleSet::fatf_default();
        assert!(!rules.is_empty());
        assert_eq!(rules.len(), 13);
    }

    #[test]
    fn structuring_band_is_half_open() {
        let rules = RuleSet::fatf_default();
        let triggers = |amount: f64| {
            rules
                .evaluate(&features(amount, "us"), None)
                .iter()
                .any(|f| f.code == "structuring-pattern")
        };
        assert!(!triggers(9_499.0));
        assert!(triggers(9_500.0));
        assert!(triggers(9_999.0));
        assert!(!triggers(10_000.0));
    }

    #[test]
    fn sanctioned_rule_suppresses_the_high_risk_rule() {
        let rules = RuleSet::fatf_default();
        let codes: Vec<String> = rules
            .evaluate(&features(100.0, "ir"), None)
            .into_iter()
            .map(|f| f.code)
            .collect();
        assert!(codes.contains(&"sanctioned-destination".to_string()));
        assert!(!codes.contains(&"high-risk-destination".to_string()));
    }
}
