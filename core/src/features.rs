//! Fixed-order numeric projection of a transaction context.
//!
//! The feature vector is the only contract the models see: a `[f64]` slice
//! with a documented, never-reordered layout. Raw values come first, then
//! derived booleans (0.0 / 1.0), then a one-hot of the transaction kind.
//! Append-only — reordering existing slots invalidates fitted models.

use crate::{config::EngineConfig, context::{TransactionContext, TransactionKind}};

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; Self::LEN],
}

impl FeatureVector {
    pub const AMOUNT: usize = 0;
    pub const HOUR: usize = 1;
    pub const TX_COUNT_30D: usize = 2;
    pub const ACCOUNT_AGE_MONTHS: usize = 3;
    pub const KYC_STATUS: usize = 4;
    pub const PREV_FLAGGED: usize = 5;
    pub const IS_PEP: usize = 6;
    pub const SANCTIONED_COUNTRY: usize = 7;
    pub const HIGH_RISK_COUNTRY: usize = 8;
    pub const NIGHT_HOUR: usize = 9;
    pub const ABOVE_REPORTING_THRESHOLD: usize = 10;
    pub const NEAR_REPORTING_THRESHOLD: usize = 11;
    pub const NEW_ACCOUNT: usize = 12;
    pub const HIGH_VELOCITY: usize = 13;
    pub const ROUND_AMOUNT: usize = 14;
    pub const INCOMPLETE_KYC: usize = 15;
    pub const KIND_WIRE: usize = 16;
    pub const KIND_CASH: usize = 17;
    pub const KIND_CRYPTO: usize = 18;
    pub const KIND_INSURANCE: usize = 19;
    pub const KIND_INTERNAL: usize = 20;

    pub const LEN: usize = 21;

    /// Project a validated context into feature space using the configured
    /// thresholds and country lists.
    pub fn extract(ctx: &TransactionContext, config: &EngineConfig) -> Self {
        let country = ctx.country.to_lowercase();
        let sanctioned = config.is_sanctioned(&country);
        let high_risk = config.is_high_risk(&country);

        let mut values = [0.0; Self::LEN];
        values[Self::AMOUNT] = ctx.amount;
        values[Self::HOUR] = f64::from(ctx.hour);
        values[Self::TX_COUNT_30D] = f64::from(ctx.tx_count_30d);
        values[Self::ACCOUNT_AGE_MONTHS] = f64::from(ctx.account_age_months);
        values[Self::KYC_STATUS] = ctx.kyc_status.ordinal();
        values[Self::PREV_FLAGGED] = bit(ctx.previously_flagged);
        values[Self::IS_PEP] = bit(ctx.is_pep);
        values[Self::SANCTIONED_COUNTRY] = bit(sanctioned);
        values[Self::HIGH_RISK_COUNTRY] = bit(high_risk);
        values[Self::NIGHT_HOUR] = bit(ctx.hour < config.night_end_hour);
        values[Self::ABOVE_REPORTING_THRESHOLD] = bit(ctx.amount >= config.reporting_threshold);
        values[Self::NEAR_REPORTING_THRESHOLD] = bit(
            ctx.amount >= config.structuring_limit && ctx.amount < config.reporting_threshold,
        );
        values[Self::NEW_ACCOUNT] = bit(ctx.account_age_months < config.new_account_months);
        values[Self::HIGH_VELOCITY] = bit(ctx.tx_count_30d > config.velocity_count_30d);
        values[Self::ROUND_AMOUNT] =
            bit(ctx.amount > 1_000.0 && ctx.amount.rem_euclid(1_000.0) == 0.0);
        values[Self::INCOMPLETE_KYC] = bit(ctx.kyc_status == crate::context::KycStatus::Incomplete);

        let kind_slot = match ctx.kind {
            TransactionKind::Wire => Self::KIND_WIRE,
            TransactionKind::Cash => Self::KIND_CASH,
            TransactionKind::Crypto => Self::KIND_CRYPTO,
            TransactionKind::Insurance => Self::KIND_INSURANCE,
            TransactionKind::Internal => Self::KIND_INTERNAL,
        };
        values[kind_slot] = 1.0;

        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Read a boolean slot.
    pub fn is_set(&self, slot: usize) -> bool {
        self.values[slot] > 0.5
    }

    /// Read a raw numeric slot.
    pub fn value(&self, slot: usize) -> f64 {
        self.values[slot]
    }

    /// True when every slot holds a finite value. Models are only invoked
    /// on vectors that pass this check.
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

fn bit(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Slot-test helper for model code that works on raw slices.
pub fn slot_set(features: &[f64], slot: usize) -> bool {
    features.get(slot).is_some_and(|v| *v > 0.5)
}

/// Raw-value helper for model code that works on raw slices.
pub fn slot_value(features: &[f64], slot: usize) -> f64 {
    features.get(slot).copied().unwrap_or(0.0)
}
