//! The immutable per-transaction input record.
//!
//! A `TransactionContext` is everything the engine knows about one
//! transaction and its customer at analysis time. It is validated once,
//! before any rule or model runs, and never mutated afterwards.

use crate::{
    error::{AmlError, AmlResult},
    types::{CustomerId, TransactionId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Wire,
    Cash,
    Crypto,
    Insurance,
    Internal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wire => "wire",
            Self::Cash => "cash",
            Self::Crypto => "crypto",
            Self::Insurance => "insurance",
            Self::Internal => "internal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wire" => Some(Self::Wire),
            "cash" => Some(Self::Cash),
            "crypto" => Some(Self::Crypto),
            "insurance" => Some(Self::Insurance),
            "internal" => Some(Self::Internal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    Incomplete,
    Verified,
    EnhancedDueDiligence,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incomplete => "incomplete",
            Self::Verified => "verified",
            Self::EnhancedDueDiligence => "enhanced_due_diligence",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "incomplete" => Some(Self::Incomplete),
            "verified" => Some(Self::Verified),
            "enhanced_due_diligence" => Some(Self::EnhancedDueDiligence),
            _ => None,
        }
    }

    /// Numeric encoding used in the feature vector: 0, 1, 2.
    pub fn ordinal(&self) -> f64 {
        match self {
            Self::Incomplete => 0.0,
            Self::Verified => 1.0,
            Self::EnhancedDueDiligence => 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionContext {
    pub transaction_id: TransactionId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    /// Monetary amount in currency-agnostic units; never negative.
    pub amount: f64,
    pub kind: TransactionKind,
    /// Destination jurisdiction code, lowercased (ISO alpha-2 in practice).
    pub country: String,
    /// Hour of day, 0-23.
    pub hour: u8,
    /// Number of transactions by this customer in the trailing 30 days.
    pub tx_count_30d: u32,
    pub account_age_months: u32,
    pub kyc_status: KycStatus,
    pub previously_flagged: bool,
    pub is_pep: bool,
}

impl TransactionContext {
    /// Reject malformed input before it reaches any rule or model.
    pub fn validate(&self) -> AmlResult<()> {
        if self.transaction_id.is_empty() {
            return Err(AmlError::Validation("transaction_id is empty".to_string()));
        }
        if self.customer_id.is_empty() {
            return Err(AmlError::Validation("customer_id is empty".to_string()));
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(AmlError::Validation(format!(
                "amount must be finite and non-negative, got {}",
                self.amount
            )));
        }
        if self.hour > 23 {
            return Err(AmlError::Validation(format!(
                "hour must be 0-23, got {}",
                self.hour
            )));
        }
        if self.country.is_empty() {
            return Err(AmlError::Validation("country is empty".to_string()));
        }
        Ok(())
    }
}
