//! Watchlist Screener — KYC name matching against sanctions and PEP
//! reference sets.
//!
//! Matching semantics are fixed and documented, never left to chance:
//!   - names are lowercased, punctuation becomes whitespace, and the
//!     result is tokenized;
//!   - two tokens match when they are equal, or when one is a prefix of
//!     the other and the shorter is at least four characters (covers
//!     transliteration stems like "mohammed"/"mohamed");
//!   - score = matched tokens / max(token counts);
//!   - score >= 0.80 is a confirmed match, [0.50, 0.80) is inconclusive,
//!     below 0.50 is clear.
//!
//! `screen` is a pure function of the inputs and the loaded list snapshot.
//! Callers persist results through the store for reuse; screening never
//! touches alert or report state.

use crate::types::CustomerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MATCH_THRESHOLD: f64 = 0.80;
pub const INCONCLUSIVE_THRESHOLD: f64 = 0.50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Clear,
    WatchlistMatch,
    PepMatch,
    Inconclusive,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::WatchlistMatch => "watchlist_match",
            Self::PepMatch => "pep_match",
            Self::Inconclusive => "inconclusive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "clear" => Some(Self::Clear),
            "watchlist_match" => Some(Self::WatchlistMatch),
            "pep_match" => Some(Self::PepMatch),
            "inconclusive" => Some(Self::Inconclusive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerScreeningResult {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub match_status: MatchStatus,
    /// Names of the reference lists that produced the status.
    pub matched_lists: Vec<String>,
    /// Best name-match score across all entries, in [0, 1].
    pub match_score: f64,
    pub list_version: String,
    pub screened_at: DateTime<Utc>,
}

/// One entry in a reference list.
#[derive(Debug, Clone)]
pub struct ListedName {
    pub full_name: String,
    /// Which list this entry belongs to, e.g. "un-consolidated".
    pub list: String,
}

impl ListedName {
    fn new(full_name: &str, list: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            list: list.to_string(),
        }
    }
}

pub struct WatchlistScreener {
    sanctions: Vec<ListedName>,
    peps: Vec<ListedName>,
    list_version: String,
}

impl WatchlistScreener {
    /// The bundled reference sets. Real deployments load the current UN /
    /// OFAC extracts via `with_lists` instead.
    pub fn bundled() -> Self {
        let sanctions = vec![
            ListedName::new("Kim Jong Un", "un-consolidated"),
            ListedName::new("Vladimir Putin", "un-consolidated"),
            ListedName::new("Ali Khamenei", "un-consolidated"),
            ListedName::new("Omar Al-Bashir", "un-consolidated"),
            ListedName::new("Alexander Lukashenko", "ofac-sdn"),
            ListedName::new("Nicolas Maduro", "ofac-sdn"),
            ListedName::new("Bashar Al-Assad", "ofac-sdn"),
            ListedName::new("Muammar Gaddafi", "ofac-sdn"),
        ];
        let peps = vec![
            ListedName::new("Ahmed Nazif", "domestic-pep"),
            ListedName::new("Hassan Rouhani", "domestic-pep"),
            ListedName::new("Viktor Yanukovych", "domestic-pep"),
            ListedName::new("Najib Razak", "domestic-pep"),
            ListedName::new("Isabel Dos Santos", "domestic-pep"),
            ListedName::new("Teodoro Obiang", "domestic-pep"),
        ];
        Self::with_lists(sanctions, peps, "bundled-2024.1")
    }

    pub fn with_lists(
        sanctions: Vec<ListedName>,
        peps: Vec<ListedName>,
        list_version: &str,
    ) -> Self {
        Self {
            sanctions,
            peps,
            list_version: list_version.to_string(),
        }
    }

    pub fn list_version(&self) -> &str {
        &self.list_version
    }

    /// Screen one customer name. Pure; the caller supplies persistence.
    pub fn screen(&self, customer_id: &str, customer_name: &str) -> CustomerScreeningResult {
        self.screen_at(customer_id, customer_name, Utc::now())
    }

    /// `screen` with an explicit timestamp, for reproducible results in
    /// tests and replays.
    pub fn screen_at(
        &self,
        customer_id: &str,
        customer_name: &str,
        screened_at: DateTime<Utc>,
    ) -> CustomerScreeningResult {
        let sanctions_hits = best_matches(&self.sanctions, customer_name);
        let pep_hits = best_matches(&self.peps, customer_name);

        let (match_status, matched_lists, match_score) =
            if sanctions_hits.best >= MATCH_THRESHOLD {
                (
                    MatchStatus::WatchlistMatch,
                    sanctions_hits.lists,
                    sanctions_hits.best,
                )
            } else if pep_hits.best >= MATCH_THRESHOLD {
                (MatchStatus::PepMatch, pep_hits.lists, pep_hits.best)
            } else {
                let best = sanctions_hits.best.max(pep_hits.best);
                if best >= INCONCLUSIVE_THRESHOLD {
                    let lists = if sanctions_hits.best >= pep_hits.best {
                        sanctions_hits.near_lists
                    } else {
                        pep_hits.near_lists
                    };
                    (MatchStatus::Inconclusive, lists, best)
                } else {
                    (MatchStatus::Clear, Vec::new(), best)
                }
            };

        CustomerScreeningResult {
            customer_id: customer_id.to_string(),
            customer_name: customer_name.to_string(),
            match_status,
            matched_lists,
            match_score,
            list_version: self.list_version.clone(),
            screened_at,
        }
    }
}

struct ListMatches {
    best: f64,
    /// Lists with a confirmed-match entry.
    lists: Vec<String>,
    /// Lists with at least an inconclusive entry.
    near_lists: Vec<String>,
}

fn best_matches(entries: &[ListedName], name: &str) -> ListMatches {
    let mut best: f64 = 0.0;
    let mut lists = Vec::new();
    let mut near_lists = Vec::new();
    for entry in entries {
        let score = name_match_score(name, &entry.full_name);
        best = best.max(score);
        if score >= MATCH_THRESHOLD && !lists.contains(&entry.list) {
            lists.push(entry.list.clone());
        }
        if score >= INCONCLUSIVE_THRESHOLD && !near_lists.contains(&entry.list) {
            near_lists.push(entry.list.clone());
        }
    }
    ListMatches {
        best,
        lists,
        near_lists,
    }
}

/// Deterministic token-overlap score in [0, 1].
pub fn name_match_score(a: &str, b: &str) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let mut matched = 0usize;
    for ta in &tokens_a {
        if tokens_b.iter().any(|tb| tokens_match(ta, tb)) {
            matched += 1;
        }
    }
    matched as f64 / tokens_a.len().max(tokens_b.len()) as f64
}

fn tokens_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let min_len = a.len().min(b.len());
    min_len >= 4 && (a.starts_with(b) || b.starts_with(a))
}

fn tokenize(name: &str) -> Vec<String> {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_order_does_not_matter() {
        assert_eq!(name_match_score("Putin Vladimir", "Vladimir Putin"), 1.0);
    }

    #[test]
    fn hyphenated_names_tokenize() {
        assert_eq!(name_match_score("Omar Al-Bashir", "omar al bashir"), 1.0);
    }

    #[test]
    fn short_prefixes_do_not_match() {
        // "al" is a 2-char token; prefix matching needs 4+ characters.
        assert!(name_match_score("Al Smith", "Alexander Jones") < INCONCLUSIVE_THRESHOLD);
    }
}
