//! Watchlist-screening tests: match classification, determinism, the
//! screening-to-scoring handoff, and store round-trips.

use amldesk_core::{
    AmlStore, EngineConfig, KycStatus, MatchStatus, RiskEngine, RiskLevel, TransactionContext,
    TransactionKind, WatchlistScreener,
};
use chrono::{TimeZone, Utc};

#[test]
fn exact_sanctions_name_is_a_watchlist_match() {
    let screener = WatchlistScreener::bundled();
    let result = screener.screen("cus-1", "Vladimir Putin");

    assert_eq!(result.match_status, MatchStatus::WatchlistMatch);
    assert_eq!(result.matched_lists, vec!["un-consolidated".to_string()]);
    assert!((result.match_score - 1.0).abs() < f64::EPSILON);
    assert_eq!(result.list_version, "bundled-2024.1");
}

#[test]
fn pep_name_is_a_pep_match_not_a_watchlist_match() {
    let screener = WatchlistScreener::bundled();
    let result = screener.screen("cus-2", "Najib Razak");

    assert_eq!(result.match_status, MatchStatus::PepMatch);
    assert_eq!(result.matched_lists, vec!["domestic-pep".to_string()]);
}

#[test]
fn partial_overlap_is_inconclusive() {
    let screener = WatchlistScreener::bundled();
    // Two of the three tokens of "Kim Jong Un" match: 2/3.
    let result = screener.screen("cus-3", "Kim Jong");

    assert_eq!(result.match_status, MatchStatus::Inconclusive);
    assert_eq!(result.matched_lists, vec!["un-consolidated".to_string()]);
    assert!(result.match_score >= 0.50 && result.match_score < 0.80);
}

#[test]
fn unlisted_name_is_clear() {
    let screener = WatchlistScreener::bundled();
    let result = screener.screen("cus-4", "Jane Ordinary Doe");

    assert_eq!(result.match_status, MatchStatus::Clear);
    assert!(result.matched_lists.is_empty());
    assert!(result.match_score < 0.50);
}

#[test]
fn casing_and_punctuation_do_not_change_the_outcome() {
    let screener = WatchlistScreener::bundled();
    let plain = screener.screen("cus-5", "Omar Al-Bashir");
    let noisy = screener.screen("cus-5", "  omar   AL  bashir ");

    assert_eq!(plain.match_status, MatchStatus::WatchlistMatch);
    assert_eq!(noisy.match_status, plain.match_status);
    assert_eq!(noisy.match_score, plain.match_score);
}

#[test]
fn screening_is_deterministic() {
    let screener = WatchlistScreener::bundled();
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    let first = screener.screen_at("cus-6", "Kim Jong", at);
    let second = screener.screen_at("cus-6", "Kim Jong", at);
    assert_eq!(first, second);
}

#[test]
fn confirmed_watchlist_match_hard_flags_the_analysis() {
    // A benign-looking transaction turns CRITICAL once the customer
    // screens as a confirmed sanctions match.
    let ctx = TransactionContext {
        transaction_id: "txn-wl-1".to_string(),
        customer_id: "cus-wl-1".to_string(),
        customer_name: "Alexander Lukashenko".to_string(),
        amount: 200.0,
        kind: TransactionKind::Internal,
        country: "domestic".to_string(),
        hour: 11,
        tx_count_30d: 3,
        account_age_months: 48,
        kyc_status: KycStatus::Verified,
        previously_flagged: false,
        is_pep: false,
    };
    let screener = WatchlistScreener::bundled();
    let screening = screener.screen(&ctx.customer_id, &ctx.customer_name);
    assert_eq!(screening.match_status, MatchStatus::WatchlistMatch);

    let engine = RiskEngine::new(EngineConfig::default()).unwrap();

    let unscreened = engine.analyze(&ctx, None).unwrap();
    assert_eq!(unscreened.level, RiskLevel::Low);

    let screened = engine.analyze(&ctx, Some(&screening)).unwrap();
    assert!(screened.flags.iter().any(|f| f.code == "watchlist-match" && f.hard));
    assert_eq!(screened.level, RiskLevel::Critical);
    assert!(screened.str_required);
}

#[test]
fn pep_match_raises_the_pep_exposure_flag() {
    let ctx = TransactionContext {
        transaction_id: "txn-pep-1".to_string(),
        customer_id: "cus-pep-1".to_string(),
        customer_name: "Hassan Rouhani".to_string(),
        amount: 200.0,
        kind: TransactionKind::Internal,
        country: "domestic".to_string(),
        hour: 11,
        tx_count_30d: 3,
        account_age_months: 48,
        kyc_status: KycStatus::Verified,
        previously_flagged: false,
        is_pep: false,
    };
    let screening = WatchlistScreener::bundled().screen(&ctx.customer_id, &ctx.customer_name);
    assert_eq!(screening.match_status, MatchStatus::PepMatch);

    let engine = RiskEngine::new(EngineConfig::default()).unwrap();
    let result = engine.analyze(&ctx, Some(&screening)).unwrap();
    let pep = result
        .flags
        .iter()
        .find(|f| f.code == "pep-exposure")
        .expect("pep flag");
    assert!(!pep.hard);
}

#[test]
fn screening_results_round_trip_through_the_store() {
    let store = AmlStore::in_memory().unwrap();
    store.migrate().unwrap();

    let screener = WatchlistScreener::bundled();
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let result = screener.screen_at("cus-rt-1", "Kim Jong", at);
    store.insert_screening_result(&result).unwrap();

    let loaded = store
        .latest_screening_for_customer("cus-rt-1")
        .unwrap()
        .unwrap();
    assert_eq!(loaded, result);
}

#[test]
fn latest_screening_wins_for_a_customer() {
    let store = AmlStore::in_memory().unwrap();
    store.migrate().unwrap();

    let screener = WatchlistScreener::bundled();
    let earlier = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    store
        .insert_screening_result(&screener.screen_at("cus-rt-2", "Jane Ordinary Doe", earlier))
        .unwrap();
    let rescreen = screener.screen_at("cus-rt-2", "Kim Jong Un", later);
    store.insert_screening_result(&rescreen).unwrap();

    let loaded = store
        .latest_screening_for_customer("cus-rt-2")
        .unwrap()
        .unwrap();
    assert_eq!(loaded.screened_at, later);
    assert_eq!(loaded.match_status, MatchStatus::WatchlistMatch);
}
