//! Store round-trip tests: every persisted record loads back
//! field-for-field identical, and the dashboard aggregates add up.

use amldesk_core::{
    AlertManager, AmlStore, EngineConfig, KycStatus, RiskEngine, RiskLevel, StrReportManager,
    TransactionContext, TransactionKind, WatchlistScreener,
};
use chrono::{TimeZone, Utc};

fn store() -> AmlStore {
    let store = AmlStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

fn wire_context(transaction_id: &str) -> TransactionContext {
    TransactionContext {
        transaction_id: transaction_id.to_string(),
        customer_id: "cus-rt".to_string(),
        customer_name: "Round Tripper".to_string(),
        amount: 250_000.0,
        kind: TransactionKind::Wire,
        country: "pk".to_string(),
        hour: 3,
        tx_count_30d: 20,
        account_age_months: 1,
        kyc_status: KycStatus::Incomplete,
        previously_flagged: true,
        is_pep: true,
    }
}

#[test]
fn transaction_context_round_trips() {
    let store = store();
    let ctx = wire_context("txn-rt-1");
    store.insert_context(&ctx).unwrap();

    let loaded = store.get_context("txn-rt-1").unwrap().unwrap();
    assert_eq!(loaded, ctx);
    assert!(store.get_context("txn-missing").unwrap().is_none());
}

#[test]
fn analysis_result_round_trips() {
    let store = store();
    let engine = RiskEngine::new(EngineConfig::default()).unwrap();
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let result = engine.analyze_at(&wire_context("txn-rt-2"), None, at).unwrap();

    store.insert_analysis(&result).unwrap();
    let loaded = store.get_analysis("txn-rt-2").unwrap().unwrap();
    assert_eq!(loaded, result);
}

#[test]
fn degraded_analysis_round_trips_with_absent_signals() {
    use amldesk_core::model::ModelSnapshot;

    let store = store();
    let engine =
        RiskEngine::with_models(EngineConfig::default(), ModelSnapshot::rule_only()).unwrap();
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let result = engine.analyze_at(&wire_context("txn-rt-3"), None, at).unwrap();
    assert!(result.classifier_probability.is_none());

    store.insert_analysis(&result).unwrap();
    let loaded = store.get_analysis("txn-rt-3").unwrap().unwrap();
    assert_eq!(loaded, result);
    assert!(loaded.classifier_probability.is_none());
    assert!(loaded.anomaly_score.is_none());
}

#[test]
fn alert_round_trips_through_resolution() {
    let store = store();
    let engine = RiskEngine::new(EngineConfig::default()).unwrap();
    let ctx = wire_context("txn-rt-4");
    let result = engine.analyze(&ctx, None).unwrap();
    store.insert_context(&ctx).unwrap();
    store.insert_analysis(&result).unwrap();

    let manager = AlertManager::new(&store);
    let alert = manager.open_for(&result).unwrap().unwrap();
    assert_eq!(store.get_alert(&alert.alert_id).unwrap().unwrap(), alert);

    manager.begin_review(&alert.alert_id).unwrap();
    let resolved = manager
        .resolve(&alert.alert_id, "documented source of funds")
        .unwrap();
    let loaded = store.get_alert(&alert.alert_id).unwrap().unwrap();
    assert_eq!(loaded, resolved);
    assert_eq!(
        loaded.resolution_note.as_deref(),
        Some("documented source of funds"),
    );
}

#[test]
fn str_report_round_trips_through_submission() {
    let store = store();
    let engine = RiskEngine::new(EngineConfig::default()).unwrap();
    let ctx = wire_context("txn-rt-5");
    let result = engine.analyze(&ctx, None).unwrap();
    store.insert_context(&ctx).unwrap();
    store.insert_analysis(&result).unwrap();
    let alert = AlertManager::new(&store).open_for(&result).unwrap().unwrap();

    let reports = StrReportManager::new(&store);
    let draft = reports.draft(&[alert.alert_id]).unwrap();
    assert_eq!(store.get_report(&draft.report_id).unwrap().unwrap(), draft);

    let submitted = reports.submit(&draft.report_id).unwrap();
    let loaded = store.get_report(&draft.report_id).unwrap().unwrap();
    assert_eq!(loaded, submitted);
    assert_eq!(loaded.alert_ids, draft.alert_ids);
}

#[test]
fn list_analyses_filters_by_level() {
    let store = store();
    let engine = RiskEngine::new(EngineConfig::default()).unwrap();

    let hot = wire_context("txn-rt-6");
    let cold = TransactionContext {
        transaction_id: "txn-rt-7".to_string(),
        customer_id: "cus-quiet".to_string(),
        customer_name: "Quiet Customer".to_string(),
        amount: 50.0,
        kind: TransactionKind::Internal,
        country: "domestic".to_string(),
        hour: 14,
        tx_count_30d: 2,
        account_age_months: 60,
        kyc_status: KycStatus::Verified,
        previously_flagged: false,
        is_pep: false,
    };
    for ctx in [&hot, &cold] {
        let result = engine.analyze(ctx, None).unwrap();
        store.insert_context(ctx).unwrap();
        store.insert_analysis(&result).unwrap();
    }

    let critical = store.list_analyses(Some(RiskLevel::Critical), 10).unwrap();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].transaction_id, "txn-rt-6");
    assert_eq!(store.list_analyses(None, 10).unwrap().len(), 2);
}

#[test]
fn dashboard_stats_add_up() {
    let store = store();
    let engine = RiskEngine::new(EngineConfig::default()).unwrap();
    let screener = WatchlistScreener::bundled();
    let alerts = AlertManager::new(&store);

    let hot = wire_context("txn-rt-8");
    let cold = TransactionContext {
        transaction_id: "txn-rt-9".to_string(),
        customer_id: "cus-quiet".to_string(),
        customer_name: "Quiet Customer".to_string(),
        amount: 50.0,
        kind: TransactionKind::Internal,
        country: "domestic".to_string(),
        hour: 14,
        tx_count_30d: 2,
        account_age_months: 60,
        kyc_status: KycStatus::Verified,
        previously_flagged: false,
        is_pep: false,
    };
    for ctx in [&hot, &cold] {
        let screening = screener.screen(&ctx.customer_id, &ctx.customer_name);
        let result = engine.analyze(ctx, Some(&screening)).unwrap();
        store.insert_context(ctx).unwrap();
        store.insert_analysis(&result).unwrap();
        store.insert_screening_result(&screening).unwrap();
        alerts.open_for(&result).unwrap();
    }
    let report = StrReportManager::new(&store);
    let alert = store.alert_for_transaction("txn-rt-8").unwrap().unwrap();
    report.draft(&[alert.alert_id]).unwrap();

    let stats = store.dashboard_stats().unwrap();
    assert_eq!(stats.high_risk, 1);
    assert_eq!(stats.medium_risk, 0);
    assert_eq!(stats.cleared, 1);
    assert_eq!(stats.total, 2);
    assert!((stats.flagged_amount - 250_000.0).abs() < 1e-9);
    assert_eq!(stats.open_alerts, 1);
    assert_eq!(stats.str_reports, 1);

    use amldesk_core::AlertStatus;
    assert_eq!(store.count_alerts(AlertStatus::Open).unwrap(), 1);
    assert_eq!(store.count_alerts(AlertStatus::Resolved).unwrap(), 0);
    assert_eq!(store.count_reports().unwrap(), 1);
    assert_eq!(store.list_reports(10).unwrap().len(), 1);
    assert_eq!(store.list_screenings(10).unwrap().len(), 2);
}

#[test]
fn file_backed_store_survives_reopen() {
    let path = std::env::temp_dir().join(format!(
        "amldesk-test-{}-{}.db",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default(),
    ));
    let path = path.to_string_lossy().into_owned();

    let store = AmlStore::open(&path).unwrap();
    store.migrate().unwrap();
    let ctx = wire_context("txn-rt-10");
    store.insert_context(&ctx).unwrap();
    drop(store);

    let reopened = AmlStore::open(&path).unwrap();
    assert_eq!(reopened.get_context("txn-rt-10").unwrap().unwrap(), ctx);

    // A reopen handle points at the same database.
    let second = reopened.reopen().unwrap();
    assert!(second.get_context("txn-rt-10").unwrap().is_some());

    drop(second);
    drop(reopened);
    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(format!("{path}-wal"));
    let _ = std::fs::remove_file(format!("{path}-shm"));
}
