//! STR report lifecycle tests: drafting, narrative generation,
//! submission, and the SUBMITTED immutability rule.

use amldesk_core::{
    AlertManager, AlertStatus, AmlError, AmlStore, EngineConfig, KycStatus, RiskEngine,
    StrReportManager, TransactionContext, TransactionKind,
};
use amldesk_core::alerts::Alert;
use amldesk_core::reports::ReportStatus;

fn store() -> AmlStore {
    let store = AmlStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

/// Analyze and persist a high-risk wire, then open its alert.
fn open_alert(store: &AmlStore, transaction_id: &str) -> Alert {
    let engine = RiskEngine::new(EngineConfig::default()).unwrap();
    let ctx = TransactionContext {
        transaction_id: transaction_id.to_string(),
        customer_id: "cus-str".to_string(),
        customer_name: "Filing Subject".to_string(),
        amount: 250_000.0,
        kind: TransactionKind::Wire,
        country: "pk".to_string(),
        hour: 3,
        tx_count_30d: 20,
        account_age_months: 1,
        kyc_status: KycStatus::Incomplete,
        previously_flagged: false,
        is_pep: false,
    };
    let result = engine.analyze(&ctx, None).unwrap();
    store.insert_context(&ctx).unwrap();
    store.insert_analysis(&result).unwrap();
    AlertManager::new(store).open_for(&result).unwrap().unwrap()
}

#[test]
fn draft_requires_at_least_one_alert() {
    let store = store();
    let manager = StrReportManager::new(&store);
    assert!(matches!(manager.draft(&[]), Err(AmlError::Validation(_))));
}

#[test]
fn draft_narrative_cites_each_contributing_alert() {
    let store = store();
    let alert = open_alert(&store, "txn-str-1");
    let manager = StrReportManager::new(&store);

    let report = manager.draft(&[alert.alert_id.clone()]).unwrap();
    assert_eq!(report.status, ReportStatus::Draft);
    assert_eq!(report.alert_ids, vec![alert.alert_id.clone()]);
    assert!(report.submitted_at.is_none());

    assert!(report.narrative.contains(&alert.alert_id));
    assert!(report.narrative.contains("txn-str-1"));
    assert!(report.narrative.contains("high-risk-destination"));
    assert!(report.narrative.contains("critical"));
}

#[test]
fn duplicate_alert_ids_are_collapsed_in_draft_order() {
    let store = store();
    let first = open_alert(&store, "txn-str-2");
    let second = open_alert(&store, "txn-str-3");
    let manager = StrReportManager::new(&store);

    let report = manager
        .draft(&[
            first.alert_id.clone(),
            second.alert_id.clone(),
            first.alert_id.clone(),
        ])
        .unwrap();
    assert_eq!(report.alert_ids, vec![first.alert_id, second.alert_id]);
}

#[test]
fn unknown_alert_fails_the_draft() {
    let store = store();
    let manager = StrReportManager::new(&store);
    assert!(matches!(
        manager.draft(&["alert-missing".to_string()]),
        Err(AmlError::NotFound { entity: "alert", .. })
    ));
}

#[test]
fn narrative_amendable_only_while_draft() {
    let store = store();
    let alert = open_alert(&store, "txn-str-4");
    let manager = StrReportManager::new(&store);
    let report = manager.draft(&[alert.alert_id]).unwrap();

    let amended = manager
        .amend_narrative(&report.report_id, "analyst-reviewed narrative")
        .unwrap();
    assert_eq!(amended.narrative, "analyst-reviewed narrative");
    assert_eq!(amended.status, ReportStatus::Draft);

    manager.submit(&report.report_id).unwrap();
    assert!(matches!(
        manager.amend_narrative(&report.report_id, "too late"),
        Err(AmlError::ImmutableState { .. })
    ));
    // The rejected amendment changed nothing.
    let fresh = manager.get(&report.report_id).unwrap();
    assert_eq!(fresh.narrative, "analyst-reviewed narrative");
}

#[test]
fn submit_is_terminal() {
    let store = store();
    let alert = open_alert(&store, "txn-str-5");
    let manager = StrReportManager::new(&store);
    let report = manager.draft(&[alert.alert_id]).unwrap();

    let submitted = manager.submit(&report.report_id).unwrap();
    assert_eq!(submitted.status, ReportStatus::Submitted);
    assert!(submitted.submitted_at.is_some());

    assert!(matches!(
        manager.submit(&report.report_id),
        Err(AmlError::ImmutableState { .. })
    ));
}

#[test]
fn submit_escalates_contributing_alerts() {
    let store = store();
    let open = open_alert(&store, "txn-str-6");
    let reviewing = open_alert(&store, "txn-str-7");
    let resolved = open_alert(&store, "txn-str-8");

    let alerts = AlertManager::new(&store);
    alerts.begin_review(&reviewing.alert_id).unwrap();
    alerts.begin_review(&resolved.alert_id).unwrap();
    alerts
        .resolve(&resolved.alert_id, "counterparty documentation obtained")
        .unwrap();

    let manager = StrReportManager::new(&store);
    let report = manager
        .draft(&[
            open.alert_id.clone(),
            reviewing.alert_id.clone(),
            resolved.alert_id.clone(),
        ])
        .unwrap();
    manager.submit(&report.report_id).unwrap();

    // OPEN passes through review, UNDER_REVIEW escalates directly, and
    // terminal alerts keep their state.
    let open = store.get_alert(&open.alert_id).unwrap().unwrap();
    let reviewing = store.get_alert(&reviewing.alert_id).unwrap().unwrap();
    let resolved = store.get_alert(&resolved.alert_id).unwrap().unwrap();
    assert_eq!(open.status, AlertStatus::Escalated);
    assert_eq!(reviewing.status, AlertStatus::Escalated);
    assert_eq!(resolved.status, AlertStatus::Resolved);
}
