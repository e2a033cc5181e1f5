//! aml-runner: headless driver for the AML desk.
//!
//! Usage:
//!   aml-runner --db desk.db --demo
//!   aml-runner --db desk.db --analyze batch.json
//!   aml-runner --db desk.db --synthetic 500 --seed 12345
//!   aml-runner --config config.json --demo

use amldesk_core::{
    AlertManager, AmlStore, CustomerScreeningResult, EngineConfig, KycStatus, RiskEngine,
    TransactionContext, TransactionKind, WatchlistScreener,
};
use anyhow::{bail, Context, Result};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = arg_value(&args, "--db").unwrap_or_else(|| ":memory:".to_string());
    let config = match arg_value(&args, "--config") {
        Some(path) => EngineConfig::from_json_file(Path::new(&path))
            .with_context(|| format!("loading config {path}"))?,
        None => EngineConfig::default(),
    };
    let seed: u64 = arg_value(&args, "--seed")
        .map(|s| s.parse())
        .transpose()
        .context("--seed must be an integer")?
        .unwrap_or(42);

    let store = AmlStore::open(&db)?;
    store.migrate()?;
    let engine = RiskEngine::new(config)?;
    if let Err(e) = engine.ensure_models() {
        log::warn!("{e}; analyses will carry the model-degraded flag");
    }
    let screener = WatchlistScreener::bundled();

    println!("aml-runner");
    println!("  db:     {db}");
    println!("  models: {}", engine.current_models().version_string());
    println!("  lists:  {}", screener.list_version());
    println!("  run at: {}", chrono::Utc::now().to_rfc3339());
    println!();

    if args.iter().any(|a| a == "--demo") {
        run_batch(&engine, &screener, &store, demo_transactions())?;
    } else if let Some(path) = arg_value(&args, "--analyze") {
        let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
        let batch: Vec<TransactionContext> = serde_json::from_str(&raw)?;
        run_batch(&engine, &screener, &store, batch)?;
    } else if let Some(n) = arg_value(&args, "--synthetic") {
        let count: usize = n.parse().context("--synthetic must be an integer")?;
        run_batch(&engine, &screener, &store, synthetic_transactions(count, seed))?;
    } else {
        bail!("nothing to do: pass --demo, --analyze <file>, or --synthetic <n>");
    }

    print_dashboard(&store)?;
    Ok(())
}

fn arg_value(args: &[String], name: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].clone())
}

/// Screen, analyze, persist, and open alerts for each record —
/// one independent engine invocation per transaction.
fn run_batch(
    engine: &RiskEngine,
    screener: &WatchlistScreener,
    store: &AmlStore,
    batch: Vec<TransactionContext>,
) -> Result<()> {
    let alerts = AlertManager::new(store).with_minimum_level(engine.config().alert_minimum);

    for ctx in batch {
        let screening: CustomerScreeningResult =
            screener.screen(&ctx.customer_id, &ctx.customer_name);
        store.insert_screening_result(&screening)?;

        let result = engine.analyze(&ctx, Some(&screening))?;
        store.insert_context(&ctx)?;
        store.insert_analysis(&result)?;

        let alert = alerts.open_for(&result)?;
        println!(
            "  {:<12} {:>10.2}  score {:>3}  {:<8}  {}{}",
            result.transaction_id,
            ctx.amount,
            result.score,
            result.level.as_str(),
            result.action.as_str(),
            alert
                .map(|a| format!("  [alert {}]", a.alert_id))
                .unwrap_or_default(),
        );
    }
    println!();
    Ok(())
}

fn print_dashboard(store: &AmlStore) -> Result<()> {
    let stats = store.dashboard_stats()?;
    println!("dashboard");
    println!("  analyzed:       {}", stats.total);
    println!("  high/critical:  {}", stats.high_risk);
    println!("  medium:         {}", stats.medium_risk);
    println!("  cleared (low):  {}", stats.cleared);
    println!("  flagged amount: {:.2}", stats.flagged_amount);
    println!("  open alerts:    {}", stats.open_alerts);
    println!("  str reports:    {}", stats.str_reports);
    Ok(())
}

/// The demo book: a spread of obviously-bad, borderline, and routine
/// transactions for exercising the full pipeline.
fn demo_transactions() -> Vec<TransactionContext> {
    let tx = |id: &str,
              customer: &str,
              name: &str,
              amount: f64,
              kind: TransactionKind,
              country: &str,
              hour: u8,
              tx_count: u32,
              age: u32,
              kyc: KycStatus,
              flagged: bool,
              pep: bool| TransactionContext {
        transaction_id: id.to_string(),
        customer_id: customer.to_string(),
        customer_name: name.to_string(),
        amount,
        kind,
        country: country.to_string(),
        hour,
        tx_count_30d: tx_count,
        account_age_months: age,
        kyc_status: kyc,
        previously_flagged: flagged,
        is_pep: pep,
    };

    use KycStatus::*;
    use TransactionKind::*;
    vec![
        tx("txn-8821", "cus-001", "Mohammed Al-Rashid", 125_000.0, Wire, "ir", 3, 8, 2, Incomplete, true, false),
        tx("txn-8819", "cus-002", "Sara Ahmed Corp", 8_400.0, Cash, "eg", 14, 3, 6, Incomplete, false, false),
        tx("txn-8814", "cus-003", "Gulf Traders LLC", 45_000.0, Crypto, "ru", 22, 22, 4, Verified, false, false),
        tx("txn-8810", "cus-004", "Nour Investment", 2_200.0, Insurance, "ae", 11, 5, 18, Verified, false, false),
        tx("txn-8805", "cus-005", "Cairo Export Co", 890.0, Wire, "uk", 9, 2, 24, Verified, false, false),
        tx("txn-8803", "cus-006", "Ahmed Hassan", 3_100.0, Internal, "eg", 10, 1, 36, Verified, false, false),
        tx("txn-8799", "cus-007", "Al-Noor Holdings", 67_000.0, Wire, "sa", 7, 12, 8, EnhancedDueDiligence, true, true),
        tx("txn-8795", "cus-008", "Phoenix Trading", 9_800.0, Cash, "eg", 16, 7, 12, Incomplete, false, false),
    ]
}

/// Deterministic synthetic traffic: same seed, same batch.
fn synthetic_transactions(count: usize, seed: u64) -> Vec<TransactionContext> {
    const FIRST_NAMES: &[&str] = &[
        "John", "Maria", "Chen", "Ahmed", "Sofia", "Nikolai", "Elena", "Jean", "Carlos", "Yuki",
        "Fatima", "David", "Li", "Anna", "Omar",
    ];
    const LAST_NAMES: &[&str] = &[
        "Smith", "Garcia", "Wang", "Al-Mansoori", "Martinez", "Petrov", "Dubois", "Santos",
        "Volkov", "Kim", "Johnson", "Oliveira", "Hassan", "Novak",
    ];
    const COUNTRIES: &[&str] = &[
        "us", "uk", "de", "fr", "eg", "ae", "sa", "sg", "jp", "pk", "ru", "ir", "af",
    ];
    const KINDS: &[TransactionKind] = &[
        TransactionKind::Wire,
        TransactionKind::Cash,
        TransactionKind::Crypto,
        TransactionKind::Insurance,
        TransactionKind::Internal,
    ];
    const KYC: &[KycStatus] = &[
        KycStatus::Incomplete,
        KycStatus::Verified,
        KycStatus::Verified,
        KycStatus::Verified,
        KycStatus::EnhancedDueDiligence,
    ];

    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let mut pick = |n: usize| -> usize {
        use rand::RngCore;
        (rng.next_u64() % n as u64) as usize
    };

    (0..count)
        .map(|i| {
            let first = FIRST_NAMES[pick(FIRST_NAMES.len())];
            let last = LAST_NAMES[pick(LAST_NAMES.len())];
            // Skewed amounts: mostly small, a tail of large transfers.
            let base = (pick(10_000) as f64) + 10.0;
            let amount = match pick(10) {
                0 => base * 25.0,
                1..=2 => base * 5.0,
                _ => base,
            };
            TransactionContext {
                transaction_id: format!("syn-{seed}-{i:06}"),
                customer_id: format!("cus-{:05}", pick(2_000)),
                customer_name: format!("{first} {last}"),
                amount: (amount * 100.0).round() / 100.0,
                kind: KINDS[pick(KINDS.len())],
                country: COUNTRIES[pick(COUNTRIES.len())].to_string(),
                hour: pick(24) as u8,
                tx_count_30d: pick(30) as u32,
                account_age_months: pick(120) as u32,
                kyc_status: KYC[pick(KYC.len())],
                previously_flagged: pick(20) == 0,
                is_pep: pick(50) == 0,
            }
        })
        .collect()
}
