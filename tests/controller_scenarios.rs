
use ethers::types::U256;
use presale_sniper::execution::builder::TransactionBuilder;
use presale_sniper::execution::controller::{AbortReason, ExecutionController, Outcome};
use presale_sniper::infrastructure::config::Config;
use presale_sniper::infrastructure::shutdown::ShutdownSignal;
use presale_sniper::monitor::domain::Monitor;
use presale_sniper::notify::dispatcher::NotificationDispatcher;
use presale_sniper::notify::domain::NotificationEvent;
use presale_sniper::shared::types::PresaleState;
use presale_sniper::SniperError;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use test_helpers::*;

/// Run a controller to completion against scripted collaborators and return
/// the outcome plus every notification that was delivered.
async fn run_controller(
    config: Config,
    chain: Arc<ScriptedChain>,
    monitor: Box<dyn Monitor>,
    shutdown: ShutdownSignal,
) -> (Outcome, Vec<NotificationEvent>) {
    let config = Arc::new(config);
    let sink = Arc::new(CollectingSink::new());
    let dispatcher = NotificationDispatcher::start(sink.clone(), 64);
    let builder = TransactionBuilder::new(&config, chain.clone()).unwrap();

    let mut controller = ExecutionController::new(
        config,
        chain,
        monitor,
        builder,
        dispatcher.handle(),
        shutdown,
        Arc::new(InstantClock),
    );

    let outcome = controller.run().await;
    dispatcher.close().await;
    (outcome, sink.events())
}

fn count(events: &[NotificationEvent], kind: &str) -> usize {
    events.iter().filter(|e| e.kind() == kind).count()
}

fn buy_attempts(events: &[NotificationEvent]) -> Vec<(u64, U256)> {
    events
        .iter()
        .filter_map(|e| match e {
            NotificationEvent::BuyAttempt {
                nonce,
                max_fee_per_gas,
                ..
            } => Some((*nonce, *max_fee_per_gas)),
            _ => None,
        })
        .collect()
}

fn tokens_received(events: &[NotificationEvent]) -> Option<U256> {
    events.iter().find_map(|e| match e {
        NotificationEvent::BuySuccess { tokens_received, .. } => Some(*tokens_received),
        _ => None,
    })
}

fn underpriced() -> SniperError {
    SniperError::transient_rpc(
        "eth_sendRawTransaction",
        "replacement transaction underpriced",
    )
}

#[tokio::test]
async fn underpriced_rejections_escalate_until_accepted() {
    let mut config = test_config();
    config.execution.max_retries = 3;

    let chain = Arc::new(ScriptedChain::new());
    chain.script_send(Err(underpriced()));
    chain.script_send(Err(underpriced()));

    let monitor = ScriptedMonitor::new(vec![Ok(PresaleState::Open(open_snapshot()))]);
    let (outcome, events) = run_controller(
        config.clone(),
        chain.clone(),
        Box::new(monitor),
        ShutdownSignal::new(),
    )
    .await;

    assert!(
        matches!(outcome, Outcome::Confirmed { attempts: 3, .. }),
        "expected confirmation on the third attempt, got {:?}",
        outcome
    );
    assert_eq!(count(&events, "buy_attempt"), 3);
    assert_eq!(count(&events, "buy_success"), 1);
    assert_eq!(chain.sent_count(), 1);

    let attempts = buy_attempts(&events);
    let nonces: Vec<u64> = attempts.iter().map(|(n, _)| *n).collect();
    assert_eq!(nonces, vec![7, 8, 9], "nonces must be strictly increasing");

    let fees: Vec<U256> = attempts.iter().map(|(_, f)| *f).collect();
    assert!(fees[0] < fees[1] && fees[1] < fees[2], "gas must escalate");
    for fee in fees {
        assert!(fee <= config.max_gas_price(), "gas must stay under the cap");
    }
}

#[tokio::test]
async fn not_started_polls_stay_in_watching() {
    let shutdown = ShutdownSignal::new();
    let chain = Arc::new(ScriptedChain::new());
    let states = (0..50).map(|_| Ok(PresaleState::NotStarted)).collect();
    let monitor = ScriptedMonitor::new(states).shutdown_when_exhausted(shutdown.clone());

    let (outcome, events) =
        run_controller(test_config(), chain.clone(), Box::new(monitor), shutdown).await;

    assert_eq!(
        outcome,
        Outcome::Aborted {
            reason: AbortReason::Shutdown
        }
    );
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(count(&events, "buy_attempt"), 0);
    assert_eq!(chain.sent_count(), 0);
}

#[tokio::test]
async fn insufficient_balance_aborts_before_submission() {
    let chain = Arc::new(ScriptedChain::new());
    *chain.balance.lock().unwrap() = U256::from(1_000u64);

    let monitor = ScriptedMonitor::new(vec![Ok(PresaleState::Open(open_snapshot()))]);
    let (outcome, events) = run_controller(
        test_config(),
        chain.clone(),
        Box::new(monitor),
        ShutdownSignal::new(),
    )
    .await;

    assert!(matches!(
        outcome,
        Outcome::Aborted {
            reason: AbortReason::InsufficientFunds { .. }
        }
    ));
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(chain.sent_count(), 0, "no transaction may reach the node");
    assert_eq!(count(&events, "balance_warning"), 1);
    assert_eq!(count(&events, "buy_attempt"), 0);
}

#[tokio::test]
async fn confirmation_reached_on_third_receipt_poll() {
    let mut config = test_config();
    config.execution.min_confirmations = 1;

    let chain = Arc::new(ScriptedChain::new());
    chain.script_receipt(Some(confirmed_receipt(0)));
    chain.script_receipt(Some(confirmed_receipt(0)));
    chain.script_receipt(Some(confirmed_receipt(1)));

    let monitor = ScriptedMonitor::new(vec![Ok(PresaleState::Open(open_snapshot()))]);
    let (outcome, events) = run_controller(
        config,
        chain.clone(),
        Box::new(monitor),
        ShutdownSignal::new(),
    )
    .await;

    assert!(matches!(outcome, Outcome::Confirmed { attempts: 1, .. }));
    assert_eq!(chain.receipt_polls.load(Ordering::SeqCst), 3);
    assert_eq!(count(&events, "buy_success"), 1);
}

#[tokio::test]
async fn closed_before_open_aborts_with_presale_end() {
    let mut snapshot = open_snapshot();
    snapshot.is_active = false;
    snapshot.chain_time = 3_000;

    let chain = Arc::new(ScriptedChain::new());
    let monitor = ScriptedMonitor::new(vec![
        Ok(PresaleState::NotStarted),
        Ok(PresaleState::Closed(snapshot)),
    ]);

    let (outcome, events) = run_controller(
        test_config(),
        chain.clone(),
        Box::new(monitor),
        ShutdownSignal::new(),
    )
    .await;

    assert!(matches!(
        outcome,
        Outcome::Aborted {
            reason: AbortReason::PresaleClosed { .. }
        }
    ));
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(count(&events, "presale_end"), 1);
    assert_eq!(count(&events, "buy_attempt"), 0);
    assert_eq!(chain.sent_count(), 0);
}

#[tokio::test]
async fn network_gas_above_cap_warns_and_submits_at_cap() {
    let config = test_config();
    let cap = config.max_gas_price();

    let mut chain = ScriptedChain::new();
    chain.gas_price = cap * U256::from(2u64);
    let chain = Arc::new(chain);

    let monitor = ScriptedMonitor::new(vec![Ok(PresaleState::Open(open_snapshot()))]);
    let (outcome, events) =
        run_controller(config, chain.clone(), Box::new(monitor), ShutdownSignal::new()).await;

    assert!(matches!(outcome, Outcome::Confirmed { .. }));
    assert_eq!(count(&events, "gas_warning"), 1);

    let attempts = buy_attempts(&events);
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].1, cap, "submission must be clamped to the cap");
}

#[tokio::test]
async fn buy_near_cap_right_sizes_the_spend() {
    // 0.03 ETH left under the hard cap against a configured 0.1 ETH spend.
    let remaining = U256::from(3u64) * U256::from(ETH) / U256::from(100u64);
    let mut snapshot = open_snapshot();
    snapshot.total_raised = snapshot.hard_cap - remaining;

    let chain = Arc::new(ScriptedChain::new());
    let monitor = ScriptedMonitor::new(vec![Ok(PresaleState::Open(snapshot.clone()))]);
    let (outcome, events) = run_controller(
        test_config(),
        chain.clone(),
        Box::new(monitor),
        ShutdownSignal::new(),
    )
    .await;

    assert!(matches!(outcome, Outcome::Confirmed { .. }));
    assert_eq!(chain.sent_count(), 1);
    assert_eq!(
        tokens_received(&events),
        Some(remaining * U256::exp10(18) / snapshot.token_price),
        "success report must reflect the clamped spend"
    );
}

#[tokio::test]
async fn open_with_exhausted_allocation_aborts() {
    let mut snapshot = open_snapshot();
    snapshot.total_raised = snapshot.hard_cap;

    let chain = Arc::new(ScriptedChain::new());
    let monitor = ScriptedMonitor::new(vec![Ok(PresaleState::Open(snapshot))]);
    let (outcome, events) = run_controller(
        test_config(),
        chain.clone(),
        Box::new(monitor),
        ShutdownSignal::new(),
    )
    .await;

    assert!(matches!(
        outcome,
        Outcome::Aborted {
            reason: AbortReason::PresaleClosed { .. }
        }
    ));
    assert_eq!(chain.sent_count(), 0);
    assert_eq!(count(&events, "presale_end"), 1);
}

#[tokio::test]
async fn retries_never_exceed_configured_maximum() {
    let mut config = test_config();
    config.execution.max_retries = 3;

    let chain = Arc::new(ScriptedChain::new());
    for _ in 0..5 {
        chain.script_send(Err(underpriced()));
    }

    let monitor = ScriptedMonitor::new(vec![Ok(PresaleState::Open(open_snapshot()))]);
    let (outcome, events) = run_controller(
        config,
        chain.clone(),
        Box::new(monitor),
        ShutdownSignal::new(),
    )
    .await;

    assert!(matches!(outcome, Outcome::Failed { .. }));
    assert_eq!(outcome.exit_code(), 2);
    assert_eq!(count(&events, "buy_attempt"), 3);
    assert_eq!(count(&events, "buy_failure"), 1);
    assert_eq!(chain.sent_count(), 0);
}

#[tokio::test]
async fn unconfirmed_transaction_fails_on_timeout() {
    let chain = Arc::new(ScriptedChain::new());
    *chain.fallback_receipt.lock().unwrap() = None;

    let monitor = ScriptedMonitor::new(vec![Ok(PresaleState::Open(open_snapshot()))]);
    let (outcome, events) = run_controller(
        test_config(),
        chain.clone(),
        Box::new(monitor),
        ShutdownSignal::new(),
    )
    .await;

    match outcome {
        Outcome::Failed { ref reason } => {
            assert!(reason.contains("confirm"), "unexpected reason: {}", reason)
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(count(&events, "buy_failure"), 1);
}

#[tokio::test]
async fn reverted_attempt_is_retried_with_fresh_nonce() {
    let mut config = test_config();
    config.execution.max_retries = 2;

    let chain = Arc::new(ScriptedChain::new());
    chain.script_receipt(Some(reverted_receipt()));

    let monitor = ScriptedMonitor::new(vec![Ok(PresaleState::Open(open_snapshot()))]);
    let (outcome, events) = run_controller(
        config,
        chain.clone(),
        Box::new(monitor),
        ShutdownSignal::new(),
    )
    .await;

    assert!(matches!(outcome, Outcome::Confirmed { attempts: 2, .. }));
    assert_eq!(chain.sent_count(), 2);

    let nonces: Vec<u64> = buy_attempts(&events).iter().map(|(n, _)| *n).collect();
    assert_eq!(nonces, vec![7, 8]);
}

#[tokio::test]
async fn slippage_abort_reports_error_event() {
    let chain = Arc::new(ScriptedChain::new());
    // Default max slippage is 5%; move the price 20%.
    *chain.token_price.lock().unwrap() = U256::from(1_200u64);

    let monitor = ScriptedMonitor::new(vec![Ok(PresaleState::Open(open_snapshot()))]);
    let (outcome, events) = run_controller(
        test_config(),
        chain.clone(),
        Box::new(monitor),
        ShutdownSignal::new(),
    )
    .await;

    assert!(matches!(
        outcome,
        Outcome::Aborted {
            reason: AbortReason::SlippageExceeded { .. }
        }
    ));
    assert_eq!(chain.sent_count(), 0);
    assert_eq!(count(&events, "error"), 1);
}

#[tokio::test]
async fn shutdown_before_start_aborts_cleanly() {
    let shutdown = ShutdownSignal::new();
    shutdown.trigger();

    let chain = Arc::new(ScriptedChain::new());
    let monitor = ScriptedMonitor::new(vec![Ok(PresaleState::Open(open_snapshot()))]);
    let (outcome, events) =
        run_controller(test_config(), chain.clone(), Box::new(monitor), shutdown).await;

    assert_eq!(
        outcome,
        Outcome::Aborted {
            reason: AbortReason::Shutdown
        }
    );
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(count(&events, "shutdown"), 1);
    assert_eq!(chain.sent_count(), 0);
}

#[tokio::test]
async fn permanent_monitor_error_fails_the_run() {
    let chain = Arc::new(ScriptedChain::new());
    let monitor = ScriptedMonitor::new(vec![
        Ok(PresaleState::Unknown),
        Err(SniperError::permanent_rpc("eth_call", "execution reverted")),
    ]);

    let (outcome, events) = run_controller(
        test_config(),
        chain.clone(),
        Box::new(monitor),
        ShutdownSignal::new(),
    )
    .await;

    assert!(matches!(outcome, Outcome::Failed { .. }));
    assert_eq!(count(&events, "buy_failure"), 1);
    assert_eq!(chain.sent_count(), 0);
}

#[tokio::test]
async fn presale_detected_event_precedes_attempts() {
    let chain = Arc::new(ScriptedChain::new());
    let monitor = ScriptedMonitor::new(vec![
        Ok(PresaleState::NotStarted),
        Ok(PresaleState::Open(open_snapshot())),
    ]);

    let (outcome, events) = run_controller(
        test_config(),
        chain,
        Box::new(monitor),
        ShutdownSignal::new(),
    )
    .await;

    assert!(matches!(outcome, Outcome::Confirmed { .. }));
    let detected = events
        .iter()
        .position(|e| e.kind() == "presale_detected")
        .expect("presale_detected must be delivered");
    let first_attempt = events
        .iter()
        .position(|e| e.kind() == "buy_attempt")
        .expect("buy_attempt must be delivered");
    assert!(detected < first_attempt);
}
