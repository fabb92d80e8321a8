use crate::chain::client::ChainClient;
use crate::execution::builder::TransactionBuilder;
use crate::execution::clock::Clock;
use crate::execution::state::ControllerState;
use crate::infrastructure::config::Config;
use crate::infrastructure::shutdown::ShutdownSignal;
use crate::monitor::domain::Monitor;
use crate::notify::dispatcher::NotificationHandle;
use crate::notify::domain::NotificationEvent;
use crate::shared::types::{
    AttemptStatus, PresaleSnapshot, PresaleState, TransactionAttempt, WalletSnapshot,
};
use crate::SniperError;
use ethers::types::{H256, U256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Why a run ended in `Aborted` rather than `Confirmed` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    Shutdown,
    InsufficientFunds { required: U256, available: U256 },
    SlippageExceeded { deviation_bps: u64, max_bps: u64 },
    PresaleClosed { total_raised: U256, hard_cap: U256 },
    Fatal { context: String, message: String },
}

/// Terminal result of a controller run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Confirmed {
        tx_hash: H256,
        gas_used: u64,
        attempts: u32,
        tokens_received: U256,
    },
    Failed {
        reason: String,
    },
    Aborted {
        reason: AbortReason,
    },
}

impl Outcome {
    /// Process exit code: 0 for a confirmed buy or an operator-requested
    /// stop, 1 for other aborts, 2 for unrecoverable failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Confirmed { .. } => 0,
            Outcome::Aborted {
                reason: AbortReason::Shutdown,
            } => 0,
            Outcome::Aborted { .. } => 1,
            Outcome::Failed { .. } => 2,
        }
    }
}

enum Submit {
    InFlight {
        attempt: TransactionAttempt,
        expected_tokens: U256,
    },
    Retry(SniperError),
    Abort(AbortReason),
}

enum Confirm {
    Confirmed { gas_used: u64 },
    Reverted,
    TimedOut,
    Fatal(SniperError),
    Shutdown,
}

/// The sequential state machine driving monitor, builder, submission and
/// confirmation. Owns every `TransactionAttempt` it creates; at most one
/// attempt is in flight at any time, and nonces never repeat within a run.
pub struct ExecutionController {
    config: Arc<Config>,
    client: Arc<dyn ChainClient>,
    monitor: Box<dyn Monitor>,
    builder: TransactionBuilder,
    notifier: NotificationHandle,
    shutdown: ShutdownSignal,
    clock: Arc<dyn Clock>,
    state: ControllerState,
}

impl ExecutionController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        client: Arc<dyn ChainClient>,
        monitor: Box<dyn Monitor>,
        builder: TransactionBuilder,
        notifier: NotificationHandle,
        shutdown: ShutdownSignal,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            client,
            monitor,
            builder,
            notifier,
            shutdown,
            clock,
            state: ControllerState::Idle,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Drive the run to a terminal state. Emits exactly one terminal
    /// notification, then returns; a finished controller never transitions
    /// again.
    pub async fn run(&mut self) -> Outcome {
        self.transition(ControllerState::Watching);
        let outcome = match self.watch().await {
            Watch::Open(snapshot) => self.execute(&snapshot).await,
            Watch::Done(outcome) => outcome,
        };
        self.finish(&outcome);
        outcome
    }

    /// Poll the monitor until the presale opens or the run must end.
    async fn watch(&mut self) -> Watch {
        loop {
            if self.shutdown.is_triggered() {
                return Watch::Done(Outcome::Aborted {
                    reason: AbortReason::Shutdown,
                });
            }

            match self.monitor.observe().await {
                Ok(PresaleState::Open(snapshot)) => {
                    info!(
                        total_raised = %snapshot.total_raised,
                        hard_cap = %snapshot.hard_cap,
                        "presale open, moving to submission"
                    );
                    self.notifier.publish(NotificationEvent::PresaleDetected {
                        total_raised: snapshot.total_raised,
                        hard_cap: snapshot.hard_cap,
                        token_price: snapshot.token_price,
                    });
                    return Watch::Open(snapshot);
                }
                Ok(PresaleState::Closed(snapshot)) => {
                    warn!("presale closed before any attempt was made");
                    return Watch::Done(Outcome::Aborted {
                        reason: AbortReason::PresaleClosed {
                            total_raised: snapshot.total_raised,
                            hard_cap: snapshot.hard_cap,
                        },
                    });
                }
                Ok(PresaleState::NotStarted) | Ok(PresaleState::Unknown) => {}
                Err(e) => {
                    error!(error = %e, "presale monitor failed");
                    return Watch::Done(Outcome::Failed {
                        reason: format!("monitor failed: {}", e),
                    });
                }
            }

            let delay = self.config.monitor_interval() + self.monitor.backoff();
            if !self.pause(delay).await {
                return Watch::Done(Outcome::Aborted {
                    reason: AbortReason::Shutdown,
                });
            }
        }
    }

    /// Submit-and-confirm loop. Retries transient failures up to
    /// `max_retries` total attempts with a fresh nonce and escalated gas on
    /// each pass.
    async fn execute(&mut self, presale: &PresaleSnapshot) -> Outcome {
        self.transition(ControllerState::Submitting);
        let max_retries = self.config.execution.max_retries.max(1);
        let mut attempt_index = 0u32;

        loop {
            if self.shutdown.is_triggered() {
                return Outcome::Aborted {
                    reason: AbortReason::Shutdown,
                };
            }

            match self.submit_attempt(attempt_index, presale).await {
                Submit::InFlight {
                    mut attempt,
                    expected_tokens,
                } => {
                    self.transition(ControllerState::AwaitingConfirmation);
                    match self.await_confirmation(&mut attempt).await {
                        Confirm::Confirmed { gas_used } => {
                            return Outcome::Confirmed {
                                tx_hash: attempt.tx_hash,
                                gas_used,
                                attempts: attempt_index + 1,
                                tokens_received: expected_tokens,
                            };
                        }
                        Confirm::Reverted => {
                            warn!(
                                tx_hash = %attempt.tx_hash,
                                attempt = attempt_index + 1,
                                "buy transaction reverted"
                            );
                            if attempt_index + 1 >= max_retries {
                                return Outcome::Failed {
                                    reason: format!(
                                        "transaction reverted after {} attempts",
                                        attempt_index + 1
                                    ),
                                };
                            }
                            if !self.pause(self.config.retry_delay()).await {
                                return Outcome::Aborted {
                                    reason: AbortReason::Shutdown,
                                };
                            }
                            attempt_index += 1;
                            self.transition(ControllerState::Submitting);
                        }
                        Confirm::TimedOut => {
                            let timeout = self.config.confirmation_timeout();
                            return Outcome::Failed {
                                reason: SniperError::ConfirmationTimeout(timeout).to_string(),
                            };
                        }
                        Confirm::Fatal(e) => {
                            return Outcome::Failed {
                                reason: format!("confirmation polling failed: {}", e),
                            };
                        }
                        Confirm::Shutdown => {
                            return Outcome::Aborted {
                                reason: AbortReason::Shutdown,
                            };
                        }
                    }
                }
                Submit::Retry(e) => {
                    warn!(
                        error = %e,
                        attempt = attempt_index + 1,
                        "attempt failed, retrying"
                    );
                    if attempt_index + 1 >= max_retries {
                        return Outcome::Failed {
                            reason: format!(
                                "retries exhausted after {} attempts: {}",
                                attempt_index + 1,
                                e
                            ),
                        };
                    }
                    if !self.pause(self.config.retry_delay()).await {
                        return Outcome::Aborted {
                            reason: AbortReason::Shutdown,
                        };
                    }
                    attempt_index += 1;
                }
                Submit::Abort(reason) => {
                    return Outcome::Aborted { reason };
                }
            }
        }
    }

    /// Refresh the wallet snapshot, build and sign attempt `attempt_index`,
    /// and hand it to the node.
    async fn submit_attempt(&mut self, attempt_index: u32, presale: &PresaleSnapshot) -> Submit {
        let wallet = match self.refresh_wallet().await {
            Ok(wallet) => wallet,
            Err(e) if e.is_retryable() => return Submit::Retry(e),
            Err(e) => {
                return Submit::Abort(AbortReason::Fatal {
                    context: "wallet refresh".to_string(),
                    message: e.to_string(),
                })
            }
        };

        let built = match self.builder.build(attempt_index, &wallet, presale).await {
            Ok(built) => built,
            Err(SniperError::InsufficientFunds {
                required,
                available,
            }) => {
                return Submit::Abort(AbortReason::InsufficientFunds {
                    required,
                    available,
                })
            }
            Err(SniperError::SlippageExceeded {
                deviation_bps,
                max_bps,
            }) => {
                return Submit::Abort(AbortReason::SlippageExceeded {
                    deviation_bps,
                    max_bps,
                })
            }
            Err(SniperError::AllocationExhausted {
                total_raised,
                hard_cap,
            }) => {
                return Submit::Abort(AbortReason::PresaleClosed {
                    total_raised,
                    hard_cap,
                })
            }
            Err(e) if e.is_retryable() => return Submit::Retry(e),
            Err(e) => {
                return Submit::Abort(AbortReason::Fatal {
                    context: "transaction build".to_string(),
                    message: e.to_string(),
                })
            }
        };

        if built.network_gas_price > self.config.max_gas_price() {
            warn!(
                network = %built.network_gas_price,
                cap = %self.config.max_gas_price(),
                "network gas price above cap, clamping"
            );
            self.notifier.publish(NotificationEvent::GasWarning {
                network_gas_price: built.network_gas_price,
                max_gas_price: self.config.max_gas_price(),
            });
        }

        let mut attempt = built.attempt;
        self.notifier.publish(NotificationEvent::BuyAttempt {
            attempt: attempt_index + 1,
            nonce: attempt.nonce,
            max_fee_per_gas: attempt.max_fee_per_gas,
        });

        match self
            .client
            .send_raw_transaction(attempt.raw_transaction.clone())
            .await
        {
            Ok(tx_hash) => {
                info!(tx_hash = %tx_hash, attempt = attempt_index + 1, "attempt submitted");
                attempt.mark_submitted(tx_hash);
                Submit::InFlight {
                    attempt,
                    expected_tokens: built.expected_tokens,
                }
            }
            Err(e) if e.is_retryable() => {
                attempt.status = AttemptStatus::Underpriced;
                Submit::Retry(e)
            }
            Err(e) => {
                attempt.status = AttemptStatus::Rejected;
                Submit::Abort(AbortReason::Fatal {
                    context: "transaction submission".to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Poll the receipt on the monitor interval until the confirmation
    /// threshold, a revert, the timeout, or shutdown.
    async fn await_confirmation(&mut self, attempt: &mut TransactionAttempt) -> Confirm {
        let interval = self.config.monitor_interval();
        let timeout = self.config.confirmation_timeout();
        let max_polls = (timeout.as_millis() / interval.as_millis().max(1)).max(1);

        for _ in 0..max_polls {
            if !self.pause(interval).await {
                return Confirm::Shutdown;
            }

            match self.client.get_receipt(attempt.tx_hash).await {
                Ok(Some(receipt)) => {
                    if !receipt.succeeded {
                        attempt.status = AttemptStatus::Failed;
                        return Confirm::Reverted;
                    }
                    attempt.confirmations = receipt.confirmations;
                    if receipt.confirmations >= self.config.execution.min_confirmations {
                        attempt.status = AttemptStatus::Included;
                        return Confirm::Confirmed {
                            gas_used: receipt.gas_used,
                        };
                    }
                }
                Ok(None) => {}
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, "receipt poll failed, will re-poll");
                }
                Err(e) => return Confirm::Fatal(e),
            }
        }

        Confirm::TimedOut
    }

    async fn refresh_wallet(&self) -> crate::Result<WalletSnapshot> {
        let address = self.builder.address();
        let balance = self.client.balance_of(address).await?;
        let nonce = self.client.nonce_of(address).await?;
        Ok(WalletSnapshot {
            address,
            balance,
            nonce,
        })
    }

    /// Sleep while staying responsive to shutdown. Returns false when a
    /// shutdown was observed during the wait.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.shutdown.wait() => false,
            _ = self.clock.sleep(duration) => true,
        }
    }

    fn transition(&mut self, next: ControllerState) {
        info!(from = self.state.as_str(), to = next.as_str(), "state transition");
        self.state = next;
    }

    /// Record the terminal state and emit its single terminal notification.
    fn finish(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Confirmed {
                tx_hash,
                gas_used,
                attempts,
                tokens_received,
            } => {
                self.transition(ControllerState::Confirmed);
                self.notifier.publish(NotificationEvent::BuySuccess {
                    tx_hash: *tx_hash,
                    attempts: *attempts,
                    gas_used: *gas_used,
                    tokens_received: *tokens_received,
                });
            }
            Outcome::Failed { reason } => {
                self.transition(ControllerState::Failed);
                self.notifier.publish(NotificationEvent::BuyFailure {
                    reason: reason.clone(),
                });
            }
            Outcome::Aborted { reason } => {
                self.transition(ControllerState::Aborted);
                let event = match reason {
                    AbortReason::Shutdown => NotificationEvent::Shutdown,
                    AbortReason::InsufficientFunds {
                        required,
                        available,
                    } => NotificationEvent::BalanceWarning {
                        balance: *available,
                        required: *required,
                    },
                    AbortReason::SlippageExceeded {
                        deviation_bps,
                        max_bps,
                    } => NotificationEvent::Error {
                        context: "slippage check".to_string(),
                        message: format!(
                            "price moved {} bps, limit {} bps",
                            deviation_bps, max_bps
                        ),
                    },
                    AbortReason::PresaleClosed {
                        total_raised,
                        hard_cap,
                    } => NotificationEvent::PresaleEnd {
                        total_raised: *total_raised,
                        hard_cap: *hard_cap,
                    },
                    AbortReason::Fatal { context, message } => NotificationEvent::Error {
                        context: context.clone(),
                        message: message.clone(),
                    },
                };
                self.notifier.publish(event);
            }
        }
    }
}

enum Watch {
    Open(PresaleSnapshot),
    Done(Outcome),
}
