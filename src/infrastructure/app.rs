use crate::chain::client::ChainClient;
use crate::chain::http::HttpChainClient;
use crate::execution::builder::TransactionBuilder;
use crate::execution::clock::TokioClock;
use crate::execution::controller::{ExecutionController, Outcome};
use crate::infrastructure::config::Config;
use crate::infrastructure::shutdown::ShutdownSignal;
use crate::monitor::presale::PresaleMonitor;
use crate::notify::dispatcher::NotificationDispatcher;
use crate::notify::domain::{NoopSink, NotificationEvent, NotificationSink};
use crate::notify::telegram::TelegramNotifier;
use crate::shared::constants::notify;
use crate::{Result, SniperError};
use std::sync::Arc;
use tracing::{info, warn};

/// Wires the chain client, monitor, builder, controller and notification
/// dispatcher together and runs one sniping session to completion.
pub struct SniperApp {
    config: Arc<Config>,
    controller: ExecutionController,
    dispatcher: NotificationDispatcher,
    wallet_address: ethers::types::Address,
    contract_address: ethers::types::Address,
}

impl SniperApp {
    pub async fn new(config: Config, shutdown: ShutdownSignal) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let client: Arc<dyn ChainClient> = Arc::new(HttpChainClient::new(&config.ethereum)?);
        verify_chain(client.as_ref(), config.ethereum.chain_id).await?;

        let sink: Arc<dyn NotificationSink> = match (&config.telegram.bot_token, &config.telegram.chat_id)
        {
            (Some(token), Some(chat_id)) => Arc::new(TelegramNotifier::new(token, chat_id)?),
            _ => {
                warn!("telegram credentials missing, notifications disabled");
                Arc::new(NoopSink)
            }
        };
        let dispatcher = NotificationDispatcher::start(sink, notify::QUEUE_CAPACITY);

        let builder = TransactionBuilder::new(&config, client.clone())?;
        let wallet_address = builder.address();
        let contract_address = config.contract_address()?;
        let monitor = PresaleMonitor::new(&config, client.clone())?;

        let controller = ExecutionController::new(
            config.clone(),
            client,
            Box::new(monitor),
            builder,
            dispatcher.handle(),
            shutdown,
            Arc::new(TokioClock),
        );

        Ok(Self {
            config,
            controller,
            dispatcher,
            wallet_address,
            contract_address,
        })
    }

    /// Run the controller to its terminal state, flush pending notifications
    /// and return the process exit code.
    pub async fn run(mut self) -> i32 {
        self.dispatcher.handle().publish(NotificationEvent::Startup {
            wallet: self.wallet_address,
            contract: self.contract_address,
            token_amount: self.config.token_amount(),
            max_gas_price: self.config.max_gas_price(),
        });

        let outcome = self.controller.run().await;
        match &outcome {
            Outcome::Confirmed {
                tx_hash, attempts, ..
            } => {
                info!(tx_hash = %tx_hash, attempts, "buy confirmed");
            }
            Outcome::Failed { reason } => {
                warn!(reason = %reason, "run failed");
            }
            Outcome::Aborted { reason } => {
                warn!(reason = ?reason, "run aborted");
            }
        }

        self.dispatcher.close().await;
        outcome.exit_code()
    }
}

/// The configured chain id must match the endpoint; signing against the
/// wrong chain would burn the window on transactions no node accepts.
async fn verify_chain(client: &dyn ChainClient, expected: u64) -> Result<()> {
    let actual = client.chain_id().await?;
    if actual != expected {
        return Err(SniperError::Config(format!(
            "rpc endpoint reports chain id {} but configuration expects {}",
            actual, expected
        )));
    }
    info!(chain_id = actual, "connected to chain");
    Ok(())
}
