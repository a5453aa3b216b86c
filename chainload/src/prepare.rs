//! Putting the chain into the state a scenario's load needs.
use crate::error::{PrepareError, RpcError, ScenarioError};
use crate::rpc::RpcClient;
use crate::scenario::{Scenario, HEIGHT_PARAM, MASTER_ADDRESS_PARAM};
use crate::tx::TxBuilder;
use crate::wallet::{Account, Wallets};
use chainload_core::{Config, StateParams};
use std::sync::Arc;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

pub struct Preparer {
    config: Arc<Config>,
    rpc: RpcClient,
    tx: TxBuilder,
}

impl Preparer {
    pub fn new(config: Arc<Config>, client: reqwest::Client) -> Self {
        let rpc = RpcClient::new(client, &config.target_url);
        let tx = TxBuilder::new(&config);
        Self { config, rpc, tx }
    }

    /// Broadcasts the scenario's setup messages from `master`, `msgs_per_tx_prepare` per
    /// transaction, and returns the parameters for the load phase.
    ///
    /// The returned parameters always carry the chain height observed after the last broadcast,
    /// under `height`.
    #[instrument(skip_all, fields(scenario = scenario.name(), master = %master.address))]
    pub async fn prepare(
        &self,
        scenario: &dyn Scenario,
        master: &Account,
        wallets: &dyn Wallets,
        params: &StateParams,
    ) -> Result<StateParams, PrepareError> {
        let (msgs, mut params_out) =
            scenario.generate_state_setting_msgs(master, wallets, params)?;

        if !msgs.is_empty() {
            let info = self.rpc.account(&master.address).await?;
            let mut sequence = info.sequence;

            let chunks = msgs.chunks(self.config.msgs_per_tx_prepare.max(1));
            info!(
                "Broadcasting {} setup messages in {} transactions",
                msgs.len(),
                chunks.len()
            );
            for chunk in chunks {
                for msg in chunk {
                    msg.validate_basic().map_err(ScenarioError::from)?;
                }
                let tx = self
                    .tx
                    .sign(master, chunk.to_vec(), info.account_number, sequence)
                    .map_err(RpcError::from)?;
                self.rpc.broadcast(&tx).await?;
                sequence += 1;
            }
        }

        let height = self.rpc.latest_height().await?;
        debug!("Preparation finished at height {height}");
        params_out.insert(HEIGHT_PARAM.to_string(), height.to_string());
        params_out.insert(MASTER_ADDRESS_PARAM.to_string(), master.address.clone());
        Ok(params_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{ScenarioKind, TOKEN_CONTRACT_PARAM};
    use crate::wallet::HdWallets;
    use std::time::Duration;

    fn config(url: &str, msgs_per_tx_prepare: usize) -> Arc<Config> {
        Arc::new(Config {
            tps: 3,
            duration: Duration::from_secs(2),
            msgs_per_tx_prepare,
            target_url: url.to_string(),
            chain_id: "test-chain".to_string(),
            mnemonic: "legal winner thank year wave sausage worth useful legal winner thank yellow"
                .to_string(),
            ..Default::default()
        })
    }

    fn accounts(config: &Config) -> (Account, HdWallets) {
        let master = crate::scenario::tests::master();
        let users = HdWallets::from_mnemonic(&config.mnemonic, "link").unwrap();
        (master, users)
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn chunks_setup_into_transactions() {
        let chain = mock_service::spawn().await.unwrap();
        let cfg = config(&chain.base_url(), 4);
        let (master, users) = accounts(&cfg);
        let scenario = ScenarioKind::TxToken
            .build(cfg.clone(), &StateParams::new())
            .unwrap();

        let preparer = Preparer::new(cfg, reqwest::Client::new());
        let params = preparer
            .prepare(scenario.as_ref(), &master, &users, &StateParams::new())
            .await
            .unwrap();

        // 6 fundings, 1 issue and 6 mints in chunks of 4.
        assert_eq!(chain.calls("/txs"), 4);
        assert_eq!(chain.sequence(&master.address), 4);
        assert!(params.contains_key(TOKEN_CONTRACT_PARAM));
        assert!(params[HEIGHT_PARAM].parse::<u64>().is_ok());
        assert_eq!(params[MASTER_ADDRESS_PARAM], master.address);
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn query_scenarios_only_record_height() {
        let chain = mock_service::spawn().await.unwrap();
        let cfg = config(&chain.base_url(), 1);
        let (master, users) = accounts(&cfg);
        let scenario = ScenarioKind::QueryBlock
            .build(cfg.clone(), &StateParams::new())
            .unwrap();

        let params = Preparer::new(cfg, reqwest::Client::new())
            .prepare(scenario.as_ref(), &master, &users, &StateParams::new())
            .await
            .unwrap();
        assert_eq!(chain.calls("/txs"), 0);
        assert!(params.contains_key(HEIGHT_PARAM));
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn rejected_broadcast_fails() {
        let chain = mock_service::spawn().await.unwrap();
        chain.reject_txs(5, "out of gas");
        let cfg = config(&chain.base_url(), 100);
        let (master, users) = accounts(&cfg);
        let scenario = ScenarioKind::TxSend
            .build(cfg.clone(), &StateParams::new())
            .unwrap();

        let err = Preparer::new(cfg, reqwest::Client::new())
            .prepare(scenario.as_ref(), &master, &users, &StateParams::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PrepareError::Rpc(RpcError::Broadcast { code: 5, .. })
        ));
    }
}
