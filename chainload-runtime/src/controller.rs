//! The master side of a distributed run.
//!
//! A [`Controller`] drives every slave through two phases. First all slaves are told to load
//! their targets; only once every slave has acknowledged does any of them get told to fire.
use crate::error::ControllerError;
use chainload::prelude::*;
use chainload::rpc::RpcClient;
use chainload_core::{decode_results, AttackResult, LoadRequest, FIRE_ENDPOINT, LOAD_ENDPOINT};
use futures_util::{future::join_all, StreamExt};
use std::sync::Arc;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

pub struct Controller {
    config: Arc<Config>,
    slaves: Vec<Slave>,
    client: reqwest::Client,
    state_params: Vec<StateParams>,
    results: Vec<Vec<u8>>,
}

impl Controller {
    pub fn new(config: Config, slaves: Vec<Slave>) -> Self {
        let count = slaves.len();
        Self {
            config: Arc::new(config),
            slaves,
            client: reqwest::Client::new(),
            state_params: vec![StateParams::new(); count],
            results: vec![Vec::new(); count],
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn slaves(&self) -> &[Slave] {
        &self.slaves
    }

    /// Parameters produced by [`Controller::prepare`], one entry per slave.
    pub fn state_params(&self) -> &[StateParams] {
        &self.state_params
    }

    /// Raw NDJSON bodies streamed back by each slave's fire call, in slave order.
    pub fn results(&self) -> &[Vec<u8>] {
        &self.results
    }

    pub fn attack_results(&self) -> Result<Vec<AttackResult>, ControllerError> {
        let mut all = Vec::new();
        for body in &self.results {
            all.extend(decode_results(body)?);
        }
        Ok(all)
    }

    pub async fn latest_height(&self) -> Result<u64, ControllerError> {
        let rpc = RpcClient::new(self.client.clone(), &self.config.target_url);
        Ok(rpc.latest_height().await?)
    }

    /// Puts the chain into the state each slave's scenario needs, signing with account 0 of
    /// `master_mnemonic`.
    ///
    /// Slaves are prepared one after another since they share the master's sequence number.
    #[instrument(skip_all, fields(slaves = self.slaves.len()))]
    pub async fn prepare(&mut self, master_mnemonic: &str) -> Result<(), ControllerError> {
        let masters = HdWallets::from_mnemonic(master_mnemonic, &self.config.address_prefix)?;
        let master = masters.account(0)?;

        let mut prepared = Vec::with_capacity(self.slaves.len());
        for slave in &self.slaves {
            let kind: ScenarioKind = slave.target_type.parse()?;
            let config = Arc::new(self.config.with_mnemonic(&slave.mnemonic));
            let users = HdWallets::from_mnemonic(&slave.mnemonic, &config.address_prefix)?;
            let scenario = kind.build(config.clone(), &StateParams::new())?;

            let params = Preparer::new(config, self.client.clone())
                .prepare(scenario.as_ref(), &master, &users, &StateParams::new())
                .await?;
            info!("Prepared {kind} for {}", slave.url);
            prepared.push(params);
        }

        self.state_params = prepared;
        Ok(())
    }

    /// Loads every slave, then fires every slave.
    ///
    /// If any load call fails no slave is fired and the first failure is returned.
    #[instrument(skip_all, fields(slaves = self.slaves.len()))]
    pub async fn start_load_test(&mut self) -> Result<(), ControllerError> {
        info!("Load phase starting");
        let loads = self
            .slaves
            .iter()
            .enumerate()
            .map(|(idx, slave)| self.load(idx, slave));
        join_all(loads)
            .await
            .into_iter()
            .collect::<Result<Vec<()>, _>>()?;

        info!("All slaves loaded, fire phase starting");
        let fires = self.slaves.iter().map(|slave| self.fire(slave));
        let outcomes = join_all(fires).await;

        let mut first_error = None;
        for (idx, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(body) => self.results[idx] = body,
                Err(err) => {
                    error!("Fire failed for {}: {err}", self.slaves[idx].url);
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                info!("Fire phase finished");
                Ok(())
            }
        }
    }

    async fn load(&self, idx: usize, slave: &Slave) -> Result<(), ControllerError> {
        let url = slave.endpoint(LOAD_ENDPOINT);
        let body = LoadRequest {
            target_type: slave.target_type.clone(),
            config: self.config.with_mnemonic(&slave.mnemonic),
            state_params: self.state_params.get(idx).cloned().unwrap_or_default(),
        };

        let res = self.client.post(&url).json(&body).send().await;
        let res = check(&url, res).await?;
        debug!("{url} loaded: {}", res.text().await.unwrap_or_default());
        Ok(())
    }

    async fn fire(&self, slave: &Slave) -> Result<Vec<u8>, ControllerError> {
        let url = slave.endpoint(FIRE_ENDPOINT);
        let res = self.client.post(&url).send().await;
        let res = check(&url, res).await?;

        let mut body = Vec::new();
        let mut stream = res.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }
        debug!("{url} streamed {} bytes", body.len());
        Ok(body)
    }
}

async fn check(
    url: &str,
    res: Result<reqwest::Response, reqwest::Error>,
) -> Result<reqwest::Response, ControllerError> {
    let res = res.map_err(|err| ControllerError::RequestFailed {
        url: url.to_string(),
        status: err.status(),
        body: err.to_string(),
    })?;

    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    Err(ControllerError::RequestFailed {
        url: url.to_string(),
        status: Some(status),
        body: res.text().await.unwrap_or_default(),
    })
}
