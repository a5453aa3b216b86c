//! Workload definitions.
//!
//! A [`Scenario`] knows two things: which messages put the chain into the state its load needs
//! (funding users, issuing tokens, minting NFTs), and which requests each virtual user fires.
//! Scenarios are selected by name through [`ScenarioKind`].
mod composite;
mod query;
mod tx;

pub use composite::TxAndQueryAll;
pub use query::{QueryAccount, QueryBlock, QueryBlocksWithTxResults};
pub use tx::{TxCollection, TxEmpty, TxSend, TxToken};

use crate::error::ScenarioError;
use crate::msg::{Coin, MessageBuilder, Msg, MsgKind, MsgSend};
use crate::tx::TxBuilder;
use crate::wallet::{Account, Wallets};
use chainload_core::{Config, StateParams, Target};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::Arc;

pub const HEIGHT_PARAM: &str = "height";
pub const MASTER_ADDRESS_PARAM: &str = "master_address";
pub const TOKEN_CONTRACT_PARAM: &str = "token_contract_id";
pub const COLLECTION_CONTRACT_PARAM: &str = "collection_contract_id";
pub const NFTS_PER_USER_PARAM: &str = "nfts_per_user";

/// Coins sent to every virtual user during preparation.
pub const FUNDING_AMOUNT: u64 = 1_000_000;
/// Fungible tokens minted to every virtual user during preparation.
pub const TOKEN_FUNDING_AMOUNT: u64 = 1_000_000;

pub trait Scenario: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of target slots each virtual user occupies in the buffer.
    fn targets_per_user(&self) -> usize;

    /// Setup messages signed by `master`, plus parameters later passed to the load phase.
    fn generate_state_setting_msgs(
        &self,
        master: &Account,
        wallets: &dyn Wallets,
        params: &StateParams,
    ) -> Result<(Vec<Msg>, StateParams), ScenarioError>;

    /// Targets fired by one user, and how many of its slots were filled.
    ///
    /// The count may be lower than [`Scenario::targets_per_user`] when a finite resource runs
    /// out; generation for that user then stops instead of reusing resources.
    fn generate_target(
        &self,
        account: &Account,
        index: usize,
    ) -> Result<(Vec<Target>, usize), ScenarioError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioKind {
    QueryAccount,
    QueryBlock,
    QueryBlocksWithTxResults,
    TxSend,
    TxEmpty,
    TxToken,
    TxCollection,
    TxAndQueryAll,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 8] = [
        ScenarioKind::QueryAccount,
        ScenarioKind::QueryBlock,
        ScenarioKind::QueryBlocksWithTxResults,
        ScenarioKind::TxSend,
        ScenarioKind::TxEmpty,
        ScenarioKind::TxToken,
        ScenarioKind::TxCollection,
        ScenarioKind::TxAndQueryAll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioKind::QueryAccount => "query_account",
            ScenarioKind::QueryBlock => "query_block",
            ScenarioKind::QueryBlocksWithTxResults => "query_blocks_with_tx_results",
            ScenarioKind::TxSend => "tx_send",
            ScenarioKind::TxEmpty => "tx_empty",
            ScenarioKind::TxToken => "tx_token",
            ScenarioKind::TxCollection => "tx_collection",
            ScenarioKind::TxAndQueryAll => "tx_and_query_all",
        }
    }

    /// Instantiates the scenario. Parameters a scenario needs but which are absent are only
    /// reported once targets are generated, so the same kind can be built before preparation.
    #[tracing::instrument(skip(config, params))]
    pub fn build(
        &self,
        config: Arc<Config>,
        params: &StateParams,
    ) -> Result<Box<dyn Scenario>, ScenarioError> {
        let ctx = Context::new(config);
        let scenario: Box<dyn Scenario> = match self {
            ScenarioKind::QueryAccount => Box::new(QueryAccount::new(ctx)),
            ScenarioKind::QueryBlock => Box::new(QueryBlock::new(ctx)),
            ScenarioKind::QueryBlocksWithTxResults => {
                Box::new(QueryBlocksWithTxResults::new(ctx, params)?)
            }
            ScenarioKind::TxSend => Box::new(TxSend::new(ctx)),
            ScenarioKind::TxEmpty => Box::new(TxEmpty::new(ctx)),
            ScenarioKind::TxToken => Box::new(TxToken::new(ctx, params)),
            ScenarioKind::TxCollection => Box::new(TxCollection::new(ctx, params)?),
            ScenarioKind::TxAndQueryAll => Box::new(TxAndQueryAll::new(ctx, params)?),
        };
        Ok(scenario)
    }
}

impl FromStr for ScenarioKind {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ScenarioError::UnknownScenario(s.to_string()))
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What every scenario shares: the run config and a signer for it.
#[derive(Debug, Clone)]
pub(crate) struct Context {
    pub config: Arc<Config>,
    pub tx: TxBuilder,
}

impl Context {
    pub fn new(config: Arc<Config>) -> Self {
        let tx = TxBuilder::new(&config);
        Self { config, tx }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url())
    }

    pub fn messages_for(&self, account: &Account) -> MessageBuilder {
        MessageBuilder::new(&account.address, &self.config.coin_name)
    }

    pub fn msgs_per_tx(&self) -> usize {
        self.config.msgs_per_tx_load_test
    }

    /// One transfer per virtual user, from `master` to the user.
    pub fn funding_msgs(
        &self,
        master: &Account,
        wallets: &dyn Wallets,
    ) -> Result<Vec<Msg>, ScenarioError> {
        (0..self.config.num_users())
            .map(|index| {
                let user = wallets.account(index)?;
                Ok(Msg::Send(MsgSend {
                    from_address: master.address.clone(),
                    to_address: user.address,
                    amount: vec![Coin::new(&self.config.coin_name, FUNDING_AMOUNT)],
                }))
            })
            .collect()
    }

    /// Issues a token owned by `master` and mints a share to every user.
    pub fn token_setup(
        &self,
        master: &Account,
        wallets: &dyn Wallets,
        params: &mut StateParams,
    ) -> Result<Vec<Msg>, ScenarioError> {
        let first_user = wallets.account(0)?;
        let contract_id = contract_id(&master.address, &first_user.address, MsgKind::IssueToken);

        let mut msgs = vec![self.messages_for(master).build(MsgKind::IssueToken)?];
        for index in 0..self.config.num_users() {
            let user = wallets.account(index)?;
            let mut builder = self
                .messages_for(master)
                .to(&user.address)
                .token(&contract_id)
                .amount(TOKEN_FUNDING_AMOUNT);
            msgs.push(builder.build(MsgKind::MintFt)?);
        }

        params.insert(TOKEN_CONTRACT_PARAM.to_string(), contract_id);
        Ok(msgs)
    }

    /// Creates a collection owned by `master` and mints `nfts_per_user` NFTs to every user, in
    /// user order, so user `i` owns the indexes in [`nft_range`].
    pub fn collection_setup(
        &self,
        master: &Account,
        wallets: &dyn Wallets,
        nfts_per_user: u64,
        params: &mut StateParams,
    ) -> Result<Vec<Msg>, ScenarioError> {
        let first_user = wallets.account(0)?;
        let contract_id =
            contract_id(&master.address, &first_user.address, MsgKind::CreateCollection);

        let mut msgs = vec![self.messages_for(master).build(MsgKind::CreateCollection)?];
        for index in 0..self.config.num_users() {
            let user = wallets.account(index)?;
            let mut builder = self
                .messages_for(master)
                .to(&user.address)
                .collection(&contract_id, 0..0);
            for _ in 0..nfts_per_user {
                msgs.push(builder.build(MsgKind::MintNft)?);
            }
        }

        params.insert(COLLECTION_CONTRACT_PARAM.to_string(), contract_id);
        params.insert(NFTS_PER_USER_PARAM.to_string(), nfts_per_user.to_string());
        Ok(msgs)
    }

    /// Packs `count` messages of `kind` per transaction, for `txs` transactions. Stops early
    /// when the builder runs out of a resource; returns the targets built so far.
    pub fn tx_targets(
        &self,
        account: &Account,
        builder: &mut MessageBuilder,
        kind: MsgKind,
        txs: usize,
    ) -> Result<Vec<Target>, ScenarioError> {
        let mut targets = Vec::with_capacity(txs);
        'txs: for sequence in 0..txs {
            let mut msgs = Vec::with_capacity(self.msgs_per_tx());
            for _ in 0..self.msgs_per_tx() {
                match builder.build(kind) {
                    Ok(msg) => msgs.push(msg),
                    Err(ScenarioError::ResourceExhausted { resource, index }) => {
                        tracing::debug!(
                            "User {} ran out of {resource} at {index}",
                            account.index
                        );
                        break 'txs;
                    }
                    Err(err) => return Err(err),
                }
            }
            targets.push(self.tx.signed_target(account, msgs, 0, sequence as u64)?);
        }
        Ok(targets)
    }
}

/// Deterministic contract id for assets created by `owner` for the user set starting at
/// `first_user`.
pub fn contract_id(owner: &str, first_user: &str, kind: MsgKind) -> String {
    let mut hasher = Sha256::new();
    hasher.update(owner.as_bytes());
    hasher.update(first_user.as_bytes());
    hasher.update(kind.as_str().as_bytes());
    hex::encode(&hasher.finalize()[..4])
}

/// NFT indexes owned by user `index` when every user holds `per_user` of them.
pub fn nft_range(index: usize, per_user: u64) -> Range<u64> {
    let start = index as u64 * per_user + 1;
    start..start + per_user
}

pub(crate) fn required<'a>(
    params: &'a StateParams,
    name: &'static str,
) -> Result<&'a str, ScenarioError> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or(ScenarioError::MissingParam(name))
}

pub(crate) fn parse_param<T: FromStr>(
    params: &StateParams,
    name: &'static str,
) -> Result<Option<T>, ScenarioError> {
    params
        .get(name)
        .map(|value| {
            value.parse().map_err(|_| ScenarioError::InvalidParam {
                name,
                value: value.clone(),
            })
        })
        .transpose()
}
