use super::{
    nft_range, parse_param, required, Context, Scenario, COLLECTION_CONTRACT_PARAM,
    NFTS_PER_USER_PARAM, TOKEN_CONTRACT_PARAM,
};
use crate::error::ScenarioError;
use crate::msg::{Msg, MsgKind};
use crate::wallet::{Account, Wallets};
use chainload_core::{StateParams, Target};

/// Coin transfers from each user to itself.
#[derive(Debug)]
pub struct TxSend {
    ctx: Context,
}

impl TxSend {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }
}

impl Scenario for TxSend {
    fn name(&self) -> &'static str {
        "tx_send"
    }

    fn targets_per_user(&self) -> usize {
        1
    }

    fn generate_state_setting_msgs(
        &self,
        master: &Account,
        wallets: &dyn Wallets,
        _params: &StateParams,
    ) -> Result<(Vec<Msg>, StateParams), ScenarioError> {
        Ok((self.ctx.funding_msgs(master, wallets)?, StateParams::new()))
    }

    fn generate_target(
        &self,
        account: &Account,
        _index: usize,
    ) -> Result<(Vec<Target>, usize), ScenarioError> {
        let mut builder = self.ctx.messages_for(account);
        let targets =
            self.ctx
                .tx_targets(account, &mut builder, MsgKind::Send, self.targets_per_user())?;
        let count = targets.len();
        Ok((targets, count))
    }
}

/// Transactions carrying no-op messages; measures pure consensus overhead.
#[derive(Debug)]
pub struct TxEmpty {
    ctx: Context,
}

impl TxEmpty {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }
}

impl Scenario for TxEmpty {
    fn name(&self) -> &'static str {
        "tx_empty"
    }

    fn targets_per_user(&self) -> usize {
        1
    }

    fn generate_state_setting_msgs(
        &self,
        master: &Account,
        wallets: &dyn Wallets,
        _params: &StateParams,
    ) -> Result<(Vec<Msg>, StateParams), ScenarioError> {
        Ok((self.ctx.funding_msgs(master, wallets)?, StateParams::new()))
    }

    fn generate_target(
        &self,
        account: &Account,
        _index: usize,
    ) -> Result<(Vec<Target>, usize), ScenarioError> {
        let mut builder = self.ctx.messages_for(account);
        let targets =
            self.ctx
                .tx_targets(account, &mut builder, MsgKind::Empty, self.targets_per_user())?;
        let count = targets.len();
        Ok((targets, count))
    }
}

/// Fungible token transfers. Preparation issues the token and mints to every user.
#[derive(Debug)]
pub struct TxToken {
    ctx: Context,
    contract_id: Option<String>,
}

impl TxToken {
    pub(crate) fn new(ctx: Context, params: &StateParams) -> Self {
        Self {
            ctx,
            contract_id: params.get(TOKEN_CONTRACT_PARAM).cloned(),
        }
    }
}

impl Scenario for TxToken {
    fn name(&self) -> &'static str {
        "tx_token"
    }

    fn targets_per_user(&self) -> usize {
        1
    }

    fn generate_state_setting_msgs(
        &self,
        master: &Account,
        wallets: &dyn Wallets,
        _params: &StateParams,
    ) -> Result<(Vec<Msg>, StateParams), ScenarioError> {
        let mut params = StateParams::new();
        let mut msgs = self.ctx.funding_msgs(master, wallets)?;
        msgs.extend(self.ctx.token_setup(master, wallets, &mut params)?);
        Ok((msgs, params))
    }

    fn generate_target(
        &self,
        account: &Account,
        _index: usize,
    ) -> Result<(Vec<Target>, usize), ScenarioError> {
        let contract_id = self
            .contract_id
            .as_deref()
            .ok_or(ScenarioError::MissingParam(TOKEN_CONTRACT_PARAM))?;
        let mut builder = self.ctx.messages_for(account).token(contract_id);
        let targets = self.ctx.tx_targets(
            account,
            &mut builder,
            MsgKind::TransferFt,
            self.targets_per_user(),
        )?;
        let count = targets.len();
        Ok((targets, count))
    }
}

/// NFT transfers. Every user owns a fixed, pre-minted slice of one collection and stops once it
/// has moved all of it.
#[derive(Debug)]
pub struct TxCollection {
    ctx: Context,
    contract_id: Option<String>,
    nfts_per_user: u64,
}

impl TxCollection {
    pub(crate) fn new(ctx: Context, params: &StateParams) -> Result<Self, ScenarioError> {
        let nfts_per_user = parse_param(params, NFTS_PER_USER_PARAM)?
            .unwrap_or((ctx.msgs_per_tx() * TX_COLLECTION_TARGETS) as u64);
        Ok(Self {
            contract_id: params.get(COLLECTION_CONTRACT_PARAM).cloned(),
            ctx,
            nfts_per_user,
        })
    }
}

const TX_COLLECTION_TARGETS: usize = 1;

impl Scenario for TxCollection {
    fn name(&self) -> &'static str {
        "tx_collection"
    }

    fn targets_per_user(&self) -> usize {
        TX_COLLECTION_TARGETS
    }

    fn generate_state_setting_msgs(
        &self,
        master: &Account,
        wallets: &dyn Wallets,
        _params: &StateParams,
    ) -> Result<(Vec<Msg>, StateParams), ScenarioError> {
        let mut params = StateParams::new();
        let mut msgs = self.ctx.funding_msgs(master, wallets)?;
        msgs.extend(
            self.ctx
                .collection_setup(master, wallets, self.nfts_per_user, &mut params)?,
        );
        Ok((msgs, params))
    }

    fn generate_target(
        &self,
        account: &Account,
        index: usize,
    ) -> Result<(Vec<Target>, usize), ScenarioError> {
        let contract_id = self
            .contract_id
            .as_deref()
            .ok_or(ScenarioError::MissingParam(COLLECTION_CONTRACT_PARAM))?;
        let mut builder = self
            .ctx
            .messages_for(account)
            .collection(contract_id, nft_range(index, self.nfts_per_user));
        let targets = self.ctx.tx_targets(
            account,
            &mut builder,
            MsgKind::TransferNft,
            self.targets_per_user(),
        )?;
        let count = targets.len();
        Ok((targets, count))
    }
}

/// Token ids the user at `index` holds, as minted by [`TxCollection`]'s preparation.
pub fn owned_nfts(index: usize, params: &StateParams) -> Result<Vec<String>, ScenarioError> {
    required(params, COLLECTION_CONTRACT_PARAM)?;
    let per_user = parse_param(params, NFTS_PER_USER_PARAM)?
        .ok_or(ScenarioError::MissingParam(NFTS_PER_USER_PARAM))?;
    Ok(nft_range(index, per_user)
        .map(crate::msg::nft_token_id)
        .collect())
}
