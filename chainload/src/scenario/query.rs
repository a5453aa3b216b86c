use super::{parse_param, Context, Scenario, HEIGHT_PARAM};
use crate::error::ScenarioError;
use crate::msg::Msg;
use crate::wallet::{Account, Wallets};
use chainload_core::{StateParams, Target};

/// Blocks requested per `blocks_with_tx_results` query.
pub const BLOCK_FETCH_SIZE: u64 = 3;

/// Every user reads its own account.
#[derive(Debug)]
pub struct QueryAccount {
    ctx: Context,
}

impl QueryAccount {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }
}

impl Scenario for QueryAccount {
    fn name(&self) -> &'static str {
        "query_account"
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
        // Accounts only exist on chain once they received something.
        let msgs = self.ctx.funding_msgs(master, wallets)?;
        Ok((msgs, StateParams::new()))
    }

    fn generate_target(
        &self,
        account: &Account,
        _index: usize,
    ) -> Result<(Vec<Target>, usize), ScenarioError> {
        let url = self
            .ctx
            .url(&format!("/auth/accounts/{}", account.address));
        Ok((vec![Target::get(url)], 1))
    }
}

#[derive(Debug)]
pub struct QueryBlock {
    ctx: Context,
}

impl QueryBlock {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }
}

impl Scenario for QueryBlock {
    fn name(&self) -> &'static str {
        "query_block"
    }

    fn targets_per_user(&self) -> usize {
        1
    }

    fn generate_state_setting_msgs(
        &self,
        _master: &Account,
        _wallets: &dyn Wallets,
        _params: &StateParams,
    ) -> Result<(Vec<Msg>, StateParams), ScenarioError> {
        Ok((vec![], StateParams::new()))
    }

    fn generate_target(
        &self,
        _account: &Account,
        _index: usize,
    ) -> Result<(Vec<Target>, usize), ScenarioError> {
        Ok((vec![Target::get(self.ctx.url("/blocks/latest"))], 1))
    }
}

/// Fetches [`BLOCK_FETCH_SIZE`] blocks with their tx results, starting at the height recorded
/// during preparation.
#[derive(Debug)]
pub struct QueryBlocksWithTxResults {
    ctx: Context,
    height: Option<u64>,
}

impl QueryBlocksWithTxResults {
    pub(crate) fn new(ctx: Context, params: &StateParams) -> Result<Self, ScenarioError> {
        let height = parse_param(params, HEIGHT_PARAM)?;
        Ok(Self { ctx, height })
    }
}

impl Scenario for QueryBlocksWithTxResults {
    fn name(&self) -> &'static str {
        "query_blocks_with_tx_results"
    }

    fn targets_per_user(&self) -> usize {
        1
    }

    fn generate_state_setting_msgs(
        &self,
        _master: &Account,
        _wallets: &dyn Wallets,
        _params: &StateParams,
    ) -> Result<(Vec<Msg>, StateParams), ScenarioError> {
        Ok((vec![], StateParams::new()))
    }

    fn generate_target(
        &self,
        _account: &Account,
        _index: usize,
    ) -> Result<(Vec<Target>, usize), ScenarioError> {
        let height = self.height.ok_or(ScenarioError::MissingParam(HEIGHT_PARAM))?;
        let url = self.ctx.url(&format!(
            "/blocks_with_tx_results/{height}?fetchsize={BLOCK_FETCH_SIZE}"
        ));
        Ok((vec![Target::get(url)], 1))
    }
}
