use super::{
    nft_range, parse_param, Context, Scenario, COLLECTION_CONTRACT_PARAM, NFTS_PER_USER_PARAM,
    TOKEN_CONTRACT_PARAM,
};
use crate::error::ScenarioError;
use crate::msg::Msg;
use crate::wallet::{Account, Wallets};
use chainload_core::{StateParams, Target};

/// Transactions fired by every user, in order.
pub const OPERATIONS: [&str; 4] = ["send", "empty", "transfer_ft", "transfer_nft"];

/// Mixed workload: an account query followed by one transaction per entry of [`OPERATIONS`].
#[derive(Debug)]
pub struct TxAndQueryAll {
    ctx: Context,
    operations: Vec<String>,
    token_contract: Option<String>,
    collection_contract: Option<String>,
    nfts_per_user: u64,
}

impl TxAndQueryAll {
    pub(crate) fn new(ctx: Context, params: &StateParams) -> Result<Self, ScenarioError> {
        let operations: Vec<String> = OPERATIONS.iter().map(|op| op.to_string()).collect();
        let transfers_nft = operations.iter().filter(|op| *op == "transfer_nft").count();
        let nfts_per_user = parse_param(params, NFTS_PER_USER_PARAM)?
            .unwrap_or((ctx.msgs_per_tx() * transfers_nft) as u64);

        Ok(Self {
            operations,
            token_contract: params.get(TOKEN_CONTRACT_PARAM).cloned(),
            collection_contract: params.get(COLLECTION_CONTRACT_PARAM).cloned(),
            nfts_per_user,
            ctx,
        })
    }
}

impl Scenario for TxAndQueryAll {
    fn name(&self) -> &'static str {
        "tx_and_query_all"
    }

    fn targets_per_user(&self) -> usize {
        self.operations.len() + 1
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
        let token = self
            .token_contract
            .as_deref()
            .ok_or(ScenarioError::MissingParam(TOKEN_CONTRACT_PARAM))?;
        let collection = self
            .collection_contract
            .as_deref()
            .ok_or(ScenarioError::MissingParam(COLLECTION_CONTRACT_PARAM))?;

        let mut builder = self
            .ctx
            .messages_for(account)
            .token(token)
            .collection(collection, nft_range(index, self.nfts_per_user));

        let mut targets = Vec::with_capacity(self.targets_per_user());
        targets.push(Target::get(
            self.ctx.url(&format!("/auth/accounts/{}", account.address)),
        ));

        'ops: for (sequence, op) in self.operations.iter().enumerate() {
            let mut msgs = Vec::with_capacity(self.ctx.msgs_per_tx());
            for _ in 0..self.ctx.msgs_per_tx() {
                match builder.build_named(op) {
                    Ok(msg) => msgs.push(msg),
                    Err(ScenarioError::ResourceExhausted { resource, index }) => {
                        tracing::debug!(
                            "User {} ran out of {resource} at {index}",
                            account.index
                        );
                        break 'ops;
                    }
                    Err(err) => return Err(err),
                }
            }
            targets.push(
                self.ctx
                    .tx
                    .signed_target(account, msgs, 0, sequence as u64)?,
            );
        }

        let count = targets.len();
        Ok((targets, count))
    }
}
