//! Signable chain messages and the by-name message builder.
use crate::error::{MsgError, ScenarioError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Token type under which load-test NFTs are minted.
pub const NFT_TOKEN_TYPE: &str = "10000001";

/// Amount moved by a single load-test transfer.
pub const TRANSFER_AMOUNT: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    pub fn new(denom: &str, amount: u64) -> Self {
        Self {
            denom: denom.to_string(),
            amount: amount.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSend {
    pub from_address: String,
    pub to_address: String,
    pub amount: Vec<Coin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoCoins {
    pub address: String,
    pub coins: Vec<Coin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgMultiSend {
    pub inputs: Vec<IoCoins>,
    pub outputs: Vec<IoCoins>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgEmpty {
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgIssueToken {
    pub owner: String,
    pub to: String,
    pub name: String,
    pub symbol: String,
    pub amount: String,
    pub decimals: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgFtAmount {
    pub from: String,
    pub contract_id: String,
    pub to: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateCollection {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgMintNft {
    pub from: String,
    pub contract_id: String,
    pub to: String,
    pub token_type: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTransferNft {
    pub from: String,
    pub contract_id: String,
    pub to: String,
    pub token_ids: Vec<String>,
}

/// Every message the load tester knows how to sign. Encoded as `{"type": .., "value": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Msg {
    Send(MsgSend),
    MultiSend(MsgMultiSend),
    Empty(MsgEmpty),
    IssueToken(MsgIssueToken),
    MintFt(MsgFtAmount),
    TransferFt(MsgFtAmount),
    CreateCollection(MsgCreateCollection),
    MintNft(MsgMintNft),
    TransferNft(MsgTransferNft),
}

impl Msg {
    pub fn kind(&self) -> MsgKind {
        match self {
            Msg::Send(_) => MsgKind::Send,
            Msg::MultiSend(_) => MsgKind::MultiSend,
            Msg::Empty(_) => MsgKind::Empty,
            Msg::IssueToken(_) => MsgKind::IssueToken,
            Msg::MintFt(_) => MsgKind::MintFt,
            Msg::TransferFt(_) => MsgKind::TransferFt,
            Msg::CreateCollection(_) => MsgKind::CreateCollection,
            Msg::MintNft(_) => MsgKind::MintNft,
            Msg::TransferNft(_) => MsgKind::TransferNft,
        }
    }

    /// Wire type tag, identical to the `type` field of the encoding.
    pub fn type_tag(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Stateless checks a node would run before accepting the message.
    pub fn validate_basic(&self) -> Result<(), MsgError> {
        match self {
            Msg::Send(msg) => {
                non_empty("from_address", &msg.from_address)?;
                non_empty("to_address", &msg.to_address)?;
                validate_coins(&msg.amount)
            }
            Msg::MultiSend(msg) => {
                if msg.inputs.is_empty() {
                    return Err(MsgError::MissingField("inputs"));
                }
                if msg.outputs.is_empty() {
                    return Err(MsgError::MissingField("outputs"));
                }
                for io in msg.inputs.iter().chain(&msg.outputs) {
                    non_empty("address", &io.address)?;
                    validate_coins(&io.coins)?;
                }
                Ok(())
            }
            Msg::Empty(msg) => non_empty("from", &msg.from),
            Msg::IssueToken(msg) => {
                non_empty("owner", &msg.owner)?;
                non_empty("to", &msg.to)?;
                non_empty("name", &msg.name)?;
                non_empty("symbol", &msg.symbol)?;
                positive_amount(&msg.amount)
            }
            Msg::MintFt(msg) | Msg::TransferFt(msg) => {
                non_empty("from", &msg.from)?;
                non_empty("contract_id", &msg.contract_id)?;
                non_empty("to", &msg.to)?;
                positive_amount(&msg.amount)
            }
            Msg::CreateCollection(msg) => {
                non_empty("owner", &msg.owner)?;
                non_empty("name", &msg.name)
            }
            Msg::MintNft(msg) => {
                non_empty("from", &msg.from)?;
                non_empty("contract_id", &msg.contract_id)?;
                non_empty("to", &msg.to)?;
                non_empty("token_type", &msg.token_type)
            }
            Msg::TransferNft(msg) => {
                non_empty("from", &msg.from)?;
                non_empty("contract_id", &msg.contract_id)?;
                non_empty("to", &msg.to)?;
                if msg.token_ids.is_empty() {
                    return Err(MsgError::MissingField("token_ids"));
                }
                Ok(())
            }
        }
    }
}

fn non_empty(field: &'static str, value: &str) -> Result<(), MsgError> {
    if value.is_empty() {
        Err(MsgError::MissingField(field))
    } else {
        Ok(())
    }
}

fn positive_amount(amount: &str) -> Result<(), MsgError> {
    match amount.parse::<u128>() {
        Ok(n) if n > 0 => Ok(()),
        _ => Err(MsgError::InvalidAmount(amount.to_string())),
    }
}

fn validate_coins(coins: &[Coin]) -> Result<(), MsgError> {
    if coins.is_empty() {
        return Err(MsgError::MissingField("amount"));
    }
    for coin in coins {
        non_empty("denom", &coin.denom)?;
        positive_amount(&coin.amount)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgKind {
    Send,
    MultiSend,
    Empty,
    IssueToken,
    MintFt,
    TransferFt,
    CreateCollection,
    MintNft,
    TransferNft,
}

impl MsgKind {
    pub const ALL: [MsgKind; 9] = [
        MsgKind::Send,
        MsgKind::MultiSend,
        MsgKind::Empty,
        MsgKind::IssueToken,
        MsgKind::MintFt,
        MsgKind::TransferFt,
        MsgKind::CreateCollection,
        MsgKind::MintNft,
        MsgKind::TransferNft,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MsgKind::Send => "send",
            MsgKind::MultiSend => "multi_send",
            MsgKind::Empty => "empty",
            MsgKind::IssueToken => "issue_token",
            MsgKind::MintFt => "mint_ft",
            MsgKind::TransferFt => "transfer_ft",
            MsgKind::CreateCollection => "create_collection",
            MsgKind::MintNft => "mint_nft",
            MsgKind::TransferNft => "transfer_nft",
        }
    }
}

impl FromStr for MsgKind {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MsgKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ScenarioError::UnknownMessage(s.to_string()))
    }
}

impl fmt::Display for MsgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds one message per call for a single sender.
///
/// Each [`MsgKind`] is a zero-argument constructor over the builder's context; composite
/// workloads pick operations purely by name with [`MessageBuilder::build_named`]. NFT transfers
/// draw from a finite range of pre-minted token indexes and fail with
/// [`ScenarioError::ResourceExhausted`] once it runs out.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    from: String,
    to: String,
    coin_name: String,
    amount: u64,
    token_contract: Option<String>,
    collection_contract: Option<String>,
    nfts: Range<u64>,
}

impl MessageBuilder {
    /// Messages from `from` to itself, paying in `coin_name`.
    pub fn new(from: &str, coin_name: &str) -> Self {
        Self {
            from: from.to_string(),
            to: from.to_string(),
            coin_name: coin_name.to_string(),
            amount: TRANSFER_AMOUNT,
            token_contract: None,
            collection_contract: None,
            nfts: 0..0,
        }
    }

    pub fn to(mut self, to: &str) -> Self {
        self.to = to.to_string();
        self
    }

    /// Amount for coin and fungible token transfers.
    pub fn amount(mut self, amount: u64) -> Self {
        self.amount = amount;
        self
    }

    pub fn token(mut self, contract_id: &str) -> Self {
        self.token_contract = Some(contract_id.to_string());
        self
    }

    /// NFT collection and the indexes (exclusive end) this sender owns in it.
    pub fn collection(mut self, contract_id: &str, nfts: Range<u64>) -> Self {
        self.collection_contract = Some(contract_id.to_string());
        self.nfts = nfts;
        self
    }

    pub fn build_named(&mut self, name: &str) -> Result<Msg, ScenarioError> {
        self.build(name.parse()?)
    }

    pub fn build(&mut self, kind: MsgKind) -> Result<Msg, ScenarioError> {
        let msg = match kind {
            MsgKind::Send => Msg::Send(MsgSend {
                from_address: self.from.clone(),
                to_address: self.to.clone(),
                amount: vec![Coin::new(&self.coin_name, self.amount)],
            }),
            MsgKind::MultiSend => {
                let coins = vec![Coin::new(&self.coin_name, self.amount)];
                Msg::MultiSend(MsgMultiSend {
                    inputs: vec![IoCoins {
                        address: self.from.clone(),
                        coins: coins.clone(),
                    }],
                    outputs: vec![IoCoins {
                        address: self.to.clone(),
                        coins,
                    }],
                })
            }
            MsgKind::Empty => Msg::Empty(MsgEmpty {
                from: self.from.clone(),
            }),
            MsgKind::IssueToken => Msg::IssueToken(MsgIssueToken {
                owner: self.from.clone(),
                to: self.to.clone(),
                name: "load test token".to_string(),
                symbol: "LOAD".to_string(),
                amount: u64::MAX.to_string(),
                decimals: "0".to_string(),
            }),
            MsgKind::MintFt => Msg::MintFt(self.ft_amount()?),
            MsgKind::TransferFt => Msg::TransferFt(self.ft_amount()?),
            MsgKind::CreateCollection => Msg::CreateCollection(MsgCreateCollection {
                owner: self.from.clone(),
                name: "load test collection".to_string(),
            }),
            MsgKind::MintNft => Msg::MintNft(MsgMintNft {
                from: self.from.clone(),
                contract_id: self.collection_id()?,
                to: self.to.clone(),
                token_type: NFT_TOKEN_TYPE.to_string(),
                name: "load test nft".to_string(),
            }),
            MsgKind::TransferNft => {
                let contract_id = self.collection_id()?;
                let index = self.nfts.next().ok_or(ScenarioError::ResourceExhausted {
                    resource: "pre-minted NFTs",
                    index: self.nfts.end,
                })?;
                Msg::TransferNft(MsgTransferNft {
                    from: self.from.clone(),
                    contract_id,
                    to: self.to.clone(),
                    token_ids: vec![nft_token_id(index)],
                })
            }
        };
        Ok(msg)
    }

    fn ft_amount(&self) -> Result<MsgFtAmount, ScenarioError> {
        let contract_id = self
            .token_contract
            .clone()
            .ok_or(ScenarioError::MissingParam(crate::scenario::TOKEN_CONTRACT_PARAM))?;
        Ok(MsgFtAmount {
            from: self.from.clone(),
            contract_id,
            to: self.to.clone(),
            amount: self.amount.to_string(),
        })
    }

    fn collection_id(&self) -> Result<String, ScenarioError> {
        self.collection_contract
            .clone()
            .ok_or(ScenarioError::MissingParam(crate::scenario::COLLECTION_CONTRACT_PARAM))
    }
}

/// Full token id of the NFT minted at `index` (1-based, in mint order).
pub fn nft_token_id(index: u64) -> String {
    format!("{NFT_TOKEN_TYPE}{index:08x}")
}
