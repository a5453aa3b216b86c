//! Transaction envelopes and signing.
use crate::msg::{Coin, Msg};
use crate::wallet::Account;
use chainload_core::{Config, EncodingError, Target};
use serde::{Deserialize, Serialize};

pub const BROADCAST_MODE: &str = "sync";
pub const TXS_PATH: &str = "/txs";
pub const GAS_PER_MSG: u64 = 200_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Vec<Coin>,
    pub gas: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    /// Hex encoded ed25519 public key.
    pub pub_key: String,
    /// Hex encoded signature over the sign document.
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdTx {
    pub msg: Vec<Msg>,
    pub fee: StdFee,
    pub signatures: Vec<StdSignature>,
    pub memo: String,
}

/// The document that actually gets signed. Field order is alphabetical so the encoding is
/// canonical.
#[derive(Serialize)]
struct SignDoc<'a> {
    account_number: String,
    chain_id: &'a str,
    fee: &'a StdFee,
    memo: &'a str,
    msgs: &'a [Msg],
    sequence: String,
}

#[derive(Serialize)]
pub(crate) struct BroadcastBody<'a> {
    pub mode: &'static str,
    pub tx: &'a StdTx,
}

/// Signs messages for one chain and turns them into broadcast targets.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    chain_id: String,
    base_url: String,
}

impl TxBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            chain_id: config.chain_id.clone(),
            base_url: config.base_url().to_string(),
        }
    }

    pub fn sign(
        &self,
        account: &Account,
        msgs: Vec<Msg>,
        account_number: u64,
        sequence: u64,
    ) -> Result<StdTx, EncodingError> {
        let fee = StdFee {
            amount: vec![],
            gas: (GAS_PER_MSG * msgs.len().max(1) as u64).to_string(),
        };
        let memo = String::new();

        let doc = SignDoc {
            account_number: account_number.to_string(),
            chain_id: &self.chain_id,
            fee: &fee,
            memo: &memo,
            msgs: &msgs,
            sequence: sequence.to_string(),
        };
        let bytes = serde_json::to_vec(&doc).map_err(EncodingError::Encode)?;
        let signature = StdSignature {
            pub_key: account.public_key_hex(),
            signature: hex::encode(account.sign(&bytes)),
        };

        Ok(StdTx {
            msg: msgs,
            fee,
            signatures: vec![signature],
            memo,
        })
    }

    pub fn broadcast_url(&self) -> String {
        format!("{}{TXS_PATH}", self.base_url)
    }

    pub fn broadcast_target(&self, tx: &StdTx) -> Result<Target, EncodingError> {
        Target::post_json(
            self.broadcast_url(),
            &BroadcastBody {
                mode: BROADCAST_MODE,
                tx,
            },
        )
    }

    /// Signs and wraps in one step.
    pub fn signed_target(
        &self,
        account: &Account,
        msgs: Vec<Msg>,
        account_number: u64,
        sequence: u64,
    ) -> Result<Target, EncodingError> {
        let tx = self.sign(account, msgs, account_number, sequence)?;
        self.broadcast_target(&tx)
    }
}

/// Body accepted by `POST /txs`, as seen by the receiving side.
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastRequest {
    pub mode: String,
    pub tx: StdTx,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::{MessageBuilder, MsgKind};
    use crate::wallet::Wallets;
    use chainload_core::Method;

    fn config() -> Config {
        Config {
            target_url: "http://localhost:1317/".to_string(),
            chain_id: "test-chain".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn broadcast_target_shape() {
        let wallets = crate::scenario::tests::wallets();
        let account = wallets.account(0).unwrap();
        let msg = MessageBuilder::new(&account.address, "stake")
            .build(MsgKind::Send)
            .unwrap();

        let builder = TxBuilder::new(&config());
        let target = builder.signed_target(&account, vec![msg], 0, 4).unwrap();
        assert_eq!(target.method, Method::Post);
        assert_eq!(target.url, "http://localhost:1317/txs");

        let body: BroadcastRequest = serde_json::from_str(target.body.as_deref().unwrap()).unwrap();
        assert_eq!(body.mode, "sync");
        assert_eq!(body.tx.msg.len(), 1);
        assert_eq!(body.tx.fee.gas, "200000");
        assert_eq!(body.tx.signatures[0].pub_key, account.public_key_hex());
    }

    #[test]
    fn signing_is_deterministic_and_sequence_sensitive() {
        let wallets = crate::scenario::tests::wallets();
        let account = wallets.account(1).unwrap();
        let msgs = || {
            vec![MessageBuilder::new(&account.address, "stake")
                .build(MsgKind::Empty)
                .unwrap()]
        };

        let builder = TxBuilder::new(&config());
        let a = builder.sign(&account, msgs(), 3, 0).unwrap();
        let b = builder.sign(&account, msgs(), 3, 0).unwrap();
        let c = builder.sign(&account, msgs(), 3, 1).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.signatures, c.signatures);
    }
}
