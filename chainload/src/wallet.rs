//! Deterministic accounts for virtual users.
//!
//! Every virtual user index maps to exactly one key pair derived from the configured mnemonic,
//! so slaves and the controller agree on addresses without exchanging keys. Seeds follow BIP39
//! and keys follow SLIP-10 for ed25519, where every path segment is hardened.
use crate::error::WalletError;
use bip39::Mnemonic;
use ed25519_dalek::{Signer, SigningKey};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;

pub const COIN_TYPE: u32 = 438;
const HARDENED: u32 = 0x8000_0000;
const CURVE_KEY: &[u8] = b"ed25519 seed";

type HmacSha512 = Hmac<Sha512>;

/// BIP44 style path for `index` under `account`.
pub fn derivation_path(account: u32, index: usize) -> String {
    format!("m/44'/{COIN_TYPE}'/{account}'/0'/{index}'")
}

/// Source of signing keys and addresses, one per index.
pub trait Wallets: Send + Sync {
    fn account(&self, index: usize) -> Result<Account, WalletError>;
}

#[derive(Clone)]
pub struct Account {
    pub index: usize,
    pub address: String,
    key: SigningKey,
}

impl Account {
    pub fn from_key(index: usize, key: SigningKey, prefix: &str) -> Self {
        let digest = Sha256::digest(key.verifying_key().as_bytes());
        let address = format!("{prefix}1{}", hex::encode(&digest[..20]));
        Self {
            index,
            address,
            key,
        }
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.key.verifying_key().as_bytes())
    }

    pub fn sign(&self, bytes: &[u8]) -> Vec<u8> {
        self.key.sign(bytes).to_bytes().to_vec()
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("index", &self.index)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// A SLIP-10 node: secret key plus chain code.
#[derive(Clone)]
struct ExtendedKey {
    key: [u8; 32],
    chain_code: [u8; 32],
}

impl ExtendedKey {
    fn master(seed: &[u8]) -> Result<Self, WalletError> {
        Self::from_hmac(CURVE_KEY, &[seed])
    }

    fn child(&self, index: u32) -> Result<Self, WalletError> {
        if index >= HARDENED {
            return Err(WalletError::IndexOutOfRange(index as usize));
        }
        let segment = (index | HARDENED).to_be_bytes();
        Self::from_hmac(&self.chain_code, &[&[0u8], &self.key, &segment])
    }

    fn from_hmac(key: &[u8], parts: &[&[u8]]) -> Result<Self, WalletError> {
        let mut mac = HmacSha512::new_from_slice(key).map_err(|_| WalletError::Derivation)?;
        for part in parts {
            mac.update(part);
        }
        let out = mac.finalize().into_bytes();

        let mut node = Self {
            key: [0u8; 32],
            chain_code: [0u8; 32],
        };
        node.key.copy_from_slice(&out[..32]);
        node.chain_code.copy_from_slice(&out[32..]);
        Ok(node)
    }
}

/// Hierarchical wallet rooted at a mnemonic. Derivation is pure CPU work.
#[derive(Clone)]
pub struct HdWallets {
    // m/44'/438'/0'/0', the parent of every user key.
    branch: ExtendedKey,
    prefix: String,
}

impl HdWallets {
    /// Parses `mnemonic` as an English BIP39 phrase. Surrounding and repeated whitespace is
    /// ignored.
    pub fn from_mnemonic(mnemonic: &str, prefix: &str) -> Result<Self, WalletError> {
        let phrase = mnemonic.split_whitespace().collect::<Vec<_>>().join(" ");
        if phrase.is_empty() {
            return Err(WalletError::EmptyMnemonic);
        }

        let seed = Mnemonic::parse(phrase.as_str())?.to_seed("");
        let mut branch = ExtendedKey::master(&seed)?;
        for segment in [44, COIN_TYPE, 0, 0] {
            branch = branch.child(segment)?;
        }

        Ok(Self {
            branch,
            prefix: prefix.to_string(),
        })
    }
}

impl Wallets for HdWallets {
    fn account(&self, index: usize) -> Result<Account, WalletError> {
        let segment = u32::try_from(index).map_err(|_| WalletError::IndexOutOfRange(index))?;
        let node = self.branch.child(segment)?;
        let key = SigningKey::from_bytes(&node.key);
        Ok(Account::from_key(index, key, &self.prefix))
    }
}
