//! # Core Domain Entities
//!
//! Defines the chain's core entities and their canonical byte layouts.
//!
//! ## Clusters
//!
//! - **Chain**: `Transaction`, `TransactionAsset`, `Block`
//! - **Accounts**: `Address`, `Account`
//! - **Lifecycle**: `TransactionStatus`
//!
//! Transaction and block ids are SHA-256 over the canonical byte layouts
//! defined here; both layouts are consensus-visible.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;
use std::str::FromStr;

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

// =============================================================================
// CLUSTER A: ACCOUNTS
// =============================================================================

/// An account address: the low 64 bits of `SHA-256(public_key)`.
///
/// Rendered as `DDK` followed by the decimal account number. The numeric
/// form is what the ledger keys on; the prefixed string is the user-facing
/// and wire representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub u64);

impl Address {
    /// Address prefix for this chain.
    pub const PREFIX: &'static str = "DDK";

    /// Derive the address for a public key.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self(shared_crypto::account_number(public_key))
    }

    /// The raw account number.
    pub fn number(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

/// Error parsing a `DDK…` address string.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid address: {0}")]
pub struct AddressParseError(String);

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| AddressParseError(s.to_string()))?;
        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| AddressParseError(s.to_string()))
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Ledger state for one account, as the admission pipeline sees it.
///
/// `unconfirmed_balance` already has every pool transaction deducted; it is
/// the quantity new admissions are checked against.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Account {
    /// The account address.
    pub address: Address,
    /// Registered public key, if the account has ever sent.
    pub public_key: Option<PublicKey>,
    /// Second public key after a signature-rotation transaction.
    pub second_public_key: Option<PublicKey>,
    /// Confirmed balance in base units.
    pub balance: u64,
    /// Balance with all pool transactions deducted.
    pub unconfirmed_balance: u64,
    /// Stake amount frozen against unconfirmed stake orders.
    pub unconfirmed_frozen_amount: u64,
}

// =============================================================================
// CLUSTER B: TRANSACTIONS
// =============================================================================

/// Unique transaction identifier (SHA-256 over the canonical bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TransactionId(pub Hash);

impl TransactionId {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", &hex::encode(self.0)[..8])
    }
}

impl Serialize for TransactionId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let hash: Hash = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("transaction id must be 32 bytes"))?;
        Ok(Self(hash))
    }
}

/// The transaction kind. Wire discriminants are fixed; they feed both the
/// canonical byte layout and the canonical ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionType {
    /// Plain balance transfer.
    Send = 0,
    /// Second-signature registration (key rotation).
    Signature = 1,
    /// Delegate vote.
    Vote = 2,
    /// Referral chain registration.
    Referral = 3,
    /// Stake order creation.
    Stake = 4,
    /// Stake order transfer to another account.
    SendStake = 5,
}

impl TransactionType {
    /// Wire discriminant.
    pub fn discriminant(self) -> u8 {
        self as u8
    }
}

/// Per-type transaction payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TransactionAsset {
    /// No payload (Send, SendStake).
    #[default]
    None,
    /// Second public key being registered.
    SecondSignature {
        /// The key that will co-sign future transactions.
        public_key: PublicKey,
    },
    /// Delegate votes, each entry `+<pk>` or `-<pk>` in hex.
    Votes {
        /// Vote entries in submission order.
        votes: Vec<String>,
    },
    /// Referral chain, nearest sponsor first.
    Referral {
        /// Sponsor addresses.
        chain: Vec<Address>,
    },
    /// Stake order.
    Stake {
        /// Amount being frozen, in base units.
        amount: u64,
    },
}

impl TransactionAsset {
    /// Canonical bytes folded into the transaction digest.
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Self::None => Vec::new(),
            Self::SecondSignature { public_key } => public_key.to_vec(),
            Self::Votes { votes } => votes.join(",").into_bytes(),
            Self::Referral { chain } => chain
                .iter()
                .flat_map(|addr| addr.number().to_be_bytes())
                .collect(),
            Self::Stake { amount } => amount.to_le_bytes().to_vec(),
        }
    }
}

/// Transaction lifecycle tag.
///
/// ```text
/// CREATED ──push──→ QUEUED ──┬──→ QUEUED_AS_CONFLICTED ──reshuffle──→ QUEUED
///                            ├──→ DECLINED
///                            └──→ VERIFIED ──→ PUT_IN_POOL ──→ UNCONFIRM_APPLIED
///                                                  │                  │
///                                                  └──→ DECLINED      └──block──→ CONFIRMED
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Built but not yet submitted.
    #[default]
    Created,
    /// Waiting in the admission queue.
    Queued,
    /// Parked in the conflicted queue until the next reshuffle.
    QueuedAsConflicted,
    /// Passed both verification phases.
    Verified,
    /// Rejected; terminal.
    Declined,
    /// Inserted into the pool indexes, unconfirmed effects not yet applied.
    PutInPool,
    /// In the pool with unconfirmed balance effects applied.
    UnconfirmApplied,
    /// Included in an accepted block; terminal.
    Confirmed,
}

/// A transaction as it moves through admission.
///
/// The content fields are immutable once signed (the id covers all of them);
/// only `status` advances through the lifecycle.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    /// SHA-256 over the canonical bytes (signature included).
    pub id: TransactionId,
    /// Transaction kind.
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Sender's ed25519 public key.
    pub sender_public_key: PublicKey,
    /// Address derived from `sender_public_key`.
    pub sender_address: Address,
    /// Recipient, present for Send and SendStake.
    pub recipient_address: Option<Address>,
    /// Amount in base units.
    pub amount: u64,
    /// Fee in base units.
    pub fee: u64,
    /// Seconds since the chain epoch.
    pub timestamp: u32,
    /// Ed25519 signature over the canonical bytes without the signature.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
    /// Per-type payload.
    pub asset: TransactionAsset,
    /// Lifecycle tag; not part of the signed content.
    #[serde(skip)]
    pub status: TransactionStatus,
}

impl Transaction {
    /// Build an unsigned transaction. `id` and `signature` are zeroed until
    /// [`Transaction::sign`] runs.
    #[allow(clippy::too_many_arguments)]
    pub fn unsigned(
        tx_type: TransactionType,
        sender_public_key: PublicKey,
        recipient_address: Option<Address>,
        amount: u64,
        fee: u64,
        timestamp: u32,
        asset: TransactionAsset,
    ) -> Self {
        Self {
            id: TransactionId::default(),
            tx_type,
            sender_public_key,
            sender_address: Address::from_public_key(&sender_public_key),
            recipient_address,
            amount,
            fee,
            timestamp,
            signature: [0u8; 64],
            asset,
            status: TransactionStatus::Created,
        }
    }

    /// Canonical byte layout.
    ///
    /// ```text
    /// type(1) | timestamp(4 LE) | sender_pk(32) | recipient(8 BE, 0 if none)
    /// | amount(8 LE) | fee(8 LE) | asset(var) | [signature(64)]
    /// ```
    ///
    /// The signature is appended only when `include_signature`: ids cover
    /// it, signing does not.
    pub fn bytes(&self, include_signature: bool) -> Vec<u8> {
        let asset = self.asset.bytes();
        let mut out = Vec::with_capacity(61 + asset.len() + 64);
        out.push(self.tx_type.discriminant());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.sender_public_key);
        let recipient = self.recipient_address.map_or(0, |addr| addr.number());
        out.extend_from_slice(&recipient.to_be_bytes());
        out.extend_from_slice(&self.amount.to_le_bytes());
        out.extend_from_slice(&self.fee.to_le_bytes());
        out.extend_from_slice(&asset);
        if include_signature {
            out.extend_from_slice(&self.signature);
        }
        out
    }

    /// Recompute the id from the current content.
    pub fn compute_id(&self) -> TransactionId {
        TransactionId(shared_crypto::sha256(&self.bytes(true)))
    }

    /// Sign with `keypair` and derive the id. The keypair must match
    /// `sender_public_key`.
    pub fn sign(&mut self, keypair: &shared_crypto::KeyPair) {
        self.signature = keypair.sign_raw(&self.bytes(false));
        self.id = self.compute_id();
    }

    /// Verify the ed25519 signature against the sender's key.
    pub fn verify_signature(&self) -> bool {
        shared_crypto::signatures::verify_raw(
            &self.sender_public_key,
            &self.bytes(false),
            &self.signature,
        )
    }

    /// Amount plus fee: what admission debits from the unconfirmed balance.
    pub fn total_debit(&self) -> u64 {
        self.amount.saturating_add(self.fee)
    }
}

// =============================================================================
// CLUSTER C: BLOCKS
// =============================================================================

/// Unique block identifier (SHA-256 over the canonical header bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockId(pub Hash);

impl BlockId {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", &hex::encode(self.0)[..8])
    }
}

impl Serialize for BlockId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BlockId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let hash: Hash = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("block id must be 32 bytes"))?;
        Ok(Self(hash))
    }
}

/// A block as received for verification.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    /// SHA-256 over the canonical header bytes (signature included).
    pub id: BlockId,
    /// Block format version.
    pub version: u32,
    /// Seconds since the chain epoch.
    pub timestamp: u32,
    /// Chain height; set from the predecessor during verification.
    pub height: u64,
    /// Id of the preceding block; `None` only for genesis.
    pub previous_block: Option<BlockId>,
    /// Declared transaction count.
    pub number_of_transactions: u32,
    /// Declared sum of transaction amounts.
    pub total_amount: u64,
    /// Declared sum of transaction fees.
    pub total_fee: u64,
    /// Forging reward for this height.
    pub reward: u64,
    /// Declared payload byte length.
    pub payload_length: u32,
    /// SHA-256 over the concatenated transaction bytes.
    pub payload_hash: Hash,
    /// The forging delegate's public key.
    pub generator_public_key: PublicKey,
    /// Delegate's ed25519 signature over the header without the signature.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
    /// Transactions in payload order.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Canonical header byte layout.
    ///
    /// ```text
    /// version(4 LE) | timestamp(4 LE) | previous_block(32, 0 if none)
    /// | number_of_transactions(4 LE) | total_amount(8 LE) | total_fee(8 LE)
    /// | reward(8 LE) | payload_length(4 LE) | payload_hash(32)
    /// | generator_pk(32) | [signature(64)]
    /// ```
    ///
    /// Height is derived from chain position and deliberately not part of
    /// the signed content.
    pub fn bytes(&self, include_signature: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(192);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        match &self.previous_block {
            Some(prev) => out.extend_from_slice(prev.as_bytes()),
            None => out.extend_from_slice(&[0u8; 32]),
        }
        out.extend_from_slice(&self.number_of_transactions.to_le_bytes());
        out.extend_from_slice(&self.total_amount.to_le_bytes());
        out.extend_from_slice(&self.total_fee.to_le_bytes());
        out.extend_from_slice(&self.reward.to_le_bytes());
        out.extend_from_slice(&self.payload_length.to_le_bytes());
        out.extend_from_slice(&self.payload_hash);
        out.extend_from_slice(&self.generator_public_key);
        if include_signature {
            out.extend_from_slice(&self.signature);
        }
        out
    }

    /// Recompute the id from the current content.
    pub fn compute_id(&self) -> BlockId {
        BlockId(shared_crypto::sha256(&self.bytes(true)))
    }

    /// Sign with the forging delegate's keypair and derive the id.
    pub fn sign(&mut self, keypair: &shared_crypto::KeyPair) {
        self.signature = keypair.sign_raw(&self.bytes(false));
        self.id = self.compute_id();
    }

    /// Verify the delegate's signature.
    pub fn verify_signature(&self) -> bool {
        shared_crypto::signatures::verify_raw(
            &self.generator_public_key,
            &self.bytes(false),
            &self.signature,
        )
    }
}
