// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Signed ledger transactions.
use blake2::{Blake2s256, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::{
    amount::{Amount, serde_decimal},
    crypto::{Address, Signature, SigningKey, VerifyingKey, hex},
};

/// The kind of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxKind {
    /// Moves value between two accounts.
    Transfer,
    /// Buys into a table, the recipient is the table address.
    Join {
        /// The requested seat if any.
        seat: Option<u8>,
    },
    /// Credits a deposit made on the bridge.
    Mint {
        /// The bridge deposit index, makes every mint unique.
        deposit_index: u64,
    },
}

/// A transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// The hash bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex(&self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({self})")
    }
}

/// Transaction verification errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    /// The signature does not match the transaction or the sender.
    #[error("invalid signature")]
    InvalidSignature,
    /// The transaction content is malformed.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
}

/// The signed part of a transaction.
#[derive(Debug, Serialize)]
struct Body<'a> {
    kind: &'a TxKind,
    from: &'a Address,
    to: &'a Address,
    value: String,
    nonce: u64,
}

/// A signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    kind: TxKind,
    from: Address,
    to: Address,
    #[serde(with = "serde_decimal")]
    value: Amount,
    nonce: u64,
    vk: VerifyingKey,
    signature: Signature,
    hash: TxHash,
}

impl Transaction {
    /// Creates and signs a transaction, the sender is the signing key address.
    pub fn new(sk: &SigningKey, kind: TxKind, to: Address, value: Amount, nonce: u64) -> Self {
        let from = sk.address();
        let signature = sk.sign(&Body {
            kind: &kind,
            from: &from,
            to: &to,
            value: value.to_str_radix(10),
            nonce,
        });

        let mut tx = Self {
            kind,
            from,
            to,
            value,
            nonce,
            vk: sk.verifying_key(),
            signature,
            hash: TxHash([0; 32]),
        };

        tx.hash = tx.compute_hash();
        tx
    }

    /// Creates a transfer transaction.
    pub fn transfer(sk: &SigningKey, to: Address, value: Amount, nonce: u64) -> Self {
        Self::new(sk, TxKind::Transfer, to, value, nonce)
    }

    /// Creates a table buy-in transaction.
    pub fn join(
        sk: &SigningKey,
        table: Address,
        buy_in: Amount,
        seat: Option<u8>,
        nonce: u64,
    ) -> Self {
        Self::new(sk, TxKind::Join { seat }, table, buy_in, nonce)
    }

    /// Creates a mint transaction, the signer must be the bridge key.
    pub fn mint(
        sk: &SigningKey,
        to: Address,
        value: Amount,
        deposit_index: u64,
        nonce: u64,
    ) -> Self {
        Self::new(sk, TxKind::Mint { deposit_index }, to, value, nonce)
    }

    /// Checks the transaction signature, sender and hash.
    pub fn verify(&self) -> Result<(), TxError> {
        if self.value == Amount::ZERO {
            return Err(TxError::InvalidTransaction("zero value".to_string()));
        }

        if self.from == self.to {
            return Err(TxError::InvalidTransaction(
                "sender and recipient are the same".to_string(),
            ));
        }

        if self.vk.address() != self.from {
            return Err(TxError::InvalidSignature);
        }

        if !self.vk.verify(&self.body(), &self.signature) {
            return Err(TxError::InvalidSignature);
        }

        if self.hash != self.compute_hash() {
            return Err(TxError::InvalidTransaction("hash mismatch".to_string()));
        }

        Ok(())
    }

    /// The transaction kind.
    pub fn kind(&self) -> TxKind {
        self.kind
    }

    /// The sender address.
    pub fn from(&self) -> &Address {
        &self.from
    }

    /// The recipient address.
    pub fn to(&self) -> &Address {
        &self.to
    }

    /// The transferred value.
    pub fn value(&self) -> &Amount {
        &self.value
    }

    /// The sender nonce.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// The transaction hash.
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    /// The transaction signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    fn body(&self) -> Body<'_> {
        Body {
            kind: &self.kind,
            from: &self.from,
            to: &self.to,
            value: self.value.to_str_radix(10),
            nonce: self.nonce,
        }
    }

    fn compute_hash(&self) -> TxHash {
        let mut hasher = Blake2s256::new();
        bincode::serialize_into(&mut hasher, &self.body()).expect("should serialize to hasher");
        hasher.update(self.signature.to_bytes());
        TxHash(hasher.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::units;

    #[test]
    fn signed_transfer() {
        let sk = SigningKey::default();
        let to = SigningKey::default().address();
        let tx = Transaction::transfer(&sk, to.clone(), units(5), 1);

        assert!(tx.verify().is_ok());
        assert_eq!(tx.from(), &sk.address());
        assert_eq!(tx.to(), &to);
        assert_eq!(tx.nonce(), 1);

        // Same content, same hash.
        let tx2 = Transaction::transfer(&sk, to.clone(), units(5), 1);
        assert_eq!(tx.hash(), tx2.hash());

        // Any change is a different transaction.
        let tx3 = Transaction::transfer(&sk, to, units(5), 2);
        assert_ne!(tx.hash(), tx3.hash());
    }

    #[test]
    fn tampered_transactions() {
        let sk = SigningKey::default();
        let to = SigningKey::default().address();
        let tx = Transaction::transfer(&sk, to.clone(), units(5), 1);

        let mut bad = tx.clone();
        bad.value = units(500);
        assert_eq!(bad.verify(), Err(TxError::InvalidSignature));

        let mut bad = tx.clone();
        bad.from = SigningKey::default().address();
        assert_eq!(bad.verify(), Err(TxError::InvalidSignature));

        let mut bad = tx.clone();
        bad.hash = TxHash([1; 32]);
        assert!(matches!(bad.verify(), Err(TxError::InvalidTransaction(_))));

        let zero = Transaction::transfer(&sk, to, Amount::ZERO, 1);
        assert!(matches!(zero.verify(), Err(TxError::InvalidTransaction(_))));

        let me = Transaction::transfer(&sk, sk.address(), units(1), 1);
        assert!(matches!(me.verify(), Err(TxError::InvalidTransaction(_))));
    }

    #[test]
    fn json_format() {
        let sk = SigningKey::default();
        let tx = Transaction::join(&sk, Address::new("table-1"), units(1), Some(3), 7);

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["value"], "1000000000000000000");
        assert_eq!(json["kind"]["join"]["seat"], 3);
        assert_eq!(json["to"], "table-1");

        let tx2: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(tx, tx2);
        assert!(tx2.verify().is_ok());
    }
}
